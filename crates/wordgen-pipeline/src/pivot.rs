//! Wide pivot.
//!
//! Joins one phase's filtered Pre and Pos rows on `ID_Unico` into one
//! [`PhaseRecord`] per student, with per-item Pre/Pos/Delta triples laid out
//! by the answer key's column template. Output order is a stable sort on
//! `ID_Unico`.

use std::collections::BTreeMap;

use wordgen_core::{
  config::RunConfig,
  normalize::grade_band,
  record::{ItemTriple, PhaseRecord, ScoredRecord, TestKind},
};

use crate::{error::Result, filter::PairedRecords};

/// Pivot `paired` into wide form.
///
/// `template` is `(question number, slug)` pairs from
/// [`wordgen_core::key::AnswerKey::column_template`], extended by the caller
/// if the raw tables carry more item columns than the key.
pub fn pivot_phase(
  paired: &PairedRecords,
  template: &[(u8, String)],
  kind: TestKind,
  cfg: &RunConfig,
) -> Result<Vec<PhaseRecord>> {
  let pos_by_id: BTreeMap<&str, &ScoredRecord> = paired
    .pos
    .iter()
    .map(|r| (r.student.id_unico.as_str(), r))
    .collect();

  let max_score = kind.max_item_score() * template.len() as u32;

  let mut records = Vec::with_capacity(paired.pre.len());
  for pre in &paired.pre {
    // The validity filter guarantees a Pos partner for every Pre row.
    let Some(pos) = pos_by_id.get(pre.student.id_unico.as_str()) else {
      continue;
    };

    let item = |row: &ScoredRecord, question: u8| {
      row
        .items
        .get(question as usize - 1)
        .copied()
        .flatten()
    };

    let items: Vec<ItemTriple> = template
      .iter()
      .map(|(question, slug)| {
        let pre_v = item(pre, *question);
        let pos_v = item(pos, *question);
        let delta = match (pre_v, pos_v) {
          (Some(a), Some(b)) => Some(b as i32 - a as i32),
          _ => None,
        };
        ItemTriple {
          question: *question,
          slug:     slug.clone(),
          pre:      pre_v,
          pos:      pos_v,
          delta,
        }
      })
      .collect();

    let questoes_validas = items.iter().filter(|i| i.delta.is_some()).count() as u32;
    let identity = &pre.student.identity;
    let percent = |score: u32| {
      if max_score == 0 {
        0.0
      } else {
        100.0 * score as f64 / max_score as f64
      }
    };

    records.push(PhaseRecord {
      id_unico:         pre.student.id_unico.clone(),
      id_display:       pre.student.id_display.clone(),
      nome:             identity.name.clone(),
      escola:           identity.school.clone(),
      turma:            identity.class.clone(),
      serie:            identity.grade.clone(),
      grupo_etario:     grade_band(cfg.grade_band_policy, &identity.grade).to_string(),
      fase:             pre.phase,
      score_pre:        pre.score,
      score_pos:        pos.score,
      delta_score:      pos.score as i64 - pre.score as i64,
      questoes_validas,
      percentual_pre:   percent(pre.score),
      percentual_pos:   percent(pos.score),
      items,
      ano_calendario:   None,
      cohorte_origem:   None,
      sexo:             None,
      sexo_confianca:   None,
      sexo_metodo:      None,
    });
  }

  records.sort_by(|a, b| a.id_unico.cmp(&b.id_unico));
  Ok(records)
}

/// Extend a key's column template with generic slugs for trailing item
/// columns the key does not cover.
pub fn extend_template(template: Vec<(u8, String)>, n_items: usize) -> Vec<(u8, String)> {
  let mut template = template;
  let covered: Vec<u8> = template.iter().map(|(q, _)| *q).collect();
  for question in 1..=n_items as u8 {
    if !covered.contains(&question) {
      template.push((question, format!("item{question:02}")));
    }
  }
  template.sort_by_key(|(q, _)| *q);
  template
}

#[cfg(test)]
mod tests {
  use wordgen_core::{
    identity::{Student, StudentIdentity},
    record::Moment,
  };

  use super::*;
  use crate::filter::PairedRecords;

  fn scored(name: &str, moment: Moment, items: &[Option<u32>], score: u32) -> ScoredRecord {
    ScoredRecord {
      student: Student::new(StudentIdentity::from_raw(name, "E1", "6A", Some("6º ANO"))),
      phase: 2,
      kind: TestKind::Vocab,
      moment,
      items: items.to_vec(),
      answered: items.iter().flatten().count(),
      score,
    }
  }

  fn template() -> Vec<(u8, String)> {
    vec![(1, "casa".into()), (2, "celula".into())]
  }

  #[test]
  fn pairs_scores_and_item_deltas() {
    let paired = PairedRecords {
      pre: vec![scored("Ana", Moment::Pre, &[Some(1), Some(2)], 3)],
      pos: vec![scored("Ana", Moment::Pos, &[Some(2), None], 2)],
    };
    let records =
      pivot_phase(&paired, &template(), TestKind::Vocab, &RunConfig::default())
        .unwrap();

    assert_eq!(records.len(), 1);
    let rec = &records[0];
    assert_eq!(rec.delta_score, -1);
    assert_eq!(rec.items[0].delta, Some(1));
    assert_eq!(rec.items[1].delta, None);
    assert_eq!(rec.questoes_validas, 1);
    // Vocabulary max per item is 2 → max score 4.
    assert!((rec.percentual_pre - 75.0).abs() < 1e-9);
    assert!((rec.percentual_pos - 50.0).abs() < 1e-9);
    assert_eq!(rec.grupo_etario, "6º/7º anos");
  }

  #[test]
  fn output_is_sorted_by_id() {
    let a = scored("Zeca", Moment::Pre, &[Some(1), Some(1)], 2);
    let b = scored("Ana", Moment::Pre, &[Some(1), Some(1)], 2);
    let paired = PairedRecords {
      pos: vec![
        scored("Zeca", Moment::Pos, &[Some(1), Some(1)], 2),
        scored("Ana", Moment::Pos, &[Some(1), Some(1)], 2),
      ],
      pre: vec![a, b],
    };
    let records =
      pivot_phase(&paired, &template(), TestKind::Vocab, &RunConfig::default())
        .unwrap();
    let ids: Vec<_> = records.iter().map(|r| r.id_unico.clone()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
  }

  #[test]
  fn extend_template_fills_gaps() {
    let extended = extend_template(vec![(1, "casa".into())], 3);
    assert_eq!(extended, vec![
      (1, "casa".to_string()),
      (2, "item02".to_string()),
      (3, "item03".to_string()),
    ]);
  }
}

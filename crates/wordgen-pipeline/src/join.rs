//! Longitudinal join.
//!
//! Stacks per-phase wide tables, derives the calendar year from the
//! configured phase map, and tags every student with their cohort of origin
//! (the phase in which they first appear). The joined table is the final
//! per-student artifact.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;
use wordgen_core::{
  config::RunConfig,
  identity::{IdentityLedger, Student, StudentIdentity},
  record::PhaseRecord,
};

use crate::error::{Error, Result};

/// Stack per-phase tables into one longitudinal table.
///
/// Fails with [`Error::PhaseCollision`] if any student appears twice in one
/// phase (the validity filter makes this impossible; seeing it means a bug),
/// and with [`wordgen_core::Error::IdentityCollision`] if one `ID_Unico`
/// maps to two different identity tuples.
pub fn join_longitudinal(
  tables: Vec<Vec<PhaseRecord>>,
  cfg: &RunConfig,
) -> Result<Vec<PhaseRecord>> {
  let mut records: Vec<PhaseRecord> = tables.into_iter().flatten().collect();

  // Per-phase uniqueness and the identity ledger.
  let mut seen: BTreeSet<(String, u8)> = BTreeSet::new();
  let mut ledger = IdentityLedger::new();
  for record in &records {
    if !seen.insert((record.id_unico.clone(), record.fase)) {
      return Err(Error::PhaseCollision {
        id_unico: record.id_unico.clone(),
        phase:    record.fase,
      });
    }
    ledger.observe(&Student {
      identity:   StudentIdentity {
        name:   record.nome.clone(),
        school: record.escola.clone(),
        grade:  record.serie.clone(),
        class:  record.turma.clone(),
      },
      id_unico:   record.id_unico.clone(),
      id_display: record.id_display.clone(),
    });
  }
  ledger.verify().map_err(Error::Core)?;

  // Cohort labels: "Coorte 1" is the earliest phase present in the dataset.
  let phases: BTreeSet<u8> = records.iter().map(|r| r.fase).collect();
  let cohort_of_phase: BTreeMap<u8, String> = phases
    .iter()
    .enumerate()
    .map(|(rank, phase)| (*phase, format!("Coorte {}", rank + 1)))
    .collect();

  let mut first_phase: BTreeMap<String, u8> = BTreeMap::new();
  for record in &records {
    first_phase
      .entry(record.id_unico.clone())
      .and_modify(|p| *p = (*p).min(record.fase))
      .or_insert(record.fase);
  }

  for record in &mut records {
    let origin = first_phase[&record.id_unico];
    record.cohorte_origem = Some(cohort_of_phase[&origin].clone());
    record.ano_calendario = cfg.year_for(record.fase);
    if record.ano_calendario.is_none() {
      warn!(phase = record.fase, "phase not in the phase→year map");
    }
  }

  records.sort_by(|a, b| {
    a.id_unico
      .cmp(&b.id_unico)
      .then_with(|| a.fase.cmp(&b.fase))
  });
  Ok(records)
}

#[cfg(test)]
mod tests {
  use wordgen_core::record::ItemTriple;

  use super::*;

  fn record(name: &str, fase: u8) -> PhaseRecord {
    let student = Student::new(StudentIdentity::from_raw(
      name,
      "E1",
      "6A",
      Some("6º ANO"),
    ));
    PhaseRecord {
      id_unico:         student.id_unico.clone(),
      id_display:       student.id_display.clone(),
      nome:             student.identity.name.clone(),
      escola:           student.identity.school.clone(),
      turma:            student.identity.class.clone(),
      serie:            student.identity.grade.clone(),
      grupo_etario:     "6º/7º anos".to_string(),
      fase,
      score_pre:        10,
      score_pos:        12,
      delta_score:      2,
      questoes_validas: 2,
      percentual_pre:   50.0,
      percentual_pos:   60.0,
      items:            vec![ItemTriple {
        question: 1,
        slug:     "casa".to_string(),
        pre:      Some(1),
        pos:      Some(2),
        delta:    Some(1),
      }],
      ano_calendario:   None,
      cohorte_origem:   None,
      sexo:             None,
      sexo_confianca:   None,
      sexo_metodo:      None,
    }
  }

  fn config() -> RunConfig {
    let mut cfg = RunConfig::default();
    cfg.phases.insert("2".into(), 2023);
    cfg.phases.insert("3".into(), 2024);
    cfg
  }

  #[test]
  fn cohort_is_first_phase_observed() {
    let joined = join_longitudinal(
      vec![
        vec![record("Ana", 2), record("Bia", 2)],
        vec![record("Ana", 3), record("Caio", 3)],
      ],
      &config(),
    )
    .unwrap();

    let cohort = |name: &str, fase: u8| {
      joined
        .iter()
        .find(|r| r.nome == name && r.fase == fase)
        .and_then(|r| r.cohorte_origem.clone())
        .unwrap()
    };
    assert_eq!(cohort("ANA", 2), "Coorte 1");
    assert_eq!(cohort("ANA", 3), "Coorte 1");
    assert_eq!(cohort("BIA", 2), "Coorte 1");
    assert_eq!(cohort("CAIO", 3), "Coorte 2");
  }

  #[test]
  fn calendar_year_from_config() {
    let joined =
      join_longitudinal(vec![vec![record("Ana", 2), record("Ana", 3)]], &config())
        .unwrap();
    assert_eq!(joined[0].ano_calendario, Some(2023));
    assert_eq!(joined[1].ano_calendario, Some(2024));
  }

  #[test]
  fn unmapped_phase_leaves_year_empty() {
    let joined = join_longitudinal(vec![vec![record("Ana", 7)]], &config()).unwrap();
    assert_eq!(joined[0].ano_calendario, None);
  }

  #[test]
  fn same_student_same_phase_is_a_collision() {
    let err = join_longitudinal(
      vec![vec![record("Ana", 2)], vec![record("Ana", 2)]],
      &config(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::PhaseCollision { .. }));
  }

  #[test]
  fn output_sorted_by_id_then_phase() {
    let joined = join_longitudinal(
      vec![
        vec![record("Zeca", 3), record("Ana", 3)],
        vec![record("Zeca", 2)],
      ],
      &config(),
    )
    .unwrap();
    let keys: Vec<_> = joined.iter().map(|r| (r.id_unico.clone(), r.fase)).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
  }
}

//! Item-level scoring.
//!
//! Turns a [`RawTable`] into [`ScoredRecord`]s: builds each student's
//! identity, applies the answer key per grade, and applies the blank-response
//! policy. Rows are never dropped here; that is the validity filter's job.

use tracing::debug;
use wordgen_core::{
  config::{BlankResponsePolicy, RunConfig},
  identity::{Student, StudentIdentity},
  key::{AnswerKey, ItemScore, grade_vocab, score_tde},
  normalize::GRADE_UNKNOWN,
  record::{ScoredRecord, TestKind},
};
use wordgen_ingest::RawTable;

use crate::error::Result;

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// Scored rows plus the coercion counters the scorer accumulated.
#[derive(Debug)]
pub struct ScoreOutcome {
  pub records:              Vec<ScoredRecord>,
  /// Responses outside the value domain, coerced to missing.
  pub domain_value_coerced: usize,
  /// TDE rows whose grade could not be identified; their items are missing
  /// because no key applies, and the blank filter will drop them.
  pub unknown_grade:        usize,
}

// ─── Scorer ──────────────────────────────────────────────────────────────────

/// Score every row of `table` against `key`.
///
/// Fails fast with [`wordgen_core::Error::MissingAnswerKey`] when a TDE row
/// carries an identified grade the key does not cover.
pub fn score_table(
  table: &RawTable,
  key: &AnswerKey,
  cfg: &RunConfig,
) -> Result<ScoreOutcome> {
  let mut records = Vec::with_capacity(table.rows.len());
  let mut domain_value_coerced = 0usize;
  let mut unknown_grade = 0usize;

  for raw in &table.rows {
    let student = Student::new(StudentIdentity::from_raw(
      &raw.name,
      &raw.school,
      &raw.class,
      raw.grade.as_deref(),
    ));
    let grade = student.identity.grade.clone();

    let scored: Vec<ItemScore> = match raw.kind {
      TestKind::Vocab => raw
        .answers
        .iter()
        .map(|a| grade_vocab(a.as_deref()))
        .collect(),
      TestKind::Tde => {
        if grade == GRADE_UNKNOWN {
          unknown_grade += 1;
          debug!(name = %student.identity.name, "TDE row without identifiable grade");
          vec![ItemScore::Missing; raw.answers.len()]
        } else {
          let entries = key.entries(&grade)?;
          (1..=raw.answers.len() as u8)
            .map(|q| {
              let answer = raw.answers[q as usize - 1].as_deref();
              match entries.iter().find(|e| e.question == q) {
                Some(entry) => score_tde(&entry.expected, answer),
                // Item column with no key entry: unscoreable.
                None => ItemScore::Missing,
              }
            })
            .collect()
        }
      }
    };

    let answered = scored
      .iter()
      .filter(|s| matches!(s, ItemScore::Value(_)))
      .count();
    domain_value_coerced += scored
      .iter()
      .filter(|s| matches!(s, ItemScore::OutOfDomain))
      .count();

    let items: Vec<Option<u32>> = scored
      .iter()
      .map(|s| match (s, cfg.blank_response_policy) {
        (ItemScore::Value(v), _) => Some(*v),
        (_, BlankResponsePolicy::Wrong) => Some(0),
        (_, BlankResponsePolicy::Missing) => None,
      })
      .collect();
    let score: u32 = items.iter().flatten().sum();

    records.push(ScoredRecord {
      student,
      phase: raw.phase,
      kind: raw.kind,
      moment: raw.moment,
      items,
      answered,
      score,
    });
  }

  Ok(ScoreOutcome {
    records,
    domain_value_coerced,
    unknown_grade,
  })
}

#[cfg(test)]
mod tests {
  use wordgen_core::{
    key::KeyEntry,
    record::{Moment, RawResponse},
  };

  use super::*;

  fn vocab_row(name: &str, answers: &[Option<&str>]) -> RawResponse {
    RawResponse {
      name:    name.to_string(),
      school:  "E1".to_string(),
      class:   "6A".to_string(),
      grade:   Some("6º ANO".to_string()),
      phase:   2,
      kind:    TestKind::Vocab,
      moment:  Moment::Pre,
      answers: answers.iter().map(|a| a.map(String::from)).collect(),
    }
  }

  fn tde_key() -> AnswerKey {
    let mut key = AnswerKey::new();
    key.insert_grade("6º ANO", vec![
      KeyEntry {
        question: 1,
        expected: "B".into(),
        skill:    "Ortografia".into(),
      },
      KeyEntry {
        question: 2,
        expected: "A".into(),
        skill:    "Acentuação".into(),
      },
    ]);
    key
  }

  #[test]
  fn vocab_sums_graded_values_and_counts_domain_coercions() {
    let table = RawTable {
      n_items: 3,
      rows:    vec![vocab_row("Ana", &[Some("2"), Some("9"), None])],
    };
    let outcome =
      score_table(&table, &AnswerKey::new(), &RunConfig::default()).unwrap();

    let rec = &outcome.records[0];
    assert_eq!(rec.score, 2);
    assert_eq!(rec.answered, 1);
    assert_eq!(rec.items, vec![Some(2), None, None]);
    assert_eq!(outcome.domain_value_coerced, 1);
  }

  #[test]
  fn tde_scores_against_key() {
    let table = RawTable {
      n_items: 2,
      rows:    vec![RawResponse {
        kind: TestKind::Tde,
        ..vocab_row("Bruno", &[Some("B"), Some("C")])
      }],
    };
    let outcome = score_table(&table, &tde_key(), &RunConfig::default()).unwrap();
    assert_eq!(outcome.records[0].items, vec![Some(1), Some(0)]);
    assert_eq!(outcome.records[0].score, 1);
  }

  #[test]
  fn tde_unknown_grade_is_counted_not_fatal() {
    let table = RawTable {
      n_items: 2,
      rows:    vec![RawResponse {
        kind: TestKind::Tde,
        grade: None,
        class: "manhã".to_string(),
        ..vocab_row("Carla", &[Some("B"), Some("A")])
      }],
    };
    let outcome = score_table(&table, &tde_key(), &RunConfig::default()).unwrap();
    assert_eq!(outcome.unknown_grade, 1);
    assert_eq!(outcome.records[0].answered, 0);
  }

  #[test]
  fn tde_missing_grade_in_key_is_fatal() {
    let table = RawTable {
      n_items: 2,
      rows:    vec![RawResponse {
        kind: TestKind::Tde,
        grade: Some("9º ANO".to_string()),
        ..vocab_row("Davi", &[Some("B"), None])
      }],
    };
    let err = score_table(&table, &tde_key(), &RunConfig::default()).unwrap_err();
    assert!(matches!(
      err,
      crate::Error::Core(wordgen_core::Error::MissingAnswerKey { .. })
    ));
  }

  #[test]
  fn blank_as_wrong_fills_zeroes_but_keeps_answered_count() {
    let cfg = RunConfig {
      blank_response_policy: BlankResponsePolicy::Wrong,
      ..RunConfig::default()
    };
    let table = RawTable {
      n_items: 3,
      rows:    vec![vocab_row("Ana", &[Some("2"), None, None])],
    };
    let outcome = score_table(&table, &AnswerKey::new(), &cfg).unwrap();
    let rec = &outcome.records[0];
    assert_eq!(rec.items, vec![Some(2), Some(0), Some(0)]);
    assert_eq!(rec.score, 2);
    assert_eq!(rec.answered, 1);
  }
}

//! Validity filtering.
//!
//! Sequenced filters over one phase's Pre and Pos rows. Each filter logs
//! rows-in/rows-out and increments a counter on the [`FilterReport`]; after
//! each step Pre and Pos are re-intersected so the two sides stay aligned.
//! Applying the whole sequence twice is a no-op.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::info;
use wordgen_core::{
  config::{DuplicatePolicy, RunConfig},
  record::{ScoredRecord, TestKind},
};

use crate::error::{Error, Result};

// ─── Report ──────────────────────────────────────────────────────────────────

/// Count-in/count-out summary of one phase's filtering, emitted alongside the
/// output tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterReport {
  pub kind:  String,
  pub phase: u8,

  pub rows_in_pre: usize,
  pub rows_in_pos: usize,

  /// Rows with every item missing (blank tests).
  pub blank_dropped:          usize,
  /// Extra Pre/Pos rows collapsed under `keep_first`.
  pub duplicates_kept_first:  usize,
  /// Students with Pre but no Pos in the phase, or vice versa.
  pub unpaired_dropped:       usize,
  /// Students below the minimum answered-items threshold on either side.
  pub insufficient_dropped:   usize,
  /// Responses outside the value domain, coerced to missing by the scorer.
  pub domain_value_coerced:   usize,
  /// TDE rows with no identifiable grade (unscoreable).
  pub unknown_grade:          usize,

  /// Paired students surviving every filter.
  pub students_out: usize,
}

// ─── Paired rows ─────────────────────────────────────────────────────────────

/// One phase's Pre and Pos rows after filtering: same students on both sides,
/// both sorted by `ID_Unico`.
#[derive(Debug)]
pub struct PairedRecords {
  pub pre: Vec<ScoredRecord>,
  pub pos: Vec<ScoredRecord>,
}

// ─── Filters ─────────────────────────────────────────────────────────────────

fn drop_blank(rows: Vec<ScoredRecord>, dropped: &mut usize) -> Vec<ScoredRecord> {
  let before = rows.len();
  let kept: Vec<_> = rows.into_iter().filter(|r| r.answered > 0).collect();
  *dropped += before - kept.len();
  kept
}

/// Keep the first-seen row per student (raw file order), or fail under
/// `strict_fail`.
fn dedupe(
  rows: Vec<ScoredRecord>,
  policy: DuplicatePolicy,
  kept_first: &mut usize,
) -> Result<Vec<ScoredRecord>> {
  let mut seen: BTreeSet<String> = BTreeSet::new();
  let mut kept = Vec::with_capacity(rows.len());
  for row in rows {
    if seen.insert(row.student.id_unico.clone()) {
      kept.push(row);
    } else {
      match policy {
        DuplicatePolicy::KeepFirst => *kept_first += 1,
        DuplicatePolicy::StrictFail => {
          return Err(Error::Core(wordgen_core::Error::DuplicateStudentPhase {
            id_unico: row.student.id_unico.clone(),
            phase:    row.phase,
            moment:   row.moment,
          }));
        }
      }
    }
  }
  Ok(kept)
}

fn ids(rows: &[ScoredRecord]) -> BTreeSet<String> {
  rows.iter().map(|r| r.student.id_unico.clone()).collect()
}

fn retain_ids(rows: Vec<ScoredRecord>, wanted: &BTreeSet<String>) -> Vec<ScoredRecord> {
  rows
    .into_iter()
    .filter(|r| wanted.contains(&r.student.id_unico))
    .collect()
}

/// Minimum answered items: `answered ≥ ⌈fraction · n_items⌉`.
fn meets_threshold(row: &ScoredRecord, n_items: usize, fraction: f64) -> bool {
  let required = (fraction * n_items as f64).ceil() as usize;
  row.answered >= required
}

// ─── Entry point ─────────────────────────────────────────────────────────────

/// Apply the full validity-filter sequence to one phase's Pre and Pos rows.
pub fn apply_filters(
  pre: Vec<ScoredRecord>,
  pos: Vec<ScoredRecord>,
  kind: TestKind,
  n_items: usize,
  cfg: &RunConfig,
  report: &mut FilterReport,
) -> Result<PairedRecords> {
  report.rows_in_pre = pre.len();
  report.rows_in_pos = pos.len();

  // 1. Blank tests.
  let pre = drop_blank(pre, &mut report.blank_dropped);
  let pos = drop_blank(pos, &mut report.blank_dropped);
  info!(
    stage = "blank",
    pre = pre.len(),
    pos = pos.len(),
    dropped = report.blank_dropped,
    "validity filter"
  );

  // 2. Duplicates per (student, phase, moment).
  let pre = dedupe(pre, cfg.duplicate_policy, &mut report.duplicates_kept_first)?;
  let pos = dedupe(pos, cfg.duplicate_policy, &mut report.duplicates_kept_first)?;
  info!(
    stage = "dedupe",
    pre = pre.len(),
    pos = pos.len(),
    kept_first = report.duplicates_kept_first,
    "validity filter"
  );

  // 3. Pre/Pos pairing.
  let pre_ids = ids(&pre);
  let pos_ids = ids(&pos);
  let paired: BTreeSet<String> = pre_ids.intersection(&pos_ids).cloned().collect();
  report.unpaired_dropped +=
    pre_ids.symmetric_difference(&pos_ids).count();
  let pre = retain_ids(pre, &paired);
  let pos = retain_ids(pos, &paired);
  info!(
    stage = "pairing",
    students = paired.len(),
    unpaired = report.unpaired_dropped,
    "validity filter"
  );

  // 4. Minimum answered items on both sides, then re-intersect.
  let fraction = cfg.min_answered_fraction(kind);
  let below: BTreeSet<String> = pre
    .iter()
    .chain(pos.iter())
    .filter(|r| !meets_threshold(r, n_items, fraction))
    .map(|r| r.student.id_unico.clone())
    .collect();
  report.insufficient_dropped += below.len();
  let keep: BTreeSet<String> = paired.difference(&below).cloned().collect();
  let mut pre = retain_ids(pre, &keep);
  let mut pos = retain_ids(pos, &keep);
  info!(
    stage = "min_items",
    students = keep.len(),
    insufficient = report.insufficient_dropped,
    "validity filter"
  );

  // 5. Deterministic order for everything downstream.
  pre.sort_by(|a, b| a.student.id_unico.cmp(&b.student.id_unico));
  pos.sort_by(|a, b| a.student.id_unico.cmp(&b.student.id_unico));

  report.students_out = pre.len();
  Ok(PairedRecords { pre, pos })
}

#[cfg(test)]
mod tests {
  use wordgen_core::{
    identity::{Student, StudentIdentity},
    record::Moment,
  };

  use super::*;

  fn row(name: &str, moment: Moment, items: &[Option<u32>]) -> ScoredRecord {
    let student = Student::new(StudentIdentity::from_raw(
      name,
      "E1",
      "6A",
      Some("6º ANO"),
    ));
    ScoredRecord {
      student,
      phase: 2,
      kind: TestKind::Vocab,
      moment,
      items: items.to_vec(),
      answered: items.iter().flatten().count(),
      score: items.iter().flatten().sum(),
    }
  }

  fn run(
    pre: Vec<ScoredRecord>,
    pos: Vec<ScoredRecord>,
    cfg: &RunConfig,
  ) -> (PairedRecords, FilterReport) {
    let mut report = FilterReport::default();
    let paired =
      apply_filters(pre, pos, TestKind::Vocab, 2, cfg, &mut report).unwrap();
    (paired, report)
  }

  #[test]
  fn drops_blank_rows() {
    let pre = vec![
      row("Ana", Moment::Pre, &[None, None]),
      row("Bia", Moment::Pre, &[Some(1), Some(0)]),
    ];
    let pos = vec![
      row("Ana", Moment::Pos, &[Some(1), Some(1)]),
      row("Bia", Moment::Pos, &[Some(2), Some(1)]),
    ];
    let (paired, report) = run(pre, pos, &RunConfig::default());
    assert_eq!(report.blank_dropped, 1);
    // Ana's blank Pre removed her pairing entirely.
    assert_eq!(paired.pre.len(), 1);
    assert_eq!(paired.pre[0].student.identity.name, "BIA");
  }

  #[test]
  fn keep_first_collapses_duplicates() {
    let pre = vec![
      row("Ana", Moment::Pre, &[Some(2), Some(1)]),
      row("Ana", Moment::Pre, &[Some(0), Some(0)]),
    ];
    let pos = vec![row("Ana", Moment::Pos, &[Some(1), Some(1)])];
    let (paired, report) = run(pre, pos, &RunConfig::default());
    assert_eq!(report.duplicates_kept_first, 1);
    assert_eq!(paired.pre[0].score, 3);
  }

  #[test]
  fn strict_fail_rejects_duplicates() {
    let cfg = RunConfig {
      duplicate_policy: DuplicatePolicy::StrictFail,
      ..RunConfig::default()
    };
    let pre = vec![
      row("Ana", Moment::Pre, &[Some(2), None]),
      row("Ana", Moment::Pre, &[Some(1), None]),
    ];
    let pos = vec![row("Ana", Moment::Pos, &[Some(1), None])];
    let mut report = FilterReport::default();
    let err =
      apply_filters(pre, pos, TestKind::Vocab, 2, &cfg, &mut report).unwrap_err();
    assert!(matches!(
      err,
      Error::Core(wordgen_core::Error::DuplicateStudentPhase { .. })
    ));
  }

  #[test]
  fn unpaired_students_are_dropped_and_counted() {
    let pre = vec![
      row("Ana", Moment::Pre, &[Some(1), Some(0)]),
      row("Caio", Moment::Pre, &[Some(2), Some(2)]),
    ];
    let pos = vec![row("Ana", Moment::Pos, &[Some(2), Some(1)])];
    let (paired, report) = run(pre, pos, &RunConfig::default());
    assert_eq!(report.unpaired_dropped, 1);
    assert_eq!(paired.pre.len(), 1);
    assert_eq!(paired.pos.len(), 1);
  }

  #[test]
  fn threshold_applies_to_both_sides() {
    // Vocabulary default threshold is 80% of 2 items → 2 answered required.
    let pre = vec![row("Ana", Moment::Pre, &[Some(1), Some(2)])];
    let pos = vec![row("Ana", Moment::Pos, &[Some(1), None])];
    let (paired, report) = run(pre, pos, &RunConfig::default());
    assert_eq!(report.insufficient_dropped, 1);
    assert!(paired.pre.is_empty());
    assert!(paired.pos.is_empty());
  }

  #[test]
  fn filter_is_idempotent() {
    let pre = vec![
      row("Ana", Moment::Pre, &[Some(1), Some(2)]),
      row("Bia", Moment::Pre, &[None, None]),
      row("Caio", Moment::Pre, &[Some(2), Some(2)]),
    ];
    let pos = vec![
      row("Ana", Moment::Pos, &[Some(2), Some(2)]),
      row("Caio", Moment::Pos, &[Some(0), Some(1)]),
    ];
    let cfg = RunConfig::default();
    let (first, _) = run(pre, pos, &cfg);
    let ids_once: Vec<_> = first.pre.iter().map(|r| r.student.id_unico.clone()).collect();

    let (second, report) = run(first.pre, first.pos, &cfg);
    let ids_twice: Vec<_> = second.pre.iter().map(|r| r.student.id_unico.clone()).collect();
    assert_eq!(ids_once, ids_twice);
    assert_eq!(report.blank_dropped, 0);
    assert_eq!(report.unpaired_dropped, 0);
    assert_eq!(report.insufficient_dropped, 0);
  }
}

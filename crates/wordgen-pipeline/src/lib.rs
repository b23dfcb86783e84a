//! The WordGen pipeline stages.
//!
//! Stages run strictly in sequence, each taking owned tables and returning
//! owned tables:
//!
//!   raw Pre + Pos tables
//!     └─ score_table()        → Vec<ScoredRecord>
//!          └─ apply_filters() → PairedRecords
//!               └─ pivot_phase() → Vec<PhaseRecord>   (one phase, wide)
//!                    └─ join_longitudinal() → the longitudinal table
//!                         └─ aggregate() → ResumoBundle
//!
//! [`build_phase_table`] bundles the first three stages for one phase.

pub mod aggregate;
pub mod artifact;
pub mod error;
pub mod filter;
pub mod join;
pub mod pivot;
pub mod score;

pub use aggregate::aggregate;
pub use error::{Error, Result};
pub use filter::{FilterReport, PairedRecords, apply_filters};
pub use join::join_longitudinal;
pub use pivot::{extend_template, pivot_phase};
pub use score::{ScoreOutcome, score_table};

use wordgen_core::{
  config::RunConfig,
  key::AnswerKey,
  record::{PhaseRecord, TestKind},
};
use wordgen_ingest::RawTable;

/// One phase's paired wide table plus its filtering summary.
#[derive(Debug)]
pub struct PhaseOutcome {
  pub records: Vec<PhaseRecord>,
  pub report:  FilterReport,
}

/// Score, filter and pivot one phase's Pre and Pos raw tables.
pub fn build_phase_table(
  pre: &RawTable,
  pos: &RawTable,
  kind: TestKind,
  phase: u8,
  key: &AnswerKey,
  cfg: &RunConfig,
) -> Result<PhaseOutcome> {
  let pre_scored = score_table(pre, key, cfg)?;
  let pos_scored = score_table(pos, key, cfg)?;

  let mut report = FilterReport {
    kind: kind.label().to_string(),
    phase,
    domain_value_coerced: pre_scored.domain_value_coerced
      + pos_scored.domain_value_coerced,
    unknown_grade: pre_scored.unknown_grade + pos_scored.unknown_grade,
    ..FilterReport::default()
  };

  let n_items = pre.n_items.max(pos.n_items);
  let paired = apply_filters(
    pre_scored.records,
    pos_scored.records,
    kind,
    n_items,
    cfg,
    &mut report,
  )?;

  let template = extend_template(key.column_template(), n_items);
  let records = pivot_phase(&paired, &template, kind, cfg)?;

  Ok(PhaseOutcome { records, report })
}

//! Error types for `wordgen-core`.
//!
//! Only conditions that abort a pipeline run live here. Recoverable events
//! (unpaired students, insufficient items, out-of-domain responses) are
//! counters on the filter report, not errors.

use thiserror::Error;

use crate::record::Moment;

#[derive(Debug, Error)]
pub enum Error {
  /// The answer key has no entry for a grade observed in the data.
  #[error("no answer key for grade {grade:?}")]
  MissingAnswerKey { grade: String },

  /// The same `ID_Unico` maps to more than one identity tuple.
  #[error("identity collision on {id_unico}: {identities:?}")]
  IdentityCollision {
    id_unico:   String,
    identities: Vec<String>,
  },

  /// Multiple Pre (or Pos) rows for one student-phase under `strict_fail`.
  #[error("duplicate {moment} rows for student {id_unico} in phase {phase}")]
  DuplicateStudentPhase {
    id_unico: String,
    phase:    u8,
    moment:   Moment,
  },

  #[error("serialization error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

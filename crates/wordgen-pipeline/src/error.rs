//! Error type for `wordgen-pipeline`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] wordgen_core::Error),

  #[error("ingest error: {0}")]
  Ingest(#[from] wordgen_ingest::Error),

  /// A student appears twice in one phase after the validity filter.
  /// The filter guarantees uniqueness, so this is a pipeline bug.
  #[error("student {id_unico} appears twice in phase {phase} after filtering")]
  PhaseCollision { id_unico: String, phase: u8 },

  /// An artifact being read back does not match the expected schema.
  #[error("malformed artifact: {0}")]
  MalformedArtifact(String),

  #[error("CSV error: {0}")]
  Csv(#[from] csv::Error),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

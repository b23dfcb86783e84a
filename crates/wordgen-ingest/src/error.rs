//! Error types for the wordgen-ingest codecs.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A required column is absent from the raw table header.
  #[error("input table is missing required column: {column}")]
  SchemaMismatch { column: String },

  /// The table parsed but contains no data rows.
  #[error("input table has a header but no data rows")]
  EmptyTable,

  /// The answer-key document does not match either known shape.
  #[error("invalid answer key: {0}")]
  InvalidAnswerKey(String),

  #[error("CSV error: {0}")]
  Csv(#[from] csv::Error),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! Error types for `wordgen-names`.
//!
//! Every error here is recoverable at the inference layer: a failed or
//! timed-out LLM call falls through to the next configured method and never
//! aborts the pipeline.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("ANTHROPIC_API_KEY is not set")]
  MissingApiKey,

  #[error("classification timed out for {name}")]
  Timeout { name: String },

  #[error("unparsable classification reply: {0:?}")]
  UnparsableReply(String),

  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! LLM-assisted name classification.
//!
//! One request per name against an Anthropic-style messages endpoint, with a
//! per-name timeout and bounded concurrency. Workers share no mutable state;
//! any failure is logged and the name falls through to the next configured
//! method.

use std::{collections::BTreeMap, env, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::{sync::Semaphore, task::JoinSet, time::timeout};
use tracing::{debug, warn};
use wordgen_core::{config::LlmSettings, record::Sex};

use crate::error::{Error, Result};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Confidence assigned to every accepted LLM classification.
pub const LLM_CONFIDENCE: f64 = 0.85;

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct MessagesRequest {
  model:      String,
  max_tokens: usize,
  messages:   Vec<Message>,
}

#[derive(Serialize)]
struct Message {
  role:    &'static str,
  content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
  content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
  text: String,
}

// ─── Classifier ──────────────────────────────────────────────────────────────

/// HTTP client for the classification endpoint. Cheap to clone — the inner
/// [`reqwest::Client`] is `Arc`-based.
#[derive(Clone, Debug)]
pub struct LlmClassifier {
  client:   reqwest::Client,
  api_key:  String,
  model:    String,
  deadline: Duration,
  workers:  usize,
}

impl LlmClassifier {
  /// Build a classifier from settings, reading `ANTHROPIC_API_KEY`.
  pub fn from_env(settings: &LlmSettings) -> Result<Self> {
    let api_key = env::var("ANTHROPIC_API_KEY")
      .ok()
      .filter(|k| !k.is_empty())
      .ok_or(Error::MissingApiKey)?;
    Ok(Self {
      client: reqwest::Client::new(),
      api_key,
      model: settings.model.clone(),
      deadline: Duration::from_secs(settings.timeout_secs),
      workers: settings.workers.max(1),
    })
  }

  /// Classify one name, bounded by the per-name deadline.
  pub async fn classify(&self, name: &str) -> Result<Sex> {
    match timeout(self.deadline, self.call(name)).await {
      Ok(result) => result,
      Err(_) => Err(Error::Timeout {
        name: name.to_string(),
      }),
    }
  }

  async fn call(&self, name: &str) -> Result<Sex> {
    let prompt = format!(
      "The Brazilian Portuguese given name is {name:?}. Is it most commonly \
       a male or a female name in Brazil? Reply with exactly one letter: \
       M for male, F for female, or I if it is genuinely ambiguous."
    );
    let request = MessagesRequest {
      model:      self.model.clone(),
      max_tokens: 8,
      messages:   vec![Message {
        role:    "user",
        content: prompt,
      }],
    };

    let response = self
      .client
      .post(API_URL)
      .header("x-api-key", &self.api_key)
      .header("anthropic-version", API_VERSION)
      .json(&request)
      .send()
      .await?
      .error_for_status()?
      .json::<MessagesResponse>()
      .await?;

    let text = response
      .content
      .first()
      .map(|block| block.text.as_str())
      .unwrap_or_default();
    parse_verdict(text).ok_or_else(|| Error::UnparsableReply(text.to_string()))
  }

  /// Classify a batch with bounded concurrency. Failures are logged and
  /// omitted from the result.
  pub async fn classify_batch(&self, names: &[String]) -> BTreeMap<String, Sex> {
    let semaphore = Arc::new(Semaphore::new(self.workers));
    let mut tasks: JoinSet<(String, Result<Sex>)> = JoinSet::new();

    for name in names {
      let classifier = self.clone();
      let semaphore = Arc::clone(&semaphore);
      let name = name.clone();
      tasks.spawn(async move {
        let Ok(_permit) = semaphore.acquire_owned().await else {
          return (
            name.clone(),
            Err(Error::UnparsableReply("semaphore closed".to_string())),
          );
        };
        let verdict = classifier.classify(&name).await;
        (name, verdict)
      });
    }

    let mut results = BTreeMap::new();
    while let Some(joined) = tasks.join_next().await {
      let Ok((name, verdict)) = joined else {
        continue;
      };
      match verdict {
        Ok(sex) => {
          debug!(name = %name, ?sex, "LLM classification");
          results.insert(name, sex);
        }
        Err(err) => {
          warn!(name = %name, %err, "LLM classification failed, falling through");
        }
      }
    }
    results
  }
}

/// First decisive letter of the reply → verdict. `I` (ambiguous) yields
/// `Indeterminate`, which is not a positive classification.
pub(crate) fn parse_verdict(text: &str) -> Option<Sex> {
  match text.trim().chars().next()? {
    'M' | 'm' => Some(Sex::M),
    'F' | 'f' => Some(Sex::F),
    'I' | 'i' => Some(Sex::Indeterminate),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn verdict_parsing() {
    assert_eq!(parse_verdict("M"), Some(Sex::M));
    assert_eq!(parse_verdict(" f\n"), Some(Sex::F));
    assert_eq!(parse_verdict("I (could be either)"), Some(Sex::Indeterminate));
    assert_eq!(parse_verdict("unsure"), None);
    assert_eq!(parse_verdict(""), None);
  }

  #[test]
  fn missing_api_key_is_an_error() {
    // Safety net for CI environments that do carry a key.
    if env::var("ANTHROPIC_API_KEY").is_ok() {
      return;
    }
    let err = LlmClassifier::from_env(&LlmSettings::default()).unwrap_err();
    assert!(matches!(err, Error::MissingApiKey));
  }
}

//! Sex inference over distinct first names.
//!
//! Pipeline, in configured priority order:
//!   manual overrides → LLM pass (opt-in) → dictionary → suffix heuristics
//!
//! A positive classification (M or F) from a higher-priority method shadows
//! every lower-priority one; Indeterminate is never positive. The LLM pass
//! is the only asynchronous stage and only runs for names the methods ranked
//! above it left unresolved.

pub mod dictionary;
pub mod error;
mod llm;
mod suffix;

use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, warn};
use wordgen_core::{
  config::{SexInferenceConfig, SexInferenceMode, SexMethod},
  normalize::first_name,
  record::{PhaseRecord, Sex},
};

pub use dictionary::{DICTIONARY_THRESHOLD, Dictionary, GenderClass};
pub use error::{Error, Result};
pub use llm::{LLM_CONFIDENCE, LlmClassifier};
pub use suffix::{SUFFIX_CONFIDENCE, classify_suffix};

// ─── Result type ─────────────────────────────────────────────────────────────

/// One name's inference result. `method` is `None` only for Indeterminate.
#[derive(Debug, Clone, PartialEq)]
pub struct SexCall {
  pub sex:        Sex,
  pub confidence: f64,
  pub method:     Option<SexMethod>,
}

impl SexCall {
  fn indeterminate() -> Self {
    Self {
      sex:        Sex::Indeterminate,
      confidence: 0.0,
      method:     None,
    }
  }
}

// ─── Inferer ─────────────────────────────────────────────────────────────────

/// Stateless orchestrator over the configured methods.
pub struct SexInferer {
  cfg:        SexInferenceConfig,
  dictionary: Dictionary,
  llm:        Option<LlmClassifier>,
}

impl SexInferer {
  /// Build an inferer for `cfg` with the embedded dictionary. When the mode
  /// asks for the LLM pass but no API key is available, the pass is disabled
  /// with a warning rather than failing the run.
  pub fn new(cfg: SexInferenceConfig) -> Self {
    Self::with_dictionary(cfg, Dictionary::embedded())
  }

  pub fn with_dictionary(cfg: SexInferenceConfig, dictionary: Dictionary) -> Self {
    let llm = if cfg.mode == SexInferenceMode::FullWithLlm {
      match LlmClassifier::from_env(&cfg.llm) {
        Ok(classifier) => Some(classifier),
        Err(err) => {
          warn!(%err, "LLM pass disabled");
          None
        }
      }
    } else {
      None
    };
    Self {
      cfg,
      dictionary,
      llm,
    }
  }

  fn method_enabled(&self, method: SexMethod) -> bool {
    match self.cfg.mode {
      SexInferenceMode::Off => false,
      SexInferenceMode::DictionaryOnly => {
        matches!(method, SexMethod::Manual | SexMethod::Dictionary)
      }
      SexInferenceMode::DictionaryPlusHeuristics => !matches!(method, SexMethod::Llm),
      SexInferenceMode::FullWithLlm => true,
    }
  }

  fn resolve_sync(&self, name: &str, method: SexMethod) -> Option<SexCall> {
    match method {
      SexMethod::Manual => {
        let sex = *self.cfg.manual_overrides.get(name)?;
        (sex != Sex::Indeterminate).then(|| SexCall {
          sex,
          confidence: 1.0,
          method: Some(SexMethod::Manual),
        })
      }
      SexMethod::Dictionary => {
        let (class, confidence) = self.dictionary.lookup(name)?;
        if confidence < DICTIONARY_THRESHOLD {
          return None;
        }
        class.sex().map(|sex| SexCall {
          sex,
          confidence,
          method: Some(SexMethod::Dictionary),
        })
      }
      SexMethod::Heuristics => {
        classify_suffix(name, &self.cfg).map(|sex| SexCall {
          sex,
          confidence: SUFFIX_CONFIDENCE,
          method: Some(SexMethod::Heuristics),
        })
      }
      SexMethod::Llm => None,
    }
  }

  /// Infer sex for every name in `names`. Unless the mode is `Off` (empty
  /// result), every input name gets an entry; names no method resolves come
  /// back Indeterminate.
  pub async fn infer(&self, names: &BTreeSet<String>) -> BTreeMap<String, SexCall> {
    let mut calls: BTreeMap<String, SexCall> = BTreeMap::new();
    if self.cfg.mode == SexInferenceMode::Off {
      return calls;
    }

    for method in &self.cfg.priority_order {
      if !self.method_enabled(*method) {
        continue;
      }

      if *method == SexMethod::Llm {
        let Some(classifier) = &self.llm else {
          continue;
        };
        let pending: Vec<String> = names
          .iter()
          .filter(|n| !calls.contains_key(*n))
          .cloned()
          .collect();
        if pending.is_empty() {
          continue;
        }
        for (name, sex) in classifier.classify_batch(&pending).await {
          if sex != Sex::Indeterminate {
            calls.insert(name, SexCall {
              sex,
              confidence: LLM_CONFIDENCE,
              method: Some(SexMethod::Llm),
            });
          }
        }
        continue;
      }

      for name in names {
        if calls.contains_key(name) {
          continue;
        }
        if let Some(call) = self.resolve_sync(name, *method) {
          calls.insert(name.clone(), call);
        }
      }
    }

    for name in names {
      calls
        .entry(name.clone())
        .or_insert_with(SexCall::indeterminate);
    }

    info!(
      names = names.len(),
      resolved = calls.values().filter(|c| c.method.is_some()).count(),
      "sex inference finished"
    );
    calls
  }
}

// ─── Record application ──────────────────────────────────────────────────────

/// Write inference results into the longitudinal rows, keyed by the first
/// part of each row's normalized name.
pub fn apply_to_records(records: &mut [PhaseRecord], calls: &BTreeMap<String, SexCall>) {
  for record in records {
    let Some(call) = calls.get(first_name(&record.nome)) else {
      continue;
    };
    record.sexo = Some(call.sex);
    record.sexo_confianca = Some(call.confidence);
    record.sexo_metodo = call.method.map(|m| m.label().to_string());
  }
}

/// The distinct first names of a longitudinal table.
pub fn distinct_first_names(records: &[PhaseRecord]) -> BTreeSet<String> {
  records
    .iter()
    .map(|r| first_name(&r.nome).to_string())
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn names(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| s.to_string()).collect()
  }

  fn cfg(mode: SexInferenceMode) -> SexInferenceConfig {
    SexInferenceConfig {
      mode,
      ..SexInferenceConfig::default()
    }
  }

  #[tokio::test]
  async fn manual_override_shadows_dictionary() {
    // The dictionary is wrong about ADRYEL on purpose; manual must win.
    let mut dict = Dictionary::embedded();
    dict.insert("ADRYEL", GenderClass::F, 0.90);

    let mut config = cfg(SexInferenceMode::DictionaryOnly);
    config.manual_overrides.insert("ADRYEL".into(), Sex::M);

    let inferer = SexInferer::with_dictionary(config, dict);
    let calls = inferer.infer(&names(&["ADRYEL"])).await;

    let call = &calls["ADRYEL"];
    assert_eq!(call.sex, Sex::M);
    assert_eq!(call.method, Some(SexMethod::Manual));
  }

  #[tokio::test]
  async fn dictionary_resolves_before_heuristics() {
    // JONAS is a suffix-rule trap; the dictionary knows it is masculine and
    // outranks the heuristics by default.
    let inferer = SexInferer::new(cfg(SexInferenceMode::DictionaryPlusHeuristics));
    let calls = inferer.infer(&names(&["JONAS", "ADRIELA"])).await;

    assert_eq!(calls["JONAS"].sex, Sex::M);
    assert_eq!(calls["JONAS"].method, Some(SexMethod::Dictionary));

    // ADRIELA is not in the dictionary; the suffix rule picks it up.
    assert_eq!(calls["ADRIELA"].sex, Sex::F);
    assert_eq!(calls["ADRIELA"].method, Some(SexMethod::Heuristics));
    assert!((calls["ADRIELA"].confidence - SUFFIX_CONFIDENCE).abs() < 1e-12);
  }

  #[tokio::test]
  async fn dictionary_only_leaves_tail_indeterminate() {
    let inferer = SexInferer::new(cfg(SexInferenceMode::DictionaryOnly));
    let calls = inferer.infer(&names(&["ADRIELA"])).await;

    assert_eq!(calls["ADRIELA"].sex, Sex::Indeterminate);
    assert_eq!(calls["ADRIELA"].method, None);
  }

  #[tokio::test]
  async fn off_mode_produces_nothing() {
    let inferer = SexInferer::new(cfg(SexInferenceMode::Off));
    assert!(inferer.infer(&names(&["MARIA"])).await.is_empty());
  }

  #[tokio::test]
  async fn ambiguous_dictionary_names_fall_through() {
    let inferer = SexInferer::new(cfg(SexInferenceMode::DictionaryPlusHeuristics));
    let calls = inferer.infer(&names(&["ARIEL"])).await;
    // Ambiguous in the dictionary, so the heuristics get their chance; the
    // masculine "el" ending decides.
    assert_eq!(calls["ARIEL"].method, Some(SexMethod::Heuristics));
    assert_eq!(calls["ARIEL"].sex, Sex::M);
  }
}

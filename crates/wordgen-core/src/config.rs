//! Run configuration, deserialised from the TOML configuration document.
//!
//! Every knob has a default so an empty document is a valid run. The CLI
//! loads this through the `config` crate; library code only ever sees the
//! deserialised [`RunConfig`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::record::{Sex, TestKind};

// ─── Policy enums ────────────────────────────────────────────────────────────

/// How grade years are grouped into band tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GradeBandPolicy {
  /// {5,6,7} → `"6º/7º anos"`, {8,9} → `"8º/9º anos"`.
  #[default]
  #[serde(rename = "6-7_vs_8-9")]
  SixSevenVsEightNine,
}

/// What to do with multiple Pre (or Pos) rows for one student-phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
  /// Keep the first-seen row (raw file insertion order), count the rest.
  #[default]
  KeepFirst,
  /// Abort the run on the first duplicate.
  StrictFail,
}

/// How unanswered items enter the per-student sums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlankResponsePolicy {
  /// Blank stays missing: excluded from sums and item deltas.
  #[default]
  Missing,
  /// Blank is replaced with 0 before summation.
  Wrong,
}

/// Which sex-inference stages run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SexInferenceMode {
  #[default]
  Off,
  DictionaryOnly,
  DictionaryPlusHeuristics,
  FullWithLlm,
}

/// A sex-inference method, in the sense of the priority order: a positive
/// classification from an earlier method shadows every later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SexMethod {
  Manual,
  Llm,
  Dictionary,
  Heuristics,
}

impl SexMethod {
  pub fn label(self) -> &'static str {
    match self {
      Self::Manual => "manual",
      Self::Llm => "llm",
      Self::Dictionary => "dictionary",
      Self::Heuristics => "heuristics",
    }
  }
}

// ─── Sex-inference block ─────────────────────────────────────────────────────

/// LLM settings for the opt-in inference pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
  pub model:        String,
  /// Per-name timeout; expiry falls through to the next method.
  pub timeout_secs: u64,
  /// Bounded concurrency for name classification requests.
  pub workers:      usize,
}

impl Default for LlmSettings {
  fn default() -> Self {
    Self {
      model:        "claude-3-5-haiku-20241022".to_string(),
      timeout_secs: 10,
      workers:      1,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SexInferenceConfig {
  pub mode:               SexInferenceMode,
  pub priority_order:     Vec<SexMethod>,
  /// Explicit first-name → sex entries; these win unconditionally when
  /// `manual` leads the priority order (the default).
  pub manual_overrides:   BTreeMap<String, Sex>,
  pub feminine_suffixes:  Vec<String>,
  pub masculine_suffixes: Vec<String>,
  /// Names the suffix rules must not touch (e.g. masculine names ending in
  /// a feminine suffix).
  pub suffix_exceptions:  Vec<String>,
  pub llm:                LlmSettings,
}

impl Default for SexInferenceConfig {
  fn default() -> Self {
    Self {
      mode:               SexInferenceMode::Off,
      priority_order:     vec![
        SexMethod::Manual,
        SexMethod::Llm,
        SexMethod::Dictionary,
        SexMethod::Heuristics,
      ],
      manual_overrides:   BTreeMap::new(),
      feminine_suffixes:  ["a", "ana", "ela", "ila", "ina", "ine", "elly", "elle"]
        .map(String::from)
        .to_vec(),
      masculine_suffixes: ["o", "eu", "el", "il", "im", "son", "ton", "ardo", "er"]
        .map(String::from)
        .to_vec(),
      suffix_exceptions:  ["LUCA", "JONAS", "ELIAS", "MATIAS", "MESSIAS", "ISAIAS"]
        .map(String::from)
        .to_vec(),
      llm:                LlmSettings::default(),
    }
  }
}

// ─── Run configuration ───────────────────────────────────────────────────────

/// The full configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
  /// Phase id → calendar year (TOML table keys are strings).
  pub phases: BTreeMap<String, i32>,

  pub min_answered_fraction_vocab: f64,
  pub min_answered_fraction_tde:   f64,

  pub grade_band_policy:     GradeBandPolicy,
  pub duplicate_policy:      DuplicatePolicy,
  pub blank_response_policy: BlankResponsePolicy,

  /// Strata below this `n` are emitted with `low_n = true`, never dropped.
  pub low_n_floor: usize,

  pub sex_inference: SexInferenceConfig,
}

impl Default for RunConfig {
  fn default() -> Self {
    Self {
      phases:                      BTreeMap::new(),
      min_answered_fraction_vocab: 0.80,
      min_answered_fraction_tde:   0.25,
      grade_band_policy:           GradeBandPolicy::default(),
      duplicate_policy:            DuplicatePolicy::default(),
      blank_response_policy:       BlankResponsePolicy::default(),
      low_n_floor:                 10,
      sex_inference:               SexInferenceConfig::default(),
    }
  }
}

impl RunConfig {
  /// Calendar year for a phase, if the document maps it.
  pub fn year_for(&self, phase: u8) -> Option<i32> {
    self.phases.get(&phase.to_string()).copied()
  }

  /// Minimum answered-item fraction for a kind.
  pub fn min_answered_fraction(&self, kind: TestKind) -> f64 {
    match kind {
      TestKind::Tde => self.min_answered_fraction_tde,
      TestKind::Vocab => self.min_answered_fraction_vocab,
    }
  }
}

//! Descriptive statistics and effect-size machinery.
//!
//! The pooled-SD form of Cohen's d is the only one implemented; the paired
//! delta-SD variant seen in some historical outputs is not. `d` is missing —
//! never zero — when the pooled SD is zero or n < 2.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Benchmarks ──────────────────────────────────────────────────────────────

/// Hattie's "zone of desired effects" threshold.
pub const HATTIE_THRESHOLD: f64 = 0.40;
/// Domain benchmark for vocabulary interventions.
pub const VOCAB_THRESHOLD: f64 = 0.35;
/// Domain benchmark for TDE (writing) interventions.
pub const TDE_THRESHOLD: f64 = 0.40;

// ─── Scalar helpers ──────────────────────────────────────────────────────────

pub fn mean(xs: &[f64]) -> Option<f64> {
  if xs.is_empty() {
    return None;
  }
  Some(xs.iter().sum::<f64>() / xs.len() as f64)
}

/// Sample standard deviation (ddof = 1). `None` when n < 2.
pub fn sd_sample(xs: &[f64]) -> Option<f64> {
  if xs.len() < 2 {
    return None;
  }
  let m = mean(xs)?;
  let ss: f64 = xs.iter().map(|x| (x - m).powi(2)).sum();
  Some((ss / (xs.len() - 1) as f64).sqrt())
}

/// Pooled SD of two paired samples of equal size `n`:
/// `√(((n−1)·sd_pre² + (n−1)·sd_pos²) / (2n − 2))`.
pub fn pooled_sd(sd_pre: f64, sd_pos: f64, n: usize) -> Option<f64> {
  if n < 2 {
    return None;
  }
  let df = (n - 1) as f64;
  let pooled =
    ((df * sd_pre.powi(2) + df * sd_pos.powi(2)) / (2.0 * df)).sqrt();
  Some(pooled)
}

/// Cohen's d = (mean_pos − mean_pre) / pooled_sd; missing when the pooled SD
/// is zero or undefined.
pub fn cohen_d(mean_pre: f64, mean_pos: f64, pooled_sd: Option<f64>) -> Option<f64> {
  match pooled_sd {
    Some(sd) if sd > 0.0 => Some((mean_pos - mean_pre) / sd),
    _ => None,
  }
}

// ─── Magnitude classification ────────────────────────────────────────────────

/// Cohen's conventional magnitude bands over |d|.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectMagnitude {
  Trivial,
  Small,
  Medium,
  Large,
}

impl EffectMagnitude {
  pub fn classify(d: f64) -> Self {
    let abs = d.abs();
    if abs < 0.2 {
      Self::Trivial
    } else if abs < 0.5 {
      Self::Small
    } else if abs < 0.8 {
      Self::Medium
    } else {
      Self::Large
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::Trivial => "trivial",
      Self::Small => "small",
      Self::Medium => "medium",
      Self::Large => "large",
    }
  }
}

// ─── Stratum statistics ──────────────────────────────────────────────────────

/// Descriptive statistics for one stratum of the longitudinal table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StratumStats {
  /// Stratum key components, e.g. `{"fase": "2", "escola": "E1"}`.
  pub stratum: BTreeMap<String, String>,

  pub n:          usize,
  pub mean_pre:   f64,
  pub sd_pre:     Option<f64>,
  pub mean_pos:   f64,
  pub sd_pos:     Option<f64>,
  pub mean_delta: f64,

  pub cohen_d:        Option<f64>,
  pub classification: Option<EffectMagnitude>,

  // Benchmark tags, not gates.
  pub hattie_ok:         Option<bool>,
  pub vocab_significant: Option<bool>,
  pub tde_good:          Option<bool>,

  pub pct_improved: f64,
  pub pct_declined: f64,
  pub pct_stable:   f64,

  /// `n` is below the configured floor; the row is still emitted.
  pub low_n: bool,
}

impl StratumStats {
  /// Compute all statistics for one stratum of paired scores.
  ///
  /// `pre` and `pos` are parallel slices (same student at the same index).
  /// Callers must not pass empty slices; the aggregator only creates strata
  /// from at least one row.
  pub fn compute(
    stratum: BTreeMap<String, String>,
    pre: &[f64],
    pos: &[f64],
    low_n_floor: usize,
  ) -> Self {
    debug_assert_eq!(pre.len(), pos.len());
    let n = pre.len();

    let mean_pre = mean(pre).unwrap_or(0.0);
    let mean_pos = mean(pos).unwrap_or(0.0);
    let sd_pre = sd_sample(pre);
    let sd_pos = sd_sample(pos);

    let deltas: Vec<f64> = pre.iter().zip(pos).map(|(a, b)| b - a).collect();
    let mean_delta = mean(&deltas).unwrap_or(0.0);

    let pooled = match (sd_pre, sd_pos) {
      (Some(a), Some(b)) => pooled_sd(a, b, n),
      _ => None,
    };
    let d = cohen_d(mean_pre, mean_pos, pooled);

    let improved = deltas.iter().filter(|v| **v > 0.0).count();
    let declined = deltas.iter().filter(|v| **v < 0.0).count();
    let stable = n - improved - declined;
    let pct = |count: usize| 100.0 * count as f64 / n as f64;

    Self {
      stratum,
      n,
      mean_pre,
      sd_pre,
      mean_pos,
      sd_pos,
      mean_delta,
      cohen_d: d,
      classification: d.map(EffectMagnitude::classify),
      hattie_ok: d.map(|d| d >= HATTIE_THRESHOLD),
      vocab_significant: d.map(|d| d >= VOCAB_THRESHOLD),
      tde_good: d.map(|d| d >= TDE_THRESHOLD),
      pct_improved: pct(improved),
      pct_declined: pct(declined),
      pct_stable: pct(stable),
      low_n: n < low_n_floor,
    }
  }
}

// ─── Item and skill breakdowns ───────────────────────────────────────────────

/// Aggregate over one item column, across every row where both sides of the
/// pair are present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemStats {
  pub question:     u8,
  pub slug:         String,
  /// Rows with both Pre and Pos non-missing for this item.
  pub n_valid:      usize,
  pub mean_pre:     f64,
  pub mean_pos:     f64,
  pub mean_delta:   f64,
  pub pct_improved: f64,
  pub pct_declined: f64,
  pub pct_stable:   f64,
}

/// Subtotal over all items sharing one skill slug. For vocabulary each word
/// is its own skill, so this collapses to the item breakdown; TDE skills
/// group several questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillStats {
  pub slug:       String,
  pub questions:  Vec<u8>,
  pub n_valid:    usize,
  pub mean_delta: f64,
  pub pct_improved: f64,
}

// ─── Resumo bundle ───────────────────────────────────────────────────────────

/// The per-stratum statistics artifact, keyed by stratum type
/// (`"geral"`, `"fase"`, `"fase_escola"`, …), with item-level and
/// skill-level breakdowns alongside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumoBundle {
  /// Assessment label (`"TDE"` or `"Vocabulario"`).
  pub kind:         String,
  pub generated_at: DateTime<Utc>,
  pub low_n_floor:  usize,
  pub strata:       BTreeMap<String, Vec<StratumStats>>,
  pub items:        Vec<ItemStats>,
  pub skills:       Vec<SkillStats>,
}

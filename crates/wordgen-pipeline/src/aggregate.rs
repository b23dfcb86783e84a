//! Per-stratum aggregation.
//!
//! Read-only over the longitudinal table: groups rows by each stratum type,
//! computes descriptive statistics and Cohen's d per group, and bundles the
//! result keyed by stratum type. Strata below the configured `n` floor are
//! emitted with `low_n = true`, never dropped.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use tracing::info;
use wordgen_core::{
  config::RunConfig,
  record::{PhaseRecord, TestKind},
  stats::{ItemStats, ResumoBundle, SkillStats, StratumStats, mean},
};

// ─── Stratum extraction ──────────────────────────────────────────────────────

type KeyFn = fn(&PhaseRecord) -> BTreeMap<String, String>;

fn key(pairs: &[(&str, String)]) -> BTreeMap<String, String> {
  pairs
    .iter()
    .map(|(k, v)| (k.to_string(), v.clone()))
    .collect()
}

fn by_geral(_: &PhaseRecord) -> BTreeMap<String, String> { BTreeMap::new() }

fn by_fase(r: &PhaseRecord) -> BTreeMap<String, String> {
  key(&[("fase", r.fase.to_string())])
}

fn by_ano(r: &PhaseRecord) -> BTreeMap<String, String> {
  let year = r
    .ano_calendario
    .map(|y| y.to_string())
    .unwrap_or_else(|| "Indeterminado".to_string());
  key(&[("ano_calendario", year)])
}

fn by_serie(r: &PhaseRecord) -> BTreeMap<String, String> {
  key(&[("serie", r.serie.clone())])
}

fn by_grupo_etario(r: &PhaseRecord) -> BTreeMap<String, String> {
  key(&[("grupo_etario", r.grupo_etario.clone())])
}

fn by_escola(r: &PhaseRecord) -> BTreeMap<String, String> {
  key(&[("escola", r.escola.clone())])
}

fn by_turma(r: &PhaseRecord) -> BTreeMap<String, String> {
  key(&[("escola", r.escola.clone()), ("turma", r.turma.clone())])
}

fn by_cohorte(r: &PhaseRecord) -> BTreeMap<String, String> {
  let cohort = r
    .cohorte_origem
    .clone()
    .unwrap_or_else(|| "Indeterminado".to_string());
  key(&[("cohorte", cohort)])
}

fn by_sexo(r: &PhaseRecord) -> BTreeMap<String, String> {
  let sexo = r
    .sexo
    .map(|s| s.label().to_string())
    .unwrap_or_else(|| "Indeterminado".to_string());
  key(&[("sexo", sexo)])
}

fn by_fase_escola(r: &PhaseRecord) -> BTreeMap<String, String> {
  key(&[("fase", r.fase.to_string()), ("escola", r.escola.clone())])
}

fn by_fase_escola_turma(r: &PhaseRecord) -> BTreeMap<String, String> {
  key(&[
    ("fase", r.fase.to_string()),
    ("escola", r.escola.clone()),
    ("turma", r.turma.clone()),
  ])
}

/// The stratum types of the resumo bundle, in emission order.
const STRATUM_TYPES: &[(&str, KeyFn)] = &[
  ("geral", by_geral),
  ("fase", by_fase),
  ("ano_calendario", by_ano),
  ("serie", by_serie),
  ("grupo_etario", by_grupo_etario),
  ("escola", by_escola),
  ("turma", by_turma),
  ("cohorte", by_cohorte),
  ("sexo", by_sexo),
  ("fase_escola", by_fase_escola),
  ("fase_escola_turma", by_fase_escola_turma),
];

// ─── Aggregation ─────────────────────────────────────────────────────────────

fn stratify(
  records: &[PhaseRecord],
  key_fn: KeyFn,
  low_n_floor: usize,
) -> Vec<StratumStats> {
  let mut groups: BTreeMap<BTreeMap<String, String>, (Vec<f64>, Vec<f64>)> =
    BTreeMap::new();
  for record in records {
    let entry = groups.entry(key_fn(record)).or_default();
    entry.0.push(record.score_pre as f64);
    entry.1.push(record.score_pos as f64);
  }

  groups
    .into_iter()
    .map(|(stratum, (pre, pos))| {
      StratumStats::compute(stratum, &pre, &pos, low_n_floor)
    })
    .collect()
}

// ─── Item and skill breakdowns ───────────────────────────────────────────────

fn direction_pcts(deltas: &[f64]) -> (f64, f64, f64) {
  let n = deltas.len();
  if n == 0 {
    return (0.0, 0.0, 0.0);
  }
  let improved = deltas.iter().filter(|d| **d > 0.0).count();
  let declined = deltas.iter().filter(|d| **d < 0.0).count();
  let stable = n - improved - declined;
  let pct = |count: usize| 100.0 * count as f64 / n as f64;
  (pct(improved), pct(declined), pct(stable))
}

/// Per-item aggregate over all rows where both sides of the pair are present.
fn item_breakdown(records: &[PhaseRecord]) -> Vec<ItemStats> {
  let mut per_item: BTreeMap<u8, (String, Vec<f64>, Vec<f64>)> = BTreeMap::new();
  for record in records {
    for triple in &record.items {
      if let (Some(pre), Some(pos)) = (triple.pre, triple.pos) {
        let entry = per_item
          .entry(triple.question)
          .or_insert_with(|| (triple.slug.clone(), Vec::new(), Vec::new()));
        entry.1.push(pre as f64);
        entry.2.push(pos as f64);
      }
    }
  }

  per_item
    .into_iter()
    .map(|(question, (slug, pre, pos))| {
      let deltas: Vec<f64> = pre.iter().zip(&pos).map(|(a, b)| b - a).collect();
      let (pct_improved, pct_declined, pct_stable) = direction_pcts(&deltas);
      ItemStats {
        question,
        slug,
        n_valid: pre.len(),
        mean_pre: mean(&pre).unwrap_or(0.0),
        mean_pos: mean(&pos).unwrap_or(0.0),
        mean_delta: mean(&deltas).unwrap_or(0.0),
        pct_improved,
        pct_declined,
        pct_stable,
      }
    })
    .collect()
}

/// Per-skill subtotal: item observations pooled by slug.
fn skill_breakdown(records: &[PhaseRecord]) -> Vec<SkillStats> {
  let mut per_skill: BTreeMap<String, (BTreeSet<u8>, Vec<f64>)> = BTreeMap::new();
  for record in records {
    for triple in &record.items {
      if let Some(delta) = triple.delta {
        let entry = per_skill.entry(triple.slug.clone()).or_default();
        entry.0.insert(triple.question);
        entry.1.push(delta as f64);
      }
    }
  }

  per_skill
    .into_iter()
    .map(|(slug, (questions, deltas))| {
      let (pct_improved, _, _) = direction_pcts(&deltas);
      SkillStats {
        slug,
        questions: questions.into_iter().collect(),
        n_valid: deltas.len(),
        mean_delta: mean(&deltas).unwrap_or(0.0),
        pct_improved,
      }
    })
    .collect()
}

// ─── Entry point ─────────────────────────────────────────────────────────────

/// Compute the per-stratum statistics bundle for one kind's longitudinal
/// table.
pub fn aggregate(records: &[PhaseRecord], kind: TestKind, cfg: &RunConfig) -> ResumoBundle {
  let mut strata = BTreeMap::new();
  for (name, key_fn) in STRATUM_TYPES {
    // The sex breakdown is meaningless when inference never ran.
    if *name == "sexo" && records.iter().all(|r| r.sexo.is_none()) {
      continue;
    }
    let stats = stratify(records, *key_fn, cfg.low_n_floor);
    info!(stratum_type = name, strata = stats.len(), "aggregated");
    strata.insert(name.to_string(), stats);
  }

  ResumoBundle {
    kind: kind.label().to_string(),
    generated_at: Utc::now(),
    low_n_floor: cfg.low_n_floor,
    strata,
    items: item_breakdown(records),
    skills: skill_breakdown(records),
  }
}

//! `wordgen` — command-line consumer of the WordGen pipeline.
//!
//! Reads the TOML configuration document (path from `--config` or the
//! `WORDGEN_CONFIG` environment variable) and drives the library entry
//! points:
//!
//! ```text
//! wordgen ingest       --kind vocab --phase 2 --pre pre.csv --pos pos.csv --key gabarito.json
//! wordgen longitudinal --kind vocab fase2_Vocabulario.csv fase3_Vocabulario.csv
//! wordgen aggregate    --kind vocab --input dados_longitudinais_Vocabulario.csv
//! wordgen report       --input resumo_longitudinal_Vocabulario.json
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;
use wordgen_core::{
  config::{DuplicatePolicy, RunConfig, SexInferenceMode},
  record::TestKind,
  stats::ResumoBundle,
};
use wordgen_names::{SexInferer, apply_to_records, distinct_first_names};
use wordgen_pipeline::{aggregate, artifact, build_phase_table, join_longitudinal};

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "wordgen", version, about = "WordGen longitudinal pipeline")]
struct Cli {
  /// Path to the TOML configuration document.
  #[arg(short, long, env = "WORDGEN_CONFIG", default_value = "wordgen.toml")]
  config: PathBuf,

  /// Shorthand for `duplicate_policy = "strict_fail"`.
  #[arg(long)]
  strict: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Copy, Clone, ValueEnum)]
enum KindArg {
  Tde,
  Vocab,
}

impl From<KindArg> for TestKind {
  fn from(kind: KindArg) -> Self {
    match kind {
      KindArg::Tde => TestKind::Tde,
      KindArg::Vocab => TestKind::Vocab,
    }
  }
}

#[derive(Subcommand)]
enum Command {
  /// Score, filter and pivot one phase's Pre and Pos raw tables.
  Ingest {
    #[arg(long, value_enum)]
    kind:    KindArg,
    #[arg(long)]
    phase:   u8,
    /// Pre raw table (CSV).
    #[arg(long)]
    pre:     PathBuf,
    /// Pos raw table (CSV).
    #[arg(long)]
    pos:     PathBuf,
    /// Answer-key document (JSON).
    #[arg(long)]
    key:     PathBuf,
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
  },

  /// Stack per-phase wide tables into the longitudinal artifact.
  Longitudinal {
    #[arg(long, value_enum)]
    kind:    KindArg,
    /// Per-phase wide tables produced by `ingest`.
    #[arg(required = true)]
    inputs:  Vec<PathBuf>,
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
  },

  /// Compute the per-stratum statistics bundle from a longitudinal table.
  Aggregate {
    #[arg(long, value_enum)]
    kind:    KindArg,
    #[arg(long)]
    input:   PathBuf,
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
  },

  /// Print a human-readable summary of a statistics bundle.
  Report {
    #[arg(long)]
    input: PathBuf,
  },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration; a missing document means all-defaults.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .build()
    .context("failed to read config document")?;
  let mut cfg: RunConfig = settings
    .try_deserialize()
    .context("failed to deserialise run configuration")?;
  if cli.strict {
    cfg.duplicate_policy = DuplicatePolicy::StrictFail;
  }
  tracing::debug!(config = ?cfg, document = %cli.config.display(), "configuration in effect");

  match cli.command {
    Command::Ingest {
      kind,
      phase,
      pre,
      pos,
      key,
      out_dir,
    } => run_ingest(kind.into(), phase, &pre, &pos, &key, &out_dir, &cfg),

    Command::Longitudinal {
      kind,
      inputs,
      out_dir,
    } => run_longitudinal(kind.into(), &inputs, &out_dir, &cfg).await,

    Command::Aggregate {
      kind,
      input,
      out_dir,
    } => run_aggregate(kind.into(), &input, &out_dir, &cfg),

    Command::Report { input } => run_report(&input),
  }
}

// ─── Subcommands ─────────────────────────────────────────────────────────────

fn run_ingest(
  kind: TestKind,
  phase: u8,
  pre: &PathBuf,
  pos: &PathBuf,
  key: &PathBuf,
  out_dir: &PathBuf,
  cfg: &RunConfig,
) -> anyhow::Result<()> {
  use wordgen_core::record::Moment;

  let answer_key = wordgen_ingest::load_answer_key(key)
    .with_context(|| format!("loading answer key {}", key.display()))?;
  let pre_table = wordgen_ingest::read_table(pre, kind, phase, Moment::Pre)
    .with_context(|| format!("reading Pre table {}", pre.display()))?;
  let pos_table = wordgen_ingest::read_table(pos, kind, phase, Moment::Pos)
    .with_context(|| format!("reading Pos table {}", pos.display()))?;

  let outcome = build_phase_table(&pre_table, &pos_table, kind, phase, &answer_key, cfg)
    .context("building phase table")?;

  let table_path = artifact::phase_table_path(out_dir, kind, phase);
  artifact::write_wide_csv(&table_path, &outcome.records)
    .with_context(|| format!("writing {}", table_path.display()))?;
  let report_path = artifact::filter_report_path(out_dir, kind, phase);
  artifact::write_filter_report(&report_path, &outcome.report)
    .with_context(|| format!("writing {}", report_path.display()))?;

  info!(
    students = outcome.records.len(),
    table = %table_path.display(),
    "phase table written"
  );
  Ok(())
}

async fn run_longitudinal(
  kind: TestKind,
  inputs: &[PathBuf],
  out_dir: &PathBuf,
  cfg: &RunConfig,
) -> anyhow::Result<()> {
  let mut tables = Vec::with_capacity(inputs.len());
  for input in inputs {
    let records = artifact::read_wide_csv(input)
      .with_context(|| format!("reading {}", input.display()))?;
    tables.push(records);
  }

  let mut joined = join_longitudinal(tables, cfg).context("joining phases")?;

  if cfg.sex_inference.mode != SexInferenceMode::Off {
    let inferer = SexInferer::new(cfg.sex_inference.clone());
    let calls = inferer.infer(&distinct_first_names(&joined)).await;
    apply_to_records(&mut joined, &calls);
  }

  let path = artifact::longitudinal_path(out_dir, kind);
  artifact::write_wide_csv(&path, &joined)
    .with_context(|| format!("writing {}", path.display()))?;
  info!(rows = joined.len(), table = %path.display(), "longitudinal table written");
  Ok(())
}

fn run_aggregate(
  kind: TestKind,
  input: &PathBuf,
  out_dir: &PathBuf,
  cfg: &RunConfig,
) -> anyhow::Result<()> {
  let records = artifact::read_wide_csv(input)
    .with_context(|| format!("reading {}", input.display()))?;
  let bundle = aggregate(&records, kind, cfg);

  let path = artifact::resumo_path(out_dir, kind);
  artifact::write_resumo(&path, &bundle)
    .with_context(|| format!("writing {}", path.display()))?;
  info!(
    stratum_types = bundle.strata.len(),
    bundle = %path.display(),
    "statistics bundle written"
  );
  Ok(())
}

fn run_report(input: &PathBuf) -> anyhow::Result<()> {
  let bundle: ResumoBundle = artifact::read_resumo(input)
    .with_context(|| format!("reading {}", input.display()))?;

  println!("Resumo longitudinal — {}", bundle.kind);
  println!("gerado em {}", bundle.generated_at.to_rfc3339());
  println!();

  for (stratum_type, strata) in &bundle.strata {
    println!("== {stratum_type} ({} estratos)", strata.len());
    for stats in strata {
      let keys = if stats.stratum.is_empty() {
        "(geral)".to_string()
      } else {
        stats
          .stratum
          .iter()
          .map(|(k, v)| format!("{k}={v}"))
          .collect::<Vec<_>>()
          .join(" ")
      };
      let d = stats
        .cohen_d
        .map(|d| format!("{d:.3}"))
        .unwrap_or_else(|| "—".to_string());
      let classification = stats
        .classification
        .map(|c| c.label())
        .unwrap_or("—");
      let low_n = if stats.low_n { " [low n]" } else { "" };
      println!(
        "  {keys}: n={} Δ={:.2} d={d} ({classification}) +{:.1}%/-{:.1}%/={:.1}%{low_n}",
        stats.n,
        stats.mean_delta,
        stats.pct_improved,
        stats.pct_declined,
        stats.pct_stable,
      );
    }
    println!();
  }

  if !bundle.items.is_empty() {
    let mut ranked: Vec<_> = bundle.items.iter().collect();
    ranked.sort_by(|a, b| {
      b.mean_delta
        .partial_cmp(&a.mean_delta)
        .unwrap_or(std::cmp::Ordering::Equal)
    });
    println!("== itens com maior ganho");
    for item in ranked.iter().take(5) {
      println!(
        "  Q{:02} {}: Δ={:.2} (n={}, +{:.1}%)",
        item.question, item.slug, item.mean_delta, item.n_valid, item.pct_improved,
      );
    }
  }

  Ok(())
}

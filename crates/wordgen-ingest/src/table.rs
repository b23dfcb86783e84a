//! Raw-table reader.
//!
//! Pipeline:
//!   CSV bytes
//!     └─ header mapping (aliases, folded comparison) → ColumnPlan
//!          └─ per-row extraction → RawResponse
//!               └─ NA sentinel folding → None
//!
//! Header names vary between export batches; every known alias of the
//! required columns is accepted after accent/case folding.

use std::{fs::File, io::Read, path::Path};

use wordgen_core::{
  normalize::fold_text,
  record::{Moment, RawResponse, TestKind},
};

use crate::error::{Error, Result};

// ─── Header aliases ──────────────────────────────────────────────────────────

const NAME_ALIASES: &[&str] = &["NOME", "ALUNO", "ESTUDANTE", "NOME DO ALUNO"];
const SCHOOL_ALIASES: &[&str] = &["ESCOLA", "UNIDADE", "UNIDADE ESCOLAR"];
const CLASS_ALIASES: &[&str] = &["TURMA", "ANO TURMA", "CLASSE"];
const GRADE_ALIASES: &[&str] = &["SERIE", "ANO", "ANO ESCOLAR"];

// ─── Column plan ─────────────────────────────────────────────────────────────

/// Resolved positions of the columns this reader consumes.
struct ColumnPlan {
  name:   usize,
  school: usize,
  class:  usize,
  grade:  Option<usize>,
  /// `(question number, column index)`, sorted by question number.
  items:  Vec<(u8, usize)>,
}

fn find_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
  headers
    .iter()
    .position(|h| aliases.iter().any(|a| h == a))
}

/// `P7` / `Q12` → question number, for the kind's prefix.
fn item_number(header: &str, prefix: char) -> Option<u8> {
  let rest = header.strip_prefix(prefix)?;
  if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  rest.parse().ok()
}

fn plan(headers: &[String], kind: TestKind) -> Result<ColumnPlan> {
  let require = |aliases: &[&str], label: &str| {
    find_column(headers, aliases).ok_or_else(|| Error::SchemaMismatch {
      column: label.to_string(),
    })
  };

  let mut items: Vec<(u8, usize)> = headers
    .iter()
    .enumerate()
    .filter_map(|(idx, h)| item_number(h, kind.item_prefix()).map(|n| (n, idx)))
    .collect();
  items.sort_by_key(|(n, _)| *n);

  if items.is_empty() {
    return Err(Error::SchemaMismatch {
      column: format!("{}1..{}N", kind.item_prefix(), kind.item_prefix()),
    });
  }

  Ok(ColumnPlan {
    name:   require(NAME_ALIASES, "Nome")?,
    school: require(SCHOOL_ALIASES, "Escola")?,
    class:  require(CLASS_ALIASES, "Turma")?,
    grade:  find_column(headers, GRADE_ALIASES),
    items,
  })
}

// ─── NA sentinels ────────────────────────────────────────────────────────────

/// Empty string, `D` (did not answer) and `M` (missing) are NA.
fn fold_na(value: &str) -> Option<String> {
  let trimmed = value.trim();
  if trimmed.is_empty()
    || trimmed.eq_ignore_ascii_case("D")
    || trimmed.eq_ignore_ascii_case("M")
  {
    None
  } else {
    Some(trimmed.to_string())
  }
}

// ─── Reader ──────────────────────────────────────────────────────────────────

/// A parsed raw table: the item-column count plus one [`RawResponse`] per
/// data row, in file order.
#[derive(Debug)]
pub struct RawTable {
  pub n_items: usize,
  pub rows:    Vec<RawResponse>,
}

/// Read one raw per-phase table from `path`.
pub fn read_table(
  path: impl AsRef<Path>,
  kind: TestKind,
  phase: u8,
  moment: Moment,
) -> Result<RawTable> {
  let file = File::open(path)?;
  read_table_from(file, kind, phase, moment)
}

/// Read one raw per-phase table from any reader (UTF-8, comma-separated,
/// first row is the header).
pub fn read_table_from<R: Read>(
  reader: R,
  kind: TestKind,
  phase: u8,
  moment: Moment,
) -> Result<RawTable> {
  let mut csv_reader = csv::ReaderBuilder::new()
    .has_headers(true)
    .flexible(true)
    .from_reader(reader);

  let headers: Vec<String> = csv_reader
    .headers()?
    .iter()
    .map(|h| fold_text(h))
    .collect();
  let plan = plan(&headers, kind)?;
  let n_items = plan.items.last().map(|(n, _)| *n as usize).unwrap_or(0);

  let mut rows = Vec::new();
  for record in csv_reader.records() {
    let record = record?;
    let field = |idx: usize| record.get(idx).unwrap_or("").trim().to_string();

    let mut answers: Vec<Option<String>> = vec![None; n_items];
    for (number, idx) in &plan.items {
      answers[*number as usize - 1] =
        record.get(*idx).and_then(fold_na);
    }

    rows.push(RawResponse {
      name: field(plan.name),
      school: field(plan.school),
      class: field(plan.class),
      grade: plan.grade.map(|idx| field(idx)).and_then(|g| fold_na(&g)),
      phase,
      kind,
      moment,
      answers,
    });
  }

  if rows.is_empty() {
    return Err(Error::EmptyTable);
  }

  Ok(RawTable { n_items, rows })
}

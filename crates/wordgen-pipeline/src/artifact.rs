//! Artifact encoding — the boundary between domain types and the files
//! downstream renderers consume.
//!
//! Wide tables are CSV with a fixed leading column block followed by the
//! `Q##_{Pre|Pos|Delta}_{slug}` triples; statistics bundles and filter
//! reports are JSON. Readers are strict: a missing required column is a
//! [`Error::MalformedArtifact`], never a silent default.

use std::{
  fs::File,
  io::{BufReader, BufWriter},
  path::{Path, PathBuf},
};

use wordgen_core::{
  record::{ItemTriple, PhaseRecord, Sex, TestKind},
  stats::ResumoBundle,
};

use crate::{
  error::{Error, Result},
  filter::FilterReport,
};

// ─── Paths ───────────────────────────────────────────────────────────────────

pub fn phase_table_path(dir: &Path, kind: TestKind, phase: u8) -> PathBuf {
  dir.join(format!("fase{phase}_{}.csv", kind.label()))
}

pub fn longitudinal_path(dir: &Path, kind: TestKind) -> PathBuf {
  dir.join(format!("dados_longitudinais_{}.csv", kind.label()))
}

pub fn resumo_path(dir: &Path, kind: TestKind) -> PathBuf {
  dir.join(format!("resumo_longitudinal_{}.json", kind.label()))
}

pub fn filter_report_path(dir: &Path, kind: TestKind, phase: u8) -> PathBuf {
  dir.join(format!("relatorio_filtros_fase{phase}_{}.json", kind.label()))
}

// ─── Fixed columns ───────────────────────────────────────────────────────────

const FIXED_COLUMNS: &[&str] = &[
  "ID_Unico",
  "ID_Display",
  "Nome",
  "Escola",
  "Turma",
  "Serie",
  "GrupoEtario",
  "Fase",
  "Ano_Calendario",
  "Cohorte_Origem",
  "Score_Pre",
  "Score_Pos",
  "Delta_Score",
  "Questoes_Validas",
  "Percentual_Pre",
  "Percentual_Pos",
];

const SEX_COLUMNS: &[&str] = &["Sexo", "Sexo_Confianca", "Sexo_Metodo"];

fn item_header(triple: &ItemTriple, part: &str) -> String {
  format!("Q{:02}_{}_{}", triple.question, part, triple.slug)
}

// ─── Wide CSV writer ─────────────────────────────────────────────────────────

/// Write a wide table to `path`. All records must share one item layout (the
/// pivoter guarantees this); the sex columns are emitted only when at least
/// one record carries an inference result.
pub fn write_wide_csv(path: &Path, records: &[PhaseRecord]) -> Result<()> {
  let mut writer = csv::Writer::from_writer(BufWriter::new(File::create(path)?));

  let template: &[ItemTriple] =
    records.first().map(|r| r.items.as_slice()).unwrap_or(&[]);
  let with_sex = records.iter().any(|r| r.sexo.is_some());

  let mut header: Vec<String> =
    FIXED_COLUMNS.iter().map(|c| c.to_string()).collect();
  for triple in template {
    for part in ["Pre", "Pos", "Delta"] {
      header.push(item_header(triple, part));
    }
  }
  if with_sex {
    header.extend(SEX_COLUMNS.iter().map(|c| c.to_string()));
  }
  writer.write_record(&header)?;

  let opt = |v: Option<String>| v.unwrap_or_default();
  for record in records {
    let mut row: Vec<String> = vec![
      record.id_unico.clone(),
      record.id_display.clone(),
      record.nome.clone(),
      record.escola.clone(),
      record.turma.clone(),
      record.serie.clone(),
      record.grupo_etario.clone(),
      record.fase.to_string(),
      opt(record.ano_calendario.map(|y| y.to_string())),
      opt(record.cohorte_origem.clone()),
      record.score_pre.to_string(),
      record.score_pos.to_string(),
      record.delta_score.to_string(),
      record.questoes_validas.to_string(),
      format!("{:.2}", record.percentual_pre),
      format!("{:.2}", record.percentual_pos),
    ];
    for triple in &record.items {
      row.push(opt(triple.pre.map(|v| v.to_string())));
      row.push(opt(triple.pos.map(|v| v.to_string())));
      row.push(opt(triple.delta.map(|v| v.to_string())));
    }
    if with_sex {
      row.push(opt(record.sexo.map(|s| s.label().to_string())));
      row.push(opt(record.sexo_confianca.map(|c| format!("{c:.2}"))));
      row.push(opt(record.sexo_metodo.clone()));
    }
    writer.write_record(&row)?;
  }

  writer.flush()?;
  Ok(())
}

// ─── Wide CSV reader ─────────────────────────────────────────────────────────

struct ItemColumns {
  slug:  String,
  pre:   Option<usize>,
  pos:   Option<usize>,
  delta: Option<usize>,
}

/// `Q07_Pre_casa` → (7, "Pre", "casa").
fn parse_item_header(header: &str) -> Option<(u8, &str, &str)> {
  let rest = header.strip_prefix('Q')?;
  let (number, rest) = rest.split_once('_')?;
  let number: u8 = number.parse().ok()?;
  let (part, slug) = rest.split_once('_')?;
  if !matches!(part, "Pre" | "Pos" | "Delta") {
    return None;
  }
  Some((number, part, slug))
}

fn parse_opt<T: std::str::FromStr>(field: &str) -> Option<T> {
  let trimmed = field.trim();
  if trimmed.is_empty() {
    None
  } else {
    trimmed.parse().ok()
  }
}

fn parse_required<T: std::str::FromStr>(field: &str, column: &str) -> Result<T> {
  parse_opt(field).ok_or_else(|| {
    Error::MalformedArtifact(format!("bad value {field:?} in column {column}"))
  })
}

fn parse_sex(field: &str) -> Option<Sex> {
  match field.trim() {
    "M" => Some(Sex::M),
    "F" => Some(Sex::F),
    "Indeterminado" => Some(Sex::Indeterminate),
    _ => None,
  }
}

/// Read a wide table back from `path`.
pub fn read_wide_csv(path: &Path) -> Result<Vec<PhaseRecord>> {
  let mut reader =
    csv::Reader::from_reader(BufReader::new(File::open(path)?));
  let headers: Vec<String> =
    reader.headers()?.iter().map(str::to_string).collect();

  let index_of = |column: &str| -> Result<usize> {
    headers
      .iter()
      .position(|h| h == column)
      .ok_or_else(|| Error::MalformedArtifact(format!("missing column {column}")))
  };

  let fixed: Vec<usize> = FIXED_COLUMNS
    .iter()
    .map(|c| index_of(c))
    .collect::<Result<_>>()?;
  let sex_columns: Option<Vec<usize>> = SEX_COLUMNS
    .iter()
    .map(|c| headers.iter().position(|h| h == *c))
    .collect();

  let mut items: std::collections::BTreeMap<u8, ItemColumns> =
    std::collections::BTreeMap::new();
  for (idx, header) in headers.iter().enumerate() {
    if let Some((number, part, slug)) = parse_item_header(header) {
      let entry = items.entry(number).or_insert_with(|| ItemColumns {
        slug:  slug.to_string(),
        pre:   None,
        pos:   None,
        delta: None,
      });
      match part {
        "Pre" => entry.pre = Some(idx),
        "Pos" => entry.pos = Some(idx),
        _ => entry.delta = Some(idx),
      }
    }
  }

  let mut records = Vec::new();
  for row in reader.records() {
    let row = row?;
    let field = |idx: usize| row.get(idx).unwrap_or("");
    let fixed_field = |pos: usize| field(fixed[pos]);

    let triples: Vec<ItemTriple> = items
      .iter()
      .map(|(question, cols)| ItemTriple {
        question: *question,
        slug:     cols.slug.clone(),
        pre:      cols.pre.and_then(|i| parse_opt(field(i))),
        pos:      cols.pos.and_then(|i| parse_opt(field(i))),
        delta:    cols.delta.and_then(|i| parse_opt(field(i))),
      })
      .collect();

    let (sexo, sexo_confianca, sexo_metodo) = match &sex_columns {
      Some(cols) => (
        parse_sex(field(cols[0])),
        parse_opt(field(cols[1])),
        (!field(cols[2]).trim().is_empty()).then(|| field(cols[2]).trim().to_string()),
      ),
      None => (None, None, None),
    };

    records.push(PhaseRecord {
      id_unico:         fixed_field(0).to_string(),
      id_display:       fixed_field(1).to_string(),
      nome:             fixed_field(2).to_string(),
      escola:           fixed_field(3).to_string(),
      turma:            fixed_field(4).to_string(),
      serie:            fixed_field(5).to_string(),
      grupo_etario:     fixed_field(6).to_string(),
      fase:             parse_required(fixed_field(7), "Fase")?,
      ano_calendario:   parse_opt(fixed_field(8)),
      cohorte_origem:   (!fixed_field(9).trim().is_empty())
        .then(|| fixed_field(9).trim().to_string()),
      score_pre:        parse_required(fixed_field(10), "Score_Pre")?,
      score_pos:        parse_required(fixed_field(11), "Score_Pos")?,
      delta_score:      parse_required(fixed_field(12), "Delta_Score")?,
      questoes_validas: parse_required(fixed_field(13), "Questoes_Validas")?,
      percentual_pre:   parse_required(fixed_field(14), "Percentual_Pre")?,
      percentual_pos:   parse_required(fixed_field(15), "Percentual_Pos")?,
      items:            triples,
      sexo,
      sexo_confianca,
      sexo_metodo,
    });
  }

  Ok(records)
}

// ─── JSON artifacts ──────────────────────────────────────────────────────────

pub fn write_resumo(path: &Path, bundle: &ResumoBundle) -> Result<()> {
  let file = BufWriter::new(File::create(path)?);
  serde_json::to_writer_pretty(file, bundle)?;
  Ok(())
}

pub fn read_resumo(path: &Path) -> Result<ResumoBundle> {
  let file = BufReader::new(File::open(path)?);
  Ok(serde_json::from_reader(file)?)
}

pub fn write_filter_report(path: &Path, report: &FilterReport) -> Result<()> {
  let file = BufWriter::new(File::create(path)?);
  serde_json::to_writer_pretty(file, report)?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use wordgen_core::identity::{Student, StudentIdentity};

  use super::*;

  fn record(name: &str, sexo: Option<Sex>) -> PhaseRecord {
    let student = Student::new(StudentIdentity::from_raw(
      name,
      "E1",
      "6A",
      Some("6º ANO"),
    ));
    PhaseRecord {
      id_unico:         student.id_unico.clone(),
      id_display:       student.id_display.clone(),
      nome:             student.identity.name.clone(),
      escola:           "E1".to_string(),
      turma:            "6A".to_string(),
      serie:            "6º ANO".to_string(),
      grupo_etario:     "6º/7º anos".to_string(),
      fase:             2,
      score_pre:        3,
      score_pos:        4,
      delta_score:      1,
      questoes_validas: 1,
      percentual_pre:   75.0,
      percentual_pos:   100.0,
      items:            vec![
        ItemTriple {
          question: 1,
          slug:     "casa".to_string(),
          pre:      Some(1),
          pos:      Some(2),
          delta:    Some(1),
        },
        ItemTriple {
          question: 2,
          slug:     "celula".to_string(),
          pre:      Some(2),
          pos:      None,
          delta:    None,
        },
      ],
      ano_calendario:   Some(2023),
      cohorte_origem:   Some("Coorte 1".to_string()),
      sexo,
      sexo_confianca:   sexo.map(|_| 0.9),
      sexo_metodo:      sexo.map(|_| "dictionary".to_string()),
    }
  }

  #[test]
  fn wide_csv_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wide.csv");
    let records = vec![record("Ana", None), record("Bia", None)];

    write_wide_csv(&path, &records).unwrap();
    let back = read_wide_csv(&path).unwrap();

    assert_eq!(back.len(), 2);
    assert_eq!(back[0].id_unico, records[0].id_unico);
    assert_eq!(back[0].items.len(), 2);
    assert_eq!(back[0].items[0].delta, Some(1));
    assert_eq!(back[0].items[1].pos, None);
    assert_eq!(back[0].ano_calendario, Some(2023));
    assert_eq!(back[0].cohorte_origem.as_deref(), Some("Coorte 1"));
  }

  #[test]
  fn sex_columns_only_when_present() {
    let dir = tempfile::tempdir().unwrap();

    let without = dir.path().join("plain.csv");
    write_wide_csv(&without, &[record("Ana", None)]).unwrap();
    let raw = std::fs::read_to_string(&without).unwrap();
    assert!(!raw.contains("Sexo"));

    let with = dir.path().join("sexed.csv");
    write_wide_csv(&with, &[record("Ana", Some(Sex::F))]).unwrap();
    let back = read_wide_csv(&with).unwrap();
    assert_eq!(back[0].sexo, Some(Sex::F));
    assert_eq!(back[0].sexo_metodo.as_deref(), Some("dictionary"));
  }

  #[test]
  fn item_header_round_trip() {
    assert_eq!(
      parse_item_header("Q07_Pre_casa"),
      Some((7, "Pre", "casa"))
    );
    assert_eq!(
      parse_item_header("Q12_Delta_uso_do_dicionario"),
      Some((12, "Delta", "uso_do_dicionario"))
    );
    assert_eq!(parse_item_header("Score_Pre"), None);
    assert_eq!(parse_item_header("Questoes_Validas"), None);
  }

  #[test]
  fn missing_column_is_malformed_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    std::fs::write(&path, "ID_Unico,Nome\nabc,Ana\n").unwrap();
    let err = read_wide_csv(&path).unwrap_err();
    assert!(matches!(err, Error::MalformedArtifact(_)));
  }
}

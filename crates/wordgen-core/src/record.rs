//! Record types — the rows that flow between pipeline stages.
//!
//! A [`RawResponse`] is immutable once ingested. The scorer turns it into a
//! [`ScoredRecord`]; the pivoter pairs Pre and Pos into a [`PhaseRecord`],
//! which is the row shape of every downstream artifact.

use serde::{Deserialize, Serialize};

use crate::identity::Student;

// ─── Assessment coordinates ──────────────────────────────────────────────────

/// Which assessment a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
  /// Teste de Desempenho Escolar — writing accuracy, one point per item.
  Tde,
  /// Vocabulary test — pre-graded 0/1/2 per item.
  Vocab,
}

impl TestKind {
  /// Label used in artifact file names (`dados_longitudinais_<label>.csv`).
  pub fn label(self) -> &'static str {
    match self {
      Self::Tde => "TDE",
      Self::Vocab => "Vocabulario",
    }
  }

  /// Prefix of item columns in raw tables (`P1..PN` vs `Q1..QN`).
  pub fn item_prefix(self) -> char {
    match self {
      Self::Tde => 'P',
      Self::Vocab => 'Q',
    }
  }

  /// Maximum score a single item can contribute.
  pub fn max_item_score(self) -> u32 {
    match self {
      Self::Tde => 1,
      Self::Vocab => 2,
    }
  }
}

impl std::fmt::Display for TestKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.label())
  }
}

/// Beginning-of-phase or end-of-phase administration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Moment {
  Pre,
  Pos,
}

impl std::fmt::Display for Moment {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      Self::Pre => "Pre",
      Self::Pos => "Pos",
    })
  }
}

// ─── Sex attribute ───────────────────────────────────────────────────────────

/// Inferred (or recorded) sex of a student. Heuristic, display-level data;
/// never part of the identity key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
  M,
  F,
  Indeterminate,
}

impl Sex {
  pub fn label(self) -> &'static str {
    match self {
      Self::M => "M",
      Self::F => "F",
      Self::Indeterminate => "Indeterminado",
    }
  }
}

// ─── Raw ingestion row ───────────────────────────────────────────────────────

/// One row of a raw per-phase table, exactly as ingested. NA sentinels
/// (empty, `D`, `M`) are already folded to `None` by the reader.
#[derive(Debug, Clone)]
pub struct RawResponse {
  pub name:    String,
  pub school:  String,
  pub class:   String,
  /// Raw grade column when the table carries one; otherwise the grade is
  /// extracted from the class label.
  pub grade:   Option<String>,
  pub phase:   u8,
  pub kind:    TestKind,
  pub moment:  Moment,
  /// Index = question number − 1.
  pub answers: Vec<Option<String>>,
}

// ─── Scored row ──────────────────────────────────────────────────────────────

/// A scored Pre or Pos row for one student. Owned by the scorer; consumed by
/// the validity filter and the pivoter.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
  pub student: Student,
  pub phase:   u8,
  pub kind:    TestKind,
  pub moment:  Moment,
  /// Per-item value: `{0,1}` for TDE, `{0,1,2}` for vocabulary. `None` is a
  /// missing item (already subject to the blank-response policy).
  pub items:   Vec<Option<u32>>,
  /// Count of items answered in the raw row, before any blank policy.
  pub answered: usize,
  /// Sum over non-missing items.
  pub score:    u32,
}

// ─── Wide paired row ─────────────────────────────────────────────────────────

/// Pre/Pos/Delta triple for one item of a paired row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemTriple {
  /// 1-based question number.
  pub question: u8,
  /// ASCII slug of the skill keyword, used in wide column names.
  pub slug:     String,
  pub pre:      Option<u32>,
  pub pos:      Option<u32>,
  /// `pos − pre` when both sides are present, otherwise missing.
  pub delta:    Option<i32>,
}

/// One row per (student, phase, kind) with both administrations paired.
/// The pivoter guarantees `delta_score == score_pos − score_pre`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseRecord {
  pub id_unico:         String,
  pub id_display:       String,
  pub nome:             String,
  pub escola:           String,
  pub turma:            String,
  pub serie:            String,
  pub grupo_etario:     String,
  pub fase:             u8,
  pub score_pre:        u32,
  pub score_pos:        u32,
  pub delta_score:      i64,
  /// Items with both Pre and Pos non-missing.
  pub questoes_validas: u32,
  pub percentual_pre:   f64,
  pub percentual_pos:   f64,
  pub items:            Vec<ItemTriple>,

  // Filled by the longitudinal joiner.
  pub ano_calendario:  Option<i32>,
  pub cohorte_origem:  Option<String>,

  // Filled by the sex inferer when enabled.
  pub sexo:           Option<Sex>,
  pub sexo_confianca: Option<f64>,
  pub sexo_metodo:    Option<String>,
}

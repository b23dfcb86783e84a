//! Answer-key store and item-level scoring rules.
//!
//! The key is loaded once per run and read-only afterwards. TDE items are
//! scored by folded equality against the expected answer; vocabulary items
//! arrive pre-graded and are only domain-checked here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
  error::{Error, Result},
  normalize::{fold_text, skill_slug},
};

// ─── Entries ─────────────────────────────────────────────────────────────────

/// One question of one grade's key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEntry {
  /// 1-based question number.
  pub question: u8,
  /// Expected answer (empty for the legacy vocabulary shape, where responses
  /// arrive pre-graded).
  pub expected: String,
  /// Skill keyword or target word; its slug names the wide columns.
  pub skill:    String,
}

impl KeyEntry {
  pub fn slug(&self) -> String { skill_slug(&self.skill) }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Grade-indexed answer key. A grade observed in the data but absent here is
/// a fatal [`Error::MissingAnswerKey`] — never a silent zero score.
#[derive(Debug, Clone, Default)]
pub struct AnswerKey {
  grades: BTreeMap<String, Vec<KeyEntry>>,
}

impl AnswerKey {
  pub fn new() -> Self { Self::default() }

  /// Register a grade's entries, kept sorted by question number.
  pub fn insert_grade(&mut self, grade: impl Into<String>, mut entries: Vec<KeyEntry>) {
    entries.sort_by_key(|e| e.question);
    self.grades.insert(grade.into(), entries);
  }

  pub fn contains(&self, grade: &str) -> bool { self.grades.contains_key(grade) }

  pub fn entries(&self, grade: &str) -> Result<&[KeyEntry]> {
    self
      .grades
      .get(grade)
      .map(Vec::as_slice)
      .ok_or_else(|| Error::MissingAnswerKey {
        grade: grade.to_string(),
      })
  }

  pub fn grades(&self) -> impl Iterator<Item = &str> {
    self.grades.keys().map(String::as_str)
  }

  /// Expected answer for one question of one grade, if any.
  pub fn expected(&self, grade: &str, question: u8) -> Result<Option<&str>> {
    let entries = self.entries(grade)?;
    Ok(
      entries
        .iter()
        .find(|e| e.question == question)
        .map(|e| e.expected.as_str()),
    )
  }

  /// The wide-table column plan: for each question number, the slug taken
  /// from the first (lowest) grade that carries that question. Grades of one
  /// assessment share their question layout in practice; when they disagree
  /// the lowest grade wins deterministically.
  pub fn column_template(&self) -> Vec<(u8, String)> {
    let mut template: BTreeMap<u8, String> = BTreeMap::new();
    for entries in self.grades.values() {
      for entry in entries {
        template.entry(entry.question).or_insert_with(|| entry.slug());
      }
    }
    template.into_iter().collect()
  }

  /// Number of distinct question numbers across all grades.
  pub fn n_items(&self) -> usize {
    let mut questions: Vec<u8> = self
      .grades
      .values()
      .flatten()
      .map(|e| e.question)
      .collect();
    questions.sort_unstable();
    questions.dedup();
    questions.len()
  }
}

// ─── Item scoring ────────────────────────────────────────────────────────────

/// Outcome of scoring a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemScore {
  Value(u32),
  /// Unanswered, or an NA sentinel.
  Missing,
  /// Answered, but outside the value domain for the kind. Coerced to missing
  /// downstream, with a counter.
  OutOfDomain,
}

/// TDE: folded equality against the expected answer → 0 or 1.
pub fn score_tde(expected: &str, response: Option<&str>) -> ItemScore {
  let Some(raw) = response else {
    return ItemScore::Missing;
  };
  let folded = fold_text(raw);
  if folded.is_empty() {
    return ItemScore::Missing;
  }
  if folded == fold_text(expected) {
    ItemScore::Value(1)
  } else {
    ItemScore::Value(0)
  }
}

/// Vocabulary: the response is a pre-graded value; accept only {0, 1, 2}.
/// Spreadsheet exports sometimes carry `1.0`, so integral floats pass too.
pub fn grade_vocab(response: Option<&str>) -> ItemScore {
  let Some(raw) = response else {
    return ItemScore::Missing;
  };
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return ItemScore::Missing;
  }
  match trimmed.parse::<f64>() {
    Ok(v) if v.fract() == 0.0 && (0.0..=2.0).contains(&v) => {
      ItemScore::Value(v as u32)
    }
    _ => ItemScore::OutOfDomain,
  }
}

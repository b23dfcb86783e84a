//! Answer-key document loader.
//!
//! Two historical shapes exist and both are accepted:
//!
//! - the current one, per question: `{"QUESTÃO": 1, "GABARITO": "B",
//!   "HABILIDADE": "Ortografia"}`;
//! - the legacy vocabulary one: `{"Palavra Trabalhada": "casa",
//!   "Palavra Correta": "..."}`, where the question number is the list
//!   position.
//!
//! Key names are compared after accent/case folding, so `"QUESTAO"`,
//! `"Questão"` and `"questao"` are all the same field.

use std::{fs, path::Path};

use serde_json::Value;
use wordgen_core::{
  key::{AnswerKey, KeyEntry},
  normalize::fold_text,
};

use crate::error::{Error, Result};

// ─── Field lookup ────────────────────────────────────────────────────────────

fn get_folded<'a>(obj: &'a Value, name: &str) -> Option<&'a Value> {
  let wanted = fold_text(name);
  obj
    .as_object()?
    .iter()
    .find(|(k, _)| fold_text(k) == wanted)
    .map(|(_, v)| v)
}

fn as_text(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.trim().to_string()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

fn as_question_number(value: &Value) -> Option<u8> {
  match value {
    Value::Number(n) => n.as_u64().and_then(|n| u8::try_from(n).ok()),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

// ─── Loader ──────────────────────────────────────────────────────────────────

/// Load an answer-key document from `path`.
pub fn load_answer_key(path: impl AsRef<Path>) -> Result<AnswerKey> {
  let raw = fs::read_to_string(path)?;
  parse_answer_key(&raw)
}

/// Parse an answer-key document: a JSON array of grade entries, each with a
/// `Serie` tag and a `Questoes` list.
pub fn parse_answer_key(input: &str) -> Result<AnswerKey> {
  let document: Value = serde_json::from_str(input)?;
  let grades = document
    .as_array()
    .ok_or_else(|| Error::InvalidAnswerKey("top level must be a list".into()))?;

  let mut key = AnswerKey::new();
  for (grade_idx, grade_entry) in grades.iter().enumerate() {
    let serie = get_folded(grade_entry, "Serie")
      .and_then(as_text)
      .ok_or_else(|| {
        Error::InvalidAnswerKey(format!("entry {grade_idx} has no Serie tag"))
      })?;

    let questions = get_folded(grade_entry, "Questoes")
      .and_then(Value::as_array)
      .ok_or_else(|| {
        Error::InvalidAnswerKey(format!("grade {serie:?} has no Questoes list"))
      })?;

    let mut entries = Vec::with_capacity(questions.len());
    for (idx, question) in questions.iter().enumerate() {
      entries.push(parse_question(question, idx, &serie)?);
    }
    key.insert_grade(serie, entries);
  }

  Ok(key)
}

fn parse_question(question: &Value, idx: usize, serie: &str) -> Result<KeyEntry> {
  // Current shape.
  if let Some(number) = get_folded(question, "QUESTÃO") {
    let number = as_question_number(number).ok_or_else(|| {
      Error::InvalidAnswerKey(format!("grade {serie:?}: bad question number at {idx}"))
    })?;
    let expected = get_folded(question, "GABARITO")
      .and_then(as_text)
      .ok_or_else(|| {
        Error::InvalidAnswerKey(format!("grade {serie:?}: question {number} has no GABARITO"))
      })?;
    let skill = get_folded(question, "HABILIDADE")
      .and_then(as_text)
      .unwrap_or_else(|| format!("Q{number}"));
    return Ok(KeyEntry {
      question: number,
      expected,
      skill,
    });
  }

  // Legacy vocabulary shape: position is the question number.
  if let Some(word) = get_folded(question, "Palavra Trabalhada").and_then(as_text) {
    let expected = get_folded(question, "Palavra Correta")
      .and_then(as_text)
      .unwrap_or_default();
    let number = u8::try_from(idx + 1).map_err(|_| {
      Error::InvalidAnswerKey(format!("grade {serie:?}: too many questions"))
    })?;
    return Ok(KeyEntry {
      question: number,
      expected,
      skill: word,
    });
  }

  Err(Error::InvalidAnswerKey(format!(
    "grade {serie:?}: question {idx} matches neither known shape"
  )))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_current_shape() {
    let key = parse_answer_key(
      r#"[
        {
          "Serie": "6º ANO",
          "Questoes": [
            {"QUESTÃO": 1, "GABARITO": "B", "HABILIDADE": "Ortografia"},
            {"QUESTAO": 2, "GABARITO": "C", "HABILIDADE": "Acentuação"}
          ]
        }
      ]"#,
    )
    .unwrap();

    let entries = key.entries("6º ANO").unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].expected, "B");
    assert_eq!(entries[1].slug(), "acentuacao");
  }

  #[test]
  fn parses_legacy_vocab_shape() {
    let key = parse_answer_key(
      r#"[
        {
          "Série": "7º ANO",
          "Questões": [
            {"Palavra Trabalhada": "casa", "Palavra Correta": "moradia"},
            {"Palavra Trabalhada": "célula"}
          ]
        }
      ]"#,
    )
    .unwrap();

    let entries = key.entries("7º ANO").unwrap();
    assert_eq!(entries[0].question, 1);
    assert_eq!(entries[0].skill, "casa");
    assert_eq!(entries[1].question, 2);
    assert_eq!(entries[1].slug(), "celula");
  }

  #[test]
  fn rejects_unknown_shapes() {
    let err = parse_answer_key(r#"[{"Serie": "6º ANO", "Questoes": [{"x": 1}]}]"#)
      .unwrap_err();
    assert!(matches!(err, Error::InvalidAnswerKey(_)));

    let err = parse_answer_key(r#"{"Serie": "6º ANO"}"#).unwrap_err();
    assert!(matches!(err, Error::InvalidAnswerKey(_)));
  }

  #[test]
  fn question_numbers_accept_strings() {
    let key = parse_answer_key(
      r#"[{"Serie": "8º ANO", "Questoes": [{"QUESTÃO": "3", "GABARITO": "A"}]}]"#,
    )
    .unwrap();
    assert_eq!(key.entries("8º ANO").unwrap()[0].question, 3);
  }
}

//! Deterministic student identity.
//!
//! There is no student registry: the identity key IS the normalized
//! (name, school, grade, class) tuple, hashed into a short stable string.
//! Re-ingesting the same raw data must yield byte-identical `ID_Unico`
//! values, so nothing here may depend on insertion order or randomness.

use std::collections::BTreeMap;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::{
  error::{Error, Result},
  normalize::{grade_label, normalize_class, normalize_name, normalize_school},
};

// ─── Identity tuple ──────────────────────────────────────────────────────────

/// The canonical identity of a student: all four components normalized.
/// Equality on this tuple is the cross-phase linkage rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentIdentity {
  pub name:   String,
  pub school: String,
  pub grade:  String,
  pub class:  String,
}

impl StudentIdentity {
  /// Build an identity from raw table fields.
  pub fn from_raw(
    raw_name: &str,
    raw_school: &str,
    raw_class: &str,
    grade_column: Option<&str>,
  ) -> Self {
    Self {
      name:   normalize_name(raw_name),
      school: normalize_school(raw_school),
      grade:  grade_label(grade_column, raw_class),
      class:  normalize_class(raw_class),
    }
  }

  /// The hash input: components joined with `_`.
  fn hash_input(&self) -> String {
    format!("{}_{}_{}_{}", self.name, self.school, self.grade, self.class)
  }

  /// Human-readable tuple for collision diagnostics.
  pub fn describe(&self) -> String {
    format!(
      "name={:?} school={:?} grade={:?} class={:?}",
      self.name, self.school, self.grade, self.class
    )
  }
}

fn md5_hex(input: &str) -> String {
  let mut hasher = Md5::new();
  hasher.update(input.as_bytes());
  hex::encode(hasher.finalize())
}

// ─── Student ─────────────────────────────────────────────────────────────────

/// An identity plus its derived keys. `id_unico` is the join key everywhere;
/// `id_display` is a pseudonym for reports and is never used for joins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
  pub identity:   StudentIdentity,
  pub id_unico:   String,
  pub id_display: String,
}

impl Student {
  pub fn new(identity: StudentIdentity) -> Self {
    let id_unico = id_unico(&identity);
    let id_display = id_display(&id_unico, &identity.name);
    Self {
      identity,
      id_unico,
      id_display,
    }
  }
}

/// Lowercase MD5 of the identity tuple, truncated to 12 hex characters.
pub fn id_unico(identity: &StudentIdentity) -> String {
  md5_hex(&identity.hash_input())[..12].to_string()
}

/// First 6 hex of `md5(id_unico)` plus the initials of up to four name parts.
/// Display only.
pub fn id_display(id_unico: &str, name_norm: &str) -> String {
  let prefix = &md5_hex(id_unico)[..6];
  let initials: String = name_norm
    .split_whitespace()
    .take(4)
    .filter_map(|part| part.chars().next())
    .collect();
  format!("{prefix} - {initials}")
}

// ─── Collision ledger ────────────────────────────────────────────────────────

/// Records every `id_unico → identity` association seen during a run.
/// Identical tuples collapse; differing tuples under one id are a fatal
/// collision reported at the end of the pipeline.
#[derive(Debug, Default)]
pub struct IdentityLedger {
  seen:      BTreeMap<String, StudentIdentity>,
  conflicts: BTreeMap<String, Vec<StudentIdentity>>,
}

impl IdentityLedger {
  pub fn new() -> Self { Self::default() }

  pub fn observe(&mut self, student: &Student) {
    match self.seen.get(&student.id_unico) {
      None => {
        self
          .seen
          .insert(student.id_unico.clone(), student.identity.clone());
      }
      Some(existing) if *existing == student.identity => {}
      Some(existing) => {
        let entry = self
          .conflicts
          .entry(student.id_unico.clone())
          .or_insert_with(|| vec![existing.clone()]);
        if !entry.contains(&student.identity) {
          entry.push(student.identity.clone());
        }
      }
    }
  }

  /// Fails with [`Error::IdentityCollision`] on the first colliding id,
  /// carrying every identity tuple observed under it.
  pub fn verify(&self) -> Result<()> {
    if let Some((id_unico, identities)) = self.conflicts.first_key_value() {
      return Err(Error::IdentityCollision {
        id_unico:   id_unico.clone(),
        identities: identities.iter().map(StudentIdentity::describe).collect(),
      });
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ana() -> StudentIdentity {
    StudentIdentity::from_raw("Ana Maria da Silva", "E1", "A", Some("6º ANO"))
  }

  #[test]
  fn id_unico_is_deterministic_and_12_hex() {
    let a = id_unico(&ana());
    let b = id_unico(&ana());
    assert_eq!(a, b);
    assert_eq!(a.len(), 12);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(a, a.to_lowercase());
  }

  #[test]
  fn id_unico_depends_on_every_component() {
    let base = ana();
    let mut other_school = base.clone();
    other_school.school = "E2".into();
    let mut other_class = base.clone();
    other_class.class = "B".into();

    assert_ne!(id_unico(&base), id_unico(&other_school));
    assert_ne!(id_unico(&base), id_unico(&other_class));
  }

  #[test]
  fn display_pseudonym_shape() {
    let student = Student::new(ana());
    let (hash_part, initials) =
      student.id_display.split_once(" - ").expect("separator");
    assert_eq!(hash_part.len(), 6);
    // First letter of up to four parts of "ANA MARIA DA SILVA".
    assert_eq!(initials, "AMDS");
  }

  #[test]
  fn ledger_collapses_benign_duplicates() {
    let mut ledger = IdentityLedger::new();
    ledger.observe(&Student::new(ana()));
    ledger.observe(&Student::new(ana()));
    assert!(ledger.verify().is_ok());
  }

  #[test]
  fn ledger_reports_collisions() {
    let student = Student::new(ana());
    let mut forged = Student::new(StudentIdentity::from_raw(
      "Outra Pessoa",
      "E9",
      "C",
      Some("8º ANO"),
    ));
    forged.id_unico = student.id_unico.clone();

    let mut ledger = IdentityLedger::new();
    ledger.observe(&student);
    ledger.observe(&forged);

    let err = ledger.verify().unwrap_err();
    assert!(matches!(err, Error::IdentityCollision { .. }));
  }
}

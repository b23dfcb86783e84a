//! Embedded Brazilian-Portuguese given-name dictionary.
//!
//! Entries carry a gender class and a confidence; a lookup is accepted by the
//! inferer only when the confidence clears [`DICTIONARY_THRESHOLD`]. The
//! table covers the high-frequency names of the served population; the tail
//! is left to the suffix heuristics and the optional LLM pass.

use std::collections::BTreeMap;

use wordgen_core::record::Sex;

/// Minimum confidence for a dictionary hit to be accepted.
pub const DICTIONARY_THRESHOLD: f64 = 0.75;

/// Gender class of a dictionary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenderClass {
  M,
  F,
  MostlyM,
  MostlyF,
  Ambiguous,
}

impl GenderClass {
  /// The sex a class resolves to, if it resolves at all.
  pub fn sex(self) -> Option<Sex> {
    match self {
      Self::M | Self::MostlyM => Some(Sex::M),
      Self::F | Self::MostlyF => Some(Sex::F),
      Self::Ambiguous => None,
    }
  }
}

#[rustfmt::skip]
const ENTRIES: &[(&str, GenderClass, f64)] = &[
  // Feminine.
  ("MARIA", GenderClass::F, 0.99), ("ANA", GenderClass::F, 0.99),
  ("FRANCISCA", GenderClass::F, 0.98), ("ANTONIA", GenderClass::F, 0.97),
  ("ADRIANA", GenderClass::F, 0.98), ("JULIANA", GenderClass::F, 0.98),
  ("MARCIA", GenderClass::F, 0.98), ("FERNANDA", GenderClass::F, 0.98),
  ("PATRICIA", GenderClass::F, 0.98), ("ALINE", GenderClass::F, 0.97),
  ("CAMILA", GenderClass::F, 0.98), ("AMANDA", GenderClass::F, 0.98),
  ("BRUNA", GenderClass::F, 0.98), ("JESSICA", GenderClass::F, 0.97),
  ("LETICIA", GenderClass::F, 0.98), ("JULIA", GenderClass::F, 0.98),
  ("LUCIANA", GenderClass::F, 0.98), ("VANESSA", GenderClass::F, 0.98),
  ("MARIANA", GenderClass::F, 0.98), ("GABRIELA", GenderClass::F, 0.97),
  ("VITORIA", GenderClass::F, 0.97), ("LARISSA", GenderClass::F, 0.97),
  ("SOPHIA", GenderClass::F, 0.98), ("SOFIA", GenderClass::F, 0.98),
  ("ISABELA", GenderClass::F, 0.97), ("ISABELLA", GenderClass::F, 0.97),
  ("HELENA", GenderClass::F, 0.98), ("VALENTINA", GenderClass::F, 0.98),
  ("LAURA", GenderClass::F, 0.98), ("ALICE", GenderClass::F, 0.98),
  ("BEATRIZ", GenderClass::F, 0.97), ("LIVIA", GenderClass::F, 0.96),
  ("LORENA", GenderClass::F, 0.96), ("CECILIA", GenderClass::F, 0.97),
  ("CLARA", GenderClass::F, 0.97), ("RAFAELA", GenderClass::F, 0.97),
  ("CAROLINA", GenderClass::F, 0.97), ("REBECA", GenderClass::F, 0.96),
  ("SARA", GenderClass::F, 0.96), ("SARAH", GenderClass::F, 0.96),
  ("DEBORA", GenderClass::F, 0.96), ("YASMIN", GenderClass::F, 0.95),
  ("MELISSA", GenderClass::F, 0.96), ("LUANA", GenderClass::F, 0.96),
  ("MILENA", GenderClass::F, 0.96), ("EDUARDA", GenderClass::F, 0.97),
  ("EMILLY", GenderClass::F, 0.95), ("ESTER", GenderClass::F, 0.93),
  ("LAVINIA", GenderClass::F, 0.96), ("HELOISA", GenderClass::F, 0.97),
  ("MANUELA", GenderClass::F, 0.97), ("AGATHA", GenderClass::F, 0.96),

  // Masculine.
  ("JOSE", GenderClass::M, 0.99), ("JOAO", GenderClass::M, 0.99),
  ("ANTONIO", GenderClass::M, 0.99), ("FRANCISCO", GenderClass::M, 0.98),
  ("CARLOS", GenderClass::M, 0.99), ("PAULO", GenderClass::M, 0.99),
  ("PEDRO", GenderClass::M, 0.98), ("LUCAS", GenderClass::M, 0.98),
  ("LUIZ", GenderClass::M, 0.99), ("LUIS", GenderClass::M, 0.98),
  ("MARCOS", GenderClass::M, 0.98), ("GABRIEL", GenderClass::M, 0.98),
  ("RAFAEL", GenderClass::M, 0.98), ("DANIEL", GenderClass::M, 0.97),
  ("MARCELO", GenderClass::M, 0.98), ("BRUNO", GenderClass::M, 0.98),
  ("EDUARDO", GenderClass::M, 0.98), ("FELIPE", GenderClass::M, 0.98),
  ("RODRIGO", GenderClass::M, 0.98), ("MANOEL", GenderClass::M, 0.98),
  ("MATEUS", GenderClass::M, 0.97), ("MATHEUS", GenderClass::M, 0.97),
  ("ANDRE", GenderClass::M, 0.98), ("FERNANDO", GenderClass::M, 0.98),
  ("FABIO", GenderClass::M, 0.98), ("LEONARDO", GenderClass::M, 0.98),
  ("GUSTAVO", GenderClass::M, 0.98), ("GUILHERME", GenderClass::M, 0.98),
  ("LEANDRO", GenderClass::M, 0.98), ("TIAGO", GenderClass::M, 0.97),
  ("THIAGO", GenderClass::M, 0.97), ("VINICIUS", GenderClass::M, 0.97),
  ("MIGUEL", GenderClass::M, 0.98), ("ARTHUR", GenderClass::M, 0.98),
  ("HEITOR", GenderClass::M, 0.98), ("BERNARDO", GenderClass::M, 0.98),
  ("DAVI", GenderClass::M, 0.97), ("DAVID", GenderClass::M, 0.97),
  ("THEO", GenderClass::M, 0.96), ("LORENZO", GenderClass::M, 0.97),
  ("ENZO", GenderClass::M, 0.97), ("NICOLAS", GenderClass::M, 0.96),
  ("SAMUEL", GenderClass::M, 0.97), ("HENRIQUE", GenderClass::M, 0.97),
  ("BENJAMIN", GenderClass::M, 0.96), ("CAIO", GenderClass::M, 0.97),
  ("RYAN", GenderClass::M, 0.95), ("ERICK", GenderClass::M, 0.95),
  ("KAUA", GenderClass::M, 0.93), ("WESLEY", GenderClass::M, 0.95),
  ("IGOR", GenderClass::M, 0.96), ("OTAVIO", GenderClass::M, 0.96),
  ("CESAR", GenderClass::M, 0.96), ("JONAS", GenderClass::M, 0.96),
  ("ELIAS", GenderClass::M, 0.96), ("LUCA", GenderClass::M, 0.94),

  // Ambiguous or only mostly one-sided.
  ("ANDREA", GenderClass::MostlyF, 0.85),
  ("ALEX", GenderClass::MostlyM, 0.90),
  ("SIDNEY", GenderClass::MostlyM, 0.80),
  ("ARIEL", GenderClass::Ambiguous, 0.50),
  ("DARCI", GenderClass::Ambiguous, 0.50),
  ("JACI", GenderClass::Ambiguous, 0.50),
  ("DOMINIQUE", GenderClass::Ambiguous, 0.55),
];

/// A lookup table over normalized (uppercase, accent-free) first names.
#[derive(Debug, Clone)]
pub struct Dictionary {
  entries: BTreeMap<String, (GenderClass, f64)>,
}

impl Dictionary {
  /// The embedded table.
  pub fn embedded() -> Self {
    let entries = ENTRIES
      .iter()
      .map(|(name, class, confidence)| {
        (name.to_string(), (*class, *confidence))
      })
      .collect();
    Self { entries }
  }

  /// Add or replace an entry. Used by tests and by integrators with local
  /// census data.
  pub fn insert(&mut self, name: impl Into<String>, class: GenderClass, confidence: f64) {
    self.entries.insert(name.into(), (class, confidence));
  }

  pub fn lookup(&self, name: &str) -> Option<(GenderClass, f64)> {
    self.entries.get(name).copied()
  }
}

impl Default for Dictionary {
  fn default() -> Self { Self::embedded() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn common_names_resolve() {
    let dict = Dictionary::embedded();
    let (class, confidence) = dict.lookup("MARIA").unwrap();
    assert_eq!(class.sex(), Some(Sex::F));
    assert!(confidence >= DICTIONARY_THRESHOLD);

    let (class, _) = dict.lookup("JOAO").unwrap();
    assert_eq!(class.sex(), Some(Sex::M));
  }

  #[test]
  fn ambiguous_names_do_not_resolve() {
    let dict = Dictionary::embedded();
    let (class, _) = dict.lookup("ARIEL").unwrap();
    assert_eq!(class.sex(), None);
  }

  #[test]
  fn unknown_names_miss() {
    assert!(Dictionary::embedded().lookup("ADRYEL").is_none());
  }

  #[test]
  fn suffix_trap_names_are_listed_masculine() {
    let dict = Dictionary::embedded();
    for name in ["LUCA", "JONAS", "ELIAS"] {
      assert_eq!(dict.lookup(name).unwrap().0.sex(), Some(Sex::M), "{name}");
    }
  }
}

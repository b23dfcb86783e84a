//! Portuguese suffix heuristics.
//!
//! The weakest method: a name ending in a configured feminine or masculine
//! suffix is classified with a flat confidence. The exceptions list guards
//! the well-known traps (masculine names with feminine endings); the longest
//! matching suffix wins, and a tie between the two lists resolves to nothing.

use wordgen_core::{config::SexInferenceConfig, record::Sex};

/// Confidence assigned to every suffix classification.
pub const SUFFIX_CONFIDENCE: f64 = 0.65;

fn longest_match(name: &str, suffixes: &[String]) -> usize {
  suffixes
    .iter()
    .filter(|s| name.ends_with(s.to_uppercase().as_str()))
    .map(|s| s.len())
    .max()
    .unwrap_or(0)
}

/// Classify a normalized first name by its ending, or decline to.
pub fn classify_suffix(name: &str, cfg: &SexInferenceConfig) -> Option<Sex> {
  if name.is_empty() || cfg.suffix_exceptions.iter().any(|e| e == name) {
    return None;
  }

  let feminine = longest_match(name, &cfg.feminine_suffixes);
  let masculine = longest_match(name, &cfg.masculine_suffixes);

  if feminine > masculine {
    Some(Sex::F)
  } else if masculine > feminine {
    Some(Sex::M)
  } else {
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn cfg() -> SexInferenceConfig { SexInferenceConfig::default() }

  #[test]
  fn feminine_and_masculine_endings() {
    assert_eq!(classify_suffix("ADRIELA", &cfg()), Some(Sex::F));
    assert_eq!(classify_suffix("MARCELINO", &cfg()), Some(Sex::M));
    assert_eq!(classify_suffix("ROBSON", &cfg()), Some(Sex::M));
  }

  #[test]
  fn longest_suffix_wins() {
    // "ardo" (masculine) is longer than "o" alone and than any feminine hit.
    assert_eq!(classify_suffix("EVERARDO", &cfg()), Some(Sex::M));
  }

  #[test]
  fn exceptions_are_untouched() {
    for name in ["LUCA", "JONAS", "ELIAS"] {
      assert_eq!(classify_suffix(name, &cfg()), None, "{name}");
    }
  }

  #[test]
  fn no_matching_suffix_declines() {
    assert_eq!(classify_suffix("KAUAN", &cfg()), None);
    assert_eq!(classify_suffix("", &cfg()), None);
  }
}

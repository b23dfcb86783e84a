//! Free-text canonicalization.
//!
//! Raw tables arrive hand-typed: mixed case, stray accents, double spaces,
//! ordinal markers. Everything that participates in identity or grouping is
//! folded through here first so that equality is exact. All functions return
//! sentinels on malformed input; none of them panics.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::config::GradeBandPolicy;

// ─── Sentinels ───────────────────────────────────────────────────────────────

/// Grade label for rows whose class/grade text could not be parsed. Kept as
/// its own stratum so aggregate totals reconcile.
pub const GRADE_UNKNOWN: &str = "Não identificado";

pub const BAND_6_7: &str = "6º/7º anos";
pub const BAND_8_9: &str = "8º/9º anos";
pub const BAND_UNKNOWN: &str = "Indeterminado";

// ─── Folding ─────────────────────────────────────────────────────────────────

/// Uppercase, strip combining marks (NFD then drop `Mn`), replace every
/// non-alphanumeric with a space, collapse runs of whitespace, trim.
pub fn fold_text(s: &str) -> String {
  let upper = s.to_uppercase();
  let stripped: String = upper.nfd().filter(|c| !is_combining_mark(*c)).collect();
  let mut out = String::with_capacity(stripped.len());
  let mut pending_space = false;
  for c in stripped.chars() {
    if c.is_alphanumeric() {
      if pending_space && !out.is_empty() {
        out.push(' ');
      }
      pending_space = false;
      out.push(c);
    } else {
      pending_space = true;
    }
  }
  out
}

/// Name normalization: [`fold_text`] with digits removed as well — student
/// names carry no meaningful digits, but typos do happen.
pub fn normalize_name(s: &str) -> String {
  let folded = fold_text(s);
  let mut out = String::with_capacity(folded.len());
  let mut pending_space = false;
  for c in folded.chars() {
    if c.is_alphabetic() {
      if pending_space && !out.is_empty() {
        out.push(' ');
      }
      pending_space = false;
      out.push(c);
    } else {
      pending_space = true;
    }
  }
  out
}

/// School names keep digits (school codes like "EMEF 12 DE OUTUBRO").
pub fn normalize_school(s: &str) -> String { fold_text(s) }

/// Class labels keep digits ("6A", "7B MANHA").
pub fn normalize_class(s: &str) -> String { fold_text(s) }

/// First whitespace-separated part of a normalized name.
pub fn first_name(name_norm: &str) -> &str {
  name_norm.split_whitespace().next().unwrap_or(name_norm)
}

// ─── Grade extraction ────────────────────────────────────────────────────────

/// Leading digit 5..=9 of a token, with the remainder.
fn split_grade_token(tok: &str) -> Option<(u8, &str)> {
  let first = tok.chars().next()?;
  let d = first.to_digit(10)? as u8;
  if !(5..=9).contains(&d) {
    return None;
  }
  Some((d, &tok[1..]))
}

/// Scan `text` for a grade-year mention and return the canonical label
/// (`"6º ANO"`). Primary rule: digit 5..=9 adjacent to an optional ordinal
/// indicator and the token `ANO`; fallback: an isolated digit 5..=9.
///
/// Accent folding means `"6º ANO"`, `"6ª ano"`, `"6oANO"` and `"6 anos"` all
/// resolve to the same label.
pub fn extract_grade(text: &str) -> Option<String> {
  let folded = fold_text(text);
  let tokens: Vec<&str> = folded.split_whitespace().collect();

  for (i, tok) in tokens.iter().enumerate() {
    let Some((d, rest)) = split_grade_token(tok) else {
      continue;
    };
    // Ordinal indicators: "º"/"ª" are Unicode letters and survive folding;
    // "o"/"a" arrive uppercased. Strip at most one, glued to the digit.
    let rest = rest
      .strip_prefix(['º', 'ª', 'O', 'A'])
      .unwrap_or(rest);
    let fused = rest.starts_with("ANO");
    let next_is_ano =
      rest.is_empty() && tokens.get(i + 1).is_some_and(|t| t.starts_with("ANO"));
    if fused || next_is_ano {
      return Some(format!("{d}º ANO"));
    }
  }

  for tok in &tokens {
    if let Some((d, rest)) = split_grade_token(tok) {
      let rest = rest.strip_prefix(['º', 'ª']).unwrap_or(rest);
      if rest.is_empty() {
        return Some(format!("{d}º ANO"));
      }
    }
  }

  None
}

/// Canonical grade label for a row: the dedicated grade column wins, then the
/// class label, then the sentinel.
pub fn grade_label(grade_column: Option<&str>, class: &str) -> String {
  grade_column
    .and_then(extract_grade)
    .or_else(|| extract_grade(class))
    .unwrap_or_else(|| GRADE_UNKNOWN.to_string())
}

/// Grade-band tag for a canonical grade label.
pub fn grade_band(policy: GradeBandPolicy, grade_label: &str) -> &'static str {
  let digit = grade_label.chars().next().and_then(|c| c.to_digit(10));
  match policy {
    GradeBandPolicy::SixSevenVsEightNine => match digit {
      Some(5..=7) => BAND_6_7,
      Some(8 | 9) => BAND_8_9,
      _ => BAND_UNKNOWN,
    },
  }
}

// ─── Slugs ───────────────────────────────────────────────────────────────────

/// ASCII slug of a skill keyword for wide column names: accents folded,
/// lowercased, word separators collapsed to `_`, non-ASCII residue dropped.
pub fn skill_slug(s: &str) -> String {
  let folded = fold_text(s).to_lowercase();
  folded
    .split_whitespace()
    .collect::<Vec<_>>()
    .join("_")
    .chars()
    .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fold_strips_accents_and_collapses_whitespace() {
    assert_eq!(fold_text("  João   da  Conceição "), "JOAO DA CONCEICAO");
    assert_eq!(fold_text("Çédille"), "CEDILLE");
  }

  #[test]
  fn normalize_name_drops_punctuation_and_digits() {
    assert_eq!(normalize_name("ana-maria d'ávila 2"), "ANA MARIA D AVILA");
  }

  #[test]
  fn school_keeps_digits() {
    assert_eq!(normalize_school("EMEF 12 de Outubro"), "EMEF 12 DE OUTUBRO");
  }

  #[test]
  fn grade_from_common_spellings() {
    for raw in ["6º ANO", "6ª ano", "6o ANO", "6ºANO A", "turma do 6 ano"] {
      assert_eq!(extract_grade(raw).as_deref(), Some("6º ANO"), "input {raw:?}");
    }
  }

  #[test]
  fn grade_fallback_isolated_digit() {
    assert_eq!(extract_grade("TURMA 8").as_deref(), Some("8º ANO"));
    assert_eq!(extract_grade("TURMA 8º").as_deref(), Some("8º ANO"));
    assert_eq!(extract_grade("TURMA 4"), None);
    assert_eq!(extract_grade("sem serie"), None);
  }

  #[test]
  fn grade_label_prefers_grade_column() {
    assert_eq!(grade_label(Some("7º ano"), "6A"), "7º ANO");
    assert_eq!(grade_label(None, "9º ANO B"), "9º ANO");
    assert_eq!(grade_label(None, "manhã"), GRADE_UNKNOWN);
  }

  #[test]
  fn band_tags() {
    let p = GradeBandPolicy::SixSevenVsEightNine;
    assert_eq!(grade_band(p, "5º ANO"), BAND_6_7);
    assert_eq!(grade_band(p, "6º ANO"), BAND_6_7);
    assert_eq!(grade_band(p, "8º ANO"), BAND_8_9);
    assert_eq!(grade_band(p, GRADE_UNKNOWN), BAND_UNKNOWN);
  }

  #[test]
  fn slugs_are_ascii_lowercase() {
    assert_eq!(skill_slug("Ortografia"), "ortografia");
    assert_eq!(skill_slug("Uso do Dicionário"), "uso_do_dicionario");
    assert_eq!(skill_slug("ação"), "acao");
  }
}

//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Canonical form for reordering comparison: surrounding whitespace
/// stripped, lowercased.
pub fn normalize_term(s: &str) -> String {
  s.trim().to_lowercase()
}

/// Pull the outermost JSON array out of a model completion.
/// Completions sometimes wrap the payload in prose or markdown fences;
/// the grab is everything from the first '[' to the last ']'.
pub fn extract_json_array(text: &str) -> Option<&str> {
  let start = text.find('[')?;
  let end = text.rfind(']')?;
  if end < start {
    return None;
  }
  Some(&text[start..=end])
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
#[allow(dead_code)]
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max { s.to_string() } else { format!("{}… ({} bytes total)", &s[..max], s.len()) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn template_fills_all_occurrences() {
    let out = fill_template("{a} and {b} and {a}", &[("a", "x"), ("b", "y")]);
    assert_eq!(out, "x and y and x");
  }

  #[test]
  fn normalize_trims_and_lowercases() {
    assert_eq!(normalize_term("  Alpha "), "alpha");
    assert_eq!(normalize_term("GAMMA"), "gamma");
  }

  #[test]
  fn json_array_is_extracted_from_fenced_output() {
    let text = "Here you go:\n```json\n[{\"type\":\"mcq\"}]\n```";
    assert_eq!(extract_json_array(text), Some("[{\"type\":\"mcq\"}]"));
  }

  #[test]
  fn no_array_yields_none() {
    assert_eq!(extract_json_array("nothing here"), None);
    assert_eq!(extract_json_array("] backwards ["), None);
  }
}

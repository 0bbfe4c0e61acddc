//! Answer evaluation: pure verdict computation for the three question kinds.
//!
//! `evaluate` is a total function over (question, response): no I/O, no
//! state between calls, safe to call from any number of tasks at once.
//! A response that simply does not match is a negative verdict, never an
//! error; a question that lacks the fields its kind requires surfaces as
//! [`GradingError::InvalidQuestionData`] so callers can tell "wrong
//! answer" apart from "broken question".

use std::error::Error;
use std::fmt;

use crate::domain::{Question, QuestionBody, Rect, Response, Zone};
use crate::util::normalize_term;

/// Fixed alphabet for letter-form answer keys ("a" selects option 0).
const OPTION_LETTERS: &str = "abcd";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GradingError {
  /// The question lacks fields required for its declared kind.
  InvalidQuestionData { question_id: String, reason: String },
  /// The response variant does not match the question variant.
  ResponseMismatch { question_id: String, expected: &'static str, got: &'static str },
}

impl fmt::Display for GradingError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      GradingError::InvalidQuestionData { question_id, reason } =>
        write!(f, "invalid question data for '{}': {}", question_id, reason),
      GradingError::ResponseMismatch { question_id, expected, got } =>
        write!(f, "response shape mismatch for '{}': expected {}, got {}", question_id, expected, got),
    }
  }
}

impl Error for GradingError {}

/// Decide pass/fail for one (question, response) pair.
pub fn evaluate(question: &Question, response: &Response) -> Result<bool, GradingError> {
  match (&question.body, response) {
    (QuestionBody::Mcq { options, correct_answers, allow_multiple_answers, .. }, Response::Mcq { selected }) =>
      grade_mcq(question, options, correct_answers, *allow_multiple_answers, selected),
    (QuestionBody::Reordering { items, correct_order, .. }, Response::Reordering { order }) =>
      grade_reordering(question, items.len(), items.iter().map(|i| i.text.as_str()), correct_order, order),
    (QuestionBody::Hotspot { zones, .. }, Response::Hotspot { selection }) =>
      Ok(grade_hotspot(zones, selection.as_ref())),
    (body, resp) => Err(GradingError::ResponseMismatch {
      question_id: question.id.clone(),
      expected: body.kind(),
      got: resp.kind(),
    }),
  }
}

/// Structural check used by the authoring/save and generation paths, so a
/// question that could never grade is rejected before it reaches anyone.
pub fn validate_question(q: &Question) -> Result<(), GradingError> {
  let invalid = |reason: &str| {
    Err(GradingError::InvalidQuestionData { question_id: q.id.clone(), reason: reason.into() })
  };
  match &q.body {
    QuestionBody::Mcq { options, correct_answers, .. } => {
      if options.is_empty() {
        return invalid("mcq has no options");
      }
      if correct_answers.is_empty() {
        return invalid("mcq has no correct answers");
      }
      Ok(())
    }
    QuestionBody::Reordering { items, .. } => {
      if items.is_empty() {
        return invalid("reordering has no items");
      }
      Ok(())
    }
    // Zero zones (or zero correct zones) is authorable; it grades as
    // "never correct" rather than as malformed.
    QuestionBody::Hotspot { .. } => Ok(()),
  }
}

/// Map a single letter token to a zero-based option index.
fn letter_to_index(token: &str) -> Option<usize> {
  let lower = token.to_lowercase();
  let mut chars = lower.chars();
  match (chars.next(), chars.next()) {
    (Some(c), None) => OPTION_LETTERS.find(c),
    _ => None,
  }
}

/// Resolve one answer-key entry to an option index, trying the letter
/// table, then verbatim option text, then a stringified index.
fn answer_to_index(ans: &str, options: &[String]) -> Option<usize> {
  if let Some(i) = letter_to_index(ans) {
    return Some(i);
  }
  if let Some(i) = options.iter().position(|o| o == ans) {
    return Some(i);
  }
  ans.parse::<usize>().ok().filter(|i| *i < options.len())
}

fn grade_mcq(
  q: &Question,
  options: &[String],
  correct_answers: &[String],
  allow_multiple: bool,
  selected: &[usize],
) -> Result<bool, GradingError> {
  validate_question(q)?;

  if allow_multiple {
    // Multi-select: the selection set must match the answer-key set exactly.
    let mut want: Vec<usize> = correct_answers
      .iter()
      .filter_map(|ans| answer_to_index(ans, options))
      .collect();
    want.sort_unstable();
    want.dedup();
    let mut got: Vec<usize> = selected.iter().copied().collect();
    got.sort_unstable();
    got.dedup();
    return Ok(!want.is_empty() && want == got);
  }

  // Single-select: at most one index is graded.
  let Some(&index) = selected.first() else { return Ok(false) };
  let Some(chosen) = options.get(index) else { return Ok(false) };

  Ok(correct_answers.iter().any(|ans| match letter_to_index(ans) {
    Some(i) => i == index,
    None => ans == chosen || *ans == index.to_string(),
  }))
}

fn grade_reordering<'a>(
  q: &Question,
  item_count: usize,
  item_texts: impl Iterator<Item = &'a str>,
  correct_order: &[String],
  submitted: &[String],
) -> Result<bool, GradingError> {
  if item_count == 0 {
    return Err(GradingError::InvalidQuestionData {
      question_id: q.id.clone(),
      reason: "reordering has no items".into(),
    });
  }
  let target: Vec<String> = if correct_order.is_empty() {
    item_texts.map(normalize_term).collect()
  } else {
    correct_order.iter().map(|t| normalize_term(t)).collect()
  };
  let got: Vec<String> = submitted.iter().map(|t| normalize_term(t)).collect();
  // Position matters: ordered element-wise equality, not set membership.
  Ok(got == target)
}

fn grade_hotspot(zones: &[Zone], selection: Option<&Rect>) -> bool {
  let Some(sel) = selection else { return false };
  zones.iter().any(|z| z.is_correct && overlap_area(sel, z) > 0.0)
}

/// Intersection area of the drawn rectangle and a zone (AABB overlap).
fn overlap_area(r: &Rect, z: &Zone) -> f64 {
  let overlap_x = ((r.x + r.width).min(z.x + z.width) - r.x.max(z.x)).max(0.0);
  let overlap_y = ((r.y + r.height).min(z.y + z.height) - r.y.max(z.y)).max(0.0);
  overlap_x * overlap_y
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::OrderItem;

  fn mcq(options: &[&str], correct: &[&str], multi: bool) -> Question {
    Question {
      id: "q-mcq".into(),
      stem: "pick one".into(),
      explanation: "because".into(),
      points: 1,
      body: QuestionBody::Mcq {
        options: options.iter().map(|s| s.to_string()).collect(),
        correct_answers: correct.iter().map(|s| s.to_string()).collect(),
        allow_multiple_answers: multi,
        distractor_feedback: None,
      },
    }
  }

  fn reordering(items: &[&str], correct_order: &[&str]) -> Question {
    Question {
      id: "q-ord".into(),
      stem: String::new(),
      explanation: String::new(),
      points: 1,
      body: QuestionBody::Reordering {
        items: items
          .iter()
          .enumerate()
          .map(|(i, t)| OrderItem { id: i as i64 + 1, text: t.to_string() })
          .collect(),
        correct_order: correct_order.iter().map(|s| s.to_string()).collect(),
        instructions: String::new(),
      },
    }
  }

  fn hotspot(zones: Vec<Zone>) -> Question {
    Question {
      id: "q-hot".into(),
      stem: String::new(),
      explanation: String::new(),
      points: 1,
      body: QuestionBody::Hotspot {
        zones,
        image_url: String::new(),
        instructions: String::new(),
      },
    }
  }

  fn zone(x: f64, y: f64, w: f64, h: f64, correct: bool) -> Zone {
    Zone { x, y, width: w, height: h, is_correct: correct }
  }

  fn pick(i: usize) -> Response {
    Response::Mcq { selected: vec![i] }
  }

  #[test]
  fn mcq_letter_key_maps_to_index() {
    let q = mcq(&["w", "x", "y", "z"], &["b"], false);
    assert_eq!(evaluate(&q, &pick(1)), Ok(true));
    assert_eq!(evaluate(&q, &pick(0)), Ok(false));
  }

  #[test]
  fn mcq_letter_key_is_case_insensitive() {
    let q = mcq(&["w", "x", "y", "z"], &["B"], false);
    assert_eq!(evaluate(&q, &pick(1)), Ok(true));
  }

  #[test]
  fn mcq_matches_option_text_verbatim() {
    let q = mcq(&["London", "Paris", "Rome", "Berlin"], &["Paris"], false);
    assert_eq!(evaluate(&q, &pick(1)), Ok(true));
    assert_eq!(evaluate(&q, &pick(2)), Ok(false));
  }

  #[test]
  fn mcq_matches_stringified_index() {
    let q = mcq(&["London", "Paris", "Rome", "Berlin"], &["2"], false);
    assert_eq!(evaluate(&q, &pick(2)), Ok(true));
    assert_eq!(evaluate(&q, &pick(1)), Ok(false));
  }

  #[test]
  fn mcq_any_key_entry_suffices() {
    let q = mcq(&["w", "x", "y", "z"], &["a", "z"], false);
    assert_eq!(evaluate(&q, &pick(0)), Ok(true));
    assert_eq!(evaluate(&q, &pick(3)), Ok(true));
    assert_eq!(evaluate(&q, &pick(2)), Ok(false));
  }

  #[test]
  fn mcq_out_of_range_selection_is_incorrect() {
    let q = mcq(&["w", "x"], &["a"], false);
    assert_eq!(evaluate(&q, &pick(9)), Ok(false));
  }

  #[test]
  fn mcq_empty_selection_is_incorrect() {
    let q = mcq(&["w", "x"], &["a"], false);
    assert_eq!(evaluate(&q, &Response::Mcq { selected: vec![] }), Ok(false));
  }

  #[test]
  fn mcq_multi_select_requires_exact_set() {
    let q = mcq(&["w", "x", "y", "z"], &["a", "c"], true);
    let yes = Response::Mcq { selected: vec![2, 0] };
    let partial = Response::Mcq { selected: vec![0] };
    let extra = Response::Mcq { selected: vec![0, 2, 3] };
    assert_eq!(evaluate(&q, &yes), Ok(true));
    assert_eq!(evaluate(&q, &partial), Ok(false));
    assert_eq!(evaluate(&q, &extra), Ok(false));
  }

  #[test]
  fn mcq_multi_select_resolves_mixed_key_forms() {
    // "b" by letter, "z" by text, "0" by stringified index.
    let q = mcq(&["w", "x", "y", "z"], &["b", "z", "0"], true);
    let resp = Response::Mcq { selected: vec![0, 1, 3] };
    assert_eq!(evaluate(&q, &resp), Ok(true));
  }

  #[test]
  fn mcq_without_options_is_invalid_question_data() {
    let q = mcq(&[], &["a"], false);
    match evaluate(&q, &pick(0)) {
      Err(GradingError::InvalidQuestionData { .. }) => {}
      other => panic!("expected InvalidQuestionData, got {:?}", other),
    }
  }

  #[test]
  fn mcq_without_answer_key_is_invalid_question_data() {
    let q = mcq(&["w", "x"], &[], false);
    assert!(matches!(
      evaluate(&q, &pick(0)),
      Err(GradingError::InvalidQuestionData { .. })
    ));
  }

  #[test]
  fn reordering_is_case_and_space_insensitive() {
    let q = reordering(&["  Alpha", "beta", "GAMMA"], &["alpha", "Beta", "gamma"]);
    let right = Response::Reordering {
      order: vec!["Alpha".into(), "beta".into(), "GAMMA".into()],
    };
    let wrong = Response::Reordering {
      order: vec!["beta".into(), "Alpha".into(), "GAMMA".into()],
    };
    assert_eq!(evaluate(&q, &right), Ok(true));
    assert_eq!(evaluate(&q, &wrong), Ok(false));
  }

  #[test]
  fn reordering_falls_back_to_authored_item_order() {
    let q = reordering(&["A", "B", "C"], &[]);
    let right = Response::Reordering { order: vec!["A".into(), "B".into(), "C".into()] };
    let reversed = Response::Reordering { order: vec!["C".into(), "B".into(), "A".into()] };
    assert_eq!(evaluate(&q, &right), Ok(true));
    assert_eq!(evaluate(&q, &reversed), Ok(false));
  }

  #[test]
  fn reordering_without_items_is_invalid_question_data() {
    let q = reordering(&[], &["a", "b"]);
    assert!(matches!(
      evaluate(&q, &Response::Reordering { order: vec!["a".into(), "b".into()] }),
      Err(GradingError::InvalidQuestionData { .. })
    ));
  }

  #[test]
  fn hotspot_positive_overlap_with_correct_zone_passes() {
    let q = hotspot(vec![zone(10.0, 10.0, 20.0, 20.0, true)]);
    let hit = Response::Hotspot {
      selection: Some(Rect { x: 15.0, y: 15.0, width: 20.0, height: 20.0 }),
    };
    let miss = Response::Hotspot {
      selection: Some(Rect { x: 40.0, y: 40.0, width: 5.0, height: 5.0 }),
    };
    assert_eq!(evaluate(&q, &hit), Ok(true));
    assert_eq!(evaluate(&q, &miss), Ok(false));
  }

  #[test]
  fn hotspot_edge_touch_has_zero_area_and_fails() {
    let q = hotspot(vec![zone(10.0, 10.0, 20.0, 20.0, true)]);
    let touch = Response::Hotspot {
      selection: Some(Rect { x: 30.0, y: 10.0, width: 10.0, height: 10.0 }),
    };
    assert_eq!(evaluate(&q, &touch), Ok(false));
  }

  #[test]
  fn hotspot_ignores_incorrect_zones() {
    let q = hotspot(vec![
      zone(10.0, 10.0, 20.0, 20.0, false),
      zone(50.0, 50.0, 10.0, 10.0, false),
    ]);
    let inside = Response::Hotspot {
      selection: Some(Rect { x: 12.0, y: 12.0, width: 5.0, height: 5.0 }),
    };
    assert_eq!(evaluate(&q, &inside), Ok(false));
  }

  #[test]
  fn hotspot_without_selection_is_incorrect() {
    let q = hotspot(vec![zone(10.0, 10.0, 20.0, 20.0, true)]);
    assert_eq!(evaluate(&q, &Response::Hotspot { selection: None }), Ok(false));
  }

  #[test]
  fn mismatched_response_shape_is_reported() {
    let q = mcq(&["w", "x"], &["a"], false);
    let resp = Response::Reordering { order: vec![] };
    assert!(matches!(
      evaluate(&q, &resp),
      Err(GradingError::ResponseMismatch { expected: "mcq", got: "reordering", .. })
    ));
  }

  #[test]
  fn evaluation_is_idempotent() {
    let cases: Vec<(Question, Response)> = vec![
      (mcq(&["w", "x", "y", "z"], &["b"], false), pick(1)),
      (
        reordering(&["A", "B"], &[]),
        Response::Reordering { order: vec!["A".into(), "B".into()] },
      ),
      (
        hotspot(vec![zone(0.0, 0.0, 10.0, 10.0, true)]),
        Response::Hotspot { selection: Some(Rect { x: 5.0, y: 5.0, width: 2.0, height: 2.0 }) },
      ),
    ];
    for (q, r) in &cases {
      assert_eq!(evaluate(q, r), evaluate(q, r));
    }
  }
}

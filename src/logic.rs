//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Looking up a stored question and grading one submission against it
//!   - Scoring a whole paper (per-question verdicts + pass/fail)
//!   - Assessment-mode delivery (answer keys stripped, optional shuffle)
//!   - Question generation from uploaded documents and freeform prompts

use std::error::Error;
use std::fmt;

use rand::seq::SliceRandom;
use tracing::{error, info, instrument};

use crate::domain::{Assessment, Question, Response};
use crate::extract::{extract_text, ExtractError};
use crate::grading::{self, GradingError};
use crate::protocol::{AnswerEntry, AssessmentOut, PaperOut, QuestionResultOut};
use crate::state::AppState;

/// Source material handed to the model is capped to keep prompts bounded.
const SOURCE_CHAR_CAP: usize = 8000;

/// Outcome of grading one submission. Distinguishes "wrong answer" from
/// "broken question" and from lookup failures so callers can report each
/// differently.
#[derive(Debug)]
pub enum EvalOutcome {
  Graded { correct: bool, explanation: String },
  UnknownAssessment,
  UnknownQuestion,
  Invalid(GradingError),
  StoreFailed(String),
}

/// Why generation could not produce anything.
#[derive(Debug)]
pub enum GenerationError {
  /// No MISTRAL_API_KEY configured.
  NotConfigured,
  /// The uploaded document yielded no usable text.
  Document(ExtractError),
  /// The upstream model call failed.
  Model(String),
}

impl fmt::Display for GenerationError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      GenerationError::NotConfigured => write!(f, "Mistral API key not configured"),
      GenerationError::Document(e) => write!(f, "{}", e),
      GenerationError::Model(msg) => write!(f, "{}", msg),
    }
  }
}

impl Error for GenerationError {}

/// Grade one (question, response) pair against the stored assessment.
#[instrument(level = "info", skip(state, response), fields(%assessment_id, %question_id))]
pub async fn evaluate_submission(
  state: &AppState,
  assessment_id: &str,
  question_id: &str,
  response: &Response,
) -> EvalOutcome {
  let assessment = match state.store.fetch_assessment(assessment_id).await {
    Ok(Some(a)) => a,
    Ok(None) => return EvalOutcome::UnknownAssessment,
    Err(e) => {
      error!(target: "assessment", %assessment_id, error = %e, "Assessment lookup failed");
      return EvalOutcome::StoreFailed(e.to_string());
    }
  };
  let Some(question) = assessment.questions.iter().find(|q| q.id == question_id) else {
    return EvalOutcome::UnknownQuestion;
  };

  match grading::evaluate(question, response) {
    Ok(correct) => {
      info!(target: "grading", %question_id, %correct, "Submission evaluated");
      EvalOutcome::Graded {
        correct,
        explanation: feedback_for(&assessment, question),
      }
    }
    Err(e) => {
      error!(target: "grading", %question_id, error = %e, "Submission not gradable");
      EvalOutcome::Invalid(e)
    }
  }
}

/// Score a full paper: every stored question is graded against the
/// matching answer (unanswered counts as incorrect, an ungradable
/// question is reported per-question and earns nothing).
pub fn score_paper(assessment: &Assessment, answers: &[AnswerEntry]) -> PaperOut {
  let mut results = Vec::with_capacity(assessment.questions.len());
  let mut earned: u32 = 0;
  let mut possible: u32 = 0;

  for question in &assessment.questions {
    possible += question.points;
    let answer = answers.iter().find(|a| a.question_id == question.id);
    let (correct, grading_error) = match answer {
      None => (false, None),
      Some(entry) => match grading::evaluate(question, &entry.response) {
        Ok(ok) => (ok, None),
        Err(e) => (false, Some(e.to_string())),
      },
    };
    if correct {
      earned += question.points;
    }
    results.push(QuestionResultOut {
      question_id: question.id.clone(),
      correct,
      points_earned: if correct { question.points } else { 0 },
      points_possible: question.points,
      explanation: feedback_for(assessment, question),
      error: grading_error,
    });
  }

  let score = if possible == 0 {
    0.0
  } else {
    earned as f32 * 100.0 / possible as f32
  };
  let passed = score >= assessment.settings.passing_score as f32;
  PaperOut { results, points_earned: earned, points_possible: possible, score, passed }
}

/// Grade a submitted paper against the stored assessment.
#[instrument(level = "info", skip(state, answers), fields(%assessment_id, answer_count = answers.len()))]
pub async fn submit_paper(
  state: &AppState,
  assessment_id: &str,
  answers: &[AnswerEntry],
) -> Result<Option<PaperOut>, String> {
  let assessment = match state.store.fetch_assessment(assessment_id).await {
    Ok(Some(a)) => a,
    Ok(None) => return Ok(None),
    Err(e) => return Err(e.to_string()),
  };
  let paper = score_paper(&assessment, answers);
  info!(
    target: "assessment",
    id = %assessment_id,
    score = %format!("{:.1}", paper.score),
    passed = paper.passed,
    "Paper graded"
  );
  Ok(Some(paper))
}

/// Assessment-mode delivery: the public view of a stored assessment, with
/// question order shuffled when the author asked for it.
#[instrument(level = "info", skip(state), fields(%assessment_id))]
pub async fn start_attempt(
  state: &AppState,
  assessment_id: &str,
) -> Result<Option<AssessmentOut>, String> {
  let assessment = match state.store.fetch_assessment(assessment_id).await {
    Ok(Some(a)) => a,
    Ok(None) => return Ok(None),
    Err(e) => return Err(e.to_string()),
  };

  let mut questions = assessment.questions.clone();
  if assessment.settings.randomize_questions {
    questions.shuffle(&mut rand::thread_rng());
  }
  info!(
    target: "assessment",
    id = %assessment_id,
    question_count = questions.len(),
    shuffled = assessment.settings.randomize_questions,
    "Attempt started"
  );
  Ok(Some(crate::protocol::to_out(&assessment, &questions)))
}

/// Extract text from an uploaded document and prompt the model for a
/// question batch.
#[instrument(level = "info", skip(state, bytes, instructions), fields(%filename, size = bytes.len()))]
pub async fn generate_from_document(
  state: &AppState,
  filename: &str,
  bytes: &[u8],
  instructions: &str,
) -> Result<Vec<Question>, GenerationError> {
  let text = extract_text(filename, bytes).map_err(GenerationError::Document)?;
  let Some(mistral) = &state.mistral else {
    return Err(GenerationError::NotConfigured);
  };
  let snippet: String = text.chars().take(SOURCE_CHAR_CAP).collect();
  mistral
    .generate_questions(&state.prompts, &snippet, instructions)
    .await
    .map_err(GenerationError::Model)
}

/// Freeform authoring assistance: forward the prompt, return the text.
#[instrument(level = "info", skip(state, prompt), fields(prompt_len = prompt.len()))]
pub async fn assist(state: &AppState, prompt: &str) -> Result<String, GenerationError> {
  let Some(mistral) = &state.mistral else {
    return Err(GenerationError::NotConfigured);
  };
  mistral.assist(&state.prompts, prompt).await.map_err(GenerationError::Model)
}

/// Stored feedback is only revealed when the assessment says so.
fn feedback_for(assessment: &Assessment, question: &Question) -> String {
  if assessment.settings.show_feedback {
    question.explanation.clone()
  } else {
    String::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Rect;
  use crate::seeds::sample_assessment;

  fn full_marks_answers() -> Vec<AnswerEntry> {
    vec![
      AnswerEntry {
        question_id: "seed-q1".into(),
        response: Response::Mcq { selected: vec![1] },
      },
      AnswerEntry {
        question_id: "seed-q2".into(),
        response: Response::Reordering {
          order: vec!["Nile".into(), "Amazon".into(), "Danube".into()],
        },
      },
      AnswerEntry {
        question_id: "seed-q3".into(),
        response: Response::Hotspot {
          selection: Some(Rect { x: 14.0, y: 58.0, width: 6.0, height: 6.0 }),
        },
      },
    ]
  }

  #[test]
  fn perfect_paper_scores_one_hundred() {
    let assessment = sample_assessment();
    let paper = score_paper(&assessment, &full_marks_answers());
    assert_eq!(paper.points_earned, 3);
    assert_eq!(paper.points_possible, 3);
    assert!((paper.score - 100.0).abs() < f32::EPSILON);
    assert!(paper.passed);
  }

  #[test]
  fn partial_paper_fails_below_passing_score() {
    let assessment = sample_assessment();
    let mut answers = full_marks_answers();
    answers.truncate(1); // two questions unanswered
    let paper = score_paper(&assessment, &answers);
    assert_eq!(paper.points_earned, 1);
    assert!(!paper.passed, "1/3 is below the default passing score");
    assert_eq!(paper.results.len(), 3, "unanswered questions still appear");
    assert!(!paper.results[1].correct);
  }

  #[test]
  fn feedback_is_withheld_when_disabled() {
    let mut assessment = sample_assessment();
    assessment.settings.show_feedback = false;
    let paper = score_paper(&assessment, &full_marks_answers());
    assert!(paper.results.iter().all(|r| r.explanation.is_empty()));
  }

  #[test]
  fn ungradable_question_is_reported_not_marked_wrong_silently() {
    let mut assessment = sample_assessment();
    // Break the mcq: drop its options.
    if let crate::domain::QuestionBody::Mcq { options, .. } =
      &mut assessment.questions[0].body
    {
      options.clear();
    }
    let paper = score_paper(&assessment, &full_marks_answers());
    let broken = &paper.results[0];
    assert!(!broken.correct);
    assert!(broken.error.as_deref().unwrap_or("").contains("invalid question data"));
  }
}

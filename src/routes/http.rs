//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented; logs include parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Multipart, Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument, warn};

use crate::grading::validate_question;
use crate::logic::{self, EvalOutcome, GenerationError};
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, body), fields(name = %body.name))]
pub async fn http_post_user(
  State(state): State<Arc<AppState>>,
  Json(body): Json<UserIn>,
) -> Response {
  let Some(email) = body.email.filter(|e| !e.is_empty()) else {
    return (StatusCode::BAD_REQUEST, Json(ErrorOut::new("Email is required"))).into_response();
  };
  match state.store.upsert_user(&email, &body.name).await {
    Ok(user) => {
      info!(target: "evalu8_backend", id = %user.id, "User created/updated");
      Json(user).into_response()
    }
    Err(e) => (
      StatusCode::INTERNAL_SERVER_ERROR,
      Json(ErrorOut::with_details("Failed to create user", e.to_string())),
    )
      .into_response(),
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_user(
  State(state): State<Arc<AppState>>,
  Query(q): Query<UserQuery>,
) -> Response {
  let Some(email) = q.email.filter(|e| !e.is_empty()) else {
    return (StatusCode::BAD_REQUEST, Json(ErrorOut::new("Email is required"))).into_response();
  };
  match state.store.get_user(&email).await {
    Ok(Some(user)) => Json(user).into_response(),
    Ok(None) => (StatusCode::NOT_FOUND, Json(ErrorOut::new("User not found"))).into_response(),
    Err(e) => (
      StatusCode::INTERNAL_SERVER_ERROR,
      Json(ErrorOut::with_details("Failed to fetch user", e.to_string())),
    )
      .into_response(),
  }
}

#[instrument(level = "info", skip(state, body), fields(question_count = body.questions.len()))]
pub async fn http_save_assessment(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SaveAssessmentIn>,
) -> Response {
  let Some(user_id) = body.user_id.filter(|u| !u.is_empty()) else {
    return (StatusCode::BAD_REQUEST, Json(ErrorOut::new("User ID is required"))).into_response();
  };

  let assessment = body.assessment_details.into_assessment(body.questions);

  // Drafts may be saved in any shape; publishing requires every question
  // to be gradable, so a broken one never reaches a test-taker.
  if assessment.status == crate::domain::AssessmentStatus::Published {
    for question in &assessment.questions {
      if let Err(e) = validate_question(question) {
        warn!(target: "assessment", id = %question.id, error = %e, "Refusing to publish ungradable question");
        return (
          StatusCode::UNPROCESSABLE_ENTITY,
          Json(ErrorOut::with_details("Cannot publish assessment", e.to_string())),
        )
          .into_response();
      }
    }
  }

  let published = assessment.status == crate::domain::AssessmentStatus::Published;
  match state.store.save_assessment(&user_id, &assessment).await {
    Ok(id) => {
      info!(target: "assessment", %id, title = %assessment.title, "Assessment saved");
      let message = if published {
        "Assessment published successfully!"
      } else {
        "Draft saved successfully!"
      };
      Json(SaveAssessmentOut { success: true, assessment_id: id, message: message.into() })
        .into_response()
    }
    Err(e) => (
      StatusCode::INTERNAL_SERVER_ERROR,
      Json(ErrorOut::with_details("Failed to save assessment", e.to_string())),
    )
      .into_response(),
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_assessments(
  State(state): State<Arc<AppState>>,
  Query(q): Query<AssessmentQuery>,
) -> Response {
  if let Some(id) = q.id.filter(|i| !i.is_empty()) {
    // Authoring fetch: the full record, answer keys included.
    return match state.store.fetch_assessment(&id).await {
      Ok(Some(assessment)) => Json(serde_json::json!({ "assessment": assessment })).into_response(),
      Ok(None) => {
        (StatusCode::NOT_FOUND, Json(ErrorOut::new("Assessment not found"))).into_response()
      }
      Err(e) => (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorOut::with_details("Failed to fetch assessments", e.to_string())),
      )
        .into_response(),
    };
  }
  if let Some(user_id) = q.user_id.filter(|u| !u.is_empty()) {
    return match state.store.list_assessments_by_owner(&user_id).await {
      Ok(assessments) => Json(serde_json::json!({ "assessments": assessments })).into_response(),
      Err(e) => (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorOut::with_details("Failed to fetch assessments", e.to_string())),
      )
        .into_response(),
    };
  }
  (
    StatusCode::BAD_REQUEST,
    Json(ErrorOut::new("User ID or Assessment ID is required")),
  )
    .into_response()
}

#[instrument(level = "info", skip(state, body), fields(prompt_len = body.prompt.len()))]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerateIn>,
) -> Response {
  if body.prompt.is_empty() {
    return (StatusCode::BAD_REQUEST, Json(ErrorOut::new("Prompt is required"))).into_response();
  }
  match logic::assist(&state, &body.prompt).await {
    Ok(response) => Json(GenerateOut { response, success: true }).into_response(),
    Err(GenerationError::NotConfigured) => (
      StatusCode::INTERNAL_SERVER_ERROR,
      Json(ErrorOut::new("Mistral API key not configured")),
    )
      .into_response(),
    Err(e) => (
      StatusCode::INTERNAL_SERVER_ERROR,
      Json(ErrorOut::with_details("Failed to generate content", e.to_string())),
    )
      .into_response(),
  }
}

#[instrument(level = "info", skip(state, multipart))]
pub async fn http_post_parse_document(
  State(state): State<Arc<AppState>>,
  mut multipart: Multipart,
) -> Response {
  let mut upload: Option<(String, Vec<u8>)> = None;
  let mut instructions = String::new();

  loop {
    let field = match multipart.next_field().await {
      Ok(Some(field)) => field,
      Ok(None) => break,
      Err(e) => {
        return (
          StatusCode::BAD_REQUEST,
          Json(ErrorOut::with_details("Malformed multipart body", e.to_string())),
        )
          .into_response();
      }
    };
    let name = field.name().map(|n| n.to_string());
    match name.as_deref() {
      Some("file") => {
        let filename = field.file_name().unwrap_or("upload").to_string();
        match field.bytes().await {
          Ok(bytes) => upload = Some((filename, bytes.to_vec())),
          Err(e) => {
            return (
              StatusCode::BAD_REQUEST,
              Json(ErrorOut::with_details("Failed to read upload", e.to_string())),
            )
              .into_response();
          }
        }
      }
      Some("instructions") => {
        instructions = field.text().await.unwrap_or_default();
      }
      _ => {}
    }
  }

  let Some((filename, bytes)) = upload else {
    return (StatusCode::BAD_REQUEST, Json(ErrorOut::new("No file uploaded"))).into_response();
  };

  match logic::generate_from_document(&state, &filename, &bytes, &instructions).await {
    Ok(questions) => {
      info!(target: "assessment", %filename, count = questions.len(), "Questions generated from document");
      Json(ParseDocumentOut { success: true, questions }).into_response()
    }
    Err(GenerationError::Document(e)) => {
      (StatusCode::BAD_REQUEST, Json(ErrorOut::new(e.to_string()))).into_response()
    }
    Err(GenerationError::NotConfigured) => (
      StatusCode::INTERNAL_SERVER_ERROR,
      Json(ErrorOut::new("Mistral API key not configured")),
    )
      .into_response(),
    Err(e) => (
      StatusCode::INTERNAL_SERVER_ERROR,
      Json(ErrorOut::with_details("Processing failed", e.to_string())),
    )
      .into_response(),
  }
}

#[instrument(level = "info", skip(state, body), fields(%body.assessment_id))]
pub async fn http_post_attempt(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AttemptIn>,
) -> Response {
  match logic::start_attempt(&state, &body.assessment_id).await {
    Ok(Some(out)) => Json(out).into_response(),
    Ok(None) => {
      (StatusCode::NOT_FOUND, Json(ErrorOut::new("Assessment not found"))).into_response()
    }
    Err(e) => (
      StatusCode::INTERNAL_SERVER_ERROR,
      Json(ErrorOut::with_details("Failed to start attempt", e)),
    )
      .into_response(),
  }
}

#[instrument(level = "info", skip(state, body), fields(%body.assessment_id, %body.question_id))]
pub async fn http_post_evaluate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<EvaluateIn>,
) -> Response {
  match logic::evaluate_submission(&state, &body.assessment_id, &body.question_id, &body.response)
    .await
  {
    EvalOutcome::Graded { correct, explanation } => {
      Json(AnswerOut { correct, explanation }).into_response()
    }
    EvalOutcome::UnknownAssessment => {
      (StatusCode::NOT_FOUND, Json(ErrorOut::new("Assessment not found"))).into_response()
    }
    EvalOutcome::UnknownQuestion => {
      (StatusCode::NOT_FOUND, Json(ErrorOut::new("Question not found"))).into_response()
    }
    EvalOutcome::Invalid(e) => (
      StatusCode::UNPROCESSABLE_ENTITY,
      Json(ErrorOut::with_details("Question is not gradable", e.to_string())),
    )
      .into_response(),
    EvalOutcome::StoreFailed(e) => (
      StatusCode::INTERNAL_SERVER_ERROR,
      Json(ErrorOut::with_details("Failed to evaluate answer", e)),
    )
      .into_response(),
  }
}

#[instrument(level = "info", skip(state, body), fields(%body.assessment_id, answer_count = body.answers.len()))]
pub async fn http_post_submit(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SubmitIn>,
) -> Response {
  match logic::submit_paper(&state, &body.assessment_id, &body.answers).await {
    Ok(Some(paper)) => Json(paper).into_response(),
    Ok(None) => {
      (StatusCode::NOT_FOUND, Json(ErrorOut::new("Assessment not found"))).into_response()
    }
    Err(e) => (
      StatusCode::INTERNAL_SERVER_ERROR,
      Json(ErrorOut::with_details("Failed to grade paper", e)),
    )
      .into_response(),
  }
}

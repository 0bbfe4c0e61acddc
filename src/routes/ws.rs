//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::logic::{self, EvalOutcome};
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "evalu8_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "evalu8_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target = "evalu8_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "evalu8_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "evalu8_backend", "WebSocket disconnected");
}

#[instrument(level = "info", skip(state))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::StartAssessment { assessment_id } => {
      match logic::start_attempt(state, &assessment_id).await {
        Ok(Some(assessment)) => {
          tracing::info!(target: "assessment", id = %assessment_id, "WS attempt started");
          ServerWsMessage::Assessment { assessment }
        }
        Ok(None) => ServerWsMessage::Error { message: format!("Unknown assessmentId: {}", assessment_id) },
        Err(e) => ServerWsMessage::Error { message: e },
      }
    }

    ClientWsMessage::SubmitAnswer { assessment_id, question_id, response } => {
      match logic::evaluate_submission(state, &assessment_id, &question_id, &response).await {
        EvalOutcome::Graded { correct, explanation } => {
          tracing::info!(target: "assessment", id = %assessment_id, %question_id, %correct, "WS submit_answer evaluated");
          ServerWsMessage::AnswerResult { question_id, correct, explanation }
        }
        EvalOutcome::UnknownAssessment =>
          ServerWsMessage::Error { message: format!("Unknown assessmentId: {}", assessment_id) },
        EvalOutcome::UnknownQuestion =>
          ServerWsMessage::Error { message: format!("Unknown questionId: {}", question_id) },
        EvalOutcome::Invalid(e) =>
          ServerWsMessage::Error { message: e.to_string() },
        EvalOutcome::StoreFailed(e) =>
          ServerWsMessage::Error { message: e },
      }
    }

    ClientWsMessage::FinishAssessment { assessment_id, answers } => {
      match logic::submit_paper(state, &assessment_id, &answers).await {
        Ok(Some(paper)) => {
          tracing::info!(target: "assessment", id = %assessment_id, score = %format!("{:.1}", paper.score), "WS paper graded");
          ServerWsMessage::PaperResult { paper }
        }
        Ok(None) => ServerWsMessage::Error { message: format!("Unknown assessmentId: {}", assessment_id) },
        Err(e) => ServerWsMessage::Error { message: e },
      }
    }
  }
}

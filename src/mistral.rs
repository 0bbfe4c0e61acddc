//! Minimal Mistral client for our use-cases.
//!
//! We only call chat.completions and request either plain text or a strict JSON object.
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short to avoid PII leaks.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{instrument, info, error, warn};

use crate::config::Prompts;
use crate::domain::Question;
use crate::grading::validate_question;
use crate::util::{extract_json_array, fill_template};
use uuid::Uuid;

#[derive(Clone)]
pub struct Mistral {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl Mistral {
  /// Construct the client if we find MISTRAL_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("MISTRAL_API_KEY").ok()?;
    let base_url =
      std::env::var("MISTRAL_BASE_URL").unwrap_or_else(|_| "https://api.mistral.ai/v1".into());
    let model =
      std::env::var("MISTRAL_MODEL").unwrap_or_else(|_| "mistral-small-2506".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, model })
  }

  /// Plain-text chat completion. Used for the authoring assistant.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model))]
  async fn chat_plain(
    &self,
    system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<String, String> {
    let text = self.chat(system, user, temperature, None).await?;
    Ok(text.trim().to_string())
  }

  /// JSON-object chat completion. Generic over the target type T.
  /// Models occasionally fence the payload even in JSON mode, so a failed
  /// strict parse retries on the extracted outermost array.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model))]
  async fn chat_json<T: for<'a> Deserialize<'a>>(
    &self,
    system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<T, String> {
    let format = Some(ResponseFormat { r#type: "json_object".into() });
    let text = self.chat(system, user, temperature, format).await?;
    match serde_json::from_str::<T>(&text) {
      Ok(v) => Ok(v),
      Err(e) => match extract_json_array(&text).map(serde_json::from_str::<T>) {
        Some(Ok(v)) => Ok(v),
        _ => Err(format!("JSON parse error: {}", e)),
      },
    }
  }

  async fn chat(
    &self,
    system: &str,
    user: &str,
    temperature: f32,
    response_format: Option<ResponseFormat>,
  ) -> Result<String, String> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format,
      max_tokens: None,
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "evalu8-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_api_error(&body).unwrap_or_else(|| body);
      return Err(format!("Mistral HTTP {}: {}", status, msg));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "Mistral usage");
    }
    let text = body.choices.get(0)
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default();

    Ok(text)
  }

  // --- High-level helpers (domain-specialized) ---

  /// Generate a batch of questions from extracted source material.
  #[instrument(
    level = "info",
    skip(self, prompts, source, instructions),
    fields(source_len = source.len(), instr_len = instructions.len(), model = %self.model)
  )]
  pub async fn generate_questions(
    &self,
    prompts: &Prompts,
    source: &str,
    instructions: &str,
  ) -> Result<Vec<Question>, String> {
    let user = fill_template(
      &prompts.generation_user_template,
      &[("source", source), ("instructions", instructions)],
    );
    let start = std::time::Instant::now();
    let result = self.chat_json::<serde_json::Value>(&prompts.generation_system, &user, 0.7).await;
    let elapsed = start.elapsed();

    let payload = match result {
      Ok(v) => {
        info!(?elapsed, "Model response received successfully");
        v
      }
      Err(e) => {
        error!(?elapsed, error = %e, "Model call failed during question generation");
        return Err(format!("Model generation failed: {e}"));
      }
    };

    let questions = collect_questions(payload);
    if questions.is_empty() {
      return Err("Model returned no usable questions".into());
    }
    info!(count = questions.len(), "Questions generated from source material");
    Ok(questions)
  }

  /// Freeform authoring assistant: forward the author's prompt, return text.
  #[instrument(level = "info", skip(self, prompts, prompt), fields(prompt_len = prompt.len()))]
  pub async fn assist(&self, prompts: &Prompts, prompt: &str) -> Result<String, String> {
    self.chat_plain(&prompts.assist_system, prompt, 0.2).await
  }
}

/// Accept both shapes the model produces: a bare array, or an object with
/// a `questions` key. Entries that fail to deserialize or validate are
/// dropped with a warning instead of poisoning the whole batch.
fn collect_questions(payload: serde_json::Value) -> Vec<Question> {
  let entries = match payload {
    serde_json::Value::Array(entries) => entries,
    serde_json::Value::Object(mut map) => match map.remove("questions") {
      Some(serde_json::Value::Array(entries)) => entries,
      Some(single) => vec![single],
      None => vec![serde_json::Value::Object(map)],
    },
    _ => vec![],
  };

  let mut out = Vec::with_capacity(entries.len());
  for entry in entries {
    let mut q: Question = match serde_json::from_value(entry) {
      Ok(q) => q,
      Err(e) => {
        warn!(target: "assessment", error = %e, "Skipping generated entry: not a question");
        continue;
      }
    };
    if q.id.is_empty() {
      q.id = Uuid::new_v4().to_string();
    }
    if let Err(e) = validate_question(&q) {
      warn!(target: "assessment", id = %q.id, error = %e, "Skipping generated question: failed validation");
      continue;
    }
    out.push(q);
  }
  out
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from a Mistral error body.
fn extract_api_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bare_array_payload_is_collected() {
    let payload = serde_json::json!([
      {
        "type": "mcq",
        "stem": "Capital of France?",
        "options": ["London", "Paris", "Rome", "Berlin"],
        "correctAnswers": ["b"],
        "explanation": "Paris is the capital."
      }
    ]);
    let qs = collect_questions(payload);
    assert_eq!(qs.len(), 1);
    assert!(!qs[0].id.is_empty(), "missing ids are backfilled");
  }

  #[test]
  fn wrapped_object_payload_is_unwrapped() {
    let payload = serde_json::json!({
      "questions": [
        {
          "type": "reordering",
          "instructions": "Order the steps",
          "items": [{"id": 1, "text": "boil water"}, {"id": 2, "text": "add pasta"}],
          "correctOrder": ["boil water", "add pasta"]
        }
      ]
    });
    assert_eq!(collect_questions(payload).len(), 1);
  }

  #[test]
  fn invalid_entries_are_dropped() {
    let payload = serde_json::json!([
      {"type": "mcq", "stem": "no options", "correctAnswers": ["a"]},
      {"not": "a question"},
      {
        "type": "hotspot",
        "imageUrl": "https://example.com/cell.png",
        "zones": [{"x": 10.0, "y": 10.0, "width": 5.0, "height": 5.0, "isCorrect": true}]
      }
    ]);
    let qs = collect_questions(payload);
    assert_eq!(qs.len(), 1);
    assert_eq!(qs[0].body.kind(), "hotspot");
  }
}

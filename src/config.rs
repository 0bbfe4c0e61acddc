//! Loading service configuration (prompts + optional assessment bank) from TOML.
//!
//! See `ServiceConfig` and `Prompts` for expected schema.

use serde::Deserialize;
use tracing::{info, error};

use crate::domain::{OrderItem, Zone};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ServiceConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub assessments: Vec<AssessmentCfg>,
}

/// Assessment entry accepted in TOML configuration. Entries are inserted
/// into the store at startup when their id is not already present.
#[derive(Clone, Debug, Deserialize)]
pub struct AssessmentCfg {
  #[serde(default)] pub id: Option<String>,
  pub title: String,
  #[serde(default)] pub description: Option<String>,
  #[serde(default)] pub subject: Option<String>,
  #[serde(default)] pub difficulty: Option<String>,
  #[serde(default)] pub duration_minutes: Option<u32>,
  #[serde(default)] pub passing_score: Option<u32>,
  #[serde(default)] pub randomize_questions: Option<bool>,
  #[serde(default)] pub instructions: Option<String>,
  #[serde(default)] pub questions: Vec<QuestionCfg>,
}

/// Question entry accepted in TOML configuration.
/// Only the branch matching `type` should be filled as appropriate.
#[derive(Clone, Debug, Deserialize)]
pub struct QuestionCfg {
  #[serde(default)] pub id: Option<String>,
  #[serde(rename = "type")] pub kind: String,
  #[serde(default)] pub stem: Option<String>,
  #[serde(default)] pub explanation: Option<String>,
  #[serde(default)] pub points: Option<u32>,
  // mcq
  #[serde(default)] pub options: Option<Vec<String>>,
  #[serde(default)] pub correct_answers: Option<Vec<String>>,
  #[serde(default)] pub allow_multiple_answers: Option<bool>,
  // reordering
  #[serde(default)] pub items: Option<Vec<OrderItem>>,
  #[serde(default)] pub correct_order: Option<Vec<String>>,
  // hotspot
  #[serde(default)] pub image_url: Option<String>,
  #[serde(default)] pub zones: Option<Vec<Zone>>,
  // shared by reordering/hotspot
  #[serde(default)] pub instructions: Option<String>,
}

/// Prompts used by the Mistral client. Defaults cover question generation
/// from source material and the freeform authoring assistant.
/// You can override them in TOML if you need to tune tone/structure.
#[derive(Clone, Debug, Deserialize)]
pub struct Prompts {
  // Question generation (strict JSON)
  pub generation_system: String,
  pub generation_user_template: String,
  // Freeform authoring assistant
  pub assist_system: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      generation_system: "You are an expert assessment creator. Respond ONLY with strict JSON.".into(),
      generation_user_template: "Based on the following source material, generate a comprehensive set of questions.\n\nSOURCE MATERIAL:\n{source}\n\nUSER REQUIREMENTS:\n{instructions}\n\nINSTRUCTIONS:\n1. Generate a mix of Multiple Choice (mcq), Reordering (reordering), and Hotspot (hotspot) questions.\n2. Return ONLY a JSON array of question objects.\n\nFor 'mcq':\n{\"id\": \"random_id\", \"type\": \"mcq\", \"stem\": \"The question\", \"options\": [\"A\", \"B\", \"C\", \"D\"], \"correctAnswers\": [\"A\"], \"explanation\": \"Why correct\", \"allowMultipleAnswers\": false}\n\nFor 'reordering':\n{\"id\": \"random_id\", \"type\": \"reordering\", \"instructions\": \"Ordering task\", \"items\": [{\"id\": 1, \"text\": \"item 1\"}, {\"id\": 2, \"text\": \"item 2\"}], \"correctOrder\": [\"item 1\", \"item 2\"], \"explanation\": \"Explanation\"}\n\nFor 'hotspot':\n{\"id\": \"random_id\", \"type\": \"hotspot\", \"instructions\": \"Selection task\", \"imageUrl\": \"https://example.com/figure.png\", \"zones\": [{\"x\": 30, \"y\": 40, \"width\": 20, \"height\": 20, \"isCorrect\": true}], \"explanation\": \"Explanation\"}".into(),
      assist_system: "You are an assessment authoring assistant. Answer the author's request directly and concisely.".into(),
    }
  }
}

/// Attempt to load `ServiceConfig` from EVALU8_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_service_config_from_env() -> Option<ServiceConfig> {
  let path = std::env::var("EVALU8_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<ServiceConfig>(&s) {
      Ok(cfg) => {
        info!(target: "evalu8_backend", %path, "Loaded service config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "evalu8_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "evalu8_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

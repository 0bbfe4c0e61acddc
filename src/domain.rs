//! Domain models: questions (one variant per kind), candidate responses,
//! assessments and their settings, and the user record.

use serde::{Deserialize, Serialize};

/// A single authored question. Common fields live here; everything
/// variant-specific sits in [`QuestionBody`], discriminated by `type`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Question {
  #[serde(default)] pub id: String,
  #[serde(default)] pub stem: String,
  /// Feedback shown to the test-taker after grading.
  #[serde(default)] pub explanation: String,
  #[serde(default = "default_points")] pub points: u32,
  #[serde(flatten)] pub body: QuestionBody,
}

fn default_points() -> u32 { 1 }

/// Variant-specific question content. The wire tag matches the authoring
/// UI (`mcq`, `reordering`, `hotspot`).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QuestionBody {
  Mcq {
    #[serde(default)] options: Vec<String>,
    /// Each entry is a letter token (a..d), an option text, or a
    /// stringified option index. Mixed forms come from AI generation.
    #[serde(rename = "correctAnswers", default)] correct_answers: Vec<String>,
    #[serde(rename = "allowMultipleAnswers", default)] allow_multiple_answers: bool,
    #[serde(rename = "distractorFeedback", default, skip_serializing_if = "Option::is_none")]
    distractor_feedback: Option<Vec<String>>,
  },
  Reordering {
    /// The scrambled pool exactly as authored.
    #[serde(default)] items: Vec<OrderItem>,
    /// Correct sequence by item text; empty means the authored item order
    /// is the target.
    #[serde(rename = "correctOrder", default)] correct_order: Vec<String>,
    #[serde(default)] instructions: String,
  },
  Hotspot {
    #[serde(default)] zones: Vec<Zone>,
    #[serde(rename = "imageUrl", default)] image_url: String,
    #[serde(default)] instructions: String,
  },
}

impl QuestionBody {
  pub fn kind(&self) -> &'static str {
    match self {
      QuestionBody::Mcq { .. } => "mcq",
      QuestionBody::Reordering { .. } => "reordering",
      QuestionBody::Hotspot { .. } => "hotspot",
    }
  }
}

/// One entry of a reordering pool.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderItem {
  pub id: i64,
  pub text: String,
}

/// Author-defined target rectangle for a hotspot question, in
/// percentage-of-image coordinates.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Zone {
  pub x: f64,
  pub y: f64,
  pub width: f64,
  pub height: f64,
  #[serde(rename = "isCorrect", default)] pub is_correct: bool,
}

/// A drawn selection rectangle, same coordinate space as [`Zone`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Rect {
  pub x: f64,
  pub y: f64,
  pub width: f64,
  pub height: f64,
}

/// Candidate response for one question. Ephemeral: exists only for the
/// duration of a single evaluation call.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Response {
  Mcq {
    /// Selected option indices. Single-select questions carry at most one.
    #[serde(default)] selected: Vec<usize>,
  },
  Reordering {
    /// The candidate's full reordered sequence of item texts.
    #[serde(default)] order: Vec<String>,
  },
  Hotspot {
    #[serde(default)] selection: Option<Rect>,
  },
}

impl Response {
  pub fn kind(&self) -> &'static str {
    match self {
      Response::Mcq { .. } => "mcq",
      Response::Reordering { .. } => "reordering",
      Response::Hotspot { .. } => "hotspot",
    }
  }
}

/// Draft vs published, as set by the authoring flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentStatus {
  Draft,
  Published,
}

impl Default for AssessmentStatus {
  fn default() -> Self { AssessmentStatus::Draft }
}

impl AssessmentStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      AssessmentStatus::Draft => "draft",
      AssessmentStatus::Published => "published",
    }
  }
}

/// Delivery/grading knobs stored with an assessment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssessmentSettings {
  #[serde(rename = "timerEnabled", default = "yes")] pub timer_enabled: bool,
  #[serde(rename = "allowNavigation", default = "yes")] pub allow_navigation: bool,
  #[serde(rename = "showResults", default = "yes")] pub show_results: bool,
  /// Percent required to pass a whole paper.
  #[serde(rename = "passingScore", default = "default_passing_score")] pub passing_score: u32,
  #[serde(rename = "allowRetakes", default)] pub allow_retakes: bool,
  #[serde(rename = "maxRetries", default = "default_max_retries")] pub max_retries: u32,
  #[serde(rename = "showFeedback", default = "yes")] pub show_feedback: bool,
  #[serde(rename = "randomizeQuestions", default)] pub randomize_questions: bool,
}

fn yes() -> bool { true }
fn default_passing_score() -> u32 { 70 }
fn default_max_retries() -> u32 { 3 }

impl Default for AssessmentSettings {
  fn default() -> Self {
    AssessmentSettings {
      timer_enabled: true,
      allow_navigation: true,
      show_results: true,
      passing_score: 70,
      allow_retakes: false,
      max_retries: 3,
      show_feedback: true,
      randomize_questions: false,
    }
  }
}

/// A stored assessment: metadata, settings, and its ordered question list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Assessment {
  pub id: String,
  pub title: String,
  #[serde(default)] pub description: String,
  #[serde(default)] pub status: AssessmentStatus,
  #[serde(default)] pub mode: String,
  #[serde(default)] pub subject: String,
  #[serde(default)] pub difficulty: String,
  #[serde(rename = "durationMinutes", default = "default_duration")] pub duration_minutes: u32,
  #[serde(default)] pub instructions: String,
  #[serde(default)] pub settings: AssessmentSettings,
  #[serde(default)] pub questions: Vec<Question>,
}

fn default_duration() -> u32 { 45 }

/// Account record, upserted by email from the (out of scope) sign-in flow.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
  pub id: String,
  pub email: String,
  #[serde(default)] pub name: String,
}

//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{
    Assessment, AssessmentSettings, AssessmentStatus, OrderItem, Question, QuestionBody, Response,
};

/// Messages the client can send over WebSocket (assessment mode).
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    StartAssessment {
        #[serde(rename = "assessmentId")]
        assessment_id: String,
    },
    SubmitAnswer {
        #[serde(rename = "assessmentId")]
        assessment_id: String,
        #[serde(rename = "questionId")]
        question_id: String,
        response: Response,
    },
    FinishAssessment {
        #[serde(rename = "assessmentId")]
        assessment_id: String,
        answers: Vec<AnswerEntry>,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Assessment {
        assessment: AssessmentOut,
    },
    AnswerResult {
        #[serde(rename = "questionId")]
        question_id: String,
        correct: bool,
        explanation: String,
    },
    PaperResult {
        paper: PaperOut,
    },
    Error {
        message: String,
    },
}

/// Test-taker view of a question: everything needed to render and answer
/// it, nothing that gives the answer away.
#[derive(Debug, Serialize)]
pub struct QuestionOut {
    pub id: String,
    pub stem: String,
    pub points: u32,
    #[serde(flatten)]
    pub body: QuestionOutBody,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QuestionOutBody {
    Mcq {
        options: Vec<String>,
        #[serde(rename = "allowMultipleAnswers")]
        allow_multiple_answers: bool,
    },
    Reordering {
        items: Vec<OrderItem>,
        instructions: String,
    },
    Hotspot {
        #[serde(rename = "imageUrl")]
        image_url: String,
        instructions: String,
    },
}

/// Strip a stored question down to its public view. Answer keys, zone
/// verdict flags, and explanations never leave the server here.
pub fn question_out(q: &Question) -> QuestionOut {
    let body = match &q.body {
        QuestionBody::Mcq { options, allow_multiple_answers, .. } => QuestionOutBody::Mcq {
            options: options.clone(),
            allow_multiple_answers: *allow_multiple_answers,
        },
        QuestionBody::Reordering { items, instructions, .. } => QuestionOutBody::Reordering {
            items: items.clone(),
            instructions: instructions.clone(),
        },
        QuestionBody::Hotspot { image_url, instructions, .. } => QuestionOutBody::Hotspot {
            image_url: image_url.clone(),
            instructions: instructions.clone(),
        },
    };
    QuestionOut { id: q.id.clone(), stem: q.stem.clone(), points: q.points, body }
}

/// DTO used by both WS and HTTP for assessment-mode delivery.
#[derive(Debug, Serialize)]
pub struct AssessmentOut {
    pub id: String,
    pub title: String,
    pub description: String,
    pub subject: String,
    pub instructions: String,
    #[serde(rename = "durationMinutes")]
    pub duration_minutes: u32,
    #[serde(rename = "timerEnabled")]
    pub timer_enabled: bool,
    #[serde(rename = "allowNavigation")]
    pub allow_navigation: bool,
    #[serde(rename = "questionCount")]
    pub question_count: usize,
    pub questions: Vec<QuestionOut>,
}

/// Convert a stored `Assessment` to the public DTO. The question slice is
/// passed separately so the caller controls delivery order (shuffling).
pub fn to_out(a: &Assessment, questions: &[Question]) -> AssessmentOut {
    AssessmentOut {
        id: a.id.clone(),
        title: a.title.clone(),
        description: a.description.clone(),
        subject: a.subject.clone(),
        instructions: a.instructions.clone(),
        duration_minutes: a.duration_minutes,
        timer_enabled: a.settings.timer_enabled,
        allow_navigation: a.settings.allow_navigation,
        question_count: questions.len(),
        questions: questions.iter().map(question_out).collect(),
    }
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

/// Error body shared by every endpoint.
#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorOut {
    pub fn new(error: impl Into<String>) -> Self {
        ErrorOut { error: error.into(), details: None }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        ErrorOut { error: error.into(), details: Some(details.into()) }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserIn {
    #[serde(default)]
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub email: Option<String>,
}

/// Save payload as the authoring UI submits it: flat details object plus
/// the full question list.
#[derive(Debug, Deserialize)]
pub struct SaveAssessmentIn {
    #[serde(rename = "assessmentDetails")]
    pub assessment_details: AssessmentDetailsIn,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssessmentDetailsIn {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(rename = "passingScore", default)]
    pub passing_score: Option<u32>,
    #[serde(rename = "allowRetakes", default)]
    pub allow_retakes: Option<bool>,
    #[serde(rename = "maxRetakes", default)]
    pub max_retakes: Option<u32>,
    #[serde(rename = "showFeedback", default)]
    pub show_feedback: Option<bool>,
    #[serde(rename = "randomizeQuestions", default)]
    pub randomize_questions: Option<bool>,
}

impl AssessmentDetailsIn {
    /// Fold the sparse authoring payload into a full domain record,
    /// applying the same defaults the authoring UI assumes.
    pub fn into_assessment(self, questions: Vec<Question>) -> Assessment {
        let status = match self.status.as_deref() {
            Some("published") => AssessmentStatus::Published,
            _ => AssessmentStatus::Draft,
        };
        let defaults = AssessmentSettings::default();
        Assessment {
            id: self.id.unwrap_or_default(),
            title: self.title.filter(|t| !t.is_empty()).unwrap_or_else(|| "Untitled Assessment".into()),
            description: self.description.unwrap_or_default(),
            status,
            mode: self.mode.unwrap_or_else(|| "formative".into()),
            subject: self.subject.unwrap_or_default(),
            difficulty: self.difficulty.unwrap_or_else(|| "medium".into()),
            duration_minutes: self.duration.unwrap_or(45),
            instructions: self.instructions.unwrap_or_default(),
            settings: AssessmentSettings {
                passing_score: self.passing_score.unwrap_or(defaults.passing_score),
                allow_retakes: self.allow_retakes.unwrap_or(defaults.allow_retakes),
                max_retries: self.max_retakes.unwrap_or(defaults.max_retries),
                show_feedback: self.show_feedback.unwrap_or(defaults.show_feedback),
                randomize_questions: self.randomize_questions.unwrap_or(defaults.randomize_questions),
                ..defaults
            },
            questions,
        }
    }
}

#[derive(Serialize)]
pub struct SaveAssessmentOut {
    pub success: bool,
    #[serde(rename = "assessmentId")]
    pub assessment_id: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct AssessmentQuery {
    pub id: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateIn {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Serialize)]
pub struct GenerateOut {
    pub response: String,
    pub success: bool,
}

#[derive(Serialize)]
pub struct ParseDocumentOut {
    pub success: bool,
    pub questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
pub struct AttemptIn {
    #[serde(rename = "assessmentId")]
    pub assessment_id: String,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateIn {
    #[serde(rename = "assessmentId")]
    pub assessment_id: String,
    #[serde(rename = "questionId")]
    pub question_id: String,
    pub response: Response,
}

#[derive(Serialize)]
pub struct AnswerOut {
    pub correct: bool,
    pub explanation: String,
}

/// One answered question inside a full-paper submission.
#[derive(Debug, Deserialize)]
pub struct AnswerEntry {
    #[serde(rename = "questionId")]
    pub question_id: String,
    pub response: Response,
}

#[derive(Debug, Deserialize)]
pub struct SubmitIn {
    #[serde(rename = "assessmentId")]
    pub assessment_id: String,
    #[serde(default)]
    pub answers: Vec<AnswerEntry>,
}

#[derive(Debug, Serialize)]
pub struct QuestionResultOut {
    #[serde(rename = "questionId")]
    pub question_id: String,
    pub correct: bool,
    #[serde(rename = "pointsEarned")]
    pub points_earned: u32,
    #[serde(rename = "pointsPossible")]
    pub points_possible: u32,
    pub explanation: String,
    /// Present only when the stored question could not be graded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaperOut {
    pub results: Vec<QuestionResultOut>,
    #[serde(rename = "pointsEarned")]
    pub points_earned: u32,
    #[serde(rename = "pointsPossible")]
    pub points_possible: u32,
    /// Percent, 0..=100.
    pub score: f32,
    pub passed: bool,
}

//! Application state: the store handle, prompts, and the Mistral client.
//!
//! This module owns:
//!   - the SQLite store handle
//!   - the prompts struct (from TOML or defaults)
//!   - optional Mistral client
//!   - startup seeding (config bank entries, built-in sample assessment)

use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::config::{load_service_config_from_env, AssessmentCfg, Prompts, QuestionCfg};
use crate::domain::{Assessment, AssessmentSettings, AssessmentStatus, Question, QuestionBody};
use crate::grading::validate_question;
use crate::mistral::Mistral;
use crate::seeds::sample_assessment;
use crate::store::{BoxError, Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub mistral: Option<Mistral>,
    pub prompts: Prompts,
}

impl AppState {
    /// Build state from env: load config, connect the store, seed content,
    /// init the Mistral client.
    #[instrument(level = "info", skip_all)]
    pub async fn new() -> Result<Self, BoxError> {
        // Load TOML config if provided (prompts + optional assessment bank).
        let cfg_opt = load_service_config_from_env();
        let prompts = cfg_opt
            .as_ref()
            .map(|c| c.prompts.clone())
            .unwrap_or_default();

        let db_path = std::env::var("EVALU8_DB_PATH").unwrap_or_else(|_| "evalu8.db".into());
        let store = Store::connect(&db_path).await?;

        // Insert config-bank assessments that are not already stored.
        if let Some(cfg) = &cfg_opt {
            for entry in &cfg.assessments {
                let Some(assessment) = assessment_from_cfg(entry) else { continue };
                match store.assessment_exists(&assessment.id).await {
                    Ok(true) => {}
                    Ok(false) => {
                        store.save_assessment("config-bank", &assessment).await?;
                        info!(target: "assessment", id = %assessment.id, title = %assessment.title, "Inserted bank assessment");
                    }
                    Err(e) => {
                        error!(target: "assessment", id = %assessment.id, error = %e, "Bank lookup failed; skipping entry");
                    }
                }
            }
        }

        // Always keep at least one assessment around so the app is usable
        // against an empty database.
        if store.count_assessments().await? == 0 {
            let seed = sample_assessment();
            store.save_assessment("builtin-seed", &seed).await?;
            info!(target: "assessment", id = %seed.id, "Database empty; inserted built-in sample assessment");
        }

        // Inventory summary by status.
        for (status, count) in store.count_by_status().await? {
            info!(target: "assessment", %status, count, "Startup assessment inventory");
        }

        // Build optional Mistral client (if API key present).
        let mistral = Mistral::from_env();
        if let Some(m) = &mistral {
            info!(target: "evalu8_backend", base_url = %m.base_url, model = %m.model, "Mistral enabled.");
        } else {
            info!(target: "evalu8_backend", "Mistral disabled (no MISTRAL_API_KEY). AI generation unavailable.");
        }

        Ok(Self { store, mistral, prompts })
    }
}

/// Build a domain assessment from a TOML bank entry. Entries with no
/// usable questions are dropped with a log, not a startup failure.
fn assessment_from_cfg(entry: &AssessmentCfg) -> Option<Assessment> {
    let id = entry
        .id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut questions = Vec::with_capacity(entry.questions.len());
    for qc in &entry.questions {
        if let Some(q) = question_from_cfg(qc) {
            questions.push(q);
        }
    }
    if questions.is_empty() {
        error!(target: "assessment", %id, "Skipping bank assessment: no usable questions.");
        return None;
    }

    let defaults = AssessmentSettings::default();
    Some(Assessment {
        id,
        title: entry.title.clone(),
        description: entry.description.clone().unwrap_or_default(),
        status: AssessmentStatus::Published,
        mode: "formative".into(),
        subject: entry.subject.clone().unwrap_or_default(),
        difficulty: entry.difficulty.clone().unwrap_or_else(|| "medium".into()),
        duration_minutes: entry.duration_minutes.unwrap_or(45),
        instructions: entry.instructions.clone().unwrap_or_default(),
        settings: AssessmentSettings {
            passing_score: entry.passing_score.unwrap_or(defaults.passing_score),
            randomize_questions: entry.randomize_questions.unwrap_or(defaults.randomize_questions),
            ..defaults
        },
        questions,
    })
}

fn question_from_cfg(qc: &QuestionCfg) -> Option<Question> {
    let id = qc.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
    let body = match qc.kind.as_str() {
        "mcq" => QuestionBody::Mcq {
            options: qc.options.clone().unwrap_or_default(),
            correct_answers: qc.correct_answers.clone().unwrap_or_default(),
            allow_multiple_answers: qc.allow_multiple_answers.unwrap_or(false),
            distractor_feedback: None,
        },
        "reordering" => QuestionBody::Reordering {
            items: qc.items.clone().unwrap_or_default(),
            correct_order: qc.correct_order.clone().unwrap_or_default(),
            instructions: qc.instructions.clone().unwrap_or_default(),
        },
        "hotspot" => QuestionBody::Hotspot {
            zones: qc.zones.clone().unwrap_or_default(),
            image_url: qc.image_url.clone().unwrap_or_default(),
            instructions: qc.instructions.clone().unwrap_or_default(),
        },
        other => {
            error!(target: "assessment", %id, kind = %other, "Skipping bank question: unknown type.");
            return None;
        }
    };

    let question = Question {
        id,
        stem: qc.stem.clone().unwrap_or_default(),
        explanation: qc.explanation.clone().unwrap_or_default(),
        points: qc.points.unwrap_or(1),
        body,
    };
    if let Err(e) = validate_question(&question) {
        error!(target: "assessment", id = %question.id, error = %e, "Skipping bank question: failed validation.");
        return None;
    }
    Some(question)
}

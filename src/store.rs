//! SQLite-backed persistence for users, assessments, and their ordered
//! question lists.
//!
//! Schema is created on connect. Question payloads are stored as JSON in a
//! single column: the three kinds carry disjoint field sets, and the
//! evaluator consumes the typed form, so a per-kind column layout buys
//! nothing here.

use std::error::Error;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use sqlx::pool::Pool;
use sqlx::sqlite::{Sqlite, SqlitePoolOptions};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::{Assessment, AssessmentSettings, AssessmentStatus, Question, User};

pub type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Clone)]
pub struct Store {
    pool: Pool<Sqlite>,
}

#[derive(sqlx::FromRow)]
struct AssessmentRow {
    id: String,
    title: String,
    description: String,
    status: String,
    mode: String,
    subject: String,
    difficulty: String,
    duration_minutes: i64,
    instructions: String,
    settings: String,
}

impl Store {
    /// Open (creating the file and schema if needed) the database at `db_path`.
    /// Pass ":memory:" for an ephemeral database.
    #[instrument(level = "info")]
    pub async fn connect(db_path: &str) -> Result<Store, BoxError> {
        let url = if db_path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            if !Path::new(db_path).exists() {
                info!(target: "evalu8_backend", %db_path, "Database file missing; creating");
                let file = std::fs::File::create(db_path)?;
                file.sync_all()?;
            }
            format!("sqlite://{}", db_path)
        };

        // An in-memory database is per-connection; a pool of them would be
        // a pool of unrelated empty databases.
        let max_connections = if db_path == ":memory:" { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&url)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id         TEXT PRIMARY KEY,
                email      TEXT NOT NULL UNIQUE,
                name       TEXT NOT NULL DEFAULT '',
                created_at INTEGER NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS assessments (
                id               TEXT PRIMARY KEY,
                author_id        TEXT NOT NULL,
                title            TEXT NOT NULL,
                description      TEXT NOT NULL DEFAULT '',
                status           TEXT NOT NULL,
                mode             TEXT NOT NULL DEFAULT '',
                subject          TEXT NOT NULL DEFAULT '',
                difficulty       TEXT NOT NULL DEFAULT '',
                duration_minutes INTEGER NOT NULL,
                instructions     TEXT NOT NULL DEFAULT '',
                settings         TEXT NOT NULL,
                created_at       INTEGER NOT NULL,
                updated_at       INTEGER NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS questions (
                id            TEXT PRIMARY KEY,
                assessment_id TEXT NOT NULL,
                ord           INTEGER NOT NULL,
                payload       TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        Ok(Store { pool })
    }

    /// Create-or-update a user keyed by email.
    #[instrument(level = "debug", skip(self))]
    pub async fn upsert_user(&self, email: &str, name: &str) -> Result<User, BoxError> {
        sqlx::query(
            "INSERT INTO users (id, email, name, created_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(email) DO UPDATE SET name = excluded.name",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(email)
        .bind(name)
        .bind(epoch_secs())
        .execute(&self.pool)
        .await?;

        let (id, email, name) =
            sqlx::query_as::<_, (String, String, String)>("SELECT id, email, name FROM users WHERE email = ?")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(User { id, email, name })
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn get_user(&self, email: &str) -> Result<Option<User>, BoxError> {
        let row =
            sqlx::query_as::<_, (String, String, String)>("SELECT id, email, name FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id, email, name)| User { id, email, name }))
    }

    /// Save an assessment and its full question list. An empty id means
    /// create; a known id means update, replacing the stored question list
    /// wholesale. Returns the stored id.
    #[instrument(level = "info", skip(self, assessment), fields(question_count = assessment.questions.len()))]
    pub async fn save_assessment(
        &self,
        author_id: &str,
        assessment: &Assessment,
    ) -> Result<String, BoxError> {
        let id = if assessment.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            assessment.id.clone()
        };
        let now = epoch_secs();
        let settings = serde_json::to_string(&assessment.settings)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM questions WHERE assessment_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;

        let updated = sqlx::query(
            "UPDATE assessments SET title = ?, description = ?, status = ?, mode = ?, subject = ?,
             difficulty = ?, duration_minutes = ?, instructions = ?, settings = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&assessment.title)
        .bind(&assessment.description)
        .bind(assessment.status.as_str())
        .bind(&assessment.mode)
        .bind(&assessment.subject)
        .bind(&assessment.difficulty)
        .bind(assessment.duration_minutes as i64)
        .bind(&assessment.instructions)
        .bind(&settings)
        .bind(now)
        .bind(&id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            sqlx::query(
                "INSERT INTO assessments (id, author_id, title, description, status, mode, subject,
                 difficulty, duration_minutes, instructions, settings, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&id)
            .bind(author_id)
            .bind(&assessment.title)
            .bind(&assessment.description)
            .bind(assessment.status.as_str())
            .bind(&assessment.mode)
            .bind(&assessment.subject)
            .bind(&assessment.difficulty)
            .bind(assessment.duration_minutes as i64)
            .bind(&assessment.instructions)
            .bind(&settings)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        for (ord, question) in assessment.questions.iter().enumerate() {
            let mut stored = question.clone();
            if stored.id.is_empty() {
                stored.id = Uuid::new_v4().to_string();
            }
            let payload = serde_json::to_string(&stored)?;
            sqlx::query("INSERT INTO questions (id, assessment_id, ord, payload) VALUES (?, ?, ?, ?)")
                .bind(&stored.id)
                .bind(&id)
                .bind(ord as i64)
                .bind(&payload)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    /// Fetch one assessment with its questions in persisted order.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_assessment(&self, id: &str) -> Result<Option<Assessment>, BoxError> {
        let row = sqlx::query_as::<_, AssessmentRow>(
            "SELECT id, title, description, status, mode, subject, difficulty,
             duration_minutes, instructions, settings
             FROM assessments WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };
        let questions = self.load_questions(&row.id).await?;
        Ok(Some(assemble(row, questions)))
    }

    /// All assessments owned by `author_id`, most recently updated first.
    #[instrument(level = "debug", skip(self))]
    pub async fn list_assessments_by_owner(&self, author_id: &str) -> Result<Vec<Assessment>, BoxError> {
        let rows = sqlx::query_as::<_, AssessmentRow>(
            "SELECT id, title, description, status, mode, subject, difficulty,
             duration_minutes, instructions, settings
             FROM assessments WHERE author_id = ? ORDER BY updated_at DESC",
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let questions = self.load_questions(&row.id).await?;
            out.push(assemble(row, questions));
        }
        Ok(out)
    }

    pub async fn assessment_exists(&self, id: &str) -> Result<bool, BoxError> {
        let (count,) = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM assessments WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn count_assessments(&self) -> Result<i64, BoxError> {
        let (count,) = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM assessments")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Per-status counts for the startup inventory log.
    pub async fn count_by_status(&self) -> Result<Vec<(String, i64)>, BoxError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM assessments GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn load_questions(&self, assessment_id: &str) -> Result<Vec<Question>, BoxError> {
        let rows = sqlx::query_as::<_, (String,)>(
            "SELECT payload FROM questions WHERE assessment_id = ? ORDER BY ord ASC",
        )
        .bind(assessment_id)
        .fetch_all(&self.pool)
        .await?;

        let mut questions = Vec::with_capacity(rows.len());
        for (payload,) in rows {
            match serde_json::from_str::<Question>(&payload) {
                Ok(q) => questions.push(q),
                Err(e) => {
                    warn!(target: "assessment", %assessment_id, error = %e, "Skipping undecodable question row");
                }
            }
        }
        Ok(questions)
    }
}

fn assemble(row: AssessmentRow, questions: Vec<Question>) -> Assessment {
    let settings = serde_json::from_str::<AssessmentSettings>(&row.settings).unwrap_or_default();
    let status = if row.status == "published" {
        AssessmentStatus::Published
    } else {
        AssessmentStatus::Draft
    };
    Assessment {
        id: row.id,
        title: row.title,
        description: row.description,
        status,
        mode: row.mode,
        subject: row.subject,
        difficulty: row.difficulty,
        duration_minutes: row.duration_minutes as u32,
        instructions: row.instructions,
        settings,
        questions,
    }
}

fn epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderItem, QuestionBody};

    fn sample_assessment() -> Assessment {
        Assessment {
            id: String::new(),
            title: "Cell biology check".into(),
            description: "Short formative quiz".into(),
            status: AssessmentStatus::Draft,
            mode: "formative".into(),
            subject: "biology".into(),
            difficulty: "medium".into(),
            duration_minutes: 30,
            instructions: String::new(),
            settings: AssessmentSettings::default(),
            questions: vec![
                Question {
                    id: String::new(),
                    stem: "Pick the organelle".into(),
                    explanation: String::new(),
                    points: 1,
                    body: QuestionBody::Mcq {
                        options: vec!["Mitochondria".into(), "Femur".into()],
                        correct_answers: vec!["a".into()],
                        allow_multiple_answers: false,
                        distractor_feedback: None,
                    },
                },
                Question {
                    id: String::new(),
                    stem: String::new(),
                    explanation: String::new(),
                    points: 1,
                    body: QuestionBody::Reordering {
                        items: vec![
                            OrderItem { id: 1, text: "Prophase".into() },
                            OrderItem { id: 2, text: "Metaphase".into() },
                        ],
                        correct_order: vec![],
                        instructions: "Order the phases".into(),
                    },
                },
            ],
        }
    }

    #[tokio::test]
    async fn save_and_fetch_preserves_question_order() {
        let store = Store::connect(":memory:").await.expect("store");
        let id = store.save_assessment("author-1", &sample_assessment()).await.expect("save");

        let fetched = store.fetch_assessment(&id).await.expect("fetch").expect("present");
        assert_eq!(fetched.title, "Cell biology check");
        assert_eq!(fetched.questions.len(), 2);
        assert_eq!(fetched.questions[0].body.kind(), "mcq");
        assert_eq!(fetched.questions[1].body.kind(), "reordering");
        assert!(!fetched.questions[0].id.is_empty(), "question ids are assigned on save");
    }

    #[tokio::test]
    async fn resaving_replaces_the_question_list() {
        let store = Store::connect(":memory:").await.expect("store");
        let id = store.save_assessment("author-1", &sample_assessment()).await.expect("save");

        let mut second = sample_assessment();
        second.id = id.clone();
        second.title = "Cell biology check v2".into();
        second.questions.truncate(1);
        let id2 = store.save_assessment("author-1", &second).await.expect("resave");
        assert_eq!(id, id2);

        let fetched = store.fetch_assessment(&id).await.expect("fetch").expect("present");
        assert_eq!(fetched.title, "Cell biology check v2");
        assert_eq!(fetched.questions.len(), 1);
    }

    #[tokio::test]
    async fn owner_listing_excludes_other_authors() {
        let store = Store::connect(":memory:").await.expect("store");
        store.save_assessment("author-1", &sample_assessment()).await.expect("save");
        store.save_assessment("author-2", &sample_assessment()).await.expect("save");

        let mine = store.list_assessments_by_owner("author-1").await.expect("list");
        assert_eq!(mine.len(), 1);
        assert!(store.list_assessments_by_owner("nobody").await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn user_upsert_is_keyed_by_email() {
        let store = Store::connect(":memory:").await.expect("store");
        let first = store.upsert_user("kim@example.edu", "Kim").await.expect("upsert");
        let second = store.upsert_user("kim@example.edu", "Kim R.").await.expect("upsert");
        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Kim R.");
        assert!(store.get_user("nobody@example.edu").await.expect("get").is_none());
    }
}

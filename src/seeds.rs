//! Seed data and small utilities related to default content.

use crate::domain::{
  Assessment, AssessmentSettings, AssessmentStatus, OrderItem, Question, QuestionBody, Zone,
};

/// Built-in sample assessment covering all three question kinds, so the
/// app is useful against an empty database.
pub fn sample_assessment() -> Assessment {
  Assessment {
    id: "seed-geography-101".into(),
    title: "Geography warm-up".into(),
    description: "A short sample assessment seeded at first startup.".into(),
    status: AssessmentStatus::Published,
    mode: "formative".into(),
    subject: "geography".into(),
    difficulty: "easy".into(),
    duration_minutes: 10,
    instructions: "Answer every question; feedback is shown after each submission.".into(),
    settings: AssessmentSettings::default(),
    questions: vec![
      Question {
        id: "seed-q1".into(),
        stem: "Which city is the capital of France?".into(),
        explanation: "Paris has been the French capital since 987.".into(),
        points: 1,
        body: QuestionBody::Mcq {
          options: vec!["London".into(), "Paris".into(), "Rome".into(), "Berlin".into()],
          correct_answers: vec!["b".into()],
          allow_multiple_answers: false,
          distractor_feedback: None,
        },
      },
      Question {
        id: "seed-q2".into(),
        stem: String::new(),
        explanation: "Rivers are ordered by length, longest first.".into(),
        points: 1,
        body: QuestionBody::Reordering {
          items: vec![
            OrderItem { id: 1, text: "Nile".into() },
            OrderItem { id: 2, text: "Amazon".into() },
            OrderItem { id: 3, text: "Danube".into() },
          ],
          correct_order: vec!["Nile".into(), "Amazon".into(), "Danube".into()],
          instructions: "Order the rivers from longest to shortest.".into(),
        },
      },
      Question {
        id: "seed-q3".into(),
        stem: String::new(),
        explanation: "The highlighted region marks the Iberian peninsula.".into(),
        points: 1,
        body: QuestionBody::Hotspot {
          zones: vec![
            Zone { x: 12.0, y: 55.0, width: 14.0, height: 16.0, is_correct: true },
            Zone { x: 60.0, y: 20.0, width: 10.0, height: 10.0, is_correct: false },
          ],
          image_url: "/static/img/europe-outline.png".into(),
          instructions: "Mark the Iberian peninsula on the map.".into(),
        },
      },
    ],
  }
}

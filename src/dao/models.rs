use serde::{Deserialize, Serialize};

/// Whole quiz store document as written to durable storage.
///
/// `all_topics[i]` is the display topic of `all_quizzes[i]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoreDocument {
    /// Display topics, index-aligned with `all_quizzes`.
    #[serde(default)]
    pub all_topics: Vec<String>,
    /// Stored quizzes with their play statistics.
    #[serde(default)]
    pub all_quizzes: Vec<QuizEntity>,
}

/// Persisted representation of one topic's quiz and its running statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizEntity {
    /// Display topic as returned by the generator.
    pub topic: String,
    /// Question texts in play order.
    pub questions: Vec<String>,
    /// Four choice texts per question, index-aligned with `questions`.
    pub choices: Vec<Vec<String>>,
    /// 1-based correct choice per question, index-aligned with `questions`.
    pub correct_answers: Vec<u8>,
    /// Number of times this quiz has been played.
    pub use_count: u32,
    /// Score of every play, oldest first.
    pub all_score: Vec<u8>,
    /// Share of correct answers across all plays, in percent.
    pub correct_percentage: f64,
}

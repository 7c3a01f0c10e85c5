//! Quiz generation backends.

#[cfg(feature = "mistral")]
pub mod mistral;

use futures::future::BoxFuture;
use thiserror::Error;

#[cfg(feature = "mistral")]
pub use self::mistral::{MistralConfig, MistralGenerator};

/// Public Mistral endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.mistral.ai";
/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "mistral-large-latest";

/// Failures of the generation call itself, as opposed to a badly formatted answer.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The backend could not be reached.
    #[error("generator unreachable: {0}")]
    Unavailable(String),
    /// The backend answered with an error status.
    #[error("generator API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or parse failure.
        message: String,
    },
    /// The backend answered without any content.
    #[error("generator returned no content")]
    EmptyResponse,
    /// No answer arrived within the configured limit.
    #[error("generator timed out after {0}s")]
    Timeout(u64),
}

/// Produces the delimited quiz text for a topic request.
pub trait QuizGenerator: Send + Sync {
    /// Request a quiz about `topic`. `known_topics` lists topics already in the store so the
    /// generator can reuse their exact wording when the request matches one of them.
    fn generate(
        &self,
        topic: &str,
        known_topics: &[String],
    ) -> BoxFuture<'static, Result<String, GeneratorError>>;
}

/// Fixed instructions sent ahead of every topic request.
pub const INSTRUCTIONS: &str = "\
You write short multiple-choice quizzes for university students aged 18 to 25.
Write exactly 5 questions about the topic requested at the end of this message.
Questions must be challenging but fair: favour application, analysis and hypothetical
scenarios over plain recall. Every question has exactly 4 choices, and the wrong choices
must be plausible.

First summarise the request into a topic of fewer than 5 words, using letters, digits and
spaces only. For example, \"Please generate a quiz about a cat species that is in russia\"
becomes \"Cat species in Russia\". If the request matches one of the known topics listed
below, reuse that topic exactly as written.

Answer with this layout and nothing else, replacing every placeholder with real text:
topic[]question1///choice1..choice2..choice3..choice4[]question2///choice1..choice2..choice3..choice4[]question3///choice1..choice2..choice3..choice4[]question4///choice1..choice2..choice3..choice4[]question5///choice1..choice2..choice3..choice4[]answer1..answer2..answer3..answer4..answer5

Each answer is the number (1 to 4) of the correct choice for that question.
Use `[]`, `///` and `..` only as separators. Do not add any introduction such as
\"The summarized topic is:\".";

/// Assemble the full request: instructions, known topics, then the player's request.
pub fn build_prompt(topic: &str, known_topics: &[String]) -> String {
    let known = if known_topics.is_empty() {
        "(none yet)".to_string()
    } else {
        known_topics.join(", ")
    };
    format!("{INSTRUCTIONS}\n\nKnown topics: {known}\n\nRequest: {}", topic.trim())
}

#[cfg(test)]
pub(crate) mod scripted {
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
    };

    use futures::future::BoxFuture;

    use super::{GeneratorError, QuizGenerator};

    /// Generator replaying queued responses and recording every request.
    #[derive(Clone, Default)]
    pub struct ScriptedGenerator {
        responses: Arc<Mutex<VecDeque<Result<String, GeneratorError>>>>,
        requests: Arc<Mutex<Vec<(String, Vec<String>)>>>,
    }

    impl ScriptedGenerator {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, response: Result<String, GeneratorError>) {
            self.responses.lock().unwrap().push_back(response);
        }

        pub fn requests(&self) -> Vec<(String, Vec<String>)> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl QuizGenerator for ScriptedGenerator {
        fn generate(
            &self,
            topic: &str,
            known_topics: &[String],
        ) -> BoxFuture<'static, Result<String, GeneratorError>> {
            self.requests
                .lock()
                .unwrap()
                .push((topic.to_string(), known_topics.to_vec()));
            let next = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(GeneratorError::EmptyResponse));
            Box::pin(async move { next })
        }
    }
}

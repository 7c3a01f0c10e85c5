use crate::dao::{models::QuizEntity, storage::StorageError};

/// Number of questions in every quiz.
pub const QUESTIONS_PER_QUIZ: usize = 5;
/// Number of choices offered for every question.
pub const CHOICES_PER_QUESTION: usize = 4;
/// Highest score a single play can reach.
pub const MAX_SCORE: u8 = QUESTIONS_PER_QUIZ as u8;

/// One of the four answer choices, numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Choice(u8);

impl Choice {
    /// Build a choice from its 1-based number, rejecting anything outside 1..=4.
    pub fn new(number: u8) -> Option<Self> {
        (1..=CHOICES_PER_QUESTION as u8)
            .contains(&number)
            .then_some(Self(number))
    }

    /// 1-based choice number.
    pub fn number(self) -> u8 {
        self.0
    }

    /// 0-based position in a choice group.
    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }
}

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Question text.
    pub text: String,
    /// The four candidate answers, in display order.
    pub choices: [String; CHOICES_PER_QUESTION],
    /// The choice that answers the question.
    pub correct: Choice,
}

impl Question {
    /// Whether `selected` is the correct answer.
    pub fn is_correct(&self, selected: Choice) -> bool {
        self.correct == selected
    }
}

/// Quiz content as produced by the generator, before any play statistics exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedQuiz {
    /// Topic with its original casing, used for display.
    pub topic: String,
    /// The five questions in play order.
    pub questions: [Question; QUESTIONS_PER_QUIZ],
}

impl GeneratedQuiz {
    /// Case-insensitive key identifying the topic inside the store.
    pub fn key(&self) -> String {
        topic_key(&self.topic)
    }
}

/// Normalize a topic into its store key.
pub fn topic_key(topic: &str) -> String {
    topic.trim().to_lowercase()
}

/// Share of correct answers over all plays, in percent, rounded to three decimals.
pub fn correct_percentage(scores: &[u8]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let total: u32 = scores.iter().map(|&score| u32::from(score)).sum();
    let possible = u32::from(MAX_SCORE) * scores.len() as u32;
    round3(100.0 * f64::from(total) / f64::from(possible))
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// A stored quiz together with its running statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizRecord {
    /// Questions, choices and answers for the topic.
    pub quiz: GeneratedQuiz,
    /// Number of plays; always equals `all_scores.len()`.
    pub use_count: u32,
    /// Score of every play, oldest first.
    pub all_scores: Vec<u8>,
    /// Derived from `all_scores`, see [`correct_percentage`].
    pub correct_percentage: f64,
}

impl QuizRecord {
    /// Record for a quiz played for the first time.
    pub fn first_play(quiz: GeneratedQuiz, score: u8) -> Self {
        Self {
            quiz,
            use_count: 1,
            all_scores: vec![score],
            correct_percentage: correct_percentage(&[score]),
        }
    }

    /// Append one play and refresh the derived statistics.
    pub fn push_play(&mut self, score: u8) {
        self.all_scores.push(score);
        self.use_count = self.all_scores.len() as u32;
        self.correct_percentage = correct_percentage(&self.all_scores);
    }

    /// Display topic.
    pub fn topic(&self) -> &str {
        &self.quiz.topic
    }
}

/// The person playing the current session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Player {
    /// Name typed on the first screen.
    pub name: String,
    /// Free-text topic request typed before generation.
    pub topic: String,
    /// Correct answers in the current round.
    pub score: u8,
}

impl TryFrom<QuizEntity> for QuizRecord {
    type Error = StorageError;

    fn try_from(value: QuizEntity) -> Result<Self, Self::Error> {
        let QuizEntity {
            topic,
            questions,
            choices,
            correct_answers,
            use_count,
            all_score,
            correct_percentage: _,
        } = value;

        if topic.trim().is_empty() {
            return Err(StorageError::corrupt("quiz with an empty topic"));
        }
        if questions.len() != QUESTIONS_PER_QUIZ
            || choices.len() != QUESTIONS_PER_QUIZ
            || correct_answers.len() != QUESTIONS_PER_QUIZ
        {
            return Err(StorageError::corrupt(format!(
                "quiz `{topic}` must hold {QUESTIONS_PER_QUIZ} questions, choice groups and answers"
            )));
        }
        if use_count as usize != all_score.len() {
            return Err(StorageError::corrupt(format!(
                "quiz `{topic}` use count {use_count} does not match {} recorded scores",
                all_score.len()
            )));
        }
        if let Some(score) = all_score.iter().find(|&&score| score > MAX_SCORE) {
            return Err(StorageError::corrupt(format!(
                "quiz `{topic}` holds out-of-range score {score}"
            )));
        }

        let questions = questions
            .into_iter()
            .zip(choices)
            .zip(correct_answers)
            .map(|((text, group), answer)| -> Result<Question, StorageError> {
                let choices: [String; CHOICES_PER_QUESTION] =
                    group.try_into().map_err(|group: Vec<String>| {
                        StorageError::corrupt(format!(
                            "quiz `{topic}` has a choice group of {} entries",
                            group.len()
                        ))
                    })?;
                let correct = Choice::new(answer).ok_or_else(|| {
                    StorageError::corrupt(format!("quiz `{topic}` has invalid answer {answer}"))
                })?;
                Ok(Question {
                    text,
                    choices,
                    correct,
                })
            })
            .collect::<Result<Vec<_>, StorageError>>()?;
        let questions: [Question; QUESTIONS_PER_QUIZ] = questions
            .try_into()
            .map_err(|_| StorageError::corrupt(format!("quiz `{topic}` lost a question")))?;

        // Derived from the scores; the stored value is ignored.
        let correct_percentage = correct_percentage(&all_score);

        Ok(Self {
            quiz: GeneratedQuiz { topic, questions },
            use_count,
            all_scores: all_score,
            correct_percentage,
        })
    }
}

impl From<QuizRecord> for QuizEntity {
    fn from(value: QuizRecord) -> Self {
        let QuizRecord {
            quiz: GeneratedQuiz { topic, questions },
            use_count,
            all_scores,
            correct_percentage,
        } = value;

        let mut texts = Vec::with_capacity(QUESTIONS_PER_QUIZ);
        let mut choices = Vec::with_capacity(QUESTIONS_PER_QUIZ);
        let mut correct_answers = Vec::with_capacity(QUESTIONS_PER_QUIZ);
        for question in questions {
            texts.push(question.text);
            choices.push(question.choices.to_vec());
            correct_answers.push(question.correct.number());
        }

        Self {
            topic,
            questions: texts,
            choices,
            correct_answers,
            use_count,
            all_score: all_scores,
            correct_percentage,
        }
    }
}

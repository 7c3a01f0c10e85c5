//! Delimited text contract exchanged with the quiz generator.
//!
//! A response looks like
//! `topic[]question1///c1..c2..c3..c4[]...[]question5///c1..c2..c3..c4[]a1..a2..a3..a4..a5`.

use thiserror::Error;

use crate::state::quiz::{
    CHOICES_PER_QUESTION, Choice, GeneratedQuiz, QUESTIONS_PER_QUIZ, Question,
};

/// Separates the topic, the question blocks and the answer block.
pub const SEGMENT_SEPARATOR: &str = "[]";
/// Separates a question's text from its choices.
pub const QUESTION_SEPARATOR: &str = "///";
/// Separates choices inside a block, and answers inside the answer block.
pub const ITEM_SEPARATOR: &str = "..";

const SEGMENT_COUNT: usize = QUESTIONS_PER_QUIZ + 2;

/// Ways a generator response can violate the delimiter contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedResponse {
    /// Wrong number of `[]` segments.
    #[error("expected {SEGMENT_COUNT} `[]` segments, found {found}")]
    SegmentCount {
        /// Segments actually present.
        found: usize,
    },
    /// The topic segment is blank.
    #[error("topic is empty")]
    EmptyTopic,
    /// A question block did not split into text and choices.
    #[error("question {question} has {found} `///` parts, expected 2")]
    QuestionParts {
        /// 1-based question number.
        question: usize,
        /// Parts actually present.
        found: usize,
    },
    /// A choice block did not hold exactly four choices.
    #[error("question {question} has {found} choices, expected {CHOICES_PER_QUESTION}")]
    ChoiceCount {
        /// 1-based question number.
        question: usize,
        /// Choices actually present.
        found: usize,
    },
    /// The answer block did not hold exactly five answers.
    #[error("expected {QUESTIONS_PER_QUIZ} answers, found {found}")]
    AnswerCount {
        /// Answers actually present.
        found: usize,
    },
    /// An answer token is not a choice number between 1 and 4.
    #[error("answer {question} is `{token}`, expected a number from 1 to {CHOICES_PER_QUESTION}")]
    InvalidAnswer {
        /// 1-based question number.
        question: usize,
        /// The offending token.
        token: String,
    },
}

/// Parse a generator response into quiz content.
///
/// Every piece is trimmed, since generators tend to break the layout over several lines.
pub fn decode(response: &str) -> Result<GeneratedQuiz, MalformedResponse> {
    let segments: Vec<&str> = response.trim().split(SEGMENT_SEPARATOR).collect();
    if segments.len() != SEGMENT_COUNT {
        return Err(MalformedResponse::SegmentCount {
            found: segments.len(),
        });
    }

    let topic = segments[0].trim();
    if topic.is_empty() {
        return Err(MalformedResponse::EmptyTopic);
    }

    let answers = decode_answers(segments[SEGMENT_COUNT - 1])?;

    let questions = segments[1..=QUESTIONS_PER_QUIZ]
        .iter()
        .zip(answers)
        .enumerate()
        .map(|(index, (block, correct))| decode_question(index + 1, block, correct))
        .collect::<Result<Vec<_>, _>>()?;
    let questions: [Question; QUESTIONS_PER_QUIZ] = questions
        .try_into()
        .map_err(|found: Vec<Question>| MalformedResponse::SegmentCount {
            found: found.len() + 2,
        })?;

    Ok(GeneratedQuiz {
        topic: topic.to_string(),
        questions,
    })
}

fn decode_question(
    number: usize,
    block: &str,
    correct: Choice,
) -> Result<Question, MalformedResponse> {
    let parts: Vec<&str> = block.split(QUESTION_SEPARATOR).collect();
    let [text, choices] = parts.as_slice() else {
        return Err(MalformedResponse::QuestionParts {
            question: number,
            found: parts.len(),
        });
    };

    let choices: Vec<String> = choices
        .split(ITEM_SEPARATOR)
        .map(|choice| choice.trim().to_string())
        .collect();
    let found = choices.len();
    let choices: [String; CHOICES_PER_QUESTION] =
        choices
            .try_into()
            .map_err(|_| MalformedResponse::ChoiceCount {
                question: number,
                found,
            })?;

    Ok(Question {
        text: text.trim().to_string(),
        choices,
        correct,
    })
}

fn decode_answers(block: &str) -> Result<Vec<Choice>, MalformedResponse> {
    let tokens: Vec<&str> = block.split(ITEM_SEPARATOR).map(str::trim).collect();
    if tokens.len() != QUESTIONS_PER_QUIZ {
        return Err(MalformedResponse::AnswerCount {
            found: tokens.len(),
        });
    }

    tokens
        .into_iter()
        .enumerate()
        .map(|(index, token)| {
            token
                .parse::<u8>()
                .ok()
                .and_then(Choice::new)
                .ok_or_else(|| MalformedResponse::InvalidAnswer {
                    question: index + 1,
                    token: token.to_string(),
                })
        })
        .collect()
}

/// Render quiz content back into the generator's text layout.
pub fn encode(quiz: &GeneratedQuiz) -> String {
    let mut segments = Vec::with_capacity(SEGMENT_COUNT);
    segments.push(quiz.topic.clone());
    segments.extend(quiz.questions.iter().map(|question| {
        format!(
            "{}{QUESTION_SEPARATOR}{}",
            question.text,
            question.choices.join(ITEM_SEPARATOR)
        )
    }));
    segments.push(
        quiz.questions
            .iter()
            .map(|question| question.correct.number().to_string())
            .collect::<Vec<_>>()
            .join(ITEM_SEPARATOR),
    );
    segments.join(SEGMENT_SEPARATOR)
}

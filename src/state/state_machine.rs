use std::path::PathBuf;

use thiserror::Error;

use crate::state::{
    layout::{self, EndButton, OptionButton},
    quiz::{Choice, Player, QUESTIONS_PER_QUIZ, Question},
    store::QuizLookup,
};

/// Discrete events delivered by the input layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// A printable character was typed.
    KeyAppend(char),
    /// The last typed character should be removed.
    KeyBackspace,
    /// The current text entry was confirmed.
    KeyCommit,
    /// Primary pointer button pressed at the given surface coordinates.
    PointerClick {
        /// Horizontal position in pixels.
        x: i32,
        /// Vertical position in pixels.
        y: i32,
    },
    /// Secondary pointer button pressed; used to go back.
    PointerRightClick,
}

/// Whether the selected answer was right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// The selected choice was the correct one.
    Correct,
    /// The selected choice was wrong.
    Incorrect,
}

/// Text-entry screen a side branch was opened from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Opened from the name screen.
    EnteringName,
    /// Opened from the topic screen.
    ChoosingTopic,
}

impl Origin {
    fn stage(self) -> Stage {
        match self {
            Origin::EnteringName => Stage::EnteringName,
            Origin::ChoosingTopic => Stage::ChoosingTopic,
        }
    }
}

/// Screens a session moves through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Typing the player name.
    EnteringName,
    /// Typing the requested topic.
    ChoosingTopic,
    /// Waiting for the generator.
    GeneratingQuiz,
    /// Showing a question and waiting for an answer.
    Quiz {
        /// 0-based index of the question on screen.
        question_index: usize,
    },
    /// Showing whether the last answer was right.
    AnswerFeedback {
        /// 0-based index of the answered question.
        question_index: usize,
        /// Choice the player picked.
        selected: Choice,
        /// Whether it was correct.
        outcome: AnswerOutcome,
    },
    /// Recording the finished round in the quiz store.
    Updating {
        /// Set when the write failed and a commit or click should retry it.
        awaiting_retry: bool,
    },
    /// Round over; the player can replay or leave.
    SessionEnd,
    /// Ranked list of challenging topics.
    Leaderboard {
        /// Screen to return to.
        origin: Origin,
    },
    /// Per-topic statistics list.
    Performance {
        /// Screen to return to.
        origin: Origin,
    },
    /// Score histogram of one topic.
    Plot {
        /// Screen the performance list was opened from.
        origin: Origin,
        /// Display topic being plotted.
        topic: String,
        /// Image produced by the plotter.
        image: PathBuf,
    },
    /// The player left; no further input is processed.
    Left,
}

/// Work the session has to carry out after an input event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// The event did not apply to the current stage.
    Ignore,
    /// The state changed; only a redraw is needed.
    Render,
    /// Ask the generator for a quiz about `topic`.
    GenerateQuiz {
        /// Free-text topic typed by the player.
        topic: String,
    },
    /// Fold the finished round into the quiz store.
    RecordOutcome {
        /// Final score of the round.
        score: u8,
    },
    /// Retry writing the quiz store after a failed write.
    RetryPersist,
    /// Reload the quiz store before the next round.
    ReloadStore,
    /// Plot the topic listed on the given performance row.
    PlotTopic {
        /// 0-based row on the performance screen.
        row: usize,
    },
    /// The session is over.
    Leave,
}

/// Results of work carried out on behalf of the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The quiz to play has been decided.
    QuizReady(QuizLookup),
    /// Generation or decoding failed; the message is shown to the player.
    GenerationFailed(String),
    /// The round has been durably recorded.
    OutcomeStored,
    /// The round is held in memory but could not be written.
    OutcomeNotStored(String),
    /// The histogram for a performance row is ready.
    PlotReady {
        /// Display topic.
        topic: String,
        /// Image location.
        image: PathBuf,
    },
}

/// Error returned when a completion arrives in a stage that is not waiting for it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {completion:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The stage the machine was in.
    pub from: Stage,
    /// The completion that cannot be applied.
    pub completion: Completion,
}

/// Stage, player and round data of one session.
///
/// Input events never fail: anything that does not apply to the current stage is ignored.
#[derive(Debug, Clone)]
pub struct SessionMachine {
    stage: Stage,
    player: Player,
    quiz: Option<QuizLookup>,
    notice: Option<String>,
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self {
            stage: Stage::EnteringName,
            player: Player::default(),
            quiz: None,
            notice: None,
        }
    }
}

impl SessionMachine {
    /// Create a machine waiting for the player's name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current stage.
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Player data.
    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Quiz of the round in progress.
    pub fn quiz(&self) -> Option<&QuizLookup> {
        self.quiz.as_ref()
    }

    /// Message explaining the last failure, if the player should see one.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Whether the player has left.
    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Left
    }

    /// Question on screen during the quiz and feedback stages, with its index.
    pub fn current_question(&self) -> Option<(usize, &Question)> {
        let index = match self.stage {
            Stage::Quiz { question_index } | Stage::AnswerFeedback { question_index, .. } => {
                question_index
            }
            _ => return None,
        };
        let lookup = self.quiz.as_ref()?;
        lookup.quiz.questions.get(index).map(|q| (index, q))
    }

    /// Apply an input event and report the work it requires.
    pub fn apply_input(&mut self, input: InputEvent) -> Command {
        if let InputEvent::PointerClick { x, y } = input {
            if !layout::on_surface(x, y) {
                return Command::Ignore;
            }
        }
        match (self.stage.clone(), input) {
            (Stage::EnteringName, InputEvent::KeyCommit) => {
                let name = self.player.name.trim();
                if name.is_empty() {
                    return Command::Ignore;
                }
                self.player.name = name.to_string();
                self.enter(Stage::ChoosingTopic)
            }
            (Stage::EnteringName, input) => {
                edit_text(&mut self.player.name, input).unwrap_or_else(|| {
                    self.open_option(input, Origin::EnteringName)
                })
            }
            (Stage::ChoosingTopic, InputEvent::KeyCommit) => {
                let topic = self.player.topic.trim();
                if topic.is_empty() {
                    return Command::Ignore;
                }
                let topic = topic.to_string();
                self.player.topic = topic.clone();
                self.enter(Stage::GeneratingQuiz);
                Command::GenerateQuiz { topic }
            }
            (Stage::ChoosingTopic, input) => edit_text(&mut self.player.topic, input)
                .unwrap_or_else(|| self.open_option(input, Origin::ChoosingTopic)),
            (Stage::Quiz { question_index }, InputEvent::PointerClick { x, y }) => {
                let Some(selected) = layout::choice_at(x, y) else {
                    return Command::Ignore;
                };
                let Some((_, question)) = self.current_question() else {
                    return Command::Ignore;
                };
                let outcome = if question.is_correct(selected) {
                    self.player.score += 1;
                    AnswerOutcome::Correct
                } else {
                    AnswerOutcome::Incorrect
                };
                self.enter(Stage::AnswerFeedback {
                    question_index,
                    selected,
                    outcome,
                })
            }
            (
                Stage::AnswerFeedback { question_index, .. },
                InputEvent::KeyCommit | InputEvent::PointerClick { .. },
            ) => {
                let next = question_index + 1;
                if next < QUESTIONS_PER_QUIZ {
                    return self.enter(Stage::Quiz {
                        question_index: next,
                    });
                }
                self.enter(Stage::Updating {
                    awaiting_retry: false,
                });
                Command::RecordOutcome {
                    score: self.player.score,
                }
            }
            (
                Stage::Updating {
                    awaiting_retry: true,
                },
                InputEvent::KeyCommit | InputEvent::PointerClick { .. },
            ) => {
                self.stage = Stage::Updating {
                    awaiting_retry: false,
                };
                Command::RetryPersist
            }
            (Stage::SessionEnd, InputEvent::PointerClick { x, y }) => {
                match layout::end_button_at(x, y) {
                    Some(EndButton::Replay) => {
                        self.player.score = 0;
                        self.player.topic.clear();
                        self.enter(Stage::ChoosingTopic);
                        Command::ReloadStore
                    }
                    Some(EndButton::Leave) => {
                        self.enter(Stage::Left);
                        Command::Leave
                    }
                    None => Command::Ignore,
                }
            }
            (Stage::Leaderboard { origin }, InputEvent::PointerRightClick)
            | (Stage::Performance { origin }, InputEvent::PointerRightClick) => {
                self.enter(origin.stage())
            }
            (Stage::Performance { .. }, InputEvent::PointerClick { x, y }) => {
                match layout::plot_row_at(x, y) {
                    Some(row) => Command::PlotTopic { row },
                    None => Command::Ignore,
                }
            }
            (Stage::Plot { origin, .. }, InputEvent::PointerRightClick) => {
                self.enter(Stage::Performance { origin })
            }
            _ => Command::Ignore,
        }
    }

    /// Apply the result of work requested through a [`Command`].
    pub fn complete(&mut self, completion: Completion) -> Result<(), InvalidTransition> {
        match (self.stage.clone(), completion) {
            (Stage::GeneratingQuiz, Completion::QuizReady(lookup)) => {
                self.quiz = Some(lookup);
                self.player.score = 0;
                self.enter(Stage::Quiz { question_index: 0 });
            }
            (Stage::GeneratingQuiz, Completion::GenerationFailed(message)) => {
                self.quiz = None;
                self.enter(Stage::ChoosingTopic);
                self.notice = Some(message);
            }
            (Stage::Updating { .. }, Completion::OutcomeStored) => {
                self.quiz = None;
                self.enter(Stage::SessionEnd);
            }
            (Stage::Updating { .. }, Completion::OutcomeNotStored(message)) => {
                self.stage = Stage::Updating {
                    awaiting_retry: true,
                };
                self.notice = Some(message);
            }
            (Stage::Performance { origin }, Completion::PlotReady { topic, image }) => {
                self.enter(Stage::Plot {
                    origin,
                    topic,
                    image,
                });
            }
            (from, completion) => return Err(InvalidTransition { from, completion }),
        }
        Ok(())
    }

    fn enter(&mut self, stage: Stage) -> Command {
        self.stage = stage;
        self.notice = None;
        Command::Render
    }

    fn open_option(&mut self, input: InputEvent, origin: Origin) -> Command {
        let InputEvent::PointerClick { x, y } = input else {
            return Command::Ignore;
        };
        match layout::option_at(x, y) {
            Some(OptionButton::Leaderboard) => self.enter(Stage::Leaderboard { origin }),
            Some(OptionButton::Performance) => self.enter(Stage::Performance { origin }),
            None => Command::Ignore,
        }
    }
}

/// Apply a text-editing event to `text`, or `None` when the event is not an edit.
fn edit_text(text: &mut String, input: InputEvent) -> Option<Command> {
    match input {
        InputEvent::KeyAppend(c) if !c.is_control() => {
            text.push(c);
            Some(Command::Render)
        }
        InputEvent::KeyAppend(_) => Some(Command::Ignore),
        InputEvent::KeyBackspace => {
            text.pop();
            Some(Command::Render)
        }
        _ => None,
    }
}

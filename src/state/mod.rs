//! Domain state: quiz records, the quiz store, screen layout and the session state machine.

pub mod layout;
pub mod quiz;
pub mod state_machine;
pub mod store;

pub use self::quiz::{Choice, GeneratedQuiz, Player, Question, QuizRecord};
pub use self::state_machine::{
    AnswerOutcome, Command, Completion, InputEvent, InvalidTransition, Origin, SessionMachine,
    Stage,
};
pub use self::store::{LeaderboardEntry, QuizLookup, QuizStore};

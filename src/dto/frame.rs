use std::path::PathBuf;

use serde::Serialize;

use crate::state::{
    layout::PLOT_ROWS,
    quiz::QUESTIONS_PER_QUIZ,
    state_machine::{AnswerOutcome, SessionMachine, Stage},
    store::{LeaderboardEntry, QuizStore},
};

/// Stage name exposed to the render layer.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleStage {
    /// Name entry.
    EnteringName,
    /// Topic entry.
    ChoosingTopic,
    /// Waiting for the generator.
    GeneratingQuiz,
    /// Question on screen.
    Quiz,
    /// Right/wrong feedback on screen.
    AnswerFeedback,
    /// Saving the round.
    Updating,
    /// Replay or leave.
    SessionEnd,
    /// Leaderboard list.
    Leaderboard,
    /// Per-topic statistics list.
    Performance,
    /// Score histogram.
    Plot,
    /// Session over.
    Left,
}

impl From<&Stage> for VisibleStage {
    fn from(value: &Stage) -> Self {
        match value {
            Stage::EnteringName => VisibleStage::EnteringName,
            Stage::ChoosingTopic => VisibleStage::ChoosingTopic,
            Stage::GeneratingQuiz => VisibleStage::GeneratingQuiz,
            Stage::Quiz { .. } => VisibleStage::Quiz,
            Stage::AnswerFeedback { .. } => VisibleStage::AnswerFeedback,
            Stage::Updating { .. } => VisibleStage::Updating,
            Stage::SessionEnd => VisibleStage::SessionEnd,
            Stage::Leaderboard { .. } => VisibleStage::Leaderboard,
            Stage::Performance { .. } => VisibleStage::Performance,
            Stage::Plot { .. } => VisibleStage::Plot,
            Stage::Left => VisibleStage::Left,
        }
    }
}

/// Player fields shown on every screen.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct PlayerView {
    /// Name as typed so far.
    pub name: String,
    /// Topic request as typed so far.
    pub topic: String,
    /// Correct answers in the current round.
    pub score: u8,
}

/// Question currently on screen.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct QuestionView {
    /// 1-based question number.
    pub number: usize,
    /// Questions in the round.
    pub total: usize,
    /// Question wording.
    pub text: String,
    /// Choices in quadrant order: top-left, top-right, bottom-left, bottom-right.
    pub choices: Vec<String>,
}

/// Result of the last answer, present on the feedback screen.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct FeedbackView {
    /// Whether the pick was right.
    pub correct: bool,
    /// 1-based choice the player picked.
    pub selected: u8,
    /// 1-based choice that was right.
    pub answer: u8,
}

/// One line of the performance screen.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PerformanceRow {
    /// Display topic.
    pub topic: String,
    /// Times the topic was played.
    pub use_count: u32,
    /// Share of correct answers, in percent.
    pub correct_percentage: f64,
}

/// Everything the render layer needs to draw the current screen.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SessionFrame {
    /// Screen to draw.
    pub stage: VisibleStage,
    /// Player fields.
    pub player: PlayerView,
    /// Present during quiz and feedback screens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionView>,
    /// Present on the feedback screen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackView>,
    /// Present on the leaderboard screen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leaderboard: Option<Vec<LeaderboardEntry>>,
    /// Present on the performance screen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<Vec<PerformanceRow>>,
    /// Present on the plot screen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot_image: Option<PathBuf>,
    /// Failure message the player should see.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl SessionFrame {
    /// Project the machine and store into a frame.
    pub fn build(machine: &SessionMachine, store: &QuizStore) -> Self {
        let stage = machine.stage();
        let player = machine.player();

        let question = machine
            .current_question()
            .map(|(index, question)| QuestionView {
                number: index + 1,
                total: QUESTIONS_PER_QUIZ,
                text: question.text.clone(),
                choices: question.choices.to_vec(),
            });

        let feedback = match (stage, machine.current_question()) {
            (
                Stage::AnswerFeedback {
                    selected, outcome, ..
                },
                Some((_, question)),
            ) => Some(FeedbackView {
                correct: *outcome == AnswerOutcome::Correct,
                selected: selected.number(),
                answer: question.correct.number(),
            }),
            _ => None,
        };

        let leaderboard = matches!(stage, Stage::Leaderboard { .. }).then(|| store.leaderboard());
        let performance =
            matches!(stage, Stage::Performance { .. }).then(|| performance_rows(store));
        let plot_image = match stage {
            Stage::Plot { image, .. } => Some(image.clone()),
            _ => None,
        };

        Self {
            stage: stage.into(),
            player: PlayerView {
                name: player.name.clone(),
                topic: player.topic.clone(),
                score: player.score,
            },
            question,
            feedback,
            leaderboard,
            performance,
            plot_image,
            notice: machine.notice().map(str::to_string),
        }
    }
}

/// Rows listed on the performance screen, in store order.
pub fn performance_rows(store: &QuizStore) -> Vec<PerformanceRow> {
    store
        .records()
        .take(PLOT_ROWS)
        .map(|record| PerformanceRow {
            topic: record.topic().to_string(),
            use_count: record.use_count,
            correct_percentage: record.correct_percentage,
        })
        .collect()
}

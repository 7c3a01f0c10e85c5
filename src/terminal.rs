//! Text front end: prints session frames and turns typed lines into input events.

use std::{
    fmt::Write as _,
    io::{self, Write},
};

use tracing::warn;

use crate::{
    dto::frame::{SessionFrame, VisibleStage},
    services::session_service::Renderer,
    state::{
        Choice, InputEvent, Stage,
        layout::{
            LEADERBOARD_BUTTON, LEAVE_BUTTON, PERFORMANCE_BUTTON, PLOT_ROWS, REPLAY_BUTTON,
            choice_region, plot_row_region,
        },
    },
};

/// Prefix marking a command on the name and topic screens, where plain text is data.
const COMMAND_PREFIX: char = ':';

/// Renderer printing every frame to a writer.
pub struct TerminalRenderer<W> {
    out: W,
}

impl TerminalRenderer<io::Stdout> {
    /// Render to standard output.
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write + Send> Renderer for TerminalRenderer<W> {
    fn render(&mut self, frame: &SessionFrame) {
        let text = draw(frame);
        if let Err(err) = self.out.write_all(text.as_bytes()).and_then(|_| self.out.flush()) {
            warn!(error = %err, "failed to draw frame");
        }
    }
}

/// Text for one frame.
pub fn draw(frame: &SessionFrame) -> String {
    let mut out = String::from("\n");
    if let Some(notice) = &frame.notice {
        let _ = writeln!(out, "!! {notice}");
    }

    match frame.stage {
        VisibleStage::EnteringName => {
            let _ = writeln!(out, "Enter your name: {}", frame.player.name);
            out.push_str("(:l leaderboard, :p performance)\n");
        }
        VisibleStage::ChoosingTopic => {
            let _ = writeln!(
                out,
                "{}, what should the quiz be about? {}",
                frame.player.name, frame.player.topic
            );
            out.push_str("(:l leaderboard, :p performance)\n");
        }
        VisibleStage::GeneratingQuiz => {
            let _ = writeln!(out, "Preparing a quiz about {}...", frame.player.topic);
        }
        VisibleStage::Quiz | VisibleStage::AnswerFeedback => {
            if let Some(question) = &frame.question {
                let _ = writeln!(
                    out,
                    "Question {}/{}: {}",
                    question.number, question.total, question.text
                );
                for (number, choice) in (1..).zip(&question.choices) {
                    let _ = writeln!(out, "  {number}) {choice}");
                }
            }
            match &frame.feedback {
                Some(feedback) if feedback.correct => {
                    let _ = writeln!(out, "Correct! (press enter)");
                }
                Some(feedback) => {
                    let _ = writeln!(
                        out,
                        "Wrong, the answer was {}. (press enter)",
                        feedback.answer
                    );
                }
                None => out.push_str("Your answer (1-4): \n"),
            }
        }
        VisibleStage::Updating => {
            if frame.notice.is_some() {
                out.push_str("Press enter to try saving again.\n");
            } else {
                out.push_str("Saving your result...\n");
            }
        }
        VisibleStage::SessionEnd => {
            let _ = writeln!(
                out,
                "{} scored {}/5 on {}. (r replay, q leave)",
                frame.player.name, frame.player.score, frame.player.topic
            );
        }
        VisibleStage::Leaderboard => {
            out.push_str("Leaderboard:\n");
            let entries = frame.leaderboard.as_deref().unwrap_or_default();
            if entries.is_empty() {
                out.push_str("  (nothing ranked yet)\n");
            }
            for (rank, entry) in (1..).zip(entries) {
                let _ = writeln!(
                    out,
                    "  {rank}. {} ({:.1}% correct)",
                    entry.topic, entry.correct_percentage
                );
            }
            out.push_str("(b back)\n");
        }
        VisibleStage::Performance => {
            out.push_str("Topics:\n");
            for (row, entry) in (1..).zip(frame.performance.as_deref().unwrap_or_default()) {
                let _ = writeln!(
                    out,
                    "  {row}. {}: played {} times, {:.1}% correct",
                    entry.topic, entry.use_count, entry.correct_percentage
                );
            }
            out.push_str("(row number to plot, b back)\n");
        }
        VisibleStage::Plot => {
            if let Some(image) = &frame.plot_image {
                let _ = writeln!(out, "Score histogram written to {}", image.display());
            }
            out.push_str("(b back)\n");
        }
        VisibleStage::Left => {
            let _ = writeln!(out, "Goodbye, {}!", frame.player.name);
        }
    }
    out
}

/// Translate one typed line into the events it stands for on the current screen.
///
/// Screen buttons are replayed as clicks at the centre of their region.
pub fn parse_line(stage: &Stage, line: &str) -> Vec<InputEvent> {
    let trimmed = line.trim();
    match stage {
        Stage::EnteringName | Stage::ChoosingTopic => {
            match trimmed.strip_prefix(COMMAND_PREFIX) {
                Some("l") => vec![click(LEADERBOARD_BUTTON.center())],
                Some("p") => vec![click(PERFORMANCE_BUTTON.center())],
                Some(_) => Vec::new(),
                None => line
                    .chars()
                    .map(InputEvent::KeyAppend)
                    .chain([InputEvent::KeyCommit])
                    .collect(),
            }
        }
        Stage::Quiz { .. } => trimmed
            .parse::<u8>()
            .ok()
            .and_then(Choice::new)
            .map(|choice| vec![click(choice_region(choice).center())])
            .unwrap_or_default(),
        Stage::AnswerFeedback { .. } | Stage::Updating { .. } => vec![InputEvent::KeyCommit],
        Stage::SessionEnd => match trimmed {
            "r" => vec![click(REPLAY_BUTTON.center())],
            "q" => vec![click(LEAVE_BUTTON.center())],
            _ => Vec::new(),
        },
        Stage::Performance { .. } => match trimmed {
            "b" => vec![InputEvent::PointerRightClick],
            _ => trimmed
                .parse::<usize>()
                .ok()
                .filter(|row| (1..=PLOT_ROWS).contains(row))
                .map(|row| vec![click(plot_row_region(row - 1).center())])
                .unwrap_or_default(),
        },
        Stage::Leaderboard { .. } | Stage::Plot { .. } if trimmed == "b" => {
            vec![InputEvent::PointerRightClick]
        }
        _ => Vec::new(),
    }
}

fn click((x, y): (i32, i32)) -> InputEvent {
    InputEvent::PointerClick { x, y }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::frame::{FeedbackView, PlayerView, QuestionView};
    use crate::state::{
        Origin,
        layout::{EndButton, OptionButton, choice_at, end_button_at, option_at, plot_row_at},
    };

    fn clicked(events: &[InputEvent]) -> (i32, i32) {
        match events {
            [InputEvent::PointerClick { x, y }] => (*x, *y),
            other => panic!("expected a single click, got {other:?}"),
        }
    }

    fn frame(stage: VisibleStage) -> SessionFrame {
        SessionFrame {
            stage,
            player: PlayerView {
                name: "Alice".into(),
                topic: "volcanoes".into(),
                score: 4,
            },
            question: None,
            feedback: None,
            leaderboard: None,
            performance: None,
            plot_image: None,
            notice: None,
        }
    }

    #[test]
    fn text_lines_are_typed_then_committed() {
        let events = parse_line(&Stage::EnteringName, "Al");
        assert_eq!(
            events,
            vec![
                InputEvent::KeyAppend('A'),
                InputEvent::KeyAppend('l'),
                InputEvent::KeyCommit
            ]
        );
    }

    #[test]
    fn option_commands_hit_the_buttons() {
        let (x, y) = clicked(&parse_line(&Stage::ChoosingTopic, ":l"));
        assert_eq!(option_at(x, y), Some(OptionButton::Leaderboard));
        let (x, y) = clicked(&parse_line(&Stage::EnteringName, " :p "));
        assert_eq!(option_at(x, y), Some(OptionButton::Performance));
        assert!(parse_line(&Stage::EnteringName, ":x").is_empty());
    }

    #[test]
    fn answers_hit_their_quadrant() {
        let stage = Stage::Quiz { question_index: 0 };
        for number in 1..=4 {
            let (x, y) = clicked(&parse_line(&stage, &number.to_string()));
            assert_eq!(choice_at(x, y), Choice::new(number));
        }
        assert!(parse_line(&stage, "5").is_empty());
        assert!(parse_line(&stage, "first").is_empty());
    }

    #[test]
    fn end_screen_and_side_branches() {
        let (x, y) = clicked(&parse_line(&Stage::SessionEnd, "r"));
        assert_eq!(end_button_at(x, y), Some(EndButton::Replay));
        let (x, y) = clicked(&parse_line(&Stage::SessionEnd, "q"));
        assert_eq!(end_button_at(x, y), Some(EndButton::Leave));

        let performance = Stage::Performance {
            origin: Origin::ChoosingTopic,
        };
        let (x, y) = clicked(&parse_line(&performance, "2"));
        assert_eq!(plot_row_at(x, y), Some(1));
        assert!(parse_line(&performance, "6").is_empty());
        assert_eq!(
            parse_line(&performance, "b"),
            vec![InputEvent::PointerRightClick]
        );
        assert_eq!(
            parse_line(
                &Stage::Leaderboard {
                    origin: Origin::EnteringName
                },
                "b"
            ),
            vec![InputEvent::PointerRightClick]
        );
    }

    #[test]
    fn draws_question_with_feedback() {
        let mut frame = frame(VisibleStage::AnswerFeedback);
        frame.question = Some(QuestionView {
            number: 2,
            total: 5,
            text: "Which gas dominates eruptions?".into(),
            choices: vec!["CO2".into(), "H2O".into(), "SO2".into(), "N2".into()],
        });
        frame.feedback = Some(FeedbackView {
            correct: false,
            selected: 1,
            answer: 2,
        });

        let text = draw(&frame);

        assert!(text.contains("Question 2/5: Which gas dominates eruptions?"));
        assert!(text.contains("  4) N2"));
        assert!(text.contains("Wrong, the answer was 2."));
    }

    #[test]
    fn renderer_writes_notice_first() {
        let mut frame = frame(VisibleStage::ChoosingTopic);
        frame.notice = Some("generator offline".into());
        let mut renderer = TerminalRenderer { out: Vec::new() };

        renderer.render(&frame);

        let text = String::from_utf8(renderer.out).unwrap();
        let notice = text.find("!! generator offline").unwrap();
        assert!(notice < text.find("what should the quiz be about").unwrap());
    }
}

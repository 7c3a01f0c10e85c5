//! Fixed screen regions used to turn pointer coordinates into session choices.
//!
//! The surface is 1000x800. The question occupies the top 300 pixels and the four
//! answers sit below it in a 2x2 grid of 500x200 quadrants.

use crate::state::quiz::Choice;

/// Surface width in pixels.
pub const SURFACE_WIDTH: i32 = 1000;
/// Surface height in pixels.
pub const SURFACE_HEIGHT: i32 = 800;
/// Height of the question banner above the answer grid.
pub const QUESTION_HEIGHT: i32 = 300;
/// Width of one answer quadrant.
pub const CHOICE_WIDTH: i32 = 500;
/// Height of one answer quadrant.
pub const CHOICE_HEIGHT: i32 = 200;
/// Number of rows listed on the performance screen.
pub const PLOT_ROWS: usize = 5;

const PLOT_ROW_TOP: i32 = 150;
const PLOT_ROW_HEIGHT: i32 = 100;

/// Whole drawing surface; pointer events outside it are dropped.
pub const SURFACE: Rect = Rect::new(0, 0, SURFACE_WIDTH, SURFACE_HEIGHT);
/// Button opening the leaderboard from the name and topic screens.
pub const LEADERBOARD_BUTTON: Rect = Rect::new(50, 700, 250, 60);
/// Button opening the performance screen from the name and topic screens.
pub const PERFORMANCE_BUTTON: Rect = Rect::new(700, 700, 250, 60);
/// Button starting another round from the end screen.
pub const REPLAY_BUTTON: Rect = Rect::new(250, 450, 200, 80);
/// Button leaving the game from the end screen.
pub const LEAVE_BUTTON: Rect = Rect::new(550, 450, 200, 80);

/// Axis-aligned rectangle; `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl Rect {
    /// Build a rectangle from its top-left corner and size.
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the point lies inside; right and bottom edges are exclusive.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    /// Centre point, handy for synthesizing clicks.
    pub fn center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }
}

/// Buttons available on the name and topic screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionButton {
    /// Open the leaderboard.
    Leaderboard,
    /// Open the performance screen.
    Performance,
}

/// Buttons available on the end screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndButton {
    /// Play another round.
    Replay,
    /// Leave the game.
    Leave,
}

/// Quadrant holding `choice`: 1 top-left, 2 top-right, 3 bottom-left, 4 bottom-right.
pub fn choice_region(choice: Choice) -> Rect {
    let index = choice.index() as i32;
    Rect::new(
        (index % 2) * CHOICE_WIDTH,
        QUESTION_HEIGHT + (index / 2) * CHOICE_HEIGHT,
        CHOICE_WIDTH,
        CHOICE_HEIGHT,
    )
}

/// Whether the pointer position lies on the drawing surface.
pub fn on_surface(x: i32, y: i32) -> bool {
    SURFACE.contains(x, y)
}

/// Answer quadrant under the pointer, if any.
pub fn choice_at(x: i32, y: i32) -> Option<Choice> {
    (1..=4)
        .filter_map(Choice::new)
        .find(|&choice| choice_region(choice).contains(x, y))
}

/// Option button under the pointer, if any.
pub fn option_at(x: i32, y: i32) -> Option<OptionButton> {
    if LEADERBOARD_BUTTON.contains(x, y) {
        Some(OptionButton::Leaderboard)
    } else if PERFORMANCE_BUTTON.contains(x, y) {
        Some(OptionButton::Performance)
    } else {
        None
    }
}

/// End-screen button under the pointer, if any.
pub fn end_button_at(x: i32, y: i32) -> Option<EndButton> {
    if REPLAY_BUTTON.contains(x, y) {
        Some(EndButton::Replay)
    } else if LEAVE_BUTTON.contains(x, y) {
        Some(EndButton::Leave)
    } else {
        None
    }
}

/// Horizontal band of the performance list holding `row` (0-based).
pub fn plot_row_region(row: usize) -> Rect {
    Rect::new(
        0,
        PLOT_ROW_TOP + row as i32 * PLOT_ROW_HEIGHT,
        SURFACE_WIDTH,
        PLOT_ROW_HEIGHT,
    )
}

/// Performance list row under the pointer, if any.
pub fn plot_row_at(x: i32, y: i32) -> Option<usize> {
    (0..PLOT_ROWS).find(|&row| plot_row_region(row).contains(x, y))
}

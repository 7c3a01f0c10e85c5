//! Score histograms for the performance screen.

use std::{fmt::Write as _, fs, io, path::PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::state::quiz::MAX_SCORE;

/// Failure to produce a histogram image.
#[derive(Debug, Error)]
pub enum PlotError {
    /// The image could not be written.
    #[error("failed to write plot `{path}`")]
    Write {
        /// Target image path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Turns a topic's per-play scores into an image the render layer can display.
pub trait ScorePlotter: Send + Sync {
    /// Produce the histogram for `topic` and return where the image was written.
    fn plot(&self, topic: &str, scores: &[u8]) -> Result<PathBuf, PlotError>;
}

const WIDTH: u32 = 600;
const HEIGHT: u32 = 400;
const MARGIN: u32 = 50;

/// Writes one SVG bar chart per topic into a directory.
#[derive(Debug, Clone)]
pub struct SvgHistogramPlotter {
    directory: PathBuf,
}

impl SvgHistogramPlotter {
    /// Plot into `directory`, which is created on first use.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

impl ScorePlotter for SvgHistogramPlotter {
    fn plot(&self, topic: &str, scores: &[u8]) -> Result<PathBuf, PlotError> {
        let path = self.directory.join(format!("{}.svg", slug(topic)));
        fs::create_dir_all(&self.directory).map_err(|source| PlotError::Write {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, render_svg(topic, scores)).map_err(|source| PlotError::Write {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), plays = scores.len(), "score histogram written");
        Ok(path)
    }
}

/// Number of plays for every possible score, index = score.
pub fn histogram(scores: &[u8]) -> [u32; MAX_SCORE as usize + 1] {
    let mut counts = [0u32; MAX_SCORE as usize + 1];
    for &score in scores {
        if let Some(count) = counts.get_mut(usize::from(score)) {
            *count += 1;
        }
    }
    counts
}

fn render_svg(topic: &str, scores: &[u8]) -> String {
    let counts = histogram(scores);
    let tallest = counts.iter().copied().max().unwrap_or(0).max(1);
    let plot_height = HEIGHT - 2 * MARGIN;
    let slot = (WIDTH - 2 * MARGIN) / counts.len() as u32;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}">"#
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="30" text-anchor="middle">{} ({} plays)</text>"#,
        WIDTH / 2,
        escape(topic),
        scores.len()
    );
    for (score, &count) in counts.iter().enumerate() {
        let height = count * plot_height / tallest;
        let x = MARGIN + score as u32 * slot;
        let y = HEIGHT - MARGIN - height;
        let _ = writeln!(
            svg,
            r#"<rect x="{}" y="{y}" width="{}" height="{height}" fill="steelblue"/>"#,
            x + 5,
            slot - 10
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle">{score}</text>"#,
            x + slot / 2,
            HEIGHT - MARGIN + 20
        );
    }
    svg.push_str("</svg>\n");
    svg
}

fn slug(topic: &str) -> String {
    let slug: String = topic
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() { "topic".into() } else { slug }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_counts_each_score() {
        assert_eq!(histogram(&[4, 4, 0, 5, 2]), [1, 0, 1, 0, 2, 1]);
        assert_eq!(histogram(&[]), [0; 6]);
    }

    #[test]
    fn slug_keeps_file_names_safe() {
        assert_eq!(slug("Cat species in Russia"), "cat-species-in-russia");
        assert_eq!(slug("../etc"), "etc");
        assert_eq!(slug("???"), "topic");
    }

    #[test]
    fn plot_writes_svg_with_title_and_bars() {
        let dir = tempfile::tempdir().unwrap();
        let plotter = SvgHistogramPlotter::new(dir.path().join("plots"));

        let path = plotter.plot("Rock & Roll", &[3, 3, 5]).unwrap();

        assert_eq!(path, dir.path().join("plots").join("rock---roll.svg"));
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Rock &amp; Roll (3 plays)"));
        assert_eq!(svg.matches("<rect").count(), 6);
    }
}

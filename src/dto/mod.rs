/// Render frame handed to the presentation layer.
pub mod frame;
/// Text contract of the quiz generator.
pub mod quiz_text;

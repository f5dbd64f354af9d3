//! Prompt Port - Line-Oriented Setup Input
//!
//! The classic variant asks for the track length and each horse's
//! details one line at a time. Use cases depend on this trait so setup
//! can be driven from a terminal or from a script in tests.

/// Question/answer input source.
pub trait Prompt {
  /// Show `question` and read one line of input.
  ///
  /// Returns `Ok(None)` when the input is exhausted.
  fn ask(&mut self, question: &str) -> anyhow::Result<Option<String>>;

  /// Show an informational or error message.
  fn notify(&mut self, message: &str) -> anyhow::Result<()>;
}

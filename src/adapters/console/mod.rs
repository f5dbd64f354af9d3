//! Console Adapters
//!
//! Terminal-facing implementations of the ports: the ASCII track
//! renderer, the line prompt used for classic setup, and the JSON
//! session report writer.

pub mod report;
pub mod stdin_prompt;
pub mod track_renderer;

pub use report::write_session_report;
pub use stdin_prompt::LinePrompt;
pub use track_renderer::AsciiTrackRenderer;

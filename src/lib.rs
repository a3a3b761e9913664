// lib.rs - Library surface: the payload formatting pipeline and the
// headless conversation driver.
pub mod driver;
pub mod format;
pub mod markup;
pub mod models;

// Re-export commonly used items for convenience
pub use driver::{ConversationDriver, DriverState, KeywordBatch};
pub use format::{format_payload, format_text};
pub use markup::render_html;

pub mod prompt;
pub mod progress;
pub mod render;

pub use prompt::{ConfirmPrompt, PromptCredentials, TerminalInput};
pub use progress::{create_spinner, BatchProgressDisplay};

//! TUI widgets for the visual novel

pub mod choices;
pub mod dialogue;
pub mod status_bar;

pub use choices::ChoicesWidget;
pub use dialogue::DialogueWidget;
pub use status_bar::{CommandLineWidget, StatusBarWidget};

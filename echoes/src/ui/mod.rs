//! UI module for the visual novel TUI

pub mod render;
pub mod theme;
pub mod widgets;

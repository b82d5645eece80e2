//! Color theme and styling for the visual novel TUI

use echoes_core::{Emotion, EndingType};
use ratatui::style::{Color, Modifier, Style};

/// Game UI color theme
#[derive(Debug, Clone)]
pub struct GameTheme {
    // Base colors
    pub foreground: Color,
    pub border: Color,
    pub border_focused: Color,
    pub accent: Color,

    // Text colors
    pub narrator_text: Color,
    pub speaker_name: Color,
    pub monologue_text: Color,
    pub system_text: Color,
    pub error_text: Color,

    // Endings
    pub victory: Color,
    pub defeat: Color,
}

impl Default for GameTheme {
    fn default() -> Self {
        Self {
            foreground: Color::White,
            border: Color::DarkGray,
            border_focused: Color::Cyan,
            accent: Color::Magenta,

            narrator_text: Color::Gray,
            speaker_name: Color::LightCyan,
            monologue_text: Color::DarkGray,
            system_text: Color::DarkGray,
            error_text: Color::LightRed,

            victory: Color::LightYellow,
            defeat: Color::Red,
        }
    }
}

impl GameTheme {
    pub fn text_style(&self) -> Style {
        Style::default().fg(self.foreground)
    }

    /// Narration lines (speaker is the narrator)
    pub fn narrator_style(&self) -> Style {
        Style::default()
            .fg(self.narrator_text)
            .add_modifier(Modifier::ITALIC)
    }

    pub fn speaker_style(&self) -> Style {
        Style::default()
            .fg(self.speaker_name)
            .add_modifier(Modifier::BOLD)
    }

    /// Inner thoughts shown under a line
    pub fn monologue_style(&self) -> Style {
        Style::default()
            .fg(self.monologue_text)
            .add_modifier(Modifier::ITALIC)
    }

    pub fn system_style(&self) -> Style {
        Style::default()
            .fg(self.system_text)
            .add_modifier(Modifier::DIM)
    }

    pub fn error_style(&self) -> Style {
        Style::default()
            .fg(self.error_text)
            .add_modifier(Modifier::BOLD)
    }

    /// Tint for a speaker's emotion tag
    pub fn emotion_color(&self, emotion: Emotion) -> Color {
        match emotion {
            Emotion::Neutral => self.system_text,
            Emotion::Happy => Color::LightGreen,
            Emotion::Angry => Color::LightRed,
            Emotion::Sad => Color::LightBlue,
            Emotion::Surprised => Color::LightYellow,
            Emotion::Determined => Color::Cyan,
            Emotion::Fear => Color::Magenta,
        }
    }

    pub fn ending_style(&self, ending: Option<EndingType>) -> Style {
        let color = match ending {
            Some(e) if e.is_defeat() => self.defeat,
            _ => self.victory,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }

    /// Highlighted entry in a list
    pub fn selected_style(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD | Modifier::REVERSED)
    }

    pub fn border_style(&self, focused: bool) -> Style {
        Style::default().fg(if focused {
            self.border_focused
        } else {
            self.border
        })
    }

    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }
}

//! Status bar and command line widgets

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use echoes_core::GameStatus;

use crate::app::InputMode;
use crate::ui::theme::GameTheme;

/// One-line summary of where the story stands
pub struct StatusBarWidget<'a> {
    status: GameStatus,
    turn: usize,
    protagonist: Option<&'a str>,
    image: Option<&'a str>,
    message: Option<&'a str>,
    theme: &'a GameTheme,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(status: GameStatus, turn: usize, theme: &'a GameTheme) -> Self {
        Self {
            status,
            turn,
            protagonist: None,
            image: None,
            message: None,
            theme,
        }
    }

    pub fn protagonist(mut self, name: Option<&'a str>) -> Self {
        self.protagonist = name;
        self
    }

    /// Source of the current scene image, if one was generated.
    pub fn image(mut self, image: Option<&'a str>) -> Self {
        self.image = image;
        self
    }

    pub fn message(mut self, message: Option<&'a str>) -> Self {
        self.message = message;
        self
    }

    fn status_label(&self) -> &'static str {
        match self.status {
            GameStatus::Menu => "MENU",
            GameStatus::Playing => "PLAYING",
            GameStatus::GameOver => "GAME OVER",
            GameStatus::Victory => "VICTORY",
        }
    }
}

impl Widget for StatusBarWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut spans = vec![Span::styled(
            format!(" {} ", self.status_label()),
            self.theme.title_style().add_modifier(Modifier::REVERSED),
        )];

        if let Some(name) = self.protagonist {
            spans.push(Span::raw(format!(" {name} ")));
        }
        if self.status != GameStatus::Menu {
            spans.push(Span::styled(
                format!("| Turn {} ", self.turn),
                self.theme.system_style(),
            ));
            let image = match self.image {
                Some(src) if src.starts_with("data:") => "| 🖼 inline ".to_string(),
                Some(src) => format!("| 🖼 {} ", truncate(src, 40)),
                None => "| no image ".to_string(),
            };
            spans.push(Span::styled(image, self.theme.system_style()));
        }
        if let Some(message) = self.message {
            spans.push(Span::styled(
                format!("| {message}"),
                Style::default().fg(self.theme.foreground),
            ));
        }

        Paragraph::new(Line::from(spans)).render(area, buf);
    }
}

/// The `:` command line, or a key hint when not in command mode
pub struct CommandLineWidget<'a> {
    content: &'a str,
    cursor_position: usize,
    mode: InputMode,
    hint: &'a str,
    theme: &'a GameTheme,
}

impl<'a> CommandLineWidget<'a> {
    pub fn new(content: &'a str, mode: InputMode, theme: &'a GameTheme) -> Self {
        Self {
            content,
            cursor_position: content.chars().count(),
            mode,
            hint: "",
            theme,
        }
    }

    pub fn cursor_position(mut self, pos: usize) -> Self {
        self.cursor_position = pos;
        self
    }

    pub fn hint(mut self, hint: &'a str) -> Self {
        self.hint = hint;
        self
    }
}

impl Widget for CommandLineWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let line = match self.mode {
            InputMode::Normal => Line::from(Span::styled(self.hint, self.theme.system_style())),
            InputMode::Command => {
                // Character-based slicing for unicode safety
                let before: String = self.content.chars().take(self.cursor_position).collect();
                let at = self
                    .content
                    .chars()
                    .nth(self.cursor_position)
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| " ".to_string());
                let after: String = self.content.chars().skip(self.cursor_position + 1).collect();

                Line::from(vec![
                    Span::raw(before),
                    Span::styled(
                        at,
                        Style::default().add_modifier(Modifier::UNDERLINED | Modifier::BOLD),
                    ),
                    Span::raw(after),
                ])
            }
        };
        Paragraph::new(line).render(area, buf);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{head}…")
    }
}

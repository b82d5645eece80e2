//! Dialogue display widget with typewriter reveal

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use echoes_core::prelude::NARRATOR;
use echoes_core::DialogueLine;

use crate::ui::theme::GameTheme;

/// Widget for the lines of the current segment
pub struct DialogueWidget<'a> {
    finished: &'a [DialogueLine],
    typing: Option<(&'a DialogueLine, &'a str)>,
    theme: &'a GameTheme,
    title: String,
    cursor_visible: bool,
}

impl<'a> DialogueWidget<'a> {
    pub fn new(finished: &'a [DialogueLine], theme: &'a GameTheme) -> Self {
        Self {
            finished,
            typing: None,
            theme,
            title: String::new(),
            cursor_visible: false,
        }
    }

    /// The line being typed and the part of it shown so far.
    pub fn typing(mut self, line: Option<(&'a DialogueLine, &'a str)>) -> Self {
        self.typing = line;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn cursor(mut self, visible: bool) -> Self {
        self.cursor_visible = visible;
        self
    }

    fn is_narration(line: &DialogueLine) -> bool {
        line.speaker == NARRATOR || line.speaker.eq_ignore_ascii_case("narrator")
    }

    fn push_line(&self, lines: &mut Vec<Line<'a>>, line: &DialogueLine, text: &str, full: bool) {
        let text_style = if Self::is_narration(line) {
            self.theme.narrator_style()
        } else {
            self.theme.text_style()
        };

        let mut spans = Vec::new();
        if !Self::is_narration(line) {
            spans.push(Span::styled(line.speaker.clone(), self.theme.speaker_style()));
            spans.push(Span::styled(
                format!(" [{}] ", line.emotion.as_str()),
                Style::default().fg(self.theme.emotion_color(line.emotion)),
            ));
        }
        spans.push(Span::styled(text.to_string(), text_style));
        if !full && self.cursor_visible {
            spans.push(Span::styled("▌", self.theme.system_style()));
        }
        lines.push(Line::from(spans));

        if full {
            if let Some(ref monologue) = line.monologue {
                lines.push(Line::from(Span::styled(
                    format!("  （{monologue}）"),
                    self.theme.monologue_style(),
                )));
            }
        }
        lines.push(Line::from(""));
    }
}

impl Widget for DialogueWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(self.title.clone())
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(true));

        let inner = block.inner(area);
        block.render(area, buf);

        let mut lines: Vec<Line> = Vec::new();
        for line in self.finished {
            self.push_line(&mut lines, line, &line.text, true);
        }
        if let Some((line, shown)) = self.typing {
            let full = shown.chars().count() >= line.text.chars().count();
            self.push_line(&mut lines, line, shown, full);
        }

        // Keep the newest line in view; wrapped lines count once, so this
        // can under-scroll on very narrow terminals.
        let visible_height = inner.height as usize;
        let scroll = lines.len().saturating_sub(visible_height);

        Paragraph::new(lines)
            .scroll((scroll as u16, 0))
            .wrap(Wrap { trim: false })
            .render(inner, buf);
    }
}

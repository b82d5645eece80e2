//! Choice list widget

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use echoes_core::{Choice, ChoiceKind};

use crate::ui::theme::GameTheme;

/// Numbered list of the choices on offer
pub struct ChoicesWidget<'a> {
    choices: &'a [Choice],
    selected: usize,
    theme: &'a GameTheme,
    placeholder: &'a str,
}

impl<'a> ChoicesWidget<'a> {
    pub fn new(choices: &'a [Choice], theme: &'a GameTheme) -> Self {
        Self {
            choices,
            selected: 0,
            theme,
            placeholder: "",
        }
    }

    pub fn selected(mut self, selected: usize) -> Self {
        self.selected = selected;
        self
    }

    /// Text shown when there is nothing to choose.
    pub fn placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = placeholder;
        self
    }

    fn kind_marker(kind: ChoiceKind) -> &'static str {
        match kind {
            ChoiceKind::Action => "⚔",
            ChoiceKind::Dialogue => "💬",
            ChoiceKind::Deduction => "🔍",
            ChoiceKind::Continue => "→",
        }
    }
}

impl Widget for ChoicesWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let focused = !self.choices.is_empty();
        let block = Block::default()
            .title(" Choices ")
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(focused));

        let inner = block.inner(area);
        block.render(area, buf);

        let lines: Vec<Line> = if self.choices.is_empty() {
            vec![Line::from(Span::styled(
                self.placeholder,
                self.theme.system_style(),
            ))]
        } else {
            self.choices
                .iter()
                .enumerate()
                .map(|(i, choice)| {
                    let text = format!(
                        " {}. {} {} ",
                        i + 1,
                        Self::kind_marker(choice.kind),
                        choice.text
                    );
                    let style = if i == self.selected {
                        self.theme.selected_style()
                    } else {
                        self.theme.text_style()
                    };
                    Line::from(Span::styled(text, style))
                })
                .collect()
        };

        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .render(inner, buf);
    }
}

//! Render orchestration for the visual novel TUI

use ratatui::{
    layout::{Constraint, Direction, Flex, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use echoes_core::GameStatus;

use crate::app::{App, InputMode, MenuItem, Overlay};
use crate::ui::widgets::{ChoicesWidget, CommandLineWidget, DialogueWidget, StatusBarWidget};

const GAME_TITLE: &str = " 回响：反乌托邦 · Echoes of Dystopia ";

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    match app.status() {
        GameStatus::Menu => render_menu(frame, app, area),
        _ => render_story(frame, app, area),
    }

    if let Some(overlay) = app.overlay() {
        render_overlay(frame, app, overlay, area);
    }
}

/// A rectangle of fixed size centered in `area`
fn centered_rect_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height.min(area.height))])
        .flex(Flex::Center)
        .areas(area);
    let [rect] = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .areas(row);
    rect
}

/// Render the title screen
fn render_menu(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(1), // status bar
            Constraint::Length(1), // command line
        ])
        .split(area);

    let box_area = centered_rect_fixed(48, 12, chunks[0]);
    frame.render_widget(Clear, box_area);

    let mut lines = vec![
        Line::from(Span::styled(GAME_TITLE, app.theme.title_style())),
        Line::from(Span::styled(
            "  在霓虹与废墟之间，守护你唯一的家人。",
            app.theme.narrator_style(),
        )),
        Line::from(""),
    ];
    for (i, item) in MenuItem::ALL.iter().enumerate() {
        let disabled = *item == MenuItem::Continue && !app.has_autosave;
        let style = if i == app.menu_index {
            app.theme.selected_style()
        } else if disabled {
            app.theme.system_style()
        } else {
            app.theme.text_style()
        };
        lines.push(Line::from(Span::styled(
            format!("  {}. {}  ", i + 1, item.label()),
            style,
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), box_area);

    render_status_bar(frame, app, chunks[1]);
    render_command_line(frame, app, chunks[2], "j/k move · Enter select · ? help · q quit");
}

/// Render the reading screen, including endings
fn render_story(frame: &mut Frame, app: &App, area: Rect) {
    let error = app.session.error();
    let choices = app.visible_choices();
    let ending = app.status().is_terminal() && app.all_lines_shown();

    let bottom_height = if ending {
        5
    } else {
        (choices.len() as u16 + 2).clamp(3, 9)
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),                                     // title
            Constraint::Length(5),                                     // scene
            Constraint::Length(if error.is_some() { 3 } else { 0 }),   // error banner
            Constraint::Min(6),                                        // dialogue
            Constraint::Length(bottom_height),                         // choices / ending
            Constraint::Length(1),                                     // status bar
            Constraint::Length(1),                                     // command line
        ])
        .split(area);

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(GAME_TITLE, app.theme.title_style()))),
        chunks[0],
    );

    render_scene(frame, app, chunks[1]);

    if let Some(message) = error {
        let banner = Paragraph::new(Line::from(vec![
            Span::styled(format!(" ⚠ {message} "), app.theme.error_style()),
            Span::styled("(Esc to dismiss)", app.theme.system_style()),
        ]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.theme.error_style()),
        );
        frame.render_widget(banner, chunks[2]);
    }

    let typing = app.typing_line();
    let dialogue = DialogueWidget::new(app.finished_lines(), &app.theme)
        .typing(typing.as_ref().map(|(line, shown)| (*line, shown.as_str())))
        .title(segment_title(app))
        .cursor(app.animation_frame % 10 < 5);
    frame.render_widget(dialogue, chunks[3]);

    if ending {
        render_ending(frame, app, chunks[4]);
    } else {
        let placeholder = if app.is_busy() {
            "…"
        } else {
            "Enter / Space to continue reading"
        };
        let widget = ChoicesWidget::new(choices, &app.theme)
            .selected(app.selected_choice)
            .placeholder(placeholder);
        frame.render_widget(widget, chunks[4]);
    }

    render_status_bar(frame, app, chunks[5]);
    let hint = if ending {
        "Enter return to menu · :w export · q quit"
    } else {
        "Enter continue · s skip · 1-9 choose · :w export · ? help"
    };
    render_command_line(frame, app, chunks[6], hint);
}

fn segment_title(app: &App) -> String {
    match app.session.protagonist() {
        Some(p) => format!(" {} ", p.display_name()),
        None => " Story ".to_string(),
    }
}

/// Render the scene description box
fn render_scene(frame: &mut Frame, app: &App, area: Rect) {
    let description = app
        .segment()
        .map(|s| s.visual_description.as_str())
        .unwrap_or("");

    let block = Block::default()
        .title(" Scene ")
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(false));

    let paragraph = Paragraph::new(Span::styled(
        description,
        app.theme.narrator_style().add_modifier(Modifier::DIM),
    ))
    .block(block)
    .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

/// Render the ending banner
fn render_ending(frame: &mut Frame, app: &App, area: Rect) {
    let ending_type = app.segment().and_then(|s| s.ending_type);
    let title = match ending_type {
        Some(e) => e.title(),
        None if app.status() == GameStatus::GameOver => "GAME OVER",
        None => "THE END",
    };
    let style = app.theme.ending_style(ending_type);

    let lines = vec![
        Line::from(Span::styled(format!("  {title}  "), style)),
        Line::from(""),
        Line::from(Span::styled(
            "  Press Enter to return to the main menu",
            app.theme.system_style(),
        )),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(style);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Render the status bar
fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let protagonist = app.session.protagonist().map(|p| p.speaker_name());
    let widget = StatusBarWidget::new(app.status(), app.session.history().len(), &app.theme)
        .protagonist(protagonist)
        .image(app.session.current_image())
        .message(app.status_message());
    frame.render_widget(widget, area);
}

/// Render the command line
fn render_command_line(frame: &mut Frame, app: &App, area: Rect, hint: &str) {
    let widget = CommandLineWidget::new(app.input_buffer(), app.input_mode, &app.theme)
        .cursor_position(app.cursor_position())
        .hint(hint);
    frame.render_widget(widget, area);
}

/// Render overlay
fn render_overlay(frame: &mut Frame, app: &App, overlay: Overlay, area: Rect) {
    match overlay {
        Overlay::Help => render_help_overlay(frame, app, area),
    }
}

/// Render help overlay
fn render_help_overlay(frame: &mut Frame, app: &App, area: Rect) {
    let popup_area = centered_rect_fixed(60, 24, area);
    frame.render_widget(Clear, popup_area);

    let heading = Style::default().add_modifier(Modifier::UNDERLINED);
    let help_text = vec![
        Line::from(Span::styled(
            " Echoes of Dystopia - Help ",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled("Reading:", heading)),
        Line::from("  Enter/Space   Finish line, next line, or pick choice"),
        Line::from("  s / Tab       Show every line at once"),
        Line::from("  j/k or ↑/↓    Move between choices"),
        Line::from("  1-9           Pick a choice directly"),
        Line::from("  Esc           Dismiss the error banner"),
        Line::from(""),
        Line::from(Span::styled("Commands:", heading)),
        Line::from("  :w [dir]                 Export a save file"),
        Line::from("  :load <file.json>        Load a save file"),
        Line::from("  :script <file> [male|female]  Play a script"),
        Line::from("  :config name=value ...   key, base, image,"),
        Line::from("                           text_model, image_model"),
        Line::from("  :config                  Show current settings"),
        Line::from("  :menu                    Back to the title screen"),
        Line::from("  :q                       Quit"),
        Line::from(""),
        Line::from(Span::styled(
            "Press Esc or q to close",
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(true));

    let paragraph = Paragraph::new(help_text)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, popup_area);
}

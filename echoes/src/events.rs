//! Event handling for the visual novel TUI

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use echoes_core::GameStatus;

use crate::app::{App, InputMode, MenuItem};

/// Result of handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    Continue,
    Quit,
    NeedsRedraw,
}

/// Handle a terminal event
pub fn handle_event(app: &mut App, event: Event) -> EventResult {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => handle_key_event(app, key),
        Event::Resize(_, _) => EventResult::NeedsRedraw,
        _ => EventResult::Continue,
    }
}

/// Handle a key event
fn handle_key_event(app: &mut App, key: KeyEvent) -> EventResult {
    if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (key.code, key.modifiers) {
        return EventResult::Quit;
    }

    if app.overlay().is_some() {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?')) {
            app.close_overlay();
        }
        return EventResult::NeedsRedraw;
    }

    let result = match app.input_mode {
        InputMode::Command => handle_command_mode(app, key),
        InputMode::Normal => match app.status() {
            GameStatus::Menu => handle_menu_keys(app, key),
            _ => handle_story_keys(app, key),
        },
    };

    if app.should_quit {
        EventResult::Quit
    } else {
        result
    }
}

/// Keys shared by every normal-mode screen. Returns `None` if unhandled.
fn handle_global_keys(app: &mut App, key: KeyEvent) -> Option<EventResult> {
    match key.code {
        KeyCode::Char(':') => {
            app.enter_command_mode();
            Some(EventResult::NeedsRedraw)
        }
        KeyCode::Char('?') | KeyCode::F(1) => {
            app.toggle_help();
            Some(EventResult::NeedsRedraw)
        }
        KeyCode::Char('q') => Some(EventResult::Quit),
        _ => None,
    }
}

/// Handle keys on the title screen
fn handle_menu_keys(app: &mut App, key: KeyEvent) -> EventResult {
    if let Some(result) = handle_global_keys(app, key) {
        return result;
    }
    match key.code {
        KeyCode::Char('k') | KeyCode::Up => app.menu_up(),
        KeyCode::Char('j') | KeyCode::Down => app.menu_down(),
        KeyCode::Enter | KeyCode::Char(' ') => {
            let item = app.selected_menu_item();
            app.activate_menu_item(item);
        }
        KeyCode::Char(c @ '1'..='9') => {
            let index = c as usize - '1' as usize;
            if let Some(item) = MenuItem::ALL.get(index).copied() {
                app.menu_index = index;
                app.activate_menu_item(item);
            }
        }
        KeyCode::Char('c') => app.activate_menu_item(MenuItem::Continue),
        KeyCode::Esc => app.clear_status(),
        _ => return EventResult::Continue,
    }
    EventResult::NeedsRedraw
}

/// Handle keys while reading a segment or looking at an ending
fn handle_story_keys(app: &mut App, key: KeyEvent) -> EventResult {
    if let Some(result) = handle_global_keys(app, key) {
        return result;
    }
    // Input is blocked while a turn resolves.
    if app.is_busy() {
        return EventResult::Continue;
    }
    match key.code {
        KeyCode::Enter | KeyCode::Char(' ') => app.confirm(),
        KeyCode::Char('s') | KeyCode::Tab => app.skip_text(),
        KeyCode::Char('k') | KeyCode::Up => app.choice_up(),
        KeyCode::Char('j') | KeyCode::Down => app.choice_down(),
        KeyCode::Char(c @ '1'..='9') if app.all_lines_shown() => {
            app.pick_choice(c as usize - '0' as usize);
        }
        KeyCode::Esc => {
            if app.session.error().is_some() {
                app.session.dismiss_error();
            } else {
                app.clear_status();
            }
        }
        _ => return EventResult::Continue,
    }
    EventResult::NeedsRedraw
}

/// Handle keys in COMMAND mode (: commands)
fn handle_command_mode(app: &mut App, key: KeyEvent) -> EventResult {
    match key.code {
        KeyCode::Esc => app.enter_normal_mode(),
        KeyCode::Enter => {
            let command = app.submit_command();
            if command.len() > 1 {
                app.process_command(&command);
            }
        }
        KeyCode::Left => {
            if app.cursor_position() > 1 {
                app.cursor_left();
            }
        }
        KeyCode::Right => app.cursor_right(),
        KeyCode::Backspace => {
            if app.cursor_position() > 1 {
                app.backspace();
            } else {
                // Backspace on just ":" exits command mode
                app.enter_normal_mode();
            }
        }
        KeyCode::Char(c) => app.type_char(c),
        _ => return EventResult::Continue,
    }
    EventResult::NeedsRedraw
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::PendingAction;
    use echoes_core::testing::TestHarness;
    use echoes_core::Protagonist;

    fn press(app: &mut App, code: KeyCode) -> EventResult {
        handle_event(app, Event::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    fn type_command(app: &mut App, command: &str) {
        press(app, KeyCode::Char(':'));
        for c in command.chars() {
            press(app, KeyCode::Char(c));
        }
        press(app, KeyCode::Enter);
    }

    #[tokio::test]
    async fn test_menu_enter_queues_new_game() {
        let harness = TestHarness::new();
        let mut app = App::new(harness.session, "exports");

        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        assert_eq!(
            app.take_pending(),
            Some(PendingAction::Start(Protagonist::Female))
        );
    }

    #[tokio::test]
    async fn test_command_mode_round_trip() {
        let harness = TestHarness::new();
        let mut app = App::new(harness.session, "exports");

        type_command(&mut app, "q");
        assert!(app.should_quit);
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.input_buffer().is_empty());
    }

    #[tokio::test]
    async fn test_backspace_on_colon_leaves_command_mode() {
        let harness = TestHarness::new();
        let mut app = App::new(harness.session, "exports");

        press(&mut app, KeyCode::Char(':'));
        assert_eq!(app.input_mode, InputMode::Command);
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[tokio::test]
    async fn test_number_keys_wait_for_text() {
        let mut harness = TestHarness::new();
        harness.session.start_game(Protagonist::Male).await.unwrap();
        let mut app = App::new(harness.session, "exports");

        press(&mut app, KeyCode::Char('1'));
        assert!(app.take_pending().is_none());

        press(&mut app, KeyCode::Char('s'));
        press(&mut app, KeyCode::Char('1'));
        assert!(matches!(app.take_pending(), Some(PendingAction::Choose(_))));
    }
}

//! Main application state and logic

use std::path::PathBuf;

use echoes_core::{
    ApiConfig, Choice, DialogueLine, GameSession, GameStatus, Protagonist, StorySegment,
};

use crate::ui::theme::GameTheme;

/// Characters revealed per animation tick (~100ms).
const REVEAL_PER_TICK: usize = 2;

/// Vim-style input modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Normal mode - reading and choosing (default)
    #[default]
    Normal,
    /// Command mode - entering : commands
    Command,
}

/// Entries on the title screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    NewGame(Protagonist),
    Continue,
    Quit,
}

impl MenuItem {
    pub const ALL: [MenuItem; 4] = [
        MenuItem::NewGame(Protagonist::Male),
        MenuItem::NewGame(Protagonist::Female),
        MenuItem::Continue,
        MenuItem::Quit,
    ];

    pub fn label(&self) -> String {
        match self {
            MenuItem::NewGame(p) => format!("新的故事：{}（{}）", p.speaker_name(), p.display_name()),
            MenuItem::Continue => "继续游戏".to_string(),
            MenuItem::Quit => "退出".to_string(),
        }
    }
}

/// Overlay types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    Help,
}

/// Work that needs the async session, run by the main loop between frames.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingAction {
    Start(Protagonist),
    Choose(String),
    Continue,
    Export(PathBuf),
    LoadSave(PathBuf),
    LoadScript(Protagonist, PathBuf),
    UpdateConfig(ApiConfig),
}

impl PendingAction {
    /// Status shown while the action runs.
    pub fn progress_label(&self) -> &'static str {
        match self {
            PendingAction::Start(_) => "Starting...",
            PendingAction::Choose(_) => "The story unfolds...",
            PendingAction::Continue => "Loading autosave...",
            PendingAction::Export(_) => "Saving...",
            PendingAction::LoadSave(_) => "Loading...",
            PendingAction::LoadScript(_, _) => "Loading script...",
            PendingAction::UpdateConfig(_) => "Saving settings...",
        }
    }
}

/// Typewriter progress through the current segment's lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reveal {
    /// Index of the line being typed.
    pub line: usize,
    /// Characters of that line shown so far.
    pub chars: usize,
}

/// Main application state
pub struct App {
    pub session: GameSession,
    pub theme: GameTheme,
    /// Directory `:w` writes exports to when none is given.
    pub export_dir: PathBuf,

    // Title screen
    pub menu_index: usize,
    pub has_autosave: bool,

    // Reading
    reveal: Reveal,
    pub selected_choice: usize,

    // Input state
    pub input_mode: InputMode,
    input_buffer: String,
    cursor_position: usize,

    // Status
    status_message: Option<String>,
    overlay: Option<Overlay>,
    pending: Option<PendingAction>,
    pub should_quit: bool,

    // Animation
    pub animation_frame: u8,
}

impl App {
    pub fn new(session: GameSession, export_dir: impl Into<PathBuf>) -> Self {
        Self {
            session,
            theme: GameTheme::default(),
            export_dir: export_dir.into(),
            menu_index: 0,
            has_autosave: false,
            reveal: Reveal::default(),
            selected_choice: 0,
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            cursor_position: 0,
            status_message: None,
            overlay: None,
            pending: None,
            should_quit: false,
            animation_frame: 0,
        }
    }

    pub fn status(&self) -> GameStatus {
        self.session.status()
    }

    // =========================================================================
    // Pending work
    // =========================================================================

    /// Queue an action for the main loop. Ignored while one is already queued.
    pub fn queue(&mut self, action: PendingAction) {
        if self.pending.is_some() || self.session.is_loading() {
            self.set_status("Please wait...");
            return;
        }
        self.set_status(action.progress_label());
        self.pending = Some(action);
    }

    pub fn take_pending(&mut self) -> Option<PendingAction> {
        self.pending.take()
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some() || self.session.is_loading()
    }

    /// Run an action against the session and report the outcome.
    pub async fn perform(&mut self, action: PendingAction) {
        let outcome = match action {
            PendingAction::Start(protagonist) => self
                .session
                .start_game(protagonist)
                .await
                .map(|()| None),
            PendingAction::Choose(id) => self.session.choose(&id).await.map(|_| None),
            PendingAction::Continue => self.session.continue_game().await.map(|()| None),
            PendingAction::Export(dir) => self
                .session
                .export_save(&dir)
                .await
                .map(|path| Some(format!("Saved to {}", path.display()))),
            PendingAction::LoadSave(path) => self
                .session
                .import_save_file(&path)
                .await
                .map(|()| Some(format!("Loaded {}", path.display()))),
            PendingAction::LoadScript(protagonist, path) => self
                .session
                .import_script_file(protagonist, &path)
                .await
                .map(|()| Some(format!("Playing script {}", path.display()))),
            PendingAction::UpdateConfig(config) => self
                .session
                .update_config(config)
                .await
                .map(|()| Some("Settings saved".to_string())),
        };

        match outcome {
            Ok(message) => {
                self.clear_status();
                if let Some(message) = message {
                    self.set_status(message);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Action failed");
                if self.session.error().is_some() {
                    self.clear_status();
                } else {
                    self.set_status(e.user_message());
                }
            }
        }

        self.reset_reveal();
        self.refresh_autosave_flag().await;
    }

    pub async fn refresh_autosave_flag(&mut self) {
        self.has_autosave = self.session.has_autosave().await;
    }

    // =========================================================================
    // Title screen
    // =========================================================================

    pub fn menu_up(&mut self) {
        self.menu_index = self.menu_index.saturating_sub(1);
    }

    pub fn menu_down(&mut self) {
        self.menu_index = (self.menu_index + 1).min(MenuItem::ALL.len() - 1);
    }

    pub fn selected_menu_item(&self) -> MenuItem {
        MenuItem::ALL[self.menu_index.min(MenuItem::ALL.len() - 1)]
    }

    pub fn activate_menu_item(&mut self, item: MenuItem) {
        match item {
            MenuItem::NewGame(protagonist) => self.queue(PendingAction::Start(protagonist)),
            MenuItem::Continue if self.has_autosave => self.queue(PendingAction::Continue),
            MenuItem::Continue => self.set_status("No autosave yet"),
            MenuItem::Quit => self.should_quit = true,
        }
    }

    // =========================================================================
    // Reading
    // =========================================================================

    pub fn segment(&self) -> Option<&StorySegment> {
        self.session.current_segment()
    }

    pub fn reveal(&self) -> Reveal {
        self.reveal
    }

    /// Start typing the current segment from its first line.
    pub fn reset_reveal(&mut self) {
        self.reveal = Reveal::default();
        self.selected_choice = 0;
    }

    fn lines(&self) -> &[DialogueLine] {
        self.segment().map(|s| s.lines.as_slice()).unwrap_or(&[])
    }

    /// Lines fully shown before the one being typed.
    pub fn finished_lines(&self) -> &[DialogueLine] {
        let lines = self.lines();
        &lines[..self.reveal.line.min(lines.len())]
    }

    /// The line being typed and the part of it shown so far.
    pub fn typing_line(&self) -> Option<(&DialogueLine, String)> {
        let line = self.lines().get(self.reveal.line)?;
        Some((line, line.text.chars().take(self.reveal.chars).collect()))
    }

    fn line_complete(&self) -> bool {
        self.lines()
            .get(self.reveal.line)
            .map(|l| self.reveal.chars >= l.text.chars().count())
            .unwrap_or(true)
    }

    /// Every line of the segment is fully on screen.
    pub fn all_lines_shown(&self) -> bool {
        let count = self.lines().len();
        count == 0 || (self.reveal.line + 1 >= count && self.line_complete())
    }

    /// Choices are offered once the last line has been read.
    pub fn visible_choices(&self) -> &[Choice] {
        match self.segment() {
            Some(segment) if self.all_lines_shown() => &segment.choices,
            _ => &[],
        }
    }

    /// Finish the typing line, or move to the next one.
    pub fn advance_text(&mut self) {
        if !self.line_complete() {
            if let Some(line) = self.lines().get(self.reveal.line) {
                self.reveal.chars = line.text.chars().count();
            }
        } else if self.reveal.line + 1 < self.lines().len() {
            self.reveal.line += 1;
            self.reveal.chars = 0;
        }
    }

    /// Reveal everything at once.
    pub fn skip_text(&mut self) {
        let lines = self.lines();
        if let Some(last) = lines.last() {
            self.reveal = Reveal {
                line: lines.len() - 1,
                chars: last.text.chars().count(),
            };
        }
    }

    pub fn choice_up(&mut self) {
        self.selected_choice = self.selected_choice.saturating_sub(1);
    }

    pub fn choice_down(&mut self) {
        let count = self.visible_choices().len();
        if count > 0 {
            self.selected_choice = (self.selected_choice + 1).min(count - 1);
        }
    }

    /// Enter/Space while reading: type, advance, choose, or leave an ending.
    pub fn confirm(&mut self) {
        if self.session.error().is_some() {
            self.session.dismiss_error();
            return;
        }
        if !self.all_lines_shown() {
            self.advance_text();
            return;
        }
        if self.status().is_terminal() {
            self.session.main_menu();
            self.reset_reveal();
            return;
        }
        self.pick_choice(self.selected_choice + 1);
    }

    /// Choose by 1-based position.
    pub fn pick_choice(&mut self, position: usize) {
        let id = position
            .checked_sub(1)
            .and_then(|i| self.visible_choices().get(i))
            .map(|c| c.id.clone());
        match id {
            Some(id) => {
                if self.session.error().is_some() {
                    self.session.dismiss_error();
                }
                self.queue(PendingAction::Choose(id));
            }
            None => self.set_status(format!("No choice {position}")),
        }
    }

    /// Tick for animations
    pub fn tick(&mut self) {
        self.animation_frame = self.animation_frame.wrapping_add(1);
        if self.status() == GameStatus::Menu || self.line_complete() {
            return;
        }
        self.reveal.chars += REVEAL_PER_TICK;
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Process a colon command, queueing async work where needed.
    pub fn process_command(&mut self, command: &str) {
        let cmd = command.trim_start_matches(':');
        let parts: Vec<&str> = cmd.split_whitespace().collect();

        let Some(&name) = parts.first() else {
            return;
        };

        match name {
            "q" | "quit" | "exit" => self.should_quit = true,
            "w" | "save" | "export" => {
                let dir = parts
                    .get(1)
                    .map(PathBuf::from)
                    .unwrap_or_else(|| self.export_dir.clone());
                self.queue(PendingAction::Export(dir));
            }
            "load" => match parts.get(1) {
                Some(path) => self.queue(PendingAction::LoadSave(PathBuf::from(path))),
                None => self.set_status("Usage: :load <file.json>"),
            },
            "script" => {
                let protagonist = parts
                    .get(2)
                    .and_then(|p| Protagonist::parse(p))
                    .or_else(|| self.session.protagonist())
                    .unwrap_or(Protagonist::Male);
                match parts.get(1) {
                    Some(path) => {
                        self.queue(PendingAction::LoadScript(protagonist, PathBuf::from(path)))
                    }
                    None => self.set_status("Usage: :script <file.json> [male|female]"),
                }
            }
            "config" | "set" => {
                if parts.len() < 2 {
                    self.set_status(describe_config(self.session.api_config()));
                    return;
                }
                let mut config = self.session.api_config().clone();
                for assignment in &parts[1..] {
                    match apply_setting(config, assignment) {
                        Ok(updated) => config = updated,
                        Err(message) => {
                            self.set_status(message);
                            return;
                        }
                    }
                }
                self.queue(PendingAction::UpdateConfig(config));
            }
            "menu" => {
                self.session.main_menu();
                self.reset_reveal();
            }
            "help" | "h" => self.toggle_help(),
            other => self.set_status(format!("Unknown command: {other}")),
        }
    }

    // =========================================================================
    // Command line editing
    // =========================================================================

    /// Enter command mode (starts with :)
    pub fn enter_command_mode(&mut self) {
        self.input_mode = InputMode::Command;
        self.input_buffer.clear();
        self.input_buffer.push(':');
        self.cursor_position = 1;
    }

    /// Exit to normal mode
    pub fn enter_normal_mode(&mut self) {
        self.input_mode = InputMode::Normal;
        self.clear_input();
    }

    /// Handle a typed character (unicode-safe)
    pub fn type_char(&mut self, c: char) {
        let byte_pos = self
            .input_buffer
            .char_indices()
            .nth(self.cursor_position)
            .map(|(i, _)| i)
            .unwrap_or(self.input_buffer.len());
        self.input_buffer.insert(byte_pos, c);
        self.cursor_position += 1;
    }

    /// Handle backspace (unicode-safe)
    pub fn backspace(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
            if let Some((byte_pos, ch)) = self.input_buffer.char_indices().nth(self.cursor_position)
            {
                self.input_buffer
                    .replace_range(byte_pos..byte_pos + ch.len_utf8(), "");
            }
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.input_buffer.chars().count();
        self.cursor_position = (self.cursor_position + 1).min(char_count);
    }

    /// Take the command line and return to normal mode.
    pub fn submit_command(&mut self) -> String {
        let command = std::mem::take(&mut self.input_buffer);
        self.enter_normal_mode();
        command
    }

    pub fn clear_input(&mut self) {
        self.input_buffer.clear();
        self.cursor_position = 0;
    }

    pub fn input_buffer(&self) -> &str {
        &self.input_buffer
    }

    pub fn cursor_position(&self) -> usize {
        self.cursor_position
    }

    // =========================================================================
    // Status and overlays
    // =========================================================================

    /// Set status message (always overwrites)
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn toggle_help(&mut self) {
        if self.overlay == Some(Overlay::Help) {
            self.overlay = None;
        } else {
            self.overlay = Some(Overlay::Help);
        }
    }

    pub fn overlay(&self) -> Option<Overlay> {
        self.overlay
    }

    pub fn close_overlay(&mut self) {
        self.overlay = None;
    }
}

/// Apply one `name=value` setting. An empty value clears the override.
pub fn apply_setting(config: ApiConfig, assignment: &str) -> Result<ApiConfig, String> {
    let Some((name, value)) = assignment.split_once('=') else {
        return Err(format!("Expected name=value, got '{assignment}'"));
    };
    let value = value.trim();
    let value = (!value.is_empty()).then(|| value.to_string());

    let mut config = config;
    match name.trim() {
        "key" | "api_key" => config.api_key = value,
        "base" | "base_url" => config.base_url = value,
        "image" | "image_base_url" => config.image_base_url = value,
        "text_model" | "text-model" => config.text_model = value,
        "image_model" | "image-model" => config.image_model = value,
        other => return Err(format!("Unknown setting: {other}")),
    }
    Ok(config)
}

/// One-line summary of the current overrides. The key itself is never shown.
pub fn describe_config(config: &ApiConfig) -> String {
    let or_default = |v: &Option<String>| v.clone().unwrap_or_else(|| "default".to_string());
    format!(
        "key: {} | base: {} | image: {} | text model: {} | image model: {}",
        if config.has_api_key() { "set" } else { "missing" },
        or_default(&config.base_url),
        or_default(&config.image_base_url),
        or_default(&config.text_model),
        or_default(&config.image_model),
    )
}

pub mod ui;

use chrono::Utc;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use solostudy::{
    config::{Config, ConfigStore, FileConfigStore, RuntimeSettings},
    export::export_to_dir,
    logging,
    persistence::{KeyValueStore, MemoryStore, SqliteStore},
    runtime::{AppEvent, CrosstermEventSource, Runner, SystemClock},
    Command, Controller, Outcome, Reply, TICK_RATE_MS,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::Duration,
};
use tracing::{info, warn};

/// terminal study-session timer with a per-question stopwatch and question log
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A study-session timer: a countdown budget for the whole session, a stopwatch per question, and a log of answered questions you can merge, delete and export to csv."
)]
pub struct Cli {
    /// session name to pre-fill
    #[clap(short = 'n', long)]
    name: Option<String>,

    /// session length in minutes to pre-fill
    #[clap(short = 'm', long)]
    minutes: Option<i64>,

    /// start the session right away instead of opening the form
    #[clap(long)]
    start: bool,

    /// sqlite file holding the saved state
    #[clap(long)]
    state_db: Option<PathBuf>,

    /// directory csv exports are written to
    #[clap(long)]
    export_dir: Option<PathBuf>,

    /// file diagnostics are logged to
    #[clap(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Layer command line overrides on top of config file values
    fn apply(&self, mut settings: RuntimeSettings) -> RuntimeSettings {
        if let Some(name) = &self.name {
            settings.session_name = name.clone();
        }
        if let Some(minutes) = self.minutes {
            settings.minutes = minutes;
        }
        if let Some(dir) = &self.export_dir {
            settings.export_dir = dir.clone();
        }
        if self.state_db.is_some() {
            settings.state_db = self.state_db.clone();
        }
        if self.log_file.is_some() {
            settings.log_file = self.log_file.clone();
        }
        settings
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FormField {
    Name,
    Minutes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionForm {
    pub name: String,
    pub minutes: String,
    pub field: FormField,
}

impl SessionForm {
    fn current_mut(&mut self) -> &mut String {
        match self.field {
            FormField::Name => &mut self.name,
            FormField::Minutes => &mut self.minutes,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Main,
    NewSession(SessionForm),
    ConfirmClear,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub text: String,
    pub is_error: bool,
}

pub struct App {
    pub controller: Controller<Box<dyn KeyValueStore>>,
    pub settings: RuntimeSettings,
    pub state: AppState,
    pub cursor: usize,
    pub message: Option<Message>,
    session_started: bool,
}

impl App {
    pub fn new(store: Box<dyn KeyValueStore>, settings: RuntimeSettings) -> Self {
        Self {
            controller: Controller::load(store),
            settings,
            state: AppState::Main,
            cursor: 0,
            message: None,
            session_started: false,
        }
    }

    fn info(&mut self, text: impl Into<String>) {
        self.message = Some(Message {
            text: text.into(),
            is_error: false,
        });
    }

    fn error(&mut self, text: impl Into<String>) {
        self.message = Some(Message {
            text: text.into(),
            is_error: true,
        });
    }

    fn selected_log_id(&self) -> Option<u64> {
        self.controller
            .state()
            .logs
            .entries()
            .get(self.cursor)
            .map(|e| e.id)
    }

    fn clamp_cursor(&mut self) {
        let len = self.controller.state().logs.len();
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }

    /// Runs a command, turning failures into a status line message
    fn run(&mut self, command: Command) -> Option<Reply> {
        let starts_session = matches!(command, Command::StartSession { .. });
        match self.controller.execute(command) {
            Ok(reply) => {
                self.session_started |= starts_session;
                self.clamp_cursor();
                Some(reply)
            }
            Err(e) => {
                self.error(e.to_string());
                None
            }
        }
    }

    pub fn on_tick(&mut self, elapsed_seconds: u64) {
        if elapsed_seconds > 0 {
            self.controller.advance(elapsed_seconds);
        }
    }

    /// True once after a session was started; the loop restarts its second
    /// cadence so the first countdown tick is a full second away.
    pub fn take_session_started(&mut self) -> bool {
        std::mem::take(&mut self.session_started)
    }

    pub fn open_session_form(&mut self) {
        self.state = AppState::NewSession(SessionForm {
            name: self.settings.session_name.clone(),
            minutes: self.settings.minutes.to_string(),
            field: FormField::Name,
        });
    }

    pub fn start_session(&mut self, name: &str, minutes: &str) {
        let Ok(minutes) = minutes.trim().parse::<i64>() else {
            self.error("Enter a valid main timer in minutes.");
            return;
        };
        if let Some(Reply::Session(_)) = self.run(Command::StartSession {
            name: name.to_string(),
            minutes,
        }) {
            self.settings.session_name = name.trim().to_string();
            self.settings.minutes = minutes;
            self.state = AppState::Main;
            let name = self.controller.state().session.name.clone();
            self.info(format!("Session \"{name}\" started"));
        }
    }

    fn export(&mut self) {
        if !self.controller.view().export_enabled {
            self.error("No logs to export.");
            return;
        }
        if let Some(Reply::Rows(rows)) = self.run(Command::ExportLogs) {
            match export_to_dir(&self.settings.export_dir, rows, Utc::now()) {
                Ok(path) => self.info(format!("Exported to {}", path.display())),
                Err(e) => {
                    warn!(error = %e, "export failed");
                    self.error(format!("Export failed: {e}"));
                }
            }
        }
    }

    /// Returns true when the app should quit
    pub fn on_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }

        match self.state.clone() {
            AppState::Main => return self.on_main_key(key),
            AppState::NewSession(mut form) => match key.code {
                KeyCode::Esc => self.state = AppState::Main,
                KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                    form.field = match form.field {
                        FormField::Name => FormField::Minutes,
                        FormField::Minutes => FormField::Name,
                    };
                    self.state = AppState::NewSession(form);
                }
                KeyCode::Backspace => {
                    form.current_mut().pop();
                    self.state = AppState::NewSession(form);
                }
                KeyCode::Enter => self.start_session(&form.name, &form.minutes),
                KeyCode::Char(c) => {
                    if form.field == FormField::Name || c.is_ascii_digit() {
                        form.current_mut().push(c);
                    }
                    self.state = AppState::NewSession(form);
                }
                _ => {}
            },
            AppState::ConfirmClear => {
                let confirmed = matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y'));
                if let Some(Reply::Cleared(true)) =
                    self.run(Command::ClearAllLogs { confirmed })
                {
                    self.cursor = 0;
                    self.info("Logs cleared");
                }
                self.state = AppState::Main;
            }
        }
        false
    }

    fn on_main_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return true,
            KeyCode::Char('n') => self.open_session_form(),
            KeyCode::Char('e') => {
                if let Some(Reply::Session(status)) = self.run(Command::EndSession) {
                    self.info(format!("Session {status}"));
                }
            }
            KeyCode::Char(' ') => {
                let command = if self.controller.state().question.is_running() {
                    Command::PauseQuestionTimer
                } else {
                    Command::StartQuestionTimer
                };
                self.run(command);
            }
            KeyCode::Char(c @ ('c' | 'x' | 'u')) => {
                let outcome = match c {
                    'c' => Outcome::Correct,
                    'x' => Outcome::Incorrect,
                    _ => Outcome::Unattempted,
                };
                if let Some(Reply::Entry(_)) = self.run(Command::SubmitQuestion(outcome)) {
                    self.cursor = self.controller.state().logs.len().saturating_sub(1);
                    self.info(format!("Logged question as {outcome}"));
                }
            }
            KeyCode::Up | KeyCode::Char('k') => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                self.cursor += 1;
                self.clamp_cursor();
            }
            KeyCode::Enter | KeyCode::Char('v') => {
                if let Some(id) = self.selected_log_id() {
                    self.run(Command::ToggleLogSelect(id));
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(id) = self.selected_log_id() {
                    self.run(Command::DeleteLog(id));
                }
            }
            KeyCode::Char('m') => {
                if let Some(Reply::Entry(entry)) = self.run(Command::MergeSelectedLogs) {
                    self.cursor = self.controller.state().logs.len().saturating_sub(1);
                    self.info(format!("Merged into log {}", entry.id));
                }
            }
            KeyCode::Char('C') => {
                if self.controller.view().clear_enabled {
                    self.state = AppState::ConfirmClear;
                }
            }
            KeyCode::Char('w') => self.export(),
            _ => {}
        }
        false
    }
}

fn open_store(settings: &RuntimeSettings) -> Box<dyn KeyValueStore> {
    let opened = match &settings.state_db {
        Some(path) => SqliteStore::open(path),
        None => SqliteStore::new(),
    };
    match opened {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!(error = %e, "state database unavailable, keeping state in memory only");
            Box::new(MemoryStore::new())
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let config_store = FileConfigStore::default();
    let settings = cli.apply(RuntimeSettings::from_config(&config_store.load()));

    if let Some(log_file) = &settings.log_file {
        if let Err(e) = logging::init(log_file, &settings.log_filter) {
            eprintln!("logging disabled: {e}");
        }
    }

    let mut app = App::new(open_store(&settings), settings);
    if cli.start {
        let (name, minutes) = (
            app.settings.session_name.clone(),
            app.settings.minutes.to_string(),
        );
        app.start_session(&name, &minutes);
    }
    info!("starting ui");

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    if let Err(e) = app.controller.flush() {
        warn!(error = %e, "final save failed");
    }
    if let Err(e) = config_store.save(&Config::from(&app.settings)) {
        warn!(error = %e, "failed to save config");
    }

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let mut runner = Runner::new(
        CrosstermEventSource::new(),
        SystemClock::new(),
        Duration::from_millis(TICK_RATE_MS),
    );

    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        let frame = runner.step();
        // time is charged before the key so a submit sees every elapsed second
        app.on_tick(frame.elapsed_seconds);
        if let AppEvent::Key(key) = frame.event {
            if app.on_key(key) {
                break;
            }
        }
        if app.take_session_started() {
            runner.resync();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};
    use solostudy::session::{SessionStatus, DEFAULT_SESSION_NAME};
    use tempfile::tempdir;

    fn settings() -> RuntimeSettings {
        RuntimeSettings {
            session_name: "reading".into(),
            minutes: 2,
            export_dir: PathBuf::from("."),
            state_db: None,
            log_file: None,
            log_filter: "info".into(),
        }
    }

    fn test_app() -> App {
        App::new(Box::new(MemoryStore::new()), settings())
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.on_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn elapse(app: &mut App, secs: u64) {
        app.on_tick(secs);
    }

    fn render(app: &App) -> String {
        let backend = TestBackend::new(90, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| f.render_widget(app, f.area())).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["solostudy"]);
        assert_eq!(cli.name, None);
        assert_eq!(cli.minutes, None);
        assert!(!cli.start);
    }

    #[test]
    fn test_cli_overrides_settings() {
        let cli = Cli::parse_from([
            "solostudy",
            "-n",
            "organic chem",
            "--minutes",
            "45",
            "--export-dir",
            "/tmp/exports",
            "--state-db",
            "/tmp/s.db",
        ]);
        let merged = cli.apply(settings());
        assert_eq!(merged.session_name, "organic chem");
        assert_eq!(merged.minutes, 45);
        assert_eq!(merged.export_dir, PathBuf::from("/tmp/exports"));
        assert_eq!(merged.state_db, Some(PathBuf::from("/tmp/s.db")));
        assert_eq!(merged.log_filter, "info");
    }

    #[test]
    fn test_session_form_starts_session() {
        let mut app = test_app();
        press(&mut app, KeyCode::Char('n'));
        assert!(matches!(app.state, AppState::NewSession(_)));

        // replace the pre-filled name
        for _ in 0.."reading".len() {
            press(&mut app, KeyCode::Backspace);
        }
        type_str(&mut app, "stats");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Backspace);
        type_str(&mut app, "5x");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.state, AppState::Main);
        let session = &app.controller.state().session;
        assert_eq!(session.name, "stats");
        assert_eq!(session.main_remaining_seconds, 5 * 60);
        assert_eq!(session.status, SessionStatus::Running);
    }

    #[test]
    fn test_session_form_rejects_bad_minutes() {
        let mut app = test_app();
        app.start_session("", "0");
        assert!(app.message.as_ref().unwrap().is_error);
        assert_eq!(app.controller.state().session.status, SessionStatus::Idle);

        app.start_session("", "abc");
        assert_eq!(
            app.message.as_ref().unwrap().text,
            "Enter a valid main timer in minutes."
        );

        app.start_session("  ", "1");
        assert_eq!(app.controller.state().session.name, DEFAULT_SESSION_NAME);
    }

    #[test]
    fn test_session_start_is_reported_once() {
        let mut app = test_app();
        app.start_session("reading", "0");
        assert!(!app.take_session_started());

        app.start_session("reading", "2");
        assert!(app.take_session_started());
        assert!(!app.take_session_started());
    }

    #[test]
    fn test_question_flow_with_keys() {
        let mut app = test_app();
        app.start_session("reading", "2");

        press(&mut app, KeyCode::Char('c'));
        assert!(app.message.as_ref().unwrap().is_error);

        press(&mut app, KeyCode::Char(' '));
        elapse(&mut app, 30);
        press(&mut app, KeyCode::Char('x'));

        press(&mut app, KeyCode::Char(' '));
        elapse(&mut app, 10);
        press(&mut app, KeyCode::Char(' '));
        elapse(&mut app, 10);
        press(&mut app, KeyCode::Char('c'));

        let logs = app.controller.state().logs.entries().to_vec();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].time_spent_seconds, 30);
        assert_eq!(logs[0].outcome, Outcome::Incorrect);
        assert_eq!(logs[1].time_spent_seconds, 10);
        assert_eq!(app.cursor, 1);

        // select both and merge
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Up);
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('m'));

        let logs = app.controller.state().logs.entries();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].time_spent_seconds, 40);
        assert_eq!(logs[0].outcome, Outcome::Incorrect);
        assert_eq!(logs[0].id, 3);
    }

    #[test]
    fn test_clear_needs_confirmation() {
        let mut app = test_app();
        app.start_session("reading", "2");
        press(&mut app, KeyCode::Char(' '));
        elapse(&mut app, 3);
        press(&mut app, KeyCode::Char('u'));

        press(&mut app, KeyCode::Char('C'));
        assert_eq!(app.state, AppState::ConfirmClear);
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.state, AppState::Main);
        assert_eq!(app.controller.state().logs.len(), 1);

        press(&mut app, KeyCode::Char('C'));
        press(&mut app, KeyCode::Char('y'));
        assert!(app.controller.state().logs.is_empty());

        // nothing left to clear
        press(&mut app, KeyCode::Char('C'));
        assert_eq!(app.state, AppState::Main);
    }

    #[test]
    fn test_delete_at_cursor() {
        let mut app = test_app();
        app.start_session("reading", "2");
        for _ in 0..2 {
            press(&mut app, KeyCode::Char(' '));
            elapse(&mut app, 2);
            press(&mut app, KeyCode::Char('c'));
        }
        press(&mut app, KeyCode::Char('d'));
        let ids: Vec<u64> = app
            .controller
            .state()
            .logs
            .entries()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![1]);
        assert_eq!(app.cursor, 0);
    }

    #[test]
    fn test_export_writes_csv() {
        let dir = tempdir().unwrap();
        let mut app = test_app();
        app.settings.export_dir = dir.path().to_path_buf();

        press(&mut app, KeyCode::Char('w'));
        assert_eq!(app.message.as_ref().unwrap().text, "No logs to export.");

        app.start_session("reading", "2");
        press(&mut app, KeyCode::Char(' '));
        elapse(&mut app, 65);
        press(&mut app, KeyCode::Char('c'));
        press(&mut app, KeyCode::Char('w'));

        let message = app.message.clone().unwrap();
        assert!(!message.is_error, "{}", message.text);
        let file = std::fs::read_dir(dir.path())
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        let contents = std::fs::read_to_string(file).unwrap();
        assert!(contents.contains("1,01:05,00:00:00,Correct"));
    }

    #[test]
    fn test_quit_keys() {
        let mut app = test_app();
        assert!(press(&mut app, KeyCode::Char('q')));
        assert!(app.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));

        press(&mut app, KeyCode::Char('n'));
        assert!(!press(&mut app, KeyCode::Char('q')));
        assert!(!press(&mut app, KeyCode::Esc));
        assert_eq!(app.state, AppState::Main);
    }

    #[test]
    fn test_render_main_screen() {
        let mut app = test_app();
        app.start_session("reading", "2");
        press(&mut app, KeyCode::Char(' '));
        elapse(&mut app, 5);

        let content = render(&app);
        assert!(content.contains("reading"));
        assert!(content.contains("Running"));
        assert!(content.contains("00:01:55"));
        assert!(content.contains("00:05"));

        press(&mut app, KeyCode::Char('c'));
        let content = render(&app);
        assert!(content.contains("00:01:50"));
        assert!(content.contains("Correct"));
    }

    #[test]
    fn test_render_overlays() {
        let mut app = test_app();
        press(&mut app, KeyCode::Char('n'));
        assert!(render(&app).contains("New session"));

        app.state = AppState::ConfirmClear;
        assert!(render(&app).contains("Clear all logs?"));
    }
}

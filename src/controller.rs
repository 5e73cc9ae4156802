use crate::error::{Result, StudyError};
use crate::log_store::{ExportRow, LogEntry, LogStore, Outcome};
use crate::persistence::{KeyValueStore, PersistedSnapshot, PersistenceGateway};
use crate::question_timer::QuestionTimer;
use crate::session::{Session, SessionStatus};
use tracing::{debug, info};

/// Everything the app knows, owned in one place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudyState {
    pub session: Session,
    pub question: QuestionTimer,
    pub logs: LogStore,
}

/// User intents, as delivered by the UI adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StartSession { name: String, minutes: i64 },
    EndSession,
    StartQuestionTimer,
    PauseQuestionTimer,
    SubmitQuestion(Outcome),
    ToggleLogSelect(u64),
    DeleteLog(u64),
    MergeSelectedLogs,
    ClearAllLogs { confirmed: bool },
    ExportLogs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Done,
    Session(SessionStatus),
    Entry(LogEntry),
    Selected(bool),
    Cleared(bool),
    Rows(Vec<ExportRow>),
}

/// Read-only projection handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View<'a> {
    pub session: &'a Session,
    pub question: &'a QuestionTimer,
    pub logs: &'a [LogEntry],
    pub start_session_enabled: bool,
    pub end_session_enabled: bool,
    pub start_question_enabled: bool,
    pub pause_question_enabled: bool,
    pub submit_enabled: bool,
    pub merge_enabled: bool,
    pub clear_enabled: bool,
    pub export_enabled: bool,
}

#[derive(Debug)]
pub struct Controller<S: KeyValueStore> {
    state: StudyState,
    gateway: PersistenceGateway<S>,
}

impl<S: KeyValueStore> Controller<S> {
    /// Restores the last snapshot. The session always comes back idle with a
    /// zeroed question timer.
    pub fn load(store: S) -> Self {
        let gateway = PersistenceGateway::new(store);
        let (session, logs) = gateway.load().into_parts();
        info!(
            logs = logs.len(),
            remaining = session.main_remaining_seconds,
            "state restored"
        );
        Self {
            state: StudyState {
                session,
                question: QuestionTimer::default(),
                logs,
            },
            gateway,
        }
    }

    pub fn state(&self) -> &StudyState {
        &self.state
    }

    fn persist(&self) {
        self.gateway
            .save(&PersistedSnapshot::capture(&self.state.session, &self.state.logs));
    }

    /// Saves the current state and reports failure instead of swallowing it.
    pub fn flush(&self) -> Result<()> {
        self.gateway
            .try_save(&PersistedSnapshot::capture(&self.state.session, &self.state.logs))?;
        Ok(())
    }

    pub fn start_session(&mut self, name: &str, minutes: i64) -> Result<()> {
        self.state.session.start(name, minutes)?;
        self.state.question.reset();
        self.persist();
        Ok(())
    }

    pub fn end_session(&mut self) -> SessionStatus {
        let status = self.state.session.end();
        if status == SessionStatus::Ended {
            self.state.question.reset();
            self.persist();
        }
        status
    }

    pub fn start_question_timer(&mut self) {
        self.state.question.start(self.state.session.is_running());
    }

    pub fn pause_question_timer(&mut self) {
        self.state.question.pause();
    }

    /// Charges the stopwatch time to the session and logs the question.
    pub fn submit_question(&mut self, outcome: Outcome) -> Result<LogEntry> {
        if !self.state.session.is_running() {
            return Err(StudyError::InvalidSubmission(
                "no session is running".into(),
            ));
        }
        let time_spent = self.state.question.elapsed_seconds;
        if time_spent == 0 {
            return Err(StudyError::InvalidSubmission(
                "run the question timer for at least 1 second before submitting".into(),
            ));
        }

        self.state.session.consume_time(time_spent);
        let entry = self.state.logs.submit(
            time_spent,
            self.state.session.main_remaining_seconds,
            outcome,
        )?;
        self.state.question.reset();
        self.persist();
        Ok(entry)
    }

    pub fn toggle_log_select(&mut self, id: u64) -> Result<bool> {
        let selected = self.state.logs.toggle_select(id)?;
        self.persist();
        Ok(selected)
    }

    pub fn delete_log(&mut self, id: u64) {
        if self.state.logs.delete(id) {
            self.persist();
        } else {
            debug!(id, "delete of unknown log ignored");
        }
    }

    pub fn merge_selected_logs(&mut self) -> Result<LogEntry> {
        let entry = self.state.logs.merge()?;
        self.persist();
        Ok(entry)
    }

    /// Only clears when the caller obtained confirmation. Returns whether it
    /// did.
    pub fn clear_all_logs(&mut self, confirmed: bool) -> bool {
        if !confirmed {
            return false;
        }
        self.state.logs.clear();
        self.persist();
        true
    }

    pub fn export_logs(&self) -> Vec<ExportRow> {
        self.state.logs.export_rows().collect()
    }

    /// One second of wall time. The session is evaluated first; if it
    /// expires on this tick the question timer is stopped before it could
    /// count the same second.
    fn tick_once(&mut self) {
        if self.state.session.tick() {
            self.state.question.reset();
        } else {
            self.state.question.tick();
        }
    }

    pub fn tick(&mut self) {
        self.advance(1);
    }

    /// Applies up to `seconds` ticks and saves once at the end. Both timers
    /// are inert without a running session, so the loop stops there.
    pub fn advance(&mut self, seconds: u64) {
        let mut ticked = false;
        for _ in 0..seconds {
            if !self.state.session.is_running() {
                break;
            }
            self.tick_once();
            ticked = true;
        }
        if ticked {
            self.persist();
        }
    }

    pub fn execute(&mut self, command: Command) -> Result<Reply> {
        debug!(?command, "execute");
        let reply = match command {
            Command::StartSession { name, minutes } => {
                self.start_session(&name, minutes)?;
                Reply::Session(SessionStatus::Running)
            }
            Command::EndSession => Reply::Session(self.end_session()),
            Command::StartQuestionTimer => {
                self.start_question_timer();
                Reply::Done
            }
            Command::PauseQuestionTimer => {
                self.pause_question_timer();
                Reply::Done
            }
            Command::SubmitQuestion(outcome) => Reply::Entry(self.submit_question(outcome)?),
            Command::ToggleLogSelect(id) => Reply::Selected(self.toggle_log_select(id)?),
            Command::DeleteLog(id) => {
                self.delete_log(id);
                Reply::Done
            }
            Command::MergeSelectedLogs => Reply::Entry(self.merge_selected_logs()?),
            Command::ClearAllLogs { confirmed } => Reply::Cleared(self.clear_all_logs(confirmed)),
            Command::ExportLogs => Reply::Rows(self.export_logs()),
        };
        Ok(reply)
    }

    pub fn view(&self) -> View<'_> {
        let StudyState {
            session,
            question,
            logs,
        } = &self.state;
        let running = session.is_running();
        View {
            session,
            question,
            logs: logs.entries(),
            start_session_enabled: !running,
            end_session_enabled: running,
            start_question_enabled: running && !question.is_running(),
            pause_question_enabled: running && question.is_running(),
            submit_enabled: running && question.elapsed_seconds > 0,
            merge_enabled: logs.selected_count() >= 2,
            clear_enabled: !logs.is_empty(),
            export_enabled: !logs.is_empty(),
        }
    }
}

use crate::error::{Result, StudyError};
use tracing::{debug, info};

pub const DEFAULT_SESSION_NAME: &str = "Unnamed Session";

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum SessionStatus {
    Idle,
    Running,
    Ended,
    Expired,
}

/// The session-wide countdown. Question timer coordination is left to the
/// controller; this type only knows its own lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub status: SessionStatus,
    pub name: String,
    pub main_remaining_seconds: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            status: SessionStatus::Idle,
            name: String::new(),
            main_remaining_seconds: 0,
        }
    }
}

impl Session {
    /// A session restored from storage. Never resumes running.
    pub fn restored(name: String, main_remaining_seconds: u64) -> Self {
        Self {
            status: SessionStatus::Idle,
            name,
            main_remaining_seconds,
        }
    }

    /// Replaces whatever session was here with a fresh running one.
    pub fn start(&mut self, name: &str, minutes: i64) -> Result<()> {
        if minutes <= 0 {
            return Err(StudyError::InvalidInput(format!(
                "session minutes must be a positive integer, got {minutes}"
            )));
        }
        let seconds = u64::try_from(minutes)
            .ok()
            .and_then(|m| m.checked_mul(60))
            .ok_or_else(|| {
                StudyError::InvalidInput(format!("session minutes too large: {minutes}"))
            })?;

        let trimmed = name.trim();
        self.name = if trimmed.is_empty() {
            DEFAULT_SESSION_NAME.to_string()
        } else {
            trimmed.to_string()
        };
        self.main_remaining_seconds = seconds;
        self.status = SessionStatus::Running;
        info!(name = %self.name, seconds, "session started");
        Ok(())
    }

    /// Returns the status to report: `Idle` when there was nothing to end.
    pub fn end(&mut self) -> SessionStatus {
        if !self.is_running() {
            return SessionStatus::Idle;
        }
        self.status = SessionStatus::Ended;
        info!(name = %self.name, remaining = self.main_remaining_seconds, "session ended");
        SessionStatus::Ended
    }

    /// One second of countdown. Returns true on the tick that expires the
    /// session.
    pub fn tick(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.main_remaining_seconds = self.main_remaining_seconds.saturating_sub(1);
        if self.main_remaining_seconds == 0 {
            self.status = SessionStatus::Expired;
            info!(name = %self.name, "session expired");
            return true;
        }
        false
    }

    /// Charges a submitted question against the budget. Hitting zero here
    /// does not expire the session; the next tick does.
    pub fn consume_time(&mut self, seconds: u64) {
        self.main_remaining_seconds = self.main_remaining_seconds.saturating_sub(seconds);
        debug!(seconds, remaining = self.main_remaining_seconds, "time consumed");
    }

    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn running(minutes: i64) -> Session {
        let mut session = Session::default();
        session.start("algebra", minutes).unwrap();
        session
    }

    #[test]
    fn test_start_sets_budget_and_status() {
        for minutes in [1, 5, 90] {
            let session = running(minutes);
            assert_eq!(session.main_remaining_seconds, minutes as u64 * 60);
            assert_eq!(session.status, SessionStatus::Running);
            assert_eq!(session.name, "algebra");
        }
    }

    #[test]
    fn test_start_rejects_non_positive_minutes_without_mutation() {
        let mut session = running(2);
        session.tick();
        let before = session.clone();

        assert_matches!(session.start("x", 0), Err(StudyError::InvalidInput(_)));
        assert_matches!(session.start("x", -3), Err(StudyError::InvalidInput(_)));
        assert_eq!(session, before);
    }

    #[test]
    fn test_start_rejects_overflowing_minutes() {
        let mut session = Session::default();
        assert_matches!(
            session.start("x", i64::MAX),
            Err(StudyError::InvalidInput(_))
        );
        assert_eq!(session.status, SessionStatus::Idle);
    }

    #[test]
    fn test_blank_name_gets_placeholder() {
        let mut session = Session::default();
        session.start("   ", 1).unwrap();
        assert_eq!(session.name, DEFAULT_SESSION_NAME);

        session.start("  calculus  ", 1).unwrap();
        assert_eq!(session.name, "calculus");
    }

    #[test]
    fn test_restart_replaces_running_session() {
        let mut session = running(10);
        session.consume_time(100);
        session.start("new", 1).unwrap();
        assert_eq!(session.main_remaining_seconds, 60);
        assert_eq!(session.name, "new");
        assert!(session.is_running());
    }

    #[test]
    fn test_start_from_terminal_states() {
        let mut session = running(1);
        session.end();
        session.start("again", 1).unwrap();
        assert!(session.is_running());

        for _ in 0..60 {
            session.tick();
        }
        assert_eq!(session.status, SessionStatus::Expired);
        session.start("again", 2).unwrap();
        assert!(session.is_running());
        assert_eq!(session.main_remaining_seconds, 120);
    }

    #[test]
    fn test_end_when_not_running_reports_idle() {
        let mut session = Session::default();
        assert_eq!(session.end(), SessionStatus::Idle);
        assert_eq!(session.status, SessionStatus::Idle);

        let mut session = running(1);
        assert_eq!(session.end(), SessionStatus::Ended);
        assert_eq!(session.end(), SessionStatus::Idle);
        assert_eq!(session.status, SessionStatus::Ended);
    }

    #[test]
    fn test_ticks_decrement_exactly_and_expire_on_zero() {
        let mut session = running(1);
        for n in 1..60 {
            assert!(!session.tick());
            assert_eq!(session.main_remaining_seconds, 60 - n);
            assert!(session.is_running());
        }
        assert!(session.tick());
        assert_eq!(session.main_remaining_seconds, 0);
        assert_eq!(session.status, SessionStatus::Expired);

        // further ticks are inert
        assert!(!session.tick());
        assert_eq!(session.main_remaining_seconds, 0);
    }

    #[test]
    fn test_tick_ignored_unless_running() {
        let mut session = running(1);
        session.end();
        session.tick();
        assert_eq!(session.main_remaining_seconds, 60);
    }

    #[test]
    fn test_consume_time_clamps_and_keeps_running() {
        let mut session = running(1);
        session.consume_time(45);
        assert_eq!(session.main_remaining_seconds, 15);

        session.consume_time(500);
        assert_eq!(session.main_remaining_seconds, 0);
        assert_eq!(session.status, SessionStatus::Running);

        // the next tick observes zero and expires
        assert!(session.tick());
        assert_eq!(session.status, SessionStatus::Expired);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SessionStatus::Running.to_string(), "Running");
        assert_eq!(SessionStatus::Expired.to_string(), "Expired");
    }
}

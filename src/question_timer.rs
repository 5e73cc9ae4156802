#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum TimerStatus {
    Stopped,
    Running,
    Paused,
}

/// Per-question stopwatch counting up in whole seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionTimer {
    pub status: TimerStatus,
    pub elapsed_seconds: u64,
}

impl Default for QuestionTimer {
    fn default() -> Self {
        Self {
            status: TimerStatus::Stopped,
            elapsed_seconds: 0,
        }
    }
}

impl QuestionTimer {
    /// Starting without a running session is silently ignored; the UI keeps
    /// the control disabled in that case anyway.
    pub fn start(&mut self, session_running: bool) {
        if session_running {
            self.status = TimerStatus::Running;
        }
    }

    pub fn pause(&mut self) {
        if self.status == TimerStatus::Running {
            self.status = TimerStatus::Paused;
        }
    }

    pub fn reset(&mut self) {
        self.pause();
        self.status = TimerStatus::Stopped;
        self.elapsed_seconds = 0;
    }

    pub fn tick(&mut self) {
        if self.is_running() {
            self.elapsed_seconds += 1;
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_requires_running_session() {
        let mut timer = QuestionTimer::default();
        timer.start(false);
        assert_eq!(timer.status, TimerStatus::Stopped);

        timer.start(true);
        assert!(timer.is_running());
    }

    #[test]
    fn test_ticks_only_count_while_running() {
        let mut timer = QuestionTimer::default();
        timer.tick();
        assert_eq!(timer.elapsed_seconds, 0);

        timer.start(true);
        timer.tick();
        timer.tick();
        assert_eq!(timer.elapsed_seconds, 2);

        timer.pause();
        timer.tick();
        assert_eq!(timer.elapsed_seconds, 2);
        assert_eq!(timer.status, TimerStatus::Paused);

        timer.start(true);
        timer.tick();
        assert_eq!(timer.elapsed_seconds, 3);
    }

    #[test]
    fn test_pause_is_idempotent() {
        let mut timer = QuestionTimer::default();
        timer.pause();
        assert_eq!(timer.status, TimerStatus::Stopped);

        timer.start(true);
        timer.pause();
        timer.pause();
        assert_eq!(timer.status, TimerStatus::Paused);
    }

    #[test]
    fn test_reset() {
        let mut timer = QuestionTimer::default();
        timer.start(true);
        timer.tick();
        timer.reset();
        assert_eq!(timer, QuestionTimer::default());

        timer.reset();
        assert_eq!(timer, QuestionTimer::default());
    }
}

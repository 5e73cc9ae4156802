use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    /// Nothing arrived within the redraw interval.
    Tick,
}

/// Blocking input with a deadline.
pub trait EventSource: Send + 'static {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError>;
}

/// Terminal input read on a background thread and handed over a channel.
pub struct CrosstermEventSource {
    rx: Receiver<AppEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                // windows reports releases too
                Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                    Some(AppEvent::Key(key))
                }
                Ok(CtEvent::Resize(_, _)) => Some(AppEvent::Resize),
                Ok(_) => None,
                Err(_) => break,
            };
            if let Some(ev) = forwarded {
                if tx.send(ev).is_err() {
                    break;
                }
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Channel-fed source for driving the loop without a terminal.
pub struct TestEventSource {
    rx: Receiver<AppEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<AppEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// What one pass of the loop has to handle: at most one input event, plus
/// the whole seconds of wall time that passed since the previous pass.
#[derive(Clone, Debug)]
pub struct Frame {
    pub event: AppEvent,
    pub elapsed_seconds: u64,
}

/// Drives the UI loop. Waits at most `redraw` for input, so the screen is
/// repainted at least that often, and accounts elapsed time against `clock`
/// independently of how often it is called.
pub struct Runner<E: EventSource, C: Clock> {
    event_source: E,
    redraw: Duration,
    scheduler: SecondScheduler<C>,
}

impl<E: EventSource, C: Clock> Runner<E, C> {
    pub fn new(event_source: E, clock: C, redraw: Duration) -> Self {
        Self {
            event_source,
            redraw,
            scheduler: SecondScheduler::new(clock),
        }
    }

    pub fn step(&mut self) -> Frame {
        let event = self
            .event_source
            .recv_timeout(self.redraw)
            .unwrap_or(AppEvent::Tick);
        Frame {
            event,
            elapsed_seconds: self.scheduler.due_seconds(),
        }
    }

    /// Drops any partial second, e.g. when a new session starts.
    pub fn resync(&mut self) {
        self.scheduler.resync();
    }
}

/// Monotonic time source, measured from an arbitrary origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven clock; clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

/// Turns clock readings into whole-second ticks. Calls arrive far more often
/// than once a second and at uneven intervals, so the fractional remainder is
/// carried between calls.
#[derive(Debug)]
pub struct SecondScheduler<C: Clock> {
    clock: C,
    last: Duration,
}

impl<C: Clock> SecondScheduler<C> {
    pub fn new(clock: C) -> Self {
        let last = clock.now();
        Self { clock, last }
    }

    /// Whole seconds elapsed since the previous accounting.
    pub fn due_seconds(&mut self) -> u64 {
        let now = self.clock.now();
        let due = now.saturating_sub(self.last).as_secs();
        self.last += Duration::from_secs(due);
        due
    }

    /// Restart the cadence so the next tick lands a full second from now.
    pub fn resync(&mut self) {
        self.last = self.clock.now();
    }
}

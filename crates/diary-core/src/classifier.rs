//! Activity classification state machine.
//!
//! Turns focus, typing and debugger signals into a sequence of closed,
//! non-overlapping [`TimeInterval`]s.
//!
//! # Algorithm Summary
//!
//! 1. The state is either tracking an activity (`writing`, `thinking`, `rest`)
//!    or debugging. Debugging carries the presence to resume to once it ends.
//! 2. Each signal is applied by the pure [`transition`] function.
//! 3. Whenever the category changes, the interval open in the old category is
//!    closed at `now` and a new one opens.
//! 4. Typing arms an idle timer; when it fires after enough silence,
//!    `writing` is demoted to `thinking`.

use serde::{Deserialize, Serialize};

use crate::types::{Category, TimeInterval};

/// Configuration for the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Delay between the last keystroke and the idle check.
    /// Default: 11000 (11 seconds).
    pub idle_timer_ms: i64,

    /// Silence that must have elapsed (strictly more) for the idle check to
    /// demote `writing` to `thinking`. Default: 10000 (10 seconds).
    pub idle_threshold_ms: i64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            idle_timer_ms: 11_000,
            idle_threshold_ms: 10_000,
        }
    }
}

/// A signal the state machine reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// The editor window gained or lost focus.
    FocusChanged { focused: bool },
    /// A document was edited. Missing context falls back to the last-known
    /// values.
    TextChanged {
        language: Option<String>,
        workspace: Option<String>,
    },
    DebugStarted,
    DebugEnded,
    /// The idle timer armed by the last edit fired.
    IdleTimeout,
}

/// Activity while no debug session is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Writing,
    Thinking,
    Rest,
}

impl Activity {
    const fn category(self) -> Category {
        match self {
            Self::Writing => Category::Writing,
            Self::Thinking => Category::Thinking,
            Self::Rest => Category::Rest,
        }
    }
}

/// Where to go once a debug session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Window focused: resume as `thinking`.
    Active,
    /// Window unfocused: resume as `rest`.
    Away,
}

impl Presence {
    const fn from_focus(focused: bool) -> Self {
        if focused { Self::Active } else { Self::Away }
    }

    const fn resumed(self) -> Activity {
        match self {
            Self::Active => Activity::Thinking,
            Self::Away => Activity::Rest,
        }
    }
}

/// Classifier mode. Debugging overrides every other activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Tracking(Activity),
    Debugging { resume_to: Presence },
}

impl Mode {
    /// The category time in this mode is labeled with.
    pub const fn category(self) -> Category {
        match self {
            Self::Tracking(activity) => activity.category(),
            Self::Debugging { .. } => Category::Debugging,
        }
    }
}

/// Transient classifier state. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierState {
    pub mode: Mode,
    /// Start of the open interval. `None` until the first category change.
    pub current_start: Option<i64>,
    /// Timestamp of the last processed keystroke.
    pub last_input: Option<i64>,
    pub window_focused: bool,
    pub last_workspace: String,
    pub last_language: String,
}

impl Default for ClassifierState {
    fn default() -> Self {
        Self {
            mode: Mode::Tracking(Activity::Rest),
            current_start: None,
            last_input: None,
            window_focused: false,
            last_workspace: String::new(),
            last_language: String::new(),
        }
    }
}

impl ClassifierState {
    /// The category of the open interval.
    pub const fn current_category(&self) -> Category {
        self.mode.category()
    }

    pub const fn debugger_active(&self) -> bool {
        matches!(self.mode, Mode::Debugging { .. })
    }

    /// Closes the open interval at `now`, if there is one with positive length.
    fn close_at(&self, now: i64) -> Option<TimeInterval> {
        let start = self.current_start?;
        if now <= start {
            tracing::debug!(start, now, "dropping empty interval");
            return None;
        }
        Some(TimeInterval {
            start,
            end: now,
            category: self.current_category(),
            workspace: self.last_workspace.clone(),
            language: self.last_language.clone(),
        })
    }
}

/// What to do with the idle timer after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    /// Leave any pending timer alone.
    Keep,
    /// Cancel any pending timer and arm a new one `delay_ms` from now.
    Arm { delay_ms: i64 },
    /// Cancel any pending timer.
    Cancel,
}

/// Result of applying one signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: ClassifierState,
    /// The interval closed by a category change, if any.
    pub emitted: Option<TimeInterval>,
    pub timer: TimerCommand,
}

/// Applies `signal` at time `now` to `state`.
///
/// Pure: the caller owns the single mutable state and threads it through.
pub fn transition(
    state: &ClassifierState,
    signal: &Signal,
    now: i64,
    config: &ClassifierConfig,
) -> Transition {
    let mut next = state.clone();
    let mut timer = TimerCommand::Keep;

    let mode = match signal {
        Signal::FocusChanged { focused } => {
            next.window_focused = *focused;
            if !focused {
                timer = TimerCommand::Cancel;
            }
            match state.mode {
                Mode::Debugging { .. } => Mode::Debugging {
                    resume_to: Presence::from_focus(*focused),
                },
                Mode::Tracking(_) if *focused => Mode::Tracking(Activity::Thinking),
                Mode::Tracking(_) => Mode::Tracking(Activity::Rest),
            }
        }
        Signal::TextChanged {
            language,
            workspace,
        } => {
            if !state.window_focused {
                return Transition {
                    state: next,
                    emitted: None,
                    timer,
                };
            }
            if let Some(language) = language.as_deref().filter(|l| !l.is_empty()) {
                next.last_language = language.to_string();
            }
            if let Some(workspace) = workspace.as_deref().filter(|w| !w.is_empty()) {
                next.last_workspace = workspace.to_string();
            }
            next.last_input = Some(now);
            match state.mode {
                Mode::Debugging { .. } => state.mode,
                Mode::Tracking(_) => {
                    timer = TimerCommand::Arm {
                        delay_ms: config.idle_timer_ms,
                    };
                    Mode::Tracking(Activity::Writing)
                }
            }
        }
        Signal::DebugStarted => {
            timer = TimerCommand::Cancel;
            match state.mode {
                Mode::Debugging { .. } => state.mode,
                Mode::Tracking(_) => Mode::Debugging {
                    resume_to: Presence::from_focus(state.window_focused),
                },
            }
        }
        Signal::DebugEnded => match state.mode {
            Mode::Debugging { resume_to } => Mode::Tracking(resume_to.resumed()),
            Mode::Tracking(_) => {
                Mode::Tracking(Presence::from_focus(state.window_focused).resumed())
            }
        },
        Signal::IdleTimeout => {
            // The timer may be stale: re-check the silence before demoting.
            let idle = state
                .last_input
                .is_none_or(|last| now - last > config.idle_threshold_ms);
            if state.mode == Mode::Tracking(Activity::Writing) && idle {
                Mode::Tracking(Activity::Thinking)
            } else {
                state.mode
            }
        }
    };

    let mut emitted = None;
    if mode.category() != state.current_category() {
        // `next` still holds the old mode but already carries the context
        // this signal recorded.
        emitted = next.close_at(now);
        next.current_start = Some(now);
        tracing::debug!(
            from = %state.current_category(),
            to = %mode.category(),
            now,
            "category changed"
        );
    }
    next.mode = mode;

    Transition {
        state: next,
        emitted,
        timer,
    }
}

/// Closes the open interval at shutdown.
///
/// Returns the final state (with no open interval) and the flushed interval.
pub fn flush(state: &ClassifierState, now: i64) -> (ClassifierState, Option<TimeInterval>) {
    let emitted = state.close_at(now);
    let mut next = state.clone();
    next.current_start = None;
    (next, emitted)
}

/// Single-slot idle timer. Arming replaces any pending deadline, so at most
/// one idle check is ever pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdleTimer {
    deadline: Option<i64>,
}

impl IdleTimer {
    pub const fn deadline(&self) -> Option<i64> {
        self.deadline
    }

    fn apply(&mut self, command: TimerCommand, now: i64) {
        match command {
            TimerCommand::Keep => {}
            TimerCommand::Arm { delay_ms } => self.deadline = Some(now + delay_ms),
            TimerCommand::Cancel => self.deadline = None,
        }
    }

    /// Takes the deadline if it is due at `now`.
    fn take_due(&mut self, now: i64) -> Option<i64> {
        let deadline = self.deadline.filter(|&d| d <= now)?;
        self.deadline = None;
        Some(deadline)
    }
}

/// Event-loop wrapper owning the single mutable [`ClassifierState`].
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    state: ClassifierState,
    timer: IdleTimer,
    config: ClassifierConfig,
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            state: ClassifierState::default(),
            timer: IdleTimer::default(),
            config,
        }
    }

    pub const fn state(&self) -> &ClassifierState {
        &self.state
    }

    /// When the pending idle check is due, if one is armed.
    pub const fn idle_deadline(&self) -> Option<i64> {
        self.timer.deadline()
    }

    /// Fires the idle timer if it is due at `now`. The timeout is applied at
    /// its deadline, not at `now`.
    pub fn advance(&mut self, now: i64) -> Option<TimeInterval> {
        let deadline = self.timer.take_due(now)?;
        self.apply(&Signal::IdleTimeout, deadline)
    }

    /// Applies a signal at `now`, firing an overdue idle timer first.
    pub fn handle(&mut self, signal: &Signal, now: i64) -> Vec<TimeInterval> {
        let mut emitted = Vec::new();
        emitted.extend(self.advance(now));
        emitted.extend(self.apply(signal, now));
        emitted
    }

    /// Flushes the open interval with `end = now`.
    pub fn shutdown(&mut self, now: i64) -> Option<TimeInterval> {
        self.timer.apply(TimerCommand::Cancel, now);
        let (state, emitted) = flush(&self.state, now);
        self.state = state;
        emitted
    }

    fn apply(&mut self, signal: &Signal, now: i64) -> Option<TimeInterval> {
        let Transition {
            state,
            emitted,
            timer,
        } = transition(&self.state, signal, now, &self.config);
        self.state = state;
        self.timer.apply(timer, now);
        emitted
    }
}

//! Countdown state machine for timed drills.
//!
//! The controller is pure: something else (the services ticker) delivers one
//! `tick()` per second and decides what to do with the single `Expiry` it
//! eventually yields. Untimed drills never leave `Idle`.

/// One-shot notification that the countdown reached zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    Idle,
    Running { remaining: u32 },
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryController {
    state: CountdownState,
}

impl Default for ExpiryController {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpiryController {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: CountdownState::Idle,
        }
    }

    #[must_use]
    pub fn state(&self) -> CountdownState {
        self.state
    }

    /// Starts the countdown from `time_limit_seconds` minus the time already
    /// elapsed since the drill began, so a mid-session reload resumes with
    /// the correct remaining time.
    ///
    /// No-op for untimed drills (absent or zero limit) and when not `Idle`.
    /// When the deadline has already passed, transitions straight to
    /// `Expired` and yields the one-shot notification.
    pub fn start(&mut self, time_limit_seconds: Option<u32>, elapsed_seconds: u32) -> Option<Expiry> {
        if self.state != CountdownState::Idle {
            return None;
        }
        let limit = time_limit_seconds.filter(|limit| *limit > 0)?;

        let remaining = limit.saturating_sub(elapsed_seconds);
        if remaining == 0 {
            self.state = CountdownState::Expired;
            return Some(Expiry);
        }
        self.state = CountdownState::Running { remaining };
        None
    }

    /// Consumes one second of remaining time.
    ///
    /// Yields `Expiry` exactly once, on the tick that reaches zero. Ticks in
    /// `Idle` or `Expired` yield nothing; the state itself is the latch, so
    /// duplicate expiry computations cannot re-fire the notification.
    pub fn tick(&mut self) -> Option<Expiry> {
        let CountdownState::Running { remaining } = self.state else {
            return None;
        };

        let remaining = remaining.saturating_sub(1);
        if remaining == 0 {
            self.state = CountdownState::Expired;
            Some(Expiry)
        } else {
            self.state = CountdownState::Running { remaining };
            None
        }
    }

    /// Seconds left: `None` while idle, `Some(0)` once expired.
    #[must_use]
    pub fn remaining_seconds(&self) -> Option<u32> {
        match self.state {
            CountdownState::Idle => None,
            CountdownState::Running { remaining } => Some(remaining),
            CountdownState::Expired => Some(0),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self.state, CountdownState::Running { .. })
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.state == CountdownState::Expired
    }

    /// Returns to `Idle`, e.g. when the owning session is torn down.
    pub fn reset(&mut self) {
        self.state = CountdownState::Idle;
    }
}

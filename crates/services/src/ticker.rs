use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// One second of countdown, delivered to whoever drives the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick;

/// A cancelable repeating tick.
///
/// The spawned task sends a [`Tick`] every period until it is canceled or
/// the receiver is dropped. Canceling aborts the task outright, so a timer
/// belonging to a torn-down session can never deliver a stale tick — and
/// therefore never fire a stale expiry — against a newer one.
pub struct Ticker {
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Spawns a tick stream with the given period.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(period: Duration) -> (Self, mpsc::Receiver<Tick>) {
        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first interval tick resolves immediately; the countdown
            // starts one full period later.
            interval.tick().await;
            loop {
                interval.tick().await;
                if tx.send(Tick).await.is_err() {
                    break;
                }
            }
        });
        (Self { handle }, rx)
    }

    /// The drill countdown's one-second cadence.
    #[must_use]
    pub fn every_second() -> (Self, mpsc::Receiver<Tick>) {
        Self::spawn(Duration::from_secs(1))
    }

    /// Stops the tick stream; the paired receiver sees the channel close.
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

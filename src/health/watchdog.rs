//! Listener health watchdog.
//!
//! # States
//! - Disabled: interval is zero, nothing runs
//! - Armed: counting down `remaining` consecutive failures
//! - Exhausted: budget spent, listener closed (terminal)
//!
//! # State Transitions
//! ```text
//! start → warm-up probe (uncounted) → Armed { remaining: budget }
//! Armed, probe ok     → Armed { remaining: budget }   (BackOnline if it had dropped)
//! Armed, probe failed → Armed { remaining - 1 }       (ProbeFailed)
//! Armed { 0 }         → Exhausted, listener closed    (Exhausted)
//! listener closed elsewhere → watchdog stops
//! ```

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;

use crate::health::probe::{Probe, ProbeOutcome};
use crate::net::listener::ListenerHandle;
use crate::observability::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    Disabled,
    Armed { remaining: u32 },
    Exhausted,
}

/// Observable state machine transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchdogEvent {
    ProbeFailed { remaining: u32, outcome: ProbeOutcome },
    BackOnline,
    Exhausted,
}

/// Consecutive-failure bookkeeping, kept apart from timing.
#[derive(Debug, Clone, Copy)]
struct Countdown {
    budget: u32,
    remaining: u32,
}

impl Countdown {
    fn new(budget: u32) -> Self {
        Self { budget, remaining: budget }
    }

    fn state(&self) -> WatchdogState {
        if self.remaining == 0 {
            WatchdogState::Exhausted
        } else {
            WatchdogState::Armed { remaining: self.remaining }
        }
    }

    fn observe(&mut self, outcome: ProbeOutcome) -> Option<WatchdogEvent> {
        if outcome.is_healthy() {
            let recovered = self.remaining != self.budget;
            self.remaining = self.budget;
            return recovered.then_some(WatchdogEvent::BackOnline);
        }

        self.remaining = self.remaining.saturating_sub(1);
        Some(WatchdogEvent::ProbeFailed {
            remaining: self.remaining,
            outcome,
        })
    }
}

/// Closes a listener whose health endpoint stops answering.
pub struct HealthWatchdog<P> {
    probe: P,
    interval: Duration,
    budget: u32,
    events: Option<mpsc::UnboundedSender<WatchdogEvent>>,
}

impl<P: Probe> HealthWatchdog<P> {
    pub fn new(probe: P, interval: Duration, budget: u32) -> Self {
        Self {
            probe,
            interval,
            budget,
            events: None,
        }
    }

    /// Also publish every transition on `events`.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<WatchdogEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Run in the background. Returns `None` when the watchdog is disabled.
    pub fn spawn(self, handle: ListenerHandle) -> Option<JoinHandle<WatchdogState>> {
        if self.interval.is_zero() {
            return None;
        }
        Some(tokio::spawn(self.run(handle)))
    }

    pub async fn run(self, handle: ListenerHandle) -> WatchdogState {
        if self.interval.is_zero() {
            return WatchdogState::Disabled;
        }

        // Warm-up: triggers lazy connection and certificate setup on the far
        // side. Its outcome does not count.
        let warm_up = self.probe_once().await;
        tracing::debug!(outcome = %warm_up, "Warm-up health probe");

        let mut countdown = Countdown::new(self.budget);
        while countdown.remaining > 0 {
            tokio::select! {
                _ = time::sleep(self.interval) => {}
                _ = handle.closed() => {
                    tracing::debug!("Listener closed, health watchdog stopping");
                    return countdown.state();
                }
            }

            let outcome = self.probe_once().await;
            if let Some(event) = countdown.observe(outcome) {
                self.report(event);
            }
        }

        tracing::info!("max retry reached");
        self.report(WatchdogEvent::Exhausted);
        tracing::info!("closing the listener");
        handle.close();
        WatchdogState::Exhausted
    }

    async fn probe_once(&self) -> ProbeOutcome {
        match time::timeout(self.interval, self.probe.probe()).await {
            Ok(outcome) => outcome,
            Err(_) => ProbeOutcome::Unreachable(format!("no response within {:?}", self.interval)),
        }
    }

    fn report(&self, event: WatchdogEvent) {
        match &event {
            WatchdogEvent::ProbeFailed { remaining, outcome } => {
                metrics::record_probe_failure();
                tracing::info!(remaining = *remaining, reason = %outcome, "Health probe failed");
            }
            WatchdogEvent::BackOnline => tracing::info!("back online"),
            WatchdogEvent::Exhausted => metrics::record_watchdog_exhausted(),
        }

        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

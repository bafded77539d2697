//! Single-deadline phase timer for bunker rooms.
//!
//! A game session owns at most one outstanding deadline, described by an
//! [`ArmedTimer`] (kind, wall-clock end, version). `PhaseTimer` turns that
//! description into a real `tokio::time` sleep and hands the version back
//! when it fires, so the session can tell a current expiry from a stale one.
//!
//! # Integration
//!
//! The timer is designed to sit inside a room actor's `tokio::select!` loop
//! and be re-synced after every engine call:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => {
//!             /* handle commands */
//!             timer.sync(engine.current_timer(), clock.now_ms());
//!         }
//!         fired = timer.wait() => {
//!             engine.handle_timer_expired(clock.now_ms(), fired.version)?;
//!             timer.sync(engine.current_timer(), clock.now_ms());
//!         }
//!     }
//! }
//! ```

use std::time::Duration;

use bunker_engine::{ArmedTimer, Clock, TimerKind};
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TimerConfig {
    /// A warning is logged when a deadline fires later than this.
    pub late_warn_threshold: Duration,
    /// Added to every deadline so the wall clock has passed `ends_at` by
    /// the time the session checks it.
    pub grace: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            late_warn_threshold: Duration::from_millis(250),
            grace: Duration::from_millis(5),
        }
    }
}

// ---------------------------------------------------------------------------
// Fired
// ---------------------------------------------------------------------------

/// A deadline that has been reached, returned by [`PhaseTimer::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub kind: TimerKind,
    /// Pass back to the session unchanged.
    pub version: u64,
    /// The wall-clock deadline, milliseconds since the Unix epoch.
    pub ends_at: i64,
    /// How late the sleep woke up.
    pub late_by: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct TimerMetrics {
    pub total_armed: u64,
    pub total_fired: u64,
    /// Deadlines replaced or cleared before they fired.
    pub total_superseded: u64,
    pub total_late: u64,
}

// ---------------------------------------------------------------------------
// PhaseTimer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Pending {
    timer: ArmedTimer,
    deadline: TokioInstant,
}

/// One-shot timer mirroring a session's armed deadline. One per room.
#[derive(Debug, Default)]
pub struct PhaseTimer {
    config: TimerConfig,
    pending: Option<Pending>,
    metrics: TimerMetrics,
}

impl PhaseTimer {
    pub fn new(config: TimerConfig) -> Self {
        Self {
            config,
            pending: None,
            metrics: TimerMetrics::default(),
        }
    }

    /// Mirrors the session's current deadline.
    ///
    /// The same version keeps the running sleep; a new version re-arms it
    /// relative to `now_ms`; `None` disarms.
    pub fn sync(&mut self, armed: Option<ArmedTimer>, now_ms: i64) {
        match (self.pending, armed) {
            (Some(pending), Some(armed)) if pending.timer.version == armed.version => {}
            (pending, Some(armed)) => {
                if pending.is_some() {
                    self.metrics.total_superseded += 1;
                }
                let remaining = u64::try_from(armed.ends_at.saturating_sub(now_ms)).unwrap_or(0);
                let deadline = TokioInstant::now() + Duration::from_millis(remaining) + self.config.grace;
                self.pending = Some(Pending {
                    timer: armed,
                    deadline,
                });
                self.metrics.total_armed += 1;
                debug!(kind = %armed.kind, version = armed.version, remaining_ms = remaining, "phase timer armed");
            }
            (Some(pending), None) => {
                self.pending = None;
                self.metrics.total_superseded += 1;
                debug!(kind = %pending.timer.kind, version = pending.timer.version, "phase timer cleared");
            }
            (None, None) => {}
        }
    }

    /// Drops the pending deadline without firing it.
    pub fn clear(&mut self, now_ms: i64) {
        self.sync(None, now_ms);
    }

    /// Waits for the pending deadline and disarms.
    ///
    /// Pends forever while nothing is armed; `tokio::select!` keeps
    /// polling its other branches.
    pub async fn wait(&mut self) -> TimerFired {
        let Some(pending) = self.pending else {
            std::future::pending::<()>().await;
            unreachable!()
        };

        time::sleep_until(pending.deadline).await;

        let late_by = TokioInstant::now().saturating_duration_since(pending.deadline);
        self.pending = None;
        self.metrics.total_fired += 1;
        if late_by > self.config.late_warn_threshold {
            self.metrics.total_late += 1;
            warn!(
                kind = %pending.timer.kind,
                version = pending.timer.version,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "phase timer fired late"
            );
        }
        trace!(kind = %pending.timer.kind, version = pending.timer.version, "phase timer fired");

        TimerFired {
            kind: pending.timer.kind,
            version: pending.timer.version,
            ends_at: pending.timer.ends_at,
            late_by,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// The deadline currently mirrored, if any.
    pub fn armed(&self) -> Option<ArmedTimer> {
        self.pending.map(|p| p.timer)
    }

    /// Time left before the pending deadline fires.
    pub fn remaining(&self) -> Option<Duration> {
        self.pending
            .map(|p| p.deadline.saturating_duration_since(TokioInstant::now()))
    }

    pub fn metrics(&self) -> &TimerMetrics {
        &self.metrics
    }
}

// ---------------------------------------------------------------------------
// TokioClock
// ---------------------------------------------------------------------------

/// A session clock that follows `tokio::time` from a fixed epoch offset.
///
/// Pausing or advancing the runtime's time moves this clock too, so a room
/// running on a paused test runtime sees its deadlines pass.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin_ms: i64,
    origin: TokioInstant,
}

impl TokioClock {
    /// Starts at `origin_ms` milliseconds since the Unix epoch.
    pub fn starting_at(origin_ms: i64) -> Self {
        Self {
            origin_ms,
            origin: TokioInstant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> i64 {
        let elapsed = TokioInstant::now().saturating_duration_since(self.origin);
        self.origin_ms
            .saturating_add(i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
    }
}

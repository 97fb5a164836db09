// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Tycoon Economy Simulation Suite ("The Backdrop") - Tick Scheduler
//
// The scheduler is the only driver of the simulation: the host loop calls
// poll() (or manual_ticks() for wall-clock-free replay) and each fired tick
// is fanned out to the subscriber registry in strict registration order.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use tracing::{error, warn};

use crate::types::TickContext;

// ─── Constants ───────────────────────────────────────────────────────────────

/// Nominal tick interval: 10 ticks per second.
pub const DEFAULT_TICK_INTERVAL_SECS: f64 = 0.1;

/// Upper bound on a single delta. A host suspend/resume produces one clamped
/// tick instead of a spiral of catch-up work.
pub const DEFAULT_MAX_DELTA_SECS: f64 = 1.0;

/// Callback invoked once per tick.
pub type TickHandler = Box<dyn FnMut(&TickContext)>;

// ─── TickScheduler ───────────────────────────────────────────────────────────

/// Fixed-rate tick source with drift-compensated deltas and an
/// insertion-ordered subscriber registry.
///
/// Subscribers run in registration order on every tick; ordering-sensitive
/// consumers must register after the subsystems they depend on. A panicking
/// subscriber is caught and logged and never aborts the tick or skips the
/// remaining subscribers.
pub struct TickScheduler {
    interval_secs: f64,
    max_delta_secs: f64,
    running: bool,
    tick_count: u64,
    elapsed_secs: f64,
    /// Scheduler-clock timestamp of the last fired tick.
    last_timestamp: Option<f64>,
    /// Wall-clock anchor backing `poll()`.
    clock_anchor: Option<Instant>,
    subscribers: Vec<(String, TickHandler)>,
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::with_interval(DEFAULT_TICK_INTERVAL_SECS, DEFAULT_MAX_DELTA_SECS)
    }

    /// Build with an explicit interval and delta clamp. Non-positive or
    /// non-finite values fall back to the defaults.
    pub fn with_interval(interval_secs: f64, max_delta_secs: f64) -> Self {
        let interval = if interval_secs > 0.0 && interval_secs.is_finite() {
            interval_secs
        } else {
            warn!(
                interval_secs,
                "invalid tick interval, using {}s", DEFAULT_TICK_INTERVAL_SECS
            );
            DEFAULT_TICK_INTERVAL_SECS
        };
        let max_delta = if max_delta_secs > 0.0 && max_delta_secs.is_finite() {
            max_delta_secs
        } else {
            warn!(
                max_delta_secs,
                "invalid max delta, using {}s", DEFAULT_MAX_DELTA_SECS
            );
            DEFAULT_MAX_DELTA_SECS
        };
        Self {
            interval_secs: interval,
            max_delta_secs: max_delta,
            running: false,
            tick_count: 0,
            elapsed_secs: 0.0,
            last_timestamp: None,
            clock_anchor: None,
            subscribers: Vec::new(),
        }
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────────

    /// Begin ticking. Idempotent: calling `start()` while running is a no-op.
    /// The first delta after a (re)start is the nominal interval, so time
    /// spent paused is never counted.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.last_timestamp = None;
        self.clock_anchor.get_or_insert_with(Instant::now);
    }

    /// Stop firing while preserving tick count and elapsed time. Idempotent.
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Pause and additionally reset tick count and elapsed time to zero.
    pub fn stop(&mut self) {
        self.running = false;
        self.tick_count = 0;
        self.elapsed_secs = 0.0;
        self.last_timestamp = None;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    pub fn interval_secs(&self) -> f64 {
        self.interval_secs
    }

    // ─── Subscriber registry ─────────────────────────────────────────────────

    /// Register a tick handler under a string id. Re-subscribing an existing
    /// id replaces the handler in place, keeping its position in the dispatch
    /// order. Dispatch order is registration order; that ordering is part of
    /// the contract.
    pub fn subscribe(&mut self, id: &str, handler: TickHandler) {
        if let Some(slot) = self.subscribers.iter_mut().find(|(sid, _)| sid == id) {
            slot.1 = handler;
        } else {
            self.subscribers.push((id.to_string(), handler));
        }
    }

    /// Remove a handler. Unknown ids are a no-op.
    pub fn unsubscribe(&mut self, id: &str) {
        self.subscribers.retain(|(sid, _)| sid != id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    // ─── Driving ─────────────────────────────────────────────────────────────

    /// Fire at most one tick if the nominal interval has elapsed on the wall
    /// clock. Returns `true` when a tick fired. The host loop calls this.
    pub fn poll(&mut self) -> bool {
        if !self.running {
            return false;
        }
        let now = match &self.clock_anchor {
            Some(anchor) => anchor.elapsed().as_secs_f64(),
            None => return false,
        };
        self.advance_to(now)
    }

    /// Clock-explicit variant of `poll()`: advance to `now_secs` on the
    /// scheduler's own timeline. Fires at most one tick. Deltas are
    /// drift-compensated: the real gap since the last tick is used, clamped
    /// to `max_delta`; a negative gap (host clock adjustment) is replaced by
    /// the nominal interval.
    pub fn advance_to(&mut self, now_secs: f64) -> bool {
        if !self.running {
            return false;
        }
        let last = match self.last_timestamp {
            Some(t) => t,
            None => {
                // First observation after start: anchor only.
                self.last_timestamp = Some(now_secs);
                return false;
            }
        };

        let raw_delta = now_secs - last;
        if raw_delta < 0.0 {
            warn!(raw_delta, "clock went backwards, substituting nominal interval");
            self.last_timestamp = Some(now_secs);
            self.fire(self.interval_secs, now_secs);
            return true;
        }
        if raw_delta < self.interval_secs {
            return false;
        }
        self.last_timestamp = Some(now_secs);
        self.fire(raw_delta.min(self.max_delta_secs), now_secs);
        true
    }

    /// Synchronously replay `count` ticks with a fixed delta, bypassing the
    /// wall clock. Used for deterministic offline-progress replay and tests.
    /// Works whether or not the scheduler is running.
    pub fn manual_ticks(&mut self, count: u32, fixed_delta: f64) {
        let delta = if fixed_delta.is_finite() && fixed_delta >= 0.0 {
            fixed_delta
        } else {
            warn!(fixed_delta, "invalid manual delta, using 0.0");
            0.0
        };
        for _ in 0..count {
            let timestamp = self.elapsed_secs + delta;
            self.fire(delta, timestamp);
        }
    }

    /// Advance counters and fan the tick out to every subscriber, in order,
    /// each behind a fault boundary.
    fn fire(&mut self, delta_secs: f64, timestamp_secs: f64) {
        self.tick_count += 1;
        self.elapsed_secs += delta_secs;

        let ctx = TickContext {
            delta_secs,
            tick: self.tick_count,
            elapsed_secs: self.elapsed_secs,
            timestamp_secs,
        };

        for (id, handler) in self.subscribers.iter_mut() {
            let result = catch_unwind(AssertUnwindSafe(|| handler(&ctx)));
            if result.is_err() {
                // The scheduler drives unrelated domains; one failing
                // subscriber must not cascade into the others.
                error!(subscriber = %id, tick = ctx.tick, "tick subscriber panicked");
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Tycoon Economy Simulation Suite ("The Backdrop") - Random Event Engine
//
// Rolls independent probability checks against an immutable event catalog on
// an amortized interval, tracks active/pending-choice lifecycles and
// cooldowns, and answers aggregate multiplicative/additive effect queries.

use tracing::{debug, warn};

use crate::error::EngineError;
use crate::rng::SimRng;
use crate::types::{ActiveEvent, EventEffect, EventSystemState, GameEventDef};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Catalog scan cadence, in ticks. Rolls are amortized, not per-tick.
pub const DEFAULT_EVAL_INTERVAL: u64 = 10;

/// Global cap on concurrently active events.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

// ---------------------------------------------------------------------------
// Tick report
// ---------------------------------------------------------------------------

/// What changed during one tick. `ended` is the `on_event_end` notification:
/// each id appears exactly once, on the tick its event expired.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTickReport {
    /// Events activated this tick (immediate activations only).
    pub started: Vec<String>,
    /// Events that reached zero remaining ticks and were removed.
    pub ended: Vec<String>,
    /// Events newly enqueued for an accept/decline choice.
    pub pending: Vec<String>,
}

// ---------------------------------------------------------------------------
// EventEngine
// ---------------------------------------------------------------------------

/// The probabilistic event scheduler. Owns its runtime state exclusively;
/// snapshots go in and out as defensive copies.
#[derive(Debug, Clone)]
pub struct EventEngine {
    catalog: Vec<GameEventDef>,
    state: EventSystemState,
    eval_interval: u64,
    max_concurrent: usize,
    rng: SimRng,
}

impl EventEngine {
    pub fn new(catalog: Vec<GameEventDef>) -> Self {
        Self::from_parts(catalog, SimRng::from_entropy())
    }

    /// Deterministic construction for replay and tests.
    pub fn with_seed(catalog: Vec<GameEventDef>, seed: u64) -> Self {
        Self::from_parts(catalog, SimRng::seed_from_u64(seed))
    }

    fn from_parts(catalog: Vec<GameEventDef>, rng: SimRng) -> Self {
        let catalog = catalog
            .into_iter()
            .map(|mut def| {
                if !(0.0..=1.0).contains(&def.probability) {
                    warn!(
                        event = %def.id,
                        probability = def.probability,
                        "probability clamped into [0, 1]"
                    );
                    def.probability = def.probability.clamp(0.0, 1.0);
                }
                if def.duration_ticks == 0 {
                    warn!(event = %def.id, "zero duration defaulted to 1 tick");
                    def.duration_ticks = 1;
                }
                def
            })
            .collect();
        Self {
            catalog,
            state: EventSystemState::default(),
            eval_interval: DEFAULT_EVAL_INTERVAL,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            rng,
        }
    }

    /// Override the catalog scan cadence. Zero is defaulted.
    pub fn set_eval_interval(&mut self, interval: u64) {
        self.eval_interval = if interval == 0 {
            warn!("eval interval of 0 defaulted to {}", DEFAULT_EVAL_INTERVAL);
            DEFAULT_EVAL_INTERVAL
        } else {
            interval
        };
    }

    pub fn set_max_concurrent(&mut self, cap: usize) {
        self.max_concurrent = cap;
    }

    // ─── Tick ────────────────────────────────────────────────────────────────

    /// Advance one tick: age active events, fire expirations, and on
    /// evaluation boundaries roll the catalog.
    pub fn tick(&mut self) -> EventTickReport {
        self.state.total_ticks += 1;
        let now = self.state.total_ticks;
        let mut report = EventTickReport::default();

        // Age actives; collect expirations.
        for event in self.state.active.iter_mut() {
            event.ticks_remaining = event.ticks_remaining.saturating_sub(1);
        }
        let mut still_active = Vec::with_capacity(self.state.active.len());
        for event in self.state.active.drain(..) {
            if event.ticks_remaining == 0 {
                debug!(event = %event.event_id, at_tick = now, "event ended");
                report.ended.push(event.event_id);
            } else {
                still_active.push(event);
            }
        }
        self.state.active = still_active;

        if now % self.eval_interval == 0 {
            self.evaluate(now, &mut report);
        }
        report
    }

    /// One catalog scan. Gates run in a fixed order per definition; the
    /// concurrency cap stops the whole scan since nothing could activate.
    fn evaluate(&mut self, now: u64, report: &mut EventTickReport) {
        for i in 0..self.catalog.len() {
            let def = &self.catalog[i];
            if now < def.min_game_ticks {
                continue;
            }
            if let Some(&eligible_at) = self.state.cooldowns.get(&def.id) {
                if now < eligible_at {
                    continue;
                }
            }
            if def.unique && self.is_engaged(&def.id) {
                continue;
            }
            if self.state.active.len() >= self.max_concurrent {
                break;
            }
            if self.rng.next_f64() < def.probability {
                let def = self.catalog[i].clone();
                if def.requires_choice {
                    if !self.state.pending_choice.contains(&def.id) {
                        debug!(event = %def.id, at_tick = now, "event pending choice");
                        self.state.pending_choice.push(def.id.clone());
                        report.pending.push(def.id);
                    }
                } else {
                    self.activate(&def, now);
                    report.started.push(def.id);
                }
            }
        }
    }

    fn is_engaged(&self, id: &str) -> bool {
        self.state.active.iter().any(|e| e.event_id == id)
            || self.state.pending_choice.iter().any(|p| p == id)
    }

    /// Start the event and record its cooldown. The cooldown clock begins
    /// only after the active duration ends.
    fn activate(&mut self, def: &GameEventDef, now: u64) {
        debug!(event = %def.id, at_tick = now, duration = def.duration_ticks, "event activated");
        self.state.active.push(ActiveEvent {
            event_id: def.id.clone(),
            ticks_remaining: def.duration_ticks,
            started_at: now,
            effects: def.effects.clone(),
        });
        self.state
            .cooldowns
            .insert(def.id.clone(), now + def.duration_ticks + def.cooldown_ticks);
    }

    // ─── Choice resolution ───────────────────────────────────────────────────

    /// Accept a pending-choice event, activating it immediately.
    pub fn accept_event(&mut self, id: &str) -> Result<(), EngineError> {
        self.take_pending(id)?;
        let def = self
            .find_def(id)
            .ok_or_else(|| EngineError::UnknownEvent(id.to_string()))?
            .clone();
        let now = self.state.total_ticks;
        self.activate(&def, now);
        Ok(())
    }

    /// Decline a pending-choice event. The cooldown starts immediately and
    /// the decline effects are returned for the caller to apply exactly once.
    pub fn decline_event(&mut self, id: &str) -> Result<Vec<EventEffect>, EngineError> {
        self.take_pending(id)?;
        let def = self
            .find_def(id)
            .ok_or_else(|| EngineError::UnknownEvent(id.to_string()))?;
        let decline_effects = def.decline_effects.clone();
        let cooldown = def.cooldown_ticks;
        let now = self.state.total_ticks;
        self.state.cooldowns.insert(id.to_string(), now + cooldown);
        debug!(event = %id, at_tick = now, "event declined");
        Ok(decline_effects)
    }

    fn take_pending(&mut self, id: &str) -> Result<(), EngineError> {
        let pos = self
            .state
            .pending_choice
            .iter()
            .position(|p| p == id)
            .ok_or_else(|| {
                if self.find_def(id).is_some() {
                    EngineError::NotPendingChoice(id.to_string())
                } else {
                    EngineError::UnknownEvent(id.to_string())
                }
            })?;
        self.state.pending_choice.remove(pos);
        Ok(())
    }

    fn find_def(&self, id: &str) -> Option<&GameEventDef> {
        self.catalog.iter().find(|d| d.id == id)
    }

    // ─── Effect queries ──────────────────────────────────────────────────────

    /// Product of all matching active effect values. Neutral default 1.0.
    pub fn multiplier(&self, kind: &str, target: Option<&str>) -> f64 {
        self.matching_effects(kind, target)
            .fold(1.0, |acc, e| acc * e.value)
    }

    /// Sum of all matching active effect values. Neutral default 0.0.
    pub fn additive_bonus(&self, kind: &str, target: Option<&str>) -> f64 {
        self.matching_effects(kind, target).map(|e| e.value).sum()
    }

    fn matching_effects<'a>(
        &'a self,
        kind: &'a str,
        target: Option<&'a str>,
    ) -> impl Iterator<Item = &'a EventEffect> {
        self.state
            .active
            .iter()
            .flat_map(|e| e.effects.iter())
            .filter(move |e| {
                e.kind == kind
                    && match (&e.target, target) {
                        // Untargeted effects match every query of their kind.
                        (None, _) => true,
                        (Some(t), Some(q)) => t == q,
                        (Some(_), None) => false,
                    }
            })
    }

    // ─── State access ────────────────────────────────────────────────────────

    pub fn is_active(&self, id: &str) -> bool {
        self.state.active.iter().any(|e| e.event_id == id)
    }

    pub fn active_events(&self) -> Vec<ActiveEvent> {
        self.state.active.clone()
    }

    pub fn pending_choices(&self) -> Vec<String> {
        self.state.pending_choice.clone()
    }

    pub fn total_ticks(&self) -> u64 {
        self.state.total_ticks
    }

    pub fn catalog(&self) -> &[GameEventDef] {
        &self.catalog
    }

    /// Defensive copy of the runtime state.
    pub fn get_state(&self) -> EventSystemState {
        self.state.clone()
    }

    /// Replace the runtime state from a snapshot (taken by value, so the
    /// caller's copy stays independent). Unknown event ids are kept; they
    /// simply never match the catalog again.
    pub fn set_state(&mut self, state: EventSystemState) {
        self.state = state;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

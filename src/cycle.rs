// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Tycoon Economy Simulation Suite ("The Backdrop") - Macro Cycle Model
//
// 4-phase macroeconomic state machine (expansion -> peak -> contraction ->
// trough -> ...). Every tick nudges confidence, interest, and inflation
// toward phase-specific targets by exponential smoothing, so downstream
// consumers never observe a discontinuity. Phase durations are re-rolled
// uniformly from a per-phase range on each entry.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::rng::SimRng;
use crate::types::{safe_div, CyclePhase, EconomyState};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Default in-game ticks per simulated year: 252 trading days at 120 ticks
/// per day.
pub const DEFAULT_TICKS_PER_YEAR: f64 = 30_240.0;

/// Exponential-smoothing speed for rate interpolation.
const DEFAULT_SMOOTHING_SPEED: f64 = 0.002;

/// Wage index lerp speed; deliberately slower than the smoothing speed so
/// wages lag prices.
const DEFAULT_WAGE_LAG_SPEED: f64 = 0.0008;

const DEFAULT_TAX_RATE: f64 = 0.15;

/// Flat margin over the central rate charged on loans.
const LOAN_MARGIN: f64 = 0.035;

/// Compounding ceiling; the index stops growing here instead of overflowing.
const MAX_INFLATION_INDEX: f64 = 1.0e12;

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CycleConfig {
    pub ticks_per_year: f64,
    pub smoothing_speed: f64,
    pub wage_lag_speed: f64,
    pub tax_rate: f64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            ticks_per_year: DEFAULT_TICKS_PER_YEAR,
            smoothing_speed: DEFAULT_SMOOTHING_SPEED,
            wage_lag_speed: DEFAULT_WAGE_LAG_SPEED,
            tax_rate: DEFAULT_TAX_RATE,
        }
    }
}

impl CycleConfig {
    /// Replace zero/negative/non-finite fields with defaults instead of
    /// letting them reach a divisor.
    fn sanitized(mut self) -> Self {
        if !(self.ticks_per_year > 0.0) || !self.ticks_per_year.is_finite() {
            warn!(
                ticks_per_year = self.ticks_per_year,
                "invalid ticks_per_year, using {}", DEFAULT_TICKS_PER_YEAR
            );
            self.ticks_per_year = DEFAULT_TICKS_PER_YEAR;
        }
        if !(self.smoothing_speed > 0.0) || self.smoothing_speed > 1.0 {
            self.smoothing_speed = DEFAULT_SMOOTHING_SPEED;
        }
        if !(self.wage_lag_speed > 0.0) || self.wage_lag_speed > 1.0 {
            self.wage_lag_speed = DEFAULT_WAGE_LAG_SPEED;
        }
        if !(0.0..=1.0).contains(&self.tax_rate) {
            self.tax_rate = DEFAULT_TAX_RATE;
        }
        self
    }
}

// ─── CycleModel ──────────────────────────────────────────────────────────────

/// The macroeconomic cycle simulator. Owns its state exclusively; external
/// reads go through getters returning copies.
#[derive(Debug, Clone)]
pub struct CycleModel {
    config: CycleConfig,
    state: EconomyState,
    rng: SimRng,
}

impl Default for CycleModel {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleModel {
    pub fn new() -> Self {
        Self::from_parts(CycleConfig::default(), SimRng::from_entropy())
    }

    pub fn with_config(config: CycleConfig) -> Self {
        Self::from_parts(config, SimRng::from_entropy())
    }

    /// Deterministic construction for replay and tests.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_parts(CycleConfig::default(), SimRng::seed_from_u64(seed))
    }

    pub fn with_config_and_seed(config: CycleConfig, seed: u64) -> Self {
        Self::from_parts(config, SimRng::seed_from_u64(seed))
    }

    fn from_parts(config: CycleConfig, mut rng: SimRng) -> Self {
        let config = config.sanitized();
        let mut state = EconomyState {
            tax_rate: config.tax_rate,
            ..EconomyState::default()
        };
        state.cycle_phase_duration = draw_duration(state.cycle_phase, &mut rng);
        Self { config, state, rng }
    }

    // ─── Tick ────────────────────────────────────────────────────────────────

    /// Advance the economy by one tick.
    pub fn tick(&mut self) {
        let targets = self.state.cycle_phase.targets();
        let speed = self.config.smoothing_speed;

        self.state.consumer_confidence = approach(
            self.state.consumer_confidence,
            targets.consumer_confidence,
            speed,
        );
        self.state.interest_rate =
            approach(self.state.interest_rate, targets.interest_rate, speed);
        self.state.inflation_rate =
            approach(self.state.inflation_rate, targets.inflation_rate, speed);

        // Annualized inflation compounds per tick. The index is clamped well
        // before f64 overflow territory.
        let per_tick =
            1.0 + safe_div(self.state.inflation_rate, self.config.ticks_per_year);
        self.state.inflation_index =
            (self.state.inflation_index * per_tick).min(MAX_INFLATION_INDEX);

        self.state.wage_index = approach(
            self.state.wage_index,
            self.state.inflation_index,
            self.config.wage_lag_speed,
        );

        self.state.total_ticks += 1;
        self.state.cycle_ticks_elapsed += 1;
        if self.state.cycle_ticks_elapsed >= self.state.cycle_phase_duration {
            self.advance_phase();
        }
    }

    fn advance_phase(&mut self) {
        let next = self.state.cycle_phase.next();
        debug!(
            from = self.state.cycle_phase.label(),
            to = next.label(),
            at_tick = self.state.total_ticks,
            "cycle phase transition"
        );
        self.state.cycle_phase = next;
        self.state.cycle_ticks_elapsed = 0;
        self.state.cycle_phase_duration = draw_duration(next, &mut self.rng);
    }

    // ─── Integration surface ─────────────────────────────────────────────────

    /// Annualized rate charged on new loans.
    pub fn loan_rate(&self) -> f64 {
        self.state.interest_rate + LOAN_MARGIN
    }

    /// Demand multiplier applied by downstream consumers; equals consumer
    /// confidence.
    pub fn demand_multiplier(&self) -> f64 {
        self.state.consumer_confidence
    }

    /// Cost multiplier; equals the cumulative inflation index.
    pub fn cost_multiplier(&self) -> f64 {
        self.state.inflation_index
    }

    /// Wage multiplier; the lagging wage index.
    pub fn wage_multiplier(&self) -> f64 {
        self.state.wage_index
    }

    pub fn tax_rate(&self) -> f64 {
        self.state.tax_rate
    }

    pub fn phase(&self) -> CyclePhase {
        self.state.cycle_phase
    }

    /// Defensive copy of the full state, never a live reference.
    pub fn state(&self) -> EconomyState {
        self.state.clone()
    }

    // ─── Persistence ─────────────────────────────────────────────────────────

    pub fn serialize(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(&self.state)?)
    }

    /// Restore from a snapshot. Missing fields merge with defaults; a
    /// hard-malformed payload logs a warning and yields a default model
    /// rather than failing.
    pub fn deserialize(json: &str) -> Self {
        Self::deserialize_with_config(CycleConfig::default(), json)
    }

    pub fn deserialize_with_config(config: CycleConfig, json: &str) -> Self {
        let mut model = Self::with_config(config);
        match serde_json::from_str::<EconomyState>(json) {
            Ok(state) => {
                model.state = state;
                if model.state.cycle_phase_duration == 0 {
                    model.state.cycle_phase_duration =
                        draw_duration(model.state.cycle_phase, &mut model.rng);
                }
            }
            Err(err) => {
                warn!(%err, "malformed cycle snapshot, starting from defaults");
            }
        }
        model
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Exponential smoothing step: move `current` a fixed fraction of the way to
/// `target`. Never snaps.
fn approach(current: f64, target: f64, speed: f64) -> f64 {
    current + (target - current) * speed
}

fn draw_duration(phase: CyclePhase, rng: &mut SimRng) -> u32 {
    let (min, max) = phase.duration_range();
    rng.range_u32(min, max)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

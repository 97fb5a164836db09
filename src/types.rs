// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Tycoon Economy Simulation Suite ("The Backdrop") - Type Definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─── TickContext ─────────────────────────────────────────────────────────────

/// Per-tick timing info handed to every scheduler subscriber.
/// Built fresh each tick, never retained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickContext {
    /// Seconds since the previous tick, after clamping.
    pub delta_secs: f64,
    /// 1-based tick number.
    pub tick: u64,
    /// Accumulated simulated seconds since start (or last `stop()`).
    pub elapsed_secs: f64,
    /// Scheduler-clock timestamp of this tick, in seconds.
    pub timestamp_secs: f64,
}

// ─── Cycle Phase ─────────────────────────────────────────────────────────────

/// Macroeconomic cycle phase. The order is fixed and cyclic; phases never
/// skip or reverse.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CyclePhase {
    Expansion = 0,
    Peak = 1,
    Contraction = 2,
    Trough = 3,
}

impl Default for CyclePhase {
    fn default() -> Self {
        CyclePhase::Expansion
    }
}

/// Per-tick interpolation targets for one cycle phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseTargets {
    pub consumer_confidence: f64,
    pub interest_rate: f64,
    pub inflation_rate: f64,
}

impl CyclePhase {
    pub fn next(self) -> Self {
        match self {
            Self::Expansion => Self::Peak,
            Self::Peak => Self::Contraction,
            Self::Contraction => Self::Trough,
            Self::Trough => Self::Expansion,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Expansion => "EXPANSION",
            Self::Peak => "PEAK",
            Self::Contraction => "CONTRACTION",
            Self::Trough => "TROUGH",
        }
    }

    /// Interpolation targets the economy drifts toward while in this phase.
    pub fn targets(self) -> PhaseTargets {
        match self {
            Self::Expansion => PhaseTargets {
                consumer_confidence: 1.10,
                interest_rate: 0.040,
                inflation_rate: 0.030,
            },
            Self::Peak => PhaseTargets {
                consumer_confidence: 1.20,
                interest_rate: 0.060,
                inflation_rate: 0.050,
            },
            Self::Contraction => PhaseTargets {
                consumer_confidence: 0.85,
                interest_rate: 0.050,
                inflation_rate: 0.015,
            },
            Self::Trough => PhaseTargets {
                consumer_confidence: 0.70,
                interest_rate: 0.015,
                inflation_rate: 0.005,
            },
        }
    }

    /// Inclusive `[min, max]` tick range the phase duration is drawn from on
    /// entry.
    pub fn duration_range(self) -> (u32, u32) {
        match self {
            Self::Expansion => (3000, 6000),
            Self::Peak => (1000, 2400),
            Self::Contraction => (2000, 4500),
            Self::Trough => (1200, 3000),
        }
    }
}

// ─── EconomyState ────────────────────────────────────────────────────────────

/// Full macro-economy snapshot. Created once at construction, mutated every
/// tick. Missing fields in older snapshots merge with these defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EconomyState {
    /// Annualized inflation rate.
    pub inflation_rate: f64,
    /// Cumulative price index, monotonic under positive inflation.
    pub inflation_index: f64,
    /// Annualized central rate.
    pub interest_rate: f64,
    /// Demand multiplier seen by downstream consumers.
    pub consumer_confidence: f64,
    pub cycle_phase: CyclePhase,
    /// Ticks spent in the current phase; stays below `cycle_phase_duration`
    /// except in the instant a transition fires.
    pub cycle_ticks_elapsed: u32,
    /// Duration of the current phase, re-rolled on each phase entry.
    pub cycle_phase_duration: u32,
    pub total_ticks: u64,
    pub tax_rate: f64,
    /// Tracks `inflation_index` with a lag; wages trail prices.
    pub wage_index: f64,
}

impl Default for EconomyState {
    fn default() -> Self {
        Self {
            inflation_rate: 0.02,
            inflation_index: 1.0,
            interest_rate: 0.03,
            consumer_confidence: 1.0,
            cycle_phase: CyclePhase::Expansion,
            cycle_ticks_elapsed: 0,
            cycle_phase_duration: 4000,
            total_ticks: 0,
            tax_rate: 0.15,
            wage_index: 1.0,
        }
    }
}

// ─── Market Condition ────────────────────────────────────────────────────────

/// Market-wide regime. Each condition carries a fixed additive drift modifier
/// and a multiplicative volatility modifier applied to every asset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MarketCondition {
    Normal = 0,
    Bull = 1,
    Bear = 2,
    Crash = 3,
    Bubble = 4,
}

impl Default for MarketCondition {
    fn default() -> Self {
        MarketCondition::Normal
    }
}

impl MarketCondition {
    /// Annualized drift added to every asset while the condition is active.
    pub fn drift_mod(self) -> f64 {
        match self {
            Self::Normal => 0.0,
            Self::Bull => 0.25,
            Self::Bear => -0.25,
            Self::Crash => -1.50,
            Self::Bubble => 0.90,
        }
    }

    /// Factor applied to every asset's volatility while active.
    pub fn vol_mod(self) -> f64 {
        match self {
            Self::Normal => 1.0,
            Self::Bull => 0.90,
            Self::Bear => 1.25,
            Self::Crash => 2.50,
            Self::Bubble => 1.75,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Bull => "BULL",
            Self::Bear => "BEAR",
            Self::Crash => "CRASH",
            Self::Bubble => "BUBBLE",
        }
    }
}

// ─── Asset Configuration ─────────────────────────────────────────────────────

fn default_tick_history_capacity() -> usize {
    600
}
fn default_daily_history_capacity() -> usize {
    365
}
fn default_candle_capacity() -> usize {
    180
}

/// Immutable per-asset parameters, registered once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetConfig {
    pub id: String,
    pub sector: String,
    pub base_price: f64,
    /// Annualized expected return.
    pub drift: f64,
    /// Annualized return standard deviation.
    pub volatility: f64,
    /// Hard price floor; `current_price` never goes below it.
    pub min_price: f64,
    #[serde(default = "default_tick_history_capacity")]
    pub tick_history_capacity: usize,
    #[serde(default = "default_daily_history_capacity")]
    pub daily_history_capacity: usize,
    #[serde(default = "default_candle_capacity")]
    pub candle_capacity: usize,
    #[serde(default)]
    pub dividend_yield: f64,
    #[serde(default)]
    pub staking_yield: f64,
}

impl AssetConfig {
    /// A config with typical capacities; callers override fields as needed.
    pub fn new(id: &str, sector: &str, base_price: f64) -> Self {
        Self {
            id: id.to_string(),
            sector: sector.to_string(),
            base_price,
            drift: 0.05,
            volatility: 0.30,
            min_price: 0.01,
            tick_history_capacity: default_tick_history_capacity(),
            daily_history_capacity: default_daily_history_capacity(),
            candle_capacity: default_candle_capacity(),
            dividend_yield: 0.0,
            staking_yield: 0.0,
        }
    }
}

// ─── Candlestick ─────────────────────────────────────────────────────────────

/// OHLC summary over one in-game day. Candles are strictly sequential; a new
/// one opens at each daily boundary, seeded from the previous close.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CandlestickData {
    pub day: u64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Default for CandlestickData {
    fn default() -> Self {
        Self {
            day: 0,
            open: 0.0,
            high: 0.0,
            low: 0.0,
            close: 0.0,
        }
    }
}

impl CandlestickData {
    /// Open a fresh candle at `price` for the given day.
    pub fn open_at(price: f64, day: u64) -> Self {
        Self {
            day,
            open: price,
            high: price,
            low: price,
            close: price,
        }
    }

    /// Fold one traded price into the running high/low/close.
    pub fn absorb(&mut self, price: f64) {
        if price > self.high {
            self.high = price;
        }
        if price < self.low {
            self.low = price;
        }
        self.close = price;
    }
}

// ─── AssetState ──────────────────────────────────────────────────────────────

/// Mutable per-asset market state, evolved every tick for the lifetime of the
/// simulation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssetState {
    pub current_price: f64,
    pub previous_price: f64,
    /// Last tick's move, in percent.
    pub change_percent: f64,
    pub all_time_high: f64,
    pub all_time_low: f64,
    /// Bounded tick-resolution price ring; oldest evicted first.
    pub tick_history: Vec<f64>,
    /// Bounded daily-close ring.
    pub daily_history: Vec<f64>,
    /// Bounded closed-candle ring.
    pub candles: Vec<CandlestickData>,
    /// The in-progress candle for the current in-game day.
    pub current_candle: CandlestickData,
    pub cumulative_volume: f64,
    /// Tick at which the asset was registered; late registration starts its
    /// history fresh from here.
    pub registered_at_tick: u64,
}

impl Default for AssetState {
    fn default() -> Self {
        Self::seeded(0.0, 0)
    }
}

impl AssetState {
    pub fn seeded(price: f64, tick: u64) -> Self {
        Self {
            current_price: price,
            previous_price: price,
            change_percent: 0.0,
            all_time_high: price,
            all_time_low: price,
            tick_history: Vec::new(),
            daily_history: Vec::new(),
            candles: Vec::new(),
            current_candle: CandlestickData::open_at(price, 0),
            cumulative_volume: 0.0,
            registered_at_tick: tick,
        }
    }
}

/// A registered asset: immutable config plus evolving state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetRecord {
    pub config: AssetConfig,
    pub state: AssetState,
}

// ─── Trend Analytics ─────────────────────────────────────────────────────────

/// 5-bucket classification of blended market momentum.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TrendDirection {
    StrongBull,
    Bull,
    Neutral,
    Bear,
    StrongBear,
}

/// Market phase derived from the condition override plus momentum and
/// ATH-distance thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MarketPhase {
    Bubble,
    Crash,
    Correction,
    Recovery,
    Normal,
}

/// On-demand trend report across all registered assets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendReport {
    /// Blended short/medium momentum in [-1, 1].
    pub momentum_score: f64,
    pub direction: TrendDirection,
    /// Mean std-dev of recent returns, scaled, capped at 100.
    pub volatility_index: f64,
    /// Mean distance from all-time high, 0 = at the high.
    pub avg_ath_distance: f64,
    pub market_phase: MarketPhase,
    /// 0 (extreme fear) to 100 (extreme greed).
    pub fear_greed_index: f64,
}

impl TrendReport {
    /// Defined neutral default when no asset has enough history. Never NaN.
    pub fn neutral() -> Self {
        Self {
            momentum_score: 0.0,
            direction: TrendDirection::Neutral,
            volatility_index: 0.0,
            avg_ath_distance: 0.0,
            market_phase: MarketPhase::Normal,
            fear_greed_index: 50.0,
        }
    }
}

// ─── Event Catalog ───────────────────────────────────────────────────────────

/// One effect carried by an active event. `kind` is an open vocabulary
/// (demand, cost, wage, ...) interpreted by the consuming application;
/// `target` narrows the effect to one entity (a sector, an asset id).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventEffect {
    pub kind: String,
    #[serde(default)]
    pub target: Option<String>,
    pub value: f64,
}

impl EventEffect {
    pub fn global(kind: &str, value: f64) -> Self {
        Self {
            kind: kind.to_string(),
            target: None,
            value,
        }
    }

    pub fn targeted(kind: &str, target: &str, value: f64) -> Self {
        Self {
            kind: kind.to_string(),
            target: Some(target.to_string()),
            value,
        }
    }
}

/// Immutable catalog entry for one random event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameEventDef {
    pub id: String,
    /// Success chance per evaluation roll, in [0, 1].
    pub probability: f64,
    pub duration_ticks: u64,
    pub effects: Vec<EventEffect>,
    /// Roll gate: skipped until the game has run this many ticks.
    #[serde(default)]
    pub min_game_ticks: u64,
    /// Ticks after the active duration ends before the event is eligible
    /// again.
    #[serde(default)]
    pub cooldown_ticks: u64,
    /// At most one concurrent instance.
    #[serde(default)]
    pub unique: bool,
    /// Player must accept or decline before the event takes effect.
    #[serde(default)]
    pub requires_choice: bool,
    /// Applied exactly once if the player declines.
    #[serde(default)]
    pub decline_effects: Vec<EventEffect>,
}

impl GameEventDef {
    pub fn new(id: &str, probability: f64, duration_ticks: u64) -> Self {
        Self {
            id: id.to_string(),
            probability,
            duration_ticks,
            effects: Vec::new(),
            min_game_ticks: 0,
            cooldown_ticks: 0,
            unique: false,
            requires_choice: false,
            decline_effects: Vec::new(),
        }
    }
}

// ─── Event Runtime State ─────────────────────────────────────────────────────

/// A currently running event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActiveEvent {
    pub event_id: String,
    /// Counts down to zero, then the event is removed and reported as ended.
    pub ticks_remaining: u64,
    pub started_at: u64,
    /// Snapshot of the definition's effects at activation time.
    pub effects: Vec<EventEffect>,
}

/// Full event-engine snapshot, defensively copied in and out.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EventSystemState {
    pub active: Vec<ActiveEvent>,
    /// event id -> first tick at which it is eligible again.
    pub cooldowns: HashMap<String, u64>,
    /// Ids rolled successfully but awaiting an accept/decline choice.
    pub pending_choice: Vec<String>,
    pub total_ticks: u64,
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Division that degrades to zero instead of NaN/Infinity when the divisor
/// is zero or non-finite.
pub fn safe_div(numerator: f64, divisor: f64) -> f64 {
    if divisor == 0.0 || !divisor.is_finite() || !numerator.is_finite() {
        0.0
    } else {
        numerator / divisor
    }
}

/// Append to a bounded buffer, evicting the oldest entry past `capacity`.
pub(crate) fn push_and_trim<T>(buffer: &mut Vec<T>, value: T, capacity: usize) {
    buffer.push(value);
    while buffer.len() > capacity {
        buffer.remove(0);
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_order_is_cyclic() {
        assert_eq!(CyclePhase::Expansion.next(), CyclePhase::Peak);
        assert_eq!(CyclePhase::Peak.next(), CyclePhase::Contraction);
        assert_eq!(CyclePhase::Contraction.next(), CyclePhase::Trough);
        assert_eq!(CyclePhase::Trough.next(), CyclePhase::Expansion);
    }

    #[test]
    fn phase_duration_ranges_are_ordered() {
        for phase in [
            CyclePhase::Expansion,
            CyclePhase::Peak,
            CyclePhase::Contraction,
            CyclePhase::Trough,
        ] {
            let (min, max) = phase.duration_range();
            assert!(min > 0 && min <= max, "bad range for {:?}", phase);
        }
    }

    #[test]
    fn normal_condition_is_neutral() {
        assert_eq!(MarketCondition::Normal.drift_mod(), 0.0);
        assert_eq!(MarketCondition::Normal.vol_mod(), 1.0);
    }

    #[test]
    fn candle_absorb_tracks_extremes() {
        let mut c = CandlestickData::open_at(100.0, 3);
        c.absorb(110.0);
        c.absorb(95.0);
        c.absorb(105.0);
        assert_eq!(c.open, 100.0);
        assert_eq!(c.high, 110.0);
        assert_eq!(c.low, 95.0);
        assert_eq!(c.close, 105.0);
        assert_eq!(c.day, 3);
    }

    #[test]
    fn safe_div_zero_divisor() {
        assert_eq!(safe_div(10.0, 0.0), 0.0);
        assert_eq!(safe_div(10.0, f64::NAN), 0.0);
        assert_eq!(safe_div(f64::INFINITY, 2.0), 0.0);
        assert_eq!(safe_div(10.0, 4.0), 2.5);
    }

    #[test]
    fn push_and_trim_bounds_buffer() {
        let mut buf = Vec::new();
        for i in 0..10 {
            push_and_trim(&mut buf, i, 4);
        }
        assert_eq!(buf, vec![6, 7, 8, 9]);
    }

    #[test]
    fn economy_state_merges_missing_fields() {
        let state: EconomyState =
            serde_json::from_str(r#"{"interest_rate": 0.07}"#).unwrap();
        assert_eq!(state.interest_rate, 0.07);
        assert_eq!(state.inflation_index, 1.0);
        assert_eq!(state.cycle_phase, CyclePhase::Expansion);
    }

    #[test]
    fn event_state_merges_missing_fields() {
        let state: EventSystemState =
            serde_json::from_str(r#"{"total_ticks": 42}"#).unwrap();
        assert_eq!(state.total_ticks, 42);
        assert!(state.active.is_empty());
        assert!(state.cooldowns.is_empty());
    }
}

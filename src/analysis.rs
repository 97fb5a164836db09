// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Tycoon Economy Simulation Suite ("The Backdrop") - Trend Analysis
//
// On-demand analytics over the market state: rolling-window momentum,
// volatility index, ATH distance, market phase classification, and the
// Fear & Greed composite. Recomputed on every call; nothing here is cached
// between ticks.

use crate::types::{
    safe_div, MarketCondition, MarketPhase, TrendDirection, TrendReport,
};
use crate::market::MarketState;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Short momentum window, in ticks.
pub const SHORT_WINDOW: usize = 10;
/// Medium momentum window, in ticks.
pub const MEDIUM_WINDOW: usize = 50;
/// Window of recent returns feeding the volatility index.
const RETURN_WINDOW: usize = 20;

// Empirical scale factors mapping raw window returns into [-1, 1].
const SHORT_SCALE: f64 = 40.0;
const MEDIUM_SCALE: f64 = 15.0;

/// Per-tick return std-dev to 0-100 volatility index.
const VOLATILITY_SCALE: f64 = 10_000.0;
const VOLATILITY_CAP: f64 = 100.0;

// Blend weights: 40% short momentum, 60% medium momentum.
const SHORT_BLEND: f64 = 0.4;
const MEDIUM_BLEND: f64 = 0.6;

// Fear & Greed component weights.
const FG_MOMENTUM_WEIGHT: f64 = 0.4;
const FG_VOLATILITY_WEIGHT: f64 = 0.3;
const FG_ATH_WEIGHT: f64 = 0.3;

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Build the full trend report from current asset history.
///
/// Assets with fewer than two history points are skipped; with zero valid
/// assets the defined neutral report is returned, never NaN.
pub fn analyze(state: &MarketState) -> TrendReport {
    let mut short_sum = 0.0;
    let mut medium_sum = 0.0;
    let mut ath_sum = 0.0;
    let mut vol_sum = 0.0;
    let mut valid = 0usize;

    for id in &state.asset_order {
        let record = match state.assets.get(id) {
            Some(r) => r,
            None => continue,
        };
        let history = &record.state.tick_history;
        if history.len() < 2 {
            continue;
        }
        valid += 1;

        short_sum += window_return(history, SHORT_WINDOW);
        medium_sum += window_return(history, MEDIUM_WINDOW);

        let ath = record.state.all_time_high;
        ath_sum += safe_div(ath - record.state.current_price, ath).max(0.0);

        vol_sum += returns_std_dev(history, RETURN_WINDOW);
    }

    if valid == 0 {
        return TrendReport::neutral();
    }

    let n = valid as f64;
    let short = (short_sum / n * SHORT_SCALE).clamp(-1.0, 1.0);
    let medium = (medium_sum / n * MEDIUM_SCALE).clamp(-1.0, 1.0);
    let momentum = SHORT_BLEND * short + MEDIUM_BLEND * medium;

    let avg_ath_distance = (ath_sum / n).clamp(0.0, 1.0);
    let volatility_index = (vol_sum / n * VOLATILITY_SCALE).clamp(0.0, VOLATILITY_CAP);

    let direction = classify_direction(momentum);
    let market_phase = classify_phase(state.condition, momentum, avg_ath_distance);
    let fear_greed_index =
        fear_greed(momentum, volatility_index, avg_ath_distance);

    TrendReport {
        momentum_score: momentum,
        direction,
        volatility_index,
        avg_ath_distance,
        market_phase,
        fear_greed_index,
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// 5-bucket direction by fixed thresholds on the blended momentum score.
pub fn classify_direction(momentum: f64) -> TrendDirection {
    if momentum > 0.5 {
        TrendDirection::StrongBull
    } else if momentum > 0.15 {
        TrendDirection::Bull
    } else if momentum < -0.5 {
        TrendDirection::StrongBear
    } else if momentum < -0.15 {
        TrendDirection::Bear
    } else {
        TrendDirection::Neutral
    }
}

/// Decision table combining the condition override with momentum and
/// ATH-distance thresholds.
pub fn classify_phase(
    condition: MarketCondition,
    momentum: f64,
    ath_distance: f64,
) -> MarketPhase {
    match condition {
        MarketCondition::Crash => return MarketPhase::Crash,
        MarketCondition::Bubble => return MarketPhase::Bubble,
        _ => {}
    }
    if momentum <= -0.5 {
        MarketPhase::Crash
    } else if ath_distance > 0.25 && momentum < -0.15 {
        MarketPhase::Correction
    } else if ath_distance > 0.15 && momentum > 0.25 {
        MarketPhase::Recovery
    } else if momentum >= 0.6 && ath_distance < 0.05 {
        MarketPhase::Bubble
    } else {
        MarketPhase::Normal
    }
}

/// Fear & Greed composite: 40% momentum score, 30% inverse volatility, 30%
/// inverse ATH distance, clamped to [0, 100].
pub fn fear_greed(momentum: f64, volatility_index: f64, ath_distance: f64) -> f64 {
    let momentum_score = (momentum + 1.0) / 2.0 * 100.0;
    let volatility_score = VOLATILITY_CAP - volatility_index;
    let ath_score = (1.0 - ath_distance) * 100.0;
    (FG_MOMENTUM_WEIGHT * momentum_score
        + FG_VOLATILITY_WEIGHT * volatility_score
        + FG_ATH_WEIGHT * ath_score)
        .clamp(0.0, 100.0)
}

// ---------------------------------------------------------------------------
// Window math
// ---------------------------------------------------------------------------

/// Fractional price change across the last `window` points of `history`
/// (shorter histories use what they have).
fn window_return(history: &[f64], window: usize) -> f64 {
    let len = history.len();
    if len < 2 {
        return 0.0;
    }
    let start = len.saturating_sub(window);
    let first = history[start];
    let last = history[len - 1];
    safe_div(last - first, first)
}

/// Standard deviation of per-tick fractional returns over the trailing
/// window.
fn returns_std_dev(history: &[f64], window: usize) -> f64 {
    let len = history.len();
    if len < 2 {
        return 0.0;
    }
    let start = len.saturating_sub(window + 1);
    let slice = &history[start..];
    let returns: Vec<f64> = slice
        .windows(2)
        .map(|w| safe_div(w[1] - w[0], w[0]))
        .collect();
    if returns.is_empty() {
        return 0.0;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns
        .iter()
        .map(|r| (r - mean) * (r - mean))
        .sum::<f64>()
        / returns.len() as f64;
    variance.sqrt()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Tycoon Economy Simulation Suite ("The Backdrop") - Composition Root
//
// Wires one scheduler and the three simulators into a single owned
// backdrop instance. Nothing here is global: multiple independent backdrops
// can coexist (and do, in tests). Subsystems tick in a fixed registration
// order: cycle, market, events.

use std::cell::RefCell;
use std::rc::Rc;

use crate::cycle::{CycleConfig, CycleModel};
use crate::error::EngineError;
use crate::events::EventEngine;
use crate::market::{MarketModel, MarketState, DEFAULT_TICKS_PER_GAME_DAY};
use crate::scheduler::TickScheduler;
use crate::types::{
    AssetConfig, AssetRecord, EconomyState, EventEffect, EventSystemState,
    GameEventDef, TrendReport,
};

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct BackdropConfig {
    pub ticks_per_game_day: u32,
    pub cycle: CycleConfig,
    pub event_catalog: Vec<GameEventDef>,
    /// Seed for deterministic replay; `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for BackdropConfig {
    fn default() -> Self {
        Self {
            ticks_per_game_day: DEFAULT_TICKS_PER_GAME_DAY,
            cycle: CycleConfig::default(),
            event_catalog: Vec::new(),
            seed: None,
        }
    }
}

// ─── EconomyBackdrop ─────────────────────────────────────────────────────────

/// An owned, self-contained economy backdrop: scheduler plus cycle, market,
/// and event simulators. The surrounding application holds one of these and
/// reads state through the getters after each tick.
pub struct EconomyBackdrop {
    config: BackdropConfig,
    scheduler: TickScheduler,
    cycle: Rc<RefCell<CycleModel>>,
    market: Rc<RefCell<MarketModel>>,
    events: Rc<RefCell<EventEngine>>,
    /// Ids of events that ended since the last `drain_ended_events()`.
    ended_events: Rc<RefCell<Vec<String>>>,
}

impl EconomyBackdrop {
    pub fn new(config: BackdropConfig) -> Self {
        let (cycle, market, events) = match config.seed {
            Some(seed) => (
                CycleModel::with_config_and_seed(config.cycle.clone(), seed),
                MarketModel::with_seed(config.ticks_per_game_day, seed.wrapping_add(1)),
                EventEngine::with_seed(
                    config.event_catalog.clone(),
                    seed.wrapping_add(2),
                ),
            ),
            None => (
                CycleModel::with_config(config.cycle.clone()),
                MarketModel::new(config.ticks_per_game_day),
                EventEngine::new(config.event_catalog.clone()),
            ),
        };

        let cycle = Rc::new(RefCell::new(cycle));
        let market = Rc::new(RefCell::new(market));
        let events = Rc::new(RefCell::new(events));
        let ended_events = Rc::new(RefCell::new(Vec::new()));

        let mut scheduler = TickScheduler::new();
        {
            let cycle = cycle.clone();
            scheduler.subscribe("cycle", Box::new(move |_ctx| cycle.borrow_mut().tick()));
        }
        {
            let market = market.clone();
            scheduler
                .subscribe("market", Box::new(move |_ctx| market.borrow_mut().tick()));
        }
        {
            let events = events.clone();
            let ended = ended_events.clone();
            scheduler.subscribe(
                "events",
                Box::new(move |_ctx| {
                    let report = events.borrow_mut().tick();
                    ended.borrow_mut().extend(report.ended);
                }),
            );
        }

        Self {
            config,
            scheduler,
            cycle,
            market,
            events,
            ended_events,
        }
    }

    // ─── Driving ─────────────────────────────────────────────────────────────

    pub fn start(&mut self) {
        self.scheduler.start();
    }

    pub fn pause(&mut self) {
        self.scheduler.pause();
    }

    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    /// Host-loop entry point; fires at most one tick.
    pub fn poll(&mut self) -> bool {
        self.scheduler.poll()
    }

    /// Deterministic replay of `count` ticks (offline progress, tests).
    pub fn manual_ticks(&mut self, count: u32, fixed_delta: f64) {
        self.scheduler.manual_ticks(count, fixed_delta);
    }

    pub fn tick_count(&self) -> u64 {
        self.scheduler.tick_count()
    }

    /// Tear everything down and rebuild from the stored config.
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    // ─── Market passthrough ──────────────────────────────────────────────────

    pub fn register_asset(&mut self, config: AssetConfig) -> Result<(), EngineError> {
        self.market.borrow_mut().register_asset(config)
    }

    pub fn price(&self, id: &str) -> Option<f64> {
        self.market.borrow().price(id)
    }

    pub fn asset(&self, id: &str) -> Option<AssetRecord> {
        self.market.borrow().asset(id)
    }

    pub fn trend(&self) -> TrendReport {
        self.market.borrow().trend()
    }

    pub fn market_state(&self) -> MarketState {
        self.market.borrow().state()
    }

    // ─── Cycle passthrough ───────────────────────────────────────────────────

    pub fn economy_state(&self) -> EconomyState {
        self.cycle.borrow().state()
    }

    pub fn demand_multiplier(&self) -> f64 {
        self.cycle.borrow().demand_multiplier()
    }

    pub fn cost_multiplier(&self) -> f64 {
        self.cycle.borrow().cost_multiplier()
    }

    pub fn wage_multiplier(&self) -> f64 {
        self.cycle.borrow().wage_multiplier()
    }

    pub fn loan_rate(&self) -> f64 {
        self.cycle.borrow().loan_rate()
    }

    pub fn tax_rate(&self) -> f64 {
        self.cycle.borrow().tax_rate()
    }

    // ─── Event passthrough ───────────────────────────────────────────────────

    pub fn event_state(&self) -> EventSystemState {
        self.events.borrow().get_state()
    }

    pub fn event_multiplier(&self, kind: &str, target: Option<&str>) -> f64 {
        self.events.borrow().multiplier(kind, target)
    }

    pub fn event_additive_bonus(&self, kind: &str, target: Option<&str>) -> f64 {
        self.events.borrow().additive_bonus(kind, target)
    }

    pub fn accept_event(&mut self, id: &str) -> Result<(), EngineError> {
        self.events.borrow_mut().accept_event(id)
    }

    pub fn decline_event(&mut self, id: &str) -> Result<Vec<EventEffect>, EngineError> {
        self.events.borrow_mut().decline_event(id)
    }

    /// Events that ended since the last call; the `on_event_end` surface for
    /// the application.
    pub fn drain_ended_events(&mut self) -> Vec<String> {
        self.ended_events.borrow_mut().drain(..).collect()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

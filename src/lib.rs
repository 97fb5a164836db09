// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Tycoon Economy Simulation Suite ("The Backdrop")

//! Tick-driven simulation core producing a continuously evolving economic
//! backdrop: a fixed-rate scheduler, a 4-phase macroeconomic cycle model, a
//! multi-asset stochastic market with on-demand trend analytics, and a
//! probabilistic random-event engine.
//!
//! The scheduler is the only driver. Each simulator exposes a `tick()` entry
//! point, owns its state exclusively, and hands out defensive copies through
//! getters; the surrounding application composes them (see
//! [`sim::EconomyBackdrop`]) and never mutates simulation state directly.

pub mod analysis;
pub mod cycle;
pub mod error;
pub mod events;
pub mod market;
pub mod rng;
pub mod scheduler;
pub mod sim;
pub mod types;

pub use cycle::{CycleConfig, CycleModel};
pub use error::EngineError;
pub use events::{EventEngine, EventTickReport};
pub use market::{MarketModel, MarketState};
pub use rng::SimRng;
pub use scheduler::TickScheduler;
pub use sim::{BackdropConfig, EconomyBackdrop};
pub use types::*;

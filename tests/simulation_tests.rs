#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use backdrop_engine::{
        AssetConfig, BackdropConfig, CycleModel, CyclePhase, EconomyBackdrop,
        EventEngine, GameEventDef, MarketCondition, MarketModel, TickScheduler,
    };

    // ========== Scenario A: deterministic flat asset ==========

    #[test]
    fn test_flat_asset_holds_base_price_exactly() {
        let mut market = MarketModel::with_seed(120, 99);
        let config = AssetConfig {
            drift: 0.0,
            volatility: 0.0,
            ..AssetConfig::new("flat", "tech", 42.5)
        };
        market.register_asset(config).unwrap();

        for _ in 0..1000 {
            market.tick();
        }

        // exp(0) is exactly 1.0: no drift, no noise, no movement.
        assert_eq!(market.price("flat"), Some(42.5));
        let record = market.asset("flat").unwrap();
        assert_eq!(record.state.change_percent, 0.0);
        assert_eq!(record.state.all_time_high, 42.5);
        assert_eq!(record.state.all_time_low, 42.5);
    }

    // ========== Scenario B: forced phase transition ==========

    #[test]
    fn test_cycle_flips_expansion_to_peak_and_resets() {
        let mut model = CycleModel::with_seed(5);
        assert_eq!(model.phase(), CyclePhase::Expansion);
        let duration = model.state().cycle_phase_duration;

        // Tick right up to the boundary without crossing it.
        for _ in 0..(duration - 1) {
            model.tick();
        }
        assert_eq!(model.phase(), CyclePhase::Expansion);
        assert_eq!(model.state().cycle_ticks_elapsed, duration - 1);

        // The tick that reaches the duration flips the phase.
        model.tick();
        assert_eq!(model.phase(), CyclePhase::Peak);
        assert_eq!(model.state().cycle_ticks_elapsed, 0);
        let (min, max) = CyclePhase::Peak.duration_range();
        let new_duration = model.state().cycle_phase_duration;
        assert!((min..=max).contains(&new_duration));
    }

    #[test]
    fn test_phase_sequence_never_skips_or_reverses() {
        let mut model = CycleModel::with_seed(6);
        let mut last_phase = model.phase();
        let mut transitions = Vec::new();
        for _ in 0..40_000 {
            model.tick();
            let phase = model.phase();
            if phase != last_phase {
                assert_eq!(phase, last_phase.next(), "phase skipped or reversed");
                transitions.push(phase);
                last_phase = phase;
            }
        }
        assert!(transitions.len() >= 4, "expected at least one full cycle");
    }

    // ========== Scenario C: certain event lifecycle ==========

    #[test]
    fn test_certain_event_lifecycle() {
        let def = GameEventDef::new("surge", 1.0, 5);
        let mut engine = EventEngine::with_seed(vec![def], 7);

        let mut end_notifications = 0;
        let mut activation_tick = None;

        for tick in 1..=30u64 {
            let report = engine.tick();
            if !report.started.is_empty() && activation_tick.is_none() {
                activation_tick = Some(tick);
            }
            end_notifications += report
                .ended
                .iter()
                .filter(|id| id.as_str() == "surge")
                .count();
            if tick < 10 {
                assert!(!engine.is_active("surge"), "active before eval boundary");
            }
            if tick == 14 {
                assert!(engine.is_active("surge"), "gone before its duration ran out");
            }
            if tick == 15 {
                assert!(!engine.is_active("surge"), "still active past its duration");
                assert_eq!(end_notifications, 1, "on_event_end must fire exactly once");
                break;
            }
        }
        // Appears at the first eval-interval boundary, gone exactly 5 ticks on.
        assert_eq!(activation_tick, Some(10));
    }

    // ========== Scenario D: manual tick replay ==========

    #[test]
    fn test_manual_ticks_replay_is_exact_and_ordered() {
        let mut sched = TickScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for tag in ["first", "second"] {
            let log = log.clone();
            sched.subscribe(tag, Box::new(move |_| log.borrow_mut().push(tag)));
        }

        sched.manual_ticks(100, 0.1);

        assert_eq!(sched.tick_count(), 100);
        assert!((sched.elapsed_secs() - 10.0).abs() < 1e-9);

        let log = log.borrow();
        assert_eq!(log.len(), 200);
        for pair in log.chunks(2) {
            assert_eq!(pair, ["first", "second"]);
        }
    }

    // ========== Scenario E: panicking subscriber isolation ==========

    #[test]
    fn test_panicking_subscriber_never_stalls_the_backdrop() {
        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));

        let mut sched = TickScheduler::new();
        let healthy_calls = Rc::new(RefCell::new(0u32));
        sched.subscribe("faulty", Box::new(|_| panic!("subsystem bug")));
        {
            let healthy_calls = healthy_calls.clone();
            sched.subscribe(
                "healthy",
                Box::new(move |_| *healthy_calls.borrow_mut() += 1),
            );
        }

        sched.manual_ticks(100, 0.1);

        std::panic::set_hook(prev_hook);

        assert_eq!(sched.tick_count(), 100, "tick count must keep advancing");
        assert_eq!(*healthy_calls.borrow(), 100, "sibling subscriber was skipped");
    }

    // ========== Round trips ==========

    #[test]
    fn test_cycle_round_trip_reproduces_state() {
        let mut model = CycleModel::with_seed(11);
        for _ in 0..4321 {
            model.tick();
        }
        let json = model.serialize().unwrap();
        let restored = CycleModel::deserialize(&json);
        assert_eq!(restored.state(), model.state());
    }

    #[test]
    fn test_market_round_trip_across_candle_boundary() {
        let mut market = MarketModel::with_seed(10, 12);
        market
            .register_asset(AssetConfig::new("acme", "tech", 50.0))
            .unwrap();
        market
            .register_asset(AssetConfig {
                volatility: 0.8,
                ..AssetConfig::new("meme", "crypto", 3.0)
            })
            .unwrap();
        market.set_condition(MarketCondition::Bear, 40);
        market.set_global_sentiment(-0.02);
        market.set_sector_modifier("crypto", 0.3);

        // 35 ticks at 10 per day: 3 sealed candles, 5 ticks of in-progress
        // accumulation.
        for _ in 0..35 {
            market.tick();
        }

        let json = market.serialize().unwrap();
        let restored = MarketModel::deserialize(&json);
        assert_eq!(restored.state(), market.state());

        let record = restored.asset("acme").unwrap();
        assert_eq!(record.state.candles.len(), 3);
        assert!(record.state.current_candle.high >= record.state.current_candle.low);
    }

    #[test]
    fn test_event_state_round_trip() {
        let mut engine = EventEngine::with_seed(
            vec![GameEventDef {
                cooldown_ticks: 50,
                ..GameEventDef::new("boom", 1.0, 30)
            }],
            13,
        );
        for _ in 0..12 {
            engine.tick();
        }
        let snapshot = engine.get_state();
        let mut fresh =
            EventEngine::with_seed(vec![GameEventDef::new("boom", 1.0, 30)], 14);
        fresh.set_state(snapshot.clone());
        assert_eq!(fresh.get_state(), snapshot);
        assert!(fresh.is_active("boom"));
    }

    // ========== Long-run invariants ==========

    #[test]
    fn test_price_floor_and_buffer_bounds_hold_for_10k_ticks() {
        let mut backdrop = EconomyBackdrop::new(BackdropConfig {
            seed: Some(21),
            ..BackdropConfig::default()
        });
        let config = AssetConfig {
            volatility: 1.2,
            min_price: 2.0,
            tick_history_capacity: 64,
            daily_history_capacity: 10,
            candle_capacity: 8,
            ..AssetConfig::new("wild", "crypto", 10.0)
        };
        backdrop.register_asset(config).unwrap();

        for _ in 0..100 {
            backdrop.manual_ticks(100, 0.1);
            let record = backdrop.asset("wild").unwrap();
            assert!(record.state.current_price >= 2.0);
            assert!(record.state.tick_history.len() <= 64);
            assert!(record.state.daily_history.len() <= 10);
            assert!(record.state.candles.len() <= 8);
        }
    }

    #[test]
    fn test_economy_and_market_advance_in_lockstep() {
        let mut backdrop = EconomyBackdrop::new(BackdropConfig {
            seed: Some(22),
            ..BackdropConfig::default()
        });
        backdrop
            .register_asset(AssetConfig::new("acme", "tech", 50.0))
            .unwrap();
        backdrop.manual_ticks(500, 0.1);

        assert_eq!(backdrop.tick_count(), 500);
        assert_eq!(backdrop.economy_state().total_ticks, 500);
        assert_eq!(backdrop.market_state().total_ticks, 500);
        assert_eq!(backdrop.event_state().total_ticks, 500);

        // Multipliers stay in sane, finite territory.
        assert!(backdrop.demand_multiplier().is_finite());
        assert!(backdrop.cost_multiplier() >= 1.0);
        assert!(backdrop.wage_multiplier() >= 1.0);
        assert!(backdrop.loan_rate() > 0.0);
    }

    // ========== Idempotence ==========

    #[test]
    fn test_double_pause_equals_single_pause() {
        let mut backdrop = EconomyBackdrop::new(BackdropConfig {
            seed: Some(23),
            ..BackdropConfig::default()
        });
        backdrop.start();
        backdrop.manual_ticks(10, 0.1);
        backdrop.pause();
        let after_one = backdrop.tick_count();
        backdrop.pause();
        assert_eq!(backdrop.tick_count(), after_one);
    }

    #[test]
    fn test_unsubscribe_unknown_id_is_noop() {
        let mut sched = TickScheduler::new();
        sched.subscribe("only", Box::new(|_| {}));
        sched.unsubscribe("never-registered");
        assert_eq!(sched.subscriber_count(), 1);
        sched.manual_ticks(1, 0.1);
        assert_eq!(sched.tick_count(), 1);
    }
}

// Backdrop Benchmark Runner — throughput and long-run sanity driver
//
// Usage:
//   cargo run --release --bin bench                 # 1M ticks, seed 0
//   cargo run --release --bin bench -- --ticks 100000
//   cargo run --release --bin bench -- --seed 42

use std::time::Instant;

use backdrop_engine::{
    AssetConfig, BackdropConfig, EconomyBackdrop, EventEffect, GameEventDef,
};

// ─── CLI Parsing ────────────────────────────────────────────────────────────

struct CliArgs {
    ticks: u32,
    seed: u64,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut cli = CliArgs {
        ticks: 1_000_000,
        seed: 0,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--ticks" => {
                i += 1;
                if i < args.len() {
                    cli.ticks = args[i].parse().unwrap_or(1_000_000);
                }
            }
            "--seed" => {
                i += 1;
                if i < args.len() {
                    cli.seed = args[i].parse().unwrap_or(0);
                }
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
            }
        }
        i += 1;
    }

    cli
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() {
    let cli = parse_args();

    let mut backdrop = EconomyBackdrop::new(BackdropConfig {
        event_catalog: vec![
            GameEventDef {
                effects: vec![EventEffect::global("demand", 1.3)],
                cooldown_ticks: 2000,
                ..GameEventDef::new("festival", 0.02, 600)
            },
            GameEventDef {
                effects: vec![EventEffect::targeted("cost", "energy", 1.5)],
                cooldown_ticks: 5000,
                unique: true,
                ..GameEventDef::new("oil_shock", 0.005, 1200)
            },
        ],
        seed: Some(cli.seed),
        ..BackdropConfig::default()
    });

    for (id, sector, price) in [
        ("acme", "tech", 120.0),
        ("globex", "tech", 85.0),
        ("initech", "finance", 45.0),
        ("oilco", "energy", 60.0),
        ("meme", "crypto", 5.0),
    ] {
        backdrop
            .register_asset(AssetConfig::new(id, sector, price))
            .expect("asset registration");
    }

    println!("backdrop bench: {} ticks, seed {}", cli.ticks, cli.seed);
    let started = Instant::now();
    backdrop.manual_ticks(cli.ticks, 0.1);
    let elapsed = started.elapsed();

    let ticks_per_sec = cli.ticks as f64 / elapsed.as_secs_f64();
    println!("done in {:.2?} ({:.0} ticks/sec)", elapsed, ticks_per_sec);

    let economy = backdrop.economy_state();
    println!(
        "economy: phase={:?} confidence={:.3} inflation_index={:.3} wage_index={:.3}",
        economy.cycle_phase,
        economy.consumer_confidence,
        economy.inflation_index,
        economy.wage_index
    );

    let trend = backdrop.trend();
    println!(
        "market: direction={:?} phase={:?} fear_greed={:.1} volatility={:.1}",
        trend.direction, trend.market_phase, trend.fear_greed_index, trend.volatility_index
    );
    for id in ["acme", "globex", "initech", "oilco", "meme"] {
        if let Some(record) = backdrop.asset(id) {
            println!(
                "  {:8} price={:10.2} ath={:10.2} atl={:8.2} candles={}",
                id,
                record.state.current_price,
                record.state.all_time_high,
                record.state.all_time_low,
                record.state.candles.len()
            );
        }
    }

    let events = backdrop.event_state();
    println!(
        "events: active={} cooldowns={} ended_total={}",
        events.active.len(),
        events.cooldowns.len(),
        backdrop.drain_ended_events().len()
    );
}

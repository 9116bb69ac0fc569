use anyhow::Context as _;
use clap::Parser;
use indicatif::ProgressBar;
use ticknet_core::{NetworkConfig, TopologyBuilder};
use tracing_subscriber::EnvFilter;

mod report;

/// Build a seeded random topology and run the tick loop, printing the
/// aggregate report at a fixed cadence.
#[derive(Parser)]
#[command(name = "ticknet", version, about = "Tick-driven packet-switched network simulator")]
struct Command {
    /// Number of routers in the network
    #[arg(long, default_value = "6")]
    routers: u8,

    /// Terminals hosted by each router
    #[arg(long, default_value = "3")]
    terminals: u8,

    /// Additional random edges per router beyond the spanning tree
    #[arg(long, default_value = "1")]
    complexity: usize,

    /// Per-tick, per-terminal chance of emitting a new page
    #[arg(long, default_value = "0.2")]
    traffic: f64,

    /// Cap for random page lengths, in packets
    #[arg(long, default_value = "8")]
    max_page_len: u32,

    /// Number of ticks to simulate
    #[arg(long, default_value = "100")]
    ticks: u64,

    /// Print a report every N ticks (0 = only the final report)
    #[arg(long, default_value = "10")]
    report_every: u64,

    /// Seed for the topology and the traffic
    #[arg(long, default_value = "42")]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cmd = Command::parse();

    let config = NetworkConfig {
        router_count: cmd.routers,
        max_terminal_count: cmd.terminals,
        complexity: cmd.complexity,
        traffic_probability: cmd.traffic,
        max_page_len: cmd.max_page_len,
        seed: cmd.seed,
        ..NetworkConfig::default()
    };

    let mut network = TopologyBuilder::new(config)
        .build()
        .context("failed to build the network topology")?;

    let progress = ProgressBar::new(cmd.ticks);
    let chunk = if cmd.report_every == 0 {
        cmd.ticks
    } else {
        cmd.report_every
    };

    let mut remaining = cmd.ticks;
    while remaining > 0 {
        let step = chunk.min(remaining);
        network.simulate(step);
        remaining -= step;
        progress.inc(step);

        if cmd.report_every > 0 && remaining > 0 {
            progress.suspend(|| println!("{}", report::render(&network.stats())));
        }
    }
    progress.finish_and_clear();

    let stats = network.stats();
    tracing::info!(
        ticks = stats.current_tick,
        pages_completed = stats.pages_completed,
        "simulation finished"
    );
    println!("{}", report::render(&stats));

    Ok(())
}

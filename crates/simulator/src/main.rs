//! Tangle simulator CLI.
//!
//! Runs a deterministic multi-node tangle simulation with configurable
//! topology, delays, packet loss, congestion control and attack models.
//!
//! # Example
//!
//! ```bash
//! # 100 nodes, mana-burn scheduler, fixed seed
//! tanglesim-sim --seed 42 -n 100 --scheduler-type ManaBurn -d 60
//!
//! # Adversary double spend: one group pinning Red with 20% of the mana
//! tanglesim-sim --simulation-mode Adversary --adversary-types 2 \
//!     --adversary-init-colors R --adversary-mana 20
//! ```

mod results;

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tanglesim_network::NetworkConfig;
use tanglesim_simulation::{
    AdversaryConfig, SimulationConfig, SimulationMode, SimulationRunner,
};
use tanglesim_types::{BurnPolicy, Imif, ProtocolConfig, SchedulerKind, TipSelectorKind};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Tangle simulator.
///
/// Single-threaded and reproducible: the same seed produces the same run.
#[derive(Parser, Debug)]
#[command(name = "tanglesim-sim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of nodes
    #[arg(short = 'n', long, default_value = "100")]
    nodes_count: usize,

    /// Total consensus weight distributed across nodes
    #[arg(long, default_value = "100000000")]
    nodes_total_weight: u64,

    /// Zipf parameter of the stake distribution
    #[arg(long, default_value = "0.9")]
    zipf_parameter: f64,

    /// Fraction of total weight at which a message confirms
    #[arg(long, default_value = "0.66")]
    confirmation_threshold: f64,

    /// Confirmation window in seconds; older messages orphan instead
    #[arg(long, default_value = "30")]
    confirmation_window: u64,

    /// Parents referenced per message
    #[arg(long, default_value = "8")]
    parents_count: usize,

    /// Ratio of weak parents among the references
    #[arg(long, default_value = "0.0")]
    weak_tips_ratio: f64,

    /// Tip selection algorithm: URTS or RURTS
    #[arg(long, default_value = "URTS")]
    tsa: String,

    /// Maximum tip age in seconds under RURTS
    #[arg(long, default_value = "5.0")]
    delta_urts: f64,

    /// Scheduler: NoScheduler, ManaBurn or ICCA+
    #[arg(long, default_value = "ManaBurn")]
    scheduler_type: String,

    /// Scheduler emissions per second
    #[arg(long, default_value = "200")]
    scheduling_rate: u64,

    /// Deficit cap under ICCA+
    #[arg(long, default_value = "2.0")]
    max_deficit: f64,

    /// Access mana every node starts with
    #[arg(long, default_value = "0.0")]
    initial_mana: f64,

    /// Slot duration in seconds
    #[arg(long, default_value = "1")]
    slot_time: u64,

    /// RMC lookback in slots
    #[arg(long, default_value = "3")]
    rmc_slots: u64,

    /// RMC of slot 0 under ICCA+
    #[arg(long, default_value = "1.0")]
    initial_rmc: f64,

    /// Slot occupancy below which RMC decreases
    #[arg(long, default_value = "100.0")]
    lower_rmc_threshold: f64,

    /// Slot occupancy above which RMC increases
    #[arg(long, default_value = "150.0")]
    upper_rmc_threshold: f64,

    /// RMC decrease factor
    #[arg(long, default_value = "0.8")]
    alpha_rmc: f64,

    /// RMC increase factor
    #[arg(long, default_value = "1.2")]
    beta_rmc: f64,

    /// RMC clamp, lower bound
    #[arg(long, default_value = "0.5")]
    rmc_min: f64,

    /// RMC clamp, upper bound
    #[arg(long, default_value = "10.0")]
    rmc_max: f64,

    /// Network-wide issuance rate in messages per second
    #[arg(long, default_value = "50")]
    issuing_rate: u64,

    /// Inter-arrival distribution: poisson or uniform
    #[arg(long, default_value = "poisson")]
    imif: String,

    /// Space-separated burn policies per node (0 none, 1 anxious,
    /// 2 greedy+1, 3 greedy+10); cycled when shorter than the node count
    #[arg(long, default_value = "")]
    burn_policies: String,

    /// Minimum network delay in milliseconds
    #[arg(long, default_value = "100")]
    min_delay: u64,

    /// Maximum network delay in milliseconds
    #[arg(long, default_value = "100")]
    max_delay: u64,

    /// Packet loss probability
    #[arg(long, default_value = "0.0")]
    packet_loss: f64,

    /// Watts-Strogatz rewiring probability
    #[arg(long, default_value = "1.0")]
    ws_randomness: f64,

    /// Watts-Strogatz neighbor count
    #[arg(long, default_value = "8")]
    ws_neighbor_count: usize,

    /// Simulation duration in seconds
    #[arg(short = 'd', long, default_value = "60")]
    duration: u64,

    /// Random seed. When omitted, a random seed is used.
    #[arg(long)]
    seed: Option<u64>,

    /// Metrics snapshot cadence in milliseconds
    #[arg(long, default_value = "100")]
    consensus_monitor_tick: u64,

    /// Space-separated peers whose approval weights are recorded
    #[arg(long, default_value = "0")]
    monitored_aw_peers: String,

    /// Peer of the monitored witness-weight trace
    #[arg(long)]
    monitored_ww_peer: Option<u64>,

    /// Message of the monitored witness-weight trace
    #[arg(long, default_value = "0")]
    monitored_ww_message: u64,

    /// Simulation mode: Normal, Accidental or Adversary
    #[arg(long, default_value = "Normal")]
    simulation_mode: String,

    /// Seconds until the conflicting colors are issued
    #[arg(long, default_value = "5")]
    double_spend_delay: u64,

    /// Stop once this fraction of nodes shares one colored opinion
    #[arg(long, default_value = "1.0")]
    simulation_stop_threshold: f64,

    /// Space-separated adversary strategy per group
    /// (1 shift, 2 same, 3 no-gossip, 4 blowball)
    #[arg(long, default_value = "")]
    adversary_types: String,

    /// Space-separated adversary mana percentage per group
    #[arg(long, default_value = "")]
    adversary_mana: String,

    /// Space-separated adversary node count per group
    #[arg(long, default_value = "")]
    adversary_node_counts: String,

    /// Space-separated adversary delay per group, milliseconds
    #[arg(long, default_value = "")]
    adversary_delays: String,

    /// Space-separated adversary initial color per group (R, G, B)
    #[arg(long, default_value = "")]
    adversary_init_colors: String,

    /// Space-separated adversary issuance speedup per group
    #[arg(long, default_value = "")]
    adversary_speedup: String,

    /// Adversary nodes gossip directly to every peer
    #[arg(long)]
    adversary_peering_all: bool,

    /// Space-separated accidental double-spend issuers
    /// (max, min, random or a peer id)
    #[arg(long, default_value = "")]
    accidental_mana: String,

    /// Directory for result files
    #[arg(long, default_value = "results")]
    result_dir: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("warn,tanglesim_simulator=info,tanglesim_simulation=info")
            }),
        )
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);
    let config = build_config(&args, seed);

    info!(
        nodes = config.protocol.nodes_count,
        scheduler = ?config.protocol.scheduler,
        tsa = ?config.protocol.tsa,
        duration_secs = args.duration,
        seed,
        mode = ?config.simulation_mode,
        "starting simulation"
    );

    let mut runner = SimulationRunner::new(config.clone());
    runner.initialize();
    runner.run();

    if let Err(e) = results::write_all(&args.result_dir, &config, runner.metrics()) {
        warn!(error = %e, "failed to write result files");
    }

    let stats = runner.stats();
    println!("\n=== Simulation summary ===");
    println!("simulated time:    {:?}", runner.now());
    println!("events processed:  {}", stats.events_processed);
    println!("messages issued:   {}", runner.context().issued_messages());
    println!("gossip deliveries: {}", stats.messages_sent);
    println!("lost to the wire:  {}", stats.messages_dropped_loss);
    if stats.stopped_early {
        println!("stopped early:     consensus threshold reached");
    }
    let confirmed = runner.peers().first().map(|p| p.counters().confirmed).unwrap_or(0);
    println!("confirmed (peer 0): {confirmed}");
}

/// Assemble the run configuration from the flags, logging and defaulting
/// anything unparseable.
fn build_config(args: &Args, seed: u64) -> SimulationConfig {
    let scheduler = SchedulerKind::parse(&args.scheduler_type).unwrap_or_else(|| {
        warn!(value = %args.scheduler_type, "unknown scheduler type; using NoScheduler");
        SchedulerKind::NoScheduler
    });
    let tsa = TipSelectorKind::parse(&args.tsa).unwrap_or_else(|| {
        warn!(value = %args.tsa, "unknown tip selection algorithm; using URTS");
        TipSelectorKind::Urts
    });
    let imif = Imif::parse(&args.imif).unwrap_or_else(|| {
        warn!(value = %args.imif, "unknown IMIF; using poisson");
        Imif::Poisson
    });
    let simulation_mode = SimulationMode::parse(&args.simulation_mode).unwrap_or_else(|| {
        warn!(value = %args.simulation_mode, "unknown simulation mode; using Normal");
        SimulationMode::Normal
    });

    let burn_policies = if args.burn_policies.is_empty() {
        vec![BurnPolicy::NoBurn]
    } else {
        parse_list::<usize>(&args.burn_policies)
            .into_iter()
            .map(BurnPolicy::from_index)
            .collect()
    };

    let monitored_witness = args
        .monitored_ww_peer
        .map(|peer| (peer, args.monitored_ww_message));

    let protocol = ProtocolConfig {
        nodes_count: args.nodes_count,
        nodes_total_weight: args.nodes_total_weight,
        zipf_parameter: args.zipf_parameter,
        confirmation_threshold: args.confirmation_threshold,
        confirmation_window: Duration::from_secs(args.confirmation_window),
        parents_count: args.parents_count,
        weak_tips_ratio: args.weak_tips_ratio,
        tsa,
        delta_urts: args.delta_urts,
        scheduler,
        scheduling_rate: args.scheduling_rate,
        max_deficit: args.max_deficit,
        initial_mana: args.initial_mana,
        slot_time: Duration::from_secs(args.slot_time),
        rmc_slots: args.rmc_slots,
        initial_rmc: args.initial_rmc,
        lower_rmc_threshold: args.lower_rmc_threshold,
        upper_rmc_threshold: args.upper_rmc_threshold,
        alpha_rmc: args.alpha_rmc,
        beta_rmc: args.beta_rmc,
        rmc_min: args.rmc_min,
        rmc_max: args.rmc_max,
        issuing_rate: args.issuing_rate,
        imif,
        burn_policies,
        monitored_witness,
    };

    let network = NetworkConfig {
        min_delay: Duration::from_millis(args.min_delay),
        max_delay: Duration::from_millis(args.max_delay),
        packet_loss: args.packet_loss,
        ws_randomness: args.ws_randomness,
        ws_neighbor_count: args.ws_neighbor_count,
    };

    let adversary = AdversaryConfig {
        types: parse_list(&args.adversary_types),
        mana: parse_list(&args.adversary_mana),
        node_counts: parse_list(&args.adversary_node_counts),
        delays_ms: parse_list(&args.adversary_delays),
        init_colors: args
            .adversary_init_colors
            .split_whitespace()
            .map(str::to_owned)
            .collect(),
        speedup: parse_list(&args.adversary_speedup),
        peering_all: args.adversary_peering_all,
    };

    SimulationConfig {
        protocol,
        network,
        seed,
        duration: Duration::from_secs(args.duration),
        consensus_monitor_tick: Duration::from_millis(args.consensus_monitor_tick),
        monitored_aw_peers: parse_list(&args.monitored_aw_peers),
        simulation_mode,
        double_spend_delay: Duration::from_secs(args.double_spend_delay),
        simulation_stop_threshold: args.simulation_stop_threshold,
        adversary,
        accidental_mana: args
            .accidental_mana
            .split_whitespace()
            .map(str::to_owned)
            .collect(),
    }
}

/// Parse a space-separated list, skipping unparseable entries with a
/// warning.
fn parse_list<T: std::str::FromStr>(s: &str) -> Vec<T> {
    s.split_whitespace()
        .filter_map(|entry| match entry.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(entry, "unparseable list entry skipped");
                None
            }
        })
        .collect()
}

//! Deterministic simulation runner.

use crate::config::{SimulationConfig, SimulationMode};
use crate::event_queue::{EventKey, SimEvent};
use crate::metrics::{AwRow, MetricsLog, ThroughputRow, TipsRow, WwRow};
use crate::peer::{Peer, PeerInput, PeerOutput};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tanglesim_network::SimulatedNetwork;
use tanglesim_tangle::TangleEvent;
use tanglesim_types::{
    AdversaryGroup, Color, Message, NodeBehavior, PeerId, SchedulerKind, SimContext,
};
use tracing::{debug, info, trace, warn};

/// Statistics collected during a run.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SimulationStats {
    /// Events popped from the queue.
    pub events_processed: u64,
    /// Gossip deliveries scheduled.
    pub messages_sent: u64,
    /// Gossip sends lost to packet loss.
    pub messages_dropped_loss: u64,
    /// Metrics snapshots taken.
    pub snapshots: u64,
    /// Whether the early-stop rule ended the run.
    pub stopped_early: bool,
}

/// Deterministic discrete-event runner.
///
/// Owns every peer, the network fabric, the global event queue and the
/// harness RNG. Given the same configuration and seed, two runs produce
/// identical event sequences.
pub struct SimulationRunner {
    config: SimulationConfig,
    ctx: Arc<SimContext>,
    groups: Vec<AdversaryGroup>,
    peers: Vec<Peer>,
    network: SimulatedNetwork,
    queue: BTreeMap<EventKey, SimEvent>,
    sequence: u64,
    now: Duration,
    rng: ChaCha8Rng,
    stats: SimulationStats,
    metrics: MetricsLog,
    double_spend_pending: bool,
}

impl SimulationRunner {
    pub fn new(config: SimulationConfig) -> Self {
        let (ctx, groups) = config.build_context();
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        let mut network = SimulatedNetwork::new(
            ctx.config.nodes_count,
            config.network.clone(),
            &mut rng,
        );
        network.apply_adversary_overrides(&groups, &mut rng);

        let behavior_of = |peer: PeerId| -> (NodeBehavior, f64) {
            for group in &groups {
                if group.node_ids.contains(&peer) {
                    return (group.behavior(), group.speedup);
                }
            }
            (NodeBehavior::Honest, 1.0)
        };

        let peers = (0..ctx.config.nodes_count)
            .map(|i| {
                let id = PeerId(i as u64);
                let (behavior, speedup) = behavior_of(id);
                let rate = ctx.config.issuing_rate as f64 * ctx.weights.share(id) * speedup;
                let peer_seed = config
                    .seed
                    .wrapping_add(i as u64)
                    .wrapping_mul(0x517c_c1b7_2722_0a95);
                Peer::new(
                    ctx.clone(),
                    id,
                    behavior,
                    rate,
                    ChaCha8Rng::seed_from_u64(peer_seed),
                )
            })
            .collect::<Vec<_>>();

        info!(
            nodes = peers.len(),
            scheduler = ?ctx.config.scheduler,
            seed = config.seed,
            mode = ?config.simulation_mode,
            adversary_groups = groups.len(),
            "created simulation runner"
        );

        let double_spend_pending = config.simulation_mode != SimulationMode::Normal;
        Self {
            config,
            ctx,
            groups,
            peers,
            network,
            queue: BTreeMap::new(),
            sequence: 0,
            now: Duration::ZERO,
            rng,
            stats: SimulationStats::default(),
            metrics: MetricsLog::default(),
            double_spend_pending,
        }
    }

    /// Seed the initial timers: one issuance tick per peer, the scheduler
    /// pacing ticks, the monitor tick, and the double-spend injection.
    pub fn initialize(&mut self) {
        for i in 0..self.peers.len() {
            let peer = PeerId(i as u64);
            self.schedule(
                Duration::ZERO,
                SimEvent::Peer(peer, PeerInput::IssueTick),
            );
            if self.ctx.config.scheduler != SchedulerKind::NoScheduler {
                self.schedule(
                    self.scheduler_period(),
                    SimEvent::Peer(peer, PeerInput::SchedulerTick),
                );
            }
        }
        self.schedule(self.config.consensus_monitor_tick, SimEvent::MonitorTick);
        if self.double_spend_pending {
            self.schedule(self.config.double_spend_delay, SimEvent::DoubleSpend);
        }
    }

    /// Run until the configured duration, the queue drains, or the
    /// early-stop rule fires.
    pub fn run(&mut self) {
        let end = self.config.duration;
        while let Some((&key, _)) = self.queue.first_key_value() {
            if key.time > end {
                break;
            }
            let (key, event) = self.queue.pop_first().expect("peeked above");
            self.now = key.time;
            self.stats.events_processed += 1;

            match event {
                SimEvent::Peer(peer, input) => self.process_peer_event(peer, input),
                SimEvent::MonitorTick => {
                    self.snapshot();
                    if self.check_early_stop() {
                        self.stats.stopped_early = true;
                        info!(now = ?self.now, "early-stop threshold reached");
                        break;
                    }
                    let next = self.now + self.config.consensus_monitor_tick;
                    self.schedule(next, SimEvent::MonitorTick);
                }
                SimEvent::DoubleSpend => self.inject_double_spends(),
            }
        }
        if self.now < end && !self.stats.stopped_early {
            self.now = end;
        }
        self.finalize();
        debug!(
            events = self.stats.events_processed,
            sent = self.stats.messages_sent,
            lost = self.stats.messages_dropped_loss,
            "run complete"
        );
    }

    fn process_peer_event(&mut self, peer: PeerId, input: PeerInput) {
        let reschedule_scheduler = matches!(input, PeerInput::SchedulerTick);
        let output = self.peers[peer.index()].step(self.now, input);
        self.absorb_output(peer, output);

        if reschedule_scheduler {
            let next = self.now + self.scheduler_period();
            self.schedule(next, SimEvent::Peer(peer, PeerInput::SchedulerTick));
        }
    }

    /// Turn a step's output into queue entries: gossip fan-out with
    /// per-edge loss and delay, the next issuance timer, and the
    /// witness-weight trace.
    fn absorb_output(&mut self, from: PeerId, output: PeerOutput) {
        for event in &output.events {
            if let TangleEvent::WitnessWeightUpdated { weight, .. } = event {
                self.metrics.ww.push(WwRow {
                    ns_since_start: self.now.as_nanos(),
                    weight: *weight,
                });
            }
        }

        for message in output.gossip {
            self.gossip(from, message);
        }

        if let Some(delay) = output.next_issue_in {
            self.schedule(self.now + delay, SimEvent::Peer(from, PeerInput::IssueTick));
        }
    }

    fn gossip(&mut self, from: PeerId, message: Arc<Message>) {
        let neighbor_count = self.network.neighbors(from).len() as u64;
        let deliveries = self.network.gossip(from, &mut self.rng);
        self.stats.messages_sent += deliveries.len() as u64;
        self.stats.messages_dropped_loss += neighbor_count - deliveries.len() as u64;
        for delivery in deliveries {
            trace!(
                from = %from,
                to = %delivery.to,
                id = %message.id,
                delay = ?delivery.delay,
                "gossip"
            );
            self.schedule(
                self.now + delivery.delay,
                SimEvent::Peer(delivery.to, PeerInput::MessageReceived(message.clone())),
            );
        }
    }

    /// Issue the configured conflicting messages.
    fn inject_double_spends(&mut self) {
        self.double_spend_pending = false;
        match self.config.simulation_mode {
            SimulationMode::Normal => {}
            SimulationMode::Accidental => {
                let issuers = self.resolve_accidental_issuers();
                for (k, peer) in issuers.into_iter().enumerate() {
                    let color = Color::CONCRETE[k % Color::CONCRETE.len()];
                    info!(peer = %peer, %color, "injecting accidental double spend");
                    let output = self.peers[peer.index()].issue_conflict(self.now, color);
                    self.absorb_output(peer, output);
                }
            }
            SimulationMode::Adversary => {
                let members: Vec<(PeerId, Color)> = self
                    .groups
                    .iter()
                    .flat_map(|g| g.node_ids.iter().map(|&id| (id, g.init_color)))
                    .collect();
                for (peer, color) in members {
                    info!(peer = %peer, %color, "adversary issues its color");
                    let output = self.peers[peer.index()].issue_conflict(self.now, color);
                    self.absorb_output(peer, output);
                }
            }
        }
    }

    /// Map the `AccidentalMana` entries to issuers.
    fn resolve_accidental_issuers(&mut self) -> Vec<PeerId> {
        let mut issuers = Vec::new();
        for entry in &self.config.accidental_mana {
            match entry.as_str() {
                "max" => issuers.push(PeerId(0)),
                "min" => issuers.push(self.ctx.weights.lightest_peer()),
                "random" => {
                    issuers.push(PeerId(self.rng.gen_range(0..self.peers.len() as u64)));
                }
                other => match other.parse::<u64>() {
                    Ok(id) if (id as usize) < self.peers.len() => issuers.push(PeerId(id)),
                    _ => warn!(entry = other, "accidental issuer entry not usable; skipped"),
                },
            }
        }
        issuers
    }

    /// Record one metrics snapshot.
    fn snapshot(&mut self) {
        self.stats.snapshots += 1;
        let ns = self.now.as_nanos();
        let issued = self.ctx.issued_messages();

        for &peer in &self.config.monitored_aw_peers {
            let Some(p) = self.peers.get(peer as usize) else {
                continue;
            };
            let opinions = p.tangle().opinions();
            let mut approval_weights = [0u64; 4];
            for color in Color::ALL {
                approval_weights[color.index()] = opinions.approval_weight(color);
            }
            self.metrics.aw.entry(peer).or_default().push(AwRow {
                ns_since_start: ns,
                approval_weights,
                confirmed: p.counters().confirmed,
                issued,
            });
        }

        let tips = self.peers[0].tangle().tip_manager();
        let mut sizes = [0usize; 4];
        for color in Color::ALL {
            sizes[color.index()] = tips.tip_pool_size(color);
        }
        self.metrics.tips.push(TipsRow {
            ns_since_start: ns,
            sizes,
        });
    }

    /// True once enough peers share one colored opinion.
    fn check_early_stop(&self) -> bool {
        let threshold = self.config.simulation_stop_threshold;
        if threshold <= 0.0 {
            return false;
        }
        let mut counts = [0usize; 4];
        for peer in &self.peers {
            counts[peer.tangle().opinions().opinion().index()] += 1;
        }
        let needed = (threshold * self.peers.len() as f64).ceil() as usize;
        Color::CONCRETE
            .iter()
            .any(|c| counts[c.index()] >= needed)
    }

    /// Collect end-of-run metrics: throughput counters and the RMC series.
    fn finalize(&mut self) {
        self.metrics.throughput = self
            .peers
            .iter()
            .map(|p| {
                let c = p.counters();
                ThroughputRow {
                    peer: p.id().0,
                    issued: c.issued,
                    scheduled: c.scheduled,
                    confirmed: c.confirmed,
                    orphaned: c.orphaned,
                    dropped: c.dropped,
                    throttled: c.throttled,
                }
            })
            .collect();
        self.metrics.rmc = self.peers[0]
            .tangle()
            .storage()
            .rmc_series()
            .into_iter()
            .map(|(slot, price)| (slot.0, price))
            .collect();
    }

    fn scheduler_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.ctx.config.scheduling_rate.max(1) as f64)
    }

    fn schedule(&mut self, time: Duration, event: SimEvent) {
        self.sequence += 1;
        let key = EventKey::new(time, &event, self.sequence);
        self.queue.insert(key, event);
    }

    // ─── Accessors ───

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn stats(&self) -> SimulationStats {
        self.stats
    }

    pub fn metrics(&self) -> &MetricsLog {
        &self.metrics
    }

    pub fn context(&self) -> &Arc<SimContext> {
        &self.ctx
    }

    pub fn peer(&self, id: PeerId) -> &Peer {
        &self.peers[id.index()]
    }

    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
}

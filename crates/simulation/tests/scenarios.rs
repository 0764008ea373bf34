//! End-to-end scenarios exercising the whole pipeline.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Duration;
use tanglesim_network::NetworkConfig;
use tanglesim_simulation::{
    Peer, PeerInput, SimulationConfig, SimulationRunner,
};
use tanglesim_types::{
    BurnPolicy, Color, NodeBehavior, PeerId, ProtocolConfig, SchedulerKind, SimContext,
    TipSelectorKind, WeightDistribution,
};

fn context(config: ProtocolConfig, weights: Vec<u64>) -> Arc<SimContext> {
    Arc::new(SimContext::new(config, WeightDistribution::new(weights)))
}

fn peer(ctx: &Arc<SimContext>, id: u64, behavior: NodeBehavior) -> Peer {
    Peer::new(
        ctx.clone(),
        PeerId(id),
        behavior,
        10.0,
        ChaCha8Rng::seed_from_u64(100 + id),
    )
}

/// A single node holding all the weight issues ten messages: everything
/// stores, everything confirms, and the frontier is just the latest
/// message.
#[test]
fn scenario_single_node_confirms_its_own_chain() {
    let ctx = context(
        ProtocolConfig {
            nodes_count: 1,
            nodes_total_weight: 100,
            scheduler: SchedulerKind::NoScheduler,
            tsa: TipSelectorKind::Urts,
            parents_count: 2,
            ..Default::default()
        },
        vec![100],
    );
    let mut node = peer(&ctx, 0, NodeBehavior::Honest);

    // Ten messages at ten per second.
    for i in 0..10u64 {
        let now = Duration::from_millis(100 * i);
        node.step(now, PeerInput::IssueTick);
    }

    let storage = node.tangle().storage();
    assert_eq!(storage.len(), 10);
    for meta in storage.iter_metadata() {
        assert!(meta.confirmed(), "message {} unconfirmed", meta.id());
    }
    assert_eq!(node.counters().confirmed, 10);
    assert_eq!(node.tangle().tip_manager().tip_pool_size(Color::Undefined), 1);
}

/// Two equal-weight peers push opposite colors: the stake splits 50/50
/// and neither colored message reaches a 0.6 threshold.
#[test]
fn scenario_equal_split_never_confirms_either_color() {
    let ctx = context(
        ProtocolConfig {
            nodes_count: 2,
            nodes_total_weight: 100,
            confirmation_threshold: 0.6,
            scheduler: SchedulerKind::NoScheduler,
            parents_count: 2,
            ..Default::default()
        },
        vec![50, 50],
    );
    let mut adversary = peer(&ctx, 0, NodeBehavior::SameOpinion { color: Color::Red });
    let mut honest = peer(&ctx, 1, NodeBehavior::Honest);

    let now = Duration::from_secs(1);
    let red = adversary.issue_conflict(now, Color::Red).gossip.remove(0);
    let green = honest.issue_conflict(now, Color::Green).gossip.remove(0);

    let later = Duration::from_millis(1100);
    adversary.step(later, PeerInput::MessageReceived(green.clone()));
    honest.step(later, PeerInput::MessageReceived(red.clone()));

    for node in [&adversary, &honest] {
        let opinions = node.tangle().opinions();
        assert_eq!(opinions.approval_weight(Color::Red), 50);
        assert_eq!(opinions.approval_weight(Color::Green), 50);

        let storage = node.tangle().storage();
        assert!(
            !storage.metadata(red.id).unwrap().confirmed(),
            "red must stay below the threshold"
        );
        assert!(
            !storage.metadata(green.id).unwrap().confirmed(),
            "green must stay below the threshold"
        );
    }
    assert_eq!(adversary.tangle().opinions().opinion(), Color::Red);
}

/// A no-gossip adversary receives but never relays; its own messages
/// still reach the network.
#[test]
fn scenario_no_gossip_adversary_stays_silent() {
    let ctx = context(
        ProtocolConfig {
            nodes_count: 2,
            nodes_total_weight: 100,
            scheduler: SchedulerKind::NoScheduler,
            parents_count: 2,
            ..Default::default()
        },
        vec![50, 50],
    );
    let mut honest = peer(&ctx, 0, NodeBehavior::Honest);
    let mut silent = peer(&ctx, 1, NodeBehavior::NoGossip);

    let message = honest
        .step(Duration::from_secs(1), PeerInput::IssueTick)
        .gossip
        .remove(0);
    let output = silent.step(
        Duration::from_millis(1100),
        PeerInput::MessageReceived(message),
    );
    assert!(output.gossip.is_empty());

    let own = silent.step(Duration::from_secs(2), PeerInput::IssueTick);
    assert_eq!(own.gossip.len(), 1);
}

/// Full ICCA+ run: admission, deficit round robin and the RMC series all
/// engage, and the run is reproducible.
#[test]
fn scenario_icca_end_to_end() {
    let config = SimulationConfig {
        protocol: ProtocolConfig {
            nodes_count: 3,
            nodes_total_weight: 300,
            scheduler: SchedulerKind::Icca,
            scheduling_rate: 100,
            issuing_rate: 30,
            parents_count: 2,
            max_deficit: 5.0,
            burn_policies: vec![BurnPolicy::Anxious],
            ..Default::default()
        },
        network: NetworkConfig {
            min_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(50),
            ws_neighbor_count: 2,
            ..Default::default()
        },
        seed: 5,
        duration: Duration::from_secs(4),
        ..Default::default()
    };

    let run = |config: SimulationConfig| {
        let mut runner = SimulationRunner::new(config);
        runner.initialize();
        runner.run();
        let scheduled: u64 = runner.peers().iter().map(|p| p.counters().scheduled).sum();
        let issued = runner.context().issued_messages();
        let rmc = runner.metrics().rmc.clone();
        (issued, scheduled, rmc)
    };

    let (issued, scheduled, rmc) = run(config.clone());
    assert!(issued > 0, "rate setter must allow issuance");
    assert!(scheduled > 0, "deficit round robin must emit");
    assert!(!rmc.is_empty(), "RMC series must be recorded");
    for (_, price) in &rmc {
        assert!(*price >= config.protocol.rmc_min);
        assert!(*price <= config.protocol.rmc_max);
    }

    assert_eq!(run(config.clone()), (issued, scheduled, rmc), "must be reproducible");
}

/// Weight invariants hold across a whole noisy run: bitset/weight
/// consistency and the confirmation/orphanage exclusivity.
#[test]
fn scenario_weight_invariants_under_loss() {
    let config = SimulationConfig {
        protocol: ProtocolConfig {
            nodes_count: 5,
            nodes_total_weight: 1_000,
            scheduler: SchedulerKind::NoScheduler,
            issuing_rate: 20,
            parents_count: 2,
            ..Default::default()
        },
        network: NetworkConfig {
            min_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(80),
            packet_loss: 0.1,
            ws_neighbor_count: 4,
            ..Default::default()
        },
        seed: 9,
        duration: Duration::from_secs(3),
        ..Default::default()
    };
    let mut runner = SimulationRunner::new(config);
    runner.initialize();
    runner.run();

    let ctx = runner.context().clone();
    let total = ctx.weights.total_weight();
    for node in runner.peers() {
        for meta in node.tangle().storage().iter_metadata() {
            // Bitset-weight consistency.
            let mut from_bits = 0u64;
            for bit in 0..ctx.config.nodes_count {
                if meta.witness_bit(bit) {
                    from_bits += ctx.weights.weight(PeerId(bit as u64));
                }
            }
            assert_eq!(meta.weight(), from_bits, "message {}", meta.id());
            assert!(meta.weight() <= total);
            assert!(
                !(meta.confirmed() && meta.orphaned()),
                "confirmation and orphanage are exclusive"
            );
        }
    }
}

//! §8 scenario 3: partition heal. Starting from a converged two-node mesh,
//! drop the A -> B direction only. Expect: within the reachability grace
//! period, B no longer has A as a neighbour, the two network hashes
//! diverge, and B's store settles back down to just itself.

mod common;

use common::Network;
use hncp_engine::{EndpointConfig, EngineConfig};
use std::time::Duration;

fn fast_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    // Shrink the grace period so the test doesn't need an excessive number
    // of ticks; still derived the same way the engine itself defaults it
    // (2 * I_max), just against a smaller I_max.
    config.reachability_grace = Duration::from_millis(2_000);
    config
}

fn fast_endpoint_config() -> EndpointConfig {
    let mut config = EndpointConfig::default();
    config.trickle.i_min = Duration::from_millis(50);
    config.trickle.i_max = Duration::from_millis(1_000);
    config.keepalive_interval = Duration::from_millis(300);
    config.keepalive_multiplier = 2;
    config
}

#[test]
fn one_way_partition_makes_b_drop_a() {
    let mut net = Network::new();
    net.add_node_with_config("a", fast_config());
    net.add_node_with_config("b", fast_config());
    let link = net.add_link_with_config("eth0", &["a", "b"], fast_endpoint_config());

    assert!(net.run_until_converged(&["a", "b"], 20, 500));
    assert_eq!(net.engine_mut("b").node_count(), 2);

    net.partition_one_way(link, "a", "b");

    // Run well past both the neighbour keepalive deadline and the
    // reachability grace period.
    net.run_for(20, 500);

    let b_id = net.id_of("b");
    let a_id = net.id_of("a");
    assert_eq!(net.engine("b").node_count(), 1, "b should only know itself");
    assert!(net.engine("b").find_node(&a_id).is_none());
    assert!(net.engine("b").own_node().id == b_id);

    let a_hash = net.engine_mut("a").network_hash();
    let b_hash = net.engine_mut("b").network_hash();
    assert_ne!(a_hash, b_hash, "hashes must diverge once b has dropped a");
}

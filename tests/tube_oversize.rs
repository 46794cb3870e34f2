//! §8 scenario 5: a "tube" (chain) of nodes whose full record exceeds the
//! multicast MTU budget. Full `NODE_STATE` publishes in this engine always
//! go unicast already (§4.4 "full publishes and requests go unicast") — so
//! there is no multicast-to-unicast switch to observe directly — but the
//! oversize condition must still be counted (§7 `Oversize`) and the chain
//! must still converge end to end.

mod common;

use common::Network;
use hncp_engine::Tlv;

const CHAIN_LEN: usize = 6;

fn chain_names() -> Vec<String> {
    (0..CHAIN_LEN).map(|i| format!("n{i}")).collect()
}

#[test]
fn oversized_full_publish_still_converges_and_is_counted() {
    let mut net = Network::new();
    let names = chain_names();
    for name in &names {
        net.add_node(name);
    }
    for i in 0..CHAIN_LEN - 1 {
        let link_name = format!("link{i}");
        net.add_link(&link_name, &[names[i].as_str(), names[i + 1].as_str()]);
    }

    // Every node publishes one TLV large enough, on its own, to exceed the
    // default 1400-byte multicast MTU budget for that node's full record.
    for name in &names {
        net.engine_mut(name)
            .add_tlv(Tlv::new(32, vec![0xAB; 1500]))
            .unwrap();
    }

    let refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
    assert!(
        net.run_until_converged(&refs, 50, 400),
        "oversized tube failed to converge"
    );

    for name in &names {
        assert_eq!(net.engine(name).node_count(), CHAIN_LEN);
    }

    let total_oversize: u64 = names
        .iter()
        .map(|name| net.engine(name).stats().oversize_count)
        .sum();
    assert!(
        total_oversize > 0,
        "expected at least one full publish to be flagged oversize"
    );
}

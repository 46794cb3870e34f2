//! §8 scenario 4: node churn. Remove a node's engine instance then recreate
//! it with the same node id, reusing the same link/endpoint. Expect: the
//! network reconverges on the new incarnation's record.
//!
//! The engine keeps no persisted state of its own (§6 "Persisted state:
//! none required by the engine itself"), so a from-scratch restart resets
//! the local `update_number` counter to zero — there is no durable sequence
//! number to resume from. What the store invariant actually guarantees
//! (§3: records are ordered by `(update_number, origination_time)`) is that
//! a record can never go backwards in that pair, and a restarted node's
//! first republish carries a strictly larger `origination_time` than
//! anything it published before, so its version key still wins the
//! comparison and the peer accepts the replacement.

mod common;

use common::Network;
use hncp_engine::{EndpointConfig, EngineConfig, Tlv};

#[test]
fn node_recreated_with_same_id_reconverges_on_the_new_incarnation() {
    let mut net = Network::new();
    let cpe_id = net.add_node("cpe");
    net.add_node("b1");
    let link = net.add_link("eth0", &["cpe", "b1"]);

    net.engine_mut("cpe")
        .add_tlv(Tlv::new(40, b"v1".to_vec()))
        .unwrap();
    assert!(net.run_until_converged(&["cpe", "b1"], 20, 500));

    let old_record = net
        .engine("b1")
        .find_node(&cpe_id)
        .expect("b1 should know cpe before churn")
        .clone();

    // A full restart of the cpe process: fresh engine, same node id,
    // rejoining the same link. The new incarnation starts with an empty
    // local publisher, same as a real restart where the old TLVs are gone
    // until the collaborator re-adds them.
    net.replace_node("cpe", cpe_id, EngineConfig::default());
    net.rejoin_link("cpe", link, "eth0", EndpointConfig::default());

    net.engine_mut("cpe")
        .add_tlv(Tlv::new(40, b"v2".to_vec()))
        .unwrap();

    assert!(net.run_until_converged(&["cpe", "b1"], 20, 500));

    let record = net
        .engine("b1")
        .find_node(&cpe_id)
        .expect("b1 should re-discover the recreated cpe");
    assert!(
        record.version_key() > old_record.version_key(),
        "new incarnation's version key must win over the pre-churn one"
    );
    assert_eq!(
        record.tlvs.first().map(|t| t.value.as_slice()),
        Some(b"v2".as_slice())
    );
}

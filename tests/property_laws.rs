//! §8 laws: idempotence and monotonicity, property-checked the way the
//! teacher crate's test suite uses `proptest` — generating TLV byte
//! sequences and update-number sequences rather than hand-picking a few
//! fixed cases.

mod common;

use common::Network;
use hncp_engine::publisher::PublisherError;
use hncp_engine::{EngineError, Tlv};
use proptest::prelude::*;

proptest! {
    /// `add_tlv(x); add_tlv(x) => DuplicateTlv` for any TLV shape (§8 idempotence).
    #[test]
    fn add_tlv_twice_is_always_duplicate(tlv_type in any::<u16>(), value in prop::collection::vec(any::<u8>(), 0..64)) {
        let mut net = Network::new();
        net.add_node("solo");
        let tlv = Tlv::new(tlv_type, value);
        net.engine_mut("solo").add_tlv(tlv.clone()).unwrap();
        let err = net.engine_mut("solo").add_tlv(tlv).unwrap_err();
        prop_assert!(matches!(err, EngineError::Publisher(PublisherError::DuplicateTlv { .. })));
    }

    /// `remove_tlv(h); remove_tlv(h) => noop` for any TLV shape (§8 idempotence);
    /// a second removal must never panic or be observable as an error.
    #[test]
    fn remove_tlv_twice_is_a_noop(tlv_type in any::<u16>(), value in prop::collection::vec(any::<u8>(), 0..64)) {
        let mut net = Network::new();
        net.add_node("solo");
        let handle = net.engine_mut("solo").add_tlv(Tlv::new(tlv_type, value)).unwrap();
        net.engine_mut("solo").remove_tlv(handle);
        net.engine_mut("solo").remove_tlv(handle); // must not panic
    }
}

#[test]
fn update_number_is_non_decreasing_as_observed_by_a_peer() {
    let mut net = Network::new();
    let cpe_id = net.add_node("cpe");
    net.add_node("b1");
    net.add_link("eth0", &["cpe", "b1"]);

    let mut observed = Vec::new();
    for i in 0..5u8 {
        net.engine_mut("cpe")
            .add_tlv(Tlv::new(64 + i as u16, vec![i]))
            .unwrap();
        net.run_for(20, 50);
        if let Some(record) = net.engine("b1").find_node(&cpe_id) {
            observed.push(record.update_number);
        }
    }

    assert!(observed.len() >= 2, "expected to observe at least two versions");
    assert!(
        observed.windows(2).all(|w| w[0] <= w[1]),
        "update_number regressed: {observed:?}"
    );
}

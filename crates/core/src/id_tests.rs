// SPDX-License-Identifier: MIT

use super::*;
use crate::clock::FakeClock;
use std::collections::HashMap;

crate::define_id! {
    /// Test ID type for macro verification.
    pub struct TestId("tst");
}

#[test]
fn define_id_carries_prefix_and_timestamp() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(42);
    let id = TestId::new(&clock);
    assert!(id.as_str().starts_with("tst-42-"));
}

#[test]
fn define_id_two_ids_at_same_instant_differ() {
    let clock = FakeClock::new();
    let a = TestId::new(&clock);
    let b = TestId::new(&clock);
    assert_ne!(a, b);
}

#[test]
fn define_id_round_trips_through_string() {
    let clock = FakeClock::new();
    let id = TestId::new(&clock);
    let parsed = TestId::from_string(id.as_str());
    assert_eq!(id, parsed);
}

#[test]
fn define_id_hash_map_lookup_by_str() {
    let clock = FakeClock::new();
    let id = TestId::new(&clock);
    let mut map = HashMap::new();
    map.insert(id.clone(), 42);
    assert_eq!(map.get(id.as_str()), Some(&42));
}

#[test]
fn timestamped_uses_given_prefix_and_epoch() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000);
    let id = timestamped("run", &clock);
    assert!(id.starts_with("run-1000-"));
    assert_eq!(id.split('-').count(), 3);
}

mod proptests {
    use super::TestId;
    use proptest::prelude::*;

    proptest! {
        /// Any string read back off disk round-trips through `from_string`
        /// without panicking or mangling the id, whatever shape it has.
        #[test]
        fn from_string_round_trips_arbitrary_text(raw in "\\PC*") {
            let id = TestId::from_string(&raw);
            prop_assert_eq!(id.as_str(), raw.as_str());
        }
    }
}

//! Config DAG cycle detection (§8 property 6). `evaluate` rejects a direct
//! self-reference up front, and `update` additionally walks the new
//! reference set for a longer path back to the item being updated (A
//! references B, B is later updated to reference A); [`ConfigLibrary::check_acyclic`]
//! is the independent whole-graph walk run at project load time.

use vulsim_engine::configlib::{ConfigGroup, ConfigLibrary};

#[test]
fn acyclic_library_passes() {
    let mut lib = ConfigLibrary::new();
    lib.insert("WIDTH".into(), "8".into(), String::new(), ConfigGroup::ProjectDefault).unwrap();
    lib.insert("DOUBLE".into(), "WIDTH * 2".into(), String::new(), ConfigGroup::ProjectDefault).unwrap();
    lib.insert("QUAD".into(), "DOUBLE * 2".into(), String::new(), ConfigGroup::ProjectDefault).unwrap();

    assert!(lib.check_acyclic().is_ok());
}

#[test]
fn direct_self_reference_rejected_at_insert() {
    let mut lib = ConfigLibrary::new();
    let err = lib.insert("LOOP".into(), "LOOP + 1".into(), String::new(), ConfigGroup::ProjectDefault);
    assert!(err.is_err(), "a config cannot reference itself");
}

#[test]
fn indirect_cycle_introduced_by_a_later_update_is_rejected() {
    let mut lib = ConfigLibrary::new();
    lib.insert("A".into(), "1".into(), String::new(), ConfigGroup::ProjectDefault).unwrap();
    lib.insert("B".into(), "A".into(), String::new(), ConfigGroup::ProjectDefault).unwrap();
    assert!(lib.check_acyclic().is_ok(), "A -> B is still a DAG");

    // Rewriting A to depend on B would close the loop A -> B -> A.
    let err = lib.update("A", "B".into());
    assert!(err.is_err(), "update must refuse a reference set that cycles back to the item itself");
    assert!(lib.check_acyclic().is_ok(), "a rejected update must not have mutated the graph");
}

#[test]
fn three_node_cycle_is_rejected_regardless_of_starting_node() {
    let mut lib = ConfigLibrary::new();
    lib.insert("A".into(), "1".into(), String::new(), ConfigGroup::ProjectDefault).unwrap();
    lib.insert("B".into(), "A".into(), String::new(), ConfigGroup::ProjectDefault).unwrap();
    lib.insert("C".into(), "B".into(), String::new(), ConfigGroup::ProjectDefault).unwrap();

    let err = lib.update("A", "C".into());
    assert!(err.is_err(), "A -> C -> B -> A must be rejected at update time");
    assert!(lib.check_acyclic().is_ok());
}

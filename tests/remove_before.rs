mod common;

use phylotrack_lib::{Systematics, SystematicsConfig, TaxonId};

/// Root (dies at 3) -> middle (dies at 5) -> leaf (alive), plus an archived
/// side branch under the root that died at 2.
fn aged_history() -> (Systematics<u8, u8>, [TaxonId; 4]) {
    let mut sys = Systematics::with_config(|org: &u8| *org, SystematicsConfig::store_all())
        .expect("archiving config is valid");
    let root = sys.add_org(&0, None);
    sys.set_update(1);
    let middle = sys.add_org(&1, Some(root));
    let side = sys.add_org(&9, Some(root));
    sys.set_update(2);
    let leaf = sys.add_org(&2, Some(middle));
    sys.remove_org(side);
    sys.set_update(3);
    sys.remove_org(root);
    sys.set_update(5);
    sys.remove_org(middle);
    (sys, [root, middle, side, leaf])
}

#[test]
fn test_history_layout_before_removal() {
    let (sys, [root, middle, side, leaf]) = aged_history();
    assert_partitions!(sys, active: 1, ancestors: 2, outside: 1);
    assert_eq!(sys.taxon(side).destruction_time(), 2.0);
    assert_eq!(sys.taxon(root).destruction_time(), 3.0);
    assert_eq!(sys.taxon(middle).destruction_time(), 5.0);
    assert!(sys.taxon(leaf).is_active());
}

#[test]
fn test_remove_before_drops_old_prefix() {
    let (mut sys, [root, middle, side, leaf]) = aged_history();

    assert_eq!(sys.remove_before(4.0), 2);
    assert!(!sys.contains(root));
    assert!(!sys.contains(side));
    assert!(sys.contains(middle), "died after the threshold");
    assert!(sys.taxon(middle).is_root());
    assert_eq!(sys.parent(leaf), Some(middle));
    assert_eq!(sys.num_roots(), 1);
    assert_partitions!(sys, active: 1, ancestors: 1, outside: 0);
}

#[test]
fn test_remove_before_is_idempotent() {
    let (mut sys, _) = aged_history();
    let first = sys.remove_before(4.0);
    let taxa_after_first: Vec<TaxonId> = {
        let mut ids: Vec<TaxonId> = sys.iter().map(|t| t.id()).collect();
        ids.sort();
        ids
    };

    assert_eq!(sys.remove_before(4.0), 0);
    let mut ids: Vec<TaxonId> = sys.iter().map(|t| t.id()).collect();
    ids.sort();
    assert_eq!(ids, taxa_after_first);
    assert!(first > 0);
}

#[test]
fn test_remove_before_keeps_everything_younger() {
    let (mut sys, _) = aged_history();
    assert_eq!(sys.remove_before(1.0), 0);
    assert_eq!(sys.remove_before(2.0), 0, "bound is strict");
    assert_eq!(sys.num_taxa(), 4);
}

#[test]
fn test_remove_before_never_touches_active_taxa() {
    let (mut sys, [.., leaf]) = aged_history();
    sys.remove_before(f64::MAX);
    assert_eq!(sys.num_taxa(), 1);
    assert!(sys.taxon(leaf).is_root());
    assert_eq!(sys.mrca(), Some(leaf));
}

#[test]
fn test_outside_taxon_under_living_parent_survives() {
    let mut sys = Systematics::with_config(|org: &u8| *org, SystematicsConfig::store_all())
        .expect("archiving config is valid");
    let root = sys.add_org(&0, None);
    let child = sys.add_org(&1, Some(root));
    sys.remove_org(child);

    assert_eq!(sys.remove_before(100.0), 0);
    assert!(sys.contains(child));
}

use phylotrack_lib::{Systematics, SystematicsConfig, SystematicsError, TaxonState, WorldPosition};

fn positional() -> Systematics<u8, u8> {
    let config = SystematicsConfig {
        store_position: true,
        ..SystematicsConfig::default()
    };
    Systematics::with_config(|org: &u8| *org, config).unwrap()
}

#[test]
fn test_positional_birth_and_death() {
    let mut sys = positional();
    let pos = WorldPosition::active(3);
    let id = sys.add_org_at(&5, pos, None);
    assert_eq!(sys.taxon_at(pos), Some(id));

    assert_eq!(sys.remove_org_at(pos), Ok(true));
    assert!(!sys.is_taxon_at(pos));
    assert_eq!(
        sys.remove_org_at(pos),
        Err(SystematicsError::NoTaxonAtPosition(pos))
    );
}

#[test]
fn test_positional_calls_fail_without_tracking() {
    let mut sys = Systematics::<u8, u8>::identity();
    let pos = WorldPosition::active(0);
    let id = sys.add_org_at(&1, pos, None);

    assert_eq!(sys.taxon_at(pos), None, "positions are ignored");
    assert!(sys.taxon(id).is_active());
    assert_eq!(
        sys.remove_org_at(pos),
        Err(SystematicsError::PositionTrackingDisabled)
    );
    assert_eq!(
        sys.set_next_parent_at(pos),
        Err(SystematicsError::PositionTrackingDisabled)
    );
    assert!(sys
        .add_org_at_with_parent_pos(&2, WorldPosition::active(1), pos)
        .is_err());
}

#[test]
fn test_parent_by_position() {
    let mut sys = positional();
    let root = sys.add_org_at(&1, WorldPosition::active(0), None);
    let child = sys
        .add_org_at_with_parent_pos(&2, WorldPosition::active(1), WorldPosition::active(0))
        .unwrap();
    assert_eq!(sys.parent(child), Some(root));

    sys.set_next_parent_at(WorldPosition::active(1)).unwrap();
    let grandchild = sys.add_org_at(&3, WorldPosition::active(2), None);
    assert_eq!(sys.parent(grandchild), Some(child));
}

#[test]
fn test_swap_positions() {
    let mut sys = positional();
    let a = sys.add_org_at(&1, WorldPosition::active(0), None);
    let b = sys.add_org_at(&2, WorldPosition::active(1), None);

    sys.swap_positions(WorldPosition::active(0), WorldPosition::active(1));
    assert_eq!(sys.taxon_at(WorldPosition::active(0)), Some(b));
    assert_eq!(sys.taxon_at(WorldPosition::active(1)), Some(a));

    sys.swap_positions(WorldPosition::active(1), WorldPosition::active(5));
    assert_eq!(sys.taxon_at(WorldPosition::active(1)), None);
    assert_eq!(sys.taxon_at(WorldPosition::active(5)), Some(a));

    let occupied: Vec<_> = sys.occupied_positions().collect();
    assert_eq!(
        occupied,
        vec![(WorldPosition::active(0), b), (WorldPosition::active(5), a)]
    );
}

#[test]
fn test_replacing_birth_keeps_new_occupant() {
    let mut sys = positional();
    let slot = WorldPosition::active(0);
    let parent = sys.add_org_at(&1, slot, None);

    sys.remove_org_at_after_repro(slot).unwrap();
    let child = sys.add_org_at_with_parent_pos(&2, slot, slot).unwrap();

    assert_eq!(sys.taxon_at(slot), Some(child));
    assert_eq!(sys.taxon(parent).state(), TaxonState::Ancestor);
}

#[test]
fn test_deferred_death_clears_its_slot() {
    let mut sys = positional();
    let parent = sys.add_org_at(&1, WorldPosition::active(0), None);

    sys.remove_org_at_after_repro(WorldPosition::active(0)).unwrap();
    let child = sys
        .add_org_at_with_parent_pos(&1, WorldPosition::active(1), WorldPosition::active(0))
        .unwrap();

    assert_eq!(child, parent, "same genome joins the parent taxon");
    assert_eq!(sys.taxon_at(WorldPosition::active(0)), None);
    assert_eq!(sys.taxon_at(WorldPosition::active(1)), Some(parent));
    assert_eq!(sys.taxon(parent).num_orgs(), 1);
}

#[test]
fn test_disabling_position_tracking_forgets_slots() {
    let mut sys = positional();
    sys.add_org_at(&1, WorldPosition::active(0), None);
    sys.set_store_position(false);
    sys.set_store_position(true);
    assert_eq!(sys.taxon_at(WorldPosition::active(0)), None);
}

#[test]
fn test_synchronous_generations() {
    let config = SystematicsConfig {
        store_position: true,
        track_synchronous: true,
        ..SystematicsConfig::default()
    };
    let mut sys = Systematics::with_config(|org: &u8| *org, config).unwrap();
    let a = sys.add_org_at(&1, WorldPosition::active(0), None);
    let b = sys.add_org_at(&2, WorldPosition::active(1), None);

    let next0 = WorldPosition::new(0, 1);
    let next1 = WorldPosition::new(1, 1);
    let same = sys
        .add_org_at_with_parent_pos(&1, next0, WorldPosition::active(0))
        .unwrap();
    let c = sys
        .add_org_at_with_parent_pos(&3, next1, WorldPosition::active(0))
        .unwrap();
    assert_eq!(same, a);
    assert_eq!(sys.taxon(a).num_orgs(), 2);

    sys.update();
    assert_eq!(sys.current_update(), 1);
    assert_eq!(sys.taxon_at(WorldPosition::active(0)), Some(a));
    assert_eq!(sys.taxon_at(WorldPosition::active(1)), Some(c));
    assert_eq!(sys.taxon(a).num_orgs(), 1);
    assert!(!sys.contains(b), "unreplaced lineage died with its generation");
    assert_eq!(sys.num_active(), 2);
    assert_eq!(sys.num_roots(), 1);
}

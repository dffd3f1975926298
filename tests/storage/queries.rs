//! Integration tests for the query engine
//!
//! Tests tuple shapes, exclusion, the entity pseudo-term, cache coherence,
//! and mutable iteration.

use sandtable_storage::query::{EntityRef, Without};
use sandtable_storage::World;

#[derive(Debug, PartialEq, Clone, Copy)]
struct Position {
    x: i32,
    y: i32,
}

#[derive(Debug, PartialEq, Clone, Copy)]
struct Velocity {
    x: i32,
    y: i32,
}

struct Frozen;

// =============================================================================
// Matching
// =============================================================================

#[test]
fn query_matches_supersets_of_the_required_set() {
    let mut world = World::new();
    let position = world.register_component::<Position>();
    let velocity = world.register_component::<Velocity>();

    world.spawn((position, Position { x: 1, y: 1 }));
    world.spawn(((position, Position { x: 2, y: 2 }), (velocity, Velocity { x: 0, y: 0 })));

    assert_eq!(world.query((position,)).len(), 2);
    assert_eq!(world.query((position, velocity)).len(), 1);
    assert_eq!(world.query((velocity,)).len(), 1);
}

#[test]
fn entity_ref_yields_the_owning_id() {
    let mut world = World::new();
    let position = world.register_component::<Position>();

    let a = world.spawn((position, Position { x: 1, y: 1 }));
    let b = world.spawn((position, Position { x: 2, y: 2 }));

    let mut seen: Vec<_> = world.query((EntityRef, position)).into_iter().map(|(e, _)| e).collect();
    seen.sort_unstable();
    let mut expected = vec![a, b];
    expected.sort_unstable();
    assert_eq!(seen, expected);
}

#[test]
fn without_excludes_archetypes_owning_the_token() {
    let mut world = World::new();
    let position = world.register_component::<Position>();
    let frozen = world.register_component::<Frozen>();

    world.spawn(((position, Position { x: 1, y: 1 }), (frozen, Frozen)));
    let free = world.spawn((position, Position { x: 2, y: 2 }));

    let rows = world.query((EntityRef, position, Without(frozen)));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, free);
}

#[test]
fn unmatched_queries_return_empty() {
    let mut world = World::new();
    let position = world.register_component::<Position>();
    let velocity = world.register_component::<Velocity>();

    world.spawn((position, Position { x: 1, y: 1 }));

    assert!(world.query((velocity,)).is_empty());
    assert!(world.query_added((velocity,)).is_empty());
    assert!(world.query_removed(velocity).is_empty());
}

// =============================================================================
// Cache coherence
// =============================================================================

#[test]
fn cached_membership_sees_live_values() {
    let mut world = World::new();
    let position = world.register_component::<Position>();

    let e = world.spawn((position, Position { x: 0, y: 0 }));
    assert_eq!(world.query((position,))[0].0.x, 0);

    if let Some(pos) = world.get_mut(e, position) {
        pos.x = 99;
    }
    // Only membership is cached; the mutation is immediately visible.
    assert_eq!(world.query((position,))[0].0.x, 99);
}

#[test]
fn new_archetypes_join_existing_cached_queries() {
    let mut world = World::new();
    let position = world.register_component::<Position>();
    let velocity = world.register_component::<Velocity>();

    world.spawn((position, Position { x: 1, y: 1 }));
    assert_eq!(world.query((position,)).len(), 1);

    // Creates a new archetype after the cache was primed.
    world.spawn(((position, Position { x: 2, y: 2 }), (velocity, Velocity { x: 0, y: 0 })));
    assert_eq!(world.query((position,)).len(), 2);
}

#[test]
fn migration_moves_rows_between_cached_matches() {
    let mut world = World::new();
    let position = world.register_component::<Position>();
    let velocity = world.register_component::<Velocity>();

    let e = world.spawn((position, Position { x: 1, y: 1 }));
    world.spawn((position, Position { x: 2, y: 2 }));
    assert_eq!(world.query((position, velocity)).len(), 0);

    world.insert(e, (velocity, Velocity { x: 3, y: 3 }));
    assert_eq!(world.query((position, velocity)).len(), 1);
    assert_eq!(world.query((position,)).len(), 2);
}

// =============================================================================
// Mutable iteration
// =============================================================================

#[test]
fn query_mut_applies_to_every_matching_row() {
    let mut world = World::new();
    let position = world.register_component::<Position>();
    let velocity = world.register_component::<Velocity>();

    world.spawn_batch(4, |i| {
        let i = i32::try_from(i).unwrap();
        (
            (position, Position { x: i, y: 0 }),
            (velocity, Velocity { x: 1, y: 2 }),
        )
    });

    world.query_mut((position, velocity), |(pos, vel): (&mut Position, &mut Velocity)| {
        pos.x += vel.x;
        pos.y += vel.y;
    });

    for (i, (pos, _)) in world.query((position, velocity)).into_iter().enumerate() {
        let i = i32::try_from(i).unwrap();
        assert_eq!(pos, &Position { x: i + 1, y: 2 });
    }
}

#[test]
fn query_mut_visits_entity_refs_read_only() {
    let mut world = World::new();
    let position = world.register_component::<Position>();

    let e = world.spawn((position, Position { x: 0, y: 0 }));

    let mut visited = Vec::new();
    world.query_mut((EntityRef, position), |(entity, pos): (sandtable_foundation::Entity, &mut Position)| {
        pos.x = 5;
        visited.push(entity);
    });

    assert_eq!(visited, vec![e]);
    assert_eq!(world.get(e, position), Some(&Position { x: 5, y: 0 }));
}

#[test]
fn query_mut_honors_exclusion_terms() {
    let mut world = World::new();
    let position = world.register_component::<Position>();
    let frozen = world.register_component::<Frozen>();

    let free = world.spawn((position, Position { x: 0, y: 0 }));
    let stuck = world.spawn(((position, Position { x: 0, y: 0 }), (frozen, Frozen)));

    world.query_mut((position, Without(frozen)), |(pos, ()): (&mut Position, ())| {
        pos.x += 1;
    });

    assert_eq!(world.get(free, position), Some(&Position { x: 1, y: 0 }));
    assert_eq!(world.get(stuck, position), Some(&Position { x: 0, y: 0 }));
}

#[test]
fn query_mut_marks_every_visited_pair_changed() {
    let mut world = World::new();
    let position = world.register_component::<Position>();
    let velocity = world.register_component::<Velocity>();

    world.spawn(((position, Position { x: 0, y: 0 }), (velocity, Velocity { x: 0, y: 0 })));

    // Visitor writes nothing; access still counts.
    world.query_mut((position, velocity), |_: (&mut Position, &mut Velocity)| {});
    world.finalize_tick();

    assert_eq!(world.query_changed((position,)).len(), 1);
    assert_eq!(world.query_changed((velocity,)).len(), 1);
}

//! Integration tests for the full tick cycle
//!
//! Tests change-tracking windows, deferred despawn, and channel expiry as
//! observed through `App::update`.

use sandtable_engine::App;
use sandtable_foundation::StageId;
use sandtable_storage::World;
use sandtable_storage::query::EntityRef;

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

#[derive(Debug, PartialEq, Clone)]
struct Ping(u32);

// =============================================================================
// Change-tracking windows across updates
// =============================================================================

#[test]
fn added_window_opens_and_closes_one_tick_later() {
    let mut app = App::new();
    let position = app.world_mut().register_component::<Position>();

    let e = app.world_mut().spawn((position, Position { x: 0, y: 0 }));

    // Tick 0: not yet visible.
    assert!(app.world().query_added((position,)).is_empty());

    app.update().unwrap();
    let added = app.world().query_added((EntityRef, position));
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].0, e);

    app.update().unwrap();
    assert!(app.world().query_added((position,)).is_empty());
}

#[test]
fn removed_window_behaves_symmetrically() {
    let mut app = App::new();
    let position = app.world_mut().register_component::<Position>();
    let velocity = app.world_mut().register_component::<Velocity>();

    let e = app
        .world_mut()
        .spawn(((position, Position { x: 0, y: 0 }), (velocity, Velocity { x: 1, y: 1 })));
    app.update().unwrap();

    app.world_mut().remove(e, velocity);
    app.update().unwrap();
    assert_eq!(app.world().query_removed(velocity), vec![e]);

    app.update().unwrap();
    assert!(app.world().query_removed(velocity).is_empty());
}

#[test]
fn systems_observe_last_ticks_changes() {
    let mut app = App::new();
    let position = app.world_mut().register_component::<Position>();
    let count = app.world_mut().register_resource::<u32>();
    app.world_mut().insert_resource(count, 0);

    app.add_system(StageId::UPDATE, move |world: &mut World| {
        let added = world.query_added((position,)).len();
        if let Some(total) = world.get_resource_mut(count) {
            *total += u32::try_from(added).unwrap();
        }
        Ok(())
    });

    app.world_mut().spawn((position, Position { x: 0, y: 0 }));
    app.update().unwrap(); // Sees nothing: the spawn happened this tick.
    app.update().unwrap(); // Sees the spawn from the previous tick.
    app.update().unwrap(); // Window closed again.

    assert_eq!(app.world().get_resource(count), Some(&1));
}

// =============================================================================
// Deferred despawn through the loop
// =============================================================================

#[test]
fn despawn_during_update_lands_at_tick_end() {
    let mut app = App::new();
    let position = app.world_mut().register_component::<Position>();
    let seen = app.world_mut().register_resource::<usize>();
    app.world_mut().insert_resource(seen, 0);

    let e = app.world_mut().spawn((position, Position { x: 0, y: 0 }));

    app.add_system(StageId::UPDATE, move |world: &mut World| {
        world.despawn(e);
        Ok(())
    });
    // A later stage in the same tick still sees the entity.
    app.add_system(StageId::POST_UPDATE, move |world: &mut World| {
        let count = world.query((position,)).len();
        if let Some(slot) = world.get_resource_mut(seen) {
            *slot = count;
        }
        Ok(())
    });

    app.update().unwrap();
    assert_eq!(app.world().get_resource(seen), Some(&1));
    assert!(!app.world().contains(e));
    assert!(app.world().query((position,)).is_empty());
}

// =============================================================================
// Channels through the loop
// =============================================================================

#[test]
fn events_cross_exactly_one_tick_boundary() {
    let mut app = App::new();
    let pings = app.world_mut().register_event::<Ping>();
    let received = app.world_mut().register_resource::<Vec<u32>>();
    app.world_mut().insert_resource(received, Vec::new());

    app.add_system(StageId::UPDATE, move |world: &mut World| {
        if world.tick() == 0 {
            world.send(pings, Ping(7));
        }
        Ok(())
    });
    let mut reader = app.world_mut().reader(pings);
    app.add_system(StageId::POST_UPDATE, move |world: &mut World| {
        let values: Vec<u32> = reader.read(world).iter().map(|ping| ping.0).collect();
        if let Some(log) = world.get_resource_mut(received) {
            log.extend(values);
        }
        Ok(())
    });

    app.update().unwrap(); // Sent and read within tick 0.
    app.update().unwrap();
    app.update().unwrap();

    assert_eq!(app.world().get_resource(received), Some(&vec![7]));
}

#[test]
fn producer_and_consumer_systems_decouple_across_ticks() {
    let mut app = App::new();
    let pings = app.world_mut().register_event::<Ping>();
    let received = app.world_mut().register_resource::<Vec<u32>>();
    app.world_mut().insert_resource(received, Vec::new());

    // Producer runs late in the tick; the consumer reads early in the next.
    app.add_system(StageId::POST_UPDATE, move |world: &mut World| {
        let tick = u32::try_from(world.tick()).unwrap();
        world.send(pings, Ping(tick));
        Ok(())
    });
    let mut reader = app.world_mut().reader(pings);
    app.add_system(StageId::PRE_UPDATE, move |world: &mut World| {
        let values: Vec<u32> = reader.read(world).iter().map(|ping| ping.0).collect();
        if let Some(log) = world.get_resource_mut(received) {
            log.extend(values);
        }
        Ok(())
    });

    app.update().unwrap(); // Produces 0.
    app.update().unwrap(); // Consumes 0, produces 1.
    app.update().unwrap(); // Consumes 1, produces 2.

    assert_eq!(app.world().get_resource(received), Some(&vec![0, 1]));
}

// =============================================================================
// Bootstrap hook
// =============================================================================

#[test]
fn bootstrap_effects_are_visible_on_the_next_tick() {
    let mut app = App::new();
    let position = app.world_mut().register_component::<Position>();
    let seen = app.world_mut().register_resource::<usize>();
    app.world_mut().insert_resource(seen, 0);

    app.add_system(StageId::UPDATE, move |world: &mut World| {
        let count = world.query((position,)).len();
        if let Some(slot) = world.get_resource_mut(seen) {
            *slot = count;
        }
        Ok(())
    });

    app.update().unwrap();
    assert_eq!(app.world().get_resource(seen), Some(&0));

    app.bootstrap(|world| {
        world.spawn((position, Position { x: 1, y: 1 }));
        Ok(())
    })
    .unwrap();

    app.update().unwrap();
    assert_eq!(app.world().get_resource(seen), Some(&1));
}

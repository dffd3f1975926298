//! End-to-end scenario tests
//!
//! Small simulations built on the public surface only, the way a game
//! layer would consume the runtime.

use sandtable_engine::App;
use sandtable_engine::schedule::in_state;
use sandtable_foundation::StageId;
use sandtable_storage::World;
use sandtable_storage::query::{EntityRef, Without};

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

#[derive(Debug, PartialEq, Clone, Copy)]
struct Health(i32);

struct Anchored;

#[derive(Debug, PartialEq, Clone)]
struct Damage {
    amount: i32,
}

#[test]
fn late_component_addition_is_observable_as_added() {
    let mut app = App::new();
    let position = app.world_mut().register_component::<Position>();
    let velocity = app.world_mut().register_component::<Velocity>();

    let e = app.world_mut().spawn((position, Position { x: 1, y: 1 }));
    app.update().unwrap();

    app.world_mut().insert(e, (velocity, Velocity { x: 2, y: 2 }));
    app.update().unwrap();

    let rows = app.world().query_added((EntityRef, velocity));
    assert_eq!(rows.len(), 1);
    let (id, vel) = rows[0];
    assert_eq!(id, e);
    assert_eq!(vel, &Velocity { x: 2, y: 2 });
}

#[test]
fn movement_simulation_advances_only_free_bodies() {
    let mut app = App::new();
    let position = app.world_mut().register_component::<Position>();
    let velocity = app.world_mut().register_component::<Velocity>();
    let anchored = app.world_mut().register_component::<Anchored>();

    let mover = app
        .world_mut()
        .spawn(((position, Position { x: 0, y: 0 }), (velocity, Velocity { x: 1, y: 2 })));
    let anchor = app.world_mut().spawn((
        (position, Position { x: 10, y: 10 }),
        (velocity, Velocity { x: 1, y: 1 }),
        (anchored, Anchored),
    ));

    app.add_system(StageId::UPDATE, move |world: &mut World| {
        world.query_mut(
            (position, velocity, Without(anchored)),
            |(pos, vel, ()): (&mut Position, &mut Velocity, ())| {
                pos.x += vel.x;
                pos.y += vel.y;
            },
        );
        Ok(())
    });

    for _ in 0..3 {
        app.update().unwrap();
    }

    assert_eq!(app.world().get(mover, position), Some(&Position { x: 3, y: 6 }));
    assert_eq!(app.world().get(anchor, position), Some(&Position { x: 10, y: 10 }));
}

#[test]
fn combat_loop_with_events_states_and_despawn() {
    let mut app = App::new();
    let health = app.world_mut().register_component::<Health>();
    let damage = app.world_mut().register_event::<Damage>();
    let phase = app.world_mut().register_state(&["fighting", "over"], "fighting");
    app.world_mut().insert_state(phase);

    let target = app.world_mut().spawn((health, Health(10)));

    // Damage application, active only while fighting.
    let mut reader = app.world_mut().reader(damage);
    app.add_system_when(
        StageId::UPDATE,
        move |world: &mut World| {
            let total: i32 = reader.read(world).iter().map(|hit| hit.amount).sum();
            if total == 0 {
                return Ok(());
            }
            if let Some(hp) = world.get_mut(target, health) {
                hp.0 -= total;
            }
            Ok(())
        },
        vec![in_state(phase, "fighting")],
    );

    // Death check ends the fight and despawns the target.
    app.add_system(StageId::POST_UPDATE, move |world: &mut World| {
        let dead = world.get(target, health).is_some_and(|hp| hp.0 <= 0);
        if dead {
            world.despawn(target);
            world.set_state(phase, "over");
        }
        Ok(())
    });

    app.world_mut().send(damage, Damage { amount: 4 });
    app.update().unwrap();
    assert_eq!(app.world().get(target, health), Some(&Health(6)));
    assert_eq!(app.world().state(phase), Some("fighting"));

    app.world_mut().send(damage, Damage { amount: 7 });
    app.update().unwrap();
    assert!(!app.world().contains(target));
    assert_eq!(app.world().state(phase), Some("over"));

    // Further damage is ignored: the guard now fails.
    app.world_mut().send(damage, Damage { amount: 100 });
    app.update().unwrap();
    assert_eq!(app.world().query_removed(health).len(), 0);
}

#[test]
fn registered_archetype_accepts_exact_signature_spawns() {
    let mut world = World::new();
    let position = world.register_component::<Position>();
    let velocity = world.register_component::<Velocity>();

    world.register_archetype((position, velocity));

    let e = world.spawn(((position, Position { x: 1, y: 2 }), (velocity, Velocity { x: 3, y: 4 })));
    assert_eq!(world.get(e, position), Some(&Position { x: 1, y: 2 }));
    assert_eq!(world.get(e, velocity), Some(&Velocity { x: 3, y: 4 }));
    assert_eq!(world.query((position, velocity)).len(), 1);
}

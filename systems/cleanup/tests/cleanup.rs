use std::time::Duration;

use miasma_core::{Command, Event, TileCoord, TileMapper};
use miasma_system_cleanup::{Cleanup, Config};
use miasma_world::{self as world, query, World};

fn world() -> World {
    World::new(TileMapper::new(1.0).expect("valid tile size"))
}

fn clear_at(world: &mut World, elapsed: Duration, tiles: &[(i32, i32)]) {
    let mut events = Vec::new();
    world::apply(world, Command::Tick { dt: elapsed }, &mut events);
    world::apply(
        world,
        Command::ClearTiles {
            tiles: tiles.iter().map(|&(x, y)| TileCoord::new(x, y)).collect(),
        },
        &mut events,
    );
}

fn sweep(cleanup: &mut Cleanup, world: &mut World) -> Vec<Event> {
    let mut commands = Vec::new();
    cleanup.handle(query::now(world), query::cleared_cells(world), &mut commands);
    let mut events = Vec::new();
    for command in commands {
        world::apply(world, command, &mut events);
    }
    events
}

#[test]
fn tiles_expire_after_time_to_live() {
    let mut world = world();
    let mut cleanup = Cleanup::new(Config::new(Some(Duration::from_secs(5)), None));
    clear_at(&mut world, Duration::ZERO, &[(0, 0)]);

    clear_at(&mut world, Duration::from_secs(5), &[]);
    assert!(sweep(&mut cleanup, &mut world).is_empty(), "age equal to ttl survives");

    clear_at(&mut world, Duration::from_secs(1), &[]);
    let events = sweep(&mut cleanup, &mut world);

    assert_eq!(
        events,
        vec![Event::TilesEvicted {
            expired: 1,
            over_capacity: 0
        }]
    );
    assert!(!query::is_cleared(&world, TileCoord::new(0, 0)));
    assert_eq!(query::stats(&world).expired, 1);
}

#[test]
fn capacity_evicts_exactly_the_oldest() {
    let mut world = world();
    let mut cleanup = Cleanup::new(Config::new(None, Some(3)));
    clear_at(&mut world, Duration::ZERO, &[(4, 4), (0, 0)]);
    clear_at(&mut world, Duration::from_secs(1), &[(1, 0)]);
    clear_at(&mut world, Duration::from_secs(1), &[(2, 0), (3, 0)]);

    let events = sweep(&mut cleanup, &mut world);

    assert_eq!(
        events,
        vec![Event::TilesEvicted {
            expired: 0,
            over_capacity: 2
        }]
    );
    assert_eq!(query::cleared_count(&world), 3);
    assert!(!query::is_cleared(&world, TileCoord::new(4, 4)));
    assert!(!query::is_cleared(&world, TileCoord::new(0, 0)));
    assert!(query::is_cleared(&world, TileCoord::new(1, 0)));
    assert!(query::is_cleared(&world, TileCoord::new(3, 0)));
}

#[test]
fn equal_timestamps_fall_back_to_insertion_order() {
    let mut world = world();
    let mut cleanup = Cleanup::new(Config::new(None, Some(2)));
    clear_at(&mut world, Duration::ZERO, &[(9, 9)]);
    clear_at(&mut world, Duration::ZERO, &[(-9, -9)]);
    clear_at(&mut world, Duration::ZERO, &[(0, 5)]);

    let _ = sweep(&mut cleanup, &mut world);

    assert!(!query::is_cleared(&world, TileCoord::new(9, 9)));
    assert!(query::is_cleared(&world, TileCoord::new(-9, -9)));
    assert!(query::is_cleared(&world, TileCoord::new(0, 5)));
}

#[test]
fn expired_tiles_count_towards_capacity() {
    let mut world = world();
    let mut cleanup = Cleanup::new(Config::new(Some(Duration::from_secs(2)), Some(2)));
    clear_at(&mut world, Duration::ZERO, &[(0, 0), (1, 0)]);
    clear_at(&mut world, Duration::from_secs(2), &[(2, 0), (3, 0)]);
    clear_at(&mut world, Duration::from_secs(1), &[]);

    let events = sweep(&mut cleanup, &mut world);

    assert_eq!(
        events,
        vec![Event::TilesEvicted {
            expired: 2,
            over_capacity: 0
        }]
    );
    assert_eq!(query::cleared_count(&world), 2);
}

#[test]
fn store_under_limits_is_untouched() {
    let mut world = world();
    let mut cleanup = Cleanup::new(Config::new(Some(Duration::from_secs(60)), Some(10)));
    clear_at(&mut world, Duration::ZERO, &[(0, 0), (0, 1), (0, 2)]);
    clear_at(&mut world, Duration::from_secs(30), &[]);

    assert!(sweep(&mut cleanup, &mut world).is_empty());
    assert_eq!(query::cleared_count(&world), 3);
    assert_eq!(query::version(&world), 1);
}

#[test]
fn empty_store_emits_nothing() {
    let mut world = world();
    let mut cleanup = Cleanup::new(Config::new(Some(Duration::from_millis(1)), Some(1)));
    clear_at(&mut world, Duration::from_secs(90), &[]);

    let mut commands = Vec::new();
    cleanup.handle(query::now(&world), query::cleared_cells(&world), &mut commands);

    assert!(commands.is_empty());
    assert_eq!(query::version(&world), 0);
}

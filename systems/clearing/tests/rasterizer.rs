use std::collections::BTreeSet;

use glam::Vec2;
use miasma_core::{ClearShape, Command, Event, TileCoord, TileMapper};
use miasma_system_clearing::{rasterize, Clearing};
use miasma_world::{self as world, query, World};

fn tiles_of(shape: ClearShape, tile_size: f32) -> BTreeSet<TileCoord> {
    let mapper = TileMapper::new(tile_size).expect("valid tile size");
    let mut tiles = BTreeSet::new();
    rasterize(shape, mapper, |tile| {
        let _ = tiles.insert(tile);
    });
    tiles
}

fn coords(pairs: &[(i32, i32)]) -> BTreeSet<TileCoord> {
    pairs.iter().map(|&(x, y)| TileCoord::new(x, y)).collect()
}

#[test]
fn circle_centred_on_tile_clears_thirteen_tiles() {
    let tiles = tiles_of(
        ClearShape::Circle {
            center: Vec2::new(0.5, 0.5),
            radius: 2.0,
        },
        1.0,
    );

    assert_eq!(tiles.len(), 13);
    assert!(tiles.contains(&TileCoord::new(2, 0)));
    assert!(tiles.contains(&TileCoord::new(0, -2)));
    assert!(!tiles.contains(&TileCoord::new(2, 1)));
}

#[test]
fn circle_centred_on_vertex_clears_block_without_corners() {
    let tiles = tiles_of(
        ClearShape::Circle {
            center: Vec2::ZERO,
            radius: 2.0,
        },
        1.0,
    );

    let mut expected = BTreeSet::new();
    for y in -2..2 {
        for x in -2..2 {
            let corner = (x == -2 || x == 1) && (y == -2 || y == 1);
            if !corner {
                let _ = expected.insert(TileCoord::new(x, y));
            }
        }
    }
    assert_eq!(tiles.len(), 12);
    assert_eq!(tiles, expected);
}

#[test]
fn circle_respects_tile_size() {
    let tiles = tiles_of(
        ClearShape::Circle {
            center: Vec2::new(24.0, 24.0),
            radius: 32.0,
        },
        16.0,
    );

    assert_eq!(tiles.len(), 13);
    assert!(tiles.contains(&TileCoord::new(1, 1)));
    assert!(tiles.contains(&TileCoord::new(3, 1)));
}

#[test]
fn cone_covers_sector_along_direction() {
    let tiles = tiles_of(
        ClearShape::Cone {
            origin: Vec2::new(0.5, 0.5),
            direction: Vec2::new(2.0, 0.0),
            length: 3.0,
            half_angle: 0.5,
        },
        1.0,
    );

    assert_eq!(
        tiles,
        coords(&[(0, 0), (1, 0), (2, -1), (2, 0), (2, 1), (3, 0)])
    );
}

#[test]
fn cone_always_includes_origin_tile() {
    let narrow = tiles_of(
        ClearShape::Cone {
            origin: Vec2::new(5.2, -3.7),
            direction: Vec2::Y,
            length: 0.0,
            half_angle: 0.0,
        },
        1.0,
    );
    assert_eq!(narrow, coords(&[(5, -4)]));

    let directionless = tiles_of(
        ClearShape::Cone {
            origin: Vec2::new(0.5, 0.5),
            direction: Vec2::ZERO,
            length: 10.0,
            half_angle: 1.0,
        },
        1.0,
    );
    assert_eq!(directionless, coords(&[(0, 0)]));
}

#[test]
fn thin_line_through_tile_centres_has_no_gaps() {
    let tiles = tiles_of(
        ClearShape::Line {
            origin: Vec2::new(0.5, 0.5),
            direction: Vec2::X,
            length: 10.0,
            thickness: 0.2,
        },
        1.0,
    );

    let expected: BTreeSet<_> = (0..=10).map(|x| TileCoord::new(x, 0)).collect();
    assert_eq!(tiles, expected);
}

#[test]
fn thick_line_is_a_capsule() {
    let tiles = tiles_of(
        ClearShape::Line {
            origin: Vec2::new(0.5, 0.5),
            direction: Vec2::new(3.0, 0.0),
            length: 6.0,
            thickness: 3.0,
        },
        1.0,
    );

    let mut expected = BTreeSet::new();
    for y in -1..=1 {
        for x in -1..=7 {
            let _ = expected.insert(TileCoord::new(x, y));
        }
    }
    assert_eq!(tiles, expected);
}

#[test]
fn clearing_batch_reports_only_new_tiles() {
    let mapper = TileMapper::new(1.0).expect("valid tile size");
    let mut world = World::new(mapper);
    let mut clearing = Clearing::new(64);
    let mut commands = Vec::new();
    let mut events = Vec::new();

    let circle = ClearShape::Circle {
        center: Vec2::new(0.5, 0.5),
        radius: 2.0,
    };
    clearing.handle(circle, mapper, &mut commands);
    for command in commands.drain(..) {
        world::apply(&mut world, command, &mut events);
    }
    assert_eq!(events, vec![Event::TilesCleared { count: 13 }]);

    events.clear();
    clearing.handle(circle, mapper, &mut commands);
    assert_eq!(commands.len(), 1, "rasterizer still emits the batch");
    for command in commands.drain(..) {
        world::apply(&mut world, command, &mut events);
    }
    assert!(events.is_empty(), "re-clearing must not notify: {events:?}");

    clearing.handle(
        ClearShape::Circle {
            center: Vec2::new(2.5, 0.5),
            radius: 2.0,
        },
        mapper,
        &mut commands,
    );
    let inserted = match commands.as_slice() {
        [Command::ClearTiles { tiles }] => tiles
            .iter()
            .filter(|tile| !query::is_cleared(&world, **tile))
            .count(),
        other => panic!("unexpected commands emitted: {other:?}"),
    };
    for command in commands.drain(..) {
        world::apply(&mut world, command, &mut events);
    }
    assert_eq!(events, vec![Event::TilesCleared { count: inserted }]);
    assert_eq!(query::cleared_count(&world), 13 + inserted);
}

#[test]
fn oversized_shapes_leave_the_world_untouched() {
    let mapper = TileMapper::new(1.0).expect("valid tile size");
    let mut world = World::new(mapper);
    let mut clearing = Clearing::new(256);
    let mut commands = Vec::new();

    for shape in [
        ClearShape::Circle {
            center: Vec2::ZERO,
            radius: 1.0e6,
        },
        ClearShape::Cone {
            origin: Vec2::ZERO,
            direction: Vec2::Y,
            length: 1.0e6,
            half_angle: 0.3,
        },
        ClearShape::Line {
            origin: Vec2::ZERO,
            direction: Vec2::X,
            length: 1.0e30,
            thickness: 1.0,
        },
    ] {
        clearing.handle(shape, mapper, &mut commands);
    }

    assert!(commands.is_empty(), "unexpected commands: {commands:?}");
    assert_eq!(query::cleared_count(&world), 0);

    clearing.handle(
        ClearShape::Circle {
            center: Vec2::new(0.5, 0.5),
            radius: 2.0,
        },
        mapper,
        &mut commands,
    );
    let mut events = Vec::new();
    for command in commands.drain(..) {
        world::apply(&mut world, command, &mut events);
    }
    assert_eq!(query::cleared_count(&world), 13);
}

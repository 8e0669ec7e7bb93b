#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that turns clearing shapes into tile batches.
//!
//! Rasterization works on tile centres: a tile is affected when its centre
//! satisfies the geometric test of the shape. Degenerate shapes (non-finite
//! values, negative extents or angles) affect no tiles. Shapes reaching
//! further than the configured maximum are rejected before any tile is
//! visited.

use glam::Vec2;
use miasma_core::{ClearShape, Command, TileCoord, TileMapper};
use tracing::{debug, warn};

const LINE_STEP_FRACTION: f32 = 0.4;
const MIN_LINE_STEP_FRACTION: f32 = 0.05;

/// Clearing system that reuses a scratch buffer to deduplicate tiles.
#[derive(Debug)]
pub struct Clearing {
    max_extent_tiles: u32,
    scratch: Vec<TileCoord>,
}

impl Clearing {
    /// Creates a clearing system that rejects shapes reaching further than
    /// `max_extent_tiles` tiles from their anchor.
    #[must_use]
    pub fn new(max_extent_tiles: u32) -> Self {
        Self {
            max_extent_tiles,
            scratch: Vec::new(),
        }
    }

    /// Rasterizes the shape and emits a single `ClearTiles` command.
    ///
    /// Nothing is emitted when no tile qualifies or when the shape is larger
    /// than the configured maximum extent.
    pub fn handle(&mut self, shape: ClearShape, mapper: TileMapper, out: &mut Vec<Command>) {
        let reach = reach_tiles(&shape, mapper);
        if reach > self.max_extent_tiles {
            warn!(
                shape = shape_name(&shape),
                reach,
                max = self.max_extent_tiles,
                "rejected oversized clearing shape"
            );
            return;
        }

        self.scratch.clear();
        let scratch = &mut self.scratch;
        rasterize(shape, mapper, |tile| scratch.push(tile));
        self.scratch.sort_unstable();
        self.scratch.dedup();

        if self.scratch.is_empty() {
            return;
        }

        debug!(
            shape = shape_name(&shape),
            tiles = self.scratch.len(),
            "rasterized clearing shape"
        );
        out.push(Command::ClearTiles {
            tiles: self.scratch.to_vec(),
        });
    }
}

/// Invokes `sink` for every tile covered by the shape.
///
/// Circles and cones report each tile once. Lines are sampled as a chain of
/// overlapping circles, so a tile may be reported more than once.
pub fn rasterize<F>(shape: ClearShape, mapper: TileMapper, mut sink: F)
where
    F: FnMut(TileCoord),
{
    match shape {
        ClearShape::Circle { center, radius } => circle(center, radius, mapper, &mut sink),
        ClearShape::Cone {
            origin,
            direction,
            length,
            half_angle,
        } => cone(origin, direction, length, half_angle, mapper, &mut sink),
        ClearShape::Line {
            origin,
            direction,
            length,
            thickness,
        } => line(origin, direction, length, thickness, mapper, &mut sink),
    }
}

fn circle<F>(center: Vec2, radius: f32, mapper: TileMapper, sink: &mut F)
where
    F: FnMut(TileCoord),
{
    if !center.is_finite() || !radius.is_finite() || radius < 0.0 {
        return;
    }

    let origin = mapper.world_to_tile(center);
    let rings = ring_count(mapper.tiles_spanning(radius));
    let radius_sq = radius * radius;

    for dy in -rings..=rings {
        for dx in -rings..=rings {
            let tile = origin.offset(dx, dy);
            if mapper.tile_to_world(tile).distance_squared(center) <= radius_sq {
                sink(tile);
            }
        }
    }
}

fn cone<F>(
    origin: Vec2,
    direction: Vec2,
    length: f32,
    half_angle: f32,
    mapper: TileMapper,
    sink: &mut F,
) where
    F: FnMut(TileCoord),
{
    if !origin.is_finite()
        || !direction.is_finite()
        || !length.is_finite()
        || !half_angle.is_finite()
        || length < 0.0
        || half_angle < 0.0
    {
        return;
    }

    let origin_tile = mapper.world_to_tile(origin);
    sink(origin_tile);

    if direction.length_squared() == 0.0 {
        return;
    }

    let half_side = ring_count(mapper.tiles_spanning(length).saturating_add(1));
    let length_sq = length * length;

    for dy in -half_side..=half_side {
        for dx in -half_side..=half_side {
            if dx == 0 && dy == 0 {
                continue;
            }
            let tile = origin_tile.offset(dx, dy);
            let to_tile = mapper.tile_to_world(tile) - origin;
            let distance_sq = to_tile.length_squared();
            if distance_sq > length_sq {
                continue;
            }
            if distance_sq == 0.0 || direction.angle_between(to_tile).abs() <= half_angle {
                sink(tile);
            }
        }
    }
}

fn line<F>(
    origin: Vec2,
    direction: Vec2,
    length: f32,
    thickness: f32,
    mapper: TileMapper,
    sink: &mut F,
) where
    F: FnMut(TileCoord),
{
    if !origin.is_finite()
        || !direction.is_finite()
        || !length.is_finite()
        || !thickness.is_finite()
        || length < 0.0
        || thickness < 0.0
    {
        return;
    }

    let radius = thickness * 0.5;
    let end = origin + direction.normalize_or_zero() * length;
    let step = line_step(mapper.tile_size(), thickness);
    let span = end.distance(origin);
    let segments = (span / step).ceil().max(0.0) as u32;

    if segments == 0 {
        circle(origin, radius, mapper, sink);
        return;
    }

    for index in 0..=segments {
        let sample = if index == segments {
            end
        } else {
            origin.lerp(end, index as f32 / segments as f32)
        };
        circle(sample, radius, mapper, sink);
    }
}

/// Distance between consecutive samples along a thick line.
///
/// Never larger than 40% of the tile size or of the thickness, and never
/// smaller than 5% of the tile size.
#[must_use]
pub fn line_step(tile_size: f32, thickness: f32) -> f32 {
    (LINE_STEP_FRACTION * tile_size.min(thickness)).max(MIN_LINE_STEP_FRACTION * tile_size)
}

/// Tiles between the anchor tile and the furthest tile a shape may touch.
fn reach_tiles(shape: &ClearShape, mapper: TileMapper) -> u32 {
    match *shape {
        ClearShape::Circle { radius, .. } => mapper.tiles_spanning(radius),
        ClearShape::Cone {
            direction, length, ..
        } => {
            if direction.length_squared() == 0.0 {
                0
            } else {
                mapper.tiles_spanning(length)
            }
        }
        ClearShape::Line {
            direction,
            length,
            thickness,
            ..
        } => {
            let length = if direction.length_squared() == 0.0 {
                0.0
            } else {
                length
            };
            mapper.tiles_spanning(length + thickness * 0.5)
        }
    }
}

fn ring_count(tiles: u32) -> i32 {
    i32::try_from(tiles).unwrap_or(i32::MAX)
}

fn shape_name(shape: &ClearShape) -> &'static str {
    match shape {
        ClearShape::Circle { .. } => "circle",
        ClearShape::Cone { .. } => "cone",
        ClearShape::Line { .. } => "line",
    }
}

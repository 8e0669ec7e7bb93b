#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the miasma field engine.
//!
//! This crate defines the message surface that connects the engine, the
//! authoritative world, and pure systems. Systems read borrowed views of the
//! world and describe desired mutations as [`Command`] batches; the world
//! executes those commands via its `apply` entry point and reports what
//! actually changed through [`Event`] values. The world tracks only cleared
//! tiles: any tile absent from the cleared set is covered by miasma.

mod config;

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub use config::{ConfigError, MiasmaConfig};

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Marks every listed tile as cleared at the current simulation time.
    ///
    /// Tiles that are already cleared keep their original timestamp.
    ClearTiles {
        /// Tiles produced by rasterizing a single clearing shape.
        tiles: Vec<TileCoord>,
    },
    /// Returns frontier tiles to miasma as the outcome of one regrowth pass.
    RevertTiles {
        /// Tiles whose regrowth draw succeeded.
        regrown: Vec<TileCoord>,
        /// Tiles that lay outside the forget zone and are dropped unconditionally.
        forgotten: Vec<TileCoord>,
    },
    /// Re-evaluates frontier membership of tiles suspected to be stale.
    PruneFrontier {
        /// Tiles whose boundary status should be recomputed.
        tiles: Vec<TileCoord>,
    },
    /// Evicts cleared tiles selected by the cleanup sweeper.
    EvictTiles {
        /// Tiles whose age exceeded the configured time-to-live.
        expired: Vec<TileCoord>,
        /// Oldest tiles removed to bring the store back under its capacity cap.
        over_capacity: Vec<TileCoord>,
    },
    /// Returns every tile to miasma.
    Reset,
}

/// Events broadcast by the world after processing commands.
///
/// Every mutating batch produces at most one event, and only when the
/// cleared set actually changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that tiles transitioned from miasma to cleared.
    TilesCleared {
        /// Number of tiles newly inserted into the cleared set.
        count: usize,
    },
    /// Confirms that a regrowth pass returned tiles to miasma.
    TilesReverted {
        /// Number of tiles removed by a successful regrowth draw.
        regrown: usize,
        /// Number of tiles removed for lying outside the forget zone.
        forgotten: usize,
    },
    /// Confirms that the cleanup sweeper evicted tiles.
    TilesEvicted {
        /// Number of tiles removed for exceeding the time-to-live.
        expired: usize,
        /// Number of tiles removed to honour the capacity cap.
        over_capacity: usize,
    },
    /// Confirms that the whole field was returned to miasma.
    FieldReset {
        /// Number of cleared tiles dropped by the reset.
        removed: usize,
    },
}

impl Event {
    /// Reports whether the event describes a change to the cleared set.
    #[must_use]
    pub const fn changes_cleared_set(&self) -> bool {
        !matches!(self, Self::TimeAdvanced { .. })
    }
}

/// Location of a single grid tile on the unbounded plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    x: i32,
    y: i32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Column of the tile; grows towards positive world x.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Row of the tile; grows towards positive world y.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Returns the tile displaced by the provided offsets.
    ///
    /// Arithmetic wraps at the `i32` limits so the operation is total.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.wrapping_add(dx), self.y.wrapping_add(dy))
    }

    /// The four axis-aligned neighbours in north, east, south, west order.
    #[must_use]
    pub const fn neighbors(self) -> [TileCoord; 4] {
        [
            self.offset(0, -1),
            self.offset(1, 0),
            self.offset(0, 1),
            self.offset(-1, 0),
        ]
    }
}

/// Inclusive axis-aligned rectangle expressed in tile coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileRect {
    min: TileCoord,
    max: TileCoord,
}

impl TileRect {
    /// Builds the rectangle spanning `half_width` and `half_height` tiles on
    /// each side of `center`.
    #[must_use]
    pub fn centered(center: TileCoord, half_width: u32, half_height: u32) -> Self {
        let half_width = i64::from(half_width);
        let half_height = i64::from(half_height);
        let clamp = |value: i64| value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
        Self {
            min: TileCoord::new(
                clamp(i64::from(center.x()) - half_width),
                clamp(i64::from(center.y()) - half_height),
            ),
            max: TileCoord::new(
                clamp(i64::from(center.x()) + half_width),
                clamp(i64::from(center.y()) + half_height),
            ),
        }
    }

    /// Lowest corner of the rectangle.
    #[must_use]
    pub const fn min(&self) -> TileCoord {
        self.min
    }

    /// Highest corner of the rectangle.
    #[must_use]
    pub const fn max(&self) -> TileCoord {
        self.max
    }

    /// Number of tile columns covered by the rectangle.
    #[must_use]
    pub fn width(&self) -> u64 {
        u64::from(self.max.x().abs_diff(self.min.x())) + 1
    }

    /// Number of tile rows covered by the rectangle.
    #[must_use]
    pub fn height(&self) -> u64 {
        u64::from(self.max.y().abs_diff(self.min.y())) + 1
    }

    /// Number of tiles covered by the rectangle.
    #[must_use]
    pub fn area(&self) -> u64 {
        self.width().saturating_mul(self.height())
    }

    /// Reports whether the tile lies inside the rectangle, edges included.
    #[must_use]
    pub fn contains(&self, tile: TileCoord) -> bool {
        (self.min.x()..=self.max.x()).contains(&tile.x())
            && (self.min.y()..=self.max.y()).contains(&tile.y())
    }
}

/// Converts between continuous world positions and discrete tile coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileMapper {
    tile_size: f32,
}

impl TileMapper {
    /// Creates a mapper for square tiles of the provided side length.
    ///
    /// Returns an error when the size is zero, negative, or not finite.
    pub fn new(tile_size: f32) -> Result<Self, ConfigError> {
        if !tile_size.is_finite() || tile_size <= 0.0 {
            return Err(ConfigError::InvalidTileSize { tile_size });
        }
        Ok(Self { tile_size })
    }

    /// Side length of a single tile expressed in world units.
    #[must_use]
    pub const fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// Tile containing the provided world position.
    #[must_use]
    pub fn world_to_tile(&self, position: Vec2) -> TileCoord {
        TileCoord::new(
            (position.x / self.tile_size).floor() as i32,
            (position.y / self.tile_size).floor() as i32,
        )
    }

    /// World position of the tile's centre.
    #[must_use]
    pub fn tile_to_world(&self, tile: TileCoord) -> Vec2 {
        let x = (f64::from(tile.x()) + 0.5) * f64::from(self.tile_size);
        let y = (f64::from(tile.y()) + 0.5) * f64::from(self.tile_size);
        Vec2::new(x as f32, y as f32)
    }

    /// Number of whole tiles needed to cover `distance` world units.
    #[must_use]
    pub fn tiles_spanning(&self, distance: f32) -> u32 {
        if !distance.is_finite() || distance <= 0.0 {
            return 0;
        }
        (distance / self.tile_size).ceil() as u32
    }
}

/// Region a clearing request removes miasma from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClearShape {
    /// Disc around a centre point.
    Circle {
        /// Centre of the disc in world units.
        center: Vec2,
        /// Radius of the disc in world units.
        radius: f32,
    },
    /// Circular sector opening from an origin along a direction.
    Cone {
        /// Apex of the sector in world units.
        origin: Vec2,
        /// Axis of the sector; need not be normalised.
        direction: Vec2,
        /// Reach of the sector in world units.
        length: f32,
        /// Angle between the axis and either edge, in radians.
        half_angle: f32,
    },
    /// Thick segment starting at an origin.
    Line {
        /// Start of the segment in world units.
        origin: Vec2,
        /// Direction of the segment; need not be normalised.
        direction: Vec2,
        /// Length of the segment in world units.
        length: f32,
        /// Full width of the segment in world units.
        thickness: f32,
    },
}

/// Position and view extents of whoever is watching the field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observer {
    /// Observer position in world units.
    pub position: Vec2,
    /// World-space width and height of the visible area.
    pub viewport: Vec2,
}

impl Observer {
    /// Creates an observer description.
    #[must_use]
    pub const fn new(position: Vec2, viewport: Vec2) -> Self {
        Self { position, viewport }
    }
}

/// Bookkeeping stored for every cleared tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClearedCell {
    /// Simulation time at which the tile transitioned to cleared.
    pub cleared_at: Duration,
    /// Insertion counter used to order tiles cleared at the same instant.
    pub sequence: u64,
}

impl ClearedCell {
    /// Time elapsed since the tile was cleared, saturating at zero.
    #[must_use]
    pub fn age(&self, now: Duration) -> Duration {
        now.saturating_sub(self.cleared_at)
    }
}

/// Point-in-time snapshot of every cleared tile, in ascending order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClearedView {
    tiles: Vec<TileCoord>,
}

impl ClearedView {
    /// Creates a new view from the provided tiles.
    #[must_use]
    pub fn from_tiles(mut tiles: Vec<TileCoord>) -> Self {
        tiles.sort_unstable();
        tiles.dedup();
        Self { tiles }
    }

    /// Iterator over the captured tiles in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &TileCoord> {
        self.tiles.iter()
    }

    /// Number of tiles captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Reports whether the view contains no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Reports whether the tile was cleared when the view was captured.
    #[must_use]
    pub fn contains(&self, tile: TileCoord) -> bool {
        self.tiles.binary_search(&tile).is_ok()
    }

    /// Consumes the view, yielding the underlying tiles.
    #[must_use]
    pub fn into_vec(self) -> Vec<TileCoord> {
        self.tiles
    }
}

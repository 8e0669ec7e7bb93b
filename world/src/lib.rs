#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative miasma field state.
//!
//! The world owns the cleared-tile store, its frontier index, and the
//! simulation clock. It is mutated exclusively through [`apply`]; systems
//! observe it through the read-only views in [`query`].

mod store;

use std::time::Duration;

use miasma_core::{Command, Event, TileCoord, TileMapper};

pub use store::ClearedStore;

/// Cumulative counters describing everything the world has done.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct WorldStats {
    /// Tiles that transitioned from miasma to cleared.
    pub cleared: u64,
    /// Tiles returned to miasma by a successful regrowth draw.
    pub regrown: u64,
    /// Tiles dropped for lying outside the forget zone.
    pub forgotten: u64,
    /// Tiles evicted for exceeding the time-to-live.
    pub expired: u64,
    /// Tiles evicted to honour the capacity cap.
    pub evicted_over_capacity: u64,
    /// Stale frontier entries removed during regrowth scans.
    pub frontier_pruned: u64,
}

/// Represents the authoritative miasma field.
#[derive(Debug)]
pub struct World {
    mapper: TileMapper,
    store: ClearedStore,
    now: Duration,
    version: u64,
    stats: WorldStats,
}

impl World {
    /// Creates a world where every tile is covered by miasma.
    #[must_use]
    pub fn new(mapper: TileMapper) -> Self {
        Self {
            mapper,
            store: ClearedStore::new(),
            now: Duration::ZERO,
            version: 0,
            stats: WorldStats::default(),
        }
    }

    fn remove_all(&mut self, tiles: &[TileCoord]) -> usize {
        tiles
            .iter()
            .filter(|tile| self.store.remove(**tile))
            .count()
    }

    fn record_change(&mut self, event: Event, out_events: &mut Vec<Event>) {
        self.version = self.version.wrapping_add(1);
        out_events.push(event);
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// At most one event is emitted per command, and change events are only
/// emitted when the cleared set was actually modified.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            world.now = world.now.saturating_add(dt);
            out_events.push(Event::TimeAdvanced { dt });
        }
        Command::ClearTiles { tiles } => {
            let now = world.now;
            let count = tiles
                .iter()
                .filter(|tile| world.store.mark_cleared(**tile, now))
                .count();
            if count > 0 {
                world.stats.cleared = world.stats.cleared.saturating_add(count as u64);
                world.record_change(Event::TilesCleared { count }, out_events);
            }
        }
        Command::RevertTiles { regrown, forgotten } => {
            let regrown = world.remove_all(&regrown);
            let forgotten = world.remove_all(&forgotten);
            if regrown + forgotten > 0 {
                world.stats.regrown = world.stats.regrown.saturating_add(regrown as u64);
                world.stats.forgotten = world.stats.forgotten.saturating_add(forgotten as u64);
                world.record_change(Event::TilesReverted { regrown, forgotten }, out_events);
            }
        }
        Command::PruneFrontier { tiles } => {
            for tile in tiles {
                let was_frontier = world.store.is_frontier(tile);
                world.store.update_frontier_status(tile);
                if was_frontier && !world.store.is_frontier(tile) {
                    world.stats.frontier_pruned = world.stats.frontier_pruned.saturating_add(1);
                }
            }
        }
        Command::EvictTiles {
            expired,
            over_capacity,
        } => {
            let expired = world.remove_all(&expired);
            let over_capacity = world.remove_all(&over_capacity);
            if expired + over_capacity > 0 {
                world.stats.expired = world.stats.expired.saturating_add(expired as u64);
                world.stats.evicted_over_capacity = world
                    .stats
                    .evicted_over_capacity
                    .saturating_add(over_capacity as u64);
                world.record_change(
                    Event::TilesEvicted {
                        expired,
                        over_capacity,
                    },
                    out_events,
                );
            }
        }
        Command::Reset => {
            let removed = world.store.clear();
            if removed > 0 {
                world.record_change(Event::FieldReset { removed }, out_events);
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use glam::Vec2;
    use indexmap::{IndexMap, IndexSet};
    use miasma_core::{ClearedCell, ClearedView, TileCoord, TileMapper};

    use super::{store::is_boundary, ClearedStore, World, WorldStats};

    /// Coordinate mapper the world was configured with.
    #[must_use]
    pub fn tile_mapper(world: &World) -> TileMapper {
        world.mapper
    }

    /// Current simulation time.
    #[must_use]
    pub fn now(world: &World) -> Duration {
        world.now
    }

    /// Reports whether the tile is free of miasma.
    #[must_use]
    pub fn is_cleared(world: &World, tile: TileCoord) -> bool {
        world.store.is_cleared(tile)
    }

    /// Reports whether miasma covers the provided world position.
    #[must_use]
    pub fn has_miasma(world: &World, position: Vec2) -> bool {
        !world.store.is_cleared(world.mapper.world_to_tile(position))
    }

    /// Number of cleared tiles.
    #[must_use]
    pub fn cleared_count(world: &World) -> usize {
        world.store.len()
    }

    /// Number of frontier tiles.
    #[must_use]
    pub fn frontier_count(world: &World) -> usize {
        world.store.frontier_len()
    }

    /// Counter incremented once for every batch that changed the cleared set.
    #[must_use]
    pub fn version(world: &World) -> u64 {
        world.version
    }

    /// Cumulative counters describing everything the world has done.
    #[must_use]
    pub fn stats(world: &World) -> WorldStats {
        world.stats
    }

    /// Read-only access to the cleared-tile store.
    #[must_use]
    pub fn store(world: &World) -> &ClearedStore {
        &world.store
    }

    /// Captures a point-in-time snapshot of every cleared tile.
    #[must_use]
    pub fn cleared_view(world: &World) -> ClearedView {
        ClearedView::from_tiles(world.store.cells().keys().copied().collect())
    }

    /// Exposes the frontier index for regrowth scans.
    #[must_use]
    pub fn frontier_view(world: &World) -> FrontierView<'_> {
        FrontierView::new(world.store.frontier_set(), world.store.cells())
    }

    /// Exposes every cleared tile with its bookkeeping for cleanup sweeps.
    #[must_use]
    pub fn cleared_cells(world: &World) -> ClearedCellsView<'_> {
        ClearedCellsView {
            cells: world.store.cells(),
        }
    }

    /// Read-only view of the frontier index and the cells backing it.
    #[derive(Clone, Copy, Debug)]
    pub struct FrontierView<'a> {
        frontier: &'a IndexSet<TileCoord>,
        cells: &'a IndexMap<TileCoord, ClearedCell>,
    }

    impl<'a> FrontierView<'a> {
        /// Captures a new frontier view backed by the provided collections.
        #[must_use]
        pub fn new(
            frontier: &'a IndexSet<TileCoord>,
            cells: &'a IndexMap<TileCoord, ClearedCell>,
        ) -> Self {
            Self { frontier, cells }
        }

        /// Number of indexed frontier entries.
        #[must_use]
        pub fn len(&self) -> usize {
            self.frontier.len()
        }

        /// Reports whether the frontier index is empty.
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.frontier.is_empty()
        }

        /// Frontier entry stored at the provided index.
        #[must_use]
        pub fn get(&self, index: usize) -> Option<TileCoord> {
            self.frontier.get_index(index).copied()
        }

        /// Bookkeeping of the cleared tile, if it is cleared.
        #[must_use]
        pub fn cell(&self, tile: TileCoord) -> Option<ClearedCell> {
            self.cells.get(&tile).copied()
        }

        /// Reports whether the tile is cleared and touches miasma on any side.
        #[must_use]
        pub fn is_boundary(&self, tile: TileCoord) -> bool {
            is_boundary(self.cells, tile)
        }
    }

    /// Read-only view of every cleared tile.
    #[derive(Clone, Copy, Debug)]
    pub struct ClearedCellsView<'a> {
        cells: &'a IndexMap<TileCoord, ClearedCell>,
    }

    impl<'a> ClearedCellsView<'a> {
        /// Number of cleared tiles.
        #[must_use]
        pub fn len(&self) -> usize {
            self.cells.len()
        }

        /// Reports whether no tile is cleared.
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.cells.is_empty()
        }

        /// Iterator over every cleared tile and its bookkeeping.
        pub fn iter(&self) -> impl Iterator<Item = (TileCoord, ClearedCell)> + 'a {
            self.cells.iter().map(|(tile, cell)| (*tile, *cell))
        }
    }
}

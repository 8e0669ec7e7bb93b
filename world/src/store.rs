use std::time::Duration;

use indexmap::{IndexMap, IndexSet};
use miasma_core::{ClearedCell, TileCoord};

/// Sparse set of cleared tiles together with its frontier index.
///
/// A tile is on the frontier when it is cleared and at least one of its four
/// axis-aligned neighbours is not. Every mutation refreshes the frontier
/// status of the mutated tile and its neighbours, which are the only tiles
/// whose status a single change can flip.
#[derive(Clone, Debug, Default)]
pub struct ClearedStore {
    cells: IndexMap<TileCoord, ClearedCell>,
    frontier: IndexSet<TileCoord>,
    next_sequence: u64,
}

impl ClearedStore {
    /// Creates an empty store; every tile is covered by miasma.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports whether the tile is free of miasma.
    #[must_use]
    pub fn is_cleared(&self, tile: TileCoord) -> bool {
        self.cells.contains_key(&tile)
    }

    /// Bookkeeping recorded when the tile was cleared, if it is cleared.
    #[must_use]
    pub fn cell(&self, tile: TileCoord) -> Option<ClearedCell> {
        self.cells.get(&tile).copied()
    }

    /// Simulation time at which the tile was cleared, if it is cleared.
    #[must_use]
    pub fn cleared_at(&self, tile: TileCoord) -> Option<Duration> {
        self.cell(tile).map(|cell| cell.cleared_at)
    }

    /// Marks the tile as cleared at `now`.
    ///
    /// Returns `false` without touching the stored timestamp when the tile
    /// was already cleared.
    pub fn mark_cleared(&mut self, tile: TileCoord, now: Duration) -> bool {
        if self.cells.contains_key(&tile) {
            return false;
        }

        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        let _ = self.cells.insert(
            tile,
            ClearedCell {
                cleared_at: now,
                sequence,
            },
        );

        self.update_frontier_status(tile);
        for neighbor in tile.neighbors() {
            self.update_frontier_status(neighbor);
        }
        true
    }

    /// Returns the tile to miasma. Returns `false` when it was not cleared.
    pub fn remove(&mut self, tile: TileCoord) -> bool {
        if self.cells.swap_remove(&tile).is_none() {
            return false;
        }

        let _ = self.frontier.swap_remove(&tile);
        for neighbor in tile.neighbors() {
            self.update_frontier_status(neighbor);
        }
        true
    }

    /// Recomputes whether the tile belongs on the frontier.
    ///
    /// Tiles that are not cleared are always dropped from the frontier.
    pub fn update_frontier_status(&mut self, tile: TileCoord) {
        if self.is_boundary(tile) {
            let _ = self.frontier.insert(tile);
        } else {
            let _ = self.frontier.swap_remove(&tile);
        }
    }

    /// Reports whether the tile is cleared and touches miasma on any side.
    #[must_use]
    pub fn is_boundary(&self, tile: TileCoord) -> bool {
        is_boundary(&self.cells, tile)
    }

    /// Reports whether the tile is currently indexed as frontier.
    #[must_use]
    pub fn is_frontier(&self, tile: TileCoord) -> bool {
        self.frontier.contains(&tile)
    }

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

    /// Number of frontier tiles.
    #[must_use]
    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    /// Frontier tile stored at the provided index position.
    #[must_use]
    pub fn frontier_at(&self, index: usize) -> Option<TileCoord> {
        self.frontier.get_index(index).copied()
    }

    /// Iterator over every frontier tile in index order.
    pub fn frontier(&self) -> impl Iterator<Item = TileCoord> + '_ {
        self.frontier.iter().copied()
    }

    /// Iterator over every cleared tile and its bookkeeping.
    pub fn iter(&self) -> impl Iterator<Item = (TileCoord, ClearedCell)> + '_ {
        self.cells.iter().map(|(tile, cell)| (*tile, *cell))
    }

    /// Returns every tile to miasma, reporting how many were cleared.
    pub fn clear(&mut self) -> usize {
        let removed = self.cells.len();
        self.cells.clear();
        self.frontier.clear();
        removed
    }

    pub(crate) fn cells(&self) -> &IndexMap<TileCoord, ClearedCell> {
        &self.cells
    }

    pub(crate) fn frontier_set(&self) -> &IndexSet<TileCoord> {
        &self.frontier
    }
}

pub(crate) fn is_boundary(cells: &IndexMap<TileCoord, ClearedCell>, tile: TileCoord) -> bool {
    cells.contains_key(&tile)
        && tile
            .neighbors()
            .iter()
            .any(|neighbor| !cells.contains_key(neighbor))
}

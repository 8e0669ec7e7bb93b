#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Cleanup sweeper that bounds the cleared set by age and by size.

use std::time::Duration;

use miasma_core::{Command, MiasmaConfig, TileCoord};
use miasma_world::query::ClearedCellsView;
use tracing::debug;

/// Eviction limits copied out of the engine configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    ttl: Option<Duration>,
    max_cleared: Option<usize>,
}

impl Config {
    /// Creates a configuration from explicit limits; `None` disables a policy.
    #[must_use]
    pub const fn new(ttl: Option<Duration>, max_cleared: Option<usize>) -> Self {
        Self { ttl, max_cleared }
    }

    /// Extracts the eviction limits from a validated configuration.
    #[must_use]
    pub fn from_miasma(config: &MiasmaConfig) -> Self {
        Self::new(config.cleared_ttl(), config.max_cleared())
    }
}

/// Candidate for capacity eviction ordered by age, oldest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Survivor {
    cleared_at: Duration,
    sequence: u64,
    tile: TileCoord,
}

/// Cleanup system that reuses scratch buffers between sweeps.
#[derive(Debug)]
pub struct Cleanup {
    config: Config,
    expired: Vec<TileCoord>,
    survivors: Vec<Survivor>,
}

impl Cleanup {
    /// Creates a new cleanup system using the supplied limits.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            expired: Vec::new(),
            survivors: Vec::new(),
        }
    }

    /// Selects expired and over-capacity tiles, emitting one `EvictTiles` command.
    ///
    /// Tiles older than the time-to-live go first; if the remaining tiles still
    /// exceed the capacity cap, the oldest of them by clear time and insertion
    /// order are evicted until the cap is met.
    pub fn handle(&mut self, now: Duration, cells: ClearedCellsView<'_>, out: &mut Vec<Command>) {
        if cells.is_empty() {
            return;
        }
        let over_cap = self
            .config
            .max_cleared
            .is_some_and(|max_cleared| cells.len() > max_cleared);
        if self.config.ttl.is_none() && !over_cap {
            return;
        }

        self.expired.clear();
        self.survivors.clear();

        for (tile, cell) in cells.iter() {
            if self.config.ttl.is_some_and(|ttl| cell.age(now) > ttl) {
                self.expired.push(tile);
            } else if over_cap {
                self.survivors.push(Survivor {
                    cleared_at: cell.cleared_at,
                    sequence: cell.sequence,
                    tile,
                });
            }
        }

        let over_capacity = self.select_oldest_survivors();
        if self.expired.is_empty() && over_capacity.is_empty() {
            return;
        }

        debug!(
            expired = self.expired.len(),
            over_capacity = over_capacity.len(),
            remaining = cells.len() - self.expired.len() - over_capacity.len(),
            "cleanup sweep"
        );
        out.push(Command::EvictTiles {
            expired: self.expired.to_vec(),
            over_capacity,
        });
    }

    fn select_oldest_survivors(&mut self) -> Vec<TileCoord> {
        let Some(max_cleared) = self.config.max_cleared else {
            return Vec::new();
        };
        let excess = self.survivors.len().saturating_sub(max_cleared);
        if excess == 0 {
            return Vec::new();
        }

        let _ = self.survivors.select_nth_unstable(excess - 1);
        let oldest = &mut self.survivors[..excess];
        oldest.sort_unstable();
        oldest.iter().map(|survivor| survivor.tile).collect()
    }
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Zoned regrowth scheduler that returns frontier tiles to miasma.
//!
//! Every tick the system derives nested rectangles around the observer.
//! Frontier tiles inside `regrow` may regrow once old enough, tiles between
//! `regrow` and `forget` are left alone, and tiles outside `forget` are
//! dropped outright. At most `max_frontier_scan` frontier tiles are visited
//! per tick. The budget caps regrowths only; forgetting is never starved by it.

use std::time::Duration;

use glam::Vec2;
use miasma_core::{Command, MiasmaConfig, Observer, TileCoord, TileMapper, TileRect};
use miasma_world::query::FrontierView;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

/// Half-width and half-height of a tile rectangle, excluding the centre tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HalfExtent {
    /// Tiles on either side of the centre column.
    pub width: u32,
    /// Tiles on either side of the centre row.
    pub height: u32,
}

impl HalfExtent {
    /// Creates a half extent from per-axis tile counts.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    const fn grow(self, padding: u32) -> Self {
        Self::new(
            self.width.saturating_add(padding),
            self.height.saturating_add(padding),
        )
    }

    fn around(self, center: TileCoord) -> TileRect {
        TileRect::centered(center, self.width, self.height)
    }
}

/// Half extents of every zone, independent of where the observer stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ZoneExtents {
    /// Tiles considered on screen, view padding included.
    pub visible: HalfExtent,
    /// Visible area grown by the scan padding.
    pub keep: HalfExtent,
    /// Keep zone grown by the off-screen regrowth padding.
    pub regrow: HalfExtent,
    /// Keep zone grown by the off-screen forget padding.
    pub forget: HalfExtent,
}

impl ZoneExtents {
    /// Places the zones around the provided centre tile.
    #[must_use]
    pub fn around(&self, center: TileCoord) -> Zones {
        Zones {
            visible: self.visible.around(center),
            keep: self.keep.around(center),
            regrow: self.regrow.around(center),
            forget: self.forget.around(center),
        }
    }
}

/// Observer-centred rectangles steering one regrowth pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Zones {
    /// Tiles considered on screen.
    pub visible: TileRect,
    /// Visible area grown by the scan padding; the other zones grow from it.
    pub keep: TileRect,
    /// Zone where frontier tiles may regrow.
    pub regrow: TileRect,
    /// Zone beyond which cleared tiles are forgotten.
    pub forget: TileRect,
}

impl Zones {
    /// Number of regrowths allowed in one tick.
    #[must_use]
    pub fn budget(&self, base_budget: u32) -> usize {
        let budget = self.visible.area().max(u64::from(base_budget));
        usize::try_from(budget).unwrap_or(usize::MAX)
    }
}

/// Paddings and limits copied out of the engine configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    view_padding: u32,
    scan_padding: u32,
    regrow_padding: u32,
    forget_padding: u32,
    base_budget: u32,
    max_frontier_scan: u32,
    regrow_delay: Duration,
    probability: f32,
    rng_seed: u64,
}

impl Config {
    /// Extracts the regrowth parameters from a validated configuration.
    #[must_use]
    pub fn from_miasma(config: &MiasmaConfig) -> Self {
        Self {
            view_padding: config.view_padding,
            scan_padding: config.scan_padding,
            regrow_padding: config.offscreen_regrow_padding,
            forget_padding: config.offscreen_forget_padding,
            base_budget: config.base_regrow_budget,
            max_frontier_scan: config.max_frontier_scan.max(1),
            regrow_delay: config.regrow_delay(),
            probability: config.regrow_probability(),
            rng_seed: config.rng_seed,
        }
    }

    /// Derives zone half extents for a viewport of the provided world size.
    #[must_use]
    pub fn zone_extents(&self, viewport: HalfExtent) -> ZoneExtents {
        let visible = viewport.grow(self.view_padding);
        let keep = visible.grow(self.scan_padding);
        let regrow = keep.grow(self.regrow_padding);
        let forget_padding = self
            .forget_padding
            .max(self.regrow_padding.saturating_add(self.scan_padding));
        ZoneExtents {
            visible,
            keep,
            regrow,
            forget: keep.grow(forget_padding),
        }
    }
}

/// Half extent in tiles covered by a viewport of the provided world size.
#[must_use]
pub fn viewport_extent(viewport: Vec2, mapper: TileMapper) -> HalfExtent {
    HalfExtent::new(
        mapper.tiles_spanning(viewport.x * 0.5),
        mapper.tiles_spanning(viewport.y * 0.5),
    )
}

/// Pure system that decides which frontier tiles regrow or are forgotten.
#[derive(Debug)]
pub struct Regrowth {
    config: Config,
    rng: ChaCha8Rng,
    cursor: usize,
    cached: Option<(HalfExtent, ZoneExtents)>,
    regrown: Vec<TileCoord>,
    forgotten: Vec<TileCoord>,
    stale: Vec<TileCoord>,
}

impl Regrowth {
    /// Creates a new regrowth system seeded from the configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            cursor: 0,
            cached: None,
            regrown: Vec::new(),
            forgotten: Vec::new(),
            stale: Vec::new(),
        }
    }

    /// Zones the most recent pass used, if any pass ran.
    #[must_use]
    pub fn zone_extents(&self) -> Option<ZoneExtents> {
        self.cached.map(|(_, extents)| extents)
    }

    /// Scans the frontier and emits the resulting mutation commands.
    ///
    /// Emits a `PruneFrontier` command for stale entries first, followed by a
    /// single `RevertTiles` command. Nothing is emitted without an observer.
    pub fn handle(
        &mut self,
        observer: Option<&Observer>,
        now: Duration,
        frontier: FrontierView<'_>,
        mapper: TileMapper,
        out: &mut Vec<Command>,
    ) {
        let Some(observer) = observer else {
            return;
        };

        if frontier.is_empty() {
            self.cursor = 0;
            return;
        }
        let len = frontier.len();

        let center = mapper.world_to_tile(observer.position);
        let zones = self
            .extents_for(viewport_extent(observer.viewport, mapper))
            .around(center);
        let mut budget = zones.budget(self.config.base_budget);
        let limit = usize::try_from(self.config.max_frontier_scan)
            .unwrap_or(usize::MAX)
            .min(len);

        self.regrown.clear();
        self.forgotten.clear();
        self.stale.clear();

        let start = self.cursor % len;
        let mut visited = 0;
        while visited < limit {
            let index = (start + visited) % len;
            visited += 1;
            let Some(tile) = frontier.get(index) else {
                break;
            };
            let Some(cell) = frontier.cell(tile) else {
                self.stale.push(tile);
                continue;
            };

            if !zones.forget.contains(tile) {
                self.forgotten.push(tile);
                continue;
            }
            if !zones.regrow.contains(tile) {
                continue;
            }
            if !frontier.is_boundary(tile) {
                self.stale.push(tile);
                continue;
            }
            // An exhausted budget only stops regrowth; forgetting and pruning go on.
            if budget == 0 || cell.age(now) < self.config.regrow_delay {
                continue;
            }
            if self.rng.gen::<f32>() < self.config.probability {
                self.regrown.push(tile);
                budget -= 1;
            }
        }
        self.cursor = (start + visited) % len;

        debug!(
            visited,
            regrown = self.regrown.len(),
            forgotten = self.forgotten.len(),
            pruned = self.stale.len(),
            "regrowth pass"
        );

        if !self.stale.is_empty() {
            out.push(Command::PruneFrontier {
                tiles: self.stale.to_vec(),
            });
        }
        if !self.regrown.is_empty() || !self.forgotten.is_empty() {
            out.push(Command::RevertTiles {
                regrown: self.regrown.to_vec(),
                forgotten: self.forgotten.to_vec(),
            });
        }
    }

    fn extents_for(&mut self, viewport: HalfExtent) -> ZoneExtents {
        if let Some((cached_viewport, extents)) = self.cached {
            if cached_viewport == viewport {
                return extents;
            }
        }

        let extents = self.config.zone_extents(viewport);
        trace!(
            visible = ?extents.visible,
            keep = ?extents.keep,
            regrow = ?extents.regrow,
            forget = ?extents.forget,
            "recomputed regrowth zones"
        );
        self.cached = Some((viewport, extents));
        extents
    }
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Composition root that owns the miasma world and drives its systems.
//!
//! The engine is the only surface collaborators need: clearing requests go
//! in through the `apply_*` methods, time advances through [`Engine::tick`],
//! and state comes back out through snapshots, point queries, the polling
//! [`Engine::version`] counter, and registered [`ChangeListener`]s.

use std::time::Duration;

use glam::Vec2;
use miasma_core::{
    ClearShape, ClearedView, Command, ConfigError, Event, MiasmaConfig, Observer, TileCoord,
    TileMapper,
};
use miasma_system_cleanup::{self as cleanup, Cleanup};
use miasma_system_clearing::Clearing;
use miasma_system_regrowth::{self as regrowth, Regrowth};
use miasma_world::{self as world, query, World, WorldStats};
use tracing::debug;

/// Receives a callback for every batch that changed the cleared set.
pub trait ChangeListener: Send {
    /// Called once per changing batch with its event and the new version.
    fn on_change(&mut self, event: &Event, version: u64);
}

impl<F> ChangeListener for F
where
    F: FnMut(&Event, u64) + Send,
{
    fn on_change(&mut self, event: &Event, version: u64) {
        self(event, version);
    }
}

/// Summary of what a tick or a clearing request changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tiles newly cleared.
    pub cleared: usize,
    /// Tiles regrown by a successful draw.
    pub regrown: usize,
    /// Tiles forgotten for lying outside the forget zone.
    pub forgotten: usize,
    /// Tiles evicted by the time-to-live.
    pub expired: usize,
    /// Tiles evicted by the capacity cap.
    pub over_capacity: usize,
    /// Tiles dropped by a reset.
    pub reset: usize,
}

impl TickReport {
    /// Reports whether the cleared set changed at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn record(&mut self, event: &Event) {
        match *event {
            Event::TimeAdvanced { .. } => {}
            Event::TilesCleared { count } => self.cleared += count,
            Event::TilesReverted { regrown, forgotten } => {
                self.regrown += regrown;
                self.forgotten += forgotten;
            }
            Event::TilesEvicted {
                expired,
                over_capacity,
            } => {
                self.expired += expired;
                self.over_capacity += over_capacity;
            }
            Event::FieldReset { removed } => self.reset += removed,
        }
    }
}

/// Miasma field engine.
pub struct Engine {
    config: MiasmaConfig,
    world: World,
    clearing: Clearing,
    regrowth: Regrowth,
    cleanup: Cleanup,
    listeners: Vec<Box<dyn ChangeListener>>,
    commands: Vec<Command>,
    events: Vec<Event>,
}

impl Engine {
    /// Validates the configuration and creates an engine over an untouched field.
    pub fn new(config: MiasmaConfig) -> Result<Self, ConfigError> {
        let config = config.validate()?;
        let mapper = TileMapper::new(config.tile_size)?;
        Ok(Self {
            world: World::new(mapper),
            clearing: Clearing::new(config.max_shape_extent_tiles),
            regrowth: Regrowth::new(regrowth::Config::from_miasma(&config)),
            cleanup: Cleanup::new(cleanup::Config::from_miasma(&config)),
            listeners: Vec::new(),
            commands: Vec::new(),
            events: Vec::new(),
            config,
        })
    }

    /// Configuration the engine was created with.
    #[must_use]
    pub fn config(&self) -> &MiasmaConfig {
        &self.config
    }

    /// Advances time, then runs regrowth and cleanup.
    ///
    /// Regrowth is skipped when no observer is provided; cleanup always runs.
    pub fn tick(&mut self, dt: Duration, observer: Option<Observer>) -> TickReport {
        let mut report = TickReport::default();

        self.commands.push(Command::Tick { dt });
        self.flush(&mut report);

        self.regrowth.handle(
            observer.as_ref(),
            query::now(&self.world),
            query::frontier_view(&self.world),
            query::tile_mapper(&self.world),
            &mut self.commands,
        );
        self.flush(&mut report);

        self.cleanup.handle(
            query::now(&self.world),
            query::cleared_cells(&self.world),
            &mut self.commands,
        );
        self.flush(&mut report);

        if !report.is_empty() {
            debug!(
                now = ?query::now(&self.world),
                regrown = report.regrown,
                forgotten = report.forgotten,
                expired = report.expired,
                over_capacity = report.over_capacity,
                cleared = query::cleared_count(&self.world),
                frontier = query::frontier_count(&self.world),
                "tick changed the field"
            );
        }
        report
    }

    /// Clears every tile whose centre lies within `radius` of `center`.
    ///
    /// Returns the number of tiles that were newly cleared.
    pub fn apply_circle(&mut self, center: Vec2, radius: f32) -> usize {
        self.apply_shape(ClearShape::Circle { center, radius })
    }

    /// Clears a circular sector opening from `origin` along `direction`.
    ///
    /// Returns the number of tiles that were newly cleared.
    pub fn apply_cone(
        &mut self,
        origin: Vec2,
        direction: Vec2,
        length: f32,
        half_angle: f32,
    ) -> usize {
        self.apply_shape(ClearShape::Cone {
            origin,
            direction,
            length,
            half_angle,
        })
    }

    /// Clears a thick segment starting at `origin`.
    ///
    /// Returns the number of tiles that were newly cleared.
    pub fn apply_line(
        &mut self,
        origin: Vec2,
        direction: Vec2,
        length: f32,
        thickness: f32,
    ) -> usize {
        self.apply_shape(ClearShape::Line {
            origin,
            direction,
            length,
            thickness,
        })
    }

    /// Clears every tile covered by the shape.
    ///
    /// Returns the number of tiles that were newly cleared. Shapes reaching
    /// further than `max_shape_extent_tiles` clear nothing.
    pub fn apply_shape(&mut self, shape: ClearShape) -> usize {
        let mut report = TickReport::default();
        self.clearing
            .handle(shape, query::tile_mapper(&self.world), &mut self.commands);
        self.flush(&mut report);
        report.cleared
    }

    /// Returns every tile to miasma; returns how many tiles were cleared.
    pub fn reset(&mut self) -> usize {
        let mut report = TickReport::default();
        self.commands.push(Command::Reset);
        self.flush(&mut report);
        report.reset
    }

    /// Reports whether miasma covers the provided world position.
    #[must_use]
    pub fn has_miasma(&self, position: Vec2) -> bool {
        query::has_miasma(&self.world, position)
    }

    /// Reports whether the tile is free of miasma.
    #[must_use]
    pub fn is_cleared(&self, tile: TileCoord) -> bool {
        query::is_cleared(&self.world, tile)
    }

    /// Captures a sorted snapshot of every cleared tile.
    #[must_use]
    pub fn cleared_view(&self) -> ClearedView {
        query::cleared_view(&self.world)
    }

    /// Tile containing the provided world position.
    #[must_use]
    pub fn world_to_tile(&self, position: Vec2) -> TileCoord {
        query::tile_mapper(&self.world).world_to_tile(position)
    }

    /// World position of the tile's centre.
    #[must_use]
    pub fn tile_to_world(&self, tile: TileCoord) -> Vec2 {
        query::tile_mapper(&self.world).tile_to_world(tile)
    }

    /// Registers a listener notified after every batch that changes the field.
    pub fn subscribe(&mut self, listener: Box<dyn ChangeListener>) {
        self.listeners.push(listener);
    }

    /// Counter incremented once for every batch that changed the cleared set.
    #[must_use]
    pub fn version(&self) -> u64 {
        query::version(&self.world)
    }

    /// Number of cleared tiles.
    #[must_use]
    pub fn cleared_count(&self) -> usize {
        query::cleared_count(&self.world)
    }

    /// Number of cleared tiles touching miasma.
    #[must_use]
    pub fn frontier_count(&self) -> usize {
        query::frontier_count(&self.world)
    }

    /// Cumulative counters since the engine was created.
    #[must_use]
    pub fn stats(&self) -> WorldStats {
        query::stats(&self.world)
    }

    /// Simulation time elapsed since the engine was created.
    #[must_use]
    pub fn now(&self) -> Duration {
        query::now(&self.world)
    }

    fn flush(&mut self, report: &mut TickReport) {
        for command in self.commands.drain(..) {
            world::apply(&mut self.world, command, &mut self.events);
        }

        let version = query::version(&self.world);
        for event in self.events.drain(..) {
            report.record(&event);
            if !event.changes_cleared_set() {
                continue;
            }
            for listener in &mut self.listeners {
                listener.on_change(&event, version);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_configuration() {
        let config = MiasmaConfig {
            tile_size: 0.0,
            ..MiasmaConfig::default()
        };
        assert!(matches!(
            Engine::new(config),
            Err(ConfigError::InvalidTileSize { .. })
        ));
    }

    #[test]
    fn report_accumulates_events() {
        let mut report = TickReport::default();
        report.record(&Event::TimeAdvanced {
            dt: Duration::from_secs(1),
        });
        assert!(report.is_empty());

        report.record(&Event::TilesReverted {
            regrown: 2,
            forgotten: 1,
        });
        report.record(&Event::TilesEvicted {
            expired: 3,
            over_capacity: 4,
        });
        assert_eq!(
            report,
            TickReport {
                regrown: 2,
                forgotten: 1,
                expired: 3,
                over_capacity: 4,
                ..TickReport::default()
            }
        );
    }

    #[test]
    fn engine_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Engine>();
    }
}

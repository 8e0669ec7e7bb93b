use std::fmt;

use glam::Vec2;
use miasma_core::{TileCoord, TileRect};
use miasma_engine::Engine;

const OBSERVER: char = '@';
const CLEARED: char = '.';
const MIASMA: char = '~';

/// Character map of the tiles around a world position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct AsciiMap {
    rows: Vec<String>,
}

impl AsciiMap {
    /// Captures `radius` tiles on every side of the tile containing `center`.
    ///
    /// Rows run from the lowest y to the highest.
    pub(crate) fn capture(engine: &Engine, center: Vec2, radius: u32) -> Self {
        let center = engine.world_to_tile(center);
        let area = TileRect::centered(center, radius, radius);
        let rows = (area.min().y()..=area.max().y())
            .map(|y| {
                (area.min().x()..=area.max().x())
                    .map(|x| {
                        let tile = TileCoord::new(x, y);
                        if tile == center {
                            OBSERVER
                        } else if engine.is_cleared(tile) {
                            CLEARED
                        } else {
                            MIASMA
                        }
                    })
                    .collect()
            })
            .collect();
        Self { rows }
    }
}

impl fmt::Display for AsciiMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            writeln!(f, "{row}")?;
        }
        Ok(())
    }
}

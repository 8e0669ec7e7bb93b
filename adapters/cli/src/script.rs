use std::{f32::consts::FRAC_PI_8, time::Duration};

use glam::Vec2;
use miasma_core::ClearShape;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const CONE_INTERVAL: u64 = 10;
const LINE_INTERVAL: u64 = 45;
const BURST_INTERVAL: u64 = 120;
const CONE_LENGTH_TILES: f32 = 6.0;
const LINE_LENGTH_TILES: f32 = 14.0;
const LINE_THICKNESS_TILES: f32 = 0.75;
const BURST_RADIUS_TILES: f32 = 4.0;
const MAX_TURN_RATE: f32 = 0.6;
const SCRIPT_SEED_SALT: u64 = 0x0b5e_7e11;

/// Scripted observer that wanders across the field while firing beams.
#[derive(Debug)]
pub(crate) struct ObserverScript {
    position: Vec2,
    heading: f32,
    speed: f32,
    tile_size: f32,
    tick: u64,
    rng: ChaCha8Rng,
    beams: Vec<ClearShape>,
}

impl ObserverScript {
    /// Creates a script starting at the origin and heading along +x.
    pub(crate) fn new(tile_size: f32, speed: f32, seed: u64) -> Self {
        Self {
            position: Vec2::ZERO,
            heading: 0.0,
            speed,
            tile_size,
            tick: 0,
            rng: ChaCha8Rng::seed_from_u64(seed ^ SCRIPT_SEED_SALT),
            beams: Vec::new(),
        }
    }

    /// Current observer position in world units.
    pub(crate) fn position(&self) -> Vec2 {
        self.position
    }

    /// Moves the observer by one tick and queues the beams fired during it.
    pub(crate) fn advance(&mut self, dt: Duration) -> Vec2 {
        let seconds = dt.as_secs_f32();
        self.heading += self.rng.gen_range(-MAX_TURN_RATE..=MAX_TURN_RATE) * seconds;
        let facing = Vec2::from_angle(self.heading);
        self.position += facing * self.speed * seconds;

        if self.tick % CONE_INTERVAL == 0 {
            self.beams.push(ClearShape::Cone {
                origin: self.position,
                direction: facing,
                length: CONE_LENGTH_TILES * self.tile_size,
                half_angle: FRAC_PI_8,
            });
        }
        if self.tick % LINE_INTERVAL == 0 {
            let jitter = self.rng.gen_range(-FRAC_PI_8..=FRAC_PI_8);
            self.beams.push(ClearShape::Line {
                origin: self.position,
                direction: Vec2::from_angle(self.heading + jitter),
                length: LINE_LENGTH_TILES * self.tile_size,
                thickness: LINE_THICKNESS_TILES * self.tile_size,
            });
        }
        if self.tick % BURST_INTERVAL == 0 {
            self.beams.push(ClearShape::Circle {
                center: self.position,
                radius: BURST_RADIUS_TILES * self.tile_size,
            });
        }

        self.tick += 1;
        self.position
    }

    /// Drains the beams queued by the latest [`ObserverScript::advance`].
    pub(crate) fn beams(&mut self) -> impl Iterator<Item = ClearShape> + '_ {
        self.beams.drain(..)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(seed: u64, ticks: usize) -> Vec<(Vec2, Vec<ClearShape>)> {
        let mut script = ObserverScript::new(16.0, 96.0, seed);
        (0..ticks)
            .map(|_| {
                let position = script.advance(Duration::from_millis(16));
                (position, script.beams().collect())
            })
            .collect()
    }

    #[test]
    fn first_tick_fires_every_beam_kind() {
        let ticks = collect(1, 1);
        assert_eq!(ticks[0].1.len(), 3);
    }

    #[test]
    fn beams_follow_their_cadence() {
        let ticks = collect(1, 121);
        let fired: usize = ticks.iter().map(|(_, beams)| beams.len()).sum();
        // 13 cones, 3 lines and 2 bursts over ticks 0..=120.
        assert_eq!(fired, 18);
        assert!(ticks[1].1.is_empty());
    }

    #[test]
    fn identical_seeds_walk_identically() {
        assert_eq!(collect(7, 200), collect(7, 200));
        assert_ne!(collect(7, 200), collect(8, 200));
    }

    #[test]
    fn observer_moves_at_configured_speed() {
        let mut script = ObserverScript::new(16.0, 100.0, 3);
        let position = script.advance(Duration::from_secs(1));
        assert!((position.length() - 100.0).abs() < 1e-3);
    }
}

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

const DEFAULT_RNG_SEED: u64 = 0x6d69_6173_6d61_f00d;

/// Tuning surface for the whole engine, normally loaded from TOML.
///
/// Paddings are measured in whole tiles. Durations are expressed in seconds
/// of simulated time. A zero `max_cleared` or `cleared_ttl_secs` disables the
/// corresponding cleanup policy.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MiasmaConfig {
    /// Side length of a tile in world units.
    pub tile_size: f32,
    /// Tiles added around the viewport before it counts as visible.
    pub view_padding: u32,
    /// Minimum age a cleared tile must reach before it may regrow.
    pub regrow_delay_secs: f32,
    /// Per-tick probability that an eligible frontier tile regrows.
    pub regrow_chance: f32,
    /// Multiplier applied to `regrow_chance`; raise it to speed regrowth up.
    pub regrow_speed_factor: f32,
    /// Lower bound on the number of regrowths allowed per tick.
    pub base_regrow_budget: u32,
    /// Tiles added around the visible area to form the keep zone.
    pub scan_padding: u32,
    /// Tiles added around the keep zone to form the regrow zone.
    pub offscreen_regrow_padding: u32,
    /// Tiles added around the keep zone beyond which cleared tiles are forgotten.
    pub offscreen_forget_padding: u32,
    /// Upper bound on cleared tiles; the oldest are evicted beyond it.
    pub max_cleared: u32,
    /// Hard cap on frontier entries visited in a single tick.
    pub max_frontier_scan: u32,
    /// Largest reach, in tiles, a single clearing shape may have.
    pub max_shape_extent_tiles: u32,
    /// Age after which a cleared tile is evicted regardless of position.
    pub cleared_ttl_secs: f32,
    /// Seed for the regrowth random generator.
    pub rng_seed: u64,
}

impl Default for MiasmaConfig {
    fn default() -> Self {
        Self {
            tile_size: 16.0,
            view_padding: 1,
            regrow_delay_secs: 4.0,
            regrow_chance: 0.05,
            regrow_speed_factor: 1.0,
            base_regrow_budget: 64,
            scan_padding: 2,
            offscreen_regrow_padding: 8,
            offscreen_forget_padding: 32,
            max_cleared: 200_000,
            max_frontier_scan: 4_096,
            max_shape_extent_tiles: 256,
            cleared_ttl_secs: 0.0,
            rng_seed: DEFAULT_RNG_SEED,
        }
    }
}

impl MiasmaConfig {
    /// Checks every numeric parameter, returning the configuration unchanged
    /// when it is usable.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if !self.tile_size.is_finite() || self.tile_size <= 0.0 {
            return Err(ConfigError::InvalidTileSize {
                tile_size: self.tile_size,
            });
        }
        check_seconds("regrow_delay_secs", self.regrow_delay_secs)?;
        check_seconds("cleared_ttl_secs", self.cleared_ttl_secs)?;
        if !(0.0..=1.0).contains(&self.regrow_chance) {
            return Err(ConfigError::ChanceOutOfRange {
                value: self.regrow_chance,
            });
        }
        if !self.regrow_speed_factor.is_finite() || self.regrow_speed_factor < 0.0 {
            return Err(ConfigError::InvalidSpeedFactor {
                value: self.regrow_speed_factor,
            });
        }
        if self.max_frontier_scan == 0 {
            return Err(ConfigError::ZeroFrontierScan);
        }
        if self.max_shape_extent_tiles == 0 {
            return Err(ConfigError::ZeroShapeExtent);
        }
        Ok(self)
    }

    /// Minimum age before a tile becomes eligible for regrowth.
    #[must_use]
    pub fn regrow_delay(&self) -> Duration {
        Duration::try_from_secs_f32(self.regrow_delay_secs).unwrap_or(Duration::ZERO)
    }

    /// Time-to-live of cleared tiles, or `None` when expiry is disabled.
    #[must_use]
    pub fn cleared_ttl(&self) -> Option<Duration> {
        Duration::try_from_secs_f32(self.cleared_ttl_secs)
            .ok()
            .filter(|ttl| !ttl.is_zero())
    }

    /// Capacity cap on cleared tiles, or `None` when unlimited.
    #[must_use]
    pub fn max_cleared(&self) -> Option<usize> {
        match self.max_cleared {
            0 => None,
            cap => usize::try_from(cap).ok(),
        }
    }

    /// Effective per-tick regrowth probability, clamped to `0.0..=1.0`.
    #[must_use]
    pub fn regrow_probability(&self) -> f32 {
        let probability = self.regrow_chance * self.regrow_speed_factor;
        if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        }
    }
}

fn check_seconds(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidDuration { field, value })
    }
}

/// Reasons a configuration is rejected before the engine starts.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// Tile size must be a positive finite number.
    #[error("tile_size must be positive and finite (received {tile_size})")]
    InvalidTileSize {
        /// Rejected tile size.
        tile_size: f32,
    },
    /// A duration field was negative or not finite.
    #[error("{field} must be a non-negative number of seconds (received {value})")]
    InvalidDuration {
        /// Name of the offending field.
        field: &'static str,
        /// Rejected value in seconds.
        value: f32,
    },
    /// Regrowth chance must be a probability.
    #[error("regrow_chance must lie within 0.0..=1.0 (received {value})")]
    ChanceOutOfRange {
        /// Rejected probability.
        value: f32,
    },
    /// Speed factor must be non-negative and finite.
    #[error("regrow_speed_factor must be non-negative and finite (received {value})")]
    InvalidSpeedFactor {
        /// Rejected multiplier.
        value: f32,
    },
    /// A zero scan cap would disable regrowth and forgetting entirely.
    #[error("max_frontier_scan must be at least 1")]
    ZeroFrontierScan,
    /// A zero shape extent would reject every clearing request.
    #[error("max_shape_extent_tiles must be at least 1")]
    ZeroShapeExtent,
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, MiasmaConfig};
    use std::time::Duration;

    #[test]
    fn default_configuration_is_valid() {
        let config = MiasmaConfig::default();
        assert_eq!(config.clone().validate(), Ok(config));
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: MiasmaConfig = toml::from_str(
            r#"
                tile_size = 8.0
                cleared_ttl_secs = 30.0
            "#,
        )
        .expect("partial config parses");

        assert_eq!(config.tile_size, 8.0);
        assert_eq!(config.cleared_ttl(), Some(Duration::from_secs(30)));
        assert_eq!(
            config.base_regrow_budget,
            MiasmaConfig::default().base_regrow_budget
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed: Result<MiasmaConfig, _> = toml::from_str("tile_sise = 8.0");
        assert!(parsed.is_err());
    }

    #[test]
    fn negative_delay_is_rejected() {
        let config = MiasmaConfig {
            regrow_delay_secs: -1.0,
            ..MiasmaConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDuration {
                field: "regrow_delay_secs",
                ..
            })
        ));
    }

    #[test]
    fn chance_outside_unit_interval_is_rejected() {
        for value in [-0.1, 1.5, f32::NAN] {
            let config = MiasmaConfig {
                regrow_chance: value,
                ..MiasmaConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::ChanceOutOfRange { .. })
            ));
        }
    }

    #[test]
    fn zero_scan_cap_is_rejected() {
        let config = MiasmaConfig {
            max_frontier_scan: 0,
            ..MiasmaConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroFrontierScan));

        let config = MiasmaConfig {
            max_shape_extent_tiles: 0,
            ..MiasmaConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroShapeExtent));
    }

    #[test]
    fn zero_limits_disable_cleanup_policies() {
        let config = MiasmaConfig {
            max_cleared: 0,
            cleared_ttl_secs: 0.0,
            ..MiasmaConfig::default()
        };
        assert_eq!(config.max_cleared(), None);
        assert_eq!(config.cleared_ttl(), None);
    }

    #[test]
    fn probability_scales_and_clamps() {
        let config = MiasmaConfig {
            regrow_chance: 0.4,
            regrow_speed_factor: 5.0,
            ..MiasmaConfig::default()
        };
        assert_eq!(config.regrow_probability(), 1.0);

        let config = MiasmaConfig {
            regrow_chance: 0.25,
            regrow_speed_factor: 2.0,
            ..MiasmaConfig::default()
        };
        assert_eq!(config.regrow_probability(), 0.5);
    }
}

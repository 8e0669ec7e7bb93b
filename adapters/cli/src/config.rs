use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use miasma_core::MiasmaConfig;
use tracing::{debug, info};

const DEFAULT_CONFIG_PATH: &str = "config/miasma.toml";

/// Loads the engine configuration.
///
/// An explicit path must exist. Without one, `config/miasma.toml` is used
/// when present and the built-in defaults otherwise.
pub(crate) fn load(path: Option<&Path>) -> Result<MiasmaConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
            if !fallback.is_file() {
                debug!("no configuration file found; using defaults");
                return validated(MiasmaConfig::default());
            }
            fallback
        }
    };

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration {}", path.display()))?;
    let config = parse(&contents)
        .with_context(|| format!("failed to load configuration {}", path.display()))?;
    info!(path = %path.display(), "configuration loaded");
    Ok(config)
}

fn parse(contents: &str) -> Result<MiasmaConfig> {
    let config: MiasmaConfig = toml::from_str(contents).context("malformed TOML")?;
    validated(config)
}

fn validated(config: MiasmaConfig) -> Result<MiasmaConfig> {
    config.validate().context("invalid miasma configuration")
}

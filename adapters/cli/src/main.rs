#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that drives the miasma engine headlessly.

mod config;
mod render;
mod report;
mod script;

use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use glam::Vec2;
use miasma_core::{ClearShape, MiasmaConfig, Observer};
use miasma_engine::Engine;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{render::AsciiMap, report::RunReport, script::ObserverScript};

/// Headless driver for the miasma field engine.
#[derive(Debug, Parser)]
#[command(name = "miasma", version, about)]
struct Cli {
    /// Path to a TOML configuration file; defaults to `config/miasma.toml` when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log filter directive, overriding `RUST_LOG` (for example `debug` or `miasma_engine=trace`).
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Walks a scripted observer through the field and reports what happened.
    Run(RunArgs),
    /// Rasterizes a single clearing shape onto an untouched field.
    Shape {
        #[command(subcommand)]
        shape: ShapeArgs,
        /// Half extent of the printed map in tiles.
        #[arg(long, default_value_t = 12)]
        map_radius: u32,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 600)]
    ticks: u32,
    /// Simulated milliseconds per tick.
    #[arg(long, default_value_t = 16)]
    dt_ms: u64,
    /// Overrides the configured random seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Observer walking speed in world units per second.
    #[arg(long, default_value_t = 96.0)]
    speed: f32,
    /// Viewport width in world units.
    #[arg(long, default_value_t = 640.0)]
    viewport_width: f32,
    /// Viewport height in world units.
    #[arg(long, default_value_t = 360.0)]
    viewport_height: f32,
    /// Report format written to standard output.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,
    /// Prints an ASCII map around the observer after the run.
    #[arg(long)]
    map: bool,
    /// Half extent of the printed map in tiles.
    #[arg(long, default_value_t = 24)]
    map_radius: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
enum ShapeArgs {
    /// Disc around a centre point.
    Circle {
        /// Centre x in world units.
        #[arg(long, allow_hyphen_values = true, default_value_t = 0.0)]
        x: f32,
        /// Centre y in world units.
        #[arg(long, allow_hyphen_values = true, default_value_t = 0.0)]
        y: f32,
        /// Radius in world units.
        #[arg(long)]
        radius: f32,
    },
    /// Circular sector opening along a direction.
    Cone {
        /// Apex x in world units.
        #[arg(long, allow_hyphen_values = true, default_value_t = 0.0)]
        x: f32,
        /// Apex y in world units.
        #[arg(long, allow_hyphen_values = true, default_value_t = 0.0)]
        y: f32,
        /// Heading of the cone axis in degrees, counter-clockwise from +x.
        #[arg(long, allow_hyphen_values = true, default_value_t = 0.0)]
        heading: f32,
        /// Reach in world units.
        #[arg(long)]
        length: f32,
        /// Half opening angle in degrees.
        #[arg(long)]
        half_angle: f32,
    },
    /// Thick segment starting at a point.
    Line {
        /// Start x in world units.
        #[arg(long, allow_hyphen_values = true, default_value_t = 0.0)]
        x: f32,
        /// Start y in world units.
        #[arg(long, allow_hyphen_values = true, default_value_t = 0.0)]
        y: f32,
        /// Heading of the segment in degrees, counter-clockwise from +x.
        #[arg(long, allow_hyphen_values = true, default_value_t = 0.0)]
        heading: f32,
        /// Length in world units.
        #[arg(long)]
        length: f32,
        /// Full width in world units.
        #[arg(long)]
        thickness: f32,
    },
}

impl ShapeArgs {
    fn to_shape(&self) -> ClearShape {
        match *self {
            Self::Circle { x, y, radius } => ClearShape::Circle {
                center: Vec2::new(x, y),
                radius,
            },
            Self::Cone {
                x,
                y,
                heading,
                length,
                half_angle,
            } => ClearShape::Cone {
                origin: Vec2::new(x, y),
                direction: Vec2::from_angle(heading.to_radians()),
                length,
                half_angle: half_angle.to_radians(),
            },
            Self::Line {
                x,
                y,
                heading,
                length,
                thickness,
            } => ClearShape::Line {
                origin: Vec2::new(x, y),
                direction: Vec2::from_angle(heading.to_radians()),
                length,
                thickness,
            },
        }
    }

    fn anchor(&self) -> Vec2 {
        match *self {
            Self::Circle { x, y, .. } | Self::Cone { x, y, .. } | Self::Line { x, y, .. } => {
                Vec2::new(x, y)
            }
        }
    }
}

/// Entry point for the miasma command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref())?;

    let config = config::load(cli.config.as_deref())?;
    match cli.command {
        CliCommand::Run(args) => run(config, &args),
        CliCommand::Shape { shape, map_radius } => rasterize(config, &shape, map_radius),
    }
}

fn init_tracing(directive: Option<&str>) -> Result<()> {
    let filter = match directive {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid log filter `{directive}`"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
    Ok(())
}

fn run(mut config: MiasmaConfig, args: &RunArgs) -> Result<()> {
    if args.dt_ms == 0 {
        bail!("--dt-ms must be at least 1");
    }
    if !args.speed.is_finite() || args.speed < 0.0 {
        bail!("--speed must be a non-negative number (received {})", args.speed);
    }
    if let Some(seed) = args.seed {
        config.rng_seed = seed;
    }

    let seed = config.rng_seed;
    let mut engine = Engine::new(config).context("invalid miasma configuration")?;
    let viewport = Vec2::new(args.viewport_width, args.viewport_height);
    let mut script = ObserverScript::new(engine.config().tile_size, args.speed, seed);
    let dt = Duration::from_millis(args.dt_ms);

    info!(
        ticks = args.ticks,
        dt_ms = args.dt_ms,
        seed,
        tile_size = engine.config().tile_size,
        "starting scripted run"
    );

    let mut report = RunReport::new(args.ticks, dt);
    for _ in 0..args.ticks {
        let position = script.advance(dt);
        for shape in script.beams() {
            report.record_shape(engine.apply_shape(shape));
        }
        report.observe_cleared(engine.cleared_count());
        let tick = engine.tick(dt, Some(Observer::new(position, viewport)));
        report.record_tick(&tick);
    }
    report.finish(&engine);

    info!(
        cleared = engine.cleared_count(),
        frontier = engine.frontier_count(),
        version = engine.version(),
        "scripted run finished"
    );

    match args.format {
        ReportFormat::Text => print!("{}", report.to_text()),
        ReportFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to encode run report")?
        ),
    }

    if args.map {
        let map = AsciiMap::capture(&engine, script.position(), args.map_radius);
        print!("{map}");
    }
    Ok(())
}

fn rasterize(config: MiasmaConfig, args: &ShapeArgs, map_radius: u32) -> Result<()> {
    let mut engine = Engine::new(config).context("invalid miasma configuration")?;
    let shape = args.to_shape();
    let cleared = engine.apply_shape(shape);
    if cleared == 0 {
        bail!(
            "shape {shape:?} cleared no tile (empty, or reaching beyond {} tiles)",
            engine.config().max_shape_extent_tiles
        );
    }

    println!("{cleared} tiles cleared ({} on the frontier)", engine.frontier_count());
    print!("{}", AsciiMap::capture(&engine, args.anchor(), map_radius));
    Ok(())
}

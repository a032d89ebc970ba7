use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use formation::Formation;

#[derive(Parser, Debug)]
#[command(
    name = "evergreen",
    author,
    version,
    about = "Gesture-driven ornament cloud that gathers into a Christmas tree"
)]
pub struct Cli {
    /// Configuration file; defaults to `<config dir>/evergreen.toml` when present.
    #[arg(long, value_name = "FILE", global = true, env = "EVERGREEN_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the animator and gesture pipeline headlessly.
    Simulate(SimulateArgs),
    /// Generate a layout and export it as JSON.
    Layout(LayoutArgs),
    /// Print the effective configuration as TOML.
    Config,
    /// Print resolved directories.
    Where,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Gesture script replayed in place of a camera (path or name under the scripts dir).
    #[arg(long, value_name = "FILE")]
    pub script: Option<PathBuf>,

    /// Seed for the layout generator; omitted means a fresh layout each run.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Render callback rate.
    #[arg(long, value_name = "FPS", value_parser = parse_fps, default_value_t = 60.0)]
    pub fps: f32,

    /// Simulated run length (e.g. `10s`, `1m`, `2.5`).
    #[arg(
        long,
        value_name = "DURATION",
        value_parser = parse_duration,
        default_value = "10s"
    )]
    pub duration: Duration,

    /// Formation to start in.
    #[arg(
        long,
        value_name = "FORMATION",
        value_parser = parse_formation,
        default_value = "scattered"
    )]
    pub formation: Formation,

    /// Upload instance buffers through a headless GPU device every frame.
    #[arg(long)]
    pub gpu: bool,

    /// Print the summary as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct LayoutArgs {
    /// Seed for the layout generator.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Write records to this file instead of printing category counts.
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_fps(value: &str) -> Result<f32, String> {
    let trimmed = value.trim();
    let fps: f32 = trimmed
        .parse()
        .map_err(|_| format!("invalid frame rate '{trimmed}'"))?;
    if !fps.is_finite() || fps <= 0.0 {
        return Err("frame rate must be a positive number".to_string());
    }
    if fps > 1000.0 {
        return Err(format!("frame rate {fps} exceeds the 1000 fps limit"));
    }
    Ok(fps)
}

/// Accepts plain seconds (`2.5`) or humantime strings (`1500ms`, `1m 30s`).
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("duration must not be empty".to_string());
    }
    if let Ok(seconds) = trimmed.parse::<f64>() {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err("duration must be a non-negative number of seconds".to_string());
        }
        return Ok(Duration::from_secs_f64(seconds));
    }
    humantime::parse_duration(trimmed).map_err(|err| format!("invalid duration '{trimmed}': {err}"))
}

pub fn parse_formation(value: &str) -> Result<Formation, String> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "scattered" | "scatter" | "cloud" => Ok(Formation::Scattered),
        "tree" | "tree_shape" => Ok(Formation::Tree),
        other => Err(format!(
            "unknown formation '{other}'; expected scattered or tree"
        )),
    }
}

mod cli;
mod export;
mod paths;
mod run;

use anyhow::Result;
use cli::{Command, LayoutArgs, SimulateArgs};
use paths::AppPaths;
use run::SimulationSummary;
use treeconfig::EvergreenConfig;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();
    let paths = AppPaths::discover()?;

    match cli.command {
        Command::Simulate(args) => {
            let config = run::load_config(cli.config.as_deref(), &paths)?;
            run_simulate(&args, &config, &paths)
        }
        Command::Layout(args) => {
            let config = run::load_config(cli.config.as_deref(), &paths)?;
            run_layout(&args, &config)
        }
        Command::Config => {
            let config = run::load_config(cli.config.as_deref(), &paths)?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        Command::Where => run_where(&paths),
    }
}

fn run_simulate(args: &SimulateArgs, config: &EvergreenConfig, paths: &AppPaths) -> Result<()> {
    let summary = run::simulate(args, config, paths)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &SimulationSummary) {
    println!(
        "Simulated {} frames ({:.2}s) over {} objects",
        summary.frames, summary.simulated_seconds, summary.objects
    );
    println!(
        "  formation     {} ({} transitions)",
        summary.formation, summary.transitions
    );
    println!("  gesture       {}", summary.gesture);
    println!("  stable label  {}", summary.stable_label);
    println!(
        "  video frames  {} ({} skipped, {} committed)",
        summary.video_frames, summary.skipped_video_frames, summary.committed_frames
    );
    println!(
        "  rotation      {} at yaw {:.3} rad ({} mode changes)",
        summary.rotation_mode, summary.yaw, summary.rotation_changes
    );
    println!("  topper height {:.3}", summary.topper_height);
    println!("  target error  {:.4}", summary.mean_target_distance);
    if let Some(uploads) = summary.gpu_uploads {
        println!("  gpu uploads   {uploads}");
    }
}

fn run_layout(args: &LayoutArgs, config: &EvergreenConfig) -> Result<()> {
    let layout = match args.seed {
        Some(seed) => layout::generate_seeded(&config.layout, seed),
        None => layout::generate_from_entropy(&config.layout),
    };

    if let Some(output) = &args.output {
        export::write_layout(output, &layout, args.seed)?;
        println!("Wrote {} records to {}", layout.len(), output.display());
        return Ok(());
    }

    println!("Generated {} records", layout.len());
    for (category, count) in export::category_counts(&layout) {
        println!("  {category:<14} {count}");
    }
    Ok(())
}

fn run_where(paths: &AppPaths) -> Result<()> {
    println!("Config directory: {}", paths.config_dir().display());
    println!("Config file: {}", paths.config_file().display());
    println!("Data directory: {}", paths.data_dir().display());
    println!("Scripts directory: {}", paths.scripts_dir().display());
    Ok(())
}

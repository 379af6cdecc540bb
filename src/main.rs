//! Voicebox CLI
//!
//! Command-line interface for the Voicebox audio core.

use clap::Parser;
use env_logger::Env;
use log::info;

use voicebox::cli::{commands, Cli, Commands};
use voicebox::config::Settings;
use voicebox::Result;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("Voicebox v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load(&cli.config).with_env_overrides();

    match cli.command {
        Some(cmd) => handle_command(&settings, cmd),
        None => {
            println!("Voicebox v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(settings: &Settings, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Preview {
            input,
            effects,
            duration,
        } => commands::preview(settings, &input, effects, duration),
        Commands::Render {
            input,
            output,
            effects,
            format,
            quality,
        } => commands::render(settings, &input, &output, effects, format, quality),
        Commands::Process {
            project,
            entry_id,
            effects,
            format,
            quality,
        } => commands::process(settings, &project, &entry_id, effects, format, quality),
        Commands::Evict { max_age } => commands::evict(settings, max_age),
        Commands::Filename {
            name,
            effects,
            format,
        } => commands::filename(&name, effects, format),
        Commands::ImportClip {
            url,
            start,
            end,
            output_dir,
        } => commands::import_clip(settings, &url, &start, &end, &output_dir),
    }
}

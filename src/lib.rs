mod commands;
pub mod core;

use std::io::Write;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::{AssetsArgs, DownloadArgs, InstallArgs, QueryArgs};
use crate::core::error::MimResult;
use crate::core::state::{AppState, Settings};

/// Minecraft Install Manager: resolve and install servers and plugins from
/// GitHub, Modrinth, Spiget, PaperMC and GeyserMC.
#[derive(Parser, Debug)]
#[command(name = "mim", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List plugin versions
    Versions(QueryArgs),
    /// List assets for plugin versions
    Assets(AssetsArgs),
    /// Download plugin versions or specific assets
    Download(DownloadArgs),
    /// Install a server and plugins from a JSON or YAML manifest
    Install(InstallArgs),
}

pub async fn run() -> ExitCode {
    // Logs go to stderr; stdout carries command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,mim_lib=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        // Printing help only fails when stdout is gone.
        let _ = Cli::command().print_help();
        return ExitCode::from(1);
    };

    match dispatch(command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("{:?}", e);
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

async fn dispatch(command: Command) -> MimResult<()> {
    let state = AppState::new(Settings::load())?;
    let registries = &state.registries;
    let mut out = std::io::stdout().lock();

    match &command {
        Command::Versions(args) => commands::list_versions(registries, args, &mut out).await?,
        Command::Assets(args) => commands::list_assets(registries, args, &mut out).await?,
        Command::Download(args) => commands::download(registries, args, &mut out).await?,
        Command::Install(args) => commands::install(registries, args, &mut out).await?,
    }
    out.flush()?;
    Ok(())
}

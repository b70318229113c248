// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

use ocs_remote::display::terminal::TerminalDisplay;
use ocs_remote::error::{format_error, unreachable_message};
use ocs_remote::{
    ChannelSurface, Config, ConnectionStatus, ErrorKind, HttpRemote, RemoteApi, RemoteController,
    Runtime, RuntimeOptions,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit codes following sysexits.h conventions
mod exit_codes {
    pub const SUCCESS: i32 = 0;
    /// The recorder refused an action or a transfer failed
    pub const ERROR: i32 = 1;
    pub const USAGE: i32 = 64;
    /// Recorder not reachable
    pub const SERVICE_UNAVAILABLE: i32 = 69;
    /// A download could not be written
    pub const IO_ERR: i32 = 74;
    pub const CONFIG: i32 = 78;
    /// Stopped with Ctrl-C
    pub const INTERRUPTED: i32 = 130;
}

use exit_codes::*;

/// ocs-remote - control a phone recorder over the local network.
#[derive(Parser)]
#[command(name = "ocs-remote")]
#[command(version = VERSION)]
#[command(about = "Remote control and footage download for a phone recorder.")]
#[command(long_about = "ocs-remote - remote control for a phone recorder\n\n\
    Check the connection:  ocs-remote status\n\
    List recordings:       ocs-remote list\n\
    Record:                ocs-remote start [NAME] / ocs-remote stop\n\
    Start over:            ocs-remote restart [NAME]\n\
    Download everything:   ocs-remote download --all\n\
    Watch the connection:  ocs-remote watch\n\
    Configure:             ocs-remote config show")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Recorder address (host:port), overrides the config file
    #[arg(long, global = true)]
    address: Option<String>,

    /// Download directory, overrides the config file
    #[arg(long, global = true)]
    download_dir: Option<PathBuf>,

    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Verbose mode: debug logging on stderr
    #[arg(short = 'v', long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether the recorder answers (default)
    #[command(alias = "s")]
    Status,

    /// Show the files on the recorder
    #[command(alias = "ls")]
    List,

    /// Start recording
    Start {
        /// Recording name (defaults to the configured sequence name)
        name: Option<String>,
    },

    /// Stop recording
    Stop,

    /// Stop the current recording and start a new one
    #[command(alias = "retry")]
    Restart {
        /// Recording name (defaults to the configured sequence name)
        name: Option<String>,
    },

    /// Delete files on the recorder
    ///
    /// Examples:
    ///   ocs-remote delete take1.mp4
    ///   ocs-remote delete --all
    #[command(alias = "rm")]
    Delete {
        /// File to delete
        name: Option<String>,
        /// Delete every listed file
        #[arg(long, conflicts_with = "name")]
        all: bool,
        /// Do not ask for confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Queue files for download, one at a time
    ///
    /// Examples:
    ///   ocs-remote download take1.mp4 take2.mp4
    ///   ocs-remote download --index 1 --index 3
    ///   ocs-remote download --all
    #[command(alias = "dl")]
    Download {
        /// Files to download, by name
        names: Vec<String>,
        /// Files to download, by position in `ocs-remote list` (1-based)
        #[arg(short, long = "index")]
        indexes: Vec<usize>,
        /// Download every listed file
        #[arg(long, conflicts_with_all = ["names", "indexes"])]
        all: bool,
    },

    /// Poll the recorder and print connection changes until Ctrl-C
    Watch,

    /// Configure ocs-remote
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set the recorder address (host:port)
    SetAddress { address: String },
    /// Set where downloads are saved
    SetDownloadDir { path: PathBuf },
    /// Set the default recording name
    SetSequence { name: String },
}

fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        cli.log_level.parse::<Level>().with_context(|| {
            format!(
                "Invalid log level '{}'. Valid levels: error, warn, info, debug, trace",
                cli.log_level
            )
        })?
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.as_str()))
        .context("Failed to create log filter")?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    info!(%level, "Logging initialized");
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("{} {:#}", "[✗]".red(), e);
        std::process::exit(USAGE);
    }

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "[✗]".red(), e);
            ERROR
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "{}",
                format_error(
                    &format!("Could not load the configuration: {:#}", e),
                    &["The config file was edited by hand and is no longer valid JSON"],
                    &["Fix or delete ~/.ocs-remote/config.json"],
                )
            );
            return Ok(CONFIG);
        }
    };

    let command = match cli.command.unwrap_or(Commands::Status) {
        Commands::Config { command } => {
            handle_config(command, &mut config)?;
            return Ok(SUCCESS);
        }
        other => other,
    };

    if let Some(address) = cli.address {
        config.address = address;
    }
    if let Some(dir) = cli.download_dir {
        config.download_dir = dir;
    }
    if let Err(e) = config.validate() {
        eprintln!("{} {}", "[✗]".red(), e);
        return Ok(CONFIG);
    }

    if !confirm_destructive(&command)? {
        println!("Cancelled.");
        return Ok(SUCCESS);
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    runtime.block_on(run_async(command, config))
}

/// Delete asks before acting; delete-all asks twice.
fn confirm_destructive(command: &Commands) -> Result<bool> {
    use inquire::Confirm;

    let Commands::Delete { name, all, yes } = command else {
        return Ok(true);
    };
    if *yes {
        return Ok(true);
    }

    if *all {
        let first = Confirm::new("Delete ALL files on the recorder?")
            .with_default(false)
            .prompt()?;
        if !first {
            return Ok(false);
        }
        Ok(Confirm::new("This cannot be undone. Really delete everything?")
            .with_default(false)
            .prompt()?)
    } else if let Some(name) = name {
        Ok(Confirm::new(&format!("Delete {} on the recorder?", name))
            .with_default(false)
            .prompt()?)
    } else {
        Ok(true)
    }
}

async fn run_async(command: Commands, config: Config) -> Result<i32> {
    let api: Arc<dyn RemoteApi> = Arc::new(HttpRemote::from_config(&config)?);
    let (surface, events) = ChannelSurface::new();
    let display = tokio::spawn(TerminalDisplay::new().run(events));

    let watching = matches!(command, Commands::Watch);
    let runtime = Runtime::start(
        api,
        Arc::new(surface),
        RuntimeOptions {
            download_dir: config.download_dir.clone(),
            queue_capacity: config.queue_capacity,
            poll_interval: watching.then(|| config.poll_interval()),
        },
    );

    let code = {
        let controller = runtime.controller();
        execute(command, &controller, &config).await
    };

    if watching {
        runtime.shutdown().await;
    } else {
        tokio::select! {
            _ = runtime.drain() => {}
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, an unfinished download is left as a .part file");
                return Ok(INTERRUPTED);
            }
        }
    }

    let state = display.await.context("Display task failed")?;
    if code == SUCCESS && state.failed > 0 {
        eprintln!(
            "{} {} of {} download(s) failed",
            "[!]".yellow(),
            state.failed,
            state.failed + state.completed
        );
        return Ok(IO_ERR);
    }
    Ok(code)
}

/// Refresh the listing, printing the unreachable hint when needed.
async fn refresh_or_code(controller: &RemoteController, config: &Config) -> Option<i32> {
    match controller.refresh_listing().await {
        Ok(_) => None,
        Err(e) if e.kind() == ErrorKind::Transport => {
            eprintln!("{}", unreachable_message(&config.address));
            Some(SERVICE_UNAVAILABLE)
        }
        Err(_) => Some(ERROR),
    }
}

async fn execute(command: Commands, controller: &RemoteController, config: &Config) -> i32 {
    match command {
        Commands::Status => match controller.check_status().await {
            ConnectionStatus::Online => SUCCESS,
            _ => {
                eprintln!("{}", unreachable_message(&config.address));
                SERVICE_UNAVAILABLE
            }
        },
        Commands::List => refresh_or_code(controller, config).await.unwrap_or(SUCCESS),
        Commands::Start { name } => {
            let name = name.unwrap_or_else(|| config.sequence_name.clone());
            if controller.start_recording(&name).await {
                SUCCESS
            } else {
                ERROR
            }
        }
        Commands::Stop => {
            if controller.stop_recording().await {
                SUCCESS
            } else {
                ERROR
            }
        }
        Commands::Restart { name } => {
            let name = name.unwrap_or_else(|| config.sequence_name.clone());
            if controller.restart_recording(&name).await {
                SUCCESS
            } else {
                ERROR
            }
        }
        Commands::Delete { name, all, .. } => {
            if all {
                if let Some(code) = refresh_or_code(controller, config).await {
                    return code;
                }
                let (_, failed) = controller.delete_all().await;
                if failed == 0 {
                    SUCCESS
                } else {
                    ERROR
                }
            } else if let Some(name) = name {
                if controller.delete(&name).await {
                    SUCCESS
                } else {
                    ERROR
                }
            } else {
                eprintln!("{} Give a file name or --all", "[✗]".red());
                USAGE
            }
        }
        Commands::Download {
            names,
            indexes,
            all,
        } => {
            if names.is_empty() && indexes.is_empty() && !all {
                eprintln!("{} Give file names, --index or --all", "[✗]".red());
                return USAGE;
            }
            if let Some(code) = refresh_or_code(controller, config).await {
                return code;
            }

            let mut queued = 0;
            if all {
                queued += controller.download_all().await;
            }
            let selection = controller.download_selection(&names, &indexes).await;
            queued += selection.queued;

            if queued == 0 {
                return ERROR;
            }
            println!(
                "Downloading {} file(s) to {}",
                queued,
                config.download_dir.display()
            );
            // Queued files still download; the exit code reports the rest.
            if selection.rejected > 0 {
                ERROR
            } else {
                SUCCESS
            }
        }
        Commands::Watch => {
            println!(
                "Watching {} every {}s. Press Ctrl-C to stop.",
                config.address, config.poll_interval_secs
            );
            let _ = controller.refresh_listing().await;
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Could not listen for Ctrl-C");
            }
            SUCCESS
        }
        Commands::Config { .. } => SUCCESS,
    }
}

fn handle_config(command: Option<ConfigCommands>, config: &mut Config) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("{}", "=== ocs-remote Configuration ===".bright_cyan().bold());
            println!();
            println!("  Address:        {}", config.address);
            println!("  Download dir:   {}", config.download_dir.display());
            println!("  Sequence name:  {}", config.sequence_name);
            println!("  Poll interval:  {}s", config.poll_interval_secs);
            println!("  Queue capacity: {}", config.queue_capacity);
            println!();
            println!("  {}", format!("File: {}", Config::default_path()?.display()).dimmed());
            println!();
            return Ok(());
        }
        Some(ConfigCommands::SetAddress { address }) => {
            config.address = address.trim().to_string();
            if let Err(e) = config.validate() {
                bail!(e);
            }
            println!("{} Address set to {}", "[✓]".green(), config.address);
        }
        Some(ConfigCommands::SetDownloadDir { path }) => {
            config.download_dir = path;
            println!(
                "{} Downloads will be saved to {}",
                "[✓]".green(),
                config.download_dir.display()
            );
        }
        Some(ConfigCommands::SetSequence { name }) => {
            config.sequence_name = name;
            println!("{} Default recording name set to {}", "[✓]".green(), config.sequence_name);
        }
    }
    config.save()
}

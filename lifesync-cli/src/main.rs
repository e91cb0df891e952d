mod commands;
mod render;
mod utils;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lifesync_core::Settings;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "lifesync")]
#[command(about = "Sync your work and personal calendars and spot where they collide")]
struct Cli {
    /// Extra config file, applied over ~/.config/lifesync/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every configured feed and store its occurrences
    Sync {
        /// Days before today to expand (default from config)
        #[arg(long)]
        days_back: Option<u32>,

        /// Days after today to expand (default from config)
        #[arg(long)]
        days_forward: Option<u32>,
    },
    /// Show stored events, with work/personal conflicts marked
    Events {
        /// First day to show (YYYY-MM-DD or e.g. "tomorrow", default today)
        #[arg(long)]
        from: Option<String>,

        /// Last day to show (YYYY-MM-DD or e.g. "next friday", default a week on)
        #[arg(long)]
        to: Option<String>,

        /// Show personal event details
        #[arg(long)]
        reveal: bool,

        /// Display timezone (IANA name, default from config or system)
        #[arg(long)]
        tz: Option<String>,

        /// Print column geometry for each day
        #[arg(long)]
        layout: bool,

        /// Print the whole view as JSON
        #[arg(long)]
        json: bool,
    },
    /// Hide a series or a single occurrence
    Ignore {
        #[command(subcommand)]
        target: IgnoreTarget,
    },
    /// Stop hiding a series or a single occurrence
    Unignore {
        #[command(subcommand)]
        target: UnignoreTarget,
    },
    /// List hidden series and occurrences
    Ignored,
    /// Show what is stored and when each feed last synced
    Stats,
    /// Show config paths, or create the default config file
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum IgnoreTarget {
    /// Every occurrence of a recurring event
    Series {
        /// Series id (the occurrence id without its _YYYYMMDDTHHMMSS suffix)
        base_id: String,

        #[arg(long)]
        reason: Option<String>,
    },
    /// One dated occurrence
    Occurrence {
        id: String,

        #[arg(long)]
        reason: Option<String>,
    },
}

#[derive(Subcommand)]
enum UnignoreTarget {
    Series { base_id: String },
    Occurrence { id: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a commented default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

type FilterHandle = reload::Handle<EnvFilter, Registry>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter_handle = init_logging();

    if let Commands::Config { action } = &cli.command {
        return match action {
            Some(ConfigAction::Init { force }) => commands::config::init(*force),
            None => commands::config::show(cli.config.as_deref()),
        };
    }

    let settings = Settings::load(cli.config.as_deref())?;
    apply_log_level(&filter_handle, &settings.log_level, cli.verbose);

    match cli.command {
        Commands::Sync {
            days_back,
            days_forward,
        } => commands::sync::run(settings, days_back, days_forward).await,
        Commands::Events {
            from,
            to,
            reveal,
            tz,
            layout,
            json,
        } => {
            let options = commands::events::EventsOptions {
                from,
                to,
                reveal,
                tz,
                layout,
                json,
            };
            commands::events::run(settings, options).await
        }
        Commands::Ignore { target } => match target {
            IgnoreTarget::Series { base_id, reason } => {
                commands::ignore::ignore_series(settings, base_id, reason).await
            }
            IgnoreTarget::Occurrence { id, reason } => {
                commands::ignore::ignore_occurrence(settings, id, reason).await
            }
        },
        Commands::Unignore { target } => match target {
            UnignoreTarget::Series { base_id } => {
                commands::ignore::unignore_series(settings, &base_id).await
            }
            UnignoreTarget::Occurrence { id } => {
                commands::ignore::unignore_occurrence(settings, &id).await
            }
        },
        Commands::Ignored => commands::ignore::list(settings).await,
        Commands::Stats => commands::stats::run(settings).await,
        Commands::Config { .. } => Ok(()),
    }
}

/// Log to stderr, starting at `RUST_LOG` or warnings only until the
/// configured level is known.
fn init_logging() -> FilterHandle {
    let initial = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (filter_layer, filter_handle) = reload::Layer::new(initial);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    filter_handle
}

fn apply_log_level(handle: &FilterHandle, level: &str, verbose: bool) {
    if std::env::var_os("RUST_LOG").is_some() && !verbose {
        return;
    }

    let level = if verbose { "debug" } else { level };
    match EnvFilter::try_new(level) {
        Ok(filter) => {
            if let Err(e) = handle.modify(|current| *current = filter) {
                tracing::warn!(error = %e, "Failed to update log filter");
            }
        }
        Err(_) => tracing::warn!(%level, "Invalid log level in config, keeping default"),
    }
}

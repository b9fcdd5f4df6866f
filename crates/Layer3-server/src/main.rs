//! dirsrv - 컴포넌트 설정 관리 바이너리

mod admin;

use clap::{Parser, Subcommand};
use dirsrv_foundation::ServerSettings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// dirsrv - pluggable server component administration
#[derive(Parser, Debug)]
#[command(name = "dirsrv")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Server settings file (default: discover from standard locations)
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check every entry of a configuration tree without installing anything
    Check {
        /// Configuration tree (TOML)
        tree: PathBuf,
    },
    /// Bootstrap components from a configuration tree
    Start {
        /// Configuration tree (TOML)
        tree: PathBuf,

        /// Keep running until Ctrl-C
        #[arg(short, long)]
        wait: bool,

        /// Print lifecycle events as JSON lines
        #[arg(long)]
        events: bool,
    },
    /// Bootstrap from one tree and apply the changes needed to reach another
    Reload {
        /// Current configuration tree
        tree: PathBuf,

        /// Target configuration tree
        new_tree: PathBuf,
    },
    /// Bootstrap and broadcast a test alert
    Alert {
        /// Configuration tree (TOML)
        tree: PathBuf,

        /// Alert type
        alert_type: String,

        /// Alert message
        message: String,

        /// Alert generator name
        #[arg(short, long, default_value = "dirsrv-admin")]
        generator: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let settings = load_settings(args.settings.as_deref())?;

    match args.command {
        Command::Check { tree } => admin::check(settings, &tree).await,
        Command::Start { tree, wait, events } => admin::start(settings, &tree, wait, events).await,
        Command::Reload { tree, new_tree } => admin::reload(settings, &tree, &new_tree).await,
        Command::Alert {
            tree,
            alert_type,
            message,
            generator,
        } => admin::alert(settings, &tree, &generator, &alert_type, &message).await,
    }
}

fn load_settings(path: Option<&std::path::Path>) -> anyhow::Result<ServerSettings> {
    let settings = match path {
        Some(path) => ServerSettings::load(path)?,
        None => {
            let instance_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            ServerSettings::discover(&instance_dir)?
        }
    };
    tracing::debug!(
        "Settings: continue_on_error={}, syntax_enforcement={}",
        settings.lifecycle.continue_on_error,
        settings.schema.syntax_enforcement
    );
    Ok(settings)
}

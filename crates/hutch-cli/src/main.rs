//! Hutch - command-line driver for the telemetry client.

mod app;
mod prop_arg;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hutch_config::{init_logging, Config, Paths};
use serde_json::Value;

/// Hutch telemetry command-line interface.
#[derive(Parser)]
#[command(name = "hutch")]
#[command(about = "Capture gameplay telemetry and deliver it to the ingestion API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for state, logs and config. Defaults to ~/.hutch
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Ingestion API base URL for this run (not persisted)
    #[arg(long, env = "HUTCH_API", global = true)]
    api: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print this installation's user id
    UserId,
    /// Print the ingestion API base URL, or persist a new one (empty resets)
    ApiBase {
        url: Option<String>,
    },
    /// Track one event
    Track {
        name: String,
        /// Event property as key=value; the value is parsed as JSON when possible
        #[arg(short, long = "prop", value_parser = prop_arg::parse_prop)]
        props: Vec<(String, Value)>,
        /// Session to append to. Without it an implicit session is started
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Begin an explicit session
    Session {
        id: String,
    },
    /// Show queue and delivery diagnostics
    Status,
    /// Deliver everything queued now
    Flush,
    /// Run background delivery until Ctrl-C
    Run,
    /// Play a simulated game session
    Demo {
        /// Number of jumps to simulate
        #[arg(short, long, default_value_t = 12)]
        jumps: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = Paths::resolve(cli.base_dir)?;
    paths.ensure_dirs()?;
    let config = Config::load(&paths)?;

    let level = cli.log_level.as_deref().unwrap_or(config.log_level.as_str());
    init_logging(level, Some(paths.log_file()));

    let app = app::App::open(&paths, &config, cli.api)?;

    match cli.command {
        Commands::UserId => app.user_id(),
        Commands::ApiBase { url } => app.api_base(url.as_deref())?,
        Commands::Track {
            name,
            props,
            session,
        } => app.track(&name, props, session.as_deref()).await,
        Commands::Session { id } => app.session(&id),
        Commands::Status => app.status(),
        Commands::Flush => app.flush().await,
        Commands::Run => app.run().await?,
        Commands::Demo { jumps } => app.demo(jumps).await,
    }

    Ok(())
}

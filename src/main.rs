#![deny(unsafe_code)]

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use travelcase::ConfigStore;
use travelcase::replay::{self, ReplayScript};
use travelcase::session::SwitcherSettings;

#[derive(Parser)]
#[command(name = "travelcase")]
#[command(version)]
#[command(about = "Per-character automatic gearset switching", long_about = None)]
struct Cli {
    /// Directory holding per-character configuration files
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Delay between readiness checks while waiting to change gearset
    #[arg(long, global = true, default_value_t = travelcase::constants::switcher::POLL_INTERVAL_MS)]
    poll_interval_ms: u64,

    /// Stop waiting for conditions to clear after this many seconds (default: wait forever)
    #[arg(long, global = true)]
    max_wait_secs: Option<u64>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the stored configuration for a character
    Show {
        #[arg(long)]
        identity: u64,
    },
    /// Validate every binding of a character's configuration
    Check {
        #[arg(long)]
        identity: u64,
    },
    /// Drive the switcher from a JSON script of host events
    Replay {
        script: PathBuf,
        /// How long a change still waiting at the end of the script may take
        #[arg(long, default_value_t = 10)]
        settle_secs: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let store = ConfigStore::new(cli.config_dir.clone().unwrap_or_else(ConfigStore::default_dir));
    let settings = SwitcherSettings {
        poll_interval: Duration::from_millis(cli.poll_interval_ms),
        max_wait: cli.max_wait_secs.map(Duration::from_secs),
    };

    match cli.command {
        Command::Show { identity } => show(&store, identity),
        Command::Check { identity } => check(&store, identity),
        Command::Replay {
            script,
            settle_secs,
        } => {
            let script = ReplayScript::from_file(&script)?;
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed to build Tokio runtime")?;

            let report = rt.block_on(replay::run(
                &script,
                store,
                settings,
                Duration::from_secs(settle_secs),
            ))?;

            for (gearset, glamour_plate) in &report.applied {
                println!("applied gearset {gearset} (glamour plate {glamour_plate})");
            }
            if let Some(outcome) = report.last_outcome {
                println!("last change: {outcome:?}");
            } else if report.still_waiting {
                println!("last change: still waiting after {settle_secs}s");
            }
            Ok(())
        }
    }
}

fn show(store: &ConfigStore, identity: u64) -> Result<()> {
    if !store.exists(identity) {
        info!(
            path = %store.path_for(identity).display(),
            "No configuration stored, showing defaults"
        );
    }
    let config = store
        .load(identity)
        .with_context(|| format!("Failed to load configuration for {}", identity))?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn check(store: &ConfigStore, identity: u64) -> Result<()> {
    let config = store
        .load(identity)
        .with_context(|| format!("Failed to load configuration for {}", identity))?;

    let mut invalid = 0usize;
    for (territory, binding) in &config.gearset_bindings {
        let state = if binding.enabled { "enabled" } else { "disabled" };
        match binding.validate() {
            Ok(()) => println!(
                "{territory}: gearset {} plate {} ({state}) ok",
                binding.gearset_number, binding.glamour_plate
            ),
            Err(e) => {
                println!("{territory}: {e} ({state})");
                if binding.enabled {
                    invalid += 1;
                }
            }
        }
        if u16::try_from(*territory).is_err() {
            warn!(
                territory = territory,
                "Territory id is outside the client's range and can never match"
            );
        }
    }

    if invalid > 0 {
        bail!("{} enabled binding(s) would be rejected", invalid);
    }
    Ok(())
}

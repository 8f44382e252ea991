//! sam3y-sim: session coordinator behind a JSON-lines bridge.
//!
//! Reads one request per line on stdin and answers on stdout. Logs go to
//! stderr so stdout stays machine-readable.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::LevelFilter;

use sam3y_core::models::config::CoordinatorConfig;
use sam3y_core::storage::json_file::JsonFileStore;
use sam3y_core::storage::memory::MemoryStore;
use sam3y_core::traits::state_store::StateStore;
use sam3y_sim::bridge::{spawn_stdin_reader, Bridge};
use sam3y_sim::{build_coordinator, SimBrowser, SimConfig};

/// Simulated browser running the sam3y tab audio session coordinator
#[derive(Parser, Debug)]
#[command(name = "sam3y-sim")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Persist state to this JSON file (default: in memory)
    #[arg(long)]
    store: Option<PathBuf>,

    /// Optional JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else {
            match self.verbose {
                0 => LevelFilter::Warn,
                1 => LevelFilter::Info,
                2 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }
}

fn init_logging(args: &Args) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Warn);
    builder.filter_module("sam3y_core", args.log_level());
    builder.filter_module("sam3y_sim", args.log_level());
    builder
        .target(env_logger::Target::Stderr)
        .format_timestamp_millis()
        .init();
}

async fn serve<S: StateStore>(store: S, config: CoordinatorConfig) {
    let browser = SimBrowser::new();
    let coordinator = Arc::new(build_coordinator(&browser, store, config));
    let mut bridge = Bridge::new(Arc::clone(&coordinator), browser);

    bridge.run(spawn_stdin_reader()).await;
    coordinator.shutdown_host().await;
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(&args);

    let sim_config = match &args.config {
        Some(path) => match SimConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("{}", e);
                std::process::exit(2);
            }
        },
        None => SimConfig::default(),
    };
    let config = match sim_config.coordinator_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(2);
        }
    };

    log::info!("sam3y-sim starting");
    match args.store {
        Some(path) => {
            log::info!("persisting state to {}", path.display());
            serve(JsonFileStore::new(path), config).await;
        }
        None => serve(MemoryStore::new(), config).await,
    }
    log::info!("sam3y-sim exiting");
}

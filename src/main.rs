//! Queen AI backend binary.
//!
//! `serve` runs the WebSocket inference-and-learning server;
//! `simulate` drives the deterministic game simulator against it for
//! headless training.

use clap::Parser;
use clap::Subcommand;
use hivequeen::config::AppConfig;
use hivequeen::sim::runner;
use hivequeen::sim::runner::RunnerOptions;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hivequeen", about = "Server-side Queen AI for parasite spawn control")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the AI server
    Serve {
        /// YAML configuration file; defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Run the headless training simulator against a server
    Simulate {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// WebSocket URL of the AI server
        #[arg(short, long, default_value = "ws://127.0.0.1:8000/ws")]
        url: String,
        /// number of simulation ticks
        #[arg(short, long, default_value_t = 1_000)]
        ticks: u64,
        /// remove inter-tick delays
        #[arg(long)]
        turbo: bool,
        /// run until interrupted, ignoring --ticks
        #[arg(long)]
        continuous: bool,
        /// enable curriculum learning with the default phases
        #[arg(long)]
        curriculum: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    hivequeen::init();
    match cli.command {
        Command::Serve { config } => {
            let config = AppConfig::load_or_default(config.as_deref())
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
            hivequeen::server::Server::run(config).await
        }
        Command::Simulate {
            config,
            url,
            ticks,
            turbo,
            continuous,
            curriculum,
        } => {
            anyhow::ensure!(ticks > 0, "number of ticks must be positive");
            let config = AppConfig::load_or_default(config.as_deref())
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
            runner::run(
                config.sim,
                RunnerOptions {
                    url,
                    ticks,
                    turbo,
                    continuous,
                    curriculum,
                },
            )
            .await
        }
    }
}

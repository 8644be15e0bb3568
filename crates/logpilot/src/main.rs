//! LogPilot - conversational DevOps assistant for application logs

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{chat_command, init_command, status_command, tools_command};

/// LogPilot - ask about your logs, approve the fixes
#[derive(Parser)]
#[command(name = "logpilot")]
#[command(about = "◆ Conversational DevOps assistant for application logs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Config file (default: ~/.logpilot/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the agent
    Chat {
        /// Single message to send; starts an interactive session when omitted
        #[arg(short, long)]
        message: Option<String>,
    },
    /// List the tools the agent can call
    Tools,
    /// Show configuration and integration status
    Status,
    /// Initialize config, log directory and system prompt
    Init,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // A missing .env is normal
    let _ = dotenvy::dotenv();

    init_tracing(cli.verbose);

    let config_path = cli.config.unwrap_or_else(logpilot_config::config_path);

    let (name, result) = match cli.command {
        Commands::Chat { message } => ("Chat", chat_command(message, &config_path).await),
        Commands::Tools => ("Tools", tools_command(&config_path).await),
        Commands::Status => ("Status", status_command(&config_path).await),
        Commands::Init => ("Init", init_command(&config_path).await),
    };

    if let Err(e) = result {
        error!("{} failed: {:#}", name, e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

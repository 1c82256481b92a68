mod commands;
mod config;
mod gemini;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{Action, NotFound, cmd_session, dispatch};
use crate::config::Config;
use sous_core::controller::Controller;
use sous_core::db::Database;

#[derive(Parser)]
#[command(
    name = "sous",
    version,
    about = "A local-first recipe assistant",
    long_about = "Keep a pantry, set dietary preferences, and let an AI chef suggest \
recipes, weekly meal plans and a categorized shopping list.\n\n\
Set GEMINI_API_KEY to use the Gemini API, or SOUS_PROVIDER=fake to try it offline."
)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Action(Action),
    /// Run commands interactively against one long-lived session
    Session,
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        if e.downcast_ref::<NotFound>().is_some() {
            process::exit(2);
        }
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let db = Database::open(&config.db_path)?;
    let mut ctrl = Controller::new(Box::new(db))?;
    let client = config.generation_client()?;

    match cli.command {
        Commands::Action(action) => dispatch(&mut ctrl, client.as_ref(), action).await,
        Commands::Session => cmd_session(&mut ctrl, client.as_ref()).await,
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let api_key = if no_auth {
                None
            } else {
                let (key, _new) = config.load_or_create_api_key()?;
                Some(key)
            };
            server::start_server(ctrl, client, port, &bind, api_key).await
        }
    }
}

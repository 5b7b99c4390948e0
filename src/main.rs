use mcp_gateway::config::{self, Config};
use mcp_gateway::conversation::{Conversation, DEFAULT_SYSTEM_PROMPT};
use mcp_gateway::gateway::{self, AppState};
use mcp_gateway::orchestrator::{Orchestrator, Route};
use mcp_gateway::session::SessionStore;
use mcp_gateway::tools;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "mcp-gateway",
    version,
    about = "Chat gateway that routes messages to MCP tools or a language model"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP gateway (default)
    Serve {
        /// Listen address, overriding `server.addr`
        #[arg(long)]
        addr: Option<SocketAddr>,
    },
    /// Run a single chat turn and print the reply
    Ask {
        /// User message to send
        #[arg(long)]
        message: String,
    },
    /// Show which tool would handle a message (no network calls)
    Route {
        /// The message to classify
        message: String,
    },
    /// List registered tools in routing order
    Tools,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    {
        use tracing_subscriber::layer::SubscriberExt;
        use tracing_subscriber::util::SubscriberInitExt;

        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(Config::default_path);

    info!(path = %config_path.display(), "loading configuration");
    let cfg = Config::load(&config_path).await?;

    match cli.command.unwrap_or(Command::Serve { addr: None }) {
        Command::Serve { addr } => serve(cfg, addr).await,
        Command::Ask { message } => {
            let orchestrator = Orchestrator::from_config(&cfg)?;
            let mut conversation = new_conversation(&cfg);
            let outcome = orchestrator.handle_message(&mut conversation, &message).await?;
            if let Route::ToolMatched { tool_id, response } = &outcome.route {
                eprintln!(
                    "[{tool_id}] {}",
                    if response.is_success() { "ok" } else { "failed" }
                );
            }
            println!("{}", outcome.reply);
            Ok(())
        }
        Command::Route { message } => {
            let router = tools::build_router(&cfg.tools)?;
            match router.find_tool(&message) {
                Some(tool) => println!("{}", tool.id()),
                None => println!("(no tool; the model answers directly)"),
            }
            Ok(())
        }
        Command::Tools => {
            let router = tools::build_router(&cfg.tools)?;
            for (idx, identity) in router.identities().iter().enumerate() {
                println!("{}. {} [{}]", idx + 1, identity.id, identity.actions.join(", "));
            }
            Ok(())
        }
    }
}

fn new_conversation(cfg: &Config) -> Conversation {
    Conversation::new(cfg.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT))
        .with_max_history(cfg.max_history)
}

async fn serve(cfg: Config, addr: Option<SocketAddr>) -> anyhow::Result<()> {
    let addr = match addr {
        Some(a) => a,
        None => cfg
            .server
            .addr
            .parse()
            .with_context(|| format!("invalid server.addr '{}'", cfg.server.addr))?,
    };

    let orchestrator = Arc::new(Orchestrator::from_config(&cfg)?);
    info!(
        tools = orchestrator.router().len(),
        models = cfg.models.len(),
        "orchestrator ready"
    );

    let sessions = Arc::new(
        SessionStore::new(cfg.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT))
            .with_max_sessions(cfg.server.max_sessions)
            .with_max_history(cfg.max_history),
    );
    let api_token = cfg.server.api_token.as_deref().map(config::resolve_secret);
    let state = AppState::new(orchestrator, sessions, api_token);

    let gw = gateway::start_gateway(addr, state, &cfg.server.static_dir)
        .await
        .with_context(|| format!("failed to bind gateway on {addr}"))?;
    println!("mcp-gateway v{} listening on http://{}", env!("CARGO_PKG_VERSION"), gw.addr);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutting down");
    gw.handle.abort();
    Ok(())
}

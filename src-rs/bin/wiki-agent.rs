use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wiki_agent_rs::api::{AgentCard, AgentServer, AppState};
use wiki_agent_rs::config::{AppConfig, DEFAULT_AGENT_CONFIG, DEFAULT_SERVER_CONFIG};
use wiki_agent_rs::graph::SessionStore;
use wiki_agent_rs::helpers::{build_llm_router, build_tools, require_api_keys};
use wiki_agent_rs::push::PushNotificationSenderAuth;
use wiki_agent_rs::task::TaskManager;
use wiki_agent_rs::{Agent, AgentError};

/// Starts the Wikipedia agent A2A server.
#[derive(Debug, Parser)]
#[command(name = "wiki-agent", version)]
struct Cli {
    /// Host to bind; defaults to `server.default_host`.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind; defaults to `server.default_port`.
    #[arg(long)]
    port: Option<u16>,

    #[arg(long, default_value = DEFAULT_SERVER_CONFIG)]
    server_config: PathBuf,

    #[arg(long, default_value = DEFAULT_AGENT_CONFIG)]
    agent_config: PathBuf,
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(AgentError::MissingApiKey(message)) => {
            error!("Error: {}", message);
            ExitCode::FAILURE
        }
        Err(err) => {
            error!("An error occurred during server startup: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), AgentError> {
    let config = AppConfig::load(&cli.server_config, &cli.agent_config)?;
    let api_keys = require_api_keys()?;

    let host = cli.host.unwrap_or_else(|| config.server.server.default_host.clone());
    let port = cli.port.unwrap_or(config.server.server.default_port);

    let card = AgentCard::from_config(
        &config.server,
        &host,
        port,
        &config.agent.agent.supported_content_types,
    );
    let push_enabled = card.capabilities.push_notifications;

    let auth = Arc::new(PushNotificationSenderAuth::new()?);
    auth.generate_jwk()?;

    // The blocking HTTP clients must be built outside the async runtime.
    let router = build_llm_router(&config.agent.model, api_keys)?;
    let tools = build_tools(&config.agent)?;
    let agent = Agent::from_config(&config.agent, router, tools, Arc::new(SessionStore::new()));
    info!(agent = %agent.name, tools = agent.tool_count(), "agent ready");

    let manager = Arc::new(TaskManager::new(Arc::new(agent), auth.clone(), push_enabled));
    let state = AppState {
        manager,
        card: Arc::new(card),
        auth,
    };
    let server = AgentServer::new(&host, port, state);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AgentError::Server(format!("failed to start runtime: {}", err)))?;
    runtime.block_on(server.start())
}

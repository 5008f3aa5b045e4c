use clap::Parser;

use crate::models::{new_id, CLIConfig};

const DEFAULT_URL: &str = "http://localhost:10000";

/// Interactive A2A client for the Wikipedia agent.
#[derive(Debug, Parser)]
#[command(name = "wiki-agent-debug", version)]
struct Args {
    /// Agent server base URL.
    #[arg(long = "base", env = "WIKI_AGENT_URL", default_value = DEFAULT_URL)]
    base_url: String,

    /// Session to resume; a fresh one is generated otherwise.
    #[arg(long, env = "WIKI_AGENT_SESSION")]
    session: Option<String>,

    /// Messages of task history to request back with each reply.
    #[arg(long, default_value_t = 0)]
    history_length: usize,

    #[arg(long, env = "WIKI_AGENT_DEBUG")]
    debug: bool,
}

pub fn parse_config() -> CLIConfig {
    let args = Args::parse();
    CLIConfig {
        base_url: args.base_url,
        session_id: args.session.unwrap_or_else(new_id),
        history_length: args.history_length,
        debug: args.debug,
    }
}

//! Voice Agent Entrypoint
//!
//! Loads configuration, connects a realtime session for the chosen agent,
//! records from the default microphone and plays replies until the session
//! ends or `Ctrl+C` is pressed.

use clap::Parser;
use invoice_agent_core::AgentKind;
use invoice_agent_service::app::{launch, shutdown_signal};
use openai_realtime::WebSocketConnector;

#[derive(Debug, Parser)]
#[command(version, about = "Talk to an invoicing agent through your microphone")]
struct Args {
    /// Which agent to talk to.
    #[arg(long, value_enum, default_value_t = AgentKind::Invoicing)]
    agent: AgentKind,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    launch(&WebSocketConnector, args.agent, shutdown_signal()).await?;
    Ok(())
}

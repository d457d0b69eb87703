//! Text Chat Entrypoint
//!
//! A small REPL over stdin: each line is sent to the agent as an independent
//! question and the answer is printed.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use clap::Parser;
use invoice_agent_core::{AgentConfig, AgentKind, chat::ChatAgent, llm_client::OpenAICompatibleClient};
use invoice_agent_service::{app::init_tracing, config::Config};
use secrecy::ExposeSecret;
use std::{io::Write, sync::Arc};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(version, about = "Ask an agent questions from the terminal")]
struct Args {
    /// Which agent to ask.
    #[arg(long, value_enum, default_value_t = AgentKind::Testing)]
    agent: AgentKind,
}

fn prompt() -> std::io::Result<()> {
    print!("Ask a question: ");
    std::io::stdout().flush()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(config.log_level);

    let agent = AgentConfig::preset(args.agent).context("Failed to build agent")?;
    let llm_config = OpenAIConfig::new().with_api_key(config.openai_api_key.expose_secret());
    let llm_client = Arc::new(OpenAICompatibleClient::new(
        llm_config,
        config.chat_model.clone(),
    ));
    let chat = ChatAgent::new(agent, llm_client);
    info!(agent = %chat.agent().name(), model = %config.chat_model, "Chat agent ready.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let question = line.trim();
        if !question.is_empty() {
            match chat.ask(question).await {
                Ok(answer) => println!("Agent's response: {}", answer),
                Err(e) => error!(error = %e, "Failed to get a response from the agent"),
            }
        }
        prompt()?;
    }
    println!();
    Ok(())
}

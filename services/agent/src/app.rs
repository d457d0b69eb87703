//! Startup and wiring for the voice agent.
//!
//! Order matters: configuration is loaded before anything touches the network
//! or spawns a process, so a missing credential aborts with no side effects.

use crate::{
    audio::{AudioCommand, CaptureBridge, PcmFormat, Player},
    config::Config,
    dispatch::{DispatchStats, run_dispatch},
};
use anyhow::Context;
use invoice_agent_core::{AgentConfig, AgentKind};
use openai_realtime::{Connector, RealtimeSession, SessionConfig};
use std::{future::Future, sync::Arc};
use tracing::{Level, error, info, warn};

/// Installs the global `fmt` subscriber. Later calls are no-ops.
pub fn init_tracing(level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .try_init();
}

/// Resolves once `Ctrl+C` is received.
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal. Shutting down..."),
        Err(e) => {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}

/// Session parameters for `agent` under `config`.
///
/// A voice set in the environment wins over the agent's own.
pub fn session_config(config: &Config, agent: &AgentConfig) -> SessionConfig {
    SessionConfig {
        model: config.realtime_model.clone(),
        instructions: agent.instructions().to_string(),
        tools: agent.tools().specs(),
        voice: config
            .voice
            .clone()
            .or_else(|| agent.voice().map(str::to_string)),
        transcription_model: config.transcription_model.clone(),
        ..SessionConfig::default()
    }
}

/// Loads configuration, builds the `kind` agent and runs it until the
/// session ends or `shutdown` resolves.
pub async fn launch(
    connector: &dyn Connector,
    kind: AgentKind,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<DispatchStats> {
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(config.log_level);
    info!("Configuration loaded.");

    let agent = AgentConfig::preset(kind).context("Failed to build agent")?;
    run(&config, connector, agent, shutdown).await
}

/// Connects the session, starts audio capture and dispatches events.
pub async fn run(
    config: &Config,
    connector: &dyn Connector,
    agent: AgentConfig,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<DispatchStats> {
    let session = Arc::new(RealtimeSession::new(session_config(config, &agent)));
    let events = session
        .connect(connector, &config.openai_api_key)
        .await
        .context("Failed to connect to the realtime service")?;
    info!(agent = %agent.name(), "{} is ready for real-time conversation.", agent.name());

    let format = PcmFormat::default();
    let player = Player::start(
        config.playback_mode,
        AudioCommand::new(&config.sox_path),
        format,
        config.playback_file.clone(),
    );

    let bridge = CaptureBridge::new(
        AudioCommand::new(&config.sox_path).with_args(format.capture_args()),
    );
    let capture = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { bridge.run(session.as_ref()).await })
    };

    let stats = tokio::select! {
        stats = run_dispatch(events, agent.tools(), session.as_ref(), &player) => stats,
        _ = shutdown => DispatchStats::default(),
    };

    if capture.is_finished() {
        match capture.await {
            Ok(state) => info!(state = ?state, "Capture bridge finished"),
            Err(e) => warn!(error = %e, "Capture task failed"),
        }
    } else {
        capture.abort();
    }
    session.close();
    info!(
        audio_frames = stats.audio_frames,
        tool_calls = stats.tool_calls,
        errors = stats.errors,
        "Voice agent stopped."
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{audio::PlaybackMode, config::ConfigError};
    use async_trait::async_trait;
    use mockall::mock;
    use openai_realtime::{
        Transport,
        transport::channel_transport,
        types::{ClientEvent, ConversationItem, ServerEvent},
    };
    use secrecy::SecretString;
    use serial_test::serial;
    use std::{env, path::Path};

    mock! {
        pub Connector {}

        #[async_trait]
        impl Connector for Connector {
            async fn open(
                &self,
                url: &str,
                credential: &SecretString,
            ) -> openai_realtime::Result<Transport>;
        }
    }

    fn test_config(dir: &Path) -> Config {
        Config {
            openai_api_key: SecretString::from("test-key".to_string()),
            realtime_model: "gpt-4o-realtime-preview".to_string(),
            transcription_model: "gpt-4o-mini-transcribe".to_string(),
            voice: None,
            chat_model: "gpt-4o".to_string(),
            log_level: Level::INFO,
            sox_path: "true".to_string(),
            playback_mode: PlaybackMode::Queued,
            playback_file: dir.join("agent_output.pcm"),
        }
    }

    #[test]
    fn test_session_config_uses_agent_voice_and_tools() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let agent = AgentConfig::invoicing_estimating().unwrap();

        let session = session_config(&config, &agent);

        assert_eq!(session.model, "gpt-4o-realtime-preview");
        assert_eq!(session.voice.as_deref(), Some("coral"));
        assert_eq!(session.tools.len(), 2);
        assert_eq!(session.instructions, agent.instructions());
    }

    #[test]
    fn test_session_config_env_voice_overrides_agent() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.voice = Some("alloy".to_string());
        let agent = AgentConfig::invoicing_estimating().unwrap();

        assert_eq!(
            session_config(&config, &agent).voice.as_deref(),
            Some("alloy")
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_launch_without_credential_has_no_side_effects() {
        unsafe {
            env::remove_var("OPENAI_API_KEY");
        }
        let mut connector = MockConnector::new();
        connector.expect_open().times(0);

        let err = launch(&connector, AgentKind::Invoicing, std::future::pending())
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::MissingVar(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut connector = MockConnector::new();
        connector.expect_open().times(1).returning(|_, _| {
            Err(openai_realtime::RealtimeError::Connection(
                "handshake refused".to_string(),
            ))
        });

        let agent = AgentConfig::voice_invoicing().unwrap();
        let result = run(&config, &connector, agent, std::future::pending()).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_tool_call_round_trip_through_session() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let (transport, mut outbound, inbound) = channel_transport();

        let mut connector = MockConnector::new();
        connector
            .expect_open()
            .withf(|url, _| url.ends_with("?model=gpt-4o-realtime-preview"))
            .times(1)
            .return_once(move |_, _| Ok(transport));

        // Plays the remote side: asks for a tool, then hangs up once answered.
        let remote = tokio::spawn(async move {
            let mut seen = Vec::new();
            let mut inbound = Some(inbound);
            while let Some(event) = outbound.recv().await {
                let is_update = matches!(event, ClientEvent::SessionUpdate { .. });
                let is_response = matches!(event, ClientEvent::ResponseCreate);
                seen.push(event);
                if is_update {
                    if let Some(inbound) = &inbound {
                        inbound
                            .send(Ok(ServerEvent::ResponseFunctionCallArgumentsDone {
                                call_id: "call_7".to_string(),
                                name: "create_invoice".to_string(),
                                arguments:
                                    r#"{"customerName":"Bob","amount":99.5,"dueDate":"2024-08-01"}"#
                                        .to_string(),
                            }))
                            .await
                            .unwrap();
                    }
                }
                if is_response {
                    inbound.take();
                }
            }
            seen
        });

        let agent = AgentConfig::voice_invoicing().unwrap();
        let stats = run(&config, &connector, agent, std::future::pending())
            .await
            .unwrap();
        assert_eq!(stats.tool_calls, 1);

        let seen = remote.await.unwrap();
        assert_eq!(seen.len(), 3);
        assert!(matches!(seen[0], ClientEvent::SessionUpdate { .. }));
        match &seen[1] {
            ClientEvent::ConversationItemCreate {
                item: ConversationItem::FunctionCallOutput { call_id, output },
            } => {
                assert_eq!(call_id, "call_7");
                assert_eq!(
                    output,
                    "Invoice created for Bob, amount: $99.5, due date: 2024-08-01."
                );
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(seen[2], ClientEvent::ResponseCreate));
    }
}

//! The single consumer of session events.

use crate::audio::AudioOutput;
use async_trait::async_trait;
use invoice_agent_core::ToolRegistry;
use openai_realtime::{RealtimeSession, SessionEvent, SessionEvents};
use tracing::{error, info};

/// Sends tool results back to the remote model.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToolResponder: Send + Sync {
    async fn send_tool_output(&self, call_id: &str, output: &str) -> anyhow::Result<()>;
}

#[async_trait]
impl ToolResponder for RealtimeSession {
    async fn send_tool_output(&self, call_id: &str, output: &str) -> anyhow::Result<()> {
        RealtimeSession::send_tool_output(self, call_id, output)
            .await
            .map_err(Into::into)
    }
}

/// What happened during one dispatch run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchStats {
    pub audio_frames: usize,
    pub tool_calls: usize,
    pub errors: usize,
}

/// Handles events in arrival order until the session reports `Closed` or the
/// event channel ends.
pub async fn run_dispatch(
    mut events: SessionEvents,
    tools: &ToolRegistry,
    responder: &dyn ToolResponder,
    output: &dyn AudioOutput,
) -> DispatchStats {
    let mut stats = DispatchStats::default();

    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Error(message) => {
                stats.errors += 1;
                error!(error = %message, "Error in realtime session");
            }
            SessionEvent::Transcript(text) => info!("Transcript: {}", text),
            SessionEvent::Text(text) => info!("Agent text response: {}", text),
            SessionEvent::Audio { frame, transcript } => {
                stats.audio_frames += 1;
                match transcript.filter(|t| !t.is_empty()) {
                    Some(text) => info!("[Agent will speak]: {}", text),
                    None => info!("[Agent will speak]: (No text transcript available for this audio chunk)"),
                }
                output.play(frame).await;
                info!("Received audio response from agent.");
            }
            SessionEvent::ToolCall {
                call_id,
                name,
                arguments,
            } => {
                stats.tool_calls += 1;
                info!(tool = %name, call_id = %call_id, "Agent requested tool");
                let result = tools.execute(&name, &arguments).await;
                info!(tool = %name, result = %result, "Tool finished");
                if let Err(e) = responder.send_tool_output(&call_id, &result).await {
                    error!(error = %e, tool = %name, "Failed to return tool output");
                }
            }
            SessionEvent::Closed => {
                info!("Realtime session ended.");
                break;
            }
        }
    }

    stats
}

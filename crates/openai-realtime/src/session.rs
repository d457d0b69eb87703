//! The realtime session handle.
//!
//! A [`RealtimeSession`] is constructed explicitly and shared by reference.
//! It moves through `Unconnected -> Connecting -> Connected` and ends in
//! either `Error` or `Closed`. There is no reconnect: a session that has left
//! `Unconnected` can never be connected again.

use crate::{
    audio::encode_pcm16,
    config::SessionConfig,
    error::{RealtimeError, Result},
    event::{EventTranslator, SessionEvent},
    transport::Connector,
};
use openai_realtime_types::{ClientEvent, ConversationItem};
use secrecy::SecretString;
use std::{
    fmt,
    sync::{Arc, Mutex},
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

/// Receiving end of a connected session's events.
pub type SessionEvents = mpsc::Receiver<SessionEvent>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unconnected,
    Connecting,
    Connected,
    Error,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unconnected => "unconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Error => "error",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

pub struct RealtimeSession {
    config: SessionConfig,
    state: Arc<watch::Sender<SessionState>>,
    outbound: Mutex<Option<mpsc::Sender<ClientEvent>>>,
}

impl RealtimeSession {
    pub fn new(config: SessionConfig) -> Self {
        let (state, _) = watch::channel(SessionState::Unconnected);
        Self {
            config,
            state: Arc::new(state),
            outbound: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watches state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Opens the channel and sends the session configuration.
    ///
    /// Returns the stream of [`SessionEvent`]s, which always ends with
    /// [`SessionEvent::Closed`].
    pub async fn connect(
        &self,
        connector: &dyn Connector,
        credential: &SecretString,
    ) -> Result<SessionEvents> {
        let current = self.state();
        if current != SessionState::Unconnected {
            return Err(RealtimeError::AlreadyStarted(current));
        }
        self.state.send_replace(SessionState::Connecting);

        let transport = match connector.open(&self.config.url(), credential).await {
            Ok(transport) => transport,
            Err(e) => {
                self.state.send_replace(SessionState::Error);
                return Err(e);
            }
        };

        let update = ClientEvent::SessionUpdate {
            session: self.config.to_resource(),
        };
        if transport.outbound.send(update).await.is_err() {
            self.state.send_replace(SessionState::Error);
            return Err(RealtimeError::Transport(
                "channel closed before session.update".to_string(),
            ));
        }

        *self.lock_outbound() = Some(transport.outbound);
        self.state.send_replace(SessionState::Connected);
        info!(model = %self.config.model, "Realtime session connected.");

        let (events_tx, events_rx) = mpsc::channel(128);
        let state = self.state.clone();
        let mut inbound = transport.inbound;
        tokio::spawn(async move {
            let mut translator = EventTranslator::default();
            while let Some(received) = inbound.recv().await {
                let event = match received {
                    Ok(server_event) => match translator.translate(server_event) {
                        Some(event) => event,
                        None => continue,
                    },
                    Err(e) => {
                        error!(error = %e, "Realtime transport failed.");
                        state.send_replace(SessionState::Error);
                        SessionEvent::Error(e.to_string())
                    }
                };
                if events_tx.send(event).await.is_err() {
                    debug!("Session event receiver dropped.");
                    return;
                }
            }
            state.send_if_modified(|current| {
                if *current == SessionState::Connected {
                    *current = SessionState::Closed;
                    true
                } else {
                    false
                }
            });
            let _ = events_tx.send(SessionEvent::Closed).await;
        });

        Ok(events_rx)
    }

    /// Forwards one PCM16 frame. No acknowledgement, no flow control.
    pub async fn send_audio(&self, frame: &[u8]) -> Result<()> {
        self.send(ClientEvent::InputAudioBufferAppend {
            audio: encode_pcm16(frame),
        })
        .await
    }

    /// Returns a tool result to the model and asks it to continue.
    pub async fn send_tool_output(&self, call_id: &str, output: &str) -> Result<()> {
        self.send(ClientEvent::ConversationItemCreate {
            item: ConversationItem::FunctionCallOutput {
                call_id: call_id.to_string(),
                output: output.to_string(),
            },
        })
        .await?;
        self.send(ClientEvent::ResponseCreate).await
    }

    /// Closes the channel. Idempotent; in-flight frames are not drained.
    pub fn close(&self) {
        let sender = self.lock_outbound().take();
        if sender.is_some() {
            self.state.send_replace(SessionState::Closed);
            info!("Realtime session closed.");
        }
    }

    async fn send(&self, event: ClientEvent) -> Result<()> {
        let state = self.state();
        if state != SessionState::Connected {
            return Err(RealtimeError::NotConnected(state));
        }
        let sender = self
            .lock_outbound()
            .clone()
            .ok_or(RealtimeError::NotConnected(state))?;
        sender
            .send(event)
            .await
            .map_err(|_| RealtimeError::Transport("outbound channel closed".to_string()))
    }

    fn lock_outbound(&self) -> std::sync::MutexGuard<'_, Option<mpsc::Sender<ClientEvent>>> {
        self.outbound
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

//! Connection to the hosted realtime runtime.
//!
//! A [`Connector`] opens a channel and hands back a [`Transport`]: a pair of
//! in-process queues. The WebSocket implementation pumps those queues against
//! the socket from a background task, so the session never touches the socket.

use crate::error::{RealtimeError, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use openai_realtime_types::{ClientEvent, ServerEvent};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, protocol::Message as WsMessage},
};
use tracing::{debug, info, warn};

const CHANNEL_CAPACITY: usize = 128;

/// The two ends of an open realtime channel.
pub struct Transport {
    /// Events to send to the remote runtime, in call order.
    pub outbound: mpsc::Sender<ClientEvent>,
    /// Events received from the remote runtime. Closes when the channel ends.
    pub inbound: mpsc::Receiver<Result<ServerEvent>>,
}

/// Opens channels to a realtime runtime.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, url: &str, credential: &SecretString) -> Result<Transport>;
}

/// Connects over a WebSocket using the beta realtime protocol.
#[derive(Debug, Default, Clone)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn open(&self, url: &str, credential: &SecretString) -> Result<Transport> {
        let mut request = url
            .into_client_request()
            .map_err(|e| RealtimeError::Connection(e.to_string()))?;
        let bearer = format!("Bearer {}", credential.expose_secret())
            .parse()
            .map_err(|_| RealtimeError::Connection("API key is not a valid header value".to_string()))?;
        request.headers_mut().insert("Authorization", bearer);
        request.headers_mut().insert(
            "OpenAI-Beta",
            "realtime=v1"
                .parse()
                .map_err(|_| RealtimeError::Connection("invalid OpenAI-Beta header".to_string()))?,
        );

        let (ws_stream, _) = connect_async(request)
            .await
            .map_err(|e| RealtimeError::Connection(e.to_string()))?;
        let (mut ws_tx, mut ws_rx) = ws_stream.split();
        info!(url, "Connected to OpenAI Realtime API.");

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<ClientEvent>(CHANNEL_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel::<Result<ServerEvent>>(CHANNEL_CAPACITY);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    outbound = outbound_rx.recv() => match outbound {
                        Some(event) => {
                            let text = match serde_json::to_string(&event) {
                                Ok(text) => text,
                                Err(e) => {
                                    warn!(error = %e, "Dropping unserializable client event");
                                    continue;
                                }
                            };
                            if let Err(e) = ws_tx.send(WsMessage::Text(text.into())).await {
                                let _ = inbound_tx.send(Err(RealtimeError::Transport(e.to_string()))).await;
                                break;
                            }
                        }
                        None => {
                            // The session dropped its sender: close the socket.
                            let _ = ws_tx.close().await;
                            break;
                        }
                    },
                    inbound = ws_rx.next() => match inbound {
                        Some(Ok(WsMessage::Text(text))) => {
                            match serde_json::from_str::<ServerEvent>(&text) {
                                Ok(ServerEvent::Unknown) => {}
                                Ok(event) => {
                                    if inbound_tx.send(Ok(event)).await.is_err() {
                                        break;
                                    }
                                }
                                Err(e) => warn!(error = %e, "Ignoring unparseable server event"),
                            }
                        }
                        Some(Ok(WsMessage::Close(frame))) => {
                            info!(?frame, "Realtime server closed the connection.");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            let _ = inbound_tx.send(Err(RealtimeError::Transport(e.to_string()))).await;
                            break;
                        }
                        None => break,
                    },
                }
            }
            debug!("Realtime socket pump finished.");
        });

        Ok(Transport {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

/// Creates a transport backed by plain channels, returning the remote ends.
///
/// Useful for driving a session without a network.
pub fn channel_transport() -> (
    Transport,
    mpsc::Receiver<ClientEvent>,
    mpsc::Sender<Result<ServerEvent>>,
) {
    let (outbound_tx, outbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (inbound_tx, inbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
    (
        Transport {
            outbound: outbound_tx,
            inbound: inbound_rx,
        },
        outbound_rx,
        inbound_tx,
    )
}

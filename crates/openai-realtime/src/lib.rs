//! Client side of the OpenAI Realtime API.
//!
//! - `session`: the explicitly constructed session handle (`connect`, `send_audio`, `close`).
//! - `transport`: how a channel is opened (`Connector`), with a WebSocket implementation.
//! - `event`: the typed events the application consumes from a session.
//! - `audio`: PCM16 payload encoding for the wire.

pub mod audio;
pub mod config;
pub mod error;
pub mod event;
pub mod session;
pub mod transport;

pub use config::SessionConfig;
pub use error::{RealtimeError, Result};
pub use event::SessionEvent;
pub use openai_realtime_types as types;
pub use session::{RealtimeSession, SessionEvents, SessionState};
pub use transport::{Connector, Transport, WebSocketConnector};

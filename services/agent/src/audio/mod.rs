//! Audio I/O through an external `sox` process.
//!
//! Capture reads raw PCM from the default input device and forwards it to the
//! session. Playback writes each agent frame to disk and hands it to a player
//! process. Neither side resamples or inspects the samples.

pub mod capture;
pub mod format;
pub mod playback;

pub use capture::{AudioSink, BridgeState, CaptureBridge, CaptureChunk, forward_chunk};
pub use format::{AudioCommand, PcmFormat};
pub use playback::{AudioOutput, PlaybackMode, Player};

use bytes::Bytes;

/// One buffer of raw little-endian PCM16 bytes.
pub type AudioFrame = Bytes;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("process '{0}' has no {1} pipe")]
    MissingPipe(String, &'static str),
    #[error("audio I/O error: {0}")]
    Io(#[from] std::io::Error),
}

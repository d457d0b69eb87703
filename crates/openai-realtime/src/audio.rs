//! PCM16 payload helpers.
//!
//! Audio travels over the realtime socket as base64 text. Frames stay raw
//! little-endian bytes everywhere else.

use base64::Engine;

/// Encodes a raw PCM16 byte buffer for `input_audio_buffer.append`.
pub fn encode_pcm16(frame: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(frame)
}

/// Decodes a `response.audio.delta` payload back into raw PCM16 bytes.
///
/// Returns `None` when the payload is not valid base64.
pub fn decode_pcm16(base64_fragment: &str) -> Option<Vec<u8>> {
    match base64::engine::general_purpose::STANDARD.decode(base64_fragment) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::error!(error = %e, "Failed to decode base64 audio fragment");
            None
        }
    }
}

//! Typed events delivered to the local dispatch loop.

use crate::audio::decode_pcm16;
use bytes::Bytes;
use openai_realtime_types::ServerEvent;

/// A session event, as seen by the application.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A chunk of PCM16 audio spoken by the agent.
    Audio {
        frame: Bytes,
        /// What the agent has said so far in the current response, if known.
        transcript: Option<String>,
    },
    /// Transcription of the user's speech.
    Transcript(String),
    /// Complete text of an agent response.
    Text(String),
    /// The agent asked for a tool to be invoked.
    ToolCall {
        call_id: String,
        name: String,
        arguments: String,
    },
    /// An error reported by the remote runtime or the transport.
    Error(String),
    /// The channel has ended. Always the last event.
    Closed,
}

/// Folds raw server events into [`SessionEvent`]s.
///
/// Keeps the running transcript of the current response so audio chunks can
/// carry the words they belong to.
#[derive(Debug, Default)]
pub struct EventTranslator {
    response_transcript: String,
}

impl EventTranslator {
    pub fn translate(&mut self, event: ServerEvent) -> Option<SessionEvent> {
        match event {
            ServerEvent::ResponseCreated { .. } | ServerEvent::ResponseDone { .. } => {
                self.response_transcript.clear();
                None
            }
            ServerEvent::ResponseAudioTranscriptDelta { delta, .. } => {
                self.response_transcript.push_str(&delta);
                None
            }
            ServerEvent::ResponseAudioTranscriptDone { transcript, .. } => {
                self.response_transcript = transcript.clone();
                Some(SessionEvent::Text(transcript))
            }
            ServerEvent::ResponseTextDone { text, .. } => Some(SessionEvent::Text(text)),
            ServerEvent::InputAudioTranscriptionCompleted { transcript, .. } => {
                Some(SessionEvent::Transcript(transcript))
            }
            ServerEvent::ResponseAudioDelta { delta, .. } => {
                let frame = decode_pcm16(&delta)?;
                let transcript =
                    (!self.response_transcript.is_empty()).then(|| self.response_transcript.clone());
                Some(SessionEvent::Audio {
                    frame: Bytes::from(frame),
                    transcript,
                })
            }
            ServerEvent::ResponseFunctionCallArgumentsDone {
                call_id,
                name,
                arguments,
            } => Some(SessionEvent::ToolCall {
                call_id,
                name,
                arguments,
            }),
            ServerEvent::Error { error } => Some(SessionEvent::Error(error.message)),
            ServerEvent::SessionCreated { .. }
            | ServerEvent::SessionUpdated { .. }
            | ServerEvent::ResponseTextDelta { .. }
            | ServerEvent::Unknown => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::encode_pcm16;
    use openai_realtime_types::ApiError;
    use serde_json::json;

    fn audio_delta(bytes: &[u8]) -> ServerEvent {
        ServerEvent::ResponseAudioDelta {
            response_id: "resp".to_string(),
            item_id: "item".to_string(),
            delta: encode_pcm16(bytes),
        }
    }

    #[test]
    fn test_audio_without_transcript() {
        let mut translator = EventTranslator::default();
        let event = translator.translate(audio_delta(&[1, 2, 3, 4]));
        assert_eq!(
            event,
            Some(SessionEvent::Audio {
                frame: Bytes::from_static(&[1, 2, 3, 4]),
                transcript: None,
            })
        );
    }

    #[test]
    fn test_audio_carries_running_transcript_until_response_done() {
        let mut translator = EventTranslator::default();
        for delta in ["Invoice ", "created."] {
            assert!(
                translator
                    .translate(ServerEvent::ResponseAudioTranscriptDelta {
                        response_id: "resp".to_string(),
                        delta: delta.to_string(),
                    })
                    .is_none()
            );
        }
        match translator.translate(audio_delta(&[0, 0])) {
            Some(SessionEvent::Audio { transcript, .. }) => {
                assert_eq!(transcript.as_deref(), Some("Invoice created."));
            }
            other => panic!("unexpected {:?}", other),
        }

        translator.translate(ServerEvent::ResponseDone { response: json!({}) });
        match translator.translate(audio_delta(&[0, 0])) {
            Some(SessionEvent::Audio { transcript, .. }) => assert_eq!(transcript, None),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_invalid_audio_payload_is_dropped() {
        let mut translator = EventTranslator::default();
        let event = ServerEvent::ResponseAudioDelta {
            response_id: "resp".to_string(),
            item_id: "item".to_string(),
            delta: "not base64!".to_string(),
        };
        assert_eq!(translator.translate(event), None);
    }

    #[test]
    fn test_transcripts_text_and_errors() {
        let mut translator = EventTranslator::default();
        assert_eq!(
            translator.translate(ServerEvent::InputAudioTranscriptionCompleted {
                item_id: "item".to_string(),
                transcript: "bill Acme".to_string(),
            }),
            Some(SessionEvent::Transcript("bill Acme".to_string()))
        );
        assert_eq!(
            translator.translate(ServerEvent::ResponseTextDone {
                response_id: "resp".to_string(),
                text: "Sure.".to_string(),
            }),
            Some(SessionEvent::Text("Sure.".to_string()))
        );
        assert_eq!(
            translator.translate(ServerEvent::Error {
                error: ApiError {
                    kind: "server_error".to_string(),
                    code: None,
                    message: "boom".to_string(),
                },
            }),
            Some(SessionEvent::Error("boom".to_string()))
        );
        assert_eq!(translator.translate(ServerEvent::Unknown), None);
    }

    #[test]
    fn test_tool_call() {
        let mut translator = EventTranslator::default();
        let event = translator.translate(ServerEvent::ResponseFunctionCallArgumentsDone {
            call_id: "call_1".to_string(),
            name: "provide_estimate".to_string(),
            arguments: "{}".to_string(),
        });
        assert_eq!(
            event,
            Some(SessionEvent::ToolCall {
                call_id: "call_1".to_string(),
                name: "provide_estimate".to_string(),
                arguments: "{}".to_string(),
            })
        );
    }
}

use openai_realtime_types::{AudioFormat, AudioTranscription, SessionResource, ToolSpec};

pub const DEFAULT_REALTIME_MODEL: &str = "gpt-4o-realtime-preview-2025-06-03";
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "gpt-4o-mini-transcribe";
pub const REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

/// Everything the remote runtime needs to know about a session.
///
/// These values are passed through verbatim in the initial `session.update`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub model: String,
    pub instructions: String,
    pub tools: Vec<ToolSpec>,
    pub voice: Option<String>,
    pub input_audio_format: AudioFormat,
    pub output_audio_format: AudioFormat,
    pub transcription_model: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_REALTIME_MODEL.to_string(),
            instructions: String::new(),
            tools: Vec::new(),
            voice: None,
            input_audio_format: AudioFormat::Pcm16,
            output_audio_format: AudioFormat::Pcm16,
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
        }
    }
}

impl SessionConfig {
    /// Endpoint URL for this session's model.
    pub fn url(&self) -> String {
        format!("{}?model={}", REALTIME_URL, self.model)
    }

    /// Builds the `session.update` payload.
    pub fn to_resource(&self) -> SessionResource {
        SessionResource {
            model: None,
            modalities: Some(vec!["text".to_string(), "audio".to_string()]),
            instructions: Some(self.instructions.clone()),
            voice: self.voice.clone(),
            input_audio_format: Some(self.input_audio_format),
            output_audio_format: Some(self.output_audio_format),
            input_audio_transcription: Some(AudioTranscription {
                model: Some(self.transcription_model.clone()),
                ..Default::default()
            }),
            tool_choice: (!self.tools.is_empty()).then(|| "auto".to_string()),
            tools: (!self.tools.is_empty()).then(|| self.tools.clone()),
        }
    }
}

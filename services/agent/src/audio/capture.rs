use super::{AudioCommand, AudioError, AudioFrame};
use async_trait::async_trait;
use bytes::Bytes;
use openai_realtime::RealtimeSession;
use std::sync::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tracing::{debug, error, info, warn};

const READ_CHUNK_BYTES: usize = 4096;

/// A piece of output from the capture process, as delivered by the pipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureChunk {
    Binary(Bytes),
    Text(String),
    Unsupported(String),
}

/// Where captured frames go.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn send_audio(&self, frame: AudioFrame) -> anyhow::Result<()>;
}

#[async_trait]
impl AudioSink for RealtimeSession {
    async fn send_audio(&self, frame: AudioFrame) -> anyhow::Result<()> {
        RealtimeSession::send_audio(self, &frame).await.map_err(Into::into)
    }
}

/// Converts a chunk to a frame and hands it to `sink`.
///
/// Returns `true` if the sink accepted the frame. Unsupported chunks and sink
/// failures are logged and dropped.
pub async fn forward_chunk(chunk: CaptureChunk, sink: &dyn AudioSink) -> bool {
    let frame = match chunk {
        CaptureChunk::Binary(bytes) => bytes,
        CaptureChunk::Text(text) => Bytes::from(text.into_bytes()),
        CaptureChunk::Unsupported(kind) => {
            warn!(kind = %kind, "Unexpected chunk type received from capture process");
            return false;
        }
    };
    match sink.send_audio(frame).await {
        Ok(()) => true,
        Err(e) => {
            error!(error = %e, "Failed to forward captured audio");
            false
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeState {
    Idle,
    Capturing,
    Stopped { code: Option<i32> },
    Failed(String),
}

/// Runs a capture process once and pumps its stdout into an [`AudioSink`].
///
/// The bridge never restarts: once the process exits or fails to start, the
/// bridge stays in its terminal state.
pub struct CaptureBridge {
    command: AudioCommand,
    state: Mutex<BridgeState>,
}

impl CaptureBridge {
    pub fn new(command: AudioCommand) -> Self {
        Self {
            command,
            state: Mutex::new(BridgeState::Idle),
        }
    }

    pub fn command(&self) -> &AudioCommand {
        &self.command
    }

    pub fn state(&self) -> BridgeState {
        match self.state.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_state(&self, next: BridgeState) {
        match self.state.lock() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// Spawns the process and forwards everything it writes until it exits.
    ///
    /// Returns the terminal state. Calling `run` on a bridge that already left
    /// `Idle` returns the current state without spawning anything.
    pub async fn run(&self, sink: &dyn AudioSink) -> BridgeState {
        if self.state() != BridgeState::Idle {
            warn!(state = ?self.state(), "Capture bridge already used; not restarting");
            return self.state();
        }

        let terminal = match self.capture(sink).await {
            Ok(code) => {
                match code {
                    Some(0) => info!(code = 0, "Capture process exited"),
                    Some(code) => warn!(code, "Capture process exited with code {}", code),
                    None => warn!("Capture process terminated by signal"),
                }
                BridgeState::Stopped { code }
            }
            Err(e) => {
                error!(error = %e, program = %self.command.program_name(), "Capture process error");
                BridgeState::Failed(e.to_string())
            }
        };
        self.set_state(terminal.clone());
        terminal
    }

    async fn capture(&self, sink: &dyn AudioSink) -> Result<Option<i32>, AudioError> {
        let mut child = self.command.spawn_piped()?;
        self.set_state(BridgeState::Capturing);
        info!(program = %self.command.program_name(), "Capture process started");

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!(target: "capture", "{}", line);
                }
            });
        }

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| AudioError::MissingPipe(self.command.program_name(), "stdout"))?;

        let mut buf = vec![0u8; READ_CHUNK_BYTES];
        loop {
            let read = stdout.read(&mut buf).await?;
            if read == 0 {
                break;
            }
            debug!(bytes = read, "Captured audio chunk");
            forward_chunk(CaptureChunk::Binary(Bytes::copy_from_slice(&buf[..read])), sink).await;
        }

        let status = child.wait().await?;
        Ok(status.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingSink {
        frames: Mutex<Vec<AudioFrame>>,
    }

    impl RecordingSink {
        fn collected(&self) -> Vec<u8> {
            self.frames
                .lock()
                .unwrap()
                .iter()
                .flat_map(|f| f.iter().copied())
                .collect()
        }
    }

    #[async_trait]
    impl AudioSink for RecordingSink {
        async fn send_audio(&self, frame: AudioFrame) -> anyhow::Result<()> {
            self.frames.lock().unwrap().push(frame);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_binary_chunk_is_forwarded_unchanged() {
        let bytes = Bytes::from_static(&[0x00, 0x01, 0xff, 0x7f]);
        let expected = bytes.clone();
        let mut sink = MockAudioSink::new();
        sink.expect_send_audio()
            .withf(move |frame| *frame == expected)
            .times(1)
            .returning(|_| Ok(()));

        assert!(forward_chunk(CaptureChunk::Binary(bytes), &sink).await);
    }

    #[tokio::test]
    async fn test_text_chunk_is_forwarded_as_utf8_bytes() {
        let mut sink = MockAudioSink::new();
        sink.expect_send_audio()
            .withf(|frame| &frame[..] == "hé".as_bytes())
            .times(1)
            .returning(|_| Ok(()));

        assert!(forward_chunk(CaptureChunk::Text("hé".to_string()), &sink).await);
    }

    #[tokio::test]
    async fn test_unsupported_chunk_is_dropped() {
        let mut sink = MockAudioSink::new();
        sink.expect_send_audio().times(0);

        assert!(!forward_chunk(CaptureChunk::Unsupported("object".to_string()), &sink).await);
    }

    #[tokio::test]
    async fn test_sink_failure_is_not_fatal() {
        let mut sink = MockAudioSink::new();
        sink.expect_send_audio()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("session closed")));

        assert!(!forward_chunk(CaptureChunk::Binary(Bytes::from_static(b"ab")), &sink).await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_bridge_forwards_process_output_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.pcm");
        let payload: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&input, &payload).unwrap();

        let bridge = CaptureBridge::new(AudioCommand::new("cat").arg(input.as_os_str()));
        let sink = Arc::new(RecordingSink::default());

        let state = bridge.run(sink.as_ref()).await;

        assert_eq!(state, BridgeState::Stopped { code: Some(0) });
        assert_eq!(sink.collected(), payload);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_bridge_non_zero_exit_stops_without_restart() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("spawns");
        let script = format!("echo spawned >> '{}'; exit 3", marker.display());
        let bridge = CaptureBridge::new(AudioCommand::new("sh").arg("-c").arg(script));
        let mut sink = MockAudioSink::new();
        sink.expect_send_audio().times(0);

        let first = bridge.run(&sink).await;
        let second = bridge.run(&sink).await;

        assert_eq!(first, BridgeState::Stopped { code: Some(3) });
        assert_eq!(second, first);
        let spawns = std::fs::read_to_string(&marker).unwrap();
        assert_eq!(spawns.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_bridge_spawn_failure_is_terminal() {
        let bridge = CaptureBridge::new(AudioCommand::new("/definitely/not/a/real/sox"));
        let mut sink = MockAudioSink::new();
        sink.expect_send_audio().times(0);

        let state = bridge.run(&sink).await;

        assert!(matches!(state, BridgeState::Failed(_)));
        assert_eq!(bridge.state(), state);
    }
}

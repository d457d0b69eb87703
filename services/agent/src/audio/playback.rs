use super::{AudioCommand, AudioError, AudioFrame, PcmFormat};
use async_trait::async_trait;
use std::{
    path::{Path, PathBuf},
    str::FromStr,
};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error, warn};

/// How agent audio frames reach the speakers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    /// Every frame overwrites one fixed file and a player is started without
    /// waiting. Overlapping frames can clobber each other.
    SharedFile,
    /// Frames play one after another in arrival order, each from its own file.
    #[default]
    Queued,
}

impl FromStr for PlaybackMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shared" | "shared-file" | "shared_file" => Ok(Self::SharedFile),
            "queued" | "queue" => Ok(Self::Queued),
            other => Err(format!(
                "'{}' is not a playback mode (expected 'queued' or 'shared-file')",
                other
            )),
        }
    }
}

/// Something that can play agent audio.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioOutput: Send + Sync {
    async fn play(&self, frame: AudioFrame);
}

pub struct Player {
    mode: PlaybackMode,
    launcher: AudioCommand,
    format: PcmFormat,
    file: PathBuf,
    queue: Option<mpsc::UnboundedSender<AudioFrame>>,
    worker: Option<JoinHandle<()>>,
}

impl Player {
    /// Creates a player. In `Queued` mode this spawns the playback worker, so
    /// it must be called from within a Tokio runtime.
    pub fn start(
        mode: PlaybackMode,
        launcher: AudioCommand,
        format: PcmFormat,
        file: impl Into<PathBuf>,
    ) -> Self {
        let file = file.into();
        let (queue, worker) = match mode {
            PlaybackMode::SharedFile => (None, None),
            PlaybackMode::Queued => {
                let (tx, rx) = mpsc::unbounded_channel();
                let worker = tokio::spawn(drain_queue(
                    rx,
                    launcher.clone(),
                    format,
                    file.clone(),
                ));
                (Some(tx), Some(worker))
            }
        };
        Self {
            mode,
            launcher,
            format,
            file,
            queue,
            worker,
        }
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    /// Stops accepting frames and waits until every queued frame has played.
    pub async fn finish(mut self) {
        self.queue.take();
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                error!(error = %e, "Playback worker panicked");
            }
        }
    }

    async fn play_shared(&self, frame: AudioFrame) {
        if let Err(e) = tokio::fs::write(&self.file, &frame).await {
            error!(error = %e, file = %self.file.display(), "Failed to write agent audio");
            return;
        }
        let command = self
            .launcher
            .clone()
            .with_args(self.format.playback_args(&self.file));
        tokio::spawn(run_player(command));
    }
}

#[async_trait]
impl AudioOutput for Player {
    async fn play(&self, frame: AudioFrame) {
        match self.mode {
            PlaybackMode::SharedFile => self.play_shared(frame).await,
            PlaybackMode::Queued => match &self.queue {
                Some(queue) if queue.send(frame).is_ok() => {}
                _ => warn!("Playback queue is closed; dropping audio frame"),
            },
        }
    }
}

async fn drain_queue(
    mut frames: mpsc::UnboundedReceiver<AudioFrame>,
    launcher: AudioCommand,
    format: PcmFormat,
    base: PathBuf,
) {
    let mut seq: u64 = 0;
    while let Some(frame) = frames.recv().await {
        seq += 1;
        let path = frame_path(&base, seq);
        if let Err(e) = tokio::fs::write(&path, &frame).await {
            error!(error = %e, file = %path.display(), "Failed to write agent audio");
            continue;
        }
        run_player(launcher.clone().with_args(format.playback_args(&path))).await;
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(error = %e, file = %path.display(), "Failed to remove played audio file");
        }
    }
    debug!(frames = seq, "Playback queue drained");
}

/// Runs one player process to completion and logs how it went.
async fn run_player(command: AudioCommand) {
    if let Err(e) = play_once(&command).await {
        error!(error = %e, "Error playing audio");
    }
}

async fn play_once(command: &AudioCommand) -> Result<(), AudioError> {
    let output = command.spawn_quiet()?.wait_with_output().await?;
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        warn!(target: "playback", "{}", stderr.trim());
    }
    if !output.status.success() {
        warn!(code = ?output.status.code(), "Playback process exited with a failure status");
    }
    Ok(())
}

/// `agent_output.pcm` becomes `agent_output-<pid>-000001.pcm` next to it.
fn frame_path(base: &Path, seq: u64) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "agent_output".to_string());
    let ext = base
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pcm".to_string());
    base.with_file_name(format!("{}-{}-{:06}.{}", stem, std::process::id(), seq, ext))
}

use std::{ffi::OsString, path::Path, process::Stdio};
use tokio::process::{Child, Command};

use super::AudioError;

/// Raw PCM layout shared by capture and playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits: u16,
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            bits: 16,
        }
    }
}

impl PcmFormat {
    /// `sox` arguments that record from the default device to stdout.
    pub fn capture_args(&self) -> Vec<OsString> {
        vec![
            "-d".into(),
            "-r".into(),
            self.sample_rate.to_string().into(),
            "-c".into(),
            self.channels.to_string().into(),
            "-b".into(),
            self.bits.to_string().into(),
            "-t".into(),
            "raw".into(),
            "-".into(),
        ]
    }

    /// `sox` arguments that play `file` on the default device.
    pub fn playback_args(&self, file: &Path) -> Vec<OsString> {
        vec![
            "-t".into(),
            "raw".into(),
            "-r".into(),
            self.sample_rate.to_string().into(),
            "-c".into(),
            self.channels.to_string().into(),
            "-b".into(),
            self.bits.to_string().into(),
            "-e".into(),
            "signed-integer".into(),
            file.as_os_str().to_owned(),
            "-d".into(),
        ]
    }
}

/// An external program plus its arguments.
///
/// A command built with [`AudioCommand::new`] acts as a launcher prefix;
/// format arguments are appended with [`AudioCommand::with_args`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioCommand {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl AudioCommand {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// Spawns the process with stdout and stderr piped and stdin closed.
    ///
    /// The child is killed if its handle is dropped.
    pub fn spawn_piped(&self) -> Result<Child, AudioError> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AudioError::Spawn {
                program: self.program_name(),
                source,
            })
    }

    /// Spawns the process with stderr piped and nothing on stdin or stdout.
    pub fn spawn_quiet(&self) -> Result<Child, AudioError> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| AudioError::Spawn {
                program: self.program_name(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_capture_args_match_sox_invocation() {
        let args = PcmFormat::default().capture_args();
        assert_eq!(
            strings(&args),
            vec!["-d", "-r", "16000", "-c", "1", "-b", "16", "-t", "raw", "-"]
        );
    }

    #[test]
    fn test_playback_args_match_sox_invocation() {
        let args = PcmFormat::default().playback_args(Path::new("agent_output.pcm"));
        assert_eq!(
            strings(&args),
            vec![
                "-t",
                "raw",
                "-r",
                "16000",
                "-c",
                "1",
                "-b",
                "16",
                "-e",
                "signed-integer",
                "agent_output.pcm",
                "-d"
            ]
        );
    }

    #[test]
    fn test_command_prefix_keeps_leading_args() {
        let cmd = AudioCommand::new("sh")
            .arg("player.sh")
            .with_args(PcmFormat::default().playback_args(Path::new("f.pcm")));
        assert_eq!(cmd.program_name(), "sh");
        assert_eq!(cmd.args[0], OsString::from("player.sh"));
        assert_eq!(cmd.args.len(), 13);
    }

    #[tokio::test]
    async fn test_spawn_failure_names_program() {
        let err = AudioCommand::new("/definitely/not/a/real/sox")
            .spawn_piped()
            .unwrap_err();
        match err {
            AudioError::Spawn { program, .. } => assert_eq!(program, "/definitely/not/a/real/sox"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

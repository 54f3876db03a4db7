use std::{
    io::Write,
    path::{Path, PathBuf},
    process::Stdio,
};

use tokio::process::Command;

use super::Merger;
use crate::error::{MjdlError, MjdlResult};

/// Merges with the ffmpeg CLI, stream copy only.
#[derive(Debug, Clone)]
pub struct FfmpegMerger {
    ffmpeg: PathBuf,
}

impl FfmpegMerger {
    /// Locate `ffmpeg` in `PATH`.
    pub fn new() -> MjdlResult<Self> {
        Ok(Self {
            ffmpeg: which::which("ffmpeg")?,
        })
    }

    pub fn with_executable<P>(ffmpeg: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    /// ffmpeg overwrites existing outputs and never reads from stdin.
    fn command(&self) -> Command {
        let mut command = Command::new(&self.ffmpeg);
        command.arg("-y").stdin(Stdio::null());
        command
    }

    fn mux_command(&self, audio: &Path, video: &Path, output: &Path) -> Command {
        let mut command = self.command();
        command
            .arg("-i")
            .arg(audio)
            .arg("-i")
            .arg(video)
            .args(["-acodec", "copy", "-vcodec", "copy"])
            .arg(output);
        command
    }

    fn concat_command(&self, list: &Path, output: &Path) -> Command {
        let mut command = self.command();
        command
            .args(["-f", "concat", "-safe", "0", "-i"])
            .arg(list)
            .args(["-c", "copy"])
            .arg(output);
        command
    }
}

impl Merger for FfmpegMerger {
    async fn mux(&self, audio: &Path, video: &Path, output: &Path) -> MjdlResult<i32> {
        let mut command = self.mux_command(audio, video, output);
        tracing::debug!("ffmpeg command is: {command:?}");

        let status = command.spawn()?.wait().await?;
        Ok(status.code().unwrap_or(-1))
    }

    async fn concat(&self, inputs: &[PathBuf], output: &Path) -> MjdlResult<()> {
        if inputs.is_empty() {
            return Ok(());
        }

        tracing::debug!("Concatenating {} file(s) with ffmpeg CLI...", inputs.len());

        // the concat demuxer resolves relative entries against the list file
        let mut list = tempfile::Builder::new().suffix(".txt").tempfile()?;
        for input in inputs {
            let input = tokio::fs::canonicalize(input).await?;
            writeln!(list, "file '{}'", escape_concat_path(&input))?;
        }
        list.flush()?;

        let mut command = self.concat_command(list.path(), output);
        tracing::debug!("ffmpeg command is: {command:?}");

        let status = command.spawn()?.wait().await?;
        if !status.success() {
            return Err(MjdlError::ExternalTool {
                tool: "ffmpeg",
                code: status.code().unwrap_or(-1),
            });
        }

        Ok(())
    }
}

fn escape_concat_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}

use std::path::{Path, PathBuf};

use rand::Rng;
use tokio::{fs::OpenOptions, io::AsyncWriteExt};

use crate::{
    error::{MjdlResult, TrackKind},
    util::path::{result_file_name, RESULT_EXTENSION},
};

pub const ERROR_LOG_FILE: &str = "errors.txt";

/// Paths shared by every stage of one invocation.
///
/// Built once at startup and borrowed by the stages that touch the filesystem.
/// Intermediate files go to `<base>/temp/<prefix>/`, muxed results to
/// `<base>/output/`, while the error log and the final concatenation land in
/// the working directory.
#[derive(Debug, Clone)]
pub struct RunContext {
    prefix: String,
    temp_dir: PathBuf,
    output_dir: PathBuf,
    work_dir: PathBuf,
}

impl RunContext {
    pub fn new<B, W>(base_dir: B, work_dir: W) -> Self
    where
        B: AsRef<Path>,
        W: Into<PathBuf>,
    {
        Self::with_prefix(base_dir, work_dir, run_prefix())
    }

    pub fn with_prefix<B, W>(base_dir: B, work_dir: W, prefix: String) -> Self
    where
        B: AsRef<Path>,
        W: Into<PathBuf>,
    {
        let base_dir = base_dir.as_ref();
        Self {
            prefix,
            temp_dir: base_dir.join("temp"),
            output_dir: base_dir.join("output"),
            work_dir: work_dir.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Results directory shared by the whole batch.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Working directory of this run only.
    pub fn instance_temp_dir(&self) -> PathBuf {
        self.temp_dir.join(&self.prefix)
    }

    pub fn track_path(&self, kind: TrackKind) -> PathBuf {
        let file_name = match kind {
            TrackKind::Video => "v.mp4",
            TrackKind::Audio => "a.mp3",
        };
        self.instance_temp_dir().join(file_name)
    }

    pub fn result_path(&self, index: usize, batch: &str) -> PathBuf {
        self.output_dir.join(result_file_name(index, batch))
    }

    pub fn final_path(&self, batch: &str) -> PathBuf {
        self.work_dir.join(format!("{batch}.{RESULT_EXTENSION}"))
    }

    pub fn error_log(&self) -> PathBuf {
        self.work_dir.join(ERROR_LOG_FILE)
    }

    /// Create the run's temp directory and the results directory.
    pub async fn prepare(&self) -> MjdlResult<()> {
        for dir in [self.instance_temp_dir(), self.output_dir.clone()] {
            if !dir.exists() {
                tracing::info!("Creating {}...", dir.display());
                tokio::fs::create_dir_all(&dir).await?;
            }
        }
        Ok(())
    }

    /// Remove `temp/` and `output/` entirely, including results of earlier runs.
    pub async fn clean(&self) -> MjdlResult<()> {
        for dir in [&self.temp_dir, &self.output_dir] {
            if dir.exists() {
                tracing::info!("Removing {}...", dir.display());
                tokio::fs::remove_dir_all(dir).await?;
            }
        }
        Ok(())
    }

    /// Remove this run's temp directory.
    pub async fn cleanup(&self) -> MjdlResult<()> {
        let dir = self.instance_temp_dir();
        if dir.exists() {
            tokio::fs::remove_dir_all(dir).await?;
        }
        Ok(())
    }

    /// Append a failed source URL to the error log, one per line.
    pub async fn record_failure(&self, url: &str) -> MjdlResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.error_log())
            .await?;
        file.write_all(url.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}

/// `YYYYMMDD-HHMMSS-NNN`: local start time plus a three digit salt.
fn run_prefix() -> String {
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let salt: u16 = rand::thread_rng().gen_range(0..1000);
    format!("{timestamp}-{salt:03}")
}

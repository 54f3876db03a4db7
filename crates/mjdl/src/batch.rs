use std::{
    num::NonZeroU32,
    path::{Path, PathBuf},
};

use reqwest::Url;

use crate::{
    context::RunContext,
    error::{MjdlError, MjdlResult, TrackKind},
    locate::Locator,
    manifest::{fetch_manifest, Manifest},
    merge::{concat_all, Merger},
    reassemble::Reassembler,
    util::path::MjdlPathExt,
    HttpClient,
};

/// What to do with the rest of a batch once a source fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Record the failure and move on to the next source.
    #[default]
    Continue,
    /// Record the failure and stop the batch without concatenating.
    Abort,
}

/// One line of the URL list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Zero-based position in the list, counting skipped lines.
    pub index: usize,
    pub page_url: String,
}

#[derive(Debug)]
pub struct SourceFailure {
    pub index: usize,
    pub page_url: String,
    pub error: MjdlError,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    /// Muxed results, in processing order.
    pub completed: Vec<PathBuf>,
    pub failed: Vec<SourceFailure>,
    pub aborted: bool,
    pub concatenated: Option<PathBuf>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Split a URL list into entries, dropping the first `skip` lines.
pub fn parse_url_list(content: &str, skip: usize) -> Vec<SourceEntry> {
    content
        .lines()
        .enumerate()
        .skip(skip)
        .map(|(index, line)| SourceEntry {
            index,
            page_url: line.to_string(),
        })
        .collect()
}

pub async fn read_url_list<P>(path: P, skip: usize) -> MjdlResult<Vec<SourceEntry>>
where
    P: AsRef<Path>,
{
    let content = tokio::fs::read_to_string(path).await?;
    Ok(parse_url_list(&content, skip))
}

async fn remove_if_exists(path: &Path) -> MjdlResult<()> {
    if path.exists() {
        tracing::debug!("Removing {}", path.display());
        tokio::fs::remove_file(path).await?;
    }
    Ok(())
}

/// Locate, fetch, reassemble and mux a single source page.
#[derive(Clone)]
pub struct Pipeline {
    client: HttpClient,
    locator: Locator,
    reassembler: Reassembler,
}

impl Pipeline {
    pub fn new(client: HttpClient) -> Self {
        Self {
            locator: Locator::new(client.clone()),
            reassembler: Reassembler::new(client.clone()),
            client,
        }
    }

    pub fn with_marker<S>(mut self, marker: S) -> Self
    where
        S: Into<String>,
    {
        self.locator = self.locator.with_marker(marker);
        self
    }

    pub fn with_concurrency(mut self, concurrency: NonZeroU32) -> Self {
        self.reassembler = self.reassembler.with_concurrency(concurrency);
        self
    }

    pub async fn manifest(&self, page_url: &str) -> MjdlResult<Manifest> {
        let manifest_url: Url = self.locator.locate(page_url).await?;
        tracing::info!("Manifest url: {manifest_url}");
        fetch_manifest(&self.client, &manifest_url).await
    }

    /// Produce `output` from `page_url`. The run's temp directory must exist.
    pub async fn process<M>(
        &self,
        context: &RunContext,
        page_url: &str,
        output: &Path,
        merger: &M,
    ) -> MjdlResult<PathBuf>
    where
        M: Merger,
    {
        let manifest = self.manifest(page_url).await?;

        let video = manifest.best_video()?;
        tracing::info!(
            "Selected video {} ({}p)",
            video.id.as_deref().unwrap_or("<unnamed>"),
            video.height.unwrap_or_default()
        );
        let video_path = context.track_path(TrackKind::Video);
        self.reassembler
            .reassemble(video, &manifest.base_url, &video_path)
            .await?
            .into_result()?;

        let audio = manifest.audio_track()?;
        let audio_path = context.track_path(TrackKind::Audio);
        self.reassembler
            .reassemble(audio, &manifest.base_url, &audio_path)
            .await?
            .into_result()?;

        // a result left by an earlier run is replaced, never concatenated
        remove_if_exists(output).await?;
        let code = merger.mux(&audio_path, &video_path, output).await?;
        if code != 0 {
            remove_if_exists(output).await?;
            return Err(MjdlError::MuxFailed(code));
        }

        Ok(output.to_path_buf())
    }
}

#[derive(Debug, Clone)]
pub enum BatchMode {
    /// Process every source in `url_list` after the first `skip` lines.
    Download { url_list: PathBuf, skip: usize },
    /// Only concatenate what is already in the results directory.
    ConcatOnly { output: PathBuf },
}

/// Drives the whole run.
///
/// ```text
///  urls.txt ──► line #i ──► Pipeline ──► output/<i>_urls.mp4 ─┐
///               line #j ──► Pipeline ──► output/<j>_urls.mp4 ─┼─► concat ──► urls.mp4
///               ...                                           │
///                           (failure) ──► errors.txt          │
/// ```
pub struct Batch {
    pipeline: Pipeline,
    mode: BatchMode,
    policy: FailurePolicy,
    keep_temp: bool,
}

impl Batch {
    pub fn new(pipeline: Pipeline, mode: BatchMode) -> Self {
        Self {
            pipeline,
            mode,
            policy: FailurePolicy::default(),
            keep_temp: false,
        }
    }

    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn keep_temp(mut self, keep_temp: bool) -> Self {
        self.keep_temp = keep_temp;
        self
    }

    pub async fn run<M>(&self, context: &RunContext, merger: &M) -> MjdlResult<BatchReport>
    where
        M: Merger,
    {
        match &self.mode {
            BatchMode::ConcatOnly { output } => {
                let mut report = BatchReport::default();
                let files = concat_all(context.output_dir(), output, merger).await?;
                if !files.is_empty() {
                    report.concatenated = Some(output.clone());
                }
                Ok(report)
            }
            BatchMode::Download { url_list, skip } => {
                self.download(context, url_list, *skip, merger).await
            }
        }
    }

    async fn download<M>(
        &self,
        context: &RunContext,
        url_list: &Path,
        skip: usize,
        merger: &M,
    ) -> MjdlResult<BatchReport>
    where
        M: Merger,
    {
        let batch = url_list.batch_name();
        let sources = read_url_list(url_list, skip).await?;
        context.prepare().await?;

        let report = self.process_all(context, &batch, sources, merger).await;
        if !self.keep_temp {
            match (context.cleanup().await, &report) {
                (Err(e), Ok(_)) => return Err(e),
                // the batch error takes precedence
                (Err(e), Err(_)) => tracing::warn!(
                    "Failed to remove {}: {e}",
                    context.instance_temp_dir().display()
                ),
                (Ok(()), _) => {}
            }
        }

        report
    }

    async fn process_all<M>(
        &self,
        context: &RunContext,
        batch: &str,
        sources: Vec<SourceEntry>,
        merger: &M,
    ) -> MjdlResult<BatchReport>
    where
        M: Merger,
    {
        let mut report = BatchReport::default();
        for source in sources {
            let output = context.result_path(source.index, batch);
            tracing::info!("Output filename set to: {}", output.display());

            match self
                .pipeline
                .process(context, &source.page_url, &output, merger)
                .await
            {
                Ok(output) => report.completed.push(output),
                Err(error) => {
                    tracing::error!("Failed to download {}: {error}", source.page_url);
                    context.record_failure(&source.page_url).await?;
                    report.failed.push(SourceFailure {
                        index: source.index,
                        page_url: source.page_url,
                        error,
                    });

                    if self.policy == FailurePolicy::Abort {
                        report.aborted = true;
                        break;
                    }
                }
            }
        }

        if !report.aborted {
            let final_path = context.final_path(batch);
            let files = concat_all(context.output_dir(), &final_path, merger).await?;
            if !files.is_empty() {
                report.concatenated = Some(final_path);
            }
        }

        Ok(report)
    }
}

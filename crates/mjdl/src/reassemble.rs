use std::{num::NonZeroU32, path::Path};

use futures::{StreamExt, TryStreamExt};
use reqwest::{StatusCode, Url};
use tokio::{fs::File, io::AsyncWriteExt};

use crate::{
    error::{MjdlError, MjdlResult},
    manifest::Representation,
    HttpClient,
};

/// Segments between two progress lines at `info` level.
const PROGRESS_INTERVAL: usize = 10;

fn should_report_progress(done: usize, total: usize) -> bool {
    done == total || done % PROGRESS_INTERVAL == 0
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentFailure {
    /// Position of the failed segment in the representation.
    pub index: usize,
    pub url: String,
    pub status: StatusCode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadResult {
    pub success: bool,
    pub segments_written: usize,
    /// Including the initialization segment.
    pub bytes_written: u64,
    pub failure: Option<SegmentFailure>,
}

impl DownloadResult {
    pub fn into_result(self) -> MjdlResult<Self> {
        match self.failure {
            Some(SegmentFailure { url, status, .. }) => {
                Err(MjdlError::SegmentFetch { url, status })
            }
            None => Ok(self),
        }
    }
}

/// Rebuilds a representation as one local file.
///
/// The output is the decoded initialization segment followed by every media
/// segment, in manifest order. Up to `concurrency` requests may be in flight,
/// but bodies are always committed in order, so with the default of one the
/// download is fully sequential.
#[derive(Clone)]
pub struct Reassembler {
    client: HttpClient,
    concurrency: NonZeroU32,
}

impl Reassembler {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            concurrency: NonZeroU32::MIN,
        }
    }

    pub fn with_concurrency(mut self, concurrency: NonZeroU32) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Truncates `output`, then writes the init segment and each segment body.
    ///
    /// Stops at the first non-success status and reports it in the returned
    /// [DownloadResult]; whatever was written before stays on disk.
    pub async fn reassemble<P>(
        &self,
        representation: &Representation,
        manifest_base: &Url,
        output: P,
    ) -> MjdlResult<DownloadResult>
    where
        P: AsRef<Path>,
    {
        let base = representation.segment_base(manifest_base)?;
        let urls = representation
            .segments
            .iter()
            .map(|segment| Representation::segment_url(&base, segment))
            .collect::<MjdlResult<Vec<_>>>()?;
        tracing::info!(
            "Downloading {} segment(s) from {base} to {}",
            urls.len(),
            output.as_ref().display()
        );

        let mut file = File::create(output.as_ref()).await?;
        file.write_all(&representation.init_segment).await?;

        let mut result = DownloadResult {
            bytes_written: representation.init_segment.len() as u64,
            ..Default::default()
        };

        let total = urls.len();
        let client = self.client.clone();
        let mut responses = futures::stream::iter(urls.into_iter().enumerate())
            .map(|(index, url)| {
                let client = client.clone();
                async move {
                    let response = client.get(url.clone()).send().await;
                    (index, url, response)
                }
            })
            .buffered(self.concurrency.get() as usize);

        while let Some((index, url, response)) = responses.next().await {
            let response = response?;
            let status = response.status();
            if !status.is_success() {
                tracing::warn!("Segment {}/{total} failed ({status}): {url}", index + 1);
                result.failure = Some(SegmentFailure {
                    index,
                    url: url.to_string(),
                    status,
                });
                file.flush().await?;
                return Ok(result);
            }

            let stream = response.bytes_stream().map_err(std::io::Error::other);
            let mut reader = tokio_util::io::StreamReader::new(stream);
            let written = tokio::io::copy(&mut reader, &mut file).await?;

            result.segments_written += 1;
            result.bytes_written += written;
            tracing::debug!("Segment {}/{total} done ({written} bytes)", index + 1);
            if should_report_progress(index + 1, total) {
                tracing::info!(
                    "[{}/{total}] {} bytes written to {}",
                    index + 1,
                    result.bytes_written,
                    output.as_ref().display()
                );
            }
        }

        file.flush().await?;
        result.success = true;
        Ok(result)
    }
}

pub mod concat;
mod ffmpeg;

pub use concat::{concat_all, list_results, sort_results};
pub use ffmpeg::FfmpegMerger;

use std::{
    future::Future,
    path::{Path, PathBuf},
};

use crate::error::MjdlResult;

/// External tool combining media files without transcoding.
pub trait Merger {
    /// Combine one audio and one video file into `output`.
    ///
    /// Returns the exit code of the tool without interpreting it.
    fn mux(
        &self,
        audio: &Path,
        video: &Path,
        output: &Path,
    ) -> impl Future<Output = MjdlResult<i32>> + Send;

    /// Join `inputs` end to end, in the given order.
    fn concat(
        &self,
        inputs: &[PathBuf],
        output: &Path,
    ) -> impl Future<Output = MjdlResult<()>> + Send;
}

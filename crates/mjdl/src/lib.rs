pub mod batch;
pub mod context;
pub mod error;
pub mod locate;
pub mod manifest;
pub mod merge;
pub mod reassemble;
pub mod util;

pub use error::*;
pub use util::http::HttpClient;

pub use batch::{Batch, BatchMode, BatchReport, FailurePolicy, Pipeline};
pub use context::RunContext;
pub use manifest::{Manifest, Representation, SegmentRef};
pub use reassemble::{DownloadResult, Reassembler};

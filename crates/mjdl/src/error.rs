use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => f.write_str("video"),
            Self::Audio => f.write_str("audio"),
        }
    }
}

#[derive(Error, Debug)]
pub enum MjdlError {
    #[error("No manifest link found in page {0}")]
    ManifestNotFound(String),

    #[error("Manifest fetch error ({status}): {}", .title.as_deref().unwrap_or("<no title>"))]
    ManifestFetch {
        status: reqwest::StatusCode,
        title: Option<String>,
    },

    #[error("Invalid manifest: {0}")]
    ManifestParse(String),

    #[error("No {0} representation in manifest")]
    EmptyRepresentationSet(TrackKind),

    #[error("Segment fetch error ({status}): {url}")]
    SegmentFetch {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Mux exited with code {0}")]
    MuxFailed(i32),

    #[error("{tool} exited with code {code}")]
    ExternalTool { tool: &'static str, code: i32 },

    #[error("Result file name has no numeric prefix: {0}")]
    InvalidResultName(String),

    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),

    #[error(transparent)]
    RequestError(#[from] reqwest::Error),

    #[error(transparent)]
    MissingExecutable(#[from] which::Error),
}

pub type MjdlResult<T> = Result<T, MjdlError>;

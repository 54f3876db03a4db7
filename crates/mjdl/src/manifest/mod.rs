pub mod select;

use std::sync::LazyLock;

use base64::Engine;
use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Deserializer};

use crate::{
    error::{MjdlError, MjdlResult},
    HttpClient,
};

pub use select::{select_audio, select_video};

static TITLE_REGEXP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<title>(.+?)</title>").unwrap());

#[derive(Debug, Clone, Deserialize)]
struct ManifestDocument {
    #[serde(default)]
    clip_id: Option<String>,
    base_url: String,
    video: Vec<Representation>,
    audio: Vec<Representation>,
}

/// A parsed `master.json`.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub url: Url,
    pub clip_id: Option<String>,
    /// Document `base_url`, already joined onto [Manifest::url].
    pub base_url: Url,
    pub video: Vec<Representation>,
    pub audio: Vec<Representation>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Representation {
    #[serde(default)]
    pub id: Option<String>,
    /// Required for video representations, ignored for audio.
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub bitrate: Option<u64>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub codecs: Option<String>,

    pub base_url: String,
    #[serde(deserialize_with = "deserialize_base64")]
    pub init_segment: Vec<u8>,
    pub segments: Vec<SegmentRef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SegmentRef {
    pub url: String,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
    #[serde(default)]
    pub size: Option<u64>,
}

fn deserialize_base64<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let encoded = String::deserialize(deserializer)?;
    base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(serde::de::Error::custom)
}

impl Manifest {
    pub fn parse(url: Url, body: &str) -> MjdlResult<Self> {
        let deserializer = &mut serde_json::Deserializer::from_str(body);
        let document: ManifestDocument = serde_path_to_error::deserialize(deserializer)
            .map_err(|e| MjdlError::ManifestParse(format!("{}: {}", e.path(), e.inner())))?;

        if let Some(index) = document.video.iter().position(|r| r.height.is_none()) {
            return Err(MjdlError::ManifestParse(format!(
                "video[{index}].height: missing field `height`"
            )));
        }

        let base_url = url.join(&document.base_url)?;
        Ok(Self {
            url,
            clip_id: document.clip_id,
            base_url,
            video: document.video,
            audio: document.audio,
        })
    }

    /// The video representation with the largest height.
    pub fn best_video(&self) -> MjdlResult<&Representation> {
        select_video(&self.video)
    }

    pub fn audio_track(&self) -> MjdlResult<&Representation> {
        select_audio(&self.audio)
    }
}

impl Representation {
    /// Base of this representation's segments, joined onto the manifest base.
    pub fn segment_base(&self, manifest_base: &Url) -> MjdlResult<Url> {
        Ok(manifest_base.join(&self.base_url)?)
    }

    /// Segment paths are plain suffixes of the representation base.
    pub fn segment_url(base: &Url, segment: &SegmentRef) -> MjdlResult<Url> {
        Ok(Url::parse(&format!("{}{}", base.as_str(), segment.url))?)
    }
}

/// Request `manifest_url` once and parse the body.
pub async fn fetch_manifest(client: &HttpClient, manifest_url: &Url) -> MjdlResult<Manifest> {
    let response = client.get(manifest_url.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        let title = response
            .text()
            .await
            .ok()
            .and_then(|body| extract_title(&body));
        tracing::error!(
            "HTTP error ({}): {}",
            status.as_u16(),
            title.as_deref().unwrap_or("<no title>")
        );
        return Err(MjdlError::ManifestFetch { status, title });
    }

    let body = response.text().await?;
    let manifest = Manifest::parse(manifest_url.clone(), &body)?;
    tracing::info!(
        "Manifest {} has {} video and {} audio representation(s).",
        manifest.clip_id.as_deref().unwrap_or(manifest_url.as_str()),
        manifest.video.len(),
        manifest.audio.len()
    );
    Ok(manifest)
}

/// Text of the first `<title>` element, matched case-insensitively.
pub fn extract_title(body: &str) -> Option<String> {
    TITLE_REGEXP
        .captures(body)
        .and_then(|cap| cap.get(1))
        .map(|title| title.as_str().trim().to_string())
}

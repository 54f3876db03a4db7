use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

use crate::{
    error::{MjdlError, MjdlResult},
    HttpClient,
};

/// Conventional file name of the manifest embedded in player pages.
pub const MANIFEST_MARKER: &str = "master.json";

static URL_REGEXP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(http|https)://([\w_-]+(?:(?:\.[\w_-]+)+))([\w.,@?^=%&:/~+#-]*[\w@?^=%&/~+#-])?",
    )
    .unwrap()
});

/// Finds the manifest URL embedded in a player page.
#[derive(Clone)]
pub struct Locator {
    client: HttpClient,
    marker: String,
}

impl Locator {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            marker: MANIFEST_MARKER.to_string(),
        }
    }

    pub fn with_marker<S>(mut self, marker: S) -> Self
    where
        S: Into<String>,
    {
        self.marker = marker.into();
        self
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Fetch `page_url` once and return the first embedded link containing the marker.
    pub async fn locate(&self, page_url: &str) -> MjdlResult<Url> {
        let body = self.client.get(page_url).send().await?.text().await?;
        let found = find_manifest_url(&body, &self.marker)
            .ok_or_else(|| MjdlError::ManifestNotFound(page_url.to_string()))?;
        tracing::debug!("Found manifest {found} in {page_url}");

        Ok(Url::parse(found)?)
    }
}

pub async fn locate(client: &HttpClient, page_url: &str) -> MjdlResult<Url> {
    Locator::new(client.clone()).locate(page_url).await
}

pub fn find_manifest_url<'a>(body: &'a str, marker: &str) -> Option<&'a str> {
    URL_REGEXP
        .find_iter(body)
        .map(|m| m.as_str())
        .find(|url| url.contains(marker))
}

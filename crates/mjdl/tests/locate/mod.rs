use mjdl::{
    locate::{locate, Locator},
    HttpClient, MjdlError,
};
use wiremock::MockServer;

use crate::{mount_page, mount_text, AssertWrapper};

#[tokio::test]
async fn test_locate_manifest_in_page() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_page(&server, "/video/1", "/path/master.json").await;

    let locator = Locator::new(HttpClient::default());
    let url = locator
        .locate(&format!("{}/video/1", server.uri()))
        .await
        .assert_success();
    assert_eq!(
        url.as_str(),
        format!("{}/path/master.json?base64_init=1", server.uri())
    );

    Ok(())
}

#[tokio::test]
async fn test_locate_exact_url() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let page = r#"<div data-a="https://x.test/path/other.json"></div>
        <script>const u = 'https://x.test/path/master.json?x=1';</script>
        <img src="https://img.x.test/thumb.jpg">"#;
    mount_text(&server, "/page", page.to_string()).await;

    let url = locate(&HttpClient::default(), &format!("{}/page", server.uri())).await?;
    assert_eq!(url.as_str(), "https://x.test/path/master.json?x=1");

    Ok(())
}

#[tokio::test]
async fn test_locate_not_found() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_text(
        &server,
        "/page",
        "<html><a href=\"https://x.test/index.html\">nothing here</a></html>".to_string(),
    )
    .await;

    let page_url = format!("{}/page", server.uri());
    let locator = Locator::new(HttpClient::default());
    let err = locator.locate(&page_url).await.unwrap_err();
    assert!(matches!(err, MjdlError::ManifestNotFound(url) if url == page_url));

    Ok(())
}

#[tokio::test]
async fn test_locate_custom_marker() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_page(&server, "/video/1", "/path/playlist.json").await;

    let locator = Locator::new(HttpClient::default()).with_marker("playlist.json");
    assert_eq!(locator.marker(), "playlist.json");
    let url = locator.locate(&format!("{}/video/1", server.uri())).await?;
    assert!(url.path().ends_with("/path/playlist.json"));

    Ok(())
}

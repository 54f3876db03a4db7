use std::{num::NonZeroU32, time::Duration};

use mjdl::{manifest::Representation, HttpClient, Reassembler};
use reqwest::{StatusCode, Url};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::{mount_bytes, mount_track, TestTrack};

fn track() -> TestTrack {
    TestTrack {
        height: Some(720),
        base_url: "video/",
        init: b"\x00\x00\x00\x18ftypdash",
        segments: vec![
            ("seg1.m4s", b"first-segment".to_vec()),
            ("seg2.m4s", vec![0xAB; 4096]),
            ("seg3.m4s", b"third".to_vec()),
            ("seg4.m4s", b"fourth".to_vec()),
        ],
    }
}

fn representation(track: &TestTrack) -> anyhow::Result<Representation> {
    Ok(serde_json::from_value(track.to_json())?)
}

fn manifest_base(server: &MockServer) -> anyhow::Result<Url> {
    Ok(format!("{}/m/", server.uri()).parse()?)
}

#[tokio::test]
async fn test_reassemble_all_segments() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let track = track();
    mount_track(&server, "/m/video/", &track).await;

    let dir = tempfile::tempdir()?;
    let output = dir.path().join("v.mp4");
    let result = Reassembler::new(HttpClient::default())
        .reassemble(&representation(&track)?, &manifest_base(&server)?, &output)
        .await?;

    assert!(result.success);
    assert_eq!(result.failure, None);
    assert_eq!(result.segments_written, 4);
    assert_eq!(result.bytes_written, track.expected(4).len() as u64);
    assert_eq!(tokio::fs::read(&output).await?, track.expected(4));

    Ok(())
}

#[tokio::test]
async fn test_reassemble_stops_at_first_failure() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let track = track();
    mount_bytes(&server, "/m/video/seg1.m4s", track.segments[0].1.clone()).await;
    mount_bytes(&server, "/m/video/seg2.m4s", track.segments[1].1.clone()).await;
    Mock::given(method("GET"))
        .and(path("/m/video/seg3.m4s"))
        .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/m/video/seg4.m4s"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fourth".to_vec()))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    let output = dir.path().join("v.mp4");
    let result = Reassembler::new(HttpClient::default())
        .reassemble(&representation(&track)?, &manifest_base(&server)?, &output)
        .await?;

    assert!(!result.success);
    assert_eq!(result.segments_written, 2);
    let failure = result.failure.clone().unwrap();
    assert_eq!(failure.index, 2);
    assert_eq!(failure.status, StatusCode::NOT_FOUND);
    assert_eq!(failure.url, format!("{}/m/video/seg3.m4s", server.uri()));

    // init and the two segments before the failure stay on disk
    assert_eq!(tokio::fs::read(&output).await?, track.expected(2));

    let err = result.into_result().unwrap_err();
    assert!(matches!(err, mjdl::MjdlError::SegmentFetch { status, .. } if status == StatusCode::NOT_FOUND));

    Ok(())
}

#[tokio::test]
async fn test_reassemble_first_segment_failure_keeps_init() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let track = track();
    Mock::given(method("GET"))
        .and(path("/m/video/seg1.m4s"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    let output = dir.path().join("v.mp4");
    let result = Reassembler::new(HttpClient::default())
        .reassemble(&representation(&track)?, &manifest_base(&server)?, &output)
        .await?;

    assert!(!result.success);
    assert_eq!(result.failure.map(|f| f.index), Some(0));
    assert_eq!(tokio::fs::read(&output).await?, track.init);

    Ok(())
}

#[tokio::test]
async fn test_reassemble_without_segments() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let track = TestTrack {
        height: None,
        base_url: "audio/",
        init: b"init-only",
        segments: Vec::new(),
    };

    let dir = tempfile::tempdir()?;
    let output = dir.path().join("a.mp3");
    let result = Reassembler::new(HttpClient::default())
        .reassemble(&representation(&track)?, &manifest_base(&server)?, &output)
        .await?;

    assert!(result.success);
    assert_eq!(result.segments_written, 0);
    assert_eq!(tokio::fs::read(&output).await?, b"init-only");

    Ok(())
}

#[tokio::test]
async fn test_reassemble_truncates_existing_file() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let track = track();
    mount_track(&server, "/m/video/", &track).await;

    let dir = tempfile::tempdir()?;
    let output = dir.path().join("v.mp4");
    tokio::fs::write(&output, vec![0xFF; 100_000]).await?;

    Reassembler::new(HttpClient::default())
        .reassemble(&representation(&track)?, &manifest_base(&server)?, &output)
        .await?;
    assert_eq!(tokio::fs::read(&output).await?, track.expected(4));

    Ok(())
}

#[tokio::test]
async fn test_reassemble_concurrent_keeps_manifest_order() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let track = track();
    // earlier segments answer later
    for (i, (url, body)) in track.segments.iter().enumerate() {
        let delay = Duration::from_millis(50 * (track.segments.len() - i) as u64);
        Mock::given(method("GET"))
            .and(path(format!("/m/video/{url}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(body.clone())
                    .set_delay(delay),
            )
            .mount(&server)
            .await;
    }

    let dir = tempfile::tempdir()?;
    let output = dir.path().join("v.mp4");
    let result = Reassembler::new(HttpClient::default())
        .with_concurrency(NonZeroU32::new(4).unwrap())
        .reassemble(&representation(&track)?, &manifest_base(&server)?, &output)
        .await?;

    assert!(result.success);
    assert_eq!(tokio::fs::read(&output).await?, track.expected(4));

    Ok(())
}

#[tokio::test]
async fn test_reassemble_concurrent_failure_commits_prefix_only() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let track = track();
    mount_bytes(&server, "/m/video/seg1.m4s", track.segments[0].1.clone()).await;
    Mock::given(method("GET"))
        .and(path("/m/video/seg2.m4s"))
        .respond_with(ResponseTemplate::new(403).set_delay(Duration::from_millis(100)))
        .mount(&server)
        .await;
    mount_bytes(&server, "/m/video/seg3.m4s", track.segments[2].1.clone()).await;
    mount_bytes(&server, "/m/video/seg4.m4s", track.segments[3].1.clone()).await;

    let dir = tempfile::tempdir()?;
    let output = dir.path().join("v.mp4");
    let result = Reassembler::new(HttpClient::default())
        .with_concurrency(NonZeroU32::new(3).unwrap())
        .reassemble(&representation(&track)?, &manifest_base(&server)?, &output)
        .await?;

    assert!(!result.success);
    assert_eq!(result.failure.map(|f| f.index), Some(1));
    assert_eq!(tokio::fs::read(&output).await?, track.expected(1));

    Ok(())
}

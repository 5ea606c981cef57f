#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use common::{rapid_cmd, serve_assets};
use predicates::prelude::*;
use serde_json::Value;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const POST: &str = r#"<html><body>
    <img src="/a.png">
    <script src="/app.js"></script>
</body></html>"#;

async fn site() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/post"))
        .respond_with(ResponseTemplate::new(200).set_body_string(POST))
        .expect(1)
        .mount(&server)
        .await;
    serve_assets(&server).await;
    server
}

#[tokio::test]
async fn warm_fetches_once_and_persists() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let server = site().await;
    let url = format!("{}/post", server.uri());

    rapid_cmd(tmp.path())
        .args(["warm", &url])
        .assert()
        .success()
        .stdout(predicate::str::contains("(3 assets, 3 preloaded)"));

    // second run is served from the store and the restored registry
    rapid_cmd(tmp.path())
        .args(["warm", &url])
        .assert()
        .success()
        .stdout(predicate::str::contains("(3 assets, 0 preloaded)"));

    let out = rapid_cmd(tmp.path())
        .args(["status", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let status: Value = serde_json::from_slice(&out)?;
    let pages = status["pages"].as_array().cloned().unwrap_or_default();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0]["url"], url.as_str());
    assert_eq!(pages[0]["assets"], 3);
    assert_eq!(pages[0]["fresh"], true);
    assert_eq!(status["snapshot"]["preloaded"].as_array().map(Vec::len), Some(3));
    assert_eq!(status["snapshot"]["state"][url.as_str()], "cached");
    Ok(())
}

#[tokio::test]
async fn warm_ephemeral_leaves_no_store() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let server = site().await;

    rapid_cmd(tmp.path())
        .args(["--ephemeral", "warm", &format!("{}/post", server.uri())])
        .assert()
        .success();

    assert!(!tmp.path().join("store").exists());
    Ok(())
}

#[tokio::test]
async fn warm_reports_missing_page() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    rapid_cmd(tmp.path())
        .args(["warm", &format!("{}/gone", server.uri())])
        .assert()
        .success()
        .stdout(predicate::str::contains("(no assets found)"));
    Ok(())
}

#[test]
fn warm_rejects_relative_url_without_origin() {
    let tmp = tempdir().unwrap();
    rapid_cmd(tmp.path())
        .args(["warm", "/post"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not an absolute URL"));
}

#[tokio::test]
async fn warm_relative_url_with_origin() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let server = site().await;

    rapid_cmd(tmp.path())
        .args(["warm", "/post", "/post", "--origin", &server.uri()])
        .assert()
        .success()
        .stdout(predicate::str::contains("(3 assets, 3 preloaded)"))
        .stdout(predicate::str::contains("already warmed moments ago"));
    Ok(())
}

#[tokio::test]
async fn warm_ignores_foreign_links() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let server = MockServer::start().await;

    rapid_cmd(tmp.path())
        .args([
            "warm",
            "https://other.invalid/post",
            "--origin",
            &server.uri(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("is not a page on"));
    Ok(())
}

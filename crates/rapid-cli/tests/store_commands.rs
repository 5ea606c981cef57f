#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use common::{rapid_cmd, serve_assets};
use predicates::prelude::*;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn status_on_empty_store() {
    let tmp = tempdir().unwrap();
    rapid_cmd(tmp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Snapshot: none"))
        .stdout(predicate::str::contains("No cached pages"));
}

#[test]
fn status_json_on_empty_store() {
    let tmp = tempdir().unwrap();
    let out = rapid_cmd(tmp.path())
        .args(["status", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert!(value["snapshot"].is_null());
    assert_eq!(value["pages"].as_array().map(Vec::len), Some(0));
}

#[test]
fn sweep_on_empty_store() {
    let tmp = tempdir().unwrap();
    rapid_cmd(tmp.path())
        .arg("sweep")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 0 expired entries"));
}

#[tokio::test]
async fn sweep_removes_expired_entries() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/post"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"<img src="/a.gif">"#))
        .mount(&server)
        .await;
    serve_assets(&server).await;

    rapid_cmd(tmp.path())
        .args(["warm", &format!("{}/post", server.uri())])
        .assert()
        .success();

    // a zero TTL makes every entry stale
    let config = tmp.path().join("config.toml");
    std::fs::write(&config, "[cache]\nttl_hours = 0\n")?;
    rapid_cmd(tmp.path())
        .arg("sweep")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 1 expired entries"));
    Ok(())
}

#[tokio::test]
async fn clear_wipes_store() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/post"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"<img src="/a.gif">"#))
        .mount(&server)
        .await;
    serve_assets(&server).await;

    rapid_cmd(tmp.path())
        .args(["warm", &format!("{}/post", server.uri())])
        .assert()
        .success();

    rapid_cmd(tmp.path())
        .arg("clear")
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled"));

    rapid_cmd(tmp.path())
        .arg("clear")
        .write_stdin("y\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared 1 cached pages"));

    rapid_cmd(tmp.path())
        .args(["clear", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already empty"));

    rapid_cmd(tmp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No cached pages"));
    Ok(())
}

#[test]
fn invalid_config_is_reported() {
    let tmp = tempdir().unwrap();
    std::fs::write(tmp.path().join("config.toml"), "[cache]\nttl_hours = \"soon\"\n").unwrap();
    rapid_cmd(tmp.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn data_dir_flag_overrides_environment() {
    let tmp = tempdir().unwrap();
    let custom = tmp.path().join("custom");
    rapid_cmd(tmp.path())
        .args(["status", "--json", "--data-dir"])
        .arg(&custom)
        .assert()
        .success()
        .stdout(predicate::str::contains("custom"));
}

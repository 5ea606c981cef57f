#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::Path;
use std::time::Duration;

use assert_cmd::Command;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[allow(dead_code)]
pub const CMD_TIMEOUT: Duration = Duration::from_secs(15);

/// A `rapid-preload` command bound to `data_dir`, colors off, no user config.
#[allow(dead_code)]
pub fn rapid_cmd(data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("rapid-preload"));
    cmd.timeout(CMD_TIMEOUT);
    cmd.env("RAPID_PRELOAD_DATA_DIR", data_dir.join("store"));
    cmd.env("RAPID_PRELOAD_CONFIG", data_dir.join("config.toml"));
    cmd.env("NO_COLOR", "1");
    cmd
}

/// Answer every GET not matched by a more specific mock with an empty 200.
#[allow(dead_code)]
pub async fn serve_assets(server: &MockServer) {
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .with_priority(u8::MAX)
        .mount(server)
        .await;
}

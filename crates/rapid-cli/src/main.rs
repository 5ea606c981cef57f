//! rapid-preload CLI - predictive page-asset warming
//!
//! Thin entry point; everything lives in the library so it can be tested.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rapid_cli::run().await
}

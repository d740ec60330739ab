use anyhow::Result;
use draftly::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    confab::logging::init();
    confab::run().await
}

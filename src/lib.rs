pub mod config;
pub mod error;
pub mod input;
pub mod logging;
pub mod model;
pub mod providers;
pub mod stream;

use std::env;
use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::info;

use config::Config;

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;
    info!(
        provider = cfg.provider.as_str(),
        model = %cfg.model,
        base_url = %cfg.base_url,
        stream = cfg.stream,
        timeout_secs = cfg.timeout_secs,
        "loaded runtime configuration"
    );

    let args: Vec<String> = env::args().skip(1).collect();
    let parsed = input::parse_args(&args)?;
    let streaming = cfg.stream || parsed.stream;
    let prompt = input::assemble_prompt(&parsed, &cfg)?;

    let client = Client::builder()
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .build()
        .context("Failed to initialize HTTP client")?;

    if streaming {
        let mut chunks = model::chat_stream(&client, &cfg, &prompt).await?;
        let mut stdout = std::io::stdout();
        while let Some(chunk) = chunks.next_chunk().await? {
            write!(stdout, "{chunk}").context("Failed to write to stdout")?;
            stdout.flush().context("Failed to flush stdout")?;
        }
        writeln!(stdout).context("Failed to write to stdout")?;
    } else {
        let answer = model::chat(&client, &cfg, &prompt).await?;
        println!("{}", answer.trim());
    }

    Ok(())
}

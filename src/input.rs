//! CLI argument parsing and prompt assembly. Input priority: file, then
//! inline prompt words, then piped stdin.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::config::Config;
use crate::error::ChatError;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PromptArgs {
    pub stream: bool,
    pub file: Option<PathBuf>,
    pub inline: Option<String>,
}

pub fn parse_args(args: &[String]) -> Result<PromptArgs> {
    let mut parsed = PromptArgs::default();
    let mut words: Vec<&str> = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--stream" | "-s" => parsed.stream = true,
            "--file" | "-f" => {
                let path = iter
                    .next()
                    .with_context(|| format!("'{arg}' requires a file path"))?;
                parsed.file = Some(PathBuf::from(path));
            }
            other if other.starts_with('-') => bail!("unknown flag '{other}'"),
            other => words.push(other),
        }
    }

    if !words.is_empty() {
        parsed.inline = Some(words.join(" "));
    }
    Ok(parsed)
}

/// Assembles the final prompt: picks the input source, trims it, rejects an
/// empty result, and prepends the configured pre-prompt.
pub fn assemble_prompt(args: &PromptArgs, cfg: &Config) -> Result<String> {
    let raw = if let Some(path) = &args.file {
        read_file(path, cfg.max_file_bytes)?
    } else if let Some(inline) = &args.inline {
        inline.clone()
    } else {
        read_stdin()?
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ChatError::EmptyInput.into());
    }
    debug!(prompt_len = trimmed.len(), "assembled prompt");

    match &cfg.pre_prompt {
        Some(pre) => Ok(format!("{pre}\n\n{trimmed}")),
        None => Ok(trimmed.to_string()),
    }
}

fn read_file(path: &Path, max_bytes: u64) -> Result<String> {
    let metadata = fs::metadata(path)
        .with_context(|| format!("cannot access file '{}'", path.display()))?;
    if metadata.len() > max_bytes {
        bail!(
            "file size ({} bytes) exceeds the configured maximum ({} bytes)",
            metadata.len(),
            max_bytes
        );
    }

    fs::read_to_string(path).with_context(|| format!("cannot read file '{}'", path.display()))
}

fn read_stdin() -> Result<String> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("failed to read prompt from stdin")?;
    Ok(input)
}

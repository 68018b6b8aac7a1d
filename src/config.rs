use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::warn;

use crate::providers::Provider;

const DEFAULT_PROVIDER: &str = "openrouter";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

const SETTINGS_DIR: &str = "confab";
const SETTINGS_FILE: &str = "config.json";

/// Everything one invocation needs, resolved up front and then threaded into
/// the request builder and response interpreter. Precedence:
/// environment > settings file > built-in default.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: Provider,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub pre_prompt: Option<String>,
    pub stream: bool,
    pub timeout_secs: u64,
    pub max_file_bytes: u64,
}

/// Optional on-disk settings: defaults and model aliases, kept at
/// `<config_dir>/confab/config.json`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default_provider: Option<String>,
    pub default_model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_file_bytes: Option<u64>,
    pub models: HashMap<String, String>,
}

impl Settings {
    /// Loads settings, treating a missing file as empty settings and an
    /// unreadable one as a warning rather than a startup failure.
    pub fn load() -> Self {
        let Some(path) = settings_path() else {
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring unreadable settings file");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("failed to parse settings file '{}'", path.display()))
    }

    /// Resolves a model alias to its full name; unknown names pass through.
    pub fn resolve_model(&self, name: &str) -> String {
        self.models
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}

fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(SETTINGS_DIR).join(SETTINGS_FILE))
}

impl Config {
    pub fn load() -> Result<Self> {
        let settings = Settings::load();
        Self::resolve(&settings, |key| env::var(key).ok())
    }

    fn resolve(
        settings: &Settings,
        mut get_var: impl FnMut(&str) -> Option<String>,
    ) -> Result<Self> {
        let provider_name = get_var("MODEL_PROVIDER")
            .or_else(|| settings.default_provider.clone())
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string());
        let Some(provider) = Provider::parse(&provider_name) else {
            bail!(
                "Unsupported MODEL_PROVIDER='{}'. Supported providers: openrouter, ollama, lmstudio.",
                provider_name.trim()
            );
        };

        let requested_model = get_var("MODEL")
            .or_else(|| settings.default_model.clone())
            .unwrap_or_else(|| provider.default_model().to_string());
        let model = settings.resolve_model(&requested_model);

        let base_url = get_var("MODEL_BASE_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| provider.default_base_url().to_string());

        let api_key = get_var("MODEL_API_KEY")
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        if provider.requires_api_key() && api_key.is_none() {
            bail!(
                "MODEL_API_KEY is required for provider '{}'",
                provider.as_str()
            );
        }

        Ok(Self {
            provider,
            model,
            base_url,
            api_key,
            pre_prompt: get_var("PRE_PROMPT").filter(|pre| !pre.trim().is_empty()),
            stream: parse_bool(get_var("STREAM").as_deref(), false),
            timeout_secs: parse_positive_u64(
                get_var("MODEL_TIMEOUT_SECS").as_deref(),
                settings.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            max_file_bytes: parse_positive_u64(
                get_var("MAX_FILE_BYTES").as_deref(),
                settings.max_file_bytes.unwrap_or(DEFAULT_MAX_FILE_BYTES),
            ),
        })
    }
}

fn parse_positive_u64(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

pub(crate) fn parse_bool(raw: Option<&str>, default: bool) -> bool {
    match raw.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

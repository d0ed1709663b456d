use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::feedback::orchestrator::{DEFAULT_CALL_TIMEOUT, DEFAULT_MAX_PARALLEL};
use crate::llm_client::{LlmSettings, DEFAULT_ENDPOINT};

/// Which `LlmGateway` implementation to wire at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmMode {
    OpenAi,
    Fake,
}

impl FromStr for LlmMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(LlmMode::OpenAi),
            "fake" => Ok(LlmMode::Fake),
            other => bail!("LLM_MODE must be 'openai' or 'fake', got '{other}'"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Startup fails if a value is malformed or a required key is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub llm_mode: LlmMode,
    pub llm: LlmSettings,
    /// Global rewrite worker-pool width, shared by all requests.
    pub rewrite_max_parallel: usize,
    /// Bound on one whole gateway call (retries included).
    pub rewrite_call_timeout: Duration,
    /// When set, the simulation webhook requires a matching `X-Sim-Secret` header.
    pub sim_shared_secret: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup (the process env in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let llm_mode: LlmMode = get("LLM_MODE")
            .unwrap_or_else(|| "openai".to_string())
            .parse()?;

        let api_key = match (llm_mode, get("LLM_API_KEY")) {
            (_, Some(key)) => key,
            (LlmMode::Fake, None) => String::new(),
            (LlmMode::OpenAi, None) => {
                bail!("Required environment variable 'LLM_API_KEY' is not set (LLM_MODE=openai)")
            }
        };

        let rewrite_max_parallel: usize = parse_or(&get, "REWRITE_MAX_PARALLEL", DEFAULT_MAX_PARALLEL)?;
        if rewrite_max_parallel == 0 {
            bail!("REWRITE_MAX_PARALLEL must be at least 1");
        }

        Ok(Config {
            port: parse_or(&get, "PORT", 8080)?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            llm_mode,
            llm: LlmSettings {
                endpoint: get("LLM_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
                api_key,
                model: get("LLM_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
                temperature: parse_or(&get, "LLM_TEMPERATURE", 0.2)?,
                max_tokens: parse_or(&get, "LLM_MAX_TOKENS", 300)?,
                request_timeout: Duration::from_millis(parse_or(&get, "LLM_TIMEOUT_MS", 6_000)?),
            },
            rewrite_max_parallel,
            rewrite_call_timeout: Duration::from_millis(parse_or(
                &get,
                "REWRITE_CALL_TIMEOUT_MS",
                DEFAULT_CALL_TIMEOUT.as_millis() as u64,
            )?),
            sim_shared_secret: get("SIM_SHARED_SECRET"),
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

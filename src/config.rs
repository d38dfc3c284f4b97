use crate::session::DEFAULT_MAX_SESSIONS;
use anyhow::{Context, Result};
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Service configuration, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub bind_addr: String,
    pub request_timeout: Duration,
    pub max_upload_bytes: usize,
    pub max_sessions: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("GEMINI_API_KEY").unwrap_or_default();
        if api_key.is_empty() {
            tracing::warn!("GEMINI_API_KEY is not set; AI requests will be unauthenticated");
        }

        let timeout_secs = match lookup("GEMINI_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("GEMINI_TIMEOUT_SECS must be a whole number, got {:?}", raw))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("MAX_UPLOAD_BYTES must be a whole number, got {:?}", raw))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let max_sessions = match lookup("MAX_SESSIONS") {
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("MAX_SESSIONS must be a whole number, got {:?}", raw))?,
            None => DEFAULT_MAX_SESSIONS,
        };

        Ok(Config {
            api_key,
            api_base: lookup("GEMINI_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            bind_addr: lookup("BOOK_ASSISTANT_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string()),
            request_timeout: Duration::from_secs(timeout_secs),
            max_upload_bytes,
            max_sessions,
        })
    }

    /// The `generateContent` URL for the configured model.
    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

//! Process configuration, read once from the environment at startup.

use crate::decoder::gemini::{GeminiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use anyhow::{Context, Result};
use std::net::{IpAddr, SocketAddr};
use tracing::warn;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024; // 20MB

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub max_upload_bytes: usize,
    pub gemini: GeminiConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source (the process env in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let ip: IpAddr = host
            .trim()
            .parse()
            .with_context(|| format!("Invalid HOST: {:?}", host))?;
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("Invalid PORT: {:?}", raw))?,
            None => DEFAULT_PORT,
        };
        let bind_addr = SocketAddr::new(ip, port);

        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("Invalid MAX_UPLOAD_BYTES: {:?}", raw))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let gemini = GeminiConfig {
            base_url: lookup("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            ..GeminiConfig::new(lookup("API_KEY"))
        };

        if gemini.api_key().is_none() {
            warn!("API_KEY is not set; remote fallback decoding is disabled");
        }

        Ok(Self {
            bind_addr,
            max_upload_bytes,
            gemini,
        })
    }
}

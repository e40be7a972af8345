//! Service configuration.
//!
//! Everything comes from the environment (a `.env` file is loaded first by `main`).

use anyhow::{Context, Result};
use std::collections::HashMap;

pub const DEFAULT_MAX_FILE_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.70;
pub const DEFAULT_MAX_FALLBACK_ATTEMPTS: usize = 2;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

pub const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp"];
pub const ALLOWED_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp"];

/// How the scanner retries across OCR engines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackPolicy {
    pub enabled: bool,
    /// Always at least 1.
    pub max_attempts: usize,
    pub confidence_threshold: f64,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: DEFAULT_MAX_FALLBACK_ATTEMPTS,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub worker_url: String,
    pub internal_key: String,
    pub fallback: FallbackPolicy,
    pub max_file_bytes: usize,
    pub bind_addr: String,
}

impl ScanConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(&std::env::vars().collect())
    }

    /// Load from an explicit variable map.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let worker_url = get("OCR_WORKER_URL")
            .context("OCR_WORKER_URL must be configured")?
            .to_string();
        let internal_key = get("X_INTERNAL_KEY")
            .context("X_INTERNAL_KEY must be configured")?
            .to_string();

        let enabled = match get("ENABLE_FALLBACK_OCR") {
            Some(v) => parse_bool(v)
                .with_context(|| format!("ENABLE_FALLBACK_OCR is not a boolean: {:?}", v))?,
            None => false,
        };
        let max_attempts = match get("MAX_FALLBACK_ATTEMPTS") {
            Some(v) => v
                .parse::<usize>()
                .with_context(|| format!("MAX_FALLBACK_ATTEMPTS is not a count: {:?}", v))?,
            None => DEFAULT_MAX_FALLBACK_ATTEMPTS,
        };
        let confidence_threshold = match get("OCR_CONFIDENCE_WARN_THRESHOLD") {
            Some(v) => v
                .parse::<f64>()
                .with_context(|| format!("OCR_CONFIDENCE_WARN_THRESHOLD is not a number: {:?}", v))?,
            None => DEFAULT_CONFIDENCE_THRESHOLD,
        };
        if !(0.0..=1.0).contains(&confidence_threshold) {
            anyhow::bail!(
                "OCR_CONFIDENCE_WARN_THRESHOLD must be within [0, 1], got {}",
                confidence_threshold
            );
        }

        let max_file_bytes = match get("SCAN_MAX_FILE_BYTES") {
            Some(v) => v
                .parse::<usize>()
                .with_context(|| format!("SCAN_MAX_FILE_BYTES is not a size: {:?}", v))?,
            None => DEFAULT_MAX_FILE_BYTES,
        };
        if max_file_bytes == 0 {
            anyhow::bail!("SCAN_MAX_FILE_BYTES must be at least 1");
        }

        Ok(Self {
            worker_url,
            internal_key,
            fallback: FallbackPolicy {
                enabled,
                max_attempts: max_attempts.max(1),
                confidence_threshold,
            },
            max_file_bytes,
            bind_addr: get("BIND_ADDR").unwrap_or(DEFAULT_BIND_ADDR).to_string(),
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

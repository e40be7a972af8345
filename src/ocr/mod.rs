//! OCR collaborator contract.
//!
//! The scanner only sees [`OcrClient`]: image bytes plus an optional engine
//! hint in, recognized lines with a confidence out. [`worker::WorkerClient`]
//! is the HTTP implementation backed by the OCR worker service.

pub mod worker;

use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// One recognized text line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrLine {
    pub text: String,
    #[serde(default)]
    pub confidence: f64,
}

/// Worker response for one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrResult {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub lines: Vec<OcrLine>,
    #[serde(default)]
    pub processing_time_ms: u64,
    #[serde(default)]
    pub raw_text: Option<String>,
}

/// Uploaded image as received from the client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Engines the worker can be asked to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OcrEngine {
    Paddle,
    Vision,
}

impl OcrEngine {
    /// Order in which engines are tried when fallback is enabled.
    pub const FALLBACK_ORDER: [OcrEngine; 2] = [OcrEngine::Paddle, OcrEngine::Vision];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paddle => "paddle",
            Self::Vision => "vision",
        }
    }
}

/// Async trait implemented by each OCR backend.
#[async_trait::async_trait]
pub trait OcrClient: Send + Sync {
    /// Recognize `image`. `engine` of `None` lets the worker choose.
    async fn scan(
        &self,
        image: &ImageUpload,
        request_id: &str,
        engine: Option<OcrEngine>,
    ) -> Result<OcrResult, ScanError>;
}

//! OCR worker client (HTTP multipart to the worker's `/ocr` endpoint).

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use tracing::{debug, warn};

use super::{ImageUpload, OcrClient, OcrEngine, OcrResult};
use crate::error::ScanError;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const READ_TIMEOUT: Duration = Duration::from_secs(20);

const INTERNAL_KEY_HEADER: &str = "X-INTERNAL-KEY";
const ENGINE_HEADER: &str = "X-OCR-ENGINE";
const REQUEST_ID_HEADER: &str = "X-Request-Id";

pub struct WorkerClient {
    endpoint: String,
    internal_key: String,
    client: reqwest::Client,
}

impl WorkerClient {
    pub fn new(worker_url: &str, internal_key: impl Into<String>) -> anyhow::Result<Self> {
        Self::with_timeouts(worker_url, internal_key, CONNECT_TIMEOUT, READ_TIMEOUT)
    }

    pub fn with_timeouts(
        worker_url: &str,
        internal_key: impl Into<String>,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .build()?;
        Ok(Self {
            endpoint: ocr_endpoint(worker_url),
            internal_key: internal_key.into(),
            client,
        })
    }
}

#[async_trait::async_trait]
impl OcrClient for WorkerClient {
    async fn scan(
        &self,
        image: &ImageUpload,
        request_id: &str,
        engine: Option<OcrEngine>,
    ) -> Result<OcrResult, ScanError> {
        let content_type = image
            .content_type
            .as_deref()
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or("application/octet-stream");

        let part = Part::bytes(image.data.clone())
            .file_name(image.filename.clone())
            .mime_str(content_type)
            .map_err(|e| ScanError::InvalidImage(format!("Invalid content type: {}", e)))?;
        let form = Form::new().part("image", part);

        let mut request = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(INTERNAL_KEY_HEADER, &self.internal_key)
            .header(REQUEST_ID_HEADER, request_id)
            .multipart(form);
        if let Some(engine) = engine {
            request = request.header(ENGINE_HEADER, engine.as_str());
        }

        debug!(
            "WorkerClient: requestId={} engine={:?} sending {} bytes",
            request_id,
            engine.map(OcrEngine::as_str),
            image.data.len()
        );

        let response = request.send().await.map_err(|e| {
            warn!("OCR request error requestId={}: {}", request_id, e);
            classify_transport_error(&e)
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("OCR request failed requestId={} status={}", request_id, status);
            return Err(ScanError::OcrFailed(format!("worker returned {}: {}", status, body)));
        }

        let result: OcrResult = response.json().await.map_err(|e| {
            warn!("OCR response unreadable requestId={}: {}", request_id, e);
            classify_transport_error(&e)
        })?;

        debug!(
            "WorkerClient: requestId={} engine={:?} confidence={:.2} lines={} in {}ms",
            request_id,
            result.engine,
            result.confidence,
            result.lines.len(),
            result.processing_time_ms
        );
        Ok(result)
    }
}

fn ocr_endpoint(worker_url: &str) -> String {
    format!("{}/ocr", worker_url.trim_end_matches('/'))
}

fn classify_transport_error(err: &reqwest::Error) -> ScanError {
    if err.is_timeout() {
        ScanError::OcrTimeout
    } else if err.is_connect() {
        ScanError::OcrUnavailable(err.to_string())
    } else {
        ScanError::OcrFailed(err.to_string())
    }
}

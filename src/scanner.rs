//! Scan pipeline orchestrator: OCR attempts, parsing, scoring and validation.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::FallbackPolicy;
use crate::confidence;
use crate::error::ScanError;
use crate::ocr::{ImageUpload, OcrClient, OcrEngine, OcrResult};
use crate::parser;
use crate::schema::{LicenseFields, ScanResponse};
use crate::validation;

/// Runs one scan request against the OCR collaborator.
#[derive(Clone)]
pub struct Scanner {
    client: Arc<dyn OcrClient>,
    policy: FallbackPolicy,
}

/// Outcome of one successful OCR attempt.
struct Attempt {
    ocr: OcrResult,
    fields: LicenseFields,
    selected_engine: Option<String>,
}

impl Scanner {
    pub fn new(client: Arc<dyn OcrClient>, policy: FallbackPolicy) -> Self {
        Self { client, policy }
    }

    pub async fn scan(&self, image: &ImageUpload, request_id: &str) -> Result<ScanResponse, ScanError> {
        info!(
            "Scan started requestId={} file={} ({} bytes) fallback={}",
            request_id,
            image.filename,
            image.data.len(),
            self.policy.enabled
        );
        if self.policy.enabled {
            self.scan_with_fallback(image, request_id).await
        } else {
            self.scan_once(image, request_id).await
        }
    }

    async fn scan_once(&self, image: &ImageUpload, request_id: &str) -> Result<ScanResponse, ScanError> {
        let ocr = self.client.scan(image, request_id, None).await?;
        let fields = parser::parse(&ocr.lines);
        let attempted: Vec<String> = ocr.engine.iter().cloned().collect();
        let selected_engine = ocr.engine.clone();
        Ok(self.assemble(
            request_id,
            Attempt {
                ocr,
                fields,
                selected_engine,
            },
            attempted,
        ))
    }

    /// Try engines in order until one is confident and complete, the attempt
    /// budget is spent, or the engines run out. The last successful attempt
    /// is returned even when it stays below the threshold.
    async fn scan_with_fallback(
        &self,
        image: &ImageUpload,
        request_id: &str,
    ) -> Result<ScanResponse, ScanError> {
        let mut attempted: Vec<String> = Vec::new();
        let mut last_success: Option<Attempt> = None;
        let mut last_error: Option<ScanError> = None;

        for engine in OcrEngine::FALLBACK_ORDER {
            if attempted.len() >= self.policy.max_attempts {
                break;
            }
            attempted.push(engine.as_str().to_string());

            match self.client.scan(image, request_id, Some(engine)).await {
                Ok(ocr) => {
                    let fields = parser::parse(&ocr.lines);
                    let score = confidence::compute(Some(&fields));
                    let missing = confidence::has_missing_required(Some(&fields));
                    info!(
                        "OCR attempt requestId={} engine={} ocrConfidence={:.2} fieldConfidence={:.2} missingRequired={}",
                        request_id,
                        engine.as_str(),
                        ocr.confidence,
                        score,
                        missing
                    );
                    let selected_engine = ocr
                        .engine
                        .clone()
                        .or_else(|| Some(engine.as_str().to_string()));
                    last_success = Some(Attempt {
                        ocr,
                        fields,
                        selected_engine,
                    });
                    if !self.should_fall_back(score, missing) {
                        break;
                    }
                }
                Err(err) => {
                    warn!(
                        "OCR attempt failed requestId={} engine={}: {}",
                        request_id,
                        engine.as_str(),
                        err
                    );
                    last_error = Some(err);
                }
            }
        }

        match (last_success, last_error) {
            (Some(attempt), _) => Ok(self.assemble(request_id, attempt, attempted)),
            (None, Some(err)) => Err(err),
            (None, None) => Err(ScanError::OcrFailed("no OCR attempt was made".to_string())),
        }
    }

    fn should_fall_back(&self, score: f64, missing_required: bool) -> bool {
        score < self.policy.confidence_threshold || missing_required
    }

    fn assemble(&self, request_id: &str, attempt: Attempt, attempted_engines: Vec<String>) -> ScanResponse {
        let validation = validation::validate(&attempt.fields);
        debug!(
            "Assembled requestId={} engine={:?} blockingErrors={} warnings={}",
            request_id,
            attempt.selected_engine,
            validation.blocking_errors.len(),
            validation.warnings.len()
        );
        ScanResponse {
            request_id: request_id.to_string(),
            selected_engine: attempt.selected_engine,
            attempted_engines,
            ocr_confidence: attempt.ocr.confidence,
            confidence_threshold: self.policy.confidence_threshold,
            processing_time_ms: attempt.ocr.processing_time_ms,
            fields: attempt.fields,
            validation,
        }
    }
}

//! Licence Scanner - UK driving licence field extraction server.

mod confidence;
mod config;
mod error;
mod ocr;
mod parser;
mod scanner;
mod schema;
mod validation;

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use config::{ScanConfig, ALLOWED_CONTENT_TYPES, ALLOWED_EXTENSIONS};
use error::{
    ScanError, IMAGE_TOO_LARGE_MESSAGE, INVALID_CONTENT_MESSAGE, INVALID_FORMAT_MESSAGE,
    MISSING_IMAGE_MESSAGE,
};
use ocr::worker::WorkerClient;
use ocr::ImageUpload;
use scanner::Scanner;
use schema::{ErrorDetail, ErrorResponse};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Headroom above the file cap for multipart framing.
const BODY_LIMIT_HEADROOM: usize = 1024 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    scanner: Arc<Scanner>,
    max_file_bytes: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "licence_scanner=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ScanConfig::from_env()?;
    info!(
        "Config loaded: worker={} fallback={} maxAttempts={} threshold={:.2}",
        config.worker_url,
        config.fallback.enabled,
        config.fallback.max_attempts,
        config.fallback.confidence_threshold
    );

    let worker = WorkerClient::new(&config.worker_url, config.internal_key.clone())?;
    info!("OCR worker client initialized");

    let state = AppState {
        scanner: Arc::new(Scanner::new(Arc::new(worker), config.fallback)),
        max_file_bytes: config.max_file_bytes,
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/license/scan", post(scan_license))
        .layer(DefaultBodyLimit::max(body_limit(config.max_file_bytes)))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Server listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Upload a licence photo and extract its fields.
async fn scan_license(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let request_id = resolve_request_id(&headers);

    let image = match read_image(multipart, state.max_file_bytes).await {
        Ok(image) => image,
        Err(err) => {
            warn!("Upload rejected requestId={}: {}", request_id, err);
            return error_response(&request_id, &err);
        }
    };

    match state.scanner.scan(&image, &request_id).await {
        Ok(response) => {
            info!(
                "Scan complete requestId={} engine={:?} blocking={}",
                request_id,
                response.selected_engine,
                response.validation.is_blocking()
            );
            json_response(StatusCode::OK, &request_id, response)
        }
        Err(err) => {
            error!("Scan failed requestId={}: {}", request_id, err);
            error_response(&request_id, &err)
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

fn body_limit(max_file_bytes: usize) -> usize {
    max_file_bytes.saturating_add(BODY_LIMIT_HEADROOM)
}

fn resolve_request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Read the `image` part, enforcing the size cap while streaming.
async fn read_image(
    multipart: Result<Multipart, MultipartRejection>,
    max_file_bytes: usize,
) -> Result<ImageUpload, ScanError> {
    let mut multipart =
        multipart.map_err(|_| ScanError::InvalidImage(MISSING_IMAGE_MESSAGE.to_string()))?;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("image") {
            continue;
        }
        let filename = field.file_name().unwrap_or("image").to_string();
        let content_type = field.content_type().map(str::to_string);

        let mut data = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            if data.len() + chunk.len() > max_file_bytes {
                return Err(ScanError::InvalidImage(IMAGE_TOO_LARGE_MESSAGE.to_string()));
            }
            data.extend_from_slice(&chunk);
        }

        if data.is_empty() {
            return Err(ScanError::InvalidImage(MISSING_IMAGE_MESSAGE.to_string()));
        }
        if !is_allowed_format(content_type.as_deref(), &filename) {
            return Err(ScanError::InvalidImage(INVALID_FORMAT_MESSAGE.to_string()));
        }
        if !has_image_signature(&data) {
            return Err(ScanError::InvalidImage(INVALID_CONTENT_MESSAGE.to_string()));
        }
        return Ok(ImageUpload {
            filename,
            content_type,
            data,
        });
    }

    Err(ScanError::InvalidImage(MISSING_IMAGE_MESSAGE.to_string()))
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ScanError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ScanError::InvalidImage(IMAGE_TOO_LARGE_MESSAGE.to_string())
    } else {
        ScanError::InvalidImage(MISSING_IMAGE_MESSAGE.to_string())
    }
}

/// Accept when either the declared content type or the file extension is allowed.
fn is_allowed_format(content_type: Option<&str>, filename: &str) -> bool {
    let type_ok = content_type
        .map(|ct| {
            let essence = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            ALLOWED_CONTENT_TYPES.contains(&essence.as_str())
        })
        .unwrap_or(false);
    let name = filename.to_ascii_lowercase();
    type_ok || ALLOWED_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// JPEG, PNG or WEBP by leading bytes, whatever the upload claims to be.
fn has_image_signature(data: &[u8]) -> bool {
    const PNG: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    let jpeg = data.starts_with(&[0xFF, 0xD8]);
    let png = data.starts_with(&PNG);
    let webp = data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP";
    jpeg || png || webp
}

fn json_response<T: Serialize>(status: StatusCode, request_id: &str, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    if let Ok(value) = HeaderValue::from_str(request_id) {
        headers.insert(REQUEST_ID_HEADER, value);
    }
    response
}

fn error_response(request_id: &str, err: &ScanError) -> Response {
    let body = ErrorResponse {
        request_id: request_id.to_string(),
        error: ErrorDetail {
            code: err.code().to_string(),
            message: err.public_message(),
        },
    };
    json_response(err.status(), request_id, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::Request;

    const BOUNDARY: &str = "licence-boundary";
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

    /// One multipart part: field name, filename, content type, bytes.
    type TestPart<'a> = (&'a str, &'a str, &'a str, &'a [u8]);

    async fn multipart(parts: &[TestPart<'_>]) -> Result<Multipart, MultipartRejection> {
        let mut body = Vec::new();
        for (name, filename, content_type, data) in parts {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    BOUNDARY, name, filename, content_type
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/license/scan")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(request, &()).await
    }

    async fn rejection(parts: &[TestPart<'_>], max_file_bytes: usize) -> String {
        match read_image(multipart(parts).await, max_file_bytes).await {
            Err(ScanError::InvalidImage(message)) => message,
            other => panic!("expected INVALID_IMAGE, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reads_image_part() {
        let image = read_image(
            multipart(&[
                ("note", "note.txt", "text/plain", &b"hello"[..]),
                ("image", "licence.jpg", "image/jpeg", JPEG),
            ])
            .await,
            1024,
        )
        .await
        .unwrap();
        assert_eq!(image.filename, "licence.jpg");
        assert_eq!(image.content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(image.data, JPEG);
    }

    #[tokio::test]
    async fn test_missing_or_empty_image_part() {
        let message = rejection(&[("file", "licence.jpg", "image/jpeg", JPEG)], 1024).await;
        assert_eq!(message, MISSING_IMAGE_MESSAGE);

        let message = rejection(&[("image", "licence.jpg", "image/jpeg", &b""[..])], 1024).await;
        assert_eq!(message, MISSING_IMAGE_MESSAGE);
    }

    #[tokio::test]
    async fn test_non_multipart_body_is_missing_image() {
        let request = Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let err = read_image(Multipart::from_request(request, &()).await, 1024)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_IMAGE");
        assert_eq!(err.public_message(), MISSING_IMAGE_MESSAGE);
    }

    #[tokio::test]
    async fn test_oversize_image_rejected() {
        let message = rejection(&[("image", "licence.jpg", "image/jpeg", JPEG)], 4).await;
        assert_eq!(message, IMAGE_TOO_LARGE_MESSAGE);
    }

    #[tokio::test]
    async fn test_disallowed_format_rejected() {
        let message = rejection(&[("image", "licence.pdf", "application/pdf", &b"%PDF-1.4"[..])], 1024).await;
        assert_eq!(message, INVALID_FORMAT_MESSAGE);
    }

    #[tokio::test]
    async fn test_renamed_pdf_fails_signature_check() {
        let message = rejection(&[("image", "licence.jpg", "image/jpeg", &b"%PDF-1.4 fake"[..])], 1024).await;
        assert_eq!(message, INVALID_CONTENT_MESSAGE);
    }

    #[test]
    fn test_body_limit_saturates() {
        assert_eq!(body_limit(10), 10 + BODY_LIMIT_HEADROOM);
        assert_eq!(body_limit(usize::MAX - 1), usize::MAX);
    }

    #[test]
    fn test_image_signatures() {
        assert!(has_image_signature(JPEG));
        assert!(has_image_signature(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00]));
        assert!(has_image_signature(b"RIFF\x24\x00\x00\x00WEBPVP8 "));
        assert!(!has_image_signature(b"RIFF\x24\x00\x00\x00WAVEfmt "));
        assert!(!has_image_signature(b"%PDF-1.4"));
        assert!(!has_image_signature(&[0xFF]));
    }

    #[test]
    fn test_request_id_header_is_honoured() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static(" abc-123 "));
        assert_eq!(resolve_request_id(&headers), "abc-123");
    }

    #[test]
    fn test_blank_request_id_is_generated() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("   "));
        let id = resolve_request_id(&headers);
        assert!(uuid::Uuid::parse_str(&id).is_ok(), "{}", id);
        assert_ne!(resolve_request_id(&HeaderMap::new()), id);
    }

    #[test]
    fn test_allowed_formats() {
        assert!(is_allowed_format(Some("image/jpeg"), "upload"));
        assert!(is_allowed_format(Some("IMAGE/PNG; charset=binary"), "upload"));
        assert!(is_allowed_format(Some("application/octet-stream"), "licence.WEBP"));
        assert!(is_allowed_format(None, "licence.jpeg"));
        assert!(!is_allowed_format(Some("application/pdf"), "licence.pdf"));
        assert!(!is_allowed_format(None, "licence"));
    }

    #[test]
    fn test_error_response_headers_and_body() {
        let err = ScanError::OcrTimeout;
        let response = error_response("req-1", &err);
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "req-1");
    }
}

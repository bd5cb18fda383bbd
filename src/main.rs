//! Medi-Verify Scanner - QR decoding relay with a vision-model fallback.

mod config;
mod decoder;
mod frame;
mod scanner;
mod schema;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use config::AppConfig;
use decoder::gemini::GeminiDecoder;
use decoder::qr::QrDecoder;
use scanner::Scanner;
use schema::{HealthStatus, ScanResult};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, Instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    scanner: Scanner,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "medi_verify_scanner=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    info!("Remote decoder: {:?}", config.gemini);

    let remote = GeminiDecoder::new(config.gemini.clone())?;
    let state = AppState {
        scanner: Scanner::new(Arc::new(QrDecoder::new()), Arc::new(remote)),
    };

    let app = router(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Server listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/scan-image", post(scan_image))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint.
async fn health() -> Json<HealthStatus> {
    Json(HealthStatus::default())
}

/// Upload an image and look for a QR code in it.
///
/// Every scan outcome, including undecodable uploads, is a 200 with a
/// [`ScanResult`] body. Only a broken multipart request is an HTTP error.
async fn scan_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ScanResult>, (StatusCode, String)> {
    let (filename, data) = read_upload(multipart).await?;
    let request_id = Uuid::new_v4();

    let result = async move {
        info!("Received file: {} ({} bytes)", filename, data.len());
        let result = state.scanner.scan(data).await;
        if result.success() {
            info!(
                "Scan complete: id={:?} ({} code(s))",
                result.id(),
                result.all_ids().len()
            );
        } else {
            info!("Scan complete: {}", result.message().unwrap_or_default());
        }
        result
    }
    .instrument(info_span!("scan", %request_id))
    .await;

    Ok(Json(result))
}

// ============================================================================
// Helper functions
// ============================================================================

/// Pull the `file` field out of a multipart body.
async fn read_upload(mut multipart: Multipart) -> Result<(String, Bytes), (StatusCode, String)> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (e.status(), format!("Multipart error: {}", e.body_text()))
    })? {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("image").to_string();
            let data = field.bytes().await.map_err(|e| {
                (e.status(), format!("Failed to read file: {}", e.body_text()))
            })?;
            return Ok((filename, data));
        }
    }

    Err((StatusCode::BAD_REQUEST, "No file uploaded".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::gemini::tests::{config_for, MockGemini};
    use crate::decoder::gemini::GeminiConfig;
    use crate::decoder::qr::tests::qr_frame;
    use crate::frame::PixelFrame;
    use image::RgbImage;
    use reqwest::multipart::{Form, Part};
    use serde_json::{json, Value};
    use std::time::Duration;

    const TEST_UPLOAD_LIMIT: usize = 8 * 1024 * 1024;

    async fn spawn_app(gemini: GeminiConfig) -> String {
        let remote = GeminiDecoder::new(gemini).unwrap();
        let state = AppState {
            scanner: Scanner::new(Arc::new(QrDecoder::new()), Arc::new(remote)),
        };
        let app = router(state, TEST_UPLOAD_LIMIT);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn upload(app: &str, bytes: Vec<u8>) -> reqwest::Response {
        let form = Form::new().part("file", Part::bytes(bytes).file_name("upload.jpg"));
        reqwest::Client::new()
            .post(format!("{}/scan-image", app))
            .multipart(form)
            .send()
            .await
            .unwrap()
    }

    fn blank_jpeg() -> Vec<u8> {
        PixelFrame::from(RgbImage::from_pixel(200, 200, image::Rgb([255, 255, 255])))
            .to_jpeg()
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = spawn_app(GeminiConfig::new(None)).await;
        let body: Value = reqwest::get(format!("{}/", app))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(
            body,
            json!({"status": "OK", "message": "Medi-Verify Scanner API is running."})
        );
    }

    #[tokio::test]
    async fn test_local_qr_scan() {
        let mock = Arc::new(MockGemini::answering("WRONG"));
        let app = spawn_app(config_for(mock.spawn().await, Some("test-key"))).await;

        let resp = upload(&app, qr_frame("ABC123").to_jpeg().unwrap()).await;
        assert_eq!(resp.status().as_u16(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(
            body,
            json!({"success": true, "id": "ABC123", "all_ids": ["ABC123"]})
        );
        assert_eq!(mock.hits(), 0);
    }

    #[tokio::test]
    async fn test_remote_fallback_scan() {
        let mock = Arc::new(MockGemini::answering("`ABC123`"));
        let app = spawn_app(config_for(mock.spawn().await, Some("test-key"))).await;

        let body: Value = upload(&app, blank_jpeg()).await.json().await.unwrap();
        assert_eq!(
            body,
            json!({"success": true, "id": "ABC123", "all_ids": ["ABC123"]})
        );
        assert_eq!(mock.hits(), 1);
    }

    #[tokio::test]
    async fn test_non_image_upload() {
        let mock = Arc::new(MockGemini::answering("ABC123"));
        let app = spawn_app(config_for(mock.spawn().await, Some("test-key"))).await;

        let resp = upload(&app, b"\x13\x37 random bytes, not a picture".to_vec()).await;
        assert_eq!(resp.status().as_u16(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(
            body,
            json!({
                "success": false,
                "id": null,
                "all_ids": [],
                "message": "Could not decode image."
            })
        );
        assert_eq!(mock.hits(), 0);
    }

    #[tokio::test]
    async fn test_remote_timeout_scan() {
        let mock = Arc::new(MockGemini::answering("ABC123").delayed(Duration::from_secs(5)));
        let gemini = GeminiConfig {
            timeout: Duration::from_millis(200),
            ..config_for(mock.spawn().await, Some("test-key"))
        };
        let app = spawn_app(gemini).await;

        let body: Value = upload(&app, blank_jpeg()).await.json().await.unwrap();
        assert_eq!(
            body,
            json!({
                "success": false,
                "id": null,
                "all_ids": [],
                "message": "No QR code found in the image."
            })
        );
    }

    #[tokio::test]
    async fn test_missing_file_field() {
        let app = spawn_app(GeminiConfig::new(None)).await;
        let form = Form::new().text("note", "no file here");
        let resp = reqwest::Client::new()
            .post(format!("{}/scan-image", app))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400);
    }
}

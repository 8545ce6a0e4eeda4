use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, ResponseError};
use futures_util::StreamExt;
use tracing::{error, info, warn};

use crate::error::{DetectorError, Result};
use crate::inference::Classifier;
use crate::models::{ModelStatus, PredictionResult};
use crate::render;
use crate::validation::{self, UploadedImage};

/// Shared by every worker. The classifier is read-only after startup.
pub struct AppState {
    pub classifier: Arc<dyn Classifier>,
    pub status: ModelStatus,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        status: ModelStatus,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            classifier,
            status,
            max_upload_bytes,
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/status").route(web::get().to(status)))
        .service(web::resource("/predict").route(web::post().to(predict)))
        .service(web::resource("/analyze").route(web::post().to(analyze)));
}

/// Read the first file field, enforcing the size cap while streaming.
/// Plain form fields (no filename) before it are skipped.
pub async fn read_upload(mut payload: Multipart, limit: usize) -> Result<UploadedImage> {
    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| DetectorError::Upload(e.to_string()))?;

        let Some(file_name) = field
            .content_disposition()
            .get_filename()
            .map(str::to_owned)
        else {
            while let Some(chunk) = field.next().await {
                chunk.map_err(|e| DetectorError::Upload(e.to_string()))?;
            }
            continue;
        };

        let content_type = field.content_type().to_string();
        validation::check_declared_type(Some(&content_type))?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(|e| DetectorError::Upload(e.to_string()))?;
            validation::check_size(bytes.len() + data.len(), limit)?;
            bytes.extend_from_slice(&data);
        }

        return Ok(UploadedImage {
            bytes,
            content_type: Some(content_type),
            file_name: Some(file_name),
        });
    }
    Err(DetectorError::EmptyUpload)
}

async fn run_analysis(state: &AppState, payload: Multipart) -> Result<PredictionResult> {
    let upload = read_upload(payload, state.max_upload_bytes).await?;
    let kind = validation::validate(&upload, state.max_upload_bytes)?;
    info!(
        file = upload.file_name.as_deref().unwrap_or("-"),
        size = upload.len(),
        format = ?kind,
        mode = ?state.classifier.mode(),
        "analyzing upload"
    );

    let delay = state.classifier.delay();
    if !delay.is_zero() {
        actix_rt::time::sleep(delay).await;
    }

    let classifier = Arc::clone(&state.classifier);
    let result = web::block(move || classifier.classify(&upload.bytes, Some(kind)))
        .await
        .map_err(|e| DetectorError::Inference(e.to_string()))??;

    info!(
        request_id = %result.request_id,
        class = %result.class_name,
        confidence = result.confidence_percent,
        simulated = result.is_simulated,
        "prediction ready"
    );
    Ok(result)
}

fn log_failure(err: &DetectorError) {
    if err.is_client_error() {
        warn!(error = %err, "rejected upload");
    } else {
        error!(error = %err, "analysis failed");
    }
}

pub async fn index(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(render::upload_page(&state.status, state.max_upload_bytes))
}

pub async fn status(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(&state.status)
}

/// JSON prediction for API clients.
pub async fn predict(
    state: web::Data<AppState>,
    payload: Multipart,
) -> std::result::Result<HttpResponse, DetectorError> {
    match run_analysis(&state, payload).await {
        Ok(result) => Ok(HttpResponse::Ok().json(result)),
        Err(e) => {
            log_failure(&e);
            Err(e)
        }
    }
}

/// HTML result card for the upload page.
pub async fn analyze(state: web::Data<AppState>, payload: Multipart) -> HttpResponse {
    match run_analysis(&state, payload).await {
        Ok(result) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(render::render_result(&result)),
        Err(e) => {
            log_failure(&e);
            HttpResponse::build(e.status_code())
                .content_type("text/html; charset=utf-8")
                .body(render::render_error(&e.to_string()))
        }
    }
}

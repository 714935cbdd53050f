// API route handlers for the Video Subtitle API
//
// This module contains the route handlers and the function that mounts them on
// an actix-web App.

use std::time::Instant;

use actix_multipart::Multipart;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{get, web, HttpRequest, HttpResponse, ResponseError};
use log::{error, info, warn};

use crate::config::{defaults, HandlerConfig};
use crate::error::ApiError;
use crate::file_utils::ScratchDir;
use crate::handlers::form::extract_form_data;
use crate::metrics::Metrics;
use crate::models::ServiceInfo;
use crate::pipeline::{Pipeline, RequestLifecycle};

/// Mount every route of the service
///
/// Expects `HandlerConfig`, `Pipeline` and `Metrics` to be registered as app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(metrics_handler)
        .service(web::resource("/api/translate").route(web::post().to(translate_video)))
        .service(web::resource("/upload").route(web::post().to(translate_video)));
}

/// Service description
#[get("/")]
pub async fn index() -> HttpResponse {
    HttpResponse::Ok().json(ServiceInfo::default())
}

/// Metrics endpoint handler
#[get("/metrics")]
pub async fn metrics_handler(metrics: web::Data<Metrics>) -> HttpResponse {
    match metrics.export().await {
        Ok(data) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4; charset=utf-8")
            .body(data),
        Err(e) => HttpResponse::InternalServerError()
            .json(format!("Failed to export metrics: {}", e)),
    }
}

/// Handler for translation requests
///
/// Receives a video, runs the whole pipeline on it and answers with the
/// subtitled video as an attachment. Served on both `/api/translate` and `/upload`.
pub async fn translate_video(
    req: HttpRequest,
    form: Multipart,
    config: web::Data<HandlerConfig>,
    pipeline: web::Data<Pipeline>,
    metrics: web::Data<Metrics>,
) -> Result<HttpResponse, ApiError> {
    let start_time = Instant::now();
    let result = process_upload(form, &config, &pipeline, &metrics).await;

    // Record HTTP request metrics
    let status = match &result {
        Ok(response) => response.status(),
        Err(e) => e.status_code(),
    };
    metrics
        .record_http_request(
            "POST",
            req.path(),
            status.as_str(),
            start_time.elapsed().as_secs_f64(),
        )
        .await;

    result
}

async fn process_upload(
    form: Multipart,
    config: &HandlerConfig,
    pipeline: &Pipeline,
    metrics: &Metrics,
) -> Result<HttpResponse, ApiError> {
    let scratch = ScratchDir::create(&config.temp_dir).map_err(|e| {
        error!("Failed to create scratch directory: {}", e);
        ApiError::FileError(e)
    })?;
    let mut lifecycle = RequestLifecycle::new(scratch.id());

    let upload = match extract_form_data(form, config, &scratch).await {
        Ok(upload) => upload,
        Err(e) => {
            lifecycle.fail(e.kind());
            warn!("[{}] Rejected upload: {}", lifecycle.id(), e);
            return Err(e);
        }
    };
    lifecycle.advance();
    metrics.record_file_size(upload.params.file_size as f64).await;
    info!(
        "[{}] Translating {} from {} to {}",
        lifecycle.id(),
        upload.params.filename,
        upload.params.source_language,
        pipeline.target_language()
    );

    let output = pipeline
        .run(
            &mut lifecycle,
            &scratch,
            &upload.path,
            &upload.params.source_language,
        )
        .await?;

    // The body is read into memory so the scratch directory can go right away
    let body = match tokio::fs::read(&output.video).await {
        Ok(body) => body,
        Err(e) => {
            error!("[{}] Failed to read output video: {}", lifecycle.id(), e);
            return Err(ApiError::FileError(e));
        }
    };
    lifecycle.advance();
    info!(
        "[{}] Responding with {} bytes of video",
        lifecycle.id(),
        body.len()
    );
    scratch.cleanup();

    Ok(HttpResponse::Ok()
        .content_type("video/mp4")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(
                defaults::OUTPUT_FILENAME.to_string(),
            )],
        })
        .body(body))
}

use std::sync::Arc;
use std::time::Duration;

use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{error, info, warn};

use video_subtitle_api::config_loader::load_config;
use video_subtitle_api::config_validator::ConfigValidator;
use video_subtitle_api::{
    configure, create_metrics_exporter, FfmpegTool, HttpSpeechRecognizer, HttpTranslator,
    Metrics, Pipeline,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Documentation flags exit before anything else runs
    if let Some(flag) = std::env::args().nth(1) {
        match flag.as_str() {
            "--generate-config" => {
                print!("{}", ConfigValidator::generate_sample_config());
                return Ok(());
            }
            "--config-docs" => {
                print!("{}", ConfigValidator::generate_config_documentation());
                return Ok(());
            }
            _ => {}
        }
    }

    // Initialize logger
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    // Load configuration file into the environment, then validate
    load_config();
    let config = match ConfigValidator::validate_and_load() {
        Ok(config) => config,
        Err(_) => {
            error!("Invalid configuration, see errors above");
            std::process::exit(1);
        }
    };

    // Initialize metrics
    let metrics = Metrics::new(create_metrics_exporter(config.metrics.exporter_type()));

    if let Err(e) = config.handler.ensure_temp_dir() {
        warn!(
            "Failed to create temp directory {}: {}",
            config.handler.temp_dir, e
        );
    }

    let speech = HttpSpeechRecognizer::new(config.speech.clone()).map_err(|e| {
        error!("Failed to build speech recognition client: {}", e);
        std::io::Error::other(e)
    })?;
    let translator = HttpTranslator::new(config.translation.clone()).map_err(|e| {
        error!("Failed to build translation client: {}", e);
        std::io::Error::other(e)
    })?;
    let pipeline = Pipeline::new(
        Arc::new(FfmpegTool::new(config.media.clone())),
        Arc::new(speech),
        Arc::new(translator),
        config.translation.target_language.clone(),
        Duration::from_secs(config.media.fallback_duration_seconds),
        metrics.clone(),
    );

    let server = config.server.clone();
    let workers = server.effective_workers();

    info!(
        "Starting Video Subtitle API server on http://{}:{}",
        server.host, server.port
    );
    info!("Using temp directory: {}", config.handler.temp_dir);
    info!("ffmpeg command: {}", config.media.ffmpeg_path);
    info!("Speech recognition endpoint: {}", config.speech.api_url);
    info!(
        "Translation endpoint: {} (target language {})",
        config.translation.api_url, config.translation.target_language
    );
    info!("Metrics exporter: {}", config.metrics.exporter_type());
    info!("HTTP workers: {}", workers);

    let handler_config = config.handler.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::new(handler_config.clone()))
            .app_data(web::Data::new(pipeline.clone()))
            .app_data(web::Data::new(metrics.clone()))
            .configure(configure)
    })
    .workers(workers)
    .bind((server.host, server.port))?
    .client_disconnect_timeout(Duration::from_secs(server.timeout))
    .keep_alive(Duration::from_secs(server.keepalive))
    .run()
    .await
}

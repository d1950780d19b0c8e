use crate::config::Config;
use crate::enhancement::pipeline::{EnhanceParams, STAGES};
use crate::enhancement::{EnhancementResult, Pipeline, ScaleFactor};
use crate::error::EnhanceError;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use image::{DynamicImage, ImageFormat, RgbImage};
use serde::Serialize;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Upload formats accepted by /enhance, with their MIME types
const SUPPORTED_FORMATS: [(ImageFormat, &str); 4] = [
    (ImageFormat::Jpeg, "image/jpeg"),
    (ImageFormat::Png, "image/png"),
    (ImageFormat::Bmp, "image/bmp"),
    (ImageFormat::Tiff, "image/tiff"),
];

const SUPPORTED_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "tiff", "tif"];

/// Name used for the download when the upload carries no filename
const DEFAULT_FILENAME: &str = "image.png";

/// Headroom for multipart boundaries and form fields on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub config: Arc<Config>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Fixed pipeline description
#[derive(Serialize)]
pub struct PipelineInfo {
    pub stages: Vec<String>,
    pub sigma: f32,
    pub strength: f32,
    pub clip_limit: f32,
    pub tile_grid: [u32; 2],
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub supported_formats: Vec<String>,
    pub supported_extensions: Vec<String>,
    pub scale_factors: Vec<u32>,
    pub default_scale_factor: u32,
    pub max_file_size_bytes: usize,
    pub max_output_pixels: u64,
    pub pipeline: PipelineInfo,
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let max_file_size = state.config.max_file_size;

    Router::new()
        .route("/enhance", post(handle_enhance))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::max(
            max_file_size.saturating_add(MULTIPART_OVERHEAD),
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);

    let state = AppState {
        pipeline: Arc::new(Pipeline::new(
            EnhanceParams::default(),
            config.max_output_pixels,
        )),
        config: Arc::new(config),
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Handle enhancement requests
async fn handle_enhance(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, EnhanceError> {
    let start = Instant::now();

    let mut file_data: Option<Bytes> = None;
    let mut file_name: Option<String> = None;
    let mut scale_factor = ScaleFactor::default().get() as i64;

    // Parse multipart form
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| EnhanceError::InvalidRequest(format!("Failed to parse multipart: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                file_data = Some(field.bytes().await.map_err(|e| {
                    EnhanceError::InvalidRequest(format!("Failed to read file data: {}", e))
                })?);
            }
            "scale_factor" => {
                let text = field.text().await.map_err(|e| {
                    EnhanceError::InvalidRequest(format!("Invalid scale factor: {}", e))
                })?;
                if !text.trim().is_empty() {
                    scale_factor = parse_scale_factor(&text)?;
                }
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let data = file_data.ok_or(EnhanceError::MissingFile)?;

    if data.len() > state.config.max_file_size {
        return Err(EnhanceError::ImageTooLarge {
            size: data.len(),
            max: state.config.max_file_size,
        });
    }

    // Reject before decoding so a bad factor never costs a decode
    ScaleFactor::new(scale_factor)?;

    let format = detect_format(&data)?;
    let pipeline = state.pipeline.clone();

    let (result, png) = tokio::task::spawn_blocking(move || {
        let image = decode(&data, format)?;
        let result = pipeline.process(image, scale_factor)?;
        let png = encode_png(&result.image)?;
        Ok::<_, EnhanceError>((result, png))
    })
    .await
    .map_err(|e| EnhanceError::Internal(format!("Enhancement task failed: {}", e)))??;

    let processing_time_ms = start.elapsed().as_millis() as u64;
    let download_name = enhanced_filename(file_name.as_deref());

    tracing::info!(
        original = %format_size(result.original_size),
        enhanced = %format_size(result.image.dimensions()),
        scale_factor = result.scale_factor.get(),
        pipeline_time_ms = result.total_time_ms,
        processing_time_ms,
        size_bytes = png.len(),
        "Enhancement completed"
    );

    Ok(png_response(&result, png, &download_name, processing_time_ms))
}

fn png_response(
    result: &EnhancementResult,
    png: Vec<u8>,
    download_name: &str,
    processing_time_ms: u64,
) -> Response {
    let step_timings = result
        .steps
        .iter()
        .map(|s| format!("{}={}", s.name, s.time_ms))
        .collect::<Vec<_>>()
        .join(",");

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::CONTENT_LENGTH, png.len().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", download_name),
            ),
            (
                HeaderName::from_static("x-original-size"),
                format_size(result.original_size),
            ),
            (
                HeaderName::from_static("x-enhanced-size"),
                format_size(result.image.dimensions()),
            ),
            (
                HeaderName::from_static("x-scale-factor"),
                result.scale_factor.get().to_string(),
            ),
            (
                HeaderName::from_static("x-processing-time-ms"),
                processing_time_ms.to_string(),
            ),
            (HeaderName::from_static("x-step-timings"), step_timings),
        ],
        Bytes::from(png),
    )
        .into_response()
}

fn parse_scale_factor(text: &str) -> Result<i64, EnhanceError> {
    text.trim().parse::<i64>().map_err(|_| {
        EnhanceError::InvalidRequest(format!("Scale factor is not an integer: {:?}", text))
    })
}

/// Sniff the upload's format from its content and check it is accepted
fn detect_format(data: &[u8]) -> Result<ImageFormat, EnhanceError> {
    let format = image::guess_format(data).map_err(|_| {
        tracing::warn!("Received upload in an unrecognized format");
        EnhanceError::UnsupportedFormat("unrecognized image data".to_string())
    })?;

    if SUPPORTED_FORMATS.iter().any(|(f, _)| *f == format) {
        Ok(format)
    } else {
        tracing::warn!("Received upload with unsupported format: {:?}", format);
        Err(EnhanceError::UnsupportedFormat(
            format.extensions_str().first().copied().unwrap_or("unknown").to_string(),
        ))
    }
}

/// Decode to 8-bit RGB; alpha is dropped and grayscale expanded
fn decode(data: &[u8], format: ImageFormat) -> Result<DynamicImage, EnhanceError> {
    let image = image::load_from_memory_with_format(data, format)
        .map_err(|e| EnhanceError::DecodeError(e.to_string()))?;
    Ok(DynamicImage::ImageRgb8(image.into_rgb8()))
}

fn encode_png(image: &RgbImage) -> Result<Vec<u8>, EnhanceError> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| EnhanceError::EncodeError(e.to_string()))?;
    Ok(buf.into_inner())
}

/// `enhanced_<name>`, keeping only the base name and header-safe characters
fn enhanced_filename(original: Option<&str>) -> String {
    let base: String = original
        .and_then(|name| name.rsplit(|c: char| c == '/' || c == '\\').next())
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let base = base.trim();
    if base.is_empty() {
        format!("enhanced_{}", DEFAULT_FILENAME)
    } else {
        format!("enhanced_{}", base)
    }
}

fn format_size((width, height): (u32, u32)) -> String {
    format!("{}x{}", width, height)
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    let params = state.pipeline.params();

    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        supported_formats: SUPPORTED_FORMATS
            .iter()
            .map(|(_, mime)| mime.to_string())
            .collect(),
        supported_extensions: SUPPORTED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        scale_factors: ScaleFactor::SUPPORTED.to_vec(),
        default_scale_factor: ScaleFactor::default().get(),
        max_file_size_bytes: state.config.max_file_size,
        max_output_pixels: state.config.max_output_pixels,
        pipeline: PipelineInfo {
            stages: STAGES.iter().map(|s| s.to_string()).collect(),
            sigma: params.sigma,
            strength: params.strength,
            clip_limit: params.clip_limit,
            tile_grid: [params.tile_grid.0, params.tile_grid.1],
        },
    })
}

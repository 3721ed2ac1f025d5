use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use server_api::{
    analysis_history, analyze_image, delete_analysis, get_analysis, service_status, ApiContext,
};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{AnalysisRecord, AnalyzeImageRequest, DeleteAck, ServiceStatus},
};
use storage::Storage;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use vision::{MissingVisionProvider, OpenAiVision, VisionConfig, VisionProvider};

mod config;

use config::{load_settings, prepare_database_url};

#[derive(Clone)]
struct AppState {
    api: ApiContext,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let vision: Arc<dyn VisionProvider> = if settings.vision_api_key.trim().is_empty() {
        info!("no vision API key configured; analysis requests will be rejected");
        Arc::new(MissingVisionProvider)
    } else {
        Arc::new(OpenAiVision::new(VisionConfig {
            api_key: settings.vision_api_key.clone(),
            model: settings.vision_model.clone(),
            endpoint: settings.vision_endpoint.clone(),
        }))
    };

    let state = AppState {
        api: ApiContext { storage, vision },
    };
    let app = build_router(Arc::new(state)).layer(cors_layer(&settings.cors_origins));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/", get(http_service_status))
        .route("/api/analyze-image", post(http_analyze_image))
        .route("/api/analysis-history", get(http_analysis_history))
        .route("/api/analysis/:analysis_id", get(http_get_analysis))
        .route("/api/analysis/:analysis_id", delete(http_delete_analysis))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|origin| origin == "*") {
        layer.allow_origin(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        layer.allow_origin(parsed)
    }
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Unavailable | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(error: ApiError) -> (StatusCode, Json<ApiError>) {
    (status_for(error.code), Json(error))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn http_service_status() -> Json<ServiceStatus> {
    Json(service_status())
}

async fn http_analyze_image(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeImageRequest>,
) -> Result<Json<AnalysisRecord>, (StatusCode, Json<ApiError>)> {
    let record = analyze_image(&state.api, req).await.map_err(reject)?;
    Ok(Json(record))
}

async fn http_analysis_history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AnalysisRecord>>, (StatusCode, Json<ApiError>)> {
    let history = analysis_history(&state.api).await.map_err(reject)?;
    Ok(Json(history))
}

async fn http_get_analysis(
    State(state): State<Arc<AppState>>,
    Path(analysis_id): Path<String>,
) -> Result<Json<AnalysisRecord>, (StatusCode, Json<ApiError>)> {
    let record = get_analysis(&state.api, &analysis_id)
        .await
        .map_err(reject)?;
    Ok(Json(record))
}

async fn http_delete_analysis(
    State(state): State<Arc<AppState>>,
    Path(analysis_id): Path<String>,
) -> Result<Json<DeleteAck>, (StatusCode, Json<ApiError>)> {
    let ack = delete_analysis(&state.api, &analysis_id)
        .await
        .map_err(reject)?;
    Ok(Json(ack))
}

use anyhow::{Context, Result};
use std::time::Duration;

use tracing::{debug, info};

use tower_http::services::ServeDir;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ApiError;
use super::metrics::{init_metrics, metrics_handler};
use super::{log_requests, state::*, ServerConfig};
use crate::config::{AppConfig, MAX_PLAYLIST_LENGTH};
use crate::enrichment::{Enricher, EnrichmentReport, Sources, TrackLookup};
use crate::generation::{GeneratedPlaylist, PlaylistGenerator};
use crate::llm::create_provider;
use crate::playlist::{CatalogMatch, TrackDescriptor, VideoMatch};
use crate::recovery::descriptor_from_object;
use crate::upstream::{create_catalog_lookup, create_video_lookup};

/// Upper bound on tracks accepted by a single enrich call.
pub const MAX_ENRICH_TRACKS: usize = 50;
pub const DEFAULT_TRENDING_LIMIT: u32 = 20;
pub const MAX_TRENDING_LIMIT: u32 = 50;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct GenerateBody {
    pub mood: String,
    pub count: Option<usize>,
}

#[derive(Deserialize, Debug)]
struct LookupParams {
    pub title: Option<String>,
    pub artist: Option<String>,
}

#[derive(Deserialize, Debug)]
struct TrendingParams {
    pub limit: Option<u32>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    title: String,
    artist: String,
    catalog_match: Option<CatalogMatch>,
    video_match: Option<VideoMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    catalog_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    video_error: Option<String>,
}

impl LookupResponse {
    fn new(descriptor: TrackDescriptor, lookup: TrackLookup) -> Self {
        let catalog_error = lookup.catalog.failure().map(str::to_string);
        let video_error = lookup.video.failure().map(str::to_string);
        LookupResponse {
            title: descriptor.title,
            artist: descriptor.artist,
            catalog_match: lookup.catalog.into_option(),
            video_match: lookup.video.into_option(),
            catalog_error,
            video_error,
        }
    }
}

#[derive(Serialize, Debug)]
struct TrendingResponse {
    videos: Vec<VideoMatch>,
}

#[derive(Serialize, Debug)]
struct HealthResponse {
    status: &'static str,
    provider: String,
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: format!("{}-{}", env!("CARGO_PKG_VERSION"), state.hash),
    };
    Json(stats)
}

async fn health(State(generator): State<GuardedGenerator>) -> Response {
    let provider = generator.provider();
    let (status_code, status, details) = match provider.health_check().await {
        Ok(()) => (StatusCode::OK, "ok", None),
        Err(err) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable", Some(err.to_string())),
    };
    let body = HealthResponse {
        status,
        provider: provider.name().to_string(),
        model: provider.model().to_string(),
        details,
    };
    (status_code, Json(body)).into_response()
}

async fn generate_playlist(
    State(generator): State<GuardedGenerator>,
    body: Result<Json<GenerateBody>, JsonRejection>,
) -> Result<Json<GeneratedPlaylist>, ApiError> {
    let Json(body) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    if let Some(count) = body.count {
        if !(1..=MAX_PLAYLIST_LENGTH).contains(&count) {
            return Err(ApiError::BadRequest(format!(
                "count must be between 1 and {}",
                MAX_PLAYLIST_LENGTH
            )));
        }
    }

    let playlist = generator.generate(&body.mood, body.count).await?;
    Ok(Json(playlist))
}

/// Reads `{"tracks": [...]}` into descriptors. Any element without a usable
/// title and artist rejects the whole body.
fn descriptors_from_body(body: &Value) -> Result<Vec<TrackDescriptor>, ApiError> {
    let tracks = body
        .get("tracks")
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::BadRequest("Invalid tracks data".to_string()))?;

    if tracks.len() > MAX_ENRICH_TRACKS {
        return Err(ApiError::BadRequest(format!(
            "at most {} tracks can be enriched at once",
            MAX_ENRICH_TRACKS
        )));
    }

    tracks
        .iter()
        .enumerate()
        .map(|(index, track)| {
            track
                .as_object()
                .and_then(descriptor_from_object)
                .ok_or_else(|| {
                    ApiError::BadRequest(format!("track {} is missing a title or artist", index))
                })
        })
        .collect()
}

async fn enrich(
    enricher: GuardedEnricher,
    body: Result<Json<Value>, JsonRejection>,
    sources: Sources,
) -> Result<Json<EnrichmentReport>, ApiError> {
    let Json(body) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let descriptors = descriptors_from_body(&body)?;
    debug!("Enriching {} tracks ({:?})", descriptors.len(), sources);
    Ok(Json(enricher.enrich(descriptors, sources).await))
}

async fn enrich_playlist(
    State(enricher): State<GuardedEnricher>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<EnrichmentReport>, ApiError> {
    enrich(enricher, body, Sources::All).await
}

async fn enrich_catalog(
    State(enricher): State<GuardedEnricher>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<EnrichmentReport>, ApiError> {
    enrich(enricher, body, Sources::CatalogOnly).await
}

async fn lookup(
    enricher: GuardedEnricher,
    params: Result<Query<LookupParams>, QueryRejection>,
    sources: Sources,
) -> Result<Json<LookupResponse>, ApiError> {
    let Query(params) = params.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let descriptor = match (params.title, params.artist) {
        (Some(title), Some(artist)) => TrackDescriptor::new(&title, &artist, None, None),
        _ => None,
    }
    .ok_or_else(|| ApiError::BadRequest("Title and artist are required".to_string()))?;

    info!(
        "Looking up \"{}\" by \"{}\"",
        descriptor.title, descriptor.artist
    );
    let result = enricher.lookup(&descriptor, sources).await;
    Ok(Json(LookupResponse::new(descriptor, result)))
}

async fn lookup_track(
    State(enricher): State<GuardedEnricher>,
    params: Result<Query<LookupParams>, QueryRejection>,
) -> Result<Json<LookupResponse>, ApiError> {
    lookup(enricher, params, Sources::All).await
}

async fn lookup_catalog(
    State(enricher): State<GuardedEnricher>,
    params: Result<Query<LookupParams>, QueryRejection>,
) -> Result<Json<LookupResponse>, ApiError> {
    lookup(enricher, params, Sources::CatalogOnly).await
}

async fn trending_videos(
    State(enricher): State<GuardedEnricher>,
    params: Result<Query<TrendingParams>, QueryRejection>,
) -> Result<Json<TrendingResponse>, ApiError> {
    let Query(params) = params.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_TRENDING_LIMIT)
        .clamp(1, MAX_TRENDING_LIMIT);
    let videos = enricher.trending_videos(limit).await?;
    Ok(Json(TrendingResponse { videos }))
}

pub fn make_app(state: ServerState) -> Router {
    let playlist_routes: Router = Router::new()
        .route("/generate", post(generate_playlist))
        .route("/enrich", post(enrich_playlist))
        .route("/lookup", get(lookup_track))
        .with_state(state.clone());

    let catalog_routes: Router = Router::new()
        .route("/enrich", post(enrich_catalog))
        .route("/lookup", get(lookup_catalog))
        .with_state(state.clone());

    let trending_routes: Router = Router::new()
        .route("/videos", get(trending_videos))
        .with_state(state.clone());

    let home_router: Router = match state.config.frontend_dir_path.clone() {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    home_router
        .route("/v1/health", get(health).with_state(state.clone()))
        .nest("/v1/playlist", playlist_routes)
        .nest("/v1/catalog", catalog_routes)
        .nest("/v1/trending", trending_routes)
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
}

pub fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Wires providers and upstream clients from the resolved configuration.
pub fn build_state(config: &AppConfig) -> ServerState {
    let provider = create_provider(&config.llm);
    info!(
        "Using {} model {} for generation",
        provider.name(),
        provider.model()
    );
    let generator = PlaylistGenerator::new(
        provider,
        config.llm.completion_options(),
        config.playlist_length,
    );
    let enricher = Enricher::new(
        create_catalog_lookup(&config.spotify),
        create_video_lookup(&config.youtube),
        config.enrichment.timeout(),
        config.enrichment.max_concurrent,
    );
    let server_config = ServerConfig {
        requests_logging_level: config.logging_level.clone(),
        port: config.port,
        metrics_port: config.metrics_port,
        frontend_dir_path: config.frontend_dir_path.clone(),
    };
    ServerState::new(server_config, generator, enricher)
}

pub async fn run_server(config: AppConfig) -> Result<()> {
    init_metrics();
    let state = build_state(&config);
    let app = make_app(state);

    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", config.metrics_port))?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(metrics_listener, make_metrics_app()).await {
            tracing::error!("Metrics server stopped: {}", err);
        }
    });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;

    info!("Ready to serve at port {}!", config.port);
    info!("Metrics available at port {}!", config.metrics_port);

    Ok(axum::serve(listener, app).await?)
}

use crate::config::AppConfig;
use crate::join::ZoneIndex;
use crate::output::{choropleth_collection, places_collection};
use crate::pipeline::PipelineOutput;
use crate::types::CategorySet;
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use geo::Point;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

pub struct AppState {
    pub output: PipelineOutput,
    pub categories: CategorySet,
    pub index: ZoneIndex,
}

impl AppState {
    pub fn new(output: PipelineOutput, categories: CategorySet) -> Self {
        info!("Building spatial index for API...");
        let index = ZoneIndex::new(output.zones.clone());
        Self {
            output,
            categories,
            index,
        }
    }

    /// First zone containing the point, with its counts per category.
    pub fn lookup(&self, lon: f64, lat: f64) -> Option<ZoneResponse> {
        let hit = *self.index.containing(&Point::new(lon, lat)).first()?;
        let zone_key = self.index.zones()[hit].zone_key.clone();

        let counts = self
            .output
            .aggregates
            .iter()
            .filter(|a| a.zone_key == zone_key)
            .map(|a| (a.category.clone(), a.count))
            .collect();

        Some(ZoneResponse { zone_key, counts })
    }
}

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ZoneResponse {
    zone_key: String,
    counts: BTreeMap<String, u32>,
}

pub fn router(state: Arc<AppState>, static_dir: &std::path::Path) -> Router {
    Router::new()
        .route("/api/zone", get(zone_handler))
        .route("/api/choropleth/:key", get(choropleth_handler))
        .route("/api/points/:key", get(points_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, output: PipelineOutput, categories: CategorySet) -> Result<()> {
    let state = Arc::new(AppState::new(output, categories));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    info!("Starting server on http://{}", addr);

    let app = router(state, &config.output.dir);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn zone_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Option<ZoneResponse>> {
    Json(state.lookup(params.lon, params.lat))
}

async fn choropleth_handler(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<geojson::FeatureCollection>, StatusCode> {
    let category = state.categories.by_key(&key).ok_or(StatusCode::NOT_FOUND)?;
    let part = state.output.partitions.get(&key).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(choropleth_collection(&part.choropleth, category)))
}

async fn points_handler(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<geojson::FeatureCollection>, StatusCode> {
    let part = state.output.partitions.get(&key).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(places_collection(&part.places)))
}

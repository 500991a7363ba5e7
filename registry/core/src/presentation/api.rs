// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! HTTP surface of the registry.
//!
//! Translates the agent/catalog/health routes into catalog and cache
//! operations. Discovery reads consult the cache first and populate it
//! on miss; registration and deregistration always go straight to the
//! catalog.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::application::catalog::Catalog;
use crate::domain::error::RegistryError;
use crate::domain::service::{HealthStatus, Registration, ServiceInstance};
use crate::infrastructure::cache::DiscoveryCache;
use crate::infrastructure::metrics;

/// Cache key for the full catalog listing. The leading slash keeps it
/// out of the namespace of logical service names.
const ALL_SERVICES_KEY: &str = "/catalog/all";

pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub cache: Arc<DiscoveryCache>,
    pub start_time: std::time::Instant,
}

pub fn app(catalog: Arc<Catalog>, cache: Arc<DiscoveryCache>) -> Router {
    let state = Arc::new(AppState {
        catalog,
        cache,
        start_time: std::time::Instant::now(),
    });

    Router::new()
        .route("/v1/agent/service/register", put(register_service))
        .route("/v1/agent/service/deregister/{id}", put(deregister_service))
        .route("/v1/catalog/services", get(list_services))
        .route("/v1/catalog/service/{name}", get(get_service_instances))
        .route("/v1/health/service/{id}", get(get_service_health))
        .route("/health", get(registry_health))
        .with_state(state)
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let status = match &self {
            RegistryError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

async fn register_service(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> Result<Json<serde_json::Value>, RegistryError> {
    // Malformed bodies are the caller's problem, not a framework 422.
    let Json(registration) = payload.map_err(|e| RegistryError::InvalidInput(e.body_text()))?;
    let id = registration.id.clone();
    state.catalog.register(registration).await?;
    Ok(Json(json!({ "status": "registered", "id": id })))
}

async fn deregister_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, RegistryError> {
    state.catalog.deregister(&id).await?;
    Ok(Json(json!({ "status": "deregistered", "id": id })))
}

/// Map of logical service name to its tag set, aggregated over all
/// instances of that name.
async fn list_services(
    State(state): State<Arc<AppState>>,
) -> Json<BTreeMap<String, Vec<String>>> {
    metrics::record_discovery();

    let instances = match state.cache.get(ALL_SERVICES_KEY) {
        Some(cached) => cached,
        None => {
            let snapshot = state.catalog.get_all();
            state.cache.insert(ALL_SERVICES_KEY, snapshot.clone());
            snapshot
        }
    };

    let mut services: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for instance in instances {
        let tags = services.entry(instance.name).or_default();
        tags.extend(instance.tags);
    }

    Json(
        services
            .into_iter()
            .map(|(name, tags)| (name, tags.into_iter().collect()))
            .collect(),
    )
}

/// All instances registered under a logical name. Non-passing entries
/// are included; filtering by health is the caller's choice.
async fn get_service_instances(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Json<Vec<ServiceInstance>> {
    metrics::record_discovery();

    if let Some(cached) = state.cache.get(&name) {
        return Json(cached);
    }

    let instances = state.catalog.get_by_name(&name);
    state.cache.insert(&name, instances.clone());
    Json(instances)
}

#[derive(Debug, Serialize)]
struct HealthRecord {
    id: String,
    name: String,
    status: HealthStatus,
    registered_at: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

async fn get_service_health(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<HealthRecord>, RegistryError> {
    let instance = state.catalog.get(&id)?;
    Ok(Json(HealthRecord {
        id: instance.id,
        name: instance.name,
        status: instance.health,
        registered_at: instance.registered_at,
        last_seen: instance.last_seen,
    }))
}

/// The registry's own liveness, independent of any instance's health.
async fn registry_health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "passing",
        "timestamp": Utc::now(),
        "registered_services": state.catalog.len(),
        "uptime_seconds": state.start_time.elapsed().as_secs(),
    }))
}

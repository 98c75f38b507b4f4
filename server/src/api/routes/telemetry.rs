//! Telemetry query endpoints
//!
//! Read-only views over the retention store; every handler is a direct
//! repository read followed by response shaping. Reads run concurrently
//! with ongoing ingest and rely on the store's own isolation — no handler
//! takes an application-level lock or mutates state.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::api::types::ApiError;
use crate::data::sqlite::SqliteService;
use crate::data::sqlite::repositories::sample::{self, KeyInfo, KeySeries, LatestSample};

/// Shared state for telemetry API endpoints
#[derive(Clone)]
pub struct TelemetryApiState {
    pub database: Arc<SqliteService>,
}

/// Build telemetry API routes
pub fn routes(database: Arc<SqliteService>) -> Router<()> {
    let state = TelemetryApiState { database };

    Router::new()
        .route("/data", get(get_all))
        .route("/data/{key}", get(get_by_key))
        .route("/latest", get(get_latest))
        .route("/keys", get(list_keys))
        .with_state(state)
}

/// Full retained history for every key, key ascending, newest sample first
async fn get_all(
    State(state): State<TelemetryApiState>,
) -> Result<Json<Vec<KeySeries>>, ApiError> {
    let series = sample::get_all(state.database.pool())
        .await
        .map_err(ApiError::from_sqlite)?;
    Ok(Json(series))
}

/// Retained history for one key; 404 when no samples exist for it
async fn get_by_key(
    State(state): State<TelemetryApiState>,
    Path(key): Path<String>,
) -> Result<Json<KeySeries>, ApiError> {
    let series = sample::get_by_key(state.database.pool(), &key)
        .await
        .map_err(ApiError::from_sqlite)?;

    series
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("No data found for key: {}", key)))
}

/// The single most recent sample per key
async fn get_latest(
    State(state): State<TelemetryApiState>,
) -> Result<Json<BTreeMap<String, LatestSample>>, ApiError> {
    let latest = sample::get_latest(state.database.pool())
        .await
        .map_err(ApiError::from_sqlite)?;
    Ok(Json(latest))
}

/// Every distinct key with its descriptor
async fn list_keys(
    State(state): State<TelemetryApiState>,
) -> Result<Json<Vec<KeyInfo>>, ApiError> {
    let keys = sample::list_keys(state.database.pool())
        .await
        .map_err(ApiError::from_sqlite)?;
    Ok(Json(keys))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use sqlx::sqlite::SqlitePoolOptions;
    use tower::ServiceExt;

    use crate::data::sqlite::migrations;
    use crate::data::types::Descriptor;

    async fn test_router() -> (Router, Arc<SqliteService>) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let database = Arc::new(SqliteService::from_pool(pool));
        (routes(database.clone()), database)
    }

    async fn get_json(router: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap();
        (status, json)
    }

    fn pressure_descriptor() -> Descriptor {
        Descriptor {
            description: "Cabin Pressure".to_string(),
            ops_nom: "CABIN PRESS".to_string(),
            units: "psia".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_get_data_empty_store() {
        let (router, _db) = test_router().await;
        let (status, json) = get_json(&router, "/data").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_get_latest_empty_store() {
        let (router, _db) = test_router().await;
        let (status, json) = get_json(&router, "/latest").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_get_data_shape_and_order() {
        let (router, db) = test_router().await;
        let desc = pressure_descriptor();
        sample::insert(db.pool(), "USLAB000058", "14.68", 1000, &desc)
            .await
            .unwrap();
        sample::insert(db.pool(), "USLAB000058", "14.69", 2000, &desc)
            .await
            .unwrap();
        sample::insert(db.pool(), "AIRLOCK000049", "0", 1500, &Descriptor::default())
            .await
            .unwrap();

        let (status, json) = get_json(&router, "/data").await;
        assert_eq!(status, StatusCode::OK);

        let entries = json.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        // Keys ascending
        assert_eq!(entries[0]["key"], "AIRLOCK000049");
        assert_eq!(entries[1]["key"], "USLAB000058");
        // Descriptor fields are flattened onto the entry
        assert_eq!(entries[1]["description"], "Cabin Pressure");
        assert_eq!(entries[1]["ops_nom"], "CABIN PRESS");
        assert_eq!(entries[1]["units"], "psia");
        assert_eq!(entries[1]["min_value"], "");
        // Values newest first, carrying value/timestamp/id
        let values = entries[1]["values"].as_array().unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0]["timestamp"], 2000);
        assert_eq!(values[0]["value"], "14.69");
        assert_eq!(values[1]["timestamp"], 1000);
        assert!(values[0]["id"].is_i64());
    }

    #[tokio::test]
    async fn test_get_data_by_key() {
        let (router, db) = test_router().await;
        sample::insert(db.pool(), "USLAB000058", "14.69", 1000, &pressure_descriptor())
            .await
            .unwrap();

        let (status, json) = get_json(&router, "/data/USLAB000058").await;
        assert_eq!(status, StatusCode::OK);
        // Single object, not an array
        assert_eq!(json["key"], "USLAB000058");
        assert_eq!(json["values"][0]["value"], "14.69");
    }

    #[tokio::test]
    async fn test_get_data_by_key_not_found() {
        let (router, _db) = test_router().await;
        let (status, json) = get_json(&router, "/data/NOPE").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "No data found for key: NOPE");
    }

    #[tokio::test]
    async fn test_get_latest_shape() {
        let (router, db) = test_router().await;
        let desc = pressure_descriptor();
        sample::insert(db.pool(), "USLAB000058", "14.68", 1000, &desc)
            .await
            .unwrap();
        sample::insert(db.pool(), "USLAB000058", "14.69", 2000, &desc)
            .await
            .unwrap();

        let (status, json) = get_json(&router, "/latest").await;
        assert_eq!(status, StatusCode::OK);

        let entry = &json["USLAB000058"];
        assert_eq!(entry["value"], "14.69");
        assert_eq!(entry["timestamp"], 2000);
        assert_eq!(entry["description"], "Cabin Pressure");
        assert_eq!(entry["units"], "psia");
        // Latest carries no per-sample id or values array
        assert!(entry.get("id").is_none());
        assert!(entry.get("values").is_none());
    }

    #[tokio::test]
    async fn test_list_keys_shape() {
        let (router, db) = test_router().await;
        sample::insert(db.pool(), "USLAB000058", "14.69", 1000, &pressure_descriptor())
            .await
            .unwrap();
        sample::insert(db.pool(), "AIRLOCK000049", "0", 1000, &Descriptor::default())
            .await
            .unwrap();

        let (status, json) = get_json(&router, "/keys").await;
        assert_eq!(status, StatusCode::OK);

        let keys = json.as_array().unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0]["key"], "AIRLOCK000049");
        assert_eq!(keys[1]["key"], "USLAB000058");
        assert_eq!(keys[1]["description"], "Cabin Pressure");
        assert!(keys[0].get("values").is_none());
    }
}

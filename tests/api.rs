use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use crypto_dashboard::{api::create_router, AssetQuote, SnapshotCache, SnapshotStore};
use serde_json::Value;
use temp_dir::TempDir;
use tower::ServiceExt;

fn quote(symbol: &str, rank: u32, change: f64, minute: u32) -> AssetQuote {
    let ts = Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap();
    AssetQuote {
        id: rank as u64,
        name: format!("{symbol} coin"),
        symbol: symbol.to_string(),
        slug: symbol.to_lowercase(),
        cmc_rank: rank,
        price: Some(100.0 / rank as f64),
        volume_24h: Some(1_000_000.0),
        market_cap: Some(1_000_000_000.0),
        percent_change_1h: None,
        percent_change_24h: Some(change),
        percent_change_7d: None,
        last_updated: ts,
        pull_timestamp: ts,
    }
}

fn app(dir: &TempDir) -> (Router, SnapshotStore) {
    let store = SnapshotStore::new(dir.child("latest.csv"));
    let cache = SnapshotCache::new(store.clone(), Duration::from_secs(600));
    (create_router(Arc::new(cache)), store)
}

async fn call(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let (status, bytes) = call_raw(app, method, uri).await;
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn call_raw(app: &Router, method: &str, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn missing_snapshot_renders_empty_state() {
    let dir = TempDir::new().unwrap();
    let (app, _) = app(&dir);

    let (status, body) = call(&app, "GET", "/dashboard").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["error"].as_str().unwrap().contains("not found"));
    assert_eq!(body["total_volume_label"], "$0");
    assert_eq!(body["table"].as_array().unwrap().len(), 0);

    let (status, body) = call(&app, "GET", "/metrics/aggregate").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_market_cap"], 0.0);
}

#[tokio::test]
async fn coin_lookup_without_snapshot_reports_the_load_error() {
    let dir = TempDir::new().unwrap();
    let (app, _) = app(&dir);

    let (status, body) = call_raw(&app, "GET", "/coin/BTC/latest").await;
    let body = String::from_utf8(body).unwrap();

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("latest.csv"));
    assert!(body.contains("not found"));
    assert!(!body.contains("Symbol not found"));
}

#[tokio::test]
async fn serves_metrics_for_the_snapshot() {
    let dir = TempDir::new().unwrap();
    let (app, store) = app(&dir);
    store
        .append(&[
            quote("ETH", 2, -3.0, 1),
            quote("BTC", 1, 2.5, 2),
            quote("SOL", 5, 9.0, 3),
        ])
        .unwrap();

    let (_, body) = call(&app, "GET", "/coins").await;
    let symbols: Vec<_> = body["coins"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["symbol"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(symbols, vec!["BTC", "ETH", "SOL"]);
    assert!(body.get("error").is_none());

    let (_, body) = call(&app, "GET", "/metrics/top").await;
    assert_eq!(body["gainers"][0]["symbol"], "SOL");
    assert_eq!(body["losers"][0]["symbol"], "ETH");

    let (_, body) = call(&app, "GET", "/metrics/aggregate").await;
    assert_eq!(body["total_volume_label"], "$3.0 M");

    let (status, body) = call(&app, "GET", "/coin/btc/latest").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cmc_rank"], 1);

    let (status, _) = call(&app, "GET", "/coin/XRP/latest").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comparison_validates_metric() {
    let dir = TempDir::new().unwrap();
    let (app, store) = app(&dir);
    store
        .append(&[quote("BTC", 1, 2.5, 1), quote("ETH", 2, -3.0, 2)])
        .unwrap();

    let (status, body) = call(&app, "GET", "/metrics/compare?symbols=eth,btc&metric=price").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metric"], "price");
    assert_eq!(body["points"][0]["symbol"], "BTC");
    assert_eq!(body["points"][1]["value"], 50.0);

    let (status, _) = call(&app, "GET", "/metrics/compare?metric=supply").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn comparison_keeps_mixed_case_symbols() {
    let dir = TempDir::new().unwrap();
    let (app, store) = app(&dir);
    store
        .append(&[quote("BTC", 1, 2.5, 1), quote("USDe", 4, 0.0, 2)])
        .unwrap();

    let (status, body) = call(&app, "GET", "/metrics/compare?symbols=USDe,BTC&metric=price").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbols"], serde_json::json!(["BTC", "USDe"]));
    assert_eq!(body["points"][1]["name"], "USDe coin");
    assert_eq!(body["points"][1]["value"], 25.0);
}

#[tokio::test]
async fn refresh_drops_the_cached_snapshot() {
    let dir = TempDir::new().unwrap();
    let (app, store) = app(&dir);
    store.append(&[quote("BTC", 1, 1.0, 1)]).unwrap();

    let (_, body) = call(&app, "GET", "/coins").await;
    assert_eq!(body["coins"].as_array().unwrap().len(), 1);

    store
        .append(&[quote("BTC", 1, 1.0, 2), quote("ETH", 2, 1.0, 2)])
        .unwrap();
    let (_, body) = call(&app, "GET", "/coins").await;
    assert_eq!(body["coins"].as_array().unwrap().len(), 1);

    let (status, body) = call(&app, "POST", "/refresh").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["invalidated"], true);

    let (_, body) = call(&app, "GET", "/coins").await;
    assert_eq!(body["coins"].as_array().unwrap().len(), 2);
}

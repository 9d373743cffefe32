use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Result,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::SharedCache;
use crate::dashboard::{default_comparison, Comparison, DashboardSummary};
use crate::error::StoreError;
use crate::metrics::{aggregate, format_magnitude, rankings, LatestView, Metric, Rankings};
use crate::model::{
    AggregateResponse, AssetQuote, CoinsResponse, HealthResponse, HistoryResponse,
    RefreshResponse, WithStatus,
};

/// Load failures degrade to an empty view plus a message for the page.
async fn load_view(cache: &SharedCache) -> (Arc<LatestView>, Option<String>) {
    match cache.get().await {
        Ok(view) => (view, None),
        Err(err) => {
            tracing::error!("Failed to load snapshot: {}", err);
            (Arc::new(LatestView::default()), Some(err.to_string()))
        }
    }
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

#[derive(Debug, Deserialize)]
pub struct CoinsQuery {
    limit: Option<usize>,
}

pub async fn get_coins(
    Query(params): Query<CoinsQuery>,
    State(cache): State<SharedCache>,
) -> Json<CoinsResponse> {
    let (view, error) = load_view(&cache).await;
    let limit = params.limit.unwrap_or(usize::MAX);

    Json(CoinsResponse {
        coins: view.by_rank().into_iter().take(limit).cloned().collect(),
        error,
    })
}

pub async fn get_coin_latest(
    Path(symbol): Path<String>,
    State(cache): State<SharedCache>,
) -> Result<Json<AssetQuote>, (StatusCode, String)> {
    let (view, error) = load_view(&cache).await;

    match (view.get(&symbol), error) {
        (Some(coin), _) => Ok(Json(coin.clone())),
        (None, Some(error)) => Err((StatusCode::NOT_FOUND, error)),
        (None, None) => Err((StatusCode::NOT_FOUND, "Symbol not found".to_string())),
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    limit: Option<usize>,
}

pub async fn get_coin_history(
    Path(symbol): Path<String>,
    Query(params): Query<HistoryQuery>,
    State(cache): State<SharedCache>,
) -> Json<HistoryResponse> {
    let limit = params.limit.unwrap_or(500).min(2000);

    let (mut rows, error) = match cache.store().load_history() {
        Ok(rows) => (rows, None),
        Err(StoreError::NotFound(_)) => (Vec::new(), None),
        Err(err) => {
            tracing::error!("Failed to get history for {}: {}", symbol, err);
            (Vec::new(), Some(err.to_string()))
        }
    };

    rows.retain(|r| r.symbol.eq_ignore_ascii_case(&symbol));
    rows.sort_by_key(|r| r.last_updated);
    let skip = rows.len().saturating_sub(limit);

    Json(HistoryResponse {
        series: rows
            .into_iter()
            .skip(skip)
            .map(|r| (r.last_updated, r.price))
            .collect(),
        symbol,
        error,
    })
}

pub async fn get_aggregate(State(cache): State<SharedCache>) -> Json<AggregateResponse> {
    let (view, error) = load_view(&cache).await;
    let totals = aggregate(&view);

    Json(AggregateResponse {
        total_volume: totals.total_volume,
        total_market_cap: totals.total_market_cap,
        total_volume_label: format!("${}", format_magnitude(totals.total_volume)),
        total_market_cap_label: format!("${}", format_magnitude(totals.total_market_cap)),
        error,
    })
}

pub async fn get_top(State(cache): State<SharedCache>) -> Json<WithStatus<Rankings>> {
    let (view, error) = load_view(&cache).await;
    Json(WithStatus {
        data: rankings(&view),
        error,
    })
}

#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    symbols: Option<String>,
    metric: Option<String>,
}

pub async fn get_comparison(
    Query(params): Query<CompareQuery>,
    State(cache): State<SharedCache>,
) -> Result<Json<WithStatus<Comparison>>, (StatusCode, String)> {
    let metric = match params.metric.as_deref() {
        Some(raw) => raw
            .parse::<Metric>()
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?,
        None => Metric::default(),
    };

    let (view, error) = load_view(&cache).await;
    let comparison = match params.symbols.as_deref() {
        Some(raw) => {
            let symbols: Vec<String> = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            Comparison::build(&view, &symbols, metric)
        }
        None => Comparison::build(&view, &default_comparison(&view), metric),
    };

    Ok(Json(WithStatus {
        data: comparison,
        error,
    }))
}

pub async fn get_dashboard(State(cache): State<SharedCache>) -> Json<DashboardSummary> {
    match cache.get().await {
        Ok(view) => Json(DashboardSummary::build(&view)),
        Err(err) => {
            tracing::error!("Failed to load snapshot: {}", err);
            Json(DashboardSummary::unavailable(err.to_string()))
        }
    }
}

pub async fn refresh(State(cache): State<SharedCache>) -> Json<RefreshResponse> {
    cache.invalidate().await;
    Json(RefreshResponse { invalidated: true })
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical column order of the snapshot files.
pub const COLUMNS: [&str; 13] = [
    "id",
    "name",
    "symbol",
    "slug",
    "cmc_rank",
    "price",
    "volume_24h",
    "market_cap",
    "percent_change_1h",
    "percent_change_24h",
    "percent_change_7d",
    "last_updated",
    "pull_timestamp",
];

/// One asset as seen by one pull. Field order matches [`COLUMNS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetQuote {
    pub id: u64,
    pub name: String,
    pub symbol: String,
    pub slug: String,
    pub cmc_rank: u32,
    pub price: Option<f64>,
    pub volume_24h: Option<f64>,
    pub market_cap: Option<f64>,
    pub percent_change_1h: Option<f64>,
    pub percent_change_24h: Option<f64>,
    pub percent_change_7d: Option<f64>,
    #[serde(alias = "last_updated_utc+0")]
    pub last_updated: DateTime<Utc>,
    pub pull_timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub invalidated: bool,
}

#[derive(Debug, Serialize)]
pub struct CoinsResponse {
    pub coins: Vec<AssetQuote>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub symbol: String,
    pub series: Vec<(DateTime<Utc>, Option<f64>)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AggregateResponse {
    pub total_volume: f64,
    pub total_market_cap: f64,
    pub total_volume_label: String,
    pub total_market_cap_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Wraps a metrics payload with the load error that produced an empty one.
#[derive(Debug, Serialize)]
pub struct WithStatus<T> {
    #[serde(flatten)]
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

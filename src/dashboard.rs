use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::metrics::{
    aggregate, compare, format_magnitude, rankings, Aggregates, ComparisonPoint, LatestView,
    Metric, Rankings,
};
use crate::model::AssetQuote;

pub const DEFAULT_COMPARISON: [&str; 3] = ["BTC", "ETH", "SOL"];
pub const DEFAULT_HISTORICAL: &str = "BTC";

/// Everything the dashboard page renders, computed from one latest view.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub last_updated: Option<DateTime<Utc>>,
    pub last_updated_label: String,
    pub aggregates: Aggregates,
    pub total_volume_label: String,
    pub total_market_cap_label: String,
    pub rankings: Rankings,
    pub comparison: Comparison,
    pub historical_symbol: Option<String>,
    pub historical_chart_symbol: Option<String>,
    pub table: Vec<AssetQuote>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub metric: Metric,
    pub title: String,
    pub symbols: Vec<String>,
    pub points: Vec<ComparisonPoint>,
}

impl Comparison {
    pub fn build<S: AsRef<str>>(view: &LatestView, symbols: &[S], metric: Metric) -> Self {
        let points = compare(view, symbols, metric);
        Self {
            metric,
            title: format!("Comparison of {}", metric.display_name()),
            symbols: points.iter().map(|p| p.symbol.clone()).collect(),
            points,
        }
    }
}

impl DashboardSummary {
    pub fn build(view: &LatestView) -> Self {
        let aggregates = aggregate(view);
        let last_updated = view.rows().iter().map(|r| r.last_updated).max();

        let historical_symbol = view
            .get(DEFAULT_HISTORICAL)
            .or_else(|| view.rows().first())
            .map(|r| r.symbol.clone());

        Self {
            last_updated,
            last_updated_label: last_updated_label(last_updated),
            aggregates,
            total_volume_label: format!("${}", format_magnitude(aggregates.total_volume)),
            total_market_cap_label: format!("${}", format_magnitude(aggregates.total_market_cap)),
            rankings: rankings(view),
            comparison: Comparison::build(view, &default_comparison(view), Metric::default()),
            historical_chart_symbol: historical_symbol.as_deref().map(chart_symbol),
            historical_symbol,
            table: view.by_rank().into_iter().cloned().collect(),
            error: None,
        }
    }

    /// Empty state shown when the snapshot cannot be loaded.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Self::build(&LatestView::default())
        }
    }
}

/// Default comparison selection, limited to symbols present in the view.
pub fn default_comparison(view: &LatestView) -> Vec<&'static str> {
    DEFAULT_COMPARISON
        .into_iter()
        .filter(|s| view.rows().iter().any(|r| r.symbol == *s))
        .collect()
}

/// Pair identifier used by the embedded historical price chart.
pub fn chart_symbol(symbol: &str) -> String {
    format!("BINANCE:{}USDT", symbol.to_uppercase())
}

pub fn last_updated_label(last_updated: Option<DateTime<Utc>>) -> String {
    match last_updated {
        Some(ts) => format!("Last update: {} (UTC+0).", ts.format("%d %B %Y at %H:%M")),
        None => "Data update status is not available.".to_string(),
    }
}

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::AssetQuote;

pub const TOP_N: usize = 5;

const SUFFIXES: [&str; 6] = ["", "K", "M", "B", "T", "Q"];

/// Most recent row per symbol, ordered by `last_updated` ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatestView {
    rows: Vec<AssetQuote>,
}

impl LatestView {
    pub fn from_rows(mut rows: Vec<AssetQuote>) -> Self {
        rows.sort_by_key(|r| r.last_updated);

        let mut last_index = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            last_index.insert(row.symbol.clone(), i);
        }

        let rows = rows
            .into_iter()
            .enumerate()
            .filter(|(i, row)| last_index.get(&row.symbol) == Some(i))
            .map(|(_, row)| row)
            .collect();

        Self { rows }
    }

    pub fn rows(&self) -> &[AssetQuote] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, symbol: &str) -> Option<&AssetQuote> {
        self.rows
            .iter()
            .find(|r| r.symbol.eq_ignore_ascii_case(symbol))
    }

    /// Rows ordered by `cmc_rank`, as shown in the data table.
    pub fn by_rank(&self) -> Vec<&AssetQuote> {
        let mut rows: Vec<_> = self.rows.iter().collect();
        rows.sort_by_key(|r| r.cmc_rank);
        rows
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Aggregates {
    pub total_volume: f64,
    pub total_market_cap: f64,
}

pub fn aggregate(view: &LatestView) -> Aggregates {
    view.rows().iter().fold(Aggregates::default(), |acc, r| Aggregates {
        total_volume: acc.total_volume + r.volume_24h.unwrap_or(0.0),
        total_market_cap: acc.total_market_cap + r.market_cap.unwrap_or(0.0),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct Rankings {
    pub gainers: Vec<AssetQuote>,
    pub losers: Vec<AssetQuote>,
    pub volume: Vec<AssetQuote>,
    pub market_cap: Vec<AssetQuote>,
}

pub fn rankings(view: &LatestView) -> Rankings {
    Rankings {
        gainers: top_by(view, |r| r.percent_change_24h, true),
        losers: top_by(view, |r| r.percent_change_24h, false),
        volume: top_by(view, |r| r.volume_24h, true),
        market_cap: top_by(view, |r| r.market_cap, true),
    }
}

/// Stable sort on `key`; rows without a value go last in either direction.
pub fn top_by<F>(view: &LatestView, key: F, descending: bool) -> Vec<AssetQuote>
where
    F: Fn(&AssetQuote) -> Option<f64>,
{
    let mut rows: Vec<&AssetQuote> = view.rows().iter().collect();
    rows.sort_by(|a, b| match (key(a), key(b)) {
        (Some(x), Some(y)) if descending => y.total_cmp(&x),
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    rows.into_iter().take(TOP_N).cloned().collect()
}

/// Compact rendering with a K/M/B/T/Q suffix, one decimal place.
///
/// Values under 1000 keep an empty suffix after the separating space
/// (`42.0 `); zero renders as a bare `0`.
pub fn format_magnitude(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }

    let mut tier = 0;
    while tier + 1 < SUFFIXES.len() && value >= 1000f64.powi(tier as i32 + 1) {
        tier += 1;
    }

    let scaled = value / 1000f64.powi(tier as i32);
    format!("{:.1} {}", scaled, SUFFIXES[tier])
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Price,
    MarketCap,
    #[serde(rename = "volume_24h")]
    Volume24h,
    #[default]
    #[serde(rename = "percent_change_24h")]
    PercentChange24h,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Price,
        Metric::MarketCap,
        Metric::Volume24h,
        Metric::PercentChange24h,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Metric::Price => "price",
            Metric::MarketCap => "market_cap",
            Metric::Volume24h => "volume_24h",
            Metric::PercentChange24h => "percent_change_24h",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Metric::Price => "Price",
            Metric::MarketCap => "Market Cap",
            Metric::Volume24h => "Volume 24h",
            Metric::PercentChange24h => "Percent Change 24h",
        }
    }

    pub fn value(self, row: &AssetQuote) -> Option<f64> {
        match self {
            Metric::Price => row.price,
            Metric::MarketCap => row.market_cap,
            Metric::Volume24h => row.volume_24h,
            Metric::PercentChange24h => row.percent_change_24h,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown metric `{0}`")]
pub struct UnknownMetric(pub String);

impl FromStr for Metric {
    type Err = UnknownMetric;

    /// Accepts either the column name or the display name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Metric::ALL
            .into_iter()
            .find(|m| m.column() == s || m.display_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownMetric(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonPoint {
    pub name: String,
    pub symbol: String,
    pub value: Option<f64>,
}

/// Symbols match case-insensitively; upstream keeps mixed-case tickers
/// such as `USDe`.
pub fn compare<S: AsRef<str>>(
    view: &LatestView,
    symbols: &[S],
    metric: Metric,
) -> Vec<ComparisonPoint> {
    view.rows()
        .iter()
        .filter(|r| {
            symbols
                .iter()
                .any(|s| s.as_ref().eq_ignore_ascii_case(&r.symbol))
        })
        .map(|r| ComparisonPoint {
            name: r.name.clone(),
            symbol: r.symbol.clone(),
            value: metric.value(r),
        })
        .collect()
}

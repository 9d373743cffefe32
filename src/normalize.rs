use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::NormalizeError;
use crate::fetch::{RawBatch, QUOTE_CURRENCY};
use crate::model::AssetQuote;

/// Output of one normalization pass. Rows keep upstream order.
#[derive(Debug, Clone)]
pub struct NormalizedBatch {
    pub pull_timestamp: DateTime<Utc>,
    pub rows: Vec<AssetQuote>,
    pub skipped: Vec<SkippedRecord>,
    /// Ranks held by more than one row. Upstream promises unique ranks, so
    /// rows are kept as-is and the repeat is only reported.
    pub duplicate_ranks: Vec<u32>,
}

/// A raw record that was left out of the batch as a whole.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    pub index: usize,
    pub symbol: Option<String>,
    pub missing: &'static str,
}

pub fn normalize(batch: &RawBatch) -> Result<NormalizedBatch, NormalizeError> {
    let root = &batch.0;
    let records = root
        .get("data")
        .and_then(Value::as_array)
        .ok_or(NormalizeError::MissingField("data"))?;

    let raw_ts = root
        .get("status")
        .and_then(|s| s.get("timestamp"))
        .and_then(Value::as_str)
        .ok_or(NormalizeError::MissingField("status.timestamp"))?;
    let pull_timestamp = parse_utc(raw_ts).map_err(|source| NormalizeError::TimestampParse {
        field: "status.timestamp",
        value: raw_ts.to_string(),
        context: format!("batch of {} records", records.len()),
        source,
    })?;

    let mut rows = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();

    for (index, record) in records.iter().enumerate() {
        match parse_record(record, pull_timestamp)? {
            Ok(row) => rows.push(row),
            Err(missing) => {
                let symbol = record.get("symbol").and_then(Value::as_str).map(str::to_string);
                warn!(
                    "skipping record {} ({}): missing {}",
                    index,
                    symbol.as_deref().unwrap_or("?"),
                    missing
                );
                skipped.push(SkippedRecord {
                    index,
                    symbol,
                    missing,
                });
            }
        }
    }

    let duplicate_ranks = duplicate_ranks(&rows);
    if !duplicate_ranks.is_empty() {
        warn!("cmc_rank repeated within batch: {:?}", duplicate_ranks);
    }

    info!(
        "normalized {} rows ({} skipped) pulled at {}",
        rows.len(),
        skipped.len(),
        pull_timestamp
    );

    Ok(NormalizedBatch {
        pull_timestamp,
        rows,
        skipped,
        duplicate_ranks,
    })
}

/// Each repeated rank once, in order of its first repeat.
fn duplicate_ranks(rows: &[AssetQuote]) -> Vec<u32> {
    let mut seen = HashSet::with_capacity(rows.len());
    let mut repeated = Vec::new();
    for row in rows {
        if !seen.insert(row.cmc_rank) && !repeated.contains(&row.cmc_rank) {
            repeated.push(row.cmc_rank);
        }
    }
    repeated
}

/// Outer `Err` aborts the batch, inner `Err` names the field that got the
/// record dropped.
fn parse_record(
    v: &Value,
    pull_timestamp: DateTime<Utc>,
) -> Result<Result<AssetQuote, &'static str>, NormalizeError> {
    macro_rules! require {
        ($e:expr, $field:literal) => {
            match $e {
                Some(x) => x,
                None => return Ok(Err($field)),
            }
        };
    }

    let id = require!(v.get("id").and_then(Value::as_u64), "id");
    let name = require!(v.get("name").and_then(Value::as_str), "name");
    let symbol = require!(v.get("symbol").and_then(Value::as_str), "symbol");
    let slug = require!(v.get("slug").and_then(Value::as_str), "slug");
    let cmc_rank = require!(
        v.get("cmc_rank")
            .and_then(Value::as_u64)
            .filter(|r| *r > 0)
            .and_then(|r| u32::try_from(r).ok()),
        "cmc_rank"
    );
    let quote = require!(
        v.get("quote").and_then(|q| q.get(QUOTE_CURRENCY)),
        "quote.USD"
    );
    let raw_updated = require!(
        quote.get("last_updated").and_then(Value::as_str),
        "quote.USD.last_updated"
    );

    let last_updated = parse_utc(raw_updated).map_err(|source| NormalizeError::TimestampParse {
        field: "quote.USD.last_updated",
        value: raw_updated.to_string(),
        context: format!("symbol {symbol}"),
        source,
    })?;

    Ok(Ok(AssetQuote {
        id,
        name: name.to_string(),
        symbol: symbol.to_string(),
        slug: slug.to_string(),
        cmc_rank,
        price: amount(quote, "price"),
        volume_24h: amount(quote, "volume_24h"),
        market_cap: amount(quote, "market_cap"),
        percent_change_1h: change(quote, "percent_change_1h"),
        percent_change_24h: change(quote, "percent_change_24h"),
        percent_change_7d: change(quote, "percent_change_7d"),
        last_updated,
        pull_timestamp,
    }))
}

fn change(quote: &Value, key: &str) -> Option<f64> {
    quote.get(key).and_then(Value::as_f64).filter(|x| x.is_finite())
}

fn amount(quote: &Value, key: &str) -> Option<f64> {
    change(quote, key).filter(|x| *x >= 0.0)
}

fn parse_utc(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
}

use std::num::NonZeroU32;

use tracing::info;

use crate::error::Error;
use crate::export::SnapshotStore;
use crate::fetch::ListingsClient;
use crate::normalize::{normalize, NormalizedBatch};

/// One scheduled pull: fetch, normalize, store. The store is only touched
/// once the batch has been fetched and normalized successfully.
pub async fn run_ingestion(
    client: &ListingsClient,
    store: &SnapshotStore,
    limit: NonZeroU32,
) -> Result<NormalizedBatch, Error> {
    let raw = client.fetch(limit).await?;
    let batch = normalize(&raw)?;
    store.append(&batch.rows)?;

    info!(
        "ingestion finished: {} rows stored, {} skipped, pull {}",
        batch.rows.len(),
        batch.skipped.len(),
        batch.pull_timestamp
    );
    Ok(batch)
}

use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::export::SnapshotStore;
use crate::fetch::DEFAULT_BASE_URL;

#[derive(Debug, Parser)]
#[command(name = "crypto_dashboard", version, about = "CoinMarketCap snapshot ingestion and dashboard metrics")]
pub struct Cli {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch one batch of listings and replace the latest snapshot
    Ingest(IngestArgs),
    /// Print the dashboard metrics for the current snapshot
    Summary,
    /// Serve the dashboard API
    Serve(ServeArgs),
}

#[derive(Debug, Clone, Args)]
pub struct StoreArgs {
    /// File holding the most recent batch
    #[arg(long, env = "LATEST_DATA_PATH", default_value = "latest-data/latest_data.csv")]
    pub latest_path: PathBuf,

    /// File accumulating every batch; history is not kept when unset
    #[arg(long, env = "HISTORY_DATA_PATH")]
    pub history_path: Option<PathBuf>,
}

impl StoreArgs {
    pub fn store(&self) -> SnapshotStore {
        let store = SnapshotStore::new(&self.latest_path);
        match &self.history_path {
            Some(history) => store.with_history(history),
            None => store,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct IngestArgs {
    #[arg(long, env = "CMC_PRO_API_KEY", hide_env_values = true)]
    pub api_key: String,

    #[arg(long, env = "CMC_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Number of listings to request
    #[arg(long, env = "CMC_LIMIT", default_value = "100")]
    pub limit: NonZeroU32,

    #[arg(long, env = "CMC_TIMEOUT_SECS", default_value_t = 20)]
    pub timeout_secs: u64,
}

impl IngestArgs {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Seconds a loaded snapshot is reused before the file is read again
    #[arg(long, env = "CACHE_TTL_SECS", default_value_t = 360)]
    pub cache_ttl_secs: u64,
}

impl ServeArgs {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "crypto_dashboard",
            "--latest-path",
            "/tmp/latest.csv",
            "--history-path",
            "/tmp/history.csv",
            "ingest",
            "--api-key",
            "k",
            "--limit",
            "25",
        ])
        .unwrap();

        assert_eq!(cli.store.store().history_path(), Some(PathBuf::from("/tmp/history.csv").as_path()));
        match cli.command {
            Command::Ingest(args) => {
                assert_eq!(args.limit.get(), 25);
                assert_eq!(args.api_key, "k");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn zero_limit_is_rejected() {
        let parsed = Cli::try_parse_from([
            "crypto_dashboard",
            "ingest",
            "--api-key",
            "k",
            "--limit",
            "0",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn serve_defaults() {
        let cli = Cli::try_parse_from(["crypto_dashboard", "serve"]).unwrap();
        match cli.command {
            Command::Serve(args) => {
                assert_eq!(args.cache_ttl(), Duration::from_secs(360));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}

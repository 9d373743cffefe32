use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crypto_dashboard::{
    api,
    config::{Cli, Command},
    dashboard::DashboardSummary,
    run_ingestion, AssetQuote, LatestView, ListingsClient, SnapshotCache,
};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let store = cli.store.store();

    match cli.command {
        Command::Ingest(args) => {
            for path in std::iter::once(store.latest_path()).chain(store.history_path()) {
                if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                    std::fs::create_dir_all(dir)
                        .with_context(|| format!("cannot create {}", dir.display()))?;
                }
            }

            let client = ListingsClient::new(&args.base_url, &args.api_key, args.timeout())?;
            let batch = run_ingestion(&client, &store, args.limit)
                .await
                .context("ingestion run aborted, snapshot left unchanged")?;

            print_table(&batch.rows);
            println!(
                "\n{} rows saved to: {} ({} skipped)",
                batch.rows.len(),
                store.latest_path().display(),
                batch.skipped.len()
            );
        }
        Command::Summary => {
            let summary = match store.load_all() {
                Ok(rows) => DashboardSummary::build(&LatestView::from_rows(rows)),
                Err(err) => DashboardSummary::unavailable(err.to_string()),
            };
            print_summary(&summary);
        }
        Command::Serve(args) => {
            let cache = SnapshotCache::new(store, args.cache_ttl());
            api::start_server(cache, args.port).await?;
        }
    }

    Ok(())
}

fn opt(value: Option<f64>, fmt: impl Fn(f64) -> String) -> String {
    value.map(fmt).unwrap_or_else(|| "-".into())
}

fn print_table(rows: &[AssetQuote]) {
    println!(
        "{:<5} {:<18} {:<8} {:>14} {:>16} {:>16} {:>10}",
        "Rank", "Name", "Symbol", "Price(USD)", "MktCap(USD)", "Vol24h(USD)", "24h%"
    );
    println!("{}", "-".repeat(96));
    for r in rows {
        println!(
            "{:<5} {:<18} {:<8} {:>14} {:>16} {:>16} {:>10}",
            r.cmc_rank,
            r.name,
            r.symbol,
            opt(r.price, |x| format!("{:.2}", x)),
            opt(r.market_cap, |x| format!("{:.0}", x)),
            opt(r.volume_24h, |x| format!("{:.0}", x)),
            opt(r.percent_change_24h, |x| format!("{:+.2}", x)),
        );
    }
}

fn print_summary(summary: &DashboardSummary) {
    if let Some(err) = &summary.error {
        println!("Data not available: {}", err);
        return;
    }

    println!("{}", summary.last_updated_label);
    println!("\nTotal Trading Volume (24h): {}", summary.total_volume_label);
    println!("Total Market Cap:           {}", summary.total_market_cap_label);

    let lists = [
        ("Top 5 Daily Gainers", &summary.rankings.gainers),
        ("Top 5 Daily Losers", &summary.rankings.losers),
    ];
    for (title, rows) in lists {
        println!("\n{}", title);
        for r in rows {
            println!(
                "  {:<24} {:>10}",
                format!("{} ({})", r.name, r.symbol),
                opt(r.percent_change_24h, |x| format!("{:.2}%", x))
            );
        }
    }

    let lists = [
        ("Top 5 Trading Volume", &summary.rankings.volume, true),
        ("Top 5 Biggest Market Cap", &summary.rankings.market_cap, false),
    ];
    for (title, rows, by_volume) in lists {
        println!("\n{}", title);
        for r in rows {
            let value = if by_volume { r.volume_24h } else { r.market_cap };
            println!(
                "  {:<24} {:>10}",
                format!("{} ({})", r.name, r.symbol),
                opt(value, |x| format!("${}", crypto_dashboard::format_magnitude(x)))
            );
        }
    }

    println!("\n{}", summary.comparison.title);
    for p in &summary.comparison.points {
        println!("  {:<24} {:>14}", p.name, opt(p.value, |x| format!("{:.2}", x)));
    }
}

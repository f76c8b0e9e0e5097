use anyhow::Result;
use tracing_subscriber::EnvFilter;

use eventfan::{Aggregator, AggregatorConfig, SearchParams};

/// Run one aggregated search from the command line and print the result
/// as JSON: `eventfan [city] [category]`.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let params = SearchParams {
        city: args.next(),
        category: args.next(),
        limit: Some(20),
        ..Default::default()
    };

    let aggregator = Aggregator::new(&AggregatorConfig::from_env());
    let events = aggregator.search_events(&params).await;
    println!("{}", serde_json::to_string_pretty(&events)?);
    Ok(())
}

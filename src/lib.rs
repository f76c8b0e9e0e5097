//! Multi-source event search.
//!
//! Fans one search request out to every configured ticketing source,
//! normalizes the responses into a single canonical record, deduplicates
//! across sources, and ranks by distance or date. Sources fail
//! independently; with none available a local seed dataset keeps the
//! surface alive.

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod models;
pub mod pricing;
pub mod providers;
pub mod seed;

pub use aggregator::Aggregator;
pub use config::AggregatorConfig;
pub use models::{Category, Coordinates, Event, EventId, Location, SearchParams, Source};
pub use pricing::{dynamic_price, pricing_window, DemandLevel, PricingWindow, Quote};
pub use providers::{EventProvider, ProviderError};

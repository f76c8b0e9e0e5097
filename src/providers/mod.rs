pub mod base;
pub mod eventbrite;
pub mod seatgeek;
pub mod ticketmaster;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::AggregatorConfig;
use crate::models::{Event, SearchParams, Source};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("rate limited after {attempts} attempts: {url}")]
    RateLimited { attempts: u32, url: String },
    #[error("http status {status} for {url}")]
    Http {
        status: reqwest::StatusCode,
        url: String,
    },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One external ticketing source, translated into the canonical schema.
///
/// `search` builds the source-specific query from whichever params the
/// upstream supports and must return fully-populated records. Sources
/// without a single-item endpoint keep the default `get_event`.
#[async_trait]
pub trait EventProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn source(&self) -> Source;

    async fn search(&self, params: &SearchParams) -> Result<Vec<Event>, ProviderError>;

    async fn get_event(&self, native_id: &str) -> Result<Option<Event>, ProviderError> {
        let _ = native_id;
        Ok(None)
    }
}

/// Build one adapter per configured credential. An empty result means the
/// aggregator serves the seed dataset instead.
pub fn from_config(config: &AggregatorConfig) -> Vec<Arc<dyn EventProvider>> {
    let mut providers: Vec<Arc<dyn EventProvider>> = Vec::new();

    if let Some(api_key) = &config.ticketmaster_api_key {
        providers.push(Arc::new(ticketmaster::Ticketmaster::new(api_key.clone())));
    }
    if let Some(token) = &config.eventbrite_token {
        providers.push(Arc::new(eventbrite::Eventbrite::new(token.clone())));
    }
    if let Some(client_id) = &config.seatgeek_client_id {
        providers.push(Arc::new(seatgeek::SeatGeek::new(client_id.clone())));
    }

    providers
}

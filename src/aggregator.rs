use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Local};
use futures::future::join_all;
use tracing::{info, warn};

use crate::cache;
use crate::config::AggregatorConfig;
use crate::models::{Coordinates, Event, EventId, SearchParams};
use crate::providers::{self, base, EventProvider};
use crate::seed;

pub const DEFAULT_LIMIT: usize = 50;
const CACHE_MAX_AGE_MINUTES: i64 = 15;

/// Fans a search out to every configured source, merges the survivors,
/// deduplicates, ranks, and truncates. A failing source never fails the
/// whole call; with no sources at all the seed dataset is served instead.
pub struct Aggregator {
    providers: Vec<Arc<dyn EventProvider>>,
}

impl Aggregator {
    pub fn new(config: &AggregatorConfig) -> Self {
        let aggregator = Self {
            providers: providers::from_config(config),
        };
        info!(
            providers = ?aggregator.configured_providers(),
            "aggregator configured"
        );
        aggregator
    }

    /// Bypass credential wiring; used by tests and embedders with their
    /// own provider set.
    pub fn with_providers(providers: Vec<Arc<dyn EventProvider>>) -> Self {
        Self { providers }
    }

    /// Names of the active sources, for diagnostics only.
    pub fn configured_providers(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub async fn search_events(&self, params: &SearchParams) -> Vec<Event> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT);

        if self.providers.is_empty() {
            info!("no providers configured, serving seed dataset");
            return ranked_seed(params, limit);
        }

        let searches = self.providers.iter().map(|provider| {
            let provider = Arc::clone(provider);
            async move { (provider.name(), provider.search(params).await) }
        });

        let mut merged = Vec::new();
        let mut any_success = false;
        for (name, outcome) in join_all(searches).await {
            match outcome {
                Ok(mut events) => {
                    info!(provider = name, count = events.len(), "provider search ok");
                    any_success = true;
                    merged.append(&mut events);
                }
                Err(err) => {
                    warn!(provider = name, error = %err, "provider search failed, skipping");
                }
            }
        }

        // Every source down is treated like zero sources: availability
        // over freshness.
        if !any_success {
            warn!("all providers failed, serving seed dataset");
            return ranked_seed(params, limit);
        }

        let mut events = dedup(merged);
        rank(&mut events, params);
        events.truncate(limit);
        events
    }

    /// Single-item lookup. A tagged id routes to its own source first,
    /// then the remaining sources are tried in sequence, then the seed
    /// corpus. Absence is the only failure mode that reaches the caller.
    pub async fn get_event_by_id(&self, id: &str) -> Option<Event> {
        let tagged: Option<EventId> = id.parse().ok();

        if let Some(tagged) = &tagged {
            if let Some(provider) = self
                .providers
                .iter()
                .find(|p| p.source() == tagged.source)
            {
                match provider.get_event(&tagged.native_id).await {
                    Ok(Some(event)) => return Some(event),
                    Ok(None) => {}
                    Err(err) => {
                        warn!(provider = provider.name(), error = %err, "lookup failed")
                    }
                }
            }
        }

        for provider in &self.providers {
            if let Some(tagged) = &tagged {
                if tagged.source == provider.source() {
                    continue;
                }
            }
            let native = tagged
                .as_ref()
                .map(|t| t.native_id.as_str())
                .unwrap_or(id);
            match provider.get_event(native).await {
                Ok(Some(event)) => return Some(event),
                Ok(None) => {}
                Err(err) => warn!(provider = provider.name(), error = %err, "lookup failed"),
            }
        }

        seed::find(id)
    }

    /// Search through the short-TTL store: entries younger than fifteen
    /// minutes are served as-is, anything else is fetched and written
    /// back. Store failures are logged and never surfaced.
    pub async fn cached_search(&self, store: &cache::Store, params: &SearchParams) -> Vec<Event> {
        let city = params.city.clone().unwrap_or_default();
        let category = params.category.clone().unwrap_or_default();
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT);

        match store.get_fresh(&city, &category, Duration::minutes(CACHE_MAX_AGE_MINUTES)) {
            Ok(Some(mut events)) => {
                info!(%city, %category, "cache hit");
                events.truncate(limit);
                return events;
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "cache read failed"),
        }

        let events = self.search_events(params).await;
        if let Err(err) = store.put(&city, &category, &events) {
            warn!(error = %err, "cache write failed");
        }
        events
    }
}

fn ranked_seed(params: &SearchParams, limit: usize) -> Vec<Event> {
    let mut events = seed::all().to_vec();
    rank(&mut events, params);
    events.truncate(limit);
    events
}

/// Drop duplicates across sources by normalized (title, venue, date).
/// First seen wins. The key is a heuristic: near-duplicates with different
/// formatting survive, and that is accepted.
pub fn dedup(events: Vec<Event>) -> Vec<Event> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(events.len());
    for event in events {
        if seen.insert(dedup_key(&event)) {
            out.push(event);
        }
    }
    out
}

fn dedup_key(event: &Event) -> String {
    format!(
        "{}|{}|{}",
        normalize_key_part(&event.title),
        normalize_key_part(&event.venue),
        event.date
    )
}

fn normalize_key_part(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Relevance order: ascending distance when the caller is geo-located,
/// otherwise ascending event date with unparseable dates pinned to today.
fn rank(events: &mut [Event], params: &SearchParams) {
    if let (Some(lat), Some(lng)) = (params.lat, params.lng) {
        let origin = Coordinates { lat, lng };
        events.sort_by(|a, b| {
            let da = base::haversine_miles(origin, a.location.coordinates);
            let db = base::haversine_miles(origin, b.location.coordinates);
            da.partial_cmp(&db).unwrap_or(Ordering::Equal)
        });
    } else {
        let today = Local::now().date_naive();
        events.sort_by_cached_key(|event| base::parse_display_date(&event.date).unwrap_or(today));
    }
}

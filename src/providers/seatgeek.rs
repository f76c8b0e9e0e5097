use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::{StatusCode, Url};
use serde_json::Value;

use super::base;
use super::{EventProvider, ProviderError};
use crate::models::{Category, Coordinates, Event, EventId, Location, SearchParams, Source};

const BASE_URL: &str = "https://api.seatgeek.com/2";
const PROVIDER_NAME: &str = "seatgeek";
const DEFAULT_CATEGORY: Category = Category::Concerts;
const DEFAULT_TIME: &str = "19:30";
const MAX_PAGE_SIZE: usize = 100;

/// Marketplace source. Numeric native ids; listing price comes from the
/// marketplace floor (`stats.lowest_price`), so it is never exact.
pub struct SeatGeek {
    client_id: String,
}

impl SeatGeek {
    pub fn new(client_id: String) -> Self {
        Self { client_id }
    }

    fn search_url(&self, params: &SearchParams) -> Url {
        let mut url = Url::parse(&format!("{BASE_URL}/events")).expect("valid base url");
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &self.client_id);

            if let Some(city) = &params.city {
                query.append_pair("venue.city", city);
            }
            if let (Some(lat), Some(lng)) = (params.lat, params.lng) {
                query.append_pair("lat", &lat.to_string());
                query.append_pair("lon", &lng.to_string());
                let radius = params.radius.unwrap_or(25);
                query.append_pair("range", &format!("{radius}mi"));
            }
            if let Some(category) = &params.category {
                if let Some(taxonomy) = taxonomy_name(category) {
                    query.append_pair("taxonomies.name", taxonomy);
                }
            }
            if let Some(start) = &params.start_date {
                query.append_pair("datetime_local.gte", start);
            }
            if let Some(end) = &params.end_date {
                query.append_pair("datetime_local.lte", end);
            }
            let per_page = params.limit.unwrap_or(50).min(MAX_PAGE_SIZE);
            query.append_pair("per_page", &per_page.to_string());
        }
        url
    }
}

fn taxonomy_name(category: &str) -> Option<&'static str> {
    match category.to_lowercase().as_str() {
        "concerts" | "music" => Some("concert"),
        "sports" => Some("sports"),
        "theatre" => Some("theater"),
        "comedy" => Some("comedy"),
        "festivals" => Some("music_festival"),
        "exhibitions" => Some("museum"),
        "nightlife" => Some("club_passes"),
        _ => None,
    }
}

#[async_trait]
impl EventProvider for SeatGeek {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn source(&self) -> Source {
        Source::Seatgeek
    }

    async fn search(&self, params: &SearchParams) -> Result<Vec<Event>, ProviderError> {
        let payload = base::fetch_json(base::http_client(), self.search_url(params)).await?;

        let events = payload
            .get("events")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(map_event).collect())
            .unwrap_or_default();

        Ok(events)
    }

    async fn get_event(&self, native_id: &str) -> Result<Option<Event>, ProviderError> {
        let mut url = Url::parse(&format!("{BASE_URL}/events/{native_id}")).expect("valid base url");
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id);

        match base::fetch_json(base::http_client(), url).await {
            Ok(payload) => Ok(map_event(&payload)),
            Err(ProviderError::Http { status, .. }) if status == StatusCode::NOT_FOUND => Ok(None),
            Err(err) => Err(err),
        }
    }
}

fn map_event(item: &Value) -> Option<Event> {
    // SeatGeek ids are bare numbers on the wire.
    let native_id = item.get("id")?.as_u64()?.to_string();
    let title = item.get("title")?.as_str()?.to_string();

    let venue = item.get("venue");
    let venue_name = venue
        .and_then(|v| v.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("TBA")
        .to_string();
    let city = venue
        .and_then(|v| v.get("city"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let address = venue
        .and_then(|v| v.get("address"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let coordinates = venue
        .and_then(|v| v.get("location"))
        .and_then(|loc| {
            let lat = loc.get("lat")?.as_f64()?;
            let lng = loc.get("lon")?.as_f64()?;
            Some(Coordinates { lat, lng })
        })
        .unwrap_or(Coordinates::ZERO);

    let start_local = item
        .get("datetime_local")
        .and_then(Value::as_str)
        .and_then(|raw| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").ok());
    let date = start_local
        .map(|dt| base::display_date(dt.date()))
        .unwrap_or_else(|| "TBA".to_string());
    let time = start_local
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_else(|| DEFAULT_TIME.to_string());

    let price = item
        .get("stats")
        .and_then(|stats| stats.get("lowest_price"))
        .and_then(Value::as_f64)
        .map(|lowest| lowest.round() as u32)
        .unwrap_or(base::FALLBACK_PRICE);

    let category = item
        .get("taxonomies")
        .and_then(|list| list.get(0))
        .and_then(|t| t.get("name"))
        .and_then(Value::as_str)
        .map(|raw| base::normalize_category(&raw.replace('_', " "), DEFAULT_CATEGORY))
        .unwrap_or(DEFAULT_CATEGORY);

    let image = item
        .get("performers")
        .and_then(|list| list.get(0))
        .and_then(|p| p.get("image"))
        .and_then(Value::as_str)
        .unwrap_or(base::STOCK_IMAGE)
        .to_string();

    let sold_percentage = base::synthetic_sold_percentage();
    let days_until = start_local
        .map(|dt| base::days_until(dt.date()))
        .unwrap_or(i64::MAX);
    let tag = base::promo_tag(days_until, price, sold_percentage, false);

    let description = item
        .get("description")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_string);

    Some(Event {
        id: EventId::new(Source::Seatgeek, native_id),
        title,
        venue: venue_name,
        location: Location {
            city,
            address,
            coordinates,
        },
        date,
        time,
        price,
        category,
        image,
        tag,
        sold_percentage,
        sold_estimated: true,
        description,
    })
}

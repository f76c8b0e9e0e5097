use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Url;
use serde_json::Value;

use super::base;
use super::{EventProvider, ProviderError};
use crate::models::{Category, Coordinates, Event, EventId, Location, SearchParams, Source};

const BASE_URL: &str = "https://www.eventbriteapi.com/v3";
const PROVIDER_NAME: &str = "eventbrite";
const DEFAULT_CATEGORY: Category = Category::Concerts;
const DEFAULT_TIME: &str = "18:00";
const FALLBACK_PRICE: u32 = 20;

/// Listings source. Searches by address text only; geo params are ignored
/// entirely because the upstream has no radius filter worth trusting.
/// No usable single-item endpoint, so `get_event` stays at the default.
pub struct Eventbrite {
    token: String,
}

impl Eventbrite {
    pub fn new(token: String) -> Self {
        Self { token }
    }

    fn search_url(&self, params: &SearchParams) -> Url {
        let mut url = Url::parse(&format!("{BASE_URL}/events/search/")).expect("valid base url");
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("token", &self.token);
            query.append_pair("expand", "venue");

            if let Some(city) = &params.city {
                query.append_pair("location.address", city);
            }
            if let Some(category) = &params.category {
                if let Some(id) = category_id(category) {
                    query.append_pair("categories", id);
                }
            }
            if let Some(start) = &params.start_date {
                query.append_pair("start_date.range_start", start);
            }
            if let Some(end) = &params.end_date {
                query.append_pair("start_date.range_end", end);
            }
        }
        url
    }
}

/// Eventbrite category ids are numeric; anything outside the table is left
/// unfiltered rather than guessed. Comedy, festivals, and nightlife have no
/// top-level id of their own upstream, so they search unfiltered too.
fn category_id(category: &str) -> Option<&'static str> {
    match category.to_lowercase().as_str() {
        "concerts" | "music" => Some("103"),
        "sports" => Some("108"),
        "theatre" | "performing arts" => Some("105"),
        "exhibitions" => Some("105"),
        _ => None,
    }
}

#[async_trait]
impl EventProvider for Eventbrite {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn source(&self) -> Source {
        Source::Eventbrite
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
}

fn map_event(item: &Value) -> Option<Event> {
    let native_id = item.get("id")?.as_str()?.to_string();
    let title = item
        .get("name")?
        .get("text")?
        .as_str()
        .filter(|text| !text.is_empty())?
        .to_string();

    let venue = item.get("venue");
    let venue_name = venue
        .and_then(|v| v.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("TBA")
        .to_string();
    let city = venue
        .and_then(|v| v.get("address"))
        .and_then(|a| a.get("city"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let address = venue
        .and_then(|v| v.get("address"))
        .and_then(|a| a.get("localized_address_display"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let coordinates = venue
        .and_then(|v| {
            let lat = v.get("latitude")?.as_str()?.parse::<f64>().ok()?;
            let lng = v.get("longitude")?.as_str()?.parse::<f64>().ok()?;
            Some(Coordinates { lat, lng })
        })
        .unwrap_or(Coordinates::ZERO);

    let start_local = item
        .get("start")
        .and_then(|s| s.get("local"))
        .and_then(Value::as_str)
        .and_then(|raw| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").ok());
    let date = start_local
        .map(|dt| base::display_date(dt.date()))
        .unwrap_or_else(|| "TBA".to_string());
    let time = start_local
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_else(|| DEFAULT_TIME.to_string());

    let is_free = item
        .get("is_free")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let price = if is_free {
        0
    } else {
        item.get("ticket_availability")
            .and_then(|t| t.get("minimum_ticket_price"))
            .and_then(|p| p.get("display"))
            .and_then(Value::as_str)
            .map(|text| base::parse_price(text, FALLBACK_PRICE))
            .unwrap_or(FALLBACK_PRICE)
    };

    let category = item
        .get("category")
        .and_then(|c| c.get("name"))
        .and_then(Value::as_str)
        .map(|raw| base::normalize_category(raw, DEFAULT_CATEGORY))
        .unwrap_or(DEFAULT_CATEGORY);

    let image = item
        .get("logo")
        .and_then(|logo| logo.get("url"))
        .and_then(Value::as_str)
        .unwrap_or(base::STOCK_IMAGE)
        .to_string();

    let sold_percentage = base::synthetic_sold_percentage();
    let days_until = start_local
        .map(|dt| base::days_until(dt.date()))
        .unwrap_or(i64::MAX);
    let tag = base::promo_tag(days_until, price, sold_percentage, false);

    let description = item
        .get("summary")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_string);

    Some(Event {
        id: EventId::new(Source::Eventbrite, native_id),
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

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{StatusCode, Url};
use serde_json::Value;

use super::base;
use super::{EventProvider, ProviderError};
use crate::models::{Category, Coordinates, Event, EventId, Location, SearchParams, Source};

const BASE_URL: &str = "https://app.ticketmaster.com/discovery/v2";
const PROVIDER_NAME: &str = "ticketmaster";
const DEFAULT_CATEGORY: Category = Category::Concerts;
const DEFAULT_TIME: &str = "19:00";
const MAX_PAGE_SIZE: usize = 200;

/// Ticket-inventory source. Geo filtering requires lat, lng and radius
/// together; anything partial is dropped rather than half-applied.
pub struct Ticketmaster {
    api_key: String,
}

impl Ticketmaster {
    pub fn new(api_key: String) -> Self {
        Self { api_key }
    }

    fn search_url(&self, params: &SearchParams) -> Url {
        let mut url = Url::parse(&format!("{BASE_URL}/events.json")).expect("valid base url");
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("apikey", &self.api_key);

            if let Some(city) = &params.city {
                query.append_pair("city", city);
            }
            if let (Some(lat), Some(lng), Some(radius)) = (params.lat, params.lng, params.radius) {
                query.append_pair("latlong", &format!("{lat},{lng}"));
                query.append_pair("radius", &radius.to_string());
                query.append_pair("unit", "miles");
            }
            if let Some(category) = &params.category {
                query.append_pair("classificationName", category);
            }
            if let Some(start) = &params.start_date {
                query.append_pair("startDateTime", start);
            }
            if let Some(end) = &params.end_date {
                query.append_pair("endDateTime", end);
            }
            let size = params.limit.unwrap_or(50).min(MAX_PAGE_SIZE);
            query.append_pair("size", &size.to_string());
        }
        url
    }
}

#[async_trait]
impl EventProvider for Ticketmaster {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn source(&self) -> Source {
        Source::Ticketmaster
    }

    async fn search(&self, params: &SearchParams) -> Result<Vec<Event>, ProviderError> {
        let payload = base::fetch_json(base::http_client(), self.search_url(params)).await?;

        let events = payload
            .get("_embedded")
            .and_then(|embedded| embedded.get("events"))
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(map_event).collect())
            .unwrap_or_default();

        Ok(events)
    }

    async fn get_event(&self, native_id: &str) -> Result<Option<Event>, ProviderError> {
        let mut url =
            Url::parse(&format!("{BASE_URL}/events/{native_id}.json")).expect("valid base url");
        url.query_pairs_mut().append_pair("apikey", &self.api_key);

        match base::fetch_json(base::http_client(), url).await {
            Ok(payload) => Ok(map_event(&payload)),
            Err(ProviderError::Http { status, .. }) if status == StatusCode::NOT_FOUND => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// Map one Discovery API event object into the canonical schema. Records
/// missing an id or name are skipped; every other gap takes a default.
fn map_event(item: &Value) -> Option<Event> {
    let native_id = item.get("id")?.as_str()?.to_string();
    let title = item.get("name")?.as_str()?.to_string();

    let venue = item
        .get("_embedded")
        .and_then(|embedded| embedded.get("venues"))
        .and_then(|venues| venues.get(0));

    let venue_name = venue
        .and_then(|v| v.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("TBA")
        .to_string();
    let city = venue
        .and_then(|v| v.get("city"))
        .and_then(|c| c.get("name"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let address = venue
        .and_then(|v| v.get("address"))
        .and_then(|a| a.get("line1"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    // Discovery serves coordinates as strings; 0,0 on absence is a known
    // precision loss, not an error.
    let coordinates = venue
        .and_then(|v| v.get("location"))
        .and_then(|loc| {
            let lat = loc.get("latitude")?.as_str()?.parse::<f64>().ok()?;
            let lng = loc.get("longitude")?.as_str()?.parse::<f64>().ok()?;
            Some(Coordinates { lat, lng })
        })
        .unwrap_or(Coordinates::ZERO);

    let local_date = item
        .get("dates")
        .and_then(|d| d.get("start"))
        .and_then(|s| s.get("localDate"))
        .and_then(Value::as_str)
        .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok());
    let date = local_date
        .map(base::display_date)
        .unwrap_or_else(|| "TBA".to_string());
    let time = item
        .get("dates")
        .and_then(|d| d.get("start"))
        .and_then(|s| s.get("localTime"))
        .and_then(Value::as_str)
        .map(|raw| raw.chars().take(5).collect::<String>())
        .unwrap_or_else(|| DEFAULT_TIME.to_string());

    let price = item
        .get("priceRanges")
        .and_then(|ranges| ranges.get(0))
        .and_then(|range| range.get("min"))
        .and_then(Value::as_f64)
        .map(|min| min.round() as u32)
        .unwrap_or(base::FALLBACK_PRICE);

    let category = item
        .get("classifications")
        .and_then(|list| list.get(0))
        .and_then(|c| c.get("segment"))
        .and_then(|s| s.get("name"))
        .and_then(Value::as_str)
        .map(|raw| base::normalize_category(raw, DEFAULT_CATEGORY))
        .unwrap_or(DEFAULT_CATEGORY);

    let image = item
        .get("images")
        .and_then(|images| images.get(0))
        .and_then(|img| img.get("url"))
        .and_then(Value::as_str)
        .unwrap_or(base::STOCK_IMAGE)
        .to_string();

    let sold_out = item
        .get("dates")
        .and_then(|d| d.get("status"))
        .and_then(|s| s.get("code"))
        .and_then(Value::as_str)
        .map(|code| code == "soldout")
        .unwrap_or(false);
    let (sold_percentage, sold_estimated) = if sold_out {
        (100, false)
    } else {
        (base::synthetic_sold_percentage(), true)
    };

    let days_until = local_date.map(base::days_until).unwrap_or(i64::MAX);
    let tag = base::promo_tag(days_until, price, sold_percentage, sold_out);

    let description = item
        .get("info")
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(Event {
        id: EventId::new(Source::Ticketmaster, native_id),
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
        sold_estimated,
        description,
    })
}

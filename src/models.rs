use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which upstream produced a record.
///
/// Native id schemes differ per source (opaque strings for Ticketmaster,
/// numeric strings for Eventbrite and SeatGeek), so ids stay tagged with
/// their source instead of being conflated into one namespace.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Ticketmaster,
    Eventbrite,
    Seatgeek,
    Seed,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Ticketmaster => "ticketmaster",
            Source::Eventbrite => "eventbrite",
            Source::Seatgeek => "seatgeek",
            Source::Seed => "seed",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ticketmaster" => Ok(Source::Ticketmaster),
            "eventbrite" => Ok(Source::Eventbrite),
            "seatgeek" => Ok(Source::Seatgeek),
            "seed" => Ok(Source::Seed),
            other => Err(format!("unknown source: {other}")),
        }
    }
}

/// Event identifier, unique only within its source.
///
/// Rendered as `source:native_id` on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventId {
    pub source: Source,
    pub native_id: String,
}

impl EventId {
    pub fn new(source: Source, native_id: impl Into<String>) -> Self {
        Self {
            source,
            native_id: native_id.into(),
        }
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.native_id)
    }
}

impl FromStr for EventId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (source, native) = s
            .split_once(':')
            .ok_or_else(|| "missing source tag".to_string())?;
        if native.is_empty() {
            return Err("empty native id".to_string());
        }
        Ok(EventId {
            source: source.parse()?,
            native_id: native.to_string(),
        })
    }
}

impl From<EventId> for String {
    fn from(id: EventId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for EventId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Fixed category vocabulary all sources normalize into.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    Concerts,
    Sports,
    Theatre,
    Comedy,
    Festivals,
    Exhibitions,
    Nightlife,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Concerts => "Concerts",
            Category::Sports => "Sports",
            Category::Theatre => "Theatre",
            Category::Comedy => "Comedy",
            Category::Festivals => "Festivals",
            Category::Exhibitions => "Exhibitions",
            Category::Nightlife => "Nightlife",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub const ZERO: Coordinates = Coordinates { lat: 0.0, lng: 0.0 };
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Location {
    pub city: String,
    pub address: String,
    pub coordinates: Coordinates,
}

/// Canonical event record. Every field is populated on every record an
/// adapter returns; missing source data is resolved with the documented
/// default or synthetic substitute, never left absent.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub venue: String,
    pub location: Location,
    /// Short display date ("Mar 15"), localized and lossy by design.
    pub date: String,
    /// Display time, 24h "HH:MM" or the source default.
    pub time: String,
    pub price: u32,
    pub category: Category,
    pub image: String,
    pub tag: Option<String>,
    pub sold_percentage: u8,
    /// True when `sold_percentage` is a synthesized placeholder rather than
    /// a figure reported by the source.
    pub sold_estimated: bool,
    pub description: Option<String>,
}

impl Event {
    /// Matches either the full tagged form ("seatgeek:512") or a bare
    /// native id, for last-resort lookups against the seed corpus.
    pub fn id_matches(&self, raw: &str) -> bool {
        self.id.to_string() == raw || self.id.native_id == raw
    }
}

/// Caller-facing search request. Each adapter maps the subset of these
/// its upstream supports into source-specific query parameters.
#[derive(Clone, Debug, Default)]
pub struct SearchParams {
    pub city: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius: Option<u32>,
    pub category: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<usize>,
}

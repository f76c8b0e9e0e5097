use once_cell::sync::Lazy;

use crate::models::{Category, Coordinates, Event, EventId, Location, Source};

/// Read-only local dataset served when no provider credentials are
/// configured, and used as the last-resort single-item lookup. Never
/// mutated by the pipeline.
static SEED_EVENTS: Lazy<Vec<Event>> = Lazy::new(|| {
    vec![
        seed_event(
            "1",
            "Jungle",
            "O2 Academy Brixton",
            "London",
            "211 Stockwell Rd",
            51.4654,
            -0.1150,
            "Mar 15",
            "19:00",
            42,
            Category::Concerts,
            Some("SELLING FAST"),
            88,
            Some("UK tour closing night."),
        ),
        seed_event(
            "2",
            "Arsenal vs Tottenham",
            "Emirates Stadium",
            "London",
            "Hornsey Rd",
            51.5549,
            -0.1084,
            "Mar 22",
            "16:30",
            95,
            Category::Sports,
            None,
            72,
            None,
        ),
        seed_event(
            "3",
            "The Play That Goes Wrong",
            "Duchess Theatre",
            "London",
            "3-5 Catherine St",
            51.5123,
            -0.1200,
            "Apr 2",
            "19:30",
            38,
            Category::Theatre,
            None,
            55,
            Some("Olivier-winning comedy, eighth year in the West End."),
        ),
        seed_event(
            "4",
            "Stewart Lee: Basic Lee",
            "Leicester Square Theatre",
            "London",
            "6 Leicester Pl",
            51.5113,
            -0.1301,
            "Apr 9",
            "20:00",
            28,
            Category::Comedy,
            None,
            64,
            None,
        ),
        seed_event(
            "5",
            "All Points East",
            "Victoria Park",
            "London",
            "Grove Rd",
            51.5362,
            -0.0338,
            "May 24",
            "12:00",
            79,
            Category::Festivals,
            None,
            47,
            Some("Day festival across four stages."),
        ),
        seed_event(
            "6",
            "Late at the Tate",
            "Tate Modern",
            "London",
            "Bankside",
            51.5076,
            -0.0994,
            "Mar 28",
            "18:00",
            0,
            Category::Exhibitions,
            Some("FREE"),
            40,
            None,
        ),
    ]
});

pub fn all() -> &'static [Event] {
    &SEED_EVENTS
}

/// Stringified-id lookup; accepts tagged ("seed:3") or bare ("3") forms.
pub fn find(id: &str) -> Option<Event> {
    SEED_EVENTS
        .iter()
        .find(|event| event.id_matches(id))
        .cloned()
}

#[allow(clippy::too_many_arguments)]
fn seed_event(
    native_id: &str,
    title: &str,
    venue: &str,
    city: &str,
    address: &str,
    lat: f64,
    lng: f64,
    date: &str,
    time: &str,
    price: u32,
    category: Category,
    tag: Option<&str>,
    sold_percentage: u8,
    description: Option<&str>,
) -> Event {
    Event {
        id: EventId::new(Source::Seed, native_id),
        title: title.to_string(),
        venue: venue.to_string(),
        location: Location {
            city: city.to_string(),
            address: address.to_string(),
            coordinates: Coordinates { lat, lng },
        },
        date: date.to_string(),
        time: time.to_string(),
        price,
        category,
        image: crate::providers::base::STOCK_IMAGE.to_string(),
        tag: tag.map(str::to_string),
        sold_percentage,
        sold_estimated: true,
        description: description.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_corpus_is_non_empty_and_fully_populated() {
        let events = all();
        assert!(!events.is_empty());
        for event in events {
            assert!(!event.title.is_empty());
            assert!(!event.venue.is_empty());
            assert!(!event.date.is_empty());
            assert!(event.sold_percentage <= 100);
            assert!(event.sold_estimated);
            assert_eq!(event.id.source, Source::Seed);
        }
    }

    #[test]
    fn find_accepts_tagged_and_bare_ids() {
        assert_eq!(find("seed:3").expect("tagged").title, find("3").expect("bare").title);
        assert!(find("seed:999").is_none());
    }
}

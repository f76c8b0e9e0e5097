use std::time::Duration;

use chrono::{Datelike, Local, NaiveDate};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use tokio::time::sleep;
use tracing::warn;

use crate::models::{Category, Coordinates};

use super::ProviderError;

/// Stock placeholder used when a source has no artwork for an event.
pub const STOCK_IMAGE: &str =
    "https://images.unsplash.com/photo-1459749411175-04bf5292ceea?w=800";

/// Placeholder unit price when a source's price text cannot be parsed.
pub const FALLBACK_PRICE: u32 = 25;

const MAX_ATTEMPTS: u32 = 3;
const RATE_LIMIT_BACKOFF_MS: u64 = 1000;
const TRANSIENT_BACKOFF_MS: u64 = 300;

const EARTH_RADIUS_MILES: f64 = 3959.0;

static PRICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d{1,2})?)").expect("valid price regex"));

static FREE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bfree\b").expect("valid free-token regex"));

static CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(10))
        .user_agent("eventfan/0.1 (+https://github.com/mike/eventfan)")
        .build()
        .expect("http client")
});

pub fn http_client() -> &'static Client {
    &CLIENT
}

/// GET a JSON document with a bounded retry budget.
///
/// HTTP 429 backs off linearly (1s, 2s); other non-2xx responses and
/// transport failures back off on a shorter ladder (300ms, 600ms). After
/// three attempts the last error escalates to the caller; isolating it is
/// the aggregator's job, not this function's.
pub async fn fetch_json(client: &Client, url: Url) -> Result<Value, ProviderError> {
    let mut last_err = None;

    for attempt in 1..=MAX_ATTEMPTS {
        match client.get(url.clone()).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    let text = response.text().await?;
                    return Ok(serde_json::from_str::<Value>(&text)?);
                }
                if status == StatusCode::TOO_MANY_REQUESTS {
                    warn!(url = %url, attempt, "rate limited, backing off");
                    last_err = Some(ProviderError::RateLimited {
                        attempts: attempt,
                        url: url.to_string(),
                    });
                    if attempt < MAX_ATTEMPTS {
                        sleep(Duration::from_millis(
                            u64::from(attempt) * RATE_LIMIT_BACKOFF_MS,
                        ))
                        .await;
                    }
                    continue;
                }
                last_err = Some(ProviderError::Http {
                    status,
                    url: url.to_string(),
                });
            }
            Err(err) => {
                last_err = Some(ProviderError::Transport(err));
            }
        }

        if attempt < MAX_ATTEMPTS {
            sleep(Duration::from_millis(
                u64::from(attempt) * TRANSIENT_BACKOFF_MS,
            ))
            .await;
        }
    }

    Err(last_err.expect("at least one attempt recorded"))
}

/// Lowercase lookup from a source-native category label into the fixed
/// vocabulary. Unrecognized labels fall back to the adapter's default.
pub fn normalize_category(raw: &str, default: Category) -> Category {
    match raw.trim().to_lowercase().as_str() {
        "music" | "concert" | "concerts" | "pop" | "rock" | "hip-hop/rap" | "r&b" => {
            Category::Concerts
        }
        "sports" | "sport" => Category::Sports,
        "arts & theatre" | "theatre" | "theater" | "performing arts" | "broadway shows"
        | "dance performance tour" => Category::Theatre,
        "comedy" | "stand-up" => Category::Comedy,
        "festival" | "festivals" | "music festival" | "seasonal" => Category::Festivals,
        "exhibition" | "exhibitions" | "museum" | "film" | "arts" | "visual arts" => {
            Category::Exhibitions
        }
        "nightlife" | "club passes" | "clubs" | "dance" => Category::Nightlife,
        _ => default,
    }
}

/// Best-effort numeric parse of a free-text price field.
///
/// An explicit "free" token (whole word, any case) maps to 0; otherwise the
/// first number in the text wins ("From $45.00" -> 45); unparseable text
/// takes the fallback.
pub fn parse_price(text: &str, fallback: u32) -> u32 {
    if FREE_RE.is_match(text) {
        return 0;
    }
    let stripped = text.replace(',', "");
    PRICE_RE
        .captures(&stripped)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|value| value.round() as u32)
        .unwrap_or(fallback)
}

/// Promotional label decision table, keyed on urgency and price. Advisory
/// only; consumers must not treat it as inventory truth.
pub fn promo_tag(
    days_until: i64,
    price: u32,
    sold_percentage: u8,
    sold_out: bool,
) -> Option<String> {
    if sold_out {
        Some("SOLD OUT".to_string())
    } else if days_until <= 0 {
        Some("TONIGHT".to_string())
    } else if sold_percentage > 85 {
        Some("SELLING FAST".to_string())
    } else if price == 0 {
        Some("FREE".to_string())
    } else if days_until <= 7 {
        Some("THIS WEEK".to_string())
    } else {
        None
    }
}

/// Short display form, e.g. "Mar 15". Lossy on purpose; the raw instant is
/// not preserved alongside it.
pub fn display_date(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}

/// Parse a display-formatted date back to a day. Yearless forms assume the
/// current year and roll over to the next one when already past.
pub fn parse_display_date(input: &str) -> Option<NaiveDate> {
    let cleaned = input.trim();
    if cleaned.is_empty() {
        return None;
    }

    let formats = [
        ("%Y-%m-%d", true),
        ("%b %d, %Y", true),
        ("%B %d, %Y", true),
        ("%b %d", false),
        ("%B %d", false),
    ];

    for (fmt, has_year) in formats.iter() {
        if let Ok(mut date) = NaiveDate::parse_from_str(cleaned, fmt) {
            if *has_year {
                return Some(date);
            }
            let current_year = Local::now().year();
            date = date.with_year(current_year)?;
            let today = Local::now().date_naive();
            if date < today {
                date = date.with_year(current_year + 1)?;
            }
            return Some(date);
        }
    }

    None
}

pub fn days_until(date: NaiveDate) -> i64 {
    (date - Local::now().date_naive()).num_days()
}

/// Sell-through placeholder for sources that report no inventory figures.
/// Callers must set `sold_estimated` alongside it.
pub fn synthetic_sold_percentage() -> u8 {
    rand::thread_rng().gen_range(40..=90)
}

/// Great-circle distance in miles. The single authoritative implementation;
/// callers working in kilometres convert at the boundary.
pub fn haversine_miles(a: Coordinates, b: Coordinates) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn price_parse_handles_free_ranges_and_garbage() {
        assert_eq!(parse_price("Free entry", 25), 0);
        assert_eq!(parse_price("FREE", 25), 0);
        assert_eq!(parse_price("From $45.00", 25), 45);
        assert_eq!(parse_price("£1,250", 25), 1250);
        assert_eq!(parse_price("32.50 - 60.00", 25), 33);
        assert_eq!(parse_price("door charge TBC", 25), 25);
        assert_eq!(parse_price("", 20), 20);
    }

    #[test]
    fn free_must_be_a_whole_word() {
        assert_eq!(parse_price("Freedom Package £50", 25), 50);
        assert_eq!(parse_price("carefree night, $30", 25), 30);
        assert_eq!(parse_price("free (donations welcome)", 25), 0);
        assert_eq!(parse_price("Kids go FREE with adult ticket £18", 25), 0);
    }

    #[test]
    fn category_lookup_is_case_insensitive_with_default() {
        assert_eq!(
            normalize_category("Arts & Theatre", Category::Concerts),
            Category::Theatre
        );
        assert_eq!(
            normalize_category("MUSIC", Category::Concerts),
            Category::Concerts
        );
        assert_eq!(
            normalize_category("llama grooming", Category::Concerts),
            Category::Concerts
        );
        assert_eq!(
            normalize_category("llama grooming", Category::Nightlife),
            Category::Nightlife
        );
    }

    #[test]
    fn promo_tag_decision_table() {
        assert_eq!(promo_tag(0, 40, 50, false).as_deref(), Some("TONIGHT"));
        assert_eq!(promo_tag(3, 40, 90, false).as_deref(), Some("SELLING FAST"));
        assert_eq!(promo_tag(12, 0, 50, false).as_deref(), Some("FREE"));
        assert_eq!(promo_tag(5, 40, 50, false).as_deref(), Some("THIS WEEK"));
        assert_eq!(promo_tag(2, 40, 50, true).as_deref(), Some("SOLD OUT"));
        assert_eq!(promo_tag(30, 40, 50, false), None);
    }

    #[test]
    fn display_date_round_trips_within_a_year() {
        let future = Local::now().date_naive() + Duration::days(45);
        let rendered = display_date(future);
        assert_eq!(parse_display_date(&rendered), Some(future));
    }

    #[test]
    fn yearless_dates_in_the_past_roll_over() {
        let yesterday = Local::now().date_naive() - Duration::days(1);
        let rendered = display_date(yesterday);
        let parsed = parse_display_date(&rendered).expect("parse rolled date");
        assert!(parsed > Local::now().date_naive());
    }

    #[test]
    fn unparseable_date_is_none() {
        assert_eq!(parse_display_date("sometime soon"), None);
        assert_eq!(parse_display_date(""), None);
    }

    #[test]
    fn haversine_zero_and_known_distance() {
        let london = Coordinates {
            lat: 51.5074,
            lng: -0.1278,
        };
        assert!(haversine_miles(london, london) < f64::EPSILON);

        // London to Brighton is roughly 47 miles.
        let brighton = Coordinates {
            lat: 50.8225,
            lng: -0.1372,
        };
        let distance = haversine_miles(london, brighton);
        assert!((45.0..50.0).contains(&distance), "got {distance}");
    }

    #[test]
    fn synthetic_sold_percentage_stays_in_range() {
        for _ in 0..200 {
            let value = synthetic_sold_percentage();
            assert!((40..=90).contains(&value));
        }
    }

    mod retry {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        use super::super::{fetch_json, http_client};
        use crate::providers::ProviderError;

        fn status_reply(status_line: &str) -> String {
            format!(
                "HTTP/1.1 {status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
            )
        }

        fn json_reply(body: &str) -> String {
            format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            )
        }

        /// One canned reply per connection; the last reply repeats once the
        /// script runs out. Returns the endpoint URL and a request counter.
        async fn spawn_stub(replies: Vec<String>) -> (reqwest::Url, Arc<AtomicUsize>) {
            let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
            let addr = listener.local_addr().expect("stub addr");
            let hits = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&hits);

            tokio::spawn(async move {
                loop {
                    let (mut socket, _) = match listener.accept().await {
                        Ok(conn) => conn,
                        Err(_) => break,
                    };
                    let served = counter.fetch_add(1, Ordering::SeqCst);
                    let reply = replies[served.min(replies.len() - 1)].clone();

                    let mut buf = [0u8; 1024];
                    let _ = socket.read(&mut buf).await;
                    let _ = socket.write_all(reply.as_bytes()).await;
                    let _ = socket.shutdown().await;
                }
            });

            let url = reqwest::Url::parse(&format!("http://{addr}/events")).expect("stub url");
            (url, hits)
        }

        #[tokio::test]
        async fn rate_limited_fetch_recovers_within_the_retry_budget() {
            let (url, hits) = spawn_stub(vec![
                status_reply("429 Too Many Requests"),
                status_reply("429 Too Many Requests"),
                json_reply(r#"{"events":[]}"#),
            ])
            .await;

            let payload = fetch_json(http_client(), url)
                .await
                .expect("third attempt succeeds");
            assert_eq!(payload["events"], serde_json::json!([]));
            assert_eq!(hits.load(Ordering::SeqCst), 3);
        }

        #[tokio::test]
        async fn persistent_rate_limit_escalates_after_three_attempts() {
            let (url, hits) = spawn_stub(vec![status_reply("429 Too Many Requests")]).await;

            let err = fetch_json(http_client(), url)
                .await
                .expect_err("retry budget exhausted");
            assert!(matches!(
                err,
                ProviderError::RateLimited { attempts: 3, .. }
            ));
            assert_eq!(hits.load(Ordering::SeqCst), 3);
        }

        #[tokio::test]
        async fn persistent_server_error_retries_then_escalates() {
            let (url, hits) = spawn_stub(vec![status_reply("500 Internal Server Error")]).await;

            let err = fetch_json(http_client(), url)
                .await
                .expect_err("retry budget exhausted");
            match err {
                ProviderError::Http { status, .. } => {
                    assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR)
                }
                other => panic!("unexpected error: {other}"),
            }
            assert_eq!(hits.load(Ordering::SeqCst), 3);
        }
    }
}

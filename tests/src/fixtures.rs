//! Test fixtures and event generators.

use chrono::{NaiveDate, Weekday};
use funnel_core::{Event, EventParam, AMOUNT_KEY, CURRENCY_KEY, PRODUCT_KEY};
use std::path::Path;

/// Epoch millis at midnight UTC on the Tuesday of an ISO week.
pub fn iso_week_ms(year: i32, week: u32) -> i64 {
    NaiveDate::from_isoywd_opt(year, week, Weekday::Tue)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
        .expect("valid ISO week")
}

/// One event per step, a second apart, starting at `start_ms`.
pub fn session_steps(session_id: i64, user: &str, start_ms: i64, steps: &[&str]) -> Vec<Event> {
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            Event::new(session_id, user, "page_view", start_ms + i as i64 * 1000)
                .with_param(EventParam::step(*step))
        })
        .collect()
}

/// A purchase event with amount, product, and currency params.
pub fn purchase_event(session_id: i64, user: &str, at_ms: i64, product: &str, amount: i32) -> Event {
    Event::new(session_id, user, "purchase", at_ms)
        .with_param(EventParam::int(AMOUNT_KEY, amount))
        .with_param(EventParam::string(PRODUCT_KEY, product))
        .with_param(EventParam::string(CURRENCY_KEY, "USD"))
}

/// Two sessions in week 1 (A completes, B drops at landing) and a
/// purchase of shoes for 100 in week 2.
pub fn funnel_events() -> Vec<Event> {
    let week_1 = iso_week_ms(2024, 1);
    let week_2 = iso_week_ms(2024, 2);

    let mut events = session_steps(101, "device-a", week_1, &["landing", "checkout", "purchase"]);
    events.extend(session_steps(102, "device-b", week_1 + 60_000, &["landing"]));
    events.push(purchase_event(103, "device-c", week_2, "shoes", 100));
    events
}

/// Writes `events` as a parquet file and returns its bytes.
pub fn parquet_bytes(dir: &Path, events: &[Event]) -> Vec<u8> {
    let path = dir.join("fixture.parquet");
    warehouse::sample::write_events_parquet(events, &path).expect("write parquet fixture");
    std::fs::read(&path).expect("read parquet fixture")
}

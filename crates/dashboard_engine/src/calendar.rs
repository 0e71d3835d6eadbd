//! Calendar helpers for month buckets.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

const MONTH_NAMES_PT_BR: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

/// `YYYY-MM` in the calendar of the timestamp's own zone. Fixed width, so
/// lexicographic order is chronological order.
pub fn month_key<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    format!("{:04}-{:02}", at.year(), at.month())
}

/// Length of the month, counted between the first days of it and the next.
/// Out-of-range input yields 30 so callers can still divide by it.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .zip(NaiveDate::from_ymd_opt(next_year, next_month, 1))
        .and_then(|(first, next)| u32::try_from(next.signed_duration_since(first).num_days()).ok())
        .unwrap_or(30)
}

/// First day of `now`'s month at local midnight, as an instant.
pub fn start_of_month<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let tz = now.timezone();
    // midnight can fall in a DST gap; take the first hour that exists
    (0..24)
        .find_map(|hour| {
            tz.with_ymd_and_hms(now.year(), now.month(), 1, hour, 0, 0)
                .earliest()
        })
        .map(|start| start.with_timezone(&Utc))
        .unwrap_or_else(|| now.with_timezone(&Utc))
}

/// Display label for a forecast month, e.g. "janeiro de 2025".
pub fn month_label(year: i32, month: u32) -> String {
    match MONTH_NAMES_PT_BR.get(month.wrapping_sub(1) as usize) {
        Some(name) => format!("{} de {}", name, year),
        None => format!("{:04}-{:02}", year, month),
    }
}

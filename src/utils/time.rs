use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use now::DateTimeNow;

/// This is the standard way of converting a date to a string in timetrace. Used for ledger file
/// names and the date column of rows.
pub fn date_to_record_name(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Monday of the week `date` belongs to.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date.and_time(NaiveTime::MIN)
        .and_utc()
        .beginning_of_week()
        .date_naive()
}

/// Local midnight of `date` as an instant. Lower bound of every commit query, local and remote.
/// When midnight falls into a DST gap the UTC midnight is used.
pub fn day_start(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|v| v.to_utc())
        .unwrap_or_else(|| midnight.and_utc())
}

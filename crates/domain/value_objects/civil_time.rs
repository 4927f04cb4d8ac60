use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// India Standard Time, UTC+05:30. Business days are counted in this zone.
pub const IST_OFFSET_SECONDS: i32 = 5 * 3600 + 30 * 60;

pub fn ist() -> FixedOffset {
    FixedOffset::east_opt(IST_OFFSET_SECONDS).expect("IST offset is within range")
}

pub fn civil_date(at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&ist()).date_naive()
}

pub fn civil_today() -> NaiveDate {
    civil_date(Utc::now())
}

use crate::data_store::models::Location;
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc, Weekday};

/// Format a date as `YYYY-MM-DD`, as used in URLs and the API
pub fn date_to_iso_string(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a `YYYY-MM-DD` date string. Returns None for malformed strings and non-existing dates.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

impl Location {
    /// Opening and closing hour of the location at the given date
    pub fn opening_hours(&self, date: NaiveDate) -> (i32, i32) {
        if is_weekend(date) {
            (self.weekend_open_hour, self.weekend_close_hour)
        } else {
            (self.weekday_open_hour, self.weekday_close_hour)
        }
    }

    /// Start hours of all reservation slots of the location at the given date
    ///
    /// Slots start at the opening hour and follow each other without gaps. The last slot must end
    /// at or before the closing hour.
    pub fn slots(&self, date: NaiveDate) -> Vec<i32> {
        if self.slot_duration <= 0 {
            return vec![];
        }
        let (open, close) = self.opening_hours(date);
        (open..)
            .step_by(self.slot_duration as usize)
            .take_while(|start| start + self.slot_duration <= close)
            .collect()
    }

    pub fn is_valid_slot(&self, date: NaiveDate, hour: i32) -> bool {
        let (open, close) = self.opening_hours(date);
        self.slot_duration > 0
            && hour >= open
            && hour
                .checked_add(self.slot_duration)
                .is_some_and(|end| end <= close)
            && (hour - open) % self.slot_duration == 0
    }
}

/// Calculate the UTC timestamp of a slot's begin from its local date and hour in the club's
/// timezone.
///
/// For ambiguous local times (end of DST), the earlier instant is used. Local times skipped by the
/// beginning of DST are interpreted as UTC. Returns None for hours outside 0‥23.
pub fn slot_start(date: NaiveDate, hour: i32, timezone: &chrono_tz::Tz) -> Option<DateTime<Utc>> {
    let hour = u32::try_from(hour).ok()?;
    let local = date.and_hms_opt(hour, 0, 0)?;
    Some(
        timezone
            .from_local_datetime(&local)
            .earliest()
            .map(|dt| dt.to_utc())
            .unwrap_or(local.and_utc()),
    )
}

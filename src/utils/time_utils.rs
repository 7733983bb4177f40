use chrono::{Datelike, NaiveDate, Utc};

pub struct TimeUtils;

impl TimeUtils {
    /// Width of one shift tick. All DP bookkeeping runs on this grid.
    pub const TICK_MINUTES: i64 = 5;
    pub const TICKS_PER_HOUR: usize = 12;
    pub const MINUTES_IN_H: i64 = 60;
    pub const HOURS_IN_DAY: u8 = 24;
    pub const STANDARD_DATE_FORMAT: &str = "%Y-%m-%d";

    /// Round a duration in minutes UP to whole ticks, never less than one.
    /// A transition that takes any time at all must consume at least one
    /// tick or the DP could loop at a fixed ticks-remaining level.
    pub fn minutes_to_ticks(minutes: f64) -> usize {
        if minutes <= 0.0 {
            return 1;
        }
        let ticks = (minutes / Self::TICK_MINUTES as f64).ceil() as usize;
        ticks.max(1)
    }

    pub fn hours_to_ticks(hours: u8) -> usize {
        hours as usize * Self::TICKS_PER_HOUR
    }

    /// Hour of day after `elapsed_ticks` ticks from `start_hour`, wrapping
    /// midnight.
    pub fn hour_after_ticks(start_hour: u8, elapsed_ticks: usize) -> u8 {
        let elapsed_minutes = elapsed_ticks as i64 * Self::TICK_MINUTES;
        let hour = start_hour as i64 + elapsed_minutes / Self::MINUTES_IN_H;
        (hour % Self::HOURS_IN_DAY as i64) as u8
    }

    /// Calendar date after `elapsed_ticks` ticks from `start_hour` on
    /// `start_date`. Weather is a per-date signal and long shifts cross
    /// midnight.
    pub fn date_after_ticks(
        start_date: NaiveDate,
        start_hour: u8,
        elapsed_ticks: usize,
    ) -> NaiveDate {
        let elapsed_minutes = elapsed_ticks as i64 * Self::TICK_MINUTES;
        let total_hours = start_hour as i64 + elapsed_minutes / Self::MINUTES_IN_H;
        let days = total_hours / Self::HOURS_IN_DAY as i64;
        start_date + chrono::Days::new(days as u64)
    }

    /// Wrap-aware distance in whole hours from `from` to `to` on the
    /// 24-hour clock (e.g. 22 -> 2 is 4 hours).
    pub fn hours_between(from: u8, to: u8) -> u8 {
        if to >= from {
            to - from
        } else {
            Self::HOURS_IN_DAY - from + to
        }
    }

    pub fn now_timestamp_ms() -> i64 {
        Utc::now().timestamp_millis()
    }

    pub fn parse_date(text: &str) -> anyhow::Result<NaiveDate> {
        NaiveDate::parse_from_str(text, Self::STANDARD_DATE_FORMAT)
            .map_err(|e| anyhow::anyhow!("invalid date {:?} (expected YYYY-MM-DD): {}", text, e))
    }

    pub fn weekday_name(date: NaiveDate) -> &'static str {
        match date.weekday() {
            chrono::Weekday::Mon => "Monday",
            chrono::Weekday::Tue => "Tuesday",
            chrono::Weekday::Wed => "Wednesday",
            chrono::Weekday::Thu => "Thursday",
            chrono::Weekday::Fri => "Friday",
            chrono::Weekday::Sat => "Saturday",
            chrono::Weekday::Sun => "Sunday",
        }
    }
}

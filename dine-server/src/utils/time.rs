//! 业务时区工具
//!
//! Date presets for staff listings and gateway timestamps are computed in
//! the restaurant's business timezone, not the host's.

use super::AppError;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

/// Half-open millisecond range `[from, until)`; an open side is unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub from: Option<i64>,
    pub until: Option<i64>,
}

impl DateRange {
    pub fn contains(&self, ts: i64) -> bool {
        self.from.is_none_or(|f| ts >= f) && self.until.is_none_or(|u| ts < u)
    }
}

/// Named date windows offered by the staff bill list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePreset {
    Today,
    Yesterday,
    /// Monday-start week containing today
    ThisWeek,
    ThisMonth,
    All,
}

impl FromStr for DatePreset {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(DatePreset::Today),
            "yesterday" => Ok(DatePreset::Yesterday),
            "this_week" => Ok(DatePreset::ThisWeek),
            "this_month" => Ok(DatePreset::ThisMonth),
            "all" | "" => Ok(DatePreset::All),
            _ => Err(AppError::invalid_request("Invalid datePreset")),
        }
    }
}

/// Start of a calendar day in `tz`, as epoch millis
fn start_of_day(date: NaiveDate, tz: Tz) -> i64 {
    let naive = date.and_time(NaiveTime::default());
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| naive.and_utc().timestamp_millis())
}

fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    if month > 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month, 1)
    }
}

impl DatePreset {
    /// Resolve against `now`; `All` has no range
    pub fn range(&self, tz: Tz, now: DateTime<Utc>) -> Option<DateRange> {
        let today = now.with_timezone(&tz).date_naive();
        let (start, end) = match self {
            DatePreset::All => return None,
            DatePreset::Today => (today, today + Duration::days(1)),
            DatePreset::Yesterday => (today - Duration::days(1), today),
            DatePreset::ThisWeek => {
                let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
                (monday, monday + Duration::days(7))
            }
            DatePreset::ThisMonth => {
                let first = first_of_month(today.year(), today.month()).unwrap_or(today);
                let next = first_of_month(today.year(), today.month() + 1)
                    .unwrap_or(today + Duration::days(31));
                (first, next)
            }
        };
        Some(DateRange {
            from: Some(start_of_day(start, tz)),
            until: Some(start_of_day(end, tz)),
        })
    }
}

/// Parse one explicit bound: RFC 3339 instant or `YYYY-MM-DD` (business day)
///
/// A date-only upper bound covers that whole day.
fn parse_bound(raw: &str, tz: Tz, upper: bool) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        let ms = dt.timestamp_millis();
        return Some(if upper { ms + 1 } else { ms });
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(if upper {
        start_of_day(date + Duration::days(1), tz)
    } else {
        start_of_day(date, tz)
    })
}

/// Resolve a listing's date filter
///
/// Explicit `from`/`to` override the preset. Both absent and preset absent
/// or `all` means no filter.
pub fn resolve_date_range(
    preset: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
    tz: Tz,
    now: DateTime<Utc>,
) -> Result<Option<DateRange>, AppError> {
    let from = from.map(str::trim).filter(|s| !s.is_empty());
    let to = to.map(str::trim).filter(|s| !s.is_empty());

    if from.is_some() || to.is_some() {
        let from = match from {
            Some(raw) => Some(
                parse_bound(raw, tz, false).ok_or_else(|| AppError::invalid_request("Invalid from"))?,
            ),
            None => None,
        };
        let until = match to {
            Some(raw) => Some(
                parse_bound(raw, tz, true).ok_or_else(|| AppError::invalid_request("Invalid to"))?,
            ),
            None => None,
        };
        return Ok(Some(DateRange { from, until }));
    }

    match preset {
        Some(raw) => Ok(raw.parse::<DatePreset>()?.range(tz, now)),
        None => Ok(None),
    }
}

/// Gateway timestamp `yyyyMMddHHmmss` in the business timezone
pub fn gateway_timestamp(millis: i64, tz: Tz) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.with_timezone(&tz).format("%Y%m%d%H%M%S").to_string())
        .unwrap_or_default()
}

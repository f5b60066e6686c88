//! Calendar windows and "today" for upstream date parameters.
//!
//! NEIS takes dates as 8-digit `YYYYMMDD` strings. Weekly timetable queries
//! always cover Monday through Friday of the anchor's week, and monthly
//! meal queries cover the first through the last calendar day.

use chrono::{Datelike, Duration, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::Clock;
use crate::constants::KST_OFFSET_SECONDS;
use crate::error::AppError;

const YMD_FORMAT: &str = "%Y%m%d";

/// Number of school days a weekly window spans (Mon..Fri).
pub const SCHOOL_WEEK_DAYS: i64 = 5;

/// Inclusive date range in `YYYYMMDD` form. `from_ymd <= to_ymd` always holds.
///
/// Only the constructors below build one, and deserialization goes through
/// [`DateWindow::range`], so a reversed or malformed window never exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDateWindow")]
pub struct DateWindow {
    from_ymd: String,
    to_ymd: String,
}

#[derive(Deserialize)]
struct RawDateWindow {
    from_ymd: String,
    to_ymd: String,
}

impl TryFrom<RawDateWindow> for DateWindow {
    type Error = AppError;

    fn try_from(raw: RawDateWindow) -> Result<Self, Self::Error> {
        Self::range(&raw.from_ymd, &raw.to_ymd)
    }
}

impl DateWindow {
    /// Builds a window from two dates, rejecting reversed ranges.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, AppError> {
        if from > to {
            return Err(AppError::invalid_input(format!(
                "date range starts after it ends: {} > {}",
                from.format(YMD_FORMAT),
                to.format(YMD_FORMAT)
            )));
        }
        Ok(Self {
            from_ymd: from.format(YMD_FORMAT).to_string(),
            to_ymd: to.format(YMD_FORMAT).to_string(),
        })
    }

    /// Parses an explicit `from`..`to` range given as date strings.
    pub fn range(from: &str, to: &str) -> Result<Self, AppError> {
        Self::new(parse_ymd(from)?, parse_ymd(to)?)
    }

    pub fn from_ymd(&self) -> &str {
        &self.from_ymd
    }

    pub fn to_ymd(&self) -> &str {
        &self.to_ymd
    }

    pub fn is_single_day(&self) -> bool {
        self.from_ymd == self.to_ymd
    }
}

/// Parses `YYYYMMDD` or `YYYY-MM-DD` into a date.
pub fn parse_ymd(input: &str) -> Result<NaiveDate, AppError> {
    let compact: String = input.trim().chars().filter(|c| *c != '-').collect();
    if compact.len() != 8 || !compact.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::invalid_input(format!(
            "expected a YYYYMMDD date, got '{input}'"
        )));
    }
    NaiveDate::parse_from_str(&compact, YMD_FORMAT)
        .map_err(|e| AppError::invalid_input(format!("'{input}' is not a valid date: {e}")))
}

/// Formats a date as `YYYYMMDD`.
pub fn format_ymd(date: NaiveDate) -> String {
    date.format(YMD_FORMAT).to_string()
}

fn kst() -> FixedOffset {
    FixedOffset::east_opt(KST_OFFSET_SECONDS).expect("UTC+9 is within the valid offset range")
}

/// Today's date at UTC+9, regardless of the host's timezone.
pub fn today_date(clock: &dyn Clock) -> NaiveDate {
    clock.now().with_timezone(&kst()).date_naive()
}

/// Today's date at UTC+9 as `YYYYMMDD`.
pub fn today(clock: &dyn Clock) -> String {
    format_ymd(today_date(clock))
}

/// Single-day window for `ymd`.
pub fn day_window(ymd: &str) -> Result<DateWindow, AppError> {
    let day = parse_ymd(ymd)?;
    DateWindow::new(day, day)
}

/// Monday..Friday window containing `anchor_ymd`.
///
/// A Sunday anchor belongs to the week that started six days earlier,
/// so `20240310` (Sunday) yields `20240304..20240308`.
pub fn week_window(anchor_ymd: &str) -> Result<DateWindow, AppError> {
    let anchor = parse_ymd(anchor_ymd)?;
    let monday = anchor - Duration::days(i64::from(anchor.weekday().num_days_from_monday()));
    let friday = monday + Duration::days(SCHOOL_WEEK_DAYS - 1);
    debug!(
        "Week window for {}: {} - {}",
        anchor_ymd,
        format_ymd(monday),
        format_ymd(friday)
    );
    DateWindow::new(monday, friday)
}

/// First..last calendar day of `year`/`month`.
pub fn month_window_for(year: i32, month: u32) -> Result<DateWindow, AppError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::invalid_input(format!("no such month: {year}-{month:02}")))?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let last = next_first
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| AppError::invalid_input(format!("month out of range: {year}-{month:02}")))?;
    DateWindow::new(first, last)
}

/// Month window for a `YYYYMM` or `YYYY-MM` string.
pub fn month_window(year_month: &str) -> Result<DateWindow, AppError> {
    let compact: String = year_month.trim().chars().filter(|c| *c != '-').collect();
    if compact.len() != 6 || !compact.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::invalid_input(format!(
            "expected a YYYYMM month, got '{year_month}'"
        )));
    }
    let year: i32 = compact[..4]
        .parse()
        .map_err(|_| AppError::invalid_input(format!("bad year in '{year_month}'")))?;
    let month: u32 = compact[4..]
        .parse()
        .map_err(|_| AppError::invalid_input(format!("bad month in '{year_month}'")))?;
    month_window_for(year, month)
}

/// The month containing today (UTC+9), for "this month's meals".
pub fn current_month_window(clock: &dyn Clock) -> Result<DateWindow, AppError> {
    let today = today_date(clock);
    month_window_for(today.year(), today.month())
}

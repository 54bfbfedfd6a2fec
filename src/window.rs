//! Builds the prediction request window from loosely formatted user input.
//!
//! Dates are `MM/DD`, times are 12-hour `H:MM`/`HH:MM` plus an AM/PM
//! designator. The resulting timestamps are naive local wall-clock times;
//! no time-zone conversion happens anywhere in the pipeline.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::WindowError;

/// Bin size the prediction service assumes when none is given.
pub const DEFAULT_INTERVAL_MINUTES: u32 = 15;

/// Timestamp layout the `fetch-volume` endpoint parses.
pub const SERVICE_TIME_FORMAT: &str = "%m/%d %I:%M %p";
/// Timestamp layout for the `predictions?timestamp=` query.
pub const QUERY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meridiem {
    Am,
    Pm,
}

impl FromStr for Meridiem {
    type Err = WindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AM" => Ok(Meridiem::Am),
            "PM" => Ok(Meridiem::Pm),
            other => Err(WindowError::InvalidDateFormat(format!(
                "'{other}' is not AM or PM"
            ))),
        }
    }
}

impl Meridiem {
    fn to_24h(self, hour: u32) -> u32 {
        match (self, hour) {
            (Meridiem::Am, 12) => 0,
            (Meridiem::Am, h) => h,
            (Meridiem::Pm, 12) => 12,
            (Meridiem::Pm, h) => h + 12,
        }
    }
}

/// The instant a prediction is requested for, plus the bin that follows it.
///
/// `end_time - start_time` always equals `interval_minutes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PredictionRequestWindow {
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
    interval_minutes: u32,
}

impl PredictionRequestWindow {
    /// # Errors
    ///
    /// [`WindowError::InvalidInterval`] for a zero interval and
    /// [`WindowError::InvalidDateFormat`] if the end time is not representable.
    pub fn new(start_time: NaiveDateTime, interval_minutes: u32) -> Result<Self, WindowError> {
        if interval_minutes == 0 {
            return Err(WindowError::InvalidInterval(interval_minutes));
        }

        let end_time = start_time
            .checked_add_signed(TimeDelta::minutes(i64::from(interval_minutes)))
            .ok_or_else(|| {
                WindowError::InvalidDateFormat(format!(
                    "{start_time} plus {interval_minutes} minutes is out of range"
                ))
            })?;

        Ok(Self {
            start_time,
            end_time,
            interval_minutes,
        })
    }

    pub fn start_time(&self) -> NaiveDateTime {
        self.start_time
    }

    pub fn end_time(&self) -> NaiveDateTime {
        self.end_time
    }

    pub fn interval_minutes(&self) -> u32 {
        self.interval_minutes
    }

    /// True when the window starts in one calendar year and ends in the next.
    pub fn spans_year_boundary(&self) -> bool {
        self.start_time.year() != self.end_time.year()
    }
}

impl fmt::Display for PredictionRequestWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} ({} min)",
            self.start_time, self.end_time, self.interval_minutes
        )
    }
}

/// Combines date, time, AM/PM and year into a request window.
///
/// `year` defaults to the current local year.
///
/// # Errors
///
/// [`WindowError::InvalidDateFormat`] when any part fails to match its
/// pattern or the parts do not form a calendar date (e.g. `02/30`).
pub fn build_window(
    date: &str,
    time: &str,
    ampm: &str,
    year: Option<i32>,
    interval_minutes: u32,
) -> Result<PredictionRequestWindow, WindowError> {
    let (month, day) = parse_month_day(date)
        .ok_or_else(|| WindowError::InvalidDateFormat(format!("'{date}' is not MM/DD")))?;
    let (hour, minute) = parse_clock(time)
        .ok_or_else(|| WindowError::InvalidDateFormat(format!("'{time}' is not HH:MM")))?;
    let meridiem: Meridiem = ampm.parse()?;
    let year = year.unwrap_or_else(|| Local::now().year());

    let day_of_year = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        WindowError::InvalidDateFormat(format!("{year}-{month:02}-{day:02} is not a calendar date"))
    })?;
    let time_of_day = NaiveTime::from_hms_opt(meridiem.to_24h(hour), minute, 0)
        .ok_or_else(|| WindowError::InvalidDateFormat(format!("'{time} {ampm}' is not a time")))?;

    let window = PredictionRequestWindow::new(day_of_year.and_time(time_of_day), interval_minutes)?;
    debug!(%window, "Built prediction window");
    Ok(window)
}

/// Accepts `M/D`, `MM/DD` and mixes; month 1-12, day 1-31.
fn parse_month_day(text: &str) -> Option<(u32, u32)> {
    let (month, day) = text.trim().split_once('/')?;
    let month = parse_digits(month, 1, 2)?;
    let day = parse_digits(day, 1, 2)?;

    ((1..=12).contains(&month) && (1..=31).contains(&day)).then_some((month, day))
}

/// Accepts `H:MM` and `HH:MM`; hour 1-12, minute 00-59.
fn parse_clock(text: &str) -> Option<(u32, u32)> {
    let (hour, minute) = text.trim().split_once(':')?;
    let hour = parse_digits(hour, 1, 2)?;
    let minute = parse_digits(minute, 2, 2)?;

    ((1..=12).contains(&hour) && minute <= 59).then_some((hour, minute))
}

fn parse_digits(text: &str, min_len: usize, max_len: usize) -> Option<u32> {
    let len_ok = (min_len..=max_len).contains(&text.len());
    if !len_ok || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

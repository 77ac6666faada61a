use crate::timelapse_core::error::{Result, TimelapseError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, Month, PrimitiveDateTime, Time};

/// Site camera filename: `RC0307Rb_20200101_1200[_web].jpg`.
static FILE_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Compact timestamp used in output video names (YYYYMMDDHHMM).
pub const STAMP_FORMAT: &[FormatItem] =
    format_description!("[year][month][day][hour][minute]");

/// Timestamp drawn on real frames.
pub const OVERLAY_TIMESTAMP_FORMAT: &[FormatItem] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

/// Calendar date as shown on placeholder frames and in reports.
pub const DATE_FORMAT: &[FormatItem] = format_description!("[year]-[month]-[day]");

fn file_pattern() -> &'static Regex {
    FILE_PATTERN.get_or_init(|| {
        Regex::new(r"^(RC[0-9]{4}[RL][a-z]?)_([0-9]{8})_([0-9]{4})(_web)?\.(jpg|jpeg|JPG|JPEG)$")
            .expect("filename pattern is a valid regex")
    })
}

/// A capture parsed from a site camera filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameRecord {
    pub site_id: String,
    pub capture_time: PrimitiveDateTime,
    pub source_path: PathBuf,
}

impl FilenameRecord {
    /// Parse the final segment of `path`. Directory components are ignored.
    /// Returns `None` for anything that is not a site camera image name.
    pub fn parse(path: &Path) -> Option<Self> {
        let filename = path.file_name()?.to_str()?;
        let caps = file_pattern().captures(filename)?;

        let capture_time = compose_timestamp(&caps[2], &caps[3])?;

        Some(FilenameRecord {
            site_id: caps[1].to_string(),
            capture_time,
            source_path: path.to_path_buf(),
        })
    }

    pub fn date(&self) -> Date {
        self.capture_time.date()
    }
}

/// Parse only the capture timestamp from a filename.
pub fn parse_capture_time(path: &Path) -> Option<PrimitiveDateTime> {
    FilenameRecord::parse(path).map(|record| record.capture_time)
}

/// Build a minute-precision timestamp from `YYYYMMDD` and `HHMM` digit groups.
/// Digits that do not form a real calendar date or clock time give `None`.
fn compose_timestamp(date_digits: &str, time_digits: &str) -> Option<PrimitiveDateTime> {
    let year: i32 = date_digits[0..4].parse().ok()?;
    let month: u8 = date_digits[4..6].parse().ok()?;
    let day: u8 = date_digits[6..8].parse().ok()?;
    let hour: u8 = time_digits[0..2].parse().ok()?;
    let minute: u8 = time_digits[2..4].parse().ok()?;

    let date = Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()?;
    let time = Time::from_hms(hour, minute, 0).ok()?;
    Some(PrimitiveDateTime::new(date, time))
}

/// Parse a 24-hour `HHMM` string such as `"0930"` into a time of day.
pub fn parse_time_of_day(s: &str) -> Result<Time> {
    let invalid = || TimelapseError::InvalidTimeOfDay(s.to_string());

    if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let hour: u8 = s[0..2].parse().map_err(|_| invalid())?;
    let minute: u8 = s[2..4].parse().map_err(|_| invalid())?;
    Time::from_hms(hour, minute, 0).map_err(|_| invalid())
}

pub fn format_stamp(dt: &PrimitiveDateTime) -> Result<String> {
    dt.format(STAMP_FORMAT)
        .map_err(|e| TimelapseError::InvalidDateFormat(e.to_string()))
}

pub fn format_overlay_timestamp(dt: &PrimitiveDateTime) -> Result<String> {
    dt.format(OVERLAY_TIMESTAMP_FORMAT)
        .map_err(|e| TimelapseError::InvalidDateFormat(e.to_string()))
}

pub fn format_date(date: &Date) -> Result<String> {
    date.format(DATE_FORMAT)
        .map_err(|e| TimelapseError::InvalidDateFormat(e.to_string()))
}

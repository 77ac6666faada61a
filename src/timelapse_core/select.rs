use crate::timelapse_core::error::{Result, TimelapseError};
use crate::timelapse_core::filename::{FilenameRecord, format_date, parse_time_of_day};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use time::{Date, PrimitiveDateTime, Time};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Which captures qualify for a timelapse: a time-of-day window plus optional
/// inclusive year bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterWindow {
    start_time: Time,
    end_time: Time,
    start_year: Option<i32>,
    end_year: Option<i32>,
}

impl FilterWindow {
    /// Build a window. The time bounds are inclusive and must not wrap past
    /// midnight, so `start_time` may not be later than `end_time`.
    pub fn new(
        start_time: Time,
        end_time: Time,
        start_year: Option<i32>,
        end_year: Option<i32>,
    ) -> Result<Self> {
        if start_time > end_time {
            return Err(TimelapseError::InvalidWindow {
                start: hhmm(start_time),
                end: hhmm(end_time),
            });
        }
        if let (Some(start), Some(end)) = (start_year, end_year) {
            if start > end {
                return Err(TimelapseError::InvalidYearRange { start, end });
            }
        }

        Ok(FilterWindow {
            start_time,
            end_time,
            start_year,
            end_year,
        })
    }

    /// Build a window from `HHMM` strings, e.g. `("1100", "1300")`.
    pub fn from_hhmm(
        start: &str,
        end: &str,
        start_year: Option<i32>,
        end_year: Option<i32>,
    ) -> Result<Self> {
        Self::new(
            parse_time_of_day(start)?,
            parse_time_of_day(end)?,
            start_year,
            end_year,
        )
    }

    /// Whether a capture at `dt` qualifies.
    pub fn contains(&self, dt: &PrimitiveDateTime) -> bool {
        let year = dt.year();
        let time = dt.time();

        self.start_year.is_none_or(|start| year >= start)
            && self.end_year.is_none_or(|end| year <= end)
            && self.start_time <= time
            && time <= self.end_time
    }
}

fn hhmm(t: Time) -> String {
    format!("{:02}{:02}", t.hour(), t.minute())
}

/// The frames selected from one site directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterResult {
    /// Number of qualifying captures before reducing to one per day.
    pub total_photos: usize,
    #[serde(with = "iso_date::option")]
    pub start_date: Option<Date>,
    #[serde(with = "iso_date::option")]
    pub end_date: Option<Date>,
    /// First qualifying capture of each day, in chronological order.
    pub retained_files: Vec<PathBuf>,
    /// Days between `start_date` and `end_date` with no retained capture.
    #[serde(serialize_with = "serialize_dates")]
    pub missing_dates: Vec<Date>,
}

impl FilterResult {
    pub fn is_empty(&self) -> bool {
        self.retained_files.is_empty()
    }

    /// Number of calendar days from `start_date` to `end_date` inclusive.
    pub fn day_span(&self) -> usize {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => ((end - start).whole_days() + 1).max(0) as usize,
            _ => 0,
        }
    }
}

#[allow(clippy::ptr_arg)]
fn serialize_dates<S: Serializer>(
    dates: &Vec<Date>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let formatted = dates
        .iter()
        .map(format_date)
        .collect::<Result<Vec<String>>>()
        .map_err(<S::Error as serde::ser::Error>::custom)?;
    formatted.serialize(serializer)
}

/// Filter the site camera images in `directory` (non-recursive) down to one
/// capture per day inside `window`, and list the days that have none.
pub fn filter_images(directory: &Path, window: &FilterWindow) -> Result<FilterResult> {
    if !directory.exists() {
        return Err(TimelapseError::PathNotFound(directory.to_path_buf()));
    }
    if !directory.is_dir() {
        return Err(TimelapseError::NotADirectory(directory.to_path_buf()));
    }

    let mut records = Vec::new();
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        match FilenameRecord::parse(&path) {
            Some(record) => records.push(record),
            None => log::debug!("Skipping {}: not a site camera image", path.display()),
        }
    }

    log::info!(
        "Found {} site camera images in {}",
        records.len(),
        directory.display()
    );

    let result = select_frames(records, window);

    log::info!(
        "{} captures qualify, {} days retained, {} days missing",
        result.total_photos,
        result.retained_files.len(),
        result.missing_dates.len()
    );

    Ok(result)
}

/// Apply `window` to already-parsed captures and reduce them to one per day.
pub fn select_frames(records: Vec<FilenameRecord>, window: &FilterWindow) -> FilterResult {
    let mut qualifying: Vec<FilenameRecord> = records
        .into_iter()
        .filter(|record| window.contains(&record.capture_time))
        .collect();

    // Path breaks timestamp ties so results do not depend on read_dir order.
    qualifying.sort_by(|a, b| {
        a.capture_time
            .cmp(&b.capture_time)
            .then_with(|| a.source_path.cmp(&b.source_path))
    });

    let (Some(first), Some(last)) = (qualifying.first(), qualifying.last()) else {
        return FilterResult::default();
    };
    let start_date = first.date();
    let end_date = last.date();

    // First capture of each day wins.
    let mut by_date: BTreeMap<Date, &Path> = BTreeMap::new();
    for record in &qualifying {
        by_date
            .entry(record.date())
            .or_insert(record.source_path.as_path());
    }

    let mut missing_dates = Vec::new();
    let mut day = start_date;
    while day <= end_date {
        if !by_date.contains_key(&day) {
            missing_dates.push(day);
        }
        match day.next_day() {
            Some(next) => day = next,
            None => break,
        }
    }

    FilterResult {
        total_photos: qualifying.len(),
        start_date: Some(start_date),
        end_date: Some(end_date),
        retained_files: by_date.values().map(|path| path.to_path_buf()).collect(),
        missing_dates,
    }
}

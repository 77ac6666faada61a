use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimelapseError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    // Filesystem errors
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    // Configuration errors
    #[error("Invalid time of day '{0}': expected HHMM in 24-hour format")]
    InvalidTimeOfDay(String),

    #[error("Invalid time window: start {start} is after end {end} (windows cannot span midnight)")]
    InvalidWindow { start: String, end: String },

    #[error("Invalid year range: start year {start} is after end year {end}")]
    InvalidYearRange { start: i32, end: i32 },

    #[error("Invalid position code '{0}'. Use 'BL', 'BR', 'TL', or 'TR'.")]
    InvalidAnchor(String),

    #[error("Date parsing error: {0}")]
    InvalidDateFormat(String),

    // Video errors
    #[error("Video encoder error: {0}")]
    Encoder(String),

    #[error("Video sink is not open")]
    SinkNotOpen,

    #[error("Frame size {got_width}x{got_height} does not match video size {width}x{height}")]
    FrameSize {
        width: u32,
        height: u32,
        got_width: u32,
        got_height: u32,
    },

    // Generic errors
    #[error("Argument error: {0}")]
    Argument(String),
}

/// Result type for timelapse operations.
pub type Result<T> = std::result::Result<T, TimelapseError>;

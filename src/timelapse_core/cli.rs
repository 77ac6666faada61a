use crate::timelapse_core::assemble::{OverwritePolicy, TimelapseSpec};
use crate::timelapse_core::catalog::SiteFilter;
use crate::timelapse_core::error::Result;
use crate::timelapse_core::overlay::OverlayPosition;
use crate::timelapse_core::select::FilterWindow;
use clap::{Args, Parser, Subcommand, ValueEnum};
use simplelog::LevelFilter;
use std::path::PathBuf;
use time::macros::format_description;
use time::{Date, PrimitiveDateTime, Time};

#[derive(Parser, Debug)]
#[command(author, version, about = "Build one-frame-per-day timelapse videos from site camera archives")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable file logging to sandlapse.log
    #[arg(long = "log", global = true)]
    pub log: bool,

    /// Log level for file logging (debug, info, warn, error)
    #[arg(long, default_value_t = LevelFilter::Debug, global = true)]
    pub log_level: LevelFilter,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List site camera folders found under an archive root
    Sites {
        /// Archive root to search
        #[arg(required = true)]
        root: PathBuf,

        #[command(flatten)]
        site_filter: SiteFilterArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Summary)]
        output: OutputFormat,
    },

    /// Select one image per day from a site folder and report missing days
    Filter {
        /// Site folder containing the images
        #[arg(required = true)]
        site_dir: PathBuf,

        #[command(flatten)]
        window: WindowArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Summary)]
        output: OutputFormat,
    },

    /// Build a timelapse video for one site folder
    Create {
        /// Site folder containing the images
        #[arg(required = true)]
        site_dir: PathBuf,

        /// Name used in the output file (defaults to the folder name)
        #[arg(long)]
        site_name: Option<String>,

        #[command(flatten)]
        window: WindowArgs,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Build timelapse videos for every site found under an archive root.
    ///
    /// Sites are processed one after another. A failure on one site is
    /// reported and the remaining sites are still attempted.
    Batch {
        /// Archive root to search
        #[arg(required = true)]
        root: PathBuf,

        #[command(flatten)]
        site_filter: SiteFilterArgs,

        #[command(flatten)]
        window: WindowArgs,

        #[command(flatten)]
        render: RenderArgs,
    },
}

/// Time-of-day window and optional year range.
#[derive(Args, Debug, Clone)]
pub struct WindowArgs {
    /// Earliest capture time of day, 24-hour HHMM (e.g. 1100)
    #[arg(long, required = true)]
    pub start: String,

    /// Latest capture time of day, 24-hour HHMM (e.g. 1300)
    #[arg(long, required = true)]
    pub end: String,

    /// First year to include
    #[arg(long)]
    pub start_year: Option<i32>,

    /// Last year to include
    #[arg(long)]
    pub end_year: Option<i32>,
}

impl WindowArgs {
    pub fn to_window(&self) -> Result<FilterWindow> {
        FilterWindow::from_hhmm(&self.start, &self.end, self.start_year, self.end_year)
    }
}

/// Which discovered sites to keep.
#[derive(Args, Debug, Clone)]
pub struct SiteFilterArgs {
    /// Skip sites with fewer matching images than this
    #[arg(long, default_value_t = 1)]
    pub min_files: usize,

    /// Skip sites whose last capture is not after this (YYYY-MM-DD or "YYYY-MM-DD HH:MM")
    #[arg(long, value_parser = parse_cutoff)]
    pub ended_after: Option<PrimitiveDateTime>,
}

impl SiteFilterArgs {
    pub fn to_filter(&self) -> SiteFilter {
        SiteFilter {
            min_files: self.min_files,
            ended_after: self.ended_after,
        }
    }
}

fn parse_cutoff(s: &str) -> std::result::Result<PrimitiveDateTime, String> {
    let with_time = format_description!("[year]-[month]-[day] [hour]:[minute]");
    let date_only = format_description!("[year]-[month]-[day]");

    PrimitiveDateTime::parse(s, with_time)
        .or_else(|_| Date::parse(s, date_only).map(|d| PrimitiveDateTime::new(d, Time::MIDNIGHT)))
        .map_err(|e| format!("expected YYYY-MM-DD or \"YYYY-MM-DD HH:MM\": {}", e))
}

/// Video rendering options.
#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Directory the video is written to
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Frames per second (7 = one week per second)
    #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(u32).range(1..))]
    pub frame_rate: u32,

    /// Scale frames to this percentage of the source size (100 = no resize)
    #[arg(long, default_value_t = 25, value_parser = clap::value_parser!(u32).range(1..))]
    pub resize_percent: u32,

    /// Size of the timestamp text
    #[arg(long, default_value_t = 1.0)]
    pub font_scale: f32,

    /// Stroke width of the timestamp text
    #[arg(long, default_value_t = 2)]
    pub thickness: u32,

    /// Corner for the timestamp: BL, BR, TL, TR (or bottom-left, ...)
    #[arg(long, default_value_t = OverlayPosition::BottomLeft)]
    pub position: OverlayPosition,

    /// What to do when the output video already exists
    #[arg(long, value_enum, default_value_t = OverwritePolicy::Prompt)]
    pub overwrite: OverwritePolicy,

    /// ffmpeg video codec
    #[arg(long, default_value = "mpeg4")]
    pub codec: String,
}

impl RenderArgs {
    pub fn to_spec(&self) -> TimelapseSpec {
        TimelapseSpec {
            out_dir: self.out_dir.clone(),
            frame_rate: self.frame_rate,
            resize_percent: self.resize_percent,
            overlay_font_scale: self.font_scale,
            overlay_thickness: self.thickness,
            overlay_position: self.position,
            overwrite_policy: self.overwrite,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Summary,
    /// JSON output
    Json,
    /// One path per line
    Paths,
}

pub mod assemble;
pub mod catalog;
pub mod cli;
pub mod error;
pub mod filename;
pub mod overlay;
pub mod raster;
pub mod select;
pub mod sink;

pub use assemble::{
    Confirm, OverwritePolicy, TerminalConfirm, TimelapseOutput, TimelapseSpec, create_timelapse,
};
pub use catalog::{DirectoryCatalog, SiteCatalog, SiteFilter, SiteInfo};
pub use cli::{Cli, Commands};
pub use error::TimelapseError;
pub use filename::{FilenameRecord, parse_capture_time};
pub use overlay::{OverlayPosition, TextStyle};
pub use select::{FilterResult, FilterWindow, filter_images, select_frames};
pub use sink::{FfmpegSink, VideoSink};

use crate::timelapse_core::error::{Result, TimelapseError};
use crate::timelapse_core::filename::{
    format_date, format_overlay_timestamp, format_stamp, parse_capture_time,
};
use crate::timelapse_core::overlay::{
    NO_IMAGERY_LABEL, OverlayPosition, TextStyle, overlay_centered, overlay_text,
};
use crate::timelapse_core::raster::{blank_frame, decode_image, fit_to, resize};
use crate::timelapse_core::select::FilterResult;
use crate::timelapse_core::sink::VideoSink;
use clap::ValueEnum;
use image::RgbImage;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use time::PrimitiveDateTime;

/// Largest accepted overlay font scale (glyphs 420 pixels tall).
const MAX_FONT_SCALE: f32 = 20.0;
/// Largest accepted overlay stroke width in pixels.
const MAX_THICKNESS: u32 = 50;

/// What to do when the output video already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OverwritePolicy {
    /// Replace the existing file
    Always,
    /// Keep the existing file and skip the site
    Never,
    /// Ask before replacing
    #[default]
    Prompt,
}

impl fmt::Display for OverwritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OverwritePolicy::Always => "always",
            OverwritePolicy::Never => "never",
            OverwritePolicy::Prompt => "prompt",
        };
        write!(f, "{}", s)
    }
}

/// Asks the user a yes/no question.
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> Result<bool>;
}

/// Asks on the terminal, repeating until the answer is `y` or `n`.
/// End of input counts as `n`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        loop {
            print!("{} (y/n): ", question);
            io::stdout().flush()?;

            let mut input = String::new();
            if io::stdin().read_line(&mut input)? == 0 {
                println!();
                return Ok(false);
            }

            match input.trim().to_lowercase().as_str() {
                "y" => return Ok(true),
                "n" => return Ok(false),
                _ => println!("Invalid input. Please enter 'y' for yes or 'n' for no."),
            }
        }
    }
}

/// Rendering and output settings for one timelapse run.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelapseSpec {
    pub out_dir: PathBuf,
    /// Frames per second. At the default of 7, one second of video is one week.
    pub frame_rate: u32,
    /// Scale applied to every frame; 100 keeps the original size.
    pub resize_percent: u32,
    pub overlay_font_scale: f32,
    pub overlay_thickness: u32,
    pub overlay_position: OverlayPosition,
    pub overwrite_policy: OverwritePolicy,
}

impl Default for TimelapseSpec {
    fn default() -> Self {
        TimelapseSpec {
            out_dir: PathBuf::from("."),
            frame_rate: 7,
            resize_percent: 25,
            overlay_font_scale: 1.0,
            overlay_thickness: 2,
            overlay_position: OverlayPosition::BottomLeft,
            overwrite_policy: OverwritePolicy::Prompt,
        }
    }
}

impl TimelapseSpec {
    pub fn validate(&self) -> Result<()> {
        if self.frame_rate == 0 {
            return Err(TimelapseError::Argument(
                "frame rate must be at least 1".to_string(),
            ));
        }
        if self.resize_percent == 0 {
            return Err(TimelapseError::Argument(
                "resize percent must be at least 1".to_string(),
            ));
        }
        if !self.overlay_font_scale.is_finite()
            || self.overlay_font_scale <= 0.0
            || self.overlay_font_scale > MAX_FONT_SCALE
        {
            return Err(TimelapseError::Argument(format!(
                "font scale must be greater than 0 and at most {}, got {}",
                MAX_FONT_SCALE, self.overlay_font_scale
            )));
        }
        if self.overlay_thickness > MAX_THICKNESS {
            return Err(TimelapseError::Argument(format!(
                "text thickness must be at most {}, got {}",
                MAX_THICKNESS, self.overlay_thickness
            )));
        }
        Ok(())
    }

    pub fn text_style(&self) -> TextStyle {
        TextStyle {
            font_scale: self.overlay_font_scale,
            thickness: self.overlay_thickness,
            ..TextStyle::default()
        }
    }

    /// `{out_dir}/{site}_timelapse_{YYYYMMDDHHMM}_to_{YYYYMMDDHHMM}.mp4`
    pub fn output_path(
        &self,
        site_name: &str,
        start: &PrimitiveDateTime,
        end: &PrimitiveDateTime,
    ) -> Result<PathBuf> {
        Ok(self.out_dir.join(format!(
            "{}_timelapse_{}_to_{}.mp4",
            site_name,
            format_stamp(start)?,
            format_stamp(end)?
        )))
    }
}

/// A finished timelapse video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelapseOutput {
    pub path: PathBuf,
    /// One per calendar day from the first to the last retained capture.
    pub frame_count: usize,
    /// Frames that stand in for days without imagery.
    pub placeholder_count: usize,
    pub file_size: u64,
}

/// Build a timelapse video from `filter_result`, one frame per calendar day.
///
/// Returns `Ok(None)` without touching `sink` when there is nothing to do:
/// no retained files, or the output exists and overwriting was declined.
/// If anything fails after the sink was opened the sink is aborted, so no
/// partial video is left behind.
pub fn create_timelapse(
    site_name: &str,
    filter_result: &FilterResult,
    spec: &TimelapseSpec,
    sink: &mut dyn VideoSink,
    confirm: &mut dyn Confirm,
) -> Result<Option<TimelapseOutput>> {
    spec.validate()?;

    let files = &filter_result.retained_files;
    let (Some(first_file), Some(last_file)) = (files.first(), files.last()) else {
        println!("No images to process.");
        return Ok(None);
    };

    let (Some(start), Some(end)) = (parse_capture_time(first_file), parse_capture_time(last_file))
    else {
        log::error!("Unable to parse date-time from filenames.");
        return Ok(None);
    };

    let output_path = spec.output_path(site_name, &start, &end)?;
    if output_path.exists() && !should_overwrite(&output_path, spec.overwrite_policy, confirm)? {
        println!("Skipping timelapse creation.");
        return Ok(None);
    }

    let first_frame = resize(decode_image(first_file)?, spec.resize_percent);
    let (width, height) = first_frame.dimensions();

    sink.open(width, height, spec.frame_rate, &output_path)?;

    let counts = match write_frames(files, start, end, first_frame, spec, sink) {
        Ok(counts) => counts,
        Err(e) => {
            log::error!("Aborting timelapse {}: {}", output_path.display(), e);
            sink.abort();
            return Err(e);
        }
    };

    let file_size = sink.close()?;

    Ok(Some(TimelapseOutput {
        path: output_path,
        frame_count: counts.frames,
        placeholder_count: counts.placeholders,
        file_size,
    }))
}

fn should_overwrite(
    output_path: &Path,
    policy: OverwritePolicy,
    confirm: &mut dyn Confirm,
) -> Result<bool> {
    match policy {
        OverwritePolicy::Always => {
            log::info!("Overwriting existing output {}", output_path.display());
            Ok(true)
        }
        OverwritePolicy::Never => {
            log::info!("Output {} already exists", output_path.display());
            Ok(false)
        }
        OverwritePolicy::Prompt => confirm.confirm(&format!(
            "Output file {} already exists. Do you want to overwrite it?",
            output_path.display()
        )),
    }
}

struct FrameCounts {
    frames: usize,
    placeholders: usize,
}

/// Emit one frame per day from `start` to `end`, walking a cursor through
/// the chronologically sorted `files`.
fn write_frames(
    files: &[PathBuf],
    start: PrimitiveDateTime,
    end: PrimitiveDateTime,
    first_frame: RgbImage,
    spec: &TimelapseSpec,
    sink: &mut dyn VideoSink,
) -> Result<FrameCounts> {
    let style = spec.text_style();
    let (width, height) = first_frame.dimensions();
    let mut first_frame = Some(first_frame);

    let days = (end.date() - start.date()).whole_days().max(0) as u64 + 1;
    let bar = ProgressBar::new(days).with_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message("Writing frames");

    let mut counts = FrameCounts {
        frames: 0,
        placeholders: 0,
    };
    let mut cursor = 0;
    let mut day = start.date();
    let end_date = end.date();

    while day <= end_date {
        let next = files
            .get(cursor)
            .and_then(|path| parse_capture_time(path).map(|taken| (path, taken)));

        let frame = match next {
            Some((path, taken)) if taken.date() == day => {
                log::debug!(
                    "Processing image {} - {} out of {}",
                    path.display(),
                    cursor + 1,
                    files.len()
                );
                let img = match first_frame.take() {
                    Some(img) if cursor == 0 => img,
                    _ => resize(decode_image(path)?, spec.resize_percent),
                };
                if img.dimensions() != (width, height) {
                    log::warn!(
                        "{} is {}x{} after resizing, scaling to {}x{}",
                        path.display(),
                        img.width(),
                        img.height(),
                        width,
                        height
                    );
                }
                let mut img = fit_to(img, width, height);
                overlay_text(
                    &mut img,
                    &format_overlay_timestamp(&taken)?,
                    spec.overlay_position,
                    &style,
                );
                cursor += 1;
                img
            }
            _ => {
                let date_str = format_date(&day)?;
                log::info!("No imagery available for {}", date_str);
                let mut img = blank_frame(width, height);
                overlay_centered(&mut img, NO_IMAGERY_LABEL, &TextStyle::default());
                overlay_text(&mut img, &date_str, spec.overlay_position, &style);
                counts.placeholders += 1;
                img
            }
        };

        sink.append(&frame)?;
        counts.frames += 1;
        bar.inc(1);

        match day.next_day() {
            Some(next_day) => day = next_day,
            None => break,
        }
    }

    bar.finish_with_message("Frames written");
    Ok(counts)
}

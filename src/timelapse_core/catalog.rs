use crate::timelapse_core::error::{Result, TimelapseError};
use crate::timelapse_core::filename::FilenameRecord;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use time::PrimitiveDateTime;
use walkdir::WalkDir;

time::serde::format_description!(
    capture_stamp,
    PrimitiveDateTime,
    "[year]-[month]-[day] [hour]:[minute]"
);

static SITE_DIR_PATTERN: OnceLock<Regex> = OnceLock::new();

fn site_dir_pattern() -> &'static Regex {
    SITE_DIR_PATTERN
        .get_or_init(|| Regex::new(r"^RC[0-9]{4}[RL][a-z]?").expect("site pattern is a valid regex"))
}

/// A camera site folder and a summary of the captures in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteInfo {
    pub site_id: String,
    pub directory: PathBuf,
    pub file_count: usize,
    #[serde(with = "capture_stamp")]
    pub first_capture: PrimitiveDateTime,
    #[serde(with = "capture_stamp")]
    pub last_capture: PrimitiveDateTime,
}

/// Source of site directories to build timelapses from.
pub trait SiteCatalog {
    fn discover(&self, root: &Path) -> Result<Vec<SiteInfo>>;
}

/// Finds site folders (`RC####R`, `RC####Lb`, ...) anywhere below a root
/// directory and summarises the site camera images directly inside each.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectoryCatalog;

impl SiteCatalog for DirectoryCatalog {
    fn discover(&self, root: &Path) -> Result<Vec<SiteInfo>> {
        if !root.exists() {
            return Err(TimelapseError::PathNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(TimelapseError::NotADirectory(root.to_path_buf()));
        }

        let mut sites = Vec::new();

        for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };

            if !entry.file_type().is_dir() {
                continue;
            }

            let Some(dir_name) = entry.file_name().to_str() else {
                continue;
            };
            if !site_dir_pattern().is_match(dir_name) {
                continue;
            }

            if let Some(site) = summarize_site(dir_name, entry.path())? {
                log::info!(
                    "Directory: {} ({}) contains {} matching files, {} to {}",
                    site.directory.display(),
                    site.site_id,
                    site.file_count,
                    site.first_capture,
                    site.last_capture
                );
                sites.push(site);
            }
        }

        Ok(sites)
    }
}

fn summarize_site(site_id: &str, dir: &Path) -> Result<Option<SiteInfo>> {
    let mut file_count = 0;
    let mut range: Option<(PrimitiveDateTime, PrimitiveDateTime)> = None;

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(record) = FilenameRecord::parse(&path) else {
            continue;
        };

        file_count += 1;
        let t = record.capture_time;
        range = Some(match range {
            None => (t, t),
            Some((first, last)) => (first.min(t), last.max(t)),
        });
    }

    Ok(range.map(|(first_capture, last_capture)| SiteInfo {
        site_id: site_id.to_string(),
        directory: dir.to_path_buf(),
        file_count,
        first_capture,
        last_capture,
    }))
}

/// Which discovered sites are worth building a timelapse for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteFilter {
    pub min_files: usize,
    /// Only keep sites whose last capture is strictly after this instant.
    pub ended_after: Option<PrimitiveDateTime>,
}

impl Default for SiteFilter {
    fn default() -> Self {
        SiteFilter {
            min_files: 1,
            ended_after: None,
        }
    }
}

impl SiteFilter {
    pub fn accepts(&self, site: &SiteInfo) -> bool {
        site.file_count >= self.min_files
            && self.ended_after.is_none_or(|cutoff| site.last_capture > cutoff)
    }

    /// Split `sites` into (kept, skipped), preserving order.
    pub fn apply(&self, sites: Vec<SiteInfo>) -> (Vec<SiteInfo>, Vec<SiteInfo>) {
        sites.into_iter().partition(|site| self.accepts(site))
    }
}

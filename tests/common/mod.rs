#![allow(dead_code)]

use assert_fs::TempDir;
use assert_fs::fixture::ChildPath;
use assert_fs::prelude::*;
use image::{Rgb, RgbImage};

pub use sandlapse::timelapse_core::sink::ffmpeg_available;

/// Create a site folder holding empty files with the given names.
pub fn setup_site(temp_dir: &TempDir, site: &str, names: &[&str]) -> ChildPath {
    let site_dir = temp_dir.child(site);
    site_dir.create_dir_all().unwrap();
    for name in names {
        site_dir.child(name).touch().unwrap();
    }
    site_dir
}

/// Write a small solid-gray JPEG at `path`.
pub fn write_jpeg(path: &ChildPath) {
    RgbImage::from_pixel(160, 120, Rgb([120, 120, 120]))
        .save(path.path())
        .unwrap();
}

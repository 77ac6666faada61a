// E2E tests for the sandlapse CLI commands
use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

mod common;
use common::{ffmpeg_available, setup_site, write_jpeg};

const SCENARIO_FILES: &[&str] = &[
    "RC0307R_20200101_1200.jpg",
    "RC0307R_20200103_1200.jpg",
    "RC0307R_20200103_1700.jpg",
    "notes.txt",
];

#[test]
fn test_filter_command() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let site_dir = setup_site(&temp_dir, "RC0307R", SCENARIO_FILES);

    let mut cmd = Command::cargo_bin("sandlapse").unwrap();
    cmd.arg("filter")
        .arg(site_dir.path())
        .args(["--start", "1100", "--end", "1300"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total photos: 2"))
        .stdout(predicate::str::contains("Start date: 2020-01-01"))
        .stdout(predicate::str::contains("End date: 2020-01-03"))
        .stdout(predicate::str::contains("Missing dates (1): 2020-01-02"));
}

#[test]
fn test_filter_json_output() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let site_dir = setup_site(&temp_dir, "RC0307R", SCENARIO_FILES);

    let output = Command::cargo_bin("sandlapse")
        .unwrap()
        .arg("filter")
        .arg(site_dir.path())
        .args(["--start", "1100", "--end", "1300", "--output", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["total_photos"], 2);
    assert_eq!(json["missing_dates"], serde_json::json!(["2020-01-02"]));
    assert_eq!(json["retained_files"].as_array().unwrap().len(), 2);
}

#[test]
fn test_filter_nothing_qualifies() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let site_dir = setup_site(&temp_dir, "RC0307R", SCENARIO_FILES);

    let mut cmd = Command::cargo_bin("sandlapse").unwrap();
    cmd.arg("filter")
        .arg(site_dir.path())
        .args(["--start", "1400", "--end", "1500"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total photos: 0"))
        .stdout(predicate::str::contains("Start date: none"));
}

#[test]
fn test_filter_rejects_wrapping_window() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let site_dir = setup_site(&temp_dir, "RC0307R", SCENARIO_FILES);

    let mut cmd = Command::cargo_bin("sandlapse").unwrap();
    cmd.arg("filter")
        .arg(site_dir.path())
        .args(["--start", "2200", "--end", "0200"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot span midnight"));
}

#[test]
fn test_sites_command() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    setup_site(&temp_dir, "archive/RC0307R", SCENARIO_FILES);
    setup_site(&temp_dir, "archive/RC1459Lb", &["RC1459Lb_20190101_1200_web.jpg"]);
    setup_site(&temp_dir, "archive/other", &["RC0307R_20200101_1200.jpg"]);

    let mut cmd = Command::cargo_bin("sandlapse").unwrap();
    cmd.arg("sites")
        .arg(temp_dir.child("archive").path())
        .assert()
        .success()
        .stdout(predicate::str::contains("(RC0307R) contains 3 matching files."))
        .stdout(predicate::str::contains("(RC1459Lb) contains 1 matching files."))
        .stdout(predicate::str::contains("other").not());

    let mut filtered = Command::cargo_bin("sandlapse").unwrap();
    filtered
        .arg("sites")
        .arg(temp_dir.child("archive").path())
        .args(["--min-files", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Site: RC1459Lb skipped because it contains just 1 image files",
        ));
}

#[test]
fn test_create_with_nothing_to_process() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let site_dir = setup_site(&temp_dir, "RC0307R", SCENARIO_FILES);
    let out_dir = temp_dir.child("videos");
    out_dir.create_dir_all().unwrap();

    let mut cmd = Command::cargo_bin("sandlapse").unwrap();
    cmd.arg("create")
        .arg(site_dir.path())
        .args(["--start", "1400", "--end", "1500"])
        .arg("--out-dir")
        .arg(out_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No images to process."));

    out_dir.assert(predicate::path::is_dir());
    assert_eq!(std::fs::read_dir(out_dir.path()).unwrap().count(), 0);
}

#[test]
fn test_create_never_overwrites_existing_video() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let site_dir = setup_site(&temp_dir, "RC0307R", SCENARIO_FILES);
    let existing = temp_dir.child("RC0307R_timelapse_202001011200_to_202001031200.mp4");
    existing.write_str("previous video").unwrap();

    let mut cmd = Command::cargo_bin("sandlapse").unwrap();
    cmd.arg("create")
        .arg(site_dir.path())
        .args(["--start", "1100", "--end", "1300", "--overwrite", "never"])
        .arg("--out-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipping timelapse creation."));

    existing.assert("previous video");
}

#[test]
fn test_create_prompt_declined_on_empty_input() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let site_dir = setup_site(&temp_dir, "RC0307R", SCENARIO_FILES);
    let existing = temp_dir.child("RC0307R_timelapse_202001011200_to_202001031200.mp4");
    existing.write_str("previous video").unwrap();

    let mut cmd = Command::cargo_bin("sandlapse").unwrap();
    cmd.arg("create")
        .arg(site_dir.path())
        .args(["--start", "1100", "--end", "1300"])
        .arg("--out-dir")
        .arg(temp_dir.path())
        .write_stdin("maybe\nn\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Invalid input."))
        .stdout(predicate::str::contains("Skipping timelapse creation."));

    existing.assert("previous video");
}

#[test]
fn test_create_rejects_invalid_position() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let site_dir = setup_site(&temp_dir, "RC0307R", SCENARIO_FILES);

    let mut cmd = Command::cargo_bin("sandlapse").unwrap();
    cmd.arg("create")
        .arg(site_dir.path())
        .args(["--start", "1100", "--end", "1300", "--position", "CENTER"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid position code"));
}

#[test]
fn test_create_video() {
    if !ffmpeg_available() {
        eprintln!("ffmpeg not installed, skipping");
        return;
    }

    let temp_dir = assert_fs::TempDir::new().unwrap();
    let site_dir = temp_dir.child("RC0307R");
    site_dir.create_dir_all().unwrap();
    write_jpeg(&site_dir.child("RC0307R_20200101_1200.jpg"));
    write_jpeg(&site_dir.child("RC0307R_20200104_1130.jpg"));
    let out_dir = temp_dir.child("videos");
    out_dir.create_dir_all().unwrap();

    let mut cmd = Command::cargo_bin("sandlapse").unwrap();
    cmd.arg("create")
        .arg(site_dir.path())
        .args(["--start", "1100", "--end", "1300", "--resize-percent", "50"])
        .arg("--out-dir")
        .arg(out_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("4 frames (2 without imagery)"));

    out_dir
        .child("RC0307R_timelapse_202001011200_to_202001041130.mp4")
        .assert(predicate::path::is_file());
    out_dir
        .child(".RC0307R_timelapse_202001011200_to_202001041130.mp4.partial")
        .assert(predicate::path::missing());
}

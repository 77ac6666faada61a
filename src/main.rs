use anyhow::{Result, bail};
use clap::Parser;
use sandlapse::timelapse_core::cli::{OutputFormat, RenderArgs, WindowArgs};
use sandlapse::timelapse_core::filename::{format_date, format_overlay_timestamp};
use sandlapse::timelapse_core::{
    Cli, Commands, DirectoryCatalog, FfmpegSink, FilterResult, SiteCatalog, SiteInfo,
    TerminalConfirm, create_timelapse, filter_images,
};
use simplelog::{CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, WriteLogger};
use std::fs::File;
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize loggers
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        LevelFilter::Warn,
        Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )];

    if cli.log {
        loggers.push(WriteLogger::new(
            cli.log_level,
            Config::default(),
            File::create("sandlapse.log")?,
        ));
    }

    CombinedLogger::init(loggers)?;

    match cli.command {
        Commands::Sites {
            root,
            site_filter,
            output,
        } => {
            let sites = DirectoryCatalog.discover(&root)?;
            let (kept, skipped) = site_filter.to_filter().apply(sites);

            match output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&kept)?),
                OutputFormat::Paths => {
                    for site in &kept {
                        println!("{}", site.directory.display());
                    }
                }
                OutputFormat::Summary => {
                    for site in &skipped {
                        print_skipped(site)?;
                    }
                    print_sites(&kept)?;
                }
            }
        }

        Commands::Filter {
            site_dir,
            window,
            output,
        } => {
            let result = filter_images(&site_dir, &window.to_window()?)?;

            match output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                OutputFormat::Paths => {
                    for path in &result.retained_files {
                        println!("{}", path.display());
                    }
                }
                OutputFormat::Summary => print_filter_summary(&result)?,
            }
        }

        Commands::Create {
            site_dir,
            site_name,
            window,
            render,
        } => {
            let site_name = match site_name {
                Some(name) => name,
                None => site_name_from_dir(&site_dir)?,
            };
            build_site(&site_name, &site_dir, &window, &render)?;
        }

        Commands::Batch {
            root,
            site_filter,
            window,
            render,
        } => {
            // Fail on a bad window before touching the archive.
            window.to_window()?;

            let sites = DirectoryCatalog.discover(&root)?;
            let (kept, skipped) = site_filter.to_filter().apply(sites);
            for site in &skipped {
                print_skipped(site)?;
            }

            let mut failures = Vec::new();
            for site in &kept {
                println!("\n=== {} ===", site.site_id);
                if let Err(e) = build_site(&site.site_id, &site.directory, &window, &render) {
                    log::error!("Timelapse for {} failed: {}", site.site_id, e);
                    failures.push(site.site_id.clone());
                }
            }

            println!("\nBatch complete!");
            println!("  {} sites processed", kept.len() - failures.len());
            if !skipped.is_empty() {
                println!("  {} sites skipped", skipped.len());
            }
            if !failures.is_empty() {
                bail!("{} sites failed: {}", failures.len(), failures.join(", "));
            }
        }
    }

    Ok(())
}

/// Filter one site folder and build its timelapse.
fn build_site(site_name: &str, site_dir: &Path, window: &WindowArgs, render: &RenderArgs) -> Result<()> {
    let result = filter_images(site_dir, &window.to_window()?)?;
    print_filter_summary(&result)?;

    let spec = render.to_spec();
    let mut sink = FfmpegSink::new(&render.codec);
    let mut confirm = TerminalConfirm;

    if let Some(output) = create_timelapse(site_name, &result, &spec, &mut sink, &mut confirm)? {
        println!("\nTimelapse complete!");
        println!("  {}", output.path.display());
        println!("  {} frames ({} without imagery)", output.frame_count, output.placeholder_count);
        println!("  {:.1} MB", output.file_size as f64 / 1_048_576.0);
    }

    Ok(())
}

fn site_name_from_dir(site_dir: &Path) -> Result<String> {
    let canonical = site_dir.canonicalize()?;
    match canonical.file_name() {
        Some(name) => Ok(name.to_string_lossy().to_string()),
        None => bail!("Cannot derive a site name from {}; pass --site-name", site_dir.display()),
    }
}

fn print_filter_summary(result: &FilterResult) -> Result<()> {
    let show = |date: Option<time::Date>| -> Result<String> {
        Ok(match date {
            Some(d) => format_date(&d)?,
            None => "none".to_string(),
        })
    };
    let missing = result
        .missing_dates
        .iter()
        .map(format_date)
        .collect::<Result<Vec<_>, _>>()?;

    println!("Total photos: {}", result.total_photos);
    println!("Start date: {}", show(result.start_date)?);
    println!("End date: {}", show(result.end_date)?);
    println!("Retained days: {}", result.retained_files.len());
    println!("Missing dates ({}): {}", missing.len(), missing.join(", "));
    Ok(())
}

fn print_skipped(site: &SiteInfo) -> Result<()> {
    println!(
        "Site: {} skipped because it contains just {} image files or end date-time is {}",
        site.site_id,
        site.file_count,
        format_overlay_timestamp(&site.last_capture)?
    );
    Ok(())
}

fn print_sites(sites: &[SiteInfo]) -> Result<()> {
    if sites.is_empty() {
        println!("No site folders found.");
        return Ok(());
    }
    for site in sites {
        println!(
            "Directory: {} ({}) contains {} matching files.",
            site.directory.display(),
            site.site_id,
            site.file_count
        );
        println!("  Start date-time: {}", format_overlay_timestamp(&site.first_capture)?);
        println!("  End date-time: {}", format_overlay_timestamp(&site.last_capture)?);
    }
    Ok(())
}

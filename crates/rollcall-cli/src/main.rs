use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rollcall_core::{CorrelationMatcher, FeatureExtractor, Matcher, RustfaceLocator};
use rollcall_hw::Camera;
use rollcall_ledger::AttendanceLedger;
use std::path::{Path, PathBuf};

mod config;
mod watch;

use config::Config;

#[derive(Parser)]
#[command(name = "rollcall", about = "Rollcall face-recognition attendance CLI")]
struct Cli {
    /// Path to a TOML config file (default: $XDG_CONFIG_HOME/rollcall/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the camera and record attendance for recognized faces
    Run,
    /// Match a single image file against the gallery
    Probe {
        /// Image file to probe
        image: PathBuf,
        /// Print the match result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Build the gallery and list its entries
    Gallery {
        /// Print entry labels as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print recorded attendance
    Ledger {
        /// Only records for this date (MM/DD/YYYY)
        #[arg(long)]
        date: Option<String>,
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
    /// List V4L2 capture devices and probe the configured camera
    Devices,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run => watch::run(&config),
        Commands::Probe { image, json } => cmd_probe(&config, &image, json),
        Commands::Gallery { json } => cmd_gallery(&config, json),
        Commands::Ledger { date, json } => cmd_ledger(&config, date.as_deref(), json),
        Commands::Devices => cmd_devices(&config),
    }
}

fn build_extractor(config: &Config) -> Result<FeatureExtractor> {
    let locator = RustfaceLocator::load(&config.model_path)?;
    Ok(FeatureExtractor::new(Box::new(locator)))
}

/// Extract and match one image file, printing where it landed.
fn cmd_probe(config: &Config, image_path: &Path, json: bool) -> Result<()> {
    let extractor = build_extractor(config)?;
    let gallery = rollcall_core::load_gallery(&config.gallery_dir, &extractor)?;

    let image = image::open(image_path)
        .with_context(|| format!("cannot open {}", image_path.display()))?;

    let Some(descriptor) = extractor.extract_image(&image) else {
        anyhow::bail!("no face detected in {}", image_path.display());
    };

    let result = CorrelationMatcher.compare(&descriptor, &gallery, config.match_policy());

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        match &result.identity {
            Some(identity) => println!("{identity} (score {:.3})", result.score),
            None if result.ambiguous => {
                println!("unknown (ambiguous, best score {:.3})", result.score)
            }
            None => println!("unknown (best score {:.3})", result.score),
        }
    }

    Ok(())
}

fn cmd_gallery(config: &Config, json: bool) -> Result<()> {
    let extractor = build_extractor(config)?;
    let gallery = rollcall_core::load_gallery(&config.gallery_dir, &extractor)?;

    if json {
        let labels: Vec<&str> = gallery.iter().map(|e| e.label.as_str()).collect();
        println!("{}", serde_json::to_string_pretty(&labels)?);
    } else {
        println!(
            "{} usable entries in {}",
            gallery.len(),
            config.gallery_dir.display()
        );
        for entry in &gallery {
            println!("  {}", entry.label);
        }
    }

    Ok(())
}

fn cmd_ledger(config: &Config, date: Option<&str>, json: bool) -> Result<()> {
    let ledger = AttendanceLedger::new(&config.ledger_path);
    let mut records = ledger.records()?;

    if let Some(date) = date {
        let wanted = chrono::NaiveDate::parse_from_str(date, rollcall_ledger::DATE_FORMAT)
            .with_context(|| format!("bad date {date:?}, expected MM/DD/YYYY"))?;
        records.retain(|r| r.date == wanted);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else if records.is_empty() {
        println!("no attendance records");
    } else {
        for record in &records {
            println!(
                "{}  {}",
                record.timestamp.format("%m/%d/%Y %H:%M:%S"),
                record.identity
            );
        }
    }

    Ok(())
}

/// List capture devices, then grab one frame from the configured camera.
fn cmd_devices(config: &Config) -> Result<()> {
    let devices = Camera::list_devices();
    if devices.is_empty() {
        println!("no V4L2 capture devices found");
    } else {
        for dev in &devices {
            println!("{}  {} ({})", dev.path, dev.name, dev.driver);
        }
    }

    println!("probing {} ...", config.camera_device);
    let camera = Camera::open(&config.camera_device)?;
    let mut session = camera.start_stream()?;
    let frame = session.next_frame()?;
    println!(
        "{}x{} {:?}, avg brightness {:.1}",
        frame.width,
        frame.height,
        camera.fourcc,
        frame.avg_brightness()
    );

    Ok(())
}

//! tally_object - label, classify and record an image already in storage
//!
//! Used for images whose capture cycle uploaded them but never recorded a
//! tally (for example when the label service was down). The key may be given
//! as it appears in storage event notifications (form-encoded).

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use waste_tally::labels::detector_from_location;
use waste_tally::{tally_object, ObjectRef, SqliteTallyStore, WasteClassifier, WastedConfig};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Object key, plain or form-encoded (e.g. `images/image_20240309-140507.png`).
    #[arg(long)]
    key: String,
    /// Bucket holding the object. Defaults to the configured upload bucket.
    #[arg(long)]
    bucket: Option<String>,
    /// Config file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "WASTE_CONFIG")]
    config: Option<PathBuf>,
    /// Print the tally as JSON instead of a table.
    #[arg(long)]
    json: bool,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let ui = ui::Ui::from_args(&args.ui, std::io::stderr().is_terminal());

    let cfg = match &args.config {
        Some(path) => WastedConfig::load_from(path)?,
        None => WastedConfig::load()?,
    };
    let bucket = args.bucket.as_deref().unwrap_or(&cfg.upload.bucket);
    let object = ObjectRef::from_event_key(bucket, &args.key)?;

    let detector = detector_from_location(
        &cfg.labels.location,
        cfg.labels.fixture.as_deref(),
        cfg.labels.token.clone(),
        cfg.labels.timeout,
    )?;
    let mut tallies = {
        let _stage = ui.stage("Open tally database");
        SqliteTallyStore::open(&cfg.db_path)
            .with_context(|| format!("open tally database {}", cfg.db_path))?
    };

    let report = {
        let _stage = ui.stage("Label and record");
        tally_object(
            detector.as_ref(),
            &mut tallies,
            &WasteClassifier::new(cfg.labels.min_confidence),
            &object,
            cfg.labels.max_labels,
            &cfg.retry,
        )?
    };

    if args.json {
        let out = serde_json::json!({
            "bucket": report.object.bucket,
            "key": report.object.key,
            "time_stamp": report.time_stamp,
            "labels_seen": report.labels_seen,
            "rows_written": report.rows_written,
            "tally": report.tally,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        ui.print_tally(
            &format!(
                "{}/{}: {} labels, {} items recorded",
                report.object.bucket, report.object.key, report.labels_seen, report.rows_written
            ),
            &report.tally,
        );
    }
    Ok(())
}

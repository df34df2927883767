//! classify_labels - classify a saved label-detection response offline

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::{IsTerminal, Read};

use waste_tally::labels::parse_labels_json;
use waste_tally::{categorize, classify};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Label JSON file (`{"Labels": [...]}` or a bare array). Reads stdin when omitted.
    #[arg(long)]
    labels: Option<String>,
    /// Minimum confidence (0-100) for a label to be counted.
    #[arg(long, default_value_t = 70.0, env = "WASTE_MIN_CONFIDENCE")]
    min_confidence: f32,
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
    if !(0.0..=100.0).contains(&args.min_confidence) {
        return Err(anyhow!("--min-confidence must be within 0..=100"));
    }
    let ui = ui::Ui::from_args(&args.ui, std::io::stderr().is_terminal());

    let detections = {
        let _stage = ui.stage("Load labels");
        let raw = match &args.labels {
            Some(path) => std::fs::read_to_string(path)
                .map_err(|e| anyhow!("failed to read labels file {}: {}", path, e))?,
            None => {
                let mut raw = String::new();
                std::io::stdin().read_to_string(&mut raw)?;
                raw
            }
        };
        parse_labels_json(&raw)?
    };

    let tally = {
        let _stage = ui.stage("Classify");
        for detection in &detections {
            let counted = detection.confidence >= args.min_confidence;
            log::info!(
                "{} ({:.1}%) -> {}{}",
                detection.name,
                detection.confidence,
                categorize(&detection.name),
                if counted { "" } else { " [below threshold]" }
            );
        }
        classify(&detections, args.min_confidence)
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&tally)?);
    } else {
        ui.print_tally(
            &format!(
                "{} labels, {} counted at >= {}%",
                detections.len(),
                tally.total(),
                args.min_confidence
            ),
            &tally,
        );
    }
    Ok(())
}

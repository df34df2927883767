//! tally_report - print category totals from the tally database

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;

use waste_tally::{SqliteTallyStore, TallyStore};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the tally database.
    #[arg(long, default_value = "waste_tally.db", env = "WASTE_DB_PATH")]
    db_path: String,
    /// Only count records at or after this ISO-8601 timestamp.
    #[arg(long)]
    since: Option<String>,
    /// Also list this many most recent records.
    #[arg(long, default_value_t = 0)]
    recent: usize,
    /// Print totals as JSON instead of a table.
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

    let store = {
        let _stage = ui.stage("Open tally database");
        SqliteTallyStore::open(&args.db_path)?
    };
    let (totals, recent) = {
        let _stage = ui.stage("Query totals");
        let totals = match &args.since {
            Some(since) => store.totals_since(since)?,
            None => store.totals()?,
        };
        (totals, store.recent(args.recent)?)
    };

    if args.json {
        let out = serde_json::json!({
            "db_path": args.db_path,
            "since": args.since,
            "totals": totals,
            "recent": recent
                .iter()
                .map(|r| serde_json::json!({
                    "time_stamp": r.time_stamp,
                    "category": r.category.label(),
                    "object_id": r.category.id(),
                    "image_key": r.image_key,
                }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let title = match &args.since {
        Some(since) => format!("Totals since {} ({})", since, args.db_path),
        None => format!("Totals ({})", args.db_path),
    };
    ui.print_tally(&title, &totals);
    if !recent.is_empty() {
        println!("Recent");
        for record in &recent {
            println!(
                "  {}  {:<22} {}",
                record.time_stamp,
                record.category.label(),
                record.image_key.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(())
}

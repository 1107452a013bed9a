//! One-shot accounting report for a site and date range.
//!
//! Operator/debug tool: runs the same engine the API serves and prints both
//! ledgers plus the summary to stdout.

use anyhow::{bail, Result};
use carbontrack_backend::accounting::engine::{CarbonEngine, EngineConfig, MissingQuantityPolicy};
use carbontrack_backend::accounting::time::reporting_offset;
use carbontrack_backend::accounting::window::Window;
use carbontrack_backend::store::SqliteStore;
use chrono::NaiveDate;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "ledger-report", about = "Print the carbon ledgers for one site and window")]
struct Args {
    /// Path to the accounting database.
    #[arg(long, env = "DATABASE_PATH", default_value = "./carbontrack.db")]
    db: String,

    /// Site name (or the mock-site sandbox).
    #[arg(long)]
    site: String,

    /// First day of the window (reporting timezone), YYYY-MM-DD.
    #[arg(long)]
    start: NaiveDate,

    /// Last day of the window, inclusive.
    #[arg(long)]
    end: NaiveDate,

    /// Reporting timezone offset in hours east of UTC.
    #[arg(long, default_value_t = 3)]
    offset_hours: i32,

    /// Customer id of the producing organization itself.
    #[arg(long, default_value = "DEC")]
    self_customer: String,

    /// Abort when a production record has no quantity instead of counting it
    /// as zero.
    #[arg(long)]
    strict_quantities: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if args.end < args.start {
        bail!("end date precedes start date");
    }

    let store = SqliteStore::new(&args.db)?;
    let offset = reporting_offset(args.offset_hours);
    let config = EngineConfig {
        reporting_offset: offset,
        self_customer_id: args.self_customer.clone(),
        missing_quantity: if args.strict_quantities {
            MissingQuantityPolicy::Fault
        } else {
            MissingQuantityPolicy::Zero
        },
    };

    let window = Window::reporting_days(args.start, args.end, offset);
    let engine = CarbonEngine::new(&store, config);
    let run = match engine.run(&args.site, &window) {
        Ok(run) => run,
        Err(fault) => bail!("accounting run aborted: {fault}"),
    };
    let summary = run.summary();

    println!(
        "Carbon ledger for {} ({} .. {})",
        args.site, args.start, args.end
    );
    println!();
    println!("Carbon retired");
    println!("{:<16} {:<12} {:>14} {:>14}", "Order #", "Date", "Tons Carbon", "Tons CO2eq");
    for row in &run.retired {
        println!(
            "{:<16} {:<12} {:>14.6} {:>14.6}",
            row.order_number, row.date, row.tons_carbon, row.tons_co2eq
        );
    }
    println!();
    println!("Carbon released");
    println!("{:<16} {:<28} {:<12} {:>14}", "Row ID", "Type", "Date", "Tons CO2eq");
    for row in &run.released {
        println!(
            "{:<16} {:<28} {:<12} {:>14.6}",
            row.row_id, row.label, row.date, row.tons_co2eq
        );
    }
    println!();
    println!("Biochar produced:  {:.3} T", run.total_biochar_tons);
    println!("Gross CO2 removed: {:.3} T", summary.gross_offset_tons);
    println!("Net CO2 removed:   {:.3} T", summary.net_offset_tons);

    Ok(())
}

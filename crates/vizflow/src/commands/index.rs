//! Index command - storage index maintenance.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::{Style, style};
use serde_json::json;
use vizflow_store::{ReconcileReport, StorageIndex};

use super::{Context, print_json};

/// Arguments for the index command.
#[derive(Args, Debug)]
pub struct IndexArgs {
    #[command(subcommand)]
    pub command: IndexCommand,
}

#[derive(Subcommand, Debug)]
pub enum IndexCommand {
    /// Reconcile both stores against disk and report any drift
    Check,
}

/// Run the index command.
pub fn run(args: IndexArgs, ctx: &Context) -> Result<()> {
    match args.command {
        IndexCommand::Check => {
            // Opening reconciles; the report describes what was repaired.
            let project = ctx.open_project()?;
            let stores = [
                ("flows", project.flows.index()),
                ("nodes", project.nodes.index()),
            ];
            if ctx.json_output {
                let reports: serde_json::Map<String, serde_json::Value> = stores
                    .iter()
                    .map(|(name, index)| (name.to_string(), report_json(index)))
                    .collect();
                print_json(&serde_json::Value::Object(reports))?;
            } else {
                for (name, index) in stores {
                    print_report(name, index, index.last_report());
                }
            }
        }
    }
    Ok(())
}

fn print_report(name: &str, index: &StorageIndex, report: &ReconcileReport) {
    let dim = Style::new().dim();
    let status = if report.is_clean() {
        style("clean").green()
    } else {
        style("repaired").yellow()
    };
    println!(
        "{} {} {}",
        style(name).bold(),
        status,
        dim.apply_to(format!("({} entries, {})", index.len(), index.root().display()))
    );
    if !report.is_clean() {
        println!(
            "  added {}, dropped {}, malformed {}",
            report.added, report.dropped, report.malformed
        );
    }
}

fn report_json(index: &StorageIndex) -> serde_json::Value {
    let report = index.last_report();
    json!({
        "root": index.root().display().to_string(),
        "entries": index.len(),
        "loaded": report.loaded,
        "added": report.added,
        "dropped": report.dropped,
        "malformed": report.malformed,
        "rewritten": report.rewritten,
    })
}

//! sav-decoder standalone binary
//!
//! Decodes an already-captured SAV flow-telemetry export into one canonical
//! JSON batch for downstream display and analysis. The binary wire decoding
//! itself is done by the external `ipfixDump` utility; this tool normalizes
//! that utility's output (or a line-oriented object export) and corrects the
//! export's known byte-order defects.

mod corrections;
mod dump_scanner;
mod dump_tool;
mod elements;
mod error;
mod jsonl_extractor;
mod model;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "sav-decode",
    about = "Decode exported SAV flow telemetry into canonical JSON"
)]
struct Cli {
    /// Captured export file (binary capture unless a format flag is given)
    input: Option<PathBuf>,

    /// Output JSON path
    output: Option<PathBuf>,

    /// Treat the input as a line-oriented object export (one JSON object per line)
    #[arg(long)]
    jsonl: bool,

    /// Treat the input as an already-captured textual dump (skips the dump tool)
    #[arg(long, conflicts_with = "jsonl")]
    from_dump: bool,

    /// List the SAV enterprise information elements and exit
    #[arg(long)]
    elements: bool,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_elements() {
    println!(
        "SAV enterprise information elements (PEN {}):",
        elements::SAV_ENTERPRISE_ID
    );
    for element in elements::SAV_INFO_ELEMENTS {
        println!(
            "  {:<22} {}/{:<2} len={:<4} {:<16} {}",
            element.name,
            elements::SAV_ENTERPRISE_ID,
            element.element_id,
            element.length,
            element.data_type,
            element.description
        );
    }
    println!();
    println!("Template identifiers:");
    println!("  main data record       {}", elements::MAIN_TEMPLATE_KEY);
    println!("  interface/prefix map   {}", elements::MAPPING_TEMPLATE_KEY);
}

fn print_summary(record: &model::VerdictRecord) {
    let rule = record.rule_type_name.unwrap_or("-");
    let mut detail = String::new();
    if let Some(code) = record.target_type {
        detail.push_str(&format!(", target {}", elements::target_type_name(code)));
    }
    if let Some(code) = record.policy_action {
        detail.push_str(&format!(", action {}", elements::policy_action_name(code)));
    }
    println!(
        "   Record #{}: {}{}, {} rules",
        record.record_id,
        rule,
        detail,
        record.rules.len()
    );
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    if cli.elements {
        print_elements();
        return Ok(());
    }

    let input = cli.input.context("missing <INPUT> argument")?;
    let output = cli.output.context("missing <OUTPUT> argument")?;

    let records = if cli.jsonl {
        let text = fs::read_to_string(&input)
            .with_context(|| format!("cannot read {}", input.display()))?;
        jsonl_extractor::LineObjectExtractor::extract(&text)
            .with_context(|| format!("cannot decode object export {}", input.display()))?
    } else if cli.from_dump {
        let text = fs::read_to_string(&input)
            .with_context(|| format!("cannot read {}", input.display()))?;
        dump_scanner::DumpScanner::scan(&text)
    } else {
        let text = dump_tool::run_dump_tool(&input)
            .with_context(|| format!("cannot dump capture {}", input.display()))?;
        dump_scanner::DumpScanner::scan(&text)
    };

    let batch = model::RecordBatch::wrap(records);
    let json = serde_json::to_string_pretty(&batch).context("cannot serialize record batch")?;
    fs::write(&output, json).with_context(|| format!("cannot write {}", output.display()))?;

    println!("Parsed {} records", batch.total_records);
    println!("Output: {}", output.display());
    for record in &batch.records {
        print_summary(record);
    }

    Ok(())
}

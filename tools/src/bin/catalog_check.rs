// cargo run --bin catalog-check -- --strict globe/catalogs/stations.txt

use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use tlecatalog::{Catalog, LayoutHint, ParseOptions};

/// Parse an orbital element catalog and report what would be admitted
#[derive(Parser, Debug)]
#[command(version)]
struct Opts {
    /// Catalog layout: auto, grouped or tagged
    #[arg(short = 'l', long, default_value = "auto")]
    layout: LayoutHint,

    /// Verify element line checksums
    #[arg(short = 's', long)]
    strict: bool,

    /// Exit with a failure status when any entry is discarded
    #[arg(long)]
    deny_discarded: bool,

    /// Catalog file to read
    input: PathBuf,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let opts = Opts::parse();

    let text = fs::read_to_string(&opts.input)?;
    let catalog = Catalog::parse(
        &text,
        ParseOptions {
            layout: opts.layout,
            strict: opts.strict,
        },
    );

    println!("Layout: {:?}", catalog.layout);
    println!("Admitted: {}", catalog.len());
    for r in catalog.records.iter() {
        let id = r
            .catalog_number()
            .map(|n| format!("{n:05}"))
            .unwrap_or_else(|| "?????".to_owned());
        println!("  {id} {}", r.name);
    }

    println!("Discarded: {}", catalog.discarded.len());
    for d in catalog.discarded.iter() {
        println!("  {d}");
    }

    if opts.deny_discarded && !catalog.discarded.is_empty() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

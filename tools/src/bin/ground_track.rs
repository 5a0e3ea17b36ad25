// cargo run --bin ground-track --release -- --object 25544 --step 30 --count 200 /tmp/iss_track.txt

use clap::Parser;
use std::fs::{self, File};
use std::io::{self, prelude::*};
use std::path::PathBuf;

use globe_lib::{
    frame::{geodetic_to_globe, inertial_to_geodetic, MARKER_RADIUS},
    propagation::{Propagator, Sgp4Propagator},
    units::{Time, Timestamp},
    DEFAULT_CATALOG,
};
use tlecatalog::parse_catalog;
use tletypes::prelude::OrbitalRecord;

/// Print the ground track and globe position of one object over time
#[derive(Parser, Debug)]
#[command(version)]
struct Opts {
    /// Orbital element catalog file.
    ///
    /// The built-in station catalog is used when not provided.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Object name or catalog number
    #[arg(short = 'n', long)]
    object: String,

    /// RFC 3339 start time, defaults to the element epoch
    #[arg(long)]
    start: Option<Timestamp>,

    /// Time step in seconds
    #[arg(short = 't', long, default_value_t = 60.0)]
    step: f64,

    /// Number of samples
    #[arg(short = 'c', long, default_value_t = 90)]
    count: usize,

    /// Globe radius the positions are scaled to
    #[arg(short = 'r', long, default_value_t = MARKER_RADIUS)]
    radius: f64,

    /// Output file path to write, stdout when not provided
    output: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts = Opts::parse();

    let text = match &opts.catalog {
        Some(p) => fs::read_to_string(p)?,
        None => DEFAULT_CATALOG.to_owned(),
    };
    let catalog = parse_catalog(&text);
    let record = find_object(&catalog.records, &opts.object)
        .ok_or_else(|| format!("No object '{}' in the catalog", opts.object))?;

    let propagator = Sgp4Propagator;
    let prepared = propagator.prepare(record)?;
    let start = opts.start.unwrap_or_else(|| prepared.epoch());
    let dt = Time::from_secs(opts.step);

    let mut output: Box<dyn Write> = match &opts.output {
        Some(p) => Box::new(File::create(p)?),
        None => Box::new(io::stdout().lock()),
    };

    writeln!(&mut output, "# {} ({})", record.name, start)?;
    writeln!(&mut output, "# t lat lon alt x y z")?;

    let mut t = start;
    for _ in 0..opts.count {
        match propagator.propagate(&prepared, &t) {
            Ok(inertial) => {
                let geodetic = inertial_to_geodetic(&inertial, propagator.sidereal_time(&t));
                let c = geodetic_to_globe(&geodetic, opts.radius);
                writeln!(
                    &mut output,
                    "{} {} {} {} {} {} {}",
                    (t - start).as_secs(),
                    geodetic.latitude_deg,
                    geodetic.longitude_deg,
                    geodetic.altitude_km,
                    c.x,
                    c.y,
                    c.z,
                )?;
            }
            Err(e) => eprintln!("{t}: {e}"),
        }
        t += dt;
    }

    Ok(())
}

fn find_object<'a>(records: &'a [OrbitalRecord], object: &str) -> Option<&'a OrbitalRecord> {
    let object = object.trim();
    match object.parse::<u32>() {
        Ok(id) => records.iter().find(|r| r.catalog_number() == Some(id)),
        Err(_) => records.iter().find(|r| r.name == object),
    }
}

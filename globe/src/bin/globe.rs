use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::net::TcpStream;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use globe_lib::{
    clock::{Clock, SystemClock, WarpClock},
    config::Config,
    driver::{FrameDriver, Interruptor, RunLimit},
    propagation::Sgp4Propagator,
    publish::{MarkerSink, MarkerStream, TracingSink},
    session::Session,
    units::Timestamp,
    DEFAULT_CATALOG,
};

#[derive(Parser, Debug)]
#[command(version)]
struct Opts {
    /// Configuration toml file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Orbital element catalog file.
    ///
    /// The built-in station catalog is used when neither this
    /// nor the configuration file provides one.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// The address:port of a renderer accepting the marker stream over TCP
    #[arg(long, group = "sink")]
    renderer: Option<String>,

    /// Write the marker stream to a file instead
    #[arg(long, group = "sink")]
    output: Option<PathBuf>,

    /// Stop after this many frames
    #[arg(long)]
    frames: Option<u64>,

    /// Stop after this much wall time, e.g. '30s' or '5min'
    #[arg(long, value_parser = humantime::parse_duration)]
    duration: Option<Duration>,

    /// Marker orbit radius in globe units
    #[arg(long)]
    radius: Option<f64>,

    /// Frames per second
    #[arg(long)]
    frame_rate: Option<f64>,

    /// Start the clock at this RFC 3339 time.
    ///
    /// Defaults to the most recent element epoch in the catalog, since
    /// propagation accuracy degrades quickly away from the epoch.
    #[arg(long)]
    start: Option<Timestamp>,

    /// Clock speed relative to wall time
    #[arg(long)]
    time_warp: Option<f64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let opts = Opts::parse();

    let intr = Interruptor::new();
    let intr_clone = intr.clone();
    ctrlc::set_handler(move || {
        if intr_clone.is_set() {
            let exit_code = if cfg!(target_family = "unix") {
                // 128 (fatal error signal "n") + 2 (control-c is fatal error signal 2)
                130
            } else {
                // Windows code 3221225786
                // -1073741510 == C000013A
                -1073741510
            };
            std::process::exit(exit_code);
        } else {
            intr_clone.set();
        }
    })?;

    let mut cfg = match &opts.config {
        Some(p) => Config::load(p)?,
        None => Config::default(),
    };
    if opts.catalog.is_some() {
        cfg.catalog = opts.catalog.clone();
    }
    if opts.radius.is_some() {
        cfg.marker_radius = opts.radius;
    }
    if opts.frame_rate.is_some() {
        cfg.frame_rate = opts.frame_rate;
    }
    if opts.time_warp.is_some() {
        cfg.time_warp = opts.time_warp;
    }
    if let Some(start) = opts.start {
        cfg.start_time = Some(*start.as_utc());
    }
    cfg.validate()?;

    let sink: Box<dyn MarkerSink> = if let Some(addr) = &opts.renderer {
        println!("Connecting to renderer '{addr}'");
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Box::new(MarkerStream::new(stream))
    } else if let Some(path) = &opts.output {
        println!("Writing marker stream to '{}'", path.display());
        Box::new(MarkerStream::new(BufWriter::new(File::create(path)?)))
    } else {
        Box::new(TracingSink)
    };

    let mut driver = FrameDriver::new(cfg.frame_rate());
    let options = cfg.session_options()?;
    let mut session = match &cfg.catalog {
        Some(path) => Session::start_from_path(path, options, Sgp4Propagator, sink, &mut driver)?,
        None => Session::start(DEFAULT_CATALOG, options, Sgp4Propagator, sink, &mut driver),
    };
    for d in session.discarded() {
        println!("Discarded {d}");
    }
    println!("Tracking {} objects", session.len());

    let latest_epoch = session.constellation().latest_epoch();
    let start = cfg
        .start_time()
        .or(latest_epoch)
        .unwrap_or_else(|| SystemClock.now());
    println!("Clock starts at {start}");
    let clock = WarpClock::new(start, cfg.time_warp());
    let limit = RunLimit {
        frames: opts.frames,
        duration: opts.duration,
    };
    let frame_info = driver.run(&clock, &intr, limit);
    let report = session.last_report();
    session.stop(&mut driver);

    println!("Stopped at\n{frame_info:#?}");
    println!("Last frame: {report:?}");

    Ok(())
}

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use parkwatch::config::{
    DEFAULT_CONFIDENCE, DEFAULT_LINE_HEIGHT, DEFAULT_OFFSET, DEFAULT_THRESHOLD, MIN_CONTOUR_SIZE,
};
use parkwatch::core::db::{EventLog, RegionRepository, SiteDb, StatsRepository};
use parkwatch::detection::ReplayDetector;
use parkwatch::{
    AnalysisMode, AnalysisSettings, DebugConfig, FrameSource, ImageSequence, RegionLayout,
    Session, SharedSession, StatsRecorder,
};

#[derive(Parser)]
#[command(name = "parkwatch")]
#[command(about = "Parking space occupancy and vehicle counting for camera frames")]
struct Cli {
    /// Site database file
    #[arg(long, value_name = "FILE", default_value = "parkwatch.db", global = true)]
    db: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyse a directory of frames
    Run(RunArgs),
    /// Edit the parking spaces of a reference image
    #[command(subcommand)]
    Regions(RegionsCommand),
    /// Register reference images
    #[command(subcommand)]
    References(ReferencesCommand),
    /// Use a reference image's parking spaces for a video source
    Associate { source: String, reference: String },
    /// Recorded statistics
    #[command(subcommand)]
    Stats(StatsCommand),
    /// Event log
    #[command(subcommand)]
    Log(LogCommand),
}

#[derive(Args)]
struct RunArgs {
    /// Directory of frames, played in filename order
    #[arg(value_name = "FRAMES")]
    source: PathBuf,

    #[arg(long, value_enum, default_value_t = AnalysisMode::Parking)]
    mode: AnalysisMode,

    /// Reference image whose parking spaces to use (defaults to the source's association)
    #[arg(long)]
    reference: Option<String>,

    /// Write annotated frames to this directory
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Save intermediate masks to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Recorded detections to replay in detector-counting mode
    #[arg(long, value_name = "FILE")]
    detections: Option<PathBuf>,

    /// Record statistics after this many analysed frames
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    stats_every: u64,

    #[command(flatten)]
    settings: SettingsArgs,
}

#[derive(Args)]
struct SettingsArgs {
    /// Active pixels at which a space counts as occupied
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: u32,
    #[arg(long, default_value_t = MIN_CONTOUR_SIZE)]
    min_width: u32,
    #[arg(long, default_value_t = MIN_CONTOUR_SIZE)]
    min_height: u32,
    /// Counting line row
    #[arg(long, default_value_t = DEFAULT_LINE_HEIGHT)]
    line_height: i32,
    /// Half-height of the crossing band around the counting line
    #[arg(long, default_value_t = DEFAULT_OFFSET)]
    offset: i32,
    /// Minimum detector score (exclusive)
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f32,
    /// Analyse every n-th frame
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    frame_skip: u32,
    /// Drop motion centroids older than this many frames
    #[arg(long)]
    pool_max_age: Option<u32>,
    /// Keep at most this many motion centroids
    #[arg(long)]
    pool_max_len: Option<usize>,
    /// Distance within which a tracked centroid still matches a detection
    #[arg(long, default_value_t = 50.0)]
    prune_tolerance: f32,
    /// Treat detections within this radius of a counted one as the same vehicle
    #[arg(long)]
    dedup_radius: Option<f32>,
}

impl SettingsArgs {
    fn into_settings(self) -> AnalysisSettings {
        let defaults = AnalysisSettings::default();
        AnalysisSettings {
            parking_threshold: self.threshold,
            min_contour_width: self.min_width,
            min_contour_height: self.min_height,
            line_height: self.line_height,
            offset: self.offset,
            ml_confidence: self.confidence,
            frame_skip: self.frame_skip,
            pool_max_age: self.pool_max_age.or(defaults.pool_max_age),
            pool_max_len: self.pool_max_len.or(defaults.pool_max_len),
            prune_tolerance: self.prune_tolerance,
            dedup_radius: self.dedup_radius,
        }
    }
}

#[derive(Subcommand)]
enum RegionsCommand {
    List { reference: String },
    /// Add the rectangle spanned by two corners, e.g. `--from 10,10 --to 80,60`
    Add {
        reference: String,
        #[arg(long, value_parser = parse_point)]
        from: (i32, i32),
        #[arg(long, value_parser = parse_point)]
        to: (i32, i32),
    },
    /// Remove the first space containing the point
    Remove { reference: String, x: i32, y: i32 },
    Clear { reference: String },
}

#[derive(Subcommand)]
enum ReferencesCommand {
    /// Register an image's dimensions under a name
    Add { name: String, image: PathBuf },
    List,
}

#[derive(Subcommand)]
enum StatsCommand {
    List,
    /// Write all samples to a CSV file
    Export {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    Clear,
}

#[derive(Subcommand)]
enum LogCommand {
    List,
    Save {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    Clear,
}

fn parse_point(s: &str) -> Result<(i32, i32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got {:?}", s))?;
    let x = x.trim().parse().map_err(|e| format!("bad x in {:?}: {}", s, e))?;
    let y = y.trim().parse().map_err(|e| format!("bad y in {:?}: {}", s, e))?;
    Ok((x, y))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let default_filter = if args.verbose {
        "parkwatch=debug"
    } else {
        "parkwatch=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    let db = SiteDb::open(&args.db).await?;
    let result = match args.command {
        Command::Run(run_args) => run(&db, run_args).await,
        Command::Regions(cmd) => regions(&db, cmd).await,
        Command::References(cmd) => references(&db, cmd).await,
        Command::Associate { source, reference } => db.associate_video(&source, &reference).await,
        Command::Stats(cmd) => stats(&db, cmd).await,
        Command::Log(cmd) => log(&db, cmd).await,
    };
    db.close().await;
    result
}

async fn run(db: &SiteDb, args: RunArgs) -> Result<()> {
    let source_key = args.source.display().to_string();
    let reference = match args.reference {
        Some(reference) => Some(reference),
        None => db.reference_for_video(&source_key).await?,
    };
    let layout = match &reference {
        Some(reference) => RegionLayout::from_regions(db.load_regions(reference).await?),
        None => RegionLayout::new(),
    };
    if args.mode == AnalysisMode::Parking && layout.is_empty() {
        warn!("No parking spaces defined for {:?}", reference);
    }

    let settings = args.settings.into_settings();
    let mut session = Session::new(settings.clone(), layout, args.mode);
    if let Some(dir) = args.debug_out {
        session = session.with_debug(DebugConfig::prepare(dir)?);
    }
    if let Some(path) = &args.detections {
        let detector = ReplayDetector::open(path, settings.vehicle_filter())?;
        info!("Replaying {} frames of detections", detector.remaining());
        session = session.with_detector(Box::new(detector));
    } else if args.mode == AnalysisMode::DetectorCounting {
        bail!("Detector counting needs --detections");
    }

    let mut frames = ImageSequence::open(&args.source)?;
    if frames.is_empty() {
        bail!("No frames found in {:?}", args.source);
    }
    if let Some(out) = &args.out {
        tokio::fs::create_dir_all(out)
            .await
            .with_context(|| format!("Failed to create output directory {:?}", out))?;
    }

    let session_id = session.id();
    let shared = SharedSession::new(session);
    db.log_event(&format!(
        "Started {} session {} on {} ({} frames)",
        args.mode,
        session_id,
        source_key,
        frames.len()
    ))
    .await?;

    let mut recorder = StatsRecorder::spawn(db.clone(), shared.clone(), session_id);

    let mut analysed = 0u64;
    while let Some(frame) = frames.next_frame()? {
        let worker = shared.clone();
        let report = tokio::task::spawn_blocking(move || worker.process_frame(frame)).await??;

        if let Some(reason) = &report.detector_error {
            warn!(frame = report.frame_index, "detection failed: {}", reason);
            db.log_event(&format!(
                "Detection failed on frame {}: {}",
                report.frame_index, reason
            ))
            .await?;
        }
        if report.crossed > 0 {
            debug!(
                frame = report.frame_index,
                crossed = report.crossed,
                total = report.stats.vehicles,
                "vehicles crossed the counting line"
            );
        }
        if let Some(out) = &args.out {
            let path = out.join(format!("frame_{:05}.png", report.frame_index));
            report
                .frame
                .save(&path)
                .with_context(|| format!("Failed to write annotated frame {:?}", path))?;
        }
        if report.analyzed {
            analysed += 1;
            if analysed % args.stats_every == 0 {
                recorder.tick().await?;
            }
        }
    }
    recorder.finish().await?;

    let stats = shared.snapshot();
    db.record_stats(session_id, &stats).await?;
    db.log_event(&format!(
        "Session {} finished: {} analysed frames, {}/{} spaces free, {} vehicles counted",
        session_id, analysed, stats.free_spaces, stats.total_spaces, stats.vehicles
    ))
    .await?;

    println!("\n=== {} ===", args.mode);
    println!("Frames analysed: {}", analysed);
    if args.mode == AnalysisMode::Parking {
        println!("Free spaces:     {}/{}", stats.free_spaces, stats.total_spaces);
    } else {
        println!("Vehicles:        {}", stats.vehicles);
    }
    Ok(())
}

async fn regions(db: &SiteDb, cmd: RegionsCommand) -> Result<()> {
    match cmd {
        RegionsCommand::List { reference } => {
            let layout = RegionLayout::from_regions(db.load_regions(&reference).await?);
            if layout.is_empty() {
                println!("No parking spaces defined for {}", reference);
            }
            for (i, r) in layout.iter().enumerate() {
                println!("  {} at ({}, {}) {}x{}", i, r.x, r.y, r.width, r.height);
            }
        }
        RegionsCommand::Add { reference, from, to } => {
            let mut layout = RegionLayout::from_regions(db.load_regions(&reference).await?);
            let Some(region) = layout.add_from_drag(from, to) else {
                bail!("Parking space must be larger than 20px in both directions");
            };
            if let Some((width, height)) = db.reference_dimensions(&reference).await? {
                if !region.fits_within(width, height) {
                    warn!(
                        "Space at ({}, {}) reaches outside the {}x{} reference and will be ignored",
                        region.x, region.y, width, height
                    );
                }
            }
            db.save_regions(&reference, layout.regions()).await?;
            db.log_event(&format!("Added parking space at ({}, {})", region.x, region.y))
                .await?;
        }
        RegionsCommand::Remove { reference, x, y } => {
            let mut layout = RegionLayout::from_regions(db.load_regions(&reference).await?);
            let Some(region) = layout.remove_at(x, y) else {
                bail!("No parking space contains ({}, {})", x, y);
            };
            db.save_regions(&reference, layout.regions()).await?;
            db.log_event(&format!("Removed parking space at ({}, {})", region.x, region.y))
                .await?;
        }
        RegionsCommand::Clear { reference } => {
            db.clear_regions(&reference).await?;
            db.log_event(&format!("Cleared all parking spaces for {}", reference))
                .await?;
        }
    }
    Ok(())
}

async fn references(db: &SiteDb, cmd: ReferencesCommand) -> Result<()> {
    match cmd {
        ReferencesCommand::Add { name, image } => {
            let (width, height) = image::image_dimensions(&image)
                .with_context(|| format!("Failed to read reference image {:?}", image))?;
            db.set_reference_dimensions(&name, width, height).await?;
            db.log_event(&format!("Loaded reference image {} ({}x{})", name, width, height))
                .await?;
        }
        ReferencesCommand::List => {
            for reference in db.list_references().await? {
                println!(
                    "  {} {}x{} - {} spaces",
                    reference.name, reference.width, reference.height, reference.region_count
                );
            }
        }
    }
    Ok(())
}

async fn stats(db: &SiteDb, cmd: StatsCommand) -> Result<()> {
    match cmd {
        StatsCommand::List => {
            for record in db.list_stats().await? {
                println!("{}", record.csv_line());
            }
        }
        StatsCommand::Export { dir } => {
            let path = db.export_stats_csv(&dir).await?;
            println!("Statistics exported to {}", path.display());
        }
        StatsCommand::Clear => db.clear_stats().await?,
    }
    Ok(())
}

async fn log(db: &SiteDb, cmd: LogCommand) -> Result<()> {
    match cmd {
        LogCommand::List => {
            for event in db.list_events().await? {
                println!("{}", event);
            }
        }
        LogCommand::Save { dir } => {
            let path = db.save_log(&dir).await?;
            println!("Log saved to {}", path.display());
        }
        LogCommand::Clear => db.clear_events().await?,
    }
    Ok(())
}

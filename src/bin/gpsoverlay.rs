use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gpsoverlay::assets::svg::SvgContext;
use gpsoverlay::overlay::map::{
    MapCache, MapTileSource, TrackPlotSource, cache_params, precompute_map_tiles,
};
use gpsoverlay::render::pipeline::{full_range, plan_map_tiles};
use gpsoverlay::track::gpx::TrackCache;
use gpsoverlay::{FrameDriver, FrameIndex, FrameRGBA, FrameRange, PngSequenceSink, ProjectConfig};

#[derive(Parser, Debug)]
#[command(name = "gpsoverlay", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Render a range of frames into a PNG sequence.
    Render(RenderArgs),
    /// Render every overlay's sample value without reading telemetry.
    Preview(PreviewArgs),
    /// Fill the map tile cache for the whole timeline.
    PrecomputeMaps(PrecomputeArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Display time in seconds.
    #[arg(long, conflicts_with = "frame")]
    time: Option<f64>,

    /// Output frame index (0-based), at the project fps.
    #[arg(long)]
    frame: Option<u64>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output directory for `frame_NNNNNN.png` files.
    #[arg(long)]
    out: PathBuf,

    /// First frame (inclusive).
    #[arg(long, default_value_t = 0)]
    start: u64,

    /// Last frame (exclusive); the end of the timeline when absent.
    #[arg(long)]
    end: Option<u64>,

    /// Overwrite existing frame files.
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    /// Project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct PrecomputeArgs {
    /// Project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Cache directory; the map overlay's `cache_dir` when absent.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Override rayon worker threads.
    #[arg(long)]
    threads: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
        Command::Preview(args) => cmd_preview(args),
        Command::PrecomputeMaps(args) => cmd_precompute(args),
    }
}

fn load_project(path: &Path) -> anyhow::Result<ProjectConfig> {
    let cfg = ProjectConfig::read(path)
        .with_context(|| format!("load project '{}'", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

fn svg_context(cfg: &ProjectConfig) -> SvgContext {
    let dirs: Vec<&Path> = cfg.font_dirs.iter().map(PathBuf::as_path).collect();
    SvgContext::with_system_fonts(&dirs)
}

fn build_driver(cfg: &ProjectConfig) -> anyhow::Result<FrameDriver> {
    let mut tracks = TrackCache::new();
    let driver = cfg
        .build_driver(&mut tracks, svg_context(cfg))
        .context("prepare frame driver")?;
    Ok(driver)
}

fn write_png(frame: &FrameRGBA, out: &Path) -> anyhow::Result<()> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    frame
        .to_image()?
        .save_with_format(out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", out.display()))?;
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let cfg = load_project(&args.in_path)?;
    let mut driver = build_driver(&cfg)?;

    let t = match (args.time, args.frame) {
        (Some(t), _) => t,
        (None, Some(f)) => cfg.fps.frames_to_secs(f),
        (None, None) => 0.0,
    };
    let frame = driver.render_frame(t)?;
    write_png(&frame, &args.out)?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let cfg = load_project(&args.in_path)?;
    let mut driver = build_driver(&cfg)?;

    let full = full_range(&driver, cfg.fps);
    let end = args.end.unwrap_or(full.end.0);
    let range = FrameRange::new(FrameIndex(args.start), FrameIndex(end))?;

    let mut sink = PngSequenceSink::new(&args.out).with_overwrite(args.overwrite);
    let stats = gpsoverlay::render_range(&mut driver, range, cfg.fps, &mut sink)?;

    eprintln!(
        "wrote {} frames to {}",
        stats.frames_rendered,
        args.out.display()
    );
    Ok(())
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let cfg = load_project(&args.in_path)?;
    let driver = build_driver(&cfg)?;
    let frame = driver.render_preview(cfg.canvas)?;
    write_png(&frame, &args.out)?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_precompute(args: PrecomputeArgs) -> anyhow::Result<()> {
    let cfg = load_project(&args.in_path)?;
    let map = cfg
        .map_overlay()
        .context("project declares no map overlay")?;
    let cache_dir = args
        .cache_dir
        .or_else(|| map.cache_dir.clone())
        .context("no cache directory: pass --cache-dir or set the map's cache_dir")?;

    let mut tracks = TrackCache::new();
    let track = tracks.load(&cfg.track, cfg.gpx_options())?;
    let driver = cfg.build_driver(&mut tracks, svg_context(&cfg))?;

    let source = TrackPlotSource::new(track.clone());
    let size = map.size.resolve(cfg.canvas)?;
    let cache = MapCache::open(&cache_dir, &cache_params(&source, size, map.zoom))?;
    let requests = plan_map_tiles(&driver, full_range(&driver, cfg.fps), cfg.fps, &map)?;

    let stats = precompute_map_tiles(&requests, &cache, args.threads, || {
        Box::new(TrackPlotSource::new(Arc::clone(&track))) as Box<dyn MapTileSource>
    })?;

    eprintln!(
        "{} tiles rendered, {} already cached in {}",
        stats.rendered,
        stats.already_cached,
        cache_dir.display()
    );
    Ok(())
}

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use rayon::prelude::*;
use resvg::tiny_skia;

use crate::assets::svg::{frame_to_pixmap, pixmap_to_frame};
use crate::foundation::error::{OverlayError, OverlayResult};
use crate::overlay::args::Args;
use crate::overlay::registry::{OverlayData, RenderFn, RendererCtor, SubRenderer};
use crate::render::frame::FrameRGBA;
use crate::track::geo::{local_enu_m, meters_per_pixel};
use crate::track::point::Track;

/// Map size in pixels when none is configured.
pub const DEFAULT_MAP_SIZE: (u32, u32) = (250, 250);
/// Web-mercator zoom level when none is configured.
pub const DEFAULT_MAP_ZOOM: f64 = 16.0;
/// Heading correction between the camera axis and the direction of travel, degrees.
pub const DEFAULT_ANGLE_OFFSET: f64 = -10.0;

const MARKER_RADIUS: f32 = 8.0;
const MARKER_RGBA: [u8; 4] = [0, 255, 0, 255];

/// One map image: centered on `(lat, lon)`, rotated so `bearing + angle_offset` points up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileRequest {
    /// Center latitude in degrees.
    pub lat: f64,
    /// Center longitude in degrees.
    pub lon: f64,
    /// Heading to rotate by; north up when absent.
    pub bearing: Option<f64>,
    /// Added to `bearing` before rotating, degrees.
    pub angle_offset: f64,
    /// Web-mercator zoom level.
    pub zoom: f64,
    /// Tile width in pixels.
    pub width: u32,
    /// Tile height in pixels.
    pub height: u32,
}

/// Produces map images. The query point is always the center pixel.
pub trait MapTileSource: Send {
    /// Render the tile described by `req`.
    fn render_tile(&mut self, req: &TileRequest) -> OverlayResult<FrameRGBA>;

    /// Parameters that change the output; persisted next to cached tiles.
    fn params(&self) -> serde_json::Value;
}

/// Draws the track itself as a translucent polyline on a transparent background.
#[derive(Clone, Debug)]
pub struct TrackPlotSource {
    track: Arc<Track>,
    line_rgba: [u8; 4],
    line_width: f32,
}

impl TrackPlotSource {
    /// Default blue line, 4 px wide.
    pub fn new(track: Arc<Track>) -> Self {
        Self {
            track,
            line_rgba: [0, 0, 255, 102],
            line_width: 4.0,
        }
    }

    /// Override the line color (straight RGBA) and width.
    pub fn with_line(mut self, rgba: [u8; 4], width: f32) -> Self {
        self.line_rgba = rgba;
        self.line_width = width;
        self
    }
}

impl MapTileSource for TrackPlotSource {
    fn render_tile(&mut self, req: &TileRequest) -> OverlayResult<FrameRGBA> {
        let mut pixmap = tiny_skia::Pixmap::new(req.width, req.height).ok_or_else(|| {
            OverlayError::render(format!(
                "cannot allocate {}x{} map tile",
                req.width, req.height
            ))
        })?;

        let mpp = meters_per_pixel(req.lat, req.zoom);
        let heading = req.bearing.map_or(0.0, |b| b + req.angle_offset).to_radians();
        let (sin, cos) = heading.sin_cos();
        let (cx, cy) = (f64::from(req.width) / 2.0, f64::from(req.height) / 2.0);

        let mut pb = tiny_skia::PathBuilder::new();
        for (i, p) in self.track.points().iter().enumerate() {
            let (e, n) = local_enu_m(p.lat, p.lon, req.lat, req.lon);
            // Rotate so the heading points to the top of the image.
            let x = e * cos - n * sin;
            let y = e * sin + n * cos;
            let px = (cx + x / mpp) as f32;
            let py = (cy - y / mpp) as f32;
            if i == 0 {
                pb.move_to(px, py);
            } else {
                pb.line_to(px, py);
            }
        }

        if let Some(path) = pb.finish() {
            let mut paint = tiny_skia::Paint::default();
            let [r, g, b, a] = self.line_rgba;
            paint.set_color_rgba8(r, g, b, a);
            paint.anti_alias = true;
            let stroke = tiny_skia::Stroke {
                width: self.line_width,
                line_cap: tiny_skia::LineCap::Round,
                line_join: tiny_skia::LineJoin::Round,
                ..Default::default()
            };
            pixmap.stroke_path(&path, &paint, &stroke, tiny_skia::Transform::identity(), None);
        }

        Ok(pixmap_to_frame(pixmap))
    }

    fn params(&self) -> serde_json::Value {
        serde_json::json!({
            "source": "track_plot",
            "line_rgba": self.line_rgba,
            "line_width": self.line_width,
            "track_points": self.track.len(),
            "track_start": self.track.start_time(),
            "track_end": self.track.end_time(),
        })
    }
}

/// Directory of rendered tiles plus a `config.json` describing how they were made.
#[derive(Clone, Debug)]
pub struct MapCache {
    dir: PathBuf,
}

impl MapCache {
    /// Parameter file name inside the cache directory.
    pub const METADATA_FILE: &'static str = "config.json";

    /// Open (creating if needed) a cache generated with `params`.
    ///
    /// Fails with [`OverlayError::CacheConsistency`] when the directory already holds tiles made
    /// with different parameters.
    pub fn open(dir: impl Into<PathBuf>, params: &serde_json::Value) -> OverlayResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create map cache dir {}", dir.display()))?;

        let meta = dir.join(Self::METADATA_FILE);
        if meta.is_file() {
            let text = std::fs::read_to_string(&meta)
                .with_context(|| format!("read {}", meta.display()))?;
            let saved: serde_json::Value = serde_json::from_str(&text)
                .map_err(|e| OverlayError::serde(format!("{}: {e}", meta.display())))?;
            if &saved != params {
                return Err(OverlayError::cache_consistency(format!(
                    "map cache {} was generated with {saved}, current settings are {params}; \
                     use another cache dir or delete it",
                    dir.display()
                )));
            }
            tracing::debug!(dir = %dir.display(), "reusing map cache");
        } else {
            let text = serde_json::to_string_pretty(params)
                .map_err(|e| OverlayError::serde(e.to_string()))?;
            std::fs::write(&meta, text).with_context(|| format!("write {}", meta.display()))?;
        }
        Ok(Self { dir })
    }

    /// Cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `round(lat*1e5)_round(lon*1e5)` with `_w_h` appended when a size is given.
    pub fn tile_name(lat: f64, lon: f64, size: Option<(u32, u32)>) -> String {
        let lat = (lat * 1e5).round() as i64;
        let lon = (lon * 1e5).round() as i64;
        match size {
            Some((w, h)) => format!("{lat}_{lon}_{w}_{h}"),
            None => format!("{lat}_{lon}"),
        }
    }

    /// File for the tile `req` describes.
    pub fn tile_path(&self, req: &TileRequest) -> PathBuf {
        self.dir.join(format!(
            "{}.png",
            Self::tile_name(req.lat, req.lon, Some((req.width, req.height)))
        ))
    }

    /// Decode a cached tile; `Ok(None)` when it does not exist.
    pub fn load(&self, path: &Path) -> OverlayResult<Option<FrameRGBA>> {
        if !path.is_file() {
            return Ok(None);
        }
        let img = image::open(path)
            .with_context(|| format!("decode cached tile {}", path.display()))?
            .to_rgba8();
        Ok(Some(FrameRGBA::from_image(img)))
    }

    /// Write through a temporary file so concurrent writers never expose a partial tile.
    pub fn store(&self, path: &Path, frame: &FrameRGBA) -> OverlayResult<()> {
        let tmp = path.with_extension(format!("{}.tmp", std::process::id()));
        frame
            .to_image()?
            .save_with_format(&tmp, image::ImageFormat::Png)
            .with_context(|| format!("write tile {}", tmp.display()))?;
        std::fs::rename(&tmp, path).with_context(|| format!("move tile to {}", path.display()))?;
        Ok(())
    }
}

/// Map sub-renderer: one tile per frame around the current position, optionally cached.
pub struct MapRenderer {
    source: Box<dyn MapTileSource>,
    cache: Option<MapCache>,
    width: u32,
    height: u32,
    zoom: f64,
    overwrite: bool,
}

impl MapRenderer {
    /// Renderer over `source`; opens the cache in `cache_dir` when given.
    ///
    /// With `overwrite` every tile is rendered again even if cached.
    pub fn new(
        source: Box<dyn MapTileSource>,
        size: (u32, u32),
        zoom: f64,
        cache_dir: Option<PathBuf>,
        overwrite: bool,
    ) -> OverlayResult<Self> {
        if size.0 == 0 || size.1 == 0 {
            return Err(OverlayError::configuration("map size must be > 0"));
        }
        let cache = match cache_dir {
            Some(dir) => Some(MapCache::open(dir, &cache_params(&*source, size, zoom))?),
            None => None,
        };
        Ok(Self {
            source,
            cache,
            width: size.0,
            height: size.1,
            zoom,
            overwrite,
        })
    }

    /// Tile for `req`, from the cache when possible.
    pub fn tile(&mut self, req: &TileRequest) -> OverlayResult<FrameRGBA> {
        let Some(cache) = &self.cache else {
            return self.source.render_tile(req);
        };
        let path = cache.tile_path(req);
        if !self.overwrite
            && let Some(hit) = cache.load(&path)?
        {
            return Ok(hit);
        }
        let tile = self.source.render_tile(req)?;
        cache.store(&path, &tile)?;
        Ok(tile)
    }
}

impl SubRenderer for MapRenderer {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Call arguments: `lat`, `lon`, optional `bearing`, `angle_offset`, `zoom`, `width`,
    /// `height`.
    fn render(&mut self, args: &Args) -> OverlayResult<Option<FrameRGBA>> {
        let px = |v: Option<f64>, default: u32| v.map_or(default, |v| v.round().max(1.0) as u32);
        let req = TileRequest {
            lat: args.number("lat")?,
            lon: args.number("lon")?,
            bearing: args.opt_number("bearing")?,
            angle_offset: args.opt_number("angle_offset")?.unwrap_or(0.0),
            zoom: args.opt_number("zoom")?.unwrap_or(self.zoom),
            width: px(args.opt_number("width")?, self.width),
            height: px(args.opt_number("height")?, self.height),
        };
        self.tile(&req).map(Some)
    }
}

/// Generation parameters written to the cache metadata.
pub fn cache_params(source: &dyn MapTileSource, size: (u32, u32), zoom: f64) -> serde_json::Value {
    serde_json::json!({
        "map_width": size.0,
        "map_height": size.1,
        "map_zoom": zoom,
        "source": source.params(),
    })
}

/// Built-in `map` constructor drawing `track`. Arguments: `size`, optional `zoom`,
/// `cache_dir`, `overwrite`.
pub fn map_ctor(track: Arc<Track>) -> RendererCtor {
    Arc::new(move |args: &Args| {
        let size = if args.contains("size") {
            args.size("size")?
        } else {
            DEFAULT_MAP_SIZE
        };
        let renderer = MapRenderer::new(
            Box::new(TrackPlotSource::new(track.clone())),
            size,
            args.opt_number("zoom")?.unwrap_or(DEFAULT_MAP_ZOOM),
            args.opt_path("cache_dir")?,
            args.bool_or("overwrite", false)?,
        )?;
        Ok(Box::new(renderer) as Box<dyn SubRenderer>)
    })
}

/// Render function for map entries: the tile with a location marker at its center.
pub fn with_location_marker() -> RenderFn {
    Arc::new(|data: &OverlayData| match data {
        OverlayData::Image(tile) => draw_marker(tile).map(Some),
        OverlayData::Value(_) => Ok(None),
    })
}

fn draw_marker(tile: &FrameRGBA) -> OverlayResult<FrameRGBA> {
    let mut pixmap = frame_to_pixmap(tile)?;
    let (cx, cy) = (tile.width as f32 / 2.0, tile.height as f32 / 2.0);
    if let Some(circle) = tiny_skia::PathBuilder::from_circle(cx, cy, MARKER_RADIUS) {
        let mut paint = tiny_skia::Paint::default();
        let [r, g, b, a] = MARKER_RGBA;
        paint.set_color_rgba8(r, g, b, a);
        paint.anti_alias = true;
        pixmap.fill_path(
            &circle,
            &paint,
            tiny_skia::FillRule::Winding,
            tiny_skia::Transform::identity(),
            None,
        );
    }
    Ok(pixmap_to_frame(pixmap))
}

/// Counts from [`precompute_map_tiles`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrecomputeStats {
    /// Requests passed in.
    pub requested: usize,
    /// Distinct tile files among them.
    pub unique: usize,
    /// Tiles rendered by this call.
    pub rendered: usize,
    /// Tiles found in the cache.
    pub already_cached: usize,
}

/// Fill `cache` with every requested tile on a worker pool; each worker gets its own source
/// from `make_source`. Requests that map to the same tile file are rendered once.
#[tracing::instrument(skip_all, fields(requests = requests.len()))]
pub fn precompute_map_tiles<F>(
    requests: &[TileRequest],
    cache: &MapCache,
    threads: Option<usize>,
    make_source: F,
) -> OverlayResult<PrecomputeStats>
where
    F: Fn() -> Box<dyn MapTileSource> + Sync,
{
    let mut uniq = BTreeMap::<PathBuf, TileRequest>::new();
    for req in requests {
        uniq.entry(cache.tile_path(req)).or_insert(*req);
    }
    let jobs: Vec<(PathBuf, TileRequest)> = uniq.into_iter().collect();

    let pool = build_thread_pool(threads)?;
    let results = pool.install(|| {
        jobs.par_iter()
            .map_init(&make_source, |source, (path, req)| -> OverlayResult<bool> {
                if path.is_file() {
                    return Ok(false);
                }
                let tile = source.render_tile(req)?;
                cache.store(path, &tile)?;
                Ok(true)
            })
            .collect::<Vec<_>>()
    });

    let mut stats = PrecomputeStats {
        requested: requests.len(),
        unique: jobs.len(),
        ..Default::default()
    };
    for r in results {
        if r? {
            stats.rendered += 1;
        } else {
            stats.already_cached += 1;
        }
    }
    tracing::info!(
        rendered = stats.rendered,
        cached = stats.already_cached,
        "map tiles ready"
    );
    Ok(stats)
}

fn build_thread_pool(threads: Option<usize>) -> OverlayResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(OverlayError::validation("'threads' must be >= 1 when set"));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| OverlayError::render(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/map.rs"]
mod tests;

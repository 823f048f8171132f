//! massing3d: neighborhood massing, sunlight hours and shadow snapshots for
//! one property.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{Datelike, Local, NaiveDate};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use massing3d::config::Settings;
use massing3d::fetch::cache::{NeighborhoodCache, TtlCache};
use massing3d::fetch::http::RegistryClient;
use massing3d::fetch::{FetchRequest, NeighborhoodService};
use massing3d::io::json::{read_neighborhood, write_json, write_neighborhood};
use massing3d::scene::ResourceTracker;
use massing3d::scene::basemap::{DEFAULT_BASEMAP_LAYER, GROUND_HALF_EXTENT, WmsBasemap, load_ground_texture};
use massing3d::sim::sunlight::SunlightResult;
use massing3d::snapshot::{Raster, ShadowSnapshot, SoftwareRenderer};
use massing3d::viewer::{HostCallbacks, NeighborhoodSource, Selection, ViewerConfig, ViewerSession};
use massing3d::{Neighborhood3D, NeighborhoodCenter};

#[derive(Parser, Debug, Clone)]
#[command(name = "massing3d", version)]
struct Args {
    /// Building id of the property (with or without the registry prefix)
    #[arg(long)]
    target_id: Option<String>,

    /// Address object id reported back as `address_id`
    #[arg(long)]
    anchor: Option<String>,

    /// Planar coordinates of the property (EPSG:28992) [m]
    #[arg(long, allow_negative_numbers = true)]
    x: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    y: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    lat: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    lng: Option<f64>,

    /// Replay a neighborhood saved by an earlier run instead of fetching
    #[arg(long)]
    from_file: Option<PathBuf>,

    #[arg(long, default_value = "out")]
    out_dir: PathBuf,

    /// Year of the sunlight analysis and snapshots (default: this year)
    #[arg(long)]
    year: Option<i32>,

    #[arg(long, default_value_t = 512)]
    width: u32,

    #[arg(long, default_value_t = 512)]
    height: u32,

    /// Open the interactive viewer (needs the `viewer` feature)
    #[arg(long, default_value_t = false)]
    view: bool,
}

/// Writes every host notification into the output directory.
struct FileHost {
    out_dir: PathBuf,
}

impl FileHost {
    fn report(&self, what: &str, result: Result<()>) {
        if let Err(e) = result {
            warn!(error = %e, "Failed to write {what}");
        }
    }
}

impl HostCallbacks for FileHost {
    fn on_neighborhood(&self, neighborhood: &Neighborhood3D) {
        let path = self.out_dir.join("neighborhood.json");
        self.report("neighborhood", write_neighborhood(&path, neighborhood));
    }

    fn on_sunlight_analysis(&self, result: &SunlightResult) {
        let path = self.out_dir.join("sunlight.json");
        self.report("sunlight analysis", write_json(&path, result));
    }

    fn on_shadow_snapshots(&self, snapshots: &[ShadowSnapshot]) {
        for snapshot in snapshots {
            let path = self.out_dir.join(format!("shadow-{}.png", snapshot.label));
            let result = snapshot
                .raster
                .save_png(&path)
                .with_context(|| format!("snapshot {}", snapshot.label));
            self.report("snapshot", result);
        }
    }
}

/// A neighborhood read from disk, served for any request.
struct FileSource {
    neighborhood: Neighborhood3D,
}

#[async_trait]
impl NeighborhoodSource for FileSource {
    async fn neighborhood(&self, _request: &FetchRequest) -> Neighborhood3D {
        self.neighborhood.clone()
    }
}

fn live_source(settings: &Settings) -> Result<Arc<dyn NeighborhoodSource>> {
    let registry = Arc::new(RegistryClient::new(&settings.registry_base_url));
    let cache = settings
        .cache_enabled
        .then(|| NeighborhoodCache::new(Arc::new(TtlCache::new()), settings.cache_policy()));
    let service = NeighborhoodService::new(registry, settings.fetch_config(), cache)
        .context("Invalid fetch configuration")?;
    Ok(Arc::new(service))
}

fn request_from_args(args: &Args) -> Result<FetchRequest> {
    let (Some(target_id), Some(x), Some(y), Some(lat), Some(lng)) =
        (args.target_id.as_deref(), args.x, args.y, args.lat, args.lng)
    else {
        bail!("--target-id, --x, --y, --lat and --lng are required unless --from-file is given");
    };
    let center = NeighborhoodCenter::new(lat, lng, x, y);
    Ok(FetchRequest::new(target_id, args.anchor.as_deref(), center))
}

fn request_from_file(args: &Args, neighborhood: &Neighborhood3D) -> FetchRequest {
    let target_id = args
        .target_id
        .clone()
        .or_else(|| neighborhood.target_id.clone())
        .unwrap_or_else(|| neighborhood.address_id.clone());
    FetchRequest::new(&target_id, Some(&neighborhood.address_id), neighborhood.center)
}

fn analysis_date(year: Option<i32>) -> NaiveDate {
    let today = Local::now().date_naive();
    match year {
        // 29 February falls back to new year's day
        Some(y) => today
            .with_year(y)
            .or_else(|| NaiveDate::from_ymd_opt(y, 1, 1))
            .unwrap_or(today),
        None => today,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "massing3d=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let settings = Settings::from_env();

    let (source, request): (Arc<dyn NeighborhoodSource>, FetchRequest) = match &args.from_file {
        Some(path) => {
            let neighborhood = read_neighborhood(path)?;
            info!(path = %path.display(), buildings = neighborhood.buildings.len(), "Replaying saved neighborhood");
            let request = request_from_file(&args, &neighborhood);
            (Arc::new(FileSource { neighborhood }), request)
        }
        None => (live_source(&settings)?, request_from_args(&args)?),
    };

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Cannot create {}", args.out_dir.display()))?;
    let host = Arc::new(FileHost {
        out_dir: args.out_dir.clone(),
    });

    let today = analysis_date(args.year);
    let mut config = ViewerConfig::new(today);
    config.sunlight = settings.sunlight_config();
    config.snapshot.utc_offset_hours = settings.utc_offset_hours;

    let center = request.center;
    let session = ViewerSession::new(
        source,
        host,
        ResourceTracker::new(),
        SoftwareRenderer::new(args.width, args.height),
        config,
    );

    // The ground tile is cosmetic and only fetched for live selections
    let ground = async {
        if args.from_file.is_some() {
            return None;
        }
        let basemap = WmsBasemap::new(&settings.basemap_url, DEFAULT_BASEMAP_LAYER, args.width);
        load_ground_texture(&basemap, &center, GROUND_HALF_EXTENT).await
    };
    let (selection, ground) = tokio::join!(session.select(request), ground);
    if let Some(raster) = &ground {
        let path = args.out_dir.join("ground.png");
        if let Err(e) = raster.save_png(&path) {
            warn!(error = %e, "Failed to write ground texture");
        }
    }

    match selection? {
        Selection::Applied(report) => info!(
            status = ?report.status,
            buildings = report.scene.created,
            out_dir = %args.out_dir.display(),
            "Done"
        ),
        Selection::Superseded => warn!("Selection superseded"),
    }

    if args.view {
        open_viewer(&session, ground.as_ref(), today).await?;
    }
    session.teardown();
    Ok(())
}

#[cfg(feature = "viewer")]
async fn open_viewer(
    session: &ViewerSession<ResourceTracker, SoftwareRenderer>,
    ground: Option<&Raster>,
    today: NaiveDate,
) -> Result<()> {
    let Some(neighborhood) = session.current().await else {
        bail!("Nothing to show");
    };
    let sun = session.sun().await;
    massing3d::draw::run_viewer(&neighborhood, ground, sun, today, &massing3d::draw::DrawConfig::new())
}

#[cfg(not(feature = "viewer"))]
async fn open_viewer(
    _session: &ViewerSession<ResourceTracker, SoftwareRenderer>,
    _ground: Option<&Raster>,
    _today: NaiveDate,
) -> Result<()> {
    warn!("Built without the `viewer` feature, --view ignored");
    Ok(())
}

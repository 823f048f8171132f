//! One viewer: the selected property, its scene and the one-shot analyses.
//!
//! A selection fetches the massing, replaces the scene, captures the shadow
//! snapshots and runs the sunlight analysis. Each step that can finish after
//! a newer selection checks its [`SequenceToken`] first and drops its result
//! when superseded.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::fetch::coordinator::FetchRequest;
use crate::massing::building::{FetchStatus, Neighborhood3D};
use crate::scene::builder::{SceneBuilder, SceneUpdate};
use crate::scene::camera::CameraPreset;
use crate::scene::resources::{RenderError, RenderResources};
use crate::sim::solar::control::{DatePreset, SunControl};
use crate::sim::solar::light::LightState;
use crate::sim::sunlight::analyzer::{SunlightAnalysis, SunlightAnalyzer, analyze};
use crate::sim::sunlight::config::SunlightConfig;
use crate::snapshot::capture::{SnapshotCapturer, SnapshotConfig, SnapshotOutcome};
use crate::snapshot::raster::Raster;
use crate::snapshot::render::RenderBackend;
use crate::viewer::host::{HostCallbacks, NeighborhoodSource};
use crate::viewer::sequence::{RequestSequence, SequenceToken};

/// Hour shown when a session starts.
const INITIAL_HOUR: f64 = 12.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub sunlight: SunlightConfig,
    pub snapshot: SnapshotConfig,
    /// Date of the interactive sun and the year of the analyses.
    pub today: NaiveDate,
}

impl ViewerConfig {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            sunlight: SunlightConfig::new(),
            snapshot: SnapshotConfig::new(),
            today,
        }
    }
}

/// What happened to a selection.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Applied(SelectionReport),
    /// A newer selection started before this one finished. Its sunlight
    /// analysis, if one ran, never reached the host.
    Superseded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionReport {
    pub status: FetchStatus,
    pub scene: SceneUpdate,
    /// `None` when this building set was analyzed before.
    pub sunlight: Option<SunlightAnalysis>,
    pub snapshots: SnapshotOutcome,
}

struct SessionInner<R: RenderResources, B: RenderBackend> {
    builder: SceneBuilder<R>,
    backend: B,
    analyzer: SunlightAnalyzer,
    capturer: SnapshotCapturer,
    sun: SunControl,
    current: Option<Neighborhood3D>,
}

pub struct ViewerSession<R: RenderResources, B: RenderBackend> {
    source: Arc<dyn NeighborhoodSource>,
    host: Arc<dyn HostCallbacks>,
    sequence: RequestSequence,
    today: NaiveDate,
    inner: Mutex<SessionInner<R, B>>,
}

impl<R, B> ViewerSession<R, B>
where
    R: RenderResources + Send,
    B: RenderBackend + Send,
{
    pub fn new(
        source: Arc<dyn NeighborhoodSource>,
        host: Arc<dyn HostCallbacks>,
        resources: R,
        backend: B,
        config: ViewerConfig,
    ) -> Self {
        let sun = SunControl::new(
            0.0,
            0.0,
            config.sunlight.utc_offset_hours,
            config.today,
            INITIAL_HOUR,
        );
        let inner = SessionInner {
            builder: SceneBuilder::new(resources),
            backend,
            analyzer: SunlightAnalyzer::new(config.sunlight),
            capturer: SnapshotCapturer::new(config.snapshot),
            sun,
            current: None,
        };
        Self {
            source,
            host,
            sequence: RequestSequence::new(),
            today: config.today,
            inner: Mutex::new(inner),
        }
    }

    pub fn sequence(&self) -> &RequestSequence {
        &self.sequence
    }

    /// Selects a new property. Supersedes every selection still in flight.
    ///
    /// The session lock is released while the sunlight analysis runs, so
    /// the sun controls and newer selections are never blocked by it.
    pub async fn select(&self, request: FetchRequest) -> Result<Selection, RenderError> {
        let token = self.sequence.next();
        let neighborhood = self.source.neighborhood(&request).await;
        if !self.sequence.is_current(token) {
            debug!(target_id = %request.target_id, "Stale neighborhood discarded");
            return Ok(Selection::Superseded);
        }

        let (scene, snapshots, claimed) = {
            let mut inner = self.inner.lock().await;
            if !self.sequence.is_current(token) {
                debug!(target_id = %request.target_id, "Stale neighborhood discarded");
                return Ok(Selection::Superseded);
            }

            let scene = inner.builder.set_massing(&neighborhood)?;
            let center = neighborhood.center;
            let SessionInner { builder, sun, .. } = &mut *inner;
            sun.latitude = center.lat;
            sun.longitude = center.lng;
            sun.apply(builder.state_mut());
            inner.current = Some(neighborhood.clone());
            self.host.on_neighborhood(&neighborhood);
            info!(
                address_id = %neighborhood.address_id,
                status = ?neighborhood.status,
                buildings = neighborhood.buildings.len(),
                "Selection applied"
            );

            let snapshots = self.capture(&mut *inner, &neighborhood);
            let claimed = if inner.analyzer.claim(&neighborhood) {
                Some(inner.analyzer.config().clone())
            } else {
                None
            };
            (scene, snapshots, claimed)
        };

        let sunlight = match claimed {
            Some(config) => match self.analyze(config, &neighborhood, token).await {
                Some(analysis) => Some(analysis),
                None => return Ok(Selection::Superseded),
            },
            None => None,
        };

        Ok(Selection::Applied(SelectionReport {
            status: neighborhood.status,
            scene,
            sunlight,
            snapshots,
        }))
    }

    /// A render failure degrades to [`SnapshotOutcome::Failed`].
    fn capture(&self, inner: &mut SessionInner<R, B>, neighborhood: &Neighborhood3D) -> SnapshotOutcome {
        let SessionInner {
            builder,
            backend,
            capturer,
            ..
        } = inner;
        match capturer.capture_once(neighborhood, builder.state_mut(), backend, self.today.year()) {
            Ok(outcome) => {
                if let SnapshotOutcome::Captured(snapshots) = &outcome {
                    self.host.on_shadow_snapshots(snapshots);
                }
                outcome
            }
            Err(e) => {
                warn!(address_id = %neighborhood.address_id, error = %e, "Shadow snapshot capture failed");
                SnapshotOutcome::Failed(e.to_string())
            }
        }
    }

    /// Runs a claimed analysis off the lock. `None` when superseded; the
    /// claim is then released so the set runs again on its next selection.
    async fn analyze(
        &self,
        config: SunlightConfig,
        neighborhood: &Neighborhood3D,
        token: SequenceToken,
    ) -> Option<SunlightAnalysis> {
        let input = neighborhood.clone();
        let year = self.today.year();
        let analysis = match tokio::task::spawn_blocking(move || analyze(&config, &input, year)).await {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(error = %e, "Sunlight analysis task failed");
                SunlightAnalysis::Unavailable(e.to_string())
            }
        };

        let mut inner = self.inner.lock().await;
        if !self.sequence.is_current(token) {
            debug!(address_id = %neighborhood.address_id, "Stale sunlight analysis discarded");
            inner.analyzer.release(&neighborhood.building_set_key());
            return None;
        }
        match &analysis {
            SunlightAnalysis::Available(result) => self.host.on_sunlight_analysis(result),
            SunlightAnalysis::Unavailable(reason) => debug!(reason = %reason, "Sunlight analysis unavailable"),
        }
        Some(analysis)
    }

    /// Massing of the current selection.
    pub async fn current(&self) -> Option<Neighborhood3D> {
        self.inner.lock().await.current.clone()
    }

    pub async fn set_hour(&self, hour: f64) -> LightState {
        let mut inner = self.inner.lock().await;
        let SessionInner { builder, sun, .. } = &mut *inner;
        sun.set_hour(hour, builder.state_mut())
    }

    pub async fn set_date_preset(&self, preset: DatePreset) -> LightState {
        let mut inner = self.inner.lock().await;
        let SessionInner { builder, sun, .. } = &mut *inner;
        sun.set_preset(preset, self.today, builder.state_mut())
    }

    pub async fn sun(&self) -> SunControl {
        self.inner.lock().await.sun
    }

    pub async fn apply_camera_preset(&self, preset: CameraPreset) -> bool {
        self.inner.lock().await.builder.apply_preset(preset)
    }

    /// Renders the scene as it is now.
    pub async fn render_frame(&self) -> Result<Raster, RenderError> {
        let mut inner = self.inner.lock().await;
        let SessionInner { builder, backend, .. } = &mut *inner;
        backend.render(builder.state())
    }

    /// Supersedes pending selections and releases every render resource.
    pub fn teardown(self) -> R {
        self.sequence.next();
        self.inner.into_inner().builder.teardown()
    }
}

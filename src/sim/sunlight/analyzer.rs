//! Hourly obstruction ray casts from the target roof toward the sun.

use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::geom::ray::Ray;
use crate::geom::volume::Volume;
use crate::massing::building::{BuildingSetKey, Neighborhood3D, NeighborhoodCenter};
use crate::sim::solar::position::{Daylight, SolarPosition};
use crate::sim::sunlight::config::SunlightConfig;
use crate::sim::sunlight::result::{MonthlySunlight, SunlightResult};
use crate::{Point, Vector};

/// Whole local clock hours sampled on one day, both ends included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingWindow {
    pub first_hour: u32,
    pub last_hour: u32,
}

impl SamplingWindow {
    pub fn len(&self) -> u32 {
        self.last_hour - self.first_hour + 1
    }

    pub fn hours(&self) -> std::ops::RangeInclusive<u32> {
        self.first_hour..=self.last_hour
    }
}

/// Hours `h` whose sample time `h:minute_offset` (local) falls strictly
/// between sunrise and sunset. `None` when no sample is in daylight.
pub fn sampling_window(daylight: Daylight, utc_offset_hours: f64, minute_offset: u32) -> Option<SamplingWindow> {
    let m = minute_offset as f64 / 60.0;
    let (first, last) = match daylight {
        Daylight::PolarNight => return None,
        Daylight::PolarDay => (0, 23),
        Daylight::Normal { sunrise, sunset } => {
            let first = (sunrise + utc_offset_hours - m).floor() as i64 + 1;
            let last = (sunset + utc_offset_hours - m).ceil() as i64 - 1;
            (first.max(0), last.min(23))
        }
    };
    (first <= last).then_some(SamplingWindow {
        first_hour: first as u32,
        last_hour: last as u32,
    })
}

/// Sunlit samples on the representative day of `month`.
///
/// A sample is sunlit when the sun is above the horizon and the ray from
/// `origin` toward it hits no volume other than `target_id` before the far
/// bound. The ground is not an obstruction.
pub fn sunlit_hours(
    config: &SunlightConfig,
    center: &NeighborhoodCenter,
    year: i32,
    month: u32,
    origin: Point,
    volumes: &[Volume],
    target_id: &str,
) -> MonthlySunlight {
    let mut monthly = MonthlySunlight {
        month,
        sunlit_hours: 0,
        sampled_hours: 0,
    };
    let Some(date) = NaiveDate::from_ymd_opt(year, month, config.day_of_month) else {
        return monthly;
    };
    let (latitude, longitude) = (center.lat, center.lng);
    let day = date.ordinal();
    let daylight = Daylight::on_day(latitude, longitude, day);
    let Some(window) = sampling_window(daylight, config.utc_offset_hours, config.minute_offset) else {
        return monthly;
    };

    let minutes = config.minute_offset as f64 / 60.0;
    for hour in window.hours() {
        let utc_hour = hour as f64 + minutes - config.utc_offset_hours;
        let sun = SolarPosition::on_day(latitude, longitude, day, utc_hour);
        if !sun.is_above_horizon() {
            continue;
        }
        monthly.sampled_hours += 1;
        let obstructed = Ray::new(origin, sun.to_direction())
            .is_some_and(|ray| ray.is_obstructed(volumes, Some(target_id), config.far_bound));
        if !obstructed {
            monthly.sunlit_hours += 1;
        }
    }
    monthly
}

/// Outcome of the analysis. Unmet preconditions are a value, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum SunlightAnalysis {
    Available(SunlightResult),
    Unavailable(String),
}

/// Sunlight hours of the target for the twelve months of `year`.
pub fn analyze(config: &SunlightConfig, neighborhood: &Neighborhood3D, year: i32) -> SunlightAnalysis {
    let Some(target_id) = neighborhood.target_id.as_deref() else {
        return SunlightAnalysis::Unavailable("target building unknown".to_string());
    };
    let Some(target) = neighborhood.target() else {
        return SunlightAnalysis::Unavailable("target building missing from massing".to_string());
    };
    let target = match target.to_volume(true) {
        Ok(v) => v,
        Err(e) => return SunlightAnalysis::Unavailable(format!("invalid target massing: {e}")),
    };

    let volumes: Vec<Volume> = neighborhood
        .neighbors()
        .filter_map(|b| match b.to_volume(false) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(building = %b.id, error = %e, "Neighbor ignored in sunlight analysis");
                None
            }
        })
        .collect();

    let origin = target.roof_centroid() + Vector::new(0., 0., config.ray_lift);
    let center = neighborhood.center;
    let monthly: Vec<MonthlySunlight> = (1..=12u32)
        .into_par_iter()
        .map(|month| sunlit_hours(config, &center, year, month, origin, &volumes, target_id))
        .collect();

    let result = SunlightResult::from_monthly(target_id, year, monthly, config);
    info!(
        target_id,
        winter = result.winter,
        summer = result.summer,
        annual_average = result.annual_average,
        risk = ?result.risk,
        "Sunlight analysis done"
    );
    SunlightAnalysis::Available(result)
}

/// Runs [`analyze`] at most once per building set.
#[derive(Debug, Default)]
pub struct SunlightAnalyzer {
    config: SunlightConfig,
    last_key: Option<BuildingSetKey>,
}

impl SunlightAnalyzer {
    pub fn new(config: SunlightConfig) -> Self {
        Self {
            config,
            last_key: None,
        }
    }

    pub fn config(&self) -> &SunlightConfig {
        &self.config
    }

    /// Marks the building set as analyzed. Returns false if it already was.
    pub fn claim(&mut self, neighborhood: &Neighborhood3D) -> bool {
        let key = neighborhood.building_set_key();
        if self.last_key.as_ref() == Some(&key) {
            debug!("Sunlight already analyzed for this building set");
            return false;
        }
        self.last_key = Some(key);
        true
    }

    /// Lets the next claim of `key` through, for an analysis whose result
    /// was dropped. A newer claim of another set is kept.
    pub fn release(&mut self, key: &BuildingSetKey) {
        if self.last_key.as_ref() == Some(key) {
            self.last_key = None;
        }
    }

    /// `None` when this building set was analyzed before.
    pub fn run_once(&mut self, neighborhood: &Neighborhood3D, year: i32) -> Option<SunlightAnalysis> {
        self.claim(neighborhood)
            .then(|| analyze(&self.config, neighborhood, year))
    }
}

//! Hour slider and date presets driving the scene light.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::scene::state::SceneState;
use crate::sim::solar::light::LightState;
use crate::sim::solar::position::SolarPosition;
use crate::Point;

/// Discrete date choices of the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePreset {
    WinterSolstice,
    Equinox,
    SummerSolstice,
    Today,
}

impl DatePreset {
    /// Calendar date of the preset in the year of `today`.
    pub fn resolve(&self, today: NaiveDate) -> NaiveDate {
        let (month, day) = match self {
            Self::WinterSolstice => (12, 21),
            Self::Equinox => (3, 21),
            Self::SummerSolstice => (6, 21),
            Self::Today => return today,
        };
        NaiveDate::from_ymd_opt(today.year(), month, day).unwrap_or(today)
    }
}

/// Sun state selected by the user: a fixed date plus a local clock hour.
///
/// Every input change recomputes the light and writes it into the scene
/// right away.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunControl {
    pub latitude: f64,
    pub longitude: f64,
    /// Fixed offset of local clock time from UTC [h].
    pub utc_offset_hours: f64,
    pub date: NaiveDate,
    /// Local clock hour, 0-24.
    pub hour: f64,
}

impl SunControl {
    pub fn new(latitude: f64, longitude: f64, utc_offset_hours: f64, date: NaiveDate, hour: f64) -> Self {
        Self {
            latitude,
            longitude,
            utc_offset_hours,
            date,
            hour: hour.clamp(0.0, 24.0),
        }
    }

    pub fn position(&self) -> SolarPosition {
        SolarPosition::on_day(
            self.latitude,
            self.longitude,
            self.date.ordinal(),
            self.hour - self.utc_offset_hours,
        )
    }

    pub fn light(&self, focus: Point) -> LightState {
        LightState::from_sun(&self.position(), focus)
    }

    /// Writes the light for the current inputs into `state`.
    pub fn apply(&self, state: &mut SceneState) -> LightState {
        let light = self.light(state.focus());
        state.set_light(light);
        light
    }

    pub fn set_hour(&mut self, hour: f64, state: &mut SceneState) -> LightState {
        self.hour = hour.clamp(0.0, 24.0);
        self.apply(state)
    }

    pub fn set_date(&mut self, date: NaiveDate, state: &mut SceneState) -> LightState {
        self.date = date;
        self.apply(state)
    }

    pub fn set_preset(&mut self, preset: DatePreset, today: NaiveDate, state: &mut SceneState) -> LightState {
        self.set_date(preset.resolve(today), state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_presets() {
        let today = date(2025, 8, 14);
        assert_eq!(DatePreset::WinterSolstice.resolve(today), date(2025, 12, 21));
        assert_eq!(DatePreset::Equinox.resolve(today), date(2025, 3, 21));
        assert_eq!(DatePreset::SummerSolstice.resolve(today), date(2025, 6, 21));
        assert_eq!(DatePreset::Today.resolve(today), today);
    }

    #[test]
    fn test_hour_change_updates_scene_light() {
        let mut state = SceneState::new();
        let mut control = SunControl::new(52.37, 4.90, 1.0, date(2025, 6, 21), 13.0);
        let noon = control.apply(&mut state);
        assert!(noon.is_on());
        assert_eq!(*state.light(), noon);

        let night = control.set_hour(23.5, &mut state);
        assert_eq!(night.intensity, 0.0);
        assert_eq!(*state.light(), night);

        // Out of range input is clamped
        control.set_hour(30.0, &mut state);
        assert_eq!(control.hour, 24.0);
    }

    #[test]
    fn test_winter_sun_is_lower() {
        let mut state = SceneState::new();
        let mut control = SunControl::new(52.37, 4.90, 1.0, date(2025, 6, 21), 12.5);
        let summer = control.position().altitude;
        control.set_preset(DatePreset::WinterSolstice, date(2025, 6, 1), &mut state);
        let winter = control.position().altitude;
        assert!(summer > 55.0 && winter < 20.0, "summer {summer} winter {winter}");
    }
}

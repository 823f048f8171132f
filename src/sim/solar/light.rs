//! Directional sun light placed relative to the scene focus.

use crate::sim::solar::position::SolarPosition;
use crate::{Point, Vector};

/// Distance of the light from the focus point [m].
pub const SUN_DISTANCE: f64 = 400.0;

/// Intensity of the sun light when above the horizon.
pub const SUN_INTENSITY: f32 = 2.5;

/// Pose and strength of the directional light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightState {
    pub position: Point,
    /// Direction the light travels (from `position` toward the focus).
    pub direction: Vector,
    pub intensity: f32,
}

impl LightState {
    /// Light placed on the sun direction at a fixed distance from `focus`,
    /// aimed back at it. Intensity is exactly 0 when the sun is at or below
    /// the horizon.
    pub fn from_sun(sun: &SolarPosition, focus: Point) -> Self {
        let to_sun = sun.to_direction();
        let intensity = if sun.is_above_horizon() {
            SUN_INTENSITY
        } else {
            0.0
        };
        Self {
            position: focus + to_sun * SUN_DISTANCE,
            direction: -to_sun,
            intensity,
        }
    }

    pub fn is_on(&self) -> bool {
        self.intensity > 0.0
    }
}

impl Default for LightState {
    /// Overhead noon light.
    fn default() -> Self {
        let zenith = SolarPosition {
            altitude: 90.0,
            azimuth: 180.0,
        };
        Self::from_sun(&zenith, Point::origin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_intensity_zero_below_horizon() {
        let focus = Point::new(3.0, -2.0, 7.5);
        let times = [
            Utc.with_ymd_and_hms(2024, 12, 21, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 12, 21, 17, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 21, 22, 30, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 21, 3, 15, 0).unwrap(),
        ];
        for (lat, lng) in [(52.37, 4.90), (51.92, 4.48), (-33.9, 18.4), (0.0, 0.0)] {
            for time in times {
                let sun = SolarPosition::at(lat, lng, time);
                let light = LightState::from_sun(&sun, focus);
                if sun.altitude <= 0.0 {
                    assert_eq!(light.intensity, 0.0);
                    assert!(!light.is_on());
                } else {
                    assert_eq!(light.intensity, SUN_INTENSITY);
                }
            }
        }
    }

    #[test]
    fn test_light_aims_at_focus() {
        let focus = Point::new(10.0, 20.0, 5.0);
        let sun = SolarPosition {
            altitude: 30.0,
            azimuth: 135.0,
        };
        let light = LightState::from_sun(&sun, focus);
        assert!((light.position.distance(&focus) - SUN_DISTANCE).abs() < 1e-9);
        let back = light.position + light.direction * SUN_DISTANCE;
        assert!(back.is_close(&focus));
        // South-east and above
        assert!(light.position.x > focus.x && light.position.y < focus.y && light.position.z > focus.z);
    }
}

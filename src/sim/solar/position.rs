use std::f64::consts::PI;

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::Vector;

/// Where the sun stands, seen from the site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarPosition {
    /// Degrees above the horizon, negative at night.
    pub altitude: f64,
    /// Degrees clockwise from north, 0..360.
    pub azimuth: f64,
}

/// Day angle (Spencer), radians.
fn day_angle(day_of_year: u32) -> f64 {
    2.0 * PI * (day_of_year as f64 - 1.0) / 365.0
}

/// Solar declination (Spencer approximation), radians.
pub fn declination(day_of_year: u32) -> f64 {
    let gamma = day_angle(day_of_year);
    0.006918 - 0.399912 * gamma.cos() + 0.070257 * gamma.sin()
        - 0.006758 * (2.0 * gamma).cos()
        + 0.000907 * (2.0 * gamma).sin()
        - 0.002697 * (3.0 * gamma).cos()
        + 0.00148 * (3.0 * gamma).sin()
}

/// Equation of time (Spencer), minutes.
pub fn equation_of_time(day_of_year: u32) -> f64 {
    let gamma = day_angle(day_of_year);
    229.18
        * (0.000075 + 0.001868 * gamma.cos()
            - 0.032077 * gamma.sin()
            - 0.014615 * (2.0 * gamma).cos()
            - 0.040849 * (2.0 * gamma).sin())
}

/// Converts UTC clock hours to apparent solar time at `longitude`.
pub fn solar_time(longitude: f64, day_of_year: u32, utc_hour: f64) -> f64 {
    utc_hour + longitude / 15.0 + equation_of_time(day_of_year) / 60.0
}

impl SolarPosition {
    /// Position at apparent solar time `solar_hour` (noon = 12).
    pub fn calculate(latitude: f64, day_of_year: u32, solar_hour: f64) -> Self {
        let phi = latitude.to_radians();
        let delta = declination(day_of_year);
        let omega = ((solar_hour - 12.0) * 15.0).to_radians();

        let sin_h = phi.sin() * delta.sin() + phi.cos() * delta.cos() * omega.cos();
        let h = sin_h.clamp(-1.0, 1.0).asin();

        // Azimuth from north, mirrored after solar noon
        let cos_a = (delta.sin() * phi.cos() - delta.cos() * phi.sin() * omega.cos())
            / h.cos().max(1e-10);
        let a = cos_a.clamp(-1.0, 1.0).acos().to_degrees();
        let azimuth = if omega.sin() > 0.0 { 360.0 - a } else { a };

        Self {
            altitude: h.to_degrees(),
            azimuth,
        }
    }

    /// Position for a day of the year and a UTC clock time in hours.
    ///
    /// `utc_hour` may fall outside 0-24 when a local day spans UTC midnight.
    pub fn on_day(latitude: f64, longitude: f64, day_of_year: u32, utc_hour: f64) -> Self {
        Self::calculate(latitude, day_of_year, solar_time(longitude, day_of_year, utc_hour))
    }

    /// Position at an instant.
    pub fn at(latitude: f64, longitude: f64, time: DateTime<Utc>) -> Self {
        let utc_hour =
            time.hour() as f64 + time.minute() as f64 / 60.0 + time.second() as f64 / 3600.0;
        Self::on_day(latitude, longitude, time.ordinal(), utc_hour)
    }

    pub fn is_above_horizon(&self) -> bool {
        self.altitude > 0.0
    }

    /// Unit vector from the site toward the sun.
    pub fn to_direction(&self) -> Vector {
        Vector::from_horizontal(self.azimuth, self.altitude)
    }
}

/// Sun rise and set for one day, in UTC clock hours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Daylight {
    /// Sun crosses the horizon twice. `sunset` may exceed 24 and `sunrise`
    /// may be negative for longitudes far from the time zone meridian.
    Normal { sunrise: f64, sunset: f64 },
    /// Sun never sets.
    PolarDay,
    /// Sun never rises.
    PolarNight,
}

impl Daylight {
    /// Horizon crossings of the geometric sun center (altitude 0), from the
    /// same model as [`SolarPosition::calculate`].
    pub fn on_day(latitude: f64, longitude: f64, day_of_year: u32) -> Self {
        let lat = latitude.to_radians();
        let decl = declination(day_of_year);
        let cos_h0 = -lat.tan() * decl.tan();
        if cos_h0 <= -1.0 {
            return Self::PolarDay;
        }
        if cos_h0 >= 1.0 {
            return Self::PolarNight;
        }
        let half_day = cos_h0.acos().to_degrees() / 15.0;
        let noon = 12.0 - longitude / 15.0 - equation_of_time(day_of_year) / 60.0;
        Self::Normal {
            sunrise: noon - half_day,
            sunset: noon + half_day,
        }
    }

    /// Length of the day in hours.
    pub fn hours(&self) -> f64 {
        match self {
            Self::Normal { sunrise, sunset } => sunset - sunrise,
            Self::PolarDay => 24.0,
            Self::PolarNight => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_equinox_noon_on_the_equator_is_overhead() {
        let sun = SolarPosition::calculate(0.0, 80, 12.0);
        assert!(sun.altitude > 88.0, "altitude {}", sun.altitude);
    }

    #[test]
    fn test_winter_midnight_is_dark() {
        let sun = SolarPosition::calculate(52.0, 355, 0.0);
        assert!(!sun.is_above_horizon());
        assert!(sun.altitude < -50.0);
    }

    #[test]
    fn test_amsterdam_summer_noon() {
        // 21 June 2024, 11:40 UTC is close to solar noon in Amsterdam
        let time = Utc.with_ymd_and_hms(2024, 6, 21, 11, 40, 0).unwrap();
        let pos = SolarPosition::at(52.37, 4.90, time);
        // 90 - 52.37 + 23.44
        assert!((pos.altitude - 61.07).abs() < 0.5, "altitude {}", pos.altitude);
        assert!((pos.azimuth - 180.0).abs() < 3.0, "azimuth {}", pos.azimuth);
    }

    #[test]
    fn test_morning_is_east_afternoon_is_west() {
        let morning = SolarPosition::calculate(52.0, 172, 9.0);
        let afternoon = SolarPosition::calculate(52.0, 172, 15.0);
        assert!(morning.azimuth > 0.0 && morning.azimuth < 180.0);
        assert!(afternoon.azimuth > 180.0 && afternoon.azimuth < 360.0);
        assert!((morning.altitude - afternoon.altitude).abs() < 1e-9);
        assert!((morning.azimuth + afternoon.azimuth - 360.0).abs() < 1e-9);
    }

    #[test]
    fn test_direction_follows_azimuth() {
        let low_south = SolarPosition {
            altitude: 0.0,
            azimuth: 180.0,
        };
        let d = low_south.to_direction();
        assert!((d.dy + 1.0).abs() < 1e-9 && d.dz.abs() < 1e-9);

        let high_east = SolarPosition {
            altitude: 60.0,
            azimuth: 90.0,
        };
        let d = high_east.to_direction();
        assert!(d.dx > 0.0 && d.dy.abs() < 1e-9);
        assert!((d.dz - 60f64.to_radians().sin()).abs() < 1e-9);
        assert!((d.length() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_daylight_matches_altitude_sign() {
        let (lat, lng) = (52.37, 4.90);
        for day in [21, 80, 172, 265, 355] {
            let Daylight::Normal { sunrise, sunset } = Daylight::on_day(lat, lng, day) else {
                panic!("expected sunrise and sunset");
            };
            assert!(SolarPosition::on_day(lat, lng, day, sunrise - 0.05).altitude < 0.0);
            assert!(SolarPosition::on_day(lat, lng, day, sunrise + 0.05).altitude > 0.0);
            assert!(SolarPosition::on_day(lat, lng, day, sunset - 0.05).altitude > 0.0);
            assert!(SolarPosition::on_day(lat, lng, day, sunset + 0.05).altitude < 0.0);
        }
    }

    #[test]
    fn test_day_length_by_season() {
        let winter = Daylight::on_day(52.37, 4.90, 355).hours();
        let summer = Daylight::on_day(52.37, 4.90, 172).hours();
        assert!(winter > 7.0 && winter < 8.0, "winter {winter}");
        assert!(summer > 16.0 && summer < 17.0, "summer {summer}");
    }

    #[test]
    fn test_polar_cases() {
        assert_eq!(Daylight::on_day(78.0, 15.0, 172), Daylight::PolarDay);
        assert_eq!(Daylight::on_day(78.0, 15.0, 355), Daylight::PolarNight);
    }
}

use crate::fetch::config::ConfigError;

/// Configuration of the sunlight analysis.
///
/// The winter risk thresholds and the hourly sampling are heuristics, kept
/// here as policy values.
#[derive(Debug, Clone, PartialEq)]
pub struct SunlightConfig {
    /// Representative day of every month.
    pub day_of_month: u32,
    /// Minute past each whole hour at which the sun is sampled.
    pub minute_offset: u32,
    /// Height of the ray origin above the target roof centroid [m].
    pub ray_lift: f64,
    /// Far bound of obstruction rays [m].
    pub far_bound: f64,
    pub winter_month: u32,
    pub equinox_month: u32,
    pub summer_month: u32,
    /// Winter hours below this are high risk.
    pub high_risk_below: u32,
    /// Winter hours above this are low risk.
    pub low_risk_above: u32,
    /// Fixed offset of local clock time from UTC [h].
    pub utc_offset_hours: f64,
}

impl SunlightConfig {
    pub fn new() -> Self {
        Self {
            day_of_month: 21,
            minute_offset: 30,
            ray_lift: 0.5,
            far_bound: 500.0,
            winter_month: 12,
            equinox_month: 3,
            summer_month: 6,
            high_risk_below: 2,
            low_risk_above: 4,
            utc_offset_hours: 1.0,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=28).contains(&self.day_of_month) {
            return Err(ConfigError::invalid("day_of_month", "must be within 1..=28"));
        }
        if self.minute_offset >= 60 {
            return Err(ConfigError::invalid("minute_offset", "must be below 60"));
        }
        for (name, month) in [
            ("winter_month", self.winter_month),
            ("equinox_month", self.equinox_month),
            ("summer_month", self.summer_month),
        ] {
            if !(1..=12).contains(&month) {
                return Err(ConfigError::invalid(name, "must be within 1..=12"));
            }
        }
        if !(self.far_bound.is_finite() && self.far_bound > 0.0) {
            return Err(ConfigError::invalid("far_bound", self.far_bound));
        }
        if !(self.ray_lift.is_finite() && self.ray_lift >= 0.0) {
            return Err(ConfigError::invalid("ray_lift", self.ray_lift));
        }
        if self.high_risk_below > self.low_risk_above {
            return Err(ConfigError::invalid(
                "high_risk_below",
                format!("{} exceeds low_risk_above {}", self.high_risk_below, self.low_risk_above),
            ));
        }
        if !(-14.0..=14.0).contains(&self.utc_offset_hours) {
            return Err(ConfigError::invalid("utc_offset_hours", "must be within -14..=14"));
        }
        Ok(())
    }
}

impl Default for SunlightConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = SunlightConfig::new();
        assert_eq!(config.day_of_month, 21);
        assert_eq!(config.minute_offset, 30);
        assert_eq!((config.winter_month, config.equinox_month, config.summer_month), (12, 3, 6));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values() {
        let config = SunlightConfig {
            minute_offset: 60,
            ..SunlightConfig::new()
        };
        assert!(config.validate().is_err());

        let config = SunlightConfig {
            high_risk_below: 5,
            ..SunlightConfig::new()
        };
        assert!(config.validate().is_err());
    }
}

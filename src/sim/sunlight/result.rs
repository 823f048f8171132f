use serde::{Deserialize, Serialize};

use crate::sim::sunlight::config::SunlightConfig;

/// Sunlight risk of the target, from winter hours only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    /// `< high_risk_below` is high, `> low_risk_above` is low, medium in
    /// between (both bounds inclusive).
    pub fn classify(winter_hours: u32, config: &SunlightConfig) -> Self {
        if winter_hours < config.high_risk_below {
            Self::High
        } else if winter_hours > config.low_risk_above {
            Self::Low
        } else {
            Self::Medium
        }
    }
}

/// Sunlit hours on the representative day of one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySunlight {
    pub month: u32,
    pub sunlit_hours: u32,
    /// Daylight samples with the sun above the horizon.
    pub sampled_hours: u32,
}

/// Payload of the `onSunlightAnalysis` host callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SunlightResult {
    pub target_id: String,
    pub winter: u32,
    pub equinox: u32,
    pub summer: u32,
    /// Mean of the twelve monthly counts, one decimal.
    pub annual_average: f64,
    pub analysis_year: i32,
    pub monthly: Vec<MonthlySunlight>,
    pub risk: RiskLevel,
}

impl SunlightResult {
    /// Aggregates the monthly counts. `monthly` must hold months 1 to 12.
    pub fn from_monthly(target_id: &str, year: i32, monthly: Vec<MonthlySunlight>, config: &SunlightConfig) -> Self {
        let hours_in = |month: u32| {
            monthly
                .iter()
                .find(|m| m.month == month)
                .map_or(0, |m| m.sunlit_hours)
        };
        let winter = hours_in(config.winter_month);
        let equinox = hours_in(config.equinox_month);
        let summer = hours_in(config.summer_month);
        let total: u32 = monthly.iter().map(|m| m.sunlit_hours).sum();
        let mean = if monthly.is_empty() {
            0.0
        } else {
            total as f64 / monthly.len() as f64
        };
        Self {
            target_id: target_id.to_string(),
            winter,
            equinox,
            summer,
            annual_average: (mean * 10.0).round() / 10.0,
            analysis_year: year,
            monthly,
            risk: RiskLevel::classify(winter, config),
        }
    }
}

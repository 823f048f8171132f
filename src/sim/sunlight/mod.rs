//! Direct sunlight hours on the target roof, obstructed by neighbor massing.

pub mod analyzer;
pub mod config;
pub mod result;

pub use analyzer::{SamplingWindow, SunlightAnalysis, SunlightAnalyzer, analyze, sampling_window, sunlit_hours};
pub use config::SunlightConfig;
pub use result::{MonthlySunlight, RiskLevel, SunlightResult};

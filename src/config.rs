//! Process settings read from `MASSING3D_*` environment variables.

use std::time::Duration;

use crate::fetch::cache::CachePolicy;
use crate::fetch::config::FetchConfig;
use crate::fetch::http::DEFAULT_REGISTRY_BASE_URL;
use crate::scene::basemap::DEFAULT_BASEMAP_URL;
use crate::sim::sunlight::config::SunlightConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub registry_base_url: String,
    pub basemap_url: String,
    pub radius: f64,
    pub target_timeout_ms: u64,
    pub overall_budget_ms: u64,
    pub per_page_timeout_ms: u64,
    pub caller_abort_timeout_ms: u64,
    pub page_size: usize,
    pub max_pages: usize,
    pub neighbor_cap: usize,
    pub cache_enabled: bool,
    pub cache_complete_ttl_secs: u64,
    pub cache_degraded_ttl_secs: u64,
    pub cache_cooldown_secs: u64,
    /// Offset of local clock time from UTC [h].
    pub utc_offset_hours: f64,
}

impl Default for Settings {
    fn default() -> Self {
        let fetch = FetchConfig::new();
        let cache = CachePolicy::new();
        Self {
            registry_base_url: DEFAULT_REGISTRY_BASE_URL.to_string(),
            basemap_url: DEFAULT_BASEMAP_URL.to_string(),
            radius: fetch.radius,
            target_timeout_ms: fetch.target_timeout.as_millis() as u64,
            overall_budget_ms: fetch.overall_budget.as_millis() as u64,
            per_page_timeout_ms: fetch.per_page_timeout.as_millis() as u64,
            caller_abort_timeout_ms: fetch.caller_abort_timeout.as_millis() as u64,
            page_size: fetch.page_size,
            max_pages: fetch.max_pages,
            neighbor_cap: fetch.neighbor_cap,
            cache_enabled: true,
            cache_complete_ttl_secs: cache.complete_ttl.as_secs(),
            cache_degraded_ttl_secs: cache.degraded_ttl.as_secs(),
            cache_cooldown_secs: cache.cooldown.as_secs(),
            utc_offset_hours: SunlightConfig::new().utc_offset_hours,
        }
    }
}

impl Settings {
    /// Load from environment variables, using defaults for missing values.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Settings::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: String| get(key).unwrap_or(default);
        Self {
            registry_base_url: or("MASSING3D_REGISTRY_URL", d.registry_base_url),
            basemap_url: or("MASSING3D_BASEMAP_URL", d.basemap_url),
            radius: parse_or(get("MASSING3D_RADIUS"), d.radius),
            target_timeout_ms: parse_or(get("MASSING3D_TARGET_TIMEOUT_MS"), d.target_timeout_ms),
            overall_budget_ms: parse_or(get("MASSING3D_OVERALL_BUDGET_MS"), d.overall_budget_ms),
            per_page_timeout_ms: parse_or(get("MASSING3D_PAGE_TIMEOUT_MS"), d.per_page_timeout_ms),
            caller_abort_timeout_ms: parse_or(get("MASSING3D_CALLER_TIMEOUT_MS"), d.caller_abort_timeout_ms),
            page_size: parse_or(get("MASSING3D_PAGE_SIZE"), d.page_size),
            max_pages: parse_or(get("MASSING3D_MAX_PAGES"), d.max_pages),
            neighbor_cap: parse_or(get("MASSING3D_NEIGHBOR_CAP"), d.neighbor_cap),
            cache_enabled: parse_or(get("MASSING3D_CACHE_ENABLED"), d.cache_enabled),
            cache_complete_ttl_secs: parse_or(get("MASSING3D_CACHE_TTL_SECS"), d.cache_complete_ttl_secs),
            cache_degraded_ttl_secs: parse_or(get("MASSING3D_CACHE_DEGRADED_TTL_SECS"), d.cache_degraded_ttl_secs),
            cache_cooldown_secs: parse_or(get("MASSING3D_CACHE_COOLDOWN_SECS"), d.cache_cooldown_secs),
            utc_offset_hours: parse_or(get("MASSING3D_UTC_OFFSET_HOURS"), d.utc_offset_hours),
        }
    }

    /// Fetch configuration. Not validated here, see [`FetchConfig::validate`].
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            radius: self.radius,
            target_timeout: Duration::from_millis(self.target_timeout_ms),
            overall_budget: Duration::from_millis(self.overall_budget_ms),
            per_page_timeout: Duration::from_millis(self.per_page_timeout_ms),
            caller_abort_timeout: Duration::from_millis(self.caller_abort_timeout_ms),
            page_size: self.page_size,
            max_pages: self.max_pages,
            neighbor_cap: self.neighbor_cap,
            ..FetchConfig::new()
        }
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            complete_ttl: Duration::from_secs(self.cache_complete_ttl_secs),
            degraded_ttl: Duration::from_secs(self.cache_degraded_ttl_secs),
            cooldown: Duration::from_secs(self.cache_cooldown_secs),
        }
    }

    pub fn sunlight_config(&self) -> SunlightConfig {
        SunlightConfig {
            utc_offset_hours: self.utc_offset_hours,
            ..SunlightConfig::new()
        }
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_match_components() {
        let s = settings(&[]);
        assert_eq!(s, Settings::default());
        assert_eq!(s.fetch_config(), FetchConfig::new());
        assert_eq!(s.cache_policy(), CachePolicy::new());
        assert_eq!(s.registry_base_url, DEFAULT_REGISTRY_BASE_URL);
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let s = settings(&[
            ("MASSING3D_RADIUS", "150"),
            ("MASSING3D_MAX_PAGES", "five"),
            ("MASSING3D_CACHE_ENABLED", "false"),
            ("MASSING3D_REGISTRY_URL", "  "),
            ("MASSING3D_CACHE_DEGRADED_TTL_SECS", "60"),
        ]);
        assert_eq!(s.radius, 150.0);
        assert_eq!(s.max_pages, 3);
        assert!(!s.cache_enabled);
        assert_eq!(s.registry_base_url, DEFAULT_REGISTRY_BASE_URL);
        assert_eq!(s.cache_policy().degraded_ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_broken_timeout_chain_is_caught_by_validation() {
        let s = settings(&[("MASSING3D_PAGE_TIMEOUT_MS", "25000")]);
        assert!(s.fetch_config().validate().is_err());
    }
}

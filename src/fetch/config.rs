use std::time::Duration;

/// Errors raised by configuration validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "Timeout chain violated: caller abort ({caller_abort:?}) > overall budget ({overall:?}) > per page ({per_page:?}) must hold"
    )]
    TimeoutChain {
        caller_abort: Duration,
        overall: Duration,
        per_page: Duration,
    },
    #[error("Target timeout ({target:?}) must be shorter than the caller abort ({caller_abort:?})")]
    TargetTimeout {
        target: Duration,
        caller_abort: Duration,
    },
    #[error("Invalid value for {name}: {message}")]
    InvalidValue { name: &'static str, message: String },
}

impl ConfigError {
    pub fn invalid(name: &'static str, message: impl ToString) -> Self {
        Self::InvalidValue {
            name,
            message: message.to_string(),
        }
    }
}

/// Configuration of the geometry fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    /// Half side of the neighbor query box [m].
    pub radius: f64,
    /// Time box of the direct target lookup.
    pub target_timeout: Duration,
    /// Budget shared by all neighbor pages.
    pub overall_budget: Duration,
    /// Upper bound for a single neighbor page.
    pub per_page_timeout: Duration,
    /// Timeout after which the caller gives up on the whole request.
    pub caller_abort_timeout: Duration,
    /// Pagination stops when less than this is left of the budget.
    pub min_remaining: Duration,
    /// Features requested per page.
    pub page_size: usize,
    pub max_pages: usize,
    /// Pagination stops once this many neighbors were gathered.
    pub neighbor_cap: usize,
}

impl FetchConfig {
    pub fn new() -> Self {
        Self {
            radius: 250.0,
            target_timeout: Duration::from_secs(10),
            overall_budget: Duration::from_secs(20),
            per_page_timeout: Duration::from_secs(8),
            caller_abort_timeout: Duration::from_secs(30),
            min_remaining: Duration::from_secs(1),
            page_size: 20,
            max_pages: 3,
            neighbor_cap: 50,
        }
    }

    /// Checks the timeout chain `caller_abort > overall_budget > per_page`
    /// and the remaining values.
    ///
    /// Call it after changing any of the timeouts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.caller_abort_timeout > self.overall_budget
            && self.overall_budget > self.per_page_timeout)
        {
            return Err(ConfigError::TimeoutChain {
                caller_abort: self.caller_abort_timeout,
                overall: self.overall_budget,
                per_page: self.per_page_timeout,
            });
        }
        if self.target_timeout >= self.caller_abort_timeout {
            return Err(ConfigError::TargetTimeout {
                target: self.target_timeout,
                caller_abort: self.caller_abort_timeout,
            });
        }
        if !(self.radius.is_finite() && self.radius > 0.) {
            return Err(ConfigError::invalid("radius", self.radius));
        }
        if self.page_size == 0 {
            return Err(ConfigError::invalid("page_size", "must be positive"));
        }
        if self.max_pages == 0 {
            return Err(ConfigError::invalid("max_pages", "must be positive"));
        }
        if self.neighbor_cap == 0 {
            return Err(ConfigError::invalid("neighbor_cap", "must be positive"));
        }
        if self.min_remaining >= self.overall_budget {
            return Err(ConfigError::invalid(
                "min_remaining",
                "must be shorter than the overall budget",
            ));
        }
        Ok(())
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = FetchConfig::new();
        assert_eq!(config.max_pages, 3);
        assert_eq!(config.neighbor_cap, 50);
        assert_eq!(config.page_size, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_timeout_chain() {
        let mut config = FetchConfig::new();
        config.per_page_timeout = Duration::from_secs(20);
        assert!(matches!(config.validate(), Err(ConfigError::TimeoutChain { .. })));

        let mut config = FetchConfig::new();
        config.overall_budget = Duration::from_secs(45);
        assert!(matches!(config.validate(), Err(ConfigError::TimeoutChain { .. })));

        let mut config = FetchConfig::new();
        config.target_timeout = Duration::from_secs(30);
        assert!(matches!(config.validate(), Err(ConfigError::TargetTimeout { .. })));
    }

    #[test]
    fn test_invalid_values() {
        let mut config = FetchConfig::new();
        config.radius = -5.;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { name: "radius", .. })
        ));

        let mut config = FetchConfig::new();
        config.max_pages = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_neighbor_cap_is_rejected() {
        let config = FetchConfig {
            neighbor_cap: 0,
            ..FetchConfig::new()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                name: "neighbor_cap",
                ..
            })
        ));
    }
}

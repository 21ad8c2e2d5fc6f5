//! Configuration for the reconciler

use crate::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Reconciler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Timeout for a single upstream bank API call, in seconds
    pub fetch_timeout_secs: u64,

    /// Local-currency units per wallet unit, used when a payment carries
    /// no explicit wallet amount
    pub fallback_conversion_rate: Decimal,

    /// How to treat several transactions satisfying the same payment
    pub match_policy: MatchPolicy,

    /// Maximum bank accounts fetched concurrently within one pass
    pub max_concurrent_fetches: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 15,
            fallback_conversion_rate: Decimal::from(25_000),
            match_policy: MatchPolicy::FirstMatch,
            max_concurrent_fetches: 4,
        }
    }
}

/// Disambiguation policy when more than one transaction satisfies a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Take the first satisfying transaction in upstream order
    FirstMatch,

    /// Only match when exactly one transaction satisfies the payment
    RequireUnique,
}

impl FromStr for MatchPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first_match" | "first" => Ok(MatchPolicy::FirstMatch),
            "require_unique" | "unique" => Ok(MatchPolicy::RequireUnique),
            other => Err(Error::Config(format!("Unknown match policy: {}", other))),
        }
    }
}

impl ReconcilerConfig {
    /// Upstream call timeout as a [`Duration`]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse from a TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ReconcilerConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = ReconcilerConfig::default();

        if let Ok(timeout) = std::env::var("RECONCILER_FETCH_TIMEOUT_SECS") {
            config.fetch_timeout_secs = timeout.parse().map_err(|_| {
                Error::Config(format!("RECONCILER_FETCH_TIMEOUT_SECS is not a number: {}", timeout))
            })?;
        }

        if let Ok(rate) = std::env::var("RECONCILER_FALLBACK_RATE") {
            config.fallback_conversion_rate = rate.parse().map_err(|_| {
                Error::Config(format!("RECONCILER_FALLBACK_RATE is not a decimal: {}", rate))
            })?;
        }

        if let Ok(policy) = std::env::var("RECONCILER_MATCH_POLICY") {
            config.match_policy = policy.parse()?;
        }

        if let Ok(limit) = std::env::var("RECONCILER_MAX_CONCURRENT_FETCHES") {
            config.max_concurrent_fetches = limit.parse().map_err(|_| {
                Error::Config(format!("RECONCILER_MAX_CONCURRENT_FETCHES is not a number: {}", limit))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.fetch_timeout_secs == 0 {
            return Err(Error::Config("fetch_timeout_secs must be positive".to_string()));
        }
        if self.fallback_conversion_rate <= Decimal::ZERO {
            return Err(Error::Config(
                "fallback_conversion_rate must be positive".to_string(),
            ));
        }
        if self.max_concurrent_fetches == 0 {
            return Err(Error::Config("max_concurrent_fetches must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReconcilerConfig::default();
        assert_eq!(config.fetch_timeout(), Duration::from_secs(15));
        assert_eq!(config.fallback_conversion_rate, Decimal::from(25_000));
        assert_eq!(config.match_policy, MatchPolicy::FirstMatch);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ReconcilerConfig::from_toml_str(
            r#"
            match_policy = "require_unique"
            fallback_conversion_rate = "24000"
            "#,
        )
        .unwrap();

        assert_eq!(config.match_policy, MatchPolicy::RequireUnique);
        assert_eq!(config.fallback_conversion_rate, Decimal::from(24_000));
        assert_eq!(config.fetch_timeout_secs, 15);
        assert_eq!(config.max_concurrent_fetches, 4);
    }

    #[test]
    fn test_rejects_zero_rate() {
        let result = ReconcilerConfig::from_toml_str(r#"fallback_conversion_rate = "0""#);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_match_policy_from_str() {
        assert_eq!("FIRST_MATCH".parse::<MatchPolicy>().unwrap(), MatchPolicy::FirstMatch);
        assert_eq!("unique".parse::<MatchPolicy>().unwrap(), MatchPolicy::RequireUnique);
        assert!("closest".parse::<MatchPolicy>().is_err());
    }
}

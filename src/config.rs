//! Configuration for the announce gossip subsystem.

use std::time::Duration;

/// Configuration for announce generation, regossip, and reconciliation.
///
/// All periods are in milliseconds.
#[derive(Debug, Clone)]
pub struct AnnounceConfig {
    /// Gossip tick period while in a high-frequency state.
    /// Default: 60_000 (1 minute).
    pub high_freq_gossip_ms: u64,

    /// Gossip tick period once the cadence has decayed to low frequency.
    /// Default: 600_000 (10 minutes).
    pub low_freq_gossip_ms: u64,

    /// How often to ask connected peers for their announce versions.
    /// Default: 600_000 (10 minutes).
    pub version_check_ms: u64,

    /// Minimum wall-clock gap between two regossips of the same validator's
    /// announce with unchanged enode and recipient-set hashes.
    /// Default: 60_000 (1 minute).
    pub regossip_cooldown_ms: u64,

    /// Number of high-frequency ticks to keep emitting after the first peer
    /// connects, before decaying to low frequency.
    /// Default: 10.
    pub high_freq_ticks_after_first_peer: u32,

    /// Each regossip prunes the throttle and endpoint tables with
    /// probability `1 / prune_denominator`.
    /// Default: 20.
    pub prune_denominator: u32,

    /// Whether this validator operates behind a proxy. When set, announces
    /// advertise the proxy's external endpoint instead of the local one.
    /// Default: false.
    pub proxied: bool,
}

impl Default for AnnounceConfig {
    fn default() -> Self {
        Self {
            high_freq_gossip_ms: 60_000,
            low_freq_gossip_ms: 600_000,
            version_check_ms: 600_000,
            regossip_cooldown_ms: 60_000,
            high_freq_ticks_after_first_peer: 10,
            prune_denominator: 20,
            proxied: false,
        }
    }
}

impl AnnounceConfig {
    pub fn high_freq_period(&self) -> Duration {
        Duration::from_millis(self.high_freq_gossip_ms)
    }

    pub fn low_freq_period(&self) -> Duration {
        Duration::from_millis(self.low_freq_gossip_ms)
    }

    pub fn version_check_period(&self) -> Duration {
        Duration::from_millis(self.version_check_ms)
    }

    pub fn regossip_cooldown(&self) -> Duration {
        Duration::from_millis(self.regossip_cooldown_ms)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.high_freq_gossip_ms == 0 || self.low_freq_gossip_ms == 0 {
            return Err(ConfigError::InvalidGossipPeriod);
        }
        if self.version_check_ms == 0 {
            return Err(ConfigError::InvalidVersionCheckPeriod);
        }
        if self.prune_denominator == 0 {
            return Err(ConfigError::InvalidPruneDenominator);
        }
        Ok(())
    }

    /// Config suitable for local testing: short periods and a prune gate
    /// that fires on every regossip.
    #[cfg(any(test, feature = "dev-context-only-utils"))]
    pub fn dev_default() -> Self {
        Self {
            high_freq_gossip_ms: 50,
            low_freq_gossip_ms: 500,
            version_check_ms: 500,
            regossip_cooldown_ms: 100,
            high_freq_ticks_after_first_peer: 10,
            prune_denominator: 1,
            proxied: false,
        }
    }
}

/// Errors in announce configuration.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("gossip periods must be > 0")]
    InvalidGossipPeriod,
    #[error("version_check_ms must be > 0")]
    InvalidVersionCheckPeriod,
    #[error("prune_denominator must be > 0")]
    InvalidPruneDenominator,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnnounceConfig::default();
        assert_eq!(config.high_freq_gossip_ms, 60_000);
        assert_eq!(config.low_freq_gossip_ms, 600_000);
        assert_eq!(config.version_check_ms, 600_000);
        assert_eq!(config.regossip_cooldown_ms, 60_000);
        assert_eq!(config.high_freq_ticks_after_first_peer, 10);
        assert_eq!(config.prune_denominator, 20);
        assert!(!config.proxied);
    }

    #[test]
    fn test_valid_config() {
        assert!(AnnounceConfig::default().validate().is_ok());
        assert!(AnnounceConfig::dev_default().validate().is_ok());
    }

    #[test]
    fn test_invalid_gossip_period() {
        let mut config = AnnounceConfig::default();
        config.high_freq_gossip_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidGossipPeriod)
        ));
    }

    #[test]
    fn test_invalid_prune_denominator() {
        let mut config = AnnounceConfig::default();
        config.prune_denominator = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPruneDenominator)
        ));
    }
}

//! Run configuration for a domain rank
//!
//! The tie-break policy for boundary-straddling ownership is a
//! documented policy choice rather than a hard-coded rule: the
//! reference-point rule decides the master, and exact-boundary ties are
//! resolved by [`TieBreak`]. All ranks in a run must use the same
//! configuration or classification stops being rank-agnostic.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tessel_core::RankId;

/// Tie-break rule for bodies whose reference point lies exactly on a
/// boundary shared by several regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TieBreak {
    /// The lowest rank id among the candidates wins (default)
    #[default]
    LowestRank,
    /// The highest rank id among the candidates wins
    HighestRank,
}

impl TieBreak {
    /// Pick the winning rank among the candidates.
    ///
    /// Returns `None` only for an empty candidate set.
    pub fn pick(&self, candidates: impl Iterator<Item = RankId>) -> Option<RankId> {
        match self {
            TieBreak::LowestRank => candidates.min(),
            TieBreak::HighestRank => candidates.max(),
        }
    }
}

/// Configuration shared by every rank of one run
///
/// # Example
///
/// ```
/// use tessel_domain::DomainConfig;
///
/// let config = DomainConfig::from_ron_str(
///     "(tie_break: LowestRank, ghost_margin: 0.1)",
/// ).unwrap();
/// assert_eq!(config.ghost_margin, 0.1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Boundary tie-break policy
    #[serde(default)]
    pub tie_break: TieBreak,
    /// Margin added to body extents when testing boundary residency.
    ///
    /// A positive margin creates slave replicas slightly before a body
    /// geometrically reaches a neighbor, so the replica exists by the
    /// time narrow-phase needs it. Must be finite and non-negative.
    #[serde(default)]
    pub ghost_margin: f64,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            tie_break: TieBreak::LowestRank,
            ghost_margin: 0.0,
        }
    }
}

impl DomainConfig {
    /// Parse a configuration from a RON string and validate it.
    pub fn from_ron_str(s: &str) -> Result<Self> {
        let config: DomainConfig =
            ron::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration (fatal at setup on failure).
    pub fn validate(&self) -> Result<()> {
        if !self.ghost_margin.is_finite() || self.ghost_margin < 0.0 {
            return Err(Error::Config(format!(
                "ghost_margin must be finite and non-negative, got {}",
                self.ghost_margin
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DomainConfig::default();
        assert_eq!(config.tie_break, TieBreak::LowestRank);
        assert_eq!(config.ghost_margin, 0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tie_break_pick() {
        let candidates = [RankId(3), RankId(0), RankId(7)];
        assert_eq!(
            TieBreak::LowestRank.pick(candidates.iter().copied()),
            Some(RankId(0))
        );
        assert_eq!(
            TieBreak::HighestRank.pick(candidates.iter().copied()),
            Some(RankId(7))
        );
        assert_eq!(TieBreak::LowestRank.pick(std::iter::empty()), None);
    }

    #[test]
    fn test_from_ron_str() {
        let config =
            DomainConfig::from_ron_str("(tie_break: HighestRank, ghost_margin: 0.5)").unwrap();
        assert_eq!(config.tie_break, TieBreak::HighestRank);
        assert_eq!(config.ghost_margin, 0.5);
    }

    #[test]
    fn test_ron_defaults_apply() {
        let config = DomainConfig::from_ron_str("()").unwrap();
        assert_eq!(config, DomainConfig::default());
    }

    #[test]
    fn test_negative_margin_rejected() {
        let err = DomainConfig::from_ron_str("(ghost_margin: -1.0)").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_invalid_ron_rejected() {
        let err = DomainConfig::from_ron_str("(tie_break: Sideways)").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}

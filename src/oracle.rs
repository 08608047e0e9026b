// 3.0: price oracle adapter. the engine only sees the PriceOracle trait.
// 3.1 resolve_price does the primary → backup fallback and sanity checks.
// MockOracle is the in-memory feed used by tests and the sim binary.

use crate::types::{OracleId, Price, Timestamp, BASIS_POINTS_DIVISOR};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Raw reading as the feed publishes it: integer mantissa and base 10 exponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleReading {
    pub price: i64,
    pub expo: i32,
    pub conf: u64,
    pub publish_time: Timestamp,
}

impl OracleReading {
    pub fn to_price(&self) -> Option<Price> {
        Price::from_mantissa(self.price, self.expo)
    }

    // confidence interval width relative to the price, in bps
    pub fn confidence_bps(&self) -> u64 {
        if self.price <= 0 {
            return u64::MAX;
        }
        let wide = (self.conf as u128) * (BASIS_POINTS_DIVISOR as u128) / (self.price as u128);
        u64::try_from(wide).unwrap_or(u64::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("No price published for oracle {0}")]
    Missing(OracleId),

    #[error("Oracle {0} published a non-positive price")]
    NonPositivePrice(OracleId),

    #[error("Oracle {oracle} is stale: {age_secs}s old, max {max_secs}s")]
    Stale {
        oracle: OracleId,
        age_secs: u64,
        max_secs: u64,
    },

    #[error("Oracle {oracle} confidence too wide: {conf_bps}bps, max {max_bps}bps")]
    ConfidenceTooWide {
        oracle: OracleId,
        conf_bps: u64,
        max_bps: u64,
    },
}

/// Sanity limits applied to every reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleGuard {
    /// None disables the staleness check.
    pub max_staleness_secs: Option<u64>,
    pub max_confidence_bps: u64,
}

impl Default for OracleGuard {
    fn default() -> Self {
        Self {
            max_staleness_secs: None,
            max_confidence_bps: 200, // 2%
        }
    }
}

impl OracleGuard {
    pub fn strict(max_staleness_secs: u64) -> Self {
        Self {
            max_staleness_secs: Some(max_staleness_secs),
            ..Self::default()
        }
    }

    pub fn check(
        &self,
        oracle: OracleId,
        reading: &OracleReading,
        now: Timestamp,
    ) -> Result<Price, OracleError> {
        let price = reading
            .to_price()
            .ok_or(OracleError::NonPositivePrice(oracle))?;

        if let Some(max_secs) = self.max_staleness_secs {
            let age_secs = now.secs_since(reading.publish_time);
            if age_secs > max_secs {
                return Err(OracleError::Stale {
                    oracle,
                    age_secs,
                    max_secs,
                });
            }
        }

        let conf_bps = reading.confidence_bps();
        if conf_bps > self.max_confidence_bps {
            return Err(OracleError::ConfidenceTooWide {
                oracle,
                conf_bps,
                max_bps: self.max_confidence_bps,
            });
        }

        Ok(price)
    }
}

pub trait PriceOracle {
    fn get_price(&self, oracle: &OracleId) -> Result<OracleReading, OracleError>;
}

// 3.1: primary first, backup if the primary is missing, stale or too wide.
// both failing returns the last error seen.
pub fn resolve_price<O: PriceOracle + ?Sized>(
    feed: &O,
    primary: OracleId,
    backup: Option<OracleId>,
    guard: &OracleGuard,
    now: Timestamp,
) -> Result<Price, OracleError> {
    let primary_err = match feed
        .get_price(&primary)
        .and_then(|r| guard.check(primary, &r, now))
    {
        Ok(price) => return Ok(price),
        Err(e) => e,
    };

    let Some(backup) = backup else {
        return Err(primary_err);
    };

    warn!(%primary, %backup, error = %primary_err, "primary oracle rejected, trying backup");
    feed.get_price(&backup)
        .and_then(|r| guard.check(backup, &r, now))
}

// 3.2: in-memory feed. mirrors what a test validator's mock price account offers.
#[derive(Debug, Clone, Default)]
pub struct MockOracle {
    readings: HashMap<OracleId, OracleReading>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(&mut self, oracle: OracleId, price: i64, expo: i32, conf: u64) {
        self.readings.insert(
            oracle,
            OracleReading {
                price,
                expo,
                conf,
                publish_time: Timestamp::default(),
            },
        );
    }

    pub fn set_price(&mut self, oracle: OracleId, price: i64) -> Result<(), OracleError> {
        let reading = self
            .readings
            .get_mut(&oracle)
            .ok_or(OracleError::Missing(oracle))?;
        reading.price = price;
        Ok(())
    }

    pub fn set_publish_time(&mut self, oracle: OracleId, at: Timestamp) -> Result<(), OracleError> {
        let reading = self
            .readings
            .get_mut(&oracle)
            .ok_or(OracleError::Missing(oracle))?;
        reading.publish_time = at;
        Ok(())
    }

    pub fn remove(&mut self, oracle: OracleId) {
        self.readings.remove(&oracle);
    }
}

impl PriceOracle for MockOracle {
    fn get_price(&self, oracle: &OracleId) -> Result<OracleReading, OracleError> {
        self.readings
            .get(oracle)
            .copied()
            .ok_or(OracleError::Missing(*oracle))
    }
}

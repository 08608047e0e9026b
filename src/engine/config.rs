//! Engine configuration options.

use crate::addressing::DEFAULT_PROGRAM_ID;
use crate::oracle::OracleGuard;
use crate::types::Address;
use serde::{Deserialize, Serialize};

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
    /// Staleness and confidence limits on oracle readings.
    pub oracle_guard: OracleGuard,
    /// Program id every pool address is derived under.
    pub program_id: Address,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
            oracle_guard: OracleGuard::default(),
            program_id: DEFAULT_PROGRAM_ID,
        }
    }
}

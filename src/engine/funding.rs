//! Funding rate accrual.

use super::core::{Engine, Staged};
use super::results::{EngineError, FundingResult};
use crate::funding;
use crate::ledger::TokenLedger;
use crate::oracle::PriceOracle;
use crate::types::AssetId;

impl<O: PriceOracle, L: TokenLedger> Engine<O, L> {
    /// Bring the vault's cumulative funding rate up to the current time.
    /// Every operation touching a vault does this first; keepers can call it directly.
    pub fn update_funding(&mut self, asset: AssetId) -> Result<FundingResult, EngineError> {
        let mut vault = self.staged_vault(asset)?;
        let accrual = funding::accrue(&mut vault, &self.exchange.funding, self.current_time)?;

        let mut staged = Staged::default();
        staged.vaults.push(vault);
        staged.funding.push((asset, accrual));
        self.commit(staged)?;

        Ok(FundingResult { asset, accrual })
    }

    pub fn funding_rate(&self, asset: &AssetId) -> Option<u64> {
        self.vaults.get(asset).map(|v| v.cumulative_funding_rate)
    }
}

//! Cross-asset swaps against the pool.

use super::core::{Engine, Staged};
use super::results::{EngineError, SwapResult};
use crate::events::{EventPayload, SwapEvent};
use crate::fees::swap_basis_points;
use crate::funding;
use crate::ledger::TokenLedger;
use crate::math::split_fee;
use crate::oracle::PriceOracle;
use crate::types::{Address, AssetId};
use tracing::debug;

impl<O: PriceOracle, L: TokenLedger> Engine<O, L> {
    /// Swap `amount_in` of `asset_in` for at least `min_amount_out` of `asset_out`.
    pub fn swap(
        &mut self,
        caller: Address,
        asset_in: AssetId,
        asset_out: AssetId,
        amount_in: u64,
        min_amount_out: u64,
    ) -> Result<SwapResult, EngineError> {
        if amount_in == 0 {
            return Err(EngineError::InvalidAmount);
        }
        if asset_in == asset_out {
            return Err(EngineError::SameAsset(asset_in));
        }
        let now = self.current_time;
        let mut vault_in = self.staged_vault(asset_in)?;
        let mut vault_out = self.staged_vault(asset_out)?;
        let accrual_in = funding::accrue(&mut vault_in, &self.exchange.funding, now)?;
        let accrual_out = funding::accrue(&mut vault_out, &self.exchange.funding, now)?;

        let price_in = self.price_of(&vault_in)?;
        let price_out = self.price_of(&vault_out)?;
        let aum = self.aum()?;

        let input_usd = vault_in.to_usd(amount_in, price_in)?;
        let amount_out_gross = vault_out.to_units(input_usd, price_out)?;
        let fee_bps = swap_basis_points(
            &self.exchange.fees,
            (&vault_in, self.fee_context(price_in, aum)),
            (&vault_out, self.fee_context(price_out, aum)),
            input_usd,
        )?;
        let (fee, amount_out) = split_fee(amount_out_gross, fee_bps)?;
        debug!(%asset_in, %asset_out, amount_in, amount_out_gross, fee, %fee_bps, "swap staged");

        vault_out.withdraw(amount_out_gross, fee)?;
        vault_in.check_capacity(amount_in)?;
        if amount_out < min_amount_out {
            return Err(EngineError::SlippageExceeded {
                amount_out,
                min_amount_out,
            });
        }
        if amount_out == 0 {
            return Err(EngineError::DustAmount);
        }
        vault_in.deposit(amount_in, 0)?;

        let mut staged = Staged::default();
        staged.transfer(asset_in.0, caller, vault_in.custody, amount_in);
        staged.transfer(asset_out.0, vault_out.custody, caller, amount_out);
        staged.vaults.push(vault_in);
        staged.vaults.push(vault_out);
        staged.funding.push((asset_in, accrual_in));
        staged.funding.push((asset_out, accrual_out));
        self.commit(staged)?;

        self.emit_event(EventPayload::Swap(SwapEvent {
            caller,
            asset_in,
            asset_out,
            amount_in,
            amount_out,
            fee,
            fee_bps,
        }));

        Ok(SwapResult {
            amount_out_gross,
            fee,
            fee_bps,
            amount_out,
            input_usd,
        })
    }
}

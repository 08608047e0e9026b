//! Liquidation. anyone may close a position whose losses and fees have eaten its collateral.

use super::core::{Engine, Staged};
use super::results::{EngineError, LiquidationResult};
use crate::events::{EventPayload, PositionLiquidatedEvent};
use crate::funding;
use crate::ledger::TokenLedger;
use crate::math::usd_bps;
use crate::oracle::PriceOracle;
use crate::position::{check_liquidation, PositionKey};
use crate::types::{Address, AssetId, Side, Usd};
use tracing::warn;

impl<O: PriceOracle, L: TokenLedger> Engine<O, L> {
    /// True when the position would be liquidated at the current oracle price.
    pub fn is_liquidatable(&self, key: &PositionKey) -> Result<bool, EngineError> {
        let position = self
            .positions
            .get(key)
            .ok_or(EngineError::PositionNotFound(*key))?;
        let mut vault = self.staged_vault(key.collateral_asset)?;
        funding::accrue(&mut vault, &self.exchange.funding, self.current_time)?;
        let price = self.price_of(&vault)?;

        let funding_fee = funding::funding_fee(position.size, position.entry_funding_rate, vault.cumulative_funding_rate)?;
        let margin_fee = usd_bps(position.size, self.exchange.fees.margin_fee())?;
        let check = check_liquidation(position, price, margin_fee, funding_fee, self.exchange.liquidation_fee_usd)?;
        Ok(check.liquidatable)
    }

    pub fn liquidate_position(
        &mut self,
        liquidator: Address,
        owner: Address,
        asset: AssetId,
        side: Side,
    ) -> Result<LiquidationResult, EngineError> {
        let key = PositionKey::new(owner, asset, side);
        let mut position = self
            .positions
            .get(&key)
            .cloned()
            .ok_or(EngineError::PositionNotFound(key))?;

        let mut vault = self.staged_vault(asset)?;
        let accrual = funding::accrue(&mut vault, &self.exchange.funding, self.current_time)?;
        let price = self.price_of(&vault)?;

        let funding_fee = funding::funding_fee(position.size, position.entry_funding_rate, vault.cumulative_funding_rate)?;
        let margin_fee = usd_bps(position.size, self.exchange.fees.margin_fee())?;
        let liquidation_fee = self.exchange.liquidation_fee_usd;
        let check = check_liquidation(&position, price, margin_fee, funding_fee, liquidation_fee)?;
        if !check.liquidatable {
            return Err(EngineError::NotLiquidatable(key));
        }

        // fees first, then the liquidator, the rest of the collateral stays in the pool
        let fee_usd = margin_fee.checked_add(funding_fee)?.min(check.remaining_after_loss);
        let remaining = check.remaining_after_loss.checked_sub(fee_usd)?;
        let reward_usd = liquidation_fee.min(remaining);

        let fee_units = vault.to_units(fee_usd, price)?;
        let reward_units = vault.to_units(reward_usd, price)?;
        vault.release(position.reserve_amount)?;
        if side.is_short() {
            vault.decrease_short(position.open_units)?;
        }
        vault.collect_fee(fee_units)?;
        vault.withdraw(reward_units, 0)?;
        vault.adjust_liabilities(position.liability()?, Usd::zero())?;
        // the owner loses the whole collateral
        position.realized_pnl = position.realized_pnl.checked_sub(position.collateral)?;

        let mut staged = Staged::default();
        staged.transfer(asset.0, vault.custody, liquidator, reward_units);
        staged.vaults.push(vault);
        staged.position = Some((key, None));
        staged.funding.push((asset, accrual));
        self.commit(staged)?;

        warn!(?key, %price, collateral = %position.collateral, loss = %check.loss, "position liquidated");
        self.emit_event(EventPayload::PositionLiquidated(PositionLiquidatedEvent {
            key,
            liquidator,
            price,
            seized_collateral: position.collateral,
            fees: fee_usd,
            liquidator_reward: reward_units,
            realized_pnl: position.realized_pnl,
        }));

        Ok(LiquidationResult {
            key,
            price,
            seized_collateral: position.collateral,
            loss: check.loss,
            fees_collected: fee_units,
            liquidator_reward: reward_units,
            realized_pnl: position.realized_pnl,
        })
    }
}

//! Pool share mint and burn.

use super::core::{Engine, Staged};
use super::results::{BurnResult, EngineError, MintResult};
use crate::events::{EventPayload, SharesBurnedEvent, SharesMintedEvent};
use crate::fees::{compute_basis_points, fee_basis_points_for, FeeKind};
use crate::funding;
use crate::ledger::TokenLedger;
use crate::math::split_fee;
use crate::oracle::PriceOracle;
use crate::shares::{redeem_value, shares_for_deposit};
use crate::types::{Address, AssetId, Bps};
use tracing::debug;

impl<O: PriceOracle, L: TokenLedger> Engine<O, L> {
    /// Deposit `amount` units of `asset`, receive pool shares.
    pub fn mint(&mut self, caller: Address, asset: AssetId, amount: u64) -> Result<MintResult, EngineError> {
        if amount == 0 {
            return Err(EngineError::InvalidAmount);
        }
        let now = self.current_time;
        let mut vault = self.staged_vault(asset)?;
        let accrual = funding::accrue(&mut vault, &self.exchange.funding, now)?;
        let price = self.price_of(&vault)?;
        vault.check_capacity(amount)?;

        let aum = self.aum()?;
        let deposit_usd = vault.to_usd(amount, price)?;
        let total_supply = self.supply.total_supply;

        // first deposit bootstraps 1:1 with no fee
        let (fee_bps, fee, net_amount, shares) = if total_supply == 0 {
            (Bps::ZERO, 0, amount, shares_for_deposit(deposit_usd, 0, aum)?)
        } else {
            let (base, tax) = fee_basis_points_for(&self.exchange.fees, FeeKind::MintBurn);
            let bps = compute_basis_points(&vault, self.fee_context(price, aum), deposit_usd, true, base, tax)?;
            let (fee, net) = split_fee(amount, bps)?;
            let shares = shares_for_deposit(vault.to_usd(net, price)?, total_supply, aum)?;
            (bps, fee, net, shares)
        };
        if shares == 0 {
            return Err(EngineError::DustAmount);
        }
        debug!(%asset, amount, fee, %fee_bps, shares, "mint staged");

        vault.deposit(net_amount, fee)?;
        let mut supply = self.supply.clone();
        supply.mint(caller, shares, now)?;

        let share_mint = self.share_mint();
        let mut staged = Staged::default();
        staged.transfer(asset.0, caller, vault.custody, amount);
        staged.mint_to(share_mint, caller, shares);
        staged.vaults.push(vault);
        staged.supply = Some(supply);
        staged.funding.push((asset, accrual));
        self.commit(staged)?;

        self.emit_event(EventPayload::SharesMinted(SharesMintedEvent {
            holder: caller,
            asset,
            amount_in: amount,
            fee,
            fee_bps,
            shares,
            aum,
            total_supply: self.supply.total_supply,
        }));

        Ok(MintResult {
            shares,
            fee,
            fee_bps,
            net_amount,
            aum,
            price,
        })
    }

    /// Redeem `shares` for units of `asset`.
    pub fn burn(&mut self, caller: Address, asset: AssetId, shares: u64) -> Result<BurnResult, EngineError> {
        if shares == 0 {
            return Err(EngineError::InvalidAmount);
        }
        let now = self.current_time;
        let mut vault = self.staged_vault(asset)?;

        let balance = self.share_balance(&caller);
        let total_supply = self.supply.total_supply;
        if shares > balance || shares > total_supply {
            return Err(EngineError::InsufficientShares {
                requested: shares,
                available: balance.min(total_supply),
            });
        }

        let accrual = funding::accrue(&mut vault, &self.exchange.funding, now)?;
        let price = self.price_of(&vault)?;
        let aum = self.aum()?;

        let redeem_usd = redeem_value(shares, total_supply, aum)?;
        let gross = vault.to_units(redeem_usd, price)?;
        if gross == 0 {
            return Err(EngineError::DustAmount);
        }

        let (base, tax) = fee_basis_points_for(&self.exchange.fees, FeeKind::MintBurn);
        let mut fee_bps = compute_basis_points(&vault, self.fee_context(price, aum), redeem_usd, false, base, tax)?;
        let early_withdrawal = self
            .supply
            .in_lockup(&caller, now, self.exchange.share_lockup_secs);
        if early_withdrawal {
            fee_bps = fee_bps.saturating_add(self.exchange.fees.early_withdrawal());
        }
        let (fee, payout) = split_fee(gross, fee_bps)?;
        debug!(%asset, shares, gross, fee, %fee_bps, early_withdrawal, "burn staged");

        vault.withdraw(gross, fee)?;
        let mut supply = self.supply.clone();
        supply.burn(shares)?;

        let share_mint = self.share_mint();
        let mut staged = Staged::default();
        staged.burn(share_mint, caller, shares);
        staged.transfer(asset.0, vault.custody, caller, payout);
        staged.vaults.push(vault);
        staged.supply = Some(supply);
        staged.funding.push((asset, accrual));
        self.commit(staged)?;

        self.emit_event(EventPayload::SharesBurned(SharesBurnedEvent {
            holder: caller,
            asset,
            shares,
            gross,
            fee,
            fee_bps,
            payout,
            total_supply: self.supply.total_supply,
        }));

        Ok(BurnResult {
            gross,
            fee,
            fee_bps,
            payout,
            redeem_usd,
            early_withdrawal,
        })
    }
}

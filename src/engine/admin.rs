//! Admin surface. whitelist, vault setup, fee params, fee withdrawal.
//! Config changes go through ExchangeConfig::transition and only land once validated.

use super::core::{Engine, Staged};
use super::results::EngineError;
use crate::addressing::{VaultAddresses, MAX_SEED_LEN};
use crate::config::{ConfigError, FeeParams};
use crate::events::{
    EventPayload, FeeParamsUpdatedEvent, FeesWithdrawnEvent, VaultInitializedEvent, WhitelistUpdatedEvent,
};
use crate::ledger::TokenLedger;
use crate::math::MathError;
use crate::oracle::PriceOracle;
use crate::types::{Address, AssetId, OracleId};
use crate::vault::{AssetVault, VaultParams};
use std::collections::HashSet;
use tracing::info;

impl<O: PriceOracle, L: TokenLedger> Engine<O, L> {
    /// Replace the whitelist. arrays stay index aligned and total_weights is recomputed
    /// over the vaults that remain whitelisted.
    pub fn update_asset_whitelist(
        &mut self,
        caller: Address,
        assets: Vec<AssetId>,
        oracles: Vec<OracleId>,
    ) -> Result<(), EngineError> {
        self.require_admin(&caller)?;

        let keep: HashSet<AssetId> = assets.iter().copied().collect();
        let removed: Vec<AssetId> = self
            .exchange
            .assets
            .iter()
            .filter(|a| !keep.contains(a))
            .copied()
            .collect();

        for asset in &removed {
            let vault_busy = self.vaults.get(asset).is_some_and(|v| v.in_use());
            let has_positions = self.positions.keys().any(|k| k.collateral_asset == *asset);
            if vault_busy || has_positions {
                return Err(EngineError::AssetInUse(*asset));
            }
        }

        // an initialized vault keeps its oracle
        for (asset, oracle) in assets.iter().zip(oracles.iter()) {
            if let Some(vault) = self.vaults.get(asset) {
                if vault.oracle != *oracle {
                    return Err(ConfigError::OracleMismatch {
                        expected: vault.oracle,
                        given: *oracle,
                    }
                    .into());
                }
            }
        }

        let total_weights = assets
            .iter()
            .filter_map(|a| self.vaults.get(a))
            .try_fold(0u64, |acc, v| acc.checked_add(v.weight))
            .ok_or(MathError::Overflow("total weights"))?;

        let next = self.exchange.transition(|c| {
            c.assets = assets;
            c.oracles = oracles;
            c.total_weights = total_weights;
        })?;

        for asset in &removed {
            self.vaults.remove(asset);
        }
        self.exchange = next;

        info!(
            assets = self.exchange.assets.len(),
            total_weights,
            version = self.exchange.version,
            "whitelist updated"
        );
        self.emit_event(EventPayload::WhitelistUpdated(WhitelistUpdatedEvent {
            assets: self.exchange.assets.clone(),
            oracles: self.exchange.oracles.clone(),
            total_weights,
            version: self.exchange.version,
        }));
        Ok(())
    }

    /// Open the vault for a whitelisted asset. its weight joins total_weights.
    pub fn initialize_asset_vault(&mut self, caller: Address, params: VaultParams) -> Result<(), EngineError> {
        self.require_admin(&caller)?;

        let asset = params.asset;
        let slot_oracle = self
            .exchange
            .oracle_for(&asset)
            .ok_or(EngineError::AssetNotWhitelisted(asset))?;
        if slot_oracle != params.oracle {
            return Err(ConfigError::OracleMismatch {
                expected: slot_oracle,
                given: params.oracle,
            }
            .into());
        }
        if self.vaults.contains_key(&asset) {
            return Err(EngineError::VaultAlreadyInitialized(asset));
        }
        if params.seed.is_empty() || params.seed.len() > MAX_SEED_LEN {
            return Err(ConfigError::InvalidAssetSeed(params.seed.len()).into());
        }
        if !params.decimals_supported() {
            return Err(MathError::UnsupportedDecimals(params.decimals).into());
        }

        let addrs = VaultAddresses::derive(self.config.program_id, &self.exchange.name, &params.seed)?;
        let total_weights = self
            .exchange
            .total_weights
            .checked_add(params.weight)
            .ok_or(MathError::Overflow("total weights"))?;
        let next = self.exchange.transition(|c| c.total_weights = total_weights)?;

        let vault = AssetVault::new(params, addrs.record.address, addrs.custody.address);
        let weight = vault.weight;
        self.vaults.insert(asset, vault);
        self.exchange = next;

        info!(%asset, weight, total_weights, "vault initialized");
        self.emit_event(EventPayload::VaultInitialized(VaultInitializedEvent {
            asset,
            record: addrs.record.address,
            custody: addrs.custody.address,
            weight,
            total_weights,
        }));
        Ok(())
    }

    pub fn update_fee_params(&mut self, caller: Address, fees: FeeParams) -> Result<(), EngineError> {
        self.require_admin(&caller)?;
        let next = self.exchange.transition(|c| c.fees = fees)?;
        self.exchange = next;

        info!(version = self.exchange.version, "fee params updated");
        self.emit_event(EventPayload::FeeParamsUpdated(FeeParamsUpdatedEvent {
            version: self.exchange.version,
        }));
        Ok(())
    }

    /// Pay collected fees out of a vault. never touches pool reserves.
    pub fn withdraw_fees(
        &mut self,
        caller: Address,
        asset: AssetId,
        amount: u64,
        receiver: Address,
    ) -> Result<(), EngineError> {
        self.require_admin(&caller)?;
        if amount == 0 {
            return Err(EngineError::InvalidAmount);
        }
        let mut vault = self.staged_vault(asset)?;
        vault.withdraw_fees(amount)?;
        let fee_reserves = vault.fee_reserves;

        let mut staged = Staged::default();
        staged.transfer(asset.0, vault.custody, receiver, amount);
        staged.vaults.push(vault);
        self.commit(staged)?;

        info!(%asset, amount, %receiver, "fees withdrawn");
        self.emit_event(EventPayload::FeesWithdrawn(FeesWithdrawnEvent {
            asset,
            receiver,
            amount,
            fee_reserves,
        }));
        Ok(())
    }
}

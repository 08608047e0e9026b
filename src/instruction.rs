// 12.0: instructions and their declared access sets. the runtime around the engine
// serializes instructions whose sets conflict and may run the rest side by side.

use crate::config::FeeParams;
use crate::position::PositionKey;
use crate::types::{Address, AssetId, Leverage, OracleId, Side, Usd};
use crate::vault::VaultParams;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Resource {
    Config,
    Vault(AssetId),
    ShareSupply,
    Position(PositionKey),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessSet {
    pub reads: BTreeSet<Resource>,
    pub writes: BTreeSet<Resource>,
}

impl AccessSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(mut self, resource: Resource) -> Self {
        self.reads.insert(resource);
        self
    }

    pub fn write(mut self, resource: Resource) -> Self {
        self.writes.insert(resource);
        self
    }

    pub fn touches(&self, resource: &Resource) -> bool {
        self.reads.contains(resource) || self.writes.contains(resource)
    }

    // a write on either side against any access on the other
    pub fn conflicts_with(&self, other: &AccessSet) -> bool {
        self.writes.iter().any(|r| other.touches(r)) || other.writes.iter().any(|r| self.touches(r))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Instruction {
    UpdateAssetWhitelist {
        caller: Address,
        assets: Vec<AssetId>,
        oracles: Vec<OracleId>,
    },
    InitializeAssetVault {
        caller: Address,
        params: VaultParams,
    },
    UpdateFeeParams {
        caller: Address,
        fees: FeeParams,
    },
    WithdrawFees {
        caller: Address,
        asset: AssetId,
        amount: u64,
        receiver: Address,
    },
    Mint {
        caller: Address,
        asset: AssetId,
        amount: u64,
    },
    Burn {
        caller: Address,
        asset: AssetId,
        shares: u64,
    },
    Swap {
        caller: Address,
        asset_in: AssetId,
        asset_out: AssetId,
        amount_in: u64,
        min_amount_out: u64,
    },
    UpdateFunding {
        asset: AssetId,
    },
    IncreasePosition {
        owner: Address,
        asset: AssetId,
        side: Side,
        amount: u64,
        leverage: Leverage,
    },
    DecreasePosition {
        owner: Address,
        asset: AssetId,
        side: Side,
        collateral_delta: Usd,
        size_delta: Usd,
    },
    ClosePosition {
        owner: Address,
        asset: AssetId,
        side: Side,
    },
    LiquidatePosition {
        liquidator: Address,
        owner: Address,
        asset: AssetId,
        side: Side,
    },
}

impl Instruction {
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::UpdateAssetWhitelist { .. } => "update_asset_whitelist",
            Instruction::InitializeAssetVault { .. } => "initialize_asset_vault",
            Instruction::UpdateFeeParams { .. } => "update_fee_params",
            Instruction::WithdrawFees { .. } => "withdraw_fees",
            Instruction::Mint { .. } => "mint",
            Instruction::Burn { .. } => "burn",
            Instruction::Swap { .. } => "swap",
            Instruction::UpdateFunding { .. } => "update_funding",
            Instruction::IncreasePosition { .. } => "increase_position",
            Instruction::DecreasePosition { .. } => "decrease_position",
            Instruction::ClosePosition { .. } => "close_position",
            Instruction::LiquidatePosition { .. } => "liquidate_position",
        }
    }

    // 12.1: the resources each instruction names. aum valuation of unnamed vaults is a
    // snapshot read and is not declared.
    pub fn access_set(&self) -> AccessSet {
        let base = AccessSet::new().read(Resource::Config);
        match self {
            Instruction::UpdateAssetWhitelist { assets, .. } => {
                let set = AccessSet::new().write(Resource::Config);
                assets.iter().fold(set, |s, a| s.read(Resource::Vault(*a)))
            }
            Instruction::InitializeAssetVault { params, .. } => AccessSet::new()
                .write(Resource::Config)
                .write(Resource::Vault(params.asset)),
            Instruction::UpdateFeeParams { .. } => AccessSet::new().write(Resource::Config),
            Instruction::WithdrawFees { asset, .. } => base.write(Resource::Vault(*asset)),
            Instruction::Mint { asset, .. } | Instruction::Burn { asset, .. } => base
                .write(Resource::Vault(*asset))
                .write(Resource::ShareSupply),
            Instruction::Swap {
                asset_in, asset_out, ..
            } => base
                .write(Resource::Vault(*asset_in))
                .write(Resource::Vault(*asset_out)),
            Instruction::UpdateFunding { asset } => base.write(Resource::Vault(*asset)),
            Instruction::IncreasePosition {
                owner, asset, side, ..
            }
            | Instruction::DecreasePosition {
                owner, asset, side, ..
            }
            | Instruction::ClosePosition { owner, asset, side }
            | Instruction::LiquidatePosition {
                owner, asset, side, ..
            } => base
                .write(Resource::Vault(*asset))
                .write(Resource::Position(PositionKey::new(*owner, *asset, *side))),
        }
    }
}

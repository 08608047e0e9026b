// 11.0: every committed state change produces an event. used for audit trails and
// reconciling off-engine views. the EventPayload enum lists all event types.

use crate::position::PositionKey;
use crate::types::{Address, AssetId, Bps, OracleId, Price, Timestamp, Usd};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Admin events
    ExchangeInitialized(ExchangeInitializedEvent),
    WhitelistUpdated(WhitelistUpdatedEvent),
    VaultInitialized(VaultInitializedEvent),
    FeeParamsUpdated(FeeParamsUpdatedEvent),
    FeesWithdrawn(FeesWithdrawnEvent),

    // Liquidity events
    SharesMinted(SharesMintedEvent),
    SharesBurned(SharesBurnedEvent),
    Swap(SwapEvent),

    // Funding events
    FundingUpdated(FundingUpdatedEvent),

    // Position events
    PositionIncreased(PositionIncreasedEvent),
    PositionDecreased(PositionDecreasedEvent),
    PositionClosed(PositionClosedEvent),
    PositionLiquidated(PositionLiquidatedEvent),
}

impl EventPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::ExchangeInitialized(_) => "exchange_initialized",
            EventPayload::WhitelistUpdated(_) => "whitelist_updated",
            EventPayload::VaultInitialized(_) => "vault_initialized",
            EventPayload::FeeParamsUpdated(_) => "fee_params_updated",
            EventPayload::FeesWithdrawn(_) => "fees_withdrawn",
            EventPayload::SharesMinted(_) => "shares_minted",
            EventPayload::SharesBurned(_) => "shares_burned",
            EventPayload::Swap(_) => "swap",
            EventPayload::FundingUpdated(_) => "funding_updated",
            EventPayload::PositionIncreased(_) => "position_increased",
            EventPayload::PositionDecreased(_) => "position_decreased",
            EventPayload::PositionClosed(_) => "position_closed",
            EventPayload::PositionLiquidated(_) => "position_liquidated",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeInitializedEvent {
    pub name: String,
    pub admin: Address,
    pub exchange: Address,
    pub share_mint: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhitelistUpdatedEvent {
    pub assets: Vec<AssetId>,
    pub oracles: Vec<OracleId>,
    pub total_weights: u64,
    pub version: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultInitializedEvent {
    pub asset: AssetId,
    pub record: Address,
    pub custody: Address,
    pub weight: u64,
    pub total_weights: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeParamsUpdatedEvent {
    pub version: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeesWithdrawnEvent {
    pub asset: AssetId,
    pub receiver: Address,
    pub amount: u64,
    pub fee_reserves: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharesMintedEvent {
    pub holder: Address,
    pub asset: AssetId,
    pub amount_in: u64,
    pub fee: u64,
    pub fee_bps: Bps,
    pub shares: u64,
    pub aum: Usd,
    pub total_supply: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharesBurnedEvent {
    pub holder: Address,
    pub asset: AssetId,
    pub shares: u64,
    pub gross: u64,
    pub fee: u64,
    pub fee_bps: Bps,
    pub payout: u64,
    pub total_supply: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapEvent {
    pub caller: Address,
    pub asset_in: AssetId,
    pub asset_out: AssetId,
    pub amount_in: u64,
    pub amount_out: u64,
    pub fee: u64,
    pub fee_bps: Bps,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingUpdatedEvent {
    pub asset: AssetId,
    pub intervals: u64,
    pub rate_delta: u64,
    pub cumulative_funding_rate: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionIncreasedEvent {
    pub key: PositionKey,
    pub collateral_delta: Usd,
    pub size_delta: Usd,
    pub price: Price,
    pub fee: Usd,
    pub size: Usd,
    pub collateral: Usd,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionDecreasedEvent {
    pub key: PositionKey,
    pub collateral_delta: Usd,
    pub size_delta: Usd,
    pub price: Price,
    pub fee: Usd,
    pub realized_pnl: Decimal,
    pub payout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionClosedEvent {
    pub key: PositionKey,
    pub price: Price,
    pub realized_pnl: Usd,
    pub payout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionLiquidatedEvent {
    pub key: PositionKey,
    pub liquidator: Address,
    pub price: Price,
    pub seized_collateral: Usd,
    pub fees: Usd,
    pub liquidator_reward: u64,
    pub realized_pnl: Usd,
}

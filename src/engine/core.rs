// 8.0 engine/core.rs: main engine. holds the exchange config, vaults, share supply, positions.
// operations stage changes on copies, commit() checks them against the ledger and swaps them in.

use super::config::EngineConfig;
use super::results::EngineError;
use crate::addressing::PoolAddresses;
use crate::config::{ConfigError, ExchangeConfig};
use crate::events::{Event, EventId, EventPayload, ExchangeInitializedEvent, FundingUpdatedEvent};
use crate::fees::FeeContext;
use crate::funding::FundingAccrual;
use crate::ledger::{InMemoryLedger, LedgerOp, TokenLedger};
use crate::oracle::{resolve_price, MockOracle, PriceOracle};
use crate::position::{Position, PositionKey};
use crate::shares::PoolShareSupply;
use crate::types::{Address, AssetId, Price, Timestamp, Usd};
use crate::vault::AssetVault;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/** 8.1: main engine struct. all state lives here */
#[derive(Debug)]
pub struct Engine<O: PriceOracle = MockOracle, L: TokenLedger = InMemoryLedger> {
    pub(super) config: EngineConfig,
    pub(super) exchange: ExchangeConfig,
    pub(super) addresses: PoolAddresses,
    pub(super) vaults: BTreeMap<AssetId, AssetVault>,
    pub(super) supply: PoolShareSupply,
    pub(super) positions: HashMap<PositionKey, Position>,
    pub(super) oracle: O,
    pub(super) ledger: L,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) current_time: Timestamp,
}

/// Copies of everything an operation touches, plus the token movements that go with them.
#[derive(Debug, Default)]
pub(super) struct Staged {
    pub vaults: Vec<AssetVault>,
    pub supply: Option<PoolShareSupply>,
    pub position: Option<(PositionKey, Option<Position>)>,
    pub ledger_ops: Vec<LedgerOp>,
    pub funding: Vec<(AssetId, FundingAccrual)>,
}

impl Staged {
    pub fn transfer(&mut self, mint: Address, from: Address, to: Address, amount: u64) {
        if amount > 0 {
            self.ledger_ops.push(LedgerOp::Transfer {
                mint,
                from,
                to,
                amount,
            });
        }
    }

    pub fn mint_to(&mut self, mint: Address, to: Address, amount: u64) {
        if amount > 0 {
            self.ledger_ops.push(LedgerOp::MintTo { mint, to, amount });
        }
    }

    pub fn burn(&mut self, mint: Address, from: Address, amount: u64) {
        if amount > 0 {
            self.ledger_ops.push(LedgerOp::Burn { mint, from, amount });
        }
    }
}

impl Engine<MockOracle, InMemoryLedger> {
    // in-memory collaborators, for tests and the sim
    pub fn new(config: EngineConfig, exchange: ExchangeConfig) -> Result<Self, EngineError> {
        Self::initialize(config, exchange, MockOracle::new(), InMemoryLedger::new())
    }
}

impl<O: PriceOracle, L: TokenLedger> Engine<O, L> {
    /// initializeExchangeConfig. validates, derives the pool addresses, starts with no vaults.
    pub fn initialize(config: EngineConfig, exchange: ExchangeConfig, oracle: O, ledger: L) -> Result<Self, EngineError> {
        exchange.validate()?;
        if exchange.total_weights != 0 {
            return Err(ConfigError::WeightMismatch {
                declared: exchange.total_weights,
                actual: 0,
            }
            .into());
        }
        let addresses = PoolAddresses::derive(config.program_id, &exchange.name)?;

        let mut engine = Self {
            config,
            exchange,
            addresses,
            vaults: BTreeMap::new(),
            supply: PoolShareSupply::new(),
            positions: HashMap::new(),
            oracle,
            ledger,
            events: Vec::new(),
            next_event_id: 1,
            current_time: Timestamp::default(),
        };

        info!(name = %engine.exchange.name, exchange = %engine.addresses.exchange.address, "exchange initialized");
        engine.emit_event(EventPayload::ExchangeInitialized(ExchangeInitializedEvent {
            name: engine.exchange.name.clone(),
            admin: engine.exchange.admin,
            exchange: engine.addresses.exchange.address,
            share_mint: engine.addresses.share_mint.address,
        }));
        Ok(engine)
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, secs: i64) {
        self.current_time = Timestamp::from_secs(self.current_time.as_secs().saturating_add(secs));
    }

    pub fn exchange(&self) -> &ExchangeConfig {
        &self.exchange
    }

    pub fn addresses(&self) -> &PoolAddresses {
        &self.addresses
    }

    pub fn share_mint(&self) -> Address {
        self.addresses.share_mint.address
    }

    pub fn vault(&self, asset: &AssetId) -> Option<&AssetVault> {
        self.vaults.get(asset)
    }

    pub fn vaults_iter(&self) -> impl Iterator<Item = &AssetVault> {
        self.vaults.values()
    }

    pub fn total_supply(&self) -> u64 {
        self.supply.total_supply
    }

    pub fn share_supply(&self) -> &PoolShareSupply {
        &self.supply
    }

    pub fn share_balance(&self, holder: &Address) -> u64 {
        self.ledger.balance(&self.addresses.share_mint.address, holder)
    }

    pub fn position(&self, key: &PositionKey) -> Option<&Position> {
        self.positions.get(key)
    }

    pub fn positions_iter(&self) -> impl Iterator<Item = (&PositionKey, &Position)> {
        self.positions.iter()
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    // 8.2: aggregate pool value. every initialized whitelisted vault, every oracle read.
    pub fn aum(&self) -> Result<Usd, EngineError> {
        let mut total = Usd::zero();
        for asset in &self.exchange.assets {
            let Some(vault) = self.vaults.get(asset) else {
                continue;
            };
            let price = self.price_of(vault)?;
            total = total.checked_add(vault.reserves_usd(price)?)?;
        }
        Ok(total)
    }

    pub fn price(&self, asset: &AssetId) -> Result<Price, EngineError> {
        let vault = self
            .vaults
            .get(asset)
            .ok_or(EngineError::VaultNotInitialized(*asset))?;
        self.price_of(vault)
    }

    pub(super) fn price_of(&self, vault: &AssetVault) -> Result<Price, EngineError> {
        Ok(resolve_price(
            &self.oracle,
            vault.oracle,
            vault.backup_oracle,
            &self.config.oracle_guard,
            self.current_time,
        )?)
    }

    pub(super) fn fee_context(&self, price: Price, aum: Usd) -> FeeContext {
        FeeContext {
            price,
            aum,
            total_weights: self.exchange.total_weights,
        }
    }

    pub(super) fn require_admin(&self, caller: &Address) -> Result<(), EngineError> {
        if *caller != self.exchange.admin {
            warn!(%caller, "admin instruction from non-admin");
            return Err(EngineError::Unauthorized(*caller));
        }
        Ok(())
    }

    // whitelisted and initialized. returns a copy to stage changes on
    pub(super) fn staged_vault(&self, asset: AssetId) -> Result<AssetVault, EngineError> {
        if !self.exchange.is_whitelisted(&asset) {
            return Err(EngineError::AssetNotWhitelisted(asset));
        }
        self.vaults
            .get(&asset)
            .cloned()
            .ok_or(EngineError::VaultNotInitialized(asset))
    }

    fn expected_balance(&self, ops: &[LedgerOp], mint: &Address, owner: &Address) -> i128 {
        let current = self.ledger.balance(mint, owner) as i128;
        current + ops.iter().map(|op| op.balance_delta(mint, owner)).sum::<i128>()
    }

    fn check_staged(&self, staged: &Staged) -> Result<(), EngineError> {
        for vault in &staged.vaults {
            let expected = self.expected_balance(&staged.ledger_ops, &vault.asset.0, &vault.custody);
            let actual = vault.custody_total()? as i128;
            if expected != actual {
                return Err(EngineError::InvariantViolation(format!(
                    "vault {}: reserves + fees {} but custody would hold {}",
                    vault.asset, actual, expected
                )));
            }
            if vault.reserved_amount > vault.pool_reserves {
                return Err(EngineError::InvariantViolation(format!(
                    "vault {}: reserved {} exceeds pool reserves {}",
                    vault.asset, vault.reserved_amount, vault.pool_reserves
                )));
            }
        }

        if let Some(supply) = &staged.supply {
            let mint = self.addresses.share_mint.address;
            let expected = self.ledger.supply(&mint) as i128
                + staged.ledger_ops.iter().map(|op| op.supply_delta(&mint)).sum::<i128>();
            if expected != supply.total_supply as i128 {
                return Err(EngineError::InvariantViolation(format!(
                    "share supply {} but mint would hold {}",
                    supply.total_supply, expected
                )));
            }
        }
        Ok(())
    }

    // 8.3: all or nothing. staged state is checked, the ledger batch applied, then state swapped in
    pub(super) fn commit(&mut self, staged: Staged) -> Result<(), EngineError> {
        if let Err(e) = self.check_staged(&staged) {
            warn!(error = %e, "staged state rejected");
            return Err(e);
        }
        if let Err(e) = self.ledger.apply(&staged.ledger_ops) {
            warn!(error = %e, "ledger batch rejected");
            return Err(e.into());
        }

        for vault in staged.vaults {
            self.vaults.insert(vault.asset, vault);
        }
        if let Some(supply) = staged.supply {
            self.supply = supply;
        }
        match staged.position {
            Some((key, Some(position))) => {
                self.positions.insert(key, position);
            }
            Some((key, None)) => {
                self.positions.remove(&key);
            }
            None => {}
        }

        for (asset, accrual) in staged.funding {
            if accrual.intervals > 0 {
                self.emit_event(EventPayload::FundingUpdated(FundingUpdatedEvent {
                    asset,
                    intervals: accrual.intervals,
                    rate_delta: accrual.rate_delta,
                    cumulative_funding_rate: accrual.cumulative_funding_rate,
                }));
            }
        }
        Ok(())
    }

    /// Checks every vault against custody, share supply against the mint, weights against config.
    pub fn verify_invariants(&self) -> Result<(), EngineError> {
        for vault in self.vaults.values() {
            let custody = self.ledger.balance(&vault.asset.0, &vault.custody);
            let total = vault.custody_total()?;
            if custody != total {
                return Err(EngineError::InvariantViolation(format!(
                    "vault {}: reserves + fees {} != custody {}",
                    vault.asset, total, custody
                )));
            }
            if vault.reserved_amount > vault.pool_reserves {
                return Err(EngineError::InvariantViolation(format!(
                    "vault {}: reserved {} exceeds pool reserves {}",
                    vault.asset, vault.reserved_amount, vault.pool_reserves
                )));
            }
        }

        let mint_supply = self.ledger.supply(&self.addresses.share_mint.address);
        if mint_supply != self.supply.total_supply {
            return Err(EngineError::InvariantViolation(format!(
                "share supply {} != mint supply {}",
                self.supply.total_supply, mint_supply
            )));
        }

        let weights: u64 = self
            .exchange
            .assets
            .iter()
            .filter_map(|a| self.vaults.get(a))
            .map(|v| v.weight)
            .sum();
        if weights != self.exchange.total_weights {
            return Err(EngineError::InvariantViolation(format!(
                "total weights {} != vault weights {}",
                self.exchange.total_weights, weights
            )));
        }
        Ok(())
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;

        debug!(id = event.id.0, kind = event.payload.kind(), "event");

        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }
}

//! End to end pool scenarios.
//!
//! Each test drives the engine through its public operations and checks
//! balances, reserves and positions against hand computed values.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use weighted_pool_core::*;

const ADMIN: Address = Address::repeat(1);
const LP: Address = Address::repeat(2);
const TRADER: Address = Address::repeat(3);
const KEEPER: Address = Address::repeat(4);
const USDC: AssetId = AssetId(Address::repeat(10));
const SOL: AssetId = AssetId(Address::repeat(11));
const USDC_ORACLE: OracleId = OracleId(Address::repeat(20));
const SOL_ORACLE: OracleId = OracleId(Address::repeat(21));

const START: i64 = 1_700_000_000;
const USDC_UNIT: u64 = 1_000_000;
const SOL_UNIT: u64 = 1_000_000_000;

fn vault_params(asset: AssetId) -> VaultParams {
    if asset == USDC {
        VaultParams {
            asset,
            seed: "usdc".to_string(),
            decimals: 6,
            weight: 10_000,
            min_profit_basis_points: 0,
            max_lptoken_amount: u64::MAX,
            stable: true,
            shortable: false,
            oracle: USDC_ORACLE,
            backup_oracle: None,
        }
    } else {
        VaultParams {
            asset,
            seed: "sol".to_string(),
            decimals: 9,
            weight: 10_000,
            min_profit_basis_points: 100,
            max_lptoken_amount: u64::MAX,
            stable: false,
            shortable: true,
            oracle: SOL_ORACLE,
            backup_oracle: None,
        }
    }
}

fn setup(fees: FeeParams) -> Engine {
    let exchange = ExchangeConfig::new("test-pool", ADMIN).with_fees(fees);
    let mut engine = Engine::new(EngineConfig::default(), exchange).unwrap();
    engine.set_time(Timestamp::from_secs(START));
    engine
        .update_asset_whitelist(ADMIN, vec![USDC, SOL], vec![USDC_ORACLE, SOL_ORACLE])
        .unwrap();
    engine.oracle_mut().initialize(USDC_ORACLE, 100_000_000, -8, 0);
    engine.oracle_mut().initialize(SOL_ORACLE, 15_000_000_000, -8, 0);
    engine.initialize_asset_vault(ADMIN, vault_params(USDC)).unwrap();
    engine.initialize_asset_vault(ADMIN, vault_params(SOL)).unwrap();
    engine
}

fn seeded() -> Engine {
    let mut engine = setup(FeeParams::default());
    engine.ledger_mut().credit(USDC.0, LP, 1_500_000 * USDC_UNIT).unwrap();
    engine.ledger_mut().credit(SOL.0, LP, 10_000 * SOL_UNIT).unwrap();
    engine.mint(LP, USDC, 1_500_000 * USDC_UNIT).unwrap();
    engine.mint(LP, SOL, 10_000 * SOL_UNIT).unwrap();
    engine
}

fn set_sol_price(engine: &mut Engine, dollars: i64) {
    engine.oracle_mut().set_price(SOL_ORACLE, dollars * 100_000_000).unwrap();
}

fn five_x() -> Leverage {
    Leverage::new_unchecked(dec!(5))
}

#[test]
fn reference_scenario_bootstrap_then_imbalance_fee() {
    let fees = FeeParams {
        mint_burn_basis_points: 30,
        tax_basis_points: 30,
        ..FeeParams::default()
    };
    let mut engine = setup(fees);
    engine.ledger_mut().credit(USDC.0, TRADER, 200_000).unwrap();

    let first = engine.mint(TRADER, USDC, 100_000).unwrap();
    assert_eq!(first.shares, 100_000);
    assert_eq!(first.fee, 0);
    let vault = engine.vault(&USDC).unwrap();
    assert_eq!(vault.pool_reserves, 100_000);
    assert_eq!(vault.fee_reserves, 0);

    // pool is all usdc, so the second deposit pays base + full tax
    let second = engine.mint(TRADER, USDC, 100_000).unwrap();
    assert_eq!(second.fee_bps, Bps::new(60));
    assert_eq!(second.fee, 600);
    assert_eq!(second.shares, 99_400);
    assert_eq!(engine.share_balance(&TRADER), 199_400);

    let vault = engine.vault(&USDC).unwrap();
    assert_eq!(vault.pool_reserves, 199_400);
    assert_eq!(vault.fee_reserves, 600);
    engine.verify_invariants().unwrap();
}

#[test]
fn second_deposit_under_imbalance_gets_fewer_shares() {
    let mut engine = setup(FeeParams::default());
    engine.ledger_mut().credit(USDC.0, TRADER, 2 * USDC_UNIT).unwrap();

    let first = engine.mint(TRADER, USDC, USDC_UNIT).unwrap();
    let second = engine.mint(TRADER, USDC, USDC_UNIT).unwrap();
    assert!(second.shares < first.shares);
    assert!(second.fee > 0);
}

#[test]
fn swap_moves_reserves_exactly() {
    let mut engine = seeded();
    engine.ledger_mut().credit(USDC.0, TRADER, 15_000 * USDC_UNIT).unwrap();

    let usdc_before = engine.vault(&USDC).unwrap().clone();
    let sol_before = engine.vault(&SOL).unwrap().clone();

    let amount_in = 15_000 * USDC_UNIT;
    let result = engine.swap(TRADER, USDC, SOL, amount_in, 0).unwrap();

    let usdc_after = engine.vault(&USDC).unwrap();
    let sol_after = engine.vault(&SOL).unwrap();
    assert_eq!(usdc_after.pool_reserves, usdc_before.pool_reserves + amount_in);
    assert_eq!(sol_after.pool_reserves, sol_before.pool_reserves - result.amount_out_gross);
    assert_eq!(
        sol_before.custody_total().unwrap() - sol_after.custody_total().unwrap(),
        result.amount_out
    );
    assert_eq!(result.fee + result.amount_out, result.amount_out_gross);
    // $15000 at $150
    assert_eq!(result.amount_out_gross, 100 * SOL_UNIT);
    assert_eq!(engine.ledger().balance(&SOL.0, &TRADER), result.amount_out);
    engine.verify_invariants().unwrap();
}

#[test]
fn swap_rejects_slippage_and_same_asset() {
    let mut engine = seeded();
    engine.ledger_mut().credit(USDC.0, TRADER, 1_000 * USDC_UNIT).unwrap();

    let err = engine.swap(TRADER, USDC, SOL, 1_000 * USDC_UNIT, 10 * SOL_UNIT).unwrap_err();
    assert!(matches!(err, EngineError::SlippageExceeded { .. }));
    assert_eq!(engine.ledger().balance(&USDC.0, &TRADER), 1_000 * USDC_UNIT);

    let err = engine.swap(TRADER, USDC, USDC, 1_000 * USDC_UNIT, 0).unwrap_err();
    assert_eq!(err, EngineError::SameAsset(USDC));
}

#[test]
fn mint_then_burn_returns_no_more_than_deposit() {
    let mut engine = seeded();
    let deposit = 10_000 * USDC_UNIT;
    engine.ledger_mut().credit(USDC.0, TRADER, deposit).unwrap();

    let minted = engine.mint(TRADER, USDC, deposit).unwrap();
    let burned = engine.burn(TRADER, USDC, minted.shares).unwrap();
    assert!(burned.early_withdrawal);
    assert!(burned.payout <= deposit);
    assert_eq!(engine.ledger().balance(&USDC.0, &TRADER), burned.payout);
    assert_eq!(engine.share_balance(&TRADER), 0);
    engine.verify_invariants().unwrap();
}

#[test]
fn early_withdrawal_penalty_expires_after_lockup() {
    let mut engine = seeded();
    engine.ledger_mut().credit(USDC.0, TRADER, 2_000 * USDC_UNIT).unwrap();
    let minted = engine.mint(TRADER, USDC, 2_000 * USDC_UNIT).unwrap();

    let early = engine.burn(TRADER, USDC, minted.shares / 2).unwrap();
    assert!(early.early_withdrawal);

    engine.advance_time(engine.exchange().share_lockup_secs as i64);
    let late = engine.burn(TRADER, USDC, minted.shares / 2).unwrap();
    assert!(!late.early_withdrawal);
    assert!(late.fee_bps < early.fee_bps);
}

#[test]
fn burn_more_than_held_fails() {
    let mut engine = seeded();
    let err = engine.burn(TRADER, USDC, 1).unwrap_err();
    assert_eq!(
        err,
        EngineError::InsufficientShares {
            requested: 1,
            available: 0
        }
    );
}

#[test]
fn long_takes_profit_after_min_time() {
    let mut engine = seeded();
    engine.ledger_mut().credit(SOL.0, TRADER, SOL_UNIT).unwrap();

    let opened = engine.increase_position(TRADER, SOL, Side::Long, SOL_UNIT, five_x()).unwrap();
    assert_eq!(opened.size.value(), dec!(750));
    // 1 bps margin fee on $750
    assert_eq!(opened.collateral.value(), dec!(149.925));
    let key = PositionKey::new(TRADER, SOL, Side::Long);
    assert_eq!(engine.position(&key).unwrap().reserve_amount, SOL_UNIT);
    assert_eq!(engine.vault(&SOL).unwrap().reserved_amount, SOL_UNIT);

    engine.advance_time(3_600);
    set_sol_price(&mut engine, 180);
    let closed = engine.close_position(TRADER, SOL, Side::Long).unwrap();

    assert!(closed.closed);
    assert_eq!(closed.realized_pnl, dec!(150));
    assert!(closed.payout > SOL_UNIT);
    assert!(engine.position(&key).is_none());
    assert_eq!(engine.vault(&SOL).unwrap().reserved_amount, 0);
    assert_eq!(engine.ledger().balance(&SOL.0, &TRADER), closed.payout);
    engine.verify_invariants().unwrap();
}

#[test]
fn profit_inside_min_profit_time_is_floored() {
    let mut engine = seeded();
    engine.ledger_mut().credit(SOL.0, TRADER, SOL_UNIT).unwrap();
    engine.increase_position(TRADER, SOL, Side::Long, SOL_UNIT, five_x()).unwrap();

    engine.advance_time(10);
    set_sol_price(&mut engine, 180);
    let closed = engine.close_position(TRADER, SOL, Side::Long).unwrap();
    assert_eq!(closed.realized_pnl, Decimal::ZERO);
}

#[test]
fn loss_comes_out_of_collateral() {
    let mut engine = seeded();
    engine.ledger_mut().credit(SOL.0, TRADER, SOL_UNIT).unwrap();
    engine.increase_position(TRADER, SOL, Side::Long, SOL_UNIT, five_x()).unwrap();

    engine.advance_time(3_600);
    set_sol_price(&mut engine, 140);
    let closed = engine.close_position(TRADER, SOL, Side::Long).unwrap();
    assert_eq!(closed.realized_pnl, dec!(-50));
    // $99.85 left after loss and both margin fees, paid at $140
    assert!(closed.payout < SOL_UNIT);
    engine.verify_invariants().unwrap();
}

#[test]
fn partial_decrease_releases_reserve_pro_rata() {
    let mut engine = seeded();
    engine.ledger_mut().credit(SOL.0, TRADER, 2 * SOL_UNIT).unwrap();
    engine.increase_position(TRADER, SOL, Side::Long, 2 * SOL_UNIT, five_x()).unwrap();

    let result = engine
        .decrease_position(TRADER, SOL, Side::Long, Usd::zero(), Usd::new(dec!(750)))
        .unwrap();
    assert!(!result.closed);
    assert_eq!(result.size.value(), dec!(750));

    let key = PositionKey::new(TRADER, SOL, Side::Long);
    assert_eq!(engine.position(&key).unwrap().reserve_amount, SOL_UNIT);
    assert_eq!(engine.vault(&SOL).unwrap().reserved_amount, SOL_UNIT);
    engine.verify_invariants().unwrap();
}

#[test]
fn short_tracks_global_short_size() {
    let mut engine = seeded();
    engine.ledger_mut().credit(SOL.0, TRADER, SOL_UNIT).unwrap();
    engine.increase_position(TRADER, SOL, Side::Short, SOL_UNIT, five_x()).unwrap();
    assert_eq!(engine.vault(&SOL).unwrap().global_short_size, 5 * SOL_UNIT);

    engine.advance_time(3_600);
    engine.close_position(TRADER, SOL, Side::Short).unwrap();
    assert_eq!(engine.vault(&SOL).unwrap().global_short_size, 0);
    engine.verify_invariants().unwrap();
}

fn open_sol_short(engine: &mut Engine, amount: u64) -> PositionKey {
    engine.ledger_mut().credit(SOL.0, TRADER, amount).unwrap();
    engine
        .increase_position(TRADER, SOL, Side::Short, amount, Leverage::new_unchecked(dec!(3)))
        .unwrap();
    PositionKey::new(TRADER, SOL, Side::Short)
}

fn expected_funding(size: Usd, entry: u64, cumulative: u64) -> Decimal {
    size.value() * Decimal::from(cumulative - entry) / Decimal::from(FUNDING_RATE_PRECISION)
}

#[test]
fn close_charges_funding_accrued_since_entry() {
    let mut engine = seeded();
    let key = open_sol_short(&mut engine, 1_000 * SOL_UNIT);
    let position = engine.position(&key).unwrap().clone();
    assert_eq!(position.size.value(), dec!(450000));

    engine.advance_time(10 * 3_600);
    let fee_reserves_before = engine.vault(&SOL).unwrap().fee_reserves;
    let closed = engine.close_position(TRADER, SOL, Side::Short).unwrap();

    let cumulative = engine.funding_rate(&SOL).unwrap();
    assert!(cumulative > position.entry_funding_rate);
    let margin_fee = math::usd_bps(position.size, engine.exchange().fees.margin_fee()).unwrap();
    let funding = expected_funding(position.size, position.entry_funding_rate, cumulative);
    assert!(funding > Decimal::ZERO);
    assert_eq!(closed.fee.value(), margin_fee.value() + funding);

    let vault = engine.vault(&SOL).unwrap();
    let fee_units = vault.to_units(closed.fee, closed.price).unwrap();
    assert_eq!(vault.fee_reserves - fee_reserves_before, fee_units);
    engine.verify_invariants().unwrap();
}

#[test]
fn increase_charges_funding_on_existing_size() {
    let mut engine = seeded();
    let key = open_sol_short(&mut engine, 1_000 * SOL_UNIT);
    let before = engine.position(&key).unwrap().clone();

    engine.advance_time(10 * 3_600);
    let fee_reserves_before = engine.vault(&SOL).unwrap().fee_reserves;
    engine.ledger_mut().credit(SOL.0, TRADER, SOL_UNIT).unwrap();
    let result = engine
        .increase_position(TRADER, SOL, Side::Short, SOL_UNIT, Leverage::new_unchecked(dec!(3)))
        .unwrap();

    let cumulative = engine.funding_rate(&SOL).unwrap();
    let size_delta = Usd::new(dec!(450));
    let margin_fee = math::usd_bps(size_delta, engine.exchange().fees.margin_fee()).unwrap();
    let funding = expected_funding(before.size, before.entry_funding_rate, cumulative);
    assert!(funding > Decimal::ZERO);
    assert_eq!(result.fee.value(), margin_fee.value() + funding);

    let after = engine.position(&key).unwrap();
    assert_eq!(after.entry_funding_rate, cumulative);
    let vault = engine.vault(&SOL).unwrap();
    let fee_units = vault.to_units(result.fee, result.price).unwrap();
    assert_eq!(vault.fee_reserves - fee_reserves_before, fee_units);
    engine.verify_invariants().unwrap();
}

#[test]
fn funding_accrues_when_clock_starts_at_zero() {
    let exchange = ExchangeConfig::new("test-pool", ADMIN);
    let mut engine = Engine::new(EngineConfig::default(), exchange).unwrap();
    engine
        .update_asset_whitelist(ADMIN, vec![USDC, SOL], vec![USDC_ORACLE, SOL_ORACLE])
        .unwrap();
    engine.oracle_mut().initialize(USDC_ORACLE, 100_000_000, -8, 0);
    engine.oracle_mut().initialize(SOL_ORACLE, 15_000_000_000, -8, 0);
    engine.initialize_asset_vault(ADMIN, vault_params(USDC)).unwrap();
    engine.initialize_asset_vault(ADMIN, vault_params(SOL)).unwrap();
    engine.ledger_mut().credit(SOL.0, LP, 100 * SOL_UNIT).unwrap();
    engine.mint(LP, SOL, 100 * SOL_UNIT).unwrap();
    assert_eq!(engine.time(), Timestamp::from_secs(0));

    engine.ledger_mut().credit(SOL.0, TRADER, 10 * SOL_UNIT).unwrap();
    engine.increase_position(TRADER, SOL, Side::Short, 10 * SOL_UNIT, five_x()).unwrap();
    assert_eq!(engine.vault(&SOL).unwrap().global_short_size, 50 * SOL_UNIT);

    engine.advance_time(7_200);
    let result = engine.update_funding(SOL).unwrap();
    assert_eq!(result.accrual.intervals, 2);
    assert!(result.accrual.rate_delta > 0);
    assert_eq!(engine.vault(&SOL).unwrap().last_funding_time, Some(7_200));
}

#[test]
fn advance_time_saturates() {
    let mut engine = seeded();
    engine.advance_time(i64::MAX);
    assert_eq!(engine.time(), Timestamp::from_secs(i64::MAX));
    engine.advance_time(1);
    assert_eq!(engine.time(), Timestamp::from_secs(i64::MAX));
}

#[test]
fn position_side_and_leverage_rules() {
    let mut engine = seeded();
    engine.ledger_mut().credit(USDC.0, TRADER, 1_000 * USDC_UNIT).unwrap();
    engine.ledger_mut().credit(SOL.0, TRADER, SOL_UNIT).unwrap();

    let err = engine
        .increase_position(TRADER, USDC, Side::Long, 1_000 * USDC_UNIT, five_x())
        .unwrap_err();
    assert!(matches!(err, EngineError::UnsupportedSide { .. }));
    let err = engine
        .increase_position(TRADER, USDC, Side::Short, 1_000 * USDC_UNIT, five_x())
        .unwrap_err();
    assert!(matches!(err, EngineError::UnsupportedSide { .. }));

    let err = engine
        .increase_position(TRADER, SOL, Side::Long, SOL_UNIT, Leverage::new_unchecked(dec!(60)))
        .unwrap_err();
    assert_eq!(err, EngineError::InvalidLeverage(dec!(60)));

    // $30 of collateral is under the $40 liquidation fee
    let err = engine
        .increase_position(TRADER, SOL, Side::Long, SOL_UNIT / 5, five_x())
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientCollateral { .. }));
}

#[test]
fn liquidation_pays_keeper_and_removes_position() {
    let mut engine = seeded();
    engine.ledger_mut().credit(SOL.0, TRADER, SOL_UNIT).unwrap();
    engine
        .increase_position(TRADER, SOL, Side::Long, SOL_UNIT, Leverage::new_unchecked(dec!(10)))
        .unwrap();
    let key = PositionKey::new(TRADER, SOL, Side::Long);

    set_sol_price(&mut engine, 149);
    assert!(!engine.is_liquidatable(&key).unwrap());
    let err = engine.liquidate_position(KEEPER, TRADER, SOL, Side::Long).unwrap_err();
    assert_eq!(err, EngineError::NotLiquidatable(key));

    // $130 loss + $40.15 fees against $149.85 collateral
    set_sol_price(&mut engine, 137);
    assert!(engine.is_liquidatable(&key).unwrap());
    let result = engine.liquidate_position(KEEPER, TRADER, SOL, Side::Long).unwrap();

    assert_eq!(result.loss.value(), dec!(130));
    assert_eq!(result.seized_collateral.value(), dec!(149.85));
    assert_eq!(result.realized_pnl.value(), dec!(-149.85));
    assert!(result.liquidator_reward > 0);
    match &engine.events().last().unwrap().payload {
        EventPayload::PositionLiquidated(event) => assert_eq!(event.realized_pnl, result.realized_pnl),
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(engine.ledger().balance(&SOL.0, &KEEPER), result.liquidator_reward);
    assert!(engine.position(&key).is_none());
    assert_eq!(engine.vault(&SOL).unwrap().reserved_amount, 0);
    engine.verify_invariants().unwrap();
}

#[test]
fn admin_withdraws_collected_fees() {
    let mut engine = seeded();
    engine.ledger_mut().credit(USDC.0, TRADER, 15_000 * USDC_UNIT).unwrap();
    engine.swap(TRADER, USDC, SOL, 15_000 * USDC_UNIT, 0).unwrap();

    let fees = engine.vault(&SOL).unwrap().fee_reserves;
    assert!(fees > 0);
    let treasury = Address::repeat(9);

    let err = engine.withdraw_fees(TRADER, SOL, fees, treasury).unwrap_err();
    assert_eq!(err, EngineError::Unauthorized(TRADER));

    engine.withdraw_fees(ADMIN, SOL, fees, treasury).unwrap();
    assert_eq!(engine.vault(&SOL).unwrap().fee_reserves, 0);
    assert_eq!(engine.ledger().balance(&SOL.0, &treasury), fees);
    engine.verify_invariants().unwrap();
}

#[test]
fn execute_dispatches_instructions() {
    let mut engine = seeded();
    engine.ledger_mut().credit(USDC.0, TRADER, 1_000 * USDC_UNIT).unwrap();

    let outcome = engine
        .execute(Instruction::Mint {
            caller: TRADER,
            asset: USDC,
            amount: 1_000 * USDC_UNIT,
        })
        .unwrap();
    let Outcome::Minted(result) = outcome else {
        panic!("expected a mint outcome");
    };
    assert_eq!(engine.share_balance(&TRADER), result.shares);

    let err = engine
        .execute(Instruction::UpdateFunding {
            asset: AssetId(Address::repeat(99)),
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

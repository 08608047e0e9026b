//! Weighted Pool Simulation.
//!
//! Walks a two asset pool through share minting, swaps, funding,
//! leveraged positions and a liquidation.

use rust_decimal_macros::dec;
use weighted_pool_core::*;

const ADMIN: Address = Address::repeat(1);
const USDC: AssetId = AssetId(Address::repeat(10));
const SOL: AssetId = AssetId(Address::repeat(11));
const USDC_ORACLE: OracleId = OracleId(Address::repeat(20));
const SOL_ORACLE: OracleId = OracleId(Address::repeat(21));

const START: i64 = 1_700_000_000;
const USDC_UNIT: u64 = 1_000_000;
const SOL_UNIT: u64 = 1_000_000_000;

fn main() -> Result<(), EngineError> {
    println!("Weighted Pool Engine Simulation");
    println!("Two Assets, One Pool, Full Lifecycle\n");

    scenario_1_bootstrap_and_imbalance()?;
    scenario_2_swaps()?;
    scenario_3_position_lifecycle()?;
    scenario_4_liquidation()?;
    scenario_5_funding()?;

    println!("\nAll simulations completed successfully.");
    Ok(())
}

fn usdc_params() -> VaultParams {
    VaultParams {
        asset: USDC,
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
}

fn sol_params() -> VaultParams {
    VaultParams {
        asset: SOL,
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

fn setup(fees: FeeParams) -> Result<Engine, EngineError> {
    let mut engine = Engine::new(EngineConfig::default(), ExchangeConfig::new("main-pool", ADMIN).with_fees(fees))?;
    engine.set_time(Timestamp::from_secs(START));
    engine.update_asset_whitelist(ADMIN, vec![USDC, SOL], vec![USDC_ORACLE, SOL_ORACLE])?;
    engine.oracle_mut().initialize(USDC_ORACLE, 100_000_000, -8, 0);
    engine.oracle_mut().initialize(SOL_ORACLE, 15_000_000_000, -8, 0);
    engine.initialize_asset_vault(ADMIN, usdc_params())?;
    engine.initialize_asset_vault(ADMIN, sol_params())?;
    Ok(engine)
}

fn fund(engine: &mut Engine, owner: Address, asset: AssetId, amount: u64) -> Result<(), EngineError> {
    engine.ledger_mut().credit(asset.0, owner, amount)?;
    Ok(())
}

fn seed_liquidity(engine: &mut Engine, lp: Address) -> Result<(), EngineError> {
    fund(engine, lp, USDC, 1_500_000 * USDC_UNIT)?;
    fund(engine, lp, SOL, 10_000 * SOL_UNIT)?;
    engine.mint(lp, USDC, 1_500_000 * USDC_UNIT)?;
    engine.mint(lp, SOL, 10_000 * SOL_UNIT)?;
    Ok(())
}

/// First deposit bootstraps 1:1, a second one into a skewed pool pays the imbalance fee.
fn scenario_1_bootstrap_and_imbalance() -> Result<(), EngineError> {
    println!("Scenario 1: Bootstrap and Imbalance Fee\n");

    let fees = FeeParams {
        mint_burn_basis_points: 30,
        tax_basis_points: 30,
        ..FeeParams::default()
    };
    let mut engine = setup(fees)?;
    let alice = Address::repeat(2);
    fund(&mut engine, alice, USDC, 200_000)?;

    let first = engine.mint(alice, USDC, 100_000)?;
    println!("  Alice deposits 100000 units of USDC into the empty pool");
    println!("  Shares: {}, fee: {}", first.shares, first.fee);

    let second = engine.mint(alice, USDC, 100_000)?;
    println!("  Alice deposits another 100000 units, pool already all USDC");
    println!("  Fee: {} units ({}), shares: {}", second.fee, second.fee_bps, second.shares);
    println!("  Alice holds {} shares\n", engine.share_balance(&alice));

    engine.verify_invariants()?;
    Ok(())
}

/// Swaps in both directions against a balanced pool.
fn scenario_2_swaps() -> Result<(), EngineError> {
    println!("Scenario 2: Swaps\n");

    let mut engine = setup(FeeParams::default())?;
    let lp = Address::repeat(2);
    let trader = Address::repeat(3);
    seed_liquidity(&mut engine, lp)?;
    println!("  LP seeds $1.5M USDC and 10000 SOL @ $150, aum ${}", engine.aum()?);

    fund(&mut engine, trader, USDC, 15_000 * USDC_UNIT)?;
    let buy = engine.swap(trader, USDC, SOL, 15_000 * USDC_UNIT, 0)?;
    println!(
        "  Trader swaps $15000 USDC for {} SOL units (fee {} units, {})",
        buy.amount_out, buy.fee, buy.fee_bps
    );

    let sell = engine.swap(trader, SOL, USDC, buy.amount_out, 0)?;
    println!(
        "  Trader swaps back for {} USDC units (fee {} units, {})",
        sell.amount_out, sell.fee, sell.fee_bps
    );

    for vault in engine.vaults_iter() {
        println!(
            "  {}: pool {}, fees {}",
            vault.seed, vault.pool_reserves, vault.fee_reserves
        );
    }
    println!();

    engine.verify_invariants()?;
    Ok(())
}

/// Open a long, let the price run, take profit.
fn scenario_3_position_lifecycle() -> Result<(), EngineError> {
    println!("Scenario 3: Position Lifecycle\n");

    let mut engine = setup(FeeParams::default())?;
    let lp = Address::repeat(2);
    let bob = Address::repeat(4);
    seed_liquidity(&mut engine, lp)?;
    fund(&mut engine, bob, SOL, 2 * SOL_UNIT)?;

    let opened = engine.increase_position(bob, SOL, Side::Long, SOL_UNIT, Leverage::new_unchecked(dec!(5)))?;
    println!("  Bob posts 1 SOL, 5x long: size ${}, collateral ${}", opened.size, opened.collateral);

    engine.advance_time(3_600);
    engine.oracle_mut().set_price(SOL_ORACLE, 18_000_000_000)?;
    println!("  SOL moves to $180");

    let closed = engine.close_position(bob, SOL, Side::Long)?;
    println!(
        "  Bob closes: realized ${}, payout {} SOL units\n",
        closed.realized_pnl, closed.payout
    );

    engine.verify_invariants()?;
    Ok(())
}

/// A 10x long through a 9% drop is closed by a keeper.
fn scenario_4_liquidation() -> Result<(), EngineError> {
    println!("Scenario 4: Liquidation\n");

    let mut engine = setup(FeeParams::default())?;
    let lp = Address::repeat(2);
    let carol = Address::repeat(5);
    let keeper = Address::repeat(6);
    seed_liquidity(&mut engine, lp)?;
    fund(&mut engine, carol, SOL, SOL_UNIT)?;

    let opened = engine.increase_position(carol, SOL, Side::Long, SOL_UNIT, Leverage::new_unchecked(dec!(10)))?;
    println!("  Carol posts 1 SOL, 10x long: size ${}", opened.size);

    engine.oracle_mut().set_price(SOL_ORACLE, 13_700_000_000)?;
    let key = PositionKey::new(carol, SOL, Side::Long);
    println!("  SOL drops to $137, liquidatable: {}", engine.is_liquidatable(&key)?);

    let result = engine.liquidate_position(keeper, carol, SOL, Side::Long)?;
    println!(
        "  Keeper liquidates: loss ${}, fees {} units, reward {} units\n",
        result.loss, result.fees_collected, result.liquidator_reward
    );

    engine.verify_invariants()?;
    Ok(())
}

/// Shorts drive the funding rate. a day of accrual.
fn scenario_5_funding() -> Result<(), EngineError> {
    println!("Scenario 5: Funding\n");

    let mut engine = setup(FeeParams::default())?;
    let lp = Address::repeat(2);
    let dave = Address::repeat(7);
    seed_liquidity(&mut engine, lp)?;
    fund(&mut engine, dave, SOL, 1_000 * SOL_UNIT)?;

    engine.increase_position(dave, SOL, Side::Short, 1_000 * SOL_UNIT, Leverage::new_unchecked(dec!(3)))?;
    let utilization = engine.vault(&SOL).map(funding::utilization).transpose()?;
    println!("  Dave shorts $450000 of SOL, utilization {:?}", utilization);

    for _ in 0..24 {
        engine.advance_time(3_600);
        engine.update_funding(SOL)?;
    }
    println!("  After 24h cumulative rate: {:?}", engine.funding_rate(&SOL));
    println!("  Events recorded: {}", engine.events().len());

    engine.verify_invariants()?;
    Ok(())
}

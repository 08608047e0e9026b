// 13.0: token transfer collaborator. the engine never edits balances directly,
// it hands a batch of LedgerOps to a TokenLedger which applies all or none.
// token accounts are keyed by (mint, owner).

use crate::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerOp {
    Transfer {
        mint: Address,
        from: Address,
        to: Address,
        amount: u64,
    },
    MintTo {
        mint: Address,
        to: Address,
        amount: u64,
    },
    Burn {
        mint: Address,
        from: Address,
        amount: u64,
    },
}

impl LedgerOp {
    // signed balance change this op causes on (mint, owner)
    pub fn balance_delta(&self, mint: &Address, owner: &Address) -> i128 {
        match self {
            LedgerOp::Transfer {
                mint: m,
                from,
                to,
                amount,
            } if m == mint => {
                let mut delta = 0i128;
                if to == owner {
                    delta += *amount as i128;
                }
                if from == owner {
                    delta -= *amount as i128;
                }
                delta
            }
            LedgerOp::MintTo { mint: m, to, amount } if m == mint && to == owner => *amount as i128,
            LedgerOp::Burn {
                mint: m,
                from,
                amount,
            } if m == mint && from == owner => -(*amount as i128),
            _ => 0,
        }
    }

    pub fn supply_delta(&self, mint: &Address) -> i128 {
        match self {
            LedgerOp::MintTo { mint: m, amount, .. } if m == mint => *amount as i128,
            LedgerOp::Burn { mint: m, amount, .. } if m == mint => -(*amount as i128),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Insufficient balance for {owner} on mint {mint}: need {needed}, have {available}")]
    InsufficientBalance {
        mint: Address,
        owner: Address,
        needed: u64,
        available: u64,
    },

    #[error("Balance overflow for {owner} on mint {mint}")]
    Overflow { mint: Address, owner: Address },

    #[error("Supply overflow on mint {0}")]
    SupplyOverflow(Address),
}

pub trait TokenLedger {
    /// Applies every op or none of them.
    fn apply(&mut self, ops: &[LedgerOp]) -> Result<(), LedgerError>;

    fn balance(&self, mint: &Address, owner: &Address) -> u64;

    fn supply(&self, mint: &Address) -> u64;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    balances: HashMap<(Address, Address), u64>,
    supplies: HashMap<Address, u64>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // test faucet. creates tokens out of thin air and bumps supply to match
    pub fn credit(&mut self, mint: Address, owner: Address, amount: u64) -> Result<(), LedgerError> {
        self.apply(&[LedgerOp::MintTo {
            mint,
            to: owner,
            amount,
        }])
    }

    fn debit_in(
        balances: &mut HashMap<(Address, Address), u64>,
        mint: Address,
        owner: Address,
        amount: u64,
    ) -> Result<(), LedgerError> {
        let entry = balances.entry((mint, owner)).or_insert(0);
        *entry = entry
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                mint,
                owner,
                needed: amount,
                available: *entry,
            })?;
        Ok(())
    }

    fn credit_in(
        balances: &mut HashMap<(Address, Address), u64>,
        mint: Address,
        owner: Address,
        amount: u64,
    ) -> Result<(), LedgerError> {
        let entry = balances.entry((mint, owner)).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or(LedgerError::Overflow { mint, owner })?;
        Ok(())
    }
}

impl TokenLedger for InMemoryLedger {
    fn apply(&mut self, ops: &[LedgerOp]) -> Result<(), LedgerError> {
        // work on scratch copies so a failing op leaves nothing behind
        let mut balances = self.balances.clone();
        let mut supplies = self.supplies.clone();

        for op in ops {
            match *op {
                LedgerOp::Transfer {
                    mint,
                    from,
                    to,
                    amount,
                } => {
                    Self::debit_in(&mut balances, mint, from, amount)?;
                    Self::credit_in(&mut balances, mint, to, amount)?;
                }
                LedgerOp::MintTo { mint, to, amount } => {
                    let supply = supplies.entry(mint).or_insert(0);
                    *supply = supply
                        .checked_add(amount)
                        .ok_or(LedgerError::SupplyOverflow(mint))?;
                    Self::credit_in(&mut balances, mint, to, amount)?;
                }
                LedgerOp::Burn { mint, from, amount } => {
                    Self::debit_in(&mut balances, mint, from, amount)?;
                    let supply = supplies.entry(mint).or_insert(0);
                    *supply = supply
                        .checked_sub(amount)
                        .ok_or(LedgerError::SupplyOverflow(mint))?;
                }
            }
        }

        self.balances = balances;
        self.supplies = supplies;
        Ok(())
    }

    fn balance(&self, mint: &Address, owner: &Address) -> u64 {
        self.balances.get(&(*mint, *owner)).copied().unwrap_or(0)
    }

    fn supply(&self, mint: &Address) -> u64 {
        self.supplies.get(mint).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINT: Address = Address::repeat(7);
    const ALICE: Address = Address::repeat(1);
    const BOB: Address = Address::repeat(2);

    #[test]
    fn transfer_moves_balance() {
        let mut ledger = InMemoryLedger::new();
        ledger.credit(MINT, ALICE, 1_000).unwrap();

        ledger
            .apply(&[LedgerOp::Transfer {
                mint: MINT,
                from: ALICE,
                to: BOB,
                amount: 400,
            }])
            .unwrap();

        assert_eq!(ledger.balance(&MINT, &ALICE), 600);
        assert_eq!(ledger.balance(&MINT, &BOB), 400);
        assert_eq!(ledger.supply(&MINT), 1_000);
    }

    #[test]
    fn failed_batch_changes_nothing() {
        let mut ledger = InMemoryLedger::new();
        ledger.credit(MINT, ALICE, 100).unwrap();

        let result = ledger.apply(&[
            LedgerOp::MintTo {
                mint: MINT,
                to: BOB,
                amount: 50,
            },
            LedgerOp::Transfer {
                mint: MINT,
                from: ALICE,
                to: BOB,
                amount: 500,
            },
        ]);

        assert!(matches!(result, Err(LedgerError::InsufficientBalance { needed: 500, available: 100, .. })));
        assert_eq!(ledger.balance(&MINT, &BOB), 0);
        assert_eq!(ledger.supply(&MINT), 100);
    }

    #[test]
    fn burn_reduces_supply() {
        let mut ledger = InMemoryLedger::new();
        ledger.credit(MINT, ALICE, 100).unwrap();
        ledger
            .apply(&[LedgerOp::Burn {
                mint: MINT,
                from: ALICE,
                amount: 30,
            }])
            .unwrap();
        assert_eq!(ledger.supply(&MINT), 70);
        assert_eq!(ledger.balance(&MINT, &ALICE), 70);
    }

    #[test]
    fn deltas_track_owner_and_mint() {
        let op = LedgerOp::Transfer {
            mint: MINT,
            from: ALICE,
            to: BOB,
            amount: 10,
        };
        assert_eq!(op.balance_delta(&MINT, &ALICE), -10);
        assert_eq!(op.balance_delta(&MINT, &BOB), 10);
        assert_eq!(op.balance_delta(&Address::repeat(9), &BOB), 0);
        assert_eq!(op.supply_delta(&MINT), 0);
    }
}

//! Nullable token ledger with in-memory balances for testing.

use agora_governance::{LedgerError, TokenLedger};
use agora_types::Principal;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// An in-memory ledger. Total supply is the sum of all balances.
#[derive(Debug, Default)]
pub struct NullLedger {
    balances: Mutex<HashMap<Principal, u128>>,
    unavailable: AtomicBool,
}

impl NullLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint `amount` to `principal` (test setup).
    pub fn mint(&self, principal: Principal, amount: u128) {
        *self.balances.lock().unwrap().entry(principal).or_default() += amount;
    }

    pub fn set_balance(&self, principal: Principal, amount: u128) {
        self.balances.lock().unwrap().insert(principal, amount);
    }

    /// Move `amount` between two holders. Panics on insufficient balance.
    pub fn transfer(&self, from: Principal, to: Principal, amount: u128) {
        let mut balances = self.balances.lock().unwrap();
        let source = balances.entry(from).or_default();
        assert!(*source >= amount, "insufficient balance for test transfer");
        *source -= amount;
        *balances.entry(to).or_default() += amount;
    }

    /// Make every subsequent call fail until cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), LedgerError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("null ledger switched off".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TokenLedger for NullLedger {
    async fn balance_of(&self, principal: &Principal) -> Result<u128, LedgerError> {
        self.check_available()?;
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(principal)
            .copied()
            .unwrap_or(0))
    }

    async fn total_supply(&self) -> Result<u128, LedgerError> {
        self.check_available()?;
        Ok(self.balances.lock().unwrap().values().sum())
    }
}

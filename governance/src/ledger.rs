//! Interface to the external token ledger.

use crate::error::LedgerError;
use agora_types::Principal;
use async_trait::async_trait;

/// Real-time balances owned by the token ledger.
///
/// The ledger need not support historical queries; the governor builds its
/// own history in the checkpoint store from values read through this trait.
#[async_trait]
pub trait TokenLedger: Send + Sync {
    async fn balance_of(&self, principal: &Principal) -> Result<u128, LedgerError>;

    async fn total_supply(&self) -> Result<u128, LedgerError>;
}

//! Wallet balance records.
//!
//! A wallet is the per-owner monetary balance. The invariant `balance >= 0`
//! holds at all times: every mutation goes through the store's conditional
//! debit or atomic credit, never through read-modify-write.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use prexo_shared::types::{OwnerId, WalletId};

/// Snapshot of a wallet balance record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Unique wallet identifier.
    pub id: WalletId,
    /// The owner of this wallet. One wallet per owner.
    pub owner_id: OwnerId,
    /// Current balance. Never negative.
    pub balance: Decimal,
    /// Monotonically increasing update counter.
    pub version: i64,
    /// When the wallet was created.
    pub created_at: DateTime<Utc>,
    /// When the balance last changed.
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Creates a fresh zero-balance wallet for an owner.
    #[must_use]
    pub fn new(owner_id: OwnerId) -> Self {
        let now = Utc::now();
        Self {
            id: WalletId::new(),
            owner_id,
            balance: Decimal::ZERO,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if the balance covers the requested amount.
    #[must_use]
    pub fn covers(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_wallet_starts_empty() {
        let wallet = Wallet::new(OwnerId::new());
        assert_eq!(wallet.balance, Decimal::ZERO);
        assert_eq!(wallet.version, 0);
    }

    #[test]
    fn test_covers() {
        let mut wallet = Wallet::new(OwnerId::new());
        wallet.balance = dec!(100);
        assert!(wallet.covers(dec!(100)));
        assert!(wallet.covers(dec!(99.99)));
        assert!(!wallet.covers(dec!(100.01)));
    }
}

//! In-memory [`SettlementStore`] for deterministic testing.
//!
//! Preserves the production semantics that matter: conditional debits are
//! evaluated and applied under one lock (compare-and-swap), the debit +
//! record pair is atomic, and decision claims serialize so a second
//! concurrent decision observes `AlreadyProcessed`.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use prexo_shared::types::{OwnerId, SchemeId, TransactionId, WalletId};

use crate::commission::{CommissionRule, RuleScope};
use crate::error::EngineError;
use crate::lifecycle::{
    DecisionAction, Refund, RefundStatus, Transaction, TransactionKind, TransactionStatus,
};
use crate::store::{SettlementStore, TransactionDraft};
use crate::wallet::Wallet;

#[derive(Default)]
struct Inner {
    wallets: HashMap<WalletId, Wallet>,
    owners: HashMap<OwnerId, WalletId>,
    transactions: HashMap<TransactionId, Transaction>,
    rules: Vec<CommissionRule>,
    default_scheme: Option<SchemeId>,
    assignments: HashMap<OwnerId, SchemeId>,
}

/// Mutex-guarded settlement store backed by hash maps.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a scheme as the process-wide default.
    pub fn set_default_scheme(&self, scheme_id: SchemeId) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.default_scheme = Some(scheme_id);
        }
    }

    /// Assigns an owner to a scheme, shadowing the default.
    pub fn assign_scheme(&self, owner_id: OwnerId, scheme_id: SchemeId) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.assignments.insert(owner_id, scheme_id);
        }
    }

    /// Adds a commission rule.
    pub fn insert_rule(&self, rule: CommissionRule) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.rules.push(rule);
        }
    }

    /// Removes a commission rule by id.
    pub fn remove_rule(&self, rule_id: prexo_shared::types::RuleId) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.rules.retain(|r| r.id != rule_id);
        }
    }

    /// Creates a wallet pre-loaded with a balance, for test setup.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned; this helper is for tests.
    #[must_use]
    pub fn seed_wallet(&self, owner_id: OwnerId, balance: Decimal) -> Wallet {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let mut wallet = Wallet::new(owner_id);
        wallet.balance = balance;
        inner.owners.insert(owner_id, wallet.id);
        inner.wallets.insert(wallet.id, wallet.clone());
        wallet
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, EngineError> {
        self.inner
            .lock()
            .map_err(|_| EngineError::Storage("store lock poisoned".to_string()))
    }
}

fn debit_in_place(wallet: &mut Wallet, amount: Decimal) -> Result<Decimal, EngineError> {
    if wallet.balance < amount {
        return Err(EngineError::InsufficientFunds {
            required: amount,
            available: wallet.balance,
        });
    }
    wallet.balance -= amount;
    wallet.version += 1;
    wallet.updated_at = Utc::now();
    Ok(wallet.balance)
}

fn credit_in_place(wallet: &mut Wallet, amount: Decimal) -> Decimal {
    wallet.balance += amount;
    wallet.version += 1;
    wallet.updated_at = Utc::now();
    wallet.balance
}

fn instantiate(draft: TransactionDraft) -> Transaction {
    let now = Utc::now();
    Transaction {
        id: TransactionId::new(),
        owner_id: draft.owner_id,
        wallet_id: draft.wallet_id,
        kind: draft.kind,
        amount: draft.amount,
        commission: draft.commission,
        debited_total: draft.debit_total,
        status: draft.status,
        operator_ref: draft.operator_ref,
        provider_ref: None,
        metadata: draft.metadata,
        failure_reason: None,
        decided_by: None,
        decided_at: None,
        decision_notes: None,
        refund: None,
        created_at: now,
        updated_at: now,
    }
}

fn apply_action(tx: &mut Transaction, action: &DecisionAction) {
    let now = Utc::now();
    tx.status = action.new_status();
    tx.updated_at = now;

    match action {
        DecisionAction::Approve {
            decided_by,
            decided_at,
            notes,
            ..
        } => {
            tx.decided_by = Some(*decided_by);
            tx.decided_at = Some(*decided_at);
            tx.decision_notes.clone_from(notes);
        }
        DecisionAction::Reject {
            decided_by,
            decided_at,
            notes,
            ..
        } => {
            tx.decided_by = Some(*decided_by);
            tx.decided_at = Some(*decided_at);
            tx.decision_notes = Some(notes.clone());
        }
        DecisionAction::Complete { provider_ref, .. } => {
            if provider_ref.is_some() {
                tx.provider_ref.clone_from(provider_ref);
            }
        }
        DecisionAction::Fail {
            reason,
            provider_ref,
            ..
        } => {
            tx.failure_reason = Some(reason.clone());
            if provider_ref.is_some() {
                tx.provider_ref.clone_from(provider_ref);
            }
        }
    }

    if let Some(amount) = action.refund_amount() {
        tx.refund = Some(Refund {
            amount,
            status: RefundStatus::Completed,
            completed_at: Some(now),
        });
    }
}

#[async_trait]
impl SettlementStore for MemoryStore {
    async fn create_wallet(&self, owner_id: OwnerId) -> Result<Wallet, EngineError> {
        let mut inner = self.lock()?;
        if inner.owners.contains_key(&owner_id) {
            return Err(EngineError::DuplicateWallet(owner_id));
        }
        let wallet = Wallet::new(owner_id);
        inner.owners.insert(owner_id, wallet.id);
        inner.wallets.insert(wallet.id, wallet.clone());
        Ok(wallet)
    }

    async fn wallet(&self, id: WalletId) -> Result<Wallet, EngineError> {
        let inner = self.lock()?;
        inner
            .wallets
            .get(&id)
            .cloned()
            .ok_or(EngineError::WalletNotFound(id))
    }

    async fn wallet_by_owner(&self, owner_id: OwnerId) -> Result<Wallet, EngineError> {
        let inner = self.lock()?;
        inner
            .owners
            .get(&owner_id)
            .and_then(|id| inner.wallets.get(id))
            .cloned()
            .ok_or(EngineError::OwnerWalletNotFound(owner_id))
    }

    async fn try_debit(
        &self,
        wallet_id: WalletId,
        amount: Decimal,
    ) -> Result<Decimal, EngineError> {
        let mut inner = self.lock()?;
        let wallet = inner
            .wallets
            .get_mut(&wallet_id)
            .ok_or(EngineError::WalletNotFound(wallet_id))?;
        debit_in_place(wallet, amount)
    }

    async fn credit(&self, wallet_id: WalletId, amount: Decimal) -> Result<Decimal, EngineError> {
        let mut inner = self.lock()?;
        let wallet = inner
            .wallets
            .get_mut(&wallet_id)
            .ok_or(EngineError::WalletNotFound(wallet_id))?;
        Ok(credit_in_place(wallet, amount))
    }

    async fn commission_rules(
        &self,
        owner_id: OwnerId,
        operator: &str,
        kind: TransactionKind,
    ) -> Result<Vec<CommissionRule>, EngineError> {
        let inner = self.lock()?;
        let scheme = inner
            .assignments
            .get(&owner_id)
            .copied()
            .or(inner.default_scheme);

        let rules = inner
            .rules
            .iter()
            .filter(|r| r.operator == operator && r.kind == kind)
            .filter(|r| match r.scope {
                RuleScope::Global => true,
                RuleScope::Scheme { scheme_id } => Some(scheme_id) == scheme,
                RuleScope::User { owner_id: rule_owner } => rule_owner == owner_id,
            })
            .cloned()
            .collect();
        Ok(rules)
    }

    async fn debit_and_record(
        &self,
        draft: TransactionDraft,
    ) -> Result<Transaction, EngineError> {
        let mut inner = self.lock()?;
        let wallet = inner
            .wallets
            .get_mut(&draft.wallet_id)
            .ok_or(EngineError::WalletNotFound(draft.wallet_id))?;

        // Debit first under the same lock: either both happen or neither.
        debit_in_place(wallet, draft.debit_total)?;

        let tx = instantiate(draft);
        inner.transactions.insert(tx.id, tx.clone());
        Ok(tx)
    }

    async fn record(&self, draft: TransactionDraft) -> Result<Transaction, EngineError> {
        let mut inner = self.lock()?;
        if !inner.wallets.contains_key(&draft.wallet_id) {
            return Err(EngineError::WalletNotFound(draft.wallet_id));
        }
        let tx = instantiate(draft);
        inner.transactions.insert(tx.id, tx.clone());
        Ok(tx)
    }

    async fn transaction(&self, id: TransactionId) -> Result<Transaction, EngineError> {
        let inner = self.lock()?;
        inner
            .transactions
            .get(&id)
            .cloned()
            .ok_or(EngineError::TransactionNotFound(id))
    }

    async fn apply_decision(
        &self,
        id: TransactionId,
        expected_from: &[TransactionStatus],
        action: DecisionAction,
    ) -> Result<Transaction, EngineError> {
        let mut inner = self.lock()?;

        let current = inner
            .transactions
            .get(&id)
            .ok_or(EngineError::TransactionNotFound(id))?;

        // Claim check: the status must still be what the caller validated
        // against, otherwise another decision won the race.
        if !expected_from.contains(&current.status) {
            if current.status.is_terminal() {
                return Err(EngineError::AlreadyProcessed {
                    id,
                    status: current.status,
                });
            }
            return Err(EngineError::InvalidTransition {
                from: current.status,
                to: action.new_status(),
            });
        }

        let wallet_id = current.wallet_id;
        if let Some(amount) = action.wallet_credit() {
            let wallet = inner
                .wallets
                .get_mut(&wallet_id)
                .ok_or(EngineError::WalletNotFound(wallet_id))?;
            credit_in_place(wallet, amount);
        }

        let tx = inner
            .transactions
            .get_mut(&id)
            .ok_or(EngineError::TransactionNotFound(id))?;
        apply_action(tx, &action);
        Ok(tx.clone())
    }

    async fn set_provider_ref(
        &self,
        id: TransactionId,
        provider_ref: &str,
    ) -> Result<(), EngineError> {
        let mut inner = self.lock()?;
        let tx = inner
            .transactions
            .get_mut(&id)
            .ok_or(EngineError::TransactionNotFound(id))?;
        tx.provider_ref = Some(provider_ref.to_string());
        tx.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prexo_shared::types::AdminId;
    use rust_decimal_macros::dec;

    use crate::commission::CommissionBreakdown;

    fn spend_draft(owner: OwnerId, wallet: WalletId, amount: Decimal) -> TransactionDraft {
        TransactionDraft {
            owner_id: owner,
            wallet_id: wallet,
            kind: TransactionKind::MobileRecharge,
            amount,
            commission: CommissionBreakdown::none(),
            debit_total: amount,
            status: TransactionStatus::AwaitingApproval,
            operator_ref: Some("airtel".to_string()),
            metadata: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn test_try_debit_insufficient_leaves_balance_unchanged() {
        let store = MemoryStore::new();
        let wallet = store.seed_wallet(OwnerId::new(), dec!(50));

        let err = store.try_debit(wallet.id, dec!(100)).await.unwrap_err();
        assert!(matches!(err, EngineError::InsufficientFunds { .. }));
        assert_eq!(store.wallet(wallet.id).await.unwrap().balance, dec!(50));
    }

    #[tokio::test]
    async fn test_debit_then_credit_roundtrip() {
        let store = MemoryStore::new();
        let wallet = store.seed_wallet(OwnerId::new(), dec!(1000));

        assert_eq!(store.try_debit(wallet.id, dec!(300)).await.unwrap(), dec!(700));
        assert_eq!(store.credit(wallet.id, dec!(300)).await.unwrap(), dec!(1000));
    }

    #[tokio::test]
    async fn test_debit_and_record_is_atomic_on_insufficient_funds() {
        let store = MemoryStore::new();
        let owner = OwnerId::new();
        let wallet = store.seed_wallet(owner, dec!(100));

        let err = store
            .debit_and_record(spend_draft(owner, wallet.id, dec!(500)))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientFunds { .. }));
        // Neither the debit nor the record happened.
        assert_eq!(store.wallet(wallet.id).await.unwrap().balance, dec!(100));
        assert!(store.lock().unwrap().transactions.is_empty());
    }

    #[tokio::test]
    async fn test_apply_decision_claims_once() {
        let store = MemoryStore::new();
        let owner = OwnerId::new();
        let wallet = store.seed_wallet(owner, dec!(1000));
        let tx = store
            .debit_and_record(spend_draft(owner, wallet.id, dec!(300)))
            .await
            .unwrap();

        let action = DecisionAction::Reject {
            new_status: TransactionStatus::Rejected,
            decided_by: AdminId::new(),
            decided_at: Utc::now(),
            notes: "operator outage".to_string(),
            refund: Some(dec!(300)),
        };

        let decided = store
            .apply_decision(
                tx.id,
                &[TransactionStatus::AwaitingApproval, TransactionStatus::Pending],
                action.clone(),
            )
            .await
            .unwrap();
        assert_eq!(decided.status, TransactionStatus::Rejected);
        assert_eq!(decided.refund.as_ref().unwrap().amount, dec!(300));
        assert_eq!(store.wallet(wallet.id).await.unwrap().balance, dec!(1000));

        // Second claim on the now-terminal record.
        let err = store
            .apply_decision(
                tx.id,
                &[TransactionStatus::AwaitingApproval, TransactionStatus::Pending],
                action,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AlreadyProcessed { .. }));
        // The refund was not applied twice.
        assert_eq!(store.wallet(wallet.id).await.unwrap().balance, dec!(1000));
    }

    #[tokio::test]
    async fn test_duplicate_wallet_rejected() {
        let store = MemoryStore::new();
        let owner = OwnerId::new();
        store.create_wallet(owner).await.unwrap();
        let err = store.create_wallet(owner).await.unwrap_err();
        assert!(matches!(err, EngineError::DuplicateWallet(_)));
    }

    #[tokio::test]
    async fn test_commission_rules_scheme_assignment_shadows_default() {
        use crate::commission::RateType;
        use prexo_shared::types::RuleId;

        let store = MemoryStore::new();
        let owner = OwnerId::new();
        let default_scheme = SchemeId::new();
        let assigned_scheme = SchemeId::new();
        store.set_default_scheme(default_scheme);

        let rule = |scheme_id| CommissionRule {
            id: RuleId::new(),
            scope: RuleScope::Scheme { scheme_id },
            operator: "airtel".to_string(),
            kind: TransactionKind::MobileRecharge,
            rate_type: RateType::Fixed,
            value: dec!(1),
            min_fee: Decimal::ZERO,
            max_fee: None,
        };
        store.insert_rule(rule(default_scheme));
        store.insert_rule(rule(assigned_scheme));

        // Default scheme applies while unassigned.
        let rules = store
            .commission_rules(owner, "airtel", TransactionKind::MobileRecharge)
            .await
            .unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules[0].scope,
            RuleScope::Scheme {
                scheme_id: default_scheme
            }
        );

        // Assignment shadows the default.
        store.assign_scheme(owner, assigned_scheme);
        let rules = store
            .commission_rules(owner, "airtel", TransactionKind::MobileRecharge)
            .await
            .unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules[0].scope,
            RuleScope::Scheme {
                scheme_id: assigned_scheme
            }
        );
    }
}

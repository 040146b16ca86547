//! Initial database migration.
//!
//! Creates the enums, wallet ledger tables, commission tables, and the
//! indexes backing the admin queue scans.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: COMMISSION SCHEMES & RULES
        // ============================================================
        db.execute_unprepared(COMMISSION_SCHEMES_SQL).await?;
        db.execute_unprepared(COMMISSION_RULES_SQL).await?;

        // ============================================================
        // PART 3: WALLETS & TRANSACTIONS
        // ============================================================
        db.execute_unprepared(WALLETS_SQL).await?;
        db.execute_unprepared(TRANSACTIONS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
-- Transaction kinds
CREATE TYPE transaction_kind AS ENUM (
    'topup',
    'mobile-recharge',
    'dth-recharge',
    'bill-payment',
    'voucher-purchase',
    'transfer'
);

-- Transaction lifecycle statuses
CREATE TYPE transaction_status AS ENUM (
    'awaiting_approval',
    'pending',
    'approved',
    'rejected',
    'success',
    'failed'
);

-- Commission rate interpretation
CREATE TYPE commission_rate_type AS ENUM ('percentage', 'fixed');

-- Commission rule scope
CREATE TYPE rule_scope AS ENUM ('global', 'scheme', 'user');

-- Commission provenance
CREATE TYPE commission_source AS ENUM ('user', 'scheme', 'global', 'none');

-- Refund credit status
CREATE TYPE refund_status AS ENUM ('pending', 'completed');
";

const COMMISSION_SCHEMES_SQL: &str = r"
CREATE TABLE commission_schemes (
    id UUID PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    is_default BOOLEAN NOT NULL DEFAULT FALSE,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- At most one process-wide default scheme
CREATE UNIQUE INDEX ux_commission_schemes_default
    ON commission_schemes (is_default)
    WHERE is_default;
";

const COMMISSION_RULES_SQL: &str = r"
CREATE TABLE commission_rules (
    id UUID PRIMARY KEY,
    scope rule_scope NOT NULL,
    scheme_id UUID REFERENCES commission_schemes(id) ON DELETE CASCADE,
    owner_id UUID,
    operator VARCHAR(100) NOT NULL,
    kind transaction_kind NOT NULL,
    rate_type commission_rate_type NOT NULL,
    value NUMERIC(18, 4) NOT NULL,
    min_fee NUMERIC(18, 4) NOT NULL DEFAULT 0,
    max_fee NUMERIC(18, 4),
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    -- Scope keys must match the scope
    CONSTRAINT ck_rule_scope_keys CHECK (
        (scope = 'global' AND scheme_id IS NULL AND owner_id IS NULL) OR
        (scope = 'scheme' AND scheme_id IS NOT NULL AND owner_id IS NULL) OR
        (scope = 'user'   AND scheme_id IS NULL AND owner_id IS NOT NULL)
    )
);

-- At most one active rule per (scope key, operator, kind) tuple
CREATE UNIQUE INDEX ux_rules_global_active
    ON commission_rules (operator, kind)
    WHERE is_active AND scope = 'global';
CREATE UNIQUE INDEX ux_rules_scheme_active
    ON commission_rules (scheme_id, operator, kind)
    WHERE is_active AND scope = 'scheme';
CREATE UNIQUE INDEX ux_rules_user_active
    ON commission_rules (owner_id, operator, kind)
    WHERE is_active AND scope = 'user';
";

const WALLETS_SQL: &str = r"
CREATE TABLE wallets (
    id UUID PRIMARY KEY,
    owner_id UUID NOT NULL UNIQUE,
    balance NUMERIC(18, 4) NOT NULL DEFAULT 0,
    version BIGINT NOT NULL DEFAULT 0,
    scheme_id UUID REFERENCES commission_schemes(id) ON DELETE SET NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    -- The balance invariant, enforced in depth behind the conditional debit
    CONSTRAINT ck_wallets_balance_non_negative CHECK (balance >= 0)
);
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id UUID PRIMARY KEY,
    owner_id UUID NOT NULL,
    wallet_id UUID NOT NULL REFERENCES wallets(id),
    kind transaction_kind NOT NULL,
    amount NUMERIC(18, 4) NOT NULL,
    commission_amount NUMERIC(18, 4) NOT NULL DEFAULT 0,
    commission_rate_type commission_rate_type NOT NULL DEFAULT 'fixed',
    commission_rate_value NUMERIC(18, 4) NOT NULL DEFAULT 0,
    commission_source commission_source NOT NULL DEFAULT 'none',
    commission_rule_id UUID,
    debited_total NUMERIC(18, 4) NOT NULL DEFAULT 0,
    status transaction_status NOT NULL,
    operator_ref VARCHAR(100),
    provider_ref VARCHAR(255),
    metadata JSONB NOT NULL DEFAULT '{}',
    failure_reason TEXT,
    decided_by UUID,
    decided_at TIMESTAMPTZ,
    decision_notes TEXT,
    refund_amount NUMERIC(18, 4),
    refund_status refund_status,
    refund_completed_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT ck_transactions_amount_positive CHECK (amount > 0),
    CONSTRAINT ck_transactions_refund_at_most_debited CHECK (
        refund_amount IS NULL OR refund_amount <= debited_total
    )
);

-- Admin queue scans
CREATE INDEX ix_transactions_owner_status ON transactions (owner_id, status);
CREATE INDEX ix_transactions_status_created ON transactions (status, created_at);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS transactions;
DROP TABLE IF EXISTS wallets;
DROP TABLE IF EXISTS commission_rules;
DROP TABLE IF EXISTS commission_schemes;
DROP TYPE IF EXISTS refund_status;
DROP TYPE IF EXISTS commission_source;
DROP TYPE IF EXISTS rule_scope;
DROP TYPE IF EXISTS commission_rate_type;
DROP TYPE IF EXISTS transaction_status;
DROP TYPE IF EXISTS transaction_kind;
";

//! Prioritized commission lookup.

use rust_decimal::Decimal;

use crate::commission::types::{
    CommissionRule, CommissionSource, RateType, ResolvedCommission, RuleScope,
};

/// Resolves the commission owed on a transaction.
///
/// `rules` must already be filtered to the (owner, operator, kind) tuple by
/// the storage layer; this function only applies precedence and arithmetic.
/// Precedence, most specific wins: user override, then scheme, then global.
/// When nothing matches the commission is zero with `source = none`.
#[must_use]
pub fn resolve(rules: &[CommissionRule], amount: Decimal) -> ResolvedCommission {
    let winner = rules.iter().max_by_key(|r| r.scope.rank());

    match winner {
        Some(rule) => ResolvedCommission {
            amount: compute_fee(rule, amount),
            source: source_of(rule.scope),
            rule_id: Some(rule.id),
            rate_type: rule.rate_type,
            rate_value: rule.value,
        },
        None => ResolvedCommission::none(),
    }
}

/// Computes the fee for a single rule, clamped to its bounds.
///
/// `min_fee` is applied only when positive; `max_fee` only when set.
#[must_use]
pub fn compute_fee(rule: &CommissionRule, amount: Decimal) -> Decimal {
    let raw = match rule.rate_type {
        RateType::Percentage => amount * rule.value / Decimal::ONE_HUNDRED,
        RateType::Fixed => rule.value,
    };

    let mut fee = raw;
    if rule.min_fee > Decimal::ZERO && fee < rule.min_fee {
        fee = rule.min_fee;
    }
    if let Some(max) = rule.max_fee
        && fee > max
    {
        fee = max;
    }
    fee
}

const fn source_of(scope: RuleScope) -> CommissionSource {
    match scope {
        RuleScope::Global => CommissionSource::Global,
        RuleScope::Scheme { .. } => CommissionSource::Scheme,
        RuleScope::User { .. } => CommissionSource::User,
    }
}

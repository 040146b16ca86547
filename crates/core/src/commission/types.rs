//! Commission domain types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use prexo_shared::types::{OwnerId, RuleId, SchemeId};

use crate::lifecycle::TransactionKind;

/// Who a commission rule applies to.
///
/// Precedence is a total order over this union, most specific wins:
/// `User` > `Scheme` > `Global`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "lowercase")]
pub enum RuleScope {
    /// Applies to every owner unless shadowed.
    Global,
    /// Applies to owners assigned to the scheme (or the process default scheme).
    Scheme {
        /// The scheme this rule belongs to.
        scheme_id: SchemeId,
    },
    /// Applies to exactly one owner, shadowing everything else.
    User {
        /// The owner this override is for.
        owner_id: OwnerId,
    },
}

impl RuleScope {
    /// Precedence rank; higher wins.
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Global => 0,
            Self::Scheme { .. } => 1,
            Self::User { .. } => 2,
        }
    }
}

/// How a rule's value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateType {
    /// `value` percent of the transaction amount.
    Percentage,
    /// `value` as a flat fee.
    Fixed,
}

impl RateType {
    /// Returns the string representation of the rate type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
        }
    }

    /// Parses a rate type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "percentage" => Some(Self::Percentage),
            "fixed" => Some(Self::Fixed),
            _ => None,
        }
    }
}

/// A commission rule as loaded from storage.
///
/// At most one active rule exists per (scope key, operator, kind) tuple;
/// the storage layer enforces that invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionRule {
    /// Unique identifier for the rule.
    pub id: RuleId,
    /// Who the rule applies to.
    pub scope: RuleScope,
    /// The operator/provider the rule matches.
    pub operator: String,
    /// The transaction kind the rule matches.
    pub kind: TransactionKind,
    /// How `value` is interpreted.
    pub rate_type: RateType,
    /// Percentage or flat value.
    pub value: Decimal,
    /// Lower clamp on the computed fee. Applied only when positive.
    pub min_fee: Decimal,
    /// Upper clamp on the computed fee. Applied only when set.
    pub max_fee: Option<Decimal>,
}

/// Where a resolved commission came from, persisted for audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommissionSource {
    /// A user-specific override won.
    User,
    /// A scheme rule won.
    Scheme,
    /// The global rule won.
    Global,
    /// No rule matched; commission is zero.
    None,
}

impl CommissionSource {
    /// Returns the string representation of the source.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Scheme => "scheme",
            Self::Global => "global",
            Self::None => "none",
        }
    }

    /// Parses a source from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(Self::User),
            "scheme" => Some(Self::Scheme),
            "global" => Some(Self::Global),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

/// Outcome of commission resolution for one spend request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCommission {
    /// The computed commission amount.
    pub amount: Decimal,
    /// Which tier produced the amount.
    pub source: CommissionSource,
    /// The winning rule, if any.
    pub rule_id: Option<RuleId>,
    /// The winning rule's rate type. `Fixed` with zero value when no rule matched.
    pub rate_type: RateType,
    /// The winning rule's raw value.
    pub rate_value: Decimal,
}

impl ResolvedCommission {
    /// A zero commission with no provenance.
    #[must_use]
    pub fn none() -> Self {
        Self {
            amount: Decimal::ZERO,
            source: CommissionSource::None,
            rule_id: None,
            rate_type: RateType::Fixed,
            rate_value: Decimal::ZERO,
        }
    }
}

/// Commission figures persisted on a transaction record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionBreakdown {
    /// The resolved commission amount.
    pub amount: Decimal,
    /// How the rate was interpreted.
    pub rate_type: RateType,
    /// The raw rule value (percentage or flat).
    pub rate_value: Decimal,
    /// Which tier produced the amount.
    pub source: CommissionSource,
    /// The rule that produced the amount, if any.
    pub rule_id: Option<RuleId>,
}

impl From<ResolvedCommission> for CommissionBreakdown {
    fn from(resolved: ResolvedCommission) -> Self {
        Self {
            amount: resolved.amount,
            rate_type: resolved.rate_type,
            rate_value: resolved.rate_value,
            source: resolved.source,
            rule_id: resolved.rule_id,
        }
    }
}

impl CommissionBreakdown {
    /// A zero breakdown for transactions with no commission (e.g. top-ups).
    #[must_use]
    pub fn none() -> Self {
        ResolvedCommission::none().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_rank_ordering() {
        let global = RuleScope::Global;
        let scheme = RuleScope::Scheme {
            scheme_id: SchemeId::new(),
        };
        let user = RuleScope::User {
            owner_id: OwnerId::new(),
        };
        assert!(user.rank() > scheme.rank());
        assert!(scheme.rank() > global.rank());
    }

    #[test]
    fn test_rate_type_parse() {
        assert_eq!(RateType::parse("percentage"), Some(RateType::Percentage));
        assert_eq!(RateType::parse("FIXED"), Some(RateType::Fixed));
        assert_eq!(RateType::parse("other"), None);
    }

    #[test]
    fn test_source_roundtrip() {
        for source in [
            CommissionSource::User,
            CommissionSource::Scheme,
            CommissionSource::Global,
            CommissionSource::None,
        ] {
            assert_eq!(CommissionSource::parse(source.as_str()), Some(source));
        }
    }

    #[test]
    fn test_resolved_none_is_zero() {
        let none = ResolvedCommission::none();
        assert_eq!(none.amount, Decimal::ZERO);
        assert_eq!(none.source, CommissionSource::None);
        assert!(none.rule_id.is_none());
    }
}

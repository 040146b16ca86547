//! Commission rule resolution.
//!
//! Commission owed on a transaction is resolved through a precedence
//! hierarchy of rules: a user-specific override shadows the user's scheme,
//! which shadows the global default. Resolution is a pure function of the
//! rule set; nothing here performs I/O.

pub mod resolver;
pub mod types;

pub use resolver::resolve;
pub use types::{
    CommissionBreakdown, CommissionRule, CommissionSource, RateType, ResolvedCommission, RuleScope,
};

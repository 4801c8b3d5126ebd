//! Structured reasons a unification attempt failed.

use crate::pool::{Idx, Pool};

/// A human-readable explanation for why two terms did not unify, carrying
/// enough structure that `tenet_diagnostic::TypeErrorKind::UnificationFailure`
/// can be built without re-deriving the signature strings.
#[derive(Debug, Clone)]
pub enum UnifyReason {
    Mismatch { lhs: Idx, rhs: Idx },
    OccursCheck { var: tenet_ir::Atom, in_term: Idx },
    ArityMismatch { lhs: Idx, rhs: Idx },
    SumSubset { lhs: Idx, rhs: Idx },
}

impl UnifyReason {
    #[must_use]
    pub fn describe(&self, pool: &Pool) -> String {
        match self {
            UnifyReason::Mismatch { lhs, rhs } => {
                format!(
                    "'{}' does not structurally match '{}'",
                    crate::output::signature(pool, *lhs),
                    crate::output::signature(pool, *rhs)
                )
            }
            UnifyReason::OccursCheck { var, in_term } => {
                format!(
                    "'{}' occurs in '{}'",
                    var.text(),
                    crate::output::signature(pool, *in_term)
                )
            }
            UnifyReason::ArityMismatch { lhs, rhs } => {
                format!(
                    "'{}' and '{}' have different arity",
                    crate::output::signature(pool, *lhs),
                    crate::output::signature(pool, *rhs)
                )
            }
            UnifyReason::SumSubset { lhs, rhs } => {
                format!(
                    "'{}' is not a subset of '{}'",
                    crate::output::signature(pool, *rhs),
                    crate::output::signature(pool, *lhs)
                )
            }
        }
    }
}

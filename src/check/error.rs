//! Error types for gradient validation.
//!
//! Every variant except [`Error::Evaluation`] and [`Error::Config`] signals a
//! wiring mistake in the harness (a contract violation), never a property of
//! the energy model under test. Numerical deviations beyond tolerance are not
//! errors at all; they are recorded in the report.

use thiserror::Error;

use crate::model::term::Term;

/// Errors raised while validating or composing gradients.
#[derive(Debug, Error)]
pub enum Error {
    /// Two buffers that must describe the same atom set do not.
    #[error("atom count mismatch: expected {expected}, found {found}")]
    AtomCountMismatch {
        /// Atom count of the reference buffer or system.
        expected: usize,
        /// Atom count actually supplied.
        found: usize,
    },

    /// An atom index outside `0..count` was addressed.
    #[error("atom index {index} out of range for a system of {count} atoms")]
    AtomOutOfRange {
        /// Offending index.
        index: usize,
        /// Number of atoms in the system.
        count: usize,
    },

    /// The finite-difference step is not a positive finite number.
    #[error("invalid finite-difference step {0}")]
    InvalidStep(f64),

    /// A check was requested that needs a QM region, but none is loaded.
    #[error("check '{0}' requires a QM region")]
    MissingQmRegion(&'static str),

    /// Link atoms are in use but the shadow copy of the QM region is absent.
    #[error("link atoms are in use but no shadow system was built")]
    MissingShadow,

    /// The evaluator failed to produce an energy or gradient.
    #[error("evaluation of {term} failed: {detail}")]
    Evaluation {
        /// Term being evaluated, or `total` for composed quantities.
        term: Term,
        /// Description reported by the evaluator.
        detail: String,
    },

    /// Validation settings are inconsistent.
    #[error("invalid validation config: {0}")]
    Config(String),
}

impl Error {
    /// Creates an [`Evaluation`](Error::Evaluation) error.
    pub fn evaluation(term: Term, detail: impl Into<String>) -> Self {
        Self::Evaluation {
            term,
            detail: detail.into(),
        }
    }

    /// `true` for errors caused by harness wiring rather than the evaluator.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Error::AtomCountMismatch { .. }
                | Error::AtomOutOfRange { .. }
                | Error::InvalidStep(_)
                | Error::MissingQmRegion(_)
                | Error::MissingShadow
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_violations_are_classified() {
        assert!(
            Error::AtomCountMismatch {
                expected: 1,
                found: 2
            }
            .is_contract_violation()
        );
        assert!(Error::AtomOutOfRange { index: 9, count: 3 }.is_contract_violation());
        assert!(!Error::evaluation(Term::PolElec, "diverged").is_contract_violation());
    }

    #[test]
    fn evaluation_message_names_the_term() {
        let msg = Error::evaluation(Term::PolElec, "not converged").to_string();
        assert_eq!(msg, "evaluation of polelec failed: not converged");
    }
}

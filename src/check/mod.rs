//! Gradient validation harness.
//!
//! Analytic gradients reported by a [`MolecularSystem`] are checked term by
//! term against central finite differences of its energies. Deviations are
//! judged by a [`TolerancePolicy`] and collected in a [`ValidationReport`]
//! whose [`FailureCode`] has one bit per failing check. QM/MM gradients are
//! assembled by the [`Composer`].
//!
//! [`MolecularSystem`]: crate::MolecularSystem

mod compare;
mod compose;
mod config;
mod error;
mod numerical;
mod perturb;
mod report;
mod session;
mod tolerance;

#[cfg(test)]
pub(crate) mod testing;

pub use compare::{first_not_close, max_abs, max_abs_deviation, signed_deviations};
pub use compose::{Composer, QmmmGradient, Stage};
pub use config::ValidationConfig;
pub use error::Error;
pub use numerical::{DEFAULT_STEP, numerical_gradient, numerical_term_gradient};
pub use perturb::{Perturbation, apply};
pub use report::{TermResult, ValidationReport};
pub use session::Session;
pub use tolerance::{Check, FailureCode, TolerancePolicy};

//! Error types for the reference force field.
//!
//! Errors fall into two groups: problems with a system description, raised
//! once while building a [`ReferenceSystem`](super::ReferenceSystem), and
//! evaluation failures raised while computing energies or gradients at a
//! particular geometry.

use thiserror::Error;

/// Errors that can occur while building or evaluating a reference system.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to parse the TOML system description.
    #[error("failed to parse system description: {0}")]
    Parse(#[from] toml::de::Error),

    /// The system description contains no atoms.
    #[error("system contains no atoms")]
    EmptySystem,

    /// A term references an atom that does not exist.
    #[error("{term} entry {entry} references atom {atom}, but the system has {count} atoms")]
    InvalidAtomIndex {
        /// Kind of entry (`bond`, `angle`, `link`, ...).
        term: &'static str,
        /// Position of the entry in its list.
        entry: usize,
        /// Offending atom index.
        atom: usize,
        /// Number of atoms available.
        count: usize,
    },

    /// A parameter value is out of its physical domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The iterative polarization solver did not reach its tolerance.
    #[error(
        "polarization solver did not converge after {iterations} iterations (residual {residual:e})"
    )]
    NotConverged {
        /// Iterations performed.
        iterations: usize,
        /// Final relative residual norm.
        residual: f64,
    },

    /// The polarization matrix could not be factorized.
    #[error("polarization matrix is singular")]
    SingularPolarization,

    /// A geometry where a term or its derivative is undefined, such as two
    /// coincident atoms or a linear angle.
    #[error("degenerate geometry in {term}: {detail}")]
    DegenerateGeometry {
        /// Term being evaluated.
        term: &'static str,
        /// Description of the degeneracy.
        detail: String,
    },

    /// An external field does not have one row per atom.
    #[error("external field has {found} rows, but the system has {expected} atoms")]
    FieldShape {
        /// Atom count of the system.
        expected: usize,
        /// Rows supplied.
        found: usize,
    },
}

impl Error {
    pub(crate) fn invalid_index(term: &'static str, entry: usize, atom: usize, count: usize) -> Self {
        Self::InvalidAtomIndex {
            term,
            entry,
            atom,
            count,
        }
    }

    pub(crate) fn degenerate(term: &'static str, detail: impl Into<String>) -> Self {
        Self::DegenerateGeometry {
            term,
            detail: detail.into(),
        }
    }
}

//! Finite-difference validation of analytic gradients for polarizable
//! molecular-mechanics engines, with QM/MM gradient composition.
//!
//! Every energy term of a [`MolecularSystem`] is differentiated numerically by
//! central differences and compared, atom by atom, against the analytic
//! gradient the engine reports. QM/MM gradients are assembled from their
//! analytic primitives (van der Waals cross term, an all-classical *shadow*
//! copy of the QM region, link-atom corrections) and validated the same way.
//!
//! # Features
//!
//! - **Term-by-term checks** — 14 energy terms plus the total, each with its
//!   own tolerance and its own bit in the composite [`FailureCode`]
//! - **Exact restoration** — coordinates are perturbed through a scoped
//!   [`Perturbation`] guard and written back bit for bit
//! - **QM/MM composition** — the [`Composer`] applies the van der Waals cross
//!   term, the shadow internal gradient and the link-atom correction in order
//! - **Reference force field** — [`ReferenceSystem`], a small polarizable
//!   force field in atomic units with fully analytic gradients
//! - **Text I/O** — deviation reports and `Grad` dumps in kcal/mol/Å
//!
//! # Quick Start
//!
//! ```
//! use mmpol_gradcheck::{ReferenceSystem, Session, ValidationConfig};
//!
//! let water = ReferenceSystem::from_toml_str(r#"
//!     [[atoms]]
//!     position = [0.0, 0.0, 0.0]
//!     charge = -0.8
//!     polarizability = 1.0
//!
//!     [[atoms]]
//!     position = [1.8, 0.0, 0.0]
//!     charge = 0.4
//!
//!     [[atoms]]
//!     position = [-0.45, 1.75, 0.0]
//!     charge = 0.4
//!
//!     [[bonds]]
//!     atoms = [0, 1]
//!     k = 0.5
//!     r0 = 1.81
//!
//!     [[bonds]]
//!     atoms = [0, 2]
//!     k = 0.5
//!     r0 = 1.81
//!
//!     [[angles]]
//!     atoms = [1, 0, 2]
//!     k = 0.08
//!     theta0 = 104.5
//! "#)?;
//!
//! let mut session = Session::new(water);
//! let report = session.validate(&ValidationConfig::default())?;
//!
//! // 14 individual terms plus the total
//! assert_eq!(report.results().len(), 15);
//! assert!(report.all_passed());
//! assert_eq!(report.status().exit_byte(), 0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Module Organization
//!
//! - [`check`] — Perturbation, differentiation, tolerances, composition and the driver
//! - [`reference`] — Reference polarizable force field and QM region
//! - [`io`] — System, field and config readers; report and dump writers
//!
//! # Data Types
//!
//! - [`MolecularSystem`] — Energy/gradient evaluator under test
//! - [`QmHelper`] — QM region attached to a classical system
//! - [`GradientBuffer`] — One `[x, y, z]` row per atom
//! - [`Term`] — Closed set of energy terms
//! - [`Check`] — A term or a QM/MM contribution
//! - [`TermResult`] — Outcome of one check
//! - [`ValidationReport`] — Ordered results and composite status

mod model;

pub mod check;
pub mod io;
pub mod reference;

pub use model::gradient::GradientBuffer;
pub use model::system::{MolecularSystem, QmHelper};
pub use model::term::{Axis, ParseTermError, Term};
pub use model::units::{AU2KCALMOL, ANG2AU, DEFAULT_LINK_DISTANCE_ANG, GRAD_AU2KCALMOL_ANG};

pub use check::{
    Check, Composer, FailureCode, Perturbation, QmmmGradient, Session, TermResult,
    TolerancePolicy, ValidationConfig, ValidationReport,
};
pub use reference::{QmRegion, ReferenceSystem};

//! Core data structures shared by the validation harness and its evaluators.
//!
//! - [`term`] – Closed enumeration of energy terms and Cartesian axes.
//! - [`gradient`] – Zero-initialized per-atom gradient buffers.
//! - [`system`] – Collaborator interfaces: the classical evaluator and the QM helper.
//! - [`units`] – Conversion constants between atomic and kcal/mol/Å units.
//!
//! The harness only ever sees an evaluator through [`MolecularSystem`] and
//! [`QmHelper`]; concrete engines (such as [`crate::reference`]) live elsewhere.
//!
//! [`MolecularSystem`]: system::MolecularSystem
//! [`QmHelper`]: system::QmHelper

pub mod gradient;
pub mod system;
pub mod term;
pub mod units;

use super::gradient::GradientBuffer;
use super::term::Term;
use crate::check::Error;

/// Energy/gradient evaluator for one molecular system.
///
/// The evaluator owns its coordinate buffer and any state derived from it
/// (neighbor data, induced dipoles). Every [`set_coordinates`] invalidates that
/// state, so energies and gradients must be queried again afterwards.
///
/// [`set_coordinates`]: MolecularSystem::set_coordinates
pub trait MolecularSystem {
    fn atom_count(&self) -> usize;

    /// Current Cartesian coordinates, one row per atom.
    fn coordinates(&self) -> &[[f64; 3]];

    /// Replaces the whole coordinate buffer in a single write.
    ///
    /// # Errors
    ///
    /// [`Error::AtomCountMismatch`] if `coords` does not have one row per atom.
    fn set_coordinates(&mut self, coords: &[[f64; 3]]) -> Result<(), Error>;

    /// Scalar energy of `term` at the current coordinates.
    fn energy(&mut self, term: Term) -> Result<f64, Error>;

    /// Analytic gradient of `term`, overwriting `out`.
    fn gradient(&mut self, term: Term, out: &mut GradientBuffer) -> Result<(), Error>;

    /// Gradient of every term in a single call.
    fn full_gradient(&mut self, out: &mut GradientBuffer) -> Result<(), Error> {
        self.gradient(Term::Total, out)
    }

    /// Atom indices carrying a non-zero polarizability.
    fn polarizable_sites(&self) -> Vec<usize>;

    /// Turns polarizability off on the given atoms.
    fn disable_polarizability(&mut self, atoms: &[usize]) -> Result<(), Error>;
}

/// QM region attached to a classical system of type `S`.
///
/// Read-only from the harness point of view: it reports QM-side and MM-side
/// contributions but is never perturbed.
pub trait QmHelper<S: MolecularSystem> {
    fn qm_atom_count(&self) -> usize;

    /// Whether covalent QM/MM boundaries are capped with link atoms.
    fn uses_link_atoms(&self) -> bool;

    /// QM–MM van der Waals cross energy at the current MM coordinates.
    fn vdw_energy(&self, mm: &S) -> Result<f64, Error>;

    /// Gradient of the QM–MM van der Waals cross term, overwriting both
    /// buffers.
    fn vdw_geomgrad(
        &self,
        mm: &S,
        qm_out: &mut GradientBuffer,
        mm_out: &mut GradientBuffer,
    ) -> Result<(), Error>;

    /// Link-atom correction given the fully assembled pre-correction QM
    /// gradient. Overwrites both output buffers with the correction only.
    fn link_atom_geomgrad(
        &self,
        mm: &S,
        qm_out: &mut GradientBuffer,
        mm_out: &mut GradientBuffer,
        pre_correction_qm: &GradientBuffer,
    ) -> Result<(), Error>;

    /// Builds an all-classical copy of the QM region.
    fn build_shadow(&self) -> Result<S, Error>;
}

use tracing::debug;

use super::error::Error;
use super::perturb::Perturbation;
use crate::model::gradient::GradientBuffer;
use crate::model::system::MolecularSystem;
use crate::model::term::{Axis, Term};

/// Finite-difference step, in the evaluator's length unit.
pub const DEFAULT_STEP: f64 = 1e-5;

/// Central-difference gradient of an arbitrary scalar energy.
///
/// For every atom and axis the energy is evaluated at `base + step` and
/// `base - step` along that component, `g = (E⁺ − E⁻) / 2·step`. Both
/// displaced geometries are built from the captured base coordinates, which
/// are written back before returning, on success or failure.
///
/// Costs `6 · atom_count` energy evaluations, strictly one after the other.
pub fn numerical_gradient<S, F>(
    system: &mut S,
    mut energy_fn: F,
    step: f64,
) -> Result<GradientBuffer, Error>
where
    S: MolecularSystem,
    F: FnMut(&mut S) -> Result<f64, Error>,
{
    if !(step.is_finite() && step > 0.0) {
        return Err(Error::InvalidStep(step));
    }

    let atoms = system.atom_count();
    let mut grad = GradientBuffer::zeros(atoms);
    let mut perturbation = Perturbation::new(system);

    for atom in 0..atoms {
        for axis in Axis::ALL {
            perturbation.perturb(atom, axis, step)?;
            let e_plus = energy_fn(perturbation.system())?;

            perturbation.perturb(atom, axis, -step)?;
            let e_minus = energy_fn(perturbation.system())?;

            grad.set(atom, axis, (e_plus - e_minus) / (2.0 * step));
        }
    }
    perturbation.restore()?;

    debug!(atoms, step, "numerical gradient assembled");
    Ok(grad)
}

/// Central-difference gradient of one energy term of `system`.
pub fn numerical_term_gradient<S: MolecularSystem>(
    system: &mut S,
    term: Term,
    step: f64,
) -> Result<GradientBuffer, Error> {
    numerical_gradient(system, |s| s.energy(term), step)
}

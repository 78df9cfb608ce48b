use tracing::{trace, warn};

use super::error::Error;
use crate::model::system::MolecularSystem;
use crate::model::term::Axis;

/// Returns a copy of `base` with one component displaced by `delta`.
///
/// `base` is never modified, so repeated displacements of the same atom never
/// accumulate rounding error.
///
/// # Errors
///
/// [`Error::AtomOutOfRange`] if `atom` does not address a row of `base`.
pub fn apply(
    base: &[[f64; 3]],
    atom: usize,
    axis: Axis,
    delta: f64,
) -> Result<Vec<[f64; 3]>, Error> {
    if atom >= base.len() {
        return Err(Error::AtomOutOfRange {
            index: atom,
            count: base.len(),
        });
    }
    let mut coords = base.to_vec();
    coords[atom][axis.index()] += delta;
    Ok(coords)
}

/// Scoped displacement of a system's coordinates.
///
/// Captures the coordinates on construction and writes them back on
/// [`restore`](Perturbation::restore) or when dropped, whichever comes first.
pub struct Perturbation<'a, S: MolecularSystem> {
    system: &'a mut S,
    base: Vec<[f64; 3]>,
    displaced: bool,
}

impl<'a, S: MolecularSystem> Perturbation<'a, S> {
    pub fn new(system: &'a mut S) -> Self {
        let base = system.coordinates().to_vec();
        Self {
            system,
            base,
            displaced: false,
        }
    }

    /// Coordinates captured before the first displacement.
    pub fn base(&self) -> &[[f64; 3]] {
        &self.base
    }

    /// Pushes `base` with one component displaced by `delta` to the system.
    pub fn perturb(&mut self, atom: usize, axis: Axis, delta: f64) -> Result<(), Error> {
        let coords = apply(&self.base, atom, axis, delta)?;
        trace!(atom, ?axis, delta, "displacing coordinate");
        self.displaced = true;
        self.system.set_coordinates(&coords)
    }

    /// The wrapped system, for energy queries at the displaced geometry.
    pub fn system(&mut self) -> &mut S {
        self.system
    }

    /// Writes the captured coordinates back.
    pub fn restore(&mut self) -> Result<(), Error> {
        if self.displaced {
            self.system.set_coordinates(&self.base)?;
            self.displaced = false;
        }
        Ok(())
    }
}

impl<S: MolecularSystem> Drop for Perturbation<'_, S> {
    fn drop(&mut self) {
        if self.displaced {
            if let Err(e) = self.system.set_coordinates(&self.base) {
                warn!(error = %e, "failed to restore coordinates; system left displaced");
            }
        }
    }
}

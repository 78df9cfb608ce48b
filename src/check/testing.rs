//! Analytic toy evaluators shared by the harness tests.

use std::cell::RefCell;

use super::error::Error;
use crate::model::gradient::GradientBuffer;
use crate::model::system::{MolecularSystem, QmHelper};
use crate::model::term::Term;

/// Smooth closed-form energies with exactly known gradients.
///
/// `Bond` is a positive-definite quadratic, `Angle` a cubic, every other
/// individual term vanishes and `Total` is their sum.
pub struct Quadratic {
    coords: Vec<[f64; 3]>,
    pub coordinate_writes: usize,
    pub energy_calls: usize,
    pub polarizable: Vec<bool>,
    /// When set, the analytic `Bond` gradient is reported as zero. `Total`
    /// stays correct.
    pub broken_bond_gradient: bool,
    /// Coordinate writes beyond this count are rejected.
    pub write_limit: Option<usize>,
}

impl Quadratic {
    pub fn new(coords: Vec<[f64; 3]>) -> Self {
        let n = coords.len();
        Self {
            coords,
            coordinate_writes: 0,
            energy_calls: 0,
            polarizable: vec![true; n],
            broken_bond_gradient: false,
            write_limit: None,
        }
    }

    fn bond_energy(&self) -> f64 {
        self.coords
            .iter()
            .map(|&[x, y, z]| x * x + 2.0 * y * y + 3.0 * z * z + x * y)
            .sum()
    }

    fn angle_energy(&self) -> f64 {
        self.coords.iter().map(|&[x, y, z]| x * x * x + y * z).sum()
    }
}

impl MolecularSystem for Quadratic {
    fn atom_count(&self) -> usize {
        self.coords.len()
    }

    fn coordinates(&self) -> &[[f64; 3]] {
        &self.coords
    }

    fn set_coordinates(&mut self, coords: &[[f64; 3]]) -> Result<(), Error> {
        if coords.len() != self.coords.len() {
            return Err(Error::AtomCountMismatch {
                expected: self.coords.len(),
                found: coords.len(),
            });
        }
        if self.write_limit.is_some_and(|limit| self.coordinate_writes >= limit) {
            return Err(Error::evaluation(Term::Total, "coordinates are read-only"));
        }
        self.coords.copy_from_slice(coords);
        self.coordinate_writes += 1;
        Ok(())
    }

    fn energy(&mut self, term: Term) -> Result<f64, Error> {
        self.energy_calls += 1;
        Ok(match term {
            Term::Bond => self.bond_energy(),
            Term::Angle => self.angle_energy(),
            Term::Total => self.bond_energy() + self.angle_energy(),
            _ => 0.0,
        })
    }

    fn gradient(&mut self, term: Term, out: &mut GradientBuffer) -> Result<(), Error> {
        if out.atom_count() != self.coords.len() {
            return Err(Error::AtomCountMismatch {
                expected: self.coords.len(),
                found: out.atom_count(),
            });
        }
        out.fill_zero();
        let bond = match term {
            Term::Bond => !self.broken_bond_gradient,
            Term::Total => true,
            _ => false,
        };
        let angle = matches!(term, Term::Angle | Term::Total);
        for (i, &[x, y, z]) in self.coords.iter().enumerate() {
            if bond {
                out.add_row(i, [2.0 * x + y, 4.0 * y + x, 6.0 * z]);
            }
            if angle {
                out.add_row(i, [3.0 * x * x, z, y]);
            }
        }
        Ok(())
    }

    fn polarizable_sites(&self) -> Vec<usize> {
        self.polarizable
            .iter()
            .enumerate()
            .filter_map(|(i, &p)| p.then_some(i))
            .collect()
    }

    fn disable_polarizability(&mut self, atoms: &[usize]) -> Result<(), Error> {
        for &i in atoms {
            let count = self.polarizable.len();
            let slot = self
                .polarizable
                .get_mut(i)
                .ok_or(Error::AtomOutOfRange { index: i, count })?;
            *slot = false;
        }
        Ok(())
    }
}

/// Two-atom QM region for [`Quadratic`] MM systems.
///
/// The cross energy is linear in the position of MM atom 0, so its gradient
/// is constant. The link correction moves the whole gradient of QM atom 1
/// onto QM atom 0 and records the buffer it was handed.
pub struct ToyQm {
    link: bool,
    seen: RefCell<Option<GradientBuffer>>,
}

impl ToyQm {
    pub const VDW_QM_ROW: [f64; 3] = [0.5, -0.25, 0.125];
    const VDW_MM_ROW: [f64; 3] = [-1.0, 0.5, -0.25];

    pub fn new(link: bool) -> Self {
        Self {
            link,
            seen: RefCell::new(None),
        }
    }

    pub fn seen_pre_correction(&self) -> Option<GradientBuffer> {
        self.seen.borrow().clone()
    }
}

impl QmHelper<Quadratic> for ToyQm {
    fn qm_atom_count(&self) -> usize {
        2
    }

    fn uses_link_atoms(&self) -> bool {
        self.link
    }

    fn vdw_energy(&self, mm: &Quadratic) -> Result<f64, Error> {
        let p = mm.coordinates()[0];
        Ok((0..3).map(|k| Self::VDW_MM_ROW[k] * p[k]).sum())
    }

    fn vdw_geomgrad(
        &self,
        mm: &Quadratic,
        qm_out: &mut GradientBuffer,
        mm_out: &mut GradientBuffer,
    ) -> Result<(), Error> {
        if mm_out.atom_count() != mm.atom_count() {
            return Err(Error::AtomCountMismatch {
                expected: mm.atom_count(),
                found: mm_out.atom_count(),
            });
        }
        qm_out.fill_zero();
        mm_out.fill_zero();
        for i in 0..qm_out.atom_count() {
            qm_out.add_row(i, Self::VDW_QM_ROW);
        }
        mm_out.add_row(0, Self::VDW_MM_ROW);
        Ok(())
    }

    fn link_atom_geomgrad(
        &self,
        _mm: &Quadratic,
        qm_out: &mut GradientBuffer,
        mm_out: &mut GradientBuffer,
        pre_correction_qm: &GradientBuffer,
    ) -> Result<(), Error> {
        *self.seen.borrow_mut() = Some(pre_correction_qm.clone());
        qm_out.fill_zero();
        mm_out.fill_zero();
        let [x, y, z] = pre_correction_qm[1];
        qm_out.add_row(1, [-x, -y, -z]);
        qm_out.add_row(0, [x, y, z]);
        Ok(())
    }

    fn build_shadow(&self) -> Result<Quadratic, Error> {
        Ok(Quadratic::new(vec![[0.3, -0.2, 0.1], [1.2, 0.4, -0.5]]))
    }
}

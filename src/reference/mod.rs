//! Reference polarizable force field.
//!
//! [`ReferenceSystem`] is a small, self-contained classical evaluator in
//! atomic units (bohr, hartree) implementing [`MolecularSystem`]. It exists so
//! that the harness has a real engine to validate: every term's gradient is
//! written out analytically and independently of its energy.
//!
//! | Term | Functional form |
//! |------|-----------------|
//! | `FixedElec` | `q_i q_j s_ij / r` |
//! | `PolElec` | `−½ Σ μ_i · E⁰_i`, induced point dipoles |
//! | `Vdw` | `ε[(r_m/r)¹² − 2(r_m/r)⁶]` |
//! | `Bond`, `Urey` | `k (r − r₀)²` |
//! | `Angle` | `k (θ − θ₀)²` |
//! | `StrBnd` | `(k₁Δr₁ + k₂Δr₂)Δθ` |
//! | `Torsion`, `ImpTorsion` | `Σ V (1 + cos(nφ − γ))` |
//!
//! `Opb`, `PiTors`, `TorTor`, `StrTor` and `AngTor` are not parameterized:
//! their energy and gradient are identically zero.
//!
//! Nonbonded pairs separated by one, two or three bonds are scaled by the
//! factors of [`ScalingSpec`]. A QM region attached to a reference system is
//! described by [`QmRegion`].

mod bonded;
mod error;
mod nonbonded;
mod polarization;
mod qm;
mod spec;
mod topology;

pub use error::Error;
pub use nonbonded::NonbondedAtom;
pub use qm::{Link, QmRegion};
pub use spec::{
    AngleSpec, AtomSpec, BondSpec, FourierSpec, LengthUnit, LinkSpec, PolarizationSpec, QmSpec,
    ScalingSpec, SolverKind, StrBndSpec, SystemSpec, TorsionSpec, UreySpec,
};
pub use topology::Topology;

use tracing::trace;

use crate::check;
use crate::model::gradient::GradientBuffer;
use crate::model::system::MolecularSystem;
use crate::model::term::Term;
use bonded::{Angle, Bond, ImpTorsion, StrBnd, Torsion, Urey};
use polarization::{Induced, Polarizable};

#[derive(Debug, Clone)]
struct ValenceTerms {
    bonds: Vec<Bond>,
    angles: Vec<Angle>,
    strbnds: Vec<StrBnd>,
    ureys: Vec<Urey>,
    torsions: Vec<Torsion>,
    imptorsions: Vec<ImpTorsion>,
}

/// A classical system evaluated by the reference force field.
#[derive(Debug, Clone)]
pub struct ReferenceSystem {
    coords: Vec<[f64; 3]>,
    atoms: Vec<NonbondedAtom>,
    polarizability: Vec<f64>,
    valence: ValenceTerms,
    scaling: ScalingSpec,
    polarization: PolarizationSpec,
    topology: Topology,
    external_field: Option<Vec<[f64; 3]>>,
    induced: Option<Induced>,
}

impl ReferenceSystem {
    /// Builds a system from a description, converting it to atomic units.
    ///
    /// A `[qm]` section, if any, is ignored here; see [`QmRegion::new`].
    pub fn from_spec(spec: &SystemSpec) -> Result<Self, Error> {
        spec.validate()?;
        let spec = spec.clone().into_atomic_units();

        let bonds: Vec<Bond> = spec.bonds.iter().map(Bond::from).collect();
        let topology = Topology::from_bonds(
            spec.atoms.len(),
            bonds.iter().map(|b| (b.atoms[0], b.atoms[1])),
        );

        Ok(Self {
            coords: spec.atoms.iter().map(|a| a.position).collect(),
            atoms: spec
                .atoms
                .iter()
                .map(|a| NonbondedAtom {
                    charge: a.charge,
                    vdw_radius: a.vdw_radius,
                    vdw_epsilon: a.vdw_epsilon,
                })
                .collect(),
            polarizability: spec.atoms.iter().map(|a| a.polarizability).collect(),
            valence: ValenceTerms {
                bonds,
                angles: spec.angles.iter().map(Angle::from).collect(),
                strbnds: spec.strbnds.iter().map(StrBnd::from).collect(),
                ureys: spec.ureys.iter().map(Urey::from).collect(),
                torsions: spec.torsions.iter().map(Torsion::from).collect(),
                imptorsions: spec.imptorsions.iter().map(ImpTorsion::from).collect(),
            },
            scaling: spec.scaling,
            polarization: spec.polarization,
            topology,
            external_field: None,
            induced: None,
        })
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, Error> {
        Self::from_spec(&SystemSpec::from_toml_str(toml)?)
    }

    /// Sets a constant external field, one row per atom, added to the
    /// field polarizing each site.
    pub fn set_external_field(&mut self, field: Option<Vec<[f64; 3]>>) -> Result<(), Error> {
        if let Some(rows) = &field {
            if rows.len() != self.coords.len() {
                return Err(Error::FieldShape {
                    expected: self.coords.len(),
                    found: rows.len(),
                });
            }
        }
        self.external_field = field;
        self.induced = None;
        Ok(())
    }

    pub fn atoms(&self) -> &[NonbondedAtom] {
        &self.atoms
    }

    pub fn polarizability(&self) -> &[f64] {
        &self.polarizability
    }

    pub fn scaling(&self) -> &ScalingSpec {
        &self.scaling
    }

    /// Bonded pairs defining the topology.
    pub fn bonds(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.valence.bonds.iter().map(|b| (b.atoms[0], b.atoms[1]))
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    fn polarizable(&self) -> Polarizable<'_> {
        Polarizable {
            coords: &self.coords,
            atoms: &self.atoms,
            polarizability: &self.polarizability,
            topology: &self.topology,
            scale: &self.scaling.pol,
            external: self.external_field.as_deref(),
        }
    }

    /// Induced dipoles at the current geometry, solved on first use.
    fn induced(&mut self) -> Result<&Induced, Error> {
        let induced = match self.induced.take() {
            Some(induced) => induced,
            None => {
                let induced = self.polarizable().solve(&self.polarization)?;
                trace!(sites = induced.sites.len(), "induced dipoles solved");
                induced
            }
        };
        Ok(self.induced.insert(induced))
    }

    fn term_energy(&mut self, term: Term) -> Result<f64, Error> {
        let c = &self.coords;
        match term {
            Term::FixedElec => {
                nonbonded::coulomb_energy(c, &self.atoms, &self.topology, &self.scaling.elec)
            }
            Term::PolElec => Ok(self.induced()?.energy()),
            Term::Vdw => nonbonded::vdw_energy(c, &self.atoms, &self.topology, &self.scaling.vdw),
            Term::Bond => bonded::total_energy(&self.valence.bonds, c),
            Term::Angle => bonded::total_energy(&self.valence.angles, c),
            Term::StrBnd => bonded::total_energy(&self.valence.strbnds, c),
            Term::Urey => bonded::total_energy(&self.valence.ureys, c),
            Term::Torsion => bonded::total_energy(&self.valence.torsions, c),
            Term::ImpTorsion => bonded::total_energy(&self.valence.imptorsions, c),
            Term::Opb | Term::PiTors | Term::TorTor | Term::StrTor | Term::AngTor => Ok(0.0),
            Term::Total => {
                let mut total = 0.0;
                for t in Term::INDIVIDUAL {
                    total += self.term_energy(t)?;
                }
                Ok(total)
            }
        }
    }

    /// Adds the gradient of `term` into `out`.
    fn term_gradient(&mut self, term: Term, out: &mut GradientBuffer) -> Result<(), Error> {
        match term {
            Term::FixedElec => nonbonded::coulomb_gradient(
                &self.coords,
                &self.atoms,
                &self.topology,
                &self.scaling.elec,
                out,
            ),
            Term::PolElec => {
                self.induced()?;
                match &self.induced {
                    Some(induced) => self.polarizable().gradient(induced, out),
                    None => Ok(()),
                }
            }
            Term::Vdw => nonbonded::vdw_gradient(
                &self.coords,
                &self.atoms,
                &self.topology,
                &self.scaling.vdw,
                out,
            ),
            Term::Bond => bonded::accumulate_gradient(&self.valence.bonds, &self.coords, out),
            Term::Angle => bonded::accumulate_gradient(&self.valence.angles, &self.coords, out),
            Term::StrBnd => bonded::accumulate_gradient(&self.valence.strbnds, &self.coords, out),
            Term::Urey => bonded::accumulate_gradient(&self.valence.ureys, &self.coords, out),
            Term::Torsion => bonded::accumulate_gradient(&self.valence.torsions, &self.coords, out),
            Term::ImpTorsion => {
                bonded::accumulate_gradient(&self.valence.imptorsions, &self.coords, out)
            }
            Term::Opb | Term::PiTors | Term::TorTor | Term::StrTor | Term::AngTor => Ok(()),
            Term::Total => {
                for t in Term::INDIVIDUAL {
                    self.term_gradient(t, out)?;
                }
                Ok(())
            }
        }
    }
}

/// Builds the classical system of `spec` and, if it has a `[qm]` section,
/// the QM region attached to it.
pub fn build(spec: &SystemSpec) -> Result<(ReferenceSystem, Option<QmRegion>), Error> {
    let mm = ReferenceSystem::from_spec(spec)?;
    let qm = match &spec.qm {
        Some(qm) => Some(QmRegion::new(qm, &mm)?),
        None => None,
    };
    Ok((mm, qm))
}

fn ensure_rows(expected: usize, found: usize) -> Result<(), check::Error> {
    if expected != found {
        return Err(check::Error::AtomCountMismatch { expected, found });
    }
    Ok(())
}

impl MolecularSystem for ReferenceSystem {
    fn atom_count(&self) -> usize {
        self.coords.len()
    }

    fn coordinates(&self) -> &[[f64; 3]] {
        &self.coords
    }

    fn set_coordinates(&mut self, coords: &[[f64; 3]]) -> Result<(), check::Error> {
        ensure_rows(self.coords.len(), coords.len())?;
        self.coords.copy_from_slice(coords);
        self.induced = None;
        Ok(())
    }

    fn energy(&mut self, term: Term) -> Result<f64, check::Error> {
        self.term_energy(term)
            .map_err(|e| check::Error::evaluation(term, e.to_string()))
    }

    fn gradient(&mut self, term: Term, out: &mut GradientBuffer) -> Result<(), check::Error> {
        ensure_rows(self.coords.len(), out.atom_count())?;
        out.fill_zero();
        self.term_gradient(term, out)
            .map_err(|e| check::Error::evaluation(term, e.to_string()))
    }

    fn polarizable_sites(&self) -> Vec<usize> {
        (0..self.polarizability.len())
            .filter(|&i| self.polarizability[i] > 0.0)
            .collect()
    }

    fn disable_polarizability(&mut self, atoms: &[usize]) -> Result<(), check::Error> {
        let count = self.polarizability.len();
        for &i in atoms {
            if i >= count {
                return Err(check::Error::AtomOutOfRange { index: i, count });
            }
        }
        for &i in atoms {
            self.polarizability[i] = 0.0;
        }
        self.induced = None;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures;

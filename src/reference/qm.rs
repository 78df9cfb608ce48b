//! QM region embedded in a reference system.
//!
//! The QM side is fixed: its coordinates never move during a validation run,
//! and only the MM side is perturbed. Covalent QM/MM boundaries are capped by
//! link atoms placed on the `Q → M` bond at a fixed distance from `Q`.

use nalgebra::{Matrix3, Vector3};

use super::bonded::{pos, push, stretch};
use super::error::Error;
use super::nonbonded::{LjPair, NonbondedAtom};
use super::spec::{QmSpec, SystemSpec};
use super::topology::Topology;
use super::ReferenceSystem;
use crate::check;
use crate::model::gradient::GradientBuffer;
use crate::model::system::{MolecularSystem, QmHelper};
use crate::model::term::Term;

type V3 = Vector3<f64>;

/// Covalent QM/MM boundary, capped by a link atom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    /// QM boundary atom, in the QM region.
    pub qm: usize,
    /// MM boundary atom, in the MM system.
    pub mm: usize,
    /// Link atom, in the QM region.
    pub link: usize,
    /// `|L − Q|`, in bohr.
    pub distance: f64,
}

#[derive(Debug, Clone)]
pub struct QmRegion {
    coords: Vec<[f64; 3]>,
    atoms: Vec<NonbondedAtom>,
    links: Vec<Link>,
    is_link: Vec<bool>,
    mm_atoms: usize,
    /// Separations over MM atoms followed by QM atoms.
    topology: Topology,
    vdw_scale: [f64; 3],
    shadow: SystemSpec,
}

impl QmRegion {
    /// Builds the QM region attached to `mm`, placing every link atom.
    pub fn new(spec: &QmSpec, mm: &ReferenceSystem) -> Result<Self, Error> {
        let mm_atoms = mm.atom_count();
        spec.validate(mm_atoms)?;
        let spec = spec.clone().into_atomic_units();

        let mut shadow = spec.system.clone();
        let mut links = Vec::with_capacity(spec.links.len());
        for l in &spec.links {
            let link = Link {
                qm: l.qm,
                mm: l.mm,
                link: l.link,
                distance: spec.link_distance(l),
            };
            let q = V3::from(shadow.atoms[l.qm].position);
            let s = stretch(pos(mm.coordinates(), l.mm), q, "link")?;
            let placed = q + s.unit * link.distance;
            shadow.atoms[l.link].position = [placed.x, placed.y, placed.z];
            links.push(link);
        }

        let qm_atoms = shadow.atoms.len();
        let mut is_link = vec![false; qm_atoms];
        for l in &links {
            is_link[l.link] = true;
        }

        let bonds = mm
            .bonds()
            .chain(
                shadow
                    .bonds
                    .iter()
                    .map(|b| (mm_atoms + b.atoms[0], mm_atoms + b.atoms[1])),
            )
            .chain(links.iter().map(|l| (l.mm, mm_atoms + l.qm)));
        let topology = Topology::from_bonds(mm_atoms + qm_atoms, bonds);

        Ok(Self {
            coords: shadow.atoms.iter().map(|a| a.position).collect(),
            atoms: shadow
                .atoms
                .iter()
                .map(|a| NonbondedAtom {
                    charge: a.charge,
                    vdw_radius: a.vdw_radius,
                    vdw_epsilon: a.vdw_epsilon,
                })
                .collect(),
            links,
            is_link,
            mm_atoms,
            topology,
            vdw_scale: mm.scaling().vdw,
            shadow,
        })
    }

    /// QM coordinates in bohr, link atoms included.
    pub fn coordinates(&self) -> &[[f64; 3]] {
        &self.coords
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn is_link_atom(&self, atom: usize) -> bool {
        self.is_link.get(atom).copied().unwrap_or(false)
    }

    fn check_mm(&self, mm: &ReferenceSystem) -> Result<(), check::Error> {
        if mm.atom_count() != self.mm_atoms {
            return Err(check::Error::AtomCountMismatch {
                expected: self.mm_atoms,
                found: mm.atom_count(),
            });
        }
        Ok(())
    }

    /// Scaled Lennard-Jones pairs between real QM atoms and MM atoms.
    fn vdw_pairs<'a>(
        &'a self,
        mm: &'a ReferenceSystem,
    ) -> impl Iterator<Item = (usize, usize, f64, LjPair)> + 'a {
        (0..self.coords.len())
            .filter(move |&a| !self.is_link[a])
            .flat_map(move |a| {
                mm.atoms().iter().enumerate().filter_map(move |(m, atom)| {
                    let f = self.topology.factor(m, self.mm_atoms + a, &self.vdw_scale);
                    let lj = LjPair::combine(&self.atoms[a], atom);
                    (f != 0.0 && !lj.is_zero()).then_some((a, m, f, lj))
                })
            })
    }
}

fn vdw_failure(e: Error) -> check::Error {
    check::Error::evaluation(Term::Vdw, e.to_string())
}

fn ensure_rows(buffer: &GradientBuffer, expected: usize) -> Result<(), check::Error> {
    if buffer.atom_count() != expected {
        return Err(check::Error::AtomCountMismatch {
            expected,
            found: buffer.atom_count(),
        });
    }
    Ok(())
}

impl QmHelper<ReferenceSystem> for QmRegion {
    fn qm_atom_count(&self) -> usize {
        self.coords.len()
    }

    fn uses_link_atoms(&self) -> bool {
        !self.links.is_empty()
    }

    fn vdw_energy(&self, mm: &ReferenceSystem) -> Result<f64, check::Error> {
        self.check_mm(mm)?;
        let mut energy = 0.0;
        for (a, m, f, lj) in self.vdw_pairs(mm) {
            let s = stretch(pos(&self.coords, a), pos(mm.coordinates(), m), "qmmm-vdw")
                .map_err(vdw_failure)?;
            energy += f * lj.energy(s.r);
        }
        Ok(energy)
    }

    fn vdw_geomgrad(
        &self,
        mm: &ReferenceSystem,
        qm_out: &mut GradientBuffer,
        mm_out: &mut GradientBuffer,
    ) -> Result<(), check::Error> {
        self.check_mm(mm)?;
        ensure_rows(qm_out, self.coords.len())?;
        ensure_rows(mm_out, self.mm_atoms)?;
        qm_out.fill_zero();
        mm_out.fill_zero();
        for (a, m, f, lj) in self.vdw_pairs(mm) {
            let s = stretch(pos(&self.coords, a), pos(mm.coordinates(), m), "qmmm-vdw")
                .map_err(vdw_failure)?;
            let g = s.unit * (f * lj.derivative(s.r));
            push(qm_out, a, g);
            push(mm_out, m, -g);
        }
        Ok(())
    }

    fn link_atom_geomgrad(
        &self,
        mm: &ReferenceSystem,
        qm_out: &mut GradientBuffer,
        mm_out: &mut GradientBuffer,
        pre_correction_qm: &GradientBuffer,
    ) -> Result<(), check::Error> {
        self.check_mm(mm)?;
        ensure_rows(qm_out, self.coords.len())?;
        ensure_rows(mm_out, self.mm_atoms)?;
        ensure_rows(pre_correction_qm, self.coords.len())?;
        qm_out.fill_zero();
        mm_out.fill_zero();

        for l in &self.links {
            let s = stretch(pos(mm.coordinates(), l.mm), pos(&self.coords, l.qm), "link")
                .map_err(|e| check::Error::evaluation(Term::Total, e.to_string()))?;
            let g_link = V3::from(pre_correction_qm[l.link]);
            // dL/dM = (d/R)(I − uuᵀ), dL/dQ = I − dL/dM.
            let to_mm = (Matrix3::identity() - s.unit * s.unit.transpose()) * (l.distance / s.r);
            let on_mm = to_mm * g_link;
            push(qm_out, l.link, -g_link);
            push(qm_out, l.qm, g_link - on_mm);
            push(mm_out, l.mm, on_mm);
        }
        Ok(())
    }

    fn build_shadow(&self) -> Result<ReferenceSystem, check::Error> {
        ReferenceSystem::from_spec(&self.shadow)
            .map_err(|e| check::Error::evaluation(Term::Total, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{Check, Composer, DEFAULT_STEP, Session, TolerancePolicy, ValidationConfig};
    use crate::model::units::ANG2AU;
    use crate::reference::fixtures;

    #[test]
    fn link_atoms_sit_on_the_boundary_bond() {
        let (mm, qm) = fixtures::qmmm_system();
        let l = qm.links()[0];
        let q = V3::from(qm.coordinates()[l.qm]);
        let m = pos(mm.coordinates(), l.mm);
        let placed = V3::from(qm.coordinates()[l.link]);
        assert!(((placed - q).norm() - 1.1 * ANG2AU).abs() < 1e-12);
        let along = (m - q).normalize();
        assert!(((placed - q).normalize() - along).norm() < 1e-12);
        assert!(qm.is_link_atom(l.link));
        assert!(!qm.is_link_atom(l.qm));
    }

    #[test]
    fn link_atoms_do_not_take_part_in_the_cross_term() {
        let (mm, qm) = fixtures::qmmm_system();
        let mut g_qm = GradientBuffer::zeros(qm.qm_atom_count());
        let mut g_mm = GradientBuffer::zeros(mm.atom_count());
        qm.vdw_geomgrad(&mm, &mut g_qm, &mut g_mm).unwrap();
        let link = qm.links()[0].link;
        assert_eq!(g_qm[link], [0.0; 3]);
        assert!(g_qm.iter().any(|r| *r != [0.0; 3]));
    }

    #[test]
    fn cross_term_is_translation_invariant() {
        let (mm, qm) = fixtures::qmmm_system();
        let mut g_qm = GradientBuffer::zeros(qm.qm_atom_count());
        let mut g_mm = GradientBuffer::zeros(mm.atom_count());
        qm.vdw_geomgrad(&mm, &mut g_qm, &mut g_mm).unwrap();
        let (a, b) = (g_qm.net(), g_mm.net());
        for k in 0..3 {
            assert!((a[k] + b[k]).abs() < 1e-15);
        }
    }

    #[test]
    fn link_correction_moves_the_link_gradient_onto_its_boundary_atoms() {
        let (mm, qm) = fixtures::qmmm_system();
        let n_qm = qm.qm_atom_count();
        let mut pre = GradientBuffer::zeros(n_qm);
        for (i, row) in pre.rows_mut().iter_mut().enumerate() {
            *row = [0.01 * i as f64, -0.02, 0.005 * (i as f64 - 1.0)];
        }
        let mut c_qm = GradientBuffer::zeros(n_qm);
        let mut c_mm = GradientBuffer::zeros(mm.atom_count());
        qm.link_atom_geomgrad(&mm, &mut c_qm, &mut c_mm, &pre).unwrap();

        let l = qm.links()[0];
        for a in 0..n_qm {
            if a != l.qm && a != l.link {
                assert_eq!(c_qm[a], [0.0; 3]);
            }
        }
        for m in 0..mm.atom_count() {
            if m != l.mm {
                assert_eq!(c_mm[m], [0.0; 3]);
            }
        }
        for k in 0..3 {
            assert_eq!(c_qm[l.link][k], -pre[l.link][k]);
            let net = c_qm[l.link][k] + c_qm[l.qm][k] + c_mm[l.mm][k];
            assert!(net.abs() < 1e-15);
        }
    }

    #[test]
    fn wrong_buffers_are_rejected() {
        let (mm, qm) = fixtures::qmmm_system();
        let mut g_qm = GradientBuffer::zeros(qm.qm_atom_count() + 1);
        let mut g_mm = GradientBuffer::zeros(mm.atom_count());
        let err = qm.vdw_geomgrad(&mm, &mut g_qm, &mut g_mm).unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn shadow_mirrors_the_qm_region() {
        let (_, qm) = fixtures::qmmm_system();
        let shadow = qm.build_shadow().unwrap();
        assert_eq!(shadow.atom_count(), qm.qm_atom_count());
        assert_eq!(shadow.coordinates(), qm.coordinates());
        assert!(!shadow.polarizable_sites().is_empty());
    }

    #[test]
    fn every_qmmm_check_passes() {
        let (mm, qm) = fixtures::qmmm_system();
        let mut session = Session::with_qm(mm, Box::new(qm)).unwrap();
        assert!(session.shadow().unwrap().polarizable_sites().is_empty());
        let report = session.validate(&ValidationConfig::default()).unwrap();
        assert_eq!(report.results().len(), 17);
        for r in report.results() {
            assert!(
                r.passed(),
                "{}: {:e} > {:e}",
                r.check(),
                r.max_deviation(),
                r.threshold()
            );
        }
    }

    #[test]
    fn qmmm_vdw_gradient_reaches_mm_atoms() {
        let (mm, qm) = fixtures::qmmm_system();
        let mut session = Session::with_qm(mm, Box::new(qm)).unwrap();
        let policy = TolerancePolicy::default();
        let r = session
            .run_check(Check::QmmmVdw, DEFAULT_STEP, &policy)
            .unwrap();
        assert!(r.max_deviation() < 1e-10);
        let composed = session.composer().qmmm_vdw().unwrap();
        assert!(composed.mm.iter().any(|row| *row != [0.0; 3]));
    }

    #[test]
    fn composed_total_runs_the_link_stage() {
        let (mut mm, qm) = fixtures::qmmm_system();
        let mut shadow = qm.build_shadow().unwrap();
        let sites = shadow.polarizable_sites();
        shadow.disable_polarizability(&sites).unwrap();

        let l = qm.links()[0];
        let helper: &dyn QmHelper<ReferenceSystem> = &qm;
        let mut composer = Composer::new(&mut mm, Some(helper), Some(&mut shadow));
        let total = composer.total().unwrap();
        assert_eq!(total.qm[l.link], [0.0; 3]);
    }

    #[test]
    fn qm_region_without_links_has_no_shadow() {
        let (mm, qm) = fixtures::qmmm_system_without_links();
        assert!(!qm.uses_link_atoms());
        let mut session = Session::with_qm(mm, Box::new(qm)).unwrap();
        assert!(session.shadow().is_none());
        assert!(!session.available_checks().contains(&Check::ShadowInternal));

        let report = session.validate(&ValidationConfig::default()).unwrap();
        assert_eq!(report.results().len(), 16);
        assert!(report.all_passed(), "{}", report.status());
        assert!(report.get(Check::QmmmVdw).is_some());

        let total = session.compose().unwrap();
        assert_eq!(total.qm.atom_count(), 1);
    }
}

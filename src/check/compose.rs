//! QM/MM gradient composition.
//!
//! The total gradient of a QM/MM partition is assembled from analytic
//! primitives in a fixed order of [`Stage`]s. The order matters: the link-atom
//! correction redistributes the gradient found on each link atom, so it must
//! see the QM gradient after every other contribution has been added.

use tracing::debug;

use super::error::Error;
use crate::model::gradient::GradientBuffer;
use crate::model::system::{MolecularSystem, QmHelper};
use crate::model::term::Term;

/// One step of the composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FixedElec,
    PolElec,
    Valence(Term),
    Vdw,
    /// QM–MM van der Waals cross term, added to both buffers.
    QmmmVdw,
    /// Internal gradient of the shadow QM region, added to the QM buffer.
    ShadowInternal,
    /// Link-atom redistribution, added to both buffers.
    LinkAtomCorrection,
}

/// Gradients on the MM atoms and on the QM atoms.
#[derive(Debug, Clone, PartialEq)]
pub struct QmmmGradient {
    pub mm: GradientBuffer,
    pub qm: GradientBuffer,
}

impl QmmmGradient {
    pub fn zeros(mm_atoms: usize, qm_atoms: usize) -> Self {
        Self {
            mm: GradientBuffer::zeros(mm_atoms),
            qm: GradientBuffer::zeros(qm_atoms),
        }
    }
}

/// Borrows the real system, the QM helper and the shadow system for the
/// duration of one composition.
pub struct Composer<'a, S: MolecularSystem> {
    system: &'a mut S,
    qm: Option<&'a dyn QmHelper<S>>,
    shadow: Option<&'a mut S>,
}

impl<'a, S: MolecularSystem> Composer<'a, S> {
    /// Composer for a purely classical system.
    pub fn mm_only(system: &'a mut S) -> Self {
        Self {
            system,
            qm: None,
            shadow: None,
        }
    }

    pub fn new(
        system: &'a mut S,
        qm: Option<&'a dyn QmHelper<S>>,
        shadow: Option<&'a mut S>,
    ) -> Self {
        Self { system, qm, shadow }
    }

    fn qm_atoms(&self) -> usize {
        self.qm.map_or(0, |q| q.qm_atom_count())
    }

    fn uses_link_atoms(&self) -> bool {
        self.qm.is_some_and(|q| q.uses_link_atoms())
    }

    /// Stages run by [`total`](Composer::total), in order.
    pub fn plan(&self) -> Vec<Stage> {
        let mut stages = vec![Stage::FixedElec, Stage::PolElec];
        stages.extend(Term::VALENCE.into_iter().map(Stage::Valence));
        stages.push(Stage::Vdw);
        if self.qm.is_some() {
            stages.push(Stage::QmmmVdw);
            if self.uses_link_atoms() {
                stages.push(Stage::ShadowInternal);
                stages.push(Stage::LinkAtomCorrection);
            }
        }
        stages
    }

    /// Full QM/MM gradient. Without a QM region the QM buffer is empty and
    /// the MM buffer holds the classical total.
    pub fn total(&mut self) -> Result<QmmmGradient, Error> {
        let mut acc = QmmmGradient::zeros(self.system.atom_count(), self.qm_atoms());
        for stage in self.plan() {
            debug!(?stage, "composing");
            self.run_stage(stage, &mut acc)?;
        }
        Ok(acc)
    }

    fn run_stage(&mut self, stage: Stage, acc: &mut QmmmGradient) -> Result<(), Error> {
        match stage {
            Stage::FixedElec => self.add_mm_term(Term::FixedElec, acc),
            Stage::PolElec => self.add_mm_term(Term::PolElec, acc),
            Stage::Valence(term) => self.add_mm_term(term, acc),
            Stage::Vdw => self.add_mm_term(Term::Vdw, acc),
            Stage::QmmmVdw => {
                let part = self.qmmm_vdw()?;
                acc.mm.add_assign(&part.mm)?;
                acc.qm.add_assign(&part.qm)
            }
            Stage::ShadowInternal => {
                let part = self.shadow_internal()?;
                acc.qm.add_assign(&part.qm)
            }
            Stage::LinkAtomCorrection => {
                let part = self.link_atom_correction(&acc.qm)?;
                acc.mm.add_assign(&part.mm)?;
                acc.qm.add_assign(&part.qm)
            }
        }
    }

    fn add_mm_term(&mut self, term: Term, acc: &mut QmmmGradient) -> Result<(), Error> {
        let mut part = GradientBuffer::zeros(self.system.atom_count());
        self.system.gradient(term, &mut part)?;
        acc.mm.add_assign(&part)
    }

    /// QM–MM van der Waals contribution alone.
    pub fn qmmm_vdw(&mut self) -> Result<QmmmGradient, Error> {
        let qm = self.qm.ok_or(Error::MissingQmRegion("qmmm-vdw"))?;
        let mut part = QmmmGradient::zeros(self.system.atom_count(), qm.qm_atom_count());
        qm.vdw_geomgrad(&*self.system, &mut part.qm, &mut part.mm)?;
        Ok(part)
    }

    /// Internal gradient of the shadow system, on the QM atoms.
    ///
    /// The MM field does not act on the shadow's static charges and its
    /// polarizability is off, so polarization is only counted once, in the
    /// real system.
    pub fn shadow_internal(&mut self) -> Result<QmmmGradient, Error> {
        let qm_atoms = self.qm_atoms();
        let shadow = self.shadow.as_deref_mut().ok_or(Error::MissingShadow)?;
        let mut part = QmmmGradient::zeros(self.system.atom_count(), qm_atoms);
        shadow.full_gradient(&mut part.qm)?;
        Ok(part)
    }

    /// Link-atom correction given an explicit pre-correction QM gradient.
    pub fn link_atom_correction(
        &mut self,
        pre_correction_qm: &GradientBuffer,
    ) -> Result<QmmmGradient, Error> {
        let qm = self.qm.ok_or(Error::MissingQmRegion("link-atom"))?;
        let mut part = QmmmGradient::zeros(self.system.atom_count(), qm.qm_atom_count());
        part.qm.ensure_same_shape(pre_correction_qm)?;
        if qm.uses_link_atoms() {
            qm.link_atom_geomgrad(
                &*self.system,
                &mut part.qm,
                &mut part.mm,
                pre_correction_qm,
            )?;
        }
        Ok(part)
    }

    /// Link-atom correction for the QM gradient made of the van der Waals
    /// cross term and the shadow internal gradient.
    pub fn link_atom_stage(&mut self) -> Result<QmmmGradient, Error> {
        let mut pre = self.qmmm_vdw()?.qm;
        pre.add_assign(&self.shadow_internal()?.qm)?;
        self.link_atom_correction(&pre)
    }
}

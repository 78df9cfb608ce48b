//! Validation driver.
//!
//! A [`Session`] owns the system under test, the optional QM region and, when
//! that region uses link atoms, the shadow system built from it. Everything it
//! owns is dropped with it, on every exit path.

use tracing::{info, warn};

use super::compare::{max_abs, signed_deviations};
use super::compose::{Composer, QmmmGradient};
use super::config::ValidationConfig;
use super::error::Error;
use super::numerical::{numerical_gradient, numerical_term_gradient};
use super::report::{TermResult, ValidationReport};
use super::tolerance::{Check, TolerancePolicy};
use crate::model::gradient::GradientBuffer;
use crate::model::system::{MolecularSystem, QmHelper};
use crate::model::term::Term;

pub struct Session<S: MolecularSystem> {
    system: S,
    qm: Option<Box<dyn QmHelper<S>>>,
    shadow: Option<S>,
}

impl<S: MolecularSystem> Session<S> {
    /// Session over a purely classical system.
    pub fn new(system: S) -> Self {
        Self {
            system,
            qm: None,
            shadow: None,
        }
    }

    /// Session over a QM/MM partition.
    ///
    /// With link atoms the shadow system is built here, once, and every one
    /// of its polarizable sites is switched off before it is ever evaluated.
    /// Without link atoms no shadow exists.
    pub fn with_qm(system: S, qm: Box<dyn QmHelper<S>>) -> Result<Self, Error> {
        let shadow = if qm.uses_link_atoms() {
            let mut shadow = qm.build_shadow()?;
            let sites = shadow.polarizable_sites();
            shadow.disable_polarizability(&sites)?;
            info!(
                qm_atoms = qm.qm_atom_count(),
                disabled = sites.len(),
                "shadow system ready"
            );
            Some(shadow)
        } else {
            info!(qm_atoms = qm.qm_atom_count(), "QM region without link atoms");
            None
        };
        Ok(Self {
            system,
            qm: Some(qm),
            shadow,
        })
    }

    pub fn system(&self) -> &S {
        &self.system
    }

    pub fn system_mut(&mut self) -> &mut S {
        &mut self.system
    }

    pub fn qm(&self) -> Option<&dyn QmHelper<S>> {
        self.qm.as_deref()
    }

    pub fn shadow(&self) -> Option<&S> {
        self.shadow.as_ref()
    }

    /// Every check this session can run, in report order.
    pub fn available_checks(&self) -> Vec<Check> {
        let mut checks: Vec<Check> = Check::mm_checks().collect();
        if let Some(qm) = &self.qm {
            checks.push(Check::QmmmVdw);
            if qm.uses_link_atoms() {
                checks.push(Check::ShadowInternal);
            }
        }
        checks
    }

    /// Composer over the owned system, QM region and shadow.
    pub fn composer(&mut self) -> Composer<'_, S> {
        Composer::new(&mut self.system, self.qm.as_deref(), self.shadow.as_mut())
    }

    /// Fully composed analytic QM/MM gradient.
    pub fn compose(&mut self) -> Result<QmmmGradient, Error> {
        self.composer().total()
    }

    /// Runs every check selected by `config`.
    ///
    /// Failing checks do not stop the run; only errors do.
    pub fn validate(&mut self, config: &ValidationConfig) -> Result<ValidationReport, Error> {
        self.validate_with(config, |_| {})
    }

    /// Like [`Session::validate`], calling `on_check` before each check runs.
    pub fn validate_with<F>(
        &mut self,
        config: &ValidationConfig,
        mut on_check: F,
    ) -> Result<ValidationReport, Error>
    where
        F: FnMut(Check),
    {
        let checks = config.checks(&self.available_checks())?;
        let policy = config.policy()?;
        let mut report = ValidationReport::new();
        for check in checks {
            on_check(check);
            report.push(self.run_check(check, config.step, &policy)?);
        }
        if report.all_passed() {
            info!(checks = report.results().len(), "all checks passed");
        } else {
            warn!(status = %report.status(), "validation failed");
        }
        Ok(report)
    }

    /// Numerical against analytic gradient for a single check.
    pub fn run_check(
        &mut self,
        check: Check,
        step: f64,
        policy: &TolerancePolicy,
    ) -> Result<TermResult, Error> {
        let (numerical, analytic) = match check {
            Check::Term(term) => {
                let numerical = numerical_term_gradient(&mut self.system, term, step)?;
                let mut analytic = GradientBuffer::zeros(self.system.atom_count());
                self.system.gradient(term, &mut analytic)?;
                (numerical, analytic)
            }
            Check::QmmmVdw => {
                let qm = self
                    .qm
                    .as_deref()
                    .ok_or(Error::MissingQmRegion(check.name()))?;
                let numerical =
                    numerical_gradient(&mut self.system, |s| qm.vdw_energy(s), step)?;
                let analytic = self.composer().qmmm_vdw()?.mm;
                (numerical, analytic)
            }
            Check::ShadowInternal => {
                let shadow = self.shadow.as_mut().ok_or(Error::MissingShadow)?;
                let numerical = numerical_gradient(shadow, |s| s.energy(Term::Total), step)?;
                let mut analytic = GradientBuffer::zeros(shadow.atom_count());
                shadow.full_gradient(&mut analytic)?;
                (numerical, analytic)
            }
        };

        let deviations = signed_deviations(&numerical, &analytic)?;
        let threshold = policy.threshold(check);
        let max_deviation = max_abs(&deviations);
        let passed = policy.accepts(check, max_deviation);
        if passed {
            info!(%check, max_deviation, threshold, "check passed");
        } else {
            warn!(%check, max_deviation, threshold, "check failed");
        }
        Ok(TermResult::new(check, threshold, passed, deviations))
    }
}

use super::compare::max_abs;
use super::tolerance::{Check, FailureCode};
use crate::model::gradient::GradientBuffer;

/// Outcome of validating one check.
#[derive(Debug, Clone)]
pub struct TermResult {
    check: Check,
    max_deviation: f64,
    threshold: f64,
    passed: bool,
    deviations: GradientBuffer,
}

impl TermResult {
    pub fn new(check: Check, threshold: f64, passed: bool, deviations: GradientBuffer) -> Self {
        let max_deviation = max_abs(&deviations);
        Self {
            check,
            max_deviation,
            threshold,
            passed,
            deviations,
        }
    }

    pub fn check(&self) -> Check {
        self.check
    }

    pub fn max_deviation(&self) -> f64 {
        self.max_deviation
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Signed `num − ana`, one row per atom.
    pub fn deviations(&self) -> &GradientBuffer {
        &self.deviations
    }
}

/// Ordered results of one validation run.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    results: Vec<TermResult>,
    status: FailureCode,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: TermResult) {
        if !result.passed {
            self.status.record(result.check);
        }
        self.results.push(result);
    }

    pub fn results(&self) -> &[TermResult] {
        &self.results
    }

    pub fn status(&self) -> FailureCode {
        self.status
    }

    pub fn all_passed(&self) -> bool {
        self.status.is_success()
    }

    pub fn failed(&self) -> impl Iterator<Item = &TermResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    pub fn get(&self, check: Check) -> Option<&TermResult> {
        self.results.iter().find(|r| r.check == check)
    }
}

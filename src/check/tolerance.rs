//! Per-check acceptance thresholds and failure bits.
//!
//! Thresholds are calibrated to the noise floor of each interaction at the
//! default step of `1e-5`: pairwise fixed electrostatics sit close to machine
//! precision, while polarization carries the residual of its own iterative
//! solve into the finite difference. Each check owns one bit of the composite
//! [`FailureCode`]; bit 0 is reserved for generic process failure and is never
//! assigned.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::model::term::{ParseTermError, Term};

/// One validated quantity: an energy term of the MM system or a QM/MM
/// contribution differentiated with respect to MM coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Check {
    Term(Term),
    /// QM–MM van der Waals cross energy, MM side.
    QmmmVdw,
    /// Internal energy of the shadow copy of the QM region.
    ShadowInternal,
}

impl Check {
    pub fn label(self) -> &'static str {
        match self {
            Check::Term(t) => t.label(),
            Check::QmmmVdw => "EVQMMM",
            Check::ShadowInternal => "EQM",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Check::Term(t) => t.name(),
            Check::QmmmVdw => "qmmm-vdw",
            Check::ShadowInternal => "shadow",
        }
    }

    /// Bit position in the composite status.
    pub fn bit(self) -> u32 {
        let rank = match self {
            Check::Term(Term::FixedElec) => 1,
            Check::Term(Term::PolElec) => 2,
            Check::Term(Term::Bond) => 3,
            Check::Term(Term::Angle) => 4,
            Check::Term(Term::Urey) => 5,
            Check::Term(Term::Vdw) => 6,
            Check::Term(Term::StrBnd) => 7,
            Check::Term(Term::Opb) => 8,
            Check::Term(Term::PiTors) => 9,
            Check::Term(Term::Torsion) => 10,
            Check::Term(Term::TorTor) => 11,
            Check::Term(Term::ImpTorsion) => 12,
            Check::Term(Term::StrTor) => 13,
            Check::Term(Term::AngTor) => 14,
            Check::Term(Term::Total) => 15,
            Check::QmmmVdw => 16,
            Check::ShadowInternal => 17,
        };
        1 << rank
    }

    /// Default maximum accepted `|num − ana|`, in atomic units.
    pub fn default_threshold(self) -> f64 {
        match self {
            Check::Term(Term::FixedElec) => 1e-11,
            Check::Term(Term::Vdw) | Check::QmmmVdw => 1e-10,
            _ => 1e-8,
        }
    }

    /// Every check that can run on a system without a QM region.
    pub fn mm_checks() -> impl Iterator<Item = Check> {
        Term::INDIVIDUAL
            .into_iter()
            .chain(std::iter::once(Term::Total))
            .map(Check::Term)
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Check {
    type Err = ParseTermError;

    /// Accepts every [`Term`] spelling plus `qmmm-vdw`/`EVQMMM` and
    /// `shadow`/`EQM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        for extra in [Check::QmmmVdw, Check::ShadowInternal] {
            if trimmed.eq_ignore_ascii_case(extra.name())
                || trimmed.eq_ignore_ascii_case(extra.label())
            {
                return Ok(extra);
            }
        }
        trimmed.parse::<Term>().map(Check::Term)
    }
}

impl From<Term> for Check {
    fn from(term: Term) -> Self {
        Check::Term(term)
    }
}

/// Maps checks to thresholds. Unlisted checks use their default.
#[derive(Debug, Clone, Default)]
pub struct TolerancePolicy {
    overrides: BTreeMap<Check, f64>,
}

impl TolerancePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, check: impl Into<Check>, threshold: f64) -> Self {
        self.set_threshold(check, threshold);
        self
    }

    pub fn set_threshold(&mut self, check: impl Into<Check>, threshold: f64) {
        self.overrides.insert(check.into(), threshold);
    }

    pub fn threshold(&self, check: Check) -> f64 {
        self.overrides
            .get(&check)
            .copied()
            .unwrap_or_else(|| check.default_threshold())
    }

    /// `true` when `deviation` is within the threshold of `check`.
    ///
    /// NaN deviations never pass.
    pub fn accepts(&self, check: Check, deviation: f64) -> bool {
        deviation <= self.threshold(check)
    }
}

/// Bitwise OR of the bits of every failing check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct FailureCode(pub u32);

impl FailureCode {
    pub const SUCCESS: FailureCode = FailureCode(0);

    pub fn record(&mut self, check: Check) {
        self.0 |= check.bit();
    }

    pub fn contains(self, check: Check) -> bool {
        self.0 & check.bit() != 0
    }

    pub fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Folds the code into a process exit status.
    ///
    /// Bits 1–6 map through unchanged; bit 7 is set when any check of rank 7
    /// or above failed. Bit 0 stays clear so a failure code never collides
    /// with the generic error status `1`.
    pub fn exit_byte(self) -> u8 {
        let low = (self.0 & 0x7E) as u8;
        if self.0 & !0x7F != 0 { low | 0x80 } else { low }
    }
}

impl FromIterator<Check> for FailureCode {
    fn from_iter<I: IntoIterator<Item = Check>>(iter: I) -> Self {
        let mut code = FailureCode::SUCCESS;
        for check in iter {
            code.record(check);
        }
        code
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_checks() -> Vec<Check> {
        Check::mm_checks()
            .chain([Check::QmmmVdw, Check::ShadowInternal])
            .collect()
    }

    #[test]
    fn bits_are_unique_and_skip_bit_zero() {
        let checks = all_checks();
        let mut seen = 0u32;
        for c in &checks {
            let bit = c.bit();
            assert_eq!(bit.count_ones(), 1, "{c}");
            assert_ne!(bit, 1, "{c}");
            assert_eq!(seen & bit, 0, "duplicate bit for {c}");
            seen |= bit;
        }
        assert_eq!(checks.len(), 17);
    }

    #[test]
    fn checks_parse_from_names_and_labels() {
        assert_eq!("EVQMMM".parse::<Check>().unwrap(), Check::QmmmVdw);
        assert_eq!("shadow".parse::<Check>().unwrap(), Check::ShadowInternal);
        assert_eq!("eub".parse::<Check>().unwrap(), Check::Term(Term::Urey));
        assert!("nonsense".parse::<Check>().is_err());
    }

    #[test]
    fn default_thresholds_follow_term_precision() {
        let policy = TolerancePolicy::default();
        assert_eq!(policy.threshold(Term::FixedElec.into()), 1e-11);
        assert_eq!(policy.threshold(Term::PolElec.into()), 1e-8);
        assert_eq!(policy.threshold(Term::Bond.into()), 1e-8);
        assert_eq!(policy.threshold(Term::Angle.into()), 1e-8);
        assert_eq!(policy.threshold(Term::Urey.into()), 1e-8);
    }

    #[test]
    fn overrides_replace_defaults() {
        let policy = TolerancePolicy::new().with_threshold(Term::Bond, 1e-6);
        assert_eq!(policy.threshold(Term::Bond.into()), 1e-6);
        assert_eq!(policy.threshold(Term::Angle.into()), 1e-8);
    }

    #[test]
    fn nan_deviation_is_rejected() {
        let policy = TolerancePolicy::default();
        assert!(!policy.accepts(Term::Bond.into(), f64::NAN));
        assert!(policy.accepts(Term::Bond.into(), 1e-9));
    }

    #[test]
    fn bond_and_urey_failures_are_distinguishable() {
        let bond: FailureCode = [Check::Term(Term::Bond)].into_iter().collect();
        let urey: FailureCode = [Check::Term(Term::Urey)].into_iter().collect();
        let both: FailureCode = [Check::Term(Term::Bond), Check::Term(Term::Urey)]
            .into_iter()
            .collect();
        assert_ne!(bond, urey);
        assert!(both.contains(Check::Term(Term::Bond)));
        assert!(both.contains(Check::Term(Term::Urey)));
        assert!(!both.contains(Check::Term(Term::Angle)));
        assert_eq!(both.0, bond.0 | urey.0);
    }

    #[test]
    fn additive_collisions_cannot_happen() {
        let fixed_and_pol: FailureCode = [Check::Term(Term::FixedElec), Check::Term(Term::PolElec)]
            .into_iter()
            .collect();
        let bond: FailureCode = [Check::Term(Term::Bond)].into_iter().collect();
        assert_ne!(fixed_and_pol, bond);
    }

    #[test]
    fn exit_byte_folds_high_bits() {
        let low: FailureCode = [Check::Term(Term::Bond)].into_iter().collect();
        assert_eq!(low.exit_byte(), 8);

        let high: FailureCode = [Check::Term(Term::Torsion), Check::Term(Term::FixedElec)]
            .into_iter()
            .collect();
        assert_eq!(high.exit_byte(), 0x80 | 2);

        assert_eq!(FailureCode::SUCCESS.exit_byte(), 0);
        assert_eq!(FailureCode(u32::MAX).exit_byte() & 1, 0);
    }
}

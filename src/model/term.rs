use std::fmt;
use std::str::FromStr;

/// Additive component of the molecular-mechanics potential energy.
///
/// The set is closed: every evaluator answers energy and gradient queries for
/// each variant, returning zero for terms it does not parameterize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    FixedElec,
    PolElec,
    Vdw,
    Bond,
    Angle,
    StrBnd,
    Urey,
    Opb,
    PiTors,
    Torsion,
    TorTor,
    ImpTorsion,
    StrTor,
    AngTor,
    /// Sum of every term above.
    Total,
}

impl Term {
    /// Every individual term, in evaluation order, excluding [`Term::Total`].
    pub const INDIVIDUAL: [Term; 14] = [
        Term::FixedElec,
        Term::PolElec,
        Term::Vdw,
        Term::Bond,
        Term::Angle,
        Term::StrBnd,
        Term::Urey,
        Term::Opb,
        Term::PiTors,
        Term::Torsion,
        Term::TorTor,
        Term::ImpTorsion,
        Term::StrTor,
        Term::AngTor,
    ];

    /// Valence terms, i.e. everything except electrostatics and dispersion.
    pub const VALENCE: [Term; 11] = [
        Term::Bond,
        Term::Angle,
        Term::StrBnd,
        Term::Urey,
        Term::Opb,
        Term::PiTors,
        Term::Torsion,
        Term::TorTor,
        Term::ImpTorsion,
        Term::StrTor,
        Term::AngTor,
    ];

    /// Short energy label used in report headers (`EM`, `EP`, ...).
    pub fn label(self) -> &'static str {
        match self {
            Term::FixedElec => "EM",
            Term::PolElec => "EP",
            Term::Vdw => "EV",
            Term::Bond => "EB",
            Term::Angle => "EA",
            Term::StrBnd => "EBA",
            Term::Urey => "EUB",
            Term::Opb => "EOPB",
            Term::PiTors => "EPT",
            Term::Torsion => "ET",
            Term::TorTor => "ETT",
            Term::ImpTorsion => "EIT",
            Term::StrTor => "EBT",
            Term::AngTor => "EAT",
            Term::Total => "ETOT",
        }
    }

    /// Lower-case name accepted on the command line and in config files.
    pub fn name(self) -> &'static str {
        match self {
            Term::FixedElec => "fixedelec",
            Term::PolElec => "polelec",
            Term::Vdw => "vdw",
            Term::Bond => "bond",
            Term::Angle => "angle",
            Term::StrBnd => "strbnd",
            Term::Urey => "urey",
            Term::Opb => "opb",
            Term::PiTors => "pitors",
            Term::Torsion => "torsion",
            Term::TorTor => "tortor",
            Term::ImpTorsion => "imptorsion",
            Term::StrTor => "strtor",
            Term::AngTor => "angtor",
            Term::Total => "total",
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTermError(pub String);

impl fmt::Display for ParseTermError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown energy term '{}'", self.0)
    }
}

impl std::error::Error for ParseTermError {}

impl FromStr for Term {
    type Err = ParseTermError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::INDIVIDUAL
            .iter()
            .chain(std::iter::once(&Term::Total))
            .copied()
            .find(|t| t.name() == needle || t.label().eq_ignore_ascii_case(&needle))
            .ok_or_else(|| ParseTermError(s.to_string()))
    }
}

/// Cartesian axis of a coordinate component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn individual_terms_exclude_total() {
        assert!(!Term::INDIVIDUAL.contains(&Term::Total));
        assert_eq!(Term::INDIVIDUAL.len(), 14);
    }

    #[test]
    fn parse_accepts_names_and_labels() {
        assert_eq!("bond".parse::<Term>().unwrap(), Term::Bond);
        assert_eq!("EUB".parse::<Term>().unwrap(), Term::Urey);
        assert_eq!(" PolElec ".parse::<Term>().unwrap(), Term::PolElec);
        assert_eq!("etot".parse::<Term>().unwrap(), Term::Total);
        assert!("dihedral".parse::<Term>().is_err());
    }

    #[test]
    fn axis_indices_are_row_major() {
        let idx: Vec<usize> = Axis::ALL.iter().map(|a| a.index()).collect();
        assert_eq!(idx, vec![0, 1, 2]);
    }
}

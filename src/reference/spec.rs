//! TOML description of a reference system.
//!
//! ```toml
//! length_unit = "angstrom"
//!
//! [scaling]
//! vdw = [0.0, 0.0, 0.5]
//!
//! [polarization]
//! solver = "inversion"
//!
//! [[atoms]]
//! position = [0.0, 0.0, 0.0]
//! charge = -0.2
//! polarizability = 0.6
//! vdw_radius = 1.0
//! vdw_epsilon = 1e-3
//!
//! [[bonds]]
//! atoms = [0, 1]
//! k = 0.35
//! r0 = 1.0
//! ```
//!
//! Energies, force constants and fields are always in atomic units. Lengths
//! (positions, reference distances, radii, link distances) follow
//! `length_unit` and are converted to bohr by [`SystemSpec::into_atomic_units`].
//! Angles are given in degrees.

use serde::Deserialize;

use super::error::Error;
use crate::model::units::{ANG2AU, DEFAULT_LINK_DISTANCE_ANG};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    #[default]
    Bohr,
    Angstrom,
}

impl LengthUnit {
    fn to_bohr(self) -> f64 {
        match self {
            LengthUnit::Bohr => 1.0,
            LengthUnit::Angstrom => ANG2AU,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemSpec {
    #[serde(default)]
    pub length_unit: LengthUnit,
    #[serde(default)]
    pub scaling: ScalingSpec,
    #[serde(default)]
    pub polarization: PolarizationSpec,
    pub atoms: Vec<AtomSpec>,
    #[serde(default)]
    pub bonds: Vec<BondSpec>,
    #[serde(default)]
    pub angles: Vec<AngleSpec>,
    #[serde(default)]
    pub strbnds: Vec<StrBndSpec>,
    #[serde(default)]
    pub ureys: Vec<UreySpec>,
    #[serde(default)]
    pub torsions: Vec<TorsionSpec>,
    #[serde(default)]
    pub imptorsions: Vec<TorsionSpec>,
    #[serde(default)]
    pub qm: Option<Box<QmSpec>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AtomSpec {
    pub position: [f64; 3],
    #[serde(default)]
    pub charge: f64,
    #[serde(default)]
    pub polarizability: f64,
    #[serde(default)]
    pub vdw_radius: f64,
    #[serde(default)]
    pub vdw_epsilon: f64,
}

/// Scaling factors for 1-2, 1-3 and 1-4 pairs.
#[derive(Debug, Clone, Deserialize)]
pub struct ScalingSpec {
    #[serde(default = "default_vdw_scale")]
    pub vdw: [f64; 3],
    #[serde(default = "default_elec_scale")]
    pub elec: [f64; 3],
    #[serde(default = "default_pol_scale")]
    pub pol: [f64; 3],
}

fn default_vdw_scale() -> [f64; 3] {
    [0.0, 0.0, 0.5]
}
fn default_elec_scale() -> [f64; 3] {
    [0.0, 0.0, 0.5]
}
fn default_pol_scale() -> [f64; 3] {
    [0.0, 0.0, 1.0]
}

impl Default for ScalingSpec {
    fn default() -> Self {
        Self {
            vdw: default_vdw_scale(),
            elec: default_elec_scale(),
            pol: default_pol_scale(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolverKind {
    #[default]
    ConjugateGradient,
    Inversion,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolarizationSpec {
    #[serde(default)]
    pub solver: SolverKind,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

fn default_tolerance() -> f64 {
    1e-12
}
fn default_max_iterations() -> usize {
    500
}

impl Default for PolarizationSpec {
    fn default() -> Self {
        Self {
            solver: SolverKind::default(),
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BondSpec {
    pub atoms: [usize; 2],
    pub k: f64,
    pub r0: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AngleSpec {
    pub atoms: [usize; 3],
    pub k: f64,
    /// Degrees.
    pub theta0: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrBndSpec {
    pub atoms: [usize; 3],
    pub k1: f64,
    pub k2: f64,
    pub r1: f64,
    pub r2: f64,
    /// Degrees.
    pub theta0: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UreySpec {
    pub atoms: [usize; 2],
    pub k: f64,
    pub r0: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TorsionSpec {
    pub atoms: [usize; 4],
    pub terms: Vec<FourierSpec>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FourierSpec {
    pub amplitude: f64,
    pub periodicity: u32,
    /// Degrees.
    #[serde(default)]
    pub phase: f64,
}

/// QM region: an embedded system description plus the covalent links that
/// cut across the boundary.
#[derive(Debug, Clone, Deserialize)]
pub struct QmSpec {
    #[serde(flatten)]
    pub system: SystemSpec,
    #[serde(default)]
    pub links: Vec<LinkSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkSpec {
    /// QM boundary atom, indexed in the QM region.
    pub qm: usize,
    /// MM boundary atom, indexed in the MM system.
    pub mm: usize,
    /// Link atom capping `qm`, indexed in the QM region.
    pub link: usize,
    /// Distance from `qm` to the link atom, in the QM region's length unit.
    #[serde(default)]
    pub distance: Option<f64>,
}

impl SystemSpec {
    pub fn from_toml_str(toml: &str) -> Result<Self, Error> {
        Ok(toml::from_str(toml)?)
    }

    /// Converts every length to bohr. Angles stay in degrees.
    pub fn into_atomic_units(mut self) -> Self {
        let f = self.length_unit.to_bohr();
        if f != 1.0 {
            for a in &mut self.atoms {
                a.position = a.position.map(|x| x * f);
                a.vdw_radius *= f;
            }
            for b in &mut self.bonds {
                b.r0 *= f;
            }
            for s in &mut self.strbnds {
                s.r1 *= f;
                s.r2 *= f;
            }
            for u in &mut self.ureys {
                u.r0 *= f;
            }
        }
        self.length_unit = LengthUnit::Bohr;
        self.qm = self.qm.map(|qm| Box::new(qm.into_atomic_units()));
        self
    }

    /// Checks atom indices and parameter domains.
    pub fn validate(&self) -> Result<(), Error> {
        let n = self.atoms.len();
        if n == 0 {
            return Err(Error::EmptySystem);
        }
        let check = |term: &'static str, entry: usize, atoms: &[usize]| -> Result<(), Error> {
            for &a in atoms {
                if a >= n {
                    return Err(Error::invalid_index(term, entry, a, n));
                }
            }
            for (x, &a) in atoms.iter().enumerate() {
                if atoms[..x].contains(&a) {
                    return Err(Error::InvalidParameter(format!(
                        "{term} entry {entry} uses atom {a} twice"
                    )));
                }
            }
            Ok(())
        };
        for (e, b) in self.bonds.iter().enumerate() {
            check("bond", e, &b.atoms)?;
        }
        for (e, a) in self.angles.iter().enumerate() {
            check("angle", e, &a.atoms)?;
        }
        for (e, s) in self.strbnds.iter().enumerate() {
            check("strbnd", e, &s.atoms)?;
        }
        for (e, u) in self.ureys.iter().enumerate() {
            check("urey", e, &u.atoms)?;
        }
        for (e, t) in self.torsions.iter().enumerate() {
            check("torsion", e, &t.atoms)?;
        }
        for (e, t) in self.imptorsions.iter().enumerate() {
            check("imptorsion", e, &t.atoms)?;
        }

        for (i, a) in self.atoms.iter().enumerate() {
            if a.polarizability < 0.0 || !a.polarizability.is_finite() {
                return Err(Error::InvalidParameter(format!(
                    "atom {i} has polarizability {}",
                    a.polarizability
                )));
            }
            if a.vdw_epsilon < 0.0 || a.vdw_radius < 0.0 {
                return Err(Error::InvalidParameter(format!(
                    "atom {i} has negative van der Waals parameters"
                )));
            }
        }
        let p = &self.polarization;
        if !(p.tolerance > 0.0) || p.max_iterations == 0 {
            return Err(Error::InvalidParameter(
                "polarization tolerance and max_iterations must be positive".into(),
            ));
        }

        if let Some(qm) = &self.qm {
            qm.validate(n)?;
        }
        Ok(())
    }
}

impl QmSpec {
    /// Converts every length, including link distances, to bohr.
    pub fn into_atomic_units(mut self) -> Self {
        let f = self.system.length_unit.to_bohr();
        for link in &mut self.links {
            link.distance = Some(link.distance.map_or(DEFAULT_LINK_DISTANCE_ANG * ANG2AU, |d| d * f));
        }
        self.system = self.system.into_atomic_units();
        self
    }

    /// Link distance in bohr; only meaningful after unit conversion.
    pub fn link_distance(&self, link: &LinkSpec) -> f64 {
        link.distance.unwrap_or(DEFAULT_LINK_DISTANCE_ANG * ANG2AU)
    }

    /// Checks the embedded system and every link against an MM system of
    /// `mm_atoms` atoms.
    pub fn validate(&self, mm_atoms: usize) -> Result<(), Error> {
        if self.system.qm.is_some() {
            return Err(Error::InvalidParameter(
                "a QM region cannot contain another QM region".into(),
            ));
        }
        self.system.validate()?;
        let n = self.system.atoms.len();
        for (e, link) in self.links.iter().enumerate() {
            if link.qm >= n {
                return Err(Error::invalid_index("link", e, link.qm, n));
            }
            if link.link >= n {
                return Err(Error::invalid_index("link", e, link.link, n));
            }
            if link.mm >= mm_atoms {
                return Err(Error::invalid_index("link", e, link.mm, mm_atoms));
            }
            if link.qm == link.link {
                return Err(Error::InvalidParameter(format!(
                    "link {e} caps QM atom {} with itself",
                    link.qm
                )));
            }
            if self.links[..e].iter().any(|l| l.link == link.link) {
                return Err(Error::InvalidParameter(format!(
                    "QM atom {} is used as a link atom twice",
                    link.link
                )));
            }
            if link.distance.is_some_and(|d| !(d > 0.0)) {
                return Err(Error::InvalidParameter(format!(
                    "link {e} has a non-positive distance"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WATER: &str = r#"
length_unit = "angstrom"

[[atoms]]
position = [0.0, 0.0, 0.0]
charge = -0.4
polarizability = 0.8

[[atoms]]
position = [0.96, 0.0, 0.0]
charge = 0.2

[[atoms]]
position = [-0.24, 0.93, 0.0]
charge = 0.2

[[bonds]]
atoms = [0, 1]
k = 0.3
r0 = 0.96

[[bonds]]
atoms = [0, 2]
k = 0.3
r0 = 0.96

[[angles]]
atoms = [1, 0, 2]
k = 0.05
theta0 = 104.5
"#;

    #[test]
    fn parses_with_defaults() {
        let spec = SystemSpec::from_toml_str(WATER).unwrap();
        assert_eq!(spec.atoms.len(), 3);
        assert_eq!(spec.polarization.solver, SolverKind::ConjugateGradient);
        assert_eq!(spec.scaling.pol, [0.0, 0.0, 1.0]);
        assert!(spec.qm.is_none());
        spec.validate().unwrap();
    }

    #[test]
    fn converts_lengths_to_bohr() {
        let spec = SystemSpec::from_toml_str(WATER).unwrap().into_atomic_units();
        assert_eq!(spec.length_unit, LengthUnit::Bohr);
        assert!((spec.atoms[1].position[0] - 0.96 * ANG2AU).abs() < 1e-12);
        assert!((spec.bonds[0].r0 - 0.96 * ANG2AU).abs() < 1e-12);
        assert_eq!(spec.angles[0].theta0, 104.5);
        assert_eq!(spec.bonds[0].k, 0.3);
    }

    #[test]
    fn rejects_out_of_range_bond() {
        let mut spec = SystemSpec::from_toml_str(WATER).unwrap();
        spec.bonds[1].atoms = [0, 7];
        assert!(matches!(
            spec.validate(),
            Err(Error::InvalidAtomIndex {
                term: "bond",
                atom: 7,
                ..
            })
        ));
    }

    #[test]
    fn rejects_repeated_atoms() {
        let mut spec = SystemSpec::from_toml_str(WATER).unwrap();
        spec.angles[0].atoms = [1, 0, 1];
        assert!(matches!(spec.validate(), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn qm_links_default_distance() {
        let toml = format!(
            "{WATER}\n[qm]\n[[qm.atoms]]\nposition = [3.0, 0.0, 0.0]\n[[qm.atoms]]\nposition = [4.0, 0.0, 0.0]\n[[qm.links]]\nqm = 0\nmm = 1\nlink = 1\n"
        );
        let spec = SystemSpec::from_toml_str(&toml).unwrap();
        spec.validate().unwrap();
        let spec = spec.into_atomic_units();
        let qm = spec.qm.as_ref().unwrap();
        assert_eq!(qm.links.len(), 1);
        assert!((qm.link_distance(&qm.links[0]) - 1.1 * ANG2AU).abs() < 1e-12);
    }

    #[test]
    fn link_to_missing_mm_atom_is_rejected() {
        let toml = format!(
            "{WATER}\n[qm]\n[[qm.atoms]]\nposition = [3.0, 0.0, 0.0]\n[[qm.atoms]]\nposition = [4.0, 0.0, 0.0]\n[[qm.links]]\nqm = 0\nmm = 9\nlink = 1\n"
        );
        let spec = SystemSpec::from_toml_str(&toml).unwrap();
        assert!(matches!(
            spec.validate(),
            Err(Error::InvalidAtomIndex { term: "link", .. })
        ));
    }

    #[test]
    fn unknown_solver_fails_to_parse() {
        let toml = format!("{WATER}\n[polarization]\nsolver = \"jacobi\"\n");
        assert!(matches!(
            SystemSpec::from_toml_str(&toml),
            Err(Error::Parse(_))
        ));
    }
}

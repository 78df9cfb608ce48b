//! Pairwise fixed-charge electrostatics and Lennard-Jones dispersion.

use super::bonded::{pos, push, stretch};
use super::error::Error;
use super::topology::Topology;
use crate::model::gradient::GradientBuffer;

/// Per-atom nonbonded parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NonbondedAtom {
    pub charge: f64,
    pub vdw_radius: f64,
    pub vdw_epsilon: f64,
}

/// Lennard-Jones pair, `ε[(r_m/r)¹² − 2(r_m/r)⁶]`, with `ε = √(ε_a ε_b)` and
/// `r_m = r_a + r_b`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LjPair {
    epsilon: f64,
    r_min: f64,
}

impl LjPair {
    pub fn combine(a: &NonbondedAtom, b: &NonbondedAtom) -> Self {
        Self {
            epsilon: (a.vdw_epsilon * b.vdw_epsilon).sqrt(),
            r_min: a.vdw_radius + b.vdw_radius,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.epsilon == 0.0
    }

    pub fn energy(&self, r: f64) -> f64 {
        let x6 = (self.r_min / r).powi(6);
        self.epsilon * (x6 * x6 - 2.0 * x6)
    }

    /// `dE/dr`.
    pub fn derivative(&self, r: f64) -> f64 {
        let x6 = (self.r_min / r).powi(6);
        12.0 * self.epsilon * (x6 - x6 * x6) / r
    }
}

pub(crate) fn coulomb_energy(
    coords: &[[f64; 3]],
    atoms: &[NonbondedAtom],
    topology: &Topology,
    scale: &[f64; 3],
) -> Result<f64, Error> {
    let mut energy = 0.0;
    for i in 0..atoms.len() {
        for j in (i + 1)..atoms.len() {
            let qq = atoms[i].charge * atoms[j].charge * topology.factor(i, j, scale);
            if qq == 0.0 {
                continue;
            }
            let s = stretch(pos(coords, i), pos(coords, j), "fixedelec")?;
            energy += qq / s.r;
        }
    }
    Ok(energy)
}

pub(crate) fn coulomb_gradient(
    coords: &[[f64; 3]],
    atoms: &[NonbondedAtom],
    topology: &Topology,
    scale: &[f64; 3],
    out: &mut GradientBuffer,
) -> Result<(), Error> {
    for i in 0..atoms.len() {
        for j in (i + 1)..atoms.len() {
            let qq = atoms[i].charge * atoms[j].charge * topology.factor(i, j, scale);
            if qq == 0.0 {
                continue;
            }
            let s = stretch(pos(coords, i), pos(coords, j), "fixedelec")?;
            let g = s.unit * (-qq / (s.r * s.r));
            push(out, i, g);
            push(out, j, -g);
        }
    }
    Ok(())
}

pub(crate) fn vdw_energy(
    coords: &[[f64; 3]],
    atoms: &[NonbondedAtom],
    topology: &Topology,
    scale: &[f64; 3],
) -> Result<f64, Error> {
    let mut energy = 0.0;
    for i in 0..atoms.len() {
        for j in (i + 1)..atoms.len() {
            let f = topology.factor(i, j, scale);
            let lj = LjPair::combine(&atoms[i], &atoms[j]);
            if f == 0.0 || lj.is_zero() {
                continue;
            }
            let s = stretch(pos(coords, i), pos(coords, j), "vdw")?;
            energy += f * lj.energy(s.r);
        }
    }
    Ok(energy)
}

pub(crate) fn vdw_gradient(
    coords: &[[f64; 3]],
    atoms: &[NonbondedAtom],
    topology: &Topology,
    scale: &[f64; 3],
    out: &mut GradientBuffer,
) -> Result<(), Error> {
    for i in 0..atoms.len() {
        for j in (i + 1)..atoms.len() {
            let f = topology.factor(i, j, scale);
            let lj = LjPair::combine(&atoms[i], &atoms[j]);
            if f == 0.0 || lj.is_zero() {
                continue;
            }
            let s = stretch(pos(coords, i), pos(coords, j), "vdw")?;
            let g = s.unit * (f * lj.derivative(s.r));
            push(out, i, g);
            push(out, j, -g);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(charge: f64) -> NonbondedAtom {
        NonbondedAtom {
            charge,
            vdw_radius: 1.5,
            vdw_epsilon: 1e-3,
        }
    }

    #[test]
    fn lj_minimum_sits_at_r_min() {
        let lj = LjPair::combine(&atom(0.0), &atom(0.0));
        assert!((lj.energy(3.0) + 1e-3).abs() < 1e-15);
        assert!(lj.derivative(3.0).abs() < 1e-15);
    }

    #[test]
    fn bonded_pairs_are_excluded() {
        let coords = [[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [6.0, 0.0, 0.0]];
        let atoms = [atom(0.5), atom(-0.5), atom(0.25)];
        let topo = Topology::from_bonds(3, [(0, 1)]);
        let e = coulomb_energy(&coords, &atoms, &topo, &[0.0, 0.0, 0.5]).unwrap();
        let expected = 0.5 * 0.25 / 6.0 + (-0.5) * 0.25 / 4.0;
        assert!((e - expected).abs() < 1e-15);
    }

    #[test]
    fn coulomb_gradient_is_antisymmetric() {
        let coords = [[0.0, 0.0, 0.0], [0.0, 0.0, 3.0]];
        let atoms = [atom(0.2), atom(0.3)];
        let topo = Topology::from_bonds(2, []);
        let mut g = GradientBuffer::zeros(2);
        coulomb_gradient(&coords, &atoms, &topo, &[0.0; 3], &mut g).unwrap();
        // Like charges repel: E decreases as atom 1 moves away along +z.
        assert!(g[1][2] < 0.0);
        assert_eq!(g.net(), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn coincident_atoms_are_degenerate() {
        let coords = [[1.0, 1.0, 1.0], [1.0, 1.0, 1.0]];
        let atoms = [atom(0.1), atom(0.1)];
        let topo = Topology::from_bonds(2, []);
        assert!(matches!(
            vdw_energy(&coords, &atoms, &topo, &[0.0; 3]),
            Err(Error::DegenerateGeometry { term: "vdw", .. })
        ));
    }
}

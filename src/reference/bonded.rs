//! Valence terms of the reference force field.
//!
//! Each term type implements [`Valence`]: an energy and an additive
//! gradient over a coordinate slice. Internal-coordinate derivatives are
//! shared through [`stretch`], [`bend`] and [`dihedral`].

use nalgebra::Vector3;

use super::error::Error;
use super::spec::{AngleSpec, BondSpec, StrBndSpec, TorsionSpec, UreySpec};
use crate::model::gradient::GradientBuffer;

type V3 = Vector3<f64>;

const MIN_SIN: f64 = 1e-8;

#[inline]
pub(crate) fn pos(coords: &[[f64; 3]], i: usize) -> V3 {
    V3::from(coords[i])
}

#[inline]
pub(crate) fn push(out: &mut GradientBuffer, i: usize, v: V3) {
    out.add_row(i, [v.x, v.y, v.z]);
}

/// One family of valence terms.
pub(crate) trait Valence {
    const NAME: &'static str;

    fn energy(&self, coords: &[[f64; 3]]) -> Result<f64, Error>;

    /// Adds the gradient of this term into `out`.
    fn gradient(&self, coords: &[[f64; 3]], out: &mut GradientBuffer) -> Result<(), Error>;
}

pub(crate) fn total_energy<T: Valence>(terms: &[T], coords: &[[f64; 3]]) -> Result<f64, Error> {
    terms.iter().map(|t| t.energy(coords)).sum()
}

pub(crate) fn accumulate_gradient<T: Valence>(
    terms: &[T],
    coords: &[[f64; 3]],
    out: &mut GradientBuffer,
) -> Result<(), Error> {
    terms.iter().try_for_each(|t| t.gradient(coords, out))
}

/// Distance `|a − b|` and its derivative with respect to `a`.
pub(crate) struct Stretch {
    pub r: f64,
    pub unit: V3,
}

pub(crate) fn stretch(a: V3, b: V3, term: &'static str) -> Result<Stretch, Error> {
    let d = a - b;
    let r = d.norm();
    if r == 0.0 {
        return Err(Error::degenerate(term, "coincident atoms"));
    }
    Ok(Stretch { r, unit: d / r })
}

/// Angle `i–j–k` and its derivatives with respect to each atom.
pub(crate) struct Bend {
    pub theta: f64,
    pub d: [V3; 3],
}

pub(crate) fn bend(xi: V3, xj: V3, xk: V3, term: &'static str) -> Result<Bend, Error> {
    let u = stretch(xi, xj, term)?;
    let v = stretch(xk, xj, term)?;
    let cos = u.unit.dot(&v.unit);
    let sin = u.unit.cross(&v.unit).norm();
    if sin < MIN_SIN {
        return Err(Error::degenerate(term, "linear angle"));
    }
    let theta = sin.atan2(cos);
    let di = -(v.unit - u.unit * cos) / (u.r * sin);
    let dk = -(u.unit - v.unit * cos) / (v.r * sin);
    Ok(Bend {
        theta,
        d: [di, -di - dk, dk],
    })
}

/// Dihedral `i–j–k–l` in `(−π, π]` and its derivatives.
pub(crate) struct Dihedral {
    pub phi: f64,
    pub d: [V3; 4],
}

pub(crate) fn dihedral(xi: V3, xj: V3, xk: V3, xl: V3, term: &'static str) -> Result<Dihedral, Error> {
    let f = xi - xj;
    let g = xj - xk;
    let h = xl - xk;
    let a = f.cross(&g);
    let b = h.cross(&g);
    let a2 = a.norm_squared();
    let b2 = b.norm_squared();
    let gn = g.norm();
    if gn == 0.0 || a2.sqrt() < MIN_SIN * f.norm() * gn || b2.sqrt() < MIN_SIN * h.norm() * gn {
        return Err(Error::degenerate(term, "collinear atoms"));
    }

    let cos = a.dot(&b);
    let sin = b.cross(&a).dot(&g) / gn;
    let phi = sin.atan2(cos);

    let fg = f.dot(&g) / (a2 * gn);
    let hg = h.dot(&g) / (b2 * gn);
    let di = -a * (gn / a2);
    let dl = b * (gn / b2);
    let dj = a * (gn / a2) + a * fg - b * hg;
    let dk = -b * (gn / b2) - a * fg + b * hg;
    Ok(Dihedral {
        phi,
        d: [di, dj, dk, dl],
    })
}

#[derive(Debug, Clone)]
pub(crate) struct Bond {
    pub atoms: [usize; 2],
    pub k: f64,
    pub r0: f64,
}

impl From<&BondSpec> for Bond {
    fn from(s: &BondSpec) -> Self {
        Self {
            atoms: s.atoms,
            k: s.k,
            r0: s.r0,
        }
    }
}

impl Valence for Bond {
    const NAME: &'static str = "bond";

    fn energy(&self, coords: &[[f64; 3]]) -> Result<f64, Error> {
        let [i, j] = self.atoms;
        let s = stretch(pos(coords, i), pos(coords, j), Self::NAME)?;
        Ok(self.k * (s.r - self.r0).powi(2))
    }

    fn gradient(&self, coords: &[[f64; 3]], out: &mut GradientBuffer) -> Result<(), Error> {
        let [i, j] = self.atoms;
        let s = stretch(pos(coords, i), pos(coords, j), Self::NAME)?;
        let g = s.unit * (2.0 * self.k * (s.r - self.r0));
        push(out, i, g);
        push(out, j, -g);
        Ok(())
    }
}

/// 1-3 harmonic distance restraint.
#[derive(Debug, Clone)]
pub(crate) struct Urey(pub Bond);

impl From<&UreySpec> for Urey {
    fn from(s: &UreySpec) -> Self {
        Self(Bond {
            atoms: s.atoms,
            k: s.k,
            r0: s.r0,
        })
    }
}

impl Valence for Urey {
    const NAME: &'static str = "urey";

    fn energy(&self, coords: &[[f64; 3]]) -> Result<f64, Error> {
        self.0.energy(coords)
    }

    fn gradient(&self, coords: &[[f64; 3]], out: &mut GradientBuffer) -> Result<(), Error> {
        self.0.gradient(coords, out)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Angle {
    pub atoms: [usize; 3],
    pub k: f64,
    pub theta0: f64,
}

impl From<&AngleSpec> for Angle {
    fn from(s: &AngleSpec) -> Self {
        Self {
            atoms: s.atoms,
            k: s.k,
            theta0: s.theta0.to_radians(),
        }
    }
}

impl Valence for Angle {
    const NAME: &'static str = "angle";

    fn energy(&self, coords: &[[f64; 3]]) -> Result<f64, Error> {
        let [i, j, k] = self.atoms;
        let b = bend(pos(coords, i), pos(coords, j), pos(coords, k), Self::NAME)?;
        Ok(self.k * (b.theta - self.theta0).powi(2))
    }

    fn gradient(&self, coords: &[[f64; 3]], out: &mut GradientBuffer) -> Result<(), Error> {
        let b = bend(
            pos(coords, self.atoms[0]),
            pos(coords, self.atoms[1]),
            pos(coords, self.atoms[2]),
            Self::NAME,
        )?;
        let de = 2.0 * self.k * (b.theta - self.theta0);
        for (&a, d) in self.atoms.iter().zip(b.d) {
            push(out, a, d * de);
        }
        Ok(())
    }
}

/// Stretch-bend coupling, `(k₁Δr₁ + k₂Δr₂)Δθ`.
#[derive(Debug, Clone)]
pub(crate) struct StrBnd {
    pub atoms: [usize; 3],
    pub k1: f64,
    pub k2: f64,
    pub r1: f64,
    pub r2: f64,
    pub theta0: f64,
}

impl From<&StrBndSpec> for StrBnd {
    fn from(s: &StrBndSpec) -> Self {
        Self {
            atoms: s.atoms,
            k1: s.k1,
            k2: s.k2,
            r1: s.r1,
            r2: s.r2,
            theta0: s.theta0.to_radians(),
        }
    }
}

impl Valence for StrBnd {
    const NAME: &'static str = "strbnd";

    fn energy(&self, coords: &[[f64; 3]]) -> Result<f64, Error> {
        let [i, j, k] = self.atoms;
        let (xi, xj, xk) = (pos(coords, i), pos(coords, j), pos(coords, k));
        let s1 = stretch(xi, xj, Self::NAME)?;
        let s2 = stretch(xk, xj, Self::NAME)?;
        let b = bend(xi, xj, xk, Self::NAME)?;
        let stretch_part = self.k1 * (s1.r - self.r1) + self.k2 * (s2.r - self.r2);
        Ok(stretch_part * (b.theta - self.theta0))
    }

    fn gradient(&self, coords: &[[f64; 3]], out: &mut GradientBuffer) -> Result<(), Error> {
        let [i, j, k] = self.atoms;
        let (xi, xj, xk) = (pos(coords, i), pos(coords, j), pos(coords, k));
        let s1 = stretch(xi, xj, Self::NAME)?;
        let s2 = stretch(xk, xj, Self::NAME)?;
        let b = bend(xi, xj, xk, Self::NAME)?;
        let dtheta = b.theta - self.theta0;
        let stretch_part = self.k1 * (s1.r - self.r1) + self.k2 * (s2.r - self.r2);

        let gi = s1.unit * (self.k1 * dtheta) + b.d[0] * stretch_part;
        let gk = s2.unit * (self.k2 * dtheta) + b.d[2] * stretch_part;
        let gj = -(s1.unit * self.k1 + s2.unit * self.k2) * dtheta + b.d[1] * stretch_part;
        push(out, i, gi);
        push(out, j, gj);
        push(out, k, gk);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Fourier {
    pub amplitude: f64,
    pub periodicity: f64,
    pub phase: f64,
}

/// Fourier series `Σ V(1 + cos(nφ − γ))` over a dihedral. Used for both
/// proper and improper torsions.
#[derive(Debug, Clone)]
pub(crate) struct Torsion {
    pub atoms: [usize; 4],
    pub terms: Vec<Fourier>,
}

impl From<&TorsionSpec> for Torsion {
    fn from(s: &TorsionSpec) -> Self {
        Self {
            atoms: s.atoms,
            terms: s
                .terms
                .iter()
                .map(|t| Fourier {
                    amplitude: t.amplitude,
                    periodicity: f64::from(t.periodicity),
                    phase: t.phase.to_radians(),
                })
                .collect(),
        }
    }
}

impl Torsion {
    fn dihedral(&self, coords: &[[f64; 3]], term: &'static str) -> Result<Dihedral, Error> {
        let [i, j, k, l] = self.atoms;
        dihedral(
            pos(coords, i),
            pos(coords, j),
            pos(coords, k),
            pos(coords, l),
            term,
        )
    }

    fn series(&self, phi: f64) -> (f64, f64) {
        self.terms.iter().fold((0.0, 0.0), |(e, de), t| {
            let arg = t.periodicity * phi - t.phase;
            (
                e + t.amplitude * (1.0 + arg.cos()),
                de - t.amplitude * t.periodicity * arg.sin(),
            )
        })
    }

    fn energy_as(&self, coords: &[[f64; 3]], term: &'static str) -> Result<f64, Error> {
        let d = self.dihedral(coords, term)?;
        Ok(self.series(d.phi).0)
    }

    fn gradient_as(
        &self,
        coords: &[[f64; 3]],
        out: &mut GradientBuffer,
        term: &'static str,
    ) -> Result<(), Error> {
        let d = self.dihedral(coords, term)?;
        let (_, de) = self.series(d.phi);
        for (&a, g) in self.atoms.iter().zip(d.d) {
            push(out, a, g * de);
        }
        Ok(())
    }
}

impl Valence for Torsion {
    const NAME: &'static str = "torsion";

    fn energy(&self, coords: &[[f64; 3]]) -> Result<f64, Error> {
        self.energy_as(coords, Self::NAME)
    }

    fn gradient(&self, coords: &[[f64; 3]], out: &mut GradientBuffer) -> Result<(), Error> {
        self.gradient_as(coords, out, Self::NAME)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ImpTorsion(pub Torsion);

impl From<&TorsionSpec> for ImpTorsion {
    fn from(s: &TorsionSpec) -> Self {
        Self(Torsion::from(s))
    }
}

impl Valence for ImpTorsion {
    const NAME: &'static str = "imptorsion";

    fn energy(&self, coords: &[[f64; 3]]) -> Result<f64, Error> {
        self.0.energy_as(coords, Self::NAME)
    }

    fn gradient(&self, coords: &[[f64; 3]], out: &mut GradientBuffer) -> Result<(), Error> {
        self.0.gradient_as(coords, out, Self::NAME)
    }
}

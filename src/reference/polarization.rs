//! Induced point dipoles.
//!
//! Each polarizable site carries a dipole `μ_i = α_i (E⁰_i + Σ_j T_ij μ_j)`,
//! where `E⁰` is the field of the (scaled) permanent charges plus any
//! external field and `T` the unscaled dipole-dipole tensor. The linear
//! system `(α⁻¹ − T) μ = E⁰` is symmetric; it is solved either by
//! preconditioned conjugate gradient or by a dense LU factorization.
//!
//! The energy `−½ Σ μ·E⁰` is stationary in `μ`, so its gradient only needs the
//! explicit coordinate dependence of `E⁰` and `T`.

use nalgebra::{DMatrix, DVector, Matrix3, Vector3};
use tracing::trace;

use super::bonded::{pos, push, stretch};
use super::error::Error;
use super::nonbonded::NonbondedAtom;
use super::spec::{PolarizationSpec, SolverKind};
use super::topology::Topology;
use crate::model::gradient::GradientBuffer;

type V3 = Vector3<f64>;

/// Converged dipoles at one geometry.
#[derive(Debug, Clone)]
pub(crate) struct Induced {
    pub sites: Vec<usize>,
    pub field: Vec<V3>,
    pub dipoles: Vec<V3>,
}

impl Induced {
    pub fn energy(&self) -> f64 {
        -0.5 * self
            .dipoles
            .iter()
            .zip(&self.field)
            .map(|(m, e)| m.dot(e))
            .sum::<f64>()
    }
}

pub(crate) struct Polarizable<'a> {
    pub coords: &'a [[f64; 3]],
    pub atoms: &'a [NonbondedAtom],
    pub polarizability: &'a [f64],
    pub topology: &'a Topology,
    pub scale: &'a [f64; 3],
    pub external: Option<&'a [[f64; 3]]>,
}

fn dot(a: &[V3], b: &[V3]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x.dot(y)).sum()
}

fn dipole_tensor(r: V3) -> Matrix3<f64> {
    let d2 = r.norm_squared();
    let d = d2.sqrt();
    (r * r.transpose() * (3.0 / d2) - Matrix3::identity()) / (d2 * d)
}

impl Polarizable<'_> {
    fn sites(&self) -> Vec<usize> {
        (0..self.coords.len())
            .filter(|&i| self.polarizability[i] > 0.0)
            .collect()
    }

    /// Field of the permanent charges and the external field at each site.
    fn permanent_field(&self, sites: &[usize]) -> Result<Vec<V3>, Error> {
        let mut fields = Vec::with_capacity(sites.len());
        for &i in sites {
            let mut e = self.external.map_or_else(V3::zeros, |f| V3::from(f[i]));
            for (j, atom) in self.atoms.iter().enumerate() {
                if j == i || atom.charge == 0.0 {
                    continue;
                }
                let f = self.topology.factor(i, j, self.scale);
                if f == 0.0 {
                    continue;
                }
                let s = stretch(pos(self.coords, i), pos(self.coords, j), "polelec")?;
                e += s.unit * (f * atom.charge / (s.r * s.r));
            }
            fields.push(e);
        }
        Ok(fields)
    }

    /// `(α⁻¹ − T) x`.
    fn apply(&self, sites: &[usize], x: &[V3]) -> Vec<V3> {
        sites
            .iter()
            .enumerate()
            .map(|(a, &i)| {
                let mut y = x[a] / self.polarizability[i];
                for (b, &j) in sites.iter().enumerate() {
                    if a != b {
                        y -= dipole_tensor(pos(self.coords, i) - pos(self.coords, j)) * x[b];
                    }
                }
                y
            })
            .collect()
    }

    pub fn solve(&self, settings: &PolarizationSpec) -> Result<Induced, Error> {
        let sites = self.sites();
        let field = self.permanent_field(&sites)?;
        let dipoles = if sites.is_empty() {
            Vec::new()
        } else {
            match settings.solver {
                SolverKind::ConjugateGradient => {
                    self.conjugate_gradient(&sites, &field, settings)?
                }
                SolverKind::Inversion => self.inversion(&sites, &field)?,
            }
        };
        Ok(Induced {
            sites,
            field,
            dipoles,
        })
    }

    /// Jacobi preconditioner, `α r`.
    fn precondition(&self, sites: &[usize], r: &[V3]) -> Vec<V3> {
        sites
            .iter()
            .zip(r)
            .map(|(&i, v)| v * self.polarizability[i])
            .collect()
    }

    fn conjugate_gradient(
        &self,
        sites: &[usize],
        rhs: &[V3],
        settings: &PolarizationSpec,
    ) -> Result<Vec<V3>, Error> {
        let rhs_norm = dot(rhs, rhs).sqrt();
        if rhs_norm == 0.0 {
            return Ok(vec![V3::zeros(); sites.len()]);
        }

        let mut x = self.precondition(sites, rhs);
        let ax = self.apply(sites, &x);
        let mut r: Vec<V3> = rhs.iter().zip(&ax).map(|(b, a)| b - a).collect();
        let mut z = self.precondition(sites, &r);
        let mut p = z.clone();
        let mut rz = dot(&r, &z);

        for iteration in 0..settings.max_iterations {
            let residual = dot(&r, &r).sqrt() / rhs_norm;
            if residual <= settings.tolerance {
                trace!(iteration, residual, "polarization converged");
                return Ok(x);
            }
            let ap = self.apply(sites, &p);
            let step = rz / dot(&p, &ap);
            for k in 0..x.len() {
                x[k] += p[k] * step;
                r[k] -= ap[k] * step;
            }
            z = self.precondition(sites, &r);
            let rz_next = dot(&r, &z);
            let beta = rz_next / rz;
            rz = rz_next;
            for k in 0..p.len() {
                p[k] = z[k] + p[k] * beta;
            }
        }

        let residual = dot(&r, &r).sqrt() / rhs_norm;
        if residual <= settings.tolerance {
            return Ok(x);
        }
        Err(Error::NotConverged {
            iterations: settings.max_iterations,
            residual,
        })
    }

    fn inversion(&self, sites: &[usize], rhs: &[V3]) -> Result<Vec<V3>, Error> {
        let n = sites.len();
        let mut m = DMatrix::<f64>::zeros(3 * n, 3 * n);
        for (a, &i) in sites.iter().enumerate() {
            for k in 0..3 {
                m[(3 * a + k, 3 * a + k)] = 1.0 / self.polarizability[i];
            }
            for (b, &j) in sites.iter().enumerate() {
                if a == b {
                    continue;
                }
                let t = dipole_tensor(pos(self.coords, i) - pos(self.coords, j));
                for k in 0..3 {
                    for l in 0..3 {
                        m[(3 * a + k, 3 * b + l)] = -t[(k, l)];
                    }
                }
            }
        }
        let b = DVector::from_iterator(3 * n, rhs.iter().flat_map(|v| [v.x, v.y, v.z]));
        let x = m.lu().solve(&b).ok_or(Error::SingularPolarization)?;
        if x.iter().any(|v| !v.is_finite()) {
            return Err(Error::SingularPolarization);
        }
        Ok((0..n)
            .map(|a| V3::new(x[3 * a], x[3 * a + 1], x[3 * a + 2]))
            .collect())
    }

    /// Adds the gradient of `induced.energy()` into `out`.
    pub fn gradient(&self, induced: &Induced, out: &mut GradientBuffer) -> Result<(), Error> {
        let sites = &induced.sites;
        let mu = &induced.dipoles;

        for (a, &i) in sites.iter().enumerate() {
            let xi = pos(self.coords, i);

            // Dipole-dipole coupling, each pair once.
            for (b, &j) in sites.iter().enumerate().skip(a + 1) {
                let r = xi - pos(self.coords, j);
                let d2 = r.norm_squared();
                if d2 == 0.0 {
                    return Err(Error::degenerate("polelec", "coincident dipoles"));
                }
                let d = d2.sqrt();
                let d5 = d2 * d2 * d;
                let (mi, mj) = (mu[a], mu[b]);
                let (ai, bj, c) = (mi.dot(&r), mj.dot(&r), mi.dot(&mj));
                let g = (mi * bj + mj * ai) * (3.0 / d5)
                    + r * (3.0 * c / d5 - 15.0 * ai * bj / (d5 * d2));
                push(out, i, -g);
                push(out, j, g);
            }

            // Dipole in the field of the permanent charges.
            for (j, atom) in self.atoms.iter().enumerate() {
                if j == i || atom.charge == 0.0 {
                    continue;
                }
                let f = self.topology.factor(i, j, self.scale);
                if f == 0.0 {
                    continue;
                }
                let r = xi - pos(self.coords, j);
                let d2 = r.norm_squared();
                if d2 == 0.0 {
                    return Err(Error::degenerate("polelec", "dipole on a charge"));
                }
                let d = d2.sqrt();
                let ai = mu[a].dot(&r);
                let g = (mu[a] / (d2 * d) - r * (3.0 * ai / (d2 * d2 * d))) * (f * atom.charge);
                push(out, i, -g);
                push(out, j, g);
            }
        }
        Ok(())
    }
}

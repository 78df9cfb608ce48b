use std::ops::{Index, IndexMut};

use super::term::Axis;
use crate::check::Error;

/// Per-atom Cartesian gradient, one `[x, y, z]` row per atom.
///
/// Always starts zeroed. Accumulation between buffers is checked: adding a
/// buffer of a different atom count is a wiring error, not a physics result.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientBuffer {
    rows: Vec<[f64; 3]>,
}

impl GradientBuffer {
    pub fn zeros(atom_count: usize) -> Self {
        Self {
            rows: vec![[0.0; 3]; atom_count],
        }
    }

    pub fn from_rows(rows: Vec<[f64; 3]>) -> Self {
        Self { rows }
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn rows(&self) -> &[[f64; 3]] {
        &self.rows
    }

    #[inline]
    pub fn rows_mut(&mut self) -> &mut [[f64; 3]] {
        &mut self.rows
    }

    #[inline]
    pub fn get(&self, atom: usize, axis: Axis) -> f64 {
        self.rows[atom][axis.index()]
    }

    #[inline]
    pub fn set(&mut self, atom: usize, axis: Axis, value: f64) {
        self.rows[atom][axis.index()] = value;
    }

    /// Adds `v` to the row of `atom`.
    #[inline]
    pub fn add_row(&mut self, atom: usize, v: [f64; 3]) {
        let row = &mut self.rows[atom];
        row[0] += v[0];
        row[1] += v[1];
        row[2] += v[2];
    }

    pub fn fill_zero(&mut self) {
        self.rows.iter_mut().for_each(|r| *r = [0.0; 3]);
    }

    /// Component-wise `self += other`.
    pub fn add_assign(&mut self, other: &GradientBuffer) -> Result<(), Error> {
        self.ensure_same_shape(other)?;
        for (a, b) in self.rows.iter_mut().zip(&other.rows) {
            a[0] += b[0];
            a[1] += b[1];
            a[2] += b[2];
        }
        Ok(())
    }

    pub fn ensure_same_shape(&self, other: &GradientBuffer) -> Result<(), Error> {
        if self.atom_count() != other.atom_count() {
            return Err(Error::AtomCountMismatch {
                expected: self.atom_count(),
                found: other.atom_count(),
            });
        }
        Ok(())
    }

    /// Sum over atoms; the net force on the system, up to sign.
    pub fn net(&self) -> [f64; 3] {
        self.rows.iter().fold([0.0; 3], |acc, r| {
            [acc[0] + r[0], acc[1] + r[1], acc[2] + r[2]]
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f64; 3]> {
        self.rows.iter()
    }
}

impl Index<usize> for GradientBuffer {
    type Output = [f64; 3];

    fn index(&self, atom: usize) -> &[f64; 3] {
        &self.rows[atom]
    }
}

impl IndexMut<usize> for GradientBuffer {
    fn index_mut(&mut self, atom: usize) -> &mut [f64; 3] {
        &mut self.rows[atom]
    }
}

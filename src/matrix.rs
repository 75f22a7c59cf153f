use std::ops::Index;

use nalgebra::Matrix3;

use crate::{NDIM, Point, Result, SuperpositionError};

const EPSILON: f64 = 1e-10;

/// A proper 3D rotation: orthonormal, with determinant +1.
///
/// Acts on column vectors, i.e. `p' = R · p`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "[[f64; NDIM]; NDIM]", into = "[[f64; NDIM]; NDIM]")
)]
pub struct RotationMatrix {
    /// Row-major / C-ordered matrix data.
    data: [f64; NDIM * NDIM],
}

impl Index<(usize, usize)> for RotationMatrix {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.data[index.0 * NDIM + index.1]
    }
}

impl Default for RotationMatrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl RotationMatrix {
    pub fn identity() -> Self {
        #[rustfmt::skip]
        let data = [
            1.0, 0.0, 0.0,
            0.0, 1.0, 0.0,
            0.0, 0.0, 1.0,
        ];
        Self { data }
    }

    /// Row-major / C order data.
    ///
    /// Fails unless the data describes a 3x3 orthonormal matrix with determinant 1.
    pub fn try_new(data: &[f64], ncols: usize) -> Result<Self> {
        if ncols != NDIM || data.len() != NDIM * NDIM {
            return Err(SuperpositionError::InvalidMatrix(format!(
                "rotation matrix must be 3x3, got {} values with {} columns",
                data.len(),
                ncols
            )));
        }
        let mut arr = [0.0; NDIM * NDIM];
        arr.copy_from_slice(data);
        let matrix = Self { data: arr };
        if !matrix.has_orthonormal_rows() {
            // rows is fine here because the matrix is square,
            // in which case an orthonormal matrix's tranpose is also orthonormal
            return Err(SuperpositionError::InvalidMatrix(
                "rotation matrix must be orthonormal".into(),
            ));
        }
        if (matrix.determinant() - 1.0).abs() > EPSILON {
            return Err(SuperpositionError::InvalidMatrix(
                "rotation matrix must have determinant = 1".into(),
            ));
        }
        Ok(matrix)
    }

    pub fn try_from_rows(rows: [[f64; NDIM]; NDIM]) -> Result<Self> {
        Self::try_new(rows.as_flattened(), NDIM)
    }

    /// The caller guarantees the matrix is a proper rotation.
    pub(crate) fn from_nalgebra_unchecked(m: &Matrix3<f64>) -> Self {
        let mut data = [0.0; NDIM * NDIM];
        for r in 0..NDIM {
            for c in 0..NDIM {
                data[r * NDIM + c] = m[(r, c)];
            }
        }
        Self { data }
    }

    #[cfg(test)]
    pub(crate) fn to_nalgebra(self) -> Matrix3<f64> {
        Matrix3::from_row_slice(&self.data)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&f64> {
        if row >= NDIM || col >= NDIM {
            return None;
        }
        self.data.get(row * NDIM + col)
    }

    pub fn rows(&self) -> [[f64; NDIM]; NDIM] {
        [0, 1, 2].map(|r| [self[(r, 0)], self[(r, 1)], self[(r, 2)]])
    }

    pub fn as_row_major(&self) -> &[f64; NDIM * NDIM] {
        &self.data
    }

    pub fn transpose(&self) -> Self {
        let mut data = [0.0; NDIM * NDIM];
        for r in 0..NDIM {
            for c in 0..NDIM {
                data[c * NDIM + r] = self[(r, c)];
            }
        }
        Self { data }
    }

    pub fn matmul(&self, coord: &Point) -> Point {
        let mut result = [0.0; NDIM];
        self.matmul_into(coord, &mut result);
        result
    }

    pub fn matmul_into(&self, coord: &Point, buf: &mut Point) {
        buf.fill(0.0);
        for (idx, d) in self.data.iter().enumerate() {
            let r = idx / NDIM;
            let c = idx % NDIM;
            buf[r] += d * coord[c];
        }
    }

    /// N.B. Coordinate "columns" are the _rows_ of the input and output matrices.
    pub fn matmul_transposed_into(&self, coord_cols: &[&[f64]; NDIM], buf: &mut [&mut [f64]; NDIM]) {
        for (out_dim_idx, buf_col) in buf.iter_mut().enumerate() {
            buf_col.fill(0.0);
            let row_start = out_dim_idx * NDIM;
            let row = &self.data[row_start..(row_start + NDIM)];
            for (mat_val, coord_col) in row.iter().zip(coord_cols.iter()) {
                for (c, b) in coord_col.iter().zip(buf_col.iter_mut()) {
                    *b += c * mat_val;
                }
            }
        }
    }

    /// Cofactor expansion along the first row.
    pub fn determinant(&self) -> f64 {
        let m = |r, c| self[(r, c)];
        m(0, 0) * (m(1, 1) * m(2, 2) - m(1, 2) * m(2, 1))
            - m(0, 1) * (m(1, 0) * m(2, 2) - m(1, 2) * m(2, 0))
            + m(0, 2) * (m(1, 0) * m(2, 1) - m(1, 1) * m(2, 0))
    }

    pub(crate) fn has_orthonormal_rows(&self) -> bool {
        let rows = self.rows();
        for (idx, row) in rows.iter().enumerate() {
            if (magnitude(row) - 1.0).abs() > EPSILON {
                return false;
            }
            for prev in rows[..idx].iter() {
                if dot(prev, row).abs() > EPSILON {
                    return false;
                }
            }
        }
        true
    }

    /// Whether every element is within `epsilon` of the identity's.
    pub fn is_near_identity(&self, epsilon: f64) -> bool {
        self.data
            .iter()
            .zip(Self::identity().data.iter())
            .all(|(a, b)| (a - b).abs() <= epsilon)
    }

    /// Rotation angle in radians, in `[0, pi]`.
    pub fn angle(&self) -> f64 {
        let trace = self[(0, 0)] + self[(1, 1)] + self[(2, 2)];
        ((trace - 1.0) / 2.0).clamp(-1.0, 1.0).acos()
    }
}

impl TryFrom<[[f64; NDIM]; NDIM]> for RotationMatrix {
    type Error = SuperpositionError;

    fn try_from(rows: [[f64; NDIM]; NDIM]) -> Result<Self> {
        Self::try_from_rows(rows)
    }
}

impl From<RotationMatrix> for [[f64; NDIM]; NDIM] {
    fn from(value: RotationMatrix) -> Self {
        value.rows()
    }
}

fn dot(v1: &Point, v2: &Point) -> f64 {
    v1.iter().zip(v2.iter()).map(|(a, b)| a * b).sum()
}

fn magnitude(v: &Point) -> f64 {
    dot(v, v).sqrt()
}

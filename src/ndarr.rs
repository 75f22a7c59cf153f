//! Conversions between [PointSet] and `(N, 3)` ndarray arrays, one point per row.
use ndarray::{Array2, ArrayView2};

use crate::{NDIM, PointSet, Result, SuperpositionError};

impl PointSet {
    pub fn try_from_array(arr: ArrayView2<'_, f64>) -> Result<Self> {
        if arr.ncols() != NDIM {
            return Err(SuperpositionError::NotThreeDimensional {
                index: 0,
                ndim: arr.ncols(),
            });
        }
        let points = arr
            .rows()
            .into_iter()
            .map(|row| [row[0], row[1], row[2]])
            .collect();
        Self::try_from_points(points)
    }

    pub fn to_array(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.len(), NDIM), |(r, c)| self[r][c])
    }
}

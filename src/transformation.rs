use std::sync::Arc;

use crate::{NDIM, Point, PointSet, Result, RotationMatrix};

/// Spatial transformation of 3D points.
///
/// Implementations do not bounds-check buffers,
/// as these transformations generally happen in hot loops over every vertex of a mesh.
/// They may panic if output buffers of incorrect length are given.
pub trait Transformation: std::fmt::Debug + Send + Sync {
    /// Transform a single point.
    fn transform_point(&self, pt: &Point) -> Point;

    /// Transform multiple points into pre-allocated output buffers.
    ///
    /// The trait default implementation simply calls [Transformation::transform_point] in turn;
    /// specific transforms may override it.
    fn bulk_transform_into(&self, pts: &[Point], bufs: &mut [Point]) {
        for (pt, buf) in pts.iter().zip(bufs.iter_mut()) {
            *buf = self.transform_point(pt);
        }
    }

    /// Transform points given as x, y and z columns into pre-allocated output columns.
    fn column_transform_into(&self, columns: &[&[f64]; NDIM], bufs: &mut [&mut [f64]; NDIM]) {
        for pt_idx in 0..columns[0].len() {
            let pt = [columns[0][pt_idx], columns[1][pt_idx], columns[2][pt_idx]];
            let out = self.transform_point(&pt);
            for (out_col, p) in bufs.iter_mut().zip(out.iter()) {
                out_col[pt_idx] = *p;
            }
        }
    }

    /// Transform a whole point set into a newly-allocated one.
    ///
    /// Fails with [crate::SuperpositionError::NonFinite] if a transformed coordinate overflows.
    fn transform_points(&self, pts: &PointSet) -> Result<PointSet> {
        let mut out = vec![[f64::NAN; NDIM]; pts.len()];
        self.bulk_transform_into(pts.as_slice(), &mut out);
        PointSet::try_from_points(out)
    }

    /// Return the inverse transformation, if it exists.
    fn invert(&self) -> Option<Arc<dyn Transformation>>;

    /// `true` means it definitely is an identity;
    /// `false` is not definitive for transforms where the check is approximate.
    fn is_identity(&self) -> bool;
}

impl Transformation for RotationMatrix {
    fn transform_point(&self, pt: &Point) -> Point {
        self.matmul(pt)
    }

    fn column_transform_into(&self, columns: &[&[f64]; NDIM], bufs: &mut [&mut [f64]; NDIM]) {
        self.matmul_transposed_into(columns, bufs);
    }

    fn invert(&self) -> Option<Arc<dyn Transformation>> {
        Some(Arc::new(self.transpose()))
    }

    fn is_identity(&self) -> bool {
        self.is_near_identity(0.0)
    }
}

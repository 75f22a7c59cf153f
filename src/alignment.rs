use std::sync::Arc;

use crate::{
    Conditioning, Frame, NDIM, Point, PointSet, Result, RotationMatrix, Transformation,
    centroid::{add, sub},
    kabsch::check_correspondence,
    score::sum_squared_deviation,
};

/// The minimal data needed to move any point from the mobile frame into the static frame:
/// `p' = R · (p − centroid_mobile) + centroid_static`.
///
/// Produced by [crate::superpose]; immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Alignment {
    centroid_static: Point,
    centroid_mobile: Point,
    rotation: RotationMatrix,
    conditioning: Conditioning,
}

impl Alignment {
    pub(crate) fn new(
        centroid_static: Point,
        centroid_mobile: Point,
        rotation: RotationMatrix,
        conditioning: Conditioning,
    ) -> Self {
        Self {
            centroid_static,
            centroid_mobile,
            rotation,
            conditioning,
        }
    }

    pub fn centroid_static(&self) -> &Point {
        &self.centroid_static
    }

    pub fn centroid_mobile(&self) -> &Point {
        &self.centroid_mobile
    }

    pub fn rotation(&self) -> &RotationMatrix {
        &self.rotation
    }

    pub fn conditioning(&self) -> &Conditioning {
        &self.conditioning
    }

    /// Translation of the equivalent `p' = R · p + t` form: `t = centroid_static − R · centroid_mobile`.
    pub fn translation(&self) -> Point {
        sub(
            &self.centroid_static,
            &self.rotation.matmul(&self.centroid_mobile),
        )
    }

    /// 4x4 homogeneous matrix in row-major order, with the translation in the last column.
    pub fn to_augmented(&self) -> [[f64; NDIM + 1]; NDIM + 1] {
        let t = self.translation();
        let rows = self.rotation.rows();
        let mut out = [[0.0; NDIM + 1]; NDIM + 1];
        for (r, row) in rows.iter().enumerate() {
            out[r][..NDIM].copy_from_slice(row);
            out[r][NDIM] = t[r];
        }
        out[NDIM][NDIM] = 1.0;
        out
    }

    /// The alignment mapping the static frame back onto the mobile frame.
    pub fn inverse(&self) -> Self {
        Self {
            centroid_static: self.centroid_mobile,
            centroid_mobile: self.centroid_static,
            rotation: self.rotation.transpose(),
            conditioning: self.conditioning,
        }
    }

    pub fn apply_point(&self, pt: &Point) -> Point {
        add(
            &self.rotation.matmul(&sub(pt, &self.centroid_mobile)),
            &self.centroid_static,
        )
    }

    /// Move every point of `targets` from the mobile frame into the static frame.
    ///
    /// `targets` may be the mobile set itself or any superset of it,
    /// e.g. every vertex of the mesh whose selected vertices were aligned.
    /// Fails with [crate::SuperpositionError::NonFinite] if a moved coordinate overflows.
    pub fn apply(&self, targets: &PointSet) -> Result<PointSet> {
        self.transform_points(targets)
    }

    /// Like [Alignment::apply], for points stored in an object's local coordinates.
    ///
    /// Points are lifted into world space with `frame`, aligned, then mapped back to local space.
    /// The alignment itself must have been computed from world-space points.
    pub fn apply_in_frame(&self, local_targets: &PointSet, frame: &Frame) -> Result<PointSet> {
        let world_to_local = frame.try_inverse()?;
        let out = local_targets
            .iter()
            .map(|pt| world_to_local.transform_point(&self.apply_point(&frame.transform_point(pt))))
            .collect();
        PointSet::try_from_points(out)
    }

    /// RMSD between `stat` and `mobile` after moving `mobile` with this alignment.
    ///
    /// Both must be the index-aligned correspondence sets,
    /// not a larger target set.
    pub fn rmsd(&self, stat: &PointSet, mobile: &PointSet) -> Result<f64> {
        check_correspondence(stat, mobile)?;
        let moved = mobile.iter().map(|pt| self.apply_point(pt));
        let ssd = sum_squared_deviation(stat.iter().copied(), moved);
        Ok((ssd / stat.len() as f64).sqrt())
    }
}

impl Transformation for Alignment {
    fn transform_point(&self, pt: &Point) -> Point {
        self.apply_point(pt)
    }

    fn column_transform_into(&self, columns: &[&[f64]; NDIM], bufs: &mut [&mut [f64]; NDIM]) {
        let t = self.translation();
        self.rotation.matmul_transposed_into(columns, bufs);
        for (col, t) in bufs.iter_mut().zip(t.iter()) {
            for c in col.iter_mut() {
                *c += t;
            }
        }
    }

    fn invert(&self) -> Option<Arc<dyn Transformation>> {
        Some(Arc::new(self.inverse()))
    }

    fn is_identity(&self) -> bool {
        self.rotation.is_near_identity(0.0) && self.translation().iter().all(|t| *t == 0.0)
    }
}

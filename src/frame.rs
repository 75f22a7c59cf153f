use std::sync::Arc;

use nalgebra::{Matrix3, Vector3};

use crate::{NDIM, Point, Result, SuperpositionError, Transformation};

/// An object-to-world affine map: `world = linear · local + translation`.
///
/// Hosts usually store object geometry in local coordinates together with a world matrix;
/// alignments are computed in world space, so local points go through a `Frame` first.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "FrameData", into = "FrameData"))]
pub struct Frame {
    /// Row-major.
    linear: [[f64; NDIM]; NDIM],
    translation: Point,
}

impl Default for Frame {
    fn default() -> Self {
        Self::identity()
    }
}

impl Frame {
    pub fn identity() -> Self {
        Self {
            linear: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            translation: [0.0; NDIM],
        }
    }

    pub fn try_new(linear: [[f64; NDIM]; NDIM], translation: Point) -> Result<Self> {
        if linear.iter().flatten().chain(translation.iter()).any(|v| !v.is_finite()) {
            return Err(SuperpositionError::InvalidMatrix(
                "frame contains NaN or infinite values".into(),
            ));
        }
        Ok(Self {
            linear,
            translation,
        })
    }

    /// Create a Frame from an augmented matrix,
    /// i.e. which includes the translation as the last column
    /// and a bottom row of [0, 0, 0, 1].
    pub fn try_from_augmented(augmented: &[[f64; NDIM + 1]; NDIM + 1]) -> Result<Self> {
        if augmented[NDIM] != [0.0, 0.0, 0.0, 1.0] {
            return Err(SuperpositionError::InvalidMatrix(
                "augmented matrix must have a bottom row of [0, 0, 0, 1]".into(),
            ));
        }
        let mut linear = [[0.0; NDIM]; NDIM];
        let mut translation = [0.0; NDIM];
        for r in 0..NDIM {
            linear[r].copy_from_slice(&augmented[r][..NDIM]);
            translation[r] = augmented[r][NDIM];
        }
        Self::try_new(linear, translation)
    }

    pub fn linear(&self) -> &[[f64; NDIM]; NDIM] {
        &self.linear
    }

    pub fn translation(&self) -> &Point {
        &self.translation
    }

    pub fn to_world(&self, local: &Point) -> Point {
        let mut out = self.translation;
        for (o, row) in out.iter_mut().zip(self.linear.iter()) {
            *o += row.iter().zip(local.iter()).map(|(a, b)| a * b).sum::<f64>();
        }
        out
    }

    /// The world-to-local map.
    pub fn try_inverse(&self) -> Result<Self> {
        let linear = Matrix3::from_row_slice(self.linear.as_flattened());
        let inv = linear
            .try_inverse()
            .ok_or(SuperpositionError::SingularFrame)?;
        let t = -(inv * Vector3::from(self.translation));
        let mut inv_linear = [[0.0; NDIM]; NDIM];
        for (r, row) in inv_linear.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = inv[(r, c)];
            }
        }
        Self::try_new(inv_linear, t.into())
    }

    pub fn to_local(&self, world: &Point) -> Result<Point> {
        Ok(self.try_inverse()?.to_world(world))
    }
}

/// Unvalidated serde representation of a [Frame].
#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct FrameData {
    linear: [[f64; NDIM]; NDIM],
    translation: Point,
}

#[cfg(feature = "serde")]
impl TryFrom<FrameData> for Frame {
    type Error = SuperpositionError;

    fn try_from(value: FrameData) -> Result<Self> {
        Self::try_new(value.linear, value.translation)
    }
}

#[cfg(feature = "serde")]
impl From<Frame> for FrameData {
    fn from(value: Frame) -> Self {
        Self {
            linear: value.linear,
            translation: value.translation,
        }
    }
}

impl Transformation for Frame {
    fn transform_point(&self, pt: &Point) -> Point {
        self.to_world(pt)
    }

    fn invert(&self) -> Option<Arc<dyn Transformation>> {
        self.try_inverse()
            .ok()
            .map(|f| Arc::new(f) as Arc<dyn Transformation>)
    }

    fn is_identity(&self) -> bool {
        *self == Self::identity()
    }
}

use std::ops::Index;

use crate::{NDIM, Point, Result, SuperpositionError};

/// An ordered, owned sequence of finite 3D points.
///
/// Order is meaningful: point `i` of one set corresponds to point `i` of its alignment partner.
/// Constructors validate every coordinate and never pad, truncate, or reorder.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "Vec<Point>", into = "Vec<Point>"))]
pub struct PointSet(Vec<Point>);

impl PointSet {
    pub fn try_from_points(points: Vec<Point>) -> Result<Self> {
        for (index, pt) in points.iter().enumerate() {
            check_finite(index, pt)?;
        }
        Ok(Self(points))
    }

    /// Build from any sequence of coordinate slices, each of which must have exactly 3 values.
    pub fn try_from_coords<C: AsRef<[f64]>>(coords: &[C]) -> Result<Self> {
        let mut points = Vec::with_capacity(coords.len());
        for (index, c) in coords.iter().enumerate() {
            let c = c.as_ref();
            let pt: Point = c
                .try_into()
                .map_err(|_| SuperpositionError::NotThreeDimensional {
                    index,
                    ndim: c.len(),
                })?;
            check_finite(index, &pt)?;
            points.push(pt);
        }
        Ok(Self(points))
    }

    /// Row-major / C order data, with `ncols` values per point.
    pub fn try_from_flat(data: &[f64], ncols: usize) -> Result<Self> {
        if ncols != NDIM {
            return Err(SuperpositionError::NotThreeDimensional {
                index: 0,
                ndim: ncols,
            });
        }
        if data.len() % ncols != 0 {
            return Err(SuperpositionError::NotThreeDimensional {
                index: data.len() / ncols,
                ndim: data.len() % ncols,
            });
        }
        Self::try_from_coords(&data.chunks_exact(ncols).collect::<Vec<_>>())
    }

    /// Columnar data: one slice each for x, y and z.
    pub fn try_from_columns(columns: [&[f64]; NDIM]) -> Result<Self> {
        let lengths = columns.map(|c| c.len());
        if lengths.iter().any(|l| *l != lengths[0]) {
            return Err(SuperpositionError::RaggedColumns { lengths });
        }
        let points = (0..lengths[0])
            .map(|idx| [columns[0][idx], columns[1][idx], columns[2][idx]])
            .collect();
        Self::try_from_points(points)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Point] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<Point> {
        self.0
    }

    /// Copy the points out into x, y and z columns.
    pub fn to_columns(&self) -> [Vec<f64>; NDIM] {
        let mut columns: [Vec<f64>; NDIM] = Default::default();
        for col in columns.iter_mut() {
            col.reserve_exact(self.len());
        }
        for pt in self.0.iter() {
            for (col, v) in columns.iter_mut().zip(pt.iter()) {
                col.push(*v);
            }
        }
        columns
    }
}

fn check_finite(index: usize, pt: &Point) -> Result<()> {
    if pt.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(SuperpositionError::NonFinite { index })
    }
}

impl Index<usize> for PointSet {
    type Output = Point;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl AsRef<[Point]> for PointSet {
    fn as_ref(&self) -> &[Point] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a PointSet {
    type Item = &'a Point;
    type IntoIter = std::slice::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl TryFrom<Vec<Point>> for PointSet {
    type Error = SuperpositionError;

    fn try_from(points: Vec<Point>) -> Result<Self> {
        Self::try_from_points(points)
    }
}

impl From<PointSet> for Vec<Point> {
    fn from(value: PointSet) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_coords_accepts_vecs_and_slices() {
        let coords = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
        let ps = PointSet::try_from_coords(&coords).unwrap();
        assert_eq!(ps.len(), 2);
        assert_eq!(ps[1], [4.0, 5.0, 6.0]);

        let arrs = [[0.0; 3]; 4];
        assert_eq!(PointSet::try_from_coords(&arrs).unwrap().len(), 4);
    }

    #[test]
    fn from_coords_rejects_2d() {
        let coords = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0]];
        let err = PointSet::try_from_coords(&coords).unwrap_err();
        assert_eq!(
            err,
            SuperpositionError::NotThreeDimensional { index: 1, ndim: 2 }
        );
    }

    #[test]
    fn rejects_nan() {
        let err = PointSet::try_from_points(vec![[0.0; 3], [f64::NAN, 0.0, 0.0]]).unwrap_err();
        assert_eq!(err, SuperpositionError::NonFinite { index: 1 });

        let err = PointSet::try_from_coords(&[[f64::INFINITY, 0.0, 0.0]]).unwrap_err();
        assert_eq!(err, SuperpositionError::NonFinite { index: 0 });
    }

    #[test]
    fn from_flat() {
        #[rustfmt::skip]
        let data = [
            1.0, 2.0, 3.0,
            4.0, 5.0, 6.0,
        ];
        let ps = PointSet::try_from_flat(&data, 3).unwrap();
        assert_eq!(ps.as_slice(), &[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);

        assert!(matches!(
            PointSet::try_from_flat(&data, 2),
            Err(SuperpositionError::NotThreeDimensional { ndim: 2, .. })
        ));
        assert!(matches!(
            PointSet::try_from_flat(&data[..5], 3),
            Err(SuperpositionError::NotThreeDimensional { index: 1, ndim: 2 })
        ));
    }

    #[test]
    fn columns_roundtrip() {
        let ps = PointSet::try_from_points(vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap();
        let cols = ps.to_columns();
        assert_eq!(cols[0], vec![1.0, 4.0]);
        assert_eq!(cols[2], vec![3.0, 6.0]);
        let back =
            PointSet::try_from_columns([cols[0].as_slice(), cols[1].as_slice(), cols[2].as_slice()])
                .unwrap();
        assert_eq!(back, ps);
    }

    #[test]
    fn ragged_columns() {
        let xs: &[f64] = &[1.0, 2.0];
        let ys: &[f64] = &[1.0];
        let err = PointSet::try_from_columns([xs, ys, xs]).unwrap_err();
        assert_eq!(
            err,
            SuperpositionError::RaggedColumns { lengths: [2, 1, 2] }
        );
    }

    #[test]
    fn empty_is_constructible() {
        let ps = PointSet::try_from_points(vec![]).unwrap();
        assert!(ps.is_empty());
    }
}

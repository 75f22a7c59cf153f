use crate::{Point, PointSet, Result, Side, SuperpositionError};

/// Arithmetic mean of the points.
///
/// `side` is only used to label the error for an empty set.
pub fn centroid(points: &PointSet, side: Side) -> Result<Point> {
    if points.is_empty() {
        return Err(SuperpositionError::EmptyPointSet { side });
    }
    let mut sum = [0.0; 3];
    for pt in points.iter() {
        for (s, p) in sum.iter_mut().zip(pt.iter()) {
            *s += p;
        }
    }
    let n = points.len() as f64;
    Ok(sum.map(|s| s / n))
}

/// Translate the points so that their centroid lies at the origin.
///
/// Returns the centroid and the shifted copy; the input is left untouched.
/// Fails with [SuperpositionError::NonFinite] if the coordinates are so large that the arithmetic overflows.
pub fn shift(points: &PointSet, side: Side) -> Result<(Point, PointSet)> {
    let c = centroid(points, side)?;
    let shifted = points.iter().map(|pt| sub(pt, &c)).collect();
    Ok((c, PointSet::try_from_points(shifted)?))
}

pub(crate) fn sub(a: &Point, b: &Point) -> Point {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub(crate) fn add(a: &Point, b: &Point) -> Point {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

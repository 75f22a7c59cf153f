use crate::{Point, PointSet, Result, kabsch::check_correspondence};

/// Root-mean-square deviation between two index-aligned point sets:
/// `sqrt(mean_i ‖a[i] − b[i]‖²)`.
///
/// No alignment is performed; pass the static set and the already-transformed mobile set.
pub fn rmsd(a: &PointSet, b: &PointSet) -> Result<f64> {
    check_correspondence(a, b)?;
    let ssd = sum_squared_deviation(a.iter().copied(), b.iter().copied());
    Ok((ssd / a.len() as f64).sqrt())
}

pub(crate) fn sum_squared_deviation(
    a: impl IntoIterator<Item = Point>,
    b: impl IntoIterator<Item = Point>,
) -> f64 {
    a.into_iter()
        .zip(b)
        .map(|(pa, pb)| {
            pa.iter()
                .zip(pb.iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f64>()
        })
        .sum()
}

//! Optimal rotation between two correspondence-ordered point sets (Kabsch algorithm).
//!
//! Both sets are shifted to their centroids, the 3x3 cross-covariance
//! `H = static_shiftedᵀ · mobile_shifted` is decomposed as `H = V Σ Wᵀ`,
//! and the rotation is `R = V Wᵀ`, with the last column of `V` negated
//! whenever `det(V) · det(W) < 0` so that `R` is never a reflection.
//!
//! The resulting [Alignment] maps the mobile set onto the static set.
//!
//! Degenerate correspondences (fewer than 3 points, or all points collinear or coincident)
//! still produce a proper rotation, but not a unique one;
//! see [DegeneracyPolicy] for how this is reported.

use nalgebra::{Matrix3, Vector3};

use crate::{
    Alignment, NDIM, PointSet, Result, RotationMatrix, Side, SuperpositionError,
    centroid::shift,
};

/// What to do when the covariance matrix has rank < 2,
/// i.e. the rotation is not uniquely determined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DegeneracyPolicy {
    /// Return the result silently.
    Ignore,
    /// Return the result and emit a `log::warn!`.
    #[default]
    Warn,
    /// Fail with [SuperpositionError::DegenerateGeometry].
    Reject,
}

/// Parameters for [superpose_with].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AlignmentParams {
    /// Singular values at or below `tolerance * largest` count as zero when computing rank.
    pub degeneracy_tolerance: f64,
    pub degeneracy_policy: DegeneracyPolicy,
    /// Iteration cap for the SVD; exceeding it fails with [SuperpositionError::SvdDidNotConverge].
    /// 0 means no cap: iterate until convergence.
    pub max_svd_iterations: usize,
}

impl Default for AlignmentParams {
    fn default() -> Self {
        Self {
            degeneracy_tolerance: 1e-9,
            degeneracy_policy: DegeneracyPolicy::Warn,
            max_svd_iterations: 1000,
        }
    }
}

impl AlignmentParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_degeneracy_tolerance(mut self, tolerance: f64) -> Self {
        self.degeneracy_tolerance = tolerance;
        self
    }

    pub fn with_degeneracy_policy(mut self, policy: DegeneracyPolicy) -> Self {
        self.degeneracy_policy = policy;
        self
    }

    pub fn with_max_svd_iterations(mut self, max_iterations: usize) -> Self {
        self.max_svd_iterations = max_iterations;
        self
    }
}

/// Diagnostics of the covariance decomposition behind an [Alignment].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Conditioning {
    /// Singular values of the covariance matrix, descending.
    /// The last one is negated when the handedness correction was applied.
    pub singular_values: [f64; NDIM],
    /// Numerical rank of the covariance matrix.
    pub rank: usize,
    /// Whether the naive SVD product was a reflection and had to be corrected.
    pub handedness_corrected: bool,
}

impl Conditioning {
    /// With rank < 2 there is a family of equally optimal rotations.
    pub fn is_degenerate(&self) -> bool {
        self.rank < 2
    }
}

/// Compute the alignment of `mobile` onto `stat` with default parameters.
///
/// Point `i` of `mobile` corresponds to point `i` of `stat`.
pub fn superpose(stat: &PointSet, mobile: &PointSet) -> Result<Alignment> {
    superpose_with(stat, mobile, &AlignmentParams::default())
}

/// Compute the alignment of `mobile` onto `stat`.
///
/// # Errors
///
/// - [SuperpositionError::EmptyPointSet] if either set is empty
/// - [SuperpositionError::CardinalityMismatch] if the sets have different lengths
/// - [SuperpositionError::SvdDidNotConverge] if the decomposition fails
/// - [SuperpositionError::DegenerateGeometry] if the geometry is degenerate
///   and the policy is [DegeneracyPolicy::Reject]
pub fn superpose_with(
    stat: &PointSet,
    mobile: &PointSet,
    params: &AlignmentParams,
) -> Result<Alignment> {
    check_correspondence(stat, mobile)?;

    let (centroid_static, static_shifted) = shift(stat, Side::Static)?;
    let (centroid_mobile, mobile_shifted) = shift(mobile, Side::Mobile)?;

    let cov = covariance(&static_shifted, &mobile_shifted);
    log::trace!("covariance matrix: {cov}");

    let (rotation, conditioning) = optimal_rotation(cov, params)?;
    log::debug!(
        "superposed {} points: rank={}, handedness_corrected={}, angle={:.6}",
        stat.len(),
        conditioning.rank,
        conditioning.handedness_corrected,
        rotation.angle()
    );

    if conditioning.is_degenerate() {
        match params.degeneracy_policy {
            DegeneracyPolicy::Ignore => {}
            DegeneracyPolicy::Warn => log::warn!(
                "degenerate correspondences ({} points, covariance rank {}): rotation is not unique",
                stat.len(),
                conditioning.rank
            ),
            DegeneracyPolicy::Reject => {
                return Err(SuperpositionError::DegenerateGeometry {
                    rank: conditioning.rank,
                });
            }
        }
    }

    Ok(Alignment::new(
        centroid_static,
        centroid_mobile,
        rotation,
        conditioning,
    ))
}

/// Both sets must be non-empty and of equal length.
pub(crate) fn check_correspondence(stat: &PointSet, mobile: &PointSet) -> Result<()> {
    if stat.is_empty() {
        return Err(SuperpositionError::EmptyPointSet { side: Side::Static });
    }
    if mobile.is_empty() {
        return Err(SuperpositionError::EmptyPointSet { side: Side::Mobile });
    }
    if stat.len() != mobile.len() {
        return Err(SuperpositionError::CardinalityMismatch {
            static_len: stat.len(),
            mobile_len: mobile.len(),
        });
    }
    Ok(())
}

/// Cross-covariance `H = aᵀ · b`, summed over all correspondences.
fn covariance(a: &PointSet, b: &PointSet) -> Matrix3<f64> {
    let mut h = Matrix3::zeros();
    for (pa, pb) in a.iter().zip(b.iter()) {
        h += Vector3::from(*pa) * Vector3::from(*pb).transpose();
    }
    h
}

/// Rotation minimising the squared distances, given the covariance of two centred sets.
fn optimal_rotation(
    cov: Matrix3<f64>,
    params: &AlignmentParams,
) -> Result<(RotationMatrix, Conditioning)> {
    let not_converged = SuperpositionError::SvdDidNotConverge {
        max_iterations: params.max_svd_iterations,
    };
    let svd = cov
        .try_svd(true, true, f64::EPSILON, params.max_svd_iterations)
        .ok_or_else(|| not_converged.clone())?;
    let mut v = svd.u.ok_or_else(|| not_converged.clone())?;
    let w_t = svd.v_t.ok_or(not_converged)?;
    let mut singular_values: [f64; NDIM] = svd.singular_values.into();

    let handedness_corrected = v.determinant() * w_t.determinant() < 0.0;
    if handedness_corrected {
        singular_values[NDIM - 1] = -singular_values[NDIM - 1];
        for r in 0..NDIM {
            v[(r, NDIM - 1)] = -v[(r, NDIM - 1)];
        }
    }

    let rotation = RotationMatrix::from_nalgebra_unchecked(&(v * w_t));
    let conditioning = Conditioning {
        singular_values,
        rank: rank(&singular_values, params.degeneracy_tolerance),
        handedness_corrected,
    };
    Ok((rotation, conditioning))
}

fn rank(singular_values: &[f64; NDIM], tolerance: f64) -> usize {
    let largest = singular_values
        .iter()
        .map(|s| s.abs())
        .fold(0.0_f64, f64::max);
    if largest == 0.0 {
        return 0;
    }
    singular_values
        .iter()
        .filter(|s| s.abs() > tolerance * largest)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{
        SMALL_NUMBER, init_logger, new_rng, random_point_set, random_point_set_seeded,
        random_rotation, random_translation,
    };
    use crate::{Transformation, rmsd};
    use approx::assert_relative_eq;

    fn triangle() -> PointSet {
        PointSet::try_from_points(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]).unwrap()
    }

    fn assert_proper_rotation(r: &RotationMatrix) {
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-9);
        let rtr = r.transpose().to_nalgebra() * r.to_nalgebra();
        assert_relative_eq!(rtr, Matrix3::identity(), epsilon = 1e-9);
    }

    #[test]
    fn quarter_turn_about_z() {
        init_logger();
        let stat = triangle();
        let mobile =
            PointSet::try_from_points(vec![[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [-1.0, 0.0, 0.0]])
                .unwrap();

        let alignment = superpose(&stat, &mobile).unwrap();

        #[rustfmt::skip]
        let expected = [
            0.0, 1.0, 0.0,
            -1.0, 0.0, 0.0,
            0.0, 0.0, 1.0,
        ];
        assert_relative_eq!(
            alignment.rotation().as_row_major().as_slice(),
            expected.as_slice(),
            epsilon = 1e-9
        );
        let third = 1.0 / 3.0;
        assert_relative_eq!(
            alignment.centroid_static().as_slice(),
            [third, third, 0.0].as_slice(),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            alignment.centroid_mobile().as_slice(),
            [-third, third, 0.0].as_slice(),
            epsilon = 1e-12
        );
        assert!(alignment.rmsd(&stat, &mobile).unwrap() < 1e-9);
    }

    #[test]
    fn self_alignment_is_identity() {
        init_logger();
        let ps = random_point_set(50);
        let alignment = superpose(&ps, &ps).unwrap();
        assert!(alignment.rotation().is_near_identity(1e-9));
        assert!(alignment.rmsd(&ps, &ps).unwrap() < 1e-9);
        assert!(!alignment.conditioning().handedness_corrected);
        assert_eq!(alignment.conditioning().rank, 3);
    }

    #[test]
    fn recovers_known_rotation() {
        init_logger();
        let mut rng = new_rng();
        for _ in 0..20 {
            let r0 = random_rotation(&mut rng);
            let t0 = random_translation(&mut rng);
            let stat = random_point_set(10);
            // mobile = R0ᵀ (static - t0), so static = R0 mobile + t0
            let inv = r0.transpose();
            let mobile = PointSet::try_from_points(
                stat.iter()
                    .map(|p| inv.matmul(&[p[0] - t0[0], p[1] - t0[1], p[2] - t0[2]]))
                    .collect(),
            )
            .unwrap();

            let alignment = superpose(&stat, &mobile).unwrap();
            assert_relative_eq!(
                alignment.rotation().as_row_major().as_slice(),
                r0.as_row_major().as_slice(),
                epsilon = 1e-8
            );
            assert_relative_eq!(alignment.translation().as_slice(), t0.as_slice(), epsilon = 1e-6);
            assert!(alignment.rmsd(&stat, &mobile).unwrap() < 1e-8);
        }
    }

    #[test]
    fn translation_invariance() {
        init_logger();
        let mut rng = new_rng();
        let r0 = random_rotation(&mut rng);
        let stat = random_point_set(20);
        let mobile = r0.transform_points(&stat).unwrap();
        let base = superpose(&stat, &mobile).unwrap();

        let t = [12.5, -40.0, 3.25];
        let shift_by = |ps: &PointSet| {
            PointSet::try_from_points(
                ps.iter()
                    .map(|p| [p[0] + t[0], p[1] + t[1], p[2] + t[2]])
                    .collect(),
            )
            .unwrap()
        };
        let stat_t = shift_by(&stat);
        let mobile_t = shift_by(&mobile);
        let moved = superpose(&stat_t, &mobile_t).unwrap();

        assert_relative_eq!(
            moved.rotation().as_row_major().as_slice(),
            base.rotation().as_row_major().as_slice(),
            epsilon = 1e-9
        );
        for dim in 0..NDIM {
            assert_relative_eq!(
                moved.centroid_static()[dim],
                base.centroid_static()[dim] + t[dim],
                epsilon = 1e-9
            );
            assert_relative_eq!(
                moved.centroid_mobile()[dim],
                base.centroid_mobile()[dim] + t[dim],
                epsilon = 1e-9
            );
        }
        assert_relative_eq!(
            moved.rmsd(&stat_t, &mobile_t).unwrap(),
            base.rmsd(&stat, &mobile).unwrap(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn mirror_image_gets_proper_rotation() {
        init_logger();
        // a chiral tetrahedron and its mirror image through the YZ plane
        let stat = PointSet::try_from_points(vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 2.0, 0.0],
            [0.0, 0.0, 3.0],
        ])
        .unwrap();
        let mobile = PointSet::try_from_points(
            stat.iter().map(|p| [-p[0], p[1], p[2]]).collect(),
        )
        .unwrap();

        let alignment = superpose(&stat, &mobile).unwrap();
        let cond = alignment.conditioning();
        assert!(cond.handedness_corrected);
        assert!(cond.singular_values[2] <= 0.0);
        assert_proper_rotation(alignment.rotation());
        // a reflection would fit exactly; the best proper rotation cannot
        assert!(alignment.rmsd(&stat, &mobile).unwrap() > SMALL_NUMBER);
    }

    #[test]
    fn always_orthonormal_with_unit_determinant() {
        init_logger();
        for (n, seed) in [(3, 1), (4, 2), (7, 3), (100, 4)] {
            let stat = random_point_set_seeded(n, seed);
            let mobile = random_point_set_seeded(n, seed + 100);
            let alignment = superpose(&stat, &mobile).unwrap();
            assert_proper_rotation(alignment.rotation());
            let r = alignment.rmsd(&stat, &mobile).unwrap();
            assert!(r.is_finite() && r >= 0.0);
        }
    }

    #[test]
    fn rejects_cardinality_mismatch() {
        let stat = random_point_set(4);
        let mobile = random_point_set(5);
        assert_eq!(
            superpose(&stat, &mobile).unwrap_err(),
            SuperpositionError::CardinalityMismatch {
                static_len: 4,
                mobile_len: 5
            }
        );
    }

    #[test]
    fn svd_iteration_cap_is_an_error() {
        init_logger();
        let stat = random_point_set(10);
        let mobile = random_point_set_seeded(10, 2);
        for max_iterations in [1, 2, 3] {
            let params = AlignmentParams::new().with_max_svd_iterations(max_iterations);
            assert_eq!(
                superpose_with(&stat, &mobile, &params).unwrap_err(),
                SuperpositionError::SvdDidNotConverge { max_iterations }
            );
        }

        let uncapped = AlignmentParams::new().with_max_svd_iterations(0);
        let alignment = superpose_with(&stat, &mobile, &uncapped).unwrap();
        assert_proper_rotation(alignment.rotation());
    }

    #[test]
    fn rejects_empty() {
        let ps = random_point_set(3);
        assert_eq!(
            superpose(&PointSet::default(), &ps).unwrap_err(),
            SuperpositionError::EmptyPointSet { side: Side::Static }
        );
        assert_eq!(
            superpose(&ps, &PointSet::default()).unwrap_err(),
            SuperpositionError::EmptyPointSet { side: Side::Mobile }
        );
    }

    #[test]
    fn collinear_points_are_flagged() {
        init_logger();
        let line = PointSet::try_from_points(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]])
            .unwrap();
        let moved =
            PointSet::try_from_points(vec![[5.0, 0.0, 0.0], [5.0, 1.0, 0.0], [5.0, 2.0, 0.0]])
                .unwrap();

        let alignment = superpose(&line, &moved).unwrap();
        assert_eq!(alignment.conditioning().rank, 1);
        assert!(alignment.conditioning().is_degenerate());
        assert_proper_rotation(alignment.rotation());
        assert!(alignment.rmsd(&line, &moved).unwrap() < 1e-9);

        let params = AlignmentParams::new().with_degeneracy_policy(DegeneracyPolicy::Reject);
        assert_eq!(
            superpose_with(&line, &moved, &params).unwrap_err(),
            SuperpositionError::DegenerateGeometry { rank: 1 }
        );
    }

    #[test]
    fn single_point_is_pure_translation() {
        let stat = PointSet::try_from_points(vec![[1.0, 2.0, 3.0]]).unwrap();
        let mobile = PointSet::try_from_points(vec![[-4.0, 0.0, 9.0]]).unwrap();
        let params = AlignmentParams::new().with_degeneracy_policy(DegeneracyPolicy::Ignore);
        let alignment = superpose_with(&stat, &mobile, &params).unwrap();
        assert_eq!(alignment.conditioning().rank, 0);
        assert_proper_rotation(alignment.rotation());
        let moved = alignment.apply(&mobile).unwrap();
        assert_relative_eq!(moved[0].as_slice(), stat[0].as_slice(), epsilon = 1e-12);
    }

    #[test]
    fn rmsd_matches_free_function() {
        let mut rng = new_rng();
        let stat = random_point_set(30);
        let mobile = random_rotation(&mut rng)
            .transform_points(&random_point_set_seeded(30, 7))
            .unwrap();
        let alignment = superpose(&stat, &mobile).unwrap();
        let moved = alignment.apply(&mobile).unwrap();
        assert_relative_eq!(
            alignment.rmsd(&stat, &mobile).unwrap(),
            rmsd(&stat, &moved).unwrap(),
            epsilon = 1e-12
        );
    }
}

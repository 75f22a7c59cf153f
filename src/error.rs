use std::fmt;

use thiserror::Error;

/// Which of the two correspondence sets an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    Static,
    Mobile,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Static => f.write_str("static"),
            Side::Mobile => f.write_str("mobile"),
        }
    }
}

/// Errors that can occur while building point sets, aligning them, or applying the result.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SuperpositionError {
    /// A point set with no points was given where at least one is needed.
    #[error("{side} point set has no points")]
    EmptyPointSet { side: Side },

    /// Static and mobile sets must be index-aligned, so their lengths must match.
    #[error(
        "both point sets need the same number of points; got {static_len} points for static but {mobile_len} points for mobile"
    )]
    CardinalityMismatch {
        static_len: usize,
        mobile_len: usize,
    },

    #[error("coordinate {index} has {ndim} values, expected 3")]
    NotThreeDimensional { index: usize, ndim: usize },

    #[error("coordinate {index} contains a NaN or infinite value")]
    NonFinite { index: usize },

    #[error("coordinate columns have different lengths: {lengths:?}")]
    RaggedColumns { lengths: [usize; 3] },

    #[error("invalid matrix: {0}")]
    InvalidMatrix(String),

    /// The singular value decomposition of the covariance matrix did not converge.
    #[error("SVD of the covariance matrix did not converge within {max_iterations} iterations")]
    SvdDidNotConverge { max_iterations: usize },

    /// Rejected because the correspondences do not determine a unique rotation.
    #[error("correspondences are degenerate (covariance rank {rank}); rotation is not unique")]
    DegenerateGeometry { rank: usize },

    #[error("frame has a singular linear part and cannot be inverted")]
    SingularFrame,
}

pub type Result<T, E = SuperpositionError> = std::result::Result<T, E>;

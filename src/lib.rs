//! Rigid superposition of 3D point sets.
//!
//! Given two index-aligned point sets, [superpose] finds the proper rotation and translation
//! which best maps the "mobile" set onto the "static" set in the least-squares sense,
//! and [Alignment::apply] moves any further points of the mobile object the same way.

mod error;
pub use error::{Result, Side, SuperpositionError};

mod point_set;
pub use point_set::PointSet;

mod centroid;
pub use centroid::{centroid, shift};

mod matrix;
pub use matrix::RotationMatrix;

mod transformation;
pub use transformation::Transformation;

mod kabsch;
pub use kabsch::{AlignmentParams, Conditioning, DegeneracyPolicy, superpose, superpose_with};

mod alignment;
pub use alignment::Alignment;

mod score;
pub use score::rmsd;

mod frame;
pub use frame::Frame;

mod request;
pub use request::{SuperpositionRequest, SuperpositionResponse};

#[cfg(feature = "ndarray")]
mod ndarr;

/// Points are always 3D.
pub const NDIM: usize = 3;

pub type Point = [f64; NDIM];

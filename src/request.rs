use crate::{
    Alignment, AlignmentParams, Frame, PointSet, Result, Transformation, superpose_with,
};

/// Everything needed for one superposition: the correspondence sets,
/// optionally a larger set to move along with them, and parameters.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SuperpositionRequest {
    pub static_points: PointSet,
    pub mobile_points: PointSet,
    /// Points in the mobile object's frame to be moved into the static frame,
    /// e.g. every vertex of the mobile mesh.
    #[cfg_attr(feature = "serde", serde(default))]
    pub targets: Option<PointSet>,
    /// If given, `targets` are local coordinates in this frame and results are returned in it too;
    /// the correspondence sets are always world coordinates.
    #[cfg_attr(feature = "serde", serde(default))]
    pub target_frame: Option<Frame>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub params: AlignmentParams,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SuperpositionResponse {
    pub alignment: Alignment,
    /// The mobile correspondence set after alignment.
    pub transformed_mobile: PointSet,
    pub transformed_targets: Option<PointSet>,
    /// Between the static set and `transformed_mobile`.
    pub rmsd: f64,
}

impl SuperpositionRequest {
    pub fn new(static_points: PointSet, mobile_points: PointSet) -> Self {
        Self {
            static_points,
            mobile_points,
            ..Default::default()
        }
    }

    pub fn with_targets(mut self, targets: PointSet) -> Self {
        self.targets = Some(targets);
        self
    }

    pub fn with_target_frame(mut self, frame: Frame) -> Self {
        self.target_frame = Some(frame);
        self
    }

    pub fn with_params(mut self, params: AlignmentParams) -> Self {
        self.params = params;
        self
    }

    pub fn run(&self) -> Result<SuperpositionResponse> {
        let alignment = superpose_with(&self.static_points, &self.mobile_points, &self.params)?;
        let transformed_mobile = alignment.transform_points(&self.mobile_points)?;
        let rmsd = crate::rmsd(&self.static_points, &transformed_mobile)?;

        let transformed_targets = match (&self.targets, &self.target_frame) {
            (None, _) => None,
            (Some(t), None) => Some(alignment.apply(t)?),
            (Some(t), Some(frame)) => Some(alignment.apply_in_frame(t, frame)?),
        };
        log::debug!(
            "superposition request done: rmsd={rmsd:.6}, {} targets moved",
            transformed_targets.as_ref().map_or(0, PointSet::len)
        );

        Ok(SuperpositionResponse {
            alignment,
            transformed_mobile,
            transformed_targets,
            rmsd,
        })
    }
}

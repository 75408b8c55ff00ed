//! Subdivides primitives into smaller primitives.

use crate::ValidationError;

/// The maximum number of control points of a patch.
pub const MAX_PATCH_CONTROL_POINTS: u32 = 32;

/// The state in a graphics pipeline describing the tessellation shader execution of a graphics
/// pipeline.
#[derive(Clone, Copy, Debug)]
pub struct TessellationState {
    /// The number of patch control points to use.
    ///
    /// The default value is 3.
    pub patch_control_points: u32,

    pub _ne: crate::NonExhaustive,
}

impl Default for TessellationState {
    #[inline]
    fn default() -> Self {
        Self {
            patch_control_points: 3,
            _ne: crate::NonExhaustive(()),
        }
    }
}

impl TessellationState {
    pub(crate) fn validate(&self) -> Result<(), Box<ValidationError>> {
        let &Self {
            patch_control_points,
            _ne: _,
        } = self;

        if !(1..=MAX_PATCH_CONTROL_POINTS).contains(&patch_control_points) {
            return Err(Box::new(ValidationError {
                context: "patch_control_points".into(),
                problem: "is zero or greater than the `max_tessellation_patch_size` limit".into(),
                vuids: &["VUID-VkPipelineTessellationStateCreateInfo-patchControlPoints-01214"],
                ..Default::default()
            }));
        }

        Ok(())
    }
}

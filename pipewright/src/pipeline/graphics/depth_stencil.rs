//! Configures the operation of the depth, stencil and depth bounds tests.
//!
//! The depth test passes or fails depending on how the depth value of each fragment compares
//! to the existing depth value in the depth buffer at that fragment's location. Depth values
//! are always between 0.0 and 1.0.
//!
//! The depth bounds test allows you to ask the GPU to exclude fragments that are outside of a
//! certain range. This is done in addition to the regular depth test.
//!
//! The stencil test passes or fails depending on how a reference value compares to the existing
//! value in the stencil buffer at each fragment's location. Depending on the outcome of the
//! depth and stencil tests, the value of the stencil buffer at that location can be updated.
//!
//! # Front and back faces
//!
//! The native depth-stencil description has separate operations for the two faces, but a single
//! compare mask, write mask and reference value. When the two faces need different values and
//! neither is culled away, the front face wins and a warning is logged.

use super::rasterization::CullMode;
use crate::{macros::vulkan_enum, ValidationError};
use std::ops::RangeInclusive;

/// The state in a graphics pipeline describing how the depth, depth bounds and stencil tests
/// should behave.
#[derive(Clone, Debug)]
pub struct DepthStencilState {
    /// The state of the depth test.
    ///
    /// If set to `None`, the depth test is disabled, all fragments will pass and no depth writes
    /// are performed.
    ///
    /// The default value is `None`.
    pub depth: Option<DepthState>,

    /// The range of depth values that pass the depth bounds test.
    ///
    /// If set to `None`, the depth bounds test is disabled, all fragments will pass. The range is
    /// ignored if [`DynamicState::DepthBounds`](crate::pipeline::DynamicState) is enabled, but the
    /// test is still enabled.
    ///
    /// The default value is `None`.
    pub depth_bounds: Option<RangeInclusive<f32>>,

    /// The state of the stencil test.
    ///
    /// If set to `None`, the stencil test is disabled, all fragments will pass and no stencil
    /// writes are performed.
    ///
    /// The default value is `None`.
    pub stencil: Option<StencilState>,

    pub _ne: crate::NonExhaustive,
}

impl Default for DepthStencilState {
    #[inline]
    fn default() -> Self {
        Self {
            depth: None,
            depth_bounds: None,
            stencil: None,
            _ne: crate::NonExhaustive(()),
        }
    }
}

impl DepthStencilState {
    /// Creates a `DepthStencilState` with a `Less` depth test, `depth_write` set to true, and
    /// other tests disabled.
    #[inline]
    pub fn simple() -> Self {
        Self {
            depth: Some(DepthState::simple()),
            ..Default::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Box<ValidationError>> {
        let &Self {
            depth: _,
            ref depth_bounds,
            stencil: _,
            _ne: _,
        } = self;

        if let Some(bounds) = depth_bounds {
            if !(0.0..=1.0).contains(bounds.start()) || !(0.0..=1.0).contains(bounds.end()) {
                return Err(Box::new(ValidationError {
                    context: "depth_bounds".into(),
                    problem: "is not between 0.0 and 1.0 inclusive".into(),
                    vuids: &["VUID-VkPipelineDepthStencilStateCreateInfo-depthBoundsTestEnable-02510"],
                    ..Default::default()
                }));
            }
        }

        Ok(())
    }

    /// Translates the state into its native description, along with the stencil values the
    /// pipeline must keep for draw time.
    pub(crate) fn to_native(
        &self,
        cull_mode: CullMode,
        dynamic: DynamicStencil,
    ) -> (NativeDepthStencilDesc, Option<StencilTest>) {
        let mut desc = NativeDepthStencilDesc {
            depth_bounds_test_enable: self.depth_bounds.is_some(),
            ..Default::default()
        };

        if let Some(depth) = &self.depth {
            desc.depth_enable = true;
            desc.depth_write_mask = if depth.write_enable {
                NativeDepthWriteMask::All
            } else {
                NativeDepthWriteMask::Zero
            };
            desc.depth_func = depth.compare_op.to_native();
        }

        let Some(stencil) = &self.stencil else {
            return (desc, None);
        };

        desc.stencil_enable = true;
        desc.front_face = stencil.front.ops.to_native();
        desc.back_face = stencil.back.ops.to_native();

        let test = StencilTest::new(stencil, self.depth.as_ref(), cull_mode, dynamic);

        if test.independent_front_back {
            tracing::warn!(
                "independent front and back stencil state is not supported, \
                using the front face state",
            );
        }

        // The native description has one set of masks, the front face takes priority.
        let read_mask = if test.front.test_uses_reference {
            test.front.compare_mask
        } else if test.back.test_uses_reference {
            test.back.compare_mask
        } else {
            0
        };
        let write_mask = if test.front.write_mask != 0 {
            test.front.write_mask
        } else {
            test.back.write_mask
        };

        desc.stencil_read_mask = read_mask as u8;
        desc.stencil_write_mask = write_mask as u8;

        (desc, Some(test))
    }
}

/// The state of the depth test.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepthState {
    /// Sets whether the value in the depth buffer will be updated when the depth test succeeds.
    ///
    /// The default value is `false`.
    pub write_enable: bool,

    /// Comparison operation to use between the depth value of each incoming fragment and the
    /// depth value currently in the depth buffer.
    ///
    /// The default value is [`CompareOp::Always`].
    pub compare_op: CompareOp,
}

impl Default for DepthState {
    #[inline]
    fn default() -> Self {
        Self {
            write_enable: false,
            compare_op: CompareOp::Always,
        }
    }
}

impl DepthState {
    /// Returns a `DepthState` with a `Less` depth test and depth writes enabled.
    #[inline]
    pub fn simple() -> Self {
        Self {
            write_enable: true,
            compare_op: CompareOp::Less,
        }
    }
}

/// The state of the stencil test.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StencilState {
    /// The stencil operation state to use for points and lines, and for triangles whose front is
    /// facing the user.
    pub front: StencilOpState,

    /// The stencil operation state to use for triangles whose back is facing the user.
    pub back: StencilOpState,
}

/// Stencil test operations for a single face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StencilOpState {
    /// The stencil operations to perform.
    ///
    /// The default value is `StencilOps::default()`.
    pub ops: StencilOps,

    /// A bitmask that selects the bits of the unsigned integer stencil values participating in
    /// the stencil test. Ignored if `compare_op` is `Never` or `Always`.
    ///
    /// The default value is `u32::MAX`.
    pub compare_mask: u32,

    /// A bitmask that selects the bits of the unsigned integer stencil values updated by the
    /// stencil test in the stencil framebuffer attachment.
    ///
    /// The default value is `u32::MAX`.
    pub write_mask: u32,

    /// Reference value that is used in the unsigned stencil comparison.
    ///
    /// The default value is `0`.
    pub reference: u32,
}

impl Default for StencilOpState {
    #[inline]
    fn default() -> StencilOpState {
        StencilOpState {
            ops: Default::default(),
            compare_mask: u32::MAX,
            write_mask: u32::MAX,
            reference: 0,
        }
    }
}

/// The operations of the stencil test for a single face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StencilOps {
    /// The operation to perform when the stencil test failed.
    ///
    /// The default value is [`StencilOp::Keep`].
    pub fail_op: StencilOp,

    /// The operation to perform when both the depth test and the stencil test passed.
    ///
    /// The default value is [`StencilOp::Keep`].
    pub pass_op: StencilOp,

    /// The operation to perform when the stencil test passed but the depth test failed.
    ///
    /// The default value is [`StencilOp::Keep`].
    pub depth_fail_op: StencilOp,

    /// The comparison to perform between the existing stencil value in the stencil buffer, and
    /// the reference value (given by `reference`).
    ///
    /// The default value is [`CompareOp::Never`].
    pub compare_op: CompareOp,
}

impl Default for StencilOps {
    #[inline]
    fn default() -> Self {
        Self {
            pass_op: StencilOp::Keep,
            fail_op: StencilOp::Keep,
            depth_fail_op: StencilOp::Keep,
            compare_op: CompareOp::Never,
        }
    }
}

impl StencilOps {
    fn to_native(self) -> NativeStencilFaceDesc {
        NativeStencilFaceDesc {
            stencil_fail_op: self.fail_op.to_native(),
            stencil_depth_fail_op: self.depth_fail_op.to_native(),
            stencil_pass_op: self.pass_op.to_native(),
            stencil_func: self.compare_op.to_native(),
        }
    }
}

/// Which stencil values of a pipeline are set at draw time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct DynamicStencil {
    pub(crate) compare_mask: bool,
    pub(crate) write_mask: bool,
    pub(crate) reference: bool,
}

/// The stencil values a graphics pipeline keeps after translation.
///
/// Dynamic values are zero here, except the compare mask of a face that uses the reference,
/// which is `u32::MAX` so the mask set at draw time applies in full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StencilTest {
    pub front: StencilFaceTest,
    pub back: StencilFaceTest,
    pub dynamic_compare_mask: bool,
    pub dynamic_write_mask: bool,
    pub dynamic_reference: bool,
    /// The faces need different masks or references, which the native state can't express.
    pub independent_front_back: bool,
}

/// The stencil values of one face.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StencilFaceTest {
    pub compare_mask: u32,
    pub write_mask: u32,
    pub reference: u32,
    /// The comparison reads the reference value.
    pub test_uses_reference: bool,
    /// The comparison or one of the write operations reads the reference value.
    pub uses_reference: bool,
}

impl StencilTest {
    fn new(
        stencil: &StencilState,
        depth: Option<&DepthState>,
        cull_mode: CullMode,
        dynamic: DynamicStencil,
    ) -> Self {
        let (front, back) = (&stencil.front, &stencil.back);

        let test_uses_ref = |face: &StencilOpState, culled: bool| {
            !culled
                && !matches!(face.ops.compare_op, CompareOp::Never | CompareOp::Always)
                && (dynamic.compare_mask || face.compare_mask != 0)
        };

        let write_uses_ref = |face: &StencilOpState, culled: bool| {
            let depth_op = depth.map(|depth| depth.compare_op);

            !culled
                && ((face.ops.compare_op != CompareOp::Always
                    && face.ops.fail_op == StencilOp::Replace)
                    || (face.ops.compare_op != CompareOp::Never
                        && depth_op != Some(CompareOp::Never)
                        && face.ops.pass_op == StencilOp::Replace)
                    || (depth_op.is_some_and(|op| op != CompareOp::Always)
                        && face.ops.depth_fail_op == StencilOp::Replace))
        };

        let face = |state: &StencilOpState, culled: bool| {
            let test_uses_reference = test_uses_ref(state, culled);
            let compare_mask = match (test_uses_reference, dynamic.compare_mask) {
                (true, true) => u32::MAX,
                (true, false) => state.compare_mask,
                (false, _) => 0,
            };

            StencilFaceTest {
                compare_mask,
                write_mask: if dynamic.write_mask || culled {
                    0
                } else {
                    state.write_mask
                },
                reference: if dynamic.reference {
                    0
                } else {
                    state.reference
                },
                test_uses_reference,
                uses_reference: test_uses_reference || write_uses_ref(state, culled),
            }
        };

        let front_test = face(front, cull_mode.culls_front());
        let back_test = face(back, cull_mode.culls_back());
        let no_cull = cull_mode == CullMode::None;

        let diff_write_mask =
            no_cull && (dynamic.write_mask || front.write_mask != back.write_mask);
        let diff_reference = no_cull && (dynamic.reference || front.reference != back.reference);
        let diff_compare_mask = front_test.test_uses_reference
            && back_test.test_uses_reference
            && (dynamic.compare_mask || front_test.compare_mask != back_test.compare_mask);

        let independent_front_back = diff_compare_mask
            || diff_write_mask
            || (diff_reference && front_test.uses_reference && back_test.uses_reference);

        StencilTest {
            front: front_test,
            back: back_test,
            dynamic_compare_mask: dynamic.compare_mask,
            dynamic_write_mask: dynamic.write_mask,
            dynamic_reference: dynamic.reference,
            independent_front_back,
        }
    }
}

vulkan_enum! {
    #[non_exhaustive]

    /// Operation to perform after the depth and stencil tests.
    StencilOp = StencilOp(i32);

    /// Keep the current value.
    Keep = KEEP,

    /// Set the value to 0.
    Zero = ZERO,

    /// Set the value to the reference value.
    Replace = REPLACE,

    /// Increment the value, clamping to the maximum.
    IncrementAndClamp = INCREMENT_AND_CLAMP,

    /// Decrement the value, clamping to 0.
    DecrementAndClamp = DECREMENT_AND_CLAMP,

    /// Invert the bits of the value.
    Invert = INVERT,

    /// Increment the value, wrapping around to 0 on overflow.
    IncrementAndWrap = INCREMENT_AND_WRAP,

    /// Decrement the value, wrapping around to the maximum on underflow.
    DecrementAndWrap = DECREMENT_AND_WRAP,
}

impl StencilOp {
    fn to_native(self) -> NativeStencilOp {
        match self {
            Self::Keep => NativeStencilOp::Keep,
            Self::Zero => NativeStencilOp::Zero,
            Self::Replace => NativeStencilOp::Replace,
            Self::IncrementAndClamp => NativeStencilOp::IncrSat,
            Self::DecrementAndClamp => NativeStencilOp::DecrSat,
            Self::Invert => NativeStencilOp::Invert,
            Self::IncrementAndWrap => NativeStencilOp::Incr,
            Self::DecrementAndWrap => NativeStencilOp::Decr,
        }
    }
}

vulkan_enum! {
    #[non_exhaustive]

    /// Specifies how two values should be compared to decide whether a test passes or fails.
    ///
    /// Used for depth testing, stencil testing and sampler comparison.
    CompareOp = CompareOp(i32);

    /// The test never passes.
    Never = NEVER,

    /// The test passes if `value < reference_value`.
    Less = LESS,

    /// The test passes if `value == reference_value`.
    Equal = EQUAL,

    /// The test passes if `value <= reference_value`.
    LessOrEqual = LESS_OR_EQUAL,

    /// The test passes if `value > reference_value`.
    Greater = GREATER,

    /// The test passes if `value != reference_value`.
    NotEqual = NOT_EQUAL,

    /// The test passes if `value >= reference_value`.
    GreaterOrEqual = GREATER_OR_EQUAL,

    /// The test always passes.
    Always = ALWAYS,
}

impl CompareOp {
    /// Returns the native comparison function.
    #[inline]
    pub fn to_native(self) -> NativeComparisonFunc {
        match self {
            Self::Never => NativeComparisonFunc::Never,
            Self::Less => NativeComparisonFunc::Less,
            Self::Equal => NativeComparisonFunc::Equal,
            Self::LessOrEqual => NativeComparisonFunc::LessEqual,
            Self::Greater => NativeComparisonFunc::Greater,
            Self::NotEqual => NativeComparisonFunc::NotEqual,
            Self::GreaterOrEqual => NativeComparisonFunc::GreaterEqual,
            Self::Always => NativeComparisonFunc::Always,
        }
    }
}

/// A native comparison function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum NativeComparisonFunc {
    Never = 1,
    Less = 2,
    Equal = 3,
    LessEqual = 4,
    Greater = 5,
    NotEqual = 6,
    GreaterEqual = 7,
    Always = 8,
}

/// A native stencil operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum NativeStencilOp {
    Keep = 1,
    Zero = 2,
    Replace = 3,
    IncrSat = 4,
    DecrSat = 5,
    Invert = 6,
    Incr = 7,
    Decr = 8,
}

/// Whether depth writes are enabled, natively.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum NativeDepthWriteMask {
    #[default]
    Zero = 0,
    All = 1,
}

/// The native stencil operations of one face.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NativeStencilFaceDesc {
    pub stencil_fail_op: NativeStencilOp,
    pub stencil_depth_fail_op: NativeStencilOp,
    pub stencil_pass_op: NativeStencilOp,
    pub stencil_func: NativeComparisonFunc,
}

impl Default for NativeStencilFaceDesc {
    #[inline]
    fn default() -> Self {
        Self {
            stencil_fail_op: NativeStencilOp::Keep,
            stencil_depth_fail_op: NativeStencilOp::Keep,
            stencil_pass_op: NativeStencilOp::Keep,
            stencil_func: NativeComparisonFunc::Always,
        }
    }
}

/// The native depth-stencil description of a pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NativeDepthStencilDesc {
    pub depth_enable: bool,
    pub depth_write_mask: NativeDepthWriteMask,
    pub depth_func: NativeComparisonFunc,
    pub stencil_enable: bool,
    pub stencil_read_mask: u8,
    pub stencil_write_mask: u8,
    pub front_face: NativeStencilFaceDesc,
    pub back_face: NativeStencilFaceDesc,
    pub depth_bounds_test_enable: bool,
}

impl Default for NativeDepthStencilDesc {
    #[inline]
    fn default() -> Self {
        Self {
            depth_enable: false,
            depth_write_mask: NativeDepthWriteMask::Zero,
            depth_func: NativeComparisonFunc::Less,
            stencil_enable: false,
            stencil_read_mask: 0,
            stencil_write_mask: 0,
            front_face: Default::default(),
            back_face: Default::default(),
            depth_bounds_test_enable: false,
        }
    }
}

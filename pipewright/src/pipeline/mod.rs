//! Describes a graphical or compute operation.
//!
//! There are two kinds of pipelines:
//!
//! - Compute pipelines, for compute operations that read/write raw pixels from images and
//!   buffers.
//! - Graphics pipelines, for graphical operations.
//!
//! Creating a pipeline translates its portable description into a
//! [`PipelineStateStream`](stream::PipelineStateStream), compiles its shader stages through the
//! device's backend and asks the backend for a native pipeline-state object.
//!
//! Pipelines can be created one at a time with `new`, or several at once with `new_batch`, which
//! reports a [`PipelineBatch`].

use crate::{
    macros::{vulkan_bitflags, vulkan_enum},
    Validated, VulkanError,
};
use std::sync::Arc;

pub use self::{compute::ComputePipeline, graphics::GraphicsPipeline, layout::PipelineLayout};

pub mod cache;
pub mod compute;
pub mod graphics;
pub mod indirect;
pub mod layout;
pub mod shader;
pub mod stream;

vulkan_enum! {
    #[non_exhaustive]

    /// The type of a pipeline.
    PipelineBindPoint = PipelineBindPoint(i32);

    /// A pipeline that runs a compute shader.
    Compute = COMPUTE,

    /// A pipeline that rasterizes primitives.
    Graphics = GRAPHICS,
}

vulkan_bitflags! {
    /// Flags specifying how a pipeline is created.
    PipelineCreateFlags = PipelineCreateFlags(u32);

    /// The pipeline will not be optimized.
    DISABLE_OPTIMIZATION = DISABLE_OPTIMIZATION,

    /// Creation of the pipeline fails with
    /// [`VulkanError::PipelineCompileRequired`] if it can't be taken from the pipeline cache.
    FAIL_ON_PIPELINE_COMPILE_REQUIRED = FAIL_ON_PIPELINE_COMPILE_REQUIRED,

    /// When creating a batch, a failure of this pipeline stops the batch, even if it failed with
    /// [`VulkanError::PipelineCompileRequired`].
    EARLY_RETURN_ON_FAILURE = EARLY_RETURN_ON_FAILURE,
}

vulkan_enum! {
    #[non_exhaustive]

    /// A particular state value within a graphics pipeline that can be dynamically set by a
    /// command buffer.
    ///
    /// Only some of them are supported, see [`DynamicState::is_supported`].
    DynamicState = DynamicState(i32);

    /// The elements of `ViewportState::viewports`.
    Viewport = VIEWPORT,

    /// The elements of `ViewportState::scissors`.
    Scissor = SCISSOR,

    /// `RasterizationState::line_width`.
    LineWidth = LINE_WIDTH,

    /// `RasterizationState::depth_bias`.
    DepthBias = DEPTH_BIAS,

    /// `ColorBlendState::blend_constants`.
    BlendConstants = BLEND_CONSTANTS,

    /// `DepthStencilState::depth_bounds`.
    DepthBounds = DEPTH_BOUNDS,

    /// The `compare_mask` of both stencil faces.
    StencilCompareMask = STENCIL_COMPARE_MASK,

    /// The `write_mask` of both stencil faces.
    StencilWriteMask = STENCIL_WRITE_MASK,

    /// The `reference` of both stencil faces.
    StencilReference = STENCIL_REFERENCE,

    /// `RasterizationState::cull_mode`.
    CullMode = CULL_MODE,

    /// `RasterizationState::front_face`.
    FrontFace = FRONT_FACE,

    /// `InputAssemblyState::topology`.
    PrimitiveTopology = PRIMITIVE_TOPOLOGY,

    /// `InputAssemblyState::primitive_restart_enable`.
    PrimitiveRestartEnable = PRIMITIVE_RESTART_ENABLE,

    /// `RasterizationState::rasterizer_discard_enable`.
    RasterizerDiscardEnable = RASTERIZER_DISCARD_ENABLE,
}

impl DynamicState {
    /// Returns whether graphics pipelines accept the state as dynamic.
    #[inline]
    pub fn is_supported(self) -> bool {
        matches!(
            self,
            Self::Viewport
                | Self::Scissor
                | Self::StencilReference
                | Self::StencilCompareMask
                | Self::StencilWriteMask
                | Self::BlendConstants
                | Self::DepthBounds
        )
    }
}

/// The outcome of creating several pipelines at once.
#[derive(Debug)]
pub struct PipelineBatch<P> {
    /// One slot per create info, in order. A slot is `None` if its pipeline failed or was not
    /// attempted.
    pub pipelines: Vec<Option<Arc<P>>>,

    /// The first error of the batch, unless a later error stopped the batch, in which case that
    /// error.
    pub result: Result<(), Validated<VulkanError>>,
}

impl<P> PipelineBatch<P> {
    /// Creates pipelines in order with `create`.
    ///
    /// A failed entry leaves its slot empty. Creation moves on to the next entry only if the
    /// failure was [`VulkanError::PipelineCompileRequired`] and the entry doesn't have
    /// [`PipelineCreateFlags::EARLY_RETURN_ON_FAILURE`]. Otherwise the remaining slots are left
    /// empty.
    pub(crate) fn create<C>(
        create_infos: impl IntoIterator<Item = C>,
        flags: impl Fn(&C) -> PipelineCreateFlags,
        mut create: impl FnMut(C) -> Result<Arc<P>, Validated<VulkanError>>,
    ) -> Self {
        let create_infos = create_infos.into_iter();
        let mut pipelines: Vec<Option<Arc<P>>> = Vec::with_capacity(create_infos.size_hint().0);
        let mut result = Ok(());
        let mut stopped = false;

        for create_info in create_infos {
            if stopped {
                pipelines.push(None);
                continue;
            }

            let early_return = flags(&create_info).intersects(PipelineCreateFlags::EARLY_RETURN_ON_FAILURE);

            match create(create_info) {
                Ok(pipeline) => pipelines.push(Some(pipeline)),
                Err(err) => {
                    pipelines.push(None);

                    let compile_required =
                        err.is_error(&VulkanError::PipelineCompileRequired);

                    if result.is_ok() || !compile_required {
                        result = Err(err);
                    }

                    stopped = !compile_required || early_return;
                }
            }
        }

        PipelineBatch { pipelines, result }
    }
}

#[cfg(test)]
mod tests {
    use super::{DynamicState, PipelineBatch, PipelineCreateFlags};
    use crate::{Validated, VulkanError};
    use std::sync::Arc;

    fn run(
        entries: &[(PipelineCreateFlags, Option<VulkanError>)],
    ) -> (PipelineBatch<u32>, Vec<usize>) {
        let mut attempted = Vec::new();
        let batch = PipelineBatch::create(
            entries.iter().enumerate(),
            |(_, (flags, _))| *flags,
            |(index, (_, err))| {
                attempted.push(index);
                match err {
                    Some(err) => Err(Validated::Error(*err)),
                    None => Ok(Arc::new(index as u32)),
                }
            },
        );

        (batch, attempted)
    }

    #[test]
    fn compile_required_continues() {
        let empty = PipelineCreateFlags::empty();
        let (batch, attempted) = run(&[
            (empty, Some(VulkanError::PipelineCompileRequired)),
            (empty, None),
            (empty, Some(VulkanError::PipelineCompileRequired)),
        ]);

        assert_eq!(attempted, [0, 1, 2]);
        assert!(batch.pipelines[0].is_none());
        assert_eq!(batch.pipelines[1].as_deref(), Some(&1));
        assert!(batch.pipelines[2].is_none());
        assert!(matches!(
            batch.result,
            Err(Validated::Error(VulkanError::PipelineCompileRequired)),
        ));
    }

    #[test]
    fn early_return() {
        let (batch, attempted) = run(&[
            (
                PipelineCreateFlags::EARLY_RETURN_ON_FAILURE,
                Some(VulkanError::PipelineCompileRequired),
            ),
            (PipelineCreateFlags::empty(), None),
        ]);

        assert_eq!(attempted, [0]);
        assert_eq!(batch.pipelines.len(), 2);
        assert!(batch.pipelines.iter().all(Option::is_none));
    }

    #[test]
    fn fatal_error_stops_and_wins() {
        let empty = PipelineCreateFlags::empty();
        let (batch, attempted) = run(&[
            (empty, None),
            (empty, Some(VulkanError::PipelineCompileRequired)),
            (empty, Some(VulkanError::OutOfHostMemory)),
            (empty, None),
        ]);

        assert_eq!(attempted, [0, 1, 2]);
        assert!(batch.pipelines[0].is_some());
        assert!(batch.pipelines[3].is_none());
        assert!(matches!(
            batch.result,
            Err(Validated::Error(VulkanError::OutOfHostMemory)),
        ));
    }

    #[test]
    fn supported_dynamic_states() {
        assert!(DynamicState::StencilReference.is_supported());
        assert!(!DynamicState::LineWidth.is_supported());
        assert!(!DynamicState::CullMode.is_supported());
    }
}

//! A pipeline that performs graphics processing operations.
//!
//! Unlike a compute pipeline, which performs general-purpose work, a graphics pipeline is geared
//! specifically towards doing graphical processing. To that end, it consists of several shaders,
//! with additional state and glue logic in between, known as the pipeline's *fixed-function*
//! state.
//!
//! # Creation
//!
//! Creating a graphics pipeline translates each block of fixed-function state into a native
//! [`StateFragment`], in this order:
//!
//! 1. primitive topology and index-buffer strip cut value,
//! 2. rasterizer,
//! 3. sample description and sample mask,
//! 4. depth-stencil,
//! 5. blend,
//! 6. render target formats and depth/stencil format,
//! 7. vertex input layout and the compiled shader stages,
//! 8. the root signature of the pipeline layout.
//!
//! With rasterizer discard enabled, the multisample, depth-stencil and blend blocks are left out
//! of the stream entirely, as is the fragment shader. The fragment shader is also left out when
//! both faces are culled.
//!
//! Shader stages are translated in pipeline order, then linked from the last stage to the first so
//! that each stage can drop the outputs its successor doesn't read, then compiled.
//!
//! # Dynamic state
//!
//! Only the states for which [`DynamicState::is_supported`] returns `true` can be dynamic. Their
//! values are then set when recording draws, the pipeline keeps what is needed to apply them.

use self::{
    color_blend::ColorBlendState,
    depth_stencil::{DepthStencilState, DynamicStencil, StencilTest},
    input_assembly::{InputAssemblyState, NativePrimitiveTopology, PrimitiveTopology},
    multisample::MultisampleState,
    rasterization::{CullMode, RasterizationState},
    subpass::PipelineSubpassType,
    tessellation::TessellationState,
    vertex_input::VertexInputState,
    viewport::{NativeRect, NativeViewport, Scissor, Viewport, ViewportState},
};
use super::{DynamicState, PipelineBatch, PipelineCreateFlags};
use crate::{
    cache::OnceCache,
    device::Device,
    macros::impl_id_counter,
    pipeline::{
        cache::PipelineCache,
        indirect::{CommandSignatureDesc, IndirectDrawKind},
        layout::PipelineLayout,
        shader::{
            compile_stage, PipelineShaderStageCreateInfo, ShaderIr, ShaderStage, ShaderStages,
            TranslateOptions, YzFlip,
        },
        stream::{PipelineStateStream, ShaderBytecode, StateFragment},
        PipelineBindPoint,
    },
    Validated, ValidationError, VulkanError,
};
use ash::vk;
use foldhash::HashSet;
use smallvec::SmallVec;
use std::{num::NonZero, ops::RangeInclusive, sync::Arc};

pub mod color_blend;
pub mod depth_stencil;
pub mod input_assembly;
pub mod multisample;
pub mod rasterization;
pub mod subpass;
pub mod tessellation;
pub mod vertex_input;
pub mod viewport;

/// Defines how the implementation should perform a draw operation.
///
/// This object contains the shaders and the various fixed states that describe how the
/// implementation should perform the various operations needed by a draw command.
#[derive(Debug)]
pub struct GraphicsPipeline {
    handle: vk::Pipeline,
    device: Arc<Device>,
    id: NonZero<u64>,
    flags: PipelineCreateFlags,
    layout: Arc<PipelineLayout>,

    shader_stages: ShaderStages,
    topology: NativePrimitiveTopology,
    triangle_fan: bool,
    vertex_strides: Vec<u32>,
    viewports: SmallVec<[NativeViewport; 1]>,
    scissors: SmallVec<[NativeRect; 1]>,
    yz_flip: YzFlip,
    stencil_test: Option<StencilTest>,
    depth_bounds: Option<RangeInclusive<f32>>,
    blend_constants: [f32; 4],
    dynamic_state: HashSet<DynamicState>,

    indirect_signatures: OnceCache<IndirectDrawKind, vk::IndirectCommandsLayoutNV>,
}

impl GraphicsPipeline {
    /// Creates a new `GraphicsPipeline`.
    #[inline]
    pub fn new(
        device: Arc<Device>,
        cache: Option<Arc<PipelineCache>>,
        create_info: GraphicsPipelineCreateInfo,
    ) -> Result<Arc<Self>, Validated<VulkanError>> {
        Self::validate_new(&device, cache.as_deref(), &create_info)?;

        Ok(unsafe { Self::new_unchecked(device, cache, create_info) }?)
    }

    /// Creates several `GraphicsPipeline`s at once. See [`PipelineBatch`] for how failures are
    /// reported.
    pub fn new_batch(
        device: Arc<Device>,
        cache: Option<Arc<PipelineCache>>,
        create_infos: impl IntoIterator<Item = GraphicsPipelineCreateInfo>,
    ) -> PipelineBatch<GraphicsPipeline> {
        PipelineBatch::create(
            create_infos,
            |create_info| create_info.flags,
            |create_info| Self::new(device.clone(), cache.clone(), create_info),
        )
    }

    fn validate_new(
        device: &Device,
        cache: Option<&PipelineCache>,
        create_info: &GraphicsPipelineCreateInfo,
    ) -> Result<(), Box<ValidationError>> {
        if let Some(cache) = cache {
            if cache.device().as_ref() != device {
                return Err(Box::new(ValidationError {
                    context: "cache".into(),
                    problem: "was not created by the same device as the pipeline".into(),
                    vuids: &["VUID-vkCreateGraphicsPipelines-pipelineCache-parent"],
                    ..Default::default()
                }));
            }
        }

        create_info
            .validate(device)
            .map_err(|err| err.add_context("create_info"))?;

        Ok(())
    }

    #[cfg_attr(not(feature = "document_unchecked"), doc(hidden))]
    pub unsafe fn new_unchecked(
        device: Arc<Device>,
        cache: Option<Arc<PipelineCache>>,
        create_info: GraphicsPipelineCreateInfo,
    ) -> Result<Arc<Self>, VulkanError> {
        let GraphicsPipelineCreateInfo {
            flags,
            stages,
            vertex_input_state,
            input_assembly_state,
            tessellation_state,
            viewport_state,
            rasterization_state,
            multisample_state,
            depth_stencil_state,
            color_blend_state,
            dynamic_state,
            layout,
            subpass,
            _ne: _,
        } = create_info;

        if flags.intersects(PipelineCreateFlags::FAIL_ON_PIPELINE_COMPILE_REQUIRED)
            && !cache.is_some_and(|cache| cache.contains(layout.fingerprint()))
        {
            return Err(VulkanError::PipelineCompileRequired);
        }

        let is_dynamic = |state: DynamicState| dynamic_state.contains(&state);
        let rasterization_state = rasterization_state.unwrap_or_default();
        let discard = rasterization_state.rasterizer_discard_enable;
        let stage = |stage: ShaderStage| stages.iter().find(|info| info.stage == stage);

        let mut stream = PipelineStateStream::graphics();

        // Input assembly
        let input_assembly_state = input_assembly_state.unwrap_or_default();
        let has_tessellation = stage(ShaderStage::TessellationControl).is_some()
            || stage(ShaderStage::TessellationEvaluation).is_some();
        let patch_control_points = match tessellation_state {
            Some(state) if has_tessellation => state.patch_control_points,
            _ => 0,
        };
        let topology = input_assembly_state.topology;

        stream.push(StateFragment::PrimitiveTopology(topology.topology_type()));
        stream.push(StateFragment::IndexBufferStripCut(
            input_assembly_state.strip_cut(),
        ));

        // Rasterization
        let viewport_state = viewport_state.filter(|_| !discard);
        let (viewports, scissors) = match &viewport_state {
            Some(state) => (
                state.viewports.iter().map(Viewport::to_native).collect(),
                state.scissors.iter().map(Scissor::to_native).collect(),
            ),
            None => (SmallVec::new(), SmallVec::new()),
        };

        stream.push(StateFragment::Rasterizer(rasterization_state.to_native()));

        // Multisample
        let multisample_state = multisample_state.filter(|_| !discard);

        if let Some(state) = &multisample_state {
            stream.push(StateFragment::SampleDesc(state.sample_desc()));

            if let Some(mask) = state.sample_mask {
                stream.push(StateFragment::SampleMask(mask));
            }
        }

        // Depth-stencil
        let mut stencil_test = None;
        let mut depth_bounds = None;

        if let Some(state) = depth_stencil_state.filter(|_| !discard) {
            let (desc, test) = state.to_native(
                rasterization_state.cull_mode,
                DynamicStencil {
                    compare_mask: is_dynamic(DynamicState::StencilCompareMask),
                    write_mask: is_dynamic(DynamicState::StencilWriteMask),
                    reference: is_dynamic(DynamicState::StencilReference),
                },
            );

            stream.push(StateFragment::DepthStencil(desc));
            stencil_test = test;
            depth_bounds = state.depth_bounds;
        }

        // Blend
        let mut blend_constants = [0.0; 4];

        if let (Some(state), Some(multisample_state)) =
            (color_blend_state.filter(|_| !discard), &multisample_state)
        {
            stream.push(StateFragment::Blend(
                state.to_native(multisample_state.alpha_to_coverage_enable),
            ));
            blend_constants = state.blend_constants;
        }

        // Attachment formats
        if let Some(subpass) = &subpass {
            let render_target_formats = subpass.render_target_formats();

            if render_target_formats.num_render_targets > 0 {
                stream.push(StateFragment::RenderTargetFormats(render_target_formats));
            }

            if subpass.depth_stencil_format().is_some() {
                stream.push(StateFragment::DepthStencilFormat(
                    subpass.native_depth_stencil_format(),
                ));
            }
        }

        // Shaders
        let backend = device.backend();
        let skip_fragment = discard || rasterization_state.cull_mode == CullMode::FrontAndBack;
        let active_stages: SmallVec<[&PipelineShaderStageCreateInfo; 5]> = ShaderStage::GRAPHICS
            .into_iter()
            .filter(|&s| !(s == ShaderStage::Fragment && skip_fragment))
            .filter_map(stage)
            .collect();

        let yz_flip_stage = [
            ShaderStage::Geometry,
            ShaderStage::TessellationEvaluation,
            ShaderStage::Vertex,
        ]
        .into_iter()
        .find(|&s| stage(s).is_some());
        let (yz_flip, y_flip_mask, z_flip_mask) = match &viewport_state {
            Some(state) => YzFlip::from_viewports(
                &state.viewports,
                is_dynamic(DynamicState::Viewport),
            ),
            None if is_dynamic(DynamicState::Viewport) => (YzFlip::Conditional, 0, 0),
            None => (YzFlip::None, 0, 0),
        };
        let sample_shading = multisample_state
            .as_ref()
            .is_some_and(|state| state.sample_shading.is_some());

        let mut irs: SmallVec<[ShaderIr; 5]> = SmallVec::new();

        for &stage_info in &active_stages {
            let mut options = TranslateOptions::new(layout.binding_translation());

            if Some(stage_info.stage) == yz_flip_stage {
                options.yz_flip = yz_flip;
                options.y_flip_mask = y_flip_mask;
                options.z_flip_mask = z_flip_mask;
            }

            options.force_sample_rate_shading =
                stage_info.stage == ShaderStage::Fragment && sample_shading;

            irs.push(backend.translate_shader(stage_info, &options)?);
        }

        for index in (0..irs.len()).rev() {
            let (producers, consumers) = irs.split_at_mut(index);
            backend.link_shaders(&mut consumers[0], producers.last_mut());
        }

        let vertex_input_state = vertex_input_state.unwrap_or_default();

        if !vertex_input_state.attributes.is_empty() {
            if let Some(vertex_ir) = irs.iter().find(|ir| ir.stage == ShaderStage::Vertex) {
                let elements = vertex_input_state.to_native(&vertex_ir.inputs);

                if !elements.is_empty() {
                    stream.push(StateFragment::InputLayout(elements));
                }
            }
        }

        let mut shader_stages = ShaderStages::empty();

        for ir in &irs {
            let bytecode = compile_stage(&device, ir)?;

            if let Some(fragment) = shader_fragment(ir.stage, bytecode) {
                stream.push(fragment);
                shader_stages |= ShaderStages::from(ir.stage);
            }
        }

        stream.push(StateFragment::RootSignature(layout.root_signature()));

        let handle = backend.create_pipeline_state(&stream)?;

        tracing::debug!(
            stages = ?shader_stages,
            ?topology,
            ?yz_flip,
            stream_size = stream.size(),
            "created graphics pipeline",
        );

        Ok(Arc::new(GraphicsPipeline {
            handle,
            device,
            id: Self::next_id(),
            flags,
            layout,
            shader_stages,
            topology: topology.to_native(patch_control_points),
            triangle_fan: topology == PrimitiveTopology::TriangleFan,
            vertex_strides: vertex_input_state.strides(),
            viewports,
            scissors,
            yz_flip,
            stencil_test,
            depth_bounds,
            blend_constants,
            dynamic_state,
            indirect_signatures: OnceCache::new(),
        }))
    }

    /// Returns the device that owns `self`.
    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Returns the native pipeline-state object.
    #[inline]
    pub fn handle(&self) -> vk::Pipeline {
        self.handle
    }

    /// Returns the flags that the pipeline was created with.
    #[inline]
    pub fn flags(&self) -> PipelineCreateFlags {
        self.flags
    }

    /// Returns the pipeline layout used in this graphics pipeline.
    #[inline]
    pub fn layout(&self) -> &Arc<PipelineLayout> {
        &self.layout
    }

    /// Returns the bind point of the pipeline.
    #[inline]
    pub fn bind_point(&self) -> PipelineBindPoint {
        PipelineBindPoint::Graphics
    }

    /// Returns the shader stages that ended up in the pipeline.
    #[inline]
    pub fn shader_stages(&self) -> ShaderStages {
        self.shader_stages
    }

    /// Returns the native primitive topology to draw with.
    ///
    /// Triangle fans are drawn as triangle lists, see [`triangle_fan`](Self::triangle_fan).
    #[inline]
    pub fn topology(&self) -> NativePrimitiveTopology {
        self.topology
    }

    /// Returns whether the pipeline was created for triangle fans, which must be rewritten into
    /// triangle lists before drawing.
    #[inline]
    pub fn triangle_fan(&self) -> bool {
        self.triangle_fan
    }

    /// Returns the stride of each vertex buffer binding, indexed by binding number.
    #[inline]
    pub fn vertex_strides(&self) -> &[u32] {
        &self.vertex_strides
    }

    /// Returns the native viewports. Empty if rasterizer discard is enabled.
    #[inline]
    pub fn viewports(&self) -> &[NativeViewport] {
        &self.viewports
    }

    /// Returns the native scissors. Empty if rasterizer discard is enabled.
    #[inline]
    pub fn scissors(&self) -> &[NativeRect] {
        &self.scissors
    }

    /// Returns how the last pre-rasterization stage flips its position output.
    #[inline]
    pub fn yz_flip(&self) -> YzFlip {
        self.yz_flip
    }

    /// Returns the stencil values kept for draw time, if the stencil test is enabled.
    #[inline]
    pub fn stencil_test(&self) -> Option<&StencilTest> {
        self.stencil_test.as_ref()
    }

    /// Returns the depth bounds, if the depth bounds test is enabled.
    #[inline]
    pub fn depth_bounds(&self) -> Option<&RangeInclusive<f32>> {
        self.depth_bounds.as_ref()
    }

    /// Returns the blend constants.
    #[inline]
    pub fn blend_constants(&self) -> [f32; 4] {
        self.blend_constants
    }

    /// Returns the states that are set at draw time.
    #[inline]
    pub fn dynamic_state(&self) -> &HashSet<DynamicState> {
        &self.dynamic_state
    }

    /// Returns the command signature of an indirect draw of the given kind, creating it on first
    /// use.
    pub fn indirect_command_signature(
        &self,
        kind: IndirectDrawKind,
    ) -> Result<vk::IndirectCommandsLayoutNV, VulkanError> {
        self.indirect_signatures.get_or_try_insert(&kind, || {
            let desc = CommandSignatureDesc::draw(
                kind,
                self.layout.root_signature(),
                self.layout.sysval_parameter_index(),
            );
            let signature = self.device.backend().create_command_signature(&desc)?;

            tracing::trace!(?kind, "created indirect draw signature");

            Ok((kind, signature))
        })
    }
}

impl Drop for GraphicsPipeline {
    #[inline]
    fn drop(&mut self) {
        let backend = self.device.backend();

        for (_, signature) in self.indirect_signatures.drain() {
            backend.destroy_command_signature(signature);
        }

        backend.destroy_pipeline_state(self.handle);
    }
}

impl_id_counter!(GraphicsPipeline);

fn shader_fragment(stage: ShaderStage, bytecode: ShaderBytecode) -> Option<StateFragment> {
    Some(match stage {
        ShaderStage::Vertex => StateFragment::VertexShader(bytecode),
        ShaderStage::TessellationControl => StateFragment::HullShader(bytecode),
        ShaderStage::TessellationEvaluation => StateFragment::DomainShader(bytecode),
        ShaderStage::Geometry => StateFragment::GeometryShader(bytecode),
        ShaderStage::Fragment => StateFragment::PixelShader(bytecode),
        ShaderStage::Compute => return None,
    })
}

/// Parameters to create a new `GraphicsPipeline`.
#[derive(Clone, Debug)]
pub struct GraphicsPipelineCreateInfo {
    /// Additional properties of the pipeline.
    ///
    /// The default value is empty.
    pub flags: PipelineCreateFlags,

    /// The shader stages to use.
    ///
    /// A vertex shader must always be included. Other stages are optional.
    ///
    /// The default value is empty.
    pub stages: SmallVec<[PipelineShaderStageCreateInfo; 5]>,

    /// The vertex input state.
    ///
    /// This state is always used, and must be provided.
    ///
    /// The default value is `None`.
    pub vertex_input_state: Option<VertexInputState>,

    /// The input assembly state.
    ///
    /// This state is always used, and must be provided.
    ///
    /// The default value is `None`.
    pub input_assembly_state: Option<InputAssemblyState>,

    /// The tessellation state.
    ///
    /// This state is used if `stages` contains tessellation shaders.
    ///
    /// The default value is `None`.
    pub tessellation_state: Option<TessellationState>,

    /// The viewport state.
    ///
    /// This state is used if rasterizer discarding is not enabled.
    ///
    /// The default value is `None`.
    pub viewport_state: Option<ViewportState>,

    /// The rasterization state.
    ///
    /// This state is always used, and must be provided.
    ///
    /// The default value is `None`.
    pub rasterization_state: Option<RasterizationState>,

    /// The multisample state.
    ///
    /// This state is used if rasterizer discarding is not enabled.
    ///
    /// The default value is `None`.
    pub multisample_state: Option<MultisampleState>,

    /// The depth/stencil state.
    ///
    /// If set to `None`, the depth and stencil tests are disabled. It is ignored if rasterizer
    /// discarding is enabled.
    ///
    /// The default value is `None`.
    pub depth_stencil_state: Option<DepthStencilState>,

    /// The color blend state.
    ///
    /// This state is used if rasterizer discarding is not enabled and the subpass has color
    /// attachments.
    ///
    /// The default value is `None`.
    pub color_blend_state: Option<ColorBlendState>,

    /// The state(s) that will be set dynamically when recording a command buffer.
    ///
    /// The default value is empty.
    pub dynamic_state: HashSet<DynamicState>,

    /// The pipeline layout to use for the pipeline.
    ///
    /// There is no default value.
    pub layout: Arc<PipelineLayout>,

    /// The render subpass to use.
    ///
    /// This state is always used, and must be provided.
    ///
    /// The default value is `None`.
    pub subpass: Option<PipelineSubpassType>,

    pub _ne: crate::NonExhaustive,
}

impl GraphicsPipelineCreateInfo {
    /// Returns a `GraphicsPipelineCreateInfo` with the specified `layout`.
    #[inline]
    pub fn layout(layout: Arc<PipelineLayout>) -> Self {
        Self {
            flags: PipelineCreateFlags::empty(),
            stages: SmallVec::new(),
            vertex_input_state: None,
            input_assembly_state: None,
            tessellation_state: None,
            viewport_state: None,
            rasterization_state: None,
            multisample_state: None,
            depth_stencil_state: None,
            color_blend_state: None,
            dynamic_state: HashSet::default(),
            layout,
            subpass: None,
            _ne: crate::NonExhaustive(()),
        }
    }

    pub(crate) fn validate(&self, device: &Device) -> Result<(), Box<ValidationError>> {
        let &Self {
            flags: _,
            ref stages,
            ref vertex_input_state,
            ref input_assembly_state,
            ref tessellation_state,
            ref viewport_state,
            ref rasterization_state,
            ref multisample_state,
            ref depth_stencil_state,
            ref color_blend_state,
            ref dynamic_state,
            ref layout,
            ref subpass,
            _ne: _,
        } = self;

        /*
            Shader stages
        */

        let mut stage_flags = ShaderStages::empty();

        for (index, stage) in stages.iter().enumerate() {
            stage
                .validate(device)
                .map_err(|err| err.add_context(format!("stages[{}]", index)))?;

            if stage.stage == ShaderStage::Compute {
                return Err(Box::new(ValidationError {
                    context: format!("stages[{}].stage", index).into(),
                    problem: "is `ShaderStage::Compute`".into(),
                    vuids: &["VUID-VkGraphicsPipelineCreateInfo-pStages-06896"],
                    ..Default::default()
                }));
            }

            let stage_flag = ShaderStages::from(stage.stage);

            if stage_flags.intersects(stage_flag) {
                return Err(Box::new(ValidationError {
                    context: "stages".into(),
                    problem: format!(
                        "contains more than one element whose stage is `ShaderStage::{:?}`",
                        stage.stage,
                    )
                    .into(),
                    vuids: &["VUID-VkGraphicsPipelineCreateInfo-stage-06897"],
                    ..Default::default()
                }));
            }

            stage_flags |= stage_flag;
        }

        if !stage_flags.intersects(ShaderStages::VERTEX) {
            return Err(Box::new(ValidationError {
                context: "stages".into(),
                problem: "does not contain a `ShaderStage::Vertex` stage".into(),
                vuids: &["VUID-VkGraphicsPipelineCreateInfo-stage-02096"],
                ..Default::default()
            }));
        }

        let has_tessellation_control = stage_flags.intersects(ShaderStages::TESSELLATION_CONTROL);
        let has_tessellation_evaluation =
            stage_flags.intersects(ShaderStages::TESSELLATION_EVALUATION);

        if has_tessellation_control != has_tessellation_evaluation {
            return Err(Box::new(ValidationError {
                context: "stages".into(),
                problem: "contains only one of the two tessellation stages".into(),
                vuids: &[
                    "VUID-VkGraphicsPipelineCreateInfo-pStages-00729",
                    "VUID-VkGraphicsPipelineCreateInfo-pStages-00730",
                ],
                ..Default::default()
            }));
        }

        /*
            Fixed-function states
        */

        let Some(rasterization_state) = rasterization_state else {
            return Err(Box::new(ValidationError {
                context: "rasterization_state".into(),
                problem: "is `None`".into(),
                vuids: &["VUID-VkGraphicsPipelineCreateInfo-pRasterizationState-06601"],
                ..Default::default()
            }));
        };

        rasterization_state
            .validate()
            .map_err(|err| err.add_context("rasterization_state"))?;

        let discard = rasterization_state.rasterizer_discard_enable;

        match vertex_input_state {
            Some(state) => state
                .validate(device)
                .map_err(|err| err.add_context("vertex_input_state"))?,
            None => {
                return Err(Box::new(ValidationError {
                    context: "vertex_input_state".into(),
                    problem: "is `None`".into(),
                    vuids: &["VUID-VkGraphicsPipelineCreateInfo-pStages-02097"],
                    ..Default::default()
                }));
            }
        }

        let Some(input_assembly_state) = input_assembly_state else {
            return Err(Box::new(ValidationError {
                context: "input_assembly_state".into(),
                problem: "is `None`".into(),
                vuids: &["VUID-VkGraphicsPipelineCreateInfo-pStages-02098"],
                ..Default::default()
            }));
        };

        let is_patch_list = input_assembly_state.topology == PrimitiveTopology::PatchList;

        if is_patch_list != has_tessellation_control {
            return Err(Box::new(ValidationError {
                problem: "`input_assembly_state.topology` is `PrimitiveTopology::PatchList` \
                    if and only if `stages` contains tessellation shaders is not satisfied"
                    .into(),
                vuids: &[
                    "VUID-VkGraphicsPipelineCreateInfo-pStages-00736",
                    "VUID-VkGraphicsPipelineCreateInfo-topology-08889",
                ],
                ..Default::default()
            }));
        }

        if has_tessellation_control {
            match tessellation_state {
                Some(state) => state
                    .validate()
                    .map_err(|err| err.add_context("tessellation_state"))?,
                None => {
                    return Err(Box::new(ValidationError {
                        context: "tessellation_state".into(),
                        problem: "is `None`, but `stages` contains tessellation shaders".into(),
                        vuids: &["VUID-VkGraphicsPipelineCreateInfo-pStages-09022"],
                        ..Default::default()
                    }));
                }
            }
        }

        if !discard {
            match viewport_state {
                Some(state) => state
                    .validate()
                    .map_err(|err| err.add_context("viewport_state"))?,
                None => {
                    return Err(Box::new(ValidationError {
                        context: "viewport_state".into(),
                        problem: "is `None`, but rasterizer discard is not enabled".into(),
                        vuids: &["VUID-VkGraphicsPipelineCreateInfo-rasterizerDiscardEnable-09024"],
                        ..Default::default()
                    }));
                }
            }

            match multisample_state {
                Some(state) => state
                    .validate()
                    .map_err(|err| err.add_context("multisample_state"))?,
                None => {
                    return Err(Box::new(ValidationError {
                        context: "multisample_state".into(),
                        problem: "is `None`, but rasterizer discard is not enabled".into(),
                        vuids: &["VUID-VkGraphicsPipelineCreateInfo-rasterizerDiscardEnable-09026"],
                        ..Default::default()
                    }));
                }
            }

            if let Some(state) = depth_stencil_state {
                state
                    .validate()
                    .map_err(|err| err.add_context("depth_stencil_state"))?;
            }

            if let Some(state) = color_blend_state {
                state
                    .validate(device)
                    .map_err(|err| err.add_context("color_blend_state"))?;
            }
        }

        /*
            Dynamic states
        */

        if let Some(&state) = dynamic_state.iter().find(|state| !state.is_supported()) {
            return Err(Box::new(ValidationError {
                context: "dynamic_state".into(),
                problem: format!(
                    "contains `DynamicState::{:?}`, which can't be set dynamically on this device",
                    state,
                )
                .into(),
                ..Default::default()
            }));
        }

        /*
            Layout and subpass
        */

        if layout.device().as_ref() != device {
            return Err(Box::new(ValidationError {
                context: "layout".into(),
                problem: "was not created by the same device as the pipeline".into(),
                ..Default::default()
            }));
        }

        let Some(subpass) = subpass else {
            return Err(Box::new(ValidationError {
                context: "subpass".into(),
                problem: "is `None`".into(),
                vuids: &["VUID-VkGraphicsPipelineCreateInfo-renderPass-06575"],
                ..Default::default()
            }));
        };

        subpass
            .validate(device)
            .map_err(|err| err.add_context("subpass"))?;

        if !discard {
            if let Some(color_blend_state) = color_blend_state {
                let color_attachment_count = subpass.color_attachment_formats().len();

                if color_blend_state.attachments.len() != color_attachment_count {
                    return Err(Box::new(ValidationError {
                        problem: "the length of `color_blend_state.attachments` does not equal \
                            the number of color attachments in `subpass`"
                            .into(),
                        vuids: &["VUID-VkGraphicsPipelineCreateInfo-renderPass-06042"],
                        ..Default::default()
                    }));
                }
            }
        }

        Ok(())
    }
}

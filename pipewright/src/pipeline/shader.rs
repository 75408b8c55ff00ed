//! Shader modules and the stages of a pipeline.
//!
//! A [`ShaderModule`] holds portable SPIR-V code. A pipeline refers to one entry point of a
//! module per stage through a [`PipelineShaderStageCreateInfo`]. While the pipeline is created,
//! each stage goes through the backend's [`ShaderBackend`](crate::backend::ShaderBackend): the
//! module is translated into a [`ShaderIr`], adjacent stages are linked together, and the IR is
//! compiled into the native blob that ends up in the pipeline-state stream.

use crate::{
    device::{DebugFlags, Device},
    macros::{impl_id_counter, vulkan_bitflags, vulkan_enum},
    pipeline::{layout::BindingTranslation, stream::ShaderBytecode},
    ValidationError, VulkanError,
};
use std::{num::NonZero, sync::Arc};

/// The first word of every SPIR-V module.
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Contains SPIR-V code with one or more entry points.
#[derive(Debug)]
pub struct ShaderModule {
    device: Arc<Device>,
    id: NonZero<u64>,
    code: Arc<[u32]>,
}

impl ShaderModule {
    /// Creates a new shader module from SPIR-V words.
    ///
    /// Only the header is checked, the backend translates the code when a pipeline uses it.
    pub fn new(
        device: Arc<Device>,
        create_info: ShaderModuleCreateInfo<'_>,
    ) -> Result<Arc<ShaderModule>, Box<ValidationError>> {
        create_info
            .validate()
            .map_err(|err| err.add_context("create_info"))?;

        Ok(Arc::new(ShaderModule {
            device,
            id: Self::next_id(),
            code: create_info.code.into(),
        }))
    }

    /// Returns the device that owns `self`.
    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Returns the SPIR-V code of the module.
    #[inline]
    pub fn code(&self) -> &[u32] {
        &self.code
    }
}

impl_id_counter!(ShaderModule);

/// Parameters to create a new `ShaderModule`.
#[derive(Clone, Debug)]
pub struct ShaderModuleCreateInfo<'a> {
    /// The SPIR-V code, in the form of 32-bit words.
    ///
    /// There is no default value.
    pub code: &'a [u32],

    pub _ne: crate::NonExhaustive,
}

impl<'a> ShaderModuleCreateInfo<'a> {
    /// Returns a `ShaderModuleCreateInfo` with the specified `code`.
    #[inline]
    pub fn new(code: &'a [u32]) -> Self {
        Self {
            code,
            _ne: crate::NonExhaustive(()),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Box<ValidationError>> {
        let &Self { code, _ne: _ } = self;

        if code.is_empty() {
            return Err(Box::new(ValidationError {
                context: "code".into(),
                problem: "is empty".into(),
                vuids: &["VUID-VkShaderModuleCreateInfo-codeSize-01085"],
                ..Default::default()
            }));
        }

        if code[0] != SPIRV_MAGIC {
            return Err(Box::new(ValidationError {
                context: "code".into(),
                problem: "does not start with the SPIR-V magic number".into(),
                vuids: &["VUID-VkShaderModuleCreateInfo-pCode-08737"],
                ..Default::default()
            }));
        }

        Ok(())
    }
}

vulkan_enum! {
    #[non_exhaustive]

    /// A single shader stage.
    ShaderStage = ShaderStageFlags(u32);

    /// Vertex shader stage.
    Vertex = VERTEX,

    /// Tessellation control shader stage.
    TessellationControl = TESSELLATION_CONTROL,

    /// Tessellation evaluation shader stage.
    TessellationEvaluation = TESSELLATION_EVALUATION,

    /// Geometry shader stage.
    Geometry = GEOMETRY,

    /// Fragment shader stage.
    Fragment = FRAGMENT,

    /// Compute shader stage.
    Compute = COMPUTE,
}

impl ShaderStage {
    /// The graphics stages in pipeline order.
    pub const GRAPHICS: [ShaderStage; 5] = [
        Self::Vertex,
        Self::TessellationControl,
        Self::TessellationEvaluation,
        Self::Geometry,
        Self::Fragment,
    ];
}

vulkan_bitflags! {
    /// A set of [`ShaderStage`] values.
    ShaderStages = ShaderStageFlags(u32);

    /// The vertex stage.
    VERTEX = VERTEX,

    /// The tessellation control stage.
    TESSELLATION_CONTROL = TESSELLATION_CONTROL,

    /// The tessellation evaluation stage.
    TESSELLATION_EVALUATION = TESSELLATION_EVALUATION,

    /// The geometry stage.
    GEOMETRY = GEOMETRY,

    /// The fragment stage.
    FRAGMENT = FRAGMENT,

    /// The compute stage.
    COMPUTE = COMPUTE,
}

impl From<ShaderStage> for ShaderStages {
    #[inline]
    fn from(val: ShaderStage) -> Self {
        Self(val as u32)
    }
}

/// Specifies a single shader stage when creating a pipeline.
#[derive(Clone, Debug)]
pub struct PipelineShaderStageCreateInfo {
    /// The stage that the entry point is executed in.
    ///
    /// There is no default value.
    pub stage: ShaderStage,

    /// The module that contains the entry point.
    ///
    /// There is no default value.
    pub module: Arc<ShaderModule>,

    /// The name of the entry point.
    ///
    /// The default value is `"main"`.
    pub entry_point: String,

    pub _ne: crate::NonExhaustive,
}

impl PipelineShaderStageCreateInfo {
    /// Returns a `PipelineShaderStageCreateInfo` for the `main` entry point of `module`.
    #[inline]
    pub fn new(stage: ShaderStage, module: Arc<ShaderModule>) -> Self {
        Self {
            stage,
            module,
            entry_point: "main".to_owned(),
            _ne: crate::NonExhaustive(()),
        }
    }

    pub(crate) fn validate(&self, device: &Device) -> Result<(), Box<ValidationError>> {
        let Self {
            stage: _,
            module,
            entry_point,
            _ne: _,
        } = self;

        if module.device().as_ref() != device {
            return Err(Box::new(ValidationError {
                context: "module".into(),
                problem: "was not created by the same device as the pipeline".into(),
                ..Default::default()
            }));
        }

        if entry_point.is_empty() {
            return Err(Box::new(ValidationError {
                context: "entry_point".into(),
                problem: "is empty".into(),
                vuids: &["VUID-VkPipelineShaderStageCreateInfo-pName-00707"],
                ..Default::default()
            }));
        }

        Ok(())
    }
}

/// One variable of the input or output interface of a stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderInterfaceEntry {
    /// The location given by the shader.
    pub location: u32,

    /// The location assigned when linking, which is the index of the variable in its interface.
    pub driver_location: u32,
}

/// A shader stage in the compiler's intermediate representation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderIr {
    /// The stage of the shader.
    pub stage: ShaderStage,

    /// The input interface.
    pub inputs: Vec<ShaderInterfaceEntry>,

    /// The output interface.
    pub outputs: Vec<ShaderInterfaceEntry>,

    /// The stage that `inputs` were linked to, if any.
    pub linked_producer: Option<ShaderStage>,

    /// The backend-specific body of the shader.
    pub code: Vec<u8>,
}

impl ShaderIr {
    /// Returns an IR with the given interfaces and no code.
    pub fn new(
        stage: ShaderStage,
        inputs: impl IntoIterator<Item = u32>,
        outputs: impl IntoIterator<Item = u32>,
    ) -> Self {
        let entries = |locations: &mut dyn Iterator<Item = u32>| {
            locations
                .enumerate()
                .map(|(index, location)| ShaderInterfaceEntry {
                    location,
                    driver_location: index as u32,
                })
                .collect()
        };

        ShaderIr {
            stage,
            inputs: entries(&mut inputs.into_iter()),
            outputs: entries(&mut outputs.into_iter()),
            linked_producer: None,
            code: Vec::new(),
        }
    }
}

/// Links the inputs of `consumer` to the outputs of `producer`.
///
/// The inputs of the consumer are sorted by location and numbered in that order. Outputs of the
/// producer that the consumer doesn't read are removed, and the remaining ones take the driver
/// location of the matching input. Without a producer, the inputs are fed by fixed-function
/// vertex fetch and are only numbered.
pub fn link_interfaces(consumer: &mut ShaderIr, producer: Option<&mut ShaderIr>) {
    consumer.inputs.sort_by_key(|entry| entry.location);
    consumer.inputs.dedup_by_key(|entry| entry.location);

    for (index, entry) in consumer.inputs.iter_mut().enumerate() {
        entry.driver_location = index as u32;
    }

    let Some(producer) = producer else {
        consumer.linked_producer = None;
        return;
    };

    producer.outputs.retain_mut(|output| {
        match consumer
            .inputs
            .iter()
            .find(|input| input.location == output.location)
        {
            Some(input) => {
                output.driver_location = input.driver_location;
                true
            }
            None => false,
        }
    });

    consumer.linked_producer = Some(producer.stage);
}

/// How the last pre-rasterization stage flips its position output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum YzFlip {
    /// No flip.
    #[default]
    None,

    /// Flip Y for the viewports in the Y mask.
    Y,

    /// Flip Z for the viewports in the Z mask.
    Z,

    /// Flip Y and Z according to both masks.
    YZ,

    /// The viewports are dynamic, the flips are read from a constant at draw time.
    Conditional,
}

impl YzFlip {
    /// Computes the flip of a pipeline from its static viewports, returning the flip and the
    /// Y and Z masks. Bit `i` of a mask is set if viewport `i` needs that flip.
    pub fn from_viewports<'a>(
        viewports: impl IntoIterator<Item = &'a crate::pipeline::graphics::viewport::Viewport>,
        dynamic_viewport: bool,
    ) -> (YzFlip, u32, u32) {
        if dynamic_viewport {
            return (YzFlip::Conditional, 0, 0);
        }

        let (mut y_mask, mut z_mask) = (0, 0);

        for (index, viewport) in viewports.into_iter().enumerate() {
            if viewport.flips_y() {
                y_mask |= 1 << index;
            }
            if viewport.flips_z() {
                z_mask |= 1 << index;
            }
        }

        let flip = match (y_mask != 0, z_mask != 0) {
            (true, true) => YzFlip::YZ,
            (true, false) => YzFlip::Y,
            (false, true) => YzFlip::Z,
            (false, false) => YzFlip::None,
        };

        (flip, y_mask, z_mask)
    }
}

/// What the backend applies to a stage while translating it.
#[derive(Clone, Copy, Debug)]
pub struct TranslateOptions<'a> {
    /// The register assignment of every binding of the pipeline layout.
    pub bindings: &'a BindingTranslation,

    /// The position flip, for the last pre-rasterization stage.
    pub yz_flip: YzFlip,

    /// The viewports that need a Y flip.
    pub y_flip_mask: u32,

    /// The viewports that need a Z flip.
    pub z_flip_mask: u32,

    /// Run a fragment shader once per sample.
    pub force_sample_rate_shading: bool,
}

impl<'a> TranslateOptions<'a> {
    /// Returns the options with no flip and no forced sample-rate shading.
    #[inline]
    pub fn new(bindings: &'a BindingTranslation) -> Self {
        Self {
            bindings,
            yz_flip: YzFlip::None,
            y_flip_mask: 0,
            z_flip_mask: 0,
            force_sample_rate_shading: false,
        }
    }
}

/// Compiles the IR of a stage and validates the blob.
///
/// A blob that fails validation is an [`InvalidShader`](VulkanError::InvalidShader) error.
pub(crate) fn compile_stage(device: &Device, ir: &ShaderIr) -> Result<ShaderBytecode, VulkanError> {
    let debug_flags = device.debug_flags();

    if debug_flags.contains(DebugFlags::IR) {
        tracing::info!(stage = ?ir.stage, ir = ?ir, "shader IR");
    }

    let backend = device.backend();
    let blob = backend.compile_shader(ir)?;

    if let Err(message) = backend.validate_shader(&blob) {
        tracing::error!(stage = ?ir.stage, %message, "shader failed validation");
        return Err(VulkanError::InvalidShader);
    }

    if debug_flags.contains(DebugFlags::NATIVE) {
        match backend.disassemble_shader(&blob) {
            Some(disassembly) => tracing::info!(stage = ?ir.stage, "{}", disassembly),
            None => tracing::info!(stage = ?ir.stage, size = blob.len(), "compiled shader"),
        }
    }

    Ok(blob.into())
}

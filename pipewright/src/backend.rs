//! The interface between this crate and the code that drives the hardware.
//!
//! Everything in this crate that needs the GPU goes through a [`Backend`]: allocating images,
//! submitting copy-unit and tile-buffer jobs, drawing with internal shaders, compiling shader
//! stages and creating native pipeline-state, root-signature and command-signature objects.
//!
//! The trait is split in three along the lines of the components that use it. A type that
//! implements all three implements [`Backend`] automatically.
//!
//! Calls are synchronous. A submission only queues work; the two flush calls push queued work to
//! the hardware queue without waiting for its completion.

use crate::{
    blit::{BuiltinShader, CopyRegion, CustomShaderDraw, GenericBlit, TfuJob, TileJob},
    image::{ImageCreateInfo, ImageLayout},
    pipeline::{
        indirect::CommandSignatureDesc,
        layout::RootSignatureDesc,
        shader::{link_interfaces, PipelineShaderStageCreateInfo, ShaderIr, TranslateOptions},
        stream::PipelineStateStream,
    },
    VulkanError,
};
use ash::vk;

/// A complete backend, as held by a [`Device`](crate::device::Device).
pub trait Backend: TransferBackend + PipelineBackend + ShaderBackend + Send + Sync {}

impl<T> Backend for T where T: TransferBackend + PipelineBackend + ShaderBackend + Send + Sync {}

/// Image memory and the hardware units that copy between images.
pub trait TransferBackend {
    /// Allocates the memory of an image laid out according to `layout`.
    fn create_image(
        &self,
        create_info: &ImageCreateInfo,
        layout: &ImageLayout,
    ) -> Result<vk::Image, VulkanError>;

    /// Frees an image returned by `create_image`.
    fn destroy_image(&self, image: vk::Image);

    /// Queues a texel-exact copy of a box of one image into another.
    fn copy_region(&self, copy: &CopyRegion);

    /// Creates one of the internal shaders used by the blitter.
    fn create_builtin_shader(&self, shader: BuiltinShader)
        -> Result<vk::ShaderModule, VulkanError>;

    /// Frees a shader returned by `create_builtin_shader`.
    fn destroy_builtin_shader(&self, shader: vk::ShaderModule);

    /// Queues a full-surface draw with an internal shader pair.
    fn draw_custom_shader(&self, draw: &CustomShaderDraw) -> Result<(), VulkanError>;

    /// Submits a job to the fixed-function copy unit.
    fn submit_tfu(&self, job: &TfuJob) -> Result<(), VulkanError>;

    /// Queues a tile-buffer load/store job.
    fn submit_tile_job(&self, job: &TileJob);

    /// Returns whether the textured-quad blitter can perform `blit`.
    fn is_blit_supported(&self, blit: &GenericBlit) -> bool;

    /// Queues a textured-quad blit.
    fn blit_generic(&self, blit: &GenericBlit);

    /// Submits every queued job that writes `image`.
    fn flush_jobs_writing(&self, image: vk::Image);

    /// Submits every queued job that reads `image`.
    fn flush_jobs_reading(&self, image: vk::Image);
}

/// Creation of native pipeline objects.
pub trait PipelineBackend {
    /// Creates the root signature of a pipeline layout.
    fn create_root_signature(
        &self,
        desc: &RootSignatureDesc,
    ) -> Result<vk::PipelineLayout, VulkanError>;

    /// Frees a root signature returned by `create_root_signature`.
    fn destroy_root_signature(&self, root_signature: vk::PipelineLayout);

    /// Creates a pipeline-state object from a complete state stream.
    fn create_pipeline_state(
        &self,
        stream: &PipelineStateStream,
    ) -> Result<vk::Pipeline, VulkanError>;

    /// Frees a pipeline-state object returned by `create_pipeline_state`.
    fn destroy_pipeline_state(&self, pipeline: vk::Pipeline);

    /// Creates a command signature for indirect draws or dispatches.
    fn create_command_signature(
        &self,
        desc: &CommandSignatureDesc,
    ) -> Result<vk::IndirectCommandsLayoutNV, VulkanError>;

    /// Frees a command signature returned by `create_command_signature`.
    fn destroy_command_signature(&self, signature: vk::IndirectCommandsLayoutNV);
}

/// Shader translation and compilation.
///
/// Stages go through three steps: `translate_shader` turns the portable module into the
/// compiler's IR with the driver's bindings and flips applied, `link_shaders` matches the
/// interfaces of adjacent stages, and `compile_shader` produces the native blob, which is then
/// checked with `validate_shader`.
pub trait ShaderBackend {
    /// Translates one stage into the compiler's IR.
    fn translate_shader(
        &self,
        stage: &PipelineShaderStageCreateInfo,
        options: &TranslateOptions<'_>,
    ) -> Result<ShaderIr, VulkanError>;

    /// Links `consumer` to the stage before it, or to the fixed-function vertex fetch if
    /// `producer` is `None`.
    #[inline]
    fn link_shaders(&self, consumer: &mut ShaderIr, producer: Option<&mut ShaderIr>) {
        link_interfaces(consumer, producer);
    }

    /// Compiles the IR of a stage into a native blob.
    fn compile_shader(&self, ir: &ShaderIr) -> Result<Vec<u8>, VulkanError>;

    /// Checks a compiled blob. The error is the validator's message.
    fn validate_shader(&self, blob: &[u8]) -> Result<(), String>;

    /// Returns the disassembly of a compiled blob, if the backend can produce it.
    #[inline]
    fn disassemble_shader(&self, blob: &[u8]) -> Option<String> {
        let _ = blob;
        None
    }
}

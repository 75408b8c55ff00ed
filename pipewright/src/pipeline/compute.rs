//! A pipeline that performs general-purpose operations.
//!
//! A compute pipeline takes buffers and/or images as both inputs and outputs. It operates
//! "standalone", with no additional infrastructure such as render passes or vertex input.
//!
//! A compute pipeline is relatively simple to create, requiring only a pipeline layout and a single
//! shader, the *compute shader*. Its state stream holds the compiled compute shader and the root
//! signature of the layout.

use super::{PipelineBatch, PipelineCreateFlags};
use crate::{
    cache::OnceCache,
    device::Device,
    macros::impl_id_counter,
    pipeline::{
        cache::PipelineCache,
        indirect::CommandSignatureDesc,
        layout::PipelineLayout,
        shader::{compile_stage, PipelineShaderStageCreateInfo, ShaderStage, TranslateOptions},
        stream::{PipelineStateStream, StateFragment},
        PipelineBindPoint,
    },
    Validated, ValidationError, VulkanError,
};
use ash::vk;
use std::{num::NonZero, sync::Arc};

/// A pipeline object that describes how the device should perform compute operations.
///
/// Pass an optional `Arc` to a `PipelineCache` to enable pipeline caching. Check the documentation
/// of the `PipelineCache` for more information.
#[derive(Debug)]
pub struct ComputePipeline {
    handle: vk::Pipeline,
    device: Arc<Device>,
    id: NonZero<u64>,
    flags: PipelineCreateFlags,
    layout: Arc<PipelineLayout>,
    dispatch_signature: OnceCache<(), vk::IndirectCommandsLayoutNV>,
}

impl ComputePipeline {
    /// Creates a new `ComputePipeline`.
    #[inline]
    pub fn new(
        device: Arc<Device>,
        cache: Option<Arc<PipelineCache>>,
        create_info: ComputePipelineCreateInfo,
    ) -> Result<Arc<ComputePipeline>, Validated<VulkanError>> {
        Self::validate_new(&device, cache.as_deref(), &create_info)?;

        Ok(unsafe { Self::new_unchecked(device, cache, create_info) }?)
    }

    /// Creates several `ComputePipeline`s at once. See [`PipelineBatch`] for how failures are
    /// reported.
    pub fn new_batch(
        device: Arc<Device>,
        cache: Option<Arc<PipelineCache>>,
        create_infos: impl IntoIterator<Item = ComputePipelineCreateInfo>,
    ) -> PipelineBatch<ComputePipeline> {
        PipelineBatch::create(
            create_infos,
            |create_info| create_info.flags,
            |create_info| Self::new(device.clone(), cache.clone(), create_info),
        )
    }

    fn validate_new(
        device: &Device,
        cache: Option<&PipelineCache>,
        create_info: &ComputePipelineCreateInfo,
    ) -> Result<(), Box<ValidationError>> {
        if let Some(cache) = cache {
            if cache.device().as_ref() != device {
                return Err(Box::new(ValidationError {
                    context: "cache".into(),
                    problem: "was not created by the same device as the pipeline".into(),
                    vuids: &["VUID-vkCreateComputePipelines-pipelineCache-parent"],
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
        create_info: ComputePipelineCreateInfo,
    ) -> Result<Arc<ComputePipeline>, VulkanError> {
        let ComputePipelineCreateInfo {
            flags,
            stage,
            layout,
            _ne: _,
        } = create_info;

        if flags.intersects(PipelineCreateFlags::FAIL_ON_PIPELINE_COMPILE_REQUIRED)
            && !cache.is_some_and(|cache| cache.contains(layout.fingerprint()))
        {
            return Err(VulkanError::PipelineCompileRequired);
        }

        let backend = device.backend();
        let mut ir = backend.translate_shader(
            &stage,
            &TranslateOptions::new(layout.binding_translation()),
        )?;
        backend.link_shaders(&mut ir, None);
        let bytecode = compile_stage(&device, &ir)?;

        let mut stream = PipelineStateStream::compute();
        stream.push(StateFragment::ComputeShader(bytecode));
        stream.push(StateFragment::RootSignature(layout.root_signature()));

        let handle = backend.create_pipeline_state(&stream)?;

        tracing::debug!(
            layout = %format_args!("{:016x}", layout.fingerprint()),
            stream_size = stream.size(),
            "created compute pipeline",
        );

        Ok(Arc::new(ComputePipeline {
            handle,
            device,
            id: Self::next_id(),
            flags,
            layout,
            dispatch_signature: OnceCache::new(),
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

    /// Returns the pipeline layout used in this compute pipeline.
    #[inline]
    pub fn layout(&self) -> &Arc<PipelineLayout> {
        &self.layout
    }

    /// Returns the bind point of the pipeline.
    #[inline]
    pub fn bind_point(&self) -> PipelineBindPoint {
        PipelineBindPoint::Compute
    }

    /// Returns the command signature of an indirect dispatch, creating it on first use.
    pub fn dispatch_command_signature(&self) -> Result<vk::IndirectCommandsLayoutNV, VulkanError> {
        self.dispatch_signature.get_or_try_insert(&(), || {
            let desc = CommandSignatureDesc::dispatch(
                self.layout.root_signature(),
                self.layout.sysval_parameter_index(),
            );
            let signature = self.device.backend().create_command_signature(&desc)?;

            Ok(((), signature))
        })
    }
}

impl Drop for ComputePipeline {
    #[inline]
    fn drop(&mut self) {
        let backend = self.device.backend();

        for ((), signature) in self.dispatch_signature.drain() {
            backend.destroy_command_signature(signature);
        }

        backend.destroy_pipeline_state(self.handle);
    }
}

impl_id_counter!(ComputePipeline);

/// Parameters to create a new `ComputePipeline`.
#[derive(Clone, Debug)]
pub struct ComputePipelineCreateInfo {
    /// Additional properties of the pipeline.
    ///
    /// The default value is empty.
    pub flags: PipelineCreateFlags,

    /// The compute shader stage to use.
    ///
    /// There is no default value.
    pub stage: PipelineShaderStageCreateInfo,

    /// The pipeline layout to use.
    ///
    /// There is no default value.
    pub layout: Arc<PipelineLayout>,

    pub _ne: crate::NonExhaustive,
}

impl ComputePipelineCreateInfo {
    /// Returns a `ComputePipelineCreateInfo` with the specified `stage` and `layout`.
    #[inline]
    pub fn stage_layout(stage: PipelineShaderStageCreateInfo, layout: Arc<PipelineLayout>) -> Self {
        Self {
            flags: PipelineCreateFlags::empty(),
            stage,
            layout,
            _ne: crate::NonExhaustive(()),
        }
    }

    pub(crate) fn validate(&self, device: &Device) -> Result<(), Box<ValidationError>> {
        let &Self {
            flags: _,
            ref stage,
            ref layout,
            _ne: _,
        } = self;

        stage
            .validate(device)
            .map_err(|err| err.add_context("stage"))?;

        if stage.stage != ShaderStage::Compute {
            return Err(Box::new(ValidationError {
                context: "stage.stage".into(),
                problem: "is not `ShaderStage::Compute`".into(),
                vuids: &["VUID-VkComputePipelineCreateInfo-stage-00701"],
                ..Default::default()
            }));
        }

        if layout.device().as_ref() != device {
            return Err(Box::new(ValidationError {
                context: "layout".into(),
                problem: "was not created by the same device as the pipeline".into(),
                ..Default::default()
            }));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ComputePipeline, ComputePipelineCreateInfo};
    use crate::{
        device::Device,
        pipeline::{
            indirect::IndirectArgument,
            layout::{PipelineLayout, PipelineLayoutCreateInfo},
            shader::{
                PipelineShaderStageCreateInfo, ShaderModule, ShaderModuleCreateInfo, ShaderStage,
                SPIRV_MAGIC,
            },
            stream::FragmentKind,
            PipelineCreateFlags,
        },
        tests::Event,
        Validated, VulkanError,
    };
    use std::sync::Arc;

    fn create_info(device: &Arc<Device>) -> ComputePipelineCreateInfo {
        let module = ShaderModule::new(
            device.clone(),
            ShaderModuleCreateInfo::new(&[SPIRV_MAGIC, 0x0001_0000]),
        )
        .unwrap();
        let layout =
            PipelineLayout::new(device.clone(), PipelineLayoutCreateInfo::default()).unwrap();

        ComputePipelineCreateInfo::stage_layout(
            PipelineShaderStageCreateInfo::new(ShaderStage::Compute, module),
            layout,
        )
    }

    #[test]
    fn stream_and_dispatch_signature() {
        let (device, backend) = test_device!(with_backend);
        let pipeline = ComputePipeline::new(device.clone(), None, create_info(&device)).unwrap();

        let stream = backend
            .events()
            .into_iter()
            .find_map(|event| match event {
                Event::CreatePipelineState(stream) => Some(stream),
                _ => None,
            })
            .unwrap();
        assert_eq!(
            stream.kinds().collect::<Vec<_>>(),
            [FragmentKind::ComputeShader, FragmentKind::RootSignature],
        );

        let signature = pipeline.dispatch_command_signature().unwrap();
        assert_eq!(pipeline.dispatch_command_signature().unwrap(), signature);

        let descs: Vec<_> = backend
            .events()
            .into_iter()
            .filter_map(|event| match event {
                Event::CreateCommandSignature(desc) => Some(desc),
                _ => None,
            })
            .collect();
        assert_eq!(descs.len(), 1);
        assert!(matches!(
            descs[0].arguments[0],
            IndirectArgument::Constant {
                num_32bit_values: 3,
                ..
            },
        ));

        drop(pipeline);
        assert_eq!(
            backend.count(|event| matches!(event, Event::DestroyCommandSignature(_))),
            1,
        );
        assert_eq!(
            backend.count(|event| matches!(event, Event::DestroyPipelineState(_))),
            1,
        );
    }

    #[test]
    fn wrong_stage() {
        let device = test_device!();
        let mut create_info = create_info(&device);
        create_info.stage.stage = ShaderStage::Fragment;

        match ComputePipeline::new(device, None, create_info) {
            Err(Validated::ValidationError(err)) => {
                assert_eq!(err.context, "create_info.stage.stage")
            }
            _ => panic!(),
        }
    }

    #[test]
    fn compile_required() {
        let (device, backend) = test_device!(with_backend);
        let create_info = ComputePipelineCreateInfo {
            flags: PipelineCreateFlags::FAIL_ON_PIPELINE_COMPILE_REQUIRED,
            ..create_info(&device)
        };

        assert!(matches!(
            ComputePipeline::new(device, None, create_info),
            Err(Validated::Error(VulkanError::PipelineCompileRequired)),
        ));
        assert_eq!(
            backend.count(|event| matches!(event, Event::CompileShader(_))),
            0,
        );
    }

    #[test]
    fn validation_failure_is_invalid_shader() {
        let (device, backend) = test_device!(with_backend);
        let create_info = create_info(&device);
        let layout = create_info.layout.clone();
        backend.fail_next_validation("bad blob");

        assert!(matches!(
            ComputePipeline::new(device, None, create_info),
            Err(Validated::Error(VulkanError::InvalidShader)),
        ));
        assert_eq!(Arc::strong_count(&layout), 1);
        assert_eq!(
            backend.count(|event| matches!(event, Event::CreatePipelineState(_))),
            0,
        );
    }
}

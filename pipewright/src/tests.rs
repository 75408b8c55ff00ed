//! A backend that records every call, for tests.

#![cfg(test)]

use crate::{
    backend::{PipelineBackend, ShaderBackend, TransferBackend},
    blit::{BuiltinShader, CopyRegion, CustomShaderDraw, GenericBlit, TfuJob, TileJob},
    format::Format,
    image::{ImageCreateInfo, ImageLayout},
    pipeline::{
        indirect::CommandSignatureDesc,
        layout::RootSignatureDesc,
        shader::{
            link_interfaces, PipelineShaderStageCreateInfo, ShaderIr, ShaderStage,
            TranslateOptions, YzFlip,
        },
        stream::PipelineStateStream,
    },
    VulkanError,
};
use ash::vk::{self, Handle};
use foldhash::HashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Creates a device on a [`RecordingBackend`](crate::tests::RecordingBackend).
///
/// `test_device!(with_backend)` also returns the backend, `test_device!(generation: N)` picks
/// the hardware generation.
macro_rules! test_device {
    () => {
        test_device!(generation: 42)
    };

    (generation: $generation:expr) => {{
        let backend = ::std::sync::Arc::new($crate::tests::RecordingBackend::default());
        $crate::tests::device_on(backend, $generation)
    }};

    (with_backend) => {{
        let backend = ::std::sync::Arc::new($crate::tests::RecordingBackend::default());
        let device = $crate::tests::device_on(backend.clone(), 42);
        (device, backend)
    }};
}

macro_rules! assert_should_panic {
    ($msg:expr, $code:block) => {{
        let res = ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| $code));

        match res {
            Ok(_) => panic!("Test expected to panic but didn't"),
            Err(err) => {
                if let Some(msg) = err.downcast_ref::<String>() {
                    assert!(msg.contains($msg));
                } else if let Some(&msg) = err.downcast_ref::<&str>() {
                    assert!(msg.contains($msg));
                } else {
                    panic!("Couldn't decipher the panic message of the test")
                }
            }
        }
    }};

    ($code:block) => {{
        let res = ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| $code));

        match res {
            Ok(_) => panic!("Test expected to panic but didn't"),
            Err(_) => {}
        }
    }};
}

pub(crate) fn device_on(
    backend: std::sync::Arc<RecordingBackend>,
    generation: u32,
) -> std::sync::Arc<crate::device::Device> {
    crate::device::Device::new(
        backend,
        crate::device::DeviceCreateInfo {
            generation,
            debug_flags: crate::device::DebugFlags::empty(),
            ..Default::default()
        },
    )
    .unwrap()
}

/// A call made to a [`RecordingBackend`].
#[derive(Clone, Debug)]
pub(crate) enum Event {
    CreateImage {
        image: vk::Image,
        format: Format,
        extent: [u32; 3],
        array_layers: u32,
    },
    DestroyImage { image: vk::Image },
    CopyRegion(CopyRegion),
    CreateBuiltinShader(BuiltinShader),
    DestroyBuiltinShader(vk::ShaderModule),
    DrawCustomShader(CustomShaderDraw),
    SubmitTfu(TfuJob),
    SubmitTileJob(TileJob),
    BlitGeneric(GenericBlit),
    FlushWriting(vk::Image),
    FlushReading(vk::Image),

    CreateRootSignature(RootSignatureDesc),
    DestroyRootSignature(vk::PipelineLayout),
    CreatePipelineState(PipelineStateStream),
    DestroyPipelineState(vk::Pipeline),
    CreateCommandSignature(CommandSignatureDesc),
    DestroyCommandSignature(vk::IndirectCommandsLayoutNV),

    TranslateShader {
        stage: ShaderStage,
        yz_flip: YzFlip,
        y_flip_mask: u32,
        z_flip_mask: u32,
        force_sample_rate_shading: bool,
    },
    LinkShaders {
        consumer: ShaderStage,
        producer: Option<ShaderStage>,
    },
    CompileShader(ShaderStage),
}

/// Records every call into an event log and hands out increasing handles.
#[derive(Default)]
pub(crate) struct RecordingBackend {
    events: Mutex<Vec<Event>>,
    next_handle: AtomicU64,
    blit_unsupported: AtomicBool,
    fail_tfu: Mutex<Option<VulkanError>>,
    fail_compile: Mutex<Option<(ShaderStage, VulkanError)>>,
    fail_validation: Mutex<Option<String>>,
    fail_pipeline_state: Mutex<Option<VulkanError>>,
    interfaces: Mutex<HashMap<ShaderStage, (Vec<u32>, Vec<u32>)>>,
}

impl RecordingBackend {
    /// Returns a copy of the event log.
    pub(crate) fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Returns the number of events matching `f`.
    pub(crate) fn count(&self, f: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().iter().filter(|&event| f(event)).count()
    }

    pub(crate) fn set_blit_supported(&self, supported: bool) {
        self.blit_unsupported.store(!supported, Ordering::Relaxed);
    }

    pub(crate) fn fail_next_tfu(&self, err: VulkanError) {
        *self.fail_tfu.lock() = Some(err);
    }

    pub(crate) fn fail_next_compile(&self, stage: ShaderStage, err: VulkanError) {
        *self.fail_compile.lock() = Some((stage, err));
    }

    pub(crate) fn fail_next_validation(&self, message: &str) {
        *self.fail_validation.lock() = Some(message.to_owned());
    }

    pub(crate) fn fail_next_pipeline_state(&self, err: VulkanError) {
        *self.fail_pipeline_state.lock() = Some(err);
    }

    /// Sets the input and output locations that `translate_shader` reports for `stage`.
    pub(crate) fn set_interface(&self, stage: ShaderStage, inputs: &[u32], outputs: &[u32]) {
        self.interfaces
            .lock()
            .insert(stage, (inputs.to_vec(), outputs.to_vec()));
    }

    fn record(&self, event: Event) {
        self.events.lock().push(event);
    }

    fn handle<T: Handle>(&self) -> T {
        T::from_raw(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

impl TransferBackend for RecordingBackend {
    fn create_image(
        &self,
        create_info: &ImageCreateInfo,
        _layout: &ImageLayout,
    ) -> Result<vk::Image, VulkanError> {
        let image = self.handle();
        self.record(Event::CreateImage {
            image,
            format: create_info.format,
            extent: create_info.extent,
            array_layers: create_info.array_layers,
        });

        Ok(image)
    }

    fn destroy_image(&self, image: vk::Image) {
        self.record(Event::DestroyImage { image });
    }

    fn copy_region(&self, copy: &CopyRegion) {
        self.record(Event::CopyRegion(*copy));
    }

    fn create_builtin_shader(
        &self,
        shader: BuiltinShader,
    ) -> Result<vk::ShaderModule, VulkanError> {
        self.record(Event::CreateBuiltinShader(shader));

        Ok(self.handle())
    }

    fn destroy_builtin_shader(&self, shader: vk::ShaderModule) {
        self.record(Event::DestroyBuiltinShader(shader));
    }

    fn draw_custom_shader(&self, draw: &CustomShaderDraw) -> Result<(), VulkanError> {
        self.record(Event::DrawCustomShader(draw.clone()));

        Ok(())
    }

    fn submit_tfu(&self, job: &TfuJob) -> Result<(), VulkanError> {
        if let Some(err) = self.fail_tfu.lock().take() {
            return Err(err);
        }

        self.record(Event::SubmitTfu(*job));

        Ok(())
    }

    fn submit_tile_job(&self, job: &TileJob) {
        self.record(Event::SubmitTileJob(job.clone()));
    }

    fn is_blit_supported(&self, _blit: &GenericBlit) -> bool {
        !self.blit_unsupported.load(Ordering::Relaxed)
    }

    fn blit_generic(&self, blit: &GenericBlit) {
        self.record(Event::BlitGeneric(blit.clone()));
    }

    fn flush_jobs_writing(&self, image: vk::Image) {
        self.record(Event::FlushWriting(image));
    }

    fn flush_jobs_reading(&self, image: vk::Image) {
        self.record(Event::FlushReading(image));
    }
}

impl PipelineBackend for RecordingBackend {
    fn create_root_signature(
        &self,
        desc: &RootSignatureDesc,
    ) -> Result<vk::PipelineLayout, VulkanError> {
        self.record(Event::CreateRootSignature(desc.clone()));

        Ok(self.handle())
    }

    fn destroy_root_signature(&self, root_signature: vk::PipelineLayout) {
        self.record(Event::DestroyRootSignature(root_signature));
    }

    fn create_pipeline_state(
        &self,
        stream: &PipelineStateStream,
    ) -> Result<vk::Pipeline, VulkanError> {
        if let Some(err) = self.fail_pipeline_state.lock().take() {
            return Err(err);
        }

        self.record(Event::CreatePipelineState(stream.clone()));

        Ok(self.handle())
    }

    fn destroy_pipeline_state(&self, pipeline: vk::Pipeline) {
        self.record(Event::DestroyPipelineState(pipeline));
    }

    fn create_command_signature(
        &self,
        desc: &CommandSignatureDesc,
    ) -> Result<vk::IndirectCommandsLayoutNV, VulkanError> {
        self.record(Event::CreateCommandSignature(desc.clone()));

        Ok(self.handle())
    }

    fn destroy_command_signature(&self, signature: vk::IndirectCommandsLayoutNV) {
        self.record(Event::DestroyCommandSignature(signature));
    }
}

impl ShaderBackend for RecordingBackend {
    fn translate_shader(
        &self,
        stage: &PipelineShaderStageCreateInfo,
        options: &TranslateOptions<'_>,
    ) -> Result<ShaderIr, VulkanError> {
        self.record(Event::TranslateShader {
            stage: stage.stage,
            yz_flip: options.yz_flip,
            y_flip_mask: options.y_flip_mask,
            z_flip_mask: options.z_flip_mask,
            force_sample_rate_shading: options.force_sample_rate_shading,
        });

        let (inputs, outputs) = self
            .interfaces
            .lock()
            .get(&stage.stage)
            .cloned()
            .unwrap_or_default();

        Ok(ShaderIr::new(stage.stage, inputs, outputs))
    }

    fn link_shaders(&self, consumer: &mut ShaderIr, producer: Option<&mut ShaderIr>) {
        self.record(Event::LinkShaders {
            consumer: consumer.stage,
            producer: producer.as_ref().map(|producer| producer.stage),
        });

        link_interfaces(consumer, producer);
    }

    fn compile_shader(&self, ir: &ShaderIr) -> Result<Vec<u8>, VulkanError> {
        let mut fail_compile = self.fail_compile.lock();

        if let Some((stage, err)) = *fail_compile {
            if stage == ir.stage {
                *fail_compile = None;
                return Err(err);
            }
        }

        drop(fail_compile);
        self.record(Event::CompileShader(ir.stage));

        Ok(vec![ir.stage as u8; 4])
    }

    fn validate_shader(&self, _blob: &[u8]) -> Result<(), String> {
        match self.fail_validation.lock().take() {
            Some(message) => Err(message),
            None => Ok(()),
        }
    }
}

//! Describes the layout of all descriptors within a descriptor set.
//!
//! Every descriptor takes [`DESCRIPTOR_SIZE`] bytes in the set, except combined image samplers,
//! which are an image descriptor followed by a sampler descriptor, and dynamic buffers, which are
//! not stored in the set at all. The descriptors of dynamic buffers are written at bind time into
//! a separate dynamic area, so that the offsets given when binding can be applied to them.
//!
//! The layout is immutable once created and shared through an `Arc`. It is destroyed when the
//! last pipeline layout and user holding it let go of it.

use crate::{
    device::Device,
    macros::{impl_id_counter, vulkan_enum},
    pipeline::shader::ShaderStages,
    sampler::{NativeSamplerDesc, Sampler},
    ValidationError,
};
use std::{
    collections::BTreeMap,
    hash::{Hash, Hasher},
    mem::size_of,
    num::NonZero,
    sync::Arc,
};

/// The size in bytes of one hardware descriptor.
pub const DESCRIPTOR_SIZE: u32 = 64;

/// Describes the layout of all descriptors within a descriptor set.
#[derive(Debug)]
pub struct DescriptorSetLayout {
    device: Arc<Device>,
    id: NonZero<u64>,

    bindings: BTreeMap<u32, BindingLayout>,
    immutable_samplers: Vec<Arc<Sampler>>,
    size: u32,
    dynamic_offset_size: u32,
    stages: ShaderStages,
}

impl DescriptorSetLayout {
    /// Creates a new `DescriptorSetLayout`.
    pub fn new(
        device: Arc<Device>,
        create_info: DescriptorSetLayoutCreateInfo,
    ) -> Result<Arc<DescriptorSetLayout>, Box<ValidationError>> {
        create_info
            .validate(&device)
            .map_err(|err| err.add_context("create_info"))?;

        Ok(unsafe { Self::new_unchecked(device, create_info) })
    }

    #[cfg_attr(not(feature = "document_unchecked"), doc(hidden))]
    pub unsafe fn new_unchecked(
        device: Arc<Device>,
        create_info: DescriptorSetLayoutCreateInfo,
    ) -> Arc<DescriptorSetLayout> {
        let DescriptorSetLayoutCreateInfo { bindings, _ne: _ } = create_info;

        // Immutable samplers are kept after the binding table, the offsets count from the start
        // of the layout so that zero can't be a valid offset.
        let samplers_start = (bindings.len() * size_of::<BindingLayout>()) as u32;
        let sampler_stride = size_of::<NativeSamplerDesc>() as u32;

        let mut binding_layouts = BTreeMap::new();
        let mut immutable_samplers = Vec::new();
        let mut size = 0;
        let mut dynamic_offset_size = 0;
        let mut stages = ShaderStages::empty();

        for (binding_num, binding) in bindings {
            let DescriptorSetLayoutBinding {
                descriptor_type,
                descriptor_count,
                stages: binding_stages,
                immutable_samplers: binding_samplers,
                _ne: _,
            } = binding;

            let element_size = descriptor_type.descriptor_size();

            let dynamic_offset_offset = if descriptor_type.is_dynamic() {
                let offset = dynamic_offset_size;
                dynamic_offset_size += descriptor_count * DESCRIPTOR_SIZE;
                offset
            } else {
                0
            };

            let immutable_samplers_offset = if binding_samplers.is_empty() {
                0
            } else {
                let offset = samplers_start + immutable_samplers.len() as u32 * sampler_stride;
                immutable_samplers.extend(binding_samplers);
                offset
            };

            binding_layouts.insert(
                binding_num,
                BindingLayout {
                    descriptor_type,
                    array_size: descriptor_count,
                    size: element_size,
                    offset: size,
                    dynamic_offset_offset,
                    immutable_samplers_offset,
                    stages: binding_stages,
                },
            );

            size += descriptor_count * element_size;
            stages |= binding_stages;
        }

        tracing::trace!(
            bindings = binding_layouts.len(),
            size,
            dynamic_offset_size,
            "creating descriptor set layout",
        );

        Arc::new(DescriptorSetLayout {
            device,
            id: Self::next_id(),
            bindings: binding_layouts,
            immutable_samplers,
            size,
            dynamic_offset_size,
            stages,
        })
    }

    /// Returns the device that owns `self`.
    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Returns the computed layout of each binding, by binding number.
    #[inline]
    pub fn bindings(&self) -> &BTreeMap<u32, BindingLayout> {
        &self.bindings
    }

    /// Returns the computed layout of one binding.
    #[inline]
    pub fn binding(&self, binding: u32) -> Option<&BindingLayout> {
        self.bindings.get(&binding)
    }

    /// Returns the total size in bytes of the set, with room for every array element.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Returns the size in bytes of the dynamic-offset area of the set.
    #[inline]
    pub fn dynamic_offset_size(&self) -> u32 {
        self.dynamic_offset_size
    }

    /// Returns the union of the stages of every binding.
    #[inline]
    pub fn stages(&self) -> ShaderStages {
        self.stages
    }

    /// Returns whether any binding has immutable samplers.
    #[inline]
    pub fn has_immutable_samplers(&self) -> bool {
        !self.immutable_samplers.is_empty()
    }

    /// Returns the immutable samplers of a binding, which is empty if it has none.
    pub fn immutable_samplers(&self, binding: &BindingLayout) -> &[Arc<Sampler>] {
        if binding.immutable_samplers_offset == 0 {
            return &[];
        }

        let samplers_start = (self.bindings.len() * size_of::<BindingLayout>()) as u32;
        let first = ((binding.immutable_samplers_offset - samplers_start)
            / size_of::<NativeSamplerDesc>() as u32) as usize;

        self.immutable_samplers
            .get(first..first + binding.array_size as usize)
            .unwrap_or(&[])
    }

    /// Feeds the content of the layout into `state`.
    pub(crate) fn hash_state<H: Hasher>(&self, state: &mut H) {
        for (&binding_num, binding) in &self.bindings {
            binding_num.hash(state);
            binding.hash(state);

            for sampler in self.immutable_samplers(binding) {
                sampler.hash_state(state);
            }
        }

        self.size.hash(state);
        self.dynamic_offset_size.hash(state);
    }
}

impl_id_counter!(DescriptorSetLayout);

/// Parameters to create a new `DescriptorSetLayout`.
#[derive(Clone, Debug)]
pub struct DescriptorSetLayoutCreateInfo {
    /// The bindings of the descriptor set layout, by binding number.
    ///
    /// The default value is empty.
    pub bindings: BTreeMap<u32, DescriptorSetLayoutBinding>,

    pub _ne: crate::NonExhaustive,
}

impl Default for DescriptorSetLayoutCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            bindings: BTreeMap::new(),
            _ne: crate::NonExhaustive(()),
        }
    }
}

impl DescriptorSetLayoutCreateInfo {
    pub(crate) fn validate(&self, device: &Device) -> Result<(), Box<ValidationError>> {
        let Self { bindings, _ne: _ } = self;

        for (&binding_num, binding) in bindings {
            binding
                .validate(device)
                .map_err(|err| err.add_context(format!("bindings[{}]", binding_num)))?;
        }

        Ok(())
    }
}

/// A binding in a descriptor set layout.
#[derive(Clone, Debug)]
pub struct DescriptorSetLayoutBinding {
    /// The content and layout of each array element of a binding.
    ///
    /// There is no default value.
    pub descriptor_type: DescriptorType,

    /// How many descriptors (array elements) this binding is made of.
    ///
    /// The default value is `1`.
    pub descriptor_count: u32,

    /// Which shader stages are going to access the descriptors in this binding.
    ///
    /// The default value is [`ShaderStages::empty()`], which must be overridden.
    pub stages: ShaderStages,

    /// Samplers that are included as a fixed part of the descriptor set layout.
    ///
    /// The list must be either empty, or contain exactly `descriptor_count` samplers. It can only
    /// be non-empty if `descriptor_type` is [`DescriptorType::Sampler`] or
    /// [`DescriptorType::CombinedImageSampler`].
    ///
    /// The default value is empty.
    pub immutable_samplers: Vec<Arc<Sampler>>,

    pub _ne: crate::NonExhaustive,
}

impl DescriptorSetLayoutBinding {
    /// Returns a `DescriptorSetLayoutBinding` with the given type.
    #[inline]
    pub fn descriptor_type(descriptor_type: DescriptorType) -> Self {
        Self {
            descriptor_type,
            descriptor_count: 1,
            stages: ShaderStages::empty(),
            immutable_samplers: Vec::new(),
            _ne: crate::NonExhaustive(()),
        }
    }

    pub(crate) fn validate(&self, device: &Device) -> Result<(), Box<ValidationError>> {
        let &Self {
            descriptor_type,
            descriptor_count,
            stages: _,
            ref immutable_samplers,
            _ne: _,
        } = self;

        if descriptor_count == 0 {
            return Err(Box::new(ValidationError {
                context: "descriptor_count".into(),
                problem: "is zero".into(),
                ..Default::default()
            }));
        }

        if !immutable_samplers.is_empty() {
            if !matches!(
                descriptor_type,
                DescriptorType::Sampler | DescriptorType::CombinedImageSampler
            ) {
                return Err(Box::new(ValidationError {
                    problem: "`immutable_samplers` is not empty, but `descriptor_type` is not \
                        `DescriptorType::Sampler` or `DescriptorType::CombinedImageSampler`"
                        .into(),
                    ..Default::default()
                }));
            }

            if immutable_samplers.len() != descriptor_count as usize {
                return Err(Box::new(ValidationError {
                    problem: "`immutable_samplers` is not empty, but its length does not equal \
                        `descriptor_count`"
                        .into(),
                    vuids: &["VUID-VkDescriptorSetLayoutBinding-descriptorType-00282"],
                    ..Default::default()
                }));
            }

            if immutable_samplers
                .iter()
                .any(|sampler| sampler.device().as_ref() != device)
            {
                return Err(Box::new(ValidationError {
                    context: "immutable_samplers".into(),
                    problem: "contains a sampler that was not created by the same device".into(),
                    ..Default::default()
                }));
            }
        }

        Ok(())
    }
}

/// The computed layout of one binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BindingLayout {
    /// The type of the descriptors.
    pub descriptor_type: DescriptorType,

    /// The number of array elements.
    pub array_size: u32,

    /// The size in bytes of each element in the set.
    pub size: u32,

    /// The byte offset of the first element in the set.
    pub offset: u32,

    /// The byte offset of the first element in the dynamic-offset area of the set, for dynamic
    /// buffers.
    pub dynamic_offset_offset: u32,

    /// The offset of the immutable samplers of the binding within the layout, or 0 if the binding
    /// has none.
    pub immutable_samplers_offset: u32,

    /// The stages that use the binding.
    pub stages: ShaderStages,
}

vulkan_enum! {
    #[non_exhaustive]

    /// Describes what kind of resource may later be bound to a descriptor.
    DescriptorType = DescriptorType(i32);

    /// Describes how a `SampledImage` descriptor should be read.
    Sampler = SAMPLER,

    /// Combines `SampledImage` and `Sampler` in a single descriptor.
    CombinedImageSampler = COMBINED_IMAGE_SAMPLER,

    /// Gives read-only access to an image via a sampler.
    SampledImage = SAMPLED_IMAGE,

    /// Gives read and/or write access to individual pixels in an image.
    StorageImage = STORAGE_IMAGE,

    /// Gives read-only access to the content of a buffer, interpreted as an array of texels.
    UniformTexelBuffer = UNIFORM_TEXEL_BUFFER,

    /// Gives read and/or write access to the content of a buffer, interpreted as an array of
    /// texels.
    StorageTexelBuffer = STORAGE_TEXEL_BUFFER,

    /// Gives read-only access to the content of a buffer, interpreted as a structure.
    UniformBuffer = UNIFORM_BUFFER,

    /// Gives read and/or write access to the content of a buffer, interpreted as a structure.
    StorageBuffer = STORAGE_BUFFER,

    /// As `UniformBuffer`, but the offset within the buffer is specified at the time the
    /// descriptor set is bound.
    UniformBufferDynamic = UNIFORM_BUFFER_DYNAMIC,

    /// As `StorageBuffer`, but the offset within the buffer is specified at the time the
    /// descriptor set is bound.
    StorageBufferDynamic = STORAGE_BUFFER_DYNAMIC,

    /// Gives access to an image inside a fragment shader via a render pass.
    InputAttachment = INPUT_ATTACHMENT,
}

impl DescriptorType {
    /// Returns whether the buffer offset is given when binding.
    #[inline]
    pub fn is_dynamic(self) -> bool {
        matches!(
            self,
            Self::UniformBufferDynamic | Self::StorageBufferDynamic
        )
    }

    /// Returns the number of bytes one element takes in a descriptor set.
    #[inline]
    pub fn descriptor_size(self) -> u32 {
        match self {
            Self::UniformBufferDynamic | Self::StorageBufferDynamic => 0,
            Self::CombinedImageSampler => 2 * DESCRIPTOR_SIZE,
            _ => DESCRIPTOR_SIZE,
        }
    }
}

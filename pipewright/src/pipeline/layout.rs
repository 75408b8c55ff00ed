//! The layout of descriptor sets and push constants used by a pipeline.
//!
//! # Overview
//!
//! The layout itself only *describes* the descriptors and push constants, and does not contain
//! their content itself. Instead, you can think of it as a `struct` definition that states which
//! members there are, what types they have, and in what order:
//!
//! ```text
//! #[repr(C)]
//! struct MyPipelineLayout {
//!     push_constants: Pc,
//!     descriptor_set0: Ds0,
//!     descriptor_set1: Ds1,
//!     descriptor_set2: Ds2,
//!     descriptor_set3: Ds3,
//! }
//! ```
//!
//! # Native registers
//!
//! Shaders don't address descriptors by set and binding natively, but by register space and
//! register. Each set gets the register space of its index, and each binding a base register,
//! counted in array elements from the start of the set. This assignment is the
//! [`BindingTranslation`] given to the backend when translating shaders.
//!
//! The root signature of the layout has, in order: for each set, a table of views and a table of
//! samplers if it has any; one block of root constants for system values; one block of root
//! constants for push constants if there are any. Immutable samplers become static samplers of the
//! root signature.

use crate::{
    descriptor_set::layout::{BindingLayout, DescriptorSetLayout, DescriptorType},
    device::Device,
    macros::impl_id_counter,
    pipeline::{indirect::NUM_SYSVAL_VALUES, shader::ShaderStages},
    sampler::NativeSamplerDesc,
    Validated, ValidationError, VulkanError,
};
use ash::vk;
use foldhash::fast::FixedState;
use smallvec::SmallVec;
use std::{
    hash::{BuildHasher, Hash, Hasher},
    num::NonZero,
    sync::Arc,
};

/// The maximum number of descriptor sets of a pipeline layout.
pub const MAX_SETS: usize = 4;

/// The register space of the system-value root constants.
pub const SYSVAL_REGISTER_SPACE: u32 = MAX_SETS as u32;

/// The register space of the push-constant root constants.
pub const PUSH_CONSTANT_REGISTER_SPACE: u32 = MAX_SETS as u32 + 1;

/// The alignment of the push-constant block.
pub const PUSH_CONSTANT_ALIGNMENT: u32 = 16;

const FINGERPRINT_SEED: u64 = 0x7069_7065_7772_6974;

/// Describes the layout of descriptor sets and push constants that are made available to shaders.
#[derive(Debug)]
pub struct PipelineLayout {
    device: Arc<Device>,
    id: NonZero<u64>,
    root_signature: vk::PipelineLayout,

    set_layouts: Vec<Arc<DescriptorSetLayout>>,
    sets: Vec<PipelineLayoutSet>,
    push_constant_ranges: Vec<PushConstantRange>,
    push_constant_size: u32,
    dynamic_offset_size: u32,
    fingerprint: u64,
    binding_translation: BindingTranslation,
    sysval_parameter_index: u32,
    push_constant_parameter_index: Option<u32>,
}

impl PipelineLayout {
    /// Creates a new `PipelineLayout`.
    pub fn new(
        device: Arc<Device>,
        create_info: PipelineLayoutCreateInfo,
    ) -> Result<Arc<PipelineLayout>, Validated<VulkanError>> {
        create_info
            .validate(&device)
            .map_err(|err| err.add_context("create_info"))?;

        Ok(unsafe { Self::new_unchecked(device, create_info) }?)
    }

    #[cfg_attr(not(feature = "document_unchecked"), doc(hidden))]
    pub unsafe fn new_unchecked(
        device: Arc<Device>,
        create_info: PipelineLayoutCreateInfo,
    ) -> Result<Arc<PipelineLayout>, VulkanError> {
        let PipelineLayoutCreateInfo {
            set_layouts,
            push_constant_ranges,
            _ne: _,
        } = create_info;

        let mut sets = Vec::with_capacity(set_layouts.len());
        let mut dynamic_offset_size = 0;

        for set_layout in &set_layouts {
            sets.push(PipelineLayoutSet {
                size: set_layout.size(),
                dynamic_offset_start: dynamic_offset_size,
            });
            dynamic_offset_size += set_layout.dynamic_offset_size();
        }

        let push_constant_size = push_constant_ranges
            .iter()
            .map(|range| range.offset + range.size)
            .max()
            .unwrap_or(0)
            .next_multiple_of(PUSH_CONSTANT_ALIGNMENT);

        let fingerprint = {
            let mut hasher = FixedState::with_seed(FINGERPRINT_SEED).build_hasher();

            for set_layout in &set_layouts {
                set_layout.hash_state(&mut hasher);
            }
            push_constant_size.hash(&mut hasher);

            hasher.finish()
        };

        let binding_translation = BindingTranslation::new(&set_layouts);
        let root_signature_desc = RootSignatureDesc::new(
            &set_layouts,
            &binding_translation,
            &push_constant_ranges,
            push_constant_size,
        );

        let root_signature = device
            .backend()
            .create_root_signature(&root_signature_desc)?;

        tracing::debug!(
            sets = set_layouts.len(),
            push_constant_size,
            dynamic_offset_size,
            fingerprint = %format_args!("{:016x}", fingerprint),
            "created pipeline layout",
        );

        Ok(Arc::new(PipelineLayout {
            device,
            id: Self::next_id(),
            root_signature,
            set_layouts,
            sets,
            push_constant_ranges,
            push_constant_size,
            dynamic_offset_size,
            fingerprint,
            binding_translation,
            sysval_parameter_index: root_signature_desc.sysval_parameter_index,
            push_constant_parameter_index: root_signature_desc.push_constant_parameter_index,
        }))
    }

    /// Returns the device that owns `self`.
    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Returns the backend root signature.
    #[inline]
    pub fn root_signature(&self) -> vk::PipelineLayout {
        self.root_signature
    }

    /// Returns the descriptor set layouts this pipeline layout was created from.
    #[inline]
    pub fn set_layouts(&self) -> &[Arc<DescriptorSetLayout>] {
        &self.set_layouts
    }

    /// Returns the size and dynamic-offset start of each set.
    #[inline]
    pub fn sets(&self) -> &[PipelineLayoutSet] {
        &self.sets
    }

    /// Returns the push constant ranges this pipeline layout was created from.
    #[inline]
    pub fn push_constant_ranges(&self) -> &[PushConstantRange] {
        &self.push_constant_ranges
    }

    /// Returns the size of the push-constant block, a multiple of 16.
    #[inline]
    pub fn push_constant_size(&self) -> u32 {
        self.push_constant_size
    }

    /// Returns the total size of the dynamic-offset areas of every set.
    #[inline]
    pub fn dynamic_offset_size(&self) -> u32 {
        self.dynamic_offset_size
    }

    /// Returns a hash of the content of the layout. Layouts with the same set layouts and push
    /// constants have the same fingerprint, across runs too.
    #[inline]
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Returns the native register of every binding.
    #[inline]
    pub fn binding_translation(&self) -> &BindingTranslation {
        &self.binding_translation
    }

    /// Returns the index of the sysval root constants in the root signature.
    #[inline]
    pub fn sysval_parameter_index(&self) -> u32 {
        self.sysval_parameter_index
    }

    /// Returns the index of the push-constant root constants in the root signature, if the layout
    /// has push constants.
    #[inline]
    pub fn push_constant_parameter_index(&self) -> Option<u32> {
        self.push_constant_parameter_index
    }
}

impl Drop for PipelineLayout {
    #[inline]
    fn drop(&mut self) {
        self.device
            .backend()
            .destroy_root_signature(self.root_signature);
    }
}

impl_id_counter!(PipelineLayout);

/// Parameters to create a new `PipelineLayout`.
#[derive(Clone, Debug)]
pub struct PipelineLayoutCreateInfo {
    /// The descriptor set layouts that should be part of the pipeline layout.
    ///
    /// They are provided in order of set number.
    ///
    /// The default value is empty.
    pub set_layouts: Vec<Arc<DescriptorSetLayout>>,

    /// The ranges of push constants that the pipeline will access.
    ///
    /// A shader stage can only appear in one element of the list, but it is possible to combine
    /// ranges for multiple shader stages if they are the same.
    ///
    /// The default value is empty.
    pub push_constant_ranges: Vec<PushConstantRange>,

    pub _ne: crate::NonExhaustive,
}

impl Default for PipelineLayoutCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            set_layouts: Vec::new(),
            push_constant_ranges: Vec::new(),
            _ne: crate::NonExhaustive(()),
        }
    }
}

impl PipelineLayoutCreateInfo {
    pub(crate) fn validate(&self, device: &Device) -> Result<(), Box<ValidationError>> {
        let Self {
            set_layouts,
            push_constant_ranges,
            _ne: _,
        } = self;

        let properties = device.properties();

        if set_layouts.len() > properties.max_bound_descriptor_sets as usize {
            return Err(Box::new(ValidationError {
                context: "set_layouts".into(),
                problem: "the length exceeds the `max_bound_descriptor_sets` limit".into(),
                vuids: &["VUID-VkPipelineLayoutCreateInfo-setLayoutCount-00286"],
                ..Default::default()
            }));
        }

        for (set_num, set_layout) in set_layouts.iter().enumerate() {
            if set_layout.device().as_ref() != device {
                return Err(Box::new(ValidationError {
                    context: format!("set_layouts[{}]", set_num).into(),
                    problem: "was not created by the same device".into(),
                    ..Default::default()
                }));
            }
        }

        let mut seen_stages = ShaderStages::empty();

        for (range_index, range) in push_constant_ranges.iter().enumerate() {
            range
                .validate(device)
                .map_err(|err| err.add_context(format!("push_constant_ranges[{}]", range_index)))?;

            if seen_stages.intersects(range.stages) {
                return Err(Box::new(ValidationError {
                    context: "push_constant_ranges".into(),
                    problem: "contains more than one range with the same stage".into(),
                    vuids: &["VUID-VkPipelineLayoutCreateInfo-pPushConstantRanges-00292"],
                    ..Default::default()
                }));
            }

            seen_stages |= range.stages;
        }

        Ok(())
    }
}

/// Description of a range of the push constants of a pipeline layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PushConstantRange {
    /// The stages which can access this range. A stage can access at most one push constant range.
    ///
    /// The default value is [`ShaderStages::empty()`], which must be overridden.
    pub stages: ShaderStages,

    /// Offset in bytes from the start of the push constants to this range.
    ///
    /// The value must be a multiple of 4.
    ///
    /// The default value is `0`.
    pub offset: u32,

    /// Size in bytes of the range.
    ///
    /// The value must be a multiple of 4, and not 0.
    ///
    /// The default value is `0`, which must be overridden.
    pub size: u32,
}

impl Default for PushConstantRange {
    #[inline]
    fn default() -> Self {
        Self {
            stages: ShaderStages::empty(),
            offset: 0,
            size: 0,
        }
    }
}

impl PushConstantRange {
    pub(crate) fn validate(&self, device: &Device) -> Result<(), Box<ValidationError>> {
        let &Self {
            stages,
            offset,
            size,
        } = self;

        if stages.is_empty() {
            return Err(Box::new(ValidationError {
                context: "stages".into(),
                problem: "is empty".into(),
                vuids: &["VUID-VkPushConstantRange-stageFlags-requiredbitmask"],
                ..Default::default()
            }));
        }

        let max_push_constants_size = device.properties().max_push_constants_size;

        if offset % 4 != 0 {
            return Err(Box::new(ValidationError {
                context: "offset".into(),
                problem: "is not a multiple of 4".into(),
                vuids: &["VUID-VkPushConstantRange-offset-00295"],
                ..Default::default()
            }));
        }

        if offset >= max_push_constants_size {
            return Err(Box::new(ValidationError {
                context: "offset".into(),
                problem: "is not less than the `max_push_constants_size` limit".into(),
                vuids: &["VUID-VkPushConstantRange-offset-00294"],
                ..Default::default()
            }));
        }

        if size == 0 || size % 4 != 0 {
            return Err(Box::new(ValidationError {
                context: "size".into(),
                problem: "is zero or not a multiple of 4".into(),
                vuids: &[
                    "VUID-VkPushConstantRange-size-00296",
                    "VUID-VkPushConstantRange-size-00297",
                ],
                ..Default::default()
            }));
        }

        if size > max_push_constants_size - offset {
            return Err(Box::new(ValidationError {
                problem: "`size` is greater than the `max_push_constants_size` limit minus \
                    `offset`"
                    .into(),
                vuids: &["VUID-VkPushConstantRange-size-00298"],
                ..Default::default()
            }));
        }

        Ok(())
    }
}

/// The placement of one descriptor set in a pipeline layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PipelineLayoutSet {
    /// The size of the set, in bytes.
    pub size: u32,

    /// The byte offset of the dynamic-offset area of the set within that of the layout.
    pub dynamic_offset_start: u32,
}

/// The native register of every binding of a pipeline layout.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BindingTranslation {
    pub sets: SmallVec<[SetBindingTranslation; MAX_SETS]>,
}

impl BindingTranslation {
    fn new(set_layouts: &[Arc<DescriptorSetLayout>]) -> Self {
        let sets = set_layouts
            .iter()
            .enumerate()
            .map(|(set_num, set_layout)| {
                let mut next_register = 0;
                let bindings = set_layout
                    .bindings()
                    .iter()
                    .map(|(&binding, layout)| {
                        let base_register = next_register;
                        next_register += layout.array_size;

                        BindingRegister {
                            binding,
                            descriptor_type: layout.descriptor_type,
                            base_register,
                        }
                    })
                    .collect();

                SetBindingTranslation {
                    register_space: set_num as u32,
                    bindings,
                }
            })
            .collect();

        BindingTranslation { sets }
    }

    /// Returns the register of a binding.
    pub fn get(&self, set: u32, binding: u32) -> Option<(u32, &BindingRegister)> {
        let set = self.sets.get(set as usize)?;
        let register = set.bindings.iter().find(|b| b.binding == binding)?;

        Some((set.register_space, register))
    }
}

/// The native registers of one set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SetBindingTranslation {
    pub register_space: u32,
    pub bindings: Vec<BindingRegister>,
}

/// The native register of one binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BindingRegister {
    pub binding: u32,
    pub descriptor_type: DescriptorType,
    pub base_register: u32,
}

/// The kind of native descriptor a range holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DescriptorRangeType {
    /// Read-only views.
    Srv,
    /// Read-write views.
    Uav,
    /// Constant buffers.
    Cbv,
    /// Samplers.
    Sampler,
}

impl DescriptorRangeType {
    /// Returns the kind of view of a descriptor type, or `None` for samplers.
    pub fn view_type(descriptor_type: DescriptorType) -> Option<Self> {
        match descriptor_type {
            DescriptorType::Sampler => None,
            DescriptorType::CombinedImageSampler
            | DescriptorType::SampledImage
            | DescriptorType::UniformTexelBuffer
            | DescriptorType::InputAttachment => Some(Self::Srv),
            DescriptorType::StorageImage
            | DescriptorType::StorageTexelBuffer
            | DescriptorType::StorageBuffer
            | DescriptorType::StorageBufferDynamic => Some(Self::Uav),
            DescriptorType::UniformBuffer | DescriptorType::UniformBufferDynamic => {
                Some(Self::Cbv)
            }
        }
    }
}

/// A range of descriptors in a root descriptor table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DescriptorRange {
    pub range_type: DescriptorRangeType,
    pub num_descriptors: u32,
    pub base_register: u32,
    pub register_space: u32,
    pub offset_in_descriptors: u32,
}

/// One parameter of a root signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RootParameter {
    /// A table of descriptors in a descriptor heap.
    DescriptorTable {
        ranges: Vec<DescriptorRange>,
        visibility: ShaderStages,
    },

    /// 32-bit values stored in the root signature itself.
    Constants {
        register: u32,
        register_space: u32,
        num_32bit_values: u32,
        visibility: ShaderStages,
    },
}

/// An immutable sampler baked into a root signature.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StaticSampler {
    pub desc: NativeSamplerDesc,
    pub register: u32,
    pub register_space: u32,
    pub visibility: ShaderStages,
}

/// The description of the root signature of a pipeline layout.
#[derive(Clone, Debug, PartialEq)]
pub struct RootSignatureDesc {
    pub parameters: Vec<RootParameter>,
    pub static_samplers: Vec<StaticSampler>,
    pub sysval_parameter_index: u32,
    pub push_constant_parameter_index: Option<u32>,
}

impl RootSignatureDesc {
    fn new(
        set_layouts: &[Arc<DescriptorSetLayout>],
        translation: &BindingTranslation,
        push_constant_ranges: &[PushConstantRange],
        push_constant_size: u32,
    ) -> Self {
        let mut parameters = Vec::new();
        let mut static_samplers = Vec::new();

        for (set_layout, set) in set_layouts.iter().zip(&translation.sets) {
            let mut views: Vec<DescriptorRange> = Vec::new();
            let mut samplers: Vec<DescriptorRange> = Vec::new();
            let (mut views_visibility, mut samplers_visibility) =
                (ShaderStages::empty(), ShaderStages::empty());

            for (binding, register) in set_layout.bindings().values().zip(&set.bindings) {
                let BindingLayout {
                    descriptor_type,
                    array_size,
                    stages,
                    ..
                } = *binding;

                if let Some(range_type) = DescriptorRangeType::view_type(descriptor_type) {
                    views.push(DescriptorRange {
                        range_type,
                        num_descriptors: array_size,
                        base_register: register.base_register,
                        register_space: set.register_space,
                        offset_in_descriptors: views.iter().map(|r| r.num_descriptors).sum(),
                    });
                    views_visibility |= stages;
                }

                if !matches!(
                    descriptor_type,
                    DescriptorType::Sampler | DescriptorType::CombinedImageSampler
                ) {
                    continue;
                }

                let immutable_samplers = set_layout.immutable_samplers(binding);

                if immutable_samplers.is_empty() {
                    samplers.push(DescriptorRange {
                        range_type: DescriptorRangeType::Sampler,
                        num_descriptors: array_size,
                        base_register: register.base_register,
                        register_space: set.register_space,
                        offset_in_descriptors: samplers.iter().map(|r| r.num_descriptors).sum(),
                    });
                    samplers_visibility |= stages;
                } else {
                    static_samplers.extend(immutable_samplers.iter().enumerate().map(
                        |(index, sampler)| StaticSampler {
                            desc: sampler.to_native(),
                            register: register.base_register + index as u32,
                            register_space: set.register_space,
                            visibility: stages,
                        },
                    ));
                }
            }

            if !views.is_empty() {
                parameters.push(RootParameter::DescriptorTable {
                    ranges: views,
                    visibility: views_visibility,
                });
            }

            if !samplers.is_empty() {
                parameters.push(RootParameter::DescriptorTable {
                    ranges: samplers,
                    visibility: samplers_visibility,
                });
            }
        }

        let sysval_parameter_index = parameters.len() as u32;
        parameters.push(RootParameter::Constants {
            register: 0,
            register_space: SYSVAL_REGISTER_SPACE,
            num_32bit_values: NUM_SYSVAL_VALUES,
            visibility: ShaderStages::all(),
        });

        let push_constant_parameter_index = (push_constant_size > 0).then(|| {
            let visibility = push_constant_ranges
                .iter()
                .fold(ShaderStages::empty(), |acc, range| acc | range.stages);

            parameters.push(RootParameter::Constants {
                register: 0,
                register_space: PUSH_CONSTANT_REGISTER_SPACE,
                num_32bit_values: push_constant_size / 4,
                visibility,
            });

            parameters.len() as u32 - 1
        });

        RootSignatureDesc {
            parameters,
            static_samplers,
            sysval_parameter_index,
            push_constant_parameter_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        DescriptorRangeType, PipelineLayout, PipelineLayoutCreateInfo, PushConstantRange,
        RootParameter, PUSH_CONSTANT_REGISTER_SPACE, SYSVAL_REGISTER_SPACE,
    };
    use crate::{
        descriptor_set::layout::{
            DescriptorSetLayout, DescriptorSetLayoutBinding, DescriptorSetLayoutCreateInfo,
            DescriptorType, DESCRIPTOR_SIZE,
        },
        device::Device,
        pipeline::shader::ShaderStages,
        sampler::{Sampler, SamplerCreateInfo},
        tests::Event,
    };
    use std::{collections::BTreeMap, sync::Arc};

    fn set_layout(
        device: &Arc<Device>,
        bindings: impl IntoIterator<Item = (u32, DescriptorType, u32)>,
    ) -> Arc<DescriptorSetLayout> {
        DescriptorSetLayout::new(
            device.clone(),
            DescriptorSetLayoutCreateInfo {
                bindings: bindings
                    .into_iter()
                    .map(|(binding, descriptor_type, descriptor_count)| {
                        (
                            binding,
                            DescriptorSetLayoutBinding {
                                descriptor_count,
                                stages: ShaderStages::all(),
                                ..DescriptorSetLayoutBinding::descriptor_type(descriptor_type)
                            },
                        )
                    })
                    .collect(),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn sets_and_push_constants() {
        let (device, backend) = test_device!(with_backend);

        let set0 = set_layout(
            &device,
            [
                (0, DescriptorType::UniformBufferDynamic, 1),
                (1, DescriptorType::SampledImage, 4),
            ],
        );
        let set1 = set_layout(&device, [(2, DescriptorType::StorageBufferDynamic, 2)]);

        let layout = PipelineLayout::new(
            device,
            PipelineLayoutCreateInfo {
                set_layouts: vec![set0, set1],
                push_constant_ranges: vec![PushConstantRange {
                    stages: ShaderStages::VERTEX,
                    offset: 4,
                    size: 20,
                }],
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(layout.sets()[0].size, 4 * DESCRIPTOR_SIZE);
        assert_eq!(layout.sets()[0].dynamic_offset_start, 0);
        assert_eq!(layout.sets()[1].size, 0);
        assert_eq!(layout.sets()[1].dynamic_offset_start, DESCRIPTOR_SIZE);
        assert_eq!(layout.dynamic_offset_size(), 3 * DESCRIPTOR_SIZE);
        assert_eq!(layout.push_constant_size(), 32);

        let translation = layout.binding_translation();
        assert_eq!(translation.get(0, 1).unwrap().1.base_register, 1);
        assert_eq!(translation.get(1, 2).unwrap().0, 1);
        assert!(translation.get(2, 0).is_none());

        let root_signatures = backend.count(|event| matches!(event, Event::CreateRootSignature(_)));
        assert_eq!(root_signatures, 1);

        drop(layout);
        assert_eq!(
            backend.count(|event| matches!(event, Event::DestroyRootSignature(_))),
            1,
        );
    }

    #[test]
    fn root_signature_layout() {
        let (device, backend) = test_device!(with_backend);
        let sampler =
            Sampler::new(device.clone(), SamplerCreateInfo::simple_repeat_linear()).unwrap();

        let set0 = DescriptorSetLayout::new(
            device.clone(),
            DescriptorSetLayoutCreateInfo {
                bindings: BTreeMap::from([
                    (
                        0,
                        DescriptorSetLayoutBinding {
                            stages: ShaderStages::FRAGMENT,
                            immutable_samplers: vec![sampler],
                            ..DescriptorSetLayoutBinding::descriptor_type(
                                DescriptorType::CombinedImageSampler,
                            )
                        },
                    ),
                    (
                        1,
                        DescriptorSetLayoutBinding {
                            stages: ShaderStages::FRAGMENT,
                            ..DescriptorSetLayoutBinding::descriptor_type(DescriptorType::Sampler)
                        },
                    ),
                ]),
                ..Default::default()
            },
        )
        .unwrap();

        let layout = PipelineLayout::new(
            device,
            PipelineLayoutCreateInfo {
                set_layouts: vec![set0],
                push_constant_ranges: vec![PushConstantRange {
                    stages: ShaderStages::FRAGMENT,
                    offset: 0,
                    size: 4,
                }],
                ..Default::default()
            },
        )
        .unwrap();

        let desc = backend
            .events()
            .into_iter()
            .find_map(|event| match event {
                Event::CreateRootSignature(desc) => Some(desc),
                _ => None,
            })
            .unwrap();

        assert_eq!(desc.parameters.len(), 4);
        assert_eq!(desc.static_samplers.len(), 1);
        assert_eq!(desc.static_samplers[0].register, 0);

        match &desc.parameters[0] {
            RootParameter::DescriptorTable { ranges, .. } => {
                assert_eq!(ranges.len(), 1);
                assert_eq!(ranges[0].range_type, DescriptorRangeType::Srv);
            }
            other => panic!("unexpected parameter {:?}", other),
        }
        match &desc.parameters[1] {
            RootParameter::DescriptorTable { ranges, .. } => {
                assert_eq!(ranges[0].range_type, DescriptorRangeType::Sampler);
                assert_eq!(ranges[0].base_register, 1);
            }
            other => panic!("unexpected parameter {:?}", other),
        }
        assert!(matches!(
            desc.parameters[2],
            RootParameter::Constants {
                register_space: SYSVAL_REGISTER_SPACE,
                ..
            }
        ));
        assert!(matches!(
            desc.parameters[3],
            RootParameter::Constants {
                register_space: PUSH_CONSTANT_REGISTER_SPACE,
                num_32bit_values: 4,
                ..
            }
        ));
        assert_eq!(layout.sysval_parameter_index(), 2);
        assert_eq!(layout.push_constant_parameter_index(), Some(3));
    }

    #[test]
    fn fingerprint_follows_content() {
        let device = test_device!();

        let make = |descriptor_type, push_constant_size| {
            let set = set_layout(&device, [(0, descriptor_type, 1)]);

            PipelineLayout::new(
                device.clone(),
                PipelineLayoutCreateInfo {
                    set_layouts: vec![set],
                    push_constant_ranges: vec![PushConstantRange {
                        stages: ShaderStages::COMPUTE,
                        offset: 0,
                        size: push_constant_size,
                    }],
                    ..Default::default()
                },
            )
            .unwrap()
        };

        let a = make(DescriptorType::UniformBuffer, 16);
        let b = make(DescriptorType::UniformBuffer, 16);
        let c = make(DescriptorType::StorageBuffer, 16);
        let d = make(DescriptorType::UniformBuffer, 32);

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_ne!(a.fingerprint(), d.fingerprint());
    }

    #[test]
    fn too_many_sets() {
        let device = test_device!();
        let set = set_layout(&device, []);

        let result = PipelineLayout::new(
            device,
            PipelineLayoutCreateInfo {
                set_layouts: vec![set; 5],
                ..Default::default()
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn layouts_outlive_their_users() {
        let device = test_device!();
        let set = set_layout(&device, [(0, DescriptorType::UniformBuffer, 1)]);
        let weak = Arc::downgrade(&set);

        let layout = PipelineLayout::new(
            device,
            PipelineLayoutCreateInfo {
                set_layouts: vec![set.clone(), set.clone()],
                ..Default::default()
            },
        )
        .unwrap();
        drop(set);

        assert_eq!(weak.strong_count(), 2);
        drop(layout);
        assert!(weak.upgrade().is_none());
    }
}

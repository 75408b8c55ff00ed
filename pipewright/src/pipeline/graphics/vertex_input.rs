//! Configures how data from vertex buffers is read into vertex shader input locations.
//!
//! The vertex input stage is the stage where data is read from a buffer and fed into the vertex
//! shader. After each invocation of the vertex shader, the pipeline then proceeds to the input
//! assembly stage.
//!
//! # Input locations and components
//!
//! Input data is assigned per shader input location. Locations are set by adding the `location`
//! layout qualifier to an input variable in GLSL. The native pipeline has no locations: each
//! attribute is bound by a semantic name and index instead. Every attribute is given the same
//! semantic name, and the index is the driver location the shader compiler assigned to the
//! input while linking.

use crate::{
    device::Device,
    format::{Format, FormatUsage, NativeFormat},
    image::ImageAspects,
    pipeline::shader::ShaderInterfaceEntry,
    ValidationError,
};
use foldhash::HashMap;

/// The semantic name given to every vertex attribute.
pub const VERTEX_ATTRIBUTE_SEMANTIC: &str = "TEXCOORD";

/// The maximum stride of a vertex binding, in bytes.
pub const MAX_VERTEX_INPUT_BINDING_STRIDE: u32 = 2048;

/// The state in a graphics pipeline describing how the vertex input stage should behave.
#[derive(Clone, Debug)]
pub struct VertexInputState {
    /// A description of the vertex buffers that the vertex input stage will read from.
    pub bindings: HashMap<u32, VertexInputBindingDescription>,

    /// Describes the mapping between elements in a vertex buffer and shader input locations.
    ///
    /// If two attributes target the same location, the first one is used.
    pub attributes: Vec<VertexInputAttributeDescription>,

    pub _ne: crate::NonExhaustive,
}

impl Default for VertexInputState {
    #[inline]
    fn default() -> Self {
        Self {
            bindings: HashMap::default(),
            attributes: Vec::new(),
            _ne: crate::NonExhaustive(()),
        }
    }
}

impl VertexInputState {
    /// Constructs a new `VertexInputState` with no bindings or attributes.
    #[inline]
    pub fn new() -> VertexInputState {
        Self::default()
    }

    /// Adds a single binding.
    #[inline]
    pub fn binding(mut self, binding: u32, description: VertexInputBindingDescription) -> Self {
        self.bindings.insert(binding, description);
        self
    }

    /// Adds a single attribute.
    #[inline]
    pub fn attribute(mut self, description: VertexInputAttributeDescription) -> Self {
        self.attributes.push(description);
        self
    }

    pub(crate) fn validate(&self, device: &Device) -> Result<(), Box<ValidationError>> {
        let Self {
            bindings,
            attributes,
            _ne: _,
        } = self;

        let properties = device.properties();

        if bindings.len() > properties.max_vertex_input_bindings as usize {
            return Err(Box::new(ValidationError {
                context: "bindings".into(),
                problem: "the length exceeds the `max_vertex_input_bindings` limit".into(),
                vuids: &[
                    "VUID-VkPipelineVertexInputStateCreateInfo-vertexBindingDescriptionCount-00613",
                ],
                ..Default::default()
            }));
        }

        for (&binding, binding_desc) in bindings {
            if binding >= properties.max_vertex_input_bindings {
                return Err(Box::new(ValidationError {
                    context: format!("bindings[{}]", binding).into(),
                    problem: "the binding exceeds the `max_vertex_input_bindings` limit".into(),
                    vuids: &["VUID-VkVertexInputBindingDescription-binding-00618"],
                    ..Default::default()
                }));
            }

            binding_desc
                .validate()
                .map_err(|err| err.add_context(format!("bindings[{}]", binding)))?;
        }

        if attributes.len() > properties.max_vertex_input_attributes as usize {
            return Err(Box::new(ValidationError {
                context: "attributes".into(),
                problem: "the length exceeds the `max_vertex_input_attributes` limit".into(),
                vuids: &[
                    "VUID-VkPipelineVertexInputStateCreateInfo-vertexAttributeDescriptionCount-00614",
                ],
                ..Default::default()
            }));
        }

        for (index, attribute_desc) in attributes.iter().enumerate() {
            attribute_desc
                .validate(device)
                .map_err(|err| err.add_context(format!("attributes[{}]", index)))?;

            if !bindings.contains_key(&attribute_desc.binding) {
                return Err(Box::new(ValidationError {
                    problem: format!(
                        "`attributes[{}].binding` is not present in `bindings`",
                        index
                    )
                    .into(),
                    vuids: &["VUID-VkPipelineVertexInputStateCreateInfo-binding-00615"],
                    ..Default::default()
                }));
            }
        }

        Ok(())
    }

    /// Returns the stride of each binding, indexed by binding number.
    pub(crate) fn strides(&self) -> Vec<u32> {
        let len = self.bindings.keys().map(|&b| b + 1).max().unwrap_or(0);
        let mut strides = vec![0; len as usize];

        for (&binding, desc) in &self.bindings {
            strides[binding as usize] = desc.stride;
        }

        strides
    }

    /// Builds the native input layout for the linked inputs of the vertex stage.
    ///
    /// Inputs without an attribute are left out.
    pub(crate) fn to_native(&self, vs_inputs: &[ShaderInterfaceEntry]) -> Vec<NativeInputElement> {
        let mut by_location: HashMap<u32, NativeInputElement> = HashMap::default();

        for attribute in &self.attributes {
            let Some(binding) = self.bindings.get(&attribute.binding) else {
                continue;
            };

            let (input_slot_class, instance_data_step_rate) = match binding.input_rate {
                VertexInputRate::Vertex => (NativeInputClassification::PerVertex, 0),
                VertexInputRate::Instance { divisor } => {
                    (NativeInputClassification::PerInstance, divisor.max(1))
                }
            };

            by_location
                .entry(attribute.location)
                .or_insert_with(|| NativeInputElement {
                    semantic_name: VERTEX_ATTRIBUTE_SEMANTIC,
                    semantic_index: 0,
                    format: attribute
                        .format
                        .native_format(FormatUsage::VertexBuffer, ImageAspects::COLOR),
                    input_slot: attribute.binding,
                    aligned_byte_offset: attribute.offset,
                    input_slot_class,
                    instance_data_step_rate,
                });
        }

        let mut elements = Vec::with_capacity(vs_inputs.len());

        for input in vs_inputs {
            match by_location.get(&input.location) {
                Some(element) => elements.push(NativeInputElement {
                    semantic_index: input.driver_location,
                    ..*element
                }),
                None => tracing::warn!(
                    location = input.location,
                    "vertex shader input has no vertex attribute",
                ),
            }
        }

        elements
    }
}

/// Describes a single vertex buffer binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VertexInputBindingDescription {
    /// The number of bytes from the start of one element in the vertex buffer to the start of
    /// the next element.
    pub stride: u32,

    /// How often the vertex input should advance to the next element.
    pub input_rate: VertexInputRate,
}

impl VertexInputBindingDescription {
    pub(crate) fn validate(&self) -> Result<(), Box<ValidationError>> {
        let &Self {
            stride,
            input_rate: _,
        } = self;

        if stride > MAX_VERTEX_INPUT_BINDING_STRIDE {
            return Err(Box::new(ValidationError {
                context: "stride".into(),
                problem: "exceeds the `max_vertex_input_binding_stride` limit".into(),
                vuids: &["VUID-VkVertexInputBindingDescription-stride-00619"],
                ..Default::default()
            }));
        }

        Ok(())
    }
}

/// Describes a single vertex buffer attribute mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VertexInputAttributeDescription {
    /// The shader input location that this attribute feeds.
    pub location: u32,

    /// The vertex buffer binding number that this attribute should take its data from.
    pub binding: u32,

    /// The size and type of the vertex data.
    pub format: Format,

    /// Number of bytes between the start of a vertex buffer element and the location of
    /// attribute.
    pub offset: u32,
}

impl VertexInputAttributeDescription {
    pub(crate) fn validate(&self, device: &Device) -> Result<(), Box<ValidationError>> {
        let &Self {
            location,
            binding: _,
            format,
            offset: _,
        } = self;

        if location >= device.properties().max_vertex_input_attributes {
            return Err(Box::new(ValidationError {
                context: "location".into(),
                problem: "exceeds the `max_vertex_input_attributes` limit".into(),
                vuids: &["VUID-VkVertexInputAttributeDescription-location-00620"],
                ..Default::default()
            }));
        }

        if format.native_format(FormatUsage::VertexBuffer, ImageAspects::COLOR)
            == NativeFormat::UNKNOWN
        {
            return Err(Box::new(ValidationError {
                context: "format".into(),
                problem: "the format can't be used as a vertex attribute".into(),
                vuids: &["VUID-VkVertexInputAttributeDescription-format-00623"],
                ..Default::default()
            }));
        }

        Ok(())
    }
}

/// How the vertex source should be unrolled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VertexInputRate {
    /// Each element of the source corresponds to a vertex.
    #[default]
    Vertex,

    /// Each element of the source corresponds to an instance.
    ///
    /// `divisor` indicates how many consecutive instances will use the same instance buffer data.
    /// A value of 0 is treated as 1.
    Instance { divisor: u32 },
}

/// Whether a native input element advances per vertex or per instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum NativeInputClassification {
    #[default]
    PerVertex = 0,
    PerInstance = 1,
}

/// One element of a native input layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NativeInputElement {
    pub semantic_name: &'static str,
    pub semantic_index: u32,
    pub format: NativeFormat,
    pub input_slot: u32,
    pub aligned_byte_offset: u32,
    pub input_slot_class: NativeInputClassification,
    pub instance_data_step_rate: u32,
}

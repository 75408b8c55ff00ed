//! Bindings between shaders and the resources they access.
//!
//! In order to access a buffer or an image from a shader, that buffer or image must be put in a
//! *descriptor*. Descriptors are grouped in *descriptor sets*, and the shape of a set is described
//! by a [`DescriptorSetLayout`](layout::DescriptorSetLayout). This crate doesn't write descriptor
//! sets, it computes where each binding of a set lives in memory: its byte offset within the set,
//! its slot in the dynamic-offset area, and where its immutable samplers are kept.
//!
//! Several set layouts, plus push constants, are combined into a
//! [`PipelineLayout`](crate::pipeline::layout::PipelineLayout), which assigns every binding a
//! native register.

pub mod layout;

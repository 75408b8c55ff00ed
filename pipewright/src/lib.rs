//! Hardware-independent core of a Vulkan driver for tiling GPUs and D3D12-style backends.
//!
//! # Brief summary
//!
//! - A [`Device`](crate::device::Device) wraps a [`Backend`](crate::backend::Backend), the
//!   embedder's implementation of job submission, shader compilation and native object creation.
//!   Everything in this crate that touches hardware goes through it.
//!
//! - [`Format`](crate::format::Format) answers capability questions: which hardware unit can read
//!   or write a format, under which encoding, and how images of that format are tiled in memory.
//!
//! - The [`Blitter`](crate::blit::Blitter) executes a copy or resample request through an ordered
//!   cascade of strategies. Each strategy claims the image aspects it can satisfy and leaves the
//!   rest for the next one.
//!
//! - [`GraphicsPipeline`](crate::pipeline::graphics::GraphicsPipeline) and
//!   [`ComputePipeline`](crate::pipeline::compute::ComputePipeline) translate a portable pipeline
//!   description into a [`PipelineStateStream`](crate::pipeline::stream::PipelineStateStream) of
//!   typed fragments, compile the shader stages and hand the stream to the backend.
//!
//! - [`DescriptorSetLayout`](crate::descriptor_set::layout::DescriptorSetLayout) and
//!   [`PipelineLayout`](crate::pipeline::layout::PipelineLayout) map portable resource bindings to
//!   byte offsets, dynamic-offset slots and native register assignments.
//!
//! # Debugging
//!
//! Logging goes through [`tracing`]. The `PIPEWRIGHT_DEBUG` environment variable enables extra
//! behavior, see [`DebugFlags`](crate::device::DebugFlags).

use std::{
    borrow::Cow,
    error::Error,
    fmt::{Debug, Display, Error as FmtError, Formatter},
};

#[macro_use]
mod tests;
mod macros;

pub mod backend;
pub mod blit;
mod cache;
pub mod descriptor_set;
pub mod device;
pub mod format;
pub mod image;
pub mod pipeline;
pub mod render_pass;
pub mod sampler;

/// A [`Result`] with a [`Validated`] error.
pub type ValidatedResult<T, E = VulkanError> = Result<T, Validated<E>>;

/// A wrapper for error types of functions that can return validation errors.
#[derive(Clone)]
pub enum Validated<E> {
    /// A non-validation error occurred.
    Error(E),

    /// A validation error occurred.
    ValidationError(Box<ValidationError>),
}

impl<E> Validated<E> {
    /// Maps the inner `Error` value using the provided function, or does nothing if the value is
    /// `ValidationError`.
    #[inline]
    pub fn map<F>(self, f: impl FnOnce(E) -> F) -> Validated<F> {
        match self {
            Self::Error(err) => Validated::Error(f(err)),
            Self::ValidationError(err) => Validated::ValidationError(err),
        }
    }

    /// Returns the inner `Error` value, or panics if it contains `ValidationError`.
    #[inline(always)]
    #[track_caller]
    pub fn unwrap(self) -> E {
        match self {
            Self::Error(err) => err,
            Self::ValidationError(err) => {
                panic!(
                    "called `Validated::unwrap` on a `ValidationError` value: {:?}",
                    err
                )
            }
        }
    }

    /// Returns whether `self` holds the given non-validation error.
    #[inline]
    pub fn is_error(&self, other: &E) -> bool
    where
        E: PartialEq,
    {
        matches!(self, Self::Error(err) if err == other)
    }
}

impl<E> Error for Validated<E>
where
    E: Error + 'static,
{
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Error(err) => Some(err),
            Self::ValidationError(err) => Some(err),
        }
    }
}

impl<E> Display for Validated<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::Error(_) => write!(f, "a non-validation error occurred"),
            Self::ValidationError(_) => write!(f, "a validation error occurred"),
        }
    }
}

impl<E> Debug for Validated<E>
where
    E: Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::Error(err) => write!(f, "a non-validation error occurred: {}", err),
            Self::ValidationError(err) => {
                write!(f, "a validation error occurred\n\nCaused by:\n    {:?}", err)
            }
        }
    }
}

impl<E> From<Box<ValidationError>> for Validated<E> {
    #[inline]
    fn from(err: Box<ValidationError>) -> Self {
        Self::ValidationError(err)
    }
}

impl From<VulkanError> for Validated<VulkanError> {
    #[inline]
    fn from(err: VulkanError) -> Self {
        Self::Error(err)
    }
}

/// The arguments or other context of a call to a function were invalid.
#[derive(Clone, Default)]
pub struct ValidationError {
    /// The context in which the problem exists (e.g. a specific parameter).
    pub context: Cow<'static, str>,

    /// A description of the problem.
    pub problem: Cow<'static, str>,

    /// Identifiers of the Vulkan valid usage rules that were violated, if any.
    pub vuids: &'static [&'static str],
}

impl ValidationError {
    fn prepend_context(&mut self, prefix: &str) {
        if self.context.is_empty() {
            self.context = prefix.to_owned().into();
        } else {
            self.context = format!("{}.{}", prefix, self.context).into();
        }
    }

    pub(crate) fn add_context(
        mut self: Box<Self>,
        context: impl Into<Cow<'static, str>>,
    ) -> Box<Self> {
        self.prepend_context(&context.into());
        self
    }

    pub(crate) fn set_vuids(mut self: Box<Self>, vuids: &'static [&'static str]) -> Box<Self> {
        self.vuids = vuids;
        self
    }
}

impl Debug for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        if self.context.is_empty() {
            write!(f, "{}", self.problem)?;
        } else {
            write!(f, "{}: {}", self.context, self.problem)?;
        }

        if !self.vuids.is_empty() {
            write!(f, "\n\nVulkan VUIDs:")?;

            for vuid in self.vuids {
                write!(f, "\n    {}", vuid)?;
            }
        }

        Ok(())
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        if self.context.is_empty() {
            write!(f, "{}", self.problem)
        } else {
            write!(f, "{}: {}", self.context, self.problem)
        }
    }
}

impl Error for ValidationError {}

/// An error that happened while the backend carried out an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum VulkanError {
    /// A host memory allocation has failed.
    OutOfHostMemory,

    /// A device memory allocation has failed.
    OutOfDeviceMemory,

    /// Initialization of an object could not be completed for implementation-specific reasons.
    InitializationFailed,

    /// The device has been lost.
    DeviceLost,

    /// One or more shaders failed to compile or to pass validation.
    InvalidShader,

    /// The pipeline could not be created without compiling it, and the caller asked not to.
    PipelineCompileRequired,

    /// A result code without a dedicated variant.
    Unnamed(ash::vk::Result),
}

impl VulkanError {
    /// Returns whether the error belongs to the resource exhaustion class.
    #[inline]
    pub fn is_out_of_memory(self) -> bool {
        matches!(self, Self::OutOfHostMemory | Self::OutOfDeviceMemory)
    }
}

impl Error for VulkanError {}

impl Display for VulkanError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::OutOfHostMemory => write!(f, "a host memory allocation has failed"),
            Self::OutOfDeviceMemory => write!(f, "a device memory allocation has failed"),
            Self::InitializationFailed => write!(
                f,
                "initialization of an object could not be completed for \
                implementation-specific reasons",
            ),
            Self::DeviceLost => write!(f, "the device has been lost"),
            Self::InvalidShader => {
                write!(f, "one or more shaders failed to compile or to validate")
            }
            Self::PipelineCompileRequired => write!(
                f,
                "the pipeline requires compilation, but the caller asked not to compile it",
            ),
            Self::Unnamed(result) => {
                write!(f, "unnamed error, VkResult value {}", result.as_raw())
            }
        }
    }
}

impl From<ash::vk::Result> for VulkanError {
    fn from(val: ash::vk::Result) -> VulkanError {
        match val {
            ash::vk::Result::ERROR_OUT_OF_HOST_MEMORY => Self::OutOfHostMemory,
            ash::vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => Self::OutOfDeviceMemory,
            ash::vk::Result::ERROR_INITIALIZATION_FAILED => Self::InitializationFailed,
            ash::vk::Result::ERROR_DEVICE_LOST => Self::DeviceLost,
            ash::vk::Result::ERROR_INVALID_SHADER_NV => Self::InvalidShader,
            ash::vk::Result::PIPELINE_COMPILE_REQUIRED => Self::PipelineCompileRequired,
            _ => Self::Unnamed(val),
        }
    }
}

impl From<VulkanError> for ash::vk::Result {
    fn from(val: VulkanError) -> ash::vk::Result {
        match val {
            VulkanError::OutOfHostMemory => Self::ERROR_OUT_OF_HOST_MEMORY,
            VulkanError::OutOfDeviceMemory => Self::ERROR_OUT_OF_DEVICE_MEMORY,
            VulkanError::InitializationFailed => Self::ERROR_INITIALIZATION_FAILED,
            VulkanError::DeviceLost => Self::ERROR_DEVICE_LOST,
            VulkanError::InvalidShader => Self::ERROR_INVALID_SHADER_NV,
            VulkanError::PipelineCompileRequired => Self::PIPELINE_COMPILE_REQUIRED,
            VulkanError::Unnamed(result) => result,
        }
    }
}

/// A helper type for non-exhaustive structs.
///
/// This type cannot be constructed outside this crate. Structures with a field of this type can
/// only be constructed by calling a constructor function or `Default::default()`. The effect is
/// similar to the standard Rust `#[non_exhaustive]` attribute, except that it does not prevent
/// update syntax from being used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NonExhaustive(pub(crate) ());

#[cfg(test)]
mod error_tests {
    use super::{Validated, ValidationError, VulkanError};

    #[test]
    fn context_is_prepended() {
        let err = Box::new(ValidationError {
            context: "stencil".into(),
            problem: "is invalid".into(),
            ..Default::default()
        })
        .add_context("depth_stencil_state")
        .add_context("create_info");

        assert_eq!(err.context, "create_info.depth_stencil_state.stencil");
        assert_eq!(
            err.to_string(),
            "create_info.depth_stencil_state.stencil: is invalid"
        );
    }

    #[test]
    fn vk_result_round_trip() {
        let err = VulkanError::from(ash::vk::Result::PIPELINE_COMPILE_REQUIRED);
        assert_eq!(err, VulkanError::PipelineCompileRequired);
        assert_eq!(
            ash::vk::Result::from(err),
            ash::vk::Result::PIPELINE_COMPILE_REQUIRED
        );

        let unnamed = VulkanError::from(ash::vk::Result::ERROR_FRAGMENTED_POOL);
        assert_eq!(
            unnamed,
            VulkanError::Unnamed(ash::vk::Result::ERROR_FRAGMENTED_POOL)
        );
    }

    #[test]
    fn validated_helpers() {
        let err: Validated<VulkanError> = VulkanError::OutOfHostMemory.into();
        assert!(err.is_error(&VulkanError::OutOfHostMemory));
        assert!(VulkanError::OutOfDeviceMemory.is_out_of_memory());
        assert!(!VulkanError::InvalidShader.is_out_of_memory());
    }
}

//! The logical device that every other object is created from.
//!
//! A `Device` does not talk to hardware itself. It holds the [`Backend`] supplied by the embedder,
//! the hardware generation it drives, its limits and the debug flags. Objects created from it keep
//! an `Arc<Device>` so that the backend outlives them.

use crate::{backend::Backend, image::Image, ValidationError};
use std::{
    fmt::{Debug, Error as FmtError, Formatter},
    num::NonZero,
    sync::Arc,
};

/// Name of the environment variable read by [`DebugFlags::from_env`].
pub const DEBUG_ENV_VAR: &str = "PIPEWRIGHT_DEBUG";

/// Represents a logical device driving one GPU through a [`Backend`].
pub struct Device {
    id: NonZero<u64>,
    backend: Arc<dyn Backend>,
    properties: DeviceProperties,
    debug_flags: DebugFlags,
}

impl Device {
    /// Creates a new `Device` on top of `backend`.
    pub fn new(
        backend: Arc<dyn Backend>,
        create_info: DeviceCreateInfo,
    ) -> Result<Arc<Device>, Box<ValidationError>> {
        create_info
            .validate()
            .map_err(|err| err.add_context("create_info"))?;

        Ok(Self::new_unchecked(backend, create_info))
    }

    fn new_unchecked(backend: Arc<dyn Backend>, create_info: DeviceCreateInfo) -> Arc<Device> {
        let DeviceCreateInfo {
            generation,
            debug_flags,
            _ne: _,
        } = create_info;

        tracing::debug!(generation, ?debug_flags, "creating device");

        Arc::new(Device {
            id: Self::next_id(),
            backend,
            properties: DeviceProperties {
                generation,
                ..DeviceProperties::default()
            },
            debug_flags,
        })
    }

    /// Returns the backend that carries out the device's work.
    #[inline]
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Returns the properties and limits of the device.
    #[inline]
    pub fn properties(&self) -> &DeviceProperties {
        &self.properties
    }

    /// Returns the hardware generation, as `major * 10 + minor`.
    #[inline]
    pub fn generation(&self) -> u32 {
        self.properties.generation
    }

    /// Returns the debug flags the device was created with.
    #[inline]
    pub fn debug_flags(&self) -> DebugFlags {
        self.debug_flags
    }

    /// Submits every queued job that writes `image` so later work observes its results.
    ///
    /// This is a synchronous barrier towards the submission queue, not a wait for completion.
    #[inline]
    pub fn flush_jobs_writing(&self, image: &Image) {
        tracing::trace!(image = image.id(), "flushing writers");
        self.backend.flush_jobs_writing(image.handle());

        if let Some(stencil) = image.separate_stencil() {
            self.backend.flush_jobs_writing(stencil.handle());
        }
    }

    /// Submits every queued job that reads `image` so that it can be overwritten.
    #[inline]
    pub fn flush_jobs_reading(&self, image: &Image) {
        tracing::trace!(image = image.id(), "flushing readers");
        self.backend.flush_jobs_reading(image.handle());

        if let Some(stencil) = image.separate_stencil() {
            self.backend.flush_jobs_reading(stencil.handle());
        }
    }
}

impl Debug for Device {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("properties", &self.properties)
            .field("debug_flags", &self.debug_flags)
            .finish_non_exhaustive()
    }
}

crate::macros::impl_id_counter!(Device);

/// Parameters to create a new `Device`.
#[derive(Clone, Debug)]
pub struct DeviceCreateInfo {
    /// The hardware generation, as `major * 10 + minor` (33 for 3.3, 42 for 4.2, ...).
    ///
    /// The default value is `42`.
    pub generation: u32,

    /// Debug behaviour to enable.
    ///
    /// The default value is read from the `PIPEWRIGHT_DEBUG` environment variable.
    pub debug_flags: DebugFlags,

    pub _ne: crate::NonExhaustive,
}

impl Default for DeviceCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            generation: 42,
            debug_flags: DebugFlags::from_env(),
            _ne: crate::NonExhaustive(()),
        }
    }
}

impl DeviceCreateInfo {
    pub(crate) fn validate(&self) -> Result<(), Box<ValidationError>> {
        let &Self {
            generation,
            debug_flags: _,
            _ne: _,
        } = self;

        if !(30..100).contains(&generation) {
            return Err(Box::new(ValidationError {
                context: "generation".into(),
                problem: "is not a known hardware generation".into(),
                ..Default::default()
            }));
        }

        Ok(())
    }
}

/// Properties and limits of a [`Device`].
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct DeviceProperties {
    /// The hardware generation, as `major * 10 + minor`.
    pub generation: u32,

    /// The maximum number of vertex buffer bindings.
    pub max_vertex_input_bindings: u32,

    /// The maximum number of vertex attributes.
    pub max_vertex_input_attributes: u32,

    /// The maximum number of input registers of a vertex shader.
    pub max_vertex_shader_inputs: u32,

    /// The maximum number of color attachments of a subpass.
    pub max_color_attachments: u32,

    /// The maximum number of descriptor sets in a pipeline layout.
    pub max_bound_descriptor_sets: u32,

    /// The maximum size in bytes of the push constants of a pipeline layout.
    pub max_push_constants_size: u32,
}

impl Default for DeviceProperties {
    #[inline]
    fn default() -> Self {
        Self {
            generation: 42,
            max_vertex_input_bindings: 32,
            max_vertex_input_attributes: 32,
            max_vertex_shader_inputs: 32,
            max_color_attachments: 8,
            max_bound_descriptor_sets: crate::pipeline::layout::MAX_SETS as u32,
            max_push_constants_size: 128,
        }
    }
}

/// Debug behaviour that can be switched on at device creation.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DebugFlags(u32);

impl DebugFlags {
    /// Use double-buffered tile jobs where multisampling doesn't prevent it.
    pub const DOUBLE_BUFFER: Self = Self(1 << 0);

    /// Log the shader IR of every stage before compiling it.
    pub const IR: Self = Self(1 << 1);

    /// Log the disassembly of every compiled shader.
    pub const NATIVE: Self = Self(1 << 2);

    const NAMES: [(&'static str, DebugFlags); 3] = [
        ("double_buffer", Self::DOUBLE_BUFFER),
        ("ir", Self::IR),
        ("native", Self::NATIVE),
    ];

    /// Returns a `DebugFlags` with none of the flags set.
    #[inline]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Returns whether all flags in `other` are set in `self`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the union of `self` and `other`.
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Parses a comma-separated list of flag names. Unknown names are skipped with a warning.
    pub fn parse(value: &str) -> Self {
        let mut flags = Self::empty();

        for name in value.split(',').map(str::trim).filter(|name| !name.is_empty()) {
            match Self::NAMES.iter().find(|(known, _)| known.eq_ignore_ascii_case(name)) {
                Some(&(_, flag)) => flags = flags.union(flag),
                None => tracing::warn!(name, "ignoring unknown debug flag"),
            }
        }

        flags
    }

    /// Reads the flags from the `PIPEWRIGHT_DEBUG` environment variable.
    pub fn from_env() -> Self {
        std::env::var(DEBUG_ENV_VAR)
            .map(|value| Self::parse(&value))
            .unwrap_or_default()
    }
}

impl Debug for DebugFlags {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        let mut list = f.debug_set();

        for (name, flag) in Self::NAMES {
            if self.contains(flag) {
                list.entry(&format_args!("{}", name));
            }
        }

        list.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{DebugFlags, Device, DeviceCreateInfo};
    use crate::tests::RecordingBackend;
    use std::sync::Arc;

    #[test]
    fn parse_debug_flags() {
        let flags = DebugFlags::parse("ir, NATIVE,,bogus");
        assert!(flags.contains(DebugFlags::IR));
        assert!(flags.contains(DebugFlags::NATIVE));
        assert!(!flags.contains(DebugFlags::DOUBLE_BUFFER));
        assert_eq!(DebugFlags::parse(""), DebugFlags::empty());
    }

    #[test]
    fn rejects_unknown_generation() {
        let backend = Arc::new(RecordingBackend::default());

        match Device::new(
            backend,
            DeviceCreateInfo {
                generation: 7,
                ..Default::default()
            },
        ) {
            Err(err) => assert_eq!(err.context, "create_info.generation"),
            Ok(_) => panic!("a device was created for generation 7"),
        }
    }

    #[test]
    fn ids_are_unique() {
        let a = test_device!();
        let b = test_device!(generation: 33);
        assert_ne!(a.id(), b.id());
        assert_eq!(b.generation(), 33);
        assert_eq!(a.properties().max_bound_descriptor_sets, 4);
    }
}

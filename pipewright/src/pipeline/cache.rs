//! Cache the pipeline objects to disk for faster reloads.
//!
//! A pipeline cache lets the driver skip shader compilation when it has already compiled the same
//! pipeline. This driver compiles every pipeline from scratch: the cache accepts any data and
//! never hits, and pipelines created with
//! [`FAIL_ON_PIPELINE_COMPILE_REQUIRED`](crate::pipeline::PipelineCreateFlags::FAIL_ON_PIPELINE_COMPILE_REQUIRED)
//! always fail with [`PipelineCompileRequired`](crate::VulkanError::PipelineCompileRequired).

use crate::{device::Device, macros::impl_id_counter};
use std::{num::NonZero, sync::Arc};

/// Opaque cache that contains pipeline objects.
#[derive(Debug)]
pub struct PipelineCache {
    device: Arc<Device>,
    id: NonZero<u64>,
}

impl PipelineCache {
    /// Builds a new pipeline cache. `initial_data` is accepted and ignored.
    #[inline]
    pub fn new(device: Arc<Device>, create_info: PipelineCacheCreateInfo) -> Arc<PipelineCache> {
        tracing::trace!(
            initial_data = create_info.initial_data.len(),
            "creating pipeline cache",
        );

        Arc::new(PipelineCache {
            device,
            id: Self::next_id(),
        })
    }

    /// Returns the device that owns `self`.
    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Returns whether the cache holds the pipeline with the given fingerprint, which is never.
    #[inline]
    pub fn contains(&self, fingerprint: u64) -> bool {
        let _ = fingerprint;
        false
    }

    /// Obtains the data from the cache, which is always empty.
    #[inline]
    pub fn get_data(&self) -> Vec<u8> {
        Vec::new()
    }
}

impl_id_counter!(PipelineCache);

/// Parameters to create a new `PipelineCache`.
#[derive(Clone, Debug)]
pub struct PipelineCacheCreateInfo {
    /// The initial data to provide to the cache.
    ///
    /// The default value is empty.
    pub initial_data: Vec<u8>,

    pub _ne: crate::NonExhaustive,
}

impl Default for PipelineCacheCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            initial_data: Vec::new(),
            _ne: crate::NonExhaustive(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PipelineCache, PipelineCacheCreateInfo};

    #[test]
    fn never_hits() {
        let device = test_device!();
        let cache = PipelineCache::new(
            device,
            PipelineCacheCreateInfo {
                initial_data: vec![1, 2, 3, 4],
                ..Default::default()
            },
        );

        assert!(!cache.contains(0));
        assert!(cache.get_data().is_empty());
    }
}

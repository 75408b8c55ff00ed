//! How image data is read by shaders.
//!
//! Samplers in this driver have no backend object of their own. A sampler is translated once to a
//! [`NativeSamplerDesc`], which is either written into a descriptor or, for immutable samplers,
//! baked into the root signature of a pipeline layout.

use crate::{
    device::Device,
    macros::vulkan_enum,
    pipeline::graphics::depth_stencil::{CompareOp, NativeComparisonFunc},
    ValidationError,
};
use std::{
    hash::{Hash, Hasher},
    num::NonZero,
    sync::Arc,
};

/// Native filter value for anisotropic filtering.
pub const NATIVE_FILTER_ANISOTROPIC: u32 = 0x55;

/// Bit added to a native filter value when the sampler compares against a reference.
pub const NATIVE_FILTER_COMPARISON: u32 = 0x80;

/// Describes how to retrieve data from a sampled image within a shader.
#[derive(Debug)]
pub struct Sampler {
    device: Arc<Device>,
    id: NonZero<u64>,

    mag_filter: Filter,
    min_filter: Filter,
    mipmap_mode: SamplerMipmapMode,
    address_mode: [SamplerAddressMode; 3],
    mip_lod_bias: f32,
    anisotropy: Option<f32>,
    compare: Option<CompareOp>,
    lod: [f32; 2],
}

impl Sampler {
    /// Creates a new `Sampler`.
    pub fn new(
        device: Arc<Device>,
        create_info: SamplerCreateInfo,
    ) -> Result<Arc<Sampler>, Box<ValidationError>> {
        create_info
            .validate()
            .map_err(|err| err.add_context("create_info"))?;

        let SamplerCreateInfo {
            mag_filter,
            min_filter,
            mipmap_mode,
            address_mode,
            mip_lod_bias,
            anisotropy,
            compare,
            lod,
            _ne: _,
        } = create_info;

        Ok(Arc::new(Sampler {
            device,
            id: Self::next_id(),
            mag_filter,
            min_filter,
            mipmap_mode,
            address_mode,
            mip_lod_bias,
            anisotropy,
            compare,
            lod,
        }))
    }

    /// Returns the device that the sampler was created with.
    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Returns the magnification filter.
    #[inline]
    pub fn mag_filter(&self) -> Filter {
        self.mag_filter
    }

    /// Returns the minification filter.
    #[inline]
    pub fn min_filter(&self) -> Filter {
        self.min_filter
    }

    /// Returns the mipmap mode.
    #[inline]
    pub fn mipmap_mode(&self) -> SamplerMipmapMode {
        self.mipmap_mode
    }

    /// Returns the compare operation, if the sampler compares against a reference value.
    #[inline]
    pub fn compare(&self) -> Option<CompareOp> {
        self.compare
    }

    /// Returns the native filter value: point or linear per minification, magnification and
    /// mipmapping, or anisotropic, plus the comparison bit.
    pub fn native_filter(&self) -> u32 {
        let filter = if self.anisotropy.is_some() {
            NATIVE_FILTER_ANISOTROPIC
        } else {
            ((self.min_filter == Filter::Linear) as u32) << 4
                | ((self.mag_filter == Filter::Linear) as u32) << 2
                | (self.mipmap_mode == SamplerMipmapMode::Linear) as u32
        };

        if self.compare.is_some() {
            filter + NATIVE_FILTER_COMPARISON
        } else {
            filter
        }
    }

    /// Returns the native description of the sampler.
    pub fn to_native(&self) -> NativeSamplerDesc {
        NativeSamplerDesc {
            filter: self.native_filter(),
            address: self.address_mode.map(SamplerAddressMode::to_native),
            mip_lod_bias: self.mip_lod_bias,
            max_anisotropy: self.anisotropy.map_or(0, |max| max as u32),
            comparison_func: self
                .compare
                .map_or(NativeComparisonFunc::Never, CompareOp::to_native),
            min_lod: self.lod[0],
            max_lod: self.lod[1],
        }
    }

    /// Feeds the sampling state (not the identity) of the sampler into `state`.
    pub(crate) fn hash_state<H: Hasher>(&self, state: &mut H) {
        self.mag_filter.hash(state);
        self.min_filter.hash(state);
        self.mipmap_mode.hash(state);
        self.address_mode.hash(state);
        self.mip_lod_bias.to_bits().hash(state);
        self.anisotropy.map(f32::to_bits).hash(state);
        self.compare.hash(state);
        self.lod.map(f32::to_bits).hash(state);
    }
}

crate::macros::impl_id_counter!(Sampler);

/// Parameters to create a new `Sampler`.
#[derive(Clone, Debug)]
pub struct SamplerCreateInfo {
    /// The default value is [`Filter::Nearest`].
    pub mag_filter: Filter,

    /// The default value is [`Filter::Nearest`].
    pub min_filter: Filter,

    /// The default value is [`SamplerMipmapMode::Nearest`].
    pub mipmap_mode: SamplerMipmapMode,

    /// How out-of-range coordinates are handled, for each of the three coordinates.
    ///
    /// The default value is [`SamplerAddressMode::ClampToEdge`] for all three.
    pub address_mode: [SamplerAddressMode; 3],

    /// The default value is `0.0`.
    pub mip_lod_bias: f32,

    /// If set, anisotropic filtering is used with the given maximum anisotropy. This overrides
    /// the three filters.
    ///
    /// The default value is `None`.
    pub anisotropy: Option<f32>,

    /// If set, the sampler compares the sampled value against a reference.
    ///
    /// The default value is `None`.
    pub compare: Option<CompareOp>,

    /// The range of LOD values that are sampled.
    ///
    /// The default value is `0.0..=1000.0`, stored as `[0.0, 1000.0]`.
    pub lod: [f32; 2],

    pub _ne: crate::NonExhaustive,
}

impl Default for SamplerCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            mag_filter: Filter::Nearest,
            min_filter: Filter::Nearest,
            mipmap_mode: SamplerMipmapMode::Nearest,
            address_mode: [SamplerAddressMode::ClampToEdge; 3],
            mip_lod_bias: 0.0,
            anisotropy: None,
            compare: None,
            lod: [0.0, 1000.0],
            _ne: crate::NonExhaustive(()),
        }
    }
}

impl SamplerCreateInfo {
    /// Returns a `SamplerCreateInfo` with linear filtering everywhere.
    #[inline]
    pub fn simple_repeat_linear() -> Self {
        Self {
            mag_filter: Filter::Linear,
            min_filter: Filter::Linear,
            mipmap_mode: SamplerMipmapMode::Linear,
            address_mode: [SamplerAddressMode::Repeat; 3],
            ..Default::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Box<ValidationError>> {
        let &Self {
            anisotropy, lod, ..
        } = self;

        if let Some(max_anisotropy) = anisotropy {
            if !(1.0..=16.0).contains(&max_anisotropy) {
                return Err(Box::new(ValidationError {
                    context: "anisotropy".into(),
                    problem: "is not between 1.0 and 16.0 inclusive".into(),
                    vuids: &["VUID-VkSamplerCreateInfo-anisotropyEnable-01071"],
                    ..Default::default()
                }));
            }
        }

        if lod[0] > lod[1] {
            return Err(Box::new(ValidationError {
                context: "lod".into(),
                problem: "the minimum is greater than the maximum".into(),
                vuids: &["VUID-VkSamplerCreateInfo-maxLod-01973"],
                ..Default::default()
            }));
        }

        Ok(())
    }
}

/// The native description of a sampler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NativeSamplerDesc {
    pub filter: u32,
    pub address: [u32; 3],
    pub mip_lod_bias: f32,
    pub max_anisotropy: u32,
    pub comparison_func: NativeComparisonFunc,
    pub min_lod: f32,
    pub max_lod: f32,
}

vulkan_enum! {
    #[non_exhaustive]

    /// Describes how the color of each pixel should be determined.
    Filter = Filter(i32);

    /// The pixel whose center is nearest to the requested coordinates is taken from the source
    /// and its value is returned as-is.
    Nearest = NEAREST,

    /// The 8/4/2 pixels (depending on view dimensionality) whose center surround the requested
    /// coordinates are taken, then their values are combined according to the proximity of their
    /// centers.
    Linear = LINEAR,
}

vulkan_enum! {
    #[non_exhaustive]

    /// Describes which mipmap from the source to use.
    SamplerMipmapMode = SamplerMipmapMode(i32);

    /// Use the mipmap whose dimensions are the nearest to the dimensions of the destination.
    Nearest = NEAREST,

    /// Take the mipmap whose dimensions are no greater than that of the destination together
    /// with the next higher level mipmap, calculate the value for both, and interpolate them.
    Linear = LINEAR,
}

vulkan_enum! {
    #[non_exhaustive]

    /// How the sampler should behave when it needs to access a pixel that is out of range of the
    /// texture.
    SamplerAddressMode = SamplerAddressMode(i32);

    /// Repeat the texture.
    Repeat = REPEAT,

    /// Repeat the texture but mirror it at every repetition.
    MirroredRepeat = MIRRORED_REPEAT,

    /// The coordinates are clamped to the valid range.
    ClampToEdge = CLAMP_TO_EDGE,

    /// Any pixel out of range is colored using the border color.
    ClampToBorder = CLAMP_TO_BORDER,
}

impl SamplerAddressMode {
    fn to_native(self) -> u32 {
        match self {
            Self::Repeat => 1,
            Self::MirroredRepeat => 2,
            Self::ClampToEdge => 3,
            Self::ClampToBorder => 4,
        }
    }
}

//! Multisampling.
//!
//! Multisampling allows you to ask the GPU to run the rasterizer to generate more than one
//! sample per pixel.
//!
//! For example, if `rasterization_samples` is 1 then the fragment shader, depth test and stencil
//! test will be run once for each pixel. However if `rasterization_samples` is `n`, then the
//! GPU will pick `n` different locations within each pixel and assign to each of these locations
//! a different depth value. The depth and stencil test will then be run `n` times.
//!
//! In addition to this, the `sample_shading` parameter is the proportion (between 0.0 and 1.0) of
//! the samples that will be run through the fragment shader. Any value above zero runs the
//! fragment shader once per sample on this driver.

use crate::{image::SampleCount, ValidationError};

/// State of the multisampling.
#[derive(Clone, Debug)]
pub struct MultisampleState {
    /// The number of rasterization samples to take per pixel. The GPU will pick this many
    /// different locations within each pixel and assign to each of these locations a different
    /// depth value. The depth and stencil test will then be run `rasterization_samples` times.
    ///
    /// The default value is [`SampleCount::Sample1`].
    pub rasterization_samples: SampleCount,

    /// Controls the proportion (between 0.0 and 1.0) of the samples that will be run through the
    /// fragment shader.
    ///
    /// If the value is `None`, then the fragment shader is run once per pixel. Otherwise it is
    /// run once per sample.
    ///
    /// The default value is `None`.
    pub sample_shading: Option<f32>,

    /// A mask of bits that is ANDed with the coverage mask of each set of `rasterization_samples`
    /// samples.
    ///
    /// If set to `None`, no mask is applied.
    ///
    /// The default value is `None`.
    pub sample_mask: Option<u32>,

    /// Controls whether the alpha value of the fragment will be used in an implementation-defined
    /// way to determine which samples get disabled or not.
    ///
    /// The default value is `false`.
    pub alpha_to_coverage_enable: bool,

    /// Controls whether the alpha value of all the samples will be forced to 1.0 (or the
    /// maximum possible value) after the effects of `alpha_to_coverage` have been applied.
    ///
    /// The default value is `false`.
    pub alpha_to_one_enable: bool,

    pub _ne: crate::NonExhaustive,
}

impl Default for MultisampleState {
    #[inline]
    fn default() -> Self {
        Self {
            rasterization_samples: SampleCount::Sample1,
            sample_shading: None,
            sample_mask: None,
            alpha_to_coverage_enable: false,
            alpha_to_one_enable: false,
            _ne: crate::NonExhaustive(()),
        }
    }
}

impl MultisampleState {
    pub(crate) fn validate(&self) -> Result<(), Box<ValidationError>> {
        let &Self {
            rasterization_samples: _,
            sample_shading,
            sample_mask: _,
            alpha_to_coverage_enable: _,
            alpha_to_one_enable,
            _ne: _,
        } = self;

        if let Some(min_sample_shading) = sample_shading {
            if !(0.0..=1.0).contains(&min_sample_shading) {
                return Err(Box::new(ValidationError {
                    context: "sample_shading".into(),
                    problem: "is not between 0.0 and 1.0 inclusive".into(),
                    vuids: &["VUID-VkPipelineMultisampleStateCreateInfo-minSampleShading-00786"],
                    ..Default::default()
                }));
            }
        }

        if alpha_to_one_enable {
            return Err(Box::new(ValidationError {
                context: "alpha_to_one_enable".into(),
                problem: "is `true`, but the device does not support it".into(),
                vuids: &["VUID-VkPipelineMultisampleStateCreateInfo-alphaToOneEnable-00785"],
                ..Default::default()
            }));
        }

        Ok(())
    }

    /// Returns the native sample description.
    #[inline]
    pub(crate) fn sample_desc(&self) -> NativeSampleDesc {
        NativeSampleDesc {
            count: self.rasterization_samples as u32,
            quality: 0,
        }
    }
}

/// The native sample count and quality of a pipeline's attachments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NativeSampleDesc {
    pub count: u32,
    pub quality: u32,
}

impl Default for NativeSampleDesc {
    #[inline]
    fn default() -> Self {
        Self {
            count: 1,
            quality: 0,
        }
    }
}

//! Configure the part of the framebuffer that primitives are drawn into.
//!
//! There are two different concepts to determine where things will be drawn:
//!
//! - The viewport is the region of the image which corresponds to the vertex coordinates `-1.0`
//!   to `1.0`.
//! - Any pixel outside of the scissor box will be discarded.
//!
//! The native viewport can't have a negative height or a depth range going backwards. Those are
//! flipped back here, and the vertex shader undoes the flip, see
//! [`YzFlip`](crate::pipeline::shader::YzFlip).

use crate::ValidationError;
use smallvec::SmallVec;
use std::ops::RangeInclusive;

/// The maximum number of viewports and scissors of a pipeline.
pub const MAX_VIEWPORTS: usize = 16;

/// List of viewports and scissors that are used when rendering.
#[derive(Clone, Debug)]
pub struct ViewportState {
    /// Specifies the viewport transforms.
    ///
    /// If [`DynamicState::Viewport`](crate::pipeline::DynamicState) is used, the values of each
    /// viewport are ignored, and only the number of viewports matters.
    ///
    /// The default value is a single element of `Viewport::default()`.
    pub viewports: SmallVec<[Viewport; 1]>,

    /// Specifies the scissor rectangles.
    ///
    /// If [`DynamicState::Scissor`](crate::pipeline::DynamicState) is used, the values of each
    /// scissor are ignored, and only the number of scissors matters.
    ///
    /// The default value is a single element of `Scissor::default()`.
    pub scissors: SmallVec<[Scissor; 1]>,

    pub _ne: crate::NonExhaustive,
}

impl Default for ViewportState {
    #[inline]
    fn default() -> Self {
        Self {
            viewports: SmallVec::from_buf([Viewport::default()]),
            scissors: SmallVec::from_buf([Scissor::default()]),
            _ne: crate::NonExhaustive(()),
        }
    }
}

impl ViewportState {
    pub(crate) fn validate(&self) -> Result<(), Box<ValidationError>> {
        let Self {
            viewports,
            scissors,
            _ne: _,
        } = self;

        if viewports.len() > MAX_VIEWPORTS {
            return Err(Box::new(ValidationError {
                context: "viewports".into(),
                problem: "the length exceeds the `max_viewports` limit".into(),
                vuids: &["VUID-VkPipelineViewportStateCreateInfo-viewportCount-01218"],
                ..Default::default()
            }));
        }

        if scissors.len() != viewports.len() {
            return Err(Box::new(ValidationError {
                problem: "the length of `viewports` does not equal the length of `scissors`"
                    .into(),
                vuids: &["VUID-VkPipelineViewportStateCreateInfo-scissorCount-04134"],
                ..Default::default()
            }));
        }

        for (index, viewport) in viewports.iter().enumerate() {
            viewport
                .validate()
                .map_err(|err| err.add_context(format!("viewports[{}]", index)))?;
        }

        Ok(())
    }
}

/// A viewport, the region of the framebuffer that the normalized device coordinates map to.
///
/// The height can be negative to flip the image vertically, and the depth range can go
/// backwards.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    /// Coordinates in pixels of the top-left hand corner of the viewport.
    ///
    /// The default value is `[0.0; 2]`.
    pub offset: [f32; 2],

    /// Dimensions in pixels of the viewport.
    ///
    /// The default value is `[1.0; 2]`.
    pub extent: [f32; 2],

    /// Minimum and maximum values of the depth.
    ///
    /// The default value is `0.0..=1.0`.
    pub depth_range: RangeInclusive<f32>,
}

impl Default for Viewport {
    #[inline]
    fn default() -> Self {
        Self {
            offset: [0.0; 2],
            extent: [1.0; 2],
            depth_range: 0.0..=1.0,
        }
    }
}

impl Viewport {
    pub(crate) fn validate(&self) -> Result<(), Box<ValidationError>> {
        let &Self {
            offset: _,
            extent,
            ref depth_range,
        } = self;

        if extent[0] <= 0.0 {
            return Err(Box::new(ValidationError {
                context: "extent[0]".into(),
                problem: "is not greater than zero".into(),
                vuids: &["VUID-VkViewport-width-01770"],
                ..Default::default()
            }));
        }

        if extent[1] == 0.0 {
            return Err(Box::new(ValidationError {
                context: "extent[1]".into(),
                problem: "is zero".into(),
                vuids: &["VUID-VkViewport-apiVersion-07917"],
                ..Default::default()
            }));
        }

        if !(0.0..=1.0).contains(depth_range.start()) || !(0.0..=1.0).contains(depth_range.end())
        {
            return Err(Box::new(ValidationError {
                context: "depth_range".into(),
                problem: "is not between 0.0 and 1.0 inclusive".into(),
                vuids: &["VUID-VkViewport-minDepth-01234", "VUID-VkViewport-maxDepth-01235"],
                ..Default::default()
            }));
        }

        Ok(())
    }

    /// Returns whether the viewport is flipped vertically relative to the native convention.
    ///
    /// Native viewports grow downwards, so a positive height needs the flip.
    #[inline]
    pub(crate) fn flips_y(&self) -> bool {
        self.extent[1] > 0.0
    }

    /// Returns whether the depth range goes backwards.
    #[inline]
    pub(crate) fn flips_z(&self) -> bool {
        self.depth_range.start() > self.depth_range.end()
    }

    /// Returns the native viewport, with a positive height and an ordered depth range.
    pub fn to_native(&self) -> NativeViewport {
        let [x, y] = self.offset;
        let [width, height] = self.extent;
        let (&min_depth, &max_depth) = (self.depth_range.start(), self.depth_range.end());

        NativeViewport {
            top_left_x: x,
            top_left_y: if height < 0.0 { y + height } else { y },
            width,
            height: height.abs(),
            min_depth: min_depth.min(max_depth),
            max_depth: max_depth.max(min_depth),
        }
    }
}

/// A two-dimensional subregion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Scissor {
    /// Coordinates of the top-left hand corner of the box.
    ///
    /// The default value is `[0; 2]`.
    pub offset: [u32; 2],

    /// Dimensions of the box.
    ///
    /// The default value is `[i32::MAX as u32; 2]`.
    pub extent: [u32; 2],
}

impl Default for Scissor {
    #[inline]
    fn default() -> Self {
        Self {
            offset: [0; 2],
            extent: [i32::MAX as u32; 2],
        }
    }
}

impl Scissor {
    /// Returns the native rectangle.
    #[inline]
    pub fn to_native(&self) -> NativeRect {
        let [x, y] = self.offset.map(|v| v as i32);
        let [width, height] = self.extent.map(|v| v as i32);

        NativeRect {
            left: x,
            top: y,
            right: x.saturating_add(width),
            bottom: y.saturating_add(height),
        }
    }
}

/// A native viewport.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NativeViewport {
    pub top_left_x: f32,
    pub top_left_y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

/// A native rectangle, with exclusive right and bottom edges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NativeRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

//! Configures how primitives should be converted into collections of fragments.

use crate::{macros::vulkan_enum, ValidationError};

/// The state in a graphics pipeline describing how the rasterization stage should behave.
#[derive(Clone, Debug)]
pub struct RasterizationState {
    /// If true, then the depth value of the vertices will be clamped to the range [0.0, 1.0]. If
    /// false, fragments whose depth is outside of this range will be discarded.
    ///
    /// The default value is `false`.
    pub depth_clamp_enable: bool,

    /// If true, all the fragments will be discarded, and the fragment shader will not be run. This
    /// is usually used when your vertex shader has some side effects and you don't need to run the
    /// fragment shader.
    ///
    /// The viewports, multisample, depth-stencil and color-blend states are ignored when this is
    /// enabled.
    ///
    /// The default value is `false`.
    pub rasterizer_discard_enable: bool,

    /// This setting can ask the rasterizer to downgrade triangles into lines or points, or lines
    /// into points.
    ///
    /// The default value is [`PolygonMode::Fill`].
    pub polygon_mode: PolygonMode,

    /// Specifies whether front faces or back faces should be discarded, or none, or both.
    ///
    /// The default value is [`CullMode::None`].
    pub cull_mode: CullMode,

    /// Specifies which triangle orientation is considered to be the front of the triangle.
    ///
    /// The default value is [`FrontFace::CounterClockwise`].
    pub front_face: FrontFace,

    /// Sets how to modify depth values in the rasterization stage.
    ///
    /// If set to `None`, depth biasing is disabled, the depth values will pass to the fragment
    /// shader unmodified.
    ///
    /// The default value is `None`.
    pub depth_bias: Option<DepthBiasState>,

    /// Width, in pixels, of lines when drawing lines.
    ///
    /// Only `1.0` is supported.
    ///
    /// The default value is `1.0`.
    pub line_width: f32,

    pub _ne: crate::NonExhaustive,
}

impl Default for RasterizationState {
    #[inline]
    fn default() -> Self {
        Self {
            depth_clamp_enable: false,
            rasterizer_discard_enable: false,
            polygon_mode: Default::default(),
            cull_mode: Default::default(),
            front_face: Default::default(),
            depth_bias: None,
            line_width: 1.0,
            _ne: crate::NonExhaustive(()),
        }
    }
}

impl RasterizationState {
    pub(crate) fn validate(&self) -> Result<(), Box<ValidationError>> {
        let &Self {
            depth_clamp_enable: _,
            rasterizer_discard_enable: _,
            polygon_mode,
            cull_mode: _,
            front_face: _,
            depth_bias: _,
            line_width,
            _ne: _,
        } = self;

        if polygon_mode == PolygonMode::Point {
            return Err(Box::new(ValidationError {
                context: "polygon_mode".into(),
                problem: "is `PolygonMode::Point`, which the native rasterizer can't express".into(),
                ..Default::default()
            }));
        }

        if line_width != 1.0 {
            return Err(Box::new(ValidationError {
                context: "line_width".into(),
                problem: "is not 1.0".into(),
                vuids: &["VUID-VkGraphicsPipelineCreateInfo-pDynamicStates-00749"],
                ..Default::default()
            }));
        }

        Ok(())
    }

    pub(crate) fn to_native(&self) -> NativeRasterizerDesc {
        let mut desc = NativeRasterizerDesc {
            fill_mode: match self.polygon_mode {
                PolygonMode::Line => NativeFillMode::Wireframe,
                PolygonMode::Fill | PolygonMode::Point => NativeFillMode::Solid,
            },
            cull_mode: match self.cull_mode {
                CullMode::Front => NativeCullMode::Front,
                CullMode::Back => NativeCullMode::Back,
                // Both faces culled means no rasterization at all, which the fragment stage
                // handles by being left out.
                CullMode::None | CullMode::FrontAndBack => NativeCullMode::None,
            },
            front_counter_clockwise: self.front_face == FrontFace::CounterClockwise,
            depth_clip_enable: !self.depth_clamp_enable,
            ..Default::default()
        };

        if let Some(bias) = &self.depth_bias {
            desc.depth_bias = bias.constant_factor as i32;
            desc.depth_bias_clamp = bias.clamp;
            desc.slope_scaled_depth_bias = bias.slope_factor;
        }

        desc
    }
}

/// The values to use for depth biasing.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DepthBiasState {
    /// Specifies a constant factor to be added to every depth value.
    ///
    /// The default value is `0.0`.
    pub constant_factor: f32,

    /// The maximum (or minimum) depth bias of a fragment.
    ///
    /// The default value is `0.0`.
    pub clamp: f32,

    /// A scalar factor applied to a fragment's slope in depth bias calculations.
    ///
    /// The default value is `0.0`.
    pub slope_factor: f32,
}

vulkan_enum! {
    #[non_exhaustive]

    /// Specifies the culling mode.
    ///
    /// This setting works in pair with `front_face`. The `front_face` setting tells the GPU whether
    /// clockwise or counter-clockwise correspond to the front and the back of each triangle. Then
    /// `cull_mode` lets you specify whether front faces should be discarded, back faces should be
    /// discarded, or none, or both.
    CullMode = CullModeFlags(u32);

    /// No culling.
    None = NONE,

    /// The faces facing the front of the screen (ie. facing the user) will be removed.
    Front = FRONT,

    /// The faces facing the back of the screen will be removed.
    Back = BACK,

    /// All faces will be removed.
    FrontAndBack = FRONT_AND_BACK,
}

impl Default for CullMode {
    #[inline]
    fn default() -> CullMode {
        CullMode::None
    }
}

impl CullMode {
    /// Returns whether front-facing primitives are culled.
    #[inline]
    pub fn culls_front(self) -> bool {
        matches!(self, Self::Front | Self::FrontAndBack)
    }

    /// Returns whether back-facing primitives are culled.
    #[inline]
    pub fn culls_back(self) -> bool {
        matches!(self, Self::Back | Self::FrontAndBack)
    }
}

vulkan_enum! {
    #[non_exhaustive]

    /// Specifies which triangle orientation corresponds to the front or the triangle.
    FrontFace = FrontFace(i32);

    /// Triangles whose vertices are oriented counter-clockwise on the screen will be considered
    /// as facing their front. Otherwise they will be considered as facing their back.
    CounterClockwise = COUNTER_CLOCKWISE,

    /// Triangles whose vertices are oriented clockwise on the screen will be considered
    /// as facing their front. Otherwise they will be considered as facing their back.
    Clockwise = CLOCKWISE,
}

impl Default for FrontFace {
    #[inline]
    fn default() -> FrontFace {
        FrontFace::CounterClockwise
    }
}

vulkan_enum! {
    #[non_exhaustive]

    /// Specifies how polygons are drawn.
    PolygonMode = PolygonMode(i32);

    /// The polygons are drawn as solid shapes.
    Fill = FILL,

    /// The lines between the vertices of the polygons are drawn.
    Line = LINE,

    /// Only the vertices of the polygons are drawn.
    Point = POINT,
}

impl Default for PolygonMode {
    #[inline]
    fn default() -> PolygonMode {
        PolygonMode::Fill
    }
}

/// How the native rasterizer fills primitives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum NativeFillMode {
    Wireframe = 2,
    #[default]
    Solid = 3,
}

/// Which faces the native rasterizer culls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum NativeCullMode {
    #[default]
    None = 1,
    Front = 2,
    Back = 3,
}

/// The native rasterizer description of a pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NativeRasterizerDesc {
    pub fill_mode: NativeFillMode,
    pub cull_mode: NativeCullMode,
    pub front_counter_clockwise: bool,
    pub depth_bias: i32,
    pub depth_bias_clamp: f32,
    pub slope_scaled_depth_bias: f32,
    pub depth_clip_enable: bool,
}

//! Configures how the color output of the fragment shader is written to the attachment.
//!
//! # Blending in details
//!
//! There are three kinds of color attachments for the purpose of blending:
//!
//! - Attachments with a floating-point or fixed point format.
//! - Attachments with a (non-normalized) integer format.
//! - Attachments with a normalized integer format.
//!
//! For floating-point and fixed-point formats, the blending operation is applied. For integer
//! formats, the logic operation is applied. For normalized integer formats, the logic operation
//! will take precedence if it is activated, otherwise the blending operation is applied.
//!
//! The native blend description has a single blend constant for color and alpha, so the
//! `Constant*` factors are translated to the same native factor whether they name the color or
//! the alpha part of the constants.

use crate::{
    device::Device,
    macros::{vulkan_bitflags, vulkan_enum},
    ValidationError,
};

/// Describes how the color output of the fragment shader is written to the attachment. See the
/// documentation of the `color_blend` module for more info.
#[derive(Clone, Debug)]
pub struct ColorBlendState {
    /// Sets the logical operation to perform between the incoming fragment color and the existing
    /// fragment in the framebuffer attachment.
    ///
    /// If set to `Some`, blending is disabled for every attachment.
    ///
    /// The default value is `None`.
    pub logic_op: Option<LogicOp>,

    /// Sets the blend and output state for each color attachment. The number of elements must
    /// match the number of color attachments in the subpass.
    ///
    /// The default value is empty.
    pub attachments: Vec<ColorBlendAttachmentState>,

    /// The constant color to use for some of the `BlendFactor` variants.
    ///
    /// Ignored if [`DynamicState::BlendConstants`](crate::pipeline::DynamicState) is enabled.
    ///
    /// The default value is `[0.0; 4]`.
    pub blend_constants: [f32; 4],

    pub _ne: crate::NonExhaustive,
}

impl Default for ColorBlendState {
    #[inline]
    fn default() -> Self {
        Self {
            logic_op: None,
            attachments: Vec::new(),
            blend_constants: [0.0; 4],
            _ne: crate::NonExhaustive(()),
        }
    }
}

impl ColorBlendState {
    /// Returns a `ColorBlendState` with `count` duplicates of `attachment_state`.
    #[inline]
    pub fn with_attachment_states(count: u32, attachment_state: ColorBlendAttachmentState) -> Self {
        Self {
            attachments: vec![attachment_state; count as usize],
            ..Default::default()
        }
    }

    pub(crate) fn validate(&self, device: &Device) -> Result<(), Box<ValidationError>> {
        let &Self {
            logic_op: _,
            ref attachments,
            blend_constants: _,
            _ne: _,
        } = self;

        if attachments.len() as u32 > device.properties().max_color_attachments {
            return Err(Box::new(ValidationError {
                context: "attachments".into(),
                problem: "the length exceeds the `max_color_attachments` limit".into(),
                vuids: &["VUID-VkSubpassDescription2-colorAttachmentCount-03063"],
                ..Default::default()
            }));
        }

        Ok(())
    }

    /// Returns the native blend description. `alpha_to_coverage` comes from the multisample
    /// state.
    pub(crate) fn to_native(&self, alpha_to_coverage: bool) -> NativeBlendDesc {
        let mut desc = NativeBlendDesc {
            alpha_to_coverage_enable: alpha_to_coverage,
            ..Default::default()
        };

        let logic_op = self.logic_op.unwrap_or_default().to_native();

        for (index, attachment) in self.attachments.iter().enumerate() {
            if index > 0 && self.attachments[index - 1] != *attachment {
                desc.independent_blend_enable = true;
            }

            let target = &mut desc.render_target[index];
            target.render_target_write_mask = attachment.color_write_mask.to_native();

            if self.logic_op.is_some() {
                target.logic_op_enable = true;
                target.logic_op = logic_op;
            } else if let Some(blend) = &attachment.blend {
                target.blend_enable = true;
                target.src_blend = blend.src_color_blend_factor.to_native(false);
                target.dest_blend = blend.dst_color_blend_factor.to_native(false);
                target.blend_op = blend.color_blend_op.to_native();
                target.src_blend_alpha = blend.src_alpha_blend_factor.to_native(true);
                target.dest_blend_alpha = blend.dst_alpha_blend_factor.to_native(true);
                target.blend_op_alpha = blend.alpha_blend_op.to_native();
            }
        }

        desc
    }
}

/// Describes how a framebuffer color attachment is handled in the pipeline during the color
/// blend stage.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorBlendAttachmentState {
    /// The blend parameters for the attachment.
    ///
    /// If set to `None`, blending is disabled, and all incoming pixels will be used directly.
    ///
    /// The default value is `None`.
    pub blend: Option<AttachmentBlend>,

    /// Sets which components of the final pixel value are written to the attachment.
    ///
    /// The default value is `ColorComponents::all()`.
    pub color_write_mask: ColorComponents,
}

impl Default for ColorBlendAttachmentState {
    #[inline]
    fn default() -> Self {
        Self {
            blend: None,
            color_write_mask: ColorComponents::all(),
        }
    }
}

/// Describes how the blending system should behave for an attachment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AttachmentBlend {
    /// The operation to apply to the source color component before applying `color_blend_op`.
    ///
    /// The default value is [`BlendFactor::SrcColor`].
    pub src_color_blend_factor: BlendFactor,

    /// The operation to apply to the destination color component before applying
    /// `color_blend_op`.
    ///
    /// The default value is [`BlendFactor::Zero`].
    pub dst_color_blend_factor: BlendFactor,

    /// The operation to apply between the color components of the source and destination
    /// pixels, to produce the final pixel value.
    ///
    /// The default value is [`BlendOp::Add`].
    pub color_blend_op: BlendOp,

    /// The operation to apply to the source alpha component before applying `alpha_blend_op`.
    ///
    /// The default value is [`BlendFactor::SrcColor`].
    pub src_alpha_blend_factor: BlendFactor,

    /// The operation to apply to the destination alpha component before applying
    /// `alpha_blend_op`.
    ///
    /// The default value is [`BlendFactor::Zero`].
    pub dst_alpha_blend_factor: BlendFactor,

    /// The operation to apply between the alpha component of the source and destination pixels,
    /// to produce the final pixel value.
    ///
    /// The default value is [`BlendOp::Add`].
    pub alpha_blend_op: BlendOp,
}

impl Default for AttachmentBlend {
    #[inline]
    fn default() -> Self {
        Self {
            src_color_blend_factor: BlendFactor::SrcColor,
            dst_color_blend_factor: BlendFactor::Zero,
            color_blend_op: BlendOp::Add,
            src_alpha_blend_factor: BlendFactor::SrcColor,
            dst_alpha_blend_factor: BlendFactor::Zero,
            alpha_blend_op: BlendOp::Add,
        }
    }
}

impl AttachmentBlend {
    /// Builds an `AttachmentBlend` where the output of the fragment shader is ignored and the
    /// destination is untouched.
    #[inline]
    pub fn ignore_source() -> Self {
        Self {
            src_color_blend_factor: BlendFactor::Zero,
            dst_color_blend_factor: BlendFactor::DstColor,
            color_blend_op: BlendOp::Add,
            src_alpha_blend_factor: BlendFactor::Zero,
            dst_alpha_blend_factor: BlendFactor::DstColor,
            alpha_blend_op: BlendOp::Add,
        }
    }

    /// Builds an `AttachmentBlend` where the output will be merged with the existing value
    /// based on the alpha of the source.
    #[inline]
    pub fn alpha() -> Self {
        Self {
            src_color_blend_factor: BlendFactor::SrcAlpha,
            dst_color_blend_factor: BlendFactor::OneMinusSrcAlpha,
            color_blend_op: BlendOp::Add,
            src_alpha_blend_factor: BlendFactor::SrcAlpha,
            dst_alpha_blend_factor: BlendFactor::OneMinusSrcAlpha,
            alpha_blend_op: BlendOp::Add,
        }
    }

    /// Builds an `AttachmentBlend` where the colors are added, and alpha is set to the maximum of
    /// the two.
    #[inline]
    pub fn additive() -> Self {
        Self {
            src_color_blend_factor: BlendFactor::One,
            dst_color_blend_factor: BlendFactor::One,
            color_blend_op: BlendOp::Add,
            src_alpha_blend_factor: BlendFactor::One,
            dst_alpha_blend_factor: BlendFactor::One,
            alpha_blend_op: BlendOp::Max,
        }
    }
}

vulkan_enum! {
    #[non_exhaustive]

    /// The operation that takes `source` (output from the fragment shader), `destination` (value
    /// currently in the framebuffer attachment) and `blend_constant` input values,
    /// and produces new inputs to be fed to `BlendOp`.
    BlendFactor = BlendFactor(i32);

    /// Always `0`.
    Zero = ZERO,

    /// Always `1`.
    One = ONE,

    /// `source` component-wise.
    SrcColor = SRC_COLOR,

    /// `1 - source` component-wise.
    OneMinusSrcColor = ONE_MINUS_SRC_COLOR,

    /// `destination` component-wise.
    DstColor = DST_COLOR,

    /// `1 - destination` component-wise.
    OneMinusDstColor = ONE_MINUS_DST_COLOR,

    /// `source.a` for all components.
    SrcAlpha = SRC_ALPHA,

    /// `1 - source.a` for all components.
    OneMinusSrcAlpha = ONE_MINUS_SRC_ALPHA,

    /// `destination.a` for all components.
    DstAlpha = DST_ALPHA,

    /// `1 - destination.a` for all components.
    OneMinusDstAlpha = ONE_MINUS_DST_ALPHA,

    /// `blend_constants` component-wise.
    ConstantColor = CONSTANT_COLOR,

    /// `1 - blend_constants` component-wise.
    OneMinusConstantColor = ONE_MINUS_CONSTANT_COLOR,

    /// `blend_constants.a` for all components.
    ConstantAlpha = CONSTANT_ALPHA,

    /// `1 - blend_constants.a` for all components.
    OneMinusConstantAlpha = ONE_MINUS_CONSTANT_ALPHA,

    /// For the alpha component, always `1`. For the color components,
    /// `min(source.a, 1 - destination.a)` for all components.
    SrcAlphaSaturate = SRC_ALPHA_SATURATE,

    /// `source1` component-wise.
    Src1Color = SRC1_COLOR,

    /// `1 - source1` component-wise.
    OneMinusSrc1Color = ONE_MINUS_SRC1_COLOR,

    /// `source1.a` for all components.
    Src1Alpha = SRC1_ALPHA,

    /// `1 - source1.a` for all components.
    OneMinusSrc1Alpha = ONE_MINUS_SRC1_ALPHA,
}

impl BlendFactor {
    /// Returns the native factor. For the alpha channel, the color factors read alpha.
    pub(crate) fn to_native(self, is_alpha: bool) -> NativeBlend {
        match self {
            Self::Zero => NativeBlend::Zero,
            Self::One => NativeBlend::One,
            Self::SrcColor if is_alpha => NativeBlend::SrcAlpha,
            Self::SrcColor => NativeBlend::SrcColor,
            Self::OneMinusSrcColor if is_alpha => NativeBlend::InvSrcAlpha,
            Self::OneMinusSrcColor => NativeBlend::InvSrcColor,
            Self::DstColor if is_alpha => NativeBlend::DestAlpha,
            Self::DstColor => NativeBlend::DestColor,
            Self::OneMinusDstColor if is_alpha => NativeBlend::InvDestAlpha,
            Self::OneMinusDstColor => NativeBlend::InvDestColor,
            Self::SrcAlpha => NativeBlend::SrcAlpha,
            Self::OneMinusSrcAlpha => NativeBlend::InvSrcAlpha,
            Self::DstAlpha => NativeBlend::DestAlpha,
            Self::OneMinusDstAlpha => NativeBlend::InvDestAlpha,
            Self::ConstantColor | Self::ConstantAlpha => NativeBlend::BlendFactor,
            Self::OneMinusConstantColor | Self::OneMinusConstantAlpha => {
                NativeBlend::InvBlendFactor
            }
            Self::SrcAlphaSaturate => NativeBlend::SrcAlphaSat,
            Self::Src1Color if is_alpha => NativeBlend::Src1Alpha,
            Self::Src1Color => NativeBlend::Src1Color,
            Self::OneMinusSrc1Color if is_alpha => NativeBlend::InvSrc1Alpha,
            Self::OneMinusSrc1Color => NativeBlend::InvSrc1Color,
            Self::Src1Alpha => NativeBlend::Src1Alpha,
            Self::OneMinusSrc1Alpha => NativeBlend::InvSrc1Alpha,
        }
    }
}

vulkan_enum! {
    #[non_exhaustive]

    /// Operation that takes two inputs (one from the fragment shader and one from the
    /// framebuffer attachment, after the blend factors have been applied) and produces one output.
    BlendOp = BlendOp(i32);

    /// `source + destination`.
    Add = ADD,

    /// `source - destination`.
    Subtract = SUBTRACT,

    /// `destination - source`.
    ReverseSubtract = REVERSE_SUBTRACT,

    /// `min(source, destination)`.
    Min = MIN,

    /// `max(source, destination)`.
    Max = MAX,
}

impl BlendOp {
    pub(crate) fn to_native(self) -> NativeBlendOp {
        match self {
            Self::Add => NativeBlendOp::Add,
            Self::Subtract => NativeBlendOp::Subtract,
            Self::ReverseSubtract => NativeBlendOp::RevSubtract,
            Self::Min => NativeBlendOp::Min,
            Self::Max => NativeBlendOp::Max,
        }
    }
}

vulkan_enum! {
    #[non_exhaustive]

    /// Which logical operation to apply to the output values.
    ///
    /// The operation is applied individually for each channel (red, green, blue and alpha).
    ///
    /// Only relevant for integer or unsigned attachments.
    LogicOp = LogicOp(i32);

    /// Returns `0`.
    Clear = CLEAR,

    /// Returns `source & destination`.
    And = AND,

    /// Returns `source & !destination`.
    AndReverse = AND_REVERSE,

    /// Returns `source`.
    Copy = COPY,

    /// Returns `!source & destination`.
    AndInverted = AND_INVERTED,

    /// Returns `destination`.
    Noop = NO_OP,

    /// Returns `source ^ destination`.
    Xor = XOR,

    /// Returns `source | destination`.
    Or = OR,

    /// Returns `!(source | destination)`.
    Nor = NOR,

    /// Returns `!(source ^ destination)`.
    Equivalent = EQUIVALENT,

    /// Returns `!destination`.
    Invert = INVERT,

    /// Returns `source | !destination`.
    OrReverse = OR_REVERSE,

    /// Returns `!source`.
    CopyInverted = COPY_INVERTED,

    /// Returns `!source | destination`.
    OrInverted = OR_INVERTED,

    /// Returns `!(source & destination)`.
    Nand = NAND,

    /// Returns `!0` (all bits set to 1).
    Set = SET,
}

impl Default for LogicOp {
    #[inline]
    fn default() -> LogicOp {
        LogicOp::Noop
    }
}

impl LogicOp {
    pub(crate) fn to_native(self) -> NativeLogicOp {
        match self {
            Self::Clear => NativeLogicOp::Clear,
            Self::And => NativeLogicOp::And,
            Self::AndReverse => NativeLogicOp::AndReverse,
            Self::Copy => NativeLogicOp::Copy,
            Self::AndInverted => NativeLogicOp::AndInverted,
            Self::Noop => NativeLogicOp::Noop,
            Self::Xor => NativeLogicOp::Xor,
            Self::Or => NativeLogicOp::Or,
            Self::Nor => NativeLogicOp::Nor,
            Self::Equivalent => NativeLogicOp::Equiv,
            Self::Invert => NativeLogicOp::Invert,
            Self::OrReverse => NativeLogicOp::OrReverse,
            Self::CopyInverted => NativeLogicOp::CopyInverted,
            Self::OrInverted => NativeLogicOp::OrInverted,
            Self::Nand => NativeLogicOp::Nand,
            Self::Set => NativeLogicOp::Set,
        }
    }
}

vulkan_bitflags! {
    /// A mask specifying color components that can be written to a framebuffer attachment.
    ColorComponents = ColorComponentFlags(u32);

    /// The red component.
    R = R,

    /// The green component.
    G = G,

    /// The blue component.
    B = B,

    /// The alpha component.
    A = A,
}

impl ColorComponents {
    /// The native write mask uses the same bit for each component.
    pub(crate) fn to_native(self) -> u8 {
        self.0 as u8
    }
}

/// The native blend description of a pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NativeBlendDesc {
    pub alpha_to_coverage_enable: bool,
    /// Whether the render targets use different blend state. If not, only the first one is
    /// read.
    pub independent_blend_enable: bool,
    pub render_target: [NativeRenderTargetBlendDesc; 8],
}

/// The native blend state of one render target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NativeRenderTargetBlendDesc {
    pub blend_enable: bool,
    pub logic_op_enable: bool,
    pub src_blend: NativeBlend,
    pub dest_blend: NativeBlend,
    pub blend_op: NativeBlendOp,
    pub src_blend_alpha: NativeBlend,
    pub dest_blend_alpha: NativeBlend,
    pub blend_op_alpha: NativeBlendOp,
    pub logic_op: NativeLogicOp,
    pub render_target_write_mask: u8,
}

impl Default for NativeRenderTargetBlendDesc {
    #[inline]
    fn default() -> Self {
        Self {
            blend_enable: false,
            logic_op_enable: false,
            src_blend: NativeBlend::One,
            dest_blend: NativeBlend::Zero,
            blend_op: NativeBlendOp::Add,
            src_blend_alpha: NativeBlend::One,
            dest_blend_alpha: NativeBlend::Zero,
            blend_op_alpha: NativeBlendOp::Add,
            logic_op: NativeLogicOp::Noop,
            render_target_write_mask: 0,
        }
    }
}

/// A native blend factor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum NativeBlend {
    Zero = 1,
    One = 2,
    SrcColor = 3,
    InvSrcColor = 4,
    SrcAlpha = 5,
    InvSrcAlpha = 6,
    DestAlpha = 7,
    InvDestAlpha = 8,
    DestColor = 9,
    InvDestColor = 10,
    SrcAlphaSat = 11,
    BlendFactor = 14,
    InvBlendFactor = 15,
    Src1Color = 16,
    InvSrc1Color = 17,
    Src1Alpha = 18,
    InvSrc1Alpha = 19,
}

/// A native blend operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum NativeBlendOp {
    Add = 1,
    Subtract = 2,
    RevSubtract = 3,
    Min = 4,
    Max = 5,
}

/// A native logic operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum NativeLogicOp {
    Clear = 0,
    Set,
    Copy,
    CopyInverted,
    Noop,
    Invert,
    And,
    Nand,
    Or,
    Nor,
    Xor,
    Equiv,
    AndReverse,
    AndInverted,
    OrReverse,
    OrInverted,
}

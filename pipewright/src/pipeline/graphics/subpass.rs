//! Selects what a graphics pipeline renders into.

use crate::{
    device::Device,
    format::{Format, FormatUsage, NativeFormat},
    image::ImageAspects,
    render_pass::Subpass,
    ValidationError,
};

/// The maximum number of native render targets.
pub const MAX_RENDER_TARGETS: usize = 8;

/// Selects the type of subpass that a graphics pipeline is created for.
#[derive(Clone, Debug)]
pub enum PipelineSubpassType {
    BeginRenderPass(Subpass),
    BeginRendering(PipelineRenderingCreateInfo),
}

impl PipelineSubpassType {
    pub(crate) fn validate(&self, device: &Device) -> Result<(), Box<ValidationError>> {
        match self {
            Self::BeginRenderPass(subpass) => {
                if subpass.num_color_attachments() > device.properties().max_color_attachments {
                    return Err(Box::new(ValidationError {
                        context: "subpass".into(),
                        problem: "the subpass has more color attachments than the \
                            `max_color_attachments` limit"
                            .into(),
                        ..Default::default()
                    }));
                }

                Ok(())
            }
            Self::BeginRendering(rendering_info) => rendering_info
                .validate(device)
                .map_err(|err| err.add_context("rendering_info")),
        }
    }

    /// Returns the format of each color slot, or `None` for unused slots.
    pub fn color_attachment_formats(&self) -> Vec<Option<Format>> {
        match self {
            Self::BeginRenderPass(subpass) => subpass.color_attachment_formats(),
            Self::BeginRendering(rendering_info) => rendering_info.color_attachment_formats.clone(),
        }
    }

    /// Returns the format of the depth/stencil attachment, if there is one.
    pub fn depth_stencil_format(&self) -> Option<Format> {
        match self {
            Self::BeginRenderPass(subpass) => subpass.depth_stencil_format(),
            Self::BeginRendering(rendering_info) => rendering_info
                .depth_attachment_format
                .or(rendering_info.stencil_attachment_format),
        }
    }

    /// Returns the native render target formats.
    pub(crate) fn render_target_formats(&self) -> NativeRtFormatArray {
        let mut array = NativeRtFormatArray::default();

        for (slot, format) in self.color_attachment_formats().into_iter().enumerate() {
            if let Some(format) = format {
                array.formats[slot] =
                    format.native_format(FormatUsage::ColorAttachment, ImageAspects::COLOR);
            }
            array.num_render_targets = slot as u32 + 1;
        }

        array
    }

    /// Returns the native depth/stencil format, or `UNKNOWN` if there is no depth/stencil
    /// attachment.
    pub(crate) fn native_depth_stencil_format(&self) -> NativeFormat {
        self.depth_stencil_format()
            .map(|format| {
                format.native_format(FormatUsage::DepthStencilAttachment, format.aspects())
            })
            .unwrap_or_default()
    }
}

impl From<Subpass> for PipelineSubpassType {
    #[inline]
    fn from(val: Subpass) -> Self {
        Self::BeginRenderPass(val)
    }
}

impl From<PipelineRenderingCreateInfo> for PipelineSubpassType {
    #[inline]
    fn from(val: PipelineRenderingCreateInfo) -> Self {
        Self::BeginRendering(val)
    }
}

/// The dynamic rendering parameters to create a graphics pipeline.
#[derive(Clone, Debug)]
pub struct PipelineRenderingCreateInfo {
    /// The formats of the color attachments that will be used during rendering.
    ///
    /// If an element is `None`, it indicates that the attachment will not be used.
    ///
    /// The default value is empty.
    pub color_attachment_formats: Vec<Option<Format>>,

    /// The format of the depth attachment that will be used during rendering.
    ///
    /// If set to `None`, it indicates that no depth attachment will be used.
    ///
    /// The default value is `None`.
    pub depth_attachment_format: Option<Format>,

    /// The format of the stencil attachment that will be used during rendering.
    ///
    /// If set to `None`, it indicates that no stencil attachment will be used.
    ///
    /// The default value is `None`.
    pub stencil_attachment_format: Option<Format>,

    pub _ne: crate::NonExhaustive,
}

impl Default for PipelineRenderingCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            color_attachment_formats: Vec::new(),
            depth_attachment_format: None,
            stencil_attachment_format: None,
            _ne: crate::NonExhaustive(()),
        }
    }
}

impl PipelineRenderingCreateInfo {
    pub(crate) fn validate(&self, device: &Device) -> Result<(), Box<ValidationError>> {
        let &Self {
            ref color_attachment_formats,
            depth_attachment_format,
            stencil_attachment_format,
            _ne: _,
        } = self;

        if color_attachment_formats.len() > device.properties().max_color_attachments as usize {
            return Err(Box::new(ValidationError {
                context: "color_attachment_formats".into(),
                problem: "the length exceeds the `max_color_attachments` limit".into(),
                vuids: &["VUID-VkPipelineRenderingCreateInfo-colorAttachmentCount-09533"],
                ..Default::default()
            }));
        }

        for (index, format) in color_attachment_formats
            .iter()
            .enumerate()
            .flat_map(|(i, f)| f.map(|f| (i, f)))
        {
            if format.native_format(FormatUsage::ColorAttachment, ImageAspects::COLOR)
                == NativeFormat::UNKNOWN
            {
                return Err(Box::new(ValidationError {
                    context: format!("color_attachment_formats[{}]", index).into(),
                    problem: "the format can't be used as a color attachment".into(),
                    vuids: &["VUID-VkGraphicsPipelineCreateInfo-renderPass-06582"],
                    ..Default::default()
                }));
            }
        }

        if let Some(format) = depth_attachment_format {
            if !format.aspects().intersects(ImageAspects::DEPTH) {
                return Err(Box::new(ValidationError {
                    context: "depth_attachment_format".into(),
                    problem: "does not have a depth aspect".into(),
                    vuids: &["VUID-VkGraphicsPipelineCreateInfo-renderPass-06587"],
                    ..Default::default()
                }));
            }
        }

        if let Some(format) = stencil_attachment_format {
            if !format.aspects().intersects(ImageAspects::STENCIL) {
                return Err(Box::new(ValidationError {
                    context: "stencil_attachment_format".into(),
                    problem: "does not have a stencil aspect".into(),
                    vuids: &["VUID-VkGraphicsPipelineCreateInfo-renderPass-06588"],
                    ..Default::default()
                }));
            }
        }

        if let (Some(depth_format), Some(stencil_format)) =
            (depth_attachment_format, stencil_attachment_format)
        {
            if depth_format != stencil_format {
                return Err(Box::new(ValidationError {
                    problem: "`depth_attachment_format` and `stencil_attachment_format` are both \
                        `Some`, but are not equal"
                        .into(),
                    vuids: &["VUID-VkPipelineRenderingCreateInfo-depthAttachmentFormat-06589"],
                    ..Default::default()
                }));
            }
        }

        Ok(())
    }
}

/// The native render target formats of a pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NativeRtFormatArray {
    pub formats: [NativeFormat; MAX_RENDER_TARGETS],
    pub num_render_targets: u32,
}

#[cfg(test)]
mod tests {
    use super::{PipelineRenderingCreateInfo, PipelineSubpassType};
    use crate::format::{Format, NativeFormat};

    #[test]
    fn rendering_formats() {
        let subpass = PipelineSubpassType::BeginRendering(PipelineRenderingCreateInfo {
            color_attachment_formats: vec![None, Some(Format::R8G8B8A8_SRGB)],
            depth_attachment_format: Some(Format::D24_UNORM_S8_UINT),
            stencil_attachment_format: Some(Format::D24_UNORM_S8_UINT),
            ..Default::default()
        });

        let rt_formats = subpass.render_target_formats();
        assert_eq!(rt_formats.num_render_targets, 2);
        assert_eq!(rt_formats.formats[0], NativeFormat::UNKNOWN);
        assert_eq!(rt_formats.formats[1], NativeFormat::R8G8B8A8_UNORM_SRGB);
        assert_eq!(
            subpass.native_depth_stencil_format(),
            NativeFormat::D24_UNORM_S8_UINT,
        );
    }

    #[test]
    fn mismatched_depth_stencil() {
        let device = test_device!();
        let subpass = PipelineSubpassType::BeginRendering(PipelineRenderingCreateInfo {
            depth_attachment_format: Some(Format::D32_SFLOAT),
            stencil_attachment_format: Some(Format::D24_UNORM_S8_UINT),
            ..Default::default()
        });

        assert!(subpass.validate(&device).is_err());
    }
}

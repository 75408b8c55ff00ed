//! Description of the attachments a graphics pipeline renders into.
//!
//! Pipelines only need the formats and sample counts of the attachments used by one subpass. The
//! attachment formats can come either from a [`Subpass`] of a [`RenderPass`], or from a
//! [`PipelineRenderingCreateInfo`] when rendering without a render pass object.
//!
//! [`PipelineRenderingCreateInfo`]: crate::pipeline::graphics::subpass::PipelineRenderingCreateInfo

use crate::{device::Device, format::Format, image::SampleCount, ValidationError};
use std::{num::NonZero, sync::Arc};

/// An object representing the discrete steps in which rendering is done.
#[derive(Debug)]
pub struct RenderPass {
    device: Arc<Device>,
    id: NonZero<u64>,

    attachments: Vec<AttachmentDescription>,
    subpasses: Vec<SubpassDescription>,
}

impl RenderPass {
    /// Creates a new `RenderPass`.
    pub fn new(
        device: Arc<Device>,
        create_info: RenderPassCreateInfo,
    ) -> Result<Arc<RenderPass>, Box<ValidationError>> {
        create_info
            .validate(&device)
            .map_err(|err| err.add_context("create_info"))?;

        let RenderPassCreateInfo {
            attachments,
            subpasses,
            _ne: _,
        } = create_info;

        Ok(Arc::new(RenderPass {
            device,
            id: Self::next_id(),
            attachments,
            subpasses,
        }))
    }

    /// Returns the device that the render pass was created with.
    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Returns the attachments of the render pass.
    #[inline]
    pub fn attachments(&self) -> &[AttachmentDescription] {
        &self.attachments
    }

    /// Returns the subpasses of the render pass.
    #[inline]
    pub fn subpasses(&self) -> &[SubpassDescription] {
        &self.subpasses
    }

    /// Returns the first subpass of the render pass.
    #[inline]
    pub fn first_subpass(self: Arc<Self>) -> Subpass {
        Subpass {
            render_pass: self,
            subpass_id: 0,
        }
    }
}

crate::macros::impl_id_counter!(RenderPass);

/// Parameters to create a new `RenderPass`.
#[derive(Clone, Debug)]
pub struct RenderPassCreateInfo {
    /// The attachments available for the render pass.
    ///
    /// The default value is empty.
    pub attachments: Vec<AttachmentDescription>,

    /// The subpasses that make up this render pass. There must be at least one.
    ///
    /// The default value is empty, which must be overridden.
    pub subpasses: Vec<SubpassDescription>,

    pub _ne: crate::NonExhaustive,
}

impl Default for RenderPassCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            attachments: Vec::new(),
            subpasses: Vec::new(),
            _ne: crate::NonExhaustive(()),
        }
    }
}

impl RenderPassCreateInfo {
    pub(crate) fn validate(&self, device: &Device) -> Result<(), Box<ValidationError>> {
        let Self {
            attachments,
            subpasses,
            _ne: _,
        } = self;

        if subpasses.is_empty() {
            return Err(Box::new(ValidationError {
                context: "subpasses".into(),
                problem: "is empty".into(),
                vuids: &["VUID-VkRenderPassCreateInfo2-subpassCount-arraylength"],
                ..Default::default()
            }));
        }

        let max_color_attachments = device.properties().max_color_attachments;

        for (subpass_index, subpass) in subpasses.iter().enumerate() {
            let SubpassDescription {
                color_attachments,
                depth_stencil_attachment,
                _ne: _,
            } = subpass;

            if color_attachments.len() as u32 > max_color_attachments {
                return Err(Box::new(ValidationError {
                    context: format!("subpasses[{}].color_attachments", subpass_index).into(),
                    problem: "the length exceeds the `max_color_attachments` limit".into(),
                    vuids: &["VUID-VkSubpassDescription2-colorAttachmentCount-03063"],
                    ..Default::default()
                }));
            }

            for (ref_index, &attachment) in color_attachments.iter().enumerate() {
                let Some(attachment) = attachment else {
                    continue;
                };

                let context = || {
                    format!("subpasses[{}].color_attachments[{}]", subpass_index, ref_index)
                };

                let Some(description) = attachments.get(attachment as usize) else {
                    return Err(Box::new(ValidationError {
                        context: context().into(),
                        problem: "is not less than the length of `attachments`".into(),
                        vuids: &["VUID-VkRenderPassCreateInfo2-attachment-03051"],
                        ..Default::default()
                    }));
                };

                if description.format.is_depth_or_stencil() {
                    return Err(Box::new(ValidationError {
                        context: context().into(),
                        problem: "refers to an attachment with a depth/stencil format".into(),
                        vuids: &["VUID-VkSubpassDescription2-pColorAttachments-02898"],
                        ..Default::default()
                    }));
                }
            }

            if let Some(attachment) = *depth_stencil_attachment {
                let context =
                    || format!("subpasses[{}].depth_stencil_attachment", subpass_index);

                let Some(description) = attachments.get(attachment as usize) else {
                    return Err(Box::new(ValidationError {
                        context: context().into(),
                        problem: "is not less than the length of `attachments`".into(),
                        vuids: &["VUID-VkRenderPassCreateInfo2-attachment-03051"],
                        ..Default::default()
                    }));
                };

                if !description.format.is_depth_or_stencil() {
                    return Err(Box::new(ValidationError {
                        context: context().into(),
                        problem: "refers to an attachment without a depth/stencil format".into(),
                        vuids: &["VUID-VkSubpassDescription2-pDepthStencilAttachment-02900"],
                        ..Default::default()
                    }));
                }
            }
        }

        Ok(())
    }
}

/// Describes an attachment that will be used in a render pass.
#[derive(Clone, Debug)]
pub struct AttachmentDescription {
    /// The format of the image that is going to be bound.
    ///
    /// The default value is `Format::R8G8B8A8_UNORM`.
    pub format: Format,

    /// The number of samples of the image that is going to be bound.
    ///
    /// The default value is [`SampleCount::Sample1`].
    pub samples: SampleCount,

    pub _ne: crate::NonExhaustive,
}

impl Default for AttachmentDescription {
    #[inline]
    fn default() -> Self {
        Self {
            format: Format::R8G8B8A8_UNORM,
            samples: SampleCount::Sample1,
            _ne: crate::NonExhaustive(()),
        }
    }
}

/// Describes one of the subpasses of a render pass.
#[derive(Clone, Debug)]
pub struct SubpassDescription {
    /// The attachments of the render pass that are used as color attachments in this subpass,
    /// by index. `None` leaves the color slot unused.
    ///
    /// The default value is empty.
    pub color_attachments: Vec<Option<u32>>,

    /// The attachment of the render pass that is used as depth/stencil attachment in this
    /// subpass, if any.
    ///
    /// The default value is `None`.
    pub depth_stencil_attachment: Option<u32>,

    pub _ne: crate::NonExhaustive,
}

impl Default for SubpassDescription {
    #[inline]
    fn default() -> Self {
        Self {
            color_attachments: Vec::new(),
            depth_stencil_attachment: None,
            _ne: crate::NonExhaustive(()),
        }
    }
}

/// Represents a subpass within a `RenderPass` object.
#[derive(Clone, Debug)]
pub struct Subpass {
    render_pass: Arc<RenderPass>,
    subpass_id: u32,
}

impl Subpass {
    /// Returns a handle that represents a subpass of a render pass.
    #[inline]
    pub fn from(render_pass: Arc<RenderPass>, id: u32) -> Option<Subpass> {
        if (id as usize) < render_pass.subpasses().len() {
            Some(Subpass {
                render_pass,
                subpass_id: id,
            })
        } else {
            None
        }
    }

    /// Returns the render pass of this subpass.
    #[inline]
    pub fn render_pass(&self) -> &Arc<RenderPass> {
        &self.render_pass
    }

    /// Returns the index of this subpass within the renderpass.
    #[inline]
    pub fn index(&self) -> u32 {
        self.subpass_id
    }

    /// Returns the subpass description for this subpass.
    #[inline]
    pub fn subpass_desc(&self) -> &SubpassDescription {
        &self.render_pass.subpasses()[self.subpass_id as usize]
    }

    /// Returns the number of color slots of this subpass, used or not.
    #[inline]
    pub fn num_color_attachments(&self) -> u32 {
        self.subpass_desc().color_attachments.len() as u32
    }

    /// Returns the format of each color slot, or `None` for unused slots.
    pub fn color_attachment_formats(&self) -> Vec<Option<Format>> {
        let attachments = self.render_pass.attachments();

        self.subpass_desc()
            .color_attachments
            .iter()
            .map(|attachment| attachment.map(|index| attachments[index as usize].format))
            .collect()
    }

    /// Returns the format of the depth/stencil attachment, if the subpass has one.
    #[inline]
    pub fn depth_stencil_format(&self) -> Option<Format> {
        self.subpass_desc()
            .depth_stencil_attachment
            .map(|index| self.render_pass.attachments()[index as usize].format)
    }

    /// Returns the number of samples of the attachments, if the subpass uses any.
    pub fn num_samples(&self) -> Option<SampleCount> {
        let desc = self.subpass_desc();

        desc.color_attachments
            .iter()
            .flatten()
            .chain(desc.depth_stencil_attachment.iter())
            .map(|&index| self.render_pass.attachments()[index as usize].samples)
            .next()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AttachmentDescription, RenderPass, RenderPassCreateInfo, Subpass, SubpassDescription,
    };
    use crate::{format::Format, image::SampleCount};

    #[test]
    fn subpass_formats() {
        let device = test_device!();
        let render_pass = RenderPass::new(
            device,
            RenderPassCreateInfo {
                attachments: vec![
                    AttachmentDescription {
                        format: Format::B8G8R8A8_SRGB,
                        samples: SampleCount::Sample4,
                        ..Default::default()
                    },
                    AttachmentDescription {
                        format: Format::D24_UNORM_S8_UINT,
                        samples: SampleCount::Sample4,
                        ..Default::default()
                    },
                ],
                subpasses: vec![SubpassDescription {
                    color_attachments: vec![None, Some(0)],
                    depth_stencil_attachment: Some(1),
                    ..Default::default()
                }],
                ..Default::default()
            },
        )
        .unwrap();

        assert!(Subpass::from(render_pass.clone(), 1).is_none());

        let subpass = render_pass.first_subpass();
        assert_eq!(subpass.num_color_attachments(), 2);
        assert_eq!(
            subpass.color_attachment_formats(),
            [None, Some(Format::B8G8R8A8_SRGB)]
        );
        assert_eq!(subpass.depth_stencil_format(), Some(Format::D24_UNORM_S8_UINT));
        assert_eq!(subpass.num_samples(), Some(SampleCount::Sample4));
    }

    #[test]
    fn depth_format_as_color() {
        let device = test_device!();
        let result = RenderPass::new(
            device,
            RenderPassCreateInfo {
                attachments: vec![AttachmentDescription {
                    format: Format::D16_UNORM,
                    ..Default::default()
                }],
                subpasses: vec![SubpassDescription {
                    color_attachments: vec![Some(0)],
                    ..Default::default()
                }],
                ..Default::default()
            },
        );

        assert_eq!(
            result.unwrap_err().context,
            "create_info.subpasses[0].color_attachments[0]"
        );
    }
}

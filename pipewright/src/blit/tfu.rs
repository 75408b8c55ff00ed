//! The fixed-function copy unit ("TFU").
//!
//! The unit reads one mip level of a texture and writes it, plus optionally a chain of
//! progressively minified levels, to a tiled destination. It can't convert between formats or
//! scale, so blits only use it for exact copies of a whole level.

use super::{BlitInfo, BlitStrategy};
use crate::{
    device::Device,
    format::{utile_height, Format},
    image::{Image, ImageAspects, TilingMode},
};
use ash::vk;
use std::sync::Arc;

const ICFG_NUMMM_SHIFT: u32 = 5;
const ICFG_TTYPE_SHIFT: u32 = 9;
const ICFG_FORMAT_SHIFT: u32 = 18;
const ICFG_OPAD_SHIFT: u32 = 22;
const ICFG_FORMAT_RASTER: u32 = 0;
const ICFG_FORMAT_LINEARTILE: u32 = 11;

const IOA_DIMTW: u32 = 1 << 0;
const IOA_FORMAT_SHIFT: u32 = 3;
const IOA_FORMAT_LINEARTILE: u32 = 3;

/// A job for the fixed-function copy unit, in register form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TfuJob {
    /// The image written by the job.
    pub dst: vk::Image,
    /// The image read by the job, if it isn't `dst`.
    pub src: Option<vk::Image>,
    /// Output size: height in the upper 16 bits, width in the lower.
    pub ios: u32,
    /// Input address, relative to the start of `src`.
    pub iia: u32,
    /// Input stride, in UIF blocks or in texels depending on the input format.
    pub iis: u32,
    /// Input configuration: input layout, texture type, mip count and output padding.
    pub icfg: u32,
    /// Output address, relative to the start of `dst`, with the output layout.
    pub ioa: u32,
}

/// Copies whole color levels with the fixed-function copy unit.
#[derive(Clone, Copy, Debug, Default)]
pub struct TfuCopy;

impl BlitStrategy for TfuCopy {
    fn name(&self) -> &'static str {
        "tfu"
    }

    fn try_apply(&self, device: &Arc<Device>, info: &BlitInfo) -> ImageAspects {
        if !info.aspects.intersects(ImageAspects::COLOR) {
            return ImageAspects::empty();
        }

        let (src, dst) = (&info.src, &info.dst);
        let [dst_width, dst_height, _] = dst.level_extent();

        if info.scissor.is_some()
            || dst.region.x != 0
            || dst.region.y != 0
            || dst.region.width != dst_width as i32
            || dst.region.height != dst_height as i32
            || dst.region.depth != 1
            || src.region.x != 0
            || src.region.y != 0
            || src.region.width != dst.region.width
            || src.region.height != dst.region.height
            || src.region.depth != 1
        {
            return ImageAspects::empty();
        }

        if dst.format != src.format {
            return ImageAspects::empty();
        }

        let copied = tfu(
            device,
            TfuRequest {
                dst: &dst.image,
                src: &src.image,
                src_level: src.level,
                base_level: dst.level,
                last_level: dst.level,
                src_layer: src.region.z as u32,
                dst_layer: dst.region.z as u32,
                for_mipmap: false,
            },
        );

        if copied {
            ImageAspects::COLOR
        } else {
            ImageAspects::empty()
        }
    }
}

pub(super) struct TfuRequest<'a> {
    pub(super) dst: &'a Arc<Image>,
    pub(super) src: &'a Arc<Image>,
    pub(super) src_level: u32,
    pub(super) base_level: u32,
    pub(super) last_level: u32,
    pub(super) src_layer: u32,
    pub(super) dst_layer: u32,
    pub(super) for_mipmap: bool,
}

/// Submits a copy-unit job, or returns `false` if the unit can't perform the copy.
///
/// With `for_mipmap`, levels `base_level + 1 ..= last_level` are generated from `base_level`.
pub(super) fn tfu(device: &Device, request: TfuRequest<'_>) -> bool {
    let TfuRequest {
        dst,
        src,
        src_level,
        base_level,
        last_level,
        src_layer,
        dst_layer,
        for_mipmap,
    } = request;

    let msaa_scale = if dst.samples().is_multisampled() { 2 } else { 1 };
    let [width, height, _] = dst.level_extent(base_level).map(|dim| dim * msaa_scale);

    if src.format() != dst.format() || src.samples() != dst.samples() {
        return false;
    }

    let src_slice = *src.slice(src_level);
    let dst_slice = *dst.slice(base_level);

    // The unit can't write raster images.
    let Some(dst_tiling) = dst_slice.tiling.tiled_index() else {
        return false;
    };

    // Exact copies involve no conversion, so the format can be swapped for one the unit handles
    // with the same texel size.
    let format = if for_mipmap {
        Some(dst.format())
    } else {
        Format::tfu_copy_format(dst.format().block_size())
    };

    let Some(tex_format) = format
        .and_then(Format::texture_data_format)
        .filter(|tex_format| tex_format.supported_by_tfu(for_mipmap))
    else {
        assert!(for_mipmap, "the copy format of {:?} is unsupported", dst.format());
        return false;
    };

    device.flush_jobs_writing(src);
    device.flush_jobs_reading(dst);

    let mut job = TfuJob {
        dst: dst.handle(),
        src: (src != dst).then(|| src.handle()),
        ios: (height << 16) | width,
        iia: src.layer_offset(src_level, src_layer) as u32,
        iis: 0,
        icfg: 0,
        ioa: dst.layer_offset(base_level, dst_layer) as u32,
    };

    job.icfg |= match src_slice.tiling.tiled_index() {
        None => ICFG_FORMAT_RASTER,
        Some(index) => ICFG_FORMAT_LINEARTILE + index,
    } << ICFG_FORMAT_SHIFT;

    if last_level != base_level {
        job.ioa |= IOA_DIMTW;
    }

    job.ioa |= (IOA_FORMAT_LINEARTILE + dst_tiling) << IOA_FORMAT_SHIFT;

    job.icfg |= (tex_format as u32) << ICFG_TTYPE_SHIFT;
    job.icfg |= (last_level - base_level) << ICFG_NUMMM_SHIFT;

    let src_cpp = src.format().block_size();

    match src_slice.tiling {
        TilingMode::UifNoXor | TilingMode::UifXor => {
            job.iis |= src_slice.padded_height / (2 * utile_height(src_cpp));
        }
        TilingMode::Raster => {
            job.iis |= src_slice.stride / src_cpp;
        }
        TilingMode::LinearTile | TilingMode::UbLinear1Column | TilingMode::UbLinear2Column => (),
    }

    // When writing a base level, the unit needs to know how many UIF blocks of padding follow the
    // rows it writes. The layout of further levels is implied.
    if dst_slice.tiling.is_uif() {
        let uif_block_height = 2 * utile_height(dst.format().block_size());
        let implicit_padded_height = height.next_multiple_of(uif_block_height);
        let padding = dst_slice.padded_height.saturating_sub(implicit_padded_height);

        job.icfg |= (padding / uif_block_height) << ICFG_OPAD_SHIFT;
    }

    if let Err(err) = device.backend().submit_tfu(&job) {
        tracing::warn!(%err, "failed to submit TFU job");
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::{TfuCopy, ICFG_FORMAT_SHIFT, IOA_FORMAT_SHIFT};
    use crate::{
        blit::{BlitInfo, BlitScissor, BlitStrategy},
        format::{Format, TextureDataFormat},
        image::{Image, ImageAspects, ImageCreateInfo, ImageTiling, SampleCount},
        tests::Event,
        VulkanError,
    };

    fn create(
        device: &std::sync::Arc<crate::device::Device>,
        create_info: ImageCreateInfo,
    ) -> std::sync::Arc<Image> {
        Image::new(device.clone(), create_info).unwrap()
    }

    #[test]
    fn registers_of_raster_to_uif_copy() {
        let (device, backend) = test_device!(with_backend);

        let src = create(
            &device,
            ImageCreateInfo {
                format: Format::R8G8B8A8_SRGB,
                extent: [128, 64, 1],
                tiling: ImageTiling::Linear,
                ..Default::default()
            },
        );
        let dst = create(
            &device,
            ImageCreateInfo {
                format: Format::R8G8B8A8_SRGB,
                extent: [128, 64, 1],
                ..Default::default()
            },
        );

        let info = BlitInfo::images(src.clone(), dst.clone());
        assert_eq!(TfuCopy.try_apply(&device, &info), ImageAspects::COLOR);

        let job = backend
            .events()
            .into_iter()
            .find_map(|e| match e {
                Event::SubmitTfu(job) => Some(job),
                _ => None,
            })
            .unwrap();

        assert_eq!(job.ios, (64 << 16) | 128);
        assert_eq!(job.src, Some(src.handle()));
        // Raster input, stride in texels.
        assert_eq!((job.icfg >> ICFG_FORMAT_SHIFT) & 0xf, 0);
        assert_eq!(job.iis, 128);
        // Reinterpreted as a 32-bit float copy.
        assert_eq!((job.icfg >> 9) & 0x7f, TextureDataFormat::R32f as u32);
        // UIF output without mip generation.
        assert_eq!(job.ioa & 1, 0);
        assert_eq!((job.ioa >> IOA_FORMAT_SHIFT) & 0x7, 3 + 3);
        assert_eq!(job.ioa & !0xff, dst.layer_offset(0, 0) as u32 & !0xff);

        // Writers of the source and readers of the destination are flushed first.
        let events = backend.events();
        let submit = events
            .iter()
            .position(|e| matches!(e, Event::SubmitTfu(_)))
            .unwrap();
        assert!(events[..submit]
            .iter()
            .any(|e| matches!(e, Event::FlushWriting(image) if *image == src.handle())));
        assert!(events[..submit]
            .iter()
            .any(|e| matches!(e, Event::FlushReading(image) if *image == dst.handle())));
    }

    #[test]
    fn declines() {
        let (device, backend) = test_device!(with_backend);

        let color = |tiling, samples| ImageCreateInfo {
            format: Format::R8G8B8A8_UNORM,
            extent: [32, 32, 1],
            tiling,
            samples,
            ..Default::default()
        };
        let tiled = create(&device, color(ImageTiling::Optimal, SampleCount::Sample1));
        let raster = create(&device, color(ImageTiling::Linear, SampleCount::Sample1));
        let msaa = create(&device, color(ImageTiling::Optimal, SampleCount::Sample4));

        let cases = [
            // Raster destination.
            BlitInfo::images(tiled.clone(), raster.clone()),
            // Sample count mismatch.
            BlitInfo::images(msaa.clone(), tiled.clone()),
            // Scissor.
            BlitInfo {
                scissor: Some(BlitScissor::default()),
                ..BlitInfo::images(tiled.clone(), tiled.clone())
            },
            // Partial level.
            {
                let mut info = BlitInfo::images(raster.clone(), tiled.clone());
                info.dst.region.width = 16;
                info.src.region.width = 16;
                info
            },
            // Scaling.
            {
                let mut info = BlitInfo::images(raster.clone(), tiled.clone());
                info.src.region.width = 16;
                info
            },
            // Conversion.
            {
                let mut info = BlitInfo::images(raster.clone(), tiled.clone());
                info.src.format = Format::R8G8B8A8_SRGB;
                info
            },
            // Nothing to copy.
            BlitInfo {
                aspects: ImageAspects::empty(),
                ..BlitInfo::images(raster.clone(), tiled.clone())
            },
        ];

        for info in &cases {
            assert_eq!(TfuCopy.try_apply(&device, info), ImageAspects::empty());
        }

        assert_eq!(backend.count(|e| matches!(e, Event::SubmitTfu(_))), 0);
    }

    #[test]
    fn submit_failure_declines() {
        let (device, backend) = test_device!(with_backend);
        backend.fail_next_tfu(VulkanError::DeviceLost);

        let info = |device: &std::sync::Arc<crate::device::Device>| {
            let image = || {
                create(
                    device,
                    ImageCreateInfo {
                        extent: [16, 16, 1],
                        ..Default::default()
                    },
                )
            };
            BlitInfo::images(image(), image())
        };

        assert_eq!(
            TfuCopy.try_apply(&device, &info(&device)),
            ImageAspects::empty()
        );
        assert_eq!(
            TfuCopy.try_apply(&device, &info(&device)),
            ImageAspects::COLOR
        );
    }
}

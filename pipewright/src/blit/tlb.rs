//! Copies through the tile buffer ("TLB").
//!
//! A tile job that loads the source into the tile buffer and stores it to the destination copies
//! one box without going through a shader. Storing a multisampled tile buffer to a single-sampled
//! image resolves it on the way.

use super::{BlitInfo, BlitStrategy, SurfaceView};
use crate::{
    device::{DebugFlags, Device},
    format::{Format, InternalBpp},
    image::ImageAspects,
};
use std::sync::Arc;

/// Tile sizes in pixels, indexed by the tile buffer configuration.
const TILE_SIZES: [[u32; 2]; 7] = [
    [64, 64],
    [64, 32],
    [32, 32],
    [32, 16],
    [16, 16],
    [16, 8],
    [8, 8],
];

/// A tile-buffer job that loads `source` and stores to the color or depth/stencil surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileJob {
    pub color: Option<SurfaceView>,
    pub depth_stencil: Option<SurfaceView>,
    pub source: SurfaceView,
    pub msaa: bool,
    pub double_buffer: bool,
    pub tile_width: u32,
    pub tile_height: u32,
    pub internal_bpp: InternalBpp,
    pub draw_min_x: u32,
    pub draw_min_y: u32,
    pub draw_max_x: u32,
    pub draw_max_y: u32,
    pub draw_width: u32,
    pub draw_height: u32,
    pub draw_tiles_x: u32,
    pub draw_tiles_y: u32,
    pub num_layers: u32,
    /// The aspects that are stored at the end of the job.
    pub store: ImageAspects,
}

/// Copies identical boxes through the tile buffer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TlbCopy;

impl BlitStrategy for TlbCopy {
    fn name(&self) -> &'static str {
        "tlb"
    }

    fn try_apply(&self, device: &Arc<Device>, info: &BlitInfo) -> ImageAspects {
        if device.generation() < 40 || info.aspects.is_empty() {
            return ImageAspects::empty();
        }

        let is_color_blit = info.aspects.intersects(ImageAspects::COLOR);
        let is_depth_blit = info.aspects.intersects(ImageAspects::DEPTH);
        let is_stencil_blit = info.aspects.intersects(ImageAspects::STENCIL);

        assert!(
            is_color_blit != (is_depth_blit || is_stencil_blit),
            "a tile buffer blit copies either color or depth/stencil, got {:?}",
            info.aspects,
        );

        let (src, dst) = (&info.src, &info.dst);

        if info.scissor.is_some() {
            return ImageAspects::empty();
        }

        if src.region.x != dst.region.x
            || src.region.y != dst.region.y
            || src.region.width != dst.region.width
            || src.region.height != dst.region.height
        {
            return ImageAspects::empty();
        }

        // Mirrored copies can't be expressed as a tile job.
        if dst.region.x < 0 || dst.region.y < 0 || dst.region.width < 0 || dst.region.height < 0
        {
            return ImageAspects::empty();
        }

        if is_color_blit && dst.format.is_depth_or_stencil() {
            return ImageAspects::empty();
        }

        let Some(src_rt) = src.format.render_target_format() else {
            return ImageAspects::empty();
        };

        if dst.format.render_target_format() != Some(src_rt) {
            return ImageAspects::empty();
        }

        let src_samples = src.image.samples();
        let dst_samples = dst.image.samples();
        let msaa = src_samples.is_multisampled() || dst_samples.is_multisampled();
        let is_msaa_resolve = src_samples.is_multisampled() && !dst_samples.is_multisampled();

        if is_msaa_resolve && !src.format.supports_tlb_msaa_resolve() {
            return ImageAspects::empty();
        }

        device.flush_jobs_writing(&src.image);

        let double_buffer = device.debug_flags().contains(DebugFlags::DOUBLE_BUFFER) && !msaa;
        let color_formats: &[Format] = if is_color_blit { &[dst.format] } else { &[] };
        let (tile_width, tile_height, max_bpp) =
            tile_buffer_size(msaa, double_buffer, color_formats, src.format);

        let [dst_width, dst_height, _] = dst.level_extent();
        let [src_width, src_height, _] = src.level_extent();
        let [x, y, width, height] = [
            dst.region.x,
            dst.region.y,
            dst.region.width,
            dst.region.height,
        ]
        .map(|v| v as u32);

        // The box must cover whole tiles, except where it reaches the far edge of the surface.
        if is_tile_unaligned(x, tile_width)
            || is_tile_unaligned(y, tile_height)
            || (is_tile_unaligned(width, tile_width) && x + width != dst_width)
            || (is_tile_unaligned(height, tile_height) && y + height != dst_height)
        {
            return ImageAspects::empty();
        }

        let dst_surface = SurfaceView::layer(&dst.image, dst.format, dst.level, dst.region.z as u32);
        let src_surface = SurfaceView::layer(&src.image, src.format, src.level, src.region.z as u32);

        // Loading from a source with a smaller stride than the destination's is invalid, so the
        // frame covers the smaller of the two. The boxes match, so the same tiles are involved.
        let draw_width = dst_width.min(src_width);
        let draw_height = dst_height.min(src_height);

        let mut store = ImageAspects::empty();

        if is_color_blit {
            store |= ImageAspects::COLOR;
        }

        if is_depth_blit {
            store |= ImageAspects::DEPTH;
        }

        if is_stencil_blit {
            store |= ImageAspects::STENCIL;
        }

        let job = TileJob {
            color: is_color_blit.then_some(dst_surface),
            depth_stencil: (!is_color_blit).then_some(dst_surface),
            source: src_surface,
            msaa,
            double_buffer,
            tile_width,
            tile_height,
            internal_bpp: max_bpp,
            draw_min_x: x,
            draw_min_y: y,
            draw_max_x: x + width,
            draw_max_y: y + height,
            draw_width,
            draw_height,
            draw_tiles_x: draw_width.div_ceil(tile_width),
            draw_tiles_y: draw_height.div_ceil(tile_height),
            num_layers: dst.region.depth as u32,
            store,
        };

        tracing::trace!(tile_width, tile_height, ?store, "submitting tile buffer blit");
        device.backend().submit_tile_job(&job);

        store
    }
}

#[inline]
fn is_tile_unaligned(size: u32, tile_size: u32) -> bool {
    size & (tile_size - 1) != 0
}

/// Returns the tile size and the largest internal pixel size for a tile job with the given color
/// attachments and load source.
///
/// Multisampling and double-buffering each take part of the tile buffer, as do more color
/// attachments and larger pixels, which all shrink the tiles.
pub fn tile_buffer_size(
    msaa: bool,
    double_buffer: bool,
    color_formats: &[Format],
    source_format: Format,
) -> (u32, u32, InternalBpp) {
    let max_bpp = color_formats
        .iter()
        .chain([&source_format])
        .filter_map(|format| format.render_target_format())
        .map(|rt| rt.internal_bpp)
        .max()
        .unwrap_or(InternalBpp::Bpp32);

    let mut index = match color_formats.len() {
        0 | 1 => 0,
        2 => 1,
        _ => 2,
    };

    if msaa {
        index += 2;
    } else if double_buffer {
        index += 1;
    }

    index += max_bpp as usize;

    let [width, height] = TILE_SIZES[index.min(TILE_SIZES.len() - 1)];

    (width, height, max_bpp)
}

#[cfg(test)]
mod tests {
    use super::{tile_buffer_size, TlbCopy};
    use crate::{
        blit::{BlitInfo, BlitStrategy},
        device::Device,
        format::{Format, InternalBpp},
        image::{Image, ImageAspects, ImageCreateInfo, SampleCount},
        tests::Event,
    };
    use std::sync::Arc;

    fn image(device: &Arc<Device>, format: Format, extent: [u32; 2], samples: SampleCount) -> Arc<Image> {
        Image::new(
            device.clone(),
            ImageCreateInfo {
                format,
                extent: [extent[0], extent[1], 1],
                samples,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn tile_sizes() {
        let rgba8 = Format::R8G8B8A8_UNORM;
        let rgba16f = Format::R16G16B16A16_SFLOAT;
        let rgba32f = Format::R32G32B32A32_SFLOAT;

        assert_eq!(tile_buffer_size(false, false, &[rgba8], rgba8), (64, 64, InternalBpp::Bpp32));
        assert_eq!(tile_buffer_size(false, true, &[rgba8], rgba8), (64, 32, InternalBpp::Bpp32));
        assert_eq!(tile_buffer_size(true, false, &[rgba8], rgba8), (32, 32, InternalBpp::Bpp32));
        assert_eq!(tile_buffer_size(false, false, &[rgba8], rgba16f), (64, 32, InternalBpp::Bpp64));
        assert_eq!(tile_buffer_size(true, true, &[rgba32f], rgba32f), (16, 16, InternalBpp::Bpp128));
        assert_eq!(
            tile_buffer_size(true, false, &[rgba32f, rgba32f, rgba32f], rgba32f),
            (8, 8, InternalBpp::Bpp128)
        );
        assert_eq!(tile_buffer_size(false, false, &[], Format::D24_UNORM_S8_UINT).0, 64);
    }

    #[test]
    fn resolve_claims_color() {
        let (device, backend) = test_device!(with_backend);
        let src = image(&device, Format::R8G8B8A8_UNORM, [100, 70], SampleCount::Sample4);
        let dst = image(&device, Format::R8G8B8A8_UNORM, [100, 70], SampleCount::Sample1);

        let info = BlitInfo::images(src, dst);
        assert_eq!(TlbCopy.try_apply(&device, &info), ImageAspects::COLOR);

        let job = backend
            .events()
            .into_iter()
            .find_map(|e| match e {
                Event::SubmitTileJob(job) => Some(job),
                _ => None,
            })
            .unwrap();

        assert!(job.msaa);
        assert!(job.color.is_some() && job.depth_stencil.is_none());
        assert_eq!((job.tile_width, job.tile_height), (32, 32));
        assert_eq!((job.draw_width, job.draw_height), (100, 70));
        assert_eq!((job.draw_tiles_x, job.draw_tiles_y), (4, 3));
        assert_eq!(job.num_layers, 1);
    }

    #[test]
    fn alignment_except_at_far_edge() {
        let device = test_device!();
        let src = image(&device, Format::R8G8B8A8_UNORM, [100, 100], SampleCount::Sample1);
        let dst = image(&device, Format::R8G8B8A8_UNORM, [100, 100], SampleCount::Sample1);

        let with_box = |x: i32, y: i32, width: i32, height: i32| {
            let mut info = BlitInfo::images(src.clone(), dst.clone());
            for region in [&mut info.src.region, &mut info.dst.region] {
                region.x = x;
                region.y = y;
                region.width = width;
                region.height = height;
            }
            TlbCopy.try_apply(&device, &info)
        };

        // Tiles are 64x64 here.
        assert_eq!(with_box(64, 0, 36, 64), ImageAspects::COLOR);
        assert_eq!(with_box(0, 0, 64, 100), ImageAspects::COLOR);
        assert_eq!(with_box(32, 0, 64, 64), ImageAspects::empty());
        assert_eq!(with_box(0, 0, 36, 64), ImageAspects::empty());
        assert_eq!(with_box(0, 64, 64, 30), ImageAspects::empty());
    }

    #[test]
    fn declines() {
        let device33 = test_device!(generation: 33);
        let old = BlitInfo::images(
            image(&device33, Format::R8G8B8A8_UNORM, [64, 64], SampleCount::Sample1),
            image(&device33, Format::R8G8B8A8_UNORM, [64, 64], SampleCount::Sample1),
        );
        assert_eq!(TlbCopy.try_apply(&device33, &old), ImageAspects::empty());

        let device = test_device!();
        let rgba8 = image(&device, Format::R8G8B8A8_UNORM, [64, 64], SampleCount::Sample1);

        // Different render target encodings.
        let rgba16f = image(&device, Format::R16G16B16A16_SFLOAT, [64, 64], SampleCount::Sample1);
        let info = BlitInfo {
            aspects: ImageAspects::COLOR,
            ..BlitInfo::images(rgba8.clone(), rgba16f)
        };
        assert_eq!(TlbCopy.try_apply(&device, &info), ImageAspects::empty());

        // 32-bit float data can't be resolved.
        let msaa = image(&device, Format::R32_SFLOAT, [64, 64], SampleCount::Sample4);
        let single = image(&device, Format::R32_SFLOAT, [64, 64], SampleCount::Sample1);
        assert_eq!(
            TlbCopy.try_apply(&device, &BlitInfo::images(msaa, single)),
            ImageAspects::empty()
        );

        // Not a render target format.
        let snorm = image(&device, Format::R8G8B8A8_SNORM, [64, 64], SampleCount::Sample1);
        assert_eq!(
            TlbCopy.try_apply(&device, &BlitInfo::images(snorm.clone(), snorm)),
            ImageAspects::empty()
        );

        // Boxes at different positions.
        let mut info = BlitInfo::images(rgba8.clone(), rgba8);
        info.dst.region.x = 32;
        info.dst.region.width = 32;
        info.src.region.width = 32;
        assert_eq!(TlbCopy.try_apply(&device, &info), ImageAspects::empty());
    }

    #[test]
    fn depth_stencil_store() {
        let (device, backend) = test_device!(with_backend);
        let src = image(&device, Format::D24_UNORM_S8_UINT, [64, 64], SampleCount::Sample1);
        let dst = image(&device, Format::D24_UNORM_S8_UINT, [64, 64], SampleCount::Sample1);

        let info = BlitInfo::images(src, dst);
        assert_eq!(
            TlbCopy.try_apply(&device, &info),
            ImageAspects::DEPTH | ImageAspects::STENCIL
        );

        let job = backend
            .events()
            .into_iter()
            .find_map(|e| match e {
                Event::SubmitTileJob(job) => Some(job),
                _ => None,
            })
            .unwrap();
        assert!(job.color.is_none() && job.depth_stencil.is_some());
        assert_eq!(job.store, ImageAspects::DEPTH | ImageAspects::STENCIL);
    }

    #[test]
    fn color_and_depth_together() {
        let device = test_device!();
        let src = image(&device, Format::R8G8B8A8_UNORM, [64, 64], SampleCount::Sample1);
        let info = BlitInfo {
            aspects: ImageAspects::COLOR | ImageAspects::DEPTH,
            ..BlitInfo::images(src.clone(), src)
        };

        assert_should_panic!(
            "a tile buffer blit copies either color or depth/stencil",
            {
                TlbCopy.try_apply(&device, &info);
            }
        );
    }
}

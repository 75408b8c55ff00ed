//! The general blit path: drawing a textured quad.

use super::{BlitBox, BlitInfo, BlitStrategy, CopyRegion, GenericBlit, SurfaceView};
use crate::{
    device::Device,
    image::{Image, ImageAspects, ImageCreateInfo, ImageType},
    pipeline::graphics::color_blend::ColorComponents,
    Validated, VulkanError,
};
use std::sync::Arc;

/// Blits by sampling the source in a fragment shader. This can scale, filter, convert between
/// formats and resolve multisampled images, as far as the backend supports it.
///
/// The texture unit can only read raster images in one dimension, so a raster 2D or 3D source
/// is first copied into a tiled scratch image.
#[derive(Clone, Copy, Debug, Default)]
pub struct RenderBlit;

impl BlitStrategy for RenderBlit {
    fn name(&self) -> &'static str {
        "render"
    }

    fn try_apply(&self, device: &Arc<Device>, info: &BlitInfo) -> ImageAspects {
        if info.aspects.is_empty() {
            return ImageAspects::empty();
        }

        let is_raster = !info.src.image.is_tiled();
        let scratch = if is_raster && info.src.image.image_type() != ImageType::Dim1d {
            match copy_to_tiled(device, info) {
                Ok(scratch) => Some(scratch),
                Err(err) => {
                    tracing::warn!(%err, "failed to create the tiled blit source");
                    return ImageAspects::empty();
                }
            }
        } else {
            None
        };

        let mut src = info.src.clone();

        if let Some(scratch) = &scratch {
            src.image = scratch.clone();
            src.level = 0;
            src.region.z = 0;
        }

        let dst = &info.dst;

        let blit = GenericBlit {
            dst: SurfaceView {
                last_layer: (dst.region.z + dst.region.depth - 1) as u32,
                ..SurfaceView::layer(&dst.image, dst.format, dst.level, dst.region.z as u32)
            },
            dst_box: dst.region,
            src: SurfaceView {
                last_layer: (src.region.z + src.region.depth - 1) as u32,
                ..SurfaceView::layer(&src.image, src.format, src.level, src.region.z as u32)
            },
            src_box: src.region,
            src_extent: {
                let [width, height, _] = src.image.extent();
                [width, height]
            },
            aspects: info.aspects,
            write_mask: ColorComponents::all(),
            filter: info.filter,
            scissor: info.scissor,
            alpha_blend: info.alpha_blend,
        };

        if !device.backend().is_blit_supported(&blit) {
            tracing::warn!("blit unsupported {:?} -> {:?}", src.format, dst.format);
            return ImageAspects::empty();
        }

        device.backend().blit_generic(&blit);

        info.aspects
    }
}

/// Copies the source layers of a raster image into a new single-level tiled image, whose layers
/// start at 0.
fn copy_to_tiled(
    device: &Arc<Device>,
    info: &BlitInfo,
) -> Result<Arc<Image>, Validated<VulkanError>> {
    let src = &info.src;
    let [width, height, _] = src.level_extent();
    let layers = src.region.depth as u32;
    let is_3d = src.image.image_type() == ImageType::Dim3d;

    let scratch = Image::new(
        device.clone(),
        ImageCreateInfo {
            image_type: src.image.image_type(),
            format: src.image.format(),
            extent: [width, height, if is_3d { layers } else { 1 }],
            array_layers: if is_3d { 1 } else { layers },
            ..Default::default()
        },
    )?;

    for layer in 0..layers {
        device.backend().copy_region(&CopyRegion {
            src: src.image.handle(),
            src_level: src.level,
            src_box: BlitBox {
                x: 0,
                y: 0,
                z: src.region.z + layer as i32,
                width: width as i32,
                height: height as i32,
                depth: 1,
            },
            dst: scratch.handle(),
            dst_level: 0,
            dst_offset: [0, 0, layer],
        });
    }

    Ok(scratch)
}

#[cfg(test)]
mod tests {
    use super::RenderBlit;
    use crate::{
        blit::{BlitInfo, BlitStrategy},
        device::Device,
        format::Format,
        image::{Image, ImageAspects, ImageCreateInfo, ImageTiling, ImageType},
        sampler::Filter,
        tests::Event,
    };
    use std::sync::Arc;

    fn image(
        device: &Arc<Device>,
        image_type: ImageType,
        extent: [u32; 3],
        tiling: ImageTiling,
    ) -> Arc<Image> {
        Image::new(
            device.clone(),
            ImageCreateInfo {
                image_type,
                format: Format::R8G8B8A8_UNORM,
                extent,
                tiling,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn scales_with_filter() {
        let (device, backend) = test_device!(with_backend);
        let src = image(&device, ImageType::Dim2d, [64, 64, 1], ImageTiling::Optimal);
        let dst = image(&device, ImageType::Dim2d, [16, 16, 1], ImageTiling::Optimal);

        let info = BlitInfo {
            filter: Filter::Linear,
            ..BlitInfo::images(src, dst)
        };
        assert_eq!(RenderBlit.try_apply(&device, &info), ImageAspects::COLOR);

        let blit = backend
            .events()
            .into_iter()
            .find_map(|e| match e {
                Event::BlitGeneric(blit) => Some(blit),
                _ => None,
            })
            .unwrap();
        assert_eq!(blit.filter, Filter::Linear);
        assert_eq!(blit.src_box.width, 64);
        assert_eq!(blit.dst_box.width, 16);
        assert_eq!(blit.src_extent, [64, 64]);
        assert_eq!(backend.count(|e| matches!(e, Event::CopyRegion(_))), 0);
    }

    #[test]
    fn raster_3d_slice_is_copied() {
        let (device, backend) = test_device!(with_backend);
        let src = image(&device, ImageType::Dim3d, [16, 16, 4], ImageTiling::Linear);
        let dst = image(&device, ImageType::Dim2d, [16, 16, 1], ImageTiling::Optimal);

        let mut info = BlitInfo::images(src.clone(), dst);
        info.src.region.z = 3;
        assert_eq!(RenderBlit.try_apply(&device, &info), ImageAspects::COLOR);

        let copy = backend
            .events()
            .into_iter()
            .find_map(|e| match e {
                Event::CopyRegion(copy) => Some(copy),
                _ => None,
            })
            .unwrap();
        assert_eq!(copy.src, src.handle());
        assert_eq!(copy.src_box.z, 3);
        assert_eq!(copy.src_box.depth, 1);

        let blit = backend
            .events()
            .into_iter()
            .find_map(|e| match e {
                Event::BlitGeneric(blit) => Some(blit),
                _ => None,
            })
            .unwrap();
        assert_eq!(blit.src.image, copy.dst);
        assert_eq!(blit.src_box.z, 0);
    }

    #[test]
    fn raster_layers_are_all_copied() {
        let (device, backend) = test_device!(with_backend);
        let src = Image::new(
            device.clone(),
            ImageCreateInfo {
                format: Format::R8G8B8A8_UNORM,
                extent: [16, 16, 1],
                array_layers: 3,
                tiling: ImageTiling::Linear,
                ..Default::default()
            },
        )
        .unwrap();
        let dst = Image::new(
            device.clone(),
            ImageCreateInfo {
                format: Format::R8G8B8A8_UNORM,
                extent: [16, 16, 1],
                array_layers: 2,
                ..Default::default()
            },
        )
        .unwrap();

        let mut info = BlitInfo::images(src.clone(), dst);
        info.src.region.z = 1;
        info.src.region.depth = 2;
        info.dst.region.depth = 2;
        assert_eq!(RenderBlit.try_apply(&device, &info), ImageAspects::COLOR);

        let copies: Vec<_> = backend
            .events()
            .into_iter()
            .filter_map(|e| match e {
                Event::CopyRegion(copy) => Some(copy),
                _ => None,
            })
            .collect();
        assert_eq!(copies.len(), 2);
        assert_eq!(copies[0].src_box.z, 1);
        assert_eq!(copies[1].src_box.z, 2);
        assert_eq!(copies[1].dst_offset, [0, 0, 1]);

        let scratch = backend
            .events()
            .into_iter()
            .find_map(|e| match e {
                Event::CreateImage {
                    image,
                    extent,
                    array_layers,
                    ..
                } if image == copies[0].dst => Some((extent, array_layers)),
                _ => None,
            })
            .unwrap();
        assert_eq!(scratch, ([16, 16, 1], 2));

        let blit = backend
            .events()
            .into_iter()
            .find_map(|e| match e {
                Event::BlitGeneric(blit) => Some(blit),
                _ => None,
            })
            .unwrap();
        assert_eq!(blit.src.image, copies[0].dst);
        assert_eq!((blit.src.first_layer, blit.src.last_layer), (0, 1));
        assert_eq!((blit.dst.first_layer, blit.dst.last_layer), (0, 1));
    }

    #[test]
    fn raster_1d_is_sampled_directly() {
        let (device, backend) = test_device!(with_backend);
        let src = image(&device, ImageType::Dim1d, [64, 1, 1], ImageTiling::Optimal);
        let dst = image(&device, ImageType::Dim1d, [64, 1, 1], ImageTiling::Optimal);

        let info = BlitInfo::images(src, dst);
        assert_eq!(RenderBlit.try_apply(&device, &info), ImageAspects::COLOR);
        assert_eq!(backend.count(|e| matches!(e, Event::CopyRegion(_))), 0);
    }

    #[test]
    fn empty_request() {
        let (device, backend) = test_device!(with_backend);
        let src = image(&device, ImageType::Dim2d, [4, 4, 1], ImageTiling::Optimal);

        let info = BlitInfo {
            aspects: ImageAspects::empty(),
            ..BlitInfo::images(src.clone(), src)
        };
        assert_eq!(RenderBlit.try_apply(&device, &info), ImageAspects::empty());
        assert_eq!(backend.count(|e| matches!(e, Event::BlitGeneric(_))), 0);
    }
}

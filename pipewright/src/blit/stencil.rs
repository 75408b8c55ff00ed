//! Stencil copies through the color path.
//!
//! The textured-quad blitter can't write stencil, so the stencil data is viewed as an integer
//! color image and only the red channel, which holds the stencil bits, is written.

use super::{BlitInfo, BlitStrategy, GenericBlit, SurfaceView};
use crate::{
    device::Device,
    format::Format,
    image::{minify, Image, ImageAspects, ImageType},
    pipeline::graphics::color_blend::ColorComponents,
    sampler::Filter,
};
use std::sync::Arc;

/// Copies the stencil aspect by reinterpreting it as color.
///
/// Packed depth/stencil images are viewed as `R8G8B8A8_UINT`, whose red channel overlaps the
/// stencil byte. Separate stencil planes are viewed as `R8_UINT`.
#[derive(Clone, Copy, Debug, Default)]
pub struct StencilAsColor;

impl BlitStrategy for StencilAsColor {
    fn name(&self) -> &'static str {
        "stencil"
    }

    fn try_apply(&self, device: &Arc<Device>, info: &BlitInfo) -> ImageAspects {
        if !info.aspects.intersects(ImageAspects::STENCIL) {
            return ImageAspects::empty();
        }

        let (src_image, src_format) = stencil_view(&info.src.image);
        let (dst_image, dst_format) = stencil_view(&info.dst.image);

        let dst = SurfaceView::layer(
            dst_image,
            dst_format,
            info.dst.level,
            info.dst.region.z as u32,
        );

        // The source view covers every layer of the level, the box selects among them.
        let last_layer = if src_image.image_type() == ImageType::Dim3d {
            minify(src_image.extent()[2], info.src.level) - 1
        } else {
            src_image.array_layers() - 1
        };

        let src = SurfaceView {
            image: src_image.handle(),
            format: src_format,
            level: info.src.level,
            first_layer: 0,
            last_layer,
        };

        let [src_width, src_height, _] = src_image.extent();

        device.backend().blit_generic(&GenericBlit {
            dst,
            dst_box: info.dst.region,
            src,
            src_box: info.src.region,
            src_extent: [src_width, src_height],
            aspects: ImageAspects::COLOR,
            write_mask: ColorComponents::R,
            filter: Filter::Nearest,
            scissor: info.scissor,
            alpha_blend: info.alpha_blend,
        });

        ImageAspects::STENCIL
    }
}

fn stencil_view(image: &Arc<Image>) -> (&Arc<Image>, Format) {
    match image.separate_stencil() {
        Some(stencil) => (stencil, Format::R8_UINT),
        None => (image, Format::R8G8B8A8_UINT),
    }
}

#[cfg(test)]
mod tests {
    use super::StencilAsColor;
    use crate::{
        blit::{BlitInfo, BlitStrategy},
        device::Device,
        format::Format,
        image::{Image, ImageAspects, ImageCreateInfo},
        pipeline::graphics::color_blend::ColorComponents,
        sampler::Filter,
        tests::Event,
    };
    use std::sync::Arc;

    fn image(device: &Arc<Device>, format: Format, array_layers: u32) -> Arc<Image> {
        Image::new(
            device.clone(),
            ImageCreateInfo {
                format,
                extent: [32, 16, 1],
                array_layers,
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn generic_blits(events: Vec<Event>) -> Vec<crate::blit::GenericBlit> {
        events
            .into_iter()
            .filter_map(|e| match e {
                Event::BlitGeneric(blit) => Some(blit),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn packed_stencil_as_rgba8() {
        let (device, backend) = test_device!(with_backend);
        let src = image(&device, Format::D24_UNORM_S8_UINT, 3);
        let dst = image(&device, Format::D24_UNORM_S8_UINT, 1);

        let mut info = BlitInfo::images(src.clone(), dst);
        info.src.region.z = 2;
        info.filter = Filter::Linear;

        // Depth is left for another strategy.
        assert_eq!(
            StencilAsColor.try_apply(&device, &info),
            ImageAspects::STENCIL
        );

        let blits = generic_blits(backend.events());
        assert_eq!(blits.len(), 1);

        let blit = &blits[0];
        assert_eq!(blit.src.image, src.handle());
        assert_eq!(blit.src.format, Format::R8G8B8A8_UINT);
        assert_eq!(blit.dst.format, Format::R8G8B8A8_UINT);
        assert_eq!((blit.src.first_layer, blit.src.last_layer), (0, 2));
        assert_eq!(blit.src_box.z, 2);
        assert_eq!(blit.write_mask, ColorComponents::R);
        assert_eq!(blit.filter, Filter::Nearest);
        assert_eq!(blit.aspects, ImageAspects::COLOR);
    }

    #[test]
    fn separate_stencil_as_r8() {
        let (device, backend) = test_device!(with_backend);
        let src = image(&device, Format::D32_SFLOAT_S8_UINT, 1);
        let dst = image(&device, Format::D24_UNORM_S8_UINT, 1);
        let stencil = src.separate_stencil().unwrap().handle();

        let info = BlitInfo {
            aspects: ImageAspects::STENCIL,
            ..BlitInfo::images(src, dst)
        };
        assert_eq!(
            StencilAsColor.try_apply(&device, &info),
            ImageAspects::STENCIL
        );

        let blits = generic_blits(backend.events());
        assert_eq!(blits[0].src.image, stencil);
        assert_eq!(blits[0].src.format, Format::R8_UINT);
        assert_eq!(blits[0].dst.format, Format::R8G8B8A8_UINT);
    }

    #[test]
    fn declines_without_stencil() {
        let (device, backend) = test_device!(with_backend);
        let src = image(&device, Format::D24_UNORM_S8_UINT, 1);
        let info = BlitInfo {
            aspects: ImageAspects::DEPTH,
            ..BlitInfo::images(src.clone(), src)
        };

        assert_eq!(
            StencilAsColor.try_apply(&device, &info),
            ImageAspects::empty()
        );
        assert!(generic_blits(backend.events()).is_empty());
    }
}

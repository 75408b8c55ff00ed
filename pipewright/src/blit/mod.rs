//! Copying and resampling between images.
//!
//! A blit request is carried out by a cascade of strategies, each one routing around a different
//! hardware limitation. The strategies are tried in a fixed order:
//!
//! 1. [`SandRepack`] turns a column-interleaved video plane into a tiled image with a custom
//!    shader.
//! 2. [`TfuCopy`] uses the fixed-function copy unit for exact full-level color copies.
//! 3. [`TlbCopy`] loads the source into the tile buffer and stores it to the destination, which
//!    also resolves multisampled images.
//! 4. [`StencilAsColor`] copies stencil planes by reinterpreting them as integer color images.
//! 5. [`RenderBlit`] draws a textured quad, the general path that can scale and convert.
//!
//! Each strategy inspects the request and returns the aspects it took care of, or an empty set if
//! it declines. The [`Blitter`] removes the claimed aspects from [`BlitInfo::aspects`] and stops as
//! soon as nothing is left. Aspects that no strategy claimed stay in the mask after the call.

pub use self::{
    render::RenderBlit,
    sand::{BuiltinShader, CustomShaderDraw, SandRepack, SourceRange},
    stencil::StencilAsColor,
    tfu::{TfuCopy, TfuJob},
    tlb::{TileJob, TlbCopy},
};
use crate::{
    device::Device,
    format::Format,
    image::{Image, ImageAspects, ImageType},
    pipeline::graphics::color_blend::ColorComponents,
    sampler::Filter,
    ValidationError,
};
use ash::vk;
use std::{
    fmt::{Debug, Error as FmtError, Formatter},
    sync::Arc,
};

mod render;
mod sand;
mod stencil;
mod tfu;
mod tlb;

/// One step of the blit cascade.
pub trait BlitStrategy: Send + Sync {
    /// Returns the name used when logging the cascade.
    fn name(&self) -> &'static str;

    /// Performs whatever part of `info` the strategy can, and returns the aspects it satisfied.
    ///
    /// A strategy that declines returns an empty set and has no side effects.
    fn try_apply(&self, device: &Arc<Device>, info: &BlitInfo) -> ImageAspects;
}

/// Carries out blit requests on a device.
pub struct Blitter {
    device: Arc<Device>,
    strategies: Vec<Box<dyn BlitStrategy>>,
}

impl Blitter {
    /// Creates a `Blitter` with the standard cascade.
    pub fn new(device: Arc<Device>) -> Self {
        let strategies: Vec<Box<dyn BlitStrategy>> = vec![
            Box::new(SandRepack::new(device.clone())),
            Box::new(TfuCopy),
            Box::new(TlbCopy),
            Box::new(StencilAsColor),
            Box::new(RenderBlit),
        ];

        Self::with_strategies(device, strategies)
    }

    /// Creates a `Blitter` that tries `strategies` in order.
    #[inline]
    pub fn with_strategies(device: Arc<Device>, strategies: Vec<Box<dyn BlitStrategy>>) -> Self {
        Blitter { device, strategies }
    }

    /// Returns the device that the blitter works on.
    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Performs the blit described by `info`.
    ///
    /// On return, `info.aspects` holds the aspects that no strategy could handle. All work queued
    /// against the destination image has been submitted.
    pub fn blit(&self, info: &mut BlitInfo) -> Result<(), Box<ValidationError>> {
        self.validate_blit(info)?;

        unsafe { self.blit_unchecked(info) };

        Ok(())
    }

    fn validate_blit(&self, info: &BlitInfo) -> Result<(), Box<ValidationError>> {
        // VUID-vkCmdBlitImage2-commonparent
        assert_eq!(&self.device, info.src.image.device());
        assert_eq!(&self.device, info.dst.image.device());

        info.validate()
            .map_err(|err| err.add_context("info"))?;

        Ok(())
    }

    #[cfg_attr(not(feature = "document_unchecked"), doc(hidden))]
    pub unsafe fn blit_unchecked(&self, info: &mut BlitInfo) {
        for strategy in &self.strategies {
            if info.aspects.is_empty() {
                break;
            }

            // A strategy can only ever remove aspects from the request.
            let claimed = strategy.try_apply(&self.device, info) & info.aspects;

            tracing::debug!(
                strategy = strategy.name(),
                ?claimed,
                remaining = ?(info.aspects - claimed),
                "blit strategy done",
            );

            info.aspects -= claimed;
        }

        if !info.aspects.is_empty() {
            tracing::debug!(
                aspects = ?info.aspects,
                src = ?info.src.format,
                dst = ?info.dst.format,
                "no blit strategy handled these aspects",
            );
        }

        // Blits are unlikely to be followed by work that reuses their jobs, and keeping them
        // queued across a long series of uploads runs out of memory.
        self.device.flush_jobs_writing(&info.dst.image);
    }

    /// Fills mip levels `base_level + 1 ..= last_level` of one layer of `image` from
    /// `base_level`, using the fixed-function copy unit.
    ///
    /// Returns `false` if the copy unit can't do it, in which case the caller has to fall back to
    /// another method.
    pub fn generate_mipmap(
        &self,
        image: &Arc<Image>,
        format: Format,
        base_level: u32,
        last_level: u32,
        first_layer: u32,
        last_layer: u32,
    ) -> bool {
        assert_eq!(&self.device, image.device());
        assert!(base_level <= last_level && last_level < image.mip_levels());

        if format != image.format() {
            return false;
        }

        // Array layers could be looped over, but 3D images can't be handled at all.
        if first_layer != last_layer {
            return false;
        }

        tfu::tfu(
            &self.device,
            tfu::TfuRequest {
                dst: image,
                src: image,
                src_level: base_level,
                base_level,
                last_level,
                src_layer: first_layer,
                dst_layer: first_layer,
                for_mipmap: true,
            },
        )
    }
}

impl Debug for Blitter {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.debug_struct("Blitter")
            .field("device", &self.device)
            .field(
                "strategies",
                &self.strategies.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Parameters of a blit.
#[derive(Clone, Debug)]
pub struct BlitInfo {
    /// The surface to read from.
    ///
    /// There is no default value.
    pub src: BlitSurface,

    /// The surface to write to.
    ///
    /// There is no default value.
    pub dst: BlitSurface,

    /// The aspects that remain to be copied. The blitter removes aspects from this as strategies
    /// handle them.
    ///
    /// The default value is the aspects that both formats have.
    pub aspects: ImageAspects,

    /// The filter used when the source and destination regions differ in size.
    ///
    /// The default value is [`Filter::Nearest`].
    pub filter: Filter,

    /// If set, only pixels inside this rectangle of the destination are written.
    ///
    /// The default value is `None`.
    pub scissor: Option<BlitScissor>,

    /// Whether the source is blended onto the destination instead of replacing it.
    ///
    /// The default value is `false`.
    pub alpha_blend: bool,

    pub _ne: crate::NonExhaustive,
}

impl BlitInfo {
    /// Returns a `BlitInfo` that copies the whole base level of `src_image` to the base level of
    /// `dst_image`, scaling if the sizes differ.
    #[inline]
    pub fn images(src_image: Arc<Image>, dst_image: Arc<Image>) -> Self {
        let aspects = src_image.format().aspects() & dst_image.format().aspects();

        Self {
            src: BlitSurface::whole_level(src_image, 0),
            dst: BlitSurface::whole_level(dst_image, 0),
            aspects,
            filter: Filter::Nearest,
            scissor: None,
            alpha_blend: false,
            _ne: crate::NonExhaustive(()),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Box<ValidationError>> {
        let &Self {
            ref src,
            ref dst,
            aspects,
            filter: _,
            scissor,
            alpha_blend: _,
            _ne: _,
        } = self;

        src.validate().map_err(|err| err.add_context("src"))?;
        dst.validate().map_err(|err| err.add_context("dst"))?;

        if !(src.format.aspects() & dst.format.aspects()).contains(aspects) {
            return Err(Box::new(ValidationError {
                context: "aspects".into(),
                problem: "contains aspects that `src.format` or `dst.format` don't have".into(),
                vuids: &["VUID-VkImageBlit2-aspectMask-00238"],
                ..Default::default()
            }));
        }

        if let Some(scissor) = scissor {
            if scissor.min_x > scissor.max_x || scissor.min_y > scissor.max_y {
                return Err(Box::new(ValidationError {
                    context: "scissor".into(),
                    problem: "the minimum is greater than the maximum".into(),
                    ..Default::default()
                }));
            }
        }

        Ok(())
    }
}

/// One side of a blit.
#[derive(Clone, Debug)]
pub struct BlitSurface {
    /// The image.
    pub image: Arc<Image>,

    /// The format the image is viewed as. It must have the same texel size as the image's own
    /// format.
    pub format: Format,

    /// The mip level.
    pub level: u32,

    /// The region of the mip level. For 3D images `z` and `depth` select depth slices, for other
    /// images they select array layers.
    pub region: BlitBox,
}

impl BlitSurface {
    /// Returns a `BlitSurface` covering the first layer of mip level `level` of `image`.
    #[inline]
    pub fn whole_level(image: Arc<Image>, level: u32) -> Self {
        let [width, height, _] = image.level_extent(level);

        Self {
            format: image.format(),
            level,
            region: BlitBox {
                x: 0,
                y: 0,
                z: 0,
                width: width as i32,
                height: height as i32,
                depth: 1,
            },
            image,
        }
    }

    /// Returns the size in texels of the surface's mip level.
    #[inline]
    pub fn level_extent(&self) -> [u32; 3] {
        self.image.level_extent(self.level)
    }

    /// Returns the number of layers (or depth slices, for 3D images) of the surface's mip level.
    #[inline]
    pub fn level_layers(&self) -> u32 {
        if self.image.image_type() == ImageType::Dim3d {
            self.level_extent()[2]
        } else {
            self.image.array_layers()
        }
    }

    fn validate(&self) -> Result<(), Box<ValidationError>> {
        let &Self {
            ref image,
            format,
            level,
            region,
        } = self;

        if level >= image.mip_levels() {
            return Err(Box::new(ValidationError {
                context: "level".into(),
                problem: "is not less than the number of mip levels of `image`".into(),
                vuids: &["VUID-VkBlitImageInfo2-srcSubresource-01705"],
                ..Default::default()
            }));
        }

        if format.block_size() != image.format().block_size() {
            return Err(Box::new(ValidationError {
                context: "format".into(),
                problem: "does not have the same texel size as the format of `image`".into(),
                ..Default::default()
            }));
        }

        let [level_width, level_height, _] = self.level_extent();

        // Negative sizes mirror the copy, the box then ends before its offset.
        for (axis, offset, size, limit) in [
            ("x", region.x, region.width, level_width),
            ("y", region.y, region.height, level_height),
        ] {
            let start = i64::from(offset);
            let end = start + i64::from(size);

            if start.min(end) < 0 || start.max(end) > i64::from(limit) {
                return Err(Box::new(ValidationError {
                    context: "region".into(),
                    problem: format!("`{}` and its size select texels outside the mip level", axis)
                        .into(),
                    vuids: &[
                        "VUID-VkBlitImageInfo2-srcOffset-00243",
                        "VUID-VkBlitImageInfo2-dstOffset-00248",
                    ],
                    ..Default::default()
                }));
            }
        }

        if region.z < 0
            || region.depth <= 0
            || i64::from(region.z) + i64::from(region.depth) > i64::from(self.level_layers())
        {
            return Err(Box::new(ValidationError {
                context: "region".into(),
                problem: "`z` and `depth` select layers outside the mip level".into(),
                vuids: &["VUID-VkBlitImageInfo2-srcSubresource-01707"],
                ..Default::default()
            }));
        }

        Ok(())
    }
}

/// A box of texels. The width and height can be negative to mirror the copy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlitBox {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub width: i32,
    pub height: i32,
    pub depth: i32,
}

/// A rectangle of the destination, inclusive of `min` and exclusive of `max`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlitScissor {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

/// A view of one mip level and a range of layers of an image, as handed to the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceView {
    pub image: vk::Image,
    pub format: Format,
    pub level: u32,
    pub first_layer: u32,
    pub last_layer: u32,
}

impl SurfaceView {
    /// Returns a view of a single layer.
    #[inline]
    pub fn layer(image: &Image, format: Format, level: u32, layer: u32) -> Self {
        SurfaceView {
            image: image.handle(),
            format,
            level,
            first_layer: layer,
            last_layer: layer,
        }
    }
}

/// A texel-exact copy between two images.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CopyRegion {
    pub src: vk::Image,
    pub src_level: u32,
    pub src_box: BlitBox,
    pub dst: vk::Image,
    pub dst_level: u32,
    pub dst_offset: [u32; 3],
}

/// A textured-quad blit.
#[derive(Clone, Debug, PartialEq)]
pub struct GenericBlit {
    pub dst: SurfaceView,
    pub dst_box: BlitBox,
    pub src: SurfaceView,
    pub src_box: BlitBox,
    /// The size of the source's base level, used to normalize texture coordinates.
    pub src_extent: [u32; 2],
    /// The aspects that are copied.
    pub aspects: ImageAspects,
    /// The color channels that are written.
    pub write_mask: ColorComponents,
    pub filter: Filter,
    pub scissor: Option<BlitScissor>,
    pub alpha_blend: bool,
}

#[cfg(test)]
mod tests {
    use super::{BlitInfo, BlitScissor, BlitStrategy, Blitter};
    use crate::{
        device::Device,
        format::Format,
        image::{Image, ImageAspects, ImageCreateInfo, ImageTiling},
        tests::Event,
    };
    use std::sync::{Arc, Mutex};

    fn image(device: &Arc<Device>, format: Format, tiling: ImageTiling) -> Arc<Image> {
        Image::new(
            device.clone(),
            ImageCreateInfo {
                format,
                extent: [64, 64, 1],
                tiling,
                ..Default::default()
            },
        )
        .unwrap()
    }

    struct Scripted {
        name: &'static str,
        claims: ImageAspects,
        log: Arc<Mutex<Vec<(&'static str, ImageAspects)>>>,
    }

    impl BlitStrategy for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        fn try_apply(&self, _device: &Arc<Device>, info: &super::BlitInfo) -> ImageAspects {
            self.log.lock().unwrap().push((self.name, info.aspects));
            self.claims
        }
    }

    #[test]
    fn aspects_never_grow() {
        let device = test_device!();
        let log = Arc::new(Mutex::new(Vec::new()));
        let scripted = |name, claims| -> Box<dyn BlitStrategy> {
            Box::new(Scripted {
                name,
                claims,
                log: log.clone(),
            })
        };

        // The second strategy claims aspects that were never requested.
        let blitter = Blitter::with_strategies(
            device.clone(),
            vec![
                scripted("none", ImageAspects::empty()),
                scripted("greedy", ImageAspects::COLOR | ImageAspects::DEPTH),
                scripted("late", ImageAspects::STENCIL),
            ],
        );

        let src = image(&device, Format::D24_UNORM_S8_UINT, ImageTiling::Optimal);
        let dst = image(&device, Format::D24_UNORM_S8_UINT, ImageTiling::Optimal);
        let mut info = BlitInfo::images(src, dst);
        assert_eq!(info.aspects, ImageAspects::DEPTH | ImageAspects::STENCIL);

        blitter.blit(&mut info).unwrap();

        let log = log.lock().unwrap();
        let masks: Vec<_> = log.iter().map(|&(_, aspects)| aspects).collect();
        assert_eq!(
            masks,
            [
                ImageAspects::DEPTH | ImageAspects::STENCIL,
                ImageAspects::DEPTH | ImageAspects::STENCIL,
                ImageAspects::STENCIL,
            ]
        );
        assert!(masks.windows(2).all(|w| w[0].contains(w[1])));
        assert!(info.aspects.is_empty());
    }

    #[test]
    fn cascade_stops_when_done() {
        let device = test_device!();
        let log = Arc::new(Mutex::new(Vec::new()));
        let blitter = Blitter::with_strategies(
            device.clone(),
            vec![
                Box::new(Scripted {
                    name: "all",
                    claims: ImageAspects::COLOR,
                    log: log.clone(),
                }),
                Box::new(Scripted {
                    name: "never reached",
                    claims: ImageAspects::COLOR,
                    log: log.clone(),
                }),
            ],
        );

        let src = image(&device, Format::R8G8B8A8_UNORM, ImageTiling::Optimal);
        let dst = image(&device, Format::R8G8B8A8_UNORM, ImageTiling::Optimal);
        blitter.blit(&mut BlitInfo::images(src, dst)).unwrap();

        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn copy_unit_wins_over_render() {
        let (device, backend) = test_device!(with_backend);
        let blitter = Blitter::new(device.clone());

        let src = image(&device, Format::R8G8B8A8_UNORM, ImageTiling::Optimal);
        let dst = image(&device, Format::R8G8B8A8_UNORM, ImageTiling::Optimal);
        let dst_handle = dst.handle();
        let created = backend.count(|e| matches!(e, Event::CreateImage { .. }));

        let mut info = BlitInfo::images(src, dst);
        blitter.blit(&mut info).unwrap();

        assert!(info.aspects.is_empty());
        assert_eq!(backend.count(|e| matches!(e, Event::SubmitTfu(_))), 1);
        assert_eq!(
            backend.count(|e| matches!(e, Event::CreateImage { .. })),
            created
        );
        assert_eq!(backend.count(|e| matches!(e, Event::BlitGeneric(_))), 0);
        assert!(matches!(
            backend.events().last(),
            Some(Event::FlushWriting(image)) if *image == dst_handle
        ));
    }

    #[test]
    fn linear_source_goes_through_scratch_copy() {
        let (device, backend) = test_device!(with_backend);
        let blitter = Blitter::new(device.clone());

        let src = image(&device, Format::R8G8B8A8_UNORM, ImageTiling::Linear);
        let dst = image(&device, Format::R8G8B8A8_UNORM, ImageTiling::Optimal);
        let created = backend.count(|e| matches!(e, Event::CreateImage { .. }));

        // The scissor rules out the copy unit and the tile buffer.
        let mut info = BlitInfo {
            scissor: Some(BlitScissor {
                min_x: 0,
                min_y: 0,
                max_x: 32,
                max_y: 32,
            }),
            ..BlitInfo::images(src, dst)
        };
        blitter.blit(&mut info).unwrap();

        assert_eq!(
            backend.count(|e| matches!(e, Event::CreateImage { .. })),
            created + 1
        );
        assert_eq!(backend.count(|e| matches!(e, Event::SubmitTfu(_))), 0);
        assert_eq!(backend.count(|e| matches!(e, Event::SubmitTileJob(_))), 0);
        assert_eq!(backend.count(|e| matches!(e, Event::CopyRegion(_))), 1);
        assert_eq!(backend.count(|e| matches!(e, Event::BlitGeneric(_))), 1);
        assert!(info.aspects.is_empty());

        // The scratch image is gone once the blit is done.
        assert_eq!(backend.count(|e| matches!(e, Event::DestroyImage { .. })), 1);
    }

    #[test]
    fn unsupported_blit_leaves_aspects() {
        let (device, backend) = test_device!(with_backend);
        backend.set_blit_supported(false);
        let blitter = Blitter::new(device.clone());

        let src = image(&device, Format::R8G8B8A8_UNORM, ImageTiling::Optimal);
        let dst = image(&device, Format::R16G16B16A16_SFLOAT, ImageTiling::Optimal);
        let mut info = BlitInfo::images(src, dst);
        blitter.blit(&mut info).unwrap();

        assert_eq!(info.aspects, ImageAspects::COLOR);
        assert_eq!(backend.count(|e| matches!(e, Event::BlitGeneric(_))), 0);
        assert_eq!(backend.count(|e| matches!(e, Event::FlushWriting(_))), 1);
    }

    #[test]
    fn invalid_aspects() {
        let device = test_device!();
        let blitter = Blitter::new(device.clone());

        let src = image(&device, Format::R8G8B8A8_UNORM, ImageTiling::Optimal);
        let dst = image(&device, Format::R8G8B8A8_UNORM, ImageTiling::Optimal);
        let mut info = BlitInfo {
            aspects: ImageAspects::DEPTH,
            ..BlitInfo::images(src, dst)
        };

        assert_eq!(blitter.blit(&mut info).unwrap_err().context, "info.aspects");
    }

    #[test]
    fn region_outside_level() {
        let (device, backend) = test_device!(with_backend);
        let blitter = Blitter::new(device.clone());

        let src = image(&device, Format::R8G8B8A8_UNORM, ImageTiling::Optimal);
        let dst = image(&device, Format::R8G8B8A8_UNORM, ImageTiling::Optimal);

        let mut info = BlitInfo::images(src.clone(), dst.clone());
        info.dst.region.x = 500;
        info.dst.region.width = 1000;
        assert_eq!(blitter.blit(&mut info).unwrap_err().context, "info.dst.region");

        let mut info = BlitInfo::images(src.clone(), dst.clone());
        info.src.region.y = 0;
        info.src.region.height = -1;
        assert_eq!(blitter.blit(&mut info).unwrap_err().context, "info.src.region");

        let mut info = BlitInfo::images(src.clone(), dst.clone());
        info.src.region.z = i32::MAX;
        assert_eq!(blitter.blit(&mut info).unwrap_err().context, "info.src.region");

        let mut info = BlitInfo::images(src.clone(), dst.clone());
        info.dst.region.z = -1;
        assert_eq!(blitter.blit(&mut info).unwrap_err().context, "info.dst.region");

        assert_eq!(
            backend.count(|e| matches!(e, Event::SubmitTfu(_) | Event::BlitGeneric(_))),
            0
        );

        // A mirrored box that stays inside the level is fine.
        let mut info = BlitInfo::images(src, dst);
        info.src.region.x = 64;
        info.src.region.width = -64;
        blitter.blit(&mut info).unwrap();
    }

    #[test]
    fn generate_mipmap_single_layer() {
        let (device, backend) = test_device!(with_backend);
        let blitter = Blitter::new(device.clone());

        let image = Image::new(
            device,
            ImageCreateInfo {
                format: Format::R8G8B8A8_UNORM,
                extent: [64, 64, 1],
                mip_levels: 7,
                array_layers: 2,
                ..Default::default()
            },
        )
        .unwrap();

        assert!(!blitter.generate_mipmap(&image, Format::R8G8B8A8_SRGB, 0, 6, 0, 0));
        assert!(!blitter.generate_mipmap(&image, Format::R8G8B8A8_UNORM, 0, 6, 0, 1));
        assert!(blitter.generate_mipmap(&image, Format::R8G8B8A8_UNORM, 0, 6, 1, 1));

        let jobs: Vec<_> = backend
            .events()
            .into_iter()
            .filter_map(|e| match e {
                Event::SubmitTfu(job) => Some(job),
                _ => None,
            })
            .collect();
        assert_eq!(jobs.len(), 1);
        // Six levels to generate, written with the dimension-tracking bit.
        assert_eq!((jobs[0].icfg >> 5) & 0xf, 6);
        assert_eq!(jobs[0].ioa & 1, 1);
        assert_eq!(jobs[0].src, None);
    }
}

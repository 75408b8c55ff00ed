//! Images and their memory layout.
//!
//! An image owns a backend allocation laid out by [`ImageLayout`]: one [`ImageSlice`] per mip
//! level, each with its own [`TilingMode`]. The blit strategies inspect the slices to decide
//! whether a hardware unit can read or write the image directly.
//!
//! Images of the `D32_SFLOAT_S8_UINT` format keep their stencil in a separate `S8_UINT` image,
//! returned by [`Image::separate_stencil`].

pub use self::layout::{ImageLayout, ImageSlice, TilingMode};
use crate::{
    device::Device,
    format::Format,
    macros::{vulkan_bitflags, vulkan_enum},
    Validated, ValidationError, VulkanError,
};
use ash::vk;
use std::{num::NonZero, sync::Arc};

pub mod layout;

/// A multi-dimensional storage of texels.
#[derive(Debug)]
pub struct Image {
    handle: vk::Image,
    device: Arc<Device>,
    id: NonZero<u64>,

    image_type: ImageType,
    format: Format,
    extent: [u32; 3],
    array_layers: u32,
    mip_levels: u32,
    samples: SampleCount,
    tiling: ImageTiling,
    sand_col128_stride: Option<u32>,

    layout: ImageLayout,
    separate_stencil: Option<Arc<Image>>,
}

impl Image {
    /// Creates a new `Image` and allocates its memory through the backend.
    pub fn new(
        device: Arc<Device>,
        create_info: ImageCreateInfo,
    ) -> Result<Arc<Image>, Validated<VulkanError>> {
        create_info
            .validate()
            .map_err(|err| err.add_context("create_info"))?;

        unsafe { Ok(Self::new_unchecked(device, create_info)?) }
    }

    #[cfg_attr(not(feature = "document_unchecked"), doc(hidden))]
    pub unsafe fn new_unchecked(
        device: Arc<Device>,
        create_info: ImageCreateInfo,
    ) -> Result<Arc<Image>, VulkanError> {
        let separate_stencil = if create_info.format == Format::D32_SFLOAT_S8_UINT {
            let stencil_info = ImageCreateInfo {
                format: Format::S8_UINT,
                ..create_info.clone()
            };

            Some(unsafe { Self::new_unchecked(device.clone(), stencil_info) }?)
        } else {
            None
        };

        let layout = ImageLayout::new(&create_info);
        let handle = device.backend().create_image(&create_info, &layout)?;

        let ImageCreateInfo {
            image_type,
            format,
            extent,
            array_layers,
            mip_levels,
            samples,
            tiling,
            sand_col128_stride,
            _ne: _,
        } = create_info;

        tracing::trace!(
            ?handle,
            ?format,
            ?extent,
            tiled = layout.is_tiled(),
            size = layout.size(),
            "created image",
        );

        Ok(Arc::new(Image {
            handle,
            device,
            id: Self::next_id(),
            image_type,
            format,
            extent,
            array_layers,
            mip_levels,
            samples,
            tiling,
            sand_col128_stride,
            layout,
            separate_stencil,
        }))
    }

    /// Returns the backend handle of the image.
    #[inline]
    pub fn handle(&self) -> vk::Image {
        self.handle
    }

    /// Returns the device that owns the image.
    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Returns the dimensionality of the image.
    #[inline]
    pub fn image_type(&self) -> ImageType {
        self.image_type
    }

    /// Returns the format of the image.
    #[inline]
    pub fn format(&self) -> Format {
        self.format
    }

    /// Returns the size in texels of the base mip level.
    #[inline]
    pub fn extent(&self) -> [u32; 3] {
        self.extent
    }

    /// Returns the number of array layers.
    #[inline]
    pub fn array_layers(&self) -> u32 {
        self.array_layers
    }

    /// Returns the number of mip levels.
    #[inline]
    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    /// Returns the number of samples per texel.
    #[inline]
    pub fn samples(&self) -> SampleCount {
        self.samples
    }

    /// Returns the requested tiling of the image.
    #[inline]
    pub fn tiling(&self) -> ImageTiling {
        self.tiling
    }

    /// Returns the stride of the 128-byte columns, if the image holds a column-interleaved
    /// ("SAND") plane.
    #[inline]
    pub fn sand_col128_stride(&self) -> Option<u32> {
        self.sand_col128_stride
    }

    /// Returns the memory layout of the image.
    #[inline]
    pub fn layout(&self) -> &ImageLayout {
        &self.layout
    }

    /// Returns the slice describing mip level `level`.
    #[inline]
    pub fn slice(&self, level: u32) -> &ImageSlice {
        &self.layout.slices()[level as usize]
    }

    /// Returns whether the base level is stored in one of the tiled layouts.
    #[inline]
    pub fn is_tiled(&self) -> bool {
        self.layout.is_tiled()
    }

    /// Returns the size in bytes of the image's memory.
    #[inline]
    pub fn size(&self) -> u64 {
        self.layout.size()
    }

    /// Returns the byte offset of the given layer of a mip level.
    ///
    /// For 3D images, `layer` is the depth slice.
    #[inline]
    pub fn layer_offset(&self, level: u32, layer: u32) -> u64 {
        self.layout
            .layer_offset(self.image_type == ImageType::Dim3d, level, layer)
    }

    /// Returns the extent of mip level `level`.
    #[inline]
    pub fn level_extent(&self, level: u32) -> [u32; 3] {
        self.extent.map(|dim| minify(dim, level))
    }

    /// Returns the image holding the stencil aspect, if it is stored apart from depth.
    #[inline]
    pub fn separate_stencil(&self) -> Option<&Arc<Image>> {
        self.separate_stencil.as_ref()
    }
}

impl Drop for Image {
    #[inline]
    fn drop(&mut self) {
        self.device.backend().destroy_image(self.handle);
    }
}

crate::macros::impl_id_counter!(Image);

/// Parameters to create a new `Image`.
#[derive(Clone, Debug)]
pub struct ImageCreateInfo {
    /// The basic image dimensionality to create the image with.
    ///
    /// The default value is [`ImageType::Dim2d`].
    pub image_type: ImageType,

    /// The format used to store the image data.
    ///
    /// The default value is `Format::R8G8B8A8_UNORM`.
    pub format: Format,

    /// The width, height and depth of the image.
    ///
    /// The default value is `[1; 3]`.
    pub extent: [u32; 3],

    /// The number of array layers.
    ///
    /// The default value is `1`.
    pub array_layers: u32,

    /// The number of mip levels.
    ///
    /// The default value is `1`.
    pub mip_levels: u32,

    /// The number of samples per texel.
    ///
    /// The default value is [`SampleCount::Sample1`].
    pub samples: SampleCount,

    /// The tiling requested by the user. `Linear` images and 1D images are stored in raster order,
    /// everything else picks a tiled layout per level.
    ///
    /// The default value is [`ImageTiling::Optimal`].
    pub tiling: ImageTiling,

    /// If set, the image holds a column-interleaved luma or chroma plane with 128-byte columns of
    /// the given height in rows. Such images must be linear.
    ///
    /// The default value is `None`.
    pub sand_col128_stride: Option<u32>,

    pub _ne: crate::NonExhaustive,
}

impl Default for ImageCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            image_type: ImageType::Dim2d,
            format: Format::R8G8B8A8_UNORM,
            extent: [1; 3],
            array_layers: 1,
            mip_levels: 1,
            samples: SampleCount::Sample1,
            tiling: ImageTiling::Optimal,
            sand_col128_stride: None,
            _ne: crate::NonExhaustive(()),
        }
    }
}

impl ImageCreateInfo {
    pub(crate) fn validate(&self) -> Result<(), Box<ValidationError>> {
        let &Self {
            image_type,
            format,
            extent,
            array_layers,
            mip_levels,
            samples,
            tiling,
            sand_col128_stride,
            _ne: _,
        } = self;

        if extent.contains(&0) {
            return Err(Box::new(ValidationError {
                context: "extent".into(),
                problem: "one or more elements are zero".into(),
                vuids: &["VUID-VkImageCreateInfo-extent-00944"],
                ..Default::default()
            }));
        }

        match image_type {
            ImageType::Dim1d if extent[1] != 1 || extent[2] != 1 => {
                return Err(Box::new(ValidationError {
                    problem: "`image_type` is `ImageType::Dim1d`, but `extent[1]` or \
                        `extent[2]` is not 1"
                        .into(),
                    vuids: &["VUID-VkImageCreateInfo-imageType-00956"],
                    ..Default::default()
                }));
            }
            ImageType::Dim2d if extent[2] != 1 => {
                return Err(Box::new(ValidationError {
                    problem: "`image_type` is `ImageType::Dim2d`, but `extent[2]` is not 1".into(),
                    vuids: &["VUID-VkImageCreateInfo-imageType-00957"],
                    ..Default::default()
                }));
            }
            ImageType::Dim3d if array_layers != 1 => {
                return Err(Box::new(ValidationError {
                    problem: "`image_type` is `ImageType::Dim3d`, but `array_layers` is not 1"
                        .into(),
                    vuids: &["VUID-VkImageCreateInfo-imageType-00961"],
                    ..Default::default()
                }));
            }
            _ => (),
        }

        if array_layers == 0 {
            return Err(Box::new(ValidationError {
                context: "array_layers".into(),
                problem: "is zero".into(),
                vuids: &["VUID-VkImageCreateInfo-arrayLayers-00948"],
                ..Default::default()
            }));
        }

        let max_mip_levels = 32 - extent.into_iter().max().unwrap_or(1).leading_zeros();

        if mip_levels == 0 || mip_levels > max_mip_levels {
            return Err(Box::new(ValidationError {
                context: "mip_levels".into(),
                problem: "is zero or greater than the number of levels of a full mip chain".into(),
                vuids: &["VUID-VkImageCreateInfo-mipLevels-00947"],
                ..Default::default()
            }));
        }

        if samples != SampleCount::Sample1 && (mip_levels != 1 || image_type != ImageType::Dim2d)
        {
            return Err(Box::new(ValidationError {
                problem: "`samples` is not `SampleCount::Sample1`, but `mip_levels` is not 1 or \
                    `image_type` is not `ImageType::Dim2d`"
                    .into(),
                vuids: &["VUID-VkImageCreateInfo-samples-02257"],
                ..Default::default()
            }));
        }

        if format == Format::R32G32B32_SFLOAT {
            return Err(Box::new(ValidationError {
                context: "format".into(),
                problem: "can only be used for vertex buffers".into(),
                ..Default::default()
            }));
        }

        if sand_col128_stride.is_some() {
            if !matches!(format, Format::R8_UNORM | Format::R8G8_UNORM)
                || tiling != ImageTiling::Linear
            {
                return Err(Box::new(ValidationError {
                    context: "sand_col128_stride".into(),
                    problem: "is `Some`, but `format` is not `R8_UNORM` or `R8G8_UNORM`, or \
                        `tiling` is not `ImageTiling::Linear`"
                        .into(),
                    ..Default::default()
                }));
            }
        }

        Ok(())
    }
}

vulkan_bitflags! {
    /// The aspects of an image: its color, depth and stencil planes.
    ImageAspects = ImageAspectFlags(u32);

    /// The color aspect.
    COLOR = COLOR,

    /// The depth aspect.
    DEPTH = DEPTH,

    /// The stencil aspect.
    STENCIL = STENCIL,
}

vulkan_enum! {
    #[non_exhaustive]

    /// The basic dimensionality of an image.
    ImageType = ImageType(i32);

    /// A one-dimensional image, consisting of only a width, with a height and depth of 1.
    Dim1d = TYPE_1D,

    /// A two-dimensional image, consisting of a width and height, with a depth of 1.
    Dim2d = TYPE_2D,

    /// A three-dimensional image, consisting of a width, height and depth.
    Dim3d = TYPE_3D,
}

vulkan_enum! {
    #[non_exhaustive]

    /// The arrangement of texels requested for an image.
    ImageTiling = ImageTiling(i32);

    /// The driver picks a tiled layout for each mip level.
    Optimal = OPTIMAL,

    /// The texels are laid out in row-major order.
    Linear = LINEAR,
}

vulkan_enum! {
    #[non_exhaustive]

    /// The number of samples per texel of an image.
    SampleCount = SampleCountFlags(u32);

    /// 1 sample per texel.
    Sample1 = TYPE_1,

    /// 2 samples per texel.
    Sample2 = TYPE_2,

    /// 4 samples per texel.
    Sample4 = TYPE_4,

    /// 8 samples per texel.
    Sample8 = TYPE_8,

    /// 16 samples per texel.
    Sample16 = TYPE_16,
}

impl SampleCount {
    /// Returns whether the count is greater than one.
    #[inline]
    pub fn is_multisampled(self) -> bool {
        self != SampleCount::Sample1
    }
}

/// Returns the size of a mip level in one dimension.
#[inline]
pub fn minify(dim: u32, level: u32) -> u32 {
    (dim >> level).max(1)
}

#[cfg(test)]
mod tests {
    use super::{Image, ImageCreateInfo, ImageTiling, ImageType, SampleCount};
    use crate::{format::Format, tests::Event};

    #[test]
    fn separate_stencil_plane() {
        let (device, backend) = test_device!(with_backend);

        let image = Image::new(
            device,
            ImageCreateInfo {
                format: Format::D32_SFLOAT_S8_UINT,
                extent: [64, 64, 1],
                ..Default::default()
            },
        )
        .unwrap();

        let stencil = image.separate_stencil().unwrap();
        assert_eq!(stencil.format(), Format::S8_UINT);
        assert_eq!(stencil.extent(), image.extent());
        assert_eq!(backend.count(|e| matches!(e, Event::CreateImage { .. })), 2);

        drop(image);
        assert_eq!(backend.count(|e| matches!(e, Event::DestroyImage { .. })), 2);
    }

    #[test]
    fn invalid_create_info() {
        let device = test_device!();

        for create_info in [
            ImageCreateInfo {
                extent: [0, 4, 1],
                ..Default::default()
            },
            ImageCreateInfo {
                image_type: ImageType::Dim3d,
                extent: [4, 4, 4],
                array_layers: 2,
                ..Default::default()
            },
            ImageCreateInfo {
                extent: [4, 4, 1],
                mip_levels: 4,
                ..Default::default()
            },
            ImageCreateInfo {
                extent: [4, 4, 1],
                samples: SampleCount::Sample4,
                mip_levels: 2,
                ..Default::default()
            },
            ImageCreateInfo {
                format: Format::R8_UNORM,
                extent: [256, 64, 1],
                sand_col128_stride: Some(64),
                ..Default::default()
            },
        ] {
            assert!(Image::new(device.clone(), create_info).is_err());
        }

        let image = Image::new(
            device,
            ImageCreateInfo {
                format: Format::R8_UNORM,
                extent: [256, 64, 1],
                tiling: ImageTiling::Linear,
                sand_col128_stride: Some(64),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(!image.is_tiled());
        assert_eq!(image.level_extent(3), [32, 8, 1]);
    }
}

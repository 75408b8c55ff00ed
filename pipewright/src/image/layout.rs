//! Placement of mip levels and array layers in an image's memory.
//!
//! Tiled images are built from 64-byte micro-tiles ("utiles"). Four utiles form a UIF block, and
//! levels wider than two UIF blocks are stored as columns of UIF blocks. Small levels use cheaper
//! layouts: a single row of utiles, or one or two columns of UIF blocks. Levels are placed in
//! memory from the smallest to the largest, so the base level ends up last.

use super::{minify, ImageCreateInfo, ImageTiling, ImageType};
use crate::format::{utile_height, utile_width};
use smallvec::SmallVec;

const PAGE_ALIGN: u64 = 4096;
const UIF_BLOCK_BYTES: u64 = 256;

/// The memory arrangement of a single mip level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TilingMode {
    /// Row-major order.
    Raster,
    /// A single row of utiles.
    LinearTile,
    /// One column of UIF blocks.
    UbLinear1Column,
    /// Two columns of UIF blocks.
    UbLinear2Column,
    /// Columns of UIF blocks.
    UifNoXor,
    /// Columns of UIF blocks, with alternate columns XOR-swizzled.
    UifXor,
}

impl TilingMode {
    /// Returns whether the mode is one of the UIF layouts.
    #[inline]
    pub fn is_uif(self) -> bool {
        matches!(self, Self::UifNoXor | Self::UifXor)
    }

    /// Returns the index of a tiled mode, counting from `LinearTile`, as used in copy-unit job
    /// registers. Returns `None` for `Raster`.
    #[inline]
    pub fn tiled_index(self) -> Option<u32> {
        Some(match self {
            Self::Raster => return None,
            Self::LinearTile => 0,
            Self::UbLinear1Column => 1,
            Self::UbLinear2Column => 2,
            Self::UifNoXor => 3,
            Self::UifXor => 4,
        })
    }
}

/// The placement of one mip level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageSlice {
    /// Byte offset of the level's first layer from the start of the image.
    pub offset: u64,
    /// Bytes between two rows of texels (for raster) or two rows of blocks.
    pub stride: u32,
    /// The height in rows, after padding to the block height of the tiling.
    pub padded_height: u32,
    /// Bytes of one layer (or one depth slice) of the level.
    pub size: u64,
    /// The arrangement of the level.
    pub tiling: TilingMode,
}

/// The placement of every mip level of an image.
#[derive(Clone, Debug)]
pub struct ImageLayout {
    slices: SmallVec<[ImageSlice; 12]>,
    layer_stride: u64,
    size: u64,
}

impl ImageLayout {
    /// Computes the layout of an image described by `create_info`.
    pub fn new(create_info: &ImageCreateInfo) -> Self {
        let &ImageCreateInfo {
            image_type,
            format,
            extent,
            array_layers,
            mip_levels,
            samples,
            tiling,
            ..
        } = create_info;

        let cpp = format.block_size();
        let raster = tiling == ImageTiling::Linear || image_type == ImageType::Dim1d;
        let msaa_scale = if samples.is_multisampled() { 2 } else { 1 };

        let utile_w = utile_width(cpp);
        let utile_h = utile_height(cpp);
        let uif_block_w = utile_w * 2;
        let uif_block_h = utile_h * 2;

        let mut slices: SmallVec<[ImageSlice; 12]> = SmallVec::with_capacity(mip_levels as usize);
        let mut offset: u64 = 0;

        for level in (0..mip_levels).rev() {
            let width = minify(extent[0], level) * msaa_scale;
            let height = minify(extent[1], level) * msaa_scale;
            let depth = if image_type == ImageType::Dim3d {
                minify(extent[2], level)
            } else {
                1
            };

            let (tiling, level_width, level_height) = if raster {
                (TilingMode::Raster, width.next_multiple_of(64 / cpp.min(64)), height)
            } else if width <= utile_w && height <= utile_h {
                (
                    TilingMode::LinearTile,
                    width.next_multiple_of(utile_w),
                    height.next_multiple_of(utile_h),
                )
            } else if width <= uif_block_w {
                (
                    TilingMode::UbLinear1Column,
                    width.next_multiple_of(uif_block_w),
                    height.next_multiple_of(uif_block_h),
                )
            } else if width <= 2 * uif_block_w {
                (
                    TilingMode::UbLinear2Column,
                    width.next_multiple_of(2 * uif_block_w),
                    height.next_multiple_of(uif_block_h),
                )
            } else {
                (
                    TilingMode::UifNoXor,
                    width.next_multiple_of(4 * uif_block_w),
                    height.next_multiple_of(uif_block_h),
                )
            };

            // LinearTile levels only need utile alignment, the other tiled levels start on a
            // UIF block.
            if !matches!(tiling, TilingMode::Raster | TilingMode::LinearTile) {
                offset = offset.next_multiple_of(UIF_BLOCK_BYTES);
            }

            if level == 0 && !raster {
                offset = offset.next_multiple_of(PAGE_ALIGN);
            }

            let stride = level_width * cpp;
            let size = stride as u64 * level_height as u64;

            slices.push(ImageSlice {
                offset,
                stride,
                padded_height: level_height,
                size,
                tiling,
            });

            offset += size * depth as u64;
        }

        slices.reverse();

        let layer_stride = if array_layers > 1 {
            offset.next_multiple_of(PAGE_ALIGN)
        } else {
            offset
        };

        ImageLayout {
            slices,
            layer_stride,
            size: layer_stride * array_layers as u64,
        }
    }

    /// Returns the slices, indexed by mip level.
    #[inline]
    pub fn slices(&self) -> &[ImageSlice] {
        &self.slices
    }

    /// Returns the bytes between two array layers.
    #[inline]
    pub fn layer_stride(&self) -> u64 {
        self.layer_stride
    }

    /// Returns the total size in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns whether the base level is stored in a tiled layout.
    #[inline]
    pub fn is_tiled(&self) -> bool {
        self.slices
            .first()
            .is_some_and(|slice| slice.tiling != TilingMode::Raster)
    }

    pub(crate) fn layer_offset(&self, is_3d: bool, level: u32, layer: u32) -> u64 {
        let slice = &self.slices[level as usize];

        if is_3d {
            slice.offset + layer as u64 * slice.size
        } else {
            slice.offset + layer as u64 * self.layer_stride
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ImageLayout, TilingMode};
    use crate::{
        format::Format,
        image::{ImageCreateInfo, ImageTiling, ImageType},
    };

    #[test]
    fn tiling_per_level() {
        let layout = ImageLayout::new(&ImageCreateInfo {
            format: Format::R8G8B8A8_UNORM,
            extent: [64, 64, 1],
            mip_levels: 7,
            ..Default::default()
        });

        let tilings: Vec<_> = layout.slices().iter().map(|s| s.tiling).collect();
        assert_eq!(
            tilings,
            [
                TilingMode::UifNoXor,
                TilingMode::UifNoXor,
                TilingMode::UbLinear2Column,
                TilingMode::UbLinear1Column,
                TilingMode::LinearTile,
                TilingMode::LinearTile,
                TilingMode::LinearTile,
            ]
        );

        // Smallest level first, base level page-aligned and last.
        assert_eq!(layout.slices()[6].offset, 0);
        assert!(layout.slices()[0].offset > layout.slices()[1].offset);
        assert_eq!(layout.slices()[0].offset % 4096, 0);
        assert_eq!(layout.slices()[0].padded_height, 64);
        assert_eq!(layout.slices()[0].stride, 64 * 4);
        assert!(layout.is_tiled());
    }

    #[test]
    fn raster_layout() {
        let layout = ImageLayout::new(&ImageCreateInfo {
            format: Format::R8_UNORM,
            extent: [100, 10, 1],
            tiling: ImageTiling::Linear,
            array_layers: 3,
            ..Default::default()
        });

        let slice = layout.slices()[0];
        assert_eq!(slice.tiling, TilingMode::Raster);
        assert_eq!(slice.stride, 128);
        assert_eq!(slice.padded_height, 10);
        assert_eq!(layout.layer_stride(), 4096);
        assert_eq!(layout.size(), 3 * 4096);
        assert_eq!(layout.layer_offset(false, 0, 2), 2 * 4096);
        assert!(!layout.is_tiled());

        let one_d = ImageLayout::new(&ImageCreateInfo {
            image_type: ImageType::Dim1d,
            extent: [16, 1, 1],
            ..Default::default()
        });
        assert!(!one_d.is_tiled());
    }

    #[test]
    fn depth_slices_of_3d_images() {
        let layout = ImageLayout::new(&ImageCreateInfo {
            image_type: ImageType::Dim3d,
            format: Format::R32_SFLOAT,
            extent: [32, 32, 4],
            ..Default::default()
        });

        let slice = layout.slices()[0];
        assert_eq!(layout.layer_offset(true, 0, 3), slice.offset + 3 * slice.size);
        assert_eq!(layout.size(), slice.offset + 4 * slice.size);
    }
}

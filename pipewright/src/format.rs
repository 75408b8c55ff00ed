//! All the formats supported by the driver, and what the hardware units can do with them.
//!
//! A [`Format`] has three hardware-facing encodings:
//!
//! - the [`TextureDataFormat`], how the texture unit and the fixed-function copy unit (TFU) read
//!   and write it,
//! - the [`RenderTargetFormat`], how the tile buffer (TLB) loads and stores it,
//! - the [`NativeFormat`], the D3D12-style pixel format used for pipeline state and views.
//!
//! Not every format has each encoding. The queries return `None` when the unit can't handle the
//! format at all.

use crate::{image::ImageAspects, macros::vulkan_enum};

vulkan_enum! {
    /// An enumeration of all the possible formats.
    #[allow(non_camel_case_types)]
    Format = Format(i32);

    R8_UNORM = R8_UNORM,
    R8_SNORM = R8_SNORM,
    R8_UINT = R8_UINT,
    R8_SINT = R8_SINT,
    R8G8_UNORM = R8G8_UNORM,
    R8G8_SNORM = R8G8_SNORM,
    R8G8_UINT = R8G8_UINT,
    R8G8B8A8_UNORM = R8G8B8A8_UNORM,
    R8G8B8A8_SNORM = R8G8B8A8_SNORM,
    R8G8B8A8_UINT = R8G8B8A8_UINT,
    R8G8B8A8_SINT = R8G8B8A8_SINT,
    R8G8B8A8_SRGB = R8G8B8A8_SRGB,
    B8G8R8A8_UNORM = B8G8R8A8_UNORM,
    B8G8R8A8_SRGB = B8G8R8A8_SRGB,
    R5G6B5_UNORM_PACK16 = R5G6B5_UNORM_PACK16,
    R4G4B4A4_UNORM_PACK16 = R4G4B4A4_UNORM_PACK16,
    R5G5B5A1_UNORM_PACK16 = R5G5B5A1_UNORM_PACK16,
    A2B10G10R10_UNORM_PACK32 = A2B10G10R10_UNORM_PACK32,
    A2B10G10R10_UINT_PACK32 = A2B10G10R10_UINT_PACK32,
    B10G11R11_UFLOAT_PACK32 = B10G11R11_UFLOAT_PACK32,
    E5B9G9R9_UFLOAT_PACK32 = E5B9G9R9_UFLOAT_PACK32,
    R16_UNORM = R16_UNORM,
    R16_SNORM = R16_SNORM,
    R16_UINT = R16_UINT,
    R16_SINT = R16_SINT,
    R16_SFLOAT = R16_SFLOAT,
    R16G16_UNORM = R16G16_UNORM,
    R16G16_SNORM = R16G16_SNORM,
    R16G16_UINT = R16G16_UINT,
    R16G16_SFLOAT = R16G16_SFLOAT,
    R16G16B16A16_UNORM = R16G16B16A16_UNORM,
    R16G16B16A16_SNORM = R16G16B16A16_SNORM,
    R16G16B16A16_UINT = R16G16B16A16_UINT,
    R16G16B16A16_SFLOAT = R16G16B16A16_SFLOAT,
    R32_UINT = R32_UINT,
    R32_SINT = R32_SINT,
    R32_SFLOAT = R32_SFLOAT,
    R32G32_UINT = R32G32_UINT,
    R32G32_SFLOAT = R32G32_SFLOAT,
    R32G32B32_SFLOAT = R32G32B32_SFLOAT,
    R32G32B32A32_UINT = R32G32B32A32_UINT,
    R32G32B32A32_SINT = R32G32B32A32_SINT,
    R32G32B32A32_SFLOAT = R32G32B32A32_SFLOAT,
    D16_UNORM = D16_UNORM,
    X8_D24_UNORM_PACK32 = X8_D24_UNORM_PACK32,
    D32_SFLOAT = D32_SFLOAT,
    S8_UINT = S8_UINT,
    D24_UNORM_S8_UINT = D24_UNORM_S8_UINT,
    D32_SFLOAT_S8_UINT = D32_SFLOAT_S8_UINT,
}

impl Format {
    /// Returns the size in bytes of one texel ("cpp").
    ///
    /// For `D32_SFLOAT_S8_UINT` this is the size of the depth plane. The stencil lives in a
    /// separate `S8_UINT` plane.
    pub fn block_size(self) -> u32 {
        use Format::*;

        match self {
            R8_UNORM | R8_SNORM | R8_UINT | R8_SINT | S8_UINT => 1,
            R8G8_UNORM | R8G8_SNORM | R8G8_UINT | R5G6B5_UNORM_PACK16 | R4G4B4A4_UNORM_PACK16
            | R5G5B5A1_UNORM_PACK16 | R16_UNORM | R16_SNORM | R16_UINT | R16_SINT | R16_SFLOAT
            | D16_UNORM => 2,
            R8G8B8A8_UNORM | R8G8B8A8_SNORM | R8G8B8A8_UINT | R8G8B8A8_SINT | R8G8B8A8_SRGB
            | B8G8R8A8_UNORM | B8G8R8A8_SRGB | A2B10G10R10_UNORM_PACK32
            | A2B10G10R10_UINT_PACK32 | B10G11R11_UFLOAT_PACK32 | E5B9G9R9_UFLOAT_PACK32
            | R16G16_UNORM | R16G16_SNORM | R16G16_UINT | R16G16_SFLOAT | R32_UINT | R32_SINT
            | R32_SFLOAT | X8_D24_UNORM_PACK32 | D32_SFLOAT | D24_UNORM_S8_UINT
            | D32_SFLOAT_S8_UINT => 4,
            R16G16B16A16_UNORM | R16G16B16A16_SNORM | R16G16B16A16_UINT | R16G16B16A16_SFLOAT
            | R32G32_UINT | R32G32_SFLOAT => 8,
            R32G32B32_SFLOAT => 12,
            R32G32B32A32_UINT | R32G32B32A32_SINT | R32G32B32A32_SFLOAT => 16,
        }
    }

    /// Returns the aspects that images of this format have.
    pub fn aspects(self) -> ImageAspects {
        use Format::*;

        match self {
            D16_UNORM | X8_D24_UNORM_PACK32 | D32_SFLOAT => ImageAspects::DEPTH,
            S8_UINT => ImageAspects::STENCIL,
            D24_UNORM_S8_UINT | D32_SFLOAT_S8_UINT => ImageAspects::DEPTH | ImageAspects::STENCIL,
            _ => ImageAspects::COLOR,
        }
    }

    /// Returns whether the format has a depth or a stencil aspect.
    #[inline]
    pub fn is_depth_or_stencil(self) -> bool {
        self.aspects()
            .intersects(ImageAspects::DEPTH | ImageAspects::STENCIL)
    }

    /// Returns whether the format stores integer values.
    pub fn is_integer(self) -> bool {
        use Format::*;

        matches!(
            self,
            R8_UINT
                | R8_SINT
                | R8G8_UINT
                | R8G8B8A8_UINT
                | R8G8B8A8_SINT
                | A2B10G10R10_UINT_PACK32
                | R16_UINT
                | R16_SINT
                | R16G16_UINT
                | R16G16B16A16_UINT
                | R32_UINT
                | R32_SINT
                | R32G32_UINT
                | R32G32B32A32_UINT
                | R32G32B32A32_SINT
                | S8_UINT
        )
    }

    /// Returns the encoding used by the texture unit and the fixed-function copy unit.
    pub fn texture_data_format(self) -> Option<TextureDataFormat> {
        use Format::*;
        use TextureDataFormat as T;

        Some(match self {
            R8_UNORM => T::R8,
            R8_SNORM => T::R8Snorm,
            R8_UINT => T::R8ui,
            R8_SINT => T::R8i,
            R8G8_UNORM => T::Rg8,
            R8G8_SNORM => T::Rg8Snorm,
            R8G8_UINT => T::Rg8ui,
            R8G8B8A8_UNORM | R8G8B8A8_SRGB | B8G8R8A8_UNORM | B8G8R8A8_SRGB => T::Rgba8,
            R8G8B8A8_SNORM => T::Rgba8Snorm,
            R8G8B8A8_UINT => T::Rgba8ui,
            R8G8B8A8_SINT => T::Rgba8i,
            R5G6B5_UNORM_PACK16 => T::Rgb565,
            R4G4B4A4_UNORM_PACK16 => T::Rgba4,
            R5G5B5A1_UNORM_PACK16 => T::Rgb5A1,
            A2B10G10R10_UNORM_PACK32 => T::Rgb10A2,
            A2B10G10R10_UINT_PACK32 => T::Rgb10A2ui,
            B10G11R11_UFLOAT_PACK32 => T::R11fG11fB10f,
            E5B9G9R9_UFLOAT_PACK32 => T::Rgb9E5,
            R16_UNORM => T::R16,
            R16_SNORM => T::R16Snorm,
            R16_UINT => T::R16ui,
            R16_SINT => T::R16i,
            R16_SFLOAT => T::R16f,
            R16G16_UNORM => T::Rg16,
            R16G16_SNORM => T::Rg16Snorm,
            R16G16_UINT => T::Rg16ui,
            R16G16_SFLOAT => T::Rg16f,
            R16G16B16A16_UNORM => T::Rgba16,
            R16G16B16A16_SNORM => T::Rgba16Snorm,
            R16G16B16A16_UINT => T::Rgba16ui,
            R16G16B16A16_SFLOAT => T::Rgba16f,
            R32_UINT => T::R32ui,
            R32_SINT => T::R32i,
            R32_SFLOAT => T::R32f,
            R32G32_UINT => T::Rg32ui,
            R32G32_SFLOAT => T::Rg32f,
            R32G32B32A32_UINT => T::Rgba32ui,
            R32G32B32A32_SINT => T::Rgba32i,
            R32G32B32A32_SFLOAT => T::Rgba32f,
            D16_UNORM => T::DepthComp16,
            X8_D24_UNORM_PACK32 | D24_UNORM_S8_UINT => T::Depth24X8,
            D32_SFLOAT | D32_SFLOAT_S8_UINT => T::DepthComp32f,
            S8_UINT => T::S8,
            R32G32B32_SFLOAT => return None,
        })
    }

    /// Returns the encoding used by the tile buffer, or `None` if the format can't be rendered to.
    pub fn render_target_format(self) -> Option<RenderTargetFormat> {
        use Format::*;
        use InternalType as I;
        use OutputImageFormat as O;

        let (output, internal_type, channels) = match self {
            R8_UNORM => (O::R8, I::Int8, 1),
            R8_UINT => (O::R8ui, I::Int8Unsigned, 1),
            R8_SINT => (O::R8i, I::Int8Signed, 1),
            R8G8_UNORM => (O::Rg8, I::Int8, 2),
            R8G8_UINT => (O::Rg8ui, I::Int8Unsigned, 2),
            R8G8B8A8_UNORM | B8G8R8A8_UNORM => (O::Rgba8, I::Int8, 4),
            R8G8B8A8_SRGB | B8G8R8A8_SRGB => (O::Srgb8Alpha8, I::Int8, 4),
            R8G8B8A8_UINT => (O::Rgba8ui, I::Int8Unsigned, 4),
            R8G8B8A8_SINT => (O::Rgba8i, I::Int8Signed, 4),
            R5G6B5_UNORM_PACK16 => (O::Bgr565, I::Int8, 3),
            R4G4B4A4_UNORM_PACK16 => (O::Abgr4444, I::Int8, 4),
            R5G5B5A1_UNORM_PACK16 => (O::Abgr1555, I::Int8, 4),
            A2B10G10R10_UNORM_PACK32 => (O::Rgb10A2, I::Int8, 4),
            A2B10G10R10_UINT_PACK32 => (O::Rgb10A2ui, I::Int16Unsigned, 4),
            B10G11R11_UFLOAT_PACK32 => (O::R11fG11fB10f, I::Float16, 4),
            R16_UINT => (O::R16ui, I::Int16Unsigned, 1),
            R16_SINT => (O::R16i, I::Int16Signed, 1),
            R16_SFLOAT => (O::R16f, I::Float16, 1),
            R16G16_UINT => (O::Rg16ui, I::Int16Unsigned, 2),
            R16G16_SFLOAT => (O::Rg16f, I::Float16, 2),
            R16G16B16A16_UINT => (O::Rgba16ui, I::Int16Unsigned, 4),
            R16G16B16A16_SFLOAT => (O::Rgba16f, I::Float16, 4),
            R32_UINT => (O::R32ui, I::Int32Unsigned, 1),
            R32_SINT => (O::R32i, I::Int32Signed, 1),
            R32_SFLOAT => (O::R32f, I::Float32, 1),
            R32G32_UINT => (O::Rg32ui, I::Int32Unsigned, 2),
            R32G32_SFLOAT => (O::Rg32f, I::Float32, 2),
            R32G32B32A32_UINT => (O::Rgba32ui, I::Int32Unsigned, 4),
            R32G32B32A32_SINT => (O::Rgba32i, I::Int32Signed, 4),
            R32G32B32A32_SFLOAT => (O::Rgba32f, I::Float32, 4),
            D16_UNORM => (O::D16, I::Depth16, 1),
            X8_D24_UNORM_PACK32 | D24_UNORM_S8_UINT => (O::D24S8, I::Depth24, 1),
            D32_SFLOAT | D32_SFLOAT_S8_UINT => (O::D32f, I::Depth32f, 1),
            S8_UINT => (O::S8, I::Int8Unsigned, 1),
            R8_SNORM | R8G8_SNORM | R8G8B8A8_SNORM | E5B9G9R9_UFLOAT_PACK32 | R16_UNORM
            | R16_SNORM | R16G16_UNORM | R16G16_SNORM | R16G16B16A16_UNORM
            | R16G16B16A16_SNORM | R32G32B32_SFLOAT => return None,
        };

        Some(RenderTargetFormat {
            output,
            internal_type,
            internal_bpp: internal_type.bpp(channels),
        })
    }

    /// Returns whether the tile buffer can load and store this format.
    #[inline]
    pub fn is_render_target_supported(self) -> bool {
        self.render_target_format().is_some()
    }

    /// Returns whether the tile buffer can resolve multisampled data of this format while storing.
    pub fn supports_tlb_msaa_resolve(self) -> bool {
        self.render_target_format().is_some_and(|rt| {
            matches!(rt.internal_type, InternalType::Int8 | InternalType::Float16)
        })
    }

    /// Returns the format an exact copy of `cpp`-byte texels is reinterpreted as, so that the
    /// fixed-function copy unit can handle it without conversion.
    pub fn tfu_copy_format(cpp: u32) -> Option<Format> {
        Some(match cpp {
            16 => Format::R32G32B32A32_SFLOAT,
            8 => Format::R16G16B16A16_SFLOAT,
            4 => Format::R32_SFLOAT,
            2 => Format::R16_SFLOAT,
            1 => Format::R8_UNORM,
            _ => return None,
        })
    }

    /// Returns the native pixel format for the given use of the format.
    ///
    /// `aspects` selects the plane that is viewed when sampling a depth/stencil format. It is
    /// ignored for color formats and for every other usage.
    pub fn native_format(self, usage: FormatUsage, aspects: ImageAspects) -> NativeFormat {
        use Format::*;
        use NativeFormat as N;

        let sampled_stencil = usage == FormatUsage::Sampled && aspects == ImageAspects::STENCIL;

        match (self, usage) {
            (D16_UNORM, FormatUsage::Storage) => N::R16_TYPELESS,
            (D16_UNORM, FormatUsage::DepthStencilAttachment) => N::D16_UNORM,
            (D16_UNORM, _) => N::R16_UNORM,

            (X8_D24_UNORM_PACK32 | D24_UNORM_S8_UINT | S8_UINT, FormatUsage::Storage) => {
                N::R24G8_TYPELESS
            }
            (
                X8_D24_UNORM_PACK32 | D24_UNORM_S8_UINT | S8_UINT,
                FormatUsage::DepthStencilAttachment,
            ) => N::D24_UNORM_S8_UINT,
            (S8_UINT, _) => N::X24_TYPELESS_G8_UINT,
            (D24_UNORM_S8_UINT, _) if sampled_stencil => N::X24_TYPELESS_G8_UINT,
            (X8_D24_UNORM_PACK32 | D24_UNORM_S8_UINT, _) => N::R24_UNORM_X8_TYPELESS,

            (D32_SFLOAT, FormatUsage::Storage) => N::R32_TYPELESS,
            (D32_SFLOAT, FormatUsage::DepthStencilAttachment) => N::D32_FLOAT,
            (D32_SFLOAT, _) => N::R32_FLOAT,

            (D32_SFLOAT_S8_UINT, FormatUsage::Storage) => N::R32G8X24_TYPELESS,
            (D32_SFLOAT_S8_UINT, FormatUsage::DepthStencilAttachment) => {
                N::D32_FLOAT_S8X24_UINT
            }
            (D32_SFLOAT_S8_UINT, _) if sampled_stencil => N::X32_TYPELESS_G8X24_UINT,
            (D32_SFLOAT_S8_UINT, _) => N::R32_FLOAT_X8X24_TYPELESS,

            (_, FormatUsage::DepthStencilAttachment) => N::UNKNOWN,
            _ => self.native_color_format(),
        }
    }

    fn native_color_format(self) -> NativeFormat {
        use Format::*;
        use NativeFormat as N;

        match self {
            R8_UNORM => N::R8_UNORM,
            R8_SNORM => N::R8_SNORM,
            R8_UINT => N::R8_UINT,
            R8_SINT => N::R8_SINT,
            R8G8_UNORM => N::R8G8_UNORM,
            R8G8_SNORM => N::R8G8_SNORM,
            R8G8_UINT => N::R8G8_UINT,
            R8G8B8A8_UNORM => N::R8G8B8A8_UNORM,
            R8G8B8A8_SNORM => N::R8G8B8A8_SNORM,
            R8G8B8A8_UINT => N::R8G8B8A8_UINT,
            R8G8B8A8_SINT => N::R8G8B8A8_SINT,
            R8G8B8A8_SRGB => N::R8G8B8A8_UNORM_SRGB,
            B8G8R8A8_UNORM => N::B8G8R8A8_UNORM,
            B8G8R8A8_SRGB => N::B8G8R8A8_UNORM_SRGB,
            R5G6B5_UNORM_PACK16 => N::B5G6R5_UNORM,
            R4G4B4A4_UNORM_PACK16 => N::B4G4R4A4_UNORM,
            R5G5B5A1_UNORM_PACK16 => N::B5G5R5A1_UNORM,
            A2B10G10R10_UNORM_PACK32 => N::R10G10B10A2_UNORM,
            A2B10G10R10_UINT_PACK32 => N::R10G10B10A2_UINT,
            B10G11R11_UFLOAT_PACK32 => N::R11G11B10_FLOAT,
            E5B9G9R9_UFLOAT_PACK32 => N::R9G9B9E5_SHAREDEXP,
            R16_UNORM => N::R16_UNORM,
            R16_SNORM => N::R16_SNORM,
            R16_UINT => N::R16_UINT,
            R16_SINT => N::R16_SINT,
            R16_SFLOAT => N::R16_FLOAT,
            R16G16_UNORM => N::R16G16_UNORM,
            R16G16_SNORM => N::R16G16_SNORM,
            R16G16_UINT => N::R16G16_UINT,
            R16G16_SFLOAT => N::R16G16_FLOAT,
            R16G16B16A16_UNORM => N::R16G16B16A16_UNORM,
            R16G16B16A16_SNORM => N::R16G16B16A16_SNORM,
            R16G16B16A16_UINT => N::R16G16B16A16_UINT,
            R16G16B16A16_SFLOAT => N::R16G16B16A16_FLOAT,
            R32_UINT => N::R32_UINT,
            R32_SINT => N::R32_SINT,
            R32_SFLOAT => N::R32_FLOAT,
            R32G32_UINT => N::R32G32_UINT,
            R32G32_SFLOAT => N::R32G32_FLOAT,
            R32G32B32_SFLOAT => N::R32G32B32_FLOAT,
            R32G32B32A32_UINT => N::R32G32B32A32_UINT,
            R32G32B32A32_SINT => N::R32G32B32A32_SINT,
            R32G32B32A32_SFLOAT => N::R32G32B32A32_FLOAT,
            D16_UNORM | X8_D24_UNORM_PACK32 | D32_SFLOAT | S8_UINT | D24_UNORM_S8_UINT
            | D32_SFLOAT_S8_UINT => N::UNKNOWN,
        }
    }
}

/// How a format is going to be used, which selects its native encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormatUsage {
    /// The format of the resource memory itself. Depth formats are typeless.
    Storage,
    /// A vertex attribute.
    VertexBuffer,
    /// A color attachment.
    ColorAttachment,
    /// A depth/stencil attachment.
    DepthStencilAttachment,
    /// A sampled or storage view.
    Sampled,
}

/// The texel encoding understood by the texture unit and the fixed-function copy unit.
///
/// The discriminants are the values programmed into hardware registers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
#[non_exhaustive]
pub enum TextureDataFormat {
    R8 = 0,
    R8Snorm = 1,
    Rg8 = 2,
    Rg8Snorm = 3,
    Rgba8 = 4,
    Rgba8Snorm = 5,
    Rgb565 = 6,
    Rgba4 = 7,
    Rgb5A1 = 8,
    Rgb10A2 = 9,
    R16 = 10,
    R16Snorm = 11,
    Rg16 = 12,
    Rg16Snorm = 13,
    Rgba16 = 14,
    Rgba16Snorm = 15,
    R16f = 16,
    Rg16f = 17,
    Rgba16f = 18,
    R11fG11fB10f = 19,
    Rgb9E5 = 20,
    DepthComp16 = 21,
    DepthComp24 = 22,
    DepthComp32f = 23,
    Depth24X8 = 24,
    R4 = 25,
    R1 = 26,
    S8 = 27,
    S16 = 28,
    R32f = 29,
    Rg32f = 30,
    Rgba32f = 31,
    R8i = 96,
    R8ui = 97,
    Rg8i = 98,
    Rg8ui = 99,
    Rgba8i = 100,
    Rgba8ui = 101,
    R16i = 102,
    R16ui = 103,
    Rg16i = 104,
    Rg16ui = 105,
    Rgba16i = 106,
    Rgba16ui = 107,
    R32i = 108,
    R32ui = 109,
    Rg32i = 110,
    Rg32ui = 111,
    Rgba32i = 112,
    Rgba32ui = 113,
    Rgb10A2ui = 114,
}

impl TextureDataFormat {
    /// Returns whether the fixed-function copy unit can read and write this encoding.
    ///
    /// 32-bit float and shared-exponent encodings can be copied, but the unit can't filter them
    /// while generating mipmaps.
    pub fn supported_by_tfu(self, for_mipmap: bool) -> bool {
        use TextureDataFormat as T;

        if self as u8 <= T::R11fG11fB10f as u8 || self == T::R4 {
            return true;
        }

        !for_mipmap && matches!(self, T::Rgb9E5 | T::R32f | T::Rg32f | T::Rgba32f)
    }
}

/// How the tile buffer loads and stores a format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RenderTargetFormat {
    /// The format of the data in memory.
    pub output: OutputImageFormat,
    /// The per-channel type of the data inside the tile buffer.
    pub internal_type: InternalType,
    /// The per-pixel size of the data inside the tile buffer.
    pub internal_bpp: InternalBpp,
}

/// The memory encoding written by the tile buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum OutputImageFormat {
    Srgb8Alpha8,
    Rgba8,
    Rgba8i,
    Rgba8ui,
    Rg8,
    Rg8ui,
    R8,
    R8i,
    R8ui,
    Bgr565,
    Abgr4444,
    Abgr1555,
    Rgb10A2,
    Rgb10A2ui,
    R11fG11fB10f,
    Rgba16f,
    Rgba16ui,
    Rg16f,
    Rg16ui,
    R16f,
    R16i,
    R16ui,
    Rgba32f,
    Rgba32i,
    Rgba32ui,
    Rg32f,
    Rg32ui,
    R32f,
    R32i,
    R32ui,
    D16,
    D24S8,
    D32f,
    S8,
}

/// The per-channel type of pixels inside the tile buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InternalType {
    Int8Signed,
    Int8Unsigned,
    Int8,
    Int16Signed,
    Int16Unsigned,
    Float16,
    Int32Signed,
    Int32Unsigned,
    Float32,
    Depth16,
    Depth24,
    Depth32f,
}

impl InternalType {
    fn bpp(self, channels: u32) -> InternalBpp {
        match self {
            Self::Int8Signed | Self::Int8Unsigned | Self::Int8 => InternalBpp::Bpp32,
            Self::Int16Signed | Self::Int16Unsigned | Self::Float16 if channels <= 2 => {
                InternalBpp::Bpp32
            }
            Self::Int16Signed | Self::Int16Unsigned | Self::Float16 => InternalBpp::Bpp64,
            Self::Int32Signed | Self::Int32Unsigned | Self::Float32 => match channels {
                1 => InternalBpp::Bpp32,
                2 => InternalBpp::Bpp64,
                _ => InternalBpp::Bpp128,
            },
            Self::Depth16 | Self::Depth24 | Self::Depth32f => InternalBpp::Bpp32,
        }
    }
}

/// The per-pixel size of the data inside the tile buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u32)]
pub enum InternalBpp {
    Bpp32 = 0,
    Bpp64 = 1,
    Bpp128 = 2,
}

/// A D3D12-style pixel format.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum NativeFormat {
    #[default]
    UNKNOWN,
    R32G32B32A32_FLOAT,
    R32G32B32A32_UINT,
    R32G32B32A32_SINT,
    R32G32B32_FLOAT,
    R16G16B16A16_FLOAT,
    R16G16B16A16_UNORM,
    R16G16B16A16_UINT,
    R16G16B16A16_SNORM,
    R32G32_FLOAT,
    R32G32_UINT,
    R32G8X24_TYPELESS,
    D32_FLOAT_S8X24_UINT,
    R32_FLOAT_X8X24_TYPELESS,
    X32_TYPELESS_G8X24_UINT,
    R10G10B10A2_UNORM,
    R10G10B10A2_UINT,
    R11G11B10_FLOAT,
    R8G8B8A8_UNORM,
    R8G8B8A8_UNORM_SRGB,
    R8G8B8A8_UINT,
    R8G8B8A8_SNORM,
    R8G8B8A8_SINT,
    R16G16_FLOAT,
    R16G16_UNORM,
    R16G16_UINT,
    R16G16_SNORM,
    R32_TYPELESS,
    D32_FLOAT,
    R32_FLOAT,
    R32_UINT,
    R32_SINT,
    R24G8_TYPELESS,
    D24_UNORM_S8_UINT,
    R24_UNORM_X8_TYPELESS,
    X24_TYPELESS_G8_UINT,
    R8G8_UNORM,
    R8G8_UINT,
    R8G8_SNORM,
    R16_TYPELESS,
    R16_FLOAT,
    D16_UNORM,
    R16_UNORM,
    R16_UINT,
    R16_SNORM,
    R16_SINT,
    R8_UNORM,
    R8_UINT,
    R8_SNORM,
    R8_SINT,
    R9G9B9E5_SHAREDEXP,
    B5G6R5_UNORM,
    B5G5R5A1_UNORM,
    B8G8R8A8_UNORM,
    B8G8R8A8_UNORM_SRGB,
    B4G4R4A4_UNORM,
}

/// Returns the width in pixels of a micro-tile for texels of `cpp` bytes.
pub fn utile_width(cpp: u32) -> u32 {
    match cpp {
        1 | 2 => 8,
        4 | 8 => 4,
        16 => 2,
        _ => unreachable!("unknown texel size {}", cpp),
    }
}

/// Returns the height in pixels of a micro-tile for texels of `cpp` bytes.
pub fn utile_height(cpp: u32) -> u32 {
    match cpp {
        1 => 8,
        2 | 4 => 4,
        8 | 16 => 2,
        _ => unreachable!("unknown texel size {}", cpp),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        utile_height, utile_width, Format, FormatUsage, InternalBpp, NativeFormat,
        TextureDataFormat,
    };
    use crate::image::ImageAspects;

    #[test]
    fn tfu_support_depends_on_mipmap() {
        assert!(TextureDataFormat::Rgba8.supported_by_tfu(true));
        assert!(TextureDataFormat::R4.supported_by_tfu(true));
        assert!(TextureDataFormat::R32f.supported_by_tfu(false));
        assert!(!TextureDataFormat::R32f.supported_by_tfu(true));
        assert!(!TextureDataFormat::Rgb9E5.supported_by_tfu(true));
        assert!(!TextureDataFormat::Rgba8ui.supported_by_tfu(false));
        assert!(!TextureDataFormat::DepthComp16.supported_by_tfu(false));
    }

    #[test]
    fn tfu_copy_format_by_texel_size() {
        for format in [
            Format::R8_UNORM,
            Format::R5G6B5_UNORM_PACK16,
            Format::R8G8B8A8_SRGB,
            Format::R16G16B16A16_UINT,
            Format::R32G32B32A32_SINT,
        ] {
            let copy = Format::tfu_copy_format(format.block_size()).unwrap();
            assert_eq!(copy.block_size(), format.block_size());
            assert!(copy
                .texture_data_format()
                .unwrap()
                .supported_by_tfu(false));
        }

        assert_eq!(Format::tfu_copy_format(12), None);
    }

    #[test]
    fn msaa_resolve_needs_8bit_or_half_float() {
        assert!(Format::R8G8B8A8_UNORM.supports_tlb_msaa_resolve());
        assert!(Format::R16G16B16A16_SFLOAT.supports_tlb_msaa_resolve());
        assert!(!Format::R32_SFLOAT.supports_tlb_msaa_resolve());
        assert!(!Format::R8G8B8A8_UINT.supports_tlb_msaa_resolve());
        assert!(!Format::R16_UNORM.supports_tlb_msaa_resolve());
    }

    #[test]
    fn internal_bpp() {
        let bpp = |format: Format| format.render_target_format().unwrap().internal_bpp;
        assert_eq!(bpp(Format::R8G8B8A8_UNORM), InternalBpp::Bpp32);
        assert_eq!(bpp(Format::R16G16_SFLOAT), InternalBpp::Bpp32);
        assert_eq!(bpp(Format::R16G16B16A16_SFLOAT), InternalBpp::Bpp64);
        assert_eq!(bpp(Format::R32G32_SFLOAT), InternalBpp::Bpp64);
        assert_eq!(bpp(Format::R32G32B32A32_UINT), InternalBpp::Bpp128);
    }

    #[test]
    fn depth_native_formats() {
        let none = ImageAspects::empty();
        let format = Format::D24_UNORM_S8_UINT;
        assert_eq!(
            format.native_format(FormatUsage::Storage, none),
            NativeFormat::R24G8_TYPELESS
        );
        assert_eq!(
            format.native_format(FormatUsage::DepthStencilAttachment, none),
            NativeFormat::D24_UNORM_S8_UINT
        );
        assert_eq!(
            format.native_format(FormatUsage::Sampled, ImageAspects::DEPTH),
            NativeFormat::R24_UNORM_X8_TYPELESS
        );
        assert_eq!(
            format.native_format(FormatUsage::Sampled, ImageAspects::STENCIL),
            NativeFormat::X24_TYPELESS_G8_UINT
        );
        assert_eq!(
            Format::R8G8B8A8_UNORM.native_format(FormatUsage::DepthStencilAttachment, none),
            NativeFormat::UNKNOWN
        );
        assert_eq!(
            Format::R32G32B32_SFLOAT.native_format(FormatUsage::VertexBuffer, none),
            NativeFormat::R32G32B32_FLOAT
        );
    }

    #[test]
    fn utiles_are_64_bytes() {
        for cpp in [1, 2, 4, 8, 16] {
            assert_eq!(utile_width(cpp) * utile_height(cpp) * cpp, 64);
        }
    }

    #[test]
    fn vk_conversion() {
        let vk: ash::vk::Format = Format::D32_SFLOAT_S8_UINT.into();
        assert_eq!(vk, ash::vk::Format::D32_SFLOAT_S8_UINT);
        assert_eq!(Format::try_from(vk), Ok(Format::D32_SFLOAT_S8_UINT));
        assert!(Format::try_from(ash::vk::Format::BC1_RGB_UNORM_BLOCK).is_err());
    }
}

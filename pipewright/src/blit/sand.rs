//! Repacking of column-interleaved ("SAND") video planes.
//!
//! Video decoders write luma and chroma planes as 128-byte-wide columns. The texture unit can't
//! read that layout, so the plane is repacked into a tiled image by a fragment shader that reads
//! the raw bytes of the source and writes 32-bit texels.

use super::{BlitInfo, BlitStrategy, SurfaceView};
use crate::{
    cache::OnceCache,
    device::Device,
    format::Format,
    image::ImageAspects,
    VulkanError,
};
use ash::vk;
use bytemuck::{Pod, Zeroable};
use std::sync::Arc;

/// The internal shaders the blitter draws with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinShader {
    /// Vertex shader of the repack draws.
    SandRepackVertex,
    /// Fragment shader repacking a plane of 1-byte texels.
    SandRepackLuma,
    /// Fragment shader repacking a plane of 2-byte texels.
    SandRepackChroma,
}

/// A range of an image's memory bound as a raw buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceRange {
    pub image: vk::Image,
    pub offset: u64,
    pub size: u64,
}

/// A full-surface draw with an internal shader pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomShaderDraw {
    /// The surface that is rendered to.
    pub target: SurfaceView,
    /// The width of the rendered area, in texels of the target format.
    pub width: u32,
    /// The height of the rendered area, in texels of the target format.
    pub height: u32,
    pub vertex_shader: vk::ShaderModule,
    pub fragment_shader: vk::ShaderModule,
    /// The contents of the fragment shader's first uniform buffer.
    pub uniforms: Vec<u8>,
    /// The memory the fragment shader reads.
    pub source: SourceRange,
}

#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
struct SandUniforms {
    /// Height of a column, in rows.
    stride: u32,
}

/// Repacks column-interleaved 8-bit luma or chroma planes into tiled images.
///
/// The shaders are created on first use and freed when the strategy is dropped.
#[derive(Debug)]
pub struct SandRepack {
    device: Arc<Device>,
    shaders: OnceCache<BuiltinShader, vk::ShaderModule>,
}

impl SandRepack {
    /// Creates a `SandRepack` for `device`.
    #[inline]
    pub fn new(device: Arc<Device>) -> Self {
        SandRepack {
            device,
            shaders: OnceCache::new(),
        }
    }

    fn shader(&self, shader: BuiltinShader) -> Result<vk::ShaderModule, VulkanError> {
        self.shaders.get_or_try_insert(&shader, || {
            tracing::debug!(?shader, "creating builtin shader");
            let module = self.device.backend().create_builtin_shader(shader)?;

            Ok((shader, module))
        })
    }
}

impl Drop for SandRepack {
    fn drop(&mut self) {
        for (_, module) in self.shaders.drain() {
            self.device.backend().destroy_builtin_shader(module);
        }
    }
}

impl BlitStrategy for SandRepack {
    fn name(&self) -> &'static str {
        "sand"
    }

    fn try_apply(&self, device: &Arc<Device>, info: &BlitInfo) -> ImageAspects {
        let (src, dst) = (&info.src, &info.dst);

        let Some(stride) = src.image.sand_col128_stride() else {
            return ImageAspects::empty();
        };

        if src.image.is_tiled()
            || !matches!(src.image.format(), Format::R8_UNORM | Format::R8G8_UNORM)
            || !info.aspects.intersects(ImageAspects::COLOR)
        {
            return ImageAspects::empty();
        }

        assert_eq!(dst.format, src.format);
        assert!(dst.image.is_tiled(), "the repacked plane must be written to a tiled image");
        assert!(src.region.x == 0 && dst.region.x == 0);
        assert!(src.region.y == 0 && dst.region.y == 0);
        assert_eq!(src.region.width, dst.region.width);
        assert_eq!(src.region.height, dst.region.height);

        debug_assert!(Arc::ptr_eq(device, &self.device));

        let cpp = src.image.format().block_size();
        let fragment = if cpp == 1 {
            BuiltinShader::SandRepackLuma
        } else {
            BuiltinShader::SandRepackChroma
        };

        let shaders = self
            .shader(BuiltinShader::SandRepackVertex)
            .and_then(|vs| Ok((vs, self.shader(fragment)?)));

        let (vertex_shader, fragment_shader) = match shaders {
            Ok(shaders) => shaders,
            Err(err) => {
                tracing::warn!(%err, "failed to create the repack shaders");
                return ImageAspects::empty();
            }
        };

        // The source texels are 1 or 2 bytes, but the shader writes 4-byte texels, so the target
        // is narrowed to match. The width is aligned to the micro-tile width first.
        let [level_width, level_height, _] = dst.level_extent();
        let mut height = level_height;

        if cpp == 1 {
            height /= 2;
        }

        let slice_offset = src.image.slice(src.level).offset;
        let draw = CustomShaderDraw {
            target: SurfaceView::layer(
                &dst.image,
                Format::R8G8B8A8_UNORM,
                dst.level,
                dst.region.z as u32,
            ),
            width: level_width.next_multiple_of(8) / 2,
            height,
            vertex_shader,
            fragment_shader,
            uniforms: bytemuck::bytes_of(&SandUniforms { stride }).to_vec(),
            source: SourceRange {
                image: src.image.handle(),
                offset: slice_offset,
                size: src.image.size() - slice_offset,
            },
        };

        if let Err(err) = device.backend().draw_custom_shader(&draw) {
            tracing::warn!(%err, "failed to draw into the repacked plane");
            return ImageAspects::empty();
        }

        ImageAspects::COLOR
    }
}

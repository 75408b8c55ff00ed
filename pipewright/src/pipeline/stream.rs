//! The native description of a pipeline, as a sequence of typed state fragments.
//!
//! A [`PipelineStateStream`] is what the backend receives to create a native pipeline-state
//! object. Each piece of state is one [`StateFragment`], and each kind of fragment appears at
//! most once. Fragments only exist for state that is actually used: a pipeline with rasterizer
//! discard has no blend or depth-stencil fragment, for example.
//!
//! The stream also accounts for the bytes its fragments would take in a packed native stream,
//! where each fragment is a 32-bit type tag followed by its payload, aligned to a pointer. This
//! size is bounded by [`MAX_GRAPHICS_STREAM_SIZE`] or [`MAX_COMPUTE_STREAM_SIZE`], so the packed
//! stream can live in a fixed-size buffer.

use crate::{
    format::NativeFormat,
    pipeline::{
        graphics::{
            color_blend::NativeBlendDesc,
            depth_stencil::NativeDepthStencilDesc,
            input_assembly::{NativePrimitiveTopologyType, NativeStripCut},
            multisample::NativeSampleDesc,
            rasterization::NativeRasterizerDesc,
            subpass::NativeRtFormatArray,
            vertex_input::NativeInputElement,
        },
        PipelineBindPoint,
    },
};
use ash::vk;
use std::{
    mem::{align_of, size_of},
    sync::Arc,
};

/// The compiled code of one shader stage.
pub type ShaderBytecode = Arc<[u8]>;

/// One piece of native pipeline state.
#[derive(Clone, Debug, PartialEq)]
pub enum StateFragment {
    RootSignature(vk::PipelineLayout),
    VertexShader(ShaderBytecode),
    HullShader(ShaderBytecode),
    DomainShader(ShaderBytecode),
    GeometryShader(ShaderBytecode),
    PixelShader(ShaderBytecode),
    ComputeShader(ShaderBytecode),
    Blend(NativeBlendDesc),
    SampleMask(u32),
    Rasterizer(NativeRasterizerDesc),
    InputLayout(Vec<NativeInputElement>),
    IndexBufferStripCut(NativeStripCut),
    PrimitiveTopology(NativePrimitiveTopologyType),
    RenderTargetFormats(NativeRtFormatArray),
    DepthStencilFormat(NativeFormat),
    SampleDesc(NativeSampleDesc),
    DepthStencil(NativeDepthStencilDesc),
}

impl StateFragment {
    /// Returns the kind of the fragment.
    pub fn kind(&self) -> FragmentKind {
        match self {
            Self::RootSignature(_) => FragmentKind::RootSignature,
            Self::VertexShader(_) => FragmentKind::VertexShader,
            Self::HullShader(_) => FragmentKind::HullShader,
            Self::DomainShader(_) => FragmentKind::DomainShader,
            Self::GeometryShader(_) => FragmentKind::GeometryShader,
            Self::PixelShader(_) => FragmentKind::PixelShader,
            Self::ComputeShader(_) => FragmentKind::ComputeShader,
            Self::Blend(_) => FragmentKind::Blend,
            Self::SampleMask(_) => FragmentKind::SampleMask,
            Self::Rasterizer(_) => FragmentKind::Rasterizer,
            Self::InputLayout(_) => FragmentKind::InputLayout,
            Self::IndexBufferStripCut(_) => FragmentKind::IndexBufferStripCut,
            Self::PrimitiveTopology(_) => FragmentKind::PrimitiveTopology,
            Self::RenderTargetFormats(_) => FragmentKind::RenderTargetFormats,
            Self::DepthStencilFormat(_) => FragmentKind::DepthStencilFormat,
            Self::SampleDesc(_) => FragmentKind::SampleDesc,
            Self::DepthStencil(_) => FragmentKind::DepthStencil,
        }
    }
}

/// The kind of a [`StateFragment`], without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    RootSignature,
    VertexShader,
    HullShader,
    DomainShader,
    GeometryShader,
    PixelShader,
    ComputeShader,
    Blend,
    SampleMask,
    Rasterizer,
    InputLayout,
    IndexBufferStripCut,
    PrimitiveTopology,
    RenderTargetFormats,
    DepthStencilFormat,
    SampleDesc,
    DepthStencil,
}

impl FragmentKind {
    /// Every kind a graphics pipeline can emit.
    pub const GRAPHICS: [FragmentKind; 16] = [
        Self::RootSignature,
        Self::VertexShader,
        Self::HullShader,
        Self::DomainShader,
        Self::GeometryShader,
        Self::PixelShader,
        Self::Blend,
        Self::SampleMask,
        Self::Rasterizer,
        Self::InputLayout,
        Self::IndexBufferStripCut,
        Self::PrimitiveTopology,
        Self::RenderTargetFormats,
        Self::DepthStencilFormat,
        Self::SampleDesc,
        Self::DepthStencil,
    ];

    /// Every kind a compute pipeline can emit.
    pub const COMPUTE: [FragmentKind; 2] = [Self::RootSignature, Self::ComputeShader];

    /// Returns the number of bytes a fragment of this kind takes in a packed stream.
    pub const fn size(self) -> usize {
        match self {
            Self::RootSignature => fragment_size::<vk::PipelineLayout>(),
            Self::VertexShader
            | Self::HullShader
            | Self::DomainShader
            | Self::GeometryShader
            | Self::PixelShader
            | Self::ComputeShader => fragment_size::<ShaderBytecode>(),
            Self::Blend => fragment_size::<NativeBlendDesc>(),
            Self::SampleMask => fragment_size::<u32>(),
            Self::Rasterizer => fragment_size::<NativeRasterizerDesc>(),
            Self::InputLayout => fragment_size::<Vec<NativeInputElement>>(),
            Self::IndexBufferStripCut => fragment_size::<NativeStripCut>(),
            Self::PrimitiveTopology => fragment_size::<NativePrimitiveTopologyType>(),
            Self::RenderTargetFormats => fragment_size::<NativeRtFormatArray>(),
            Self::DepthStencilFormat => fragment_size::<NativeFormat>(),
            Self::SampleDesc => fragment_size::<NativeSampleDesc>(),
            Self::DepthStencil => fragment_size::<NativeDepthStencilDesc>(),
        }
    }
}

const fn align_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}

/// Returns the number of bytes a fragment with a payload of type `T` takes in a packed stream:
/// a 32-bit tag, the payload at its natural alignment, and padding up to pointer alignment.
pub const fn fragment_size<T>() -> usize {
    align_up(
        align_up(size_of::<u32>(), align_of::<T>()) + size_of::<T>(),
        align_of::<usize>(),
    )
}

const fn total_size(kinds: &[FragmentKind]) -> usize {
    let mut size = 0;
    let mut i = 0;

    while i < kinds.len() {
        size += kinds[i].size();
        i += 1;
    }

    size
}

/// The maximum packed size of the stream of a graphics pipeline.
pub const MAX_GRAPHICS_STREAM_SIZE: usize = total_size(&FragmentKind::GRAPHICS);

/// The maximum packed size of the stream of a compute pipeline.
pub const MAX_COMPUTE_STREAM_SIZE: usize = total_size(&FragmentKind::COMPUTE);

/// An ordered collection of state fragments describing a native pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineStateStream {
    bind_point: PipelineBindPoint,
    fragments: Vec<StateFragment>,
    size: usize,
}

impl PipelineStateStream {
    /// Returns an empty stream for a graphics pipeline.
    #[inline]
    pub fn graphics() -> Self {
        Self {
            bind_point: PipelineBindPoint::Graphics,
            fragments: Vec::with_capacity(FragmentKind::GRAPHICS.len()),
            size: 0,
        }
    }

    /// Returns an empty stream for a compute pipeline.
    #[inline]
    pub fn compute() -> Self {
        Self {
            bind_point: PipelineBindPoint::Compute,
            fragments: Vec::with_capacity(FragmentKind::COMPUTE.len()),
            size: 0,
        }
    }

    /// Returns the kind of pipeline the stream describes.
    #[inline]
    pub fn bind_point(&self) -> PipelineBindPoint {
        self.bind_point
    }

    /// Returns the maximum packed size of the stream.
    #[inline]
    pub fn max_size(&self) -> usize {
        match self.bind_point {
            PipelineBindPoint::Graphics => MAX_GRAPHICS_STREAM_SIZE,
            PipelineBindPoint::Compute => MAX_COMPUTE_STREAM_SIZE,
        }
    }

    /// Appends a fragment.
    ///
    /// # Panics
    ///
    /// - Panics if a pipeline of the stream's bind point can't take a fragment of this kind.
    /// - Panics if a fragment of the same kind is already in the stream.
    /// - Panics if the stream would exceed its maximum size.
    #[track_caller]
    pub fn push(&mut self, fragment: StateFragment) {
        let kind = fragment.kind();
        let allowed: &[FragmentKind] = match self.bind_point {
            PipelineBindPoint::Graphics => &FragmentKind::GRAPHICS,
            PipelineBindPoint::Compute => &FragmentKind::COMPUTE,
        };

        assert!(
            allowed.contains(&kind),
            "a {:?} fragment is not valid in a {:?} pipeline stream",
            kind,
            self.bind_point,
        );
        assert!(
            self.get(kind).is_none(),
            "a {:?} fragment is already in the stream",
            kind,
        );
        assert!(
            self.size + kind.size() <= self.max_size(),
            "the {:?} fragment exceeds the maximum stream size",
            kind,
        );

        self.size += kind.size();
        self.fragments.push(fragment);
    }

    /// Returns the fragments in the order they were pushed.
    #[inline]
    pub fn fragments(&self) -> &[StateFragment] {
        &self.fragments
    }

    /// Returns the kinds of the fragments in the order they were pushed.
    #[inline]
    pub fn kinds(&self) -> impl Iterator<Item = FragmentKind> + '_ {
        self.fragments.iter().map(StateFragment::kind)
    }

    /// Returns the fragment of the given kind, if present.
    #[inline]
    pub fn get(&self, kind: FragmentKind) -> Option<&StateFragment> {
        self.fragments.iter().find(|fragment| fragment.kind() == kind)
    }

    /// Returns the packed size of the stream in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }
}

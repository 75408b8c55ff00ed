//! Indirect draws and dispatches.
//!
//! An indirect command reads its arguments from a buffer written by the application or by a
//! shader. Before a draw or dispatch can read them natively, the arguments are rewritten into
//! *exec params*, one per command, and a command signature tells the native command processor how
//! to read each of them: which system values to load into the sysval root constants, then which
//! call to make.
//!
//! Command signatures depend on the root signature, so they belong to a pipeline. They are created
//! the first time a pipeline is used for an indirect command and cached on it.

use ash::vk;
use bytemuck::{Pod, Zeroable};
use smallvec::SmallVec;
use std::mem::{offset_of, size_of};

/// System values read by the pre-rasterization stages, stored in the sysval root constants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct VertexRuntimeData {
    pub first_vertex: u32,
    pub base_instance: u32,
    pub is_indexed_draw: u32,
    pub draw_id: u32,
    pub yz_flip_mask: u32,
}

/// System values read by compute shaders, stored in the sysval root constants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct ComputeRuntimeData {
    pub group_count: [u32; 3],
}

/// The number of 32-bit values of the sysval root constants.
pub const NUM_SYSVAL_VALUES: u32 = {
    let vertex = size_of::<VertexRuntimeData>();
    let compute = size_of::<ComputeRuntimeData>();
    let size = if vertex > compute { vertex } else { compute };

    (size / 4) as u32
};

/// The system values of one indirect draw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct IndirectDrawSysvals {
    pub first_vertex: u32,
    pub base_instance: u32,
    pub draw_id: u32,
}

/// The native arguments of an indexed draw.
///
/// Non-indexed draws read the first four fields with the meaning of vertex count, instance count,
/// first vertex and first instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct DrawIndexedArguments {
    pub index_count_per_instance: u32,
    pub instance_count: u32,
    pub start_index_location: u32,
    pub base_vertex_location: i32,
    pub start_instance_location: u32,
}

/// A native index buffer binding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct IndexBufferView {
    pub buffer_location: u64,
    pub size_in_bytes: u32,
    pub format: u32,
}

/// The native arguments of a dispatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct DispatchArguments {
    pub thread_group_count: [u32; 3],
}

/// The exec params of an indirect draw or indexed draw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct IndirectDrawExecParams {
    pub sysvals: IndirectDrawSysvals,
    pub draw: DrawIndexedArguments,
}

/// The exec params of an indirect triangle-fan draw, which goes through a generated index buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct IndirectTriangleFanDrawExecParams {
    pub index_buffer_view: IndexBufferView,
    pub sysvals: IndirectDrawSysvals,
    pub draw: DrawIndexedArguments,
}

/// The exec params of an indirect dispatch. The group count is loaded into the sysvals, then
/// dispatched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct IndirectDispatchExecParams {
    pub sysvals: DispatchArguments,
    pub dispatch: DispatchArguments,
}

/// The kind of an indirect draw, each of which has its own command signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndirectDrawKind {
    Draw,
    DrawIndexed,
    TriangleFan,
}

impl IndirectDrawKind {
    /// Returns whether the draw reads an index buffer.
    #[inline]
    pub fn is_indexed(self) -> bool {
        matches!(self, Self::DrawIndexed | Self::TriangleFan)
    }

    /// Returns the size of one exec params entry.
    #[inline]
    pub fn exec_params_stride(self) -> u32 {
        match self {
            Self::Draw | Self::DrawIndexed => size_of::<IndirectDrawExecParams>() as u32,
            Self::TriangleFan => size_of::<IndirectTriangleFanDrawExecParams>() as u32,
        }
    }
}

/// One argument of a command signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndirectArgument {
    /// Binds an [`IndexBufferView`].
    IndexBufferView,

    /// Writes 32-bit values into root constants.
    Constant {
        root_parameter_index: u32,
        dest_offset_in_32bit_values: u32,
        num_32bit_values: u32,
    },

    /// A non-indexed draw.
    Draw,

    /// An indexed draw.
    DrawIndexed,

    /// A dispatch.
    Dispatch,
}

/// The description of a command signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSignatureDesc {
    /// The size of one exec params entry.
    pub byte_stride: u32,

    /// The arguments, in the order they are read from an entry.
    pub arguments: SmallVec<[IndirectArgument; 4]>,

    /// The root signature the constants are written to.
    pub root_signature: vk::PipelineLayout,
}

impl CommandSignatureDesc {
    /// Returns the description of the signature of an indirect draw.
    pub fn draw(
        kind: IndirectDrawKind,
        root_signature: vk::PipelineLayout,
        sysval_parameter_index: u32,
    ) -> Self {
        let mut arguments = SmallVec::new();

        if kind == IndirectDrawKind::TriangleFan {
            arguments.push(IndirectArgument::IndexBufferView);
        }

        arguments.push(IndirectArgument::Constant {
            root_parameter_index: sysval_parameter_index,
            dest_offset_in_32bit_values: (offset_of!(VertexRuntimeData, first_vertex) / 4) as u32,
            num_32bit_values: 2,
        });
        arguments.push(IndirectArgument::Constant {
            root_parameter_index: sysval_parameter_index,
            dest_offset_in_32bit_values: (offset_of!(VertexRuntimeData, draw_id) / 4) as u32,
            num_32bit_values: 1,
        });
        arguments.push(if kind.is_indexed() {
            IndirectArgument::DrawIndexed
        } else {
            IndirectArgument::Draw
        });

        CommandSignatureDesc {
            byte_stride: kind.exec_params_stride(),
            arguments,
            root_signature,
        }
    }

    /// Returns the description of the signature of an indirect dispatch.
    pub fn dispatch(root_signature: vk::PipelineLayout, sysval_parameter_index: u32) -> Self {
        CommandSignatureDesc {
            byte_stride: size_of::<IndirectDispatchExecParams>() as u32,
            arguments: SmallVec::from_slice(&[
                IndirectArgument::Constant {
                    root_parameter_index: sysval_parameter_index,
                    dest_offset_in_32bit_values: 0,
                    num_32bit_values: 3,
                },
                IndirectArgument::Dispatch,
            ]),
            root_signature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CommandSignatureDesc, IndirectArgument, IndirectDispatchExecParams, IndirectDrawExecParams,
        IndirectDrawKind, IndirectTriangleFanDrawExecParams, NUM_SYSVAL_VALUES,
    };
    use ash::vk;
    use std::mem::size_of;

    #[test]
    fn exec_params_strides() {
        assert_eq!(size_of::<IndirectDrawExecParams>(), 32);
        assert_eq!(size_of::<IndirectTriangleFanDrawExecParams>(), 48);
        assert_eq!(size_of::<IndirectDispatchExecParams>(), 24);
        assert_eq!(NUM_SYSVAL_VALUES, 5);

        let params = IndirectDrawExecParams::default();
        assert_eq!(bytemuck::bytes_of(&params).len(), 32);
    }

    #[test]
    fn triangle_fan_signature() {
        let desc = CommandSignatureDesc::draw(
            IndirectDrawKind::TriangleFan,
            vk::PipelineLayout::null(),
            3,
        );

        assert_eq!(desc.byte_stride, 48);
        assert_eq!(
            desc.arguments.as_slice(),
            [
                IndirectArgument::IndexBufferView,
                IndirectArgument::Constant {
                    root_parameter_index: 3,
                    dest_offset_in_32bit_values: 0,
                    num_32bit_values: 2,
                },
                IndirectArgument::Constant {
                    root_parameter_index: 3,
                    dest_offset_in_32bit_values: 3,
                    num_32bit_values: 1,
                },
                IndirectArgument::DrawIndexed,
            ],
        );
    }

    #[test]
    fn draw_and_dispatch_signatures() {
        let draw = CommandSignatureDesc::draw(
            IndirectDrawKind::Draw,
            vk::PipelineLayout::null(),
            0,
        );
        assert_eq!(draw.byte_stride, 32);
        assert_eq!(draw.arguments.len(), 3);
        assert_eq!(draw.arguments[2], IndirectArgument::Draw);

        let dispatch = CommandSignatureDesc::dispatch(vk::PipelineLayout::null(), 1);
        assert_eq!(dispatch.byte_stride, 24);
        assert_eq!(dispatch.arguments[1], IndirectArgument::Dispatch);
    }
}

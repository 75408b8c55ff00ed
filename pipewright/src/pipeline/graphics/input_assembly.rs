//! Configures how input vertices are assembled into primitives.

use crate::macros::vulkan_enum;

/// The state in a graphics pipeline describing how the input assembly stage should behave.
#[derive(Clone, Copy, Debug)]
pub struct InputAssemblyState {
    /// The type of primitives.
    ///
    /// The default value is [`PrimitiveTopology::TriangleList`].
    pub topology: PrimitiveTopology,

    /// If true, then when drawing with an index buffer, the special index value consisting of the
    /// maximum unsigned value (`0xffffffff`) will tell the GPU that it is the end of the current
    /// primitive. A new primitive will restart at the next index.
    ///
    /// The default value is `false`.
    pub primitive_restart_enable: bool,

    pub _ne: crate::NonExhaustive,
}

impl Default for InputAssemblyState {
    #[inline]
    fn default() -> Self {
        Self {
            topology: PrimitiveTopology::TriangleList,
            primitive_restart_enable: false,
            _ne: crate::NonExhaustive(()),
        }
    }
}

impl InputAssemblyState {
    /// Returns the native index-buffer strip cut value.
    #[inline]
    pub(crate) fn strip_cut(&self) -> NativeStripCut {
        if self.primitive_restart_enable {
            NativeStripCut::Max32
        } else {
            NativeStripCut::Disabled
        }
    }
}

vulkan_enum! {
    #[non_exhaustive]

    /// Describes how vertices must be grouped together to form primitives.
    PrimitiveTopology = PrimitiveTopology(i32);

    /// A series of separate point primitives.
    PointList = POINT_LIST,

    /// A series of separate line primitives.
    LineList = LINE_LIST,

    /// A series of consecutive line primitives, with consecutive lines sharing a vertex.
    LineStrip = LINE_STRIP,

    /// A series of separate triangle primitives.
    TriangleList = TRIANGLE_LIST,

    /// A series of consecutive triangle primitives, with consecutive triangles sharing an edge
    /// (two vertices).
    TriangleStrip = TRIANGLE_STRIP,

    /// A series of consecutive triangle primitives, with all triangles sharing a common vertex
    /// (the first).
    ///
    /// There is no native fan topology. Fans are drawn as triangle lists through an index buffer
    /// generated at draw time.
    TriangleFan = TRIANGLE_FAN,

    /// As `LineList`, but with adjacency, used in combination with geometry shaders.
    LineListWithAdjacency = LINE_LIST_WITH_ADJACENCY,

    /// As `LineStrip`, but with adjacency, used in combination with geometry shaders.
    LineStripWithAdjacency = LINE_STRIP_WITH_ADJACENCY,

    /// As `TriangleList`, but with adjacency, used in combination with geometry shaders.
    TriangleListWithAdjacency = TRIANGLE_LIST_WITH_ADJACENCY,

    /// As `TriangleStrip`, but with adjacency, used in combination with geometry shaders.
    TriangleStripWithAdjacency = TRIANGLE_STRIP_WITH_ADJACENCY,

    /// Separate patch primitives, used in combination with tessellation shaders.
    PatchList = PATCH_LIST,
}

impl Default for PrimitiveTopology {
    #[inline]
    fn default() -> PrimitiveTopology {
        PrimitiveTopology::TriangleList
    }
}

impl PrimitiveTopology {
    /// Returns the class of primitives this topology produces.
    pub fn topology_type(self) -> NativePrimitiveTopologyType {
        match self {
            Self::PointList => NativePrimitiveTopologyType::Point,
            Self::LineList
            | Self::LineStrip
            | Self::LineListWithAdjacency
            | Self::LineStripWithAdjacency => NativePrimitiveTopologyType::Line,
            Self::TriangleList
            | Self::TriangleStrip
            | Self::TriangleFan
            | Self::TriangleListWithAdjacency
            | Self::TriangleStripWithAdjacency => NativePrimitiveTopologyType::Triangle,
            Self::PatchList => NativePrimitiveTopologyType::Patch,
        }
    }

    /// Returns the topology used at draw time. `patch_control_points` is only read for
    /// `PatchList`.
    pub fn to_native(self, patch_control_points: u32) -> NativePrimitiveTopology {
        match self {
            Self::PointList => NativePrimitiveTopology::POINT_LIST,
            Self::LineList => NativePrimitiveTopology::LINE_LIST,
            Self::LineStrip => NativePrimitiveTopology::LINE_STRIP,
            Self::TriangleList | Self::TriangleFan => NativePrimitiveTopology::TRIANGLE_LIST,
            Self::TriangleStrip => NativePrimitiveTopology::TRIANGLE_STRIP,
            Self::LineListWithAdjacency => NativePrimitiveTopology::LINE_LIST_ADJ,
            Self::LineStripWithAdjacency => NativePrimitiveTopology::LINE_STRIP_ADJ,
            Self::TriangleListWithAdjacency => NativePrimitiveTopology::TRIANGLE_LIST_ADJ,
            Self::TriangleStripWithAdjacency => NativePrimitiveTopology::TRIANGLE_STRIP_ADJ,
            Self::PatchList => NativePrimitiveTopology::patch_list(patch_control_points),
        }
    }
}

/// The class of primitives a native pipeline draws.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum NativePrimitiveTopologyType {
    #[default]
    Undefined = 0,
    Point = 1,
    Line = 2,
    Triangle = 3,
    Patch = 4,
}

/// A native primitive topology, as set at draw time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NativePrimitiveTopology(pub u32);

impl NativePrimitiveTopology {
    pub const UNDEFINED: Self = Self(0);
    pub const POINT_LIST: Self = Self(1);
    pub const LINE_LIST: Self = Self(2);
    pub const LINE_STRIP: Self = Self(3);
    pub const TRIANGLE_LIST: Self = Self(4);
    pub const TRIANGLE_STRIP: Self = Self(5);
    pub const LINE_LIST_ADJ: Self = Self(10);
    pub const LINE_STRIP_ADJ: Self = Self(11);
    pub const TRIANGLE_LIST_ADJ: Self = Self(12);
    pub const TRIANGLE_STRIP_ADJ: Self = Self(13);

    /// Returns the patch list topology with `control_points` points per patch, from 1 to 32.
    #[inline]
    pub const fn patch_list(control_points: u32) -> Self {
        Self(33 + control_points - 1)
    }
}

/// The index value that restarts a strip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum NativeStripCut {
    #[default]
    Disabled = 0,
    Max16 = 1,
    Max32 = 2,
}

#[cfg(test)]
mod tests {
    use super::{
        InputAssemblyState, NativePrimitiveTopology, NativePrimitiveTopologyType, NativeStripCut,
        PrimitiveTopology,
    };

    #[test]
    fn fan_is_a_list() {
        let fan = PrimitiveTopology::TriangleFan;

        assert_eq!(fan.topology_type(), NativePrimitiveTopologyType::Triangle);
        assert_eq!(fan.to_native(0), NativePrimitiveTopology::TRIANGLE_LIST);
        assert_eq!(
            PrimitiveTopology::LineStripWithAdjacency.topology_type(),
            NativePrimitiveTopologyType::Line,
        );
    }

    #[test]
    fn patch_lists() {
        let patch = PrimitiveTopology::PatchList;

        assert_eq!(patch.topology_type(), NativePrimitiveTopologyType::Patch);
        assert_eq!(patch.to_native(1), NativePrimitiveTopology(33));
        assert_eq!(patch.to_native(32), NativePrimitiveTopology(64));
    }

    #[test]
    fn strip_cut() {
        let mut state = InputAssemblyState::default();
        assert_eq!(state.strip_cut(), NativeStripCut::Disabled);

        state.primitive_restart_enable = true;
        assert_eq!(state.strip_cut(), NativeStripCut::Max32);
    }
}

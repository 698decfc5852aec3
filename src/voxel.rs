// src/voxel.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// Bitmasks for [`VoxelType`]'s single byte, canonical per the interface
/// contract (see the bit table in the design notes).
pub mod bits {
    pub const ASSIGNED: u8 = 0x01;
    pub const ATOM: u8 = 0x02;
    pub const CORE: u8 = 0x04;
    pub const SHELL_INNER: u8 = 0x08;
    pub const SHELL_OUTER: u8 = 0x10;
    pub const LARGE_CORE: u8 = 0x20;
    pub const LARGE_SHELL: u8 = 0x40;
}

/// The classification of a single bottom-level voxel, packed into one byte.
/// An unassigned byte (`0`) means the voxel has not yet been visited by
/// pass 1. Bit 0 distinguishes "assigned" from "still a mixed internal
/// node awaiting refinement" at non-bottom octree levels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoxelType(pub u8);

impl VoxelType {
    pub const UNASSIGNED: VoxelType = VoxelType(0);

    pub fn atom() -> Self {
        VoxelType(bits::ASSIGNED | bits::ATOM)
    }

    pub fn core() -> Self {
        VoxelType(bits::ASSIGNED | bits::CORE)
    }

    pub fn shell_inner() -> Self {
        VoxelType(bits::ASSIGNED | bits::SHELL_INNER)
    }

    pub fn shell_outer() -> Self {
        VoxelType(bits::ASSIGNED | bits::SHELL_OUTER)
    }

    pub fn is_assigned(self) -> bool {
        self.0 & bits::ASSIGNED != 0
    }

    pub fn is_atom(self) -> bool {
        self.0 & bits::ATOM != 0
    }

    pub fn is_core(self) -> bool {
        self.0 & bits::CORE != 0
    }

    pub fn is_shell(self) -> bool {
        self.0 & (bits::SHELL_INNER | bits::SHELL_OUTER) != 0
    }

    pub fn is_shell_inner(self) -> bool {
        self.0 & bits::SHELL_INNER != 0
    }

    pub fn is_shell_outer(self) -> bool {
        self.0 & bits::SHELL_OUTER != 0
    }

    /// True for core/shell voxels: the small-probe solvent-excluded volume.
    /// Atom voxels are excluded; they belong to the molecule itself.
    pub fn is_solvent_excluded(self) -> bool {
        self.is_core() || self.is_shell()
    }

    pub fn with_large_core(self) -> Self {
        VoxelType(self.0 | bits::ASSIGNED | bits::LARGE_CORE)
    }

    pub fn with_large_shell(self) -> Self {
        VoxelType(self.0 | bits::ASSIGNED | bits::LARGE_SHELL)
    }

    pub fn is_large_core(self) -> bool {
        self.0 & bits::LARGE_CORE != 0
    }

    pub fn is_large_shell(self) -> bool {
        self.0 & bits::LARGE_SHELL != 0
    }

    /// Flips a shell voxel's inner/outer subtype without touching any
    /// other bit, used when the exterior flood fill in pass 2 reaches a
    /// voxel provisionally marked `shell_inner`.
    pub fn mark_shell_outer(&mut self) {
        debug_assert!(self.is_shell(), "mark_shell_outer on a non-shell voxel");
        self.0 = (self.0 & !bits::SHELL_INNER) | bits::SHELL_OUTER;
    }
}

impl fmt::Display for VoxelType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

/// A node of the octree Space refines atoms into. A voxel is either a
/// classified leaf (`children: None`) or a mixed internal node
/// (`children: Some`) holding exactly 8 octants, refined because pass 1
/// could not prove the whole voxel is uniformly atom/core/void at this
/// level. Only bottom-level voxels (`depth == max_depth`) are ever leaves
/// with `kind.is_assigned() == false`'s opposite guaranteed false; every
/// leaf at the bottom level carries a final classification.
#[derive(Clone, Debug, Default)]
pub struct Voxel {
    pub kind: VoxelType,
    pub children: Option<Box<[Voxel; 8]>>,
}

impl Voxel {
    pub fn leaf(kind: VoxelType) -> Self {
        Voxel {
            kind,
            children: None,
        }
    }

    pub fn mixed() -> Self {
        Voxel {
            kind: VoxelType::UNASSIGNED,
            children: Some(Box::new(std::array::from_fn(|_| Voxel::default()))),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Octant index `0..8` of `point` relative to `center`, encoding
    /// x/y/z sign as bits 0/1/2. Matches the corner-offset convention used
    /// when a parent voxel's center is split into its 8 children.
    pub fn octant_of(point: [f64; 3], center: [f64; 3]) -> usize {
        let mut idx = 0;
        if point[0] >= center[0] {
            idx |= 0b001;
        }
        if point[1] >= center[1] {
            idx |= 0b010;
        }
        if point[2] >= center[2] {
            idx |= 0b100;
        }
        idx
    }

    /// Center offset (in units of quarter-side-length) of child `octant`
    /// relative to its parent's center, using the same bit convention as
    /// [`Voxel::octant_of`].
    pub fn octant_offset(octant: usize) -> [f64; 3] {
        let sign = |bit: usize| if octant & bit != 0 { 1.0 } else { -1.0 };
        [sign(0b001), sign(0b010), sign(0b100)]
    }

    /// Recursively counts leaves matching `predicate`, weighting bottom
    /// level leaves by 1 and any uniformly-pure internal node (a leaf
    /// this crate never actually produces above the bottom level, since
    /// refinement always continues to `max_depth`, but kept general) by
    /// the number of bottom-level voxels it represents.
    pub fn count_leaves(&self, remaining_depth: u32, predicate: impl Fn(VoxelType) -> bool + Copy) -> u64 {
        match &self.children {
            None => {
                if predicate(self.kind) {
                    1u64 << (3 * remaining_depth)
                } else {
                    0
                }
            }
            Some(children) => children
                .iter()
                .map(|c| c.count_leaves(remaining_depth.saturating_sub(1), predicate))
                .sum(),
        }
    }
}

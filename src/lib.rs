// src/lib.rs
//
// atomvol: atom-centered van der Waals volume, surface area and cavity
// analysis over a spatial grid refined by an octree. See SPEC_FULL.md for
// the full interface contract this crate implements.

pub mod atom;
pub mod atom_tree;
pub mod cavity;
pub mod engine;
pub mod error;
pub mod grid;
pub mod notify;
pub mod radius_table;
pub mod result;
pub mod space;
pub mod voxel;

pub use atom::{Atom, AtomStore};
pub use atom_tree::AtomTree;
pub use cavity::Cavity;
pub use engine::{AtomRecord, Engine, Parameters};
pub use error::{CoreError, ErrorCode, RadiusWarning};
pub use grid::Grid3D;
pub use notify::{AbortFlag, NullNotifier, Notifier};
pub use radius_table::RadiusTable;
pub use result::{ChemicalFormula, ResultBundle, Surfaces, TypeTensor, VolumeMap};
pub use space::Space;
pub use voxel::{Voxel, VoxelType};

// src/atom_tree.rs

use crate::atom::{distance, Atom, AtomStore};

/// A node of the k-d tree. Stores the index of the atom that partitions its
/// subtree at construction time (the atom list is reordered in place by
/// [`AtomTree::build`], so the index refers to the atom's final position).
struct AtomNode {
    atom_index: usize,
    axis: u8,
    left: Option<Box<AtomNode>>,
    right: Option<Box<AtomNode>>,
}

/// 3D k-d tree over an [`AtomStore`], splitting on x, y, z cyclically by
/// depth. Supports bounded-radius neighbor queries via [`AtomTree::find_adjacent`]
/// and [`AtomTree::atoms_within`].
///
/// Holds only indices into the atom list it was built from; it must not
/// outlive that list, and the list must not be reordered again after
/// `build` without rebuilding the tree.
pub struct AtomTree {
    root: Option<Box<AtomNode>>,
    max_rad: f64,
}

impl AtomTree {
    /// Builds a tree over `store`, partitioning its backing atom list in
    /// place. Average complexity `O(N log N)`.
    pub fn build(store: &mut AtomStore) -> Self {
        let max_rad = store
            .as_slice()
            .iter()
            .map(|a| a.rad)
            .fold(0.0_f64, f64::max);
        let root = Self::build_range(store.as_mut_slice(), 0);
        Self { root, max_rad }
    }

    fn build_range(atoms: &mut [Atom], axis: u8) -> Option<Box<AtomNode>> {
        match atoms.len() {
            0 => None,
            1 => Some(Box::new(AtomNode {
                atom_index: 0,
                axis,
                left: None,
                right: None,
            })),
            n => {
                let median = n / 2;
                atoms.select_nth_unstable_by(median, |a, b| {
                    a.coordinate(axis as usize)
                        .partial_cmp(&b.coordinate(axis as usize))
                        .expect("atom coordinate must not be NaN")
                });
                let next_axis = (axis + 1) % 3;
                let (left, rest) = atoms.split_at_mut(median);
                let (_pivot, right) = rest.split_at_mut(1);
                Some(Box::new(AtomNode {
                    atom_index: median,
                    axis,
                    left: Self::build_range(left, next_axis),
                    right: Self::build_range(right, next_axis),
                }))
            }
        }
    }

    pub fn max_rad(&self) -> f64 {
        self.max_rad
    }

    /// Returns indices of every atom `B` (other than `atom_index` itself)
    /// in `store` such that `|B.pos - A.pos| <= A.rad + B.rad + delta`,
    /// where `A = store.get(atom_index)`.
    pub fn find_adjacent(&self, store: &AtomStore, atom_index: usize, delta: f64) -> Vec<usize> {
        let at = store.get(atom_index);
        let mut found = Vec::new();
        let min_distance = at.rad + self.max_rad + delta;
        Self::find_adjacent_recursive(
            &mut found,
            store,
            atom_index,
            at,
            delta,
            min_distance,
            &self.root,
        );
        found
    }

    fn find_adjacent_recursive(
        found: &mut Vec<usize>,
        store: &AtomStore,
        atom_index: usize,
        at: &Atom,
        delta: f64,
        min_distance: f64,
        node: &Option<Box<AtomNode>>,
    ) {
        let Some(node) = node else { return };
        let test_atom = store.get(node.atom_index);
        let axis = node.axis as usize;
        let signed_1d = test_atom.coordinate(axis) - at.coordinate(axis);

        if signed_1d.abs() > min_distance {
            let near_child = if signed_1d >= 0.0 {
                &node.left
            } else {
                &node.right
            };
            Self::find_adjacent_recursive(
                found, store, atom_index, at, delta, min_distance, near_child,
            );
        } else {
            if node.atom_index != atom_index {
                let dist_at_at = distance(at.pos, test_atom.pos);
                if dist_at_at <= at.rad + test_atom.rad + delta {
                    found.push(node.atom_index);
                }
            }
            Self::find_adjacent_recursive(
                found, store, atom_index, at, delta, min_distance, &node.left,
            );
            Self::find_adjacent_recursive(
                found, store, atom_index, at, delta, min_distance, &node.right,
            );
        }
    }

    /// Returns indices of every atom whose center lies within `radius` of
    /// `center`, regardless of atom radius. Used by voxel classification to
    /// gather the atoms a voxel could possibly overlap.
    pub fn atoms_within(&self, store: &AtomStore, center: [f64; 3], radius: f64) -> Vec<usize> {
        let mut found = Vec::new();
        Self::atoms_within_recursive(&mut found, store, center, radius, &self.root);
        found
    }

    fn atoms_within_recursive(
        found: &mut Vec<usize>,
        store: &AtomStore,
        center: [f64; 3],
        radius: f64,
        node: &Option<Box<AtomNode>>,
    ) {
        let Some(node) = node else { return };
        let test_atom = store.get(node.atom_index);
        let axis = node.axis as usize;
        let signed_1d = test_atom.coordinate(axis) - center[axis];

        if signed_1d.abs() > radius {
            let near_child = if signed_1d >= 0.0 {
                &node.left
            } else {
                &node.right
            };
            Self::atoms_within_recursive(found, store, center, radius, near_child);
        } else {
            if distance(test_atom.pos, center) <= radius {
                found.push(node.atom_index);
            }
            Self::atoms_within_recursive(found, store, center, radius, &node.left);
            Self::atoms_within_recursive(found, store, center, radius, &node.right);
        }
    }
}

// src/grid.rs

use serde::{Deserialize, Serialize};

/// Dense, row-major 3D array, x-fastest. The bottom-level classification
/// grid, the cavity label grid and the exported density tensor are all
/// instances of this container at different `T`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Grid3D<T> {
    dims: [usize; 3],
    cells: Vec<T>,
}

impl<T: Clone + Default> Grid3D<T> {
    pub fn new(dims: [usize; 3]) -> Self {
        let len = dims[0] * dims[1] * dims[2];
        Self {
            dims,
            cells: vec![T::default(); len],
        }
    }
}

impl<T> Grid3D<T> {
    pub fn filled(dims: [usize; 3], value: T) -> Self
    where
        T: Clone,
    {
        let len = dims[0] * dims[1] * dims[2];
        Self {
            dims,
            cells: vec![value; len],
        }
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    fn index(&self, pos: [usize; 3]) -> usize {
        debug_assert!(pos[0] < self.dims[0] && pos[1] < self.dims[1] && pos[2] < self.dims[2]);
        (pos[2] * self.dims[1] + pos[1]) * self.dims[0] + pos[0]
    }

    pub fn get(&self, pos: [usize; 3]) -> &T {
        &self.cells[self.index(pos)]
    }

    pub fn get_mut(&mut self, pos: [usize; 3]) -> &mut T {
        let idx = self.index(pos);
        &mut self.cells[idx]
    }

    pub fn try_get(&self, pos: [isize; 3]) -> Option<&T> {
        if pos[0] < 0
            || pos[1] < 0
            || pos[2] < 0
            || pos[0] as usize >= self.dims[0]
            || pos[1] as usize >= self.dims[1]
            || pos[2] as usize >= self.dims[2]
        {
            return None;
        }
        Some(self.get([pos[0] as usize, pos[1] as usize, pos[2] as usize]))
    }

    pub fn set(&mut self, pos: [usize; 3], value: T) {
        let idx = self.index(pos);
        self.cells[idx] = value;
    }

    /// Iterates over every cell with its `[x, y, z]` coordinate, x-fastest,
    /// matching the OpenDX payload order the density tensor is shaped for.
    pub fn iter_positions(&self) -> impl Iterator<Item = ([usize; 3], &T)> {
        let [nx, ny, _nz] = self.dims;
        self.cells.iter().enumerate().map(move |(i, v)| {
            let x = i % nx;
            let y = (i / nx) % ny;
            let z = i / (nx * ny);
            ([x, y, z], v)
        })
    }

    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }
}

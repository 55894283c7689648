//! # Chunk Lattice Iteration
//!
//! Density grids are stored flat, x fastest, then y, then z. `ChunkLatticeIterator`
//! walks a cubic lattice in that same order and yields each local coordinate with
//! its flat index, so callers never recompute the index arithmetic by hand.
//!
//! The iterator works for any cubic extent: chunk generation walks the
//! `samples_per_axis` sample lattice, surface extraction walks the
//! `samples_per_axis - 1` cell lattice.

use cgmath::Point3;

/// Iterator over every point of an `extent`³ lattice in storage order.
pub struct ChunkLatticeIterator {
    extent: usize,
    next_index: usize,
    total: usize,
}

impl ChunkLatticeIterator {
    /// Creates an iterator over an `extent`³ lattice.
    pub fn new(extent: usize) -> Self {
        ChunkLatticeIterator {
            extent,
            next_index: 0,
            total: extent * extent * extent,
        }
    }
}

impl Iterator for ChunkLatticeIterator {
    type Item = (Point3<usize>, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_index >= self.total {
            return None;
        }

        let index = self.next_index;
        let plane = self.extent * self.extent;
        let position = Point3::new(
            index % self.extent,
            (index % plane) / self.extent,
            index / plane,
        );

        self.next_index += 1;
        Some((position, index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.next_index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChunkLatticeIterator {}

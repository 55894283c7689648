//! # Extraction Queue
//!
//! This module provides the pending-work queue that spreads surface extraction
//! across frames.
//!
//! ## Behaviour
//!
//! - Chunks are queued in the order they were first dirtied (FIFO).
//! - A chunk already waiting is never queued a second time; further edits before
//!   its turn simply land in the same extraction.
//! - The engine drains at most its configured budget per tick. Whatever remains
//!   stays queued for the next tick, so "continue later" is just the queue
//!   surviving between calls.
//!
//! ## Example Usage
//! ```rust
//! use voxel_sculpt::ExtractionQueue;
//! use cgmath::Point3;
//!
//! let mut queue = ExtractionQueue::new();
//! assert!(queue.push(Point3::new(0, 0, 0)));
//! assert!(!queue.push(Point3::new(0, 0, 0)));
//!
//! let batch = queue.drain_up_to(8);
//! assert_eq!(batch.len(), 1);
//! ```

use std::collections::{HashSet, VecDeque};

use crate::engine_state::voxels::chunk::ChunkCoord;

/// FIFO of chunk coordinates awaiting extraction, without duplicates.
///
/// # Fields
/// - `queued`: Coordinates in extraction order
/// - `members`: The same coordinates as a set, for O(1) duplicate checks
#[derive(Debug, Default)]
pub struct ExtractionQueue {
    queued: VecDeque<ChunkCoord>,
    members: HashSet<ChunkCoord>,
}

impl ExtractionQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `coord` behind everything already waiting.
    ///
    /// # Returns
    /// - `true` if the chunk was added
    /// - `false` if it was already queued
    pub fn push(&mut self, coord: ChunkCoord) -> bool {
        if !self.members.insert(coord) {
            return false;
        }
        self.queued.push_back(coord);
        true
    }

    /// Takes up to `budget` chunks from the front of the queue.
    ///
    /// The rest stay queued in order.
    pub fn drain_up_to(&mut self, budget: usize) -> Vec<ChunkCoord> {
        let count = budget.min(self.queued.len());
        let batch: Vec<ChunkCoord> = self.queued.drain(..count).collect();
        for coord in &batch {
            self.members.remove(coord);
        }
        batch
    }

    /// Whether `coord` is waiting.
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.members.contains(&coord)
    }

    /// Number of chunks waiting.
    pub fn len(&self) -> usize {
        self.queued.len()
    }

    /// Whether nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    /// Drops every waiting chunk.
    pub fn clear(&mut self) {
        self.queued.clear();
        self.members.clear();
    }
}

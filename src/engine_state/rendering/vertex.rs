//! Vertex data structure for extracted terrain surfaces.
//!
//! This module defines the vertex format handed to the host renderer. The layout is
//! plain `#[repr(C)]` data so vertex buffers can be uploaded as raw bytes.

use cgmath::{InnerSpace, Point3, Vector3};

/// A vertex of an extracted surface.
///
/// Represents a single point in world space with its surface normal. The normal
/// points from solid terrain towards air.
///
/// # Memory Layout
/// - Position: [f32; 3] (12 bytes)
/// - Normal: [f32; 3] (12 bytes)
///
/// Total size: 24 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// World-space position
    pub position: [f32; 3],
    /// Unit surface normal, or zero where the field is flat
    pub normal: [f32; 3],
}

impl Vertex {
    /// Creates a new vertex, normalizing `normal` when it has a length.
    ///
    /// # Arguments
    /// * `position` - World-space position of the vertex
    /// * `normal` - Direction of increasing density at the vertex
    pub fn new(position: Point3<f32>, normal: Vector3<f32>) -> Self {
        let length = normal.magnitude();
        let normal = if length > f32::EPSILON {
            normal / length
        } else {
            Vector3::new(0.0, 0.0, 0.0)
        };

        Vertex {
            position: position.into(),
            normal: normal.into(),
        }
    }

    /// The position as a point.
    pub fn point(&self) -> Point3<f32> {
        Point3::from(self.position)
    }
}

//! # Octree Module
//!
//! A bounded octree over a fixed root volume, used for localized point and region
//! queries. It is a second, independent view of space next to the chunk map:
//! nodes carry only their bounds and children, never density data, and nothing in
//! chunk storage depends on it.
//!
//! The engine refines the tree around every brush centre, so the leaves of the
//! tree end up finest where the terrain has been sculpted.

use cgmath::{Point3, Vector3};

use super::bounds::Aabb;

/// One cube of the octree.
///
/// Children, when present, split the node into 8 equal octants. Octant `i` lies
/// on the high side of the x axis when bit 0 of `i` is set, of y for bit 1 and of
/// z for bit 2.
#[derive(Debug)]
pub struct OctreeNode {
    center: Point3<f32>,
    half_size: f32,
    depth: u32,
    children: Option<Box<[OctreeNode; 8]>>,
}

impl OctreeNode {
    fn new(center: Point3<f32>, half_size: f32, depth: u32) -> Self {
        OctreeNode {
            center,
            half_size,
            depth,
            children: None,
        }
    }

    /// Centre of the node's cube.
    pub fn center(&self) -> Point3<f32> {
        self.center
    }

    /// Half the node's edge length.
    pub fn half_size(&self) -> f32 {
        self.half_size
    }

    /// Distance from the root, which has depth 0.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// The node's cube.
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center(self.center, self.half_size)
    }

    /// The eight octants, if this node has been subdivided.
    pub fn children(&self) -> Option<&[OctreeNode; 8]> {
        self.children.as_deref()
    }

    /// Whether the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Index of the octant containing `point`. Points on a split plane go high.
    fn octant_of(&self, point: Point3<f32>) -> usize {
        let mut index = 0;
        if point.x >= self.center.x {
            index |= 1;
        }
        if point.y >= self.center.y {
            index |= 2;
        }
        if point.z >= self.center.z {
            index |= 4;
        }
        index
    }

    fn subdivide(&mut self) {
        if self.children.is_some() {
            return;
        }

        let quarter = self.half_size * 0.5;
        let center = self.center;
        let depth = self.depth + 1;
        let children = std::array::from_fn(|i| {
            let offset = Vector3::new(
                if i & 1 != 0 { quarter } else { -quarter },
                if i & 2 != 0 { quarter } else { -quarter },
                if i & 4 != 0 { quarter } else { -quarter },
            );
            OctreeNode::new(center + offset, quarter, depth)
        });
        self.children = Some(Box::new(children));
    }

    fn count_leaves(&self) -> usize {
        match self.children() {
            Some(children) => children.iter().map(OctreeNode::count_leaves).sum(),
            None => 1,
        }
    }

    fn collect_leaves_in<'a>(&'a self, region: &Aabb, out: &mut Vec<&'a OctreeNode>) {
        if !self.bounds().intersects(region) {
            return;
        }
        match self.children() {
            Some(children) => {
                for child in children.iter() {
                    child.collect_leaves_in(region, out);
                }
            }
            None => out.push(self),
        }
    }
}

/// Octree over a fixed cube of world space, at most `max_depth` levels deep.
#[derive(Debug)]
pub struct Octree {
    root: OctreeNode,
    max_depth: u32,
}

impl Octree {
    /// Creates an unsubdivided tree over the cube around `center`.
    ///
    /// # Arguments
    /// * `center` - Centre of the root volume
    /// * `half_size` - Half edge length of the root volume
    /// * `max_depth` - Number of levels the tree may grow to, root included
    pub fn new(center: Point3<f32>, half_size: f32, max_depth: u32) -> Self {
        Octree {
            root: OctreeNode::new(center, half_size, 0),
            max_depth: max_depth.max(1),
        }
    }

    /// The root node.
    pub fn root(&self) -> &OctreeNode {
        &self.root
    }

    /// Number of levels the tree may grow to.
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Subdivides every node on the path to `point` until the deepest level.
    ///
    /// # Returns
    /// `false` if the point lies outside the root volume and nothing changed.
    pub fn refine_at(&mut self, point: Point3<f32>) -> bool {
        if !self.root.bounds().contains(point) {
            return false;
        }

        let max_depth = self.max_depth;
        let mut node = &mut self.root;
        while node.depth + 1 < max_depth {
            node.subdivide();
            let octant = node.octant_of(point);
            node = match node.children.as_deref_mut() {
                Some(children) => &mut children[octant],
                None => break,
            };
        }
        true
    }

    /// The leaf whose cube contains `point`, or `None` outside the root volume.
    pub fn leaf_containing(&self, point: Point3<f32>) -> Option<&OctreeNode> {
        if !self.root.bounds().contains(point) {
            return None;
        }

        let mut node = &self.root;
        while let Some(children) = node.children() {
            node = &children[node.octant_of(point)];
        }
        Some(node)
    }

    /// Every leaf whose cube intersects `region`.
    pub fn leaves_in_region(&self, region: &Aabb) -> Vec<&OctreeNode> {
        let mut leaves = Vec::new();
        self.root.collect_leaves_in(region, &mut leaves);
        leaves
    }

    /// Total number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.root.count_leaves()
    }

    /// Collapses the tree back to its root.
    pub fn clear(&mut self) {
        self.root.children = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(max_depth: u32) -> Octree {
        Octree::new(Point3::new(0.0, 0.0, 0.0), 64.0, max_depth)
    }

    #[test]
    fn children_partition_parent() {
        let mut octree = tree(2);
        assert!(octree.refine_at(Point3::new(1.0, 1.0, 1.0)));

        let root = octree.root();
        let children = root.children().unwrap();
        let parent = root.bounds();
        for (i, child) in children.iter().enumerate() {
            assert_eq!(child.half_size(), 32.0);
            assert_eq!(child.depth(), 1);
            let b = child.bounds();
            assert!(parent.contains(b.min) && parent.contains(b.max));
            // Each child owns exactly the octant its index names.
            assert_eq!(root.octant_of(child.center()), i);
        }

        let total_volume: f32 = children
            .iter()
            .map(|c| (2.0 * c.half_size()).powi(3))
            .sum();
        assert_eq!(total_volume, (2.0 * root.half_size()).powi(3));
    }

    #[test]
    fn refinement_stops_at_max_depth() {
        let mut octree = tree(4);
        let point = Point3::new(10.0, -20.0, 30.0);
        octree.refine_at(point);

        let leaf = octree.leaf_containing(point).unwrap();
        assert_eq!(leaf.depth(), 3);
        assert_eq!(leaf.half_size(), 8.0);
        assert!(leaf.bounds().contains(point));
        // Three subdivisions of 8 children, one refined per level.
        assert_eq!(octree.leaf_count(), 1 + 7 * 3);
    }

    #[test]
    fn single_level_tree_never_subdivides() {
        let mut octree = tree(1);
        assert!(octree.refine_at(Point3::new(0.0, 0.0, 0.0)));
        assert!(octree.root().is_leaf());
        assert_eq!(octree.leaf_count(), 1);
    }

    #[test]
    fn points_outside_root_are_ignored() {
        let mut octree = tree(3);
        assert!(!octree.refine_at(Point3::new(100.0, 0.0, 0.0)));
        assert!(octree.leaf_containing(Point3::new(0.0, -65.0, 0.0)).is_none());
        assert_eq!(octree.leaf_count(), 1);
    }

    #[test]
    fn region_query_returns_only_intersecting_leaves() {
        let mut octree = tree(3);
        octree.refine_at(Point3::new(40.0, 40.0, 40.0));

        let region = Aabb::new(Point3::new(33.0, 33.0, 33.0), Point3::new(40.0, 40.0, 40.0));
        let leaves = octree.leaves_in_region(&region);
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].depth(), 2);

        let everything = Aabb::from_center(Point3::new(0.0, 0.0, 0.0), 64.0);
        assert_eq!(octree.leaves_in_region(&everything).len(), octree.leaf_count());

        octree.clear();
        assert_eq!(octree.leaf_count(), 1);
    }
}

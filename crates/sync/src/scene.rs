//! Scene-side collaborator: mesh containment hierarchy, world bounds and raycasting.
//!
//! The renderer owns real geometry; this core only needs the hierarchy and a
//! world-space AABB per node. `SceneGraph` is the in-memory implementation the
//! renderer populates alongside each registry rebuild.

use std::collections::HashMap;

use shared::MeshId;

use crate::viewport::picking::{pick_nearest, Aabb, Ray};

/// What the selection engine needs from the scene
pub trait SceneView {
    /// Containing group/mesh, if any
    fn parent_of(&self, mesh: MeshId) -> Option<MeshId>;
    /// World-space bounds; groups without geometry return None
    fn bounds_of(&self, mesh: MeshId) -> Option<Aabb>;
    /// Nearest mesh hit by the ray (registered or not)
    fn raycast(&self, ray: &Ray) -> Option<MeshId>;
}

#[derive(Clone, Debug)]
struct SceneNode {
    parent: Option<MeshId>,
    bounds: Option<Aabb>,
}

/// Flat arena of scene nodes keyed by mesh id
#[derive(Default, Clone, Debug)]
pub struct SceneGraph {
    nodes: HashMap<MeshId, SceneNode>,
    /// Insertion order, so raycast ties resolve deterministically
    order: Vec<MeshId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group node without geometry
    pub fn add_group(&mut self, id: MeshId, parent: Option<MeshId>) {
        self.insert(id, parent, None);
    }

    /// Add a mesh with world bounds
    pub fn add_mesh(&mut self, id: MeshId, parent: Option<MeshId>, bounds: Aabb) {
        self.insert(id, parent, Some(bounds));
    }

    fn insert(&mut self, id: MeshId, parent: Option<MeshId>, bounds: Option<Aabb>) {
        if self.nodes.insert(id, SceneNode { parent, bounds }).is_none() {
            self.order.push(id);
        }
    }

    /// Remove a node; children are re-parented to the removed node's parent
    pub fn remove(&mut self, id: MeshId) {
        let Some(node) = self.nodes.remove(&id) else {
            return;
        };
        self.order.retain(|m| *m != id);
        for child in self.nodes.values_mut() {
            if child.parent == Some(id) {
                child.parent = node.parent;
            }
        }
    }

    pub fn contains(&self, id: MeshId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.order.clear();
    }
}

impl SceneView for SceneGraph {
    fn parent_of(&self, mesh: MeshId) -> Option<MeshId> {
        self.nodes.get(&mesh)?.parent
    }

    fn bounds_of(&self, mesh: MeshId) -> Option<Aabb> {
        let node = self.nodes.get(&mesh)?;
        if let Some(b) = node.bounds {
            return Some(b);
        }
        // Group: union of descendants with geometry
        self.order
            .iter()
            .filter(|id| self.is_descendant(**id, mesh))
            .filter_map(|id| self.nodes.get(id).and_then(|n| n.bounds))
            .reduce(|a, b| a.union(&b))
    }

    fn raycast(&self, ray: &Ray) -> Option<MeshId> {
        let boxes = self
            .order
            .iter()
            .filter_map(|id| self.nodes.get(id).and_then(|n| n.bounds.as_ref()).map(|b| (*id, b)));
        pick_nearest(ray, boxes)
    }
}

impl SceneGraph {
    fn is_descendant(&self, id: MeshId, ancestor: MeshId) -> bool {
        let mut cursor = self.parent_of(id);
        let mut guard = 0;
        while let Some(p) = cursor {
            if p == ancestor {
                return true;
            }
            guard += 1;
            if guard > self.nodes.len() {
                return false;
            }
            cursor = self.parent_of(p);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn unit_box_at(x: f32) -> Aabb {
        Aabb::new(Vec3::new(x, 0.0, 0.0), Vec3::new(x + 1.0, 1.0, 1.0))
    }

    #[test]
    fn test_raycast_hits_child_mesh() {
        let mut g = SceneGraph::new();
        g.add_group(MeshId(1), None);
        g.add_mesh(MeshId(2), Some(MeshId(1)), unit_box_at(0.0));
        g.add_mesh(MeshId(3), Some(MeshId(1)), unit_box_at(5.0));

        let ray = Ray {
            origin: Vec3::new(5.5, 10.0, 0.5),
            direction: Vec3::NEG_Y,
        };
        assert_eq!(g.raycast(&ray), Some(MeshId(3)));
        assert_eq!(g.parent_of(MeshId(3)), Some(MeshId(1)));
    }

    #[test]
    fn test_group_bounds_union_children() {
        let mut g = SceneGraph::new();
        g.add_group(MeshId(1), None);
        g.add_mesh(MeshId(2), Some(MeshId(1)), unit_box_at(0.0));
        g.add_mesh(MeshId(3), Some(MeshId(1)), unit_box_at(5.0));

        let b = g.bounds_of(MeshId(1)).unwrap();
        assert_eq!(b.min.x, 0.0);
        assert_eq!(b.max.x, 6.0);
    }

    #[test]
    fn test_remove_reparents_children() {
        let mut g = SceneGraph::new();
        g.add_group(MeshId(1), None);
        g.add_group(MeshId(2), Some(MeshId(1)));
        g.add_mesh(MeshId(3), Some(MeshId(2)), unit_box_at(0.0));
        g.remove(MeshId(2));
        assert_eq!(g.parent_of(MeshId(3)), Some(MeshId(1)));
        assert_eq!(g.len(), 2);
    }
}

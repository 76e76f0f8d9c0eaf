//! Arena-backed scene graph.
//!
//! Nodes live in a [`SlotMap`] and refer to each other by [`NodeId`]. Each
//! node stores its parent id and an ordered list of child ids; the parent
//! owns its children, so removing a node removes its whole subtree.

use glam::{Mat4, Vec3};
use slotmap::SlotMap;

use crate::camera::PerspectiveCamera;
use crate::layers::{Layers, RenderLayer};
use crate::mesh::Mesh;
use crate::transform::Transform;

slotmap::new_key_type! {
    /// Identifier for a node in a [`SceneGraph`].
    pub struct NodeId;
}

/// Errors from structural edits of the graph.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("node {0:?} does not exist")]
    UnknownNode(NodeId),
    #[error("cannot attach {child:?} under its own descendant {parent:?}")]
    Cycle { child: NodeId, parent: NodeId },
    #[error("the root node cannot be moved or removed")]
    RootImmutable,
}

/// What a node is, beyond its transform.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Root,
    /// Pure transform anchor with no geometry.
    Pivot,
    Mesh(Mesh),
    Camera(PerspectiveCamera),
}

/// One entry in the graph.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    /// Layer membership; meshes are on exactly one layer.
    pub layers: Layers,
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            transform: Transform::IDENTITY,
            layers: Layers::default(),
            kind,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn pivot(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Pivot)
    }

    pub fn mesh(name: impl Into<String>, mesh: Mesh, layer: RenderLayer) -> Self {
        Self::new(name, NodeKind::Mesh(mesh)).on_layer(layer)
    }

    pub fn camera(name: impl Into<String>, camera: PerspectiveCamera) -> Self {
        Self::new(name, NodeKind::Camera(camera))
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn on_layer(mut self, layer: RenderLayer) -> Self {
        self.layers.set(layer);
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn as_mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn as_camera(&self) -> Option<&PerspectiveCamera> {
        match &self.kind {
            NodeKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    pub fn as_camera_mut(&mut self) -> Option<&mut PerspectiveCamera> {
        match &mut self.kind {
            NodeKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }
}

/// Tree of scene nodes rooted at a single [`NodeKind::Root`].
pub struct SceneGraph {
    root: NodeId,
    nodes: SlotMap<NodeId, SceneNode>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(SceneNode::new("scene", NodeKind::Root));
        Self { root, nodes }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id)
    }

    /// Insert `node` as the last child of `parent`.
    ///
    /// An unknown `parent` falls back to the root.
    pub fn spawn(&mut self, parent: NodeId, mut node: SceneNode) -> NodeId {
        let parent = if self.nodes.contains_key(parent) {
            parent
        } else {
            log::warn!("spawn '{}' under missing parent, using root", node.name);
            self.root
        };

        node.parent = Some(parent);
        node.children.clear();
        let id = self.nodes.insert(node);
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(id);
        }
        id
    }

    /// Move `child` (with its subtree) under `parent`. The child's local
    /// transform is kept, so its world placement follows the new parent.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        if child == self.root {
            return Err(SceneError::RootImmutable);
        }
        for id in [parent, child] {
            if !self.nodes.contains_key(id) {
                return Err(SceneError::UnknownNode(id));
            }
        }
        if self.is_ancestor(child, parent) {
            return Err(SceneError::Cycle { child, parent });
        }

        self.detach(child);
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        }
        Ok(())
    }

    /// Remove `id` and every descendant. Returns how many nodes were removed.
    pub fn remove(&mut self, id: NodeId) -> Result<usize, SceneError> {
        if id == self.root {
            return Err(SceneError::RootImmutable);
        }
        if !self.nodes.contains_key(id) {
            return Err(SceneError::UnknownNode(id));
        }

        self.detach(id);
        let mut stack = vec![id];
        let mut removed = 0;
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(next) {
                stack.extend(node.children);
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// True if `ancestor` is `node` or lies on the path from `node` to the root.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(id).and_then(|n| n.parent);
        }
        false
    }

    /// Local-to-world matrix, composed from the root down.
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = self.nodes.get(id);
        while let Some(node) = current {
            matrix = node.transform.matrix() * matrix;
            current = node.parent.and_then(|p| self.nodes.get(p));
        }
        matrix
    }

    pub fn world_position(&self, id: NodeId) -> Vec3 {
        self.world_matrix(id).w_axis.truncate()
    }

    /// Depth-first pre-order walk from the root.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        let mut stack = vec![self.root];
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            let node = self.nodes.get(id)?;
            stack.extend(node.children.iter().rev());
            Some((id, node))
        })
    }

    /// Every mesh node in traversal order.
    pub fn meshes(&self) -> impl Iterator<Item = (NodeId, &SceneNode, &Mesh)> {
        self.iter()
            .filter_map(|(id, node)| node.as_mesh().map(|mesh| (id, node, mesh)))
    }

    /// Mesh nodes whose layer intersects `mask`.
    pub fn visible_meshes(&self, mask: Layers) -> impl Iterator<Item = (NodeId, &SceneNode, &Mesh)> {
        self.meshes().filter(move |(_, node, _)| node.layers.intersects(mask))
    }

    fn detach(&mut self, id: NodeId) {
        let parent = self.nodes.get(id).and_then(|n| n.parent);
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(p)) {
            p.children.retain(|&c| c != id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;
    use crate::mesh::{Geometry, Material};
    use crate::transform::Euler;

    fn ball(name: &str, layer: RenderLayer) -> SceneNode {
        SceneNode::mesh(
            name,
            Mesh::new(Geometry::sphere(1.0, 8, 8), Material::basic(Vec3::ONE)),
            layer,
        )
    }

    #[test]
    fn test_new_graph_has_only_root() {
        let graph = SceneGraph::new();
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.get(graph.root()).unwrap().kind, NodeKind::Root);
    }

    #[test]
    fn test_spawn_links_parent_and_child() {
        let mut graph = SceneGraph::new();
        let pivot = graph.spawn(graph.root(), SceneNode::pivot("pivot"));
        let child = graph.spawn(pivot, ball("child", RenderLayer::Base));

        assert_eq!(graph.get(child).unwrap().parent(), Some(pivot));
        assert_eq!(graph.get(pivot).unwrap().children(), &[child]);
    }

    #[test]
    fn test_spawn_under_removed_parent_falls_back_to_root() {
        let mut graph = SceneGraph::new();
        let gone = graph.spawn(graph.root(), SceneNode::pivot("gone"));
        graph.remove(gone).unwrap();
        let orphan = graph.spawn(gone, SceneNode::pivot("orphan"));
        assert_eq!(graph.get(orphan).unwrap().parent(), Some(graph.root()));
    }

    #[test]
    fn test_world_matrix_composes_parent_rotation() {
        let mut graph = SceneGraph::new();
        let pivot = graph.spawn(graph.root(), SceneNode::pivot("pivot"));
        let child = graph.spawn(pivot, ball("child", RenderLayer::Base).at(Vec3::new(3.0, 0.0, 0.0)));

        graph.get_mut(pivot).unwrap().transform.rotation = Euler::new(0.0, FRAC_PI_2, 0.0);
        let pos = graph.world_position(child);
        assert!((pos - Vec3::new(0.0, 0.0, -3.0)).length() < 1e-5);
    }

    #[test]
    fn test_attach_moves_subtree() {
        let mut graph = SceneGraph::new();
        let a = graph.spawn(graph.root(), SceneNode::pivot("a").at(Vec3::X));
        let b = graph.spawn(graph.root(), SceneNode::pivot("b").at(Vec3::Y));
        let leaf = graph.spawn(a, ball("leaf", RenderLayer::Base));

        graph.attach(b, a).unwrap();
        assert_eq!(graph.get(graph.root()).unwrap().children(), &[b]);
        assert_eq!(graph.get(b).unwrap().children(), &[a]);
        assert_eq!(graph.world_position(leaf), Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_attach_rejects_cycles() {
        let mut graph = SceneGraph::new();
        let a = graph.spawn(graph.root(), SceneNode::pivot("a"));
        let b = graph.spawn(a, SceneNode::pivot("b"));
        assert_eq!(graph.attach(b, a), Err(SceneError::Cycle { child: a, parent: b }));
        assert_eq!(graph.attach(a, a), Err(SceneError::Cycle { child: a, parent: a }));
        assert_eq!(graph.attach(a, graph.root()), Err(SceneError::RootImmutable));
    }

    #[test]
    fn test_remove_drops_whole_subtree() {
        let mut graph = SceneGraph::new();
        let a = graph.spawn(graph.root(), SceneNode::pivot("a"));
        let b = graph.spawn(a, SceneNode::pivot("b"));
        let c = graph.spawn(b, ball("c", RenderLayer::Glow));
        let keep = graph.spawn(graph.root(), SceneNode::pivot("keep"));

        assert_eq!(graph.remove(a), Ok(3));
        assert!(!graph.contains(b) && !graph.contains(c));
        assert!(graph.contains(keep));
        assert_eq!(graph.get(graph.root()).unwrap().children(), &[keep]);
        assert_eq!(graph.remove(a), Err(SceneError::UnknownNode(a)));
        assert_eq!(graph.remove(graph.root()), Err(SceneError::RootImmutable));
    }

    #[test]
    fn test_iter_is_preorder() {
        let mut graph = SceneGraph::new();
        let a = graph.spawn(graph.root(), SceneNode::pivot("a"));
        graph.spawn(a, SceneNode::pivot("a1"));
        graph.spawn(graph.root(), SceneNode::pivot("b"));
        let names: Vec<_> = graph.iter().map(|(_, n)| n.name.as_str()).collect();
        assert_eq!(names, ["scene", "a", "a1", "b"]);
    }

    #[test]
    fn test_visible_meshes_filters_by_layer() {
        let mut graph = SceneGraph::new();
        let glow = graph.spawn(graph.root(), ball("glow", RenderLayer::Glow));
        let base = graph.spawn(graph.root(), ball("base", RenderLayer::Base));
        graph.spawn(graph.root(), SceneNode::pivot("pivot"));

        let glow_ids: Vec<_> = graph.visible_meshes(Layers::only(RenderLayer::Glow)).map(|(id, ..)| id).collect();
        let base_ids: Vec<_> = graph.visible_meshes(Layers::only(RenderLayer::Base)).map(|(id, ..)| id).collect();
        assert_eq!(glow_ids, [glow]);
        assert_eq!(base_ids, [base]);
    }
}

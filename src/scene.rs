use std::sync::Arc;

use glam::{Quat, Vec3};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Handle to a node stored in a [`SceneGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Group,
    Hexagon,
    Flash,
}

/// A transformable, tintable node.
///
/// `opacity` and every `color` channel stay inside `[0, 1]`; the graph's
/// setters clamp on write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    pub kind: NodeKind,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub opacity: f32,
    pub color: Vec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub children: Vec<NodeId>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            opacity: 1.0,
            color: Vec3::ONE,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }
}

#[derive(Debug, Default)]
struct SceneState {
    nodes: Vec<SceneNode>,
    roots: Vec<NodeId>,
}

impl SceneState {
    fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0)
    }

    fn root_of(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            match self.nodes.get(current.0)?.parent {
                Some(parent) => current = parent,
                None => return Some(current),
            }
        }
    }
}

/// Shared scene graph.
///
/// Clones share the same storage, which lets completion callbacks keep
/// their own handle. Nodes are never destroyed: [`SceneGraph::remove`]
/// only unlinks a node from the root list, so detached nodes stay
/// readable and animatable.
#[derive(Debug, Default)]
pub struct SceneGraph {
    state: Arc<RwLock<SceneState>>,
}

impl Clone for SceneGraph {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a node without attaching it to the scene.
    pub fn spawn(&self, node: SceneNode) -> NodeId {
        let mut state = self.state.write();
        let id = NodeId(state.nodes.len());
        state.nodes.push(node);
        id
    }

    /// Makes `child` a child of `parent`, unlinking it from any previous parent.
    pub fn attach_child(&self, parent: NodeId, child: NodeId) -> bool {
        let mut state = self.state.write();
        if parent == child || parent.0 >= state.nodes.len() || child.0 >= state.nodes.len() {
            return false;
        }
        if let Some(old) = state.nodes[child.0].parent.take() {
            state.nodes[old.0].children.retain(|c| *c != child);
        }
        state.roots.retain(|r| *r != child);
        state.nodes[child.0].parent = Some(parent);
        state.nodes[parent.0].children.push(child);
        true
    }

    /// Appends a node to the root list. Adding an attached root again is a no-op.
    pub fn add(&self, id: NodeId) -> bool {
        let mut state = self.state.write();
        if id.0 >= state.nodes.len() || state.roots.contains(&id) {
            return false;
        }
        state.roots.push(id);
        true
    }

    /// Unlinks a root node from the scene. Returns `false` when the node
    /// was not attached, which callers may ignore.
    pub fn remove(&self, id: NodeId) -> bool {
        let mut state = self.state.write();
        let before = state.roots.len();
        state.roots.retain(|r| *r != id);
        state.roots.len() != before
    }

    /// Whether the node, or the root it hangs from, is in the scene.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let state = self.state.read();
        state
            .root_of(id)
            .is_some_and(|root| state.roots.contains(&root))
    }

    /// Attached roots in insertion order.
    pub fn roots(&self) -> Vec<NodeId> {
        self.state.read().roots.clone()
    }

    pub fn len(&self) -> usize {
        self.state.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: NodeId) -> Option<SceneNode> {
        self.state.read().nodes.get(id.0).cloned()
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.state
            .read()
            .nodes
            .get(id.0)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    /// Reads a value from a node without cloning it.
    pub fn read<F, R>(&self, id: NodeId, reader: F) -> Option<R>
    where
        F: FnOnce(&SceneNode) -> R,
    {
        self.state.read().nodes.get(id.0).map(reader)
    }

    /// Applies a mutation to the requested node.
    pub fn update<F, R>(&self, id: NodeId, updater: F) -> Option<R>
    where
        F: FnOnce(&mut SceneNode) -> R,
    {
        let mut state = self.state.write();
        let node = state.node_mut(id)?;
        Some(updater(node))
    }

    pub fn set_position(&self, id: NodeId, position: Vec3) -> bool {
        self.update(id, |node| node.position = position).is_some()
    }

    pub fn set_rotation(&self, id: NodeId, rotation: Quat) -> bool {
        self.update(id, |node| node.rotation = rotation).is_some()
    }

    pub fn set_scale(&self, id: NodeId, scale: Vec3) -> bool {
        self.update(id, |node| node.scale = scale).is_some()
    }

    pub fn set_opacity(&self, id: NodeId, opacity: f32) -> bool {
        self.update(id, |node| node.opacity = opacity.clamp(0.0, 1.0))
            .is_some()
    }

    pub fn set_color(&self, id: NodeId, color: Vec3) -> bool {
        self.update(id, |node| node.color = color.clamp(Vec3::ZERO, Vec3::ONE))
            .is_some()
    }

    /// Rotates a node so its local +Z axis points at `target`.
    pub fn look_at(&self, id: NodeId, target: Vec3) -> bool {
        self.update(id, |node| {
            if let Some(direction) = (target - node.position).try_normalize() {
                node.rotation = Quat::from_rotation_arc(Vec3::Z, direction);
            }
        })
        .is_some()
    }

    /// Depth-first list of `id` and everything below it.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let state = self.state.read();
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = state.nodes.get(current.0) else {
                continue;
            };
            out.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }
}

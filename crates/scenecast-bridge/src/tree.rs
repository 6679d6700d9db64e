//! Scene tree - path-keyed store of the last state written to each node.
//!
//! Nodes are created lazily on first write (ancestors included). Payloads are
//! kept as the raw encoded command documents so replay can forward them
//! byte-for-byte. Children are visited in the order they were first created.

use std::collections::HashMap;
use std::sync::Arc;

use crate::path::Path;
use crate::protocol::CommandKind;

/// Encoded command document, shared between the tree and consumer queues.
pub type Blob = Arc<[u8]>;

/// Index of a node in the tree arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SceneNodeId(pub u64);

/// A single node in the scene tree.
#[derive(Clone, Debug, Default)]
pub struct SceneNode {
    pub name: String,
    pub parent: Option<SceneNodeId>,
    children: Vec<SceneNodeId>,
    child_index: HashMap<String, SceneNodeId>,
    pub object: Option<Blob>,
    pub transform: Option<Blob>,
    /// Property writes since the last object write, in arrival order.
    pub properties: Vec<Blob>,
    pub animation: Option<Blob>,
}

impl SceneNode {
    fn new(name: impl Into<String>, parent: Option<SceneNodeId>) -> Self {
        Self {
            name: name.into(),
            parent,
            ..Default::default()
        }
    }

    /// Whether any payload is recorded here.
    pub fn has_payload(&self) -> bool {
        self.object.is_some()
            || self.transform.is_some()
            || !self.properties.is_empty()
            || self.animation.is_some()
    }

    /// Recorded payloads in replay order: object, properties, transform, animation.
    pub fn payloads(&self) -> impl Iterator<Item = &Blob> {
        self.object
            .iter()
            .chain(self.properties.iter())
            .chain(self.transform.iter())
            .chain(self.animation.iter())
    }

    pub fn children(&self) -> &[SceneNodeId] {
        &self.children
    }
}

/// In-memory scene state, one node per path.
#[derive(Debug)]
pub struct SceneTree {
    nodes: HashMap<SceneNodeId, SceneNode>,
    root: SceneNodeId,
    next_id: u64,
}

impl SceneTree {
    /// Create an empty tree holding only the root node.
    pub fn new() -> Self {
        let root = SceneNodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(root, SceneNode::new("", None));
        Self {
            nodes,
            root,
            next_id: 1,
        }
    }

    pub fn root(&self) -> SceneNodeId {
        self.root
    }

    fn alloc_id(&mut self) -> SceneNodeId {
        let id = SceneNodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Total nodes including the root and payload-less ancestors.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn get(&self, id: SceneNodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    /// Resolve a path without creating anything.
    pub fn find(&self, path: &Path) -> Option<SceneNodeId> {
        let mut current = self.root;
        for segment in path.segments() {
            current = *self.nodes.get(&current)?.child_index.get(segment)?;
        }
        Some(current)
    }

    /// Node at `path`, if present.
    pub fn node(&self, path: &Path) -> Option<&SceneNode> {
        self.find(path).and_then(|id| self.nodes.get(&id))
    }

    /// Resolve a path, creating missing nodes along the way.
    fn find_or_create(&mut self, path: &Path) -> &mut SceneNode {
        let mut current = self.root;
        for segment in path.segments() {
            let existing = self
                .nodes
                .get(&current)
                .and_then(|n| n.child_index.get(segment).copied());
            current = match existing {
                Some(id) => id,
                None => {
                    let id = self.alloc_id();
                    self.nodes.insert(id, SceneNode::new(segment.as_str(), Some(current)));
                    if let Some(parent) = self.nodes.get_mut(&current) {
                        parent.children.push(id);
                        parent.child_index.insert(segment.clone(), id);
                    }
                    id
                }
            };
        }
        self.nodes
            .entry(current)
            .or_insert_with(|| SceneNode::new("", None))
    }

    /// Replace the object at `path`. Earlier property writes no longer apply.
    pub fn upsert_object(&mut self, path: &Path, object: Blob) {
        let node = self.find_or_create(path);
        node.object = Some(object);
        node.properties.clear();
    }

    /// Replace the transform at `path`.
    pub fn upsert_transform(&mut self, path: &Path, transform: Blob) {
        self.find_or_create(path).transform = Some(transform);
    }

    /// Record a property write at `path`.
    pub fn push_property(&mut self, path: &Path, property: Blob) {
        self.find_or_create(path).properties.push(property);
    }

    /// Replace the animation at `path`.
    pub fn upsert_animation(&mut self, path: &Path, animation: Blob) {
        self.find_or_create(path).animation = Some(animation);
    }

    /// Remove `path` and its subtree. Deleting the root empties the tree.
    pub fn delete(&mut self, path: &Path) {
        if path.is_root() {
            *self = SceneTree::new();
            return;
        }
        let Some(id) = self.find(path) else {
            return;
        };

        // Collect subtree IDs (BFS)
        let mut to_remove = vec![id];
        let mut i = 0;
        while i < to_remove.len() {
            if let Some(node) = self.nodes.get(&to_remove[i]) {
                to_remove.extend_from_slice(&node.children);
            }
            i += 1;
        }

        // Detach from parent
        let detached = self.nodes.get(&id).and_then(|n| n.parent.map(|p| (p, n.name.clone())));
        if let Some((parent_id, name)) = detached {
            if let Some(parent) = self.nodes.get_mut(&parent_id) {
                parent.children.retain(|c| *c != id);
                parent.child_index.remove(&name);
            }
        }

        for nid in to_remove {
            self.nodes.remove(&nid);
        }
    }

    /// Apply a bridge command to the tree.
    pub fn apply(&mut self, kind: CommandKind, path: &Path, data: Blob) {
        match kind {
            CommandKind::SetObject => self.upsert_object(path, data),
            CommandKind::SetTransform => self.upsert_transform(path, data),
            CommandKind::SetProperty => self.push_property(path, data),
            CommandKind::SetAnimation => self.upsert_animation(path, data),
            CommandKind::Delete => self.delete(path),
        }
    }

    /// Pre-order traversal of the nodes that hold a payload. Calling it again
    /// restarts from the root.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            tree: self,
            stack: vec![(self.root, Path::root())],
        }
    }

    /// Every recorded payload in replay order.
    pub fn replay(&self) -> Vec<Blob> {
        self.walk()
            .flat_map(|(_, node)| node.payloads().cloned())
            .collect()
    }

    /// True when no node holds a payload.
    pub fn is_empty(&self) -> bool {
        self.walk().next().is_none()
    }
}

impl Default for SceneTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy pre-order iterator returned by [`SceneTree::walk`].
pub struct Walk<'a> {
    tree: &'a SceneTree,
    stack: Vec<(SceneNodeId, Path)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (Path, &'a SceneNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((id, path)) = self.stack.pop() {
            let Some(node) = self.tree.nodes.get(&id) else {
                continue;
            };
            for &child in node.children.iter().rev() {
                if let Some(c) = self.tree.nodes.get(&child) {
                    self.stack.push((child, path.append(&c.name)));
                }
            }
            if node.has_payload() {
                return Some((path, node));
            }
        }
        None
    }
}

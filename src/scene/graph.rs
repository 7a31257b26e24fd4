//! Scene graph: node storage and ownership tree
//!
//! Nodes are entities in a [`hecs::World`]; the tree is carried by
//! [`Parent`]/[`Children`] components plus an ordered root list that owns
//! every node without a parent. Exactly one owner exists per node at all
//! times: its parent, or the root list. Structural edits must happen
//! between frames; traversal and mutation are single-threaded by
//! contract.

use hecs::Entity;

use super::hierarchy::{Children, Name, Parent};
use super::transform::TransformCache;

/// Errors from structural scene-graph edits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The entity is not part of this graph
    NodeNotFound,
    /// A node cannot become its own parent
    AttachSelf,
    /// The attachment would create a cycle
    AttachCycle,
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NodeNotFound => write!(f, "node not found in scene graph"),
            Self::AttachSelf => write!(f, "cannot attach a node to itself"),
            Self::AttachCycle => write!(f, "attachment would create a cycle"),
        }
    }
}

impl std::error::Error for SceneError {}

/// The scene graph: a world of nodes plus the ordered list of tree roots
pub struct SceneGraph {
    world: hecs::World,
    roots: Vec<Entity>,
}

impl SceneGraph {
    /// Create an empty scene graph
    #[must_use]
    pub fn new() -> Self {
        Self {
            world: hecs::World::new(),
            roots: Vec::new(),
        }
    }

    /// Spawn a plain named node with a transform; it starts as a root
    pub fn spawn_node(&mut self, name: &str) -> Entity {
        let entity = self
            .world
            .spawn((Name::new(name), TransformCache::new(), Children::new()));
        self.roots.push(entity);
        entity
    }

    /// Spawn a node from a prepared component builder.
    ///
    /// Used by the clone engine and snapshot loader; the node is only
    /// registered as a root when `as_root` is set.
    pub(crate) fn spawn_builder(
        &mut self,
        builder: &mut hecs::EntityBuilder,
        as_root: bool,
    ) -> Entity {
        let entity = self.world.spawn(builder.build());
        if as_root {
            self.roots.push(entity);
        }
        entity
    }

    /// Direct access to the underlying world for queries
    #[must_use]
    pub fn world(&self) -> &hecs::World {
        &self.world
    }

    pub(crate) fn world_mut(&mut self) -> &mut hecs::World {
        &mut self.world
    }

    pub(crate) fn push_root(&mut self, entity: Entity) {
        self.roots.push(entity);
    }

    /// Check whether an entity is a live node of this graph
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.world.contains(entity)
    }

    /// Borrow a component of a node
    #[must_use]
    pub fn get<T: hecs::Component>(&self, entity: Entity) -> Option<hecs::Ref<'_, T>> {
        self.world.get::<&T>(entity).ok()
    }

    /// Mutably borrow a component of a node
    pub fn get_mut<T: hecs::Component>(&mut self, entity: Entity) -> Option<hecs::RefMut<'_, T>> {
        self.world.get::<&mut T>(entity).ok()
    }

    /// The parent of a node, if it has one
    #[must_use]
    pub fn parent(&self, entity: Entity) -> Option<Entity> {
        self.get::<Parent>(entity).map(|p| p.entity())
    }

    /// Children of a node in traversal order
    #[must_use]
    pub fn children(&self, entity: Entity) -> Vec<Entity> {
        self.get::<Children>(entity)
            .map(|c| c.iter().collect())
            .unwrap_or_default()
    }

    /// The current tree roots in creation order
    #[must_use]
    pub fn roots(&self) -> &[Entity] {
        &self.roots
    }

    /// Check whether a node is owned by the root list
    #[must_use]
    pub fn is_root(&self, entity: Entity) -> bool {
        self.roots.contains(&entity)
    }

    /// Number of live nodes
    #[must_use]
    pub fn len(&self) -> u32 {
        self.world.len()
    }

    /// Check whether the graph has no nodes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.world.is_empty()
    }

    /// Number of nodes in a subtree, the root included
    #[must_use]
    pub fn subtree_len(&self, root: Entity) -> usize {
        if !self.contains(root) {
            return 0;
        }
        let mut count = 0;
        let mut stack = vec![root];
        while let Some(entity) = stack.pop() {
            count += 1;
            stack.extend(self.children(entity));
        }
        count
    }

    /// Re-home a node under a new parent.
    ///
    /// Detach from the old owner (previous parent or root list) and
    /// attach to the new one as a single non-interruptible step, so the
    /// node never has zero or two owners. The child keeps its traversal
    /// position as the new parent's last child, and its transform is
    /// marked dirty because its frame of reference changed.
    ///
    /// # Errors
    ///
    /// Rejects unknown entities, self-attachment, and attachments that
    /// would make a node its own ancestor.
    pub fn attach(&mut self, child: Entity, parent: Entity) -> Result<(), SceneError> {
        if !self.contains(child) || !self.contains(parent) {
            return Err(SceneError::NodeNotFound);
        }
        if child == parent {
            return Err(SceneError::AttachSelf);
        }

        // Walk up from the new parent; finding the child means a cycle
        let mut ancestor = Some(parent);
        while let Some(current) = ancestor {
            if current == child {
                return Err(SceneError::AttachCycle);
            }
            ancestor = self.parent(current);
        }

        self.release_from_owner(child);

        if let Some(mut children) = self.get_mut::<Children>(parent) {
            children.push(child);
        } else {
            let mut children = Children::new();
            children.push(child);
            let _ = self.world.insert_one(parent, children);
        }
        let _ = self.world.insert_one(child, Parent::new(parent));

        if let Some(mut transform) = self.get_mut::<TransformCache>(child) {
            transform.mark_dirty();
        }

        Ok(())
    }

    /// Detach a node from its parent; it becomes a root.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] for unknown entities.
    pub fn detach(&mut self, child: Entity) -> Result<(), SceneError> {
        if !self.contains(child) {
            return Err(SceneError::NodeNotFound);
        }
        if self.parent(child).is_some() {
            self.release_from_owner(child);
            self.roots.push(child);
        }
        Ok(())
    }

    /// Remove a node and its whole subtree from the graph.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] for unknown entities.
    pub fn despawn(&mut self, entity: Entity) -> Result<(), SceneError> {
        if !self.contains(entity) {
            return Err(SceneError::NodeNotFound);
        }

        self.release_from_owner(entity);
        self.despawn_subtree(entity);
        Ok(())
    }

    /// Remove a node from whichever owner currently holds it, without
    /// giving it a new one. Callers must re-own the node immediately.
    fn release_from_owner(&mut self, entity: Entity) {
        if let Some(parent) = self.parent(entity) {
            if let Some(mut children) = self.get_mut::<Children>(parent) {
                children.remove(entity);
            }
            let _ = self.world.remove_one::<Parent>(entity);
        } else if let Some(pos) = self.roots.iter().position(|&r| r == entity) {
            self.roots.remove(pos);
        }
    }

    fn despawn_subtree(&mut self, entity: Entity) {
        for child in self.children(entity) {
            self.despawn_subtree(child);
        }
        let _ = self.world.despawn(entity);
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

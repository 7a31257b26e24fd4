//! Scene snapshots
//!
//! A flat, serializable form of a subtree: node names and transforms
//! linked by indices, in breadth-first order. Supports RON and JSON on
//! disk. Renderable payloads (meshes, materials, skeletons) are not part
//! of the snapshot; they are rebound after loading by whatever owns the
//! asset pipeline.

use std::fs;
use std::path::Path;

use glam::{Quat, Vec3};
use hecs::Entity;
use serde::{Deserialize, Serialize};

use super::graph::SceneGraph;
use super::hierarchy::Name;
use super::transform::TransformCache;

/// A serialized node with index links into the snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotNode {
    /// Node name, if it had one
    pub name: Option<String>,
    /// Local position
    pub position: Vec3,
    /// Local rotation
    pub rotation: Quat,
    /// Local scale
    pub scale: Vec3,
    /// Index of the parent node (None for the subtree root)
    pub parent: Option<usize>,
    /// Indices of children, in traversal order
    pub children: Vec<usize>,
}

/// A serializable subtree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneSnapshot {
    /// Snapshot name
    pub name: String,
    /// Format version for compatibility
    pub version: u32,
    /// Nodes in breadth-first order; index 0 is the subtree root
    pub nodes: Vec<SnapshotNode>,
}

impl SceneSnapshot {
    /// Current snapshot format version
    pub const VERSION: u32 = 1;

    /// Capture a subtree into a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Malformed`] when `root` is not a live
    /// node of the graph.
    pub fn capture(
        graph: &SceneGraph,
        root: Entity,
        name: impl Into<String>,
    ) -> Result<Self, SnapshotError> {
        if !graph.contains(root) {
            return Err(SnapshotError::Malformed(
                "snapshot root is not a live node".to_string(),
            ));
        }

        // Breadth-first order assigns every node its index
        let mut order = Vec::new();
        let mut index_of = std::collections::HashMap::new();
        let mut frontier = std::collections::VecDeque::from([root]);
        while let Some(entity) = frontier.pop_front() {
            index_of.insert(entity, order.len());
            order.push(entity);
            frontier.extend(graph.children(entity));
        }

        let nodes = order
            .iter()
            .map(|&entity| {
                let (position, rotation, scale) = graph
                    .get::<TransformCache>(entity)
                    .map_or((Vec3::ZERO, Quat::IDENTITY, Vec3::ONE), |t| {
                        (t.position(), t.rotation(), t.scale())
                    });
                SnapshotNode {
                    name: graph.get::<Name>(entity).map(|n| n.0.clone()),
                    position,
                    rotation,
                    scale,
                    parent: graph
                        .parent(entity)
                        .and_then(|p| index_of.get(&p).copied()),
                    children: graph
                        .children(entity)
                        .iter()
                        .map(|c| index_of[c])
                        .collect(),
                }
            })
            .collect();

        Ok(Self {
            name: name.into(),
            version: Self::VERSION,
            nodes,
        })
    }

    /// Rebuild the snapshot as a new subtree; its root joins the graph's
    /// root list.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Malformed`] for empty snapshots, child
    /// indices out of range, or link structures that do not form a tree.
    pub fn instantiate(&self, graph: &mut SceneGraph) -> Result<Entity, SnapshotError> {
        if self.nodes.is_empty() {
            return Err(SnapshotError::Malformed("snapshot has no nodes".to_string()));
        }

        let entities: Vec<Entity> = self
            .nodes
            .iter()
            .map(|node| {
                let entity = graph.spawn_node(node.name.as_deref().unwrap_or("node"));
                if let Some(mut transform) = graph.get_mut::<TransformCache>(entity) {
                    transform.set_position(node.position);
                    transform.set_rotation(node.rotation);
                    transform.set_scale(node.scale);
                }
                entity
            })
            .collect();

        for (index, node) in self.nodes.iter().enumerate() {
            for &child in &node.children {
                let child_entity = *entities.get(child).ok_or_else(|| {
                    SnapshotError::Malformed(format!("child index {child} out of range"))
                })?;
                graph
                    .attach(child_entity, entities[index])
                    .map_err(|e| SnapshotError::Malformed(e.to_string()))?;
            }
        }

        Ok(entities[0])
    }

    /// Save the snapshot to a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let ron_string = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SnapshotError::Serialize(e.to_string()))?;
        fs::write(path, ron_string).map_err(|e| SnapshotError::Io(e.to_string()))?;
        Ok(())
    }

    /// Load a snapshot from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let content = fs::read_to_string(path).map_err(|e| SnapshotError::Io(e.to_string()))?;
        ron::from_str(&content).map_err(|e| SnapshotError::Deserialize(e.to_string()))
    }

    /// Save the snapshot to a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let json_string = serde_json::to_string_pretty(self)
            .map_err(|e| SnapshotError::Serialize(e.to_string()))?;
        fs::write(path, json_string).map_err(|e| SnapshotError::Io(e.to_string()))?;
        Ok(())
    }

    /// Load a snapshot from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let content = fs::read_to_string(path).map_err(|e| SnapshotError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| SnapshotError::Deserialize(e.to_string()))
    }

    /// Number of nodes in the snapshot
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Errors that can occur during snapshot operations
#[derive(Debug, Clone)]
pub enum SnapshotError {
    /// IO error
    Io(String),
    /// Serialization error
    Serialize(String),
    /// Deserialization error
    Deserialize(String),
    /// Snapshot data does not describe a valid tree
    Malformed(String),
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Serialize(e) => write!(f, "Serialization error: {e}"),
            Self::Deserialize(e) => write!(f, "Deserialization error: {e}"),
            Self::Malformed(e) => write!(f, "Malformed snapshot: {e}"),
        }
    }
}

impl std::error::Error for SnapshotError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> (SceneGraph, Entity) {
        let mut graph = SceneGraph::new();
        let root = graph.spawn_node("root");
        let left = graph.spawn_node("left");
        let right = graph.spawn_node("right");
        graph.attach(left, root).unwrap();
        graph.attach(right, root).unwrap();
        graph
            .get_mut::<TransformCache>(left)
            .unwrap()
            .set_position(Vec3::new(1.0, 2.0, 3.0));
        (graph, root)
    }

    #[test]
    fn test_capture_assigns_breadth_first_indices() {
        let (graph, root) = sample_graph();

        let snapshot = SceneSnapshot::capture(&graph, root, "test").unwrap();

        assert_eq!(snapshot.node_count(), 3);
        assert_eq!(snapshot.nodes[0].name.as_deref(), Some("root"));
        assert_eq!(snapshot.nodes[0].children, vec![1, 2]);
        assert_eq!(snapshot.nodes[1].parent, Some(0));
        assert_eq!(snapshot.nodes[1].name.as_deref(), Some("left"));
    }

    #[test]
    fn test_snapshot_roundtrip_through_graph() {
        let (mut graph, root) = sample_graph();

        let snapshot = SceneSnapshot::capture(&graph, root, "test").unwrap();
        let rebuilt = snapshot.instantiate(&mut graph).unwrap();

        assert_ne!(rebuilt, root);
        assert_eq!(graph.subtree_len(rebuilt), 3);

        let children = graph.children(rebuilt);
        assert_eq!(children.len(), 2);
        assert_eq!(
            graph.get::<TransformCache>(children[0]).unwrap().position(),
            Vec3::new(1.0, 2.0, 3.0)
        );
    }

    #[test]
    fn test_ron_string_roundtrip() {
        let (graph, root) = sample_graph();
        let snapshot = SceneSnapshot::capture(&graph, root, "ron-test").unwrap();

        let text =
            ron::ser::to_string_pretty(&snapshot, ron::ser::PrettyConfig::default()).unwrap();
        assert!(text.contains("left"));

        let loaded: SceneSnapshot = ron::from_str(&text).unwrap();
        assert_eq!(loaded.name, "ron-test");
        assert_eq!(loaded.node_count(), 3);
    }

    #[test]
    fn test_json_string_roundtrip() {
        let (graph, root) = sample_graph();
        let snapshot = SceneSnapshot::capture(&graph, root, "json-test").unwrap();

        let text = serde_json::to_string(&snapshot).unwrap();
        let loaded: SceneSnapshot = serde_json::from_str(&text).unwrap();

        assert_eq!(loaded.name, "json-test");
        assert_eq!(loaded.nodes[0].children, vec![1, 2]);
    }

    #[test]
    fn test_instantiate_rejects_bad_indices() {
        let snapshot = SceneSnapshot {
            name: "broken".to_string(),
            version: SceneSnapshot::VERSION,
            nodes: vec![SnapshotNode {
                name: None,
                position: Vec3::ZERO,
                rotation: Quat::IDENTITY,
                scale: Vec3::ONE,
                parent: None,
                children: vec![7],
            }],
        };

        let mut graph = SceneGraph::new();
        assert!(matches!(
            snapshot.instantiate(&mut graph),
            Err(SnapshotError::Malformed(_))
        ));
    }
}

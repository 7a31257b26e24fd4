//! Breadth-first node paths
//!
//! A [`NodePath`] is the sequence of child indices leading from a subtree
//! root to one of its nodes. Given stable child ordering it is the only
//! positional address that survives a structural copy, which is why the
//! clone engine records paths before copying and resolves them against
//! the copy afterwards. Paths are transient; they are never stored on
//! nodes.

use std::fmt;

use hecs::Entity;
use smallvec::SmallVec;

use super::graph::SceneGraph;
use super::hierarchy::Children;

/// Child-index sequence locating a node inside a specific subtree
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodePath(SmallVec<[usize; 8]>);

impl NodePath {
    /// The empty path, addressing the subtree root itself
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from explicit child indices
    #[must_use]
    pub fn from_indices(indices: &[usize]) -> Self {
        Self(SmallVec::from_slice(indices))
    }

    /// The child indices, outermost first
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Number of tree levels the path descends
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Whether the path addresses the root itself
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    fn descend(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.0.push(index);
        next
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{index}")?;
        }
        Ok(())
    }
}

/// Find the breadth-first path from `root` to `target`.
///
/// Siblings are visited in child order, so the first hit is the unique
/// breadth-first address. Returns `None` when `target` is not in the
/// subtree under `root`.
#[must_use]
pub fn path_to(graph: &SceneGraph, root: Entity, target: Entity) -> Option<NodePath> {
    if !graph.contains(root) || !graph.contains(target) {
        return None;
    }

    let mut frontier: std::collections::VecDeque<(Entity, NodePath)> =
        std::collections::VecDeque::new();
    frontier.push_back((root, NodePath::root()));

    while let Some((entity, path)) = frontier.pop_front() {
        if entity == target {
            return Some(path);
        }
        if let Some(children) = graph.get::<Children>(entity) {
            for (index, child) in children.iter().enumerate() {
                frontier.push_back((child, path.descend(index)));
            }
        }
    }

    None
}

/// Resolve a path against a subtree root, walking one child index per
/// level. Returns `None` on any out-of-range index.
#[must_use]
pub fn resolve(graph: &SceneGraph, root: Entity, path: &NodePath) -> Option<Entity> {
    if !graph.contains(root) {
        return None;
    }

    let mut current = root;
    for &index in path.indices() {
        current = graph.get::<Children>(current)?.get(index)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// root -> [a, b], b -> [c]
    fn sample_tree(graph: &mut SceneGraph) -> (Entity, Entity, Entity, Entity) {
        let root = graph.spawn_node("root");
        let a = graph.spawn_node("a");
        let b = graph.spawn_node("b");
        let c = graph.spawn_node("c");
        graph.attach(a, root).unwrap();
        graph.attach(b, root).unwrap();
        graph.attach(c, b).unwrap();
        (root, a, b, c)
    }

    #[test]
    fn test_path_to_descendants() {
        let mut graph = SceneGraph::new();
        let (root, a, b, c) = sample_tree(&mut graph);

        assert_eq!(path_to(&graph, root, a), Some(NodePath::from_indices(&[0])));
        assert_eq!(path_to(&graph, root, b), Some(NodePath::from_indices(&[1])));
        assert_eq!(
            path_to(&graph, root, c),
            Some(NodePath::from_indices(&[1, 0]))
        );
    }

    #[test]
    fn test_path_to_root_is_empty() {
        let mut graph = SceneGraph::new();
        let (root, ..) = sample_tree(&mut graph);

        let path = path_to(&graph, root, root).unwrap();
        assert!(path.is_root());
        assert_eq!(path.depth(), 0);
    }

    #[test]
    fn test_path_to_outside_subtree_is_none() {
        let mut graph = SceneGraph::new();
        let (_, a, b, _) = sample_tree(&mut graph);
        let outside = graph.spawn_node("outside");

        assert_eq!(path_to(&graph, a, outside), None);
        assert_eq!(path_to(&graph, a, b), None);
    }

    #[test]
    fn test_resolve_roundtrip() {
        let mut graph = SceneGraph::new();
        let (root, a, b, c) = sample_tree(&mut graph);

        for target in [root, a, b, c] {
            let path = path_to(&graph, root, target).unwrap();
            assert_eq!(resolve(&graph, root, &path), Some(target));
        }
    }

    #[test]
    fn test_resolve_out_of_range_is_none() {
        let mut graph = SceneGraph::new();
        let (root, ..) = sample_tree(&mut graph);

        assert_eq!(resolve(&graph, root, &NodePath::from_indices(&[5])), None);
        assert_eq!(
            resolve(&graph, root, &NodePath::from_indices(&[0, 0])),
            None
        );
    }

    #[test]
    fn test_path_display() {
        assert_eq!(NodePath::from_indices(&[2, 0, 1]).to_string(), "2.0.1");
        assert_eq!(NodePath::root().to_string(), "<root>");
    }
}

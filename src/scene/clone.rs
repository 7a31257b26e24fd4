//! Identity-preserving structural clone
//!
//! Cloning an asset subtree must keep its reference table pointing at
//! "the same logical part" inside the copy. A plain deep copy would leave
//! entries dangling at the source tree; duplicating every referenced node
//! would split shared identities. Instead, each referenced node is
//! recorded as its breadth-first path relative to the asset node before
//! the copy, and the path is resolved against the cloned asset afterwards
//! - the only positional address guaranteed to survive a faithful
//! structural copy. References that are not descendants of their asset
//! have no positional correspondence and get an independent clone of
//! their own.

use hecs::{Entity, EntityBuilder};

use super::asset::AssetRoot;
use super::dispatch::Model;
use super::graph::{SceneError, SceneGraph};
use super::hierarchy::{Children, Name};
use super::path;
use super::transform::TransformCache;

impl SceneGraph {
    /// Deep-copy a subtree, preserving structure, per-node state, and
    /// reference-table identity. The new root joins the graph's root
    /// list; the source subtree is left untouched and shares no mutable
    /// state with the copy.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] when `source` is not a live
    /// node. Per-entry reference failures inside the copy are logged and
    /// skipped, never escalated.
    pub fn clone_subtree(&mut self, source: Entity) -> Result<Entity, SceneError> {
        if !self.contains(source) {
            return Err(SceneError::NodeNotFound);
        }

        let root = copy_node(self, source)?;
        self.push_root(root);
        Ok(root)
    }
}

/// Copy one node and, recursively, its children. Asset reference tables
/// are remapped once the node's whole subtree exists in the copy.
fn copy_node(graph: &mut SceneGraph, src: Entity) -> Result<Entity, SceneError> {
    let name = graph.get::<Name>(src).map(|n| (*n).clone());
    let transform = graph.get::<TransformCache>(src).map(|t| (*t).clone());
    let model = graph.get::<Model>(src).map(|m| (*m).clone());
    let asset_entries: Option<(AssetRoot, Vec<(String, Entity)>)> =
        graph.get::<AssetRoot>(src).map(|a| {
            let entries = a.entries().map(|(k, e)| (k.to_string(), e)).collect();
            (a.clone_shell(), entries)
        });

    let mut builder = EntityBuilder::new();
    if let Some(name) = name {
        builder.add(name);
    }
    if let Some(transform) = transform {
        builder.add(transform);
    }
    if let Some(model) = model {
        builder.add(model);
    }
    if let Some((shell, _)) = &asset_entries {
        builder.add(shell.clone());
    }
    builder.add(Children::new());

    let dst = graph.spawn_builder(&mut builder, false);

    for child in graph.children(src) {
        let copy = copy_node(graph, child)?;
        graph.attach(copy, dst)?;
    }

    if let Some((_, entries)) = asset_entries {
        remap_references(graph, src, dst, entries);
    }

    Ok(dst)
}

/// Repoint a cloned asset's table at the structurally equivalent nodes of
/// the copy. Reachable entries resolve by path; unreachable entries get
/// an independent clone. Every failure is contained to its entry.
fn remap_references(
    graph: &mut SceneGraph,
    src_asset: Entity,
    dst_asset: Entity,
    entries: Vec<(String, Entity)>,
) {
    for (key, target) in entries {
        match path::path_to(graph, src_asset, target) {
            Some(p) => match path::resolve(graph, dst_asset, &p) {
                Some(found) => {
                    // The resolved node must still carry the renderable
                    // capability the table promises
                    if graph.get::<Model>(found).is_some() {
                        if let Some(mut asset) = graph.get_mut::<AssetRoot>(dst_asset) {
                            asset.insert_entry(key, found);
                        }
                    } else {
                        log::warn!(
                            "Cloned node at path {p} for model '{key}' is not renderable; entry skipped"
                        );
                    }
                }
                None => {
                    log::warn!(
                        "Path {p} for model '{key}' did not resolve in the clone; entry skipped"
                    );
                }
            },
            None => {
                // No positional correspondence exists; the clone gets an
                // independent copy with its own identity
                match graph.clone_subtree(target) {
                    Ok(copy) => {
                        if let Some(mut asset) = graph.get_mut::<AssetRoot>(dst_asset) {
                            asset.insert_entry(key, copy);
                        }
                    }
                    Err(e) => {
                        log::warn!("Could not clone external model '{key}': {e}; entry skipped");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::Handle;
    use crate::render::{Material, MaterialId, Materials, Mesh, ShaderId};
    use glam::Vec3;

    fn model_part(materials: &mut Materials) -> Model {
        let material = materials.insert(Material::new(ShaderId::next(), Vec3::ONE));
        Model::new(Handle::new(Mesh::cube()), material)
    }

    fn node_name(graph: &SceneGraph, entity: Entity) -> String {
        graph.get::<Name>(entity).unwrap().0.clone()
    }

    /// Same names, same branching, same child order, level by level
    fn assert_same_shape(graph: &SceneGraph, a: Entity, b: Entity) {
        assert_ne!(a, b, "clone must be a distinct node");
        assert_eq!(node_name(graph, a), node_name(graph, b));

        let (ca, cb) = (graph.children(a), graph.children(b));
        assert_eq!(ca.len(), cb.len(), "branching differs under {a:?}");
        for (x, y) in ca.iter().zip(cb.iter()) {
            assert_same_shape(graph, *x, *y);
        }
    }

    /// Asset with body at path [0] and head as body's first child [0, 0]
    fn body_head_asset(
        graph: &mut SceneGraph,
        materials: &mut Materials,
    ) -> (Entity, Entity, Entity) {
        let asset = graph.spawn_asset("rig", AssetRoot::new());
        let body = graph.spawn_model("body", model_part(materials));
        let head = graph.spawn_model("head", model_part(materials));
        graph.add_model(asset, "body", body, true);
        graph.attach(head, body).unwrap();
        graph.add_model(asset, "head", head, false);
        (asset, body, head)
    }

    #[test]
    fn test_clone_preserves_shape_and_count() {
        let mut graph = SceneGraph::new();
        let mut materials = Materials::new();

        let root = graph.spawn_node("root");
        let a = graph.spawn_model("a", model_part(&mut materials));
        let b = graph.spawn_node("b");
        let leaf = graph.spawn_model("leaf", model_part(&mut materials));
        graph.attach(a, root).unwrap();
        graph.attach(b, root).unwrap();
        graph.attach(leaf, b).unwrap();

        let copy = graph.clone_subtree(root).unwrap();

        assert_eq!(graph.subtree_len(copy), graph.subtree_len(root));
        assert_same_shape(&graph, root, copy);
        assert!(graph.is_root(copy));
        // The source is untouched
        assert_eq!(graph.children(root), vec![a, b]);
    }

    #[test]
    fn test_clone_copies_transform_state() {
        let mut graph = SceneGraph::new();

        let root = graph.spawn_node("root");
        graph
            .get_mut::<TransformCache>(root)
            .unwrap()
            .set_position(Vec3::new(3.0, 2.0, 1.0));

        let copy = graph.clone_subtree(root).unwrap();

        let mut copied = graph.get_mut::<TransformCache>(copy).unwrap();
        assert_eq!(copied.position(), Vec3::new(3.0, 2.0, 1.0));
        assert_eq!(
            copied.world_matrix().w_axis.truncate(),
            Vec3::new(3.0, 2.0, 1.0)
        );
    }

    #[test]
    fn test_clone_shares_no_mutable_state() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn_node("root");
        let copy = graph.clone_subtree(root).unwrap();

        graph
            .get_mut::<TransformCache>(root)
            .unwrap()
            .set_position(Vec3::X);

        assert_eq!(
            graph.get::<TransformCache>(copy).unwrap().position(),
            Vec3::ZERO
        );
    }

    #[test]
    fn test_reachable_references_remap_to_clone() {
        let mut graph = SceneGraph::new();
        let mut materials = Materials::new();
        let (asset, body, head) = body_head_asset(&mut graph, &mut materials);

        let copy = graph.clone_subtree(asset).unwrap();

        let cloned_body = graph.model(copy, "body").unwrap();
        let cloned_head = graph.model(copy, "head").unwrap();

        // New identities, not the originals
        assert_ne!(cloned_body, body);
        assert_ne!(cloned_head, head);

        // The head is still the body's first child, inside the clone
        assert_eq!(graph.children(copy), vec![cloned_body]);
        assert_eq!(graph.children(cloned_body)[0], cloned_head);

        // And the paths match the source's [0] and [0, 0]
        assert_eq!(
            path::path_to(&graph, copy, cloned_head).unwrap(),
            path::path_to(&graph, asset, head).unwrap()
        );
    }

    #[test]
    fn test_duplicate_references_resolve_to_one_node() {
        let mut graph = SceneGraph::new();
        let mut materials = Materials::new();

        let asset = graph.spawn_asset("rig", AssetRoot::new());
        let body = graph.spawn_model("body", model_part(&mut materials));
        graph.add_model(asset, "body", body, true);
        graph.add_model(asset, "torso", body, false);

        let copy = graph.clone_subtree(asset).unwrap();

        let by_body = graph.model(copy, "body").unwrap();
        let by_torso = graph.model(copy, "torso").unwrap();
        assert_eq!(by_body, by_torso);
        assert_eq!(graph.subtree_len(copy), 2);
    }

    #[test]
    fn test_unreachable_reference_clones_independently() {
        let mut graph = SceneGraph::new();
        let mut materials = Materials::new();

        let asset = graph.spawn_asset("rig", AssetRoot::new());
        // Owned by a separate tree, registered by reference only
        let shelf = graph.spawn_node("shelf");
        let template = graph.spawn_model("template", model_part(&mut materials));
        graph.attach(template, shelf).unwrap();
        graph.add_model(asset, "template", template, true);
        assert_eq!(graph.parent(template), Some(shelf));

        let first = graph.clone_subtree(asset).unwrap();
        let second = graph.clone_subtree(asset).unwrap();

        let first_copy = graph.model(first, "template").unwrap();
        let second_copy = graph.model(second, "template").unwrap();

        // Distinct from the original and from each other
        assert_ne!(first_copy, template);
        assert_ne!(second_copy, template);
        assert_ne!(first_copy, second_copy);

        // Structurally equal stand-ins, owned by the root list
        assert_same_shape(&graph, template, first_copy);
        assert!(graph.is_root(first_copy));
        // Not part of the cloned asset's subtree
        assert!(path::path_to(&graph, first, first_copy).is_none());
    }

    #[test]
    fn test_double_clone_is_structurally_stable() {
        let mut graph = SceneGraph::new();
        let mut materials = Materials::new();
        let (asset, ..) = body_head_asset(&mut graph, &mut materials);

        let once = graph.clone_subtree(asset).unwrap();
        let twice = graph.clone_subtree(once).unwrap();

        assert_same_shape(&graph, once, twice);

        // The second clone's table is remapped into its own subtree
        let head = graph.model(twice, "head").unwrap();
        assert_eq!(
            path::path_to(&graph, twice, head),
            Some(path::NodePath::from_indices(&[0, 0]))
        );
    }

    #[test]
    fn test_nested_assets_remap_their_own_tables() {
        let mut graph = SceneGraph::new();
        let mut materials = Materials::new();

        let outer = graph.spawn_asset("outer", AssetRoot::new());
        let inner = graph.spawn_asset("inner", AssetRoot::new());
        let gem = graph.spawn_model("gem", model_part(&mut materials));
        graph.attach(inner, outer).unwrap();
        graph.add_model(inner, "gem", gem, true);
        // The outer asset can reference through the inner one
        graph.add_model(outer, "gem", gem, false);

        let copy = graph.clone_subtree(outer).unwrap();
        let cloned_inner = graph.children(copy)[0];
        let cloned_gem = graph.children(cloned_inner)[0];

        assert_eq!(graph.model(cloned_inner, "gem"), Some(cloned_gem));
        assert_eq!(graph.model(copy, "gem"), Some(cloned_gem));
        assert_ne!(cloned_gem, gem);
    }

    #[test]
    fn test_clone_copies_material_references_not_materials() {
        let mut graph = SceneGraph::new();
        let mut materials = Materials::new();

        let part = model_part(&mut materials);
        let material: MaterialId = part.material;
        let mesh = part.mesh.clone();
        let model = graph.spawn_model("part", part);

        let copy = graph.clone_subtree(model).unwrap();

        let cloned = graph.get::<Model>(copy).unwrap();
        // Mesh and material stay shared by identity
        assert_eq!(cloned.mesh, mesh);
        assert_eq!(cloned.material, material);
        assert_eq!(materials.len(), 1);
    }

    #[test]
    fn test_clone_of_dead_node_fails() {
        let mut graph = SceneGraph::new();
        let node = graph.spawn_node("gone");
        graph.despawn(node).unwrap();

        assert_eq!(graph.clone_subtree(node), Err(SceneError::NodeNotFound));
    }

    #[test]
    fn test_clone_keeps_playback_and_skeleton() {
        let mut graph = SceneGraph::new();
        let skeleton = Handle::new(crate::animation::Skeleton::new());
        let asset = graph.spawn_asset("rig", AssetRoot::with_skeleton(skeleton.clone()));
        graph.start_animation(asset, 0);
        graph.update(asset, 0.75);

        let copy = graph.clone_subtree(asset).unwrap();

        let cloned = graph.get::<AssetRoot>(copy).unwrap();
        assert_eq!(cloned.skeleton.as_ref(), Some(&skeleton));
        assert!(cloned.playback.is_playing());
        assert!((cloned.playback.elapsed() - 0.75).abs() < f32::EPSILON);
    }
}

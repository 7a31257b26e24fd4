//! Per-frame update and draw traversal
//!
//! `update` advances node state (animation playback), `draw` walks the
//! tree in child order, composing world matrices from the lazily cached
//! local transforms and recording one draw command per renderable part.
//!
//! Asset nodes wrap the plain traversal of their subtree: the distinct
//! materials below them are collected once, the bone palette chosen from
//! playback state is broadcast to each distinct material exactly once
//! (not once per part), the subtree is drawn, and the skinning flag is
//! cleared again on every one of them. Commands capture the flag at
//! record time, so the deferred execution sees the state that was active
//! while the subtree was recorded.

use glam::Mat4;
use hecs::Entity;
use rustc_hash::FxHashSet;

use crate::assets::Handle;
use crate::render::{DrawCommand, MaterialId, Materials, Mesh, RenderQueue};

use super::asset::AssetRoot;
use super::graph::SceneGraph;
use super::hierarchy::{Children, Name};
use super::transform::TransformCache;

/// Renderable capability: a mesh drawn with a material
#[derive(Debug, Clone)]
pub struct Model {
    /// Mesh to draw
    pub mesh: Handle<Mesh>,
    /// Material (and through it, shader program) to draw with
    pub material: MaterialId,
}

impl Model {
    /// Create a renderable part
    #[must_use]
    pub fn new(mesh: Handle<Mesh>, material: MaterialId) -> Self {
        Self { mesh, material }
    }
}

impl SceneGraph {
    /// Spawn a renderable node; it starts as a root
    pub fn spawn_model(&mut self, name: &str, model: Model) -> Entity {
        let entity = self.world_mut().spawn((
            Name::new(name),
            TransformCache::new(),
            Children::new(),
            model,
        ));
        self.push_root(entity);
        entity
    }

    /// Advance per-frame state of a subtree, children in order
    pub fn update(&mut self, root: Entity, dt: f32) {
        update_node(self, root, dt);
    }

    /// Advance per-frame state of every tree in the graph
    pub fn update_all(&mut self, dt: f32) {
        for root in self.roots().to_vec() {
            update_node(self, root, dt);
        }
    }

    /// Record draw commands for a subtree into the queue
    pub fn draw(
        &mut self,
        materials: &mut Materials,
        root: Entity,
        view_projection: Mat4,
        queue: &mut RenderQueue,
    ) {
        draw_node(self, materials, root, Mat4::IDENTITY, view_projection, queue);
    }

    /// Record draw commands for every tree in the graph
    pub fn draw_all(
        &mut self,
        materials: &mut Materials,
        view_projection: Mat4,
        queue: &mut RenderQueue,
    ) {
        for root in self.roots().to_vec() {
            draw_node(self, materials, root, Mat4::IDENTITY, view_projection, queue);
        }
    }
}

fn update_node(graph: &mut SceneGraph, entity: Entity, dt: f32) {
    if let Some(mut asset) = graph.get_mut::<AssetRoot>(entity) {
        asset.playback.advance(dt);
    }

    for child in graph.children(entity) {
        update_node(graph, child, dt);
    }
}

fn draw_node(
    graph: &mut SceneGraph,
    materials: &mut Materials,
    entity: Entity,
    parent_world: Mat4,
    view_projection: Mat4,
    queue: &mut RenderQueue,
) {
    let local = graph
        .get_mut::<TransformCache>(entity)
        .map_or(Mat4::IDENTITY, |mut t| t.world_matrix());
    let world = parent_world * local;

    // Asset pre-draw: choose a bone palette and broadcast it
    let skinned_materials = broadcast_bone_palette(graph, materials, entity);

    if let Some(model) = graph.get::<Model>(entity) {
        let command = DrawCommand {
            mesh: model.mesh.clone(),
            material: model.material,
            model: world,
            mvp: view_projection * world,
            skinned: materials
                .get(model.material)
                .is_some_and(|m| m.use_bone_transform()),
        };
        drop(model);
        queue.push(command);
    }

    for child in graph.children(entity) {
        draw_node(graph, materials, child, world, view_projection, queue);
    }

    // Skinning applies to this asset's subtree only
    if let Some(ids) = skinned_materials {
        for id in ids {
            if let Some(material) = materials.get_mut(id) {
                material.set_use_bone_transform(false);
            }
        }
    }
}

/// For an asset node with a skeleton: pick bind-pose or sampled bone
/// matrices, push them into each distinct material of the subtree once,
/// and flag those materials as skinned. Returns the flagged materials so
/// the caller can clear them after the subtree draw.
fn broadcast_bone_palette(
    graph: &mut SceneGraph,
    materials: &mut Materials,
    entity: Entity,
) -> Option<Vec<MaterialId>> {
    let (skeleton, playback) = {
        let asset = graph.get::<AssetRoot>(entity)?;
        (asset.skeleton.clone()?, asset.playback)
    };

    // Bind pose unless a valid clip is actively playing
    let palette = match playback.clip_index() {
        Some(clip) if playback.is_playing() && skeleton.animation(clip).is_some() => {
            skeleton.bone_matrices(clip, playback.elapsed())
        }
        _ => skeleton.bind_pose_matrices().to_vec(),
    };

    let groups = distinct_materials(graph, entity);
    for &id in &groups {
        if let Some(material) = materials.get_mut(id) {
            material.set_bone_matrices(&palette);
            material.set_use_bone_transform(true);
        } else {
            log::warn!("Skinned part references missing {id}");
        }
    }

    Some(groups)
}

/// Distinct materials of the renderable parts in a subtree, deduplicated
/// by identity, in first-encountered traversal order.
fn distinct_materials(graph: &SceneGraph, root: Entity) -> Vec<MaterialId> {
    let mut seen = FxHashSet::default();
    let mut ordered = Vec::new();
    let mut stack = vec![root];

    while let Some(entity) = stack.pop() {
        if let Some(model) = graph.get::<Model>(entity) {
            if seen.insert(model.material) {
                ordered.push(model.material);
            }
        }
        // Reverse so the stack pops children in traversal order
        let children = graph.children(entity);
        stack.extend(children.into_iter().rev());
    }

    ordered
}

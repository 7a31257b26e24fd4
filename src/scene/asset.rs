//! Asset nodes: named model tables and animation playback
//!
//! An asset is a node that exposes a name-keyed lookup table into its own
//! subtree (or to external nodes) and optionally carries a skeleton with
//! playback state. The table and the ownership tree are independent
//! relations: registering a model never moves it unless ownership is
//! explicitly handed over, and removing a table entry never detaches the
//! node.

use hecs::Entity;
use rustc_hash::FxHashMap;

use crate::animation::Skeleton;
use crate::assets::Handle;

use super::dispatch::Model;
use super::graph::SceneGraph;
use super::hierarchy::{Children, Name};
use super::transform::TransformCache;

/// Animation playback state of an asset.
///
/// Elapsed time accumulates only across updates made while playing; the
/// draw-time choice between bind pose and sampled pose is a pure function
/// of this state.
#[derive(Debug, Clone, Copy, Default)]
pub struct Playback {
    started: bool,
    elapsed: f32,
    clip: Option<usize>,
}

impl Playback {
    /// Create a stopped playback state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start playing a clip from its beginning
    pub fn start(&mut self, clip: usize) {
        self.started = true;
        self.clip = Some(clip);
        self.elapsed = 0.0;
    }

    /// Stop playback; elapsed time freezes until the next start
    pub fn stop(&mut self) {
        self.started = false;
    }

    /// Advance elapsed time; a no-op unless playing
    pub fn advance(&mut self, dt: f32) {
        if self.started {
            self.elapsed += dt;
        }
    }

    /// Whether playback is running
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.started
    }

    /// Seconds of playback accumulated while playing
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// The selected clip index, if any was ever started
    #[must_use]
    pub fn clip_index(&self) -> Option<usize> {
        self.clip
    }
}

/// Component marking a node as an asset root
#[derive(Debug, Clone, Default)]
pub struct AssetRoot {
    /// Name-keyed references into the subtree or to external nodes
    models: FxHashMap<String, Entity>,
    /// Skeleton driving skinned parts of this asset
    pub skeleton: Option<Handle<Skeleton>>,
    /// Animation playback state
    pub playback: Playback,
}

impl AssetRoot {
    /// Create an empty asset with no skeleton
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an asset driven by a skeleton
    #[must_use]
    pub fn with_skeleton(skeleton: Handle<Skeleton>) -> Self {
        Self {
            skeleton: Some(skeleton),
            ..Self::default()
        }
    }

    /// Look up a registered model
    #[must_use]
    pub fn model(&self, key: &str) -> Option<Entity> {
        self.models.get(key).copied()
    }

    /// Iterate over table entries in no particular order
    pub fn entries(&self) -> impl Iterator<Item = (&str, Entity)> {
        self.models.iter().map(|(k, &e)| (k.as_str(), e))
    }

    /// Number of registered models
    #[must_use]
    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    pub(crate) fn insert_entry(&mut self, key: String, entity: Entity) {
        self.models.insert(key, entity);
    }

    /// A fresh table-less copy carrying the skeleton and playback state;
    /// the clone engine fills the table after the structural copy.
    pub(crate) fn clone_shell(&self) -> Self {
        Self {
            models: FxHashMap::default(),
            skeleton: self.skeleton.clone(),
            playback: self.playback,
        }
    }
}

impl SceneGraph {
    /// Spawn an asset node; it starts as a root
    pub fn spawn_asset(&mut self, name: &str, asset: AssetRoot) -> Entity {
        let entity = self.world_mut().spawn((
            Name::new(name),
            TransformCache::new(),
            Children::new(),
            asset,
        ));
        self.push_root(entity);
        entity
    }

    /// Register a model under a key in an asset's table.
    ///
    /// The entry always overwrites a previous one with the same key.
    /// With `add_as_child`, an unowned model is additionally attached to
    /// the asset, handing over ownership in the same call; a model owned
    /// elsewhere stays where it is and is registered as a plain
    /// reference. Missing nodes and nodes without a renderable part are
    /// rejected with a warning and leave the table untouched.
    pub fn add_model(&mut self, asset: Entity, key: &str, model: Entity, add_as_child: bool) {
        if !self.contains(model) {
            log::warn!("Trying to register a missing node as model '{key}'");
            return;
        }
        if self.get::<Model>(model).is_none() {
            log::warn!("Node registered as model '{key}' has no renderable part; ignoring");
            return;
        }
        {
            let Some(mut table) = self.get_mut::<AssetRoot>(asset) else {
                log::warn!("add_model target for '{key}' is not an asset node");
                return;
            };
            table.insert_entry(key.to_string(), model);
        }

        if add_as_child {
            if self.parent(model).is_none() {
                if let Err(e) = self.attach(model, asset) {
                    log::warn!("Could not take ownership of model '{key}': {e}");
                }
            } else {
                // Owned elsewhere: the reference is external to this
                // asset's subtree until someone reparents it
                log::debug!("Model '{key}' already has an owner; keeping reference only");
            }
        }
    }

    /// Look up a model registered on an asset; `None` for unknown keys
    /// or non-asset nodes, never a panic
    #[must_use]
    pub fn model(&self, asset: Entity, key: &str) -> Option<Entity> {
        self.get::<AssetRoot>(asset)?.model(key)
    }

    /// Drop a table entry. The node itself stays in the tree; the table
    /// and the ownership relation are independent.
    pub fn remove_model(&mut self, asset: Entity, key: &str) {
        if let Some(mut table) = self.get_mut::<AssetRoot>(asset) {
            table.models.remove(key);
        }
    }

    /// A point-in-time copy of an asset's model table
    #[must_use]
    pub fn models(&self, asset: Entity) -> FxHashMap<String, Entity> {
        self.get::<AssetRoot>(asset)
            .map(|a| a.models.clone())
            .unwrap_or_default()
    }

    /// Start playing an animation clip on an asset
    pub fn start_animation(&mut self, asset: Entity, clip: usize) {
        if let Some(mut a) = self.get_mut::<AssetRoot>(asset) {
            a.playback.start(clip);
        }
    }

    /// Stop animation playback on an asset
    pub fn stop_animation(&mut self, asset: Entity) {
        if let Some(mut a) = self.get_mut::<AssetRoot>(asset) {
            a.playback.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{Material, Materials, Mesh, ShaderId};
    use glam::Vec3;

    fn model_part(materials: &mut Materials) -> Model {
        let material = materials.insert(Material::new(ShaderId::next(), Vec3::ONE));
        Model::new(Handle::new(Mesh::cube()), material)
    }

    fn setup() -> (SceneGraph, Materials, Entity) {
        let mut graph = SceneGraph::new();
        let materials = Materials::new();
        let asset = graph.spawn_asset("asset", AssetRoot::new());
        (graph, materials, asset)
    }

    #[test]
    fn test_add_model_takes_ownership_of_unowned_node() {
        let (mut graph, mut materials, asset) = setup();
        let body = graph.spawn_model("body", model_part(&mut materials));

        graph.add_model(asset, "body", body, true);

        assert_eq!(graph.model(asset, "body"), Some(body));
        assert_eq!(graph.parent(body), Some(asset));
        assert_eq!(graph.children(asset), vec![body]);
    }

    #[test]
    fn test_add_model_keeps_owned_node_in_place() {
        let (mut graph, mut materials, asset) = setup();
        let rig = graph.spawn_node("rig");
        let arm = graph.spawn_model("arm", model_part(&mut materials));
        graph.attach(arm, rig).unwrap();

        graph.add_model(asset, "arm", arm, true);

        // Registered, but ownership did not move
        assert_eq!(graph.model(asset, "arm"), Some(arm));
        assert_eq!(graph.parent(arm), Some(rig));
    }

    #[test]
    fn test_add_model_overwrites_same_key() {
        let (mut graph, mut materials, asset) = setup();
        let first = graph.spawn_model("first", model_part(&mut materials));
        let second = graph.spawn_model("second", model_part(&mut materials));

        graph.add_model(asset, "head", first, false);
        graph.add_model(asset, "head", second, false);

        assert_eq!(graph.model(asset, "head"), Some(second));
        assert_eq!(graph.models(asset).len(), 1);
    }

    #[test]
    fn test_add_model_rejects_dead_and_non_renderable_nodes() {
        let (mut graph, mut materials, asset) = setup();
        let plain = graph.spawn_node("plain");
        let dead = graph.spawn_model("dead", model_part(&mut materials));
        graph.despawn(dead).unwrap();

        graph.add_model(asset, "a", plain, false);
        graph.add_model(asset, "b", dead, false);

        assert_eq!(graph.model(asset, "a"), None);
        assert_eq!(graph.model(asset, "b"), None);
        assert_eq!(graph.models(asset).len(), 0);
    }

    #[test]
    fn test_missing_key_returns_none() {
        let (graph, _materials, asset) = setup();
        assert_eq!(graph.model(asset, "nope"), None);
    }

    #[test]
    fn test_remove_model_leaves_tree_untouched() {
        let (mut graph, mut materials, asset) = setup();
        let body = graph.spawn_model("body", model_part(&mut materials));
        graph.add_model(asset, "body", body, true);

        graph.remove_model(asset, "body");

        assert_eq!(graph.model(asset, "body"), None);
        // Still owned by the asset
        assert_eq!(graph.parent(body), Some(asset));
    }

    #[test]
    fn test_models_returns_point_in_time_copy() {
        let (mut graph, mut materials, asset) = setup();
        let body = graph.spawn_model("body", model_part(&mut materials));
        graph.add_model(asset, "body", body, false);

        let snapshot = graph.models(asset);
        graph.remove_model(asset, "body");

        assert_eq!(snapshot.get("body"), Some(&body));
        assert!(graph.models(asset).is_empty());
    }

    #[test]
    fn test_playback_state_machine() {
        let mut playback = Playback::new();
        assert!(!playback.is_playing());
        assert_eq!(playback.clip_index(), None);

        // Not playing: time does not accumulate
        playback.advance(1.0);
        assert_eq!(playback.elapsed(), 0.0);

        playback.start(2);
        playback.advance(0.25);
        playback.advance(0.25);
        assert!(playback.is_playing());
        assert_eq!(playback.clip_index(), Some(2));
        assert!((playback.elapsed() - 0.5).abs() < f32::EPSILON);

        // Stopped: time freezes, clip selection survives
        playback.stop();
        playback.advance(1.0);
        assert!((playback.elapsed() - 0.5).abs() < f32::EPSILON);
        assert_eq!(playback.clip_index(), Some(2));

        // Restarting rewinds
        playback.start(2);
        assert_eq!(playback.elapsed(), 0.0);
    }
}

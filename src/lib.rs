//! Scene-graph and asset kernel for real-time 3D rendering
//!
//! This crate provides:
//! - An ownership tree of renderable/updatable nodes with per-frame
//!   update and draw traversal
//! - Lazily cached transforms (position/rotation/scale composed into
//!   matrices on demand)
//! - An identity-preserving clone engine for whole asset subtrees
//! - Skeletal animation injection with material deduplication at draw
//!   time, rendered through wgpu

pub mod animation;
pub mod assets;
pub mod core;
pub mod input;
pub mod render;
pub mod scene;

// Re-exports for convenience
pub use glam;
pub use hecs;
pub use wgpu;
pub use winit;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::animation::{AnimationClip, Bone, BoneTrack, Interpolation, Keyframe, Skeleton};
    pub use crate::assets::Handle;
    pub use crate::core::{
        Engine, EngineConfig, EngineContext, EngineError, Game, ObserverHub, SharedObserver, Time,
        WindowObserver,
    };
    pub use crate::input::Input;
    pub use crate::render::{
        Camera, DrawCommand, Material, MaterialId, Materials, Mesh, RenderError, RenderQueue,
        Renderer, ShaderId, ShaderKey, ShaderLibrary, ShaderStage, Vertex,
    };
    pub use crate::scene::{
        AssetRoot, Children, Model, Name, NodePath, Parent, Playback, SceneError, SceneGraph,
        SceneSnapshot, TransformCache,
    };
    pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
    pub use winit::keyboard::KeyCode;
}

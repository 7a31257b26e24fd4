//! Scene graph module
//!
//! The ownership tree of renderable and updatable nodes: hierarchy
//! components, lazily cached transforms, per-frame update/draw dispatch,
//! the identity-preserving clone engine, asset reference tables, and
//! serializable snapshots.

mod asset;
mod clone;
mod dispatch;
mod graph;
mod hierarchy;
mod path;
mod snapshot;
mod transform;

pub use asset::{AssetRoot, Playback};
pub use dispatch::Model;
pub use graph::{SceneError, SceneGraph};
pub use hierarchy::{Children, Name, Parent};
pub use path::{NodePath, path_to, resolve};
pub use snapshot::{SceneSnapshot, SnapshotError, SnapshotNode};
pub use transform::{RebuildCounters, TransformCache};

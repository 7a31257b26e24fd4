//! Per-frame draw command queue
//!
//! The scene traversal records draw commands into a [`RenderQueue`]; the
//! renderer consumes them after the whole tree has been visited. Commands
//! carry only opaque identities (mesh handle id, material id) plus the
//! matrices computed during traversal.

use glam::Mat4;

use crate::assets::Handle;
use crate::render::material::MaterialId;
use crate::render::mesh::Mesh;

/// A single recorded draw
#[derive(Debug, Clone)]
pub struct DrawCommand {
    /// Mesh to draw; the handle id keys the renderer's GPU buffer cache
    pub mesh: Handle<Mesh>,
    /// Material to bind
    pub material: MaterialId,
    /// Hierarchy-composed world matrix of the emitting node
    pub model: Mat4,
    /// Precomposed model-view-projection matrix
    pub mvp: Mat4,
    /// Whether the material's skinning flag was set when this command was
    /// recorded; execution happens after the flag has been cleared again
    pub skinned: bool,
}

/// Ordered list of draw commands for one frame
#[derive(Debug, Default)]
pub struct RenderQueue {
    commands: Vec<DrawCommand>,
}

impl RenderQueue {
    /// Create an empty queue
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a draw command
    #[inline]
    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    /// Drop all recorded commands; call once per frame before traversal
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Sort commands by material to minimize state changes at submit time.
    ///
    /// Stable, so commands sharing a material keep traversal order.
    pub fn sort_for_batching(&mut self) {
        self.commands.sort_by_key(|c| c.material);
    }

    /// Iterate over recorded commands in order
    pub fn iter(&self) -> impl Iterator<Item = &DrawCommand> {
        self.commands.iter()
    }

    /// Number of recorded commands
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check whether the queue is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

//! Cached transform component
//!
//! Composes position, rotation (quaternion, so rotations stack without
//! gimbal lock), and scale into a matrix only on demand. Each component
//! keeps its own cached matrix and dirty flag, so moving a node does not
//! pay for rebuilding its rotation or scale matrices.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// How many times each cached matrix has been rebuilt.
///
/// Exposed so callers (and tests) can verify that reads hit the cache:
/// after a single mutation, exactly one composition happens no matter how
/// many times the matrix is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildCounters {
    /// Translation matrix rebuilds
    pub translation: u32,
    /// Rotation matrix rebuilds
    pub rotation: u32,
    /// Scale matrix rebuilds
    pub scale: u32,
    /// Composed matrix rebuilds
    pub composed: u32,
}

/// Cached matrices plus their dirty flags.
///
/// Not serialized; a fresh cache starts fully dirty so deserialized
/// transforms rebuild on first read.
#[derive(Debug, Clone)]
struct MatrixCache {
    translation: Mat4,
    rotation: Mat4,
    scale: Mat4,
    composed: Mat4,
    translation_dirty: bool,
    rotation_dirty: bool,
    scale_dirty: bool,
    composed_dirty: bool,
    rebuilds: RebuildCounters,
}

impl Default for MatrixCache {
    fn default() -> Self {
        Self {
            translation: Mat4::IDENTITY,
            rotation: Mat4::IDENTITY,
            scale: Mat4::IDENTITY,
            composed: Mat4::IDENTITY,
            translation_dirty: true,
            rotation_dirty: true,
            scale_dirty: true,
            composed_dirty: true,
            rebuilds: RebuildCounters::default(),
        }
    }
}

/// A transform with lazily cached component and world matrices.
///
/// Setters only mark the touched component (and the composition) dirty;
/// the composed matrix is rebuilt on the next read and then reused until
/// the next mutation. Two consecutive reads with no mutation in between
/// return bit-identical matrices without recomputation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformCache {
    /// Position relative to the parent node
    position: Vec3,
    /// Rotation as a unit quaternion
    rotation: Quat,
    /// Per-axis scale
    scale: Vec3,

    #[serde(skip)]
    cache: MatrixCache,
}

impl TransformCache {
    /// Create a transform at the origin
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from position
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Create from position, rotation, and scale
    #[must_use]
    pub fn from_parts(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
            cache: MatrixCache::default(),
        }
    }

    // -------------------------------------------------------------------------
    // Getters (don't touch the cache)
    // -------------------------------------------------------------------------

    /// Get the position
    #[must_use]
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Get the rotation
    #[must_use]
    #[inline]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Get the scale
    #[must_use]
    #[inline]
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    // -------------------------------------------------------------------------
    // Setters (invalidate only what changed)
    // -------------------------------------------------------------------------

    /// Set the position, invalidating the translation and composed matrices
    #[inline]
    pub fn set_position(&mut self, position: Vec3) {
        if self.position != position {
            self.position = position;
            self.cache.translation_dirty = true;
            self.cache.composed_dirty = true;
        }
    }

    /// Set the rotation, invalidating the rotation and composed matrices
    #[inline]
    pub fn set_rotation(&mut self, rotation: Quat) {
        if self.rotation != rotation {
            self.rotation = rotation;
            self.cache.rotation_dirty = true;
            self.cache.composed_dirty = true;
        }
    }

    /// Set the scale, invalidating the scale and composed matrices
    #[inline]
    pub fn set_scale(&mut self, scale: Vec3) {
        if self.scale != scale {
            self.scale = scale;
            self.cache.scale_dirty = true;
            self.cache.composed_dirty = true;
        }
    }

    /// Translate by a delta
    #[inline]
    pub fn translate(&mut self, delta: Vec3) {
        self.set_position(self.position + delta);
    }

    /// Apply a rotation on top of the current one
    #[inline]
    pub fn rotate(&mut self, rotation: Quat) {
        self.set_rotation(rotation * self.rotation);
    }

    // -------------------------------------------------------------------------
    // Cached matrices
    // -------------------------------------------------------------------------

    /// The composed matrix `translation * rotation * scale`, rebuilt only
    /// when a component changed since the last read.
    #[must_use]
    pub fn world_matrix(&mut self) -> Mat4 {
        if self.cache.composed_dirty {
            if self.cache.translation_dirty {
                self.cache.translation = Mat4::from_translation(self.position);
                self.cache.translation_dirty = false;
                self.cache.rebuilds.translation += 1;
            }
            if self.cache.rotation_dirty {
                self.cache.rotation = Mat4::from_quat(self.rotation);
                self.cache.rotation_dirty = false;
                self.cache.rebuilds.rotation += 1;
            }
            if self.cache.scale_dirty {
                self.cache.scale = Mat4::from_scale(self.scale);
                self.cache.scale_dirty = false;
                self.cache.rebuilds.scale += 1;
            }

            self.cache.composed = self.cache.translation * self.cache.rotation * self.cache.scale;
            self.cache.composed_dirty = false;
            self.cache.rebuilds.composed += 1;
        }
        self.cache.composed
    }

    /// Check if the composed matrix needs recomputation
    #[must_use]
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.cache.composed_dirty
    }

    /// Force a full rebuild on the next read (e.g. after reparenting)
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.cache.translation_dirty = true;
        self.cache.rotation_dirty = true;
        self.cache.scale_dirty = true;
        self.cache.composed_dirty = true;
    }

    /// Rebuild statistics for cache-coherence checks
    #[must_use]
    #[inline]
    pub fn rebuilds(&self) -> RebuildCounters {
        self.cache.rebuilds
    }
}

impl Default for TransformCache {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            cache: MatrixCache::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_identity() {
        let mut tf = TransformCache::new();
        assert!(tf.is_dirty());
        assert_eq!(tf.world_matrix(), Mat4::IDENTITY);
        assert!(!tf.is_dirty());
    }

    #[test]
    fn test_exactly_one_recompute_per_mutation() {
        let mut tf = TransformCache::new();
        let _ = tf.world_matrix();
        let baseline = tf.rebuilds().composed;

        tf.set_position(Vec3::new(1.0, 2.0, 3.0));
        assert!(tf.is_dirty());

        let first = tf.world_matrix();
        let second = tf.world_matrix();

        // One mutation, one recomposition, bit-identical reads
        assert_eq!(tf.rebuilds().composed, baseline + 1);
        assert_eq!(first.to_cols_array(), second.to_cols_array());
        assert_eq!(first.w_axis.truncate(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_position_change_leaves_other_components_cached() {
        let mut tf = TransformCache::new();
        let _ = tf.world_matrix();
        let before = tf.rebuilds();

        tf.set_position(Vec3::X);
        let _ = tf.world_matrix();
        let after = tf.rebuilds();

        assert_eq!(after.translation, before.translation + 1);
        assert_eq!(after.rotation, before.rotation);
        assert_eq!(after.scale, before.scale);
    }

    #[test]
    fn test_double_set_converges_to_last_value() {
        let mut tf = TransformCache::new();

        tf.set_position(Vec3::new(1.0, 0.0, 0.0));
        tf.set_position(Vec3::new(2.0, 0.0, 0.0));

        let matrix = tf.world_matrix();
        assert_eq!(matrix.w_axis.truncate(), Vec3::new(2.0, 0.0, 0.0));
        // Both writes cost a single rebuild
        assert_eq!(tf.rebuilds().composed, 1);
        assert_eq!(tf.rebuilds().translation, 1);
    }

    #[test]
    fn test_setting_same_value_does_not_invalidate() {
        let mut tf = TransformCache::from_position(Vec3::ONE);
        let _ = tf.world_matrix();

        tf.set_position(Vec3::ONE);
        assert!(!tf.is_dirty());
    }

    #[test]
    fn test_composition_order_translation_last() {
        let mut tf = TransformCache::new();
        tf.set_position(Vec3::new(5.0, 0.0, 0.0));
        tf.set_scale(Vec3::splat(2.0));

        // Scale must not affect the translation column
        let matrix = tf.world_matrix();
        assert_eq!(matrix.w_axis.truncate(), Vec3::new(5.0, 0.0, 0.0));

        let p = matrix.transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(p, Vec3::new(7.0, 0.0, 0.0));
    }

    #[test]
    fn test_rotation_composes_without_gimbal_lock() {
        let mut tf = TransformCache::new();
        tf.set_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));

        let p = tf.world_matrix().transform_point3(Vec3::X);
        assert!((p - Vec3::NEG_Z).length() < 1e-5);

        tf.rotate(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        let p = tf.world_matrix().transform_point3(Vec3::X);
        assert!((p - Vec3::NEG_X).length() < 1e-5);
    }

    #[test]
    fn test_mark_dirty_forces_rebuild() {
        let mut tf = TransformCache::new();
        let _ = tf.world_matrix();

        tf.mark_dirty();
        assert!(tf.is_dirty());
        let _ = tf.world_matrix();
        assert_eq!(tf.rebuilds().composed, 2);
    }

    #[test]
    fn test_clone_carries_cache_state() {
        let mut tf = TransformCache::from_position(Vec3::X);
        let warm = tf.world_matrix();

        let mut copy = tf.clone();
        assert!(!copy.is_dirty());
        assert_eq!(copy.world_matrix(), warm);
        assert_eq!(copy.rebuilds(), tf.rebuilds());
    }
}

//! Material system for meshes
//!
//! Materials are mutable per-frame state (bone-matrix uploads, batching
//! flags), so they live in a [`Materials`] arena and nodes reference them
//! by [`MaterialId`]. Several parts of one asset typically share a single
//! material entry.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use rustc_hash::FxHashMap;

use super::shader::ShaderId;

/// Largest bone palette a single material can carry
pub const MAX_BONES: usize = 128;

/// Material properties in GPU layout
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MaterialUniform {
    /// Base color (RGB)
    pub color: [f32; 3],
    /// Specular strength
    pub specular: f32,
    /// Shininess factor
    pub shininess: f32,
    /// Whether vertices are skinned by the bone palette (1.0) or not (0.0)
    pub use_bone_transform: f32,
    /// Padding for alignment
    _padding: [f32; 2],
}

/// Key into the material arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MaterialId(u64);

impl std::fmt::Display for MaterialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "material#{}", self.0)
    }
}

/// Surface definition bound to one shader program
#[derive(Debug, Clone)]
pub struct Material {
    /// Compiled program this material renders with; the identity used
    /// when grouping materials for batched uniform uploads
    pub program: ShaderId,
    /// Base color
    pub color: Vec3,
    /// Specular reflectivity (0.0 - 1.0)
    pub specular: f32,
    /// Shininess exponent
    pub shininess: f32,
    /// Bone palette uploaded before skinned draws
    bone_matrices: Vec<Mat4>,
    /// Whether the next draws through this material are skinned
    use_bone_transform: bool,
}

impl Material {
    /// Create a new material with a color
    pub fn new(program: ShaderId, color: Vec3) -> Self {
        Self {
            program,
            color,
            specular: 0.5,
            shininess: 32.0,
            bone_matrices: Vec::new(),
            use_bone_transform: false,
        }
    }

    /// Create a diffuse material (no specular)
    pub fn diffuse(program: ShaderId, color: Vec3) -> Self {
        Self {
            specular: 0.0,
            shininess: 1.0,
            ..Self::new(program, color)
        }
    }

    /// Create a shiny material
    pub fn shiny(program: ShaderId, color: Vec3) -> Self {
        Self {
            specular: 1.0,
            shininess: 64.0,
            ..Self::new(program, color)
        }
    }

    /// Replace the bone palette.
    ///
    /// Palettes longer than [`MAX_BONES`] are truncated with a warning.
    pub fn set_bone_matrices(&mut self, matrices: &[Mat4]) {
        if matrices.len() > MAX_BONES {
            log::warn!(
                "Bone palette of {} matrices truncated to {MAX_BONES}",
                matrices.len()
            );
        }
        self.bone_matrices.clear();
        self.bone_matrices
            .extend_from_slice(&matrices[..matrices.len().min(MAX_BONES)]);
    }

    /// Current bone palette
    #[must_use]
    pub fn bone_matrices(&self) -> &[Mat4] {
        &self.bone_matrices
    }

    /// Mark draws through this material as skinned or static
    pub fn set_use_bone_transform(&mut self, enabled: bool) {
        self.use_bone_transform = enabled;
    }

    /// Whether draws through this material are currently skinned
    #[must_use]
    pub fn use_bone_transform(&self) -> bool {
        self.use_bone_transform
    }

    /// Convert to GPU uniform data
    #[must_use]
    pub fn to_uniform(&self) -> MaterialUniform {
        MaterialUniform {
            color: self.color.into(),
            specular: self.specular,
            shininess: self.shininess,
            use_bone_transform: if self.use_bone_transform { 1.0 } else { 0.0 },
            _padding: [0.0; 2],
        }
    }
}

/// Arena of materials addressed by [`MaterialId`]
#[derive(Debug, Default)]
pub struct Materials {
    entries: FxHashMap<u64, Material>,
    next_id: u64,
}

impl Materials {
    /// Create an empty arena
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a material and return its id
    pub fn insert(&mut self, material: Material) -> MaterialId {
        self.next_id += 1;
        let id = MaterialId(self.next_id);
        self.entries.insert(id.0, material);
        id
    }

    /// Get a material by id
    #[must_use]
    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.entries.get(&id.0)
    }

    /// Get a material mutably by id
    pub fn get_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.entries.get_mut(&id.0)
    }

    /// Remove a material, returning it if present
    pub fn remove(&mut self, id: MaterialId) -> Option<Material> {
        self.entries.remove(&id.0)
    }

    /// Number of materials in the arena
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the arena is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_arena() {
        let mut materials = Materials::new();
        let program = ShaderId::next();

        let id = materials.insert(Material::new(program, Vec3::ONE));
        assert_eq!(materials.len(), 1);
        assert_eq!(materials.get(id).unwrap().program, program);

        materials.remove(id);
        assert!(materials.get(id).is_none());
    }

    #[test]
    fn test_bone_flag_roundtrip() {
        let mut material = Material::new(ShaderId::next(), Vec3::ONE);
        assert!(!material.use_bone_transform());
        assert_eq!(material.to_uniform().use_bone_transform, 0.0);

        material.set_use_bone_transform(true);
        assert!(material.use_bone_transform());
        assert_eq!(material.to_uniform().use_bone_transform, 1.0);
    }

    #[test]
    fn test_bone_palette_truncation() {
        let mut material = Material::new(ShaderId::next(), Vec3::ONE);
        let palette = vec![Mat4::IDENTITY; MAX_BONES + 16];

        material.set_bone_matrices(&palette);
        assert_eq!(material.bone_matrices().len(), MAX_BONES);
    }

    #[test]
    fn test_shared_program_distinct_materials() {
        let program = ShaderId::next();
        let a = Material::diffuse(program, Vec3::X);
        let b = Material::shiny(program, Vec3::Y);

        // Two materials can share one compiled program
        assert_eq!(a.program, b.program);
        assert!(a.specular < b.specular);
    }
}

//! Skeleton and bone pose queries
//!
//! A [`Skeleton`] owns its bone hierarchy and animation clips and answers
//! three pure queries consumed at draw time: clip lookup, posed bone
//! matrices for a clip at a point in time, and the bind-pose matrices
//! used when nothing is playing. Skeletons are built once, then shared
//! immutably through [`crate::assets::Handle`].

use std::sync::OnceLock;

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::clip::AnimationClip;

/// A single bone in a skeleton
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bone {
    /// Bone name
    pub name: String,
    /// Parent bone index (None for root)
    pub parent: Option<usize>,
    /// Children bone indices
    pub children: Vec<usize>,
    /// Local rest translation
    pub translation: Vec3,
    /// Local rest rotation
    pub rotation: Quat,
    /// Local rest scale
    pub scale: Vec3,
    /// Inverse bind matrix (for skinning)
    pub inverse_bind_matrix: Mat4,
}

impl Bone {
    /// Create a new bone at the rest pose origin
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            inverse_bind_matrix: Mat4::IDENTITY,
        }
    }

    /// Local rest-pose matrix
    #[must_use]
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// A bone hierarchy with its animation clips.
///
/// Build the hierarchy and add clips before the first pose query; the
/// bind pose is cached on first use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Skeleton {
    /// All bones in the skeleton
    bones: Vec<Bone>,
    /// Root bone indices
    roots: Vec<usize>,
    /// Animation clips targeting this skeleton's bones
    clips: Vec<AnimationClip>,
    /// Cached bind-pose skinning matrices
    #[serde(skip)]
    bind_pose: OnceLock<Vec<Mat4>>,
}

impl Skeleton {
    /// Create a new empty skeleton
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bone and return its index
    pub fn add_bone(&mut self, bone: Bone) -> usize {
        let index = self.bones.len();
        if bone.parent.is_none() {
            self.roots.push(index);
        }
        self.bones.push(bone);
        index
    }

    /// Set a parent-child relationship between two bones.
    ///
    /// Out-of-range indices, self-parenting, and relations that would
    /// form a cycle are ignored.
    pub fn set_parent(&mut self, child: usize, parent: usize) {
        if child == parent || child >= self.bones.len() || parent >= self.bones.len() {
            return;
        }

        // Walk up from the parent to reject cycles
        let mut current = parent;
        while let Some(p) = self.bones[current].parent {
            if p == child {
                return;
            }
            current = p;
        }

        if let Some(old_parent) = self.bones[child].parent {
            if old_parent == parent {
                return;
            }
            self.bones[old_parent].children.retain(|&c| c != child);
        } else {
            self.roots.retain(|&r| r != child);
        }

        self.bones[child].parent = Some(parent);
        if !self.bones[parent].children.contains(&child) {
            self.bones[parent].children.push(child);
        }
    }

    /// Number of bones
    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// Get a bone by index
    #[must_use]
    pub fn bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    /// Find a bone index by name
    #[must_use]
    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    /// Add an animation clip and return its index
    pub fn add_clip(&mut self, clip: AnimationClip) -> usize {
        self.clips.push(clip);
        self.clips.len() - 1
    }

    /// Look up an animation clip by index
    #[must_use]
    pub fn animation(&self, index: usize) -> Option<&AnimationClip> {
        self.clips.get(index)
    }

    /// Number of animation clips
    #[must_use]
    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    /// Compute world matrices for the given per-bone local matrices,
    /// walking the hierarchy so storage order does not matter.
    fn world_matrices(&self, local: impl Fn(usize) -> Mat4) -> Vec<Mat4> {
        let mut world = vec![Mat4::IDENTITY; self.bones.len()];
        let mut stack: Vec<(usize, Mat4)> = self
            .roots
            .iter()
            .map(|&root| (root, Mat4::IDENTITY))
            .collect();

        while let Some((index, parent_world)) = stack.pop() {
            let matrix = parent_world * local(index);
            world[index] = matrix;

            for &child in &self.bones[index].children {
                stack.push((child, matrix));
            }
        }

        world
    }

    /// Skinning matrices for the rest pose, computed once and cached
    #[must_use]
    pub fn bind_pose_matrices(&self) -> &[Mat4] {
        self.bind_pose.get_or_init(|| {
            self.world_matrices(|i| self.bones[i].local_matrix())
                .iter()
                .zip(&self.bones)
                .map(|(world, bone)| *world * bone.inverse_bind_matrix)
                .collect()
        })
    }

    /// Skinning matrices for a clip sampled at `time` seconds.
    ///
    /// Channels a clip does not animate fall back to the bone's rest
    /// value. An out-of-range clip index is reported as a warning and
    /// yields the bind pose.
    #[must_use]
    pub fn bone_matrices(&self, clip_index: usize, time: f32) -> Vec<Mat4> {
        let Some(clip) = self.clips.get(clip_index) else {
            log::warn!(
                "Clip index {clip_index} out of range ({} clips); using bind pose",
                self.clips.len()
            );
            return self.bind_pose_matrices().to_vec();
        };

        let locals: Vec<Mat4> = self
            .bones
            .iter()
            .enumerate()
            .map(|(i, bone)| {
                let track = clip.track_for(i);
                let translation = track
                    .and_then(|t| t.sample_translation(time, clip.interpolation))
                    .unwrap_or(bone.translation);
                let rotation = track
                    .and_then(|t| t.sample_rotation(time, clip.interpolation))
                    .unwrap_or(bone.rotation);
                let scale = track
                    .and_then(|t| t.sample_scale(time, clip.interpolation))
                    .unwrap_or(bone.scale);
                Mat4::from_scale_rotation_translation(scale, rotation, translation)
            })
            .collect();

        self.world_matrices(|i| locals[i])
            .iter()
            .zip(&self.bones)
            .map(|(world, bone)| *world * bone.inverse_bind_matrix)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::clip::{BoneTrack, Keyframe};

    fn two_bone_skeleton() -> Skeleton {
        let mut skeleton = Skeleton::new();

        let mut root = Bone::new("root");
        root.translation = Vec3::new(1.0, 0.0, 0.0);
        skeleton.add_bone(root);

        let mut child = Bone::new("child");
        child.translation = Vec3::new(2.0, 0.0, 0.0);
        let child_idx = skeleton.add_bone(child);
        skeleton.set_parent(child_idx, 0);

        skeleton
    }

    #[test]
    fn test_hierarchy_construction() {
        let skeleton = two_bone_skeleton();

        assert_eq!(skeleton.bone_count(), 2);
        assert_eq!(skeleton.bone(1).unwrap().parent, Some(0));
        assert!(skeleton.bone(0).unwrap().children.contains(&1));
        assert_eq!(skeleton.find_bone("child"), Some(1));
        assert_eq!(skeleton.find_bone("missing"), None);
    }

    #[test]
    fn test_set_parent_rejects_cycle() {
        let mut skeleton = two_bone_skeleton();

        // 0 is already an ancestor of 1
        skeleton.set_parent(0, 1);
        assert_eq!(skeleton.bone(0).unwrap().parent, None);
    }

    #[test]
    fn test_bind_pose_composes_hierarchy() {
        let skeleton = two_bone_skeleton();

        // Identity inverse binds, so the bind pose equals the world pose
        let bind = skeleton.bind_pose_matrices();
        assert_eq!(bind.len(), 2);

        let child_pos = bind[1].w_axis.truncate();
        assert!((child_pos.x - 3.0).abs() < 0.001);
    }

    #[test]
    fn test_bind_pose_is_cached() {
        let skeleton = two_bone_skeleton();

        let first = skeleton.bind_pose_matrices().as_ptr();
        let second = skeleton.bind_pose_matrices().as_ptr();
        assert_eq!(first, second);
    }

    #[test]
    fn test_bone_matrices_sample_clip() {
        let mut skeleton = two_bone_skeleton();

        let mut track = BoneTrack::new(0);
        track.translations = vec![
            Keyframe::new(0.0, Vec3::ZERO),
            Keyframe::new(1.0, Vec3::new(10.0, 0.0, 0.0)),
        ];
        let mut clip = AnimationClip::new("slide");
        clip.add_track(track);
        let clip_idx = skeleton.add_clip(clip);

        let posed = skeleton.bone_matrices(clip_idx, 0.5);

        // Root slides to x=5; the child keeps its rest offset below it
        assert!((posed[0].w_axis.x - 5.0).abs() < 0.01);
        assert!((posed[1].w_axis.x - 7.0).abs() < 0.01);
    }

    #[test]
    fn test_invalid_clip_falls_back_to_bind_pose() {
        let skeleton = two_bone_skeleton();

        let posed = skeleton.bone_matrices(3, 0.5);
        assert_eq!(posed, skeleton.bind_pose_matrices().to_vec());
    }

    #[test]
    fn test_unanimated_bone_keeps_rest_pose() {
        let mut skeleton = two_bone_skeleton();

        let mut clip = AnimationClip::new("root-only");
        let mut track = BoneTrack::new(0);
        track.translations = vec![Keyframe::new(0.0, Vec3::new(4.0, 0.0, 0.0))];
        clip.add_track(track);
        let clip_idx = skeleton.add_clip(clip);

        let posed = skeleton.bone_matrices(clip_idx, 0.0);
        // Child rest offset (2.0) applies below the animated root (4.0)
        assert!((posed[1].w_axis.x - 6.0).abs() < 0.001);
    }
}

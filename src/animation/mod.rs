//! Skeletal animation data
//!
//! Clips, keyframe tracks, and the skeleton pose queries consumed by the
//! draw dispatcher. Playback state lives on the asset node that owns the
//! skeleton, not here.

mod clip;
mod skeleton;

pub use clip::{AnimationClip, BoneTrack, Interpolation, Keyframe};
pub use skeleton::{Bone, Skeleton};

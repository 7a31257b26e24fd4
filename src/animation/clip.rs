//! Animation clips and keyframe tracks

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Interpolation method for keyframes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Interpolation {
    /// Linear interpolation (slerp for rotations)
    #[default]
    Linear,
    /// Step/discrete (no interpolation)
    Step,
}

/// A single keyframe with timestamp and value
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Keyframe<T> {
    /// Time in seconds
    pub time: f32,
    /// Value at this keyframe
    pub value: T,
}

impl<T> Keyframe<T> {
    /// Create a new keyframe
    pub const fn new(time: f32, value: T) -> Self {
        Self { time, value }
    }
}

/// Keyframe curves animating one bone's local transform.
///
/// Any of the three channels may be empty; the sampler falls back to the
/// bone's rest value for missing channels.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoneTrack {
    /// Index of the animated bone in its skeleton
    pub bone: usize,
    /// Translation keyframes
    pub translations: Vec<Keyframe<Vec3>>,
    /// Rotation keyframes
    pub rotations: Vec<Keyframe<Quat>>,
    /// Scale keyframes
    pub scales: Vec<Keyframe<Vec3>>,
}

impl BoneTrack {
    /// Create an empty track for a bone
    #[must_use]
    pub fn new(bone: usize) -> Self {
        Self {
            bone,
            ..Self::default()
        }
    }

    /// Time of the last keyframe across all channels
    #[must_use]
    pub fn duration(&self) -> f32 {
        let end = |t: Option<f32>| t.unwrap_or(0.0);
        end(self.translations.last().map(|k| k.time))
            .max(end(self.rotations.last().map(|k| k.time)))
            .max(end(self.scales.last().map(|k| k.time)))
    }

    /// Sample the translation channel, if it has any keys
    #[must_use]
    pub fn sample_translation(&self, time: f32, interp: Interpolation) -> Option<Vec3> {
        sample(&self.translations, time, |a, b, t| match interp {
            Interpolation::Step => a,
            Interpolation::Linear => a.lerp(b, t),
        })
    }

    /// Sample the rotation channel, if it has any keys
    #[must_use]
    pub fn sample_rotation(&self, time: f32, interp: Interpolation) -> Option<Quat> {
        sample(&self.rotations, time, |a, b, t| match interp {
            Interpolation::Step => a,
            Interpolation::Linear => a.slerp(b, t),
        })
    }

    /// Sample the scale channel, if it has any keys
    #[must_use]
    pub fn sample_scale(&self, time: f32, interp: Interpolation) -> Option<Vec3> {
        sample(&self.scales, time, |a, b, t| match interp {
            Interpolation::Step => a,
            Interpolation::Linear => a.lerp(b, t),
        })
    }
}

/// Sample a keyframe curve at `time`, clamping outside the key range.
///
/// Keys must be sorted by time; the surrounding pair is found by binary
/// search and blended with `mix(a, b, t)`.
fn sample<T: Copy>(keys: &[Keyframe<T>], time: f32, mix: impl Fn(T, T, f32) -> T) -> Option<T> {
    let (first, last) = (keys.first()?, keys.last()?);
    if time <= first.time {
        return Some(first.value);
    }
    if time >= last.time {
        return Some(last.value);
    }

    // Index of the first key strictly after `time`; the checks above
    // guarantee 1 <= upper < keys.len()
    let upper = keys.partition_point(|k| k.time <= time);
    let k0 = &keys[upper - 1];
    let k1 = &keys[upper];
    let span = k1.time - k0.time;
    let t = if span > 0.0 { (time - k0.time) / span } else { 0.0 };

    Some(mix(k0.value, k1.value, t))
}

/// A named animation clip made of per-bone tracks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationClip {
    /// Clip name
    pub name: String,
    /// Duration in seconds, the maximum over all tracks
    pub duration: f32,
    /// Interpolation method
    pub interpolation: Interpolation,
    /// Per-bone keyframe tracks
    tracks: Vec<BoneTrack>,
}

impl AnimationClip {
    /// Create a new empty animation clip
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            duration: 0.0,
            interpolation: Interpolation::Linear,
            tracks: Vec::new(),
        }
    }

    /// Add a track to the clip, extending the duration if needed
    pub fn add_track(&mut self, track: BoneTrack) {
        self.duration = self.duration.max(track.duration());
        self.tracks.push(track);
    }

    /// All tracks in the clip
    #[must_use]
    pub fn tracks(&self) -> &[BoneTrack] {
        &self.tracks
    }

    /// Find the track animating a specific bone
    #[must_use]
    pub fn track_for(&self, bone: usize) -> Option<&BoneTrack> {
        self.tracks.iter().find(|t| t.bone == bone)
    }

    /// Check whether the clip animates anything
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl Default for AnimationClip {
    fn default() -> Self {
        Self::new("untitled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> BoneTrack {
        let mut track = BoneTrack::new(0);
        track.translations = vec![
            Keyframe::new(0.0, Vec3::ZERO),
            Keyframe::new(1.0, Vec3::new(10.0, 0.0, 0.0)),
        ];
        track
    }

    #[test]
    fn test_linear_sampling() {
        let track = track();

        let mid = track
            .sample_translation(0.5, Interpolation::Linear)
            .unwrap();
        assert!((mid.x - 5.0).abs() < 0.01);
    }

    #[test]
    fn test_sampling_clamps_outside_range() {
        let track = track();

        let before = track
            .sample_translation(-1.0, Interpolation::Linear)
            .unwrap();
        let after = track
            .sample_translation(2.0, Interpolation::Linear)
            .unwrap();
        assert_eq!(before, Vec3::ZERO);
        assert_eq!(after, Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn test_step_sampling_holds_previous_key() {
        let track = track();

        let held = track.sample_translation(0.9, Interpolation::Step).unwrap();
        assert_eq!(held, Vec3::ZERO);
    }

    #[test]
    fn test_empty_channel_samples_none() {
        let track = track();
        assert!(track.sample_rotation(0.5, Interpolation::Linear).is_none());
        assert!(track.sample_scale(0.5, Interpolation::Linear).is_none());
    }

    #[test]
    fn test_clip_duration_tracks_longest() {
        let mut clip = AnimationClip::new("walk");
        clip.add_track(track());

        let mut longer = BoneTrack::new(1);
        longer.rotations = vec![
            Keyframe::new(0.0, Quat::IDENTITY),
            Keyframe::new(2.5, Quat::from_rotation_y(1.0)),
        ];
        clip.add_track(longer);

        assert_eq!(clip.duration, 2.5);
        assert!(clip.track_for(1).is_some());
        assert!(clip.track_for(7).is_none());
    }
}

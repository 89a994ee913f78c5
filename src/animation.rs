//! Keyframe clips and the playback session bound to the current asset.
//!
//! A clip is a set of channels, each driving one property (translation,
//! rotation or scale) of one node. The session owns the clips, keeps one
//! action time per clip and writes the sampled pose into the scene graph on
//! every [`AnimationSession::advance`].

use std::ops::{Add, Mul};

use glam::{Quat, Vec3};

use crate::scene_graph::object3d::ObjectId;
use crate::scene_graph::scene::SceneGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Step,
    Linear,
    /// Values are stored as `[in_tangent, value, out_tangent]` triplets.
    CubicSpline,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Keyframes {
    Translation(Vec<Vec3>),
    Rotation(Vec<Quat>),
    Scale(Vec<Vec3>),
}

impl Keyframes {
    pub fn len(&self) -> usize {
        match self {
            Keyframes::Translation(values) | Keyframes::Scale(values) => values.len(),
            Keyframes::Rotation(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub target: ObjectId,
    pub interpolation: Interpolation,
    pub timestamps: Vec<f32>,
    pub keyframes: Keyframes,
}

impl Channel {
    pub fn duration(&self) -> f32 {
        self.timestamps.last().copied().unwrap_or(0.0)
    }
}

/// A named animation with keyframes and timing.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub channels: Vec<Channel>,
    pub looping: bool,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, channels: Vec<Channel>) -> Self {
        Self {
            name: name.into(),
            channels,
            looping: true,
        }
    }

    pub fn duration(&self) -> f32 {
        self.channels
            .iter()
            .map(Channel::duration)
            .fold(0.0, f32::max)
    }
}

#[derive(Debug, Clone)]
struct ClipAction {
    clip: AnimationClip,
    time: f32,
    finished: bool,
}

impl ClipAction {
    fn advance(&mut self, delta: f32) {
        if self.finished {
            return;
        }

        let duration = self.clip.duration();
        self.time += delta;

        if duration <= 0.0 {
            self.time = 0.0;
            self.finished = !self.clip.looping;
        } else if self.clip.looping {
            self.time = self.time.rem_euclid(duration);
        } else if self.time >= duration {
            self.time = duration;
            self.finished = true;
        }
    }
}

pub struct AnimationSession {
    clock: f32,
    actions: Vec<ClipAction>,
    playing: bool,
}

impl AnimationSession {
    /// Starts every clip immediately. `None` when there is nothing to play.
    pub fn start(clips: Vec<AnimationClip>) -> Option<Self> {
        if clips.is_empty() {
            return None;
        }

        log::debug!("Starting animation session with {} clip(s)", clips.len());

        let actions = clips
            .into_iter()
            .map(|clip| ClipAction {
                clip,
                time: 0.0,
                finished: false,
            })
            .collect();

        Some(Self {
            clock: 0.0,
            actions,
            playing: true,
        })
    }

    pub fn clock(&self) -> f32 {
        self.clock
    }

    pub fn playing(&self) -> bool {
        self.playing
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing && self.actions.iter().any(|action| !action.finished);
    }

    pub fn clip_count(&self) -> usize {
        self.actions.len()
    }

    pub fn clips(&self) -> impl Iterator<Item = &AnimationClip> {
        self.actions.iter().map(|action| &action.clip)
    }

    /// Advances the clock and applies every clip's pose to `scene`.
    pub fn advance(&mut self, delta: f32, scene: &mut SceneGraph) {
        if !self.playing {
            return;
        }

        self.clock += delta;

        for action in &mut self.actions {
            action.advance(delta);
            apply_clip(&action.clip, action.time, scene);
        }

        if self.actions.iter().all(|action| action.finished) {
            self.playing = false;
        }
    }
}

fn apply_clip(clip: &AnimationClip, time: f32, scene: &mut SceneGraph) {
    for channel in &clip.channels {
        let Some(object) = scene.get_object_mut(channel.target) else {
            continue;
        };

        let times = &channel.timestamps;
        let interpolation = channel.interpolation;
        match &channel.keyframes {
            Keyframes::Translation(values) => {
                if let Some(value) = sample(times, values, interpolation, time) {
                    object.transform.set_translation(value);
                }
            }
            Keyframes::Rotation(values) => {
                if let Some(value) = sample_rotation(times, values, interpolation, time) {
                    object.transform.set_rotation(value);
                }
            }
            Keyframes::Scale(values) => {
                if let Some(value) = sample(times, values, interpolation, time) {
                    object.transform.set_scale(value);
                }
            }
        }
    }
}

/// Returns `(k0, k1, t, span)`: the sample lies between keyframes `k0` and
/// `k1` at fraction `t`, `span` seconds apart. Before the first or after the last key both indices
/// point at the clamped key.
fn locate(times: &[f32], time: f32) -> Option<(usize, usize, f32, f32)> {
    let last = times.len().checked_sub(1)?;
    let next = times.partition_point(|&key| key <= time);

    if next == 0 {
        return Some((0, 0, 0.0, 0.0));
    }
    if next > last {
        return Some((last, last, 0.0, 0.0));
    }

    let (k0, k1) = (next - 1, next);
    let span = times[k1] - times[k0];
    let t = if span > 0.0 {
        (time - times[k0]) / span
    } else {
        0.0
    };
    Some((k0, k1, t, span))
}

fn keyframe_value<T: Copy>(values: &[T], interpolation: Interpolation, key: usize) -> Option<T> {
    match interpolation {
        Interpolation::CubicSpline => values.get(key * 3 + 1).copied(),
        _ => values.get(key).copied(),
    }
}

fn hermite<T>(values: &[T], k0: usize, k1: usize, t: f32, span: f32) -> Option<T>
where
    T: Copy + Add<Output = T> + Mul<f32, Output = T>,
{
    let v0 = *values.get(k0 * 3 + 1)?;
    let b0 = *values.get(k0 * 3 + 2)?;
    let a1 = *values.get(k1 * 3)?;
    let v1 = *values.get(k1 * 3 + 1)?;

    let t2 = t * t;
    let t3 = t2 * t;
    Some(
        v0 * (2.0 * t3 - 3.0 * t2 + 1.0)
            + b0 * ((t3 - 2.0 * t2 + t) * span)
            + v1 * (-2.0 * t3 + 3.0 * t2)
            + a1 * ((t3 - t2) * span),
    )
}

fn sample(times: &[f32], values: &[Vec3], interpolation: Interpolation, time: f32) -> Option<Vec3> {
    let (k0, k1, t, span) = locate(times, time)?;
    if k0 == k1 {
        return keyframe_value(values, interpolation, k0);
    }

    match interpolation {
        Interpolation::Step => keyframe_value(values, interpolation, k0),
        Interpolation::Linear => Some(values.get(k0)?.lerp(*values.get(k1)?, t)),
        Interpolation::CubicSpline => hermite(values, k0, k1, t, span),
    }
}

fn sample_rotation(
    times: &[f32],
    values: &[Quat],
    interpolation: Interpolation,
    time: f32,
) -> Option<Quat> {
    let (k0, k1, t, span) = locate(times, time)?;
    if k0 == k1 {
        return keyframe_value(values, interpolation, k0).map(Quat::normalize);
    }

    match interpolation {
        Interpolation::Step => keyframe_value(values, interpolation, k0).map(Quat::normalize),
        Interpolation::Linear => Some(values.get(k0)?.slerp(*values.get(k1)?, t)),
        Interpolation::CubicSpline => hermite(values, k0, k1, t, span).map(Quat::normalize),
    }
}

//! Keyframe animation playback.
//!
//! An [`Animation`] owns one merged keyframe track per animated node. Every tick the
//! playing animations are sampled and their offsets written into the group nodes'
//! animation transform, positions and rotations adding up and scales multiplying.

use std::collections::HashMap;

use cgmath::{ElementWise, Vector3};
use instant::Duration;

use crate::{
    data_structures::{
        node::{AvatarNode, NodeId},
        transform::AnimationOffset,
    },
    resources::animation::{Channel, ChannelValue, Interpolation, MergedKeyframe},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LoopMode {
    /// Play to the end, then stop.
    #[default]
    Once,
    Loop,
    /// Play to the end and keep the last pose.
    Hold,
}

impl LoopMode {
    pub fn parse_or_default(value: &str) -> Self {
        match value {
            "once" => Self::Once,
            "loop" => Self::Loop,
            "hold" => Self::Hold,
            other => {
                log::warn!("Unknown loop mode {:?}, playing once", other);
                Self::Once
            }
        }
    }
}

/// Keyframes of one node within one animation, sorted by time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeTrack {
    pub node: NodeId,
    pub keyframes: Vec<MergedKeyframe>,
}

impl NodeTrack {
    pub fn sample(&self, channel: Channel, time: f32) -> Option<Vector3<f32>> {
        sample_channel(&self.keyframes, channel, time)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Animation {
    pub name: String,
    /// Length in seconds.
    pub length: f32,
    pub loop_mode: LoopMode,
    playing: bool,
    time: f32,
    tracks: Vec<NodeTrack>,
}

impl Animation {
    pub fn new(name: impl Into<String>, length: f32, loop_mode: LoopMode) -> Self {
        Self {
            name: name.into(),
            length: length.max(0.0),
            loop_mode,
            playing: false,
            time: 0.0,
            tracks: Vec::new(),
        }
    }

    /// Sets the track of `node`, replacing an earlier one.
    pub fn set_track(&mut self, node: NodeId, keyframes: Vec<MergedKeyframe>) {
        match self.tracks.iter_mut().find(|t| t.node == node) {
            Some(track) => track.keyframes = keyframes,
            None => self.tracks.push(NodeTrack { node, keyframes }),
        }
    }

    pub fn track(&self, node: NodeId) -> Option<&NodeTrack> {
        self.tracks.iter().find(|t| t.node == node)
    }

    pub fn tracks(&self) -> &[NodeTrack] {
        &self.tracks
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Starts playback. A stopped animation restarts from the beginning, a playing one
    /// keeps its position.
    pub fn play(&mut self) {
        if !self.playing {
            self.time = 0.0;
            self.playing = true;
        }
    }

    pub fn stop(&mut self) {
        self.playing = false;
        self.time = 0.0;
    }

    pub fn tick(&mut self, delta: Duration) {
        if !self.playing {
            return;
        }
        self.time += delta.as_secs_f32();
        if self.time <= self.length {
            return;
        }
        match self.loop_mode {
            LoopMode::Loop if self.length > 0.0 => self.time = self.time.rem_euclid(self.length),
            LoopMode::Loop => self.time = 0.0,
            LoopMode::Once => self.stop(),
            LoopMode::Hold => self.time = self.length,
        }
    }
}

/// Value of `channel` at `time`.
///
/// Before the first keyframe the first value holds, after the last one the last value
/// holds. In between, a `Step` keyframe holds its value until the next one, and a
/// segment touching a `CatmullRom` keyframe is smoothed through its neighbours.
pub fn sample_channel(
    keyframes: &[MergedKeyframe],
    channel: Channel,
    time: f32,
) -> Option<Vector3<f32>> {
    let keys: Vec<(f32, &ChannelValue)> = keyframes
        .iter()
        .filter_map(|k| k.channel(channel).map(|c| (k.time, c)))
        .collect();
    let (first, last) = (keys.first()?, keys.last()?);

    let next = keys.partition_point(|(t, _)| *t <= time);
    if next == 0 {
        return Some(first.1.value);
    }
    if next == keys.len() {
        return Some(last.1.value);
    }

    let (t0, before) = keys[next - 1];
    let (t1, after) = keys[next];
    let span = t1 - t0;
    let t = if span > 0.0 { (time - t0) / span } else { 1.0 };

    if before.interpolation == Interpolation::Step {
        return Some(before.value);
    }
    if before.interpolation == Interpolation::CatmullRom
        || after.interpolation == Interpolation::CatmullRom
    {
        let p0 = if next >= 2 { keys[next - 2].1.value } else { before.value };
        let p3 = keys.get(next + 1).map_or(after.value, |(_, c)| c.value);
        return Some(catmull_rom(p0, before.value, after.value, p3, t));
    }
    Some(before.value + (after.value - before.value) * t)
}

fn catmull_rom(
    p0: Vector3<f32>,
    p1: Vector3<f32>,
    p2: Vector3<f32>,
    p3: Vector3<f32>,
    t: f32,
) -> Vector3<f32> {
    let t2 = t * t;
    let t3 = t2 * t;
    (p1 * 2.0
        + (p2 - p0) * t
        + (p0 * 2.0 - p1 * 5.0 + p2 * 4.0 - p3) * t2
        + (p1 * 3.0 - p0 - p2 * 3.0 + p3) * t3)
        * 0.5
}

/// Offsets of every node animated by a playing animation.
pub fn sample_offsets(animations: &[Animation]) -> HashMap<NodeId, AnimationOffset> {
    let mut offsets: HashMap<NodeId, AnimationOffset> = HashMap::new();
    for animation in animations.iter().filter(|a| a.is_playing()) {
        for track in animation.tracks() {
            let offset = offsets.entry(track.node).or_default();
            if let Some(position) = track.sample(Channel::Position, animation.time) {
                offset.position += position;
            }
            if let Some(rotation) = track.sample(Channel::Rotation, animation.time) {
                offset.rotation += rotation;
            }
            if let Some(scale) = track.sample(Channel::Scale, animation.time) {
                offset.scale = offset.scale.mul_element_wise(scale);
            }
        }
    }
    offsets
}

/// Writes the sampled offsets into the tree. Groups no playing animation touches go
/// back to the identity offset.
pub fn apply_animations(root: &mut AvatarNode, animations: &[Animation]) {
    let mut offsets = sample_offsets(animations);
    root.for_each_mut(&mut |node| {
        let id = node.id;
        if let Some(offset) = node.animation_offset_mut() {
            *offset = offsets.remove(&id).unwrap_or_default();
        }
    });
}

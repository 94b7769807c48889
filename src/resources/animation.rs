//! Keyframe tracks built from serialized animation entries.
//!
//! A node's entries for one animation arrive as a flat, unordered list where every
//! entry animates a single channel. Entries landing on the same time are merged into
//! one keyframe carrying up to three channels; two entries for the same channel at the
//! same time keep the later one.

use std::collections::HashMap;

use cgmath::Vector3;

use crate::resources::tag::Tag;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Interpolation {
    #[default]
    Linear,
    Step,
    CatmullRom,
}

impl Interpolation {
    pub fn parse_or_default(value: &str) -> Self {
        match value {
            "linear" | "Linear" => Self::Linear,
            "step" | "Step" => Self::Step,
            "catmullrom" | "CatmullRom" => Self::CatmullRom,
            other => {
                log::warn!("Unknown interpolation {:?}, using linear", other);
                Self::Linear
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Position,
    Rotation,
    Scale,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Position, Channel::Rotation, Channel::Scale];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "position" | "POSITION" => Some(Self::Position),
            "rotation" | "ROTATION" => Some(Self::Rotation),
            "scale" | "SCALE" => Some(Self::Scale),
            _ => None,
        }
    }
}

/// One serialized entry, before merging.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KeyframeEntry {
    pub time: f32,
    pub channel: Channel,
    pub value: Vector3<f32>,
    pub interpolation: Interpolation,
}

impl KeyframeEntry {
    /// Reads `time`, `type`, `data` and `int`. Entries with no recognizable channel or
    /// no finite time are dropped; a missing value reads as zero.
    pub fn from_tag(tag: &Tag) -> Option<Self> {
        let Some(channel) = tag.get_str("type").and_then(Channel::parse) else {
            log::warn!("Dropping keyframe without a known channel: {:?}", tag.get("type"));
            return None;
        };
        let time = tag.get_f32("time").unwrap_or(0.0);
        if !time.is_finite() {
            log::warn!("Dropping keyframe at non-finite time {}", time);
            return None;
        }
        Some(Self {
            time,
            channel,
            value: tag.get_vec3("data").unwrap_or(Vector3::new(0.0, 0.0, 0.0)),
            interpolation: tag
                .get_str("int")
                .map(Interpolation::parse_or_default)
                .unwrap_or_default(),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelValue {
    pub value: Vector3<f32>,
    pub interpolation: Interpolation,
}

/// All channels keyed at one point in time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MergedKeyframe {
    pub time: f32,
    pub position: Option<ChannelValue>,
    pub rotation: Option<ChannelValue>,
    pub scale: Option<ChannelValue>,
}

impl MergedKeyframe {
    pub fn new(time: f32) -> Self {
        Self {
            time,
            position: None,
            rotation: None,
            scale: None,
        }
    }

    pub fn channel(&self, channel: Channel) -> Option<&ChannelValue> {
        match channel {
            Channel::Position => self.position.as_ref(),
            Channel::Rotation => self.rotation.as_ref(),
            Channel::Scale => self.scale.as_ref(),
        }
    }

    fn channel_mut(&mut self, channel: Channel) -> &mut Option<ChannelValue> {
        match channel {
            Channel::Position => &mut self.position,
            Channel::Rotation => &mut self.rotation,
            Channel::Scale => &mut self.scale,
        }
    }

    /// Sets the entry's channel, replacing whatever that channel held.
    pub fn merge(&mut self, entry: &KeyframeEntry) {
        *self.channel_mut(entry.channel) = Some(ChannelValue {
            value: entry.value,
            interpolation: entry.interpolation,
        });
    }

    /// The keyframe split back into one entry per present channel.
    pub fn entries(&self) -> impl Iterator<Item = KeyframeEntry> + '_ {
        Channel::ALL.into_iter().filter_map(move |channel| {
            self.channel(channel).map(|c| KeyframeEntry {
                time: self.time,
                channel,
                value: c.value,
                interpolation: c.interpolation,
            })
        })
    }
}

// -0.0 and 0.0 are the same keyframe time
fn time_key(time: f32) -> u32 {
    if time == 0.0 { 0 } else { time.to_bits() }
}

/// Groups entries by time, merging per channel, and returns the keyframes in
/// ascending time order.
pub fn merge_keyframes(entries: impl IntoIterator<Item = KeyframeEntry>) -> Vec<MergedKeyframe> {
    let mut by_time: HashMap<u32, MergedKeyframe> = HashMap::new();
    for entry in entries {
        if !entry.time.is_finite() {
            log::warn!("Dropping keyframe at non-finite time {}", entry.time);
            continue;
        }
        by_time
            .entry(time_key(entry.time))
            .or_insert_with(|| MergedKeyframe::new(entry.time))
            .merge(&entry);
    }

    let mut merged: Vec<MergedKeyframe> = by_time.into_values().collect();
    merged.sort_by(|a, b| a.time.total_cmp(&b.time));
    merged
}

/// Parses and merges a serialized keyframe list.
pub fn load_keyframes(list: &[Tag]) -> Vec<MergedKeyframe> {
    merge_keyframes(list.iter().filter_map(KeyframeEntry::from_tag))
}


use avatar_ngin::{
    Vector2, Vector3,
    data_structures::{
        animation::{Animation, LoopMode, sample_channel},
        node::AvatarNode,
        scene_graph::AvatarModel,
        transform::AnimationOffset,
    },
    resources::{
        animation::{Channel, Interpolation, KeyframeEntry, load_keyframes, merge_keyframes},
        tag::Tag,
    },
};
use instant::Duration;

use crate::common::test_utils::{assert_vec3_near, cube, init_logger};

mod common;

fn entry(time: f32, channel: Channel, x: f32, interpolation: Interpolation) -> KeyframeEntry {
    KeyframeEntry {
        time,
        channel,
        value: Vector3::new(x, 0.0, 0.0),
        interpolation,
    }
}

fn linear(time: f32, channel: Channel, x: f32) -> KeyframeEntry {
    entry(time, channel, x, Interpolation::Linear)
}

#[test]
fn entries_at_the_same_time_merge() {
    let merged = merge_keyframes([
        linear(1.0, Channel::Position, 4.0),
        linear(0.0, Channel::Position, 1.0),
        linear(0.0, Channel::Rotation, 2.0),
        linear(-0.0, Channel::Scale, 3.0),
        // same channel and time: the later entry wins
        linear(0.0, Channel::Position, 9.0),
    ]);

    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].time, 0.0);
    assert_eq!(merged[1].time, 1.0);
    assert_eq!(merged[0].position.map(|c| c.value.x), Some(9.0));
    assert_eq!(merged[0].rotation.map(|c| c.value.x), Some(2.0));
    assert_eq!(merged[0].scale.map(|c| c.value.x), Some(3.0));
    assert!(merged[1].rotation.is_none());
}

#[test]
fn merging_is_idempotent() {
    let merged = merge_keyframes([
        linear(0.5, Channel::Scale, 2.0),
        linear(0.0, Channel::Position, 1.0),
        entry(0.5, Channel::Rotation, 45.0, Interpolation::Step),
        linear(2.0, Channel::Position, 3.0),
    ]);
    let flattened: Vec<KeyframeEntry> = merged.iter().flat_map(|k| k.entries()).collect();
    assert_eq!(flattened.len(), 4);
    assert_eq!(merge_keyframes(flattened), merged);
}

#[test]
fn non_finite_times_are_dropped() {
    let merged = merge_keyframes([
        linear(f32::NAN, Channel::Position, 1.0),
        linear(f32::INFINITY, Channel::Position, 1.0),
        linear(1.0, Channel::Position, 1.0),
    ]);
    assert_eq!(merged.len(), 1);
}

#[test]
fn linear_segments_interpolate() {
    let keys = merge_keyframes([
        linear(0.0, Channel::Position, 0.0),
        linear(1.0, Channel::Position, 10.0),
    ]);
    let value = sample_channel(&keys, Channel::Position, 0.5).expect("position keyed");
    assert_vec3_near(value, Vector3::new(5.0, 0.0, 0.0));
    assert!(sample_channel(&keys, Channel::Rotation, 0.5).is_none());
}

#[test]
fn values_hold_outside_the_keyed_range() {
    let keys = merge_keyframes([
        linear(1.0, Channel::Rotation, 10.0),
        linear(2.0, Channel::Rotation, 20.0),
    ]);
    assert_vec3_near(
        sample_channel(&keys, Channel::Rotation, 0.0).expect("keyed"),
        Vector3::new(10.0, 0.0, 0.0),
    );
    assert_vec3_near(
        sample_channel(&keys, Channel::Rotation, 5.0).expect("keyed"),
        Vector3::new(20.0, 0.0, 0.0),
    );
}

#[test]
fn step_keyframes_hold_until_the_next() {
    let keys = merge_keyframes([
        entry(0.0, Channel::Scale, 1.0, Interpolation::Step),
        linear(1.0, Channel::Scale, 3.0),
    ]);
    assert_vec3_near(
        sample_channel(&keys, Channel::Scale, 0.99).expect("keyed"),
        Vector3::new(1.0, 0.0, 0.0),
    );
    assert_vec3_near(
        sample_channel(&keys, Channel::Scale, 1.0).expect("keyed"),
        Vector3::new(3.0, 0.0, 0.0),
    );
}

#[test]
fn catmull_rom_passes_through_keys() {
    let keys = merge_keyframes([
        entry(0.0, Channel::Position, 0.0, Interpolation::CatmullRom),
        entry(1.0, Channel::Position, 10.0, Interpolation::CatmullRom),
    ]);
    assert_vec3_near(
        sample_channel(&keys, Channel::Position, 0.0).expect("keyed"),
        Vector3::new(0.0, 0.0, 0.0),
    );
    assert_vec3_near(
        sample_channel(&keys, Channel::Position, 0.5).expect("keyed"),
        Vector3::new(5.0, 0.0, 0.0),
    );
}

#[test]
fn keyframes_load_from_tags() {
    let keyframe = |time: f32, kind: &str, x: f32, int: &str| {
        Tag::compound([
            ("time", Tag::from(time)),
            ("type", Tag::from(kind)),
            ("data", Tag::floats(&[x, 0.0, 0.0])),
            ("int", Tag::from(int)),
        ])
    };
    let keys = load_keyframes(&[
        keyframe(1.0, "position", 2.0, "linear"),
        keyframe(0.0, "ROTATION", 1.0, "step"),
        keyframe(0.0, "wiggle", 5.0, "linear"),
        keyframe(0.0, "scale", 3.0, "bounce"),
    ]);

    assert_eq!(keys.len(), 2);
    let first = keys[0];
    assert_eq!(first.rotation.map(|c| c.interpolation), Some(Interpolation::Step));
    assert_eq!(first.scale.map(|c| c.interpolation), Some(Interpolation::Linear));
    assert!(first.position.is_none());
}

#[test]
fn loop_modes_at_the_end() {
    let mut looping = Animation::new("spin", 1.0, LoopMode::Loop);
    let mut once = Animation::new("wave", 1.0, LoopMode::Once);
    let mut hold = Animation::new("pose", 1.0, LoopMode::Hold);
    for animation in [&mut looping, &mut once, &mut hold] {
        animation.play();
        animation.tick(Duration::from_millis(1500));
    }

    assert!(looping.is_playing());
    assert!((looping.time() - 0.5).abs() < 1e-4);
    assert!(!once.is_playing());
    assert_eq!(once.time(), 0.0);
    assert!(hold.is_playing());
    assert_eq!(hold.time(), 1.0);
}

#[test]
fn play_keeps_position_while_playing() {
    let mut animation = Animation::new("walk", 2.0, LoopMode::Loop);
    animation.tick(Duration::from_secs(1));
    assert_eq!(animation.time(), 0.0);

    animation.play();
    animation.tick(Duration::from_millis(500));
    animation.play();
    assert!((animation.time() - 0.5).abs() < 1e-4);

    animation.stop();
    animation.play();
    assert_eq!(animation.time(), 0.0);
}

fn model_with_two_animations() -> AvatarModel {
    let group = AvatarNode::group(1, "body", vec![cube(2, "torso")]);
    let other = AvatarNode::group(3, "legs", Vec::new());

    let mut walk = Animation::new("walk", 1.0, LoopMode::Loop);
    walk.set_track(
        1,
        merge_keyframes([
            linear(0.0, Channel::Position, 1.0),
            KeyframeEntry {
                time: 0.0,
                channel: Channel::Scale,
                value: Vector3::new(2.0, 2.0, 2.0),
                interpolation: Interpolation::Linear,
            },
        ]),
    );
    let mut wave = Animation::new("wave", 1.0, LoopMode::Once);
    wave.set_track(
        1,
        merge_keyframes([
            KeyframeEntry {
                time: 0.0,
                channel: Channel::Position,
                value: Vector3::new(0.0, 2.0, 0.0),
                interpolation: Interpolation::Linear,
            },
            KeyframeEntry {
                time: 0.0,
                channel: Channel::Scale,
                value: Vector3::new(3.0, 1.0, 1.0),
                interpolation: Interpolation::Linear,
            },
        ]),
    );
    wave.set_track(
        3,
        merge_keyframes([linear(0.0, Channel::Rotation, 30.0)]),
    );

    AvatarModel::new(vec![group, other], vec![walk, wave], Vector2::new(64.0, 64.0))
}

fn offset(model: &AvatarModel, id: u32) -> AnimationOffset {
    *model
        .find(id)
        .and_then(AvatarNode::animation_offset)
        .expect("group node")
}

#[test]
fn playing_animations_combine() {
    init_logger();
    let mut model = model_with_two_animations();
    assert!(model.play("walk"));
    assert!(model.play("wave"));
    assert!(!model.play("missing"));
    model.tick(Duration::ZERO);

    let body = offset(&model, 1);
    assert_vec3_near(body.position, Vector3::new(1.0, 2.0, 0.0));
    assert_vec3_near(body.scale, Vector3::new(6.0, 2.0, 2.0));
    assert_vec3_near(offset(&model, 3).rotation, Vector3::new(30.0, 0.0, 0.0));
}

#[test]
fn stopped_animations_release_their_nodes() {
    init_logger();
    let mut model = model_with_two_animations();
    model.play("walk");
    model.play("wave");
    model.tick(Duration::ZERO);

    // wave plays once and runs out, walk loops on
    model.tick(Duration::from_millis(1500));
    assert!(!model.animation("wave").expect("declared").is_playing());
    assert!(offset(&model, 3).is_identity());
    assert_vec3_near(offset(&model, 1).position, Vector3::new(1.0, 0.0, 0.0));

    model.stop_all();
    model.tick(Duration::ZERO);
    assert!(offset(&model, 1).is_identity());
}

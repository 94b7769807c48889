use avatar_ngin::{
    Vector3,
    context::{FrameContext, RenderSettings},
    customization::{CustomizationTable, PartCustomization},
    data_structures::{
        attachment::{AttachmentPoint, ShaderFlags},
        matrix_stack::MatrixStack,
        node::AvatarNode,
        scene_graph::{Arm, AvatarData, AvatarModel},
        texture::TextureId,
        vertex::{AvatarVertex, Vertex},
    },
    render::{BufferedDrawTarget, LayerFn, RenderLayer},
    resources::LoadedAvatar,
    tasks::{TaskTransform, TextTask},
};

use crate::common::test_utils::{
    CountingTaskRenderer, FixedCapabilities, RecordingRegistry, cube, init_logger,
    model_with_cubes,
};

mod common;

fn placeholder_layer() -> RenderLayer {
    RenderLayer::Translucent(TextureId::default_placeholder())
}

fn render(model: &mut AvatarModel, settings: &RenderSettings, budget: i32) -> BufferedDrawTarget {
    render_with_extras(model, settings, budget, &[])
}

fn render_with_extras(
    model: &mut AvatarModel,
    settings: &RenderSettings,
    budget: i32,
    extras: &[(TextureId, LayerFn)],
) -> BufferedDrawTarget {
    let frame = FrameContext::new(settings);
    let mut target = BufferedDrawTarget::new();
    let mut stack = MatrixStack::new();
    model.prepare_frame(settings, Some(&FixedCapabilities(budget)));
    model.render(
        &frame,
        TextureId::default_placeholder(),
        extras,
        &mut stack,
        &mut target,
    );
    target
}

#[test]
fn budget_caps_emitted_vertices() {
    init_logger();
    let settings = RenderSettings::default();
    let mut model = model_with_cubes(2);

    let target = render(&mut model, &settings, 40);
    assert_eq!(target.vertex_count(), 40);
    assert_eq!(model.left_to_render(), 0);

    let target = render(&mut model, &settings, 1000);
    assert_eq!(target.vertex_count(), 48);
    assert_eq!(model.left_to_render(), 1000 - 48);
}

#[test]
fn budget_is_reseeded_every_frame() {
    init_logger();
    let settings = RenderSettings::default();
    let mut model = model_with_cubes(3);

    for _ in 0..3 {
        let target = render(&mut model, &settings, 48);
        assert_eq!(target.vertex_count(), 48);
    }
}

#[test]
fn exhausted_budget_draws_nothing() {
    init_logger();
    let settings = RenderSettings::default();
    let mut model = model_with_cubes(1);

    let target = render(&mut model, &settings, 0);
    assert_eq!(target.vertex_count(), 0);
}

#[test]
fn every_pass_flushes() {
    init_logger();
    let settings = RenderSettings::default();
    let mut model = model_with_cubes(1);

    let target = render(&mut model, &settings, 1000);
    assert_eq!(target.flushes, 3);

    let emissive = TextureId::new("test", "emissive");
    let target = render_with_extras(
        &mut model,
        &settings,
        1000,
        &[(emissive, RenderLayer::Emissive as LayerFn)],
    );
    assert_eq!(target.flushes, 3);
}

#[test]
fn settings_default_budget_applies_without_capabilities() {
    let settings = RenderSettings {
        default_complexity: 24,
        ..Default::default()
    };
    let mut model = model_with_cubes(2);
    model.prepare_frame(&settings, None);
    assert_eq!(model.left_to_render(), 24);
}

#[test]
fn opacity_and_tint_are_inherited() {
    init_logger();
    let settings = RenderSettings::default();
    let mut child = cube(2, "child");
    child.opacity = 0.5;
    child.color = Vector3::new(0.5, 1.0, 1.0);
    let mut group = AvatarNode::group(1, "group", vec![child]);
    group.opacity = 0.5;
    group.color = Vector3::new(1.0, 0.5, 1.0);
    let mut model = AvatarModel::new(vec![group], Vec::new(), [64.0, 64.0].into());

    let target = render(&mut model, &settings, 1000);
    let batch = &target.batches[0];
    assert_eq!(batch.layer, placeholder_layer());
    for vertex in &batch.vertices {
        assert_eq!(vertex.color, [0.5, 0.5, 1.0, 0.25]);
    }
}

#[test]
fn invisible_and_special_parts_are_skipped() {
    init_logger();
    let settings = RenderSettings::default();
    let mut hidden = cube(1, "hidden");
    hidden.visible = false;
    let mut hud = cube(2, "hud");
    hud.attachment = AttachmentPoint::Hud;
    let shown = cube(3, "shown");
    let mut model = AvatarModel::new(vec![hidden, hud, shown], Vec::new(), [64.0, 64.0].into());

    let target = render(&mut model, &settings, 1000);
    assert_eq!(target.vertex_count(), 24);
}

#[test]
fn arm_render_only_draws_the_arm_subtree() {
    init_logger();
    let settings = RenderSettings::default();
    let mut arm = AvatarNode::group(1, "arm", vec![cube(2, "sleeve"), cube(3, "hand")]);
    arm.attachment = AttachmentPoint::LeftArm;
    let mut other_arm = AvatarNode::group(4, "other", vec![cube(5, "sleeve")]);
    other_arm.attachment = AttachmentPoint::RightArm;
    let body = cube(6, "body");
    let mut model = AvatarModel::new(vec![arm, other_arm, body], Vec::new(), [64.0, 64.0].into());

    let frame = FrameContext::new(&settings);
    let mut target = BufferedDrawTarget::new();
    model.prepare_frame(&settings, Some(&FixedCapabilities(1000)));
    model.render_arm(
        Arm::Left,
        &frame,
        TextureId::default_placeholder(),
        &[],
        &mut MatrixStack::new(),
        &mut target,
    );

    assert_eq!(target.vertex_count(), 48);
    assert_eq!(target.flushes, 3);
}

#[test]
fn special_render_draws_only_that_slot() {
    init_logger();
    let settings = RenderSettings::default();
    let mut skull = AvatarNode::group(1, "skull", vec![cube(2, "head")]);
    skull.attachment = AttachmentPoint::Skull;
    let mut hud = cube(3, "hud");
    hud.attachment = AttachmentPoint::Hud;
    let mut model = AvatarModel::new(vec![skull, hud, cube(4, "body")], Vec::new(), [64.0, 64.0].into());

    let frame = FrameContext::new(&settings);
    let mut target = BufferedDrawTarget::new();
    model.prepare_frame(&settings, Some(&FixedCapabilities(1000)));
    model.render_special(
        AttachmentPoint::Skull,
        &frame,
        TextureId::default_placeholder(),
        &[],
        &mut MatrixStack::new(),
        &mut target,
    );
    assert_eq!(target.vertex_count(), 24);

    let left = model.render_special(
        AttachmentPoint::Head,
        &frame,
        TextureId::default_placeholder(),
        &[],
        &mut MatrixStack::new(),
        &mut target,
    );
    assert_eq!(left, 1000 - 24);
    assert_eq!(target.vertex_count(), 24);
}

#[test]
fn shader_flags_apply_to_descendants() {
    init_logger();
    let settings = RenderSettings::default();
    let mut group = AvatarNode::group(1, "portal", vec![cube(2, "a"), cube(3, "b")]);
    group.shaders = ShaderFlags::PORTAL;
    let mut glint = cube(4, "glint");
    glint.shaders = ShaderFlags::GLINT;
    let mut model = AvatarModel::new(vec![group, glint], Vec::new(), [64.0, 64.0].into());

    let target = render(&mut model, &settings, 1000);
    assert_eq!(target.vertices_on(&placeholder_layer()), 72);
    assert_eq!(target.vertices_on(&RenderLayer::PortalOverlay), 48);
    assert_eq!(target.vertices_on(&RenderLayer::GlintOverlay), 24);
    assert_eq!(model.left_to_render(), 1000 - 72 - 72);
}

#[test]
fn extra_textures_do_not_consume_budget() {
    init_logger();
    let settings = RenderSettings::default();
    let mut model = model_with_cubes(2);
    if let Some(node) = model.find_mut(2) {
        node.extra_tex = false;
    }
    let emissive = TextureId::new("test", "emissive");

    let target = render_with_extras(
        &mut model,
        &settings,
        1000,
        &[(emissive.clone(), RenderLayer::Emissive as LayerFn)],
    );
    assert_eq!(target.vertices_on(&placeholder_layer()), 48);
    assert_eq!(target.vertices_on(&RenderLayer::Emissive(emissive)), 24);
    assert_eq!(model.left_to_render(), 1000 - 48);
}

#[test]
fn culling_parts_use_the_cull_layer() {
    init_logger();
    let settings = RenderSettings::default();
    let mut model = model_with_cubes(1);
    if let Some(node) = model.find_mut(1) {
        node.cull = true;
    }

    let target = render(&mut model, &settings, 1000);
    assert_eq!(
        target.vertices_on(&RenderLayer::TranslucentCull(TextureId::default_placeholder())),
        24
    );
}

#[test]
fn debug_boxes_are_drawn_per_node() {
    init_logger();
    let settings = RenderSettings {
        debug_hitboxes: true,
        ..Default::default()
    };
    let mut model = model_with_cubes(2);

    let target = render(&mut model, &settings, 1000);
    // root group plus two cubes, twelve edges each
    assert_eq!(target.vertices_on(&RenderLayer::Lines), 3 * 24);
    assert_eq!(model.left_to_render(), 1000 - 48);
}

#[test]
fn render_tasks_consume_budget() {
    init_logger();
    let settings = RenderSettings::default();
    let renderer = CountingTaskRenderer::new(8);
    let mut model = model_with_cubes(1);
    if let Some(node) = model.find_mut(1) {
        node.render_tasks.insert(
            "label",
            Box::new(TextTask {
                text: "hello".into(),
                emissive: true,
                transform: TaskTransform::default(),
                renderer: renderer.clone(),
            }),
        );
    }

    render(&mut model, &settings, 1000);
    assert_eq!(renderer.calls(), 1);
    assert_eq!(model.left_to_render(), 1000 - 24 - 8);
}

#[test]
fn batches_upload_with_the_vertex_layout() {
    init_logger();
    let settings = RenderSettings::default();
    let mut model = model_with_cubes(1);

    let mut target = render(&mut model, &settings, 1000);
    let batches = target.take_batches();
    let vertices = &batches[0].vertices;
    let bytes: &[u8] = bytemuck::cast_slice(vertices);
    let layout = AvatarVertex::desc();
    assert_eq!(bytes.len(), vertices.len() * layout.array_stride as usize);
    assert_eq!(layout.attributes.len(), 6);
}

#[test]
fn hitbox_sits_at_the_composed_origin() {
    init_logger();
    let settings = RenderSettings {
        debug_hitboxes: true,
        ..Default::default()
    };
    let mut pivoted = cube(1, "pivoted");
    pivoted.transform.pivot = Vector3::new(8.0, 0.0, 0.0);
    let mut model = AvatarModel::new(vec![pivoted], Vec::new(), [64.0, 64.0].into());

    let target = render(&mut model, &settings, 1000);
    let lines: Vec<_> = target
        .batches
        .iter()
        .filter(|batch| batch.layer == RenderLayer::Lines)
        .flat_map(|batch| batch.vertices.iter())
        .collect();
    // root box plus the cube's box, both centred on the origin
    assert_eq!(lines.len(), 2 * 24);
    let mean_x = lines.iter().map(|v| v.position[0]).sum::<f32>() / lines.len() as f32;
    assert!(mean_x.abs() < 1e-5, "boxes centred at x = {mean_x}");
}

fn min_x(target: &BufferedDrawTarget) -> f32 {
    target
        .batches
        .iter()
        .flat_map(|batch| batch.vertices.iter())
        .map(|v| v.position[0])
        .fold(f32::MAX, f32::min)
}

#[test]
fn frame_customizations_override_authored_values() {
    init_logger();
    let settings = RenderSettings::default();
    let group = AvatarNode::group(1, "hidden", vec![cube(3, "inside")]);
    let mut model = AvatarModel::new(vec![group, cube(2, "moved")], Vec::new(), [64.0, 64.0].into());
    let table = CustomizationTable::new();
    table.set(
        1,
        PartCustomization {
            visible: Some(false),
            ..Default::default()
        },
    );
    table.update(2, |c| {
        c.position = Some(Vector3::new(16.0, 0.0, 0.0));
        c.opacity = Some(0.5);
    });
    let frame = FrameContext {
        customizations: Some(&table),
        ..FrameContext::new(&settings)
    };

    let draw = |model: &mut AvatarModel| {
        let mut target = BufferedDrawTarget::new();
        model.prepare_frame(&settings, Some(&FixedCapabilities(1000)));
        model.render(
            &frame,
            TextureId::default_placeholder(),
            &[],
            &mut MatrixStack::new(),
            &mut target,
        );
        target
    };

    let target = draw(&mut model);
    // the hidden group takes its child with it
    assert_eq!(target.vertex_count(), 24);
    assert!((min_x(&target) - 0.5).abs() < 1e-5);
    for vertex in target.batches.iter().flat_map(|b| b.vertices.iter()) {
        assert_eq!(vertex.color[3], 0.5);
    }

    table.clear();
    let target = draw(&mut model);
    assert_eq!(target.vertex_count(), 48);
    assert!((min_x(&target) + 0.5).abs() < 1e-5);
    for vertex in target.batches.iter().flat_map(|b| b.vertices.iter()) {
        assert_eq!(vertex.color[3], 1.0);
    }
}

#[test]
fn avatar_customizations_apply_to_its_renders() {
    init_logger();
    let settings = RenderSettings::default();
    let mut avatar = AvatarData::default();
    avatar.install(
        LoadedAvatar {
            model: model_with_cubes(1),
            textures: Vec::new(),
        },
        &mut RecordingRegistry::default(),
    );
    let draw = |avatar: &mut AvatarData| {
        let mut target = BufferedDrawTarget::new();
        avatar.prepare_frame(Some(&FixedCapabilities(1000)));
        avatar.render(&FrameContext::new(&settings), &mut MatrixStack::new(), &mut target);
        target
    };

    avatar.customizations.update(1, |c| c.position = Some(Vector3::new(0.0, 0.0, 0.0)));
    let target = draw(&mut avatar);
    assert_eq!(target.vertex_count(), 24);
    assert!((min_x(&target) + 0.5).abs() < 1e-5);

    avatar.customizations.update(1, |c| c.position = Some(Vector3::new(32.0, 0.0, 0.0)));
    assert!((min_x(&draw(&mut avatar)) - 1.5).abs() < 1e-5);

    avatar.customizations.update(1, |c| c.visible = Some(false));
    assert_eq!(draw(&mut avatar).vertex_count(), 0);

    avatar.customizations.remove(1);
    let target = draw(&mut avatar);
    assert_eq!(target.vertex_count(), 24);
    assert!((min_x(&target) + 0.5).abs() < 1e-5);
}

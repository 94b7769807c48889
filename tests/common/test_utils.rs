use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use avatar_ngin::{
    Quaternion, Vector2, Vector3,
    data_structures::{
        attachment::Joint,
        matrix_stack::MatrixStack,
        node::{AvatarNode, Geometry},
        scene_graph::AvatarModel,
        texture::TextureId,
    },
    host::{
        Capabilities, Capability, HostSkeleton, HostTextures, JointPose, PlayerTextures,
        TaskRenderer, TextureRegistry,
    },
    render::DrawTarget,
    resources::{
        mesh::{Face, build_cuboid},
        tag::Tag,
    },
};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Skeleton with fixed poses. Joints without a pose report an error.
#[derive(Default)]
pub struct FakeSkeleton {
    pub poses: HashMap<Joint, JointPose>,
    pub camera: Option<Quaternion<f32>>,
}

impl FakeSkeleton {
    pub fn with_pose(mut self, joint: Joint, pose: JointPose) -> Self {
        self.poses.insert(joint, pose);
        self
    }
}

impl HostSkeleton for FakeSkeleton {
    fn joint_pose(&self, joint: Joint) -> anyhow::Result<JointPose> {
        self.poses
            .get(&joint)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("no pose for {:?}", joint))
    }

    fn camera_rotation(&self) -> anyhow::Result<Quaternion<f32>> {
        self.camera
            .ok_or_else(|| anyhow::anyhow!("no camera"))
    }
}

#[derive(Default)]
pub struct FakeHostTextures {
    pub resources: Vec<TextureId>,
    pub player: Option<PlayerTextures>,
    pub entity: Option<TextureId>,
}

impl HostTextures for FakeHostTextures {
    fn contains_resource(&self, id: &TextureId) -> bool {
        self.resources.contains(id)
    }

    fn player_textures(&self) -> Option<PlayerTextures> {
        self.player.clone()
    }

    fn entity_texture(&self) -> Option<TextureId> {
        self.entity.clone()
    }
}

#[derive(Default)]
pub struct RecordingRegistry {
    pub registered: Vec<TextureId>,
    pub refuse: bool,
}

impl TextureRegistry for RecordingRegistry {
    fn register(&mut self, id: &TextureId, _image: &image::RgbaImage) -> anyhow::Result<()> {
        if self.refuse {
            anyhow::bail!("registry is closed");
        }
        self.registered.push(id.clone());
        Ok(())
    }
}

pub struct FixedCapabilities(pub i32);

impl Capabilities for FixedCapabilities {
    fn capability(&self, capability: Capability) -> i32 {
        match capability {
            Capability::Complexity => self.0,
            _ => 1,
        }
    }
}

/// Task renderer that draws nothing and reports a fixed cost per call.
#[derive(Default)]
pub struct CountingTaskRenderer {
    pub cost: i32,
    pub calls: AtomicUsize,
}

impl CountingTaskRenderer {
    pub fn new(cost: i32) -> Arc<Self> {
        Arc::new(Self {
            cost,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn draw(&self) -> i32 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.cost
    }
}

impl TaskRenderer for CountingTaskRenderer {
    fn draw_text(&self, _: &str, _: &MatrixStack, _: &mut dyn DrawTarget, _: u32) -> i32 {
        self.draw()
    }

    fn draw_item(&self, _: &str, _: &MatrixStack, _: &mut dyn DrawTarget, _: u32) -> i32 {
        self.draw()
    }

    fn draw_block(&self, _: &str, _: &MatrixStack, _: &mut dyn DrawTarget, _: u32) -> i32 {
        self.draw()
    }
}

/// A 16px cube: 6 faces, 24 vertices.
pub fn cube_geometry() -> Geometry {
    let faces: Vec<(Face, [f32; 4])> = Face::ALL.iter().map(|f| (*f, [0.0, 0.0, 16.0, 16.0])).collect();
    build_cuboid(
        Vector3::new(-8.0, -8.0, -8.0),
        Vector3::new(8.0, 8.0, 8.0),
        0.0,
        &faces,
        Vector2::new(64.0, 64.0),
    )
}

pub fn cube(id: u32, name: &str) -> AvatarNode {
    AvatarNode::cuboid(id, name, cube_geometry())
}

/// Model with `count` cubes directly under the root, ids 1..=count.
pub fn model_with_cubes(count: u32) -> AvatarModel {
    let parts = (1..=count).map(|id| cube(id, &format!("cube{id}"))).collect();
    AvatarModel::new(parts, Vec::new(), Vector2::new(64.0, 64.0))
}

pub fn cuboid_tag(name: &str) -> Tag {
    let face = Tag::compound([("uv", Tag::floats(&[0.0, 0.0, 4.0, 4.0]))]);
    Tag::compound([
        ("nm", Tag::from(name)),
        ("pt", Tag::from("cub")),
        ("f", Tag::floats(&[0.0, 0.0, 0.0])),
        ("t", Tag::floats(&[4.0, 4.0, 4.0])),
        ("n", face.clone()),
        ("s", face.clone()),
        ("e", face.clone()),
        ("w", face.clone()),
        ("u", face.clone()),
        ("d", face),
    ])
}

pub fn group_tag(name: &str, children: Vec<Tag>) -> Tag {
    Tag::compound([
        ("nm", Tag::from(name)),
        ("pt", Tag::from("na")),
        ("chld", Tag::List(children)),
    ])
}

pub fn avatar_tag(parts: Vec<Tag>) -> Tag {
    Tag::compound([
        ("parts", Tag::List(parts)),
        ("tsz", Tag::floats(&[64.0, 64.0])),
    ])
}

/// A tiny valid PNG.
pub fn png_bytes() -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 255, 255]));
    let mut bytes = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, image::ImageFormat::Png)
        .expect("encoding a 2x2 png cannot fail");
    bytes.into_inner()
}

pub fn assert_vec3_near(actual: Vector3<f32>, expected: Vector3<f32>) {
    let diff = actual - expected;
    assert!(
        diff.x.abs() < 1e-4 && diff.y.abs() < 1e-4 && diff.z.abs() < 1e-4,
        "expected {:?}, got {:?}",
        expected,
        actual
    );
}

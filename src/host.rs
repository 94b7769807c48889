//! Narrow interfaces to the host engine.
//!
//! The renderer only ever reads from the host: joint poses, the camera orientation,
//! texture lookups and trust capabilities. All calls are made with the handles passed
//! through [`crate::context::FrameContext`], never through ambient state.

use cgmath::{Quaternion, Vector3};

use crate::data_structures::{attachment::Joint, matrix_stack::MatrixStack, texture::TextureId};
use crate::render::DrawTarget;

/// Live pose of one host joint. Angles are radians, the pivot is in model pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JointPose {
    pub pivot: Vector3<f32>,
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl Default for JointPose {
    fn default() -> Self {
        Self {
            pivot: Vector3::new(0.0, 0.0, 0.0),
            pitch: 0.0,
            yaw: 0.0,
            roll: 0.0,
        }
    }
}

impl JointPose {
    /// Rotation as (pitch, yaw, roll) in degrees, the layout mimic mode copies into
    /// a node's authored rotation.
    pub fn euler_degrees(&self) -> Vector3<f32> {
        Vector3::new(self.pitch, self.yaw, self.roll) * (180.0 / std::f32::consts::PI)
    }

    /// The joint's own rotate-and-translate step: move to the pivot, then roll, yaw
    /// and pitch about it.
    pub fn apply(&self, stack: &mut MatrixStack) {
        stack.translate(
            self.pivot.x / crate::PIXELS_PER_UNIT,
            self.pivot.y / crate::PIXELS_PER_UNIT,
            self.pivot.z / crate::PIXELS_PER_UNIT,
        );
        if self.roll != 0.0 || self.yaw != 0.0 || self.pitch != 0.0 {
            let degrees = self.euler_degrees();
            stack.rotate_z(degrees.z);
            stack.rotate_y(degrees.y);
            stack.rotate_x(degrees.x);
        }
    }
}

/// Read-only access to the host skeleton bound to the avatar.
pub trait HostSkeleton {
    fn joint_pose(&self, joint: Joint) -> anyhow::Result<JointPose>;

    /// Orientation of the host camera, used by camera-attached nodes.
    fn camera_rotation(&self) -> anyhow::Result<Quaternion<f32>>;
}

/// Textures provided by the host's player-list entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlayerTextures {
    pub skin: Option<TextureId>,
    pub cape: Option<TextureId>,
    pub elytra: Option<TextureId>,
}

/// Host texture lookups used by the texture resolver.
pub trait HostTextures {
    fn contains_resource(&self, id: &TextureId) -> bool;

    /// `None` when the host has no player-list data for this avatar's owner.
    fn player_textures(&self) -> Option<PlayerTextures>;

    /// Default texture of the live entity the avatar is bound to, if any.
    fn entity_texture(&self) -> Option<TextureId>;
}

/// Registers decoded textures with the host's graphics context. Only ever called on
/// the render thread.
pub trait TextureRegistry {
    fn register(&mut self, id: &TextureId, image: &image::RgbaImage) -> anyhow::Result<()>;
}

/// Trust-controlled capabilities of the avatar owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Render budget in vertices.
    Complexity,
    VanillaModelEdit,
    OffscreenRendering,
}

pub trait Capabilities {
    fn capability(&self, capability: Capability) -> i32;
}

/// Draws the host-side content behind auxiliary render tasks. Each call returns the
/// complexity (in vertices) it consumed.
pub trait TaskRenderer {
    fn draw_text(
        &self,
        text: &str,
        stack: &MatrixStack,
        target: &mut dyn DrawTarget,
        light: u32,
    ) -> i32;

    fn draw_item(
        &self,
        item: &str,
        stack: &MatrixStack,
        target: &mut dyn DrawTarget,
        light: u32,
    ) -> i32;

    fn draw_block(
        &self,
        block: &str,
        stack: &MatrixStack,
        target: &mut dyn DrawTarget,
        light: u32,
    ) -> i32;
}

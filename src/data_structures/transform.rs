//! Authored and animated node transforms.
//!
//! A node's transform is a (position, pivot, rotation, scale) set in model pixels and
//! degrees. Composition happens on a [`MatrixStack`] in the order
//! `translate(pos) * translate(-pivot) * rotate * scale * translate(pivot)`; groups add
//! their animation offset around that. See [`crate::composer`] for the host-binding
//! half of the story.

use cgmath::{Matrix4, Vector3, Zero};

use crate::{
    PIXELS_PER_UNIT,
    data_structures::{attachment::RotationConvention, matrix_stack::MatrixStack},
};

/// Authored local transform of a node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PartTransform {
    pub position: Vector3<f32>,
    pub pivot: Vector3<f32>,
    /// Euler angles in degrees, interpreted according to a [`RotationConvention`].
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl PartTransform {
    /// Identity transform (no move, rotate or scale).
    pub fn new() -> Self {
        Self {
            position: Vector3::zero(),
            pivot: Vector3::zero(),
            rotation: Vector3::zero(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn apply(&self, stack: &mut MatrixStack, convention: RotationConvention) {
        translate_pixels(stack, self.position);
        translate_pixels(stack, -self.pivot);
        rotate(stack, self.rotation, convention);
        stack.scale(self.scale.x, self.scale.y, self.scale.z);
        translate_pixels(stack, self.pivot);
    }

    pub fn to_matrix(&self, convention: RotationConvention) -> Matrix4<f32> {
        let mut stack = MatrixStack::new();
        self.apply(&mut stack, convention);
        stack.peek().model
    }
}

impl Default for PartTransform {
    fn default() -> Self {
        Self::new()
    }
}

/// Animation-driven offset of a group, applied on top of its authored transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationOffset {
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl AnimationOffset {
    pub fn new() -> Self {
        Self {
            position: Vector3::zero(),
            rotation: Vector3::zero(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::new()
    }

    /// Offset position comes first. Animation data is authored with Y pointing down
    /// relative to the model, hence the flipped Y.
    pub fn apply_position(&self, stack: &mut MatrixStack) {
        stack.translate(
            self.position.x / PIXELS_PER_UNIT,
            -self.position.y / PIXELS_PER_UNIT,
            self.position.z / PIXELS_PER_UNIT,
        );
    }

    /// Rotation and scale about the group's pivot, always in host convention.
    pub fn apply_rotation_scale(&self, stack: &mut MatrixStack, pivot: Vector3<f32>) {
        translate_pixels(stack, -pivot);
        rotate(stack, self.rotation, RotationConvention::Host);
        stack.scale(self.scale.x, self.scale.y, self.scale.z);
        translate_pixels(stack, pivot);
    }
}

impl Default for AnimationOffset {
    fn default() -> Self {
        Self::new()
    }
}

pub fn translate_pixels(stack: &mut MatrixStack, offset: Vector3<f32>) {
    stack.translate(
        offset.x / PIXELS_PER_UNIT,
        offset.y / PIXELS_PER_UNIT,
        offset.z / PIXELS_PER_UNIT,
    );
}

/// Applies Euler angles in degrees.
///
/// Tool convention: Z, then -Y, then -X. Host convention: Z, then Y, then X.
pub fn rotate(stack: &mut MatrixStack, rotation: Vector3<f32>, convention: RotationConvention) {
    match convention {
        RotationConvention::Tool => {
            stack.rotate_z(rotation.z);
            stack.rotate_y(-rotation.y);
            stack.rotate_x(-rotation.x);
        }
        RotationConvention::Host => {
            stack.rotate_z(rotation.z);
            stack.rotate_y(rotation.y);
            stack.rotate_x(rotation.x);
        }
    }
}

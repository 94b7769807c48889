//! Transform composition against the host skeleton.
//!
//! Per node the order is:
//! 1. host binding: follow a body joint (or copy its rotation in mimic mode), record an
//!    origin offset for origin-type slots, or counter-rotate for the camera slot;
//! 2. the node's authored transform;
//! 3. for groups, the animation offset around the pivot.
//!
//! Failures while talking to the host are logged and skipped for that node only.

use cgmath::{Quaternion, Vector3};

use crate::{
    context::FrameContext,
    customization::{OriginModifications, OriginOffset, ResolvedPart},
    data_structures::{
        attachment::{AttachmentPoint, RotationConvention},
        matrix_stack::MatrixStack,
        node::{AvatarNode, NodeKind},
        transform::{rotate, translate_pixels},
    },
    host::HostSkeleton,
};

/// Binds `node` to its host attachment point on the render stack and, when given, on
/// the logical stack too.
pub fn apply_host_binding(
    node: &mut AvatarNode,
    frame: &FrameContext<'_>,
    render: &mut MatrixStack,
    mut logical: Option<&mut MatrixStack>,
    origins: &mut OriginModifications,
) {
    if node.attachment == AttachmentPoint::Model {
        return;
    }
    let Some(skeleton) = frame.skeleton else {
        return;
    };

    let result = if node.mimic {
        mimic_rotation(node, skeleton)
    } else {
        bind(node, skeleton, render, logical.as_deref_mut(), origins)
    };

    if let Err(e) = result {
        log::warn!(
            "Could not bind node {:?} to {}, skipping its customization this frame: {:#}",
            node.name,
            node.attachment,
            e
        );
    }
}

fn mimic_rotation(node: &mut AvatarNode, skeleton: &dyn HostSkeleton) -> anyhow::Result<()> {
    if let Some(joint) = node.attachment.joint() {
        let pose = skeleton.joint_pose(joint)?;
        node.transform.rotation = pose.euler_degrees();
    }
    Ok(())
}

fn bind(
    node: &AvatarNode,
    skeleton: &dyn HostSkeleton,
    render: &mut MatrixStack,
    logical: Option<&mut MatrixStack>,
    origins: &mut OriginModifications,
) -> anyhow::Result<()> {
    let slot = node.attachment;
    if let Some(joint) = slot.joint() {
        let pose = skeleton.joint_pose(joint)?;
        pose.apply(render);
        if let Some(logical) = logical {
            pose.apply(logical);
        }
    } else if slot.is_origin() {
        render.push();
        apply_origin_transform(node, render);
        let entry = *render.peek();
        render.pop();
        origins.insert(
            slot,
            OriginOffset {
                entry,
                node: node.id,
                visible: true,
            },
        );
    } else if slot == AttachmentPoint::Camera {
        let euler = quaternion_to_euler_xyz(skeleton.camera_rotation()?);
        counter_rotate(render, euler);
        if let Some(logical) = logical {
            counter_rotate(logical, euler);
        }
    }
    Ok(())
}

fn counter_rotate(stack: &mut MatrixStack, euler: Vector3<f32>) {
    stack.rotate_z(euler.z);
    stack.rotate_y(-euler.y);
    stack.rotate_x(-euler.x);
}

/// The placement an origin slot hands over to the host.
pub fn apply_origin_transform(node: &AvatarNode, stack: &mut MatrixStack) {
    let t = &node.transform;
    match node.attachment {
        AttachmentPoint::LeftItemOrigin | AttachmentPoint::RightItemOrigin => {
            stack.rotate_x(-90.0);
            stack.rotate_y(180.0);
            translate_pixels(stack, Vector3::new(t.pivot.x, t.pivot.z, t.pivot.y));
        }
        AttachmentPoint::LeftWingOrigin
        | AttachmentPoint::RightWingOrigin
        | AttachmentPoint::LeftShoulderOrigin
        | AttachmentPoint::RightShoulderOrigin => {
            translate_pixels(stack, Vector3::new(t.pivot.x, t.pivot.y, -t.pivot.z));
        }
        AttachmentPoint::LeftSpyglass | AttachmentPoint::RightSpyglass => {
            translate_pixels(stack, -t.pivot);
        }
        _ => return,
    }
    rotate(stack, t.rotation, RotationConvention::Tool);
    translate_pixels(stack, t.position);
}

/// Authored transform plus, for groups, the animation offset.
pub fn apply_part_transforms(node: &AvatarNode, part: &ResolvedPart, stack: &mut MatrixStack) {
    let convention = if node.mimic {
        RotationConvention::Host
    } else {
        node.rotation_convention
    };
    match &node.kind {
        NodeKind::Group(group) => {
            group.animation.apply_position(stack);
            part.transform.apply(stack, convention);
            group
                .animation
                .apply_rotation_scale(stack, part.transform.pivot);
        }
        NodeKind::Cuboid(_) | NodeKind::Mesh(_) => part.transform.apply(stack, convention),
    }
}

/// XYZ Euler angles in degrees.
pub fn quaternion_to_euler_xyz(q: Quaternion<f32>) -> Vector3<f32> {
    let (w, x, y, z) = (q.s, q.v.x, q.v.y, q.v.z);

    let sinr_cosp = 2.0 * (w * x + y * z);
    let cosr_cosp = 1.0 - 2.0 * (x * x + y * y);
    let roll = sinr_cosp.atan2(cosr_cosp);

    let sinp = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0);
    let pitch = sinp.asin();

    let siny_cosp = 2.0 * (w * z + x * y);
    let cosy_cosp = 1.0 - 2.0 * (y * y + z * z);
    let yaw = siny_cosp.atan2(cosy_cosp);

    Vector3::new(roll, pitch, yaw) * (180.0 / std::f32::consts::PI)
}

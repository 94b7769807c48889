//! Push/pop transform accumulator.
//!
//! Each entry carries the model matrix used for positions and the normal matrix used
//! for normals. Every operation post-multiplies, so the last operation applied is the
//! first one a vertex sees.

use cgmath::{Deg, Matrix3, Matrix4, Quaternion, Rotation3, SquareMatrix, Vector3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StackEntry {
    pub model: Matrix4<f32>,
    pub normal: Matrix3<f32>,
}

impl Default for StackEntry {
    fn default() -> Self {
        Self {
            model: Matrix4::identity(),
            normal: Matrix3::identity(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MatrixStack {
    entries: Vec<StackEntry>,
}

impl Default for MatrixStack {
    fn default() -> Self {
        Self::new()
    }
}

impl MatrixStack {
    pub fn new() -> Self {
        Self {
            entries: vec![StackEntry::default()],
        }
    }

    /// Start from an existing entry, e.g. the arm transform handed over by the host.
    pub fn from_entry(entry: StackEntry) -> Self {
        Self {
            entries: vec![entry],
        }
    }

    pub fn push(&mut self) {
        let top = *self.peek();
        self.entries.push(top);
    }

    /// Popping the root entry is ignored so that unbalanced callers cannot empty the stack.
    pub fn pop(&mut self) {
        if self.entries.len() > 1 {
            self.entries.pop();
        } else {
            log::warn!("Tried to pop the root entry of a matrix stack");
        }
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn peek(&self) -> &StackEntry {
        // the constructors guarantee at least one entry and `pop` never removes it
        &self.entries[self.entries.len() - 1]
    }

    fn top_mut(&mut self) -> &mut StackEntry {
        let last = self.entries.len() - 1;
        &mut self.entries[last]
    }

    pub fn translate(&mut self, x: f32, y: f32, z: f32) {
        let top = self.top_mut();
        top.model = top.model * Matrix4::from_translation(Vector3::new(x, y, z));
    }

    pub fn multiply(&mut self, rotation: Quaternion<f32>) {
        let top = self.top_mut();
        top.model = top.model * Matrix4::from(rotation);
        top.normal = top.normal * Matrix3::from(rotation);
    }

    pub fn rotate_x(&mut self, degrees: f32) {
        self.multiply(Quaternion::from_angle_x(Deg(degrees)));
    }

    pub fn rotate_y(&mut self, degrees: f32) {
        self.multiply(Quaternion::from_angle_y(Deg(degrees)));
    }

    pub fn rotate_z(&mut self, degrees: f32) {
        self.multiply(Quaternion::from_angle_z(Deg(degrees)));
    }

    /// Scales positions; the normal matrix gets the inverse scale renormalised by its
    /// cube root so that lighting stays stable under non-uniform scale.
    pub fn scale(&mut self, x: f32, y: f32, z: f32) {
        let top = self.top_mut();
        top.model = top.model * Matrix4::from_nonuniform_scale(x, y, z);
        if x == y && y == z {
            if x < 0.0 {
                top.normal = top.normal * -1.0;
            }
            return;
        }
        let (fx, fy, fz) = (recip(x), recip(y), recip(z));
        let norm = (fx * fy * fz).cbrt();
        top.normal = top.normal * diagonal(norm * fx, norm * fy, norm * fz);
    }

    /// Applies an entry captured elsewhere on top of the current one.
    pub fn multiply_entry(&mut self, entry: &StackEntry) {
        let top = self.top_mut();
        top.model = top.model * entry.model;
        top.normal = top.normal * entry.normal;
    }
}

fn recip(v: f32) -> f32 {
    if v == 0.0 { 0.0 } else { 1.0 / v }
}

pub(crate) fn diagonal(x: f32, y: f32, z: f32) -> Matrix3<f32> {
    Matrix3::new(x, 0.0, 0.0, 0.0, y, 0.0, 0.0, 0.0, z)
}

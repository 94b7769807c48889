//! Auxiliary render tasks attached to nodes.
//!
//! Tasks are added and removed by the scripting side while frames are being drawn, so
//! the per-node collection lives behind a lock that both sides share. The traversal
//! only holds the lock for the duration of one node's auxiliary draw.

use std::sync::Arc;

use cgmath::{Vector3, Zero};
use parking_lot::Mutex;

use crate::{
    data_structures::{matrix_stack::MatrixStack, transform::translate_pixels},
    host::TaskRenderer,
    render::DrawTarget,
};

/// Packed light value the host treats as fully lit.
pub const FULL_BRIGHT: u32 = 0x00F0_00F0;

/// Text is authored in font pixels; this maps it onto model space.
const TEXT_SCALE: f32 = 0.025;

/// Something drawn at a node's transform in the auxiliary pass.
pub trait RenderTask: Send + Sync {
    /// Draws the task and returns the complexity it consumed, in vertices.
    fn render(&self, stack: &mut MatrixStack, target: &mut dyn DrawTarget, light: u32) -> i32;
}

/// Placement of a task relative to its node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TaskTransform {
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Default for TaskTransform {
    fn default() -> Self {
        Self {
            position: Vector3::zero(),
            rotation: Vector3::zero(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

impl TaskTransform {
    pub fn apply(&self, stack: &mut MatrixStack) {
        stack.rotate_x(-self.rotation.x);
        stack.rotate_y(-self.rotation.y);
        stack.rotate_z(self.rotation.z);
        translate_pixels(stack, self.position);
        stack.scale(self.scale.x, self.scale.y, self.scale.z);
    }
}

pub struct TextTask {
    pub text: String,
    pub emissive: bool,
    pub transform: TaskTransform,
    pub renderer: Arc<dyn TaskRenderer + Send + Sync>,
}

impl RenderTask for TextTask {
    fn render(&self, stack: &mut MatrixStack, target: &mut dyn DrawTarget, light: u32) -> i32 {
        stack.push();
        self.transform.apply(stack);
        stack.scale(TEXT_SCALE, TEXT_SCALE, TEXT_SCALE);
        let light = if self.emissive { FULL_BRIGHT } else { light };
        let complexity = self.renderer.draw_text(&self.text, stack, target, light);
        stack.pop();
        complexity
    }
}

pub struct ItemTask {
    pub item: String,
    pub emissive: bool,
    pub transform: TaskTransform,
    pub renderer: Arc<dyn TaskRenderer + Send + Sync>,
}

impl RenderTask for ItemTask {
    fn render(&self, stack: &mut MatrixStack, target: &mut dyn DrawTarget, light: u32) -> i32 {
        stack.push();
        self.transform.apply(stack);
        stack.rotate_x(180.0);
        let light = if self.emissive { FULL_BRIGHT } else { light };
        let complexity = self.renderer.draw_item(&self.item, stack, target, light);
        stack.pop();
        complexity
    }
}

pub struct BlockTask {
    pub block: String,
    pub emissive: bool,
    pub transform: TaskTransform,
    pub renderer: Arc<dyn TaskRenderer + Send + Sync>,
}

impl RenderTask for BlockTask {
    fn render(&self, stack: &mut MatrixStack, target: &mut dyn DrawTarget, light: u32) -> i32 {
        stack.push();
        self.transform.apply(stack);
        stack.rotate_x(180.0);
        let light = if self.emissive { FULL_BRIGHT } else { light };
        let complexity = self.renderer.draw_block(&self.block, stack, target, light);
        stack.pop();
        complexity
    }
}

type TaskList = Vec<(String, Box<dyn RenderTask>)>;

/// Insertion-ordered, name-keyed task collection shared with the scripting side.
///
/// Cloning yields another handle to the same collection.
#[derive(Clone, Default)]
pub struct RenderTasks {
    inner: Arc<Mutex<TaskList>>,
}

impl std::fmt::Debug for RenderTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.inner.lock().iter().map(|(n, _)| n.clone()).collect();
        f.debug_struct("RenderTasks").field("tasks", &names).finish()
    }
}

impl RenderTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a task. A task with the same name is replaced in place, keeping its slot
    /// in the draw order.
    pub fn insert(&self, name: impl Into<String>, task: Box<dyn RenderTask>) {
        let name = name.into();
        let mut tasks = self.inner.lock();
        match tasks.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = task,
            None => tasks.push((name, task)),
        }
    }

    pub fn remove(&self, name: &str) -> bool {
        let mut tasks = self.inner.lock();
        let before = tasks.len();
        tasks.retain(|(existing, _)| existing != name);
        tasks.len() != before
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.inner.lock().iter().map(|(name, _)| name.clone()).collect()
    }

    /// Renders tasks in order, decrementing `left_to_render` by what each reports and
    /// stopping once the budget is gone.
    pub fn render_all(
        &self,
        mut left_to_render: i32,
        stack: &mut MatrixStack,
        target: &mut dyn DrawTarget,
        light: u32,
    ) -> i32 {
        let tasks = self.inner.lock();
        for (_, task) in tasks.iter() {
            left_to_render -= task.render(stack, target, light);
            if left_to_render <= 0 {
                break;
            }
        }
        left_to_render
    }
}

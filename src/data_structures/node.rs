//! Avatar nodes.
//!
//! A node is either a group holding children or a leaf carrying geometry. The kinds
//! form a closed enum and every traversal dispatches on it, so there is exactly one
//! node struct with one set of attributes.

use std::sync::Arc;

use cgmath::{Matrix3, Matrix4, SquareMatrix, Vector2, Vector3};

use crate::{
    data_structures::{
        attachment::{AttachmentPoint, RotationConvention, ShaderFlags, TextureKind},
        matrix_stack::StackEntry,
        texture::TextureId,
        transform::{AnimationOffset, PartTransform},
    },
    render::CustomLayer,
    tasks::RenderTasks,
};

/// Stable per-avatar node identity, assigned depth-first at load.
pub type NodeId = u32;

/// Floats per vertex in a node's buffer: position(3), uv(2), normal(3).
pub const FLOATS_PER_VERTEX: usize = 8;

/// Immutable vertex data of a leaf node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    data: Arc<[f32]>,
}

impl Geometry {
    /// Trailing floats that do not form a full vertex are dropped.
    pub fn new(mut data: Vec<f32>) -> Self {
        let whole = data.len() - data.len() % FLOATS_PER_VERTEX;
        if whole != data.len() {
            log::warn!(
                "Vertex buffer of {} floats is not a multiple of {}, truncating",
                data.len(),
                FLOATS_PER_VERTEX
            );
            data.truncate(whole);
        }
        Self { data: data.into() }
    }

    pub fn vertex_count(&self) -> usize {
        self.data.len() / FLOATS_PER_VERTEX
    }

    pub fn raw(&self) -> &[f32] {
        &self.data
    }

    pub fn vertex(&self, index: usize) -> Option<RawVertex> {
        let start = index * FLOATS_PER_VERTEX;
        let v = self.data.get(start..start + FLOATS_PER_VERTEX)?;
        Some(RawVertex {
            position: Vector3::new(v[0], v[1], v[2]),
            uv: Vector2::new(v[3], v[4]),
            normal: Vector3::new(v[5], v[6], v[7]),
        })
    }

    pub fn vertices(&self) -> impl Iterator<Item = RawVertex> + '_ {
        (0..self.vertex_count()).filter_map(|i| self.vertex(i))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawVertex {
    pub position: Vector3<f32>,
    pub uv: Vector2<f32>,
    pub normal: Vector3<f32>,
}

#[derive(Clone, Debug, Default)]
pub struct GroupData {
    pub children: Vec<AvatarNode>,
    pub animation: AnimationOffset,
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Group(GroupData),
    Cuboid(Geometry),
    Mesh(Geometry),
}

/// World transform of a node as of the last full render, with inverses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CachedMatrices {
    pub model: Matrix4<f32>,
    pub normal: Matrix3<f32>,
    pub model_inverse: Matrix4<f32>,
    pub normal_inverse: Matrix3<f32>,
}

impl CachedMatrices {
    pub fn from_entry(entry: &StackEntry) -> Self {
        Self {
            model: entry.model,
            normal: entry.normal,
            model_inverse: entry.model.invert().unwrap_or_else(Matrix4::identity),
            normal_inverse: entry.normal.invert().unwrap_or_else(Matrix3::identity),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AvatarNode {
    pub id: NodeId,
    pub name: String,
    pub transform: PartTransform,
    pub color: Vector3<f32>,
    pub opacity: f32,
    pub visible: bool,
    pub rotation_convention: RotationConvention,
    pub attachment: AttachmentPoint,
    pub mimic: bool,
    pub texture_kind: TextureKind,
    pub texture_resource: Option<TextureId>,
    pub shaders: ShaderFlags,
    pub custom_layer: Option<CustomLayer>,
    /// Whether extra texture passes draw this node.
    pub extra_tex: bool,
    pub cull: bool,
    pub uv_offset: Vector2<f32>,
    pub render_tasks: RenderTasks,
    pub cached: Option<CachedMatrices>,
    pub kind: NodeKind,
}

impl AvatarNode {
    pub fn new(id: NodeId, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id,
            name: name.into(),
            transform: PartTransform::new(),
            color: Vector3::new(1.0, 1.0, 1.0),
            opacity: 1.0,
            visible: true,
            rotation_convention: RotationConvention::Tool,
            attachment: AttachmentPoint::Model,
            mimic: false,
            texture_kind: TextureKind::Custom,
            texture_resource: None,
            shaders: ShaderFlags::empty(),
            custom_layer: None,
            extra_tex: true,
            cull: false,
            uv_offset: Vector2::new(0.0, 0.0),
            render_tasks: RenderTasks::new(),
            cached: None,
            kind,
        }
    }

    pub fn group(id: NodeId, name: impl Into<String>, children: Vec<AvatarNode>) -> Self {
        Self::new(
            id,
            name,
            NodeKind::Group(GroupData {
                children,
                animation: AnimationOffset::new(),
            }),
        )
    }

    pub fn cuboid(id: NodeId, name: impl Into<String>, geometry: Geometry) -> Self {
        Self::new(id, name, NodeKind::Cuboid(geometry))
    }

    pub fn mesh(id: NodeId, name: impl Into<String>, geometry: Geometry) -> Self {
        Self::new(id, name, NodeKind::Mesh(geometry))
    }

    pub fn is_special(&self) -> bool {
        self.attachment.is_special()
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Group(_))
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        match &self.kind {
            NodeKind::Group(_) => None,
            NodeKind::Cuboid(geometry) | NodeKind::Mesh(geometry) => Some(geometry),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.geometry().map_or(0, Geometry::vertex_count)
    }

    pub fn children(&self) -> &[AvatarNode] {
        match &self.kind {
            NodeKind::Group(group) => &group.children,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> &mut [AvatarNode] {
        match &mut self.kind {
            NodeKind::Group(group) => &mut group.children,
            _ => &mut [],
        }
    }

    pub fn animation_offset(&self) -> Option<&AnimationOffset> {
        match &self.kind {
            NodeKind::Group(group) => Some(&group.animation),
            _ => None,
        }
    }

    pub fn animation_offset_mut(&mut self) -> Option<&mut AnimationOffset> {
        match &mut self.kind {
            NodeKind::Group(group) => Some(&mut group.animation),
            _ => None,
        }
    }

    /// Vertices this subtree would draw; invisible subtrees count as nothing.
    pub fn complexity(&self) -> usize {
        if !self.visible {
            return 0;
        }
        match &self.kind {
            NodeKind::Group(group) => group.children.iter().map(AvatarNode::complexity).sum(),
            NodeKind::Cuboid(geometry) | NodeKind::Mesh(geometry) => geometry.vertex_count(),
        }
    }

    pub fn find(&self, id: NodeId) -> Option<&AvatarNode> {
        if self.id == id {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(id))
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut AvatarNode> {
        if self.id == id {
            return Some(self);
        }
        self.children_mut()
            .iter_mut()
            .find_map(|child| child.find_mut(id))
    }

    pub fn find_by_name(&self, name: &str) -> Option<&AvatarNode> {
        if self.name == name {
            return Some(self);
        }
        self.children()
            .iter()
            .find_map(|child| child.find_by_name(name))
    }

    /// Depth-first, pre-order visit of the subtree.
    pub fn for_each_mut(&mut self, visit: &mut dyn FnMut(&mut AvatarNode)) {
        visit(self);
        for child in self.children_mut() {
            child.for_each_mut(visit);
        }
    }

    /// Drops every auxiliary task in the subtree.
    pub fn clear_render_tasks(&self) {
        self.render_tasks.clear();
        for child in self.children() {
            child.clear_render_tasks();
        }
    }
}

//! Multi-pass, budgeted traversal of an avatar tree.
//!
//! One frame runs three depth-first passes over the same tree:
//!
//! 1. texture pass: node geometry into textured layers (plus one repeat per extra
//!    texture, which reads the budget but does not consume it);
//! 2. shader pass: geometry again, into the portal and glint overlay layers according to
//!    the shader flags inherited down the tree;
//! 3. auxiliary pass: per-node render tasks and, when enabled, debug boxes.
//!
//! Each pass flushes the draw target before the next one starts. The budget counts
//! vertices and is decremented by 4 per emitted quad. Once it hits zero no further
//! children are entered, but a quad that was started is always finished.

use cgmath::{Vector2, Vector3, Vector4};

use crate::{
    composer::{apply_host_binding, apply_part_transforms},
    context::{FrameContext, RenderRequest},
    customization::{OriginModifications, PartCustomization, ResolvedPart},
    data_structures::{
        attachment::{ShaderFlags, TextureKind},
        matrix_stack::MatrixStack,
        node::{AvatarNode, CachedMatrices},
        texture::{TextureId, resolve_texture},
        vertex::AvatarVertex,
    },
    render::{CustomLayer, DrawTarget, LayerFn, RenderLayer},
};

/// Debug box colour and half-size for leaves.
const LEAF_BOX: ([f32; 3], f32) = ([1.0, 0.45, 0.72], 1.0 / 48.0);
/// Debug box colour and half-size for groups.
const GROUP_BOX: ([f32; 3], f32) = ([0.69, 0.95, 1.0], 1.0 / 24.0);

/// Values accumulated from the root down to the current node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Inherited {
    pub uv: Vector2<f32>,
    pub color: Vector3<f32>,
    pub opacity: f32,
    pub can_render: bool,
}

impl Inherited {
    pub fn root(can_render: bool) -> Self {
        Self {
            uv: Vector2::new(0.0, 0.0),
            color: Vector3::new(1.0, 1.0, 1.0),
            opacity: 1.0,
            can_render,
        }
    }

    fn descend(&self, part: &ResolvedPart, can_render: bool) -> Self {
        Self {
            uv: self.uv + part.uv_offset,
            color: Vector3::new(
                part.color.x * self.color.x,
                part.color.y * self.color.y,
                part.color.z * self.color.z,
            ),
            opacity: part.opacity * self.opacity,
            can_render,
        }
    }
}

/// Texture-pass specific state handed down the tree.
#[derive(Clone, Debug)]
pub struct TextureState {
    pub texture: TextureId,
    pub layer: Option<CustomLayer>,
    pub layer_fn: LayerFn,
    /// Set for extra-texture repeats of the pass.
    pub extra: bool,
}

impl TextureState {
    pub fn main(texture: TextureId) -> Self {
        Self {
            texture,
            layer: None,
            layer_fn: RenderLayer::Translucent,
            extra: false,
        }
    }

    pub fn extra(texture: TextureId, layer_fn: LayerFn) -> Self {
        Self {
            texture,
            layer: None,
            layer_fn,
            extra: true,
        }
    }
}

/// A pass in progress: the shared handles plus the running budget.
pub struct Pass<'p, 'f> {
    pub frame: &'p FrameContext<'f>,
    pub request: RenderRequest,
    pub target: &'p mut dyn DrawTarget,
    pub origins: &'p mut OriginModifications,
    pub left_to_render: i32,
}

impl<'p, 'f> Pass<'p, 'f> {
    pub fn new(
        frame: &'p FrameContext<'f>,
        request: RenderRequest,
        target: &'p mut dyn DrawTarget,
        origins: &'p mut OriginModifications,
        left_to_render: i32,
    ) -> Self {
        Self {
            frame,
            request,
            target,
            origins,
            left_to_render,
        }
    }

    fn customization(&self, node: &AvatarNode) -> Option<PartCustomization> {
        self.frame.customizations.and_then(|table| table.get(node.id))
    }

    fn is_visible(node: &AvatarNode, customization: Option<&PartCustomization>) -> bool {
        customization
            .and_then(|c| c.visible)
            .unwrap_or(node.visible)
    }

    /// Once a node matches the filter (or there is none) its whole subtree renders.
    fn is_renderable(&self, node: &AvatarNode, inherited: bool) -> bool {
        inherited
            || match self.request.render_only {
                None => true,
                Some(only) => node.attachment == only,
            }
    }

    /// Host binding and node transforms for one node, on the render stack and the
    /// optional logical stack. Returns the node as resolved for this pass.
    fn compose(
        &mut self,
        node: &mut AvatarNode,
        customization: Option<&PartCustomization>,
        render: &mut MatrixStack,
        mut logical: Option<&mut MatrixStack>,
        can_render: bool,
    ) -> ResolvedPart {
        if self.request.apply_hidden_transforms {
            apply_host_binding(
                node,
                self.frame,
                render,
                logical.as_deref_mut(),
                &mut *self.origins,
            );
            let part = ResolvedPart::new(node, customization);
            apply_part_transforms(node, &part, render);
            if let Some(logical) = logical {
                apply_part_transforms(node, &part, logical);
            }
            part
        } else {
            let part = ResolvedPart::new(node, customization);
            if can_render {
                apply_part_transforms(node, &part, render);
                if let Some(logical) = logical {
                    apply_part_transforms(node, &part, logical);
                }
            }
            part
        }
    }

    pub fn textures(
        &mut self,
        node: &mut AvatarNode,
        render: &mut MatrixStack,
        logical: &mut MatrixStack,
        parent: Inherited,
        state: &TextureState,
    ) {
        let customization = self.customization(node);
        if !Self::is_visible(node, customization.as_ref()) || (state.extra && !node.extra_tex) {
            return;
        }

        render.push();
        logical.push();

        let part = self.compose(
            node,
            customization.as_ref(),
            render,
            Some(&mut *logical),
            parent.can_render,
        );
        if self.request.apply_hidden_transforms && self.request.cache_matrices && !state.extra {
            node.cached = Some(CachedMatrices::from_entry(logical.peek()));
        }

        let can_render = self.is_renderable(node, parent.can_render);
        let inherited = parent.descend(&part, can_render);

        let layer_fn: LayerFn = if !state.extra && node.cull {
            RenderLayer::TranslucentCull
        } else {
            state.layer_fn
        };
        let texture = if node.texture_kind != TextureKind::Custom {
            resolve_texture(node, &self.frame.textures)
        } else {
            state.texture.clone()
        };

        let mut inherited_layer = state.layer.clone();
        if can_render {
            let layer = match (&node.custom_layer, &inherited_layer) {
                (Some(custom), _) => {
                    inherited_layer = Some(custom.clone());
                    RenderLayer::Custom(custom.clone())
                }
                (None, Some(custom)) => RenderLayer::Custom(custom.clone()),
                (None, None) => layer_fn(texture.clone()),
            };
            self.emit(node, render, &layer, &inherited);
        }

        let child_state = TextureState {
            texture,
            layer: inherited_layer,
            layer_fn,
            extra: state.extra,
        };
        for child in node.children_mut() {
            if self.left_to_render <= 0 {
                break;
            }
            if child.is_special() {
                continue;
            }
            self.textures(child, render, logical, inherited, &child_state);
        }

        render.pop();
        logical.pop();
    }

    pub fn shaders(
        &mut self,
        node: &mut AvatarNode,
        render: &mut MatrixStack,
        parent: Inherited,
        inherited_shaders: ShaderFlags,
    ) {
        let customization = self.customization(node);
        if !Self::is_visible(node, customization.as_ref()) {
            return;
        }

        render.push();

        let part = self.compose(node, customization.as_ref(), render, None, parent.can_render);
        let can_render = self.is_renderable(node, parent.can_render);
        let inherited = parent.descend(&part, can_render);
        let shaders = inherited_shaders | node.shaders;

        if can_render {
            if shaders.contains(ShaderFlags::PORTAL) {
                self.emit(node, render, &RenderLayer::PortalOverlay, &inherited);
            }
            if shaders.contains(ShaderFlags::GLINT) {
                self.emit(node, render, &RenderLayer::GlintOverlay, &inherited);
            }
        }

        for child in node.children_mut() {
            if self.left_to_render <= 0 {
                break;
            }
            if child.is_special() {
                continue;
            }
            self.shaders(child, render, inherited, shaders);
        }

        render.pop();
    }

    pub fn extras(&mut self, node: &mut AvatarNode, render: &mut MatrixStack, can_render: bool) {
        let customization = self.customization(node);
        if !Self::is_visible(node, customization.as_ref()) {
            return;
        }

        render.push();

        self.compose(node, customization.as_ref(), render, None, can_render);
        let can_render = self.is_renderable(node, can_render);

        if can_render {
            self.left_to_render = node.render_tasks.render_all(
                self.left_to_render,
                render,
                &mut *self.target,
                self.frame.light,
            );
            if self.frame.settings.debug_hitboxes {
                draw_hitbox(node, render, &mut *self.target);
            }
        }

        for child in node.children_mut() {
            if self.left_to_render <= 0 {
                break;
            }
            if child.is_special() {
                continue;
            }
            self.extras(child, render, can_render);
        }

        render.pop();
    }

    /// Writes the node's vertices into `layer`, one quad at a time.
    fn emit(
        &mut self,
        node: &AvatarNode,
        render: &MatrixStack,
        layer: &RenderLayer,
        inherited: &Inherited,
    ) {
        let Some(geometry) = node.geometry() else {
            return;
        };
        if geometry.vertex_count() == 0 || self.left_to_render <= 0 {
            return;
        }

        let entry = render.peek();
        let color = inherited.color.extend(inherited.opacity);
        let consumer = self.target.buffer(layer);
        for (i, vertex) in geometry.vertices().enumerate() {
            let position = entry.model * vertex.position.extend(1.0);
            let normal = entry.normal * vertex.normal;
            consumer.vertex(AvatarVertex::new(
                position.truncate(),
                color,
                vertex.uv + inherited.uv,
                self.frame.overlay,
                self.frame.light,
                normal,
            ));

            if (i + 1) % 4 == 0 {
                self.left_to_render -= 4;
                if self.left_to_render <= 0 {
                    break;
                }
            }
        }
    }
}

/// Texture pass over a whole tree, including the extra-texture repeats. Returns the
/// budget left after the main texture.
#[allow(clippy::too_many_arguments)]
pub fn texture_pass(
    root: &mut AvatarNode,
    left_to_render: i32,
    main_texture: TextureId,
    extra_textures: &[(TextureId, LayerFn)],
    frame: &FrameContext<'_>,
    request: RenderRequest,
    stack: &mut MatrixStack,
    target: &mut dyn DrawTarget,
    origins: &mut OriginModifications,
    can_render: bool,
) -> i32 {
    let mut logical = MatrixStack::new();
    let mut pass = Pass::new(frame, request, target, origins, left_to_render);
    pass.textures(
        root,
        stack,
        &mut logical,
        Inherited::root(can_render),
        &TextureState::main(main_texture),
    );
    let left = pass.left_to_render;

    for (texture, layer_fn) in extra_textures {
        pass.left_to_render = left;
        let mut logical = MatrixStack::new();
        pass.textures(
            root,
            stack,
            &mut logical,
            Inherited::root(can_render),
            &TextureState::extra(texture.clone(), *layer_fn),
        );
    }

    target.flush();
    left
}

#[allow(clippy::too_many_arguments)]
pub fn shader_pass(
    root: &mut AvatarNode,
    left_to_render: i32,
    frame: &FrameContext<'_>,
    request: RenderRequest,
    stack: &mut MatrixStack,
    target: &mut dyn DrawTarget,
    origins: &mut OriginModifications,
    can_render: bool,
) -> i32 {
    let mut pass = Pass::new(frame, request, target, origins, left_to_render);
    pass.shaders(root, stack, Inherited::root(can_render), ShaderFlags::empty());
    let left = pass.left_to_render;
    target.flush();
    left
}

#[allow(clippy::too_many_arguments)]
pub fn auxiliary_pass(
    root: &mut AvatarNode,
    left_to_render: i32,
    frame: &FrameContext<'_>,
    request: RenderRequest,
    stack: &mut MatrixStack,
    target: &mut dyn DrawTarget,
    origins: &mut OriginModifications,
    can_render: bool,
) -> i32 {
    let mut pass = Pass::new(frame, request, target, origins, left_to_render);
    pass.extras(root, stack, can_render);
    let left = pass.left_to_render;
    target.flush();
    left
}

/// Runs texture, shader and auxiliary passes in order with one shared budget.
#[allow(clippy::too_many_arguments)]
pub fn render_tree(
    root: &mut AvatarNode,
    left_to_render: i32,
    main_texture: TextureId,
    extra_textures: &[(TextureId, LayerFn)],
    frame: &FrameContext<'_>,
    request: RenderRequest,
    stack: &mut MatrixStack,
    target: &mut dyn DrawTarget,
    origins: &mut OriginModifications,
    can_render: bool,
) -> i32 {
    if left_to_render <= 0 {
        return left_to_render;
    }
    let left = texture_pass(
        root,
        left_to_render,
        main_texture,
        extra_textures,
        frame,
        request,
        stack,
        target,
        origins,
        can_render,
    );
    let left = shader_pass(root, left, frame, request, stack, target, origins, can_render);
    auxiliary_pass(root, left, frame, request, stack, target, origins, can_render)
}

fn draw_hitbox(node: &AvatarNode, stack: &MatrixStack, target: &mut dyn DrawTarget) {
    let (color, size) = if node.is_group() { GROUP_BOX } else { LEAF_BOX };
    // the composed stack already sits at the pivot
    let max = Vector3::new(size, size, size);
    let min = -max;
    draw_box(
        stack,
        target,
        min,
        max,
        Vector4::new(color[0], color[1], color[2], 1.0),
    );
}

/// Twelve box edges as line-list vertices on [`RenderLayer::Lines`], each vertex
/// carrying its edge direction as normal.
pub fn draw_box(
    stack: &MatrixStack,
    target: &mut dyn DrawTarget,
    min: Vector3<f32>,
    max: Vector3<f32>,
    color: Vector4<f32>,
) {
    let corner = |x: bool, y: bool, z: bool| {
        Vector3::new(
            if x { max.x } else { min.x },
            if y { max.y } else { min.y },
            if z { max.z } else { min.z },
        )
    };
    let mut edges = Vec::with_capacity(12);
    for a in [false, true] {
        for b in [false, true] {
            edges.push((corner(false, a, b), corner(true, a, b)));
            edges.push((corner(a, false, b), corner(a, true, b)));
            edges.push((corner(a, b, false), corner(a, b, true)));
        }
    }

    let entry = stack.peek();
    let consumer = target.buffer(&RenderLayer::Lines);
    for (from, to) in edges {
        let direction = entry.normal * (to - from);
        for point in [from, to] {
            let position = entry.model * point.extend(1.0);
            consumer.vertex(AvatarVertex::new(
                position.truncate(),
                color,
                Vector2::new(0.0, 0.0),
                0,
                0,
                direction,
            ));
        }
    }
}

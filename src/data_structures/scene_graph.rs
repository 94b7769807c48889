//! A loaded avatar and its per-frame lifecycle.
//!
//! [`AvatarModel`] owns the node tree (under a synthetic root group), the animations and
//! the per-frame render budget. [`AvatarData`] wraps the model with its textures and the
//! completion flag: nothing renders until a background load has been finalized on the
//! render thread.

use cgmath::Vector2;
use instant::Duration;

use crate::{
    context::{FrameContext, RenderRequest, RenderSettings},
    customization::{CustomizationTable, OriginModifications, OriginOffset},
    data_structures::{
        animation::{Animation, apply_animations},
        attachment::{AttachmentPoint, TextureKind},
        matrix_stack::MatrixStack,
        node::{AvatarNode, CachedMatrices, NodeId},
        texture::{AvatarTexture, ExtraTextureKind, TextureId, resolve_kind},
    },
    host::{Capabilities, TextureRegistry},
    render::{DrawTarget, LayerFn, RenderLayer},
    resources::{FinalizeQueue, FinalizeSender, LoadedAvatar},
    traversal::render_tree,
};

/// Id of the synthetic group every avatar's top-level parts hang off.
pub const ROOT_ID: NodeId = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Arm {
    Left,
    Right,
}

impl Arm {
    pub fn attachment(self) -> AttachmentPoint {
        match self {
            Arm::Left => AttachmentPoint::LeftArm,
            Arm::Right => AttachmentPoint::RightArm,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AvatarModel {
    root: AvatarNode,
    pub animations: Vec<Animation>,
    /// Texture size the UVs were normalized against, in pixels.
    pub texture_size: Vector2<f32>,
    pub origins: OriginModifications,
    left_to_render: i32,
}

impl AvatarModel {
    pub fn new(parts: Vec<AvatarNode>, animations: Vec<Animation>, texture_size: Vector2<f32>) -> Self {
        Self {
            root: AvatarNode::group(ROOT_ID, "root", parts),
            animations,
            texture_size,
            origins: OriginModifications::default(),
            left_to_render: 0,
        }
    }

    pub fn root(&self) -> &AvatarNode {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut AvatarNode {
        &mut self.root
    }

    pub fn parts(&self) -> &[AvatarNode] {
        self.root.children()
    }

    pub fn find(&self, id: NodeId) -> Option<&AvatarNode> {
        self.root.find(id)
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut AvatarNode> {
        self.root.find_mut(id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&AvatarNode> {
        self.root.find_by_name(name)
    }

    /// Vertices a full, unbudgeted render would draw.
    pub fn complexity(&self) -> usize {
        self.root.complexity()
    }

    pub fn left_to_render(&self) -> i32 {
        self.left_to_render
    }

    /// Seeds this frame's budget. Call once per frame, before any render call.
    pub fn prepare_frame(&mut self, settings: &RenderSettings, capabilities: Option<&dyn Capabilities>) {
        self.left_to_render = settings.complexity_limit(capabilities);
    }

    /// World matrices cached by the last full render.
    pub fn world_matrices(&self, id: NodeId) -> Option<CachedMatrices> {
        self.find(id).and_then(|node| node.cached)
    }

    pub fn origin(&self, slot: AttachmentPoint) -> Option<&OriginOffset> {
        self.origins.get(slot)
    }

    pub fn animation(&self, name: &str) -> Option<&Animation> {
        self.animations.iter().find(|a| a.name == name)
    }

    pub fn animation_mut(&mut self, name: &str) -> Option<&mut Animation> {
        self.animations.iter_mut().find(|a| a.name == name)
    }

    pub fn play(&mut self, name: &str) -> bool {
        match self.animation_mut(name) {
            Some(animation) => {
                animation.play();
                true
            }
            None => {
                log::warn!("No animation named {:?}", name);
                false
            }
        }
    }

    pub fn stop(&mut self, name: &str) -> bool {
        match self.animation_mut(name) {
            Some(animation) => {
                animation.stop();
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&mut self) {
        self.animations.iter_mut().for_each(Animation::stop);
    }

    /// Advances playback and writes the resulting offsets into the tree.
    pub fn tick(&mut self, delta: Duration) {
        for animation in &mut self.animations {
            animation.tick(delta);
        }
        apply_animations(&mut self.root, &self.animations);
    }

    /// Full avatar render: every non-special part, bound to the host skeleton, with
    /// world matrices cached and origin offsets rebuilt.
    pub fn render(
        &mut self,
        frame: &FrameContext<'_>,
        main_texture: TextureId,
        extra_textures: &[(TextureId, LayerFn)],
        stack: &mut MatrixStack,
        target: &mut dyn DrawTarget,
    ) -> i32 {
        self.origins.clear();
        self.left_to_render = render_tree(
            &mut self.root,
            self.left_to_render,
            main_texture,
            extra_textures,
            frame,
            RenderRequest::full(),
            stack,
            target,
            &mut self.origins,
            false,
        );
        self.left_to_render
    }

    /// Draws only the parts bound to one arm, on a stack the host already moved to it.
    pub fn render_arm(
        &mut self,
        arm: Arm,
        frame: &FrameContext<'_>,
        main_texture: TextureId,
        extra_textures: &[(TextureId, LayerFn)],
        stack: &mut MatrixStack,
        target: &mut dyn DrawTarget,
    ) -> i32 {
        self.left_to_render = render_tree(
            &mut self.root,
            self.left_to_render,
            main_texture,
            extra_textures,
            frame,
            RenderRequest::only(arm.attachment()),
            stack,
            target,
            &mut self.origins,
            false,
        );
        self.left_to_render
    }

    /// Draws the top-level parts bound to a special slot (skull, HUD, world, wings).
    pub fn render_special(
        &mut self,
        kind: AttachmentPoint,
        frame: &FrameContext<'_>,
        main_texture: TextureId,
        extra_textures: &[(TextureId, LayerFn)],
        stack: &mut MatrixStack,
        target: &mut dyn DrawTarget,
    ) -> i32 {
        if !kind.is_special() {
            log::warn!("{} is not a special attachment point, nothing to render", kind);
            return self.left_to_render;
        }
        let request = RenderRequest {
            apply_hidden_transforms: false,
            cache_matrices: false,
            render_only: None,
        };
        for part in self.root.children_mut() {
            if part.attachment != kind {
                continue;
            }
            self.left_to_render = render_tree(
                part,
                self.left_to_render,
                main_texture.clone(),
                extra_textures,
                frame,
                request,
                stack,
                target,
                &mut self.origins,
                true,
            );
        }
        self.left_to_render
    }
}

/// An avatar slot: the model once loaded, its textures and the render-thread side of
/// the loading hand-off.
pub struct AvatarData {
    model: Option<AvatarModel>,
    texture: Option<AvatarTexture>,
    extra_textures: Vec<AvatarTexture>,
    loaded: bool,
    queue: FinalizeQueue,
    pub settings: RenderSettings,
    pub customizations: CustomizationTable,
}

impl Default for AvatarData {
    fn default() -> Self {
        Self::new(RenderSettings::default())
    }
}

impl AvatarData {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            model: None,
            texture: None,
            extra_textures: Vec::new(),
            loaded: false,
            queue: FinalizeQueue::new(),
            settings,
            customizations: CustomizationTable::new(),
        }
    }

    /// Handle for a background task to hand a finished load back to this avatar.
    pub fn loader(&self) -> FinalizeSender {
        self.queue.sender()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn model(&self) -> Option<&AvatarModel> {
        self.model.as_ref()
    }

    pub fn model_mut(&mut self) -> Option<&mut AvatarModel> {
        self.model.as_mut()
    }

    pub fn texture(&self) -> Option<&AvatarTexture> {
        self.texture.as_ref()
    }

    pub fn extra_textures(&self) -> &[AvatarTexture] {
        &self.extra_textures
    }

    /// Installs finished loads. Must run on the render thread, since textures get
    /// registered with the host here. Returns whether anything was installed.
    pub fn finalize(&mut self, registry: &mut dyn TextureRegistry) -> bool {
        let mut installed = false;
        for loaded in self.queue.drain() {
            self.install(loaded, registry);
            installed = true;
        }
        installed
    }

    /// Replaces the current avatar with `loaded`. A texture the registry refuses stays
    /// unregistered and the resolver falls back past it.
    pub fn install(&mut self, loaded: LoadedAvatar, registry: &mut dyn TextureRegistry) {
        let LoadedAvatar { model, textures } = loaded;
        self.texture = None;
        self.extra_textures.clear();

        for mut texture in textures {
            match registry.register(&texture.id, &texture.image) {
                Ok(()) => texture.registered = true,
                Err(e) => log::warn!("Could not register texture {}: {:#}", texture.id, e),
            }
            match texture.kind {
                ExtraTextureKind::Main if self.texture.is_none() => self.texture = Some(texture),
                ExtraTextureKind::Main => {
                    log::warn!("Avatar has more than one main texture, ignoring {}", texture.id)
                }
                ExtraTextureKind::Emission => self.extra_textures.push(texture),
            }
        }

        log::info!(
            "Avatar loaded: {} parts, {} animations, complexity {}",
            model.parts().len(),
            model.animations.len(),
            model.complexity()
        );
        self.model = Some(model);
        self.loaded = true;
    }

    pub fn unload(&mut self) {
        if let Some(model) = &self.model {
            model.root().clear_render_tasks();
        }
        self.model = None;
        self.texture = None;
        self.extra_textures.clear();
        self.customizations.clear();
        self.loaded = false;
    }

    pub fn prepare_frame(&mut self, capabilities: Option<&dyn Capabilities>) {
        if let Some(model) = &mut self.model {
            model.prepare_frame(&self.settings, capabilities);
        }
    }

    pub fn tick(&mut self, delta: Duration) {
        if let Some(model) = &mut self.model {
            model.tick(delta);
        }
    }

    /// Budget left this frame, zero when nothing is loaded.
    pub fn left_to_render(&self) -> i32 {
        self.model.as_ref().map_or(0, AvatarModel::left_to_render)
    }

    pub fn render(
        &mut self,
        frame: &FrameContext<'_>,
        stack: &mut MatrixStack,
        target: &mut dyn DrawTarget,
    ) -> i32 {
        self.render_with(frame, stack, target, |model, frame, main, extras, stack, target| {
            model.render(frame, main, extras, stack, target)
        })
    }

    pub fn render_arm(
        &mut self,
        arm: Arm,
        frame: &FrameContext<'_>,
        stack: &mut MatrixStack,
        target: &mut dyn DrawTarget,
    ) -> i32 {
        self.render_with(frame, stack, target, |model, frame, main, extras, stack, target| {
            model.render_arm(arm, frame, main, extras, stack, target)
        })
    }

    pub fn render_special(
        &mut self,
        kind: AttachmentPoint,
        frame: &FrameContext<'_>,
        stack: &mut MatrixStack,
        target: &mut dyn DrawTarget,
    ) -> i32 {
        self.render_with(frame, stack, target, |model, frame, main, extras, stack, target| {
            model.render_special(kind, frame, main, extras, stack, target)
        })
    }

    /// Fills in this avatar's textures and customizations on a copy of `frame`, then
    /// hands over to `draw`. Does nothing until the avatar is loaded.
    fn render_with(
        &mut self,
        frame: &FrameContext<'_>,
        stack: &mut MatrixStack,
        target: &mut dyn DrawTarget,
        draw: impl FnOnce(
            &mut AvatarModel,
            &FrameContext<'_>,
            TextureId,
            &[(TextureId, LayerFn)],
            &mut MatrixStack,
            &mut dyn DrawTarget,
        ) -> i32,
    ) -> i32 {
        if !self.loaded {
            return 0;
        }
        let Self {
            model,
            texture,
            extra_textures,
            customizations,
            ..
        } = self;
        let Some(model) = model else {
            return 0;
        };

        let custom = texture.as_ref().filter(|t| t.registered).map(|t| &t.id);
        let mut frame = *frame;
        frame.textures.custom = custom;
        if frame.customizations.is_none() {
            frame.customizations = Some(&*customizations);
        }

        let main = resolve_kind(TextureKind::Custom, None, &frame.textures);
        let extras: Vec<(TextureId, LayerFn)> = extra_textures
            .iter()
            .filter(|t| t.registered)
            .map(|t| (t.id.clone(), RenderLayer::Emissive as LayerFn))
            .collect();

        draw(model, &frame, main, &extras, stack, target)
    }
}

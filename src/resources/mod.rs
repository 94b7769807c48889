use anyhow::Context;
use cgmath::{Vector2, Vector3};
use futures::{
    FutureExt, StreamExt,
    channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded},
};

use crate::data_structures::{
    animation::{Animation, LoopMode},
    attachment::{AttachmentPoint, RotationConvention, ShaderFlags, TextureKind},
    node::{AvatarNode, NodeId},
    scene_graph::{AvatarModel, ROOT_ID},
    texture::{AvatarTexture, ExtraTextureKind, TextureId},
    transform::PartTransform,
};
use crate::resources::{
    animation::load_keyframes,
    mesh::{cuboid_from_tag, mesh_from_tag},
    tag::Tag,
    texture::decode_texture,
};

/**
 * This module contains all logic for turning serialized avatar data into a model.
 */
pub mod animation;
pub mod mesh;
pub mod tag;
pub mod texture;

/// Texture size assumed when the avatar does not declare one.
pub const DEFAULT_TEXTURE_SIZE: [f32; 2] = [64.0, 64.0];

/// Raw texture bytes as they arrive with an avatar.
#[derive(Clone, Debug)]
pub struct TextureSource {
    pub id: TextureId,
    pub kind: ExtraTextureKind,
    pub bytes: Vec<u8>,
}

/// Everything needed to build an avatar, still undecoded.
#[derive(Clone, Debug)]
pub struct AvatarSource {
    pub model: Tag,
    pub textures: Vec<TextureSource>,
}

/// A fully decoded avatar waiting to be installed on the render thread.
#[derive(Debug)]
pub struct LoadedAvatar {
    pub model: AvatarModel,
    pub textures: Vec<AvatarTexture>,
}

/// Builds a model from the root tag of an avatar.
///
/// Only a root that is not a compound at all is an error. Anything malformed below it
/// falls back to neutral values, and parts of an unknown type are skipped.
pub fn load_avatar_model(root: &Tag) -> anyhow::Result<AvatarModel> {
    anyhow::ensure!(
        matches!(root, Tag::Compound(_)),
        "Avatar root must be a compound tag"
    );

    let texture_size = root
        .get_vec2("tsz")
        .unwrap_or(Vector2::from(DEFAULT_TEXTURE_SIZE));
    let mut loader = ModelLoader {
        next_id: ROOT_ID + 1,
        texture_size,
        animations: root
            .get_list("anim")
            .unwrap_or_default()
            .iter()
            .filter_map(animation_header)
            .collect(),
    };

    let parts: Vec<AvatarNode> = root
        .get_list("parts")
        .unwrap_or_default()
        .iter()
        .filter_map(|part| loader.load_node(part))
        .collect();

    let model = AvatarModel::new(parts, loader.animations, texture_size);
    log::debug!(
        "Built avatar model with {} nodes and {} vertices",
        loader.next_id - 1,
        model.complexity()
    );
    Ok(model)
}

/// Parses the model and decodes its textures. Blocking; see [`load_avatar`].
pub fn parse_avatar(source: AvatarSource) -> anyhow::Result<LoadedAvatar> {
    let model = load_avatar_model(&source.model).context("Could not build avatar model")?;
    let textures = source
        .textures
        .into_iter()
        .filter_map(|t| match decode_texture(t.id, t.kind, &t.bytes) {
            Ok(texture) => Some(texture),
            Err(e) => {
                log::warn!("Skipping avatar texture: {:#}", e);
                None
            }
        })
        .collect();
    Ok(LoadedAvatar { model, textures })
}

/// Parses and decodes an avatar off the calling thread.
#[cfg(not(target_arch = "wasm32"))]
pub async fn load_avatar(source: AvatarSource) -> anyhow::Result<LoadedAvatar> {
    tokio::task::spawn_blocking(move || parse_avatar(source))
        .await
        .context("Avatar loading task did not finish")?
}

#[cfg(target_arch = "wasm32")]
pub async fn load_avatar(source: AvatarSource) -> anyhow::Result<LoadedAvatar> {
    parse_avatar(source)
}

/// Sending half of the hand-off from loading tasks to the render thread.
#[derive(Clone, Debug)]
pub struct FinalizeSender {
    sender: UnboundedSender<LoadedAvatar>,
}

impl FinalizeSender {
    pub fn send(&self, loaded: LoadedAvatar) -> anyhow::Result<()> {
        self.sender
            .unbounded_send(loaded)
            .map_err(|_| anyhow::anyhow!("Avatar was dropped before its load finished"))
    }

    /// Loads `source` in the background and queues the result for the render thread.
    pub async fn load(&self, source: AvatarSource) -> anyhow::Result<()> {
        let loaded = load_avatar(source).await?;
        self.send(loaded)
    }
}

/// Finished loads waiting for the render thread. Draining never blocks.
#[derive(Debug)]
pub struct FinalizeQueue {
    sender: UnboundedSender<LoadedAvatar>,
    receiver: UnboundedReceiver<LoadedAvatar>,
}

impl Default for FinalizeQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl FinalizeQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    pub fn sender(&self) -> FinalizeSender {
        FinalizeSender {
            sender: self.sender.clone(),
        }
    }

    pub fn drain(&mut self) -> Vec<LoadedAvatar> {
        let mut ready = Vec::new();
        while let Some(Some(loaded)) = self.receiver.next().now_or_never() {
            ready.push(loaded);
        }
        ready
    }
}

fn animation_header(tag: &Tag) -> Option<Animation> {
    let Some(name) = tag.get_str("id") else {
        log::warn!("Skipping animation without an id");
        return None;
    };
    let length = tag.get_f32("len").unwrap_or(0.0);
    let loop_mode = tag
        .get_str("loop")
        .map(LoopMode::parse_or_default)
        .unwrap_or_default();
    Some(Animation::new(name, length, loop_mode))
}

struct ModelLoader {
    next_id: NodeId,
    texture_size: Vector2<f32>,
    animations: Vec<Animation>,
}

impl ModelLoader {
    fn load_node(&mut self, tag: &Tag) -> Option<AvatarNode> {
        let part_type = tag.get_str("pt").unwrap_or("na");
        let name = tag.get_str("nm").unwrap_or("NULL");
        if !matches!(part_type, "na" | "cub" | "msh") {
            log::warn!("Skipping part {:?} of unknown type {:?}", name, part_type);
            return None;
        }

        // ids are handed out depth-first, parents before children
        let id = self.next_id;
        self.next_id += 1;

        let mut node = match part_type {
            "cub" => AvatarNode::cuboid(id, name, cuboid_from_tag(tag, self.texture_size)),
            "msh" => AvatarNode::mesh(id, name, mesh_from_tag(tag, self.texture_size)),
            _ => {
                let children = tag
                    .get_list("chld")
                    .unwrap_or_default()
                    .iter()
                    .filter_map(|child| self.load_node(child))
                    .collect();
                AvatarNode::group(id, name, children)
            }
        };
        read_attributes(&mut node, tag);
        if node.is_group() {
            self.load_tracks(id, tag);
        }
        Some(node)
    }

    fn load_tracks(&mut self, node: NodeId, tag: &Tag) {
        for anim in tag.get_list("anims").unwrap_or_default() {
            let Some(name) = anim.get_str("id") else {
                continue;
            };
            let keyframes = load_keyframes(anim.get_list("keyf").unwrap_or_default());
            let animation = match self.animations.iter_mut().position(|a| a.name == name) {
                Some(index) => &mut self.animations[index],
                None => {
                    log::warn!("Node {} animates undeclared animation {:?}", node, name);
                    let length = keyframes.last().map_or(0.0, |k| k.time);
                    self.animations.push(Animation::new(name, length, LoopMode::Once));
                    let last = self.animations.len() - 1;
                    &mut self.animations[last]
                }
            };
            animation.set_track(node, keyframes);
        }
    }
}

fn read_attributes(node: &mut AvatarNode, tag: &Tag) {
    let identity = PartTransform::new();
    node.transform = PartTransform {
        position: tag.get_vec3("pos").unwrap_or(identity.position),
        rotation: tag.get_vec3("rot").unwrap_or(identity.rotation),
        scale: tag.get_vec3("scl").unwrap_or(identity.scale),
        pivot: tag.get_vec3("piv").unwrap_or(identity.pivot),
    };
    node.color = tag.get_vec3("col").unwrap_or(Vector3::new(1.0, 1.0, 1.0));
    node.opacity = tag.get_f32("alp").unwrap_or(1.0);
    node.visible = tag.get_bool("vsb").unwrap_or(true);
    // attachment and mimic mode only exist on groups
    if node.is_group() {
        node.attachment = tag
            .get_str("ptype")
            .map(AttachmentPoint::parse_or_default)
            .unwrap_or_default();
        node.mimic = tag.get("mmc").and_then(Tag::as_i32) == Some(1);
    }
    node.rotation_convention = tag
        .get_str("rtype")
        .map(RotationConvention::parse_or_default)
        .unwrap_or_default();
    node.shaders = tag
        .get_str("stype")
        .map(ShaderFlags::parse_or_default)
        .unwrap_or_default();
    node.texture_kind = tag
        .get_str("ttype")
        .map(TextureKind::parse_or_default)
        .unwrap_or_default();
    node.texture_resource = tag.get_str("tex").map(TextureId::parse);
    node.extra_tex = tag.get_bool("xtex").unwrap_or(true);
    node.cull = tag.get_bool("cull").unwrap_or(false);
    node.uv_offset = tag.get_vec2("uv").unwrap_or(Vector2::new(0.0, 0.0));
}

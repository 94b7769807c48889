//! Texture identifiers, decoded avatar textures and texture-source resolution.
//!
//! The renderer never touches pixel data while drawing. Layers are keyed by a
//! [`TextureId`], and the host maps those ids to whatever GPU resource it registered
//! when the avatar finished loading.

use std::fmt;

use crate::{
    data_structures::{attachment::TextureKind, node::AvatarNode},
    host::HostTextures,
};

/// Namespaced texture identifier, e.g. `minecraft:textures/entity/elytra.png`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId {
    pub namespace: String,
    pub path: String,
}

impl TextureId {
    pub fn new(namespace: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            path: path.into(),
        }
    }

    /// Parses `namespace:path`; a bare path lands in the `minecraft` namespace.
    pub fn parse(id: &str) -> Self {
        match id.split_once(':') {
            Some((namespace, path)) => Self::new(namespace, path),
            None => Self::new("minecraft", id),
        }
    }

    /// Placeholder used when nothing else resolves.
    pub fn default_placeholder() -> Self {
        Self::new("figura", "texture")
    }

    /// Placeholder for resource textures the host cannot find.
    pub fn missing() -> Self {
        Self::new("minecraft", "missingno")
    }

    pub fn default_elytra() -> Self {
        Self::new("minecraft", "textures/entity/elytra.png")
    }
}

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

/// Decoded RGBA texture owned by an avatar.
///
/// `registered` flips once the render thread handed the pixels to the host registry.
#[derive(Clone, Debug)]
pub struct AvatarTexture {
    pub id: TextureId,
    pub image: image::RgbaImage,
    pub kind: ExtraTextureKind,
    pub registered: bool,
}

impl AvatarTexture {
    pub fn size(&self) -> [u32; 2] {
        [self.image.width(), self.image.height()]
    }
}

/// The role of an avatar texture. The main texture is `Main`; everything else is an
/// extra texture drawn in a repeated texture pass on its own layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExtraTextureKind {
    #[default]
    Main,
    Emission,
}

impl ExtraTextureKind {
    pub fn parse_or_default(value: &str) -> Self {
        match value {
            "Main" | "main" => Self::Main,
            "Emission" | "emission" | "emissive" => Self::Emission,
            other => {
                log::warn!("Unknown texture role {:?}, treating it as the main texture", other);
                Self::Main
            }
        }
    }
}

/// Everything the resolver may consult for one avatar this frame.
#[derive(Clone, Copy, Default)]
pub struct TextureSources<'a> {
    /// The avatar's own texture, once registered.
    pub custom: Option<&'a TextureId>,
    /// Host lookups. `None` when the avatar is not bound to a host player at all.
    pub host: Option<&'a dyn HostTextures>,
}

/// Maps a node's texture source to a concrete identifier.
///
/// Tiers are tried in order and a tier only runs when every earlier one produced
/// nothing; the final fallback is [`TextureId::default_placeholder`].
pub fn resolve_texture(node: &AvatarNode, sources: &TextureSources<'_>) -> TextureId {
    resolve_kind(node.texture_kind, node.texture_resource.as_ref(), sources)
}

pub fn resolve_kind(
    kind: TextureKind,
    resource: Option<&TextureId>,
    sources: &TextureSources<'_>,
) -> TextureId {
    let host = sources.host;
    let player = host.and_then(|h| h.player_textures());

    let explicit = || match kind {
        TextureKind::Resource => {
            let id = resource.cloned().unwrap_or_else(TextureId::missing);
            match host {
                Some(h) if h.contains_resource(&id) => Some(id),
                _ => Some(TextureId::missing()),
            }
        }
        TextureKind::Elytra => player
            .as_ref()
            .and_then(|p| p.elytra.clone())
            .or_else(|| Some(TextureId::default_elytra())),
        TextureKind::Skin => player.as_ref().and_then(|p| p.skin.clone()),
        TextureKind::Cape => player.as_ref().and_then(|p| p.cape.clone()),
        TextureKind::Custom => None,
    };

    explicit()
        .or_else(|| sources.custom.cloned())
        .or_else(|| host.and_then(|h| h.entity_texture()))
        .unwrap_or_else(TextureId::default_placeholder)
}

//! Draw targets and render layers.
//!
//! This module defines the [`RenderLayer`] enum, which names every buffer the
//! traversal may write into, and the [`DrawTarget`] abstraction the host implements
//! to receive vertices. Some targets batch until an explicit [`DrawTarget::flush`],
//! which is why every pass flushes before the next one starts.
//!
//! # Key types
//!
//! - [`RenderLayer`] selects a buffer (textured layers carry their texture id)
//! - [`DrawTarget`] hands out per-layer [`VertexConsumer`]s and flushes them
//! - [`BufferedDrawTarget`] is a CPU-side target that records flushed batches
//!

use std::collections::HashMap;

use crate::data_structures::{texture::TextureId, vertex::AvatarVertex};

/// A custom layer supplied by a node, identified by its shader name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CustomLayer {
    pub name: String,
    pub texture: Option<TextureId>,
}

/// The buffer a vertex ends up in.
///
/// # Variants
///
/// - `Opaque`, `Translucent` and `TranslucentCull` are the regular textured layers
/// - `Emissive` is used for extra emission textures
/// - `PortalOverlay` and `GlintOverlay` are the shader-overlay layers
/// - `Lines` receives the debug boxes of the auxiliary pass
/// - `Custom` is a layer a node brings along
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RenderLayer {
    Opaque(TextureId),
    Translucent(TextureId),
    TranslucentCull(TextureId),
    Emissive(TextureId),
    PortalOverlay,
    GlintOverlay,
    Lines,
    Custom(CustomLayer),
}

impl RenderLayer {
    pub fn texture(&self) -> Option<&TextureId> {
        match self {
            RenderLayer::Opaque(id)
            | RenderLayer::Translucent(id)
            | RenderLayer::TranslucentCull(id)
            | RenderLayer::Emissive(id) => Some(id),
            RenderLayer::Custom(custom) => custom.texture.as_ref(),
            RenderLayer::PortalOverlay | RenderLayer::GlintOverlay | RenderLayer::Lines => None,
        }
    }
}

/// Chooses the textured layer for a texture id. Passes carry one of these down the
/// tree so that culling nodes and extra textures can swap it out.
pub type LayerFn = fn(TextureId) -> RenderLayer;

pub trait VertexConsumer {
    fn vertex(&mut self, vertex: AvatarVertex);
}

impl VertexConsumer for Vec<AvatarVertex> {
    fn vertex(&mut self, vertex: AvatarVertex) {
        self.push(vertex);
    }
}

/// Host draw-call submission as seen by the traversal.
pub trait DrawTarget {
    fn buffer(&mut self, layer: &RenderLayer) -> &mut dyn VertexConsumer;

    /// Presents everything accumulated since the last flush.
    fn flush(&mut self);
}

/// One flushed layer worth of vertices.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    pub layer: RenderLayer,
    pub vertices: Vec<AvatarVertex>,
}

/// Records vertices per layer and moves them into `batches` on flush, keeping the
/// order in which layers were first requested.
#[derive(Debug, Default)]
pub struct BufferedDrawTarget {
    pending: HashMap<RenderLayer, Vec<AvatarVertex>>,
    order: Vec<RenderLayer>,
    pub batches: Vec<Batch>,
    pub flushes: usize,
}

impl BufferedDrawTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.batches.iter().map(|batch| batch.vertices.len()).sum()
    }

    pub fn vertices_on(&self, layer: &RenderLayer) -> usize {
        self.batches
            .iter()
            .filter(|batch| &batch.layer == layer)
            .map(|batch| batch.vertices.len())
            .sum()
    }

    pub fn take_batches(&mut self) -> Vec<Batch> {
        std::mem::take(&mut self.batches)
    }
}

impl DrawTarget for BufferedDrawTarget {
    fn buffer(&mut self, layer: &RenderLayer) -> &mut dyn VertexConsumer {
        if !self.pending.contains_key(layer) {
            self.order.push(layer.clone());
        }
        self.pending.entry(layer.clone()).or_default()
    }

    fn flush(&mut self) {
        self.flushes += 1;
        for layer in self.order.drain(..) {
            if let Some(vertices) = self.pending.remove(&layer) {
                if !vertices.is_empty() {
                    self.batches.push(Batch { layer, vertices });
                }
            }
        }
    }
}

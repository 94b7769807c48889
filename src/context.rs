//! Explicit per-frame context.
//!
//! Everything a traversal needs from the outside world is bundled in
//! [`FrameContext`] and handed down by reference. Nothing is read from globals, so
//! two avatars can be drawn back to back (or in tests) without leaking state.

use crate::{
    customization::CustomizationTable,
    data_structures::{attachment::AttachmentPoint, texture::TextureSources},
    host::{Capabilities, Capability, HostSkeleton},
};

/// Renderer configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderSettings {
    /// Draw a wireframe box at every node pivot during the auxiliary pass.
    pub debug_hitboxes: bool,
    /// Budget in vertices used when no capability lookup is available.
    pub default_complexity: i32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            debug_hitboxes: false,
            default_complexity: 1024 * 16,
        }
    }
}

impl RenderSettings {
    /// Budget for the next frame, from the owner's capabilities when provided.
    pub fn complexity_limit(&self, capabilities: Option<&dyn Capabilities>) -> i32 {
        capabilities
            .map(|caps| caps.capability(Capability::Complexity))
            .unwrap_or(self.default_complexity)
    }
}

/// Host handles and per-frame values passed to every traversal call.
#[derive(Clone, Copy)]
pub struct FrameContext<'a> {
    /// Skeleton of the host entity the avatar is bound to, if any.
    pub skeleton: Option<&'a dyn HostSkeleton>,
    pub textures: TextureSources<'a>,
    pub customizations: Option<&'a CustomizationTable>,
    pub settings: &'a RenderSettings,
    pub light: u32,
    pub overlay: u32,
}

impl<'a> FrameContext<'a> {
    pub fn new(settings: &'a RenderSettings) -> Self {
        Self {
            skeleton: None,
            textures: TextureSources::default(),
            customizations: None,
            settings,
            light: 0,
            overlay: 0,
        }
    }
}

/// What a single render call should do.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderRequest {
    /// Compose host-skeleton bindings and every node transform. Off when the host has
    /// already positioned the stack (e.g. first-person arm rendering).
    pub apply_hidden_transforms: bool,
    /// Store each node's world matrices for later queries. Done in the main texture
    /// pass only.
    pub cache_matrices: bool,
    /// Only nodes bound to this slot (and their descendants) draw.
    pub render_only: Option<AttachmentPoint>,
}

impl RenderRequest {
    /// Full top-level avatar render.
    pub fn full() -> Self {
        Self {
            apply_hidden_transforms: true,
            cache_matrices: true,
            render_only: None,
        }
    }

    /// Draw a single body part on a stack the host prepared.
    pub fn only(slot: AttachmentPoint) -> Self {
        Self {
            apply_hidden_transforms: false,
            cache_matrices: false,
            render_only: Some(slot),
        }
    }
}

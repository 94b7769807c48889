//! avatar-ngin
//!
//! A scene-graph renderer for user-authored avatars that are overlaid on a character
//! driven by a host engine. The avatar is a tree of groups and meshes that follows the
//! host skeleton, plays keyframe animations and is drawn every frame in three budgeted
//! passes into a host-provided draw target.
//!
//! High-level modules
//! - `context`: render settings plus the explicit per-frame context and request
//! - `composer`: host-skeleton binding and per-node transform composition
//! - `customization`: side tables shared with scripting and host code
//! - `data_structures`: nodes, transforms, matrix stacks, textures, animations and the avatar model
//! - `host`: traits the host engine implements (skeleton, textures, capabilities)
//! - `render`: render layers and the draw-target abstraction
//! - `resources`: loading avatars from the serialized tag tree, off the render thread
//! - `tasks`: auxiliary render tasks attached to nodes
//! - `traversal`: the texture, shader and auxiliary passes
//!

pub mod composer;
pub mod context;
pub mod customization;
pub mod data_structures;
pub mod host;
pub mod render;
pub mod resources;
pub mod tasks;
pub mod traversal;

/// Authored positions, pivots and vertices are in model pixels, 16 to a unit.
pub const PIXELS_PER_UNIT: f32 = 16.0;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;

//! Avatar data structures: nodes, transforms, textures, animations and the model.
//!
//! - `animation` holds keyframe tracks and playback state
//! - `attachment` enumerates host attachment points and the small per-node enums
//! - `matrix_stack` is the push/pop transform accumulator used by every pass
//! - `node` is the closed group/cuboid/mesh node type
//! - `scene_graph` owns a loaded avatar and runs its frames
//! - `texture` contains texture identifiers and the texture resolver
//! - `transform` holds authored and animation transforms
//! - `vertex` is the emitted vertex record

pub mod animation;
pub mod attachment;
pub mod matrix_stack;
pub mod node;
pub mod scene_graph;
pub mod texture;
pub mod transform;
pub mod vertex;

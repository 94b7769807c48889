//! Vertex record emitted into draw targets.

use cgmath::{Vector2, Vector3, Vector4};

/// Describes how a vertex type is laid out in a GPU buffer.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

/**
 * The raw vertex as handed to the host: position, tint with opacity, uv, overlay and
 * light passthrough values and the transformed normal.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct AvatarVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub uv: [f32; 2],
    pub overlay: u32,
    pub light: u32,
    pub normal: [f32; 3],
}

impl AvatarVertex {
    pub fn new(
        position: Vector3<f32>,
        color: Vector4<f32>,
        uv: Vector2<f32>,
        overlay: u32,
        light: u32,
        normal: Vector3<f32>,
    ) -> Self {
        Self {
            position: position.into(),
            color: color.into(),
            uv: uv.into(),
            overlay,
            light,
            normal: normal.into(),
        }
    }
}

/**
 * offset: each attribute starts right after the previous one
 * stride: length of a vertex
 *
 * Stride layout: position(3) + color(4) + uv(2) + overlay + light + normal(3)
 */
impl Vertex for AvatarVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<AvatarVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 7]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 9]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Uint32,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 10]>() as wgpu::BufferAddress,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Uint32,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 11]>() as wgpu::BufferAddress,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

use std::collections::HashMap;

use anyhow::Context;
use image::{ImageFormat, load_from_memory_with_format};

use crate::{
    data_structures::texture::{AvatarTexture, ExtraTextureKind, TextureId},
    host::TextureRegistry,
};

/// Decodes PNG bytes into an unregistered avatar texture.
pub fn decode_texture(
    id: TextureId,
    kind: ExtraTextureKind,
    bytes: &[u8],
) -> anyhow::Result<AvatarTexture> {
    let image = load_from_memory_with_format(bytes, ImageFormat::Png)
        .with_context(|| format!("Could not decode texture {id}"))?
        .to_rgba8();
    log::debug!(
        "Decoded texture {} ({}x{}, {:?})",
        id,
        image.width(),
        image.height(),
        kind
    );
    Ok(AvatarTexture {
        id,
        image,
        kind,
        registered: false,
    })
}

/// Texture registry that uploads straight into wgpu textures.
pub struct GpuTextureRegistry {
    device: wgpu::Device,
    queue: wgpu::Queue,
    textures: HashMap<TextureId, wgpu::Texture>,
}

impl GpuTextureRegistry {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            textures: HashMap::new(),
        }
    }

    pub fn get(&self, id: &TextureId) -> Option<&wgpu::Texture> {
        self.textures.get(id)
    }
}

impl TextureRegistry for GpuTextureRegistry {
    fn register(&mut self, id: &TextureId, image: &image::RgbaImage) -> anyhow::Result<()> {
        let (width, height) = image.dimensions();
        anyhow::ensure!(width > 0 && height > 0, "Texture {id} is empty");

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let label = id.to_string();
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            image.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );
        self.textures.insert(id.clone(), texture);
        Ok(())
    }
}

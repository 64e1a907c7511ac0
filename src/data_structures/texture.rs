//! Decoded images and GPU textures.
//!
//! [`TextureData`] is the CPU-side result of an asset load: decoding happens
//! off the render path so the loaded image can be handed to the scene and
//! uploaded lazily. [`Texture`] wraps the WGPU texture, view and sampler.

use std::path::Path;

use anyhow::*;
use image::{DynamicImage, ImageFormat, RgbaImage, load_from_memory_with_format};

use crate::data_structures::material::Wrapping;

/// An 8-bit RGBA image ready for upload.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureData {
    pub image: RgbaImage,
}

impl TextureData {
    /// Decode raw image file contents.
    ///
    /// `format` is an optional file extension hint (e.g. "exr"). Without it
    /// the format is guessed from the bytes. High dynamic range sources are
    /// clamped to 8 bits per channel.
    pub fn from_bytes(bytes: &[u8], format: Option<&str>) -> Result<Self> {
        let img = match format.and_then(ImageFormat::from_extension) {
            None => image::load_from_memory(bytes)?,
            Some(fmt) => load_from_memory_with_format(bytes, fmt)?,
        };
        Ok(Self::from_image(&img))
    }

    pub fn from_image(img: &DynamicImage) -> Self {
        Self {
            image: img.to_rgba8(),
        }
    }

    /// Format hint derived from a path's extension.
    pub fn format_hint(path: &str) -> Option<&str> {
        Path::new(path).extension().and_then(|ext| ext.to_str())
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Returns a copy that fits into `max_dimension` on both axes, keeping
    /// the aspect ratio. `None` when it already fits.
    pub fn fit_within(&self, max_dimension: u32) -> Option<Self> {
        let (width, height) = self.dimensions();
        if width <= max_dimension && height <= max_dimension {
            return None;
        }
        let ratio = max_dimension as f64 / width.max(height) as f64;
        let new_width = ((width as f64 * ratio).floor() as u32).max(1);
        let new_height = ((height as f64 * ratio).floor() as u32).max(1);
        let resized = image::imageops::resize(
            &self.image,
            new_width,
            new_height,
            image::imageops::FilterType::Triangle,
        );
        Some(Self { image: resized })
    }

    /// Number of levels in a full mip chain down to 1x1.
    pub fn mip_level_count(&self) -> u32 {
        let (width, height) = self.dimensions();
        32 - width.max(height).max(1).leading_zeros()
    }

    /// The image followed by each smaller mip level. Level `n` is
    /// `max(1, size >> n)` on both axes.
    pub fn mip_chain(&self) -> Vec<RgbaImage> {
        let (width, height) = self.dimensions();
        let mut chain = vec![self.image.clone()];
        for level in 1..self.mip_level_count() {
            let previous = &chain[chain.len() - 1];
            let next = image::imageops::resize(
                previous,
                (width >> level).max(1),
                (height >> level).max(1),
                image::imageops::FilterType::Triangle,
            );
            chain.push(next);
        }
        chain
    }
}

/// A GPU texture with a view and optional sampler.
#[derive(Clone, Debug)]
pub struct Texture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create a depth texture for depth-testing during rendering.
    ///
    /// # Arguments
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `label` is used as a debug label for the GPU resource
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            sampler: None,
        }
    }

    /// 1x1 white texture bound while a material has no map (yet).
    ///
    /// Keeps a single shader path for textured and untextured materials.
    pub fn create_placeholder(device: &wgpu::Device, queue: &wgpu::Queue) -> Texture {
        let data = TextureData {
            image: RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255])),
        };
        Self::from_data(device, queue, &data, Some("placeholder texture"), Wrapping::ClampToEdge)
    }

    /// Upload decoded image data with its full mip chain. The image must
    /// already fit the device's texture size limit.
    pub fn from_data(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &TextureData,
        label: Option<&str>,
        wrapping: Wrapping,
    ) -> Self {
        let dimensions = data.image.dimensions();

        let size = wgpu::Extent3d {
            width: dimensions.0,
            height: dimensions.1,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: data.mip_level_count(),
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (mip_level, level) in data.mip_chain().iter().enumerate() {
            let (width, height) = level.dimensions();
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &texture,
                    mip_level: mip_level as u32,
                    origin: wgpu::Origin3d::ZERO,
                },
                level,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * width),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(create_sampler(device, wrapping));

        Self {
            texture,
            view,
            sampler,
        }
    }
}

pub fn create_sampler(device: &wgpu::Device, wrapping: Wrapping) -> wgpu::Sampler {
    let address_mode = match wrapping {
        Wrapping::Repeat => wgpu::AddressMode::Repeat,
        Wrapping::ClampToEdge => wgpu::AddressMode::ClampToEdge,
    };
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Linear,
        ..Default::default()
    })
}


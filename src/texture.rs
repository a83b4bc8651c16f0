use std::fs;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use log::{info, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to read texture {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode texture image")]
    Decode(#[from] image::ImageError),
    #[error("texture is {width}x{height}, larger than the device limit of {max}")]
    TooLarge { width: u32, height: u32, max: u32 },
}

/// Decodes an encoded image (grey, RGB or RGBA) into RGBA8 pixels.
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, TextureError> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Rejects images the device cannot hold; `max` is `max_texture_dimension_2d`.
pub fn check_size(width: u32, height: u32, max: u32) -> Result<(), TextureError> {
    if width > max || height > max {
        return Err(TextureError::TooLarge { width, height, max });
    }
    Ok(())
}

/// Sampled 2D colour texture with repeat wrapping and linear filtering.
pub struct Texture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    width: u32,
    height: u32,
}

impl Texture {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    pub fn from_path(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &Path,
    ) -> Result<Self, TextureError> {
        let bytes = fs::read(path).map_err(|source| TextureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let image = decode_rgba(&bytes)?;
        Self::from_rgba(device, queue, &path.display().to_string(), &image)
    }

    /// Loads `path`, or logs the failure and returns a 1x1 texture of `fallback`.
    pub fn load_or_solid(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &Path,
        fallback: [u8; 4],
    ) -> Self {
        match Self::from_path(device, queue, path) {
            Ok(texture) => {
                info!(
                    "loaded texture {} ({}x{})",
                    path.display(),
                    texture.width,
                    texture.height
                );
                texture
            }
            Err(err) => {
                warn!("texture failed to load at path {}: {err}", path.display());
                Self::solid(device, queue, &path.display().to_string(), fallback)
            }
        }
    }

    pub fn solid(device: &wgpu::Device, queue: &wgpu::Queue, label: &str, rgba: [u8; 4]) -> Self {
        let image = RgbaImage::from_pixel(1, 1, image::Rgba(rgba));
        Self::upload(device, queue, label, &image)
    }

    /// Uploads `image`, or fails with [`TextureError::TooLarge`] when either
    /// side exceeds the device's 2D texture limit.
    pub fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        image: &RgbaImage,
    ) -> Result<Self, TextureError> {
        let (width, height) = image.dimensions();
        check_size(width, height, device.limits().max_texture_dimension_2d)?;
        Ok(Self::upload(device, queue, label, image))
    }

    fn upload(device: &wgpu::Device, queue: &wgpu::Queue, label: &str, image: &RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        let size = wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        if width > 0 && height > 0 {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                image.as_raw(),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * width),
                    rows_per_image: Some(height),
                },
                size,
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            _texture: texture,
            view,
            sampler,
            width,
            height,
        }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{GrayImage, ImageFormat, Luma, Rgb, RgbImage, Rgba};

    use super::*;

    fn png(image: impl Into<image::DynamicImage>) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .into()
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn grey_pixels_expand_to_rgba() {
        let bytes = png(GrayImage::from_pixel(2, 1, Luma([7])));
        let decoded = decode_rgba(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (2, 1));
        assert_eq!(decoded.get_pixel(1, 0), &Rgba([7, 7, 7, 255]));
    }

    #[test]
    fn rgb_pixels_get_opaque_alpha() {
        let mut image = RgbImage::new(1, 2);
        image.put_pixel(0, 1, Rgb([10, 20, 30]));
        let decoded = decode_rgba(&png(image)).unwrap();
        assert_eq!(decoded.get_pixel(0, 1), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn rgba_pixels_pass_through() {
        let image = RgbaImage::from_pixel(3, 3, Rgba([1, 2, 3, 4]));
        let decoded = decode_rgba(&png(image)).unwrap();
        assert_eq!(decoded.get_pixel(2, 2), &Rgba([1, 2, 3, 4]));
    }

    #[test]
    fn oversized_images_are_rejected() {
        let max = wgpu::Limits::default().max_texture_dimension_2d;
        let err = check_size(9000, 1, max).unwrap_err();
        assert!(matches!(
            err,
            TextureError::TooLarge { width: 9000, height: 1, max: 8192 }
        ));
        assert!(err.to_string().contains("9000x1"));
        assert!(check_size(1, max + 1, max).is_err());
        assert!(check_size(max, max, max).is_ok());
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = decode_rgba(b"not an image").unwrap_err();
        assert!(matches!(err, TextureError::Decode(_)));
    }
}

use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;

/// An image ready to be embedded in a model request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub media_type: &'static str,
    pub data: String,
}

impl EncodedImage {
    pub fn from_bytes(bytes: &[u8], max_size_bytes: usize) -> Result<Self> {
        let (media_type, bytes) = fit_image(bytes, max_size_bytes)?;
        Ok(Self {
            media_type,
            data: general_purpose::STANDARD.encode(bytes),
        })
    }

    pub async fn from_path(path: &Path, max_size_bytes: usize) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read image {}", path.display()))?;
        Self::from_bytes(&bytes, max_size_bytes)
            .with_context(|| format!("failed to prepare image {}", path.display()))
    }
}

fn media_type_of(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::WebP => Some("image/webp"),
        _ => None,
    }
}

/// Returns the bytes unchanged when the model accepts them as-is, otherwise
/// re-encodes to JPEG, shrinking by 10% per step until under `max_size_bytes`.
pub fn fit_image(image_data: &[u8], max_size_bytes: usize) -> Result<(&'static str, Vec<u8>)> {
    let format = image::guess_format(image_data).context("unrecognized image format")?;
    if let Some(media_type) = media_type_of(format) {
        if image_data.len() <= max_size_bytes {
            return Ok((media_type, image_data.to_vec()));
        }
    }

    let image = image::load_from_memory_with_format(image_data, format)?;
    // JPEG has no alpha channel.
    let image = DynamicImage::ImageRgb8(image.to_rgb8());

    let mut current = encode_jpeg(&image)?;
    let mut width = image.width();
    let mut height = image.height();

    while current.len() > max_size_bytes {
        if width <= 100 || height <= 100 {
            anyhow::bail!("failed to resize image under {max_size_bytes} bytes");
        }
        width = (width as f32 * 0.9) as u32;
        height = (height as f32 * 0.9) as u32;

        let resized = image.resize(width, height, image::imageops::FilterType::Lanczos3);
        current = encode_jpeg(&resized)?;
        tracing::debug!(width, height, size = current.len(), "resized image");
    }

    Ok(("image/jpeg", current))
}

fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    image.write_to(&mut cursor, ImageFormat::Jpeg)?;
    Ok(cursor.into_inner())
}

pub fn is_image_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    [".jpg", ".jpeg", ".png"]
        .iter()
        .any(|ext| lower.ends_with(ext))
}

//! Image thumbnails
//!
//! Decodes a stored image, shrinks it to fit a square box and re-encodes it
//! as JPEG in memory. Nothing is cached on disk.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, RgbImage};
use log::{debug, warn};
use std::fs;
use std::ops::RangeInclusive;

use crate::error::{StorageError, StorageResult};
use crate::storage::filesystem::split_extension;
use crate::storage::validation::PathGuard;

/// Accepted edge lengths for a requested thumbnail
pub const THUMBNAIL_SIZE_RANGE: RangeInclusive<u32> = 50..=500;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];
const JPEG_QUALITY: u8 = 85;

/// True when `name` has an extension thumbnails can be made from
pub fn is_image_name(name: &str) -> bool {
    let (_, ext) = split_extension(name);
    let ext = ext.trim_start_matches('.').to_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str())
}

/// JPEG bytes of the image at `path`, fitted into a `size` x `size` box.
///
/// Fails for missing paths, folders and non-image names. Returns `None`
/// when the source exceeds `max_source_bytes` or cannot be decoded, so the
/// caller can fall back to the original file.
pub fn render_thumbnail(
    guard: &PathGuard,
    path: &str,
    size: u32,
    max_source_bytes: u64,
) -> StorageResult<Option<Vec<u8>>> {
    let full_path = guard.resolve(path)?;
    let metadata = fs::metadata(&full_path).map_err(|e| StorageError::from_io(e, &full_path))?;
    if !metadata.is_file() {
        return Err(StorageError::NotAFile(path.to_string()));
    }
    let name = full_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if !is_image_name(&name) {
        return Err(StorageError::NotAnImage(path.to_string()));
    }

    if metadata.len() > max_source_bytes {
        warn!(
            "File {} too large for thumbnail ({} bytes)",
            path,
            metadata.len()
        );
        return Ok(None);
    }

    let image = match image::open(&full_path) {
        Ok(image) => image,
        Err(e) => {
            warn!("Failed to generate thumbnail for {}: {}", path, e);
            return Ok(None);
        }
    };

    let (width, height) = image.dimensions();
    let image = if width <= size && height <= size {
        image
    } else {
        image.thumbnail(size, size)
    };
    let flattened = flatten_onto_white(&image);

    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    if let Err(e) = encoder.encode_image(&flattened) {
        warn!("Failed to encode thumbnail for {}: {}", path, e);
        return Ok(None);
    }

    debug!(
        "Thumbnail for {}: {}x{} -> {}x{}, {} bytes",
        path,
        width,
        height,
        flattened.width(),
        flattened.height(),
        out.len()
    );
    Ok(Some(out))
}

/// Drop the alpha channel by compositing over a white background
fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = u16::from(a);
        let blend = |channel: u8| {
            ((u16::from(channel) * alpha + 255 * (255 - alpha) + 127) / 255) as u8
        };
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}

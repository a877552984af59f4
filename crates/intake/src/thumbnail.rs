use image::ColorType;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;

use crate::ThumbnailError;

/// Produces a downscaled preview from an image file's bytes.
pub trait Thumbnailer: Send + Sync {
    fn thumbnail(&self, bytes: &[u8]) -> Result<Vec<u8>, ThumbnailError>;
}

/// Thumbnailer backed by the `image` crate.
///
/// Both dimensions are divided by `divisor` (never below 1 px) and the
/// result is encoded as JPEG at `quality`.
#[derive(Debug, Clone, Copy)]
pub struct ImageThumbnailer {
    pub divisor: u32,
    /// JPEG quality, 1-100.
    pub quality: u8,
}

impl Default for ImageThumbnailer {
    fn default() -> Self {
        Self {
            divisor: 2,
            quality: 50,
        }
    }
}

impl Thumbnailer for ImageThumbnailer {
    fn thumbnail(&self, bytes: &[u8]) -> Result<Vec<u8>, ThumbnailError> {
        let img = image::load_from_memory(bytes).map_err(ThumbnailError::Decode)?;

        let divisor = self.divisor.max(1);
        let width = (img.width() / divisor).max(1);
        let height = (img.height() / divisor).max(1);

        let rgb = img.resize_exact(width, height, FilterType::Triangle).to_rgb8();

        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, self.quality.clamp(1, 100))
            .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
            .map_err(ThumbnailError::Encode)?;
        Ok(out)
    }
}

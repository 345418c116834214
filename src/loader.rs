use image::DynamicImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Decoded image data (flat float samples, native channel count)
// ---------------------------------------------------------------------------

/// A decoded image as a flat `f32` buffer of length `width * height *
/// channels`, together with its finite value range. Immutable once built;
/// shared between the cache and the renderer as `Arc<FloatImage>`.
pub struct FloatImage {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub pixels: Vec<f32>,
    pub v_min: f32,
    pub v_max: f32,
}

impl FloatImage {
    pub fn from_samples(pixels: Vec<f32>, width: u32, height: u32, channels: u8) -> Self {
        debug_assert_eq!(
            pixels.len(),
            width as usize * height as usize * channels as usize
        );
        let (v_min, v_max) = finite_extrema(&pixels);
        Self {
            width,
            height,
            channels,
            pixels,
            v_min,
            v_max,
        }
    }

    /// The channel samples at integer pixel `(x, y)`, or `None` outside the
    /// image extent.
    pub fn sample(&self, x: i64, y: i64) -> Option<&[f32]> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        let nch = self.channels as usize;
        let idx = (y as usize * self.width as usize + x as usize) * nch;
        Some(&self.pixels[idx..idx + nch])
    }

    /// Mean of the channel samples at `(x, y)`.
    pub fn sample_mean(&self, x: i64, y: i64) -> Option<f64> {
        let px = self.sample(x, y)?;
        Some(px.iter().map(|&v| v as f64).sum::<f64>() / px.len() as f64)
    }
}

/// Extrema over finite samples only; NaN and infinities in the data must not
/// poison the contrast seed. Falls back to 0..1 when nothing is finite.
fn finite_extrema(samples: &[f32]) -> (f32, f32) {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &v in samples {
        if v.is_finite() {
            min = min.min(v);
            max = max.max(v);
        }
    }
    if min > max { (0.0, 1.0) } else { (min, max) }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
#[error("could not load {path}: {source}")]
pub struct LoadError {
    pub path: PathBuf,
    #[source]
    pub source: image::ImageError,
}

/// Decode `path` into float samples, keeping the file's native channel
/// shape: gray stays 1-channel, gray+alpha 2-channel, everything else is
/// flattened to RGB.
pub fn load_image(path: &Path) -> Result<FloatImage, LoadError> {
    let img = image::open(path).map_err(|source| LoadError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decode_float(img))
}

fn decode_float(img: DynamicImage) -> FloatImage {
    use image::ColorType;

    let (width, height) = (img.width(), img.height());
    match img.color() {
        ColorType::L8 | ColorType::L16 => {
            FloatImage::from_samples(img.to_luma32f().into_raw(), width, height, 1)
        }
        ColorType::La8 | ColorType::La16 => {
            FloatImage::from_samples(img.to_luma_alpha32f().into_raw(), width, height, 2)
        }
        _ => FloatImage::from_samples(img.to_rgb32f().into_raw(), width, height, 3),
    }
}

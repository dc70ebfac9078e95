//! Theme color extraction from cover art.

use crate::error::Result;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A representative color used to tint the player chrome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ThemeColor {
    pub const FALLBACK: Self = Self::new(107, 114, 128);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a `#rrggbb` hex string
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self { r, g, b })
    }

    /// CSS `rgb()` notation
    #[must_use]
    pub fn css(&self) -> String {
        self.to_string()
    }

    /// CSS `rgba()` notation with the given alpha
    #[must_use]
    pub fn css_alpha(&self, alpha: f32) -> String {
        format!("rgba({}, {}, {}, {alpha})", self.r, self.g, self.b)
    }
}

impl Default for ThemeColor {
    fn default() -> Self {
        Self::FALLBACK
    }
}

impl fmt::Display for ThemeColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

/// Decode cover bytes into an RGBA buffer
///
/// # Errors
///
/// Returns an error if the bytes are not a supported image format.
pub fn decode_cover(bytes: &[u8]) -> Result<RgbaImage> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Average color of the centered half-width, half-height region.
///
/// Channel averages are truncated. An image with no pixels gives `fallback`.
#[must_use]
pub fn extract_theme_color(image: &RgbaImage, fallback: ThemeColor) -> ThemeColor {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return fallback;
    }

    let region_w = (width / 2).max(1);
    let region_h = (height / 2).max(1);
    let x0 = width / 4;
    let y0 = height / 4;

    let mut sums = [0_u64; 3];
    for y in y0..y0 + region_h {
        for x in x0..x0 + region_w {
            let pixel = image.get_pixel(x, y);
            for (sum, channel) in sums.iter_mut().zip(pixel.0) {
                *sum += u64::from(channel);
            }
        }
    }

    let count = u64::from(region_w) * u64::from(region_h);
    let [r, g, b] = sums.map(|sum| u8::try_from(sum / count).unwrap_or(u8::MAX));
    ThemeColor::new(r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    #[test]
    fn test_uniform_red_for_any_size() {
        for n in [1, 2, 3, 7, 64] {
            let image = RgbaImage::from_pixel(n, n, Rgba([255, 0, 0, 255]));
            assert_eq!(
                extract_theme_color(&image, ThemeColor::FALLBACK),
                ThemeColor::new(255, 0, 0),
                "size {n}"
            );
        }
    }

    #[test]
    fn test_only_center_region_is_sampled() {
        // 4x4 black image with a white 2x2 center
        let mut image = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        for (x, y) in [(1, 1), (2, 1), (1, 2), (2, 2)] {
            image.put_pixel(x, y, Rgba([255, 255, 255, 255]));
        }
        assert_eq!(
            extract_theme_color(&image, ThemeColor::FALLBACK),
            ThemeColor::new(255, 255, 255)
        );
    }

    #[test]
    fn test_average_is_truncated() {
        // Center 2x2 region of a 4x4 image: values 0, 1, 1, 1 -> 3 / 4 = 0
        let mut image = RgbaImage::from_pixel(4, 4, Rgba([9, 9, 9, 255]));
        image.put_pixel(1, 1, Rgba([0, 10, 0, 255]));
        image.put_pixel(2, 1, Rgba([1, 10, 0, 255]));
        image.put_pixel(1, 2, Rgba([1, 10, 0, 255]));
        image.put_pixel(2, 2, Rgba([1, 11, 3, 255]));
        assert_eq!(
            extract_theme_color(&image, ThemeColor::FALLBACK),
            ThemeColor::new(0, 10, 0)
        );
    }

    #[test]
    fn test_empty_image_gives_fallback() {
        let image = RgbaImage::new(0, 0);
        let fallback = ThemeColor::new(1, 2, 3);
        assert_eq!(extract_theme_color(&image, fallback), fallback);
    }

    #[test]
    fn test_decode_png_cover() {
        let image = RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let decoded = decode_cover(&bytes).unwrap();
        assert_eq!(
            extract_theme_color(&decoded, ThemeColor::FALLBACK),
            ThemeColor::new(10, 20, 30)
        );
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(decode_cover(b"definitely not an image").is_err());
    }

    #[test]
    fn test_hex_and_css() {
        assert_eq!(ThemeColor::from_hex("#ff8000"), Some(ThemeColor::new(255, 128, 0)));
        assert_eq!(ThemeColor::from_hex("FF8000"), Some(ThemeColor::new(255, 128, 0)));
        assert_eq!(ThemeColor::from_hex("#fff"), None);
        assert_eq!(ThemeColor::from_hex("#gg0000"), None);
        assert_eq!(ThemeColor::new(1, 2, 3).css(), "rgb(1, 2, 3)");
        assert_eq!(ThemeColor::new(1, 2, 3).css_alpha(0.5), "rgba(1, 2, 3, 0.5)");
    }
}

//! [`PngIdenticon`]: a mirrored 5×5 grid rendered as an RGBA PNG.
//!
//! The key is hashed with SHA-256. Row `r`, column `c` of the grid is filled
//! when byte `3r + c` of the hash is even; columns 3 and 4 mirror columns 1 and
//! 0. The fill colour's hue comes from the last three hash bytes.

use sha2::{Digest, Sha256};

use super::{IdenticonError, IdenticonGenerator};

/// Cells per row and per column.
pub const GRID: usize = 5;

const CELL_PX: u32 = 40;
const MARGIN_PX: u32 = 25;

/// Width and height of the rendered image in pixels.
pub const IMAGE_SIZE: u32 = GRID as u32 * CELL_PX + 2 * MARGIN_PX;

const SATURATION: f64 = 0.7;
const LIGHTNESS: f64 = 0.5;

/// Default [`IdenticonGenerator`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PngIdenticon;

impl IdenticonGenerator for PngIdenticon {
    fn generate(&self, public_key: &str) -> Result<Vec<u8>, IdenticonError> {
        let pattern = Pattern::from_key(public_key);
        encode_png(&pattern.rasterize(), IMAGE_SIZE, IMAGE_SIZE)
    }
}

/// Which cells are filled, and with what colour.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Pattern {
    cells: [bool; GRID * GRID],
    color: [u8; 3],
}

impl Pattern {
    fn from_key(public_key: &str) -> Self {
        let hash: [u8; 32] = Sha256::digest(public_key.as_bytes()).into();

        let mut cells = [false; GRID * GRID];
        for row in 0..GRID {
            for col in 0..GRID {
                let source = if col > GRID / 2 { GRID - 1 - col } else { col };
                cells[row * GRID + col] = hash[3 * row + source] % 2 == 0;
            }
        }

        Self {
            cells,
            color: color_from_hash(&hash),
        }
    }

    fn is_filled(&self, row: usize, col: usize) -> bool {
        self.cells[row * GRID + col]
    }

    /// RGBA pixels, row-major. Unfilled cells and the margin are transparent.
    fn rasterize(&self) -> Vec<u8> {
        let size = IMAGE_SIZE as usize;
        let mut pixels = vec![0u8; size * size * 4];
        let grid_px = GRID as u32 * CELL_PX;

        for y in MARGIN_PX..MARGIN_PX + grid_px {
            for x in MARGIN_PX..MARGIN_PX + grid_px {
                let row = ((y - MARGIN_PX) / CELL_PX) as usize;
                let col = ((x - MARGIN_PX) / CELL_PX) as usize;
                if !self.is_filled(row, col) {
                    continue;
                }
                let offset = (y as usize * size + x as usize) * 4;
                pixels[offset..offset + 3].copy_from_slice(&self.color);
                pixels[offset + 3] = u8::MAX;
            }
        }
        pixels
    }
}

fn color_from_hash(hash: &[u8; 32]) -> [u8; 3] {
    let total: u32 = hash[29..].iter().map(|b| u32::from(*b)).sum();
    let hue = f64::from(total) / (3.0 * 255.0) * 360.0;
    hsl_to_rgb(hue, SATURATION, LIGHTNESS)
}

fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> [u8; 3] {
    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let sector = (hue / 60.0) % 6.0;
    let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = lightness - chroma / 2.0;
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    [channel(r), channel(g), channel(b)]
}

fn encode_png(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>, IdenticonError> {
    let mut out = Vec::new();
    match write_png(&mut out, pixels, width, height) {
        Ok(()) => Ok(out),
        Err(source) => Err(IdenticonError::Encoding {
            partial: out,
            source,
        }),
    }
}

fn write_png(
    out: &mut Vec<u8>,
    pixels: &[u8],
    width: u32,
    height: u32,
) -> Result<(), png::EncodingError> {
    let mut encoder = png::Encoder::new(out, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(pixels)?;
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    const KEY: &str = "0x04e25da6994ea2dc4ac70727e07eca153ae92bf7609db7befb7ebdceaad348f4fc55bbe90abf9501176301db5aa103fc0eb3bc3750272a26c424a10887db2a7ea8";

    #[test]
    fn same_key_gives_identical_bytes() {
        let a = PngIdenticon.generate(KEY).unwrap();
        let b = PngIdenticon.generate(KEY).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with(&PNG_SIGNATURE));
    }

    #[test]
    fn different_keys_give_different_images() {
        let a = PngIdenticon.generate(KEY).unwrap();
        let b = PngIdenticon.generate("0x04deadbeef").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn output_decodes_to_expected_dimensions() {
        let bytes = PngIdenticon.generate(KEY).unwrap();
        let decoder = png::Decoder::new(std::io::Cursor::new(bytes));
        let reader = decoder.read_info().unwrap();
        let info = reader.info();
        assert_eq!(info.width, IMAGE_SIZE);
        assert_eq!(info.height, IMAGE_SIZE);
        assert_eq!(info.color_type, png::ColorType::Rgba);
    }

    #[test]
    fn pattern_is_horizontally_mirrored() {
        let pattern = Pattern::from_key(KEY);
        for row in 0..GRID {
            assert_eq!(pattern.is_filled(row, 0), pattern.is_filled(row, 4));
            assert_eq!(pattern.is_filled(row, 1), pattern.is_filled(row, 3));
        }
    }

    #[test]
    fn margin_stays_transparent() {
        let pixels = Pattern::from_key(KEY).rasterize();
        assert!(pixels[..(MARGIN_PX * IMAGE_SIZE * 4) as usize]
            .iter()
            .all(|b| *b == 0));
    }

    #[test]
    fn hsl_primaries() {
        assert_eq!(hsl_to_rgb(0.0, 1.0, 0.5), [255, 0, 0]);
        assert_eq!(hsl_to_rgb(120.0, 1.0, 0.5), [0, 255, 0]);
        assert_eq!(hsl_to_rgb(240.0, 1.0, 0.5), [0, 0, 255]);
        assert_eq!(hsl_to_rgb(360.0, 1.0, 0.5), [255, 0, 0]);
    }

    #[test]
    fn short_pixel_buffer_reports_partial_output() {
        let err = encode_png(&[0u8; 3], 2, 2).unwrap_err();
        let partial = err.partial_output().expect("header was written before the failure");
        assert!(partial.starts_with(&PNG_SIGNATURE));
    }
}

//! QR image decoding seam.
//!
//! [`ImageDecoder`] turns a picture into the text of the first QR code found in
//! it. The production implementation delegates symbol detection and error
//! correction to the `rqrr` crate.

use image::DynamicImage;
use log::debug;

/// Error types for decode attempts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The image was readable but holds no decodable QR code.
    #[error("No QR code found in image")]
    NoCode,
    /// The bytes are not an image format we can read.
    #[error("Unreadable image: {0}")]
    Unreadable(String),
}

/// Decodes QR codes from images, enabling mock implementations for testing.
pub trait ImageDecoder: Send + Sync {
    /// Returns the payload of the first QR code found in `image`.
    fn decode(&self, image: &DynamicImage) -> Result<String, DecodeError>;

    /// Decodes an encoded image file (PNG, JPEG, ...).
    fn decode_bytes(&self, bytes: &[u8]) -> Result<String, DecodeError> {
        let image =
            image::load_from_memory(bytes).map_err(|e| DecodeError::Unreadable(e.to_string()))?;
        self.decode(&image)
    }
}

/// Decoder backed by `rqrr`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RqrrDecoder;

impl ImageDecoder for RqrrDecoder {
    fn decode(&self, image: &DynamicImage) -> Result<String, DecodeError> {
        let luma = image.to_luma8();
        let (width, height) = luma.dimensions();
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
                luma.get_pixel(x as u32, y as u32).0[0]
            });

        let grids = prepared.detect_grids();
        debug!("Detected {} candidate grid(s) in {width}x{height} image", grids.len());

        for grid in grids {
            match grid.decode() {
                Ok((_meta, content)) => return Ok(content),
                Err(e) => debug!("Grid failed to decode: {e:?}"),
            }
        }
        Err(DecodeError::NoCode)
    }
}

/// Crops `image` to a centered square of edge `scan_box`, like a viewfinder.
///
/// Images already smaller than the box are returned unchanged.
pub fn crop_to_scan_box(image: DynamicImage, scan_box: Option<u32>) -> DynamicImage {
    let Some(edge) = scan_box else {
        return image;
    };
    let (width, height) = (image.width(), image.height());
    if edge == 0 || (edge >= width && edge >= height) {
        return image;
    }

    let crop_w = edge.min(width);
    let crop_h = edge.min(height);
    let x = (width - crop_w) / 2;
    let y = (height - crop_h) / 2;
    image.crop_imm(x, y, crop_w, crop_h)
}

//! Signature image preparation
//!
//! Decodes operator-supplied image bytes, shrinks them into a bounding box
//! (never enlarging), and flattens any transparency onto white so the image
//! embeds as plain DeviceRGB.

use crate::error::Result;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use lopdf::{dictionary, Stream};

/// Decoded, scaled, opaque RGB signature pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureImage {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
}

impl SignatureImage {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Image XObject stream, Flate-compressed.
    pub fn to_stream(&self) -> Stream {
        let mut stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(self.width),
                "Height" => i64::from(self.height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            self.rgb.clone(),
        );
        if let Err(e) = stream.compress() {
            tracing::debug!(error = %e, "signature stream left uncompressed");
        }
        stream
    }
}

/// Uniform factor that fits `(w, h)` into `(max_w, max_h)`, capped at 1.
pub fn fit_scale(w: u32, h: u32, max_w: f32, max_h: f32) -> f32 {
    if w == 0 || h == 0 {
        return 1.0;
    }
    (max_w / w as f32).min(max_h / h as f32).min(1.0)
}

fn flatten_on_white(img: &DynamicImage) -> Vec<u8> {
    let rgba = img.to_rgba8();
    let mut rgb = Vec::with_capacity(rgba.as_raw().len() / 4 * 3);
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        let a = u16::from(a);
        for c in [r, g, b] {
            let blended = (u16::from(c) * a + 255 * (255 - a) + 127) / 255;
            rgb.push(blended as u8);
        }
    }
    rgb
}

/// Decode and prepare a signature for embedding.
pub fn prepare_signature(bytes: &[u8], max_width: f32, max_height: f32) -> Result<SignatureImage> {
    let img = image::load_from_memory(bytes)?;
    let (w, h) = img.dimensions();
    let scale = fit_scale(w, h, max_width, max_height);

    let img = if scale < 1.0 {
        let nw = ((w as f32 * scale).round() as u32).max(1);
        let nh = ((h as f32 * scale).round() as u32).max(1);
        img.resize_exact(nw, nh, FilterType::Lanczos3)
    } else {
        img
    };

    let (width, height) = img.dimensions();
    tracing::debug!(
        original_width = w,
        original_height = h,
        width,
        height,
        "signature prepared"
    );
    Ok(SignatureImage {
        width,
        height,
        rgb: flatten_on_white(&img),
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    /// PNG with a transparent background and an opaque black stroke.
    pub fn signature_png(width: u32, height: u32) -> Vec<u8> {
        let mut img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
        for x in 0..width {
            img.put_pixel(x, height / 2, Rgba([0, 0, 0, 255]));
        }
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }
}

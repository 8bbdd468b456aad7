// Byte-per-pixel raster mapping: each byte of the text is stored whole in one
// color channel of one pixel, in row-major order, followed by a '#' sentinel.

use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ExtendedColorType, ImageDecoder, ImageEncoder, ImageReader, Rgba, RgbaImage};
use log::debug;
use std::io::Cursor;

use crate::config::{AspectRatio, Channel};
use crate::error::{Result, StegoError};

/// End-of-data marker. Not part of the base64 alphabet.
pub const SENTINEL: u8 = b'#';

/// Largest canvas buffer (RGBA bytes) an encode may allocate.
pub const MAX_CANVAS_BYTES: u64 = 1 << 28;

/// Carrier and input file extensions the image codec is built to read.
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// True if `name` has one of [`SUPPORTED_IMAGE_EXTENSIONS`] (any case).
pub fn is_supported_image_name(name: &str) -> bool {
    std::path::Path::new(name.trim())
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            SUPPORTED_IMAGE_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

fn load_image(bytes: &[u8], apply_orientation: bool) -> Result<RgbaImage> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| StegoError::ImageDecodeFailure(e.to_string()))?;
    let mut decoder = reader
        .into_decoder()
        .map_err(|e| StegoError::ImageDecodeFailure(e.to_string()))?;
    let orientation = if apply_orientation {
        decoder.orientation().unwrap_or(Orientation::NoTransforms)
    } else {
        Orientation::NoTransforms
    };
    let mut img = DynamicImage::from_decoder(decoder).map_err(|e| StegoError::ImageDecodeFailure(e.to_string()))?;
    img.apply_orientation(orientation);
    Ok(img.to_rgba8())
}

/// Smallest canvas of roughly `ratio` shape with at least `data_len` pixels.
///
/// `width = ceil(sqrt(data_len * w / h))`, `height = ceil(width * h / w)`,
/// computed in integers so `width * height >= data_len` always holds.
/// Canvases whose RGBA buffer would exceed [`MAX_CANVAS_BYTES`] are refused.
pub fn canvas_dimensions(data_len: usize, ratio: (u32, u32)) -> Result<(u32, u32)> {
    let (rw, rh) = (ratio.0 as u128, ratio.1 as u128);
    if data_len == 0 || rw == 0 || rh == 0 {
        return Err(StegoError::CapacityOrDimensionFailure(format!(
            "cannot size a canvas for {} bytes at ratio {}:{}",
            data_len, ratio.0, ratio.1
        )));
    }
    let n = data_len as u128;

    // Float estimate, then settle on the least width with width^2 * h >= n * w.
    let mut width = ((n as f64) * (rw as f64) / (rh as f64)).sqrt().ceil() as u128;
    width = width.max(1);
    while width > 1 && (width - 1) * (width - 1) * rh >= n * rw {
        width -= 1;
    }
    while width * width * rh < n * rw {
        width += 1;
    }
    let height = ((width * rh + rw - 1) / rw).max(1);

    let too_large = || {
        StegoError::CapacityOrDimensionFailure(format!(
            "canvas {}x{} for {} bytes at ratio {}:{} is too large",
            width, height, data_len, ratio.0, ratio.1
        ))
    };
    let (w, h) = match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) => (w, h),
        _ => return Err(too_large()),
    };
    let buffer_bytes = (w as u64)
        .checked_mul(h as u64)
        .and_then(|area| area.checked_mul(4))
        .ok_or_else(too_large)?;
    if buffer_bytes > MAX_CANVAS_BYTES {
        return Err(too_large());
    }
    Ok((w, h))
}

fn write_png(canvas: RgbaImage, with_alpha: bool) -> Result<Vec<u8>> {
    let (w, h) = canvas.dimensions();
    let mut out = Cursor::new(Vec::new());
    let encoder = PngEncoder::new(&mut out);
    let written = if with_alpha {
        encoder.write_image(canvas.as_raw(), w, h, ExtendedColorType::Rgba8)
    } else {
        let rgb = DynamicImage::ImageRgba8(canvas).into_rgb8();
        encoder.write_image(rgb.as_raw(), w, h, ExtendedColorType::Rgb8)
    };
    written.map_err(|e| StegoError::ImageEncodeFailure(e.to_string()))?;
    Ok(out.into_inner())
}

/// Write `text` plus the sentinel into `channel` of a fresh canvas and return
/// it as PNG bytes.
///
/// With a carrier, the carrier is resized to the canvas and its other
/// channels are kept. Without one, each data byte is repeated across R, G and
/// B. `AspectRatio::Auto` follows the carrier's shape, or is square when there
/// is no carrier.
pub fn embed(text: &[u8], channel: Channel, aspect: AspectRatio, carrier: Option<&[u8]>) -> Result<Vec<u8>> {
    if text.is_empty() {
        return Err(StegoError::EmptyPayload);
    }
    if text.contains(&SENTINEL) {
        return Err(StegoError::ImageEncodeFailure(
            "data contains the end-of-data marker".to_string(),
        ));
    }
    let data_len = text.len() + 1;

    let carrier_img = match carrier {
        Some(bytes) => {
            let img = load_image(bytes, true)?;
            if img.width() == 0 || img.height() == 0 {
                return Err(StegoError::CapacityOrDimensionFailure("carrier image is empty".to_string()));
            }
            Some(img)
        }
        None => None,
    };

    let ratio = match (aspect.ratio(), &carrier_img) {
        (Some(r), _) => r,
        (None, Some(img)) => img.dimensions(),
        (None, None) => AspectRatio::Square.ratio().unwrap_or((1, 1)),
    };
    let (width, height) = canvas_dimensions(data_len, ratio)?;
    debug!(
        "embedding {} bytes in {} channel of a {}x{} canvas (ratio {}:{})",
        data_len, channel, width, height, ratio.0, ratio.1
    );

    let mut canvas = match &carrier_img {
        Some(img) => {
            let resized = image::imageops::resize(img, width, height, FilterType::Lanczos3);
            if resized.dimensions() != (width, height) {
                return Err(StegoError::CapacityOrDimensionFailure(format!(
                    "carrier resampled to {}x{}, expected {}x{}",
                    resized.width(),
                    resized.height(),
                    width,
                    height
                )));
            }
            resized
        }
        None => RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255])),
    };

    let c = channel.index();
    let sentinel = [SENTINEL];
    for (i, &byte) in text.iter().chain(sentinel.iter()).enumerate() {
        let x = (i % width as usize) as u32;
        let y = (i / width as usize) as u32;
        let pixel = canvas.get_pixel_mut(x, y);
        if carrier_img.is_none() {
            pixel[0] = byte;
            pixel[1] = byte;
            pixel[2] = byte;
        }
        pixel[c] = byte;
    }

    write_png(canvas, channel == Channel::Alpha)
}

/// Read `channel` of every pixel in row-major order up to the sentinel.
/// Returns the bytes before it.
pub fn extract(image_bytes: &[u8], channel: Channel) -> Result<Vec<u8>> {
    let img = load_image(image_bytes, false)?;
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(StegoError::CapacityOrDimensionFailure("image is empty".to_string()));
    }

    let c = channel.index();
    let mut text = Vec::new();
    let mut terminated = false;
    'scan: for y in 0..height {
        for x in 0..width {
            let byte = img.get_pixel(x, y)[c];
            if byte == SENTINEL {
                terminated = true;
                break 'scan;
            }
            text.push(byte);
        }
    }
    if !terminated {
        debug!("no end-of-data marker in {} channel of {}x{} image", channel, width, height);
        return Err(StegoError::EmptyPayload);
    }
    if text.is_empty() {
        return Err(StegoError::EmptyPayload);
    }
    debug!("extracted {} bytes from {} channel", text.len(), channel);
    Ok(text)
}

//! Frame annotation
//!
//! Draws a red bounding box around each matched detection and re-encodes
//! the frame as JPEG for the alert payload.

use crate::error::{Error, Result};
use crate::models::Detection;
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

const BOX_COLOR: Rgb<u8> = Rgb([220, 30, 30]);
const BOX_THICKNESS: u32 = 2;

/// Annotate `jpeg` with the matched detections' boxes
pub fn draw_detections(jpeg: &[u8], matched: &[&Detection]) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(jpeg)
        .map_err(|e| Error::DecodeFailure(format!("frame decode: {e}")))?;
    let mut frame = decoded.to_rgb8();

    for detection in matched {
        let [x, y, w, h] = detection.bbox;
        draw_rect(&mut frame, x, y, w, h);
    }

    let mut out = Cursor::new(Vec::new());
    frame
        .write_to(&mut out, ImageFormat::Jpeg)
        .map_err(|e| Error::DecodeFailure(format!("frame encode: {e}")))?;
    Ok(out.into_inner())
}

/// Hollow rectangle, clamped to the frame bounds
fn draw_rect(frame: &mut RgbImage, x: u32, y: u32, w: u32, h: u32) {
    let (fw, fh) = frame.dimensions();
    if fw == 0 || fh == 0 || w == 0 || h == 0 {
        return;
    }

    let x1 = x.min(fw - 1);
    let y1 = y.min(fh - 1);
    let x2 = x.saturating_add(w).min(fw - 1);
    let y2 = y.saturating_add(h).min(fh - 1);

    for t in 0..BOX_THICKNESS {
        for px in x1..=x2 {
            put(frame, px, y1.saturating_add(t).min(fh - 1));
            put(frame, px, y2.saturating_sub(t));
        }
        for py in y1..=y2 {
            put(frame, x1.saturating_add(t).min(fw - 1), py);
            put(frame, x2.saturating_sub(t), py);
        }
    }
}

fn put(frame: &mut RgbImage, x: u32, y: u32) {
    frame.put_pixel(x, y, BOX_COLOR);
}

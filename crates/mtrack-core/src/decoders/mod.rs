//! Label image decoders
//!
//! Support for PNG and TIFF label images. Pixel values are object labels, not
//! intensities, so decoding never rescales or converts color.

mod png;
mod tiff;


use std::collections::BTreeSet;
use std::path::Path;

use crate::error::{Result, TrackError};
use crate::models::ObjectId;

/// File extensions the decoders understand.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "tif", "tiff"];

/// One decoded label image. Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelFrame {
    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Row-major label values; `0` is background
    pub data: Vec<u32>,
}

impl LabelFrame {
    pub fn new(width: u32, height: u32, data: Vec<u32>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(TrackError::Unexpected(format!(
                "label buffer size mismatch: expected {}, got {}",
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// An all-background frame.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Distinct objects present in this frame, in id order.
    pub fn object_ids(&self) -> BTreeSet<ObjectId> {
        let mut labels: Vec<u32> = self.data.iter().copied().filter(|&v| v > 0).collect();
        labels.sort_unstable();
        labels.dedup();
        labels.into_iter().filter_map(ObjectId::from_label).collect()
    }

    pub fn max_label(&self) -> u32 {
        self.data.iter().copied().max().unwrap_or(0)
    }
}

/// Decode a label image from a file path
pub fn decode_label_image<P: AsRef<Path>>(path: P) -> Result<LabelFrame> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .ok_or_else(|| TrackError::decode(path, "no file extension found"))?;

    match extension.as_str() {
        "png" => png::decode_png(path),
        "tif" | "tiff" => tiff::decode_tiff(path),
        _ => Err(TrackError::decode(
            path,
            format!("unsupported file format: {}", extension),
        )),
    }
}

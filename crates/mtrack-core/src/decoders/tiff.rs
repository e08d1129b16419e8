//! TIFF label decoder

use std::path::Path;

use super::LabelFrame;
use crate::error::{Result, TrackError};

/// Decode a single-channel TIFF label image
pub(crate) fn decode_tiff<P: AsRef<Path>>(path: P) -> Result<LabelFrame> {
    use std::fs::File;
    use std::io::BufReader;
    use ::tiff::decoder::{Decoder, DecodingResult};

    let path = path.as_ref();
    let fail = |what: &str, e: &dyn std::fmt::Display| {
        TrackError::decode(path, format!("{what}: {e}"))
    };

    let file = File::open(path).map_err(|e| fail("failed to open TIFF file", &e))?;
    let mut decoder =
        Decoder::new(BufReader::new(file)).map_err(|e| fail("failed to create TIFF decoder", &e))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| fail("failed to get TIFF dimensions", &e))?;

    let color_type = decoder
        .colortype()
        .map_err(|e| fail("failed to get TIFF color type", &e))?;
    if !matches!(color_type, ::tiff::ColorType::Gray(_)) {
        return Err(TrackError::decode(
            path,
            format!("label TIFF must be single-channel, got {:?}", color_type),
        ));
    }

    let image_data = decoder
        .read_image()
        .map_err(|e| fail("failed to read TIFF image data", &e))?;

    let data: Vec<u32> = match image_data {
        DecodingResult::U8(buf) => buf.into_iter().map(u32::from).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(u32::from).collect(),
        DecodingResult::U32(buf) => buf,
        _ => {
            return Err(TrackError::decode(
                path,
                "only unsigned 8/16/32-bit label TIFFs are supported",
            ));
        }
    };

    LabelFrame::new(width, height, data)
}

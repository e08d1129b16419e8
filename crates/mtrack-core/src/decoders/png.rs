//! PNG label decoder

use std::path::Path;

use super::LabelFrame;
use crate::error::{Result, TrackError};

/// Decode a PNG label image
pub(crate) fn decode_png<P: AsRef<Path>>(path: P) -> Result<LabelFrame> {
    use std::fs::File;
    use std::io::BufReader;

    let path = path.as_ref();
    let fail = |what: &str, e: &dyn std::fmt::Display| {
        TrackError::decode(path, format!("{what}: {e}"))
    };

    let file = File::open(path).map_err(|e| fail("failed to open PNG file", &e))?;
    let mut decoder = ::png::Decoder::new(BufReader::new(file));
    decoder.set_transformations(::png::Transformations::IDENTITY);
    let mut reader = decoder
        .read_info()
        .map_err(|e| fail("failed to read PNG info", &e))?;

    let (width, height) = {
        let info = reader.info();
        (info.width, info.height)
    };
    let (color_type, bit_depth) = reader.output_color_type();

    let buffer_size = reader
        .output_buffer_size()
        .ok_or_else(|| TrackError::decode(path, "failed to determine PNG buffer size"))?;
    let mut buf = vec![0u8; buffer_size];
    let frame_info = reader
        .next_frame(&mut buf)
        .map_err(|e| fail("failed to read PNG frame", &e))?;
    let bytes = &buf[..frame_info.buffer_size()];

    // Color label images are read from their first channel, like a grayscale read.
    let samples = match color_type {
        ::png::ColorType::Grayscale => 1,
        ::png::ColorType::GrayscaleAlpha => 2,
        ::png::ColorType::Rgb => 3,
        ::png::ColorType::Rgba => 4,
        ::png::ColorType::Indexed => {
            return Err(TrackError::decode(path, "indexed PNG labels not supported"));
        }
    };

    let data = match bit_depth {
        ::png::BitDepth::Eight => first_channel_u8(bytes, width, height, samples),
        ::png::BitDepth::Sixteen => first_channel_u16(bytes, width, height, samples),
        other => {
            return Err(TrackError::decode(
                path,
                format!("unsupported PNG bit depth: {:?}", other),
            ));
        }
    }
    .map_err(|reason| TrackError::decode(path, reason))?;

    LabelFrame::new(width, height, data)
}

fn first_channel_u8(
    bytes: &[u8],
    width: u32,
    height: u32,
    samples: usize,
) -> std::result::Result<Vec<u32>, String> {
    let expected_len = width as usize * height as usize * samples;
    if bytes.len() != expected_len {
        return Err(format!(
            "PNG buffer size mismatch: expected {}, got {}",
            expected_len,
            bytes.len()
        ));
    }
    Ok(bytes.chunks_exact(samples).map(|px| px[0] as u32).collect())
}

fn first_channel_u16(
    bytes: &[u8],
    width: u32,
    height: u32,
    samples: usize,
) -> std::result::Result<Vec<u32>, String> {
    let expected_len = width as usize * height as usize * samples * 2;
    if bytes.len() != expected_len {
        return Err(format!(
            "PNG buffer size mismatch: expected {}, got {}",
            expected_len,
            bytes.len()
        ));
    }
    // PNG 16-bit is big-endian
    Ok(bytes
        .chunks_exact(samples * 2)
        .map(|px| u16::from_be_bytes([px[0], px[1]]) as u32)
        .collect())
}

//! Data-URI payload decoding

use base64::{engine::general_purpose::STANDARD as B64, Engine};
use tracing::debug;

use crate::{DecodeError, GrayFrame};

/// Drop an optional `<header>,` prefix (everything up to the first comma)
pub fn strip_data_uri_header(payload: &str) -> &str {
    match payload.split_once(',') {
        Some((_, body)) => body,
        None => payload,
    }
}

/// Decode a `"<header>,<base64>"` or bare base64 image into a grayscale frame
pub fn decode_data_uri(payload: &str) -> Result<GrayFrame, DecodeError> {
    let body = strip_data_uri_header(payload).trim();
    if body.is_empty() {
        return Err(DecodeError::EmptyPayload);
    }

    let bytes = B64.decode(body)?;
    if bytes.is_empty() {
        return Err(DecodeError::EmptyPayload);
    }

    let img = image::load_from_memory(&bytes)?;
    let frame = GrayFrame::from_rgb(&img.to_rgb8());
    if frame.is_empty() {
        return Err(DecodeError::EmptyImage);
    }

    debug!("Decoded {}x{} frame ({} bytes)", frame.width, frame.height, bytes.len());
    Ok(frame)
}

//! Frame Decoder for Drowsiness Detection
//!
//! Turns browser-captured still images into grayscale frames.
//! Supports:
//! - Data-URI payloads (`data:image/jpeg;base64,...`) and bare base64
//! - Any still format the `image` crate can sniff (JPEG, PNG, ...)
//! - Cropping, resizing and normalizing eye regions for the classifier

pub mod decode;
pub mod frame;

pub use decode::{decode_data_uri, strip_data_uri_header};
pub use frame::{GrayFrame, Region};

use thiserror::Error;

/// Frame decoding errors
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Empty image payload")]
    EmptyPayload,

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Unsupported or corrupt image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Decoded image has no pixels")]
    EmptyImage,
}

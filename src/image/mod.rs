//! Image codec module - data URL encoding, decoding, and remote fetch

pub mod codec;

use serde::{Deserialize, Serialize};

/// Decoded image payload: mime type plus raw bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageData {
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            bytes,
        }
    }

    /// Render as an embedded data URL
    pub fn to_data_url(&self) -> String {
        codec::data_url(&self.mime, &self.bytes)
    }

    /// File extension for the mime type, used for blob naming
    pub fn extension(&self) -> &str {
        match self.mime.as_str() {
            "image/png" => "png",
            "image/jpeg" => "jpg",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/bmp" => "bmp",
            _ => "bin",
        }
    }
}

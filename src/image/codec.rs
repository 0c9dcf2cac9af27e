//! Data URL encoding and decoding utilities
//!
//! Malformed input is always rejected with `ImageProcessingFailed` so the
//! orchestrator can classify codec problems without inspecting message text.

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::image::ImageData;

/// Encode raw image bytes into a data URL, sniffing the format
pub fn encode(bytes: &[u8]) -> Result<ImageData> {
    let mime = detect_mime(bytes).ok_or_else(|| {
        AppError::ImageProcessingFailed("Unrecognized image format".to_string())
    })?;
    Ok(ImageData::new(mime, bytes.to_vec()))
}

/// Decode a `data:image/...;base64,...` embedded representation
pub fn decode(data_url: &str) -> Result<ImageData> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| AppError::ImageProcessingFailed("Not a data URL".to_string()))?;

    let (mime, payload) = rest.split_once(";base64,").ok_or_else(|| {
        AppError::ImageProcessingFailed("Data URL is not base64 encoded".to_string())
    })?;

    if mime.is_empty() || !mime.contains('/') {
        return Err(AppError::ImageProcessingFailed(format!(
            "Invalid mime type in data URL: '{}'",
            mime
        )));
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::ImageProcessingFailed(format!("Invalid base64 data: {}", e)))?;

    Ok(ImageData::new(mime, bytes))
}

/// Check whether a string is a decodable embedded image
pub fn is_valid(data_url: &str) -> bool {
    decode(data_url).is_ok()
}

/// Build a data URL from a mime type and raw bytes
pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Fetch a remote image and return it in embedded form
///
/// Used to normalize library pose references before inference. Any fetch or
/// format problem surfaces as `ImageProcessingFailed`; no inference call has
/// been made at this point, so the failure is free of cost.
pub async fn fetch_and_encode(client: &Client, url: &str) -> Result<ImageData> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::ImageProcessingFailed(format!("Failed to fetch {}: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(AppError::ImageProcessingFailed(format!(
            "Fetching {} returned {}",
            url,
            response.status()
        )));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AppError::ImageProcessingFailed(format!("Failed to read {}: {}", url, e)))?;

    debug!(url = %url, size = bytes.len(), "Fetched pose image");

    // Magic bytes win over the Content-Type header when both are present
    let mime = detect_mime(&bytes)
        .map(str::to_string)
        .or(content_type)
        .ok_or_else(|| {
            AppError::ImageProcessingFailed(format!("{} is not a recognized image", url))
        })?;

    Ok(ImageData::new(mime, bytes.to_vec()))
}

/// Detect the image mime type from magic bytes
pub fn detect_mime(data: &[u8]) -> Option<&'static str> {
    if data.len() < 8 {
        return None;
    }

    // PNG: 89 50 4E 47 0D 0A 1A 0A
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }

    // JPEG: FF D8 FF
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }

    // GIF: GIF87a or GIF89a
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Some("image/gif");
    }

    // WebP: RIFF....WEBP
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return Some("image/webp");
    }

    // BMP: BM
    if data.starts_with(b"BM") {
        return Some("image/bmp");
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG_HEADER: [u8; 8] = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46];

    #[test]
    fn test_png_round_trip() {
        let mut bytes = PNG_HEADER.to_vec();
        bytes.extend_from_slice(b"fake png body");

        let image = encode(&bytes).unwrap();
        assert_eq!(image.mime, "image/png");

        let decoded = decode(&image.to_data_url()).unwrap();
        assert_eq!(decoded.bytes, bytes);
        assert_eq!(decoded.mime, "image/png");
    }

    #[test]
    fn test_jpeg_round_trip() {
        let mut bytes = JPEG_HEADER.to_vec();
        bytes.extend_from_slice(b"fake jpeg body");

        let image = encode(&bytes).unwrap();
        assert_eq!(image.mime, "image/jpeg");

        let decoded = decode(&image.to_data_url()).unwrap();
        assert_eq!(decoded.bytes, bytes);
        assert_eq!(decoded.mime, "image/jpeg");
    }

    #[test]
    fn test_decode_rejects_non_data_url() {
        let err = decode("https://example.com/pose.png").unwrap_err();
        assert!(matches!(err, AppError::ImageProcessingFailed(_)));
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        let err = decode("data:image/png;base64,not valid base64!!!").unwrap_err();
        assert!(matches!(err, AppError::ImageProcessingFailed(_)));
    }

    #[test]
    fn test_decode_rejects_missing_mime() {
        let err = decode("data:;base64,SGVsbG8=").unwrap_err();
        assert!(matches!(err, AppError::ImageProcessingFailed(_)));
    }

    #[test]
    fn test_is_valid() {
        assert!(is_valid("data:image/png;base64,SGVsbG8sIFdvcmxkIQ=="));
        assert!(!is_valid("SGVsbG8sIFdvcmxkIQ=="));
        assert!(!is_valid("data:image/png;base64,!!!"));
    }

    #[test]
    fn test_detect_mime() {
        assert_eq!(detect_mime(&PNG_HEADER), Some("image/png"));
        assert_eq!(detect_mime(&JPEG_HEADER), Some("image/jpeg"));
        assert_eq!(detect_mime(b"GIF89a + body"), Some("image/gif"));
        assert_eq!(detect_mime(b"RIFF1234WEBPVP8 "), Some("image/webp"));
        assert_eq!(detect_mime(b"plain text here"), None);
        assert_eq!(detect_mime(b"shrt"), None);
    }

    #[test]
    fn test_encode_rejects_unknown_format() {
        let err = encode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, AppError::ImageProcessingFailed(_)));
    }
}

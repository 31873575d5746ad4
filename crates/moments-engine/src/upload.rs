use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::ImageFormat;

use crate::EngineError;

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const NOT_AN_IMAGE_MESSAGE: &str = "请上传图片文件！";
pub const TOO_LARGE_MESSAGE: &str = "图片文件大小不能超过5MB！";

/// A user file accepted for analysis, already encoded as a data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedUpload {
    pub mime: &'static str,
    pub data_url: String,
    pub byte_len: usize,
}

/// Sniffs the content first and falls back to the file extension.
pub fn detect_image_mime(bytes: &[u8], file_name: &Path) -> Option<&'static str> {
    let format = image::guess_format(bytes).ok().or_else(|| {
        file_name
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(ImageFormat::from_extension)
    })?;
    Some(format.to_mime_type()).filter(|mime| mime.starts_with("image/"))
}

/// Applies the type and size rules, in that order, and encodes the bytes.
pub fn prepare_upload(bytes: &[u8], file_name: &Path) -> Result<PreparedUpload, EngineError> {
    let Some(mime) = detect_image_mime(bytes, file_name) else {
        return Err(EngineError::Validation(NOT_AN_IMAGE_MESSAGE.to_string()));
    };
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(EngineError::Validation(TOO_LARGE_MESSAGE.to_string()));
    }
    Ok(PreparedUpload {
        mime,
        data_url: format!("data:{mime};base64,{}", BASE64.encode(bytes)),
        byte_len: bytes.len(),
    })
}

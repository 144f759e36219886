use crate::api::errors::ApiError;
use crate::core::config::UploadSettings;
use crate::services::grading_request::ImagePayload;

/// Checks an uploaded page photo: decodable base64, an allowed MIME type and
/// the configured size limit.
pub(crate) fn validate_image(raw: &str, uploads: &UploadSettings) -> Result<ImagePayload, ApiError> {
    let image = ImagePayload::parse(raw).map_err(ApiError::BadRequest)?;

    if !uploads.allowed_image_mime_types.iter().any(|allowed| allowed == &image.mime_type) {
        return Err(ApiError::BadRequest(format!(
            "Image type '{}' is not allowed",
            image.mime_type
        )));
    }

    if image.byte_len > uploads.max_image_bytes() {
        return Err(ApiError::BadRequest(format!(
            "Image exceeds the {} MB limit",
            uploads.max_image_size_mb
        )));
    }

    Ok(image)
}

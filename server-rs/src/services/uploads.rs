use bytes::Bytes;
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::error::{AppError, AppResult};

fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Writes the image under a random name and returns its public URL path.
pub async fn save_image(config: &UploadConfig, content_type: &str, data: Bytes) -> AppResult<String> {
    let ext = extension_for(content_type).ok_or_else(|| {
        AppError::BadRequest("Only JPEG, PNG, GIF and WebP images are allowed".into())
    })?;
    if data.is_empty() {
        return Err(AppError::BadRequest("File is empty".into()));
    }
    if data.len() > config.max_bytes {
        return Err(AppError::BadRequest(format!(
            "File exceeds the {} byte limit",
            config.max_bytes
        )));
    }

    // The declared type must agree with the file's magic bytes.
    let sniffed = infer::get(&data).map(|kind| kind.mime_type());
    if sniffed != Some(content_type) {
        return Err(AppError::BadRequest(
            "File content does not match its declared image type".into(),
        ));
    }

    tokio::fs::create_dir_all(&config.dir)
        .await
        .map_err(|e| AppError::Internal(format!("create upload dir: {e}")))?;

    let file_name = format!("{}.{ext}", Uuid::new_v4());
    tokio::fs::write(config.dir.join(&file_name), &data)
        .await
        .map_err(|e| AppError::Internal(format!("write upload: {e}")))?;

    tracing::info!(file = %file_name, size = data.len(), "image uploaded");
    Ok(format!(
        "{}/{file_name}",
        config.public_path.trim_end_matches('/')
    ))
}

// Form data processing for the Video Subtitle API
//
// This module parses the multipart upload: the `file` field is streamed into the
// request's scratch directory and the optional `lang` / `source_lang` field selects
// the spoken language.

use std::path::{Path, PathBuf};

use actix_multipart::{Field, Multipart};
use futures::{StreamExt, TryStreamExt};
use log::{debug, info};
use tokio::io::AsyncWriteExt;

use crate::config::HandlerConfig;
use crate::error::ApiError;
use crate::file_utils::{file_extension, sanitize_filename, ScratchDir};
use crate::models::{is_valid_language_code, TranslateParams};

/// Upload stored on disk, ready for the pipeline
#[derive(Debug)]
pub struct StoredUpload {
    pub params: TranslateParams,
    pub path: PathBuf,
}

/// Extract the multipart form of a translation request
///
/// The file extension is checked from the field header, so a rejected upload
/// never reaches the disk. A language field is checked as soon as it is read.
///
/// # Errors
///
/// * `ApiError::NoFile` / `ApiError::EmptyFilename` when the file field is missing or unnamed
/// * `ApiError::InvalidFileType` for extensions outside the allowed set
/// * `ApiError::FileTooLarge` once more than `max_file_size` bytes were received
/// * `ApiError::InvalidLanguage` for a malformed language code
pub async fn extract_form_data(
    mut form: Multipart,
    config: &HandlerConfig,
    scratch: &ScratchDir,
) -> Result<StoredUpload, ApiError> {
    let mut language: Option<String> = None;
    let mut upload: Option<(String, PathBuf, usize)> = None;

    while let Some(mut field) = form
        .try_next()
        .await
        .map_err(|e| ApiError::form_error(e.to_string()))?
    {
        let field_name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|name| name.to_string()))
            .unwrap_or_default();

        match field_name.as_str() {
            "lang" | "source_lang" => {
                let value = read_text_field(&mut field, &field_name).await?;
                if !value.is_empty() {
                    if !is_valid_language_code(&value) {
                        return Err(ApiError::InvalidLanguage(value));
                    }
                    language = Some(value);
                }
            }
            "file" if upload.is_none() => {
                let filename = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename().map(sanitize_filename))
                    .unwrap_or_default();
                if filename.is_empty() {
                    return Err(ApiError::EmptyFilename);
                }

                let extension = file_extension(&filename).unwrap_or_default();
                if !HandlerConfig::is_allowed_extension(&extension) {
                    return Err(ApiError::InvalidFileType(extension));
                }

                let path = scratch.upload_path(&filename);
                let size = save_field(&mut field, &path, config.max_file_size).await?;
                info!(
                    "[{}] Saved upload {} ({} bytes)",
                    scratch.id(),
                    filename,
                    size
                );
                upload = Some((filename, path, size));
            }
            _ => {
                debug!("Ignoring form field '{}'", field_name);
                while field.next().await.is_some() {}
            }
        }
    }

    let (filename, path, file_size) = upload.ok_or(ApiError::NoFile)?;
    if file_size == 0 {
        return Err(ApiError::form_error("Uploaded file is empty"));
    }

    let source_language = language.unwrap_or_else(|| config.default_language.clone());
    if !is_valid_language_code(&source_language) {
        return Err(ApiError::InvalidLanguage(source_language));
    }

    Ok(StoredUpload {
        params: TranslateParams {
            source_language,
            filename,
            file_size,
        },
        path,
    })
}

async fn read_text_field(field: &mut Field, field_name: &str) -> Result<String, ApiError> {
    let mut value = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| {
            ApiError::form_error(format!("Error reading field {}: {}", field_name, e))
        })?;
        value.extend_from_slice(&chunk);
    }
    let value = String::from_utf8(value)
        .map_err(|_| ApiError::form_error(format!("Field {} is not valid UTF-8", field_name)))?;
    Ok(value.trim().to_string())
}

/// Stream a field to `path`, enforcing the size cap; returns the byte count
async fn save_field(
    field: &mut Field,
    path: &Path,
    max_file_size: usize,
) -> Result<usize, ApiError> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut total_size = 0;

    while let Some(chunk) = field.next().await {
        let data = chunk
            .map_err(|e| ApiError::form_error(format!("Error processing file upload: {}", e)))?;

        total_size += data.len();
        if total_size > max_file_size {
            return Err(ApiError::FileTooLarge(total_size, max_file_size));
        }

        file.write_all(&data).await?;
    }

    file.flush().await?;
    Ok(total_size)
}

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;

use crate::error::ApiError;

/// Form field carrying the statement.
pub const FILE_FIELD: &str = "pdf";

/// An uploaded file with its data and metadata.
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Pull the `pdf` field out of a multipart upload. Other fields are drained
/// and ignored. A file larger than `max_bytes` is rejected with 413.
pub async fn parse_multipart(
    mut multipart: Multipart,
    max_bytes: usize,
) -> Result<UploadedFile, ApiError> {
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await.map_err(read_error)? {
        let name = field.name().unwrap_or("").to_string();

        if name == FILE_FIELD {
            let filename = field.file_name().unwrap_or("upload.pdf").to_string();
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await.map_err(read_error)?.to_vec();
            if data.len() > max_bytes {
                return Err(too_large());
            }

            file = Some(UploadedFile {
                filename,
                content_type,
                data,
            });
        } else {
            field.bytes().await.map_err(read_error)?;
        }
    }

    let file = file.ok_or_else(|| ApiError::BadRequest("PDF файл не загружен".into()))?;

    if file.content_type.as_deref() != Some("application/pdf") {
        return Err(ApiError::BadRequest(
            "Файл должен быть в формате PDF".into(),
        ));
    }

    tracing::info!(
        filename = %file.filename,
        bytes = file.data.len(),
        "PDF uploaded"
    );
    Ok(file)
}

fn read_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large()
    } else {
        ApiError::BadRequest(format!("Не удалось прочитать загруженный файл: {}", e.body_text()))
    }
}

fn too_large() -> ApiError {
    ApiError::PayloadTooLarge("Файл слишком большой".into())
}

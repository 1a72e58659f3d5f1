use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use expensis_core::{AnalysisError, CompletionError, ExtractionError};

use crate::models::ErrorBody;

/// Request failures with their HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Extraction(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Extraction(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Analysis(AnalysisError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Analysis(AnalysisError::Completion(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        let (error, details) = match self {
            ApiError::BadRequest(message) | ApiError::PayloadTooLarge(message) => {
                (message.clone(), None)
            }
            ApiError::Analysis(AnalysisError::Validation(message)) => (
                "Выписка должна быть массивом транзакций с полями: дата, сумма, операция, детали"
                    .to_string(),
                Some(message.clone()),
            ),
            ApiError::Analysis(AnalysisError::Completion(e)) => (
                "Ошибка при анализе выписки".to_string(),
                Some(upstream_detail(e)),
            ),
            ApiError::Extraction(e) => (extraction_message(e).to_string(), extraction_detail(e)),
        };
        ErrorBody { error, details }
    }
}

fn extraction_message(e: &ExtractionError) -> &'static str {
    match e {
        ExtractionError::ExtractionFailed(_) => {
            "Не удалось извлечь текст из PDF. Убедитесь, что файл не поврежден."
        }
        ExtractionError::Render(_) => "Не удалось конвертировать PDF в изображения",
        ExtractionError::NoContent => "Не удалось извлечь изображения из PDF",
        ExtractionError::OcrFailed(_) => "Не удалось извлечь текст из изображений PDF с помощью OCR",
        ExtractionError::NoTextRecognized => {
            "OCR не смог извлечь текст из изображений PDF. Возможно, изображения низкого качества или не содержат текста."
        }
        ExtractionError::Completion(_) => "Не удалось извлечь структурированные данные из PDF",
        ExtractionError::NoTransactionsExtracted => {
            "Не удалось извлечь транзакции из PDF. Убедитесь, что файл содержит банковскую выписку с транзакциями."
        }
        ExtractionError::Task(_) => "Ошибка при обработке PDF файла",
    }
}

fn extraction_detail(e: &ExtractionError) -> Option<String> {
    match e {
        ExtractionError::NoContent
        | ExtractionError::NoTextRecognized
        | ExtractionError::NoTransactionsExtracted => None,
        ExtractionError::Completion(inner) => Some(upstream_detail(inner)),
        other => Some(other.to_string()),
    }
}

/// Echo the upstream status and body so callers can tell a bad key from an
/// outage.
fn upstream_detail(e: &CompletionError) -> String {
    match e {
        CompletionError::Status { status, body } => {
            format!("completion endpoint returned {status}: {body}")
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}

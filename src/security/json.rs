use std::error::Error as StdError;

use axum::{
    async_trait,
    body::to_bytes,
    extract::{FromRequest, Request},
    http::{HeaderMap, header::CONTENT_LENGTH, header::CONTENT_TYPE},
};
use http_body_util::LengthLimitError;
use serde::de::DeserializeOwned;
use serde_json::{self, Deserializer};

use crate::errors::AppError;

pub const MAX_BODY_SIZE_BYTES: usize = 64 * 1024; // 64 KiB upper bound for request bodies

/// JSON body extractor that checks the content type, bounds the body size and
/// reports the path of the first field that failed to deserialize.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        validate_content_type(req.headers())?;
        validate_content_length(req.headers())?;

        let body_bytes = to_bytes(req.into_body(), MAX_BODY_SIZE_BYTES)
            .await
            .map_err(body_error)?;

        let mut deserializer = Deserializer::from_slice(body_bytes.as_ref());
        let result = serde_path_to_error::deserialize(&mut deserializer).map_err(parsing_error)?;

        deserializer
            .end()
            .map_err(|err| AppError::InvalidJson(format!("unexpected trailing data: {err}")))?;

        Ok(ValidatedJson(result))
    }
}

// A chunked body carries no Content-Length, so the limit is only hit while reading.
fn body_error(err: axum::Error) -> AppError {
    let mut source: Option<&(dyn StdError + 'static)> = Some(&err);
    while let Some(current) = source {
        if current.is::<LengthLimitError>() {
            return AppError::PayloadTooLarge;
        }
        source = current.source();
    }
    AppError::InvalidJson(format!("failed to read request body: {err}"))
}

fn parsing_error(err: serde_path_to_error::Error<serde_json::Error>) -> AppError {
    let path = err.path().to_string();
    let error = err.into_inner();
    if path.is_empty() || path == "." {
        AppError::InvalidJson(error.to_string())
    } else {
        AppError::InvalidJson(format!("at {path}: {error}"))
    }
}

fn validate_content_type(headers: &HeaderMap) -> Result<(), AppError> {
    if let Some(value) = headers.get(CONTENT_TYPE)
        && let Ok(value) = value.to_str()
        && (value.starts_with("application/json") || value.ends_with("+json"))
    {
        return Ok(());
    }

    Err(AppError::UnsupportedMediaType)
}

fn validate_content_length(headers: &HeaderMap) -> Result<(), AppError> {
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok());

    match declared {
        Some(length) if length > MAX_BODY_SIZE_BYTES => Err(AppError::PayloadTooLarge),
        _ => Ok(()),
    }
}

use axum::extract::{rejection::JsonRejection, FromRequest};

use crate::error::AppError;

/// `axum::Json` whose rejections use the `AppError` body instead of axum's
/// plain-text 4xx.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

//! Request extractors shared by the handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};

use crate::http::error::AppError;

/// `axum::Json` with rejections mapped to [`AppError::Validation`].
///
/// A malformed body, wrong content type, or out-of-range field answers 400
/// like every other validation failure, instead of axum's default 415/422.
#[derive(Debug)]
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(AppError::Validation(rejection.body_text())),
        }
    }
}

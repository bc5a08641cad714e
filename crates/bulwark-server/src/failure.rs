use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::response::{IntoResponse, Response};
use bulwark_core::{AppError, Failure, FailureRecord};
use http::StatusCode;
use serde::de::DeserializeOwned;

/// A failed request, rendered by the error pipeline layer
///
/// Handlers return `Result<_, ApiError>`. The response produced here is a
/// placeholder: it carries the [`Failure`] in its extensions and the
/// pipeline layer replaces it with the environment-appropriate body.
#[derive(Debug)]
pub struct ApiError(pub Failure);

impl ApiError {
    pub const fn failure(&self) -> &Failure {
        &self.0
    }

    pub fn into_failure(self) -> Failure {
        self.0
    }
}

impl From<Failure> for ApiError {
    fn from(failure: Failure) -> Self {
        Self(failure)
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        Self(Failure::Operational(error))
    }
}

impl From<FailureRecord> for ApiError {
    #[track_caller]
    fn from(record: FailureRecord) -> Self {
        Self(Failure::from(record))
    }
}

impl From<anyhow::Error> for ApiError {
    #[track_caller]
    fn from(error: anyhow::Error) -> Self {
        Self(Failure::from_error(&*error))
    }
}

impl From<JsonRejection> for ApiError {
    #[track_caller]
    fn from(rejection: JsonRejection) -> Self {
        Self(AppError::new(rejection.body_text(), rejection.status().as_u16()).into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        response.extensions_mut().insert(self.0);
        response
    }
}

/// JSON extractor whose rejections become operational failures
///
/// A body over the configured limit fails with 413, malformed JSON with 400.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T, S> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(request, state).await?;
        Ok(Self(value))
    }
}

use std::any::Any;

use axum::response::{IntoResponse, Response};
use bulwark_core::failure::UnknownFailure;
use tower_http::catch_panic::CatchPanicLayer;

use crate::failure::ApiError;

type PanicHandler = fn(Box<dyn Any + Send + 'static>) -> Response;

/// Turn a panicking handler into an unclassified failure
pub fn catch_panic_layer() -> CatchPanicLayer<PanicHandler> {
    CatchPanicLayer::custom(panic_to_failure as PanicHandler)
}

fn panic_to_failure(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("handler panicked");

    ApiError::from(bulwark_core::Failure::from(UnknownFailure::new(message).with_name("Panic"))).into_response()
}

//! Failure classification and the terminal error pipeline
//!
//! Handlers and middlewares signal failure with values convertible into
//! [`Failure`]. The [`ErrorPipeline`] turns each failure into exactly one
//! JSON response, disclosing detail according to the [`Environment`].

#![allow(clippy::must_use_candidate)]

mod environment;
mod error;
pub mod failure;
mod pipeline;

pub use environment::{Disclosure, Environment};
pub use error::{AppError, StatusClass, Trace};
pub use failure::{
    CastFailure, DuplicateKeyFailure, Failure, FailureRecord, FieldMessage, UnknownFailure, ValidationFailure,
};
pub use pipeline::{Disposition, ErrorBody, ErrorPipeline, GENERIC_MESSAGE, ResponseSink, SinkError, classify};

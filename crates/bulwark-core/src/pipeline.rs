//! Terminal error-handling stage
//!
//! Every failed request passes through [`ErrorPipeline::handle`] exactly
//! once. The pipeline classifies the failure, decides how much of it the
//! caller may see, and writes a single JSON response through a
//! [`ResponseSink`].

use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::environment::{Disclosure, Environment};
use crate::error::{AppError, StatusClass};
use crate::failure::{Failure, FailureRecord};

/// Message returned for every unclassified failure outside development
pub const GENERIC_MESSAGE: &str = "Something went very wrong!";

/// JSON body of every failure response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub status: StatusClass,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// Errors a sink reports while writing a response
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The peer went away before the response was written
    #[error("connection closed")]
    Closed,

    /// The response could not be written
    #[error("failed to write response: {0}")]
    Write(String),
}

/// Response handle the pipeline writes through
pub trait ResponseSink {
    /// Whether the response has already begun transmission
    fn already_sent(&self) -> bool;

    /// Set the response status
    fn write_status(&mut self, status: StatusCode) -> Result<(), SinkError>;

    /// Write the JSON body, completing the response
    fn write_json(&mut self, body: &ErrorBody) -> Result<(), SinkError>;

    /// Abandon the response and close the connection
    fn close(&mut self);
}

/// What the pipeline did with a failure
#[derive(Debug)]
pub enum Disposition {
    /// A response with this status was written
    Responded(StatusCode),
    /// The response was already under way; the failure is handed back to the
    /// transport layer untouched
    Forwarded(Failure),
    /// Writing failed and the connection was closed
    Closed,
}

/// Error pipeline bound to a deployment environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorPipeline {
    environment: Environment,
}

impl ErrorPipeline {
    pub const fn new(environment: Environment) -> Self {
        Self { environment }
    }

    pub const fn environment(&self) -> Environment {
        self.environment
    }

    /// Handle a failure, writing at most one response through `sink`
    pub fn handle<S>(&self, failure: Failure, sink: &mut S) -> Disposition
    where
        S: ResponseSink + ?Sized,
    {
        if sink.already_sent() {
            tracing::debug!(kind = failure.kind(), "response already sent, forwarding failure");
            return Disposition::Forwarded(failure);
        }

        let (status, body) = self.render(failure);

        let written = sink.write_status(status).and_then(|()| sink.write_json(&body));
        match written {
            Ok(()) => Disposition::Responded(status),
            Err(error) => {
                tracing::warn!(%error, %status, "failed to write error response, closing connection");
                sink.close();
                Disposition::Closed
            }
        }
    }

    /// Build the status and body for a failure without writing anything
    pub fn render(&self, failure: Failure) -> (StatusCode, ErrorBody) {
        match self.environment.disclosure() {
            Disclosure::Full => disclose_full(&failure),
            Disclosure::Filtered => disclose_filtered(classify(failure)),
        }
    }
}

/// Rewrite recognized persistence failures into operational errors
pub fn classify(failure: Failure) -> Failure {
    match failure {
        Failure::Cast(cast) => {
            AppError::new(format!("Invalid {}: {}!", cast.path, display_value(&cast.value)), 400).into()
        }
        Failure::DuplicateKey(duplicate) => match duplicate.first_entry() {
            Some((key, value)) => AppError::new(
                format!("{} already in use. Please use another {key}!", display_value(value)),
                400,
            )
            .into(),
            None => Failure::DuplicateKey(duplicate),
        },
        Failure::Validation(validation) => AppError::new(validation.joined_messages(), 400).into(),
        other => other,
    }
}

fn disclose_full(failure: &Failure) -> (StatusCode, ErrorBody) {
    tracing::error!(
        kind = failure.kind(),
        status_code = failure.status_code(),
        detail = failure.message(),
        trace = %failure.trace(),
        "request failed"
    );

    let body = ErrorBody {
        status: failure.status_class(),
        message: failure.message().to_owned(),
        error: Some(failure.to_record()),
        stack: Some(failure.trace().render()),
    };

    (response_status(failure.status_code()), body)
}

fn disclose_filtered(failure: Failure) -> (StatusCode, ErrorBody) {
    if let Failure::Operational(error) = failure {
        let body = ErrorBody {
            status: error.status_class(),
            message: error.message().to_owned(),
            error: None,
            stack: None,
        };
        return (response_status(error.status_code()), body);
    }

    tracing::error!(
        kind = failure.kind(),
        detail = failure.message(),
        record = ?failure.to_record(),
        trace = %failure.trace(),
        "unclassified failure"
    );

    let body = ErrorBody {
        status: StatusClass::Error,
        message: GENERIC_MESSAGE.to_owned(),
        error: None,
        stack: None,
    };

    (StatusCode::INTERNAL_SERVER_ERROR, body)
}

/// Codes `http` cannot represent fall back to 500
fn response_status(status_code: u16) -> StatusCode {
    StatusCode::from_u16(status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

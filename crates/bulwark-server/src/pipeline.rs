use axum::body::{Body, Bytes, HttpBody};
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use bulwark_core::{Disposition, ErrorBody, ErrorPipeline, Failure, ResponseSink, SinkError};
use http::header::{CONNECTION, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, StatusCode};

/// Outermost failure stage
///
/// Any response carrying a [`Failure`] in its extensions is handed to the
/// pipeline and replaced by the rendered error response. Headers set by
/// inner layers (such as `retry-after`) are kept.
pub async fn error_pipeline_middleware(pipeline: ErrorPipeline, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let (mut parts, body) = response.into_parts();

    let Some(failure) = parts.extensions.remove::<Failure>() else {
        return Response::from_parts(parts, body);
    };

    let committed = body.size_hint().exact() != Some(0);
    let mut sink = HttpResponseSink::new(parts.headers.clone(), committed);

    match pipeline.handle(failure, &mut sink) {
        Disposition::Forwarded(failure) => {
            tracing::error!(
                kind = failure.kind(),
                detail = failure.message(),
                trace = %failure.trace(),
                "failure raised after the response was produced, forwarding"
            );
            Response::from_parts(parts, body)
        }
        Disposition::Responded(_) | Disposition::Closed => sink.into_response(),
    }
}

/// [`ResponseSink`] that assembles an axum [`Response`]
#[derive(Debug)]
pub struct HttpResponseSink {
    headers: HeaderMap,
    status: StatusCode,
    body: Option<Bytes>,
    committed: bool,
    closed: bool,
}

impl HttpResponseSink {
    /// Start a response that keeps `headers`
    ///
    /// A `committed` sink reports the response as already sent.
    pub fn new(mut headers: HeaderMap, committed: bool) -> Self {
        headers.remove(CONTENT_TYPE);
        headers.remove(CONTENT_LENGTH);

        Self {
            headers,
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: None,
            committed,
            closed: false,
        }
    }

    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn into_response(self) -> Response {
        let body = match self.body {
            Some(bytes) if !self.closed => Body::from(bytes),
            _ => Body::empty(),
        };

        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;

        if self.closed {
            response.headers_mut().insert(CONNECTION, HeaderValue::from_static("close"));
        }

        response
    }
}

impl ResponseSink for HttpResponseSink {
    fn already_sent(&self) -> bool {
        self.committed || self.body.is_some()
    }

    fn write_status(&mut self, status: StatusCode) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::Closed);
        }

        self.status = status;
        Ok(())
    }

    fn write_json(&mut self, body: &ErrorBody) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::Closed);
        }

        let bytes = serde_json::to_vec(body).map_err(|e| SinkError::Write(e.to_string()))?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(Bytes::from(bytes));
        Ok(())
    }

    fn close(&mut self) {
        self.body = None;
        self.closed = true;
    }
}

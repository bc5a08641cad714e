//! Normalized failure shapes
//!
//! Every failure handed to the error pipeline is first converted into the
//! closed [`Failure`] union. Raw persistence-layer failures arrive either as
//! one of the typed variants or as a loosely-typed [`FailureRecord`], which is
//! recognized by its structural signature.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, StatusClass, Trace};

/// Error code the document store reports for a unique index violation
pub const DUPLICATE_KEY_CODE: i64 = 11000;

const DUPLICATE_KEY_CODE_F64: f64 = 11000.0;

/// Record name of a failed schema cast
pub const CAST_ERROR: &str = "CastError";

/// Record name of a failed schema validation
pub const VALIDATION_ERROR: &str = "ValidationError";

/// Status code used whenever a failure does not carry one
pub const DEFAULT_STATUS_CODE: u16 = 500;

/// A value could not be cast to the type its schema path expects
#[derive(Debug, Clone)]
pub struct CastFailure {
    pub path: String,
    pub value: Value,
    pub message: String,
    pub trace: Trace,
}

impl CastFailure {
    #[track_caller]
    pub fn new(path: impl Into<String>, value: impl Into<Value>) -> Self {
        let path = path.into();
        let value = value.into();
        let message = format!("Cast failed for value {value} at path \"{path}\"");

        Self {
            path,
            value,
            message,
            trace: Trace::capture(),
        }
    }
}

/// A write collided with a unique index
#[derive(Debug, Clone)]
pub struct DuplicateKeyFailure {
    /// Offending field values, in the order the store reported them
    pub key_value: IndexMap<String, Value>,
    pub message: String,
    pub trace: Trace,
}

impl DuplicateKeyFailure {
    #[track_caller]
    pub fn new(key_value: IndexMap<String, Value>) -> Self {
        let keys = key_value.keys().map(String::as_str).collect::<Vec<_>>().join(", ");
        let message = format!("E{DUPLICATE_KEY_CODE} duplicate key error on {{ {keys} }}");

        Self {
            key_value,
            message,
            trace: Trace::capture(),
        }
    }

    /// First offending `(field, value)` pair
    pub fn first_entry(&self) -> Option<(&str, &Value)> {
        self.key_value.first().map(|(key, value)| (key.as_str(), value))
    }
}

/// One or more fields failed schema validation
#[derive(Debug, Clone)]
pub struct ValidationFailure {
    /// Field name to validation message, in declaration order
    pub errors: IndexMap<String, String>,
    pub message: String,
    pub trace: Trace,
}

impl ValidationFailure {
    #[track_caller]
    pub fn new(errors: IndexMap<String, String>) -> Self {
        let details = errors
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            message: format!("Validation failed: {details}"),
            errors,
            trace: Trace::capture(),
        }
    }

    /// All field messages joined the way they are disclosed to callers
    pub fn joined_messages(&self) -> String {
        self.errors.values().map(String::as_str).collect::<Vec<_>>().join(". ")
    }
}

/// Anything not anticipated by application logic
#[derive(Debug, Clone)]
pub struct UnknownFailure {
    pub name: Option<String>,
    pub code: Option<Value>,
    pub message: String,
    pub status_code: Option<u16>,
    pub status_class: Option<StatusClass>,
    pub trace: Trace,
}

impl UnknownFailure {
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            name: None,
            code: None,
            message: message.into(),
            status_code: None,
            status_class: None,
            trace: Trace::capture(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub const fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }
}

/// Closed set of failure shapes the error pipeline understands
#[derive(Debug, Clone)]
pub enum Failure {
    Cast(CastFailure),
    DuplicateKey(DuplicateKeyFailure),
    Validation(ValidationFailure),
    Operational(AppError),
    Unknown(UnknownFailure),
}

impl Failure {
    /// Wrap an arbitrary message as an unanticipated failure
    #[track_caller]
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown(UnknownFailure::new(message))
    }

    /// Wrap any error type as an unanticipated failure
    #[track_caller]
    pub fn from_error(error: &dyn std::error::Error) -> Self {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }

        Self::unknown(message)
    }

    /// Status code, defaulting to 500 when the failure carries none
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Operational(error) => error.status_code(),
            Self::Unknown(unknown) => unknown.status_code.unwrap_or(DEFAULT_STATUS_CODE),
            Self::Cast(_) | Self::DuplicateKey(_) | Self::Validation(_) => DEFAULT_STATUS_CODE,
        }
    }

    /// Status class, defaulting to `ERROR` when the failure carries none
    pub fn status_class(&self) -> StatusClass {
        match self {
            Self::Operational(error) => error.status_class(),
            Self::Unknown(unknown) => unknown.status_class.unwrap_or_default(),
            Self::Cast(_) | Self::DuplicateKey(_) | Self::Validation(_) => StatusClass::Error,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Cast(cast) => &cast.message,
            Self::DuplicateKey(duplicate) => &duplicate.message,
            Self::Validation(validation) => &validation.message,
            Self::Operational(error) => error.message(),
            Self::Unknown(unknown) => &unknown.message,
        }
    }

    pub const fn trace(&self) -> &Trace {
        match self {
            Self::Cast(cast) => &cast.trace,
            Self::DuplicateKey(duplicate) => &duplicate.trace,
            Self::Validation(validation) => &validation.trace,
            Self::Operational(error) => error.trace(),
            Self::Unknown(unknown) => &unknown.trace,
        }
    }

    pub const fn is_operational(&self) -> bool {
        matches!(self, Self::Operational(_))
    }

    /// Short label for log fields
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Cast(_) => "cast",
            Self::DuplicateKey(_) => "duplicate_key",
            Self::Validation(_) => "validation",
            Self::Operational(_) => "operational",
            Self::Unknown(_) => "unknown",
        }
    }

    /// Render the normalized record disclosed in development
    pub fn to_record(&self) -> FailureRecord {
        let mut record = FailureRecord {
            message: Some(self.message().to_owned()),
            status_code: Some(self.status_code()),
            status: Some(self.status_class()),
            is_operational: Some(self.is_operational()),
            ..FailureRecord::default()
        };

        match self {
            Self::Cast(cast) => {
                record.name = Some(CAST_ERROR.to_owned());
                record.path = Some(cast.path.clone());
                record.value = Some(cast.value.clone());
            }
            Self::DuplicateKey(duplicate) => {
                record.code = Some(Value::from(DUPLICATE_KEY_CODE));
                record.key_value = Some(duplicate.key_value.clone());
            }
            Self::Validation(validation) => {
                record.name = Some(VALIDATION_ERROR.to_owned());
                record.errors = Some(
                    validation
                        .errors
                        .iter()
                        .map(|(field, message)| (field.clone(), FieldMessage::from(message.as_str())))
                        .collect(),
                );
            }
            Self::Operational(_) => {
                record.name = Some("AppError".to_owned());
            }
            Self::Unknown(unknown) => {
                record.name.clone_from(&unknown.name);
                record.code.clone_from(&unknown.code);
            }
        }

        record
    }
}

impl From<AppError> for Failure {
    fn from(error: AppError) -> Self {
        Self::Operational(error)
    }
}

impl From<CastFailure> for Failure {
    fn from(failure: CastFailure) -> Self {
        Self::Cast(failure)
    }
}

impl From<DuplicateKeyFailure> for Failure {
    fn from(failure: DuplicateKeyFailure) -> Self {
        Self::DuplicateKey(failure)
    }
}

impl From<ValidationFailure> for Failure {
    fn from(failure: ValidationFailure) -> Self {
        Self::Validation(failure)
    }
}

impl From<UnknownFailure> for Failure {
    fn from(failure: UnknownFailure) -> Self {
        Self::Unknown(failure)
    }
}

/// Loosely-typed failure record, as produced by document-store drivers
///
/// Every field is optional. Also the shape of the `error` object disclosed
/// in development responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_value: Option<IndexMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<IndexMap<String, FieldMessage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_operational: Option<bool>,
}

/// Validation message attached to a single field
///
/// Accepts either a bare string or an object with a `message` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawFieldMessage")]
pub struct FieldMessage {
    pub message: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFieldMessage {
    Text(String),
    Detailed { message: String },
}

impl From<RawFieldMessage> for FieldMessage {
    fn from(raw: RawFieldMessage) -> Self {
        match raw {
            RawFieldMessage::Text(message) | RawFieldMessage::Detailed { message } => Self { message },
        }
    }
}

impl From<&str> for FieldMessage {
    fn from(message: &str) -> Self {
        Self {
            message: message.to_owned(),
        }
    }
}

/// Structural signatures recognized on raw records, in match order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    Cast,
    DuplicateKey,
    Validation,
}

impl Signature {
    /// Every signature the record carries, in fixed match order
    pub fn detect(record: &FailureRecord) -> Vec<Self> {
        let mut matched = Vec::with_capacity(3);

        if record.name.as_deref() == Some(CAST_ERROR) {
            matched.push(Self::Cast);
        }
        if record.code.as_ref().is_some_and(is_duplicate_key_code)
            && record.key_value.as_ref().is_some_and(|key_value| !key_value.is_empty())
        {
            matched.push(Self::DuplicateKey);
        }
        if record.name.as_deref() == Some(VALIDATION_ERROR) {
            matched.push(Self::Validation);
        }

        matched
    }
}

/// Numeric equality, so `11000` and `11000.0` both match
fn is_duplicate_key_code(code: &Value) -> bool {
    code.as_f64()
        .is_some_and(|code| (code - DUPLICATE_KEY_CODE_F64).abs() < f64::EPSILON)
}

impl From<FailureRecord> for Failure {
    #[track_caller]
    fn from(record: FailureRecord) -> Self {
        let trace = Trace::capture();
        let matched = Signature::detect(&record);

        if matched.len() > 1 {
            tracing::warn!(
                signatures = ?matched,
                "failure record matches several persistence signatures, the last one wins"
            );
        }

        match matched.last() {
            Some(Signature::Validation) => {
                let errors: IndexMap<String, String> = record
                    .errors
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(field, message)| (field, message.message))
                    .collect();

                let mut failure = ValidationFailure::new(errors);
                if let Some(message) = record.message {
                    failure.message = message;
                }
                failure.trace = trace;
                Self::Validation(failure)
            }
            Some(Signature::DuplicateKey) => {
                let mut failure = DuplicateKeyFailure::new(record.key_value.unwrap_or_default());
                if let Some(message) = record.message {
                    failure.message = message;
                }
                failure.trace = trace;
                Self::DuplicateKey(failure)
            }
            Some(Signature::Cast) => {
                let mut failure = CastFailure::new(record.path.unwrap_or_default(), record.value.unwrap_or(Value::Null));
                if let Some(message) = record.message {
                    failure.message = message;
                }
                failure.trace = trace;
                Self::Cast(failure)
            }
            None if record.is_operational == Some(true) => Self::Operational(AppError::with_trace(
                record.message.unwrap_or_default(),
                record.status_code.unwrap_or(DEFAULT_STATUS_CODE),
                trace,
            )),
            None => Self::Unknown(UnknownFailure {
                name: record.name,
                code: record.code,
                message: record.message.unwrap_or_default(),
                status_code: record.status_code,
                status_class: record.status,
                trace,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> FailureRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn cast_record_is_recognized() {
        let failure = Failure::from(record(json!({"name": "CastError", "path": "id", "value": "abc"})));
        let Failure::Cast(cast) = failure else {
            panic!("expected cast failure");
        };
        assert_eq!(cast.path, "id");
        assert_eq!(cast.value, json!("abc"));
    }

    #[test]
    fn duplicate_key_needs_an_entry() {
        let failure = Failure::from(record(json!({"code": 11000, "keyValue": {"email": "a@b.com"}})));
        assert!(matches!(failure, Failure::DuplicateKey(_)));

        let failure = Failure::from(record(json!({"code": 11000, "keyValue": {}})));
        assert!(matches!(failure, Failure::Unknown(_)));

        let failure = Failure::from(record(json!({"code": 11000})));
        assert!(matches!(failure, Failure::Unknown(_)));
    }

    #[test]
    fn duplicate_key_code_compares_numerically() {
        let failure = Failure::from(record(json!({"code": 11000.0, "keyValue": {"email": "a@b.com"}})));
        assert!(matches!(failure, Failure::DuplicateKey(_)));

        let failure = Failure::from(record(json!({"code": 11000.5, "keyValue": {"email": "a@b.com"}})));
        assert!(matches!(failure, Failure::Unknown(_)));

        let failure = Failure::from(record(json!({"code": "11000", "keyValue": {"email": "a@b.com"}})));
        assert!(matches!(failure, Failure::Unknown(_)));
    }

    #[test]
    fn validation_messages_accept_both_shapes() {
        let failure = Failure::from(record(json!({
            "name": "ValidationError",
            "errors": {
                "name": {"message": "Name required", "kind": "required"},
                "age": "Age must be positive"
            }
        })));
        let Failure::Validation(validation) = failure else {
            panic!("expected validation failure");
        };
        assert_eq!(validation.joined_messages(), "Name required. Age must be positive");
    }

    #[test]
    fn last_matching_signature_wins() {
        let raw = record(json!({
            "name": "ValidationError",
            "code": 11000,
            "keyValue": {"email": "a@b.com"},
            "errors": {"email": {"message": "Email taken"}}
        }));
        assert_eq!(Signature::detect(&raw), vec![Signature::DuplicateKey, Signature::Validation]);
        assert!(matches!(Failure::from(raw), Failure::Validation(_)));
    }

    #[test]
    fn operational_flag_on_record_is_honoured() {
        let failure = Failure::from(record(json!({"message": "gone", "statusCode": 410, "isOperational": true})));
        assert!(failure.is_operational());
        assert_eq!(failure.status_code(), 410);
        assert_eq!(failure.status_class(), StatusClass::Fail);
    }

    #[test]
    fn unknown_record_keeps_its_fields() {
        let failure = Failure::from(record(json!({"message": "db timeout", "code": "ETIMEDOUT"})));
        assert!(!failure.is_operational());
        assert_eq!(failure.message(), "db timeout");
        assert_eq!(failure.status_code(), 500);
        assert_eq!(failure.status_class(), StatusClass::Error);
        assert_eq!(failure.to_record().code, Some(json!("ETIMEDOUT")));
    }

    #[test]
    fn empty_record_does_not_panic() {
        let failure = Failure::from(FailureRecord::default());
        assert_eq!(failure.status_code(), 500);
        assert_eq!(failure.message(), "");
    }

    #[test]
    fn record_is_serialized_in_camel_case() {
        let failure = Failure::from(DuplicateKeyFailure::new(IndexMap::from([(
            "email".to_owned(),
            json!("a@b.com"),
        )])));
        let value = serde_json::to_value(failure.to_record()).unwrap();
        assert_eq!(value["code"], json!(11000));
        assert_eq!(value["keyValue"], json!({"email": "a@b.com"}));
        assert_eq!(value["statusCode"], json!(500));
        assert_eq!(value["status"], json!("ERROR"));
        assert_eq!(value["isOperational"], json!(false));
        assert!(value.get("path").is_none());
    }

    #[test]
    fn error_chain_is_flattened() {
        let io = std::io::Error::other("socket closed");
        let failure = Failure::from_error(&io);
        assert_eq!(failure.message(), "socket closed");
        assert_eq!(failure.kind(), "unknown");
    }
}

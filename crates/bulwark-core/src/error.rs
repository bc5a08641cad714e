use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Coarse classification of a failure, as reported in the `status` field
/// of every error body
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum StatusClass {
    /// Client-caused failure (4xx)
    Fail,
    /// Server-caused or unclassified failure
    #[default]
    Error,
}

impl StatusClass {
    /// Classify a raw status code
    ///
    /// `Fail` iff the leading decimal digit is `4`. Every other value,
    /// including out-of-range codes, is `Error`.
    pub const fn from_status_code(status_code: u16) -> Self {
        let mut leading = status_code;
        while leading >= 10 {
            leading /= 10;
        }

        if leading == 4 { Self::Fail } else { Self::Error }
    }
}

/// Diagnostic capture taken where a failure was raised
///
/// Records the caller's source location and, when enabled through
/// `RUST_BACKTRACE`, a full backtrace. Never rendered in production bodies.
#[derive(Clone)]
pub struct Trace {
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

impl Trace {
    /// Capture a trace at the caller's location
    #[track_caller]
    pub fn capture() -> Self {
        Self {
            location: Location::caller(),
            backtrace: Arc::new(Backtrace::capture()),
        }
    }

    /// Source location the failure was raised at
    pub const fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Render the trace as text for development responses and logs
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at {}", self.location)?;
        if self.backtrace.status() == BacktraceStatus::Captured {
            let rendered = self.backtrace.to_string();
            for (index, frame) in caller_frames(&rendered).enumerate() {
                write!(f, "\n{index:4}: {}", frame.symbol)?;
                if let Some(location) = frame.location {
                    write!(f, "\n             at {location}")?;
                }
            }
        }
        Ok(())
    }
}

/// One symbol line of a rendered backtrace and its source location
#[derive(Debug, PartialEq, Eq)]
struct Frame<'a> {
    symbol: &'a str,
    location: Option<&'a str>,
}

/// Frames of a rendered backtrace, starting at whoever raised the failure
///
/// Leading frames belonging to the capture itself (this crate's
/// constructors and conversions) are dropped.
fn caller_frames(rendered: &str) -> impl Iterator<Item = Frame<'_>> {
    let mut frames: Vec<Frame<'_>> = Vec::new();

    for line in rendered.lines().map(str::trim_start) {
        if let Some(location) = line.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                frame.location = Some(location);
            }
        } else if let Some((index, symbol)) = line.split_once(": ")
            && !index.is_empty()
            && index.bytes().all(|b| b.is_ascii_digit())
        {
            frames.push(Frame { symbol, location: None });
        }
    }

    frames.into_iter().skip_while(|frame| is_capture_frame(frame.symbol))
}

fn is_capture_frame(symbol: &str) -> bool {
    symbol.starts_with("std::backtrace")
        || (symbol.contains("bulwark_core::") && !symbol.contains("::tests::"))
}

impl fmt::Debug for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trace")
            .field("location", &format_args!("{}", self.location))
            .field("backtrace", &self.backtrace.status())
            .finish()
    }
}

/// An anticipated failure deliberately raised by application logic
///
/// Operational errors are safe to disclose: their status code and message
/// reach the caller verbatim in every environment.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct AppError {
    message: String,
    status_code: u16,
    status_class: StatusClass,
    trace: Trace,
}

impl AppError {
    /// Raise an operational error with the given status code
    ///
    /// The trace is taken at the caller, so this constructor never shows
    /// up in it.
    #[track_caller]
    pub fn new(message: impl Into<String>, status_code: u16) -> Self {
        Self {
            message: message.into(),
            status_code,
            status_class: StatusClass::from_status_code(status_code),
            trace: Trace::capture(),
        }
    }

    pub(crate) fn with_trace(message: impl Into<String>, status_code: u16, trace: Trace) -> Self {
        Self {
            message: message.into(),
            status_code,
            status_class: StatusClass::from_status_code(status_code),
            trace,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn status_code(&self) -> u16 {
        self.status_code
    }

    pub const fn status_class(&self) -> StatusClass {
        self.status_class
    }

    /// Always `true`: this is what separates an `AppError` from an
    /// arbitrary runtime failure
    pub const fn is_operational(&self) -> bool {
        true
    }

    pub const fn trace(&self) -> &Trace {
        &self.trace
    }
}

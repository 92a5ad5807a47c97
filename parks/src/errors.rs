use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;
use std::sync::Arc;

/// Error kinds for park backend operations.
///
/// Each kind maps to one failure class at the request boundary: connection
/// failures and store faults are server errors, validation failures are client
/// errors.
///
/// # Examples
///
/// ```rust
/// use parks::errors::{ErrorKind, ParksError, ParksResult};
///
/// fn example() -> ParksResult<()> {
///     Err(ParksError::new("lat1 is missing", ErrorKind::ValidationError))
/// }
/// assert!(example().unwrap_err().is_client_error());
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    /// Dialing or authenticating against the store failed
    ConnectionError,
    /// Malformed or missing request parameters, or malformed geometry on import
    ValidationError,
    /// Store-side failure while indexing, counting, seeding, querying or dropping
    QueryError,
    /// Invalid configuration value
    ConfigError,
    /// The seed dataset could not be read or is not a JSON array of objects
    DatasetError,
    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::ConnectionError => write!(f, "Connection error"),
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::QueryError => write!(f, "Query error"),
            ErrorKind::ConfigError => write!(f, "Configuration error"),
            ErrorKind::DatasetError => write!(f, "Dataset error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Error type shared by every crate of the park backend.
///
/// `ParksError` carries a message, a kind and an optional cause, so a
/// `ConnectionError` raised after the retry budget is spent still exposes the
/// last dial failure through [`Error::source`].
///
/// ```rust
/// use parks::errors::{ErrorKind, ParksError};
///
/// let dial = ParksError::new("connection refused", ErrorKind::ConnectionError);
/// let err = ParksError::new_with_cause(
///     "failed to connect after 5 attempts",
///     ErrorKind::ConnectionError,
///     dial,
/// );
/// assert_eq!(err.cause().unwrap().message(), "connection refused");
/// ```
#[derive(Clone)]
pub struct ParksError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<ParksError>>,
    backtrace: Arc<Backtrace>,
}

impl ParksError {
    /// Creates a new `ParksError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        ParksError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: Arc::new(Backtrace::new_unresolved()),
        }
    }

    /// Creates a new `ParksError` wrapping the error that caused it.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: ParksError) -> Self {
        ParksError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: Arc::new(Backtrace::new_unresolved()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&ParksError> {
        self.cause.as_deref()
    }

    /// Returns `true` when the caller sent a bad request rather than the
    /// backend failing.
    pub fn is_client_error(&self) -> bool {
        self.error_kind == ErrorKind::ValidationError
    }

    /// Walks the cause chain and returns the innermost error.
    pub fn root_cause(&self) -> &ParksError {
        let mut current = self;
        while let Some(cause) = current.cause() {
            current = cause;
        }
        current
    }
}

impl Display for ParksError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {}", self.message, cause),
            None => write!(f, "{}", self.message),
        }
    }
}

impl Debug for ParksError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{} ({})\nCaused by: {:?}", self.message, self.error_kind, cause),
            None => {
                let mut backtrace = (*self.backtrace).clone();
                backtrace.resolve();
                write!(f, "{} ({})\n{:?}", self.message, self.error_kind, backtrace)
            }
        }
    }
}

impl Error for ParksError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for park backend operations.
pub type ParksResult<T> = Result<T, ParksError>;

impl From<std::io::Error> for ParksError {
    fn from(err: std::io::Error) -> Self {
        ParksError::new(&format!("IO error: {}", err), ErrorKind::DatasetError)
    }
}

impl From<serde_json::Error> for ParksError {
    fn from(err: serde_json::Error) -> Self {
        ParksError::new(&format!("JSON error: {}", err), ErrorKind::DatasetError)
    }
}

impl From<std::num::ParseIntError> for ParksError {
    fn from(err: std::num::ParseIntError) -> Self {
        ParksError::new(
            &format!("Integer parsing error: {}", err),
            ErrorKind::ConfigError,
        )
    }
}

impl From<String> for ParksError {
    fn from(msg: String) -> Self {
        ParksError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for ParksError {
    fn from(msg: &str) -> Self {
        ParksError::new(msg, ErrorKind::InternalError)
    }
}

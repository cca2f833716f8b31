//! Error types for request building and dispatch.
//!
//! Every failure a call can produce is a variant of [`Error`]. Configuration
//! problems (bad route parameters, malformed XML bodies, invalid headers) are
//! raised while the request is being assembled; transport problems are raised
//! once the request is on the wire. The dispatch engine wraps either kind in an
//! [`ApiError`](crate::ApiError) before handing it to the error action.

use http::StatusCode;

/// Boxed error type returned by fallible user callbacks such as log sinks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The main error type for building and dispatching calls.
///
/// # Examples
///
/// ```no_run
/// use callwire::{Client, Error, RequestOptions};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .route("users/{id}")
///     .build()?;
///
/// match client.get(RequestOptions::new()).await {
///     Ok(()) => {}
///     Err(Error::RouteParamNotDefined(name)) => eprintln!("missing route parameter {}", name),
///     Err(e) if e.is_transport_error() => eprintln!("network trouble: {}", e),
///     Err(e) => eprintln!("other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A network-level error reported by `reqwest` (connection refused, DNS, TLS, ...).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The transport gave up after the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// A transport other than the built-in one failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Two route parameter keys fold to the same lower-cased, trimmed name.
    #[error("Route parameter '{0}' is ALREADY defined")]
    RouteParamAlreadyDefined(String),

    /// A route placeholder has no matching parameter value.
    #[error("Route parameter '{0}' is NOT defined")]
    RouteParamNotDefined(String),

    /// A chain of deferred route parameter values did not settle on a literal.
    #[error("Route parameter '{name}' did not resolve after {depth} deferred steps")]
    RouteParamDepthExceeded {
        /// The placeholder name.
        name: String,
        /// The depth at which resolution was abandoned.
        depth: usize,
    },

    /// The request body declared as XML is not well-formed.
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// Failed to serialize the request body or a route parameter value.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// Failed to deserialize the response body into the requested type.
    ///
    /// The raw body is kept for debugging.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// The response body is not valid UTF-8.
    #[error("Response body is not valid UTF-8: {0}")]
    InvalidUtf8(String),

    /// The HTTP method token is not one of the known methods.
    #[error("Unknown HTTP method: {0}")]
    UnknownMethod(String),

    /// Invalid configuration was provided.
    ///
    /// This covers a missing base URL as well as header names or values that
    /// cannot be put on the wire.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A user callback panicked while the call was being built or dispatched.
    #[error("Callback panicked: {0}")]
    Panicked(String),

    /// Writing response content to disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Maps a `reqwest` failure, separating timeouts from other network errors.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else {
            Error::Network(err)
        }
    }

    /// Returns `true` if this error was raised while assembling the request.
    ///
    /// # Examples
    ///
    /// ```
    /// use callwire::Error;
    ///
    /// assert!(Error::RouteParamNotDefined("id".to_string()).is_configuration_error());
    /// assert!(!Error::Timeout.is_configuration_error());
    /// ```
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Error::RouteParamAlreadyDefined(_)
                | Error::RouteParamNotDefined(_)
                | Error::RouteParamDepthExceeded { .. }
                | Error::XmlParse(_)
                | Error::SerializationFailed(_)
                | Error::UnknownMethod(_)
                | Error::ConfigurationError(_)
                | Error::InvalidUrl(_)
        )
    }

    /// Returns `true` if this error came from the transport layer.
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::Timeout | Error::Transport(_)
        )
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Network(e) => e.status(),
            Error::DeserializationFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A specialized `Result` type for building and dispatching calls.
pub type Result<T> = std::result::Result<T, Error>;

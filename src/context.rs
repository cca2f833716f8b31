//! Error and completion contexts passed to the error and complete actions.

use crate::logging::{LogMessage, LogSource, Logger};
use crate::request::RequestDescriptor;
use crate::response::ApiResult;
use crate::{Client, Error};

/// Where a call failure originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorContext {
    /// The transport rejected the request.
    ClientError,
    /// Building the request or running a response action failed.
    Exception,
}

/// A failed call, as seen by the error action.
///
/// Set [`handled`](ApiError::handled) to `true` to stop the error from being
/// returned to the caller; the complete action then runs with this context.
///
/// # Examples
///
/// ```no_run
/// use callwire::{Client, ErrorContext, Logger, RequestOptions};
///
/// # async fn example() -> Result<(), callwire::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .error(|err| {
///         if err.context() == ErrorContext::ClientError {
///             err.warning(format!("network trouble: {}", err.cause()), None, None);
///             err.handled = true;
///         }
///     })
///     .build()?;
///
/// client.get(RequestOptions::new()).await?;
/// # Ok(())
/// # }
/// ```
pub struct ApiError {
    client: Client,
    request: Option<RequestDescriptor>,
    error: Error,
    context: ErrorContext,
    tag: Option<serde_json::Value>,
    /// Whether the error action dealt with the error. Defaults to `false`.
    pub handled: bool,
}

impl ApiError {
    pub(crate) fn new(
        client: Client,
        request: Option<RequestDescriptor>,
        error: Error,
        context: ErrorContext,
        tag: Option<serde_json::Value>,
    ) -> Self {
        Self {
            client,
            request,
            error,
            context,
            tag,
            handled: false,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The underlying error.
    pub fn cause(&self) -> &Error {
        &self.error
    }

    pub fn context(&self) -> ErrorContext {
        self.context
    }

    /// The request, if the failure happened after it was fully built.
    pub fn request(&self) -> Option<&RequestDescriptor> {
        self.request.as_ref()
    }

    pub fn tag(&self) -> Option<&serde_json::Value> {
        self.tag.as_ref()
    }

    /// Consumes the context, returning the underlying error.
    pub fn into_cause(self) -> Error {
        self.error
    }
}

impl Logger for ApiError {
    fn log_source(&self) -> LogSource {
        LogSource::Error
    }

    fn on_log(&self, message: LogMessage) {
        self.client.emit(&message);
    }
}

impl std::fmt::Debug for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiError")
            .field("error", &self.error)
            .field("context", &self.context)
            .field("handled", &self.handled)
            .field("request", &self.request)
            .field("tag", &self.tag)
            .finish()
    }
}

/// How a call ended. Exactly one of the two is ever present.
#[derive(Debug)]
pub enum Outcome {
    Result(ApiResult),
    Error(ApiError),
}

/// Passed to the complete action once per call.
#[derive(Debug)]
pub struct CompleteContext {
    client: Client,
    request: Option<RequestDescriptor>,
    outcome: Outcome,
    tag: Option<serde_json::Value>,
}

impl CompleteContext {
    pub(crate) fn new(
        client: Client,
        request: Option<RequestDescriptor>,
        outcome: Outcome,
        tag: Option<serde_json::Value>,
    ) -> Self {
        Self {
            client,
            request,
            outcome,
            tag,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The response, if the call succeeded.
    pub fn result(&self) -> Option<&ApiResult> {
        match &self.outcome {
            Outcome::Result(result) => Some(result),
            Outcome::Error(_) => None,
        }
    }

    /// The error, if the call failed and the failure was handled.
    pub fn error(&self) -> Option<&ApiError> {
        match &self.outcome {
            Outcome::Result(_) => None,
            Outcome::Error(error) => Some(error),
        }
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn request(&self) -> Option<&RequestDescriptor> {
        self.request.as_ref()
    }

    pub fn tag(&self) -> Option<&serde_json::Value> {
        self.tag.as_ref()
    }
}

impl Logger for CompleteContext {
    fn log_source(&self) -> LogSource {
        LogSource::Complete
    }

    fn on_log(&self, message: LogMessage) {
        self.client.emit(&message);
    }
}

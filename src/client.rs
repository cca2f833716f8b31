//! The client, its builder and the dispatch engine.
//!
//! A [`Client`] is configured once through [`ClientBuilder`] (or a
//! [`ClientConfig`]) and then issues calls with [`Client::get`],
//! [`Client::post`] and friends. Each call resolves the route, builds the
//! request, runs the pre-send hooks, performs the transport call and then
//! dispatches the response to the registered actions.

use crate::context::{ApiError, CompleteContext, ErrorContext, Outcome};
use crate::logging::{invoke_log_sinks, panic_message, LogMessage, LogSink, LogSource, Logger};
use crate::metadata::{HttpMethod, RequestOptions};
use crate::request::{build_request, BuiltRequest, RequestDescriptor};
use crate::response::{ApiResult, ResultContext};
use crate::transport::{ReqwestTransport, Transport};
use crate::{error::BoxError, Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// An action run with the response of a call.
pub type ResultAction = Arc<dyn Fn(&ApiResult) + Send + Sync>;

/// Decides whether a conditional action applies to a response.
pub type ResultPredicate = Arc<dyn Fn(&ApiResult) -> bool + Send + Sync>;

/// Decides whether a conditional action applies to a status code.
pub type StatusPredicate = Arc<dyn Fn(u16) -> bool + Send + Sync>;

/// The error action. Set `handled` to keep the error from reaching the caller.
pub type ErrorAction = Arc<dyn Fn(&mut ApiError) + Send + Sync>;

/// The action run last, once per call.
pub type CompleteAction = Arc<dyn Fn(&CompleteContext) + Send + Sync>;

/// A hook run against the finished request just before it is sent, together
/// with the call's tag.
pub type BeforeSendHook = Arc<dyn Fn(&mut RequestDescriptor, Option<&serde_json::Value>) + Send + Sync>;

/// A conditional response entry. A missing predicate always matches.
#[derive(Clone)]
pub struct IfEntry {
    pub predicate: Option<ResultPredicate>,
    pub action: ResultAction,
}

/// An HTTP client that dispatches responses to registered actions.
///
/// The client is cheap to clone; clones share configuration and transport.
///
/// # Examples
///
/// ```no_run
/// use callwire::{Client, RequestOptions, RequestType};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), callwire::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .route("users/{id}")
///     .ok(|result| println!("saved: {}", result.code()))
///     .client_error(|result| println!("rejected: {}", result.code()))
///     .complete(|ctx| println!("done, failed = {}", ctx.error().is_some()))
///     .build()?;
///
/// let opts = RequestOptions::new()
///     .route_param("id", 42)
///     .request_type(RequestType::Json)
///     .content(json!({ "name": "Alice" }));
/// client.put(opts).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    base_url: String,
    route: Option<String>,
    default_headers: HeaderMap,
    timeout: Option<Duration>,
    before_send: Vec<BeforeSendHook>,
    if_entries: Vec<IfEntry>,
    success: Option<ResultAction>,
    error: Option<ErrorAction>,
    complete: Option<CompleteAction>,
    log_sinks: Vec<LogSink>,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client for `base_url` with no actions registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Self::builder().base_url(base_url)?.build()
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn route(&self) -> Option<&str> {
        self.inner.route.as_deref()
    }

    pub async fn get(&self, opts: RequestOptions) -> Result<()> {
        self.request(HttpMethod::Get, opts).await
    }

    pub async fn post(&self, opts: RequestOptions) -> Result<()> {
        self.request(HttpMethod::Post, opts).await
    }

    pub async fn put(&self, opts: RequestOptions) -> Result<()> {
        self.request(HttpMethod::Put, opts).await
    }

    pub async fn patch(&self, opts: RequestOptions) -> Result<()> {
        self.request(HttpMethod::Patch, opts).await
    }

    pub async fn delete(&self, opts: RequestOptions) -> Result<()> {
        self.request(HttpMethod::Delete, opts).await
    }

    /// Performs a call and dispatches its outcome.
    ///
    /// On a response, every conditional entry whose predicate matches runs in
    /// registration order; the success action runs only if none matched. The
    /// complete action runs last.
    ///
    /// On failure the error action decides: if it marks the error handled the
    /// complete action runs with the error and `Ok(())` is returned, otherwise
    /// the original error is returned.
    pub async fn request(&self, method: HttpMethod, opts: RequestOptions) -> Result<()> {
        let tag = opts.tag.clone();

        let request = match guard(|| self.prepare(method, &opts)) {
            Ok(request) => request,
            Err(e) => return self.fail(None, e, ErrorContext::Exception, tag),
        };

        let log_tag = format!("HttpRequest::{}", request.url);
        let response = match self.inner.transport.perform(request.clone()).await {
            Ok(response) => response,
            Err(e) => return self.fail(Some(request), e, ErrorContext::ClientError, tag),
        };

        let mut result = ApiResult::new(self.clone(), request.clone(), response, tag.clone());
        self.debug(format!("Status code: {}", result.code()), Some(log_tag.as_str()), None);
        for (name, value) in result.headers() {
            self.trace(
                format!(
                    "ResponseHeader['{}']: {}",
                    name,
                    String::from_utf8_lossy(value.as_bytes())
                ),
                Some(log_tag.as_str()),
                None,
            );
        }

        if let Err(e) = guard(|| {
            self.dispatch(&result);
            Ok(())
        }) {
            return self.fail(Some(request), e, ErrorContext::Exception, tag);
        }

        result.set_context(ResultContext::Complete);
        self.finish(Some(request), Outcome::Result(result), tag);
        Ok(())
    }

    /// Builds the descriptor and runs the pre-send hooks.
    fn prepare(&self, method: HttpMethod, opts: &RequestOptions) -> Result<RequestDescriptor> {
        let BuiltRequest {
            mut descriptor,
            route_params,
            params,
        } = build_request(
            method,
            &self.inner.base_url,
            self.inner.route.as_deref(),
            &self.inner.default_headers,
            self.inner.timeout,
            opts,
        )?;

        for hook in &self.inner.before_send {
            hook(&mut descriptor, opts.tag.as_ref());
        }

        let log_tag = Some("HttpRequestOptions");
        self.debug(format!("URL: {}", descriptor.url), log_tag, None);
        self.debug(format!("Method: {}", descriptor.method), log_tag, None);
        for (name, value) in route_params.iter() {
            self.debug(format!("RouteParameter[{}]: {}", name, value), log_tag, None);
        }
        for (name, value) in &params {
            self.debug(format!("UrlParameter[{}]: {}", name, value), log_tag, None);
        }

        Ok(descriptor)
    }

    /// Runs the matching conditional actions, or the success action if none matched.
    fn dispatch(&self, result: &ApiResult) {
        let matched: Vec<&ResultAction> = self
            .inner
            .if_entries
            .iter()
            .filter(|entry| entry.predicate.as_ref().map_or(true, |p| p(result)))
            .map(|entry| &entry.action)
            .collect();

        if matched.is_empty() {
            if let Some(success) = &self.inner.success {
                success(result);
            }
            return;
        }

        for action in matched {
            action(result);
        }
    }

    /// Routes a failure through the error action.
    fn fail(
        &self,
        request: Option<RequestDescriptor>,
        error: Error,
        context: ErrorContext,
        tag: Option<serde_json::Value>,
    ) -> Result<()> {
        let log_tag = request
            .as_ref()
            .map(|r| format!("HttpRequest::{}", r.url))
            .unwrap_or_else(|| "HttpRequest".to_string());
        match context {
            ErrorContext::ClientError => {
                self.error(format!("[ERROR]: {}", error), Some(log_tag.as_str()), None);
            }
            ErrorContext::Exception => {
                self.critical(format!("[FATAL ERROR]: {}", error), Some(log_tag.as_str()), None);
            }
        }

        let mut api_error = ApiError::new(self.clone(), request.clone(), error, context, tag.clone());
        if let Some(error_action) = &self.inner.error {
            error_action(&mut api_error);
        }

        if !api_error.handled {
            return Err(api_error.into_cause());
        }

        self.finish(request, Outcome::Error(api_error), tag);
        Ok(())
    }

    fn finish(
        &self,
        request: Option<RequestDescriptor>,
        outcome: Outcome,
        tag: Option<serde_json::Value>,
    ) {
        if let Some(complete) = &self.inner.complete {
            complete(&CompleteContext::new(self.clone(), request, outcome, tag));
        }
    }

    pub(crate) fn emit(&self, message: &LogMessage) {
        invoke_log_sinks(&self.inner.log_sinks, message);
    }
}

/// Runs a step that may panic inside user callbacks, turning the panic into an error.
fn guard<T>(step: impl FnOnce() -> Result<T>) -> Result<T> {
    catch_unwind(AssertUnwindSafe(step))
        .unwrap_or_else(|payload| Err(Error::Panicked(panic_message(payload.as_ref()))))
}

impl Logger for Client {
    fn log_source(&self) -> LogSource {
        LogSource::Client
    }

    fn on_log(&self, message: LogMessage) {
        self.emit(&message);
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url)
            .field("route", &self.inner.route)
            .field("if_entries", &self.inner.if_entries.len())
            .field("before_send", &self.inner.before_send.len())
            .field("log_sinks", &self.inner.log_sinks.len())
            .finish()
    }
}

/// Typed, all-optional client configuration.
///
/// [`ClientBuilder::from_config`] applies the fields in declaration order.
/// Explicit status codes outside `200..=599` are ignored.
///
/// # Examples
///
/// ```
/// use callwire::{ApiResult, ClientBuilder, ClientConfig, ResultAction};
/// use std::sync::Arc;
///
/// # fn example() -> Result<(), callwire::Error> {
/// let missing: ResultAction =
///     Arc::new(|result: &ApiResult| println!("missing: {}", result.request().url));
/// let teapot: ResultAction = Arc::new(|_: &ApiResult| println!("teapot"));
///
/// let config = ClientConfig {
///     base_url: Some("https://api.example.com".to_string()),
///     route: Some("items/{id}".to_string()),
///     not_found: Some(missing),
///     status: vec![(418, teapot)],
///     ..Default::default()
/// };
/// let client = ClientBuilder::from_config(config)?.build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct ClientConfig {
    pub base_url: Option<String>,
    pub route: Option<String>,
    pub before_send: Option<BeforeSendHook>,
    pub success: Option<ResultAction>,
    pub error: Option<ErrorAction>,
    pub complete: Option<CompleteAction>,
    pub not_found: Option<ResultAction>,
    pub unauthorized: Option<ResultAction>,
    pub forbidden: Option<ResultAction>,
    pub succeeded_request: Option<ResultAction>,
    pub redirection: Option<ResultAction>,
    pub client_error: Option<ResultAction>,
    pub server_error: Option<ResultAction>,
    pub ok: Option<ResultAction>,
    pub status: Vec<(u16, ResultAction)>,
    pub if_status: Vec<(Option<StatusPredicate>, ResultAction)>,
    pub conditions: Vec<IfEntry>,
}

/// Builder for configuring and creating a [`Client`].
///
/// Every method returns the builder, so configuration can be chained.
///
/// # Examples
///
/// ```no_run
/// use callwire::{ClientBuilder, Logger};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), callwire::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com")?
///     .route("orders/{id}")
///     .timeout(Duration::from_secs(30))
///     .default_header("User-Agent", "my-app/1.0")?
///     .before_send(|req, _tag| {
///         let _ = req.set_header("x-request-source", "mobile");
///     })
///     .when(|result| result.header("x-deprecated").is_some(), |result| {
///         result.warning("endpoint is deprecated", Some("api"), None);
///     })
///     .ok(|result| println!("ok: {}", result.code()))
///     .server_error(|result| println!("server error: {}", result.code()))
///     .error(|err| err.handled = true)
///     .add_logger(|msg| {
///         println!("{:?} {}", msg.category(), msg.message());
///         Ok(())
///     })
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    base_url: Option<String>,
    route: Option<String>,
    default_headers: HeaderMap,
    timeout: Option<Duration>,
    before_send: Vec<BeforeSendHook>,
    if_entries: Vec<IfEntry>,
    success: Option<ResultAction>,
    error: Option<ErrorAction>,
    complete: Option<CompleteAction>,
    log_sinks: Vec<LogSink>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            transport: None,
            base_url: None,
            route: None,
            default_headers: HeaderMap::new(),
            timeout: None,
            before_send: Vec::new(),
            if_entries: Vec::new(),
            success: None,
            error: None,
            complete: None,
            log_sinks: Vec::new(),
        }
    }

    /// Creates a builder from a [`ClientConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configured base URL is invalid.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let mut builder = Self::new();

        if let Some(base_url) = config.base_url {
            builder = builder.base_url(base_url)?;
        }
        if let Some(route) = config.route {
            builder = builder.route(route);
        }
        if let Some(hook) = config.before_send {
            builder.before_send.push(hook);
        }
        builder.success = config.success;
        builder.error = config.error;
        builder.complete = config.complete;

        if let Some(action) = config.not_found {
            builder = builder.status_action(404, action);
        }
        if let Some(action) = config.unauthorized {
            builder = builder.status_action(401, action);
        }
        if let Some(action) = config.forbidden {
            builder = builder.status_action(403, action);
        }
        if let Some(action) = config.succeeded_request {
            builder = builder.range_action(200..=299, action);
        }
        if let Some(action) = config.redirection {
            builder = builder.range_action(300..=399, action);
        }
        if let Some(action) = config.client_error {
            builder = builder.range_action(400..=499, action);
        }
        if let Some(action) = config.server_error {
            builder = builder.range_action(500..=599, action);
        }
        if let Some(action) = config.ok {
            builder = builder.ok_action(action);
        }
        for (code, action) in config.status {
            if (200..=599).contains(&code) {
                builder = builder.status_action(code, action);
            }
        }
        for (predicate, action) in config.if_status {
            builder = builder.when_status_action(predicate, action);
        }
        builder.if_entries.extend(config.conditions);

        Ok(builder)
    }

    /// Sets the base URL for all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        Url::parse(url.as_ref())?;
        self.base_url = Some(url.as_ref().to_string());
        Ok(self)
    }

    /// Sets the route template appended to the base URL.
    pub fn route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    /// Replaces the default `reqwest` transport.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the default request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Registers a pre-send hook. Hooks run in registration order.
    pub fn before_send<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut RequestDescriptor, Option<&serde_json::Value>) + Send + Sync + 'static,
    {
        self.before_send.push(Arc::new(hook));
        self
    }

    /// Sets the action run when no conditional entry matched.
    pub fn success<F>(mut self, action: F) -> Self
    where
        F: Fn(&ApiResult) + Send + Sync + 'static,
    {
        self.success = Some(Arc::new(action));
        self
    }

    /// Sets the error action.
    pub fn error<F>(mut self, action: F) -> Self
    where
        F: Fn(&mut ApiError) + Send + Sync + 'static,
    {
        self.error = Some(Arc::new(action));
        self
    }

    /// Sets the action run once at the end of every call.
    pub fn complete<F>(mut self, action: F) -> Self
    where
        F: Fn(&CompleteContext) + Send + Sync + 'static,
    {
        self.complete = Some(Arc::new(action));
        self
    }

    /// Registers a log sink.
    pub fn add_logger<F>(mut self, sink: F) -> Self
    where
        F: Fn(&LogMessage) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.log_sinks.push(Arc::new(sink));
        self
    }

    /// Registers a conditional action.
    pub fn when<P, F>(mut self, predicate: P, action: F) -> Self
    where
        P: Fn(&ApiResult) -> bool + Send + Sync + 'static,
        F: Fn(&ApiResult) + Send + Sync + 'static,
    {
        self.if_entries.push(IfEntry {
            predicate: Some(Arc::new(predicate)),
            action: Arc::new(action),
        });
        self
    }

    /// Registers an action that runs for every response.
    pub fn always<F>(mut self, action: F) -> Self
    where
        F: Fn(&ApiResult) + Send + Sync + 'static,
    {
        self.if_entries.push(IfEntry {
            predicate: None,
            action: Arc::new(action),
        });
        self
    }

    /// Registers a conditional action over the numeric status code.
    pub fn when_status<P, F>(self, predicate: P, action: F) -> Self
    where
        P: Fn(u16) -> bool + Send + Sync + 'static,
        F: Fn(&ApiResult) + Send + Sync + 'static,
    {
        self.when_status_action(Some(Arc::new(predicate)), Arc::new(action))
    }

    /// Registers an action for one exact status code.
    pub fn status<F>(self, code: u16, action: F) -> Self
    where
        F: Fn(&ApiResult) + Send + Sync + 'static,
    {
        self.status_action(code, Arc::new(action))
    }

    /// 200, 204 and 205.
    pub fn ok<F>(self, action: F) -> Self
    where
        F: Fn(&ApiResult) + Send + Sync + 'static,
    {
        self.ok_action(Arc::new(action))
    }

    /// Any status in `200..=299`.
    pub fn succeeded_request<F>(self, action: F) -> Self
    where
        F: Fn(&ApiResult) + Send + Sync + 'static,
    {
        self.range_action(200..=299, Arc::new(action))
    }

    /// Any status in `300..=399`.
    pub fn redirection<F>(self, action: F) -> Self
    where
        F: Fn(&ApiResult) + Send + Sync + 'static,
    {
        self.range_action(300..=399, Arc::new(action))
    }

    /// Any status in `400..=499`.
    pub fn client_error<F>(self, action: F) -> Self
    where
        F: Fn(&ApiResult) + Send + Sync + 'static,
    {
        self.range_action(400..=499, Arc::new(action))
    }

    /// Any status in `500..=599`.
    pub fn server_error<F>(self, action: F) -> Self
    where
        F: Fn(&ApiResult) + Send + Sync + 'static,
    {
        self.range_action(500..=599, Arc::new(action))
    }

    pub fn bad_request<F>(self, action: F) -> Self
    where
        F: Fn(&ApiResult) + Send + Sync + 'static,
    {
        self.status(400, action)
    }

    pub fn unauthorized<F>(self, action: F) -> Self
    where
        F: Fn(&ApiResult) + Send + Sync + 'static,
    {
        self.status(401, action)
    }

    pub fn forbidden<F>(self, action: F) -> Self
    where
        F: Fn(&ApiResult) + Send + Sync + 'static,
    {
        self.status(403, action)
    }

    pub fn not_found<F>(self, action: F) -> Self
    where
        F: Fn(&ApiResult) + Send + Sync + 'static,
    {
        self.status(404, action)
    }

    pub fn method_not_allowed<F>(self, action: F) -> Self
    where
        F: Fn(&ApiResult) + Send + Sync + 'static,
    {
        self.status(405, action)
    }

    pub fn gone<F>(self, action: F) -> Self
    where
        F: Fn(&ApiResult) + Send + Sync + 'static,
    {
        self.status(410, action)
    }

    pub fn uri_too_long<F>(self, action: F) -> Self
    where
        F: Fn(&ApiResult) + Send + Sync + 'static,
    {
        self.status(414, action)
    }

    pub fn unsupported_media_type<F>(self, action: F) -> Self
    where
        F: Fn(&ApiResult) + Send + Sync + 'static,
    {
        self.status(415, action)
    }

    pub fn locked<F>(self, action: F) -> Self
    where
        F: Fn(&ApiResult) + Send + Sync + 'static,
    {
        self.status(423, action)
    }

    pub fn too_many_requests<F>(self, action: F) -> Self
    where
        F: Fn(&ApiResult) + Send + Sync + 'static,
    {
        self.status(429, action)
    }

    pub fn internal_server_error<F>(self, action: F) -> Self
    where
        F: Fn(&ApiResult) + Send + Sync + 'static,
    {
        self.status(500, action)
    }

    pub fn not_implemented<F>(self, action: F) -> Self
    where
        F: Fn(&ApiResult) + Send + Sync + 'static,
    {
        self.status(501, action)
    }

    pub fn bad_gateway<F>(self, action: F) -> Self
    where
        F: Fn(&ApiResult) + Send + Sync + 'static,
    {
        self.status(502, action)
    }

    pub fn service_unavailable<F>(self, action: F) -> Self
    where
        F: Fn(&ApiResult) + Send + Sync + 'static,
    {
        self.status(503, action)
    }

    fn when_status_action(mut self, predicate: Option<StatusPredicate>, action: ResultAction) -> Self {
        let predicate: ResultPredicate = match predicate {
            Some(p) => Arc::new(move |result: &ApiResult| p(result.code())),
            None => Arc::new(|_: &ApiResult| true),
        };
        self.if_entries.push(IfEntry {
            predicate: Some(predicate),
            action,
        });
        self
    }

    fn status_action(self, code: u16, action: ResultAction) -> Self {
        self.when_status_action(Some(Arc::new(move |c: u16| c == code)), action)
    }

    fn range_action(self, range: std::ops::RangeInclusive<u16>, action: ResultAction) -> Self {
        self.when_status_action(Some(Arc::new(move |c: u16| range.contains(&c))), action)
    }

    fn ok_action(self, action: ResultAction) -> Self {
        self.status_action(200, action.clone())
            .status_action(204, action.clone())
            .status_action(205, action)
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL was provided or the default transport
    /// cannot be created.
    pub fn build(self) -> Result<Client> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::ConfigurationError("Base URL is required".to_string()))?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                transport,
                base_url,
                route: self.route,
                default_headers: self.default_headers,
                timeout: self.timeout,
                before_send: self.before_send,
                if_entries: self.if_entries,
                success: self.success,
                error: self.error,
                complete: self.complete,
                log_sinks: self.log_sinks,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogCategory;
    use crate::transport::TransportResponse;
    use crate::RequestType;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Answers every request with a fixed status and records what it was sent.
    #[derive(Clone)]
    struct FixedTransport {
        status: u16,
        fail: bool,
        seen: Arc<Mutex<Vec<RequestDescriptor>>>,
    }

    impl FixedTransport {
        fn status(status: u16) -> Self {
            Self {
                status,
                fail: false,
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::status(200)
            }
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    impl Transport for FixedTransport {
        fn perform(&self, request: RequestDescriptor) -> BoxFuture<'_, Result<TransportResponse>> {
            self.seen.lock().unwrap().push(request);
            let status = self.status;
            let fail = self.fail;
            async move {
                if fail {
                    return Err(Error::Transport("connection refused".to_string()));
                }
                let mut headers = HeaderMap::new();
                headers.insert("x-server", HeaderValue::from_static("fixed"));
                Ok(TransportResponse::new(
                    StatusCode::from_u16(status).unwrap(),
                    headers,
                    "{}",
                ))
            }
            .boxed()
        }
    }

    type Journal = Arc<Mutex<Vec<String>>>;

    fn journal() -> Journal {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn note(journal: &Journal, entry: impl Into<String>) {
        journal.lock().unwrap().push(entry.into());
    }

    fn entries(journal: &Journal) -> Vec<String> {
        journal.lock().unwrap().clone()
    }

    fn builder(transport: FixedTransport) -> ClientBuilder {
        Client::builder()
            .base_url("http://x/")
            .unwrap()
            .transport(transport)
    }

    #[tokio::test]
    async fn test_all_matching_entries_run_in_order_and_suppress_success() {
        let j = journal();
        let (a, b, c, s) = (j.clone(), j.clone(), j.clone(), j.clone());
        let client = builder(FixedTransport::status(204))
            .when_status(|code| code >= 200, move |_| note(&a, "first"))
            .not_found(move |_| note(&b, "not-found"))
            .ok(move |_| note(&c, "ok"))
            .success(move |_| note(&s, "success"))
            .build()
            .unwrap();

        client.get(RequestOptions::new()).await.unwrap();

        assert_eq!(entries(&j), vec!["first", "ok"]);
    }

    #[tokio::test]
    async fn test_success_runs_when_nothing_matched() {
        let j = journal();
        let (a, s) = (j.clone(), j.clone());
        let client = builder(FixedTransport::status(302))
            .client_error(move |_| note(&a, "client-error"))
            .success(move |result| note(&s, format!("success {}", result.code())))
            .build()
            .unwrap();

        client.get(RequestOptions::new()).await.unwrap();

        assert_eq!(entries(&j), vec!["success 302"]);
    }

    #[tokio::test]
    async fn test_always_entry_matches_every_status() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        let client = builder(FixedTransport::status(503))
            .always(move |_| {
                hits_clone.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap();

        client.delete(RequestOptions::new()).await.unwrap();
        client.delete(RequestOptions::new()).await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_complete_runs_once_with_result_only() {
        let j = journal();
        let (s, c) = (j.clone(), j.clone());
        let client = builder(FixedTransport::status(200))
            .success(move |result| {
                assert_eq!(result.context(), ResultContext::Success);
                note(&s, "success");
            })
            .complete(move |ctx| {
                let result = ctx.result().expect("result present");
                assert!(ctx.error().is_none());
                assert_eq!(result.context(), ResultContext::Complete);
                assert_eq!(ctx.tag(), Some(&serde_json::json!({ "call": 1 })));
                note(&c, "complete");
            })
            .build()
            .unwrap();

        client
            .post(RequestOptions::new().tag(serde_json::json!({ "call": 1 })))
            .await
            .unwrap();

        assert_eq!(entries(&j), vec!["success", "complete"]);
    }

    #[tokio::test]
    async fn test_unhandled_transport_error_propagates() {
        let j = journal();
        let (e, c) = (j.clone(), j.clone());
        let client = builder(FixedTransport::failing())
            .error(move |err| {
                assert_eq!(err.context(), ErrorContext::ClientError);
                assert!(!err.handled);
                note(&e, "error");
            })
            .complete(move |_| note(&c, "complete"))
            .build()
            .unwrap();

        let result = client.get(RequestOptions::new()).await;

        assert!(matches!(result, Err(Error::Transport(_))));
        assert_eq!(entries(&j), vec!["error"]);
    }

    #[tokio::test]
    async fn test_transport_error_without_error_action_propagates() {
        let client = builder(FixedTransport::failing()).build().unwrap();
        let result = client.get(RequestOptions::new()).await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn test_handled_error_reaches_complete() {
        let j = journal();
        let c = j.clone();
        let client = builder(FixedTransport::failing())
            .error(|err| err.handled = true)
            .complete(move |ctx| {
                assert!(ctx.result().is_none());
                let err = ctx.error().expect("error present");
                assert!(err.handled);
                assert!(err.request().is_some());
                assert!(matches!(err.cause(), Error::Transport(_)));
                note(&c, "complete");
            })
            .build()
            .unwrap();

        client.get(RequestOptions::new()).await.unwrap();

        assert_eq!(entries(&j), vec!["complete"]);
    }

    #[tokio::test]
    async fn test_build_failure_is_exception_before_transport() {
        let transport = FixedTransport::status(200);
        let contexts = Arc::new(Mutex::new(Vec::new()));
        let contexts_clone = contexts.clone();
        let client = builder(transport.clone())
            .error(move |err| {
                contexts_clone.lock().unwrap().push(err.context());
                assert!(err.request().is_none());
            })
            .build()
            .unwrap();

        let opts = RequestOptions::new()
            .request_type(RequestType::Xml)
            .content("<a><");
        let result = client.post(opts).await;

        assert!(matches!(result, Err(Error::XmlParse(_))));
        assert_eq!(transport.calls(), 0);
        assert_eq!(*contexts.lock().unwrap(), vec![ErrorContext::Exception]);
    }

    #[tokio::test]
    async fn test_failed_call_does_not_poison_client() {
        let transport = FixedTransport::status(200);
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        let client = builder(transport.clone())
            .route("{id}")
            .ok(move |_| {
                hits_clone.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap();

        let first = client.get(RequestOptions::new()).await;
        assert!(matches!(first, Err(Error::RouteParamNotDefined(_))));

        client
            .get(RequestOptions::new().route_param("id", 1))
            .await
            .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_panicking_action_becomes_exception() {
        let j = journal();
        let (e, c) = (j.clone(), j.clone());
        let client = builder(FixedTransport::status(200))
            .ok(|_| panic!("action blew up"))
            .error(move |err| {
                assert_eq!(err.context(), ErrorContext::Exception);
                note(&e, err.cause().to_string());
                err.handled = true;
            })
            .complete(move |ctx| {
                assert!(ctx.error().is_some());
                note(&c, "complete");
            })
            .build()
            .unwrap();

        client.get(RequestOptions::new()).await.unwrap();

        assert_eq!(
            entries(&j),
            vec!["Callback panicked: action blew up", "complete"]
        );
    }

    #[tokio::test]
    async fn test_before_send_hooks_run_in_order_with_tag() {
        let transport = FixedTransport::status(200);
        let client = builder(transport.clone())
            .before_send(|req, tag| {
                req.set_header("x-hook", "one").unwrap();
                req.set_header("x-tag", tag.and_then(|t| t.as_str()).unwrap_or("none"))
                    .unwrap();
            })
            .before_send(|req, _| {
                let previous = req.header("x-hook").unwrap_or_default().to_string();
                req.set_header("x-hook", format!("{}-two", previous)).unwrap();
            })
            .build()
            .unwrap();

        client
            .get(RequestOptions::new().tag(serde_json::json!("abc")))
            .await
            .unwrap();

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].header("x-hook"), Some("one-two"));
        assert_eq!(seen[0].header("x-tag"), Some("abc"));
    }

    #[tokio::test]
    async fn test_lifecycle_is_logged_to_sinks() {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let messages_clone = messages.clone();
        let client = builder(FixedTransport::status(200))
            .route("{id}")
            .add_logger(move |msg| {
                messages_clone.lock().unwrap().push(msg.clone());
                Ok(())
            })
            .ok(|result| {
                result.info("handled", Some("test"), None);
            })
            .build()
            .unwrap();

        client
            .get(RequestOptions::new().route_param("id", 7).param("q", "x"))
            .await
            .unwrap();

        let messages = messages.lock().unwrap();
        let texts: Vec<&str> = messages.iter().map(|m| m.message()).collect();
        assert!(texts.contains(&"URL: http://x/7?q=x"));
        assert!(texts.contains(&"Method: GET"));
        assert!(texts.contains(&"RouteParameter[id]: 7"));
        assert!(texts.contains(&"UrlParameter[q]: x"));
        assert!(texts.contains(&"Status code: 200"));
        assert!(texts.contains(&"ResponseHeader['x-server']: fixed"));

        let from_result = messages
            .iter()
            .find(|m| m.message() == "handled")
            .expect("result log present");
        assert_eq!(from_result.source(), LogSource::Result);
        assert_eq!(from_result.tag(), Some("TEST"));
        assert_eq!(from_result.category(), LogCategory::Info);

        let url_line = messages
            .iter()
            .find(|m| m.message().starts_with("URL:"))
            .unwrap();
        assert_eq!(url_line.tag(), Some("HTTPREQUESTOPTIONS"));
    }

    #[tokio::test]
    async fn test_route_parameters_are_logged_in_given_order() {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let messages_clone = messages.clone();
        let client = builder(FixedTransport::status(200))
            .route("{b}/{a}/{c}")
            .add_logger(move |msg| {
                messages_clone.lock().unwrap().push(msg.message().to_string());
                Ok(())
            })
            .build()
            .unwrap();

        let opts = RequestOptions::new()
            .route_param("c", 3)
            .route_param("A", 1)
            .route_param("b", 2);
        client.get(opts).await.unwrap();

        let route_lines: Vec<String> = messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.starts_with("RouteParameter"))
            .cloned()
            .collect();
        assert_eq!(
            route_lines,
            vec![
                "RouteParameter[c]: 3",
                "RouteParameter[a]: 1",
                "RouteParameter[b]: 2"
            ]
        );
    }

    #[tokio::test]
    async fn test_from_config_order_and_status_filter() {
        let j = journal();
        let (nf, st, ignored, cond) = (j.clone(), j.clone(), j.clone(), j.clone());
        let not_found: ResultAction = Arc::new(move |_: &ApiResult| note(&nf, "not-found"));
        let status_404: ResultAction = Arc::new(move |_: &ApiResult| note(&st, "status-404"));
        let status_99: ResultAction = Arc::new(move |_: &ApiResult| note(&ignored, "ignored"));
        let condition: ResultAction = Arc::new(move |_: &ApiResult| note(&cond, "condition"));
        let config = ClientConfig {
            base_url: Some("http://x/".to_string()),
            not_found: Some(not_found),
            status: vec![(404, status_404), (99, status_99)],
            conditions: vec![IfEntry {
                predicate: None,
                action: condition,
            }],
            ..Default::default()
        };

        let client = ClientBuilder::from_config(config)
            .unwrap()
            .transport(FixedTransport::status(404))
            .build()
            .unwrap();
        client.get(RequestOptions::new()).await.unwrap();

        assert_eq!(entries(&j), vec!["not-found", "status-404", "condition"]);
    }

    #[test]
    fn test_build_requires_base_url() {
        assert!(matches!(
            Client::builder().build(),
            Err(Error::ConfigurationError(_))
        ));
        assert!(matches!(
            Client::builder().base_url("not a url"),
            Err(Error::InvalidUrl(_))
        ));
    }
}

//! Per-call request options and the small enums they are built from.

use crate::auth::Authorizer;
use crate::route::ParamValue;
use crate::Error;
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// The known HTTP request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Trace,
    Options,
    Connect,
}

impl HttpMethod {
    /// Returns the canonical upper-case token.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Connect => "CONNECT",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    /// Parses a method token, ignoring case and surrounding whitespace.
    ///
    /// ```
    /// use callwire::HttpMethod;
    ///
    /// assert_eq!(" post ".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
    /// assert!("FETCH".parse::<HttpMethod>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "TRACE" => Ok(HttpMethod::Trace),
            "OPTIONS" => Ok(HttpMethod::Options),
            "CONNECT" => Ok(HttpMethod::Connect),
            _ => Err(Error::UnknownMethod(s.to_string())),
        }
    }
}

impl From<HttpMethod> for http::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Patch => http::Method::PATCH,
            HttpMethod::Delete => http::Method::DELETE,
            HttpMethod::Head => http::Method::HEAD,
            HttpMethod::Trace => http::Method::TRACE,
            HttpMethod::Options => http::Method::OPTIONS,
            HttpMethod::Connect => http::Method::CONNECT,
        }
    }
}

/// The declared kind of a request body. Drives the `Content-type` header
/// and how [`Content`] is converted to bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestType {
    Binary,
    Json,
    Xml,
    Text,
}

/// A request body before conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Raw bytes, passed through as-is.
    Bytes(Vec<u8>),
    /// A string.
    Text(String),
    /// A structured value.
    Json(serde_json::Value),
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Content::Bytes(bytes)
    }
}

impl From<&[u8]> for Content {
    fn from(bytes: &[u8]) -> Self {
        Content::Bytes(bytes.to_vec())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<serde_json::Value> for Content {
    fn from(value: serde_json::Value) -> Self {
        Content::Json(value)
    }
}

/// Options for an individual call.
///
/// # Examples
///
/// ```
/// use callwire::{RequestOptions, RequestType};
/// use serde_json::json;
/// use std::time::Duration;
///
/// let opts = RequestOptions::new()
///     .route_param("id", 42)
///     .param("verbose", "true")
///     .header("X-Trace", "abc")
///     .unwrap()
///     .request_type(RequestType::Json)
///     .content(json!({ "name": "Alice" }))
///     .timeout(Duration::from_secs(5))
///     .tag(json!("create-user"));
/// ```
#[derive(Clone, Default)]
pub struct RequestOptions {
    /// Route parameters in insertion order; keys are folded when the call is built.
    pub route_params: Vec<(String, ParamValue)>,

    /// URL parameters, appended as `key=value` in insertion order.
    pub params: Vec<(String, String)>,

    /// Headers for this call; they override the client's default headers.
    pub headers: HeaderMap,

    /// Per-call timeout, passed through to the transport.
    pub timeout: Option<Duration>,

    /// The request body.
    pub content: Option<Content>,

    /// Charset used in the `Content-type` header. Defaults to `utf-8`.
    pub encoding: Option<String>,

    /// The declared body kind.
    pub request_type: Option<RequestType>,

    /// Authorizer run after the content headers are set.
    pub authorizer: Option<Arc<dyn Authorizer>>,

    /// Opaque value handed to pre-send hooks and every context of this call.
    pub tag: Option<serde_json::Value>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a literal route parameter.
    pub fn route_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.route_params.push((name.into(), value.into()));
        self
    }

    /// Adds a URL parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, Error> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn content(mut self, content: impl Into<Content>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Serializes `value` into a [`Content::Json`] body and declares the
    /// request as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be represented as JSON.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, Error> {
        let value = serde_json::to_value(value)
            .map_err(|e| Error::SerializationFailed(e.to_string()))?;
        self.content = Some(Content::Json(value));
        self.request_type = Some(RequestType::Json);
        Ok(self)
    }

    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn request_type(mut self, request_type: RequestType) -> Self {
        self.request_type = Some(request_type);
        self
    }

    pub fn authorizer(mut self, authorizer: impl Authorizer + 'static) -> Self {
        self.authorizer = Some(Arc::new(authorizer));
        self
    }

    pub fn tag(mut self, tag: serde_json::Value) -> Self {
        self.tag = Some(tag);
        self
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("route_params", &self.route_params)
            .field("params", &self.params)
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .field("content", &self.content)
            .field("encoding", &self.encoding)
            .field("request_type", &self.request_type)
            .field("authorizer", &self.authorizer.is_some())
            .field("tag", &self.tag)
            .finish()
    }
}

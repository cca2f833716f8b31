//! The network boundary.
//!
//! The dispatch engine only needs something that can turn a
//! [`RequestDescriptor`] into a [`TransportResponse`]. [`ReqwestTransport`] is
//! the default; tests and embedders can plug in their own [`Transport`].

use crate::request::RequestDescriptor;
use crate::{Error, Result};
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use http::{HeaderMap, StatusCode};

/// A raw HTTP response as delivered by a transport.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// The complete response body.
    pub body: Bytes,
}

impl TransportResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }
}

/// Performs HTTP calls on behalf of a [`Client`](crate::Client).
///
/// # Examples
///
/// ```
/// use callwire::{RequestDescriptor, Result, Transport, TransportResponse};
/// use futures::future::BoxFuture;
/// use futures::FutureExt;
/// use http::{HeaderMap, StatusCode};
///
/// struct AlwaysNoContent;
///
/// impl Transport for AlwaysNoContent {
///     fn perform(&self, _request: RequestDescriptor) -> BoxFuture<'_, Result<TransportResponse>> {
///         async { Ok(TransportResponse::new(StatusCode::NO_CONTENT, HeaderMap::new(), "")) }.boxed()
///     }
/// }
/// ```
pub trait Transport: Send + Sync {
    /// Sends the request and resolves with the response or a transport error.
    fn perform(&self, request: RequestDescriptor) -> BoxFuture<'_, Result<TransportResponse>>;
}

/// A [`Transport`] backed by `reqwest`.
///
/// Redirects are not followed: a `3xx` response is handed to the dispatch
/// engine as is, so `redirection` and exact `3xx` status actions see it.
///
/// The underlying `reqwest::Client` keeps its own connection pool, so one
/// transport should be shared by all clients that talk to the same hosts.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with a freshly built `reqwest::Client` that does
    /// not follow redirects.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new() -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::ConfigurationError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http_client })
    }

    /// Wraps an existing `reqwest::Client`, keeping its redirect policy.
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

impl Transport for ReqwestTransport {
    fn perform(&self, request: RequestDescriptor) -> BoxFuture<'_, Result<TransportResponse>> {
        async move {
            tracing::debug!(
                method = %request.method,
                url = %request.url,
                "Executing HTTP request"
            );

            let mut builder = self
                .http_client
                .request(request.method.into(), request.url.as_str())
                .headers(request.headers);

            if let Some(timeout) = request.timeout {
                builder = builder.timeout(timeout);
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await.map_err(Error::from_reqwest)?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await.map_err(Error::from_reqwest)?;

            tracing::debug!(
                status = status.as_u16(),
                body_len = body.len(),
                "Received HTTP response"
            );

            Ok(TransportResponse {
                status,
                headers,
                body,
            })
        }
        .boxed()
    }
}

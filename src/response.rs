//! The response object handed to response actions.
//!
//! [`ApiResult`] keeps the raw transport response and decodes it only when
//! asked. Every accessor works on the stored bytes, so calling
//! [`ApiResult::json`] twice parses the body twice.

use crate::logging::{LogMessage, LogSource, Logger};
use crate::request::RequestDescriptor;
use crate::transport::TransportResponse;
use crate::{Client, Error, Result};
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;

/// The stage of the call a result is being observed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultContext {
    /// Passed to conditional actions or the success action.
    Success,
    /// Attached to the [`CompleteContext`](crate::CompleteContext).
    Complete,
}

/// The `{ code, msg, data }` envelope many JSON APIs wrap their payload in.
///
/// Every field is optional; missing fields deserialize to `None`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AjaxResult<T> {
    pub code: Option<i64>,
    pub msg: Option<String>,
    pub data: Option<T>,
}

/// A response received for a call.
///
/// # Examples
///
/// ```no_run
/// use callwire::{Client, RequestOptions};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct User {
///     name: String,
/// }
///
/// # async fn example() -> Result<(), callwire::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .route("users/{id}")
///     .ok(|result| {
///         if let Ok(Some(user)) = result.json::<User>() {
///             println!("User: {}", user.name);
///         }
///     })
///     .not_found(|result| println!("no such user: {}", result.request().url))
///     .build()?;
///
/// client.get(RequestOptions::new().route_param("id", 123)).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiResult {
    client: Client,
    request: RequestDescriptor,
    response: TransportResponse,
    context: ResultContext,
    tag: Option<serde_json::Value>,
}

impl ApiResult {
    pub(crate) fn new(
        client: Client,
        request: RequestDescriptor,
        response: TransportResponse,
        tag: Option<serde_json::Value>,
    ) -> Self {
        Self {
            client,
            request,
            response,
            context: ResultContext::Success,
            tag,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The numeric status code.
    pub fn code(&self) -> u16 {
        self.response.status.as_u16()
    }

    pub fn status(&self) -> StatusCode {
        self.response.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.response.headers
    }

    /// Returns a reference to a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.response.headers.get(name)?.to_str().ok()
    }

    /// The raw body, or `None` if the response had no body.
    pub fn content(&self) -> Option<&[u8]> {
        if self.response.body.is_empty() {
            None
        } else {
            Some(&self.response.body[..])
        }
    }

    /// The body decoded as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUtf8`] if the body is not valid UTF-8.
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.response.body.to_vec())
            .map_err(|e| Error::InvalidUtf8(e.to_string()))
    }

    /// Parses the body as JSON. A blank body yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeserializationFailed`] with the raw body if parsing fails.
    pub fn json<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let raw = self.text()?;
        if raw.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str::<T>(&raw).map(Some).map_err(|e| {
            tracing::error!(
                error = %e,
                raw_response = %raw,
                "Failed to deserialize response"
            );
            Error::DeserializationFailed {
                raw_response: raw,
                serde_error: e.to_string(),
                status: self.response.status,
            }
        })
    }

    /// Parses the body as an [`AjaxResult`] envelope around `T`.
    ///
    /// Returns `Ok(None)` for a blank body.
    ///
    /// # Errors
    ///
    /// Same as [`ApiResult::json`].
    pub fn ajax_result<T: DeserializeOwned>(&self) -> Result<Option<AjaxResult<T>>> {
        self.json()
    }

    /// Writes the raw body to `path`, replacing any existing file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.response.body)?;
        Ok(())
    }

    pub fn context(&self) -> ResultContext {
        self.context
    }

    pub(crate) fn set_context(&mut self, context: ResultContext) {
        self.context = context;
    }

    /// The request this response answers.
    pub fn request(&self) -> &RequestDescriptor {
        &self.request
    }

    /// The raw transport response.
    pub fn response(&self) -> &TransportResponse {
        &self.response
    }

    /// The opaque tag of the call.
    pub fn tag(&self) -> Option<&serde_json::Value> {
        self.tag.as_ref()
    }
}

impl Logger for ApiResult {
    fn log_source(&self) -> LogSource {
        LogSource::Result
    }

    fn on_log(&self, message: LogMessage) {
        self.client.emit(&message);
    }
}

impl std::fmt::Debug for ApiResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiResult")
            .field("request", &self.request)
            .field("status", &self.response.status)
            .field("context", &self.context)
            .field("tag", &self.tag)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HttpMethod;
    use serde::Deserialize;

    fn result(status: StatusCode, body: &'static str) -> ApiResult {
        let client = Client::builder()
            .base_url("http://localhost/")
            .unwrap()
            .build()
            .unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "application/json".parse().unwrap());
        ApiResult::new(
            client,
            RequestDescriptor::new(HttpMethod::Get, "http://localhost/"),
            TransportResponse::new(status, headers, body),
            Some(serde_json::json!("tag")),
        )
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
    }

    #[test]
    fn test_accessors() {
        let r = result(StatusCode::CREATED, r#"{"id":5}"#);
        assert_eq!(r.code(), 201);
        assert_eq!(r.header("content-type"), Some("application/json"));
        assert_eq!(r.content(), Some(&br#"{"id":5}"#[..]));
        assert_eq!(r.text().unwrap(), r#"{"id":5}"#);
        assert_eq!(r.json::<Item>().unwrap(), Some(Item { id: 5 }));
        assert_eq!(r.json::<Item>().unwrap(), Some(Item { id: 5 }));
        assert_eq!(r.context(), ResultContext::Success);
        assert_eq!(r.tag(), Some(&serde_json::json!("tag")));
    }

    #[test]
    fn test_ajax_result_envelope() {
        let r = result(StatusCode::OK, r#"{"code":0,"msg":"fine","data":{"id":9}}"#);
        assert_eq!(
            r.ajax_result::<Item>().unwrap(),
            Some(AjaxResult {
                code: Some(0),
                msg: Some("fine".to_string()),
                data: Some(Item { id: 9 }),
            })
        );

        let partial = result(StatusCode::BAD_REQUEST, r#"{"msg":"bad id"}"#);
        let envelope = partial.ajax_result::<Item>().unwrap().unwrap();
        assert_eq!(envelope.code, None);
        assert_eq!(envelope.msg.as_deref(), Some("bad id"));
        assert_eq!(envelope.data, None);

        assert_eq!(result(StatusCode::OK, "").ajax_result::<Item>().unwrap(), None);
        assert!(matches!(
            result(StatusCode::OK, r#"{"code":"x"}"#).ajax_result::<Item>(),
            Err(Error::DeserializationFailed { .. })
        ));
    }

    #[test]
    fn test_blank_body() {
        let r = result(StatusCode::NO_CONTENT, "  ");
        assert_eq!(r.json::<Item>().unwrap(), None);
        let empty = result(StatusCode::NO_CONTENT, "");
        assert!(empty.content().is_none());
    }

    #[test]
    fn test_json_failure_keeps_raw_body() {
        let r = result(StatusCode::OK, "not json");
        match r.json::<Item>() {
            Err(Error::DeserializationFailed {
                raw_response,
                status,
                ..
            }) => {
                assert_eq!(raw_response, "not json");
                assert_eq!(status, StatusCode::OK);
            }
            other => panic!("Expected DeserializationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.json");
        result(StatusCode::OK, "[1,2,3]").write_to_file(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[1,2,3]");
    }
}

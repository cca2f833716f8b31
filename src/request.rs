//! The transport-ready request and the code that assembles it from
//! [`RequestOptions`].

use crate::metadata::{Content, HttpMethod, RequestOptions, RequestType};
use crate::route::{join_url, RouteParams};
use crate::{xml, Error, Result};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::time::Duration;

/// Characters escaped when the final URL is encoded. Reserved URL delimiters
/// (`/ ? : @ & = + $ , ; #`) are left alone.
const URL_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

const DEFAULT_ENCODING: &str = "utf-8";

/// A fully assembled request, handed to pre-send hooks and the transport.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// The HTTP method.
    pub method: HttpMethod,
    /// The encoded URL, including the query string.
    pub url: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// The converted request body.
    pub body: Option<Bytes>,
    /// Timeout passed through to the transport.
    pub timeout: Option<Duration>,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }

    /// Sets a header, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn set_header(&mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<()> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Returns a header value as a string, if present and printable.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Returns the body as UTF-8 text, if there is one and it is valid.
    pub fn body_text(&self) -> Option<&str> {
        std::str::from_utf8(self.body.as_deref()?).ok()
    }
}

/// Everything the builder produced besides the descriptor, kept for logging.
#[derive(Debug)]
pub(crate) struct BuiltRequest {
    pub descriptor: RequestDescriptor,
    pub route_params: RouteParams,
    pub params: Vec<(String, String)>,
}

/// Assembles a [`RequestDescriptor`].
///
/// Order of operations: route resolution, default headers, per-call headers,
/// timeout, query string, `Content-type` and body conversion, authorizer,
/// URL encoding. Pre-send hooks are run by the caller afterwards.
pub(crate) fn build_request(
    method: HttpMethod,
    base_url: &str,
    route: Option<&str>,
    default_headers: &HeaderMap,
    default_timeout: Option<Duration>,
    opts: &RequestOptions,
) -> Result<BuiltRequest> {
    let route_params = RouteParams::from_pairs(opts.route_params.iter().map(|(k, v)| (k, v.clone())))?;

    let mut url = base_url.to_string();
    if let Some(route) = route.filter(|r| !r.trim().is_empty()) {
        url = join_url(&url, &route_params.resolve(route)?);
    }

    let mut descriptor = RequestDescriptor::new(method, String::new());
    descriptor.headers = default_headers.clone();
    for name in opts.headers.keys() {
        descriptor.headers.remove(name);
    }
    for (name, value) in &opts.headers {
        descriptor.headers.append(name.clone(), value.clone());
    }
    descriptor.timeout = opts.timeout.or(default_timeout);

    if !opts.params.is_empty() {
        let query = opts
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        url.push('?');
        url.push_str(&query);
    }

    let encoding = opts
        .encoding
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| DEFAULT_ENCODING.to_string());

    descriptor.body = match opts.request_type {
        Some(request_type) => {
            let content_type = content_type_for(request_type, &encoding);
            descriptor.set_header(CONTENT_TYPE.as_str(), &content_type)?;
            convert_content(request_type, opts.content.as_ref())?
        }
        None => passthrough(opts.content.as_ref())?,
    };

    if let Some(authorizer) = &opts.authorizer {
        authorizer.prepare(&mut descriptor)?;
    }

    descriptor.url = utf8_percent_encode(&url, URL_ENCODE_SET).to_string();

    Ok(BuiltRequest {
        descriptor,
        route_params,
        params: opts.params.clone(),
    })
}

fn content_type_for(request_type: RequestType, encoding: &str) -> String {
    match request_type {
        RequestType::Binary => "application/octet-stream".to_string(),
        RequestType::Json => format!("application/json; charset={}", encoding),
        RequestType::Text => format!("text/plain; charset={}", encoding),
        RequestType::Xml => format!("text/xml; charset={}", encoding),
    }
}

fn convert_content(request_type: RequestType, content: Option<&Content>) -> Result<Option<Bytes>> {
    let Some(content) = content else {
        return Ok(None);
    };

    match (request_type, content) {
        (RequestType::Binary, _) | (_, Content::Bytes(_)) if request_type != RequestType::Xml => {
            passthrough(Some(content))
        }
        (RequestType::Json, Content::Json(serde_json::Value::Null)) => Ok(None),
        (RequestType::Json, Content::Json(value)) => to_json_bytes(value).map(Some),
        (RequestType::Json, Content::Text(text)) => {
            to_json_bytes(&serde_json::Value::String(text.clone())).map(Some)
        }
        (RequestType::Text, _) => Ok(stringify(content)?.map(Bytes::from)),
        (RequestType::Xml, _) => {
            let text = stringify(content)?;
            if let Some(text) = &text {
                xml::validate(text)?;
            }
            Ok(text.map(Bytes::from))
        }
        _ => passthrough(Some(content)),
    }
}

fn passthrough(content: Option<&Content>) -> Result<Option<Bytes>> {
    match content {
        None => Ok(None),
        Some(Content::Bytes(bytes)) => Ok(Some(Bytes::copy_from_slice(bytes))),
        Some(Content::Text(text)) => Ok(Some(Bytes::from(text.clone()))),
        Some(Content::Json(serde_json::Value::Null)) => Ok(None),
        Some(Content::Json(value)) => to_json_bytes(value).map(Some),
    }
}

/// Strings stay as they are, other values are JSON-serialized, `null` means no body.
fn stringify(content: &Content) -> Result<Option<String>> {
    match content {
        Content::Text(text) => Ok(Some(text.clone())),
        Content::Bytes(bytes) => String::from_utf8(bytes.clone())
            .map(Some)
            .map_err(|e| Error::SerializationFailed(format!("body is not valid UTF-8: {}", e))),
        Content::Json(serde_json::Value::Null) => Ok(None),
        Content::Json(serde_json::Value::String(s)) => Ok(Some(s.clone())),
        Content::Json(value) => serde_json::to_string(value)
            .map(Some)
            .map_err(|e| Error::SerializationFailed(e.to_string())),
    }
}

fn to_json_bytes(value: &serde_json::Value) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|e| Error::SerializationFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Authorizer, BearerAuth};
    use crate::ParamValue;
    use serde_json::json;

    fn build(route: Option<&str>, opts: RequestOptions) -> Result<RequestDescriptor> {
        build_request(HttpMethod::Post, "http://x/", route, &HeaderMap::new(), None, &opts)
            .map(|built| built.descriptor)
    }

    #[test]
    fn test_route_is_resolved_and_joined() {
        let req = build(Some("{id}"), RequestOptions::new().route_param("ID", 42)).unwrap();
        assert_eq!(req.url, "http://x/42");
        assert_eq!(req.method, HttpMethod::Post);
    }

    #[test]
    fn test_blank_route_leaves_base_url() {
        let req = build(Some("  "), RequestOptions::new()).unwrap();
        assert_eq!(req.url, "http://x/");
    }

    #[test]
    fn test_duplicate_route_params_fail() {
        let opts = RequestOptions::new().route_param("id", 1).route_param("Id", 1);
        assert!(matches!(
            build(Some("{id}"), opts),
            Err(Error::RouteParamAlreadyDefined(_))
        ));
    }

    #[test]
    fn test_query_string_keeps_insertion_order_and_is_encoded_once() {
        let opts = RequestOptions::new()
            .param("z", 1)
            .param("a", "hello world")
            .param("m", "x%y");
        let req = build(Some("items/{name}"), opts.route_param("name", "a b")).unwrap();
        assert_eq!(req.url, "http://x/items/a%20b?z=1&a=hello%20world&m=x%25y");
    }

    #[test]
    fn test_json_body_and_header() {
        let opts = RequestOptions::new()
            .request_type(RequestType::Json)
            .content(json!({ "a": 1 }));
        let req = build(None, opts).unwrap();
        assert_eq!(req.header("content-type"), Some("application/json; charset=utf-8"));
        assert_eq!(req.body_text(), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_json_null_has_no_body() {
        let opts = RequestOptions::new()
            .request_type(RequestType::Json)
            .content(serde_json::Value::Null);
        assert!(build(None, opts).unwrap().body.is_none());
    }

    #[test]
    fn test_text_body_with_custom_encoding() {
        let opts = RequestOptions::new()
            .request_type(RequestType::Text)
            .encoding("  ISO-8859-1 ")
            .content(json!([1, 2]));
        let req = build(None, opts).unwrap();
        assert_eq!(req.header("content-type"), Some("text/plain; charset=iso-8859-1"));
        assert_eq!(req.body_text(), Some("[1,2]"));
    }

    #[test]
    fn test_binary_body_passes_through() {
        let opts = RequestOptions::new()
            .request_type(RequestType::Binary)
            .content(vec![0u8, 159, 146, 150]);
        let req = build(None, opts).unwrap();
        assert_eq!(req.header("content-type"), Some("application/octet-stream"));
        assert_eq!(req.body.as_deref(), Some(&[0u8, 159, 146, 150][..]));
    }

    #[test]
    fn test_xml_body_is_validated() {
        let ok = RequestOptions::new()
            .request_type(RequestType::Xml)
            .content("<a><b/></a>");
        let req = build(None, ok).unwrap();
        assert_eq!(req.header("content-type"), Some("text/xml; charset=utf-8"));
        assert_eq!(req.body_text(), Some("<a><b/></a>"));

        let bad = RequestOptions::new()
            .request_type(RequestType::Xml)
            .content("<a><");
        assert!(matches!(build(None, bad), Err(Error::XmlParse(_))));
    }

    #[test]
    fn test_untyped_content_is_not_converted() {
        let req = build(None, RequestOptions::new().content("raw")).unwrap();
        assert!(req.header("content-type").is_none());
        assert_eq!(req.body_text(), Some("raw"));
    }

    #[test]
    fn test_call_headers_override_defaults() {
        let mut defaults = HeaderMap::new();
        defaults.insert("x-app", HeaderValue::from_static("default"));
        defaults.insert("x-keep", HeaderValue::from_static("kept"));
        let opts = RequestOptions::new().header("X-App", "call").unwrap();

        let req = build_request(
            HttpMethod::Get,
            "http://x",
            None,
            &defaults,
            Some(Duration::from_secs(3)),
            &opts,
        )
        .unwrap()
        .descriptor;

        assert_eq!(req.header("x-app"), Some("call"));
        assert_eq!(req.header("x-keep"), Some("kept"));
        assert_eq!(req.timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_multi_valued_call_headers_replace_defaults() {
        let mut defaults = HeaderMap::new();
        defaults.insert("accept", HeaderValue::from_static("text/plain"));
        let mut opts = RequestOptions::new();
        opts.headers.append("accept", HeaderValue::from_static("application/json"));
        opts.headers.append("accept", HeaderValue::from_static("application/xml"));

        let req = build_request(HttpMethod::Get, "http://x", None, &defaults, None, &opts)
            .unwrap()
            .descriptor;

        let accepted: Vec<&str> = req
            .headers
            .get_all("accept")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(accepted, vec!["application/json", "application/xml"]);
    }

    #[test]
    fn test_authorizer_runs_after_content_headers() {
        struct OverrideContentType;
        impl Authorizer for OverrideContentType {
            fn prepare(&self, request: &mut RequestDescriptor) -> Result<()> {
                assert_eq!(
                    request.header("content-type"),
                    Some("application/json; charset=utf-8")
                );
                request.set_header("content-type", "application/vnd.signed+json")
            }
        }

        let opts = RequestOptions::new()
            .request_type(RequestType::Json)
            .content(json!({}))
            .authorizer(crate::AggregateAuthorizer::new()
                .add_authorizer(OverrideContentType)
                .add_authorizer(BearerAuth::new("tok")));
        let req = build(None, opts).unwrap();
        assert_eq!(req.header("content-type"), Some("application/vnd.signed+json"));
        assert_eq!(req.header("authorization"), Some("Bearer tok"));
    }

    #[test]
    fn test_deferred_route_param() {
        let opts = RequestOptions::new().route_param(
            "id",
            ParamValue::deferred(|ctx| Some(format!("{}-{}", ctx.name, ctx.format).into())),
        );
        let req = build(Some("{Id:hex}"), opts).unwrap();
        assert_eq!(req.url, "http://x/id-hex");
    }
}

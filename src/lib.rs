//! # Callwire - fluent HTTP calls with status-driven callbacks
//!
//! Callwire builds HTTP requests from a base URL, a route template and
//! per-call options, sends them through a pluggable transport (`reqwest` by
//! default) and hands the response to whichever registered actions match its
//! status code.
//!
//! ## Quick Start
//!
//! ```no_run
//! use callwire::{BearerAuth, Client, Logger, RequestOptions};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize)]
//! struct CreateUser {
//!     name: String,
//! }
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), callwire::Error> {
//!     let client = Client::builder()
//!         .base_url("https://api.example.com")?
//!         .route("users/{id}")
//!         .ok(|result| {
//!             if let Ok(Some(user)) = result.json::<User>() {
//!                 println!("User {}: {}", user.id, user.name);
//!             }
//!         })
//!         .not_found(|result| {
//!             result.warning("no such user", Some("users"), None);
//!         })
//!         .error(|err| {
//!             eprintln!("call failed: {}", err.cause());
//!             err.handled = true;
//!         })
//!         .complete(|ctx| println!("finished, ok = {}", ctx.result().is_some()))
//!         .build()?;
//!
//!     client
//!         .get(RequestOptions::new().route_param("ID", 123))
//!         .await?;
//!
//!     let body = CreateUser { name: "Alice".to_string() };
//!     client
//!         .post(
//!             RequestOptions::new()
//!                 .route_param("id", "new")
//!                 .json(&body)?
//!                 .authorizer(BearerAuth::new("secret-token")),
//!         )
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Route templates** - `{name}` and `{name:format}` placeholders, case-insensitive
//!   parameter names, lazily computed values
//! - **Body conversion** - JSON, text, XML (validated) and binary bodies with matching
//!   `Content-type` headers
//! - **Authorizers** - Basic, Bearer, or any combination of them
//! - **Status-driven dispatch** - every matching conditional action runs; the success
//!   action only when nothing matched
//! - **Explicit error recovery** - the error action decides whether a failure reaches
//!   the caller
//! - **Logging facade** - nine severity levels, pluggable sinks, mirrored to `tracing`
//!
//! ## Dispatch Rules
//!
//! 1. Conditional entries are evaluated in registration order and **all** matching
//!    actions run.
//! 2. If none matched, the success action runs.
//! 3. The complete action runs last, exactly once, with either the result or the
//!    handled error.
//!
//! A failure that the error action does not mark as handled is returned from the
//! call unchanged. The client stays usable for further calls.

mod auth;
mod client;
mod context;
mod error;
pub mod logging;
pub mod metadata;
mod request;
mod response;
pub mod route;
pub mod transport;
pub mod xml;

pub use auth::{AggregateAuthorizer, Authorizer, BasicAuth, BearerAuth};
pub use client::{
    BeforeSendHook, Client, ClientBuilder, ClientConfig, CompleteAction, ErrorAction, IfEntry,
    ResultAction, ResultPredicate, StatusPredicate,
};
pub use context::{ApiError, CompleteContext, ErrorContext, Outcome};
pub use error::{BoxError, Error, Result};
pub use logging::{LogCategory, LogMessage, LogPriority, LogSink, LogSource, Logger};
pub use metadata::{Content, HttpMethod, RequestOptions, RequestType};
pub use request::RequestDescriptor;
pub use response::{AjaxResult, ApiResult, ResultContext};
pub use route::{ParamContext, ParamValue, RouteParams};
pub use transport::{ReqwestTransport, Transport, TransportResponse};

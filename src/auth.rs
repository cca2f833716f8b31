//! Request authorizers.
//!
//! An [`Authorizer`] gets the fully assembled [`RequestDescriptor`] right
//! after the content headers are set and may add or overwrite headers.

use crate::request::RequestDescriptor;
use crate::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::header::AUTHORIZATION;
use http::HeaderValue;
use std::sync::Arc;

/// Prepares outgoing requests for authentication.
///
/// # Examples
///
/// ```
/// use callwire::{Authorizer, RequestDescriptor, Result};
///
/// struct ApiKey(&'static str);
///
/// impl Authorizer for ApiKey {
///     fn prepare(&self, request: &mut RequestDescriptor) -> Result<()> {
///         request.set_header("x-api-key", self.0)
///     }
/// }
/// ```
pub trait Authorizer: Send + Sync {
    /// Mutates the request headers in place.
    fn prepare(&self, request: &mut RequestDescriptor) -> Result<()>;
}

/// HTTP basic authentication.
#[derive(Debug, Clone)]
pub struct BasicAuth {
    username: String,
    password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl Authorizer for BasicAuth {
    fn prepare(&self, request: &mut RequestDescriptor) -> Result<()> {
        let credentials = STANDARD.encode(format!("{}:{}", self.username, self.password));
        insert_authorization(request, format!("Basic {}", credentials))
    }
}

/// Bearer token authentication.
#[derive(Debug, Clone)]
pub struct BearerAuth {
    token: String,
}

impl BearerAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl Authorizer for BearerAuth {
    fn prepare(&self, request: &mut RequestDescriptor) -> Result<()> {
        insert_authorization(request, format!("Bearer {}", self.token))
    }
}

/// Runs several authorizers in registration order.
///
/// Headers written by later authorizers replace those written by earlier ones.
#[derive(Clone, Default)]
pub struct AggregateAuthorizer {
    authorizers: Vec<Arc<dyn Authorizer>>,
}

impl AggregateAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_authorizer(mut self, authorizer: impl Authorizer + 'static) -> Self {
        self.authorizers.push(Arc::new(authorizer));
        self
    }

    pub fn add_authorizers(
        mut self,
        authorizers: impl IntoIterator<Item = Arc<dyn Authorizer>>,
    ) -> Self {
        self.authorizers.extend(authorizers);
        self
    }

    pub fn len(&self) -> usize {
        self.authorizers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authorizers.is_empty()
    }
}

impl Authorizer for AggregateAuthorizer {
    fn prepare(&self, request: &mut RequestDescriptor) -> Result<()> {
        for authorizer in &self.authorizers {
            authorizer.prepare(request)?;
        }
        Ok(())
    }
}

fn insert_authorization(request: &mut RequestDescriptor, value: String) -> Result<()> {
    let value = HeaderValue::try_from(value)
        .map_err(|e| Error::ConfigurationError(format!("Invalid authorization header: {}", e)))?;
    request.headers.insert(AUTHORIZATION, value);
    Ok(())
}

//! Route template resolution.
//!
//! A route template such as `users/{id}/posts/{post:fmt}` is expanded with a
//! set of [`RouteParams`]. Parameter names are matched case-insensitively
//! after trimming. A value may be [`ParamValue::Deferred`], in which case the
//! resolver function is called (repeatedly, if it returns another deferred
//! value) until a literal comes out.

use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fmt;
use std::sync::Arc;

/// Maximum number of deferred steps taken for a single placeholder.
pub const MAX_RESOLVE_DEPTH: usize = 64;

static PLACEHOLDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^{}:]+)(?::([^{}]*))?\}").expect("placeholder regex is valid"));

/// What a deferred resolver gets to look at.
pub struct ParamContext<'a> {
    /// The folded placeholder name.
    pub name: &'a str,
    /// All parameters of the call.
    pub params: &'a RouteParams,
    /// The full placeholder text, braces included.
    pub full_match: &'a str,
    /// The text after `:` inside the placeholder, empty if there is none.
    pub format: &'a str,
    /// Zero for the first call, incremented for every chained call.
    pub depth: usize,
}

/// A function producing a route parameter value on demand.
///
/// Returning `None` leaves the parameter undefined.
pub type ParamResolver = Arc<dyn Fn(&ParamContext<'_>) -> Option<ParamValue> + Send + Sync>;

/// A route parameter value.
#[derive(Clone)]
pub enum ParamValue {
    /// A value substituted directly. Strings are inserted verbatim, anything
    /// else is JSON-serialized.
    Literal(serde_json::Value),
    /// A value computed when the route is resolved.
    Deferred(ParamResolver),
}

impl ParamValue {
    /// Wraps a resolver function.
    ///
    /// ```
    /// use callwire::{ParamValue, RequestOptions};
    ///
    /// let opts = RequestOptions::new()
    ///     .route_param("id", ParamValue::deferred(|ctx| Some(format!("{}-{}", ctx.name, ctx.depth).into())));
    /// ```
    pub fn deferred<F>(f: F) -> Self
    where
        F: Fn(&ParamContext<'_>) -> Option<ParamValue> + Send + Sync + 'static,
    {
        ParamValue::Deferred(Arc::new(f))
    }
}

impl fmt::Debug for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            ParamValue::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Literal(serde_json::Value::String(s)) => f.write_str(s),
            ParamValue::Literal(v) => write!(f, "{}", v),
            ParamValue::Deferred(_) => f.write_str("<deferred>"),
        }
    }
}

macro_rules! literal_from {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for ParamValue {
                fn from(value: $t) -> Self {
                    ParamValue::Literal(serde_json::Value::from(value))
                }
            }
        )*
    };
}

literal_from!(&str, String, bool, i32, i64, u32, u64, usize, f64, serde_json::Value);

/// Route parameters keyed by their lower-cased, trimmed names, in the order
/// they were given.
#[derive(Debug, Clone, Default)]
pub struct RouteParams {
    values: Vec<(String, ParamValue)>,
}

impl RouteParams {
    /// Folds raw `(name, value)` pairs into a parameter map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RouteParamAlreadyDefined`] if two names fold to the same key.
    pub fn from_pairs<I, K>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, ParamValue)>,
        K: AsRef<str>,
    {
        let mut params = Self::default();
        for (name, value) in pairs {
            let name = fold_name(name.as_ref());
            if params.lookup(&name).is_some() {
                return Err(Error::RouteParamAlreadyDefined(name));
            }
            params.values.push((name, value));
        }
        Ok(params)
    }

    /// Looks a parameter up by any spelling of its name.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.lookup(&fold_name(name))
    }

    fn lookup(&self, folded: &str) -> Option<&ParamValue> {
        self.values
            .iter()
            .find(|(name, _)| name == folded)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Expands every placeholder in `template`.
    ///
    /// # Errors
    ///
    /// Fails if a placeholder has no value, if a deferred chain exceeds
    /// [`MAX_RESOLVE_DEPTH`], or if a value cannot be serialized.
    ///
    /// ```
    /// use callwire::RouteParams;
    ///
    /// let params = RouteParams::from_pairs(vec![(" ID ", 42.into()), ("Name", "bob".into())]).unwrap();
    /// assert_eq!(params.resolve("users/{id}/{NAME}").unwrap(), "users/42/bob");
    /// ```
    pub fn resolve(&self, template: &str) -> Result<String> {
        let mut failure = None;
        let resolved = PLACEHOLDER_REGEX.replace_all(template, |caps: &Captures<'_>| {
            if failure.is_some() {
                return String::new();
            }
            match self.resolve_placeholder(caps) {
                Ok(value) => value,
                Err(e) => {
                    failure = Some(e);
                    String::new()
                }
            }
        });

        match failure {
            Some(e) => Err(e),
            None => Ok(resolved.into_owned()),
        }
    }

    fn resolve_placeholder(&self, caps: &Captures<'_>) -> Result<String> {
        let name = fold_name(&caps[1]);
        let full_match = &caps[0];
        let format = caps.get(2).map_or("", |m| m.as_str());

        let mut value = self.lookup(&name).cloned();
        let mut depth = 0;
        while let Some(ParamValue::Deferred(resolver)) = value {
            if depth >= MAX_RESOLVE_DEPTH {
                return Err(Error::RouteParamDepthExceeded { name, depth });
            }
            let ctx = ParamContext {
                name: &name,
                params: self,
                full_match,
                format,
                depth,
            };
            value = resolver(&ctx);
            depth += 1;
        }

        match value {
            Some(ParamValue::Literal(serde_json::Value::String(s))) => Ok(s),
            Some(ParamValue::Literal(v)) => serde_json::to_string(&v)
                .map_err(|e| Error::SerializationFailed(e.to_string())),
            _ => Err(Error::RouteParamNotDefined(name)),
        }
    }
}

fn fold_name(name: &str) -> String {
    name.to_lowercase().trim().to_string()
}

/// Appends a resolved route to a base URL with exactly one `/` between them.
pub fn join_url(base_url: &str, route: &str) -> String {
    let mut url = base_url.to_string();
    if !url.ends_with('/') {
        url.push('/');
    }
    url.push_str(route.trim_start_matches('/'));
    url
}

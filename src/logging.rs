//! Categorized logging facade with pluggable sinks.
//!
//! The [`Logger`] trait provides nine severity methods that all funnel into
//! [`Logger::log`]. The client and every context object handed to callbacks
//! implement it; messages end up in the sinks registered on the owning
//! [`Client`](crate::Client) and are mirrored as `tracing` events.

use crate::error::BoxError;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::SystemTime;

/// Severity of a log message, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogCategory {
    Emergency = 1,
    Alert = 2,
    Critical = 3,
    Error = 4,
    Warning = 5,
    Notice = 6,
    Info = 7,
    #[default]
    Debug = 8,
    Trace = 9,
}

/// Optional priority attached to a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogPriority {
    VeryHigh = 1,
    High = 2,
    Medium = 3,
    Low = 4,
    VeryLow = 5,
}

/// The object a log message was emitted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogSource {
    /// The client itself.
    Client,
    /// A [`CompleteContext`](crate::CompleteContext).
    Complete,
    /// An [`ApiError`](crate::ApiError).
    Error,
    /// An [`ApiResult`](crate::ApiResult).
    Result,
}

/// A single, immutable log entry.
#[derive(Debug, Clone)]
pub struct LogMessage {
    source: LogSource,
    time: SystemTime,
    message: String,
    tag: Option<String>,
    category: LogCategory,
    priority: Option<LogPriority>,
}

impl LogMessage {
    pub fn new(
        source: LogSource,
        time: SystemTime,
        message: String,
        tag: Option<String>,
        category: LogCategory,
        priority: Option<LogPriority>,
    ) -> Self {
        Self {
            source,
            time,
            message,
            tag,
            category,
            priority,
        }
    }

    pub fn source(&self) -> LogSource {
        self.source
    }

    pub fn time(&self) -> SystemTime {
        self.time
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The normalized tag: upper-cased and trimmed, `None` if blank.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn category(&self) -> LogCategory {
        self.category
    }

    pub fn priority(&self) -> Option<LogPriority> {
        self.priority
    }
}

/// A log sink registered on a client.
///
/// Returning an error (or panicking) only affects that sink; remaining sinks
/// still receive the message.
pub type LogSink = Arc<dyn Fn(&LogMessage) -> Result<(), BoxError> + Send + Sync>;

/// The logging facade.
///
/// Implementors supply [`Logger::log_source`] and [`Logger::on_log`]; every
/// other method has a default implementation. All methods return `&Self` so
/// calls can be chained.
///
/// # Examples
///
/// ```
/// use callwire::{Client, LogPriority, Logger};
///
/// # fn example() -> Result<(), callwire::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .add_logger(|msg| {
///         println!("[{:?}] {:?}: {}", msg.category(), msg.tag(), msg.message());
///         Ok(())
///     })
///     .build()?;
///
/// client
///     .info("starting", Some("boot"), None)
///     .alert("config missing", None, Some(LogPriority::High));
/// # Ok(())
/// # }
/// ```
pub trait Logger {
    /// The source recorded on every message this logger creates.
    fn log_source(&self) -> LogSource;

    /// Delivers a finished message.
    fn on_log(&self, message: LogMessage);

    /// Logs a message with an explicit category and priority.
    ///
    /// A blank tag becomes `None`, any other tag is upper-cased and trimmed.
    /// A missing category defaults to [`LogCategory::Debug`].
    fn log(
        &self,
        message: impl fmt::Display,
        tag: Option<&str>,
        category: Option<LogCategory>,
        priority: Option<LogPriority>,
    ) -> &Self
    where
        Self: Sized,
    {
        let message = LogMessage::new(
            self.log_source(),
            SystemTime::now(),
            message.to_string(),
            normalize_tag(tag),
            category.unwrap_or_default(),
            priority,
        );
        self.on_log(message);
        self
    }

    fn emergency(
        &self,
        message: impl fmt::Display,
        tag: Option<&str>,
        priority: Option<LogPriority>,
    ) -> &Self
    where
        Self: Sized,
    {
        self.log(message, tag, Some(LogCategory::Emergency), priority)
    }

    fn alert(
        &self,
        message: impl fmt::Display,
        tag: Option<&str>,
        priority: Option<LogPriority>,
    ) -> &Self
    where
        Self: Sized,
    {
        self.log(message, tag, Some(LogCategory::Alert), priority)
    }

    fn critical(
        &self,
        message: impl fmt::Display,
        tag: Option<&str>,
        priority: Option<LogPriority>,
    ) -> &Self
    where
        Self: Sized,
    {
        self.log(message, tag, Some(LogCategory::Critical), priority)
    }

    fn error(
        &self,
        message: impl fmt::Display,
        tag: Option<&str>,
        priority: Option<LogPriority>,
    ) -> &Self
    where
        Self: Sized,
    {
        self.log(message, tag, Some(LogCategory::Error), priority)
    }

    fn warning(
        &self,
        message: impl fmt::Display,
        tag: Option<&str>,
        priority: Option<LogPriority>,
    ) -> &Self
    where
        Self: Sized,
    {
        self.log(message, tag, Some(LogCategory::Warning), priority)
    }

    fn notice(
        &self,
        message: impl fmt::Display,
        tag: Option<&str>,
        priority: Option<LogPriority>,
    ) -> &Self
    where
        Self: Sized,
    {
        self.log(message, tag, Some(LogCategory::Notice), priority)
    }

    fn info(
        &self,
        message: impl fmt::Display,
        tag: Option<&str>,
        priority: Option<LogPriority>,
    ) -> &Self
    where
        Self: Sized,
    {
        self.log(message, tag, Some(LogCategory::Info), priority)
    }

    fn debug(
        &self,
        message: impl fmt::Display,
        tag: Option<&str>,
        priority: Option<LogPriority>,
    ) -> &Self
    where
        Self: Sized,
    {
        self.log(message, tag, Some(LogCategory::Debug), priority)
    }

    fn trace(
        &self,
        message: impl fmt::Display,
        tag: Option<&str>,
        priority: Option<LogPriority>,
    ) -> &Self
    where
        Self: Sized,
    {
        self.log(message, tag, Some(LogCategory::Trace), priority)
    }
}

fn normalize_tag(tag: Option<&str>) -> Option<String> {
    match tag {
        Some(t) if !t.trim().is_empty() => Some(t.to_uppercase().trim().to_string()),
        _ => None,
    }
}

/// Mirrors a message into `tracing`, then hands it to each sink in order.
pub(crate) fn invoke_log_sinks(sinks: &[LogSink], message: &LogMessage) {
    emit_tracing_event(message);

    for (index, sink) in sinks.iter().enumerate() {
        match catch_unwind(AssertUnwindSafe(|| sink(message))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(sink = index, error = %e, "Log sink failed");
            }
            Err(payload) => {
                tracing::warn!(
                    sink = index,
                    panic = %panic_message(payload.as_ref()),
                    "Log sink panicked"
                );
            }
        }
    }
}

fn emit_tracing_event(message: &LogMessage) {
    let source = message.source;
    let tag = message.tag().unwrap_or("");
    let text = message.message();
    match message.category {
        LogCategory::Emergency
        | LogCategory::Alert
        | LogCategory::Critical
        | LogCategory::Error => {
            tracing::error!(?source, category = ?message.category, tag, "{}", text)
        }
        LogCategory::Warning => tracing::warn!(?source, tag, "{}", text),
        LogCategory::Notice | LogCategory::Info => tracing::info!(?source, tag, "{}", text),
        LogCategory::Debug => tracing::debug!(?source, tag, "{}", text),
        LogCategory::Trace => tracing::trace!(?source, tag, "{}", text),
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

//! Error types shared across the furldb crates.

use std::error::Error;
use std::fmt;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

/// Return early with a not-implemented error.
///
/// Accepts format args.
#[macro_export]
macro_rules! not_implemented {
    ($($arg:tt)*) => {{
        let msg = format!($($arg)*);
        return Err($crate::DbError::not_implemented(msg));
    }};
}

/// Categorization of an error.
///
/// Kinds are coarse. They exist so that callers (and telemetry) can tell
/// apart user-facing planning failures, missing features, and engine defects
/// without parsing message strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// The query is invalid. Surfaced to the user as-is.
    Plan,
    /// The query is valid, but requires something we don't support yet.
    NotImplemented,
    /// Invariant violation inside the engine. Indicates a bug, not user error.
    Internal,
    /// Failure while executing an otherwise valid plan.
    Execution,
    /// Anything else.
    Other,
}

impl fmt::Display for DbErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plan => write!(f, "Plan"),
            Self::NotImplemented => write!(f, "NotImplemented"),
            Self::Internal => write!(f, "Internal"),
            Self::Execution => write!(f, "Execution"),
            Self::Other => write!(f, "Other"),
        }
    }
}

#[derive(Debug)]
pub struct DbError {
    /// Kind of the error.
    kind: DbErrorKind,
    /// User-facing message.
    msg: String,
    /// Key/value pairs providing additional context.
    fields: Vec<(String, String)>,
    /// Source of the error, if any.
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl DbError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self::with_kind(DbErrorKind::Other, msg)
    }

    pub fn plan(msg: impl Into<String>) -> Self {
        Self::with_kind(DbErrorKind::Plan, msg)
    }

    pub fn not_implemented(msg: impl Into<String>) -> Self {
        Self::with_kind(DbErrorKind::NotImplemented, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_kind(DbErrorKind::Internal, msg)
    }

    pub fn execution(msg: impl Into<String>) -> Self {
        Self::with_kind(DbErrorKind::Execution, msg)
    }

    pub fn with_kind(kind: DbErrorKind, msg: impl Into<String>) -> Self {
        DbError {
            kind,
            msg: msg.into(),
            fields: Vec::new(),
            source: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.fields.push((key.into(), value.to_string()));
        self
    }

    pub fn with_fields<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: fmt::Display,
    {
        self.fields
            .extend(fields.into_iter().map(|(k, v)| (k.into(), v.to_string())));
        self
    }

    pub fn with_source(mut self, source: impl Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> DbErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.msg
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg)?;
        if !self.fields.is_empty() {
            write!(f, " (")?;
            for (idx, (k, v)) in self.fields.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{k} = {v}")?;
            }
            write!(f, ")")?;
        }
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

/// Extension trait for attaching context to errors inside a result.
pub trait ResultExt<T> {
    /// Wrap the error with a static message, keeping the original as source.
    fn context(self, msg: &'static str) -> Result<T>;

    /// Wrap the error with a lazily produced message.
    fn context_fn<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Error + Send + Sync + 'static,
{
    fn context(self, msg: &'static str) -> Result<T> {
        self.map_err(|e| DbError::new(msg).with_source(e))
    }

    fn context_fn<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| DbError::new(f()).with_source(e))
    }
}

//! Error types for matc-jinja

use thiserror::Error;

/// Jinja templating errors
#[derive(Error, Debug)]
pub enum JinjaError {
    /// Template render error (J001)
    #[error("[J001] Jinja render error: {0}")]
    RenderError(String),

    /// Date filter received input it cannot parse (J002)
    #[error("[J002] invalid date format, {0} given")]
    InvalidDate(String),
}

/// Result type alias for JinjaError
pub type JinjaResult<T> = Result<T, JinjaError>;

impl From<minijinja::Error> for JinjaError {
    fn from(err: minijinja::Error) -> Self {
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(inner) = source {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            source = inner.source();
        }
        JinjaError::RenderError(message)
    }
}

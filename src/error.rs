use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Argument or field that caused the error (e.g., "texts", "ids[2]", "metadata.page")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected length, actual length)
    pub details: Option<String>,
    /// Component that raised the error (e.g., "facade", "local_store", "http_embedder")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the semantic store.
///
/// `Validation` and `NotFound` are raised by the façade itself; `Embedder`,
/// `Store`, `Io` and `Serialization` come from the collaborators and are
/// passed through unchanged.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("No entry found with ID: {id} (collection: {collection})")]
    NotFound { id: String, collection: String },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Embedder error: {message}{}", format_context(.context))]
    Embedder {
        message: String,
        context: ErrorContext,
    },

    #[error("Vector store error: {message}{}", format_context(.context))]
    Store {
        message: String,
        context: ErrorContext,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::validation_with_context(msg, ErrorContext::new())
    }

    /// Create a new validation error with structured context
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::configuration_with_context(msg, ErrorContext::new())
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn embedder_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Embedder {
            message: msg.into(),
            context,
        }
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::store_with_context(msg, ErrorContext::new())
    }

    pub fn store_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Store {
            message: msg.into(),
            context,
        }
    }

    pub fn not_found(id: impl Into<String>, collection: impl Into<String>) -> Self {
        Error::NotFound {
            id: id.into(),
            collection: collection.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// True for failures surfaced by the embedder or the vector store.
    pub fn is_collaborator(&self) -> bool {
        matches!(
            self,
            Error::Embedder { .. } | Error::Store { .. } | Error::Io(_) | Error::Serialization(_)
        )
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Validation { context, .. }
            | Error::Configuration { context, .. }
            | Error::Embedder { context, .. }
            | Error::Store { context, .. } => Some(context),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_is_rendered_in_display() {
        let err = Error::validation_with_context(
            "The number of 'ids' must match the number of 'texts'",
            ErrorContext::new()
                .with_field_path("ids")
                .with_details("expected 3, got 2")
                .with_source("facade"),
        );
        assert_eq!(
            err.to_string(),
            "Validation error: The number of 'ids' must match the number of 'texts' \
             (field: ids, details: expected 3, got 2, source: facade)"
        );
    }

    #[test]
    fn test_empty_context_adds_nothing() {
        let err = Error::store("collection unavailable");
        assert_eq!(err.to_string(), "Vector store error: collection unavailable");
        assert!(err.is_collaborator());
        assert!(!err.is_validation());
    }

    #[test]
    fn test_not_found_message() {
        let err = Error::not_found("abc", "interests");
        assert!(err.is_not_found());
        assert!(err.context().is_none());
        assert_eq!(
            err.to_string(),
            "No entry found with ID: abc (collection: interests)"
        );
    }

    #[test]
    fn test_io_errors_count_as_collaborator_failures() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::Other, "disk gone").into();
        assert!(err.is_collaborator());
    }
}

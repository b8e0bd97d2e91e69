//! Domain error types.

/// A parse error with position information for indicator, band and step strings.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for tactical-alloc.
#[derive(Debug, thiserror::Error)]
pub enum AllocError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid [{section}] {key}: {source}")]
    Syntax {
        section: String,
        key: String,
        input: String,
        #[source]
        source: ParseError,
    },

    #[error("price data error: {reason}")]
    PriceData { reason: String },

    #[error("expected {expected} values, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("malformed allocation: {reason}")]
    MalformedAllocation { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AllocError {
    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        AllocError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn syntax(section: &str, key: &str, input: &str, source: ParseError) -> Self {
        AllocError::Syntax {
            section: section.to_string(),
            key: key.to_string(),
            input: input.to_string(),
            source,
        }
    }

    pub fn missing(section: &str, key: &str) -> Self {
        AllocError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl AllocError {
    /// Process exit status for this error family.
    pub fn exit_status(&self) -> u8 {
        match self {
            AllocError::Io(_) => 1,
            AllocError::ConfigParse { .. }
            | AllocError::ConfigMissing { .. }
            | AllocError::ConfigInvalid { .. } => 2,
            AllocError::Syntax { .. } => 4,
            AllocError::PriceData { .. } => 5,
            AllocError::DimensionMismatch { .. } | AllocError::MalformedAllocation { .. } => 6,
        }
    }
}

impl From<&AllocError> for std::process::ExitCode {
    fn from(err: &AllocError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}

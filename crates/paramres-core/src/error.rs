//! Error types for paramres
//!
//! Every failure aborts the current `resolve` call. Errors are structured:
//! a kind with its canonical message, the config path being resolved when
//! the failure happened, and an optional cause and help line.

use std::fmt;

/// Result type alias for paramres operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for paramres operations
#[derive(Debug, Clone)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Path in the config where the error occurred (e.g., "directories.project")
    pub path: Option<String>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause (as string for Clone compatibility)
    pub cause: Option<String>,
}

/// Categories of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    /// A placeholder references a key that exists nowhere in the tree
    #[error("Parameter '{param}' not found.")]
    NotFound { param: String },
    /// An `env.NAME` placeholder references an unset variable
    #[error("Environment variable '{var_name}' is not defined.")]
    EnvNotDefined { var_name: String },
    /// A placeholder chain revisits a key already being expanded
    #[error("Circular reference detected for parameter '{param}'.")]
    CircularReference { param: String },
    /// A value used for textual substitution is not a string or number
    #[error("A string value must be composed of strings and/or numbers.")]
    InvalidScalar,
    /// Nesting plus placeholder chaining went deeper than allowed
    #[error("Maximum resolution depth of {limit} exceeded.")]
    DepthExceeded { limit: usize },
    /// Input could not be turned into a configuration tree
    #[error("Parse error")]
    Parse,
}

impl Error {
    fn from_kind(kind: ErrorKind) -> Self {
        Self {
            kind,
            path: None,
            help: None,
            cause: None,
        }
    }

    /// Create a parameter not found error
    pub fn not_found(param: impl Into<String>) -> Self {
        let param = param.into();
        let help = format!(
            "Check that a key named '{}' exists somewhere in the configuration",
            param
        );
        Self {
            help: Some(help),
            ..Self::from_kind(ErrorKind::NotFound { param })
        }
    }

    /// Create an environment variable not defined error
    pub fn env_not_defined(var_name: impl Into<String>) -> Self {
        let var_name = var_name.into();
        let help = format!(
            "Set the {} environment variable (an empty value is allowed)",
            var_name
        );
        Self {
            help: Some(help),
            ..Self::from_kind(ErrorKind::EnvNotDefined { var_name })
        }
    }

    /// Create a circular reference error
    ///
    /// `chain` is the list of parameters being expanded when `param` was
    /// encountered again.
    pub fn circular_reference(param: impl Into<String>, chain: &[String]) -> Self {
        let param = param.into();
        let mut links: Vec<&str> = chain.iter().map(String::as_str).collect();
        links.push(&param);
        let cause = format!("Chain: {}", links.join(" → "));
        Self {
            help: Some("Break the circular dependency by removing one of the references".into()),
            cause: Some(cause),
            ..Self::from_kind(ErrorKind::CircularReference { param })
        }
    }

    /// Create an invalid scalar error; `got` names the offending type
    pub fn invalid_scalar(got: impl Into<String>) -> Self {
        Self {
            help: Some(
                "Only strings and numbers can be embedded in text; reference the value on its own to keep its type"
                    .into(),
            ),
            cause: Some(format!("Got: {}", got.into())),
            ..Self::from_kind(ErrorKind::InvalidScalar)
        }
    }

    /// Create a depth exceeded error
    pub fn depth_exceeded(limit: usize) -> Self {
        Self {
            help: Some("Flatten the configuration or raise ResolverOptions::max_depth".into()),
            ..Self::from_kind(ErrorKind::DepthExceeded { limit })
        }
    }

    /// Create a new parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            cause: Some(message.into()),
            ..Self::from_kind(ErrorKind::Parse)
        }
    }

    /// Add path context to the error
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add path context unless a more specific path is already recorded
    pub(crate) fn or_path(self, path: &str) -> Self {
        if self.path.is_some() || path.is_empty() {
            self
        } else {
            self.with_path(path)
        }
    }

    /// Add help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if let Some(path) = &self.path {
            write!(f, "\n  Path: {}", path)?;
        }

        if let Some(cause) = &self.cause {
            write!(f, "\n  {}", cause)?;
        }

        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}

//! Error types for attrdb

use thiserror::Error;

/// Result type alias for attrdb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for model building and statement execution
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid identifier, comparator, table reference or expression string
    #[error("Validation error: {0}")]
    Validation(String),

    /// A statement failed to prepare or execute
    #[error("Error executing SQL query: {message} [{code}] ({query})")]
    Execution {
        /// Debug SQL of the offending statement, literals substituted
        query: String,
        /// Five-character SQLSTATE code, empty when the backend gave none
        code: String,
        /// Driver-specific error message
        message: String,
    },

    /// BEGIN / COMMIT / ROLLBACK failed or was issued out of order
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// The backend cannot run the requested statement shape
    #[error("Unsupported by backend: {0}")]
    Capability(String),

    /// Opening the connection failed
    #[error("Connection error: {0}")]
    Connection(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a backend-capability error
    pub fn capability(message: impl Into<String>) -> Self {
        Self::Capability(message.into())
    }

    /// Create a transaction error
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction(message.into())
    }

    /// Create an execution error.
    ///
    /// `code` is kept only when it looks like a SQLSTATE (five upper-case
    /// alphanumerics); anything else is dropped.
    pub fn execution(
        query: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let code = code.into();
        let code = if is_sqlstate(&code) { code } else { String::new() };
        Self::Execution {
            query: query.into(),
            code,
            message: message.into(),
        }
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is an execution error
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }

    /// Check if this is a backend-capability error
    pub fn is_capability(&self) -> bool {
        matches!(self, Self::Capability(_))
    }

    /// Check if this is a transaction error
    pub fn is_transaction(&self) -> bool {
        matches!(self, Self::Transaction(_))
    }

    /// Debug SQL of the failed statement, if this is an execution error
    pub fn query(&self) -> Option<&str> {
        match self {
            Self::Execution { query, .. } => Some(query),
            _ => None,
        }
    }

    /// SQLSTATE code of the failed statement, if this is an execution error
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Execution { code, .. } => Some(code),
            _ => None,
        }
    }
}

fn is_sqlstate(code: &str) -> bool {
    code.len() == 5
        && code
            .bytes()
            .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
}

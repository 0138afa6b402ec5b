use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Type '{type_name}' declares more than one identity {kind}")]
    MultipleIdentity {
        type_name: String,
        kind: &'static str,
    },

    #[error("Type '{0}' has no identity field or accessor")]
    NoIdentity(String),

    #[error("Identity member '{member}' could not be read: {reason}")]
    IdentityUnreadable { member: String, reason: String },

    #[error("Audit field '{field}' has unsupported type {field_type}")]
    UnsupportedAuditType { field: String, field_type: String },

    #[error("Encrypted field '{field}' must be textual, found {field_type}")]
    NonTextEncryptedField { field: String, field_type: String },

    #[error("No constructor of '{type_name}' accepts {arity} argument(s)")]
    NoMatchingConstructor { type_name: String, arity: usize },

    #[error("Cannot cast {value} to {target}")]
    CannotCast { value: String, target: String },

    #[error("Cannot convert {value} to {target}: {reason}")]
    NumberCast {
        value: String,
        target: String,
        reason: String,
    },

    #[error("Type '{type_name}' has no member '{member}'")]
    UnknownMember { type_name: String, member: String },

    #[error("Record of type '{0}' not found")]
    NotFound(String),

    #[error("Query returned no result")]
    NoResult,

    #[error("Query returned {0} results where one was expected")]
    NonUniqueResult(usize),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Decryption error: {0}")]
    Decryption(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

/// Coarse classification used by callers that react to families of failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Mapping,
    State,
    Access,
    Crypto,
    Transaction,
    Backend,
}

impl RecordError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MultipleIdentity { .. }
            | Self::UnsupportedAuditType { .. }
            | Self::NonTextEncryptedField { .. }
            | Self::Config(_) => ErrorKind::Configuration,
            Self::NoMatchingConstructor { .. } | Self::CannotCast { .. } | Self::NumberCast { .. } => {
                ErrorKind::Mapping
            }
            Self::NotFound(_) | Self::NoResult | Self::NonUniqueResult(_) | Self::NoIdentity(_) => {
                ErrorKind::State
            }
            Self::IdentityUnreadable { .. } | Self::UnknownMember { .. } => ErrorKind::Access,
            Self::Encryption(_) | Self::Decryption(_) => ErrorKind::Crypto,
            Self::Transaction(_) | Self::LockError(_) => ErrorKind::Transaction,
            Self::Backend(_) | Self::ParseError(_) | Self::UnsupportedOperation(_) => {
                ErrorKind::Backend
            }
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    pub fn cannot_cast(value: &crate::core::Value, target: impl Into<String>) -> Self {
        Self::CannotCast {
            value: format!("{} ({})", value, value.type_name()),
            target: target.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RecordError>;

impl<T> From<std::sync::PoisonError<T>> for RecordError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

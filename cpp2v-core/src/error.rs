use thiserror::Error;

use crate::ast::DeclId;

/// Every variant is fatal: callers abort the run and discard partial output.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read translation unit: {0}")]
    SourceIo(#[from] std::io::Error),
    #[error("failed to decode translation unit: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("malformed translation unit: {0}")]
    InvalidUnit(String),
    #[error("unbalanced layout: {0}")]
    UnbalancedScope(String),
    #[error("name collision: `{name}` is produced by both declaration {first} and {second}")]
    NameCollision {
        name: String,
        first: DeclId,
        second: DeclId,
    },
    #[error("cannot render declaration {decl}: {reason}")]
    Unrenderable { decl: DeclId, reason: String },
    #[error("declaration `{0}` was not found")]
    UnknownDecl(String),
}

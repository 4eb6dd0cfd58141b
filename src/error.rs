use thiserror::Error;

use crate::ir::Tier;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The loader handed over records with unresolved or inconsistent references.
    #[error("data integrity: {0}")]
    DataIntegrity(String),

    /// A caller asked for an operation the node's tier or visibility does not allow.
    #[error("invalid operation: cannot {action} {tier:?} node `{node}`: {reason}")]
    InvalidOperation {
        action: &'static str,
        node: String,
        tier: Tier,
        reason: &'static str,
    },

    #[error("unknown node `{0}`")]
    UnknownNode(String),

    #[error("neighbor depth must be between 1 and 3, got {0}")]
    InvalidDepth(usize),
}

impl EngineError {
    pub fn is_invalid_operation(&self) -> bool {
        matches!(self, Self::InvalidOperation { .. })
    }
}

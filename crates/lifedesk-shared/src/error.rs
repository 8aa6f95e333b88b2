#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("Unknown block type: {0}")]
    UnknownBlockKind(String),

    #[error("Unknown section: {0}")]
    UnknownSection(String),

    #[error("Unknown transaction kind: {0}")]
    UnknownTransactionKind(String),
}

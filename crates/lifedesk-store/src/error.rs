#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Quota exceeded: record is {size} bytes, limit is {quota}")]
    QuotaExceeded { size: usize, quota: usize },

    #[error("Could not find a data directory")]
    NoDataDir,

    #[error("Store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkspaceError {
    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("Block {block} not found on page {page}")]
    BlockNotFound { page: String, block: String },

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Event not found: {0}")]
    EventNotFound(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    #[error("Invalid move: {0}")]
    InvalidMove(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

//! wardrop-export: problem matrices for external solvers.

pub mod export;
pub mod types;

pub use export::{build_export, load_matrices, save_matrices};
pub use types::*;

pub type ExportResult<T> = Result<T, ExportError>;

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] wardrop_network::NetworkError),

    #[error("Invalid export name: {name}")]
    InvalidName { name: String },
}

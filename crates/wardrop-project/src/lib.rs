//! wardrop-project: network definition files and validation.

pub mod build;
pub mod schema;
pub mod validate;

pub use build::{build_network, solve_options};
pub use schema::*;
pub use validate::{ValidationError, validate_definition};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Network error: {0}")]
    Network(#[from] wardrop_network::NetworkError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn load_yaml(path: &std::path::Path) -> ProjectResult<NetworkDef> {
    let content = std::fs::read_to_string(path)?;
    let definition: NetworkDef = serde_yaml::from_str(&content)?;
    validate_definition(&definition)?;
    Ok(definition)
}

pub fn save_yaml(path: &std::path::Path, definition: &NetworkDef) -> ProjectResult<()> {
    validate_definition(definition)?;
    let content = serde_yaml::to_string(definition)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &std::path::Path) -> ProjectResult<NetworkDef> {
    let content = std::fs::read_to_string(path)?;
    let definition: NetworkDef = serde_json::from_str(&content)?;
    validate_definition(&definition)?;
    Ok(definition)
}

pub fn save_json(path: &std::path::Path, definition: &NetworkDef) -> ProjectResult<()> {
    validate_definition(definition)?;
    let content = serde_json::to_string_pretty(definition)?;
    std::fs::write(path, content)?;
    Ok(())
}

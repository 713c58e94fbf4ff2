//! wardrop-core: shared foundation for the wardrop workspace.
//!
//! Contains:
//! - ids (node ids and the composite link/OD/path keys)
//! - numeric (Real + finiteness checks)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use numeric::*;

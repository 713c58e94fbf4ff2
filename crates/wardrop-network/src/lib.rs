//! wardrop-network: network model layer for wardrop.
//!
//! Provides:
//! - Delay functions per link (affine, polynomial, placeholders)
//! - The network model (nodes, links, OD pairs, paths) with validated mutation
//! - Append-only index tables for matrix assembly
//! - List-based bulk constructors
//!
//! # Example
//!
//! ```
//! use wardrop_network::{DelayFunction, Network};
//!
//! let mut network = Network::new();
//! let a = network.add_node(None);
//! let b = network.add_node(None);
//! let link = network.add_link(a, b, 1, DelayFunction::affine(1.0, 1.0)).unwrap();
//! network.add_od(a, b, 10.0).unwrap();
//! network.add_path(&[link]).unwrap();
//!
//! assert_eq!(network.num_links(), 1);
//! assert_eq!(network.paths()[0].delay, 1.0);
//! ```

pub mod builder;
pub mod delay;
pub mod error;
pub mod indexing;
pub mod network;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use builder::{LinkSpec, OdSpec};
pub use delay::{DelayFamily, DelayFunction, DelayParams, DelayType};
pub use error::{NetworkError, NetworkResult};
pub use indexing::IndexTable;
pub use network::{Link, Network, Node, Od, Path, Position};

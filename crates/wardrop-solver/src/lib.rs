//! Wardrop equilibrium solver over link flows.
//!
//! This crate turns a [`wardrop_network::Network`] with OD demand into
//! equilibrium link flows. Flow conservation becomes an equality system with
//! one row per node (reduced to an independent row basis), and the
//! equilibrium is the minimizer of a convex objective over non-negative
//! flows:
//! - affine delays give a diagonal quadratic program
//! - polynomial delays give a separable polynomial program behind a
//!   [`ConvexOracle`]
//!
//! Both are solved by the same primal-dual interior-point backend.

pub mod collaborators;
pub mod constraints;
pub mod equilibrium;
pub mod error;
pub mod interior_point;
pub mod oracle;
pub mod postprocess;
pub mod qp;
pub mod rank;

pub use collaborators::{LinkPathSolver, PathEnumerator, apply_path_flows, refine_paths};
pub use constraints::{ConstraintSystem, ObservedFlows, Reconciliation, build_constraints};
pub use equilibrium::{EquilibriumSolution, SolveOptions, solve, solve_link_flows};
pub use error::{SolverError, SolverResult};
pub use interior_point::{InteriorPointConfig, InteriorPointResult, InteriorPointStatus};
pub use oracle::{BeckmannObjective, ConvexOracle, Objective, SoftPenalty};
pub use postprocess::{apply_link_flows, unused_paths};
pub use qp::{QuadraticObjective, solve_qp};

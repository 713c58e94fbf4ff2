//! Error types for solver operations.

use thiserror::Error;
use wardrop_core::Real;
use wardrop_network::{DelayFamily, NetworkError};

/// Errors that can occur while building or solving an equilibrium problem.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Problem setup error: {what}")]
    ProblemSetup { what: String },

    #[error("Unsupported delay family: {what}")]
    UnsupportedDelayFamily { what: String },

    #[error(
        "Infeasible constraints: {raw_rows} rows of rank {rank} are inconsistent, row {row} misses its right-hand side by {residual:.3e}"
    )]
    InfeasibleConstraints {
        raw_rows: usize,
        rank: usize,
        row: usize,
        residual: Real,
    },

    #[error(
        "Convergence failed for {family} network with {equality_rows} equality rows after {iterations} iterations: {status}"
    )]
    ConvergenceFailed {
        family: DelayFamily,
        equality_rows: usize,
        iterations: usize,
        status: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

pub type SolverResult<T> = Result<T, SolverError>;

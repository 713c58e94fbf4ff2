//! Network definition file schema.

use serde::{Deserialize, Serialize};

pub const LATEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkDef {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub delay_type: DelayTypeDef,
    /// Node ids must run 1, 2, ... in file order.
    #[serde(default)]
    pub nodes: Vec<NodeDef>,
    #[serde(default)]
    pub links: Vec<LinkDef>,
    #[serde(default)]
    pub ods: Vec<OdDef>,
    #[serde(default)]
    pub paths: Vec<PathDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver: Option<SolverDef>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DelayTypeDef {
    None,
    Affine,
    Polynomial,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeDef {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<[f64; 2]>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkDef {
    pub start: u32,
    pub end: u32,
    #[serde(default = "default_route")]
    pub route: u32,
    pub ffdelay: f64,
    #[serde(default)]
    pub slope: f64,
    /// Polynomial coefficients; ignored for affine links.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coefs: Vec<f64>,
}

fn default_route() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OdDef {
    pub origin: u32,
    pub destination: u32,
    pub demand: f64,
}

/// Path given as a node sequence; each hop uses the lowest-route link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathDef {
    pub nodes: Vec<u32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ObjectiveDef {
    #[default]
    UserEquilibrium,
    SystemOptimum,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SolverDef {
    #[serde(default)]
    pub objective: ObjectiveDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feasibility_tol: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap_tol: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed: Option<ObservedDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObservedDef {
    pub reconciliation: ReconciliationDef,
    pub flows: Vec<ObservedLinkDef>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ReconciliationDef {
    Hard,
    Soft { weight: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObservedLinkDef {
    pub start: u32,
    pub end: u32,
    #[serde(default = "default_route")]
    pub route: u32,
    pub flow: f64,
}

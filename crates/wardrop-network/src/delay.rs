//! Per-link delay (cost) models.

use std::fmt;
use wardrop_core::Real;

/// Tag naming a delay-function family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DelayFamily {
    None,
    Affine,
    Polynomial,
    Other,
}

impl fmt::Display for DelayFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DelayFamily::None => "None",
            DelayFamily::Affine => "Affine",
            DelayFamily::Polynomial => "Polynomial",
            DelayFamily::Other => "Other",
        };
        f.write_str(name)
    }
}

/// Delay as a function of link flow.
///
/// - `Affine`: `ffdelay + slope * x`
/// - `Polynomial`: `ffdelay + sum_k coefs[k] * (slope * x)^(k+1)`; `slope` acts as an
///   inverse capacity and `coefs.len()` is the degree
/// - `None` / `Other`: no flow model, the owning link keeps its free-flow delay
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DelayFunction {
    #[default]
    None,
    Affine {
        ffdelay: Real,
        slope: Real,
    },
    Polynomial {
        ffdelay: Real,
        slope: Real,
        coefs: Vec<Real>,
    },
    Other {
        ffdelay: Real,
        params: Vec<Real>,
    },
}

impl DelayFunction {
    pub fn affine(ffdelay: Real, slope: Real) -> Self {
        Self::Affine { ffdelay, slope }
    }

    pub fn polynomial(ffdelay: Real, slope: Real, coefs: impl Into<Vec<Real>>) -> Self {
        Self::Polynomial {
            ffdelay,
            slope,
            coefs: coefs.into(),
        }
    }

    pub fn family(&self) -> DelayFamily {
        match self {
            Self::None => DelayFamily::None,
            Self::Affine { .. } => DelayFamily::Affine,
            Self::Polynomial { .. } => DelayFamily::Polynomial,
            Self::Other { .. } => DelayFamily::Other,
        }
    }

    pub fn ffdelay(&self) -> Option<Real> {
        match self {
            Self::None => None,
            Self::Affine { ffdelay, .. }
            | Self::Polynomial { ffdelay, .. }
            | Self::Other { ffdelay, .. } => Some(*ffdelay),
        }
    }

    pub fn slope(&self) -> Option<Real> {
        match self {
            Self::Affine { slope, .. } | Self::Polynomial { slope, .. } => Some(*slope),
            Self::None | Self::Other { .. } => None,
        }
    }

    /// Polynomial degree; 1 for affine, 0 when there is no flow model.
    pub fn degree(&self) -> usize {
        match self {
            Self::Affine { .. } => 1,
            Self::Polynomial { coefs, .. } => coefs.len(),
            Self::None | Self::Other { .. } => 0,
        }
    }

    /// Coefficients `a_k` of `x^(k+1)` once the slope scaling is folded in.
    ///
    /// `delay(x) = ffdelay + sum_k a_k * x^(k+1)` for both modelled families.
    pub fn flow_coefs(&self) -> Option<Vec<Real>> {
        match self {
            Self::Affine { slope, .. } => Some(vec![*slope]),
            Self::Polynomial { slope, coefs, .. } => {
                let mut scale = 1.0;
                Some(
                    coefs
                        .iter()
                        .map(|c| {
                            scale *= slope;
                            c * scale
                        })
                        .collect(),
                )
            }
            Self::None | Self::Other { .. } => None,
        }
    }

    /// Delay at `flow`; `None` for families without a flow model.
    pub fn compute_delay(&self, flow: Real) -> Option<Real> {
        match self {
            Self::Affine { ffdelay, slope } => Some(ffdelay + slope * flow),
            Self::Polynomial {
                ffdelay,
                slope,
                coefs,
            } => {
                let scaled = slope * flow;
                let mut power = 1.0;
                let mut delay = *ffdelay;
                for coef in coefs {
                    power *= scaled;
                    delay += coef * power;
                }
                Some(delay)
            }
            Self::None | Self::Other { .. } => None,
        }
    }

    /// Marginal delay `d/dx [x * delay(x)]`, the link cost seen under system optimum.
    pub fn marginal_delay(&self, flow: Real) -> Option<Real> {
        let ffdelay = self.ffdelay()?;
        let coefs = self.flow_coefs()?;
        let mut power = 1.0;
        let mut marginal = ffdelay;
        for (k, a) in coefs.iter().enumerate() {
            power *= flow;
            marginal += a * (k as Real + 2.0) * power;
        }
        Some(marginal)
    }

    /// All numeric parameters, for validation.
    pub(crate) fn parameters(&self) -> Vec<Real> {
        match self {
            Self::None => Vec::new(),
            Self::Affine { ffdelay, slope } => vec![*ffdelay, *slope],
            Self::Polynomial {
                ffdelay,
                slope,
                coefs,
            } => {
                let mut params = vec![*ffdelay, *slope];
                params.extend_from_slice(coefs);
                params
            }
            Self::Other { ffdelay, params } => {
                let mut all = vec![*ffdelay];
                all.extend_from_slice(params);
                all
            }
        }
    }
}

/// Delay parameters of a bulk link row: slope plus polynomial coefficients.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DelayParams {
    pub slope: Real,
    pub coefs: Vec<Real>,
}

impl DelayParams {
    pub fn new(slope: Real, coefs: impl Into<Vec<Real>>) -> Self {
        Self {
            slope,
            coefs: coefs.into(),
        }
    }
}

/// Family selector used by the list-based constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DelayType {
    #[default]
    None,
    Affine,
    Polynomial,
    Other,
}

impl DelayType {
    /// Build the delay function for one link row.
    pub fn create(self, ffdelay: Real, params: &DelayParams) -> DelayFunction {
        match self {
            DelayType::None => DelayFunction::None,
            DelayType::Affine => DelayFunction::affine(ffdelay, params.slope),
            DelayType::Polynomial => {
                DelayFunction::polynomial(ffdelay, params.slope, params.coefs.clone())
            }
            DelayType::Other => {
                let mut all = vec![params.slope];
                all.extend_from_slice(&params.coefs);
                DelayFunction::Other {
                    ffdelay,
                    params: all,
                }
            }
        }
    }
}

impl From<DelayType> for DelayFamily {
    fn from(value: DelayType) -> Self {
        match value {
            DelayType::None => DelayFamily::None,
            DelayType::Affine => DelayFamily::Affine,
            DelayType::Polynomial => DelayFamily::Polynomial,
            DelayType::Other => DelayFamily::Other,
        }
    }
}

//! Immutable port values.
//!
//! A [`PortState`] is a snapshot of one physical or numeric quantity carried
//! by a port. Every kind supports two operations:
//!
//! - [`PortState::mix`]: blend toward another state of the same kind
//! - [`PortState::max_residual`]: symmetric, non-negative distance to another
//!   state of the same kind
//!
//! Operating across different kinds is a [`StateError::KindMismatch`].

use core::fmt;

use gt_core::{
    MassRate, Power, Pressure, Ratio, Real, Temperature, blend, k, kgps, pa, scaled_residual,
    unitless, w,
};

use crate::error::{StateError, StateResult};

/// Discriminant of a [`PortState`], used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    Gas,
    Pressure,
    Temperature,
    Power,
    Scalar,
    Vector,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StateKind::Gas => "gas",
            StateKind::Pressure => "pressure",
            StateKind::Temperature => "temperature",
            StateKind::Power => "power",
            StateKind::Scalar => "scalar",
            StateKind::Vector => "vector",
        };
        f.write_str(s)
    }
}

/// Total state of a working-gas stream at a station.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasState {
    pub pressure: Pressure,
    pub temperature: Temperature,
    pub mass_flow: MassRate,
    pub fuel_air_ratio: Ratio,
}

impl GasState {
    pub fn new(pressure: Pressure, temperature: Temperature, mass_flow: MassRate) -> Self {
        Self {
            pressure,
            temperature,
            mass_flow,
            fuel_air_ratio: unitless(0.0),
        }
    }

    pub fn with_fuel_air_ratio(mut self, far: Ratio) -> Self {
        self.fuel_air_ratio = far;
        self
    }

    fn mix(&self, other: &GasState, c: Real) -> GasState {
        GasState {
            pressure: pa(blend(self.pressure.value, other.pressure.value, c)),
            temperature: k(blend(self.temperature.value, other.temperature.value, c)),
            mass_flow: kgps(blend(self.mass_flow.value, other.mass_flow.value, c)),
            fuel_air_ratio: unitless(blend(
                self.fuel_air_ratio.value,
                other.fuel_air_ratio.value,
                c,
            )),
        }
    }

    fn max_residual(&self, other: &GasState) -> Real {
        [
            scaled_residual(self.pressure.value, other.pressure.value),
            scaled_residual(self.temperature.value, other.temperature.value),
            scaled_residual(self.mass_flow.value, other.mass_flow.value),
            scaled_residual(self.fuel_air_ratio.value, other.fuel_air_ratio.value),
        ]
        .into_iter()
        .fold(0.0, Real::max)
    }
}

/// Value held by a port.
#[derive(Debug, Clone, PartialEq)]
pub enum PortState {
    Gas(GasState),
    Pressure(Pressure),
    Temperature(Temperature),
    Power(Power),
    /// Dimensionless or caller-defined quantity (shaft speed, ratio, ...).
    Scalar(Real),
    /// Assembled vector, typically a set of consistency residuals.
    Vector(Vec<Real>),
}

impl PortState {
    pub fn kind(&self) -> StateKind {
        match self {
            PortState::Gas(_) => StateKind::Gas,
            PortState::Pressure(_) => StateKind::Pressure,
            PortState::Temperature(_) => StateKind::Temperature,
            PortState::Power(_) => StateKind::Power,
            PortState::Scalar(_) => StateKind::Scalar,
            PortState::Vector(_) => StateKind::Vector,
        }
    }

    /// Blend toward `other`: `relax_coef == 0` keeps `self`, `1` yields `other`.
    pub fn mix(&self, other: &PortState, relax_coef: Real) -> StateResult<PortState> {
        if !(0.0..=1.0).contains(&relax_coef) {
            return Err(StateError::InvalidCoefficient { value: relax_coef });
        }
        let c = relax_coef;
        let mixed = match (self, other) {
            (PortState::Gas(a), PortState::Gas(b)) => PortState::Gas(a.mix(b, c)),
            (PortState::Pressure(a), PortState::Pressure(b)) => {
                PortState::Pressure(pa(blend(a.value, b.value, c)))
            }
            (PortState::Temperature(a), PortState::Temperature(b)) => {
                PortState::Temperature(k(blend(a.value, b.value, c)))
            }
            (PortState::Power(a), PortState::Power(b)) => {
                PortState::Power(w(blend(a.value, b.value, c)))
            }
            (PortState::Scalar(a), PortState::Scalar(b)) => PortState::Scalar(blend(*a, *b, c)),
            (PortState::Vector(a), PortState::Vector(b)) => {
                same_len(a, b)?;
                PortState::Vector(a.iter().zip(b).map(|(x, y)| blend(*x, *y, c)).collect())
            }
            _ => return Err(self.mismatch(other)),
        };
        Ok(mixed)
    }

    /// Largest scaled component difference to `other`.
    pub fn max_residual(&self, other: &PortState) -> StateResult<Real> {
        let r = match (self, other) {
            (PortState::Gas(a), PortState::Gas(b)) => a.max_residual(b),
            (PortState::Pressure(a), PortState::Pressure(b)) => scaled_residual(a.value, b.value),
            (PortState::Temperature(a), PortState::Temperature(b)) => {
                scaled_residual(a.value, b.value)
            }
            (PortState::Power(a), PortState::Power(b)) => scaled_residual(a.value, b.value),
            (PortState::Scalar(a), PortState::Scalar(b)) => scaled_residual(*a, *b),
            (PortState::Vector(a), PortState::Vector(b)) => {
                same_len(a, b)?;
                a.iter()
                    .zip(b)
                    .map(|(x, y)| scaled_residual(*x, *y))
                    .fold(0.0, Real::max)
            }
            _ => return Err(self.mismatch(other)),
        };
        Ok(r)
    }

    /// Value of a scalar-like state in SI base units.
    pub fn as_scalar(&self) -> StateResult<Real> {
        match self {
            PortState::Pressure(p) => Ok(p.value),
            PortState::Temperature(t) => Ok(t.value),
            PortState::Power(p) => Ok(p.value),
            PortState::Scalar(v) => Ok(*v),
            PortState::Gas(_) | PortState::Vector(_) => {
                Err(StateError::NotScalar { kind: self.kind() })
            }
        }
    }

    pub fn as_gas(&self) -> StateResult<&GasState> {
        match self {
            PortState::Gas(g) => Ok(g),
            other => Err(StateError::KindMismatch {
                left: StateKind::Gas,
                right: other.kind(),
            }),
        }
    }

    pub fn as_vector(&self) -> StateResult<&[Real]> {
        match self {
            PortState::Vector(v) => Ok(v),
            other => Err(StateError::KindMismatch {
                left: StateKind::Vector,
                right: other.kind(),
            }),
        }
    }

    fn mismatch(&self, other: &PortState) -> StateError {
        StateError::KindMismatch {
            left: self.kind(),
            right: other.kind(),
        }
    }
}

impl From<GasState> for PortState {
    fn from(g: GasState) -> Self {
        PortState::Gas(g)
    }
}

fn same_len(a: &[Real], b: &[Real]) -> StateResult<()> {
    if a.len() == b.len() {
        Ok(())
    } else {
        Err(StateError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        })
    }
}

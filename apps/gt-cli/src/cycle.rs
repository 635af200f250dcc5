//! Toy Brayton-cycle schemes driven by the demo commands.
//!
//! Component models use constant heat capacities and fixed isentropic
//! exponents. They are coarse on purpose: the point is the wiring, not the
//! thermodynamics.

use std::cell::Cell;
use std::rc::Rc;

use gt_core::constants::{P_STD_PA, p_std, t_std};
use gt_core::{CoreError, CoreResult, NodeId, ensure_unit_interval, k, kgps, pa, unitless, w};
use gt_graph::{
    Assembler, Constant, CycleBreaker, Formula, GasState, Network, NetworkResult, NodeError,
    NodeResult, PortState, Sink,
};
use serde::{Deserialize, Serialize};

const CP_AIR: f64 = 1005.0;
const CP_GAS: f64 = 1150.0;
// (gamma - 1) / gamma
const EXP_AIR: f64 = 0.2857;
const EXP_GAS: f64 = 0.2481;
const FUEL_LHV: f64 = 43.0e6;

/// Design-point inputs shared by both schemes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleParams {
    /// Inlet air flow in kg/s.
    pub mass_flow: f64,
    pub pressure_ratio: f64,
    pub compressor_efficiency: f64,
    pub turbine_efficiency: f64,
    /// Turbine inlet temperature in K.
    pub turbine_inlet_temperature: f64,
    pub recuperator_effectiveness: f64,
    /// Fractional total-pressure loss of each duct element.
    pub pressure_loss: f64,
}

impl Default for CycleParams {
    fn default() -> Self {
        Self {
            mass_flow: 10.0,
            pressure_ratio: 4.0,
            compressor_efficiency: 0.85,
            turbine_efficiency: 0.88,
            turbine_inlet_temperature: 1200.0,
            recuperator_effectiveness: 0.85,
            pressure_loss: 0.03,
        }
    }
}

impl CycleParams {
    pub fn validate(&self) -> CoreResult<()> {
        positive(self.mass_flow, "mass_flow")?;
        positive(self.turbine_inlet_temperature, "turbine_inlet_temperature")?;
        if self.pressure_ratio.is_nan() || self.pressure_ratio <= 1.0 {
            return Err(CoreError::OutOfRange {
                what: "pressure_ratio",
                value: self.pressure_ratio,
                range: "(1, inf)",
            });
        }
        ensure_unit_interval(self.compressor_efficiency, "compressor_efficiency")?;
        ensure_unit_interval(self.turbine_efficiency, "turbine_efficiency")?;
        ensure_unit_interval(self.recuperator_effectiveness, "recuperator_effectiveness")?;
        ensure_unit_interval(self.pressure_loss, "pressure_loss")?;
        Ok(())
    }

    /// Turbine exit pressure: ambient plus one duct loss.
    fn exit_pressure(&self) -> f64 {
        P_STD_PA * (1.0 + self.pressure_loss)
    }
}

/// Sea-level static air.
fn ambient_air(mass_flow: f64) -> GasState {
    GasState::new(p_std(), t_std(), kgps(mass_flow))
}

fn positive(v: f64, what: &'static str) -> CoreResult<()> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(CoreError::OutOfRange {
            what,
            value: v,
            range: "(0, inf)",
        })
    }
}

/// Compressed stream and absorbed power in W.
fn compress(g: &GasState, pr: f64, eta: f64) -> (GasState, f64) {
    let t1 = g.temperature.value;
    let t2 = t1 * (1.0 + (pr.powf(EXP_AIR) - 1.0) / eta);
    let out = GasState {
        pressure: pa(g.pressure.value * pr),
        temperature: k(t2),
        ..*g
    };
    (out, g.mass_flow.value * CP_AIR * (t2 - t1))
}

fn burn(g: &GasState, tit: f64, loss: f64) -> NodeResult<GasState> {
    let t_in = g.temperature.value;
    if tit <= t_in {
        return Err(NodeError::domain(format!(
            "burner inlet at {t_in:.1} K is not below target {tit:.1} K"
        )));
    }
    let m = g.mass_flow.value;
    let fuel = m * CP_GAS * (tit - t_in) / FUEL_LHV;
    Ok(GasState {
        pressure: pa(g.pressure.value * (1.0 - loss)),
        temperature: k(tit),
        mass_flow: kgps(m + fuel),
        fuel_air_ratio: unitless(g.fuel_air_ratio.value + fuel / m),
    })
}

/// Expanded stream and delivered power in W.
fn expand(g: &GasState, p_out: f64, eta: f64) -> NodeResult<(GasState, f64)> {
    let pr = g.pressure.value / p_out;
    if pr <= 1.0 {
        return Err(NodeError::domain(format!(
            "turbine pressure ratio {pr:.3} leaves nothing to expand"
        )));
    }
    let t_in = g.temperature.value;
    let t_out = t_in * (1.0 - eta * (1.0 - pr.powf(-EXP_GAS)));
    let out = GasState {
        pressure: pa(p_out),
        temperature: k(t_out),
        ..*g
    };
    Ok((out, g.mass_flow.value * CP_GAS * (t_in - t_out)))
}

/// Counterflow exchanger with fixed effectiveness.
fn recuperate(cold: &GasState, hot: &GasState, eff: f64, loss: f64) -> (GasState, GasState) {
    let c_cold = cold.mass_flow.value * CP_AIR;
    let c_hot = hot.mass_flow.value * CP_GAS;
    let (tc, th) = (cold.temperature.value, hot.temperature.value);
    let q = eff * c_cold.min(c_hot) * (th - tc);
    let cold_out = GasState {
        pressure: pa(cold.pressure.value * (1.0 - loss)),
        temperature: k(tc + q / c_cold),
        ..*cold
    };
    let hot_out = GasState {
        pressure: pa(hot.pressure.value * (1.0 - loss)),
        temperature: k(th - q / c_hot),
        ..*hot
    };
    (cold_out, hot_out)
}

fn compressor(p: &CycleParams) -> Formula {
    let (pr, eta) = (p.pressure_ratio, p.compressor_efficiency);
    Formula::new("compressor", &["in"], &["out", "power"], move |i| {
        let (out, power) = compress(i[0].as_gas()?, pr, eta);
        Ok(vec![out.into(), PortState::Power(w(power))])
    })
}

fn burner(tit: Rc<Cell<f64>>, loss: f64) -> Formula {
    Formula::new("burner", &["in"], &["out"], move |i| {
        Ok(vec![burn(i[0].as_gas()?, tit.get(), loss)?.into()])
    })
}

fn turbine(p: &CycleParams) -> Formula {
    let (p_out, eta) = (p.exit_pressure(), p.turbine_efficiency);
    Formula::new("turbine", &["in"], &["out", "power"], move |i| {
        let (out, power) = expand(i[0].as_gas()?, p_out, eta)?;
        Ok(vec![out.into(), PortState::Power(w(power))])
    })
}

fn shaft() -> Formula {
    Formula::new("shaft", &["compressor", "turbine"], &["net"], |i| {
        let net = i[1].as_scalar()? - i[0].as_scalar()?;
        Ok(vec![PortState::Power(w(net))])
    })
}

/// Net power over fuel heat input; zero when no fuel burns.
pub fn thermal_efficiency(net_power: f64, air_flow: f64, fuel_air_ratio: f64) -> f64 {
    let heat = air_flow * fuel_air_ratio * FUEL_LHV;
    if heat > 0.0 { net_power / heat } else { 0.0 }
}

/// Stations read back after a solve.
#[derive(Debug, Clone, Copy)]
pub struct Stations {
    pub burner: NodeId,
    pub shaft: NodeId,
    /// Node and tag of the stream leaving the engine.
    pub stack: (NodeId, &'static str),
}

/// Recuperated cycle: the exhaust heats compressor delivery air.
///
/// The recuperator's hot side depends on the turbine, which depends on the
/// burner and thus on the recuperator's cold side. A cycle breaker on the
/// hot-side inlet closes that loop; both breaker ports are seeded with an
/// exhaust guess.
pub fn recuperated(p: &CycleParams) -> NetworkResult<(Network, Stations)> {
    let mut net = Network::new();
    let inlet = net.add_node(Constant::new("inlet", ambient_air(p.mass_flow).into()))?;
    let comp = net.add_node(compressor(p))?;
    let loss = p.pressure_loss;
    let eff = p.recuperator_effectiveness;
    let recup = net.add_node(Formula::new(
        "recuperator",
        &["cold_in", "hot_in"],
        &["cold_out", "hot_out"],
        move |i| {
            let (c, h) = recuperate(i[0].as_gas()?, i[1].as_gas()?, eff, loss);
            Ok(vec![c.into(), h.into()])
        },
    ))?;
    let burn = net.add_node(burner(Rc::new(Cell::new(p.turbine_inlet_temperature)), loss))?;
    let turb = net.add_node(turbine(p))?;
    let cb = net.add_node(CycleBreaker::new("exhaust_loop"))?;
    let shaft = net.add_node(shaft())?;
    let stack = net.add_node(Sink::new("stack"))?;
    let load = net.add_node(Sink::new("load"))?;

    net.link((inlet, "out"), (comp, "in"))?;
    net.link((comp, "out"), (recup, "cold_in"))?;
    net.link((recup, "cold_out"), (burn, "in"))?;
    net.link((burn, "out"), (turb, "in"))?;
    net.link((turb, "out"), (cb, "a"))?;
    net.link((cb, "b"), (recup, "hot_in"))?;
    net.link((recup, "hot_out"), (stack, "in"))?;
    net.link((comp, "power"), (shaft, "compressor"))?;
    net.link((turb, "power"), (shaft, "turbine"))?;
    net.link((shaft, "net"), (load, "in"))?;

    let guess = GasState {
        pressure: pa(p.exit_pressure()),
        temperature: k(0.7 * p.turbine_inlet_temperature),
        mass_flow: kgps(p.mass_flow * 1.02),
        fuel_air_ratio: unitless(0.02),
    };
    net.set_state(cb, "a", guess.into())?;
    net.set_state(cb, "b", guess.into())?;

    Ok((
        net,
        Stations {
            burner: burn,
            shaft,
            stack: (recup, "hot_out"),
        },
    ))
}

/// Operating targets for the balance scheme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Targets {
    /// Net shaft power in W.
    pub power: f64,
    /// Turbine exhaust temperature in K.
    pub exhaust_temperature: f64,
}

/// Simple cycle whose air flow and turbine inlet temperature are free.
pub struct Balance {
    pub net: Network,
    pub stations: Stations,
    /// Node carrying the assembled residual vector on `out`.
    pub residuals: NodeId,
    pub mass_flow: Rc<Cell<f64>>,
    pub turbine_inlet_temperature: Rc<Cell<f64>>,
}

/// Build the balance scheme, seeded from `p`.
///
/// The residuals are the relative power and exhaust temperature errors, so
/// both are nulled only at the operating point that meets `targets`.
pub fn balance(p: &CycleParams, targets: Targets) -> NetworkResult<Balance> {
    let mass_flow = Rc::new(Cell::new(p.mass_flow));
    let tit = Rc::new(Cell::new(p.turbine_inlet_temperature));

    let mut net = Network::new();
    let flow = Rc::clone(&mass_flow);
    let inlet = net.add_node(Formula::new("inlet", &[], &["out"], move |_| {
        Ok(vec![ambient_air(flow.get()).into()])
    }))?;
    let comp = net.add_node(compressor(p))?;
    let burn = net.add_node(burner(Rc::clone(&tit), p.pressure_loss))?;
    let turb = net.add_node(turbine(p))?;
    let shaft = net.add_node(shaft())?;
    let errors = net.add_node(Formula::new(
        "targets",
        &["net", "exhaust"],
        &["power", "temperature"],
        move |i| {
            let power = i[0].as_scalar()?;
            let t_exh = i[1].as_gas()?.temperature.value;
            Ok(vec![
                PortState::Scalar((power - targets.power) / targets.power),
                PortState::Scalar(
                    (t_exh - targets.exhaust_temperature) / targets.exhaust_temperature,
                ),
            ])
        },
    ))?;
    let residuals = net.add_node(Assembler::new(
        "residuals",
        &["power", "temperature"],
        "out",
    ))?;
    let end = net.add_node(Sink::new("end"))?;

    net.link((inlet, "out"), (comp, "in"))?;
    net.link((comp, "out"), (burn, "in"))?;
    net.link((burn, "out"), (turb, "in"))?;
    net.link((comp, "power"), (shaft, "compressor"))?;
    net.link((turb, "power"), (shaft, "turbine"))?;
    net.link((shaft, "net"), (errors, "net"))?;
    net.link((turb, "out"), (errors, "exhaust"))?;
    net.link((errors, "power"), (residuals, "power"))?;
    net.link((errors, "temperature"), (residuals, "temperature"))?;
    net.link((residuals, "out"), (end, "in"))?;

    Ok(Balance {
        net,
        stations: Stations {
            burner: burn,
            shaft,
            stack: (turb, "out"),
        },
        residuals,
        mass_flow,
        turbine_inlet_temperature: tit,
    })
}

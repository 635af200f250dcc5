//! Domain-free library nodes.
//!
//! These carry no physics. Physical units (compressors, burners, ...) are
//! expected to implement [`Node`] themselves; the nodes here cover the
//! plumbing every scheme needs: fixed boundary values, closures, residual
//! assembly, pass-throughs and loop breaking.

use crate::error::{NodeError, NodeResult, StateError};
use crate::node::{Node, PortIo, PortView};
use crate::port::PortTag;
use crate::state::PortState;

const OUT_ONLY: &[PortTag] = &[Constant::OUT];
const A_AND_B: &[PortTag] = &["a", "b"];
const IN_ONLY: &[PortTag] = &[Sink::IN];

/// Emits a fixed state on port `out` every pass.
#[derive(Debug, Clone)]
pub struct Constant {
    name: String,
    state: PortState,
}

impl Constant {
    pub const OUT: PortTag = "out";

    pub fn new(name: impl Into<String>, state: PortState) -> Self {
        Self {
            name: name.into(),
            state,
        }
    }
}

impl Node for Constant {
    fn name(&self) -> &str {
        &self.name
    }

    fn port_tags(&self) -> &[PortTag] {
        OUT_ONLY
    }

    fn required_ports(&self) -> &[PortTag] {
        &[]
    }

    fn updated_ports(&self) -> &[PortTag] {
        OUT_ONLY
    }

    fn process(&mut self, io: &mut PortIo<'_>) -> NodeResult<()> {
        io.set(Self::OUT, self.state.clone())
    }
}

/// Caps a port nothing else consumes. Reads and writes nothing.
#[derive(Debug, Clone)]
pub struct Sink {
    name: String,
}

impl Sink {
    pub const IN: PortTag = "in";

    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Node for Sink {
    fn name(&self) -> &str {
        &self.name
    }

    fn port_tags(&self) -> &[PortTag] {
        IN_ONLY
    }

    fn required_ports(&self) -> &[PortTag] {
        &[]
    }

    fn updated_ports(&self) -> &[PortTag] {
        &[]
    }

    fn process(&mut self, _io: &mut PortIo<'_>) -> NodeResult<()> {
        Ok(())
    }
}

/// Closure mapping input states to output states.
pub type FormulaFn = Box<dyn FnMut(&[PortState]) -> NodeResult<Vec<PortState>>>;

/// Node whose behavior is a closure over its input states.
///
/// The closure receives the inputs in declaration order and must return
/// exactly one state per output, also in declaration order.
pub struct Formula {
    name: String,
    tags: Vec<PortTag>,
    inputs: usize,
    f: FormulaFn,
}

impl Formula {
    pub fn new<F>(name: impl Into<String>, inputs: &[PortTag], outputs: &[PortTag], f: F) -> Self
    where
        F: FnMut(&[PortState]) -> NodeResult<Vec<PortState>> + 'static,
    {
        let mut tags = inputs.to_vec();
        tags.extend_from_slice(outputs);
        Self {
            name: name.into(),
            tags,
            inputs: inputs.len(),
            f: Box::new(f),
        }
    }

    /// Single scalar input `in` mapped to single scalar output `out`.
    pub fn scalar<F>(name: impl Into<String>, mut f: F) -> Self
    where
        F: FnMut(f64) -> f64 + 'static,
    {
        Self::new(name, &["in"], &["out"], move |s| {
            Ok(vec![PortState::Scalar(f(s[0].as_scalar()?))])
        })
    }
}

impl Node for Formula {
    fn name(&self) -> &str {
        &self.name
    }

    fn port_tags(&self) -> &[PortTag] {
        &self.tags
    }

    fn required_ports(&self) -> &[PortTag] {
        &self.tags[..self.inputs]
    }

    fn updated_ports(&self) -> &[PortTag] {
        &self.tags[self.inputs..]
    }

    fn process(&mut self, io: &mut PortIo<'_>) -> NodeResult<()> {
        let inputs = self.tags[..self.inputs]
            .iter()
            .map(|&tag| io.get(tag).cloned())
            .collect::<NodeResult<Vec<_>>>()?;
        let outputs = (self.f)(&inputs)?;
        let out_tags = &self.tags[self.inputs..];
        if outputs.len() != out_tags.len() {
            return Err(NodeError::OutputCount {
                expected: out_tags.len(),
                found: outputs.len(),
            });
        }
        for (&tag, state) in out_tags.iter().zip(outputs) {
            io.set(tag, state)?;
        }
        Ok(())
    }
}

/// Packs scalar-like inputs into one vector state.
///
/// This is how a scheme exposes its global consistency residuals (mass,
/// power and pressure balances) as a single port for an outer solve.
#[derive(Debug, Clone)]
pub struct Assembler {
    name: String,
    tags: Vec<PortTag>,
}

impl Assembler {
    pub fn new(name: impl Into<String>, inputs: &[PortTag], output: PortTag) -> Self {
        let mut tags = inputs.to_vec();
        tags.push(output);
        Self {
            name: name.into(),
            tags,
        }
    }

    fn split(&self) -> (&[PortTag], PortTag) {
        let n = self.tags.len() - 1;
        (&self.tags[..n], self.tags[n])
    }
}

impl Node for Assembler {
    fn name(&self) -> &str {
        &self.name
    }

    fn port_tags(&self) -> &[PortTag] {
        &self.tags
    }

    fn required_ports(&self) -> &[PortTag] {
        self.split().0
    }

    fn updated_ports(&self) -> &[PortTag] {
        &self.tags[self.tags.len() - 1..]
    }

    fn process(&mut self, io: &mut PortIo<'_>) -> NodeResult<()> {
        let (inputs, output) = self.split();
        let values = inputs
            .iter()
            .map(|&tag| io.scalar(tag))
            .collect::<NodeResult<Vec<_>>>()?;
        io.set(output, PortState::Vector(values))
    }
}

/// Two-port pass-through whose direction follows the data.
///
/// Whichever port already carries a value when a solve starts becomes the
/// input; the other one is overwritten with a copy each pass. With neither
/// or both ports set, the last resolved direction is kept (`a` to `b`
/// initially).
#[derive(Debug, Clone)]
pub struct Relay {
    name: String,
    // [input, output]
    roles: [PortTag; 2],
}

impl Relay {
    pub const A: PortTag = "a";
    pub const B: PortTag = "b";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roles: [Self::A, Self::B],
        }
    }

    /// Tag currently treated as input.
    pub fn input(&self) -> PortTag {
        self.roles[0]
    }
}

impl Node for Relay {
    fn name(&self) -> &str {
        &self.name
    }

    fn port_tags(&self) -> &[PortTag] {
        A_AND_B
    }

    fn required_ports(&self) -> &[PortTag] {
        &self.roles[..1]
    }

    fn updated_ports(&self) -> &[PortTag] {
        &self.roles[1..]
    }

    fn resolve_ports(&mut self, view: &PortView<'_>) {
        match (view.has_value(Self::A), view.has_value(Self::B)) {
            (true, false) => self.roles = [Self::A, Self::B],
            (false, true) => self.roles = [Self::B, Self::A],
            _ => {}
        }
    }

    fn process(&mut self, io: &mut PortIo<'_>) -> NodeResult<()> {
        let [input, output] = self.roles;
        let state = io.get(input)?.clone();
        io.set(output, state)
    }
}

/// Splits a physically closed loop so it can be scheduled.
///
/// The breaker requires nothing, so ordering may place it anywhere. Each
/// pass it hands the state port `a` held before the pass to port `b`, and
/// the previous state of `b` to `a`. The value crossing the breaker is one
/// pass stale; repeated passes drive it to the loop's fixed point when the
/// loop is contractive.
///
/// With a relaxation coefficient below 1 the forwarded value is blended
/// with the receiving port's previous value instead of replacing it.
#[derive(Debug, Clone)]
pub struct CycleBreaker {
    name: String,
    relax_coef: f64,
}

impl CycleBreaker {
    pub const A: PortTag = "a";
    pub const B: PortTag = "b";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relax_coef: 1.0,
        }
    }

    pub fn with_relaxation(mut self, relax_coef: f64) -> Result<Self, StateError> {
        if !(0.0..=1.0).contains(&relax_coef) {
            return Err(StateError::InvalidCoefficient { value: relax_coef });
        }
        self.relax_coef = relax_coef;
        Ok(self)
    }

    fn forward(
        &self,
        from: Option<&PortState>,
        to: Option<&PortState>,
    ) -> NodeResult<Option<PortState>> {
        Ok(match (from, to) {
            (None, _) => None,
            (Some(f), Some(t)) if self.relax_coef < 1.0 => Some(t.mix(f, self.relax_coef)?),
            (Some(f), _) => Some(f.clone()),
        })
    }
}

impl Node for CycleBreaker {
    fn name(&self) -> &str {
        &self.name
    }

    fn port_tags(&self) -> &[PortTag] {
        A_AND_B
    }

    fn required_ports(&self) -> &[PortTag] {
        &[]
    }

    fn updated_ports(&self) -> &[PortTag] {
        A_AND_B
    }

    fn process(&mut self, io: &mut PortIo<'_>) -> NodeResult<()> {
        let old_a = io.try_get(Self::A)?.cloned();
        let old_b = io.try_get(Self::B)?.cloned();
        let new_b = self.forward(old_a.as_ref(), old_b.as_ref())?;
        let new_a = self.forward(old_b.as_ref(), old_a.as_ref())?;
        if let Some(s) = new_b {
            io.set(Self::B, s)?;
        }
        if let Some(s) = new_a {
            io.set(Self::A, s)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkError;
    use crate::network::{Network, RelaxConfig};

    fn one_pass() -> RelaxConfig {
        RelaxConfig::new(1.0, 1, 0.0)
    }

    #[test]
    fn formula_checks_output_count() {
        let mut net = Network::new();
        let a = net.add_node(Constant::new("a", PortState::Scalar(1.0))).unwrap();
        let f = net
            .add_node(Formula::new("f", &["in"], &["out"], |_| Ok(vec![])))
            .unwrap();
        let end = net.add_node(Sink::new("end")).unwrap();
        net.link((a, "out"), (f, "in")).unwrap();
        net.link((f, "out"), (end, "in")).unwrap();

        match net.solve(&one_pass()).unwrap_err() {
            NetworkError::Process { source, .. } => assert_eq!(
                source,
                NodeError::OutputCount {
                    expected: 1,
                    found: 0
                }
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn assembler_packs_inputs_in_order() {
        let mut net = Network::new();
        let x = net.add_node(Constant::new("x", PortState::Scalar(1.5))).unwrap();
        let y = net.add_node(Constant::new("y", PortState::Scalar(-4.0))).unwrap();
        let asm = net
            .add_node(Assembler::new("residuals", &["mass", "power"], "out"))
            .unwrap();
        let end = net.add_node(Sink::new("end")).unwrap();
        net.link((y, "out"), (asm, "power")).unwrap();
        net.link((x, "out"), (asm, "mass")).unwrap();
        net.link((asm, "out"), (end, "in")).unwrap();

        net.solve(&one_pass()).unwrap();
        assert_eq!(net.vector(asm, "out").unwrap(), vec![1.5, -4.0]);
    }

    #[test]
    fn assembler_rejects_non_scalar_input() {
        let mut net = Network::new();
        let v = net
            .add_node(Constant::new("v", PortState::Vector(vec![1.0])))
            .unwrap();
        let asm = net.add_node(Assembler::new("r", &["in"], "out")).unwrap();
        let end = net.add_node(Sink::new("end")).unwrap();
        net.link((v, "out"), (asm, "in")).unwrap();
        net.link((asm, "out"), (end, "in")).unwrap();

        assert!(matches!(
            net.solve(&one_pass()),
            Err(NetworkError::Process {
                source: NodeError::State(StateError::NotScalar { .. }),
                ..
            })
        ));
    }

    #[test]
    fn breaker_swaps_previous_values() {
        let mut net = Network::new();
        let cb = net.add_node(CycleBreaker::new("cb")).unwrap();
        let left = net.add_node(Sink::new("left")).unwrap();
        let right = net.add_node(Sink::new("right")).unwrap();
        net.link((cb, "a"), (left, "in")).unwrap();
        net.link((cb, "b"), (right, "in")).unwrap();
        net.set_state(cb, "a", PortState::Scalar(1.0)).unwrap();
        net.set_state(cb, "b", PortState::Scalar(3.0)).unwrap();

        net.solve(&one_pass()).unwrap();
        assert_eq!(net.state(cb, "b").unwrap(), Some(&PortState::Scalar(1.0)));
        assert_eq!(net.state(right, "in").unwrap(), Some(&PortState::Scalar(1.0)));
        assert_eq!(net.state(cb, "a").unwrap(), Some(&PortState::Scalar(3.0)));
    }

    #[test]
    fn relaxed_breaker_blends_toward_forwarded_value() {
        let mut net = Network::new();
        let cb = net
            .add_node(CycleBreaker::new("cb").with_relaxation(0.25).unwrap())
            .unwrap();
        let left = net.add_node(Sink::new("left")).unwrap();
        let right = net.add_node(Sink::new("right")).unwrap();
        net.link((cb, "a"), (left, "in")).unwrap();
        net.link((cb, "b"), (right, "in")).unwrap();
        net.set_state(cb, "a", PortState::Scalar(4.0)).unwrap();
        net.set_state(cb, "b", PortState::Scalar(0.0)).unwrap();

        net.solve(&one_pass()).unwrap();
        assert_eq!(net.state(cb, "b").unwrap(), Some(&PortState::Scalar(1.0)));
        assert_eq!(net.state(cb, "a").unwrap(), Some(&PortState::Scalar(3.0)));
    }

    #[test]
    fn breaker_leaves_unseeded_side_alone() {
        let mut net = Network::new();
        let cb = net.add_node(CycleBreaker::new("cb")).unwrap();
        let left = net.add_node(Sink::new("left")).unwrap();
        let right = net.add_node(Sink::new("right")).unwrap();
        net.link((cb, "a"), (left, "in")).unwrap();
        net.link((cb, "b"), (right, "in")).unwrap();
        net.set_state(cb, "b", PortState::Scalar(2.0)).unwrap();

        net.solve(&one_pass()).unwrap();
        assert_eq!(net.state(cb, "a").unwrap(), Some(&PortState::Scalar(2.0)));
        assert_eq!(net.state(cb, "b").unwrap(), Some(&PortState::Scalar(2.0)));
    }

    #[test]
    fn breaker_has_no_requirements() {
        let cb = CycleBreaker::new("cb");
        assert!(cb.required_ports().is_empty());
        assert_eq!(cb.updated_ports(), &["a", "b"]);
    }

    #[test]
    fn relay_starts_forward() {
        assert_eq!(Relay::new("r").input(), Relay::A);
    }
}

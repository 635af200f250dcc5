//! gt-graph: node/port graph and fixed-point relaxation engine.
//!
//! Provides:
//! - `PortState`, the closed set of values ports carry
//! - Port arena with symmetric links, and the `Node` contract
//! - Domain-free library nodes, including the `CycleBreaker`
//! - Dependency tables and layered call order
//! - `Network`, which validates, orders and relaxes a graph
//!
//! # Example
//!
//! ```
//! use gt_graph::{Constant, Formula, Network, PortState, RelaxConfig, Sink};
//!
//! let mut net = Network::new();
//! let a = net.add_node(Constant::new("a", PortState::Scalar(2.0))).unwrap();
//! let b = net.add_node(Formula::scalar("b", |x| x + 1.0)).unwrap();
//! let end = net.add_node(Sink::new("end")).unwrap();
//! net.link((a, "out"), (b, "in")).unwrap();
//! net.link((b, "out"), (end, "in")).unwrap();
//!
//! let report = net.solve(&RelaxConfig::default()).unwrap();
//! assert!(report.converged);
//! assert_eq!(net.state(b, "out").unwrap(), Some(&PortState::Scalar(3.0)));
//! ```

pub mod error;
pub mod network;
pub mod node;
pub mod nodes;
pub mod order;
pub mod port;
pub mod state;
pub(crate) mod validate;

pub use error::{
    NetworkError, NetworkResult, NodeError, NodeResult, StateError, StateResult,
};
pub use network::{Network, RelaxConfig, SolveReport};
pub use node::{Node, PortIo, PortView};
pub use nodes::{Assembler, Constant, CycleBreaker, Formula, FormulaFn, Relay, Sink};
pub use order::{Dependencies, DependencyTable, call_order};
pub use port::{Port, PortTag};
pub use state::{GasState, PortState, StateKind};

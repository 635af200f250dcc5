//! gt-core: shared foundation for the gtcycle engine.
//!
//! Contains:
//! - units (uom SI types + constructors)
//! - numeric (Real, range checks, blend and residual helpers)
//! - ids (typed compact handles for nodes and ports)
//! - error (shared error type)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

pub use error::{CoreError, CoreResult};
pub use ids::{NodeId, PortId};
pub use numeric::*;
pub use units::*;

//! rollgate-health — cluster health gating for rolling maintenance.
//!
//! The health tool is treated as an oracle: it is asked for the set of
//! unhealthy entities, and the gate compares that set against the nodes
//! the run already expects to be unhealthy.
//!
//! # Architecture
//!
//! ```text
//! HealthGate
//!   ├── HealthOracle::check_health() → ClusterHealthReport
//!   │     └── KsckOracle: `kudu cluster ksck` → JSON → unhealthy entities
//!   ├── ExclusionSet (hosts and tables allowed to be unhealthy)
//!   └── poll loop: fixed interval, no retry cap, cancellable
//! ```
//!
//! If the health tool itself fails, the report carries
//! `UnhealthyEntity::Unknown`, which no exclusion matches. The gate then
//! blocks until an operator intervenes.

pub mod exclusion;
pub mod gate;
pub mod oracle;
pub mod report;

pub use exclusion::ExclusionSet;
pub use gate::{GateError, HealthGate, cancelled};
pub use oracle::{HealthOracle, KsckOracle};
pub use report::{ClusterHealthReport, UnhealthyEntity};

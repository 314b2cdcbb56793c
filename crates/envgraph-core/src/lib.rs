//! envgraph-core — the data model shared by every envgraph crate.
//!
//! - **`types`** — resource descriptors, kinds, grant edges
//! - **`topology`** — the per-environment graph container
//! - **`request`** — deployment requests and the environment enumeration
//! - **`config`** — `envgraph.toml` parsing

pub mod config;
pub mod error;
pub mod request;
pub mod topology;
pub mod types;

pub use config::StackConfig;
pub use error::{TopologyError, TopologyResult};
pub use request::{DeploymentRequest, EnvironmentName};
pub use topology::EnvironmentTopology;
pub use types::*;

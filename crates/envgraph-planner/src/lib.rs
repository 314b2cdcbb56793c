//! envgraph planner — turns a deployment request into a validated,
//! deterministically ordered topology.
//!
//! The pipeline is resolve → build → wire → order. Nothing here talks to a
//! provisioning backend; the output [`Plan`] is handed to one.
//!
//! # Components
//!
//! - **`resolver`** — request validation and per-environment parameters
//! - **`builder`** — the base subgraph plus one subgraph per tenant
//! - **`tenants`** — tenant validation and the per-tenant subgraph
//! - **`grants`** — allow grants and the ordering edges they imply
//! - **`perimeter`** — deny-unless-via-endpoint policies
//! - **`order`** — reference checks, topological sort, cycle reporting
//! - **`plan`** — the end-to-end planner and plan rendering
//! - **`ids`** — stable resource ids

pub mod builder;
pub mod error;
pub mod grants;
pub mod ids;
pub mod order;
pub mod perimeter;
pub mod plan;
pub mod resolver;
pub mod tenants;

pub use builder::build;
pub use error::{ErrorClass, PlanError, PlanResult};
pub use grants::GrantWiring;
pub use order::order;
pub use perimeter::perimeter_denials;
pub use plan::{Plan, Planner, format_plan};
pub use resolver::{EnvironmentParameters, Resolver};
pub use tenants::{includes_tenants, validate_tenants};

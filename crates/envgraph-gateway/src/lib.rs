//! envgraph gateway — the provisioning side of the boundary.
//!
//! - **`gateway`** — backend, secret and DNS interfaces
//! - **`simulated`** — an in-process backend with persisted JSON state
//! - **`executor`** — applies a plan once and reports per-position outcomes

pub mod error;
pub mod executor;
pub mod gateway;
pub mod simulated;

pub use error::{GatewayError, GatewayResult};
pub use executor::{ProvisionReport, ProvisionedResource, format_report, provision};
pub use gateway::{
    DnsZoneProvider, ProvisioningGateway, RecordingDnsZone, ResourceOutcome, SecretProvider,
    SecretRef, StaticSecretProvider,
};
pub use simulated::{GatewayState, ResourceRecord, SimulatedGateway};

//! Stable descriptor ids of the base topology.

pub const NETWORK: &str = "network";
pub const S3_ENDPOINT: &str = "network.s3-endpoint";
pub const SQS_ENDPOINT: &str = "network.sqs-endpoint";

pub const FRONTEND_CERTIFICATE: &str = "certificate.frontend";
pub const BACKEND_CERTIFICATE: &str = "certificate.backend";

pub const FRONTEND_BUCKET: &str = "bucket.frontend";
pub const BACKEND_BUCKET: &str = "bucket.backend";
pub const FRONTEND_DISTRIBUTION: &str = "distribution.frontend";
pub const FRONTEND_DNS: &str = "dns.frontend";
pub const API_DNS: &str = "dns.api";

pub const DATABASE_SECRET: &str = "secret.database-credentials";
pub const FORWARDER_KEY_SECRET: &str = "secret.forwarder-key";
pub const DATABASE: &str = "database";
pub const QUEUE: &str = "queue";
pub const COMPUTE_CLUSTER: &str = "compute-cluster";

pub const LOG_DELIVERY_ROLE: &str = "role.log-delivery";
pub const STREAM_FORWARDER_ROLE: &str = "role.stream-forwarder";
pub const STREAM_BACKUP_BUCKET: &str = "bucket.stream-backup";
pub const LOG_STREAM: &str = "log-stream";
pub const LOG_FORWARDER: &str = "log-stream.forwarder";

/// Application log groups, one per container of the compute cluster.
pub const LOG_SOURCES: [&str; 4] = ["api", "migrator", "proxy", "agent"];

pub fn log_group(source: &str) -> String {
    format!("log-group.{source}")
}

pub fn log_subscription(source: &str) -> String {
    format!("log-subscription.{source}")
}

pub fn tenant_media_bucket(tenant: &str) -> String {
    format!("tenant.{tenant}.bucket.media")
}

pub fn tenant_frontend_bucket(tenant: &str) -> String {
    format!("tenant.{tenant}.bucket.frontend")
}

pub fn tenant_distribution(tenant: &str) -> String {
    format!("tenant.{tenant}.distribution")
}

pub fn tenant_dns(tenant: &str) -> String {
    format!("tenant.{tenant}.dns")
}

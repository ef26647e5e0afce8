//! Application Layer
//!
//! Use cases that drive a deployment. This layer:
//! - Depends on the Domain layer (entities, services, ports)
//! - Reaches infrastructure only through ports
//!
//! ## Use Cases
//!
//! - `Pipeline` - ordered phases for one environment
//! - `Aggregator` - root-first runs over environment groups
//! - `VaultBootstrapper` - self-healing secret vault
//! - `TunnelManager` - jump-host forwarding sessions
//! - `CredentialPublisher` - durable and ephemeral kubeconfigs
//! - `HostsPatcher` - hosts table upserts with a remediation fallback
//! - `UiForwarder` - self-restarting UI port-forward

pub mod aggregator;
pub mod credentials;
pub mod hosts;
pub mod pipeline;
pub mod tunnel;
pub mod ui_forward;
pub mod vault;

pub use aggregator::{
    AggregateReport, Aggregator, ClusterRegistrar, EnvironmentRunner, PipelineRunner,
};
pub use credentials::{CredentialPublisher, PublishedBundles};
pub use hosts::{HostsOutcome, HostsPatcher, SYSTEM_HOSTS_FILE};
pub use pipeline::{
    Phase, PhaseOutcome, PhaseStatus, Pipeline, PipelineContext, PipelineReport, RunSettings,
    SkipFlags, Timeouts, Toolbox, WaitBudget,
};
pub use tunnel::{TunnelManager, TunnelRequest, TunnelSettings};
pub use ui_forward::UiForwarder;
pub use vault::{LiveClusterSecret, SecretSource, VaultBootstrapper, VaultOutcome};

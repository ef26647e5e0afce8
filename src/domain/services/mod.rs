//! Domain Services
//!
//! Pure business logic services that operate on domain entities.
//! These services have no I/O dependencies and are easily testable.

pub mod hosts_table;
pub mod kubeconfig;
mod poller;

pub use hosts_table::{patch_hosts_table, remediation_script, HostsTablePatch};
pub use kubeconfig::{transform, BundlePair};
pub use poller::{Readiness, ReadinessPoller, ReadinessProbe};

//! Domain Ports (Interfaces)
//!
//! These traits define the boundaries of the domain layer.
//! Infrastructure layer provides concrete implementations.

pub mod clock;
pub mod collaborators;
pub mod command_runner;
pub mod file_system;
pub mod forwarder;
pub mod pipeline_events;

pub use clock::{Clock, ManualClock, SystemClock};
pub use collaborators::{
    ChartInstaller, ClusterControl, Configurator, PlaybookRun, Provisioner, RemoteShell,
    SshAccess, VaultCipher, VAULT_HEADER,
};
pub use command_runner::{CommandOutput, CommandRunner, CommandSpec};
pub use file_system::{FileLock, FileMode, FileSystem};
pub use forwarder::{ForwardHandle, ForwardLauncher, NetworkProbe, ProbeStatus};
pub use pipeline_events::{NoopEventSink, PipelineEvent, PipelineEventSink};

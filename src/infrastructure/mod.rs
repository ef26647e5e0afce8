//! Infrastructure Layer
//!
//! Concrete implementations of domain ports.
//! This layer handles all I/O operations.
//!
//! ## Structure
//!
//! - `events/` - Event sinks (NDJSON)
//! - `fs/` - Local file system and path helpers
//! - `process/` - Bounded command execution and detached forwarders
//! - `tools/` - terraform, ansible, helm, kubectl, ssh and the HTTP probe

pub mod events;
pub mod fs;
pub mod process;
pub mod tools;

// Re-export for convenience
pub use events::JsonEventSink;
pub use fs::LocalFs;
pub use process::{SystemCommandRunner, SystemForwardLauncher};
pub use tools::{Ansible, AnsibleVault, Helm, HttpProbe, Kubectl, SshShell, Terraform, ToolLimits};

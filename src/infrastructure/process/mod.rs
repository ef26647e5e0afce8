//! Process execution
//!
//! - `SystemCommandRunner` - bounded, captured runs of external tools
//! - `SystemForwardLauncher` - detached forwarders and stale-process cleanup

mod forwarder;
mod runner;

pub use forwarder::{ProcessHandle, SystemForwardLauncher};
pub use runner::SystemCommandRunner;

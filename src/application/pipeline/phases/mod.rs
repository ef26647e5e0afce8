//! The built-in phases and their order per topology.
//!
//! | phase               | direct | jump | fatal |
//! |---------------------|--------|------|-------|
//! | resolve-jump-host   |        | x    | yes   |
//! | provision           | x      | x    | yes   |
//! | read-outputs        | x      | x    | yes   |
//! | prepare-inventory   | x      | x    | no    |
//! | wait-jump-host      |        | x    | yes   |
//! | wait-nodes          | x      |      | no    |
//! | vault               | x      | x    | yes   |
//! | configure           | x      | x    | yes   |
//! | open-tunnel         |        | x    | yes   |
//! | fetch-credentials   | x      | x    | yes   |
//! | wait-control-plane  | x      | x    | yes   |
//! | install-addons      | x      | x    | yes   |
//! | patch-hosts         | x      | x    | no    |
//! | ui-forward          | x      | x    | no    |

mod access;
mod cluster;
mod infra;
mod nodes;

pub use access::{FetchCredentials, OpenTunnel, WaitControlPlane};
pub use cluster::{InstallAddons, PatchHosts, StartUiForward};
pub use infra::{PrepareInventory, Provision, ReadOutputs, ResolveJumpHost};
pub use nodes::{Configure, EnsureVault, WaitJumpHost, WaitNodes};

use crate::domain::entities::Topology;

use super::phase::Phase;

/// Ordered phase list for `topology`
pub fn standard(topology: &Topology) -> Vec<Box<dyn Phase>> {
    let jump = topology.is_jump_mediated();
    let mut phases: Vec<Box<dyn Phase>> = Vec::new();

    if jump {
        phases.push(Box::new(ResolveJumpHost));
    }
    phases.push(Box::new(Provision));
    phases.push(Box::new(ReadOutputs));
    phases.push(Box::new(PrepareInventory));
    if jump {
        phases.push(Box::new(WaitJumpHost));
    } else {
        phases.push(Box::new(WaitNodes));
    }
    phases.push(Box::new(EnsureVault));
    phases.push(Box::new(Configure));
    if jump {
        phases.push(Box::new(OpenTunnel));
    }
    phases.push(Box::new(FetchCredentials));
    phases.push(Box::new(WaitControlPlane));
    phases.push(Box::new(InstallAddons));
    phases.push(Box::new(PatchHosts));
    phases.push(Box::new(StartUiForward));
    phases
}

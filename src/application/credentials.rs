//! Credential publishing
//!
//! Turns the kubeconfig fetched from a control plane into the durable and
//! ephemeral bundles and stores them at their namespaced paths (0600).

use std::path::PathBuf;
use std::sync::Arc;

use crate::domain::entities::ArtifactNamespace;
use crate::domain::ports::{FileMode, FileSystem};
use crate::domain::services::{transform, BundlePair};
use crate::domain::value_objects::Endpoint;
use crate::error::ShipwrightResult;

/// Where the bundles of one environment ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedBundles {
    pub durable: PathBuf,
    pub ephemeral: Option<PathBuf>,
}

impl PublishedBundles {
    /// Bundle the orchestrator itself should use: the tunnel one when present
    pub fn for_orchestrator(&self) -> &PathBuf {
        self.ephemeral.as_ref().unwrap_or(&self.durable)
    }
}

pub struct CredentialPublisher {
    fs: Arc<dyn FileSystem>,
}

impl CredentialPublisher {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Rewrite `namespace.raw_bundle()` and persist both materializations
    pub fn publish(
        &self,
        namespace: &ArtifactNamespace,
        durable: &Endpoint,
        tunnel: Option<&Endpoint>,
    ) -> ShipwrightResult<PublishedBundles> {
        let raw = self.fs.read(&namespace.raw_bundle())?;
        let BundlePair { durable, ephemeral } = transform(raw.as_bytes(), durable, tunnel)?;

        let durable_path = namespace.durable_bundle();
        self.fs
            .write_if_changed(&durable_path, durable.as_str(), FileMode::Private)?;

        let ephemeral_path = match ephemeral {
            Some(bundle) => {
                let path = namespace.tunnel_bundle();
                self.fs
                    .write_if_changed(&path, bundle.as_str(), FileMode::Private)?;
                Some(path)
            }
            None => None,
        };

        Ok(PublishedBundles {
            durable: durable_path,
            ephemeral: ephemeral_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::fs::LocalFs;
    use tempfile::tempdir;

    const RAW: &str = "apiVersion: v1\nclusters:\n- cluster:\n    certificate-authority-data: QUJD\n    server: https://127.0.0.1:6443\n  name: default\n";

    #[test]
    fn publishes_both_bundles_at_distinct_paths() {
        let dir = tempdir().unwrap();
        let ns = ArtifactNamespace::new(dir.path(), "edge-east");
        std::fs::create_dir_all(ns.root()).unwrap();
        std::fs::write(ns.raw_bundle(), RAW).unwrap();

        let published = CredentialPublisher::new(Arc::new(LocalFs::new()))
            .publish(&ns, &Endpoint::new("10.1.0.10"), Some(&Endpoint::loopback(16444)))
            .unwrap();

        let durable = std::fs::read_to_string(&published.durable).unwrap();
        let ephemeral = std::fs::read_to_string(published.ephemeral.as_ref().unwrap()).unwrap();
        assert!(durable.contains("https://10.1.0.10:6443"));
        assert!(ephemeral.contains("https://127.0.0.1:16444"));
        assert_eq!(published.for_orchestrator(), &ns.tunnel_bundle());
    }

    #[test]
    fn direct_environment_gets_only_durable_bundle() {
        let dir = tempdir().unwrap();
        let ns = ArtifactNamespace::new(dir.path(), "hub");
        std::fs::create_dir_all(ns.root()).unwrap();
        std::fs::write(ns.raw_bundle(), RAW).unwrap();

        let published = CredentialPublisher::new(Arc::new(LocalFs::new()))
            .publish(&ns, &Endpoint::new("nlb.example.com"), None)
            .unwrap();

        assert!(published.ephemeral.is_none());
        assert!(!ns.tunnel_bundle().exists());
        assert_eq!(published.for_orchestrator(), &ns.durable_bundle());
    }
}

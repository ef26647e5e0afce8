//! kubectl

use std::path::Path;
use std::sync::Arc;

use crate::domain::ports::{ClusterControl, CommandRunner, CommandSpec};
use crate::error::ShipwrightResult;

use super::ToolLimits;

/// First container readiness of every matching pod
const READY_JSONPATH: &str = "jsonpath={.items[*].status.containerStatuses[0].ready}";
const ESTABLISHED_JSONPATH: &str =
    "jsonpath={.status.conditions[?(@.type==\"Established\")].status}";
const NOT_DEFAULT_CLASS_PATCH: &str =
    r#"{"metadata":{"annotations":{"storageclass.kubernetes.io/is-default-class":"false"}}}"#;

pub struct Kubectl {
    runner: Arc<dyn CommandRunner>,
    limits: ToolLimits,
}

impl Kubectl {
    pub fn new(runner: Arc<dyn CommandRunner>, limits: ToolLimits) -> Self {
        Self { runner, limits }
    }

    fn command(&self, kubeconfig: &Path) -> CommandSpec {
        CommandSpec::new("kubectl")
            .arg("--kubeconfig")
            .arg(kubeconfig.display().to_string())
            .arg("--request-timeout=20s")
            .timeout(self.limits.short)
    }

    /// Run a query; a non-zero exit means "not there (yet)"
    fn query(&self, spec: CommandSpec) -> ShipwrightResult<Option<String>> {
        let out = self.runner.run(&spec)?;
        if out.success() {
            Ok(Some(out.stdout))
        } else {
            tracing::debug!(command = %spec, stderr = %out.stderr.trim(), "query not satisfied");
            Ok(None)
        }
    }

    fn ensure_namespace(&self, kubeconfig: &Path, namespace: &str) -> ShipwrightResult<()> {
        let exists = self
            .query(self.command(kubeconfig).args(["get", "namespace", namespace]))?
            .is_some();
        if !exists {
            self.runner.run_checked(
                &self
                    .command(kubeconfig)
                    .args(["create", "namespace", namespace]),
            )?;
        }
        Ok(())
    }
}

/// One-year RSA 2048 certificate with no passphrase
fn self_signed_cert_command(cert: &Path, key: &Path, common_name: &str) -> CommandSpec {
    CommandSpec::new("openssl")
        .args(["req", "-x509", "-nodes", "-days", "365", "-newkey", "rsa:2048"])
        .arg("-keyout")
        .arg(key.display().to_string())
        .arg("-out")
        .arg(cert.display().to_string())
        .arg("-subj")
        .arg(format!("/CN={}", common_name))
}

impl ClusterControl for Kubectl {
    fn nodes_listed(&self, kubeconfig: &Path) -> ShipwrightResult<bool> {
        let out = self.query(
            self.command(kubeconfig)
                .args(["get", "nodes", "--no-headers", "-o", "name"]),
        )?;
        Ok(out.is_some_and(|text| !text.trim().is_empty()))
    }

    fn selector_ready(
        &self,
        kubeconfig: &Path,
        namespace: &str,
        selector: &str,
    ) -> ShipwrightResult<bool> {
        let out = self.query(
            self.command(kubeconfig)
                .args(["get", "pods", "-n", namespace, "-l", selector, "-o", READY_JSONPATH]),
        )?;
        Ok(out.is_some_and(|text| text.split_whitespace().any(|v| v == "true")))
    }

    fn resource_type_ready(&self, kubeconfig: &Path, crd: &str) -> ShipwrightResult<bool> {
        let out = self.query(
            self.command(kubeconfig)
                .args(["get", "crd", crd, "-o", ESTABLISHED_JSONPATH]),
        )?;
        Ok(out.is_some_and(|text| text.trim() == "True"))
    }

    fn service_account_exists(
        &self,
        kubeconfig: &Path,
        namespace: &str,
        name: &str,
    ) -> ShipwrightResult<bool> {
        Ok(self
            .query(
                self.command(kubeconfig)
                    .args(["get", "serviceaccount", name, "-n", namespace]),
            )?
            .is_some())
    }

    fn create_service_account(
        &self,
        kubeconfig: &Path,
        namespace: &str,
        name: &str,
    ) -> ShipwrightResult<()> {
        self.ensure_namespace(kubeconfig, namespace)?;
        self.runner.run_checked(
            &self
                .command(kubeconfig)
                .args(["create", "serviceaccount", name, "-n", namespace]),
        )?;
        Ok(())
    }

    fn secret_exists(
        &self,
        kubeconfig: &Path,
        namespace: &str,
        name: &str,
    ) -> ShipwrightResult<bool> {
        Ok(self
            .query(
                self.command(kubeconfig)
                    .args(["get", "secret", name, "-n", namespace]),
            )?
            .is_some())
    }

    fn create_self_signed_tls_secret(
        &self,
        kubeconfig: &Path,
        namespace: &str,
        name: &str,
        common_name: &str,
    ) -> ShipwrightResult<()> {
        let dir = tempfile::tempdir()?;
        let cert = dir.path().join("tls.crt");
        let key = dir.path().join("tls.key");
        let openssl = self_signed_cert_command(&cert, &key, common_name).timeout(self.limits.short);
        self.runner.run_checked(&openssl)?;

        self.ensure_namespace(kubeconfig, namespace)?;
        self.runner.run_checked(
            &self
                .command(kubeconfig)
                .args(["create", "secret", "tls", name, "-n", namespace])
                .arg(format!("--cert={}", cert.display()))
                .arg(format!("--key={}", key.display())),
        )?;
        Ok(())
    }

    fn demote_storage_class(&self, kubeconfig: &Path, name: &str) -> ShipwrightResult<bool> {
        Ok(self
            .query(
                self.command(kubeconfig)
                    .args(["patch", "storageclass", name, "-p", NOT_DEFAULT_CLASS_PATCH]),
            )?
            .is_some())
    }

    fn apply(&self, kubeconfig: &Path, manifest: &str) -> ShipwrightResult<()> {
        self.runner.run_checked(
            &self
                .command(kubeconfig)
                .args(["apply", "-f", manifest])
                .timeout(self.limits.long),
        )?;
        Ok(())
    }
}

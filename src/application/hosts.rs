//! Hosts Patcher
//!
//! Upserts hostname → address mappings into the local hosts table. A run
//! without the privilege to write it is not a failure: a standalone script
//! applying the same change is written instead and its path reported.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::domain::ports::{FileMode, FileSystem};
use crate::domain::services::{patch_hosts_table, remediation_script};
use crate::domain::value_objects::HostsPatchSet;
use crate::error::{ShipwrightError, ShipwrightResult};

pub const SYSTEM_HOSTS_FILE: &str = "/etc/hosts";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostsOutcome {
    /// Every mapping was already present
    Unchanged,
    Updated,
    /// No privilege; run the script at this path as root
    RemediationRequired { script: PathBuf },
}

impl HostsOutcome {
    /// The table now has (or will have, via the script) new content
    pub fn changed(&self) -> bool {
        !matches!(self, HostsOutcome::Unchanged)
    }
}

pub struct HostsPatcher {
    fs: Arc<dyn FileSystem>,
    hosts_path: PathBuf,
}

impl HostsPatcher {
    pub fn new(fs: Arc<dyn FileSystem>, hosts_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            hosts_path: hosts_path.into(),
        }
    }

    pub fn hosts_path(&self) -> &Path {
        &self.hosts_path
    }

    /// Apply `set`; on missing privilege write the remediation script to
    /// `remediation_path`
    pub fn upsert(
        &self,
        set: &HostsPatchSet,
        remediation_path: &Path,
    ) -> ShipwrightResult<HostsOutcome> {
        if set.is_empty() {
            return Ok(HostsOutcome::Unchanged);
        }

        let current = match self.fs.read(&self.hosts_path) {
            Ok(text) => text,
            Err(ShipwrightError::ConfigurationMissing { .. }) => String::new(),
            Err(ShipwrightError::PrivilegeDenied { .. }) => {
                return self.remediate(set, remediation_path)
            }
            Err(other) => return Err(other),
        };

        let patch = patch_hosts_table(&current, set);
        if !patch.changed {
            return Ok(HostsOutcome::Unchanged);
        }

        match self
            .fs
            .write(&self.hosts_path, &patch.content, FileMode::Default)
        {
            Ok(()) => {
                tracing::info!(path = %self.hosts_path.display(), entry = %set.entry_line(), "hosts table updated");
                Ok(HostsOutcome::Updated)
            }
            Err(ShipwrightError::PrivilegeDenied { .. }) => self.remediate(set, remediation_path),
            Err(other) => Err(other),
        }
    }

    fn remediate(
        &self,
        set: &HostsPatchSet,
        remediation_path: &Path,
    ) -> ShipwrightResult<HostsOutcome> {
        let script = remediation_script(&self.hosts_path.display().to_string(), set);
        self.fs
            .write(remediation_path, &script, FileMode::Executable)?;
        tracing::warn!(
            hosts = %self.hosts_path.display(),
            script = %remediation_path.display(),
            "no privilege to update hosts table; wrote remediation script"
        );
        Ok(HostsOutcome::RemediationRequired {
            script: remediation_path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::FileLock;
    use crate::infrastructure::fs::LocalFs;
    use tempfile::tempdir;

    /// LocalFs that refuses writes to one path
    struct ReadOnlyHosts {
        inner: LocalFs,
        protected: PathBuf,
    }

    impl FileSystem for ReadOnlyHosts {
        fn read(&self, path: &Path) -> ShipwrightResult<String> {
            self.inner.read(path)
        }

        fn write(&self, path: &Path, content: &str, mode: FileMode) -> ShipwrightResult<()> {
            if path == self.protected {
                return Err(ShipwrightError::PrivilegeDenied {
                    path: path.to_path_buf(),
                });
            }
            self.inner.write(path, content, mode)
        }

        fn exists(&self, path: &Path) -> bool {
            self.inner.exists(path)
        }

        fn remove(&self, path: &Path) -> ShipwrightResult<()> {
            self.inner.remove(path)
        }

        fn create_dir_all(&self, path: &Path) -> ShipwrightResult<()> {
            self.inner.create_dir_all(path)
        }

        fn set_mode(&self, path: &Path, mode: FileMode) -> ShipwrightResult<()> {
            self.inner.set_mode(path, mode)
        }

        fn lock_exclusive(&self, path: &Path) -> ShipwrightResult<FileLock> {
            self.inner.lock_exclusive(path)
        }
    }

    #[test]
    fn replaces_stale_mapping() {
        let dir = tempdir().unwrap();
        let hosts = dir.path().join("hosts");
        std::fs::write(&hosts, "127.0.0.1 localhost\n10.0.0.5 app.local\n").unwrap();
        let patcher = HostsPatcher::new(Arc::new(LocalFs::new()), &hosts);

        let outcome = patcher
            .upsert(
                &HostsPatchSet::new(["app.local"], "10.0.0.9"),
                &dir.path().join("fix.sh"),
            )
            .unwrap();

        assert_eq!(outcome, HostsOutcome::Updated);
        let text = std::fs::read_to_string(&hosts).unwrap();
        let lines: Vec<&str> = text.lines().filter(|l| l.contains("app.local")).collect();
        assert_eq!(lines, vec!["10.0.0.9\tapp.local"]);
    }

    #[test]
    fn second_upsert_reports_unchanged() {
        let dir = tempdir().unwrap();
        let hosts = dir.path().join("hosts");
        std::fs::write(&hosts, "127.0.0.1 localhost\n").unwrap();
        let patcher = HostsPatcher::new(Arc::new(LocalFs::new()), &hosts);
        let set = HostsPatchSet::new(["rancher.local", "argocd.local"], "54.1.2.3");
        let script = dir.path().join("fix.sh");

        assert!(patcher.upsert(&set, &script).unwrap().changed());
        assert_eq!(patcher.upsert(&set, &script).unwrap(), HostsOutcome::Unchanged);
    }

    #[test]
    fn missing_privilege_writes_remediation_script() {
        let dir = tempdir().unwrap();
        let hosts = dir.path().join("hosts");
        std::fs::write(&hosts, "127.0.0.1 localhost\n").unwrap();
        let fs = ReadOnlyHosts {
            inner: LocalFs::new(),
            protected: hosts.clone(),
        };
        let patcher = HostsPatcher::new(Arc::new(fs), &hosts);
        let script = dir.path().join("hub").join("hosts-remediation.sh");

        let outcome = patcher
            .upsert(&HostsPatchSet::new(["app.local"], "10.0.0.9"), &script)
            .unwrap();

        assert_eq!(
            outcome,
            HostsOutcome::RemediationRequired {
                script: script.clone()
            }
        );
        let body = std::fs::read_to_string(&script).unwrap();
        assert!(body.contains("ADDR='10.0.0.9'"));
        // table untouched
        assert_eq!(std::fs::read_to_string(&hosts).unwrap(), "127.0.0.1 localhost\n");
    }

    #[test]
    fn missing_table_is_created() {
        let dir = tempdir().unwrap();
        let hosts = dir.path().join("hosts");
        let patcher = HostsPatcher::new(Arc::new(LocalFs::new()), &hosts);
        patcher
            .upsert(&HostsPatchSet::new(["a.local"], "1.2.3.4"), &dir.path().join("x.sh"))
            .unwrap();
        assert_eq!(std::fs::read_to_string(&hosts).unwrap(), "1.2.3.4\ta.local\n");
    }
}

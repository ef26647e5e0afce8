//! Secret Vault Bootstrapper
//!
//! Keeps an environment's vault present and decryptable with its current
//! password file, whatever state a previous (possibly interrupted) run left
//! it in:
//!
//! 1. no password file → generate one (0600)
//! 2. no payload → fetch the live secret or mint one, store as plaintext
//! 3. plaintext payload → done
//! 4. encrypted payload that the password opens → done
//! 5. encrypted payload that it does not open → rotate the password,
//!    regenerate the payload and re-encrypt it with the new password
//!
//! Step 5 silently invalidates the stale ciphertext. The whole sequence runs
//! under an exclusive lock on the vault's lock file.

use std::sync::Arc;

use crate::domain::entities::{SecretVault, VaultState};
use crate::domain::ports::{FileMode, FileSystem, RemoteShell, SshAccess, VaultCipher};
use crate::domain::value_objects::SecretToken;
use crate::error::ShipwrightResult;

/// What `ensure_ready` had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultOutcome {
    /// Password and payload were already usable
    Unchanged,
    /// Password and/or plaintext payload were created
    Created {
        password_created: bool,
        payload_created: bool,
    },
    /// Password/payload mismatch recovered by rotation
    Rotated { rotations: u64 },
}

/// Source of the shared secret when the payload has to be (re)written.
pub trait SecretSource {
    /// The secret currently used by the live cluster, if it can be found
    fn fetch_existing(&self) -> Option<String>;
}

impl<F> SecretSource for F
where
    F: Fn() -> Option<String>,
{
    fn fetch_existing(&self) -> Option<String> {
        self()
    }
}

/// Node paths that hold the cluster join secret, in lookup order
const LIVE_SECRET_COMMANDS: [&str; 2] = [
    "sudo sed -n 's/^token:[[:space:]]*//p' /etc/rancher/rke2/config.yaml 2>/dev/null | head -n1",
    "sudo cat /var/lib/rancher/rke2/server/node-token 2>/dev/null | head -n1",
];

/// Reads the join secret from a running primary node, falling back to an
/// operator-supplied value.
pub struct LiveClusterSecret<'a> {
    pub remote: &'a dyn RemoteShell,
    pub access: &'a SshAccess,
    /// Primary node, when its address is known
    pub host: Option<&'a str>,
    pub fallback: Option<&'a str>,
}

impl SecretSource for LiveClusterSecret<'_> {
    fn fetch_existing(&self) -> Option<String> {
        let from_node = self.host.and_then(|host| {
            LIVE_SECRET_COMMANDS.iter().find_map(|script| {
                match self.remote.capture(self.access, host, script) {
                    Ok(out) => clean_secret(&out),
                    Err(e) => {
                        tracing::debug!(host, error = %e, "no live secret");
                        None
                    }
                }
            })
        });
        from_node.or_else(|| self.fallback.and_then(clean_secret))
    }
}

fn clean_secret(raw: &str) -> Option<String> {
    let line = raw.lines().next().unwrap_or_default().trim();
    let value = line.trim_matches(|c| c == '"' || c == '\'');
    (!value.is_empty()).then(|| value.to_string())
}

pub struct VaultBootstrapper {
    fs: Arc<dyn FileSystem>,
    cipher: Arc<dyn VaultCipher>,
}

impl VaultBootstrapper {
    pub fn new(fs: Arc<dyn FileSystem>, cipher: Arc<dyn VaultCipher>) -> Self {
        Self { fs, cipher }
    }

    /// Make the vault usable. Idempotent.
    pub fn ensure_ready(
        &self,
        vault: &SecretVault,
        secret_key: &str,
        source: &dyn SecretSource,
    ) -> ShipwrightResult<VaultOutcome> {
        let _lock = self.fs.lock_exclusive(&vault.lock_file)?;

        let password_created = if self.fs.exists(&vault.password_file) {
            false
        } else {
            self.write_password(vault)?;
            tracing::info!(path = %vault.password_file.display(), "created vault password file");
            true
        };

        if !self.fs.exists(&vault.payload_file) {
            self.write_payload(vault, secret_key, source)?;
            tracing::info!(path = %vault.payload_file.display(), "created vault payload");
            return Ok(VaultOutcome::Created {
                password_created,
                payload_created: true,
            });
        }

        let payload = self.fs.read(&vault.payload_file)?;
        if !self.cipher.is_encrypted(&payload)
            || self
                .cipher
                .can_decrypt(&vault.payload_file, &vault.password_file)
        {
            return Ok(if password_created {
                VaultOutcome::Created {
                    password_created,
                    payload_created: false,
                }
            } else {
                VaultOutcome::Unchanged
            });
        }

        tracing::warn!(
            payload = %vault.payload_file.display(),
            "vault payload does not decrypt with the current password; rotating"
        );
        self.write_password(vault)?;
        self.write_payload(vault, secret_key, source)?;
        self.cipher
            .encrypt(&vault.payload_file, &vault.password_file)?;

        let mut state = self.load_state(vault)?;
        state.rotations += 1;
        state.last_rotated = Some(chrono::Utc::now().to_rfc3339());
        self.save_state(vault, &state)?;

        Ok(VaultOutcome::Rotated {
            rotations: state.rotations,
        })
    }

    /// Persisted bookkeeping; a missing file means no rotations yet
    pub fn load_state(&self, vault: &SecretVault) -> ShipwrightResult<VaultState> {
        if !self.fs.exists(&vault.state_file) {
            return Ok(VaultState::default());
        }
        let text = self.fs.read(&vault.state_file)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn save_state(&self, vault: &SecretVault, state: &VaultState) -> ShipwrightResult<()> {
        let text = serde_json::to_string_pretty(state)?;
        self.fs
            .write(&vault.state_file, &format!("{}\n", text), FileMode::Private)
    }

    fn write_password(&self, vault: &SecretVault) -> ShipwrightResult<()> {
        let password = SecretToken::password();
        self.fs.write(
            &vault.password_file,
            &format!("{}\n", password.as_str()),
            FileMode::Private,
        )
    }

    fn write_payload(
        &self,
        vault: &SecretVault,
        secret_key: &str,
        source: &dyn SecretSource,
    ) -> ShipwrightResult<()> {
        let secret = match source.fetch_existing() {
            Some(existing) => SecretToken::from_existing(existing),
            None => SecretToken::join_token(),
        };
        self.fs.write(
            &vault.payload_file,
            &render_payload(secret_key, &secret),
            FileMode::Private,
        )
    }
}

/// `key: "value"` line stored in the vault payload
pub fn render_payload(secret_key: &str, secret: &SecretToken) -> String {
    format!("{}: \"{}\"\n", secret_key, secret.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ArtifactNamespace;
    use crate::domain::ports::VAULT_HEADER;
    use crate::infrastructure::fs::LocalFs;
    use std::path::Path;
    use tempfile::tempdir;

    /// Cipher that "encrypts" by prefixing the header plus the password.
    struct FakeCipher;

    impl VaultCipher for FakeCipher {
        fn can_decrypt(&self, payload_file: &Path, password_file: &Path) -> bool {
            let payload = std::fs::read_to_string(payload_file).unwrap();
            let password = std::fs::read_to_string(password_file).unwrap();
            payload
                .lines()
                .nth(1)
                .map(|line| line == password.trim())
                .unwrap_or(false)
        }

        fn encrypt(&self, payload_file: &Path, password_file: &Path) -> ShipwrightResult<()> {
            let payload = std::fs::read_to_string(payload_file).unwrap();
            let password = std::fs::read_to_string(password_file).unwrap();
            std::fs::write(
                payload_file,
                format!("{}1.1;AES256\n{}\n{}", VAULT_HEADER, password.trim(), payload),
            )
            .unwrap();
            Ok(())
        }
    }

    fn setup() -> (tempfile::TempDir, SecretVault, VaultBootstrapper) {
        let dir = tempdir().unwrap();
        let ns = ArtifactNamespace::new(dir.path(), "hub");
        let vault = SecretVault::in_namespace(&ns);
        let boot = VaultBootstrapper::new(Arc::new(LocalFs::new()), Arc::new(FakeCipher));
        (dir, vault, boot)
    }

    fn no_secret() -> Option<String> {
        None
    }

    #[test]
    fn fresh_vault_gets_password_and_plaintext_payload() {
        let (_dir, vault, boot) = setup();

        let outcome = boot.ensure_ready(&vault, "rke2_token", &no_secret).unwrap();

        assert_eq!(
            outcome,
            VaultOutcome::Created {
                password_created: true,
                payload_created: true
            }
        );
        let password = std::fs::read_to_string(&vault.password_file).unwrap();
        assert_eq!(password.trim().len(), 43);
        let payload = std::fs::read_to_string(&vault.payload_file).unwrap();
        assert!(payload.starts_with("rke2_token: \""));
    }

    #[test]
    fn existing_live_secret_is_reused() {
        let (_dir, vault, boot) = setup();
        let live = || Some("K10abc::server:xyz".to_string());

        boot.ensure_ready(&vault, "rke2_token", &live).unwrap();

        let payload = std::fs::read_to_string(&vault.payload_file).unwrap();
        assert_eq!(payload, "rke2_token: \"K10abc::server:xyz\"\n");
    }

    struct ScriptedShell {
        config_token: &'static str,
        node_token: &'static str,
    }

    impl RemoteShell for ScriptedShell {
        fn capture(&self, _access: &SshAccess, _host: &str, script: &str) -> ShipwrightResult<String> {
            if script.contains("config.yaml") {
                Ok(self.config_token.to_string())
            } else {
                Ok(self.node_token.to_string())
            }
        }

        fn fetch(&self, _: &SshAccess, _: &str, _: &str, _: &Path) -> ShipwrightResult<()> {
            Ok(())
        }
    }

    #[test]
    fn live_secret_prefers_node_config_and_strips_quotes() {
        let shell = ScriptedShell {
            config_token: "\"K10cfg::server:abc\"\n",
            node_token: "K10node\n",
        };
        let access = SshAccess::direct("ubuntu", "/keys/id");
        let source = LiveClusterSecret {
            remote: &shell,
            access: &access,
            host: Some("10.0.0.5"),
            fallback: Some("operator"),
        };
        assert_eq!(source.fetch_existing().as_deref(), Some("K10cfg::server:abc"));
    }

    #[test]
    fn live_secret_falls_back_to_node_token_then_operator_value() {
        let shell = ScriptedShell {
            config_token: "",
            node_token: "K10node\n",
        };
        let access = SshAccess::direct("ubuntu", "/keys/id");
        let mut source = LiveClusterSecret {
            remote: &shell,
            access: &access,
            host: Some("10.0.0.5"),
            fallback: Some("operator"),
        };
        assert_eq!(source.fetch_existing().as_deref(), Some("K10node"));

        source.host = None;
        assert_eq!(source.fetch_existing().as_deref(), Some("operator"));
    }

    #[test]
    fn second_run_changes_nothing() {
        let (_dir, vault, boot) = setup();
        boot.ensure_ready(&vault, "rke2_token", &no_secret).unwrap();
        let before = std::fs::read_to_string(&vault.payload_file).unwrap();

        let outcome = boot.ensure_ready(&vault, "rke2_token", &no_secret).unwrap();

        assert_eq!(outcome, VaultOutcome::Unchanged);
        assert_eq!(std::fs::read_to_string(&vault.payload_file).unwrap(), before);
    }

    #[test]
    fn mismatched_password_rotates_and_reencrypts() {
        let (_dir, vault, boot) = setup();
        std::fs::create_dir_all(vault.payload_file.parent().unwrap()).unwrap();
        std::fs::write(&vault.password_file, "current\n").unwrap();
        std::fs::write(
            &vault.payload_file,
            format!("{}1.1;AES256\nsomeone-elses-password\nrke2_token: \"old\"\n", VAULT_HEADER),
        )
        .unwrap();

        let outcome = boot.ensure_ready(&vault, "rke2_token", &no_secret).unwrap();

        assert_eq!(outcome, VaultOutcome::Rotated { rotations: 1 });
        assert!(FakeCipher.can_decrypt(&vault.payload_file, &vault.password_file));
        let password = std::fs::read_to_string(&vault.password_file).unwrap();
        assert_ne!(password, "current\n");
        assert_eq!(boot.load_state(&vault).unwrap().rotations, 1);
    }

    #[test]
    fn each_rotation_increments_counter_by_one() {
        let (_dir, vault, boot) = setup();
        std::fs::create_dir_all(vault.payload_file.parent().unwrap()).unwrap();
        for round in 1..=2u64 {
            std::fs::write(&vault.password_file, "wrong\n").unwrap();
            std::fs::write(
                &vault.payload_file,
                format!("{}1.1;AES256\nother\nrke2_token: \"x\"\n", VAULT_HEADER),
            )
            .unwrap();
            let outcome = boot.ensure_ready(&vault, "rke2_token", &no_secret).unwrap();
            assert_eq!(outcome, VaultOutcome::Rotated { rotations: round });
        }
        assert!(boot.load_state(&vault).unwrap().last_rotated.is_some());
    }

    #[cfg(unix)]
    #[test]
    fn password_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let (_dir, vault, boot) = setup();
        boot.ensure_ready(&vault, "rke2_token", &no_secret).unwrap();
        let mode = std::fs::metadata(&vault.password_file)
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

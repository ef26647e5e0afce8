//! Home directory resolution with test isolation support.
//!
//! `~` in configured paths (ssh keys, state directory) expands against
//! `shipwright_home_dir()`, which honours `SHIPWRIGHT_TEST_HOME` before
//! falling back to `dirs::home_dir()`.

use std::path::{Path, PathBuf};

/// Environment variable for test isolation of home directory.
pub const SHIPWRIGHT_TEST_HOME_VAR: &str = "SHIPWRIGHT_TEST_HOME";

/// Home directory used for `~` expansion
pub fn shipwright_home_dir() -> Option<PathBuf> {
    std::env::var(SHIPWRIGHT_TEST_HOME_VAR)
        .ok()
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
}

/// Expand a leading `~` or `~/`; other paths are returned unchanged
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match shipwright_home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_are_untouched() {
        assert_eq!(expand_home(Path::new("/etc/hosts")), PathBuf::from("/etc/hosts"));
        assert_eq!(
            expand_home(Path::new("terraform/hub")),
            PathBuf::from("terraform/hub")
        );
    }

    #[test]
    fn tilde_prefix_expands_to_home() {
        let Some(home) = shipwright_home_dir() else {
            return;
        };
        assert_eq!(
            expand_home(Path::new("~/.ssh/k8s-key.pem")),
            home.join(".ssh/k8s-key.pem")
        );
    }

    #[test]
    fn tilde_inside_name_is_not_expanded() {
        assert_eq!(expand_home(Path::new("~backup/x")), PathBuf::from("~backup/x"));
    }
}

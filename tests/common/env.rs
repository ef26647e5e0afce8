//! Test environment for isolated Shipwright runs.
//!
//! Every run happens in a fresh temp directory with its own HOME, and all
//! `SHIPWRIGHT_*` variables from the outer environment removed.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const SHIPWRIGHT_VARS: &[&str] = &[
    "SHIPWRIGHT_ENV",
    "SHIPWRIGHT_STATE_DIR",
    "SHIPWRIGHT_CLUSTER_TOKEN",
    "SHIPWRIGHT_SKIP_PROVISION",
    "SHIPWRIGHT_SKIP_CONFIGURE",
    "SHIPWRIGHT_SKIP_ADDONS",
    "SHIPWRIGHT_SKIP_HOSTS",
    "RUST_LOG",
];

/// Result of running the CLI
#[derive(Debug)]
pub struct TestResult {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl TestResult {
    /// Combine stdout and stderr
    pub fn combined_output(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }

    /// Parse stdout as NDJSON
    pub fn events(&self) -> Vec<serde_json::Value> {
        self.stdout
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| {
                serde_json::from_str(l)
                    .unwrap_or_else(|e| panic!("stdout line is not JSON ({e}): {l}"))
            })
            .collect()
    }
}

pub struct TestEnv {
    pub root: TempDir,
    pub home: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().expect("Failed to create project temp dir"),
            home: TempDir::new().expect("Failed to create home temp dir"),
        }
    }

    /// A project with `shipwright.toml` already written
    pub fn with_config(toml: &str) -> Self {
        let env = Self::new();
        env.write_file("shipwright.toml", toml);
        env
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.path().join(relative)
    }

    pub fn write_file(&self, relative: &str, content: &str) {
        let full_path = self.path(relative);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create directories");
        }
        std::fs::write(&full_path, content).expect("Failed to write file");
    }

    pub fn run(&self, args: &[&str]) -> TestResult {
        self.run_with_env(args, &[])
    }

    pub fn run_with_env(&self, args: &[&str], vars: &[(&str, &str)]) -> TestResult {
        self.run_from(self.root.path(), args, vars)
    }

    fn run_from(&self, cwd: &Path, args: &[&str], vars: &[(&str, &str)]) -> TestResult {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_shipwright"));
        cmd.current_dir(cwd)
            .args(args)
            .env("HOME", self.home.path())
            .env("NO_COLOR", "1");
        for var in SHIPWRIGHT_VARS {
            cmd.env_remove(var);
        }
        for (key, value) in vars {
            cmd.env(key, value);
        }

        let output = cmd.output().expect("Failed to execute shipwright");
        to_result(output)
    }
}

fn to_result(output: Output) -> TestResult {
    TestResult {
        success: output.status.success(),
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }
}

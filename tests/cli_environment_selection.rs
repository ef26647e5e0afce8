//! Environment selection and prerequisite handling, end to end.
//!
//! None of these runs reach an external tool: they fail at configuration
//! or at the first phase of a dependent environment.

mod common;

use common::{TestEnv, ROOT_AND_EDGE};

#[test]
fn unknown_environment_suggests_closest_name() {
    let env = TestEnv::with_config(ROOT_AND_EDGE);
    let result = env.run(&["hbu"]);

    assert_eq!(result.exit_code, 1);
    assert!(
        result.stderr.contains("unknown environment 'hbu'. Did you mean 'hub'?"),
        "stderr:\n{}",
        result.stderr
    );
}

#[test]
fn unknown_environment_from_env_var_is_rejected() {
    let env = TestEnv::with_config(ROOT_AND_EDGE);
    let result = env.run_with_env(&[], &[("SHIPWRIGHT_ENV", "nowhere")]);

    assert_eq!(result.exit_code, 1);
    assert!(result.stderr.contains("unknown environment 'nowhere'"));
}

#[test]
fn dependent_without_root_state_names_the_remediation() {
    let env = TestEnv::with_config(ROOT_AND_EDGE);
    let result = env.run(&["edge"]);

    assert_eq!(result.exit_code, 1, "{}", result.combined_output());
    assert!(result.stdout.contains("Deploy Failed"));
    assert!(
        result.stdout.contains("failed at resolve-jump-host"),
        "stdout:\n{}",
        result.stdout
    );
    assert!(result.stdout.contains("run `shipwright hub` first"));
    // Nothing after the failing phase ran
    assert!(!env.path(".shipwright/edge/vault").exists());
}

#[test]
fn state_dir_flag_redirects_artifacts() {
    let env = TestEnv::with_config(ROOT_AND_EDGE);
    let result = env.run(&["edge", "--state-dir", "custom-state"]);

    assert_eq!(result.exit_code, 1);
    assert!(result.stdout.contains("failed at resolve-jump-host"));
    assert!(!env.path(".shipwright").exists());
}

#[test]
fn environment_argument_overrides_env_var() {
    let env = TestEnv::with_config(ROOT_AND_EDGE);
    let result = env.run_with_env(&["edge"], &[("SHIPWRIGHT_ENV", "nowhere")]);

    assert!(result.stdout.contains("failed at resolve-jump-host"));
    assert!(!result.stderr.contains("unknown environment"));
}

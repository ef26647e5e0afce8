//! Configuration fixtures.

/// One root and one jump-mediated environment, no add-ons
pub const ROOT_AND_EDGE: &str = r#"
default_environment = "hub"

[environments.hub]
owns_jump_host = true
tunnel_port = 16443
playbooks = []

[environments.edge]
topology = "jump"
jump_root = "hub"
tunnel_port = 16444
playbooks = []
"#;

/// Two environments fighting over one tunnel port
pub const SHARED_PORT: &str = r#"
[environments.hub]
owns_jump_host = true
tunnel_port = 16443

[environments.edge]
topology = "jump"
jump_root = "hub"
tunnel_port = 16443
"#;

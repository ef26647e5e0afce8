//! Property tests for credential bundle rewriting.

use proptest::prelude::*;

use shipwright::domain::services::kubeconfig::{first_server, rewrite, transform};
use shipwright::domain::entities::BundleKind;
use shipwright::domain::value_objects::Endpoint;

fn host() -> impl Strategy<Value = String> {
    prop_oneof![
        (1u8..=254, 0u8..=255, 0u8..=255, 1u8..=254)
            .prop_map(|(a, b, c, d)| format!("{}.{}.{}.{}", a, b, c, d)),
        proptest::string::string_regex("[a-z][a-z0-9-]{0,12}(\\.[a-z]{2,6}){1,3}").unwrap(),
    ]
}

fn port() -> impl Strategy<Value = u16> {
    1024u16..=65535
}

fn kubeconfig(server: &str, ca: &str) -> String {
    format!(
        "apiVersion: v1\n\
         kind: Config\n\
         clusters:\n\
         - name: default\n  cluster:\n    server: {server}\n    certificate-authority-data: {ca}\n\
         contexts:\n\
         - name: default\n  context:\n    cluster: default\n    user: default\n\
         current-context: default\n\
         users:\n\
         - name: default\n  user:\n    token: abc123\n"
    )
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: Rewriting never panics on arbitrary input.
    #[test]
    fn property_rewrite_never_panics(text in "(?s).{0,512}") {
        let _ = rewrite(&text, &Endpoint::loopback(16443), BundleKind::Ephemeral);
    }

    /// PROPERTY: The durable bundle points at the external endpoint, the
    /// ephemeral one at the loopback port, and neither keeps a trust anchor.
    #[test]
    fn property_bundles_bind_their_endpoints(
        original in host(),
        external in host(),
        api_port in port(),
        tunnel_port in port(),
        ca in "[A-Za-z0-9+/]{8,64}",
    ) {
        let raw = kubeconfig(&format!("https://{}:6443", original), &ca);
        let durable = Endpoint::with_port(external.clone(), api_port);
        let tunnel = Endpoint::loopback(tunnel_port);

        let pair = transform(raw.as_bytes(), &durable, Some(&tunnel)).unwrap();
        let ephemeral = pair.ephemeral.unwrap();

        prop_assert_eq!(
            first_server(pair.durable.as_str()),
            Some(format!("https://{}:{}", external, api_port))
        );
        prop_assert_eq!(
            first_server(ephemeral.as_str()),
            Some(format!("https://127.0.0.1:{}", tunnel_port))
        );
        prop_assert!(!pair.durable.as_str().contains(&ca));
        prop_assert!(!ephemeral.as_str().contains(&ca));
        prop_assert!(pair.durable.as_str().contains("token: abc123"));
    }

    /// PROPERTY: Rewriting an already rewritten bundle changes nothing.
    #[test]
    fn property_rewrite_is_idempotent(original in host(), external in host(), api_port in port()) {
        let raw = kubeconfig(&format!("https://{}:6443", original), "Q0FEQVRB");
        let endpoint = Endpoint::with_port(external, api_port);

        let once = rewrite(&raw, &endpoint, BundleKind::Durable).unwrap();
        let twice = rewrite(once.as_str(), &endpoint, BundleKind::Durable).unwrap();

        prop_assert_eq!(once.as_str(), twice.as_str());
    }
}

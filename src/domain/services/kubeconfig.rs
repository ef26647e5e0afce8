//! Credential bundle transformation
//!
//! Rewrites a kubeconfig fetched from the control plane for its two
//! audiences. The document is parsed and mutated field by field, so
//! multi-line trust anchors disappear as a unit and unrelated content
//! (users, contexts, extensions) is preserved.

use serde_yaml_ng::{Mapping, Value};

use crate::domain::entities::{BundleKind, CredentialBundle, TrustMode};
use crate::domain::value_objects::{Endpoint, ServerUrl};
use crate::error::{ShipwrightError, ShipwrightResult};

const SERVER: &str = "server";
const CA_DATA: &str = "certificate-authority-data";
const CA_FILE: &str = "certificate-authority";
const SKIP_VERIFY: &str = "insecure-skip-tls-verify";

/// Both materializations of one fetched bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlePair {
    pub durable: CredentialBundle,
    /// Present when a tunnel endpoint was supplied
    pub ephemeral: Option<CredentialBundle>,
}

/// Produce the durable bundle (external endpoint) and, if `tunnel` is given,
/// the ephemeral one (loopback tunnel endpoint) from `raw`.
pub fn transform(
    raw: &[u8],
    durable: &Endpoint,
    tunnel: Option<&Endpoint>,
) -> ShipwrightResult<BundlePair> {
    let text = std::str::from_utf8(raw).map_err(|e| ShipwrightError::InvalidCredentials {
        message: format!("bundle is not UTF-8: {}", e),
    })?;

    let durable = rewrite(text, durable, BundleKind::Durable)?;
    let ephemeral = tunnel
        .map(|endpoint| rewrite(text, endpoint, BundleKind::Ephemeral))
        .transpose()?;

    Ok(BundlePair { durable, ephemeral })
}

/// Point every cluster entry at `endpoint` and disable certificate verification
pub fn rewrite(text: &str, endpoint: &Endpoint, kind: BundleKind) -> ShipwrightResult<CredentialBundle> {
    let mut doc: Value = serde_yaml_ng::from_str(text)?;

    let clusters = doc
        .get_mut("clusters")
        .and_then(Value::as_sequence_mut)
        .filter(|seq| !seq.is_empty())
        .ok_or_else(|| ShipwrightError::InvalidCredentials {
            message: "no clusters defined".to_string(),
        })?;

    for entry in clusters.iter_mut() {
        let cluster = entry
            .get_mut("cluster")
            .and_then(Value::as_mapping_mut)
            .ok_or_else(|| ShipwrightError::InvalidCredentials {
                message: "cluster entry without a 'cluster' section".to_string(),
            })?;
        retarget_cluster(cluster, endpoint)?;
    }

    let rendered = serde_yaml_ng::to_string(&doc)?;
    Ok(CredentialBundle {
        kind,
        raw: rendered.into_bytes(),
        endpoint: endpoint.clone(),
        trust: TrustMode::Skip,
    })
}

fn retarget_cluster(cluster: &mut Mapping, endpoint: &Endpoint) -> ShipwrightResult<()> {
    let server = cluster
        .get(SERVER)
        .and_then(Value::as_str)
        .ok_or_else(|| ShipwrightError::InvalidCredentials {
            message: "cluster without a server address".to_string(),
        })?;
    let url = ServerUrl::parse(server).ok_or_else(|| ShipwrightError::InvalidCredentials {
        message: format!("unparseable server address '{}'", server),
    })?;

    cluster.insert(
        Value::from(SERVER),
        Value::from(url.retarget(endpoint).to_string()),
    );
    cluster.remove(CA_DATA);
    cluster.remove(CA_FILE);
    cluster.insert(Value::from(SKIP_VERIFY), Value::Bool(true));
    Ok(())
}

/// Server URL of the first cluster entry, if any
pub fn first_server(text: &str) -> Option<String> {
    let doc: Value = serde_yaml_ng::from_str(text).ok()?;
    doc.get("clusters")?
        .as_sequence()?
        .first()?
        .get("cluster")?
        .get(SERVER)?
        .as_str()
        .map(str::to_string)
}

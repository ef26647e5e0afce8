//! Provisioner output map.
//!
//! `terraform output -json` yields `{"name": {"value": ..., "type": ...}}`.
//! Only the `value` of each entry is kept.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ShipwrightError, ShipwrightResult};

pub const CONTROL_PLANE_PUBLIC_KEY: &str = "master_public_ip";
pub const CONTROL_PLANE_PRIVATE_KEY: &str = "master_private_ip";
pub const JUMP_HOST_KEY: &str = "bastion_public_ip";
pub const LOAD_BALANCER_KEY: &str = "nlb_dns_name";

/// Flattened key→value output map of one environment's provisioner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InfraOutputs {
    values: BTreeMap<String, Value>,
}

/// Address of a root environment's jump host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JumpHost {
    /// Environment that owns the jump host
    pub owner: String,
    pub address: String,
}

impl InfraOutputs {
    /// Parse raw `terraform output -json` text
    pub fn from_provisioner_json(raw: &str) -> ShipwrightResult<Self> {
        let parsed: BTreeMap<String, Value> = serde_json::from_str(raw)?;
        let values = parsed
            .into_iter()
            .map(|(key, entry)| {
                let value = match entry {
                    Value::Object(mut map) if map.contains_key("value") => {
                        map.remove("value").unwrap_or(Value::Null)
                    }
                    other => other,
                };
                (key, value)
            })
            .collect();
        Ok(Self { values })
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, Value)>) -> Self {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    /// First non-empty string for `key`; lists yield their first element
    pub fn first_string(&self, key: &str) -> Option<String> {
        let value = self.values.get(key)?;
        let s = match value {
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => items.iter().find_map(|v| v.as_str().map(str::to_string)),
            _ => None,
        }?;
        let s = s.trim().to_string();
        (!s.is_empty()).then_some(s)
    }

    pub fn require(&self, key: &str) -> ShipwrightResult<String> {
        self.first_string(key)
            .ok_or_else(|| ShipwrightError::MissingOutput {
                key: key.to_string(),
            })
    }

    pub fn control_plane_public(&self) -> ShipwrightResult<String> {
        self.require(CONTROL_PLANE_PUBLIC_KEY)
    }

    pub fn control_plane_private(&self) -> Option<String> {
        self.first_string(CONTROL_PLANE_PRIVATE_KEY)
    }

    pub fn load_balancer(&self) -> Option<String> {
        self.first_string(LOAD_BALANCER_KEY)
    }

    pub fn jump_host(&self) -> Option<String> {
        self.first_string(JUMP_HOST_KEY)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

//! # Managed Resource Types
//!
//! Types shared by every managed record: the provider reference and deletion
//! policy in the spec, conditions and the observation block in the status,
//! and the reference/selector pair used to point at other records.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fields every managed record's spec carries next to `forProvider`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    /// ProviderConfig supplying credentials and endpoints; `default` when unset
    #[serde(default)]
    pub provider_config_ref: Option<ProviderConfigReference>,
    /// What happens to the remote object when the record is deleted
    #[serde(default)]
    pub deletion_policy: DeletionPolicy,
}

impl ResourceSpec {
    /// Name of the referenced ProviderConfig
    pub fn provider_config_name(&self) -> &str {
        self.provider_config_ref
            .as_ref()
            .map_or(crate::constants::DEFAULT_PROVIDER_CONFIG, |r| r.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct ProviderConfigReference {
    pub name: String,
}

/// Deletion policy of a managed record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum DeletionPolicy {
    /// Delete the remote object with the record
    #[default]
    Delete,
    /// Leave the remote object in place
    Orphan,
}

/// Status block shared by every managed record
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManagedStatus<T> {
    /// Fields last read from the remote object
    #[serde(default)]
    pub at_provider: Option<T>,
    /// Ready and Synced conditions
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Condition type for status
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition (Ready, Synced)
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Last transition time
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing the condition
    #[serde(default)]
    pub message: Option<String>,
}

/// Reference to another record by name
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct Reference {
    pub name: String,
}

/// Selects another record by labels
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
}

/// Key/value tag attached to a remote object
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct Tag {
    pub key: String,
    pub value: Option<String>,
}

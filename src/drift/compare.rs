//! Up-to-date check between a declared spec and an observed object.

use super::late_init::natural_key;
use super::{is_empty, join_path, late_initialize, DriftError, LateInitOptions, NameFilter};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Options for [`is_up_to_date`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffOptions {
    /// Mapping, filtering and keys used to project observed onto declared
    pub late_init: LateInitOptions,
    /// Paths that never take part in the comparison
    pub ignored: NameFilter,
    /// Array paths whose order is significant and must not be sorted
    pub ordered: BTreeSet<String>,
}

impl DiffOptions {
    #[must_use]
    pub fn with_late_init(mut self, late_init: LateInitOptions) -> Self {
        self.late_init = late_init;
        self
    }

    #[must_use]
    pub fn ignore(mut self, path: &str) -> Self {
        self.ignored.insert(path);
        self
    }

    #[must_use]
    pub fn ordered(mut self, path: &str) -> Self {
        self.ordered.insert(path.to_string());
        self
    }
}

/// Observed object restricted to the declared shape `D`
pub fn project<D, O>(observed: &O, opts: &LateInitOptions) -> Result<Value, DriftError>
where
    D: Serialize + DeserializeOwned,
    O: Serialize + ?Sized,
{
    let observed = serde_json::to_value(observed)?;
    let mut working = Value::Object(Map::new());
    late_initialize("", &mut working, &observed, opts)?;
    let typed: D = serde_json::from_value(working)?;
    Ok(serde_json::to_value(&typed)?)
}

/// Whether the remote object already has the declared shape.
///
/// Returns the verdict and a JSON patch (RFC 6902) from the normalized
/// observed document to the normalized declared one; the patch is empty
/// when up to date.
pub fn is_up_to_date<D, O>(
    declared: &D,
    observed: &O,
    opts: &DiffOptions,
) -> Result<(bool, String), DriftError>
where
    D: Serialize + DeserializeOwned,
    O: Serialize + ?Sized,
{
    let projected = project::<D, O>(observed, &opts.late_init)?;
    let observed = normalize("", &projected, opts);
    let declared = normalize("", &serde_json::to_value(declared)?, opts);

    // Observed-only fields come back as nulls, which decode to an unset
    // declared field and are pruned.
    let patch = prune(merge_patch(&observed, &declared));
    if is_empty(&patch) {
        return Ok((true, String::new()));
    }
    let diff = json_patch::diff(&observed, &declared);
    Ok((false, serde_json::to_string(&diff)?))
}

/// JSON merge patch (RFC 7386) turning `from` into `to`
pub fn merge_patch(from: &Value, to: &Value) -> Value {
    match (from, to) {
        (Value::Object(from), Value::Object(to)) => {
            let mut patch = Map::new();
            for (key, target) in to {
                match from.get(key) {
                    Some(current) if current == target => {}
                    Some(current @ Value::Object(_)) if target.is_object() => {
                        let nested = merge_patch(current, target);
                        if !is_empty(&nested) {
                            patch.insert(key.clone(), nested);
                        }
                    }
                    _ => {
                        patch.insert(key.clone(), target.clone());
                    }
                }
            }
            for key in from.keys().filter(|k| !to.contains_key(*k)) {
                patch.insert(key.clone(), Value::Null);
            }
            Value::Object(patch)
        }
        (from, to) if from == to => Value::Object(Map::new()),
        (_, to) => to.clone(),
    }
}

fn prune(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, prune(v)))
                .filter(|(_, v)| !is_empty(v))
                .collect(),
        ),
        other => other,
    }
}

fn is_reference_field(name: &str) -> bool {
    name.ends_with("Ref") || name.ends_with("Refs") || name.ends_with("Selector")
}

/// Drop ignored, reference and empty fields; sort unordered arrays
fn normalize(path: &str, value: &Value, opts: &DiffOptions) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| !is_reference_field(k))
                .filter_map(|(k, v)| {
                    let field_path = join_path(path, k);
                    if opts.ignored.skips(&field_path) {
                        return None;
                    }
                    let v = normalize(&field_path, v, opts);
                    (!is_empty(&v)).then(|| (k.clone(), v))
                })
                .collect(),
        ),
        Value::Array(items) => {
            let mut items: Vec<Value> = items.iter().map(|v| normalize(path, v, opts)).collect();
            if !opts.ordered.contains(path) {
                let keys = opts.late_init.keys_for(path);
                items.sort_by_cached_key(|item| sort_key(item, &keys));
            }
            Value::Array(items)
        }
        other => other.clone(),
    }
}

fn sort_key(item: &Value, keys: &[&str]) -> (u8, String) {
    match item {
        Value::Object(map) => match natural_key(map, keys) {
            Some((_, value)) => (0, canonical_string(&value)),
            None => (1, canonical_string(item)),
        },
        Value::String(s) => (0, s.clone()),
        other => (0, canonical_string(other)),
    }
}

/// Serialization with object keys in sorted order
pub fn canonical_string(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let body: Vec<String> = entries
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), canonical_string(v)))
                .collect();
            format!("{{{}}}", body.join(","))
        }
        Value::Array(items) => {
            let body: Vec<String> = items.iter().map(canonical_string).collect();
            format!("[{}]", body.join(","))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    struct Listener {
        instance_port: Option<i64>,
        load_balancer_port: Option<i64>,
        protocol: Option<String>,
    }

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    struct Params {
        region: Option<String>,
        availability_zones: Vec<String>,
        listeners: Vec<Listener>,
        security_group_ids: Vec<String>,
        security_group_id_refs: Vec<String>,
    }

    fn listener(port: i64) -> Listener {
        Listener {
            instance_port: Some(port),
            load_balancer_port: Some(port),
            protocol: Some("HTTP".into()),
        }
    }

    fn opts() -> DiffOptions {
        DiffOptions::default()
            .ignore("region")
            .with_late_init(LateInitOptions::default().key("listeners", &["loadBalancerPort"]))
    }

    #[test]
    fn equal_shapes_are_up_to_date_regardless_of_order() {
        let declared = Params {
            region: Some("us-east-2".into()),
            availability_zones: vec!["b".into(), "a".into()],
            listeners: vec![listener(443), listener(80)],
            ..Params::default()
        };
        let observed = json!({
            "availabilityZones": ["a", "b"],
            "listeners": [
                {"instancePort": 80, "loadBalancerPort": 80, "protocol": "HTTP"},
                {"instancePort": 443, "loadBalancerPort": 443, "protocol": "HTTP"}
            ],
            "dnsName": "lb.example.com"
        });
        let (up_to_date, diff) = is_up_to_date(&declared, &observed, &opts()).unwrap();
        assert!(up_to_date, "{diff}");
        assert!(diff.is_empty());
    }

    #[test]
    fn changed_listener_is_drift_with_textual_diff() {
        let declared = Params {
            listeners: vec![listener(8180)],
            ..Params::default()
        };
        let observed = json!({"listeners": [{"instancePort": 80, "loadBalancerPort": 80, "protocol": "HTTP"}]});
        let (up_to_date, diff) = is_up_to_date(&declared, &observed, &opts()).unwrap();
        assert!(!up_to_date);
        assert!(diff.contains("8180"), "{diff}");
    }

    #[test]
    fn unset_declared_fields_are_not_drift() {
        let declared = Params::default();
        let observed = json!({"availabilityZones": ["a"], "securityGroupIds": ["sg-1"]});
        let (up_to_date, _) = is_up_to_date(&declared, &observed, &opts()).unwrap();
        assert!(up_to_date);
    }

    #[test]
    fn references_and_empty_collections_are_ignored() {
        let declared = Params {
            security_group_id_refs: vec!["my-sg".into()],
            security_group_ids: vec![],
            ..Params::default()
        };
        let observed = json!({"securityGroupIds": null});
        let (up_to_date, _) = is_up_to_date(&declared, &observed, &opts()).unwrap();
        assert!(up_to_date);
    }

    #[test]
    fn ordered_paths_keep_their_order() {
        let declared = Params {
            availability_zones: vec!["b".into(), "a".into()],
            ..Params::default()
        };
        let observed = json!({"availabilityZones": ["a", "b"]});
        let (up_to_date, _) =
            is_up_to_date(&declared, &observed, &opts().ordered("availabilityZones")).unwrap();
        assert!(!up_to_date);
    }

    #[test]
    fn merge_patch_nulls_removed_fields() {
        let patch = merge_patch(&json!({"a": 1, "b": {"c": 1}}), &json!({"b": {"c": 2}}));
        assert_eq!(patch, json!({"a": null, "b": {"c": 2}}));
    }

    #[test]
    fn canonical_string_sorts_keys() {
        assert_eq!(
            canonical_string(&json!({"b": 1, "a": [true, "x"]})),
            r#"{"a":[true,"x"],"b":1}"#
        );
    }
}

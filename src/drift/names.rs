//! Field-name mapping and filtering for the structural walker.

use std::collections::{BTreeMap, BTreeSet};

/// Keys used to pair array elements when a path has no explicit entry
pub const DEFAULT_NATURAL_KEYS: &[&str] = &[
    "id",
    "arn",
    "pathPattern",
    "errorCode",
    "headerName",
    "lambdaFunctionArn",
];

/// Translates a declared field name into the observed one and back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameMapper {
    Identity,
    /// Swap a trailing suffix, e.g. `distributionId` and `distributionID`
    ReplaceSuffix { declared: String, observed: String },
    /// Swap a substring anywhere in the name
    Replace { declared: String, observed: String },
    /// Explicit declared name to observed name pairs
    Map(BTreeMap<String, String>),
}

impl NameMapper {
    pub fn suffix(declared: &str, observed: &str) -> Self {
        NameMapper::ReplaceSuffix {
            declared: declared.to_string(),
            observed: observed.to_string(),
        }
    }

    pub fn replace(declared: &str, observed: &str) -> Self {
        NameMapper::Replace {
            declared: declared.to_string(),
            observed: observed.to_string(),
        }
    }

    pub fn map<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        NameMapper::Map(
            pairs
                .into_iter()
                .map(|(d, o)| (d.to_string(), o.to_string()))
                .collect(),
        )
    }

    /// Observed name for a declared field, if this mapper applies
    pub fn to_observed(&self, declared: &str) -> Option<String> {
        match self {
            NameMapper::Identity => Some(declared.to_string()),
            NameMapper::ReplaceSuffix {
                declared: from,
                observed: to,
            } => declared
                .strip_suffix(from.as_str())
                .map(|stem| format!("{stem}{to}")),
            NameMapper::Replace {
                declared: from,
                observed: to,
            } => declared
                .contains(from.as_str())
                .then(|| declared.replace(from.as_str(), to)),
            NameMapper::Map(pairs) => pairs.get(declared).cloned(),
        }
    }

    /// Declared name for an observed field, if this mapper applies
    pub fn to_declared(&self, observed: &str) -> Option<String> {
        match self {
            NameMapper::Identity => Some(observed.to_string()),
            NameMapper::ReplaceSuffix {
                declared: to,
                observed: from,
            } => observed
                .strip_suffix(from.as_str())
                .map(|stem| format!("{stem}{to}")),
            NameMapper::Replace {
                declared: to,
                observed: from,
            } => observed
                .contains(from.as_str())
                .then(|| observed.replace(from.as_str(), to)),
            NameMapper::Map(pairs) => pairs
                .iter()
                .find(|(_, o)| o.as_str() == observed)
                .map(|(d, _)| d.clone()),
        }
    }
}

/// Skips fields by dotted path; a skipped path also skips everything below it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameFilter {
    paths: BTreeSet<String>,
}

impl NameFilter {
    pub fn new<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            paths: paths.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn insert(&mut self, path: &str) {
        self.paths.insert(path.to_string());
    }

    pub fn skips(&self, path: &str) -> bool {
        self.paths.iter().any(|p| {
            path == p
                || path
                    .strip_prefix(p.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}

/// Options for [`super::late_initialize`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LateInitOptions {
    /// Tried in order; the first mapper naming an existing observed field wins
    pub mappers: Vec<NameMapper>,
    pub filter: NameFilter,
    /// Natural keys per array path, overriding [`DEFAULT_NATURAL_KEYS`]
    pub keys: BTreeMap<String, Vec<String>>,
}

impl Default for LateInitOptions {
    fn default() -> Self {
        Self {
            mappers: vec![
                NameMapper::Identity,
                NameMapper::suffix("Id", "ID"),
                NameMapper::suffix("Arn", "ARN"),
            ],
            filter: NameFilter::default(),
            keys: BTreeMap::new(),
        }
    }
}

impl LateInitOptions {
    #[must_use]
    pub fn with_mapper(mut self, mapper: NameMapper) -> Self {
        self.mappers.push(mapper);
        self
    }

    #[must_use]
    pub fn skip(mut self, path: &str) -> Self {
        self.filter.insert(path);
        self
    }

    #[must_use]
    pub fn key(mut self, path: &str, keys: &[&str]) -> Self {
        self.keys.insert(
            path.to_string(),
            keys.iter().map(|k| (*k).to_string()).collect(),
        );
        self
    }

    /// Natural keys for the array at `path`
    pub fn keys_for(&self, path: &str) -> Vec<&str> {
        match self.keys.get(path) {
            Some(keys) => keys.iter().map(String::as_str).collect(),
            None => DEFAULT_NATURAL_KEYS.to_vec(),
        }
    }

    /// Observed field for a declared name
    pub(crate) fn lookup<'a>(
        &self,
        observed: &'a serde_json::Map<String, serde_json::Value>,
        declared: &str,
    ) -> Option<&'a serde_json::Value> {
        self.mappers
            .iter()
            .filter_map(|m| m.to_observed(declared))
            .find_map(|name| observed.get(&name))
    }

    /// Declared name an observed field maps onto; explicit mappers win over identity
    pub(crate) fn declared_name(&self, observed: &str) -> Option<String> {
        self.mappers
            .iter()
            .filter(|m| **m != NameMapper::Identity)
            .find_map(|m| m.to_declared(observed))
            .or_else(|| {
                self.mappers
                    .contains(&NameMapper::Identity)
                    .then(|| observed.to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_mapper_is_invertible() {
        let m = NameMapper::suffix("Id", "ID");
        assert_eq!(m.to_observed("distributionId").as_deref(), Some("distributionID"));
        assert_eq!(m.to_declared("distributionID").as_deref(), Some("distributionId"));
        assert_eq!(m.to_observed("name"), None);
    }

    #[test]
    fn map_mapper_resolves_both_ways() {
        let m = NameMapper::map([("lbPort", "loadBalancerPort")]);
        assert_eq!(m.to_observed("lbPort").as_deref(), Some("loadBalancerPort"));
        assert_eq!(m.to_declared("loadBalancerPort").as_deref(), Some("lbPort"));
    }

    #[test]
    fn filter_skips_subtrees_but_not_siblings() {
        let filter = NameFilter::new(["distributionConfig.origins"]);
        assert!(filter.skips("distributionConfig.origins"));
        assert!(filter.skips("distributionConfig.origins.id"));
        assert!(!filter.skips("distributionConfig.originsExtra"));
        assert!(!filter.skips("distributionConfig"));
    }

    #[test]
    fn keys_default_unless_overridden() {
        let opts = LateInitOptions::default().key("listeners", &["loadBalancerPort"]);
        assert_eq!(opts.keys_for("listeners"), vec!["loadBalancerPort"]);
        assert_eq!(opts.keys_for("origins"), DEFAULT_NATURAL_KEYS.to_vec());
    }
}

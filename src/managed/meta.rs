//! Metadata helpers: external name, finalizers and deletion state.

use crate::constants::EXTERNAL_NAME_ANNOTATION;
use kube::Resource;

pub fn record_name<R: Resource>(record: &R) -> &str {
    record.meta().name.as_deref().unwrap_or("unknown")
}

/// External name, or the empty string when unset
pub fn external_name<R: Resource>(record: &R) -> &str {
    record
        .meta()
        .annotations
        .as_ref()
        .and_then(|a| a.get(EXTERNAL_NAME_ANNOTATION))
        .map_or("", String::as_str)
}

/// Set the external name unless one is already present.
///
/// Returns whether the record changed. A non-empty external name is never
/// replaced.
pub fn set_external_name<R: Resource>(record: &mut R, name: &str) -> bool {
    if !external_name(record).is_empty() || name.is_empty() {
        return false;
    }
    record
        .meta_mut()
        .annotations
        .get_or_insert_with(Default::default)
        .insert(EXTERNAL_NAME_ANNOTATION.to_string(), name.to_string());
    true
}

pub fn is_deleting<R: Resource>(record: &R) -> bool {
    record.meta().deletion_timestamp.is_some()
}

pub fn has_finalizer<R: Resource>(record: &R, finalizer: &str) -> bool {
    record
        .meta()
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|x| x == finalizer))
}

/// Returns whether the finalizer was added
pub fn add_finalizer<R: Resource>(record: &mut R, finalizer: &str) -> bool {
    if has_finalizer(record, finalizer) {
        return false;
    }
    record
        .meta_mut()
        .finalizers
        .get_or_insert_with(Vec::new)
        .push(finalizer.to_string());
    true
}

/// Returns whether the finalizer was removed
pub fn remove_finalizer<R: Resource>(record: &mut R, finalizer: &str) -> bool {
    let Some(finalizers) = record.meta_mut().finalizers.as_mut() else {
        return false;
    };
    let before = finalizers.len();
    finalizers.retain(|f| f != finalizer);
    before != finalizers.len()
}

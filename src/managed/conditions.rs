//! # Conditions
//!
//! `Ready` reflects the remote lifecycle; `Synced` reflects whether the last
//! pass succeeded. Setting a condition that is already present with the same
//! status, reason and message leaves the record untouched.

use crate::crd::Condition;
use crate::error::Error;

pub const TYPE_READY: &str = "Ready";
pub const TYPE_SYNCED: &str = "Synced";

pub const REASON_AVAILABLE: &str = "Available";
pub const REASON_UNAVAILABLE: &str = "Unavailable";
pub const REASON_CREATING: &str = "Creating";
pub const REASON_DELETING: &str = "Deleting";
pub const REASON_RECONCILE_SUCCESS: &str = "ReconcileSuccess";
pub const REASON_RECONCILE_ERROR: &str = "ReconcileError";

fn condition(r#type: &str, status: &str, reason: &str, message: Option<String>) -> Condition {
    Condition {
        r#type: r#type.to_string(),
        status: status.to_string(),
        last_transition_time: Some(chrono::Utc::now().to_rfc3339()),
        reason: Some(reason.to_string()),
        message,
    }
}

/// The remote object is ready for use
pub fn available() -> Condition {
    condition(TYPE_READY, "True", REASON_AVAILABLE, None)
}

/// The remote object exists but is not usable
pub fn unavailable() -> Condition {
    condition(TYPE_READY, "False", REASON_UNAVAILABLE, None)
}

pub fn creating() -> Condition {
    condition(TYPE_READY, "False", REASON_CREATING, None)
}

pub fn deleting() -> Condition {
    condition(TYPE_READY, "False", REASON_DELETING, None)
}

pub fn reconcile_success() -> Condition {
    condition(TYPE_SYNCED, "True", REASON_RECONCILE_SUCCESS, None)
}

/// The last pass failed; the message quotes the error
pub fn reconcile_error(error: &Error) -> Condition {
    condition(
        TYPE_SYNCED,
        "False",
        REASON_RECONCILE_ERROR,
        Some(error.to_string()),
    )
}

pub fn get_condition<'a>(conditions: &'a [Condition], r#type: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == r#type)
}

/// Insert or replace the condition of the same type.
///
/// Returns whether anything changed. The transition time of an equivalent
/// existing condition is kept.
pub fn set_condition(conditions: &mut Vec<Condition>, new: Condition) -> bool {
    match conditions.iter_mut().find(|c| c.r#type == new.r#type) {
        Some(existing)
            if existing.status == new.status
                && existing.reason == new.reason
                && existing.message == new.message =>
        {
            false
        }
        Some(existing) => {
            *existing = new;
            true
        }
        None => {
            conditions.push(new);
            true
        }
    }
}

//! # Regions and Partitions
//!
//! Maps a requested region onto the region the SDK should sign for. The
//! reserved region `global` stands for services without a region.

use crate::constants::GLOBAL_REGION;

/// Partition that owns `region`
pub fn partition_for_region(region: &str) -> &'static str {
    if region.starts_with("cn-") {
        "aws-cn"
    } else if region.starts_with("us-gov-") {
        "aws-us-gov"
    } else if region.starts_with("us-isob-") {
        "aws-iso-b"
    } else if region.starts_with("us-iso-") {
        "aws-iso"
    } else {
        "aws"
    }
}

/// Signing region of global services in the commercial partition
const GLOBAL_SIGNING_REGION: &str = "us-east-1";

/// Region a client should be configured with.
///
/// Regional requests are returned as they are. For `global`, the commercial
/// partition signs with `us-east-1`; other partitions keep the caller's
/// signing region and fall back to the ambient region.
pub fn effective_region(requested: &str, ambient: &str, signing_region: Option<&str>) -> String {
    if requested != GLOBAL_REGION && !requested.is_empty() {
        return requested.to_string();
    }
    match partition_for_region(ambient) {
        "aws" => GLOBAL_SIGNING_REGION.to_string(),
        _ => signing_region
            .filter(|r| !r.is_empty())
            .unwrap_or(ambient)
            .to_string(),
    }
}

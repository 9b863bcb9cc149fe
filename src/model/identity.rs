use sha1::{Digest, Sha1};

use crate::model::screen_model::Bounds;

/// Length of truncated identity hashes. Twelve hex chars is plenty for the
/// few hundred screens a run can discover and keeps keys readable in traces.
const HASH_LEN: usize = 12;

fn fingerprint(input: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(input.as_bytes());
    let hex = format!("{:x}", hasher.finalize());
    hex[..HASH_LEN].to_string()
}

/// Screen identity: hash of (activity, package) only. Dynamic content must
/// never contribute, so revisits with different data map to the same screen.
pub fn screen_hash(activity: &str, package: &str) -> String {
    fingerprint(&format!("{}|{}", activity, package))
}

/// Element identity: hash of (resource id, text, class, bounds), scoped to
/// a screen via `composite_key`.
pub fn element_hash(
    resource_id: Option<&str>,
    text: Option<&str>,
    class_name: &str,
    bounds: &Bounds,
) -> String {
    fingerprint(&format!(
        "{}|{}|{}|{},{},{},{}",
        resource_id.unwrap_or(""),
        text.unwrap_or(""),
        class_name,
        bounds.left,
        bounds.top,
        bounds.right,
        bounds.bottom,
    ))
}

/// Composite key tracking the same logical widget independently per screen.
pub fn composite_key(screen_id: &str, element_id: &str) -> String {
    format!("{}:{}", screen_id, element_id)
}

/// Compact state id for policy learning: screen context plus the sorted
/// element ids, so structurally identical screens collapse to one state.
pub fn state_hash(screen_id: &str, element_ids: &[&str]) -> String {
    let mut ids: Vec<&str> = element_ids.to_vec();
    ids.sort_unstable();
    fingerprint(&format!("{}|{}", screen_id, ids.join(",")))
}

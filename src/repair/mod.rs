//! # Document Repair
//!
//! Functions over the raw document rather than the live graph. The editor
//! runs them when an interface description changes shape, then hands the
//! repaired document to [`GraphModel::update`](crate::model::GraphModel::update).

mod connections;
mod process_ports;

pub use connections::*;
pub use process_ports::*;

use crate::document::GraphModelContent;
use crate::interface::InterfaceProvider;
use serde_json::Value;

/// Repair every process with a known interface, then prune orphan connections
///
/// Port entries are added for static definitions that lack one and dropped
/// when their definition is gone. Processes whose description cannot be
/// found are left untouched.
///
/// # Arguments
///
/// * `content` - The raw document content, repaired in place
/// * `provider` - Source of current interface descriptions
///
/// # Returns
///
/// * `true` - Some process port or connection entry was added or removed
/// * `false` - The document already matched its interfaces
pub fn synchronize_document<P: InterfaceProvider + ?Sized>(content: &mut GraphModelContent, provider: &P) -> bool {
    let mut processes_changed = 0;
    if let Some(processes) = content.processes.as_mut() {
        for (id, process) in processes.iter_mut() {
            let Some(interface) = provider.interface_for(process) else {
                tracing::debug!("[REPAIR] Skipping process {}, no interface for '{}'", id, process.reference);
                continue;
            };
            if synchronize_process_ports(process, interface) {
                processes_changed += 1;
            }
        }
    }
    let connections_changed = synchronize_connections(content);

    if processes_changed > 0 || connections_changed {
        tracing::info!(
            "[REPAIR] Document repaired ({} processes changed, connections pruned: {})",
            processes_changed,
            connections_changed
        );
    }
    processes_changed > 0 || connections_changed
}

/// Distinct dependency ids of all processes, `ref@rN` for pinned releases
pub fn extract_dependencies(content: &GraphModelContent) -> Vec<String> {
    let mut dependencies: Vec<String> = Vec::new();
    for process in content.processes.iter().flat_map(|processes| processes.values()) {
        if process.reference.is_empty() {
            continue;
        }
        let dependency = process.dependency_id();
        if !dependencies.contains(&dependency) {
            dependencies.push(dependency);
        }
    }
    dependencies
}

/// Whether a detailed diff (`added`/`updated`/`deleted` objects) of an
/// interface description touches its inports or outports
pub fn interface_signature_changed(patch: &Value) -> bool {
    let Some(sections) = patch.as_object() else {
        return false;
    };
    sections.values().any(|section| {
        section
            .as_object()
            .is_some_and(|changes| changes.contains_key("inports") || changes.contains_key("outports"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{RawProcess, TrackingMode};
    use serde_json::json;

    fn process(reference: &str, tracking: Option<TrackingMode>, release_nr: Option<u64>) -> RawProcess {
        RawProcess {
            reference: reference.to_string(),
            tracking,
            release_nr,
            ..Default::default()
        }
    }

    #[test]
    fn dependencies_are_distinct_and_pinned() {
        let mut content = GraphModelContent::default();
        let processes = content.processes.get_or_insert_with(Default::default);
        processes.insert("p-1".to_string(), process("pe", None, None));
        processes.insert("p-2".to_string(), process("pe", None, None));
        processes.insert("p-3".to_string(), process("gm", Some(TrackingMode::Fixed), Some(4)));
        processes.insert("p-4".to_string(), process("gm", Some(TrackingMode::LatestRelease), Some(4)));

        assert_eq!(extract_dependencies(&content), vec!["pe", "gm@r4", "gm"]);
    }

    #[test]
    fn signature_change_needs_port_sections() {
        assert!(interface_signature_changed(&json!({
            "added": {},
            "updated": { "inports": { "a": { "name": "A" } } },
            "deleted": {}
        })));
        assert!(!interface_signature_changed(&json!({
            "added": { "description": "new" },
            "updated": {},
            "deleted": {}
        })));
        assert!(!interface_signature_changed(&json!(null)));
    }
}

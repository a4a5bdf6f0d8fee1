//! # Process Port Repair
//!
//! Raw-document edits that keep a process's port entries in line with its
//! interface description.

use crate::document::{ProcessType, RawMap, RawProcess, RawProcessPort};
use crate::interface::{InterfaceDescription, PortTemplateDefinition};
use serde_json::json;
use uuid::Uuid;

/// Canvas position given to freshly created processes
pub const DEFAULT_PROCESS_POSITION: (f64, f64) = (200.0, 100.0);

fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}

/// First index free for new ports of `ports`
fn next_index_base(ports: &RawMap<RawProcessPort>) -> i64 {
    ports
        .values()
        .filter_map(|port| port.index)
        .max()
        .map_or(0, |highest| highest + 1)
}

fn instantiate<'d, I>(dst: &mut RawMap<RawProcessPort>, definitions: I, template: Option<(&str, &str)>) -> Vec<String>
where
    I: IntoIterator<Item = (&'d String, Option<i64>)>,
{
    let base = next_index_base(dst);
    let mut created = Vec::new();
    for (reference, index) in definitions {
        let id = fresh_id();
        let port = RawProcessPort {
            object_id: Some(id.clone()),
            template_id: template.map(|(template_id, _)| template_id.to_string()),
            template_group_id: template.map(|(_, group_id)| group_id.to_string()),
            index: index.map(|index| base + index),
            ..RawProcessPort::new(reference.as_str())
        };
        dst.insert(id.clone(), port);
        created.push(id);
    }
    created
}

/// Repair the raw ports of `process` against `interface`
///
/// Every static definition without a port entry referencing it gets a fresh
/// entry. Entries whose definition (direct or through their template) is
/// gone are removed. Returns whether anything changed.
pub fn synchronize_process_ports(process: &mut RawProcess, interface: &InterfaceDescription) -> bool {
    let mut changed = false;

    for reference in interface.inports.keys() {
        if !process.inports.values().any(|port| &port.reference == reference) {
            let id = fresh_id();
            tracing::debug!("[REPAIR] Adding inport {} for '{}'", id, reference);
            let port = RawProcessPort {
                object_id: Some(id.clone()),
                ..RawProcessPort::new(reference.as_str())
            };
            process.inports.insert(id, port);
            changed = true;
        }
    }
    for reference in interface.outports.keys() {
        if !process.outports.values().any(|port| &port.reference == reference) {
            let id = fresh_id();
            tracing::debug!("[REPAIR] Adding outport {} for '{}'", id, reference);
            let port = RawProcessPort {
                object_id: Some(id.clone()),
                ..RawProcessPort::new(reference.as_str())
            };
            process.outports.insert(id, port);
            changed = true;
        }
    }

    let before = process.inports.len() + process.outports.len();
    process.inports.retain(|id, port| {
        let keep = interface
            .inport_definition(&port.reference, port.template_id.as_deref())
            .is_some();
        if !keep {
            tracing::debug!("[REPAIR] Dropping inport {} ('{}' no longer declared)", id, port.reference);
        }
        keep
    });
    process.outports.retain(|id, port| {
        let keep = interface
            .outport_definition(&port.reference, port.template_id.as_deref())
            .is_some();
        if !keep {
            tracing::debug!("[REPAIR] Dropping outport {} ('{}' no longer declared)", id, port.reference);
        }
        keep
    });
    changed |= process.inports.len() + process.outports.len() != before;

    changed
}

/// Create one raw port per static definition of `interface`
///
/// Definition indices are offset past the highest index already present.
pub fn populate_static_ports(process: &mut RawProcess, interface: &InterfaceDescription) {
    instantiate(
        &mut process.inports,
        interface.inports.iter().map(|(reference, def)| (reference, def.index)),
        None,
    );
    instantiate(
        &mut process.outports,
        interface.outports.iter().map(|(reference, def)| (reference, def.index)),
        None,
    );
}

/// Instantiate every port of `template` on `process` under a new group
///
/// Returns the template group id shared by the created ports.
pub fn add_port_template(process: &mut RawProcess, template_id: &str, template: &PortTemplateDefinition) -> String {
    let group_id = fresh_id();
    let inports = instantiate(
        &mut process.inports,
        template
            .inport_templates
            .iter()
            .map(|(reference, def)| (reference, def.index)),
        Some((template_id, group_id.as_str())),
    );
    let outports = instantiate(
        &mut process.outports,
        template
            .outport_templates
            .iter()
            .map(|(reference, def)| (reference, def.index)),
        Some((template_id, group_id.as_str())),
    );
    tracing::debug!(
        "[REPAIR] Instantiated template {} as group {} ({} inports, {} outports)",
        template_id,
        group_id,
        inports.len(),
        outports.len()
    );
    group_id
}

/// A new raw process embedding `interface`, with its static ports populated
pub fn process_from_interface(interface: &InterfaceDescription) -> (String, RawProcess) {
    let id = fresh_id();
    let (x, y) = DEFAULT_PROCESS_POSITION;
    let mut process = RawProcess {
        object_id: Some(id.clone()),
        kind: interface.implementation.unwrap_or(ProcessType::ProcessingElement),
        reference: interface.object_id.clone(),
        version_id: interface.version_id.clone(),
        name: Some(interface.name.clone()),
        metadata: Some(json!({ "x": x, "y": y })),
        ..RawProcess::default()
    };
    populate_static_ports(&mut process, interface);
    (id, process)
}

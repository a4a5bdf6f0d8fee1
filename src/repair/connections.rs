//! # Connection Pruning and Cascading Deletes
//!
//! Raw-document edits. Removing a node also removes whatever hangs off it:
//! connections of its ports, the other ports of a template group, the
//! variable a last reference belonged to.

use crate::document::{GraphModelContent, RawProcessPort};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A deletable node of the raw document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id")]
pub enum Selection {
    Inport(String),
    Outport(String),
    Process(String),
    ProcessInport(String),
    ProcessOutport(String),
    VariableReference(String),
}

/// Drop connections whose ends no longer exist
///
/// Sources are model inports, process outports and variables; destinations
/// are model outports, process inports and variables. Returns whether any
/// connection was removed.
pub fn synchronize_connections(content: &mut GraphModelContent) -> bool {
    let mut sources: HashSet<String> = HashSet::new();
    let mut destinations: HashSet<String> = HashSet::new();

    if let Some(inports) = &content.inports {
        sources.extend(inports.keys().cloned());
    }
    if let Some(outports) = &content.outports {
        destinations.extend(outports.keys().cloned());
    }
    if let Some(processes) = &content.processes {
        for process in processes.values() {
            sources.extend(process.outports.keys().cloned());
            destinations.extend(process.inports.keys().cloned());
        }
    }
    if let Some(variables) = &content.variables {
        sources.extend(variables.keys().cloned());
        destinations.extend(variables.keys().cloned());
    }

    let Some(connections) = content.connections.as_mut() else {
        return false;
    };
    let before = connections.len();
    connections.retain(|id, connection| {
        let keep = sources.contains(&connection.source) && destinations.contains(&connection.destination);
        if !keep {
            tracing::debug!(
                "[REPAIR] Pruning orphan connection {} ({} -> {})",
                id,
                connection.source,
                connection.destination
            );
        }
        keep
    });
    before != connections.len()
}

/// Remove the connections of `port_id`
///
/// A connection leading to a variable reference takes the reference with
/// it instead, which in turn removes the connection.
pub fn delete_connections_by_port(content: &mut GraphModelContent, port_id: &str) -> bool {
    let Some(connections) = &content.connections else {
        return false;
    };

    let mut plain = Vec::new();
    let mut references = Vec::new();
    for (id, connection) in connections {
        if !connection.touches(port_id) {
            continue;
        }
        let far_reference = if connection.source == port_id {
            connection.reference_destination()
        } else {
            connection.reference_source()
        };
        match far_reference {
            Some(reference) => references.push(reference.to_string()),
            None => plain.push(id.clone()),
        }
    }

    let mut changed = false;
    if let Some(connections) = content.connections.as_mut() {
        for id in &plain {
            changed |= connections.remove(id).is_some();
        }
    }
    for reference in references {
        changed |= delete_node(content, &Selection::VariableReference(reference));
    }
    changed
}

/// Remove every connection attached to the variable reference `reference_id`
pub fn delete_connections_by_reference(content: &mut GraphModelContent, reference_id: &str) -> bool {
    let Some(connections) = content.connections.as_mut() else {
        return false;
    };
    let before = connections.len();
    connections.retain(|_, connection| {
        connection.reference_source() != Some(reference_id) && connection.reference_destination() != Some(reference_id)
    });
    before != connections.len()
}

/// Remove all ports of the template group `group_id` and their connections
pub fn delete_ports_by_template_group(content: &mut GraphModelContent, group_id: &str) -> bool {
    let Some(processes) = &content.processes else {
        return false;
    };
    let in_group = |port: &RawProcessPort| port.template_group_id.as_deref() == Some(group_id);
    let ports: Vec<String> = processes
        .values()
        .flat_map(|process| {
            process
                .inports
                .iter()
                .chain(process.outports.iter())
                .filter(|(_, port)| in_group(*port))
                .map(|(id, _)| id.clone())
        })
        .collect();
    if ports.is_empty() {
        return false;
    }

    for port_id in &ports {
        delete_connections_by_port(content, port_id);
    }
    if let Some(processes) = content.processes.as_mut() {
        for process in processes.values_mut() {
            process.inports.retain(|_, port| !in_group(&*port));
            process.outports.retain(|_, port| !in_group(&*port));
        }
    }
    tracing::debug!("[REPAIR] Deleted template group {} ({} ports)", group_id, ports.len());
    true
}

/// Group id of a templated process port, if the port exists and is templated
fn template_group_of(content: &GraphModelContent, port_id: &str, inport: bool) -> Option<String> {
    content.processes.as_ref()?.values().find_map(|process| {
        let ports = if inport { &process.inports } else { &process.outports };
        ports.get(port_id)?.template_group_id.clone()
    })
}

/// Delete `selection` and everything that depends on it
///
/// Only templated process ports can be deleted; deleting one removes its
/// whole template group. A variable losing its last reference is removed.
/// Returns whether anything changed.
pub fn delete_node(content: &mut GraphModelContent, selection: &Selection) -> bool {
    tracing::debug!("[REPAIR] Deleting {:?}", selection);
    match selection {
        Selection::Inport(id) => {
            let mut changed = delete_connections_by_port(content, id);
            if let Some(inports) = content.inports.as_mut() {
                changed |= inports.remove(id).is_some();
            }
            changed
        }
        Selection::Outport(id) => {
            let mut changed = delete_connections_by_port(content, id);
            if let Some(outports) = content.outports.as_mut() {
                changed |= outports.remove(id).is_some();
            }
            changed
        }
        Selection::Process(id) => {
            let Some(process) = content.processes.as_ref().and_then(|processes| processes.get(id)) else {
                return false;
            };
            let ports: Vec<String> = process.inports.keys().chain(process.outports.keys()).cloned().collect();
            for port_id in &ports {
                delete_connections_by_port(content, port_id);
            }
            content
                .processes
                .as_mut()
                .is_some_and(|processes| processes.remove(id).is_some())
        }
        Selection::ProcessInport(id) | Selection::ProcessOutport(id) => {
            let inport = matches!(selection, Selection::ProcessInport(_));
            let Some(group_id) = template_group_of(content, id, inport) else {
                tracing::debug!("[REPAIR] Port {} is static or unknown, not deleted", id);
                return false;
            };
            delete_connections_by_port(content, id);
            delete_ports_by_template_group(content, &group_id)
        }
        Selection::VariableReference(id) => {
            let Some(variable_id) = content.variables.as_ref().and_then(|variables| {
                variables
                    .iter()
                    .find(|(_, variable)| variable.metadata.references.iter().any(|r| &r.id == id))
                    .map(|(variable_id, _)| variable_id.clone())
            }) else {
                return false;
            };

            delete_connections_by_reference(content, id);
            if let Some(variables) = content.variables.as_mut() {
                let emptied = variables.get_mut(&variable_id).is_some_and(|variable| {
                    variable.metadata.references.retain(|r| &r.id != id);
                    variable.metadata.references.is_empty()
                });
                if emptied {
                    tracing::debug!("[REPAIR] Variable {} lost its last reference", variable_id);
                    variables.remove(&variable_id);
                }
            }
            true
        }
    }
}

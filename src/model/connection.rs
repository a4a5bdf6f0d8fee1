//! # Connections
//!
//! A connection is an ordered (source, destination) pair of port ids. It
//! owns neither port; both ends are resolved through the [`GraphModel`]
//! passed to each check.

use crate::document::RawConnection;
use crate::error::Result;
use crate::model::graph::{GraphModel, Node};
use crate::reconcile::{InstanceId, Reconcile};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::iter;

/// Port-id edges walked from the destination's process back to the
/// destination itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CyclePath {
    pub edges: Vec<(String, String)>,
}

impl CyclePath {
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Outcome of validating a connection; checks run in this order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionValidity {
    Valid,
    /// Source and destination are the same id
    SelfLoop,
    /// Another connection already joins the same pair
    Duplicate { existing: String },
    /// Source is not a source port or destination is not a destination port
    NotSourceToDestination,
    Circular(CyclePath),
}

impl ConnectionValidity {
    pub fn is_valid(&self) -> bool {
        matches!(self, ConnectionValidity::Valid)
    }
}

#[derive(Debug, Clone)]
pub struct Connection {
    instance: InstanceId,
    pub id: String,
    pub source: String,
    pub destination: String,
    pub label: Option<Value>,
    pub metadata: Option<Value>,
}

impl Connection {
    pub fn new(id: &str, raw: &RawConnection, ctx: &mut ()) -> Result<Self> {
        let mut connection = Self::candidate(String::new(), String::new());
        connection.update(id, raw, ctx)?;
        Ok(connection)
    }

    /// Throwaway connection used to validate a pair before it is stored
    pub fn candidate(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            instance: InstanceId::next(),
            id: String::new(),
            source: source.into(),
            destination: destination.into(),
            label: None,
            metadata: None,
        }
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn touches(&self, port_id: &str) -> bool {
        self.source == port_id || self.destination == port_id
    }

    pub fn source_port<'m>(&self, model: &'m GraphModel) -> Option<Node<'m>> {
        model.find(&self.source)
    }

    pub fn destination_port<'m>(&self, model: &'m GraphModel) -> Option<Node<'m>> {
        model.find(&self.destination)
    }

    pub fn goes_somewhere(&self) -> bool {
        self.source != self.destination
    }

    /// Another connection of `model` with the same pair
    pub fn duplicate_in<'m>(&self, model: &'m GraphModel) -> Option<&'m Connection> {
        model.connections().iter().find(|other| {
            other.id != self.id && other.source == self.source && other.destination == self.destination
        })
    }

    pub fn is_unique(&self, model: &GraphModel) -> bool {
        self.duplicate_in(model).is_none()
    }

    pub fn is_source_to_destination(&self, model: &GraphModel) -> bool {
        let source_ok = self.source_port(model).is_some_and(|node| node.is_source());
        let destination_ok = self.destination_port(model).is_some_and(|node| node.is_destination());
        source_ok && destination_ok
    }

    pub fn is_non_circular(&self, model: &GraphModel) -> bool {
        self.find_cycle(model).is_none()
    }

    /// Look for a loop this connection would close
    ///
    /// Only process-to-process chains can loop, so the walk is skipped unless
    /// the destination is a process inport and the source is not a model
    /// inport. The walk starts at the process owning the destination and
    /// follows outport connections (this one included) downstream.
    pub fn find_cycle(&self, model: &GraphModel) -> Option<CyclePath> {
        if !matches!(self.destination_port(model), Some(Node::ProcessInport(_))) {
            return None;
        }
        if matches!(self.source_port(model), Some(Node::Inport(_))) {
            return None;
        }

        let mut walk = CycleWalk {
            model,
            candidate: self,
            visited: HashSet::new(),
            path: Vec::new(),
        };
        if walk.visit(&self.destination) {
            tracing::debug!(
                "[CONNECT] {} -> {} closes a cycle over {} edges",
                self.source,
                self.destination,
                walk.path.len()
            );
            Some(CyclePath { edges: walk.path })
        } else {
            None
        }
    }

    pub fn validity(&self, model: &GraphModel) -> ConnectionValidity {
        if !self.goes_somewhere() {
            return ConnectionValidity::SelfLoop;
        }
        if let Some(existing) = self.duplicate_in(model) {
            return ConnectionValidity::Duplicate {
                existing: existing.id.clone(),
            };
        }
        if !self.is_source_to_destination(model) {
            return ConnectionValidity::NotSourceToDestination;
        }
        match self.find_cycle(model) {
            Some(path) => ConnectionValidity::Circular(path),
            None => ConnectionValidity::Valid,
        }
    }

    pub fn is_valid(&self, model: &GraphModel) -> bool {
        self.validity(model).is_valid()
    }
}

impl Reconcile<()> for Connection {
    type Raw = RawConnection;

    fn sync_id(&self) -> &str {
        &self.id
    }

    fn update(&mut self, id: &str, raw: &RawConnection, _ctx: &mut ()) -> Result<()> {
        self.id = id.to_string();
        self.source = raw.source.clone();
        self.destination = raw.destination.clone();
        self.label = raw.label.clone();
        self.metadata = raw.metadata.clone();
        Ok(())
    }
}

/// Depth-first walk over processes, downstream from a destination port
struct CycleWalk<'m> {
    model: &'m GraphModel,
    candidate: &'m Connection,
    visited: HashSet<&'m str>,
    path: Vec<(String, String)>,
}

impl<'m> CycleWalk<'m> {
    fn visit(&mut self, port_id: &str) -> bool {
        let model = self.model;
        let candidate = self.candidate;
        let Some(process) = model.find_destination_process(port_id) else {
            return false;
        };
        // a process already explored cannot lead anywhere new
        if !self.visited.insert(process.id.as_str()) {
            return false;
        }

        for outport in &process.outports {
            let outgoing: Vec<&'m Connection> = model
                .connections()
                .iter()
                .filter(|connection| connection.id != candidate.id)
                .chain(iter::once(candidate))
                .filter(|connection| connection.source == outport.id)
                .collect();

            for connection in outgoing {
                self.path
                    .push((connection.source.clone(), connection.destination.clone()));
                if connection.destination == candidate.destination {
                    return true;
                }
                if self.visit(&connection.destination) {
                    return true;
                }
                self.path.pop();
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconcileOptions;
    use crate::document::GraphModelNode;
    use crate::interface::InterfaceDescription;
    use serde_json::json;
    use std::collections::HashMap;

    /// Processes a, b, c wired a -> b -> c, plus an unwired d
    fn chain() -> GraphModel {
        let pid: InterfaceDescription = serde_json::from_value(json!({
            "objectId": "pe",
            "name": "Pass",
            "inports": { "in": { "name": "In" } },
            "outports": { "out": { "name": "Out" } }
        }))
        .unwrap();
        let provider = HashMap::from([("pe".to_string(), pid)]);

        let mut processes = serde_json::Map::new();
        for name in ["a", "b", "c", "d"] {
            processes.insert(
                format!("p-{name}"),
                json!({
                    "type": "PROCESSING_ELEMENT",
                    "ref": "pe",
                    "inports": { (format!("pi-{name}")): { "ref": "in" } },
                    "outports": { (format!("po-{name}")): { "ref": "out" } }
                }),
            );
        }
        let node: GraphModelNode = serde_json::from_value(json!({
            "id": "gm",
            "name": "Chain",
            "content": {
                "inports": { "in-1": { "name": "Demand" } },
                "outports": { "out-1": { "name": "Result" } },
                "processes": processes,
                "connections": {
                    "c-1": { "source": "po-a", "destination": "pi-b" },
                    "c-2": { "source": "po-b", "destination": "pi-c" }
                }
            }
        }))
        .unwrap();
        GraphModel::new(&node, &provider, ReconcileOptions::default()).unwrap()
    }

    #[test]
    fn self_loop_is_invalid() {
        let model = chain();
        assert_eq!(model.validate_connection("pi-a", "pi-a"), ConnectionValidity::SelfLoop);
        assert_eq!(model.validate_connection("po-a", "po-a"), ConnectionValidity::SelfLoop);
    }

    #[test]
    fn second_connection_for_same_pair_is_duplicate() {
        let model = chain();

        assert_eq!(
            model.validate_connection("po-a", "pi-b"),
            ConnectionValidity::Duplicate {
                existing: "c-1".to_string()
            }
        );
        assert!(model.find_connection("c-1").unwrap().is_unique(&model));
    }

    #[test]
    fn direction_must_run_source_to_destination() {
        let model = chain();

        assert_eq!(
            model.validate_connection("pi-b", "po-a"),
            ConnectionValidity::NotSourceToDestination
        );
        assert_eq!(
            model.validate_connection("po-a", "po-c"),
            ConnectionValidity::NotSourceToDestination
        );
        assert_eq!(
            model.validate_connection("in-1", "missing"),
            ConnectionValidity::NotSourceToDestination
        );
    }

    #[test]
    fn closing_edge_is_circular() {
        let model = chain();

        let validity = model.validate_connection("po-c", "pi-a");

        let path = match validity {
            ConnectionValidity::Circular(path) => path,
            other => panic!("expected a cycle, got {other:?}"),
        };
        assert_eq!(
            path.edges,
            vec![
                ("po-a".to_string(), "pi-b".to_string()),
                ("po-b".to_string(), "pi-c".to_string()),
                ("po-c".to_string(), "pi-a".to_string()),
            ]
        );
    }

    #[test]
    fn open_chain_stays_valid() {
        let model = chain();

        assert!(model.validate_connection("po-c", "pi-d").is_valid());
        assert!(model.validate_connection("in-1", "pi-a").is_valid());
        assert!(model.validate_connection("po-c", "out-1").is_valid());
        assert!(model.connections().iter().all(|connection| connection.is_valid(&model)));
    }

    #[test]
    fn endpoints_resolve_through_model() {
        let model = chain();
        let connection = model.find_connection("c-2").unwrap();

        assert_eq!(connection.source_port(&model).unwrap().id(), "po-b");
        assert!(matches!(connection.destination_port(&model), Some(Node::ProcessInport(_))));
        assert!(connection.is_non_circular(&model));
    }
}

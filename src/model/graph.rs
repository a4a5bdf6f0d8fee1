//! # Graph Model
//!
//! The aggregate root. It exclusively owns its five reconciled collections;
//! every other entity refers to its neighbours by id and resolves them
//! through the queries here.

use crate::config::ReconcileOptions;
use crate::document::GraphModelNode;
use crate::error::{Result, SyncIssue};
use crate::interface::InterfaceProvider;
use crate::model::connection::{Connection, ConnectionValidity};
use crate::model::port::{Endpoint, Inport, Outport, PortKind, ProcessInport, ProcessOutport};
use crate::model::process::{Process, ProcessContext};
use crate::model::variable::{Variable, VariableReference};
use crate::reconcile::{synchronize_map, Factory, SyncStats};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Churn and issues produced by one [`GraphModel::update`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub inports: SyncStats,
    pub outports: SyncStats,
    pub processes: SyncStats,
    /// Process ports and mirrored templates, over all processes
    pub process_ports: SyncStats,
    pub connections: SyncStats,
    pub variables: SyncStats,
    pub variable_references: SyncStats,
    pub issues: Vec<SyncIssue>,
}

impl SyncReport {
    /// Nothing was created or dropped anywhere in the graph
    pub fn is_unchanged(&self) -> bool {
        [
            self.inports,
            self.outports,
            self.processes,
            self.process_ports,
            self.connections,
            self.variables,
            self.variable_references,
        ]
        .iter()
        .all(SyncStats::is_unchanged)
    }

    pub fn total(&self) -> SyncStats {
        let mut total = SyncStats::default();
        for stats in [
            self.inports,
            self.outports,
            self.processes,
            self.process_ports,
            self.connections,
            self.variables,
            self.variable_references,
        ] {
            total.merge(stats);
        }
        total
    }
}

/// Anything [`GraphModel::find`] can return
#[derive(Debug, Clone, Copy)]
pub enum Node<'m> {
    Inport(&'m Inport),
    Outport(&'m Outport),
    Process(&'m Process),
    ProcessInport(&'m ProcessInport),
    ProcessOutport(&'m ProcessOutport),
    VariableReference(&'m VariableReference),
}

impl<'m> Node<'m> {
    pub fn id(&self) -> &'m str {
        match *self {
            Node::Inport(port) => &port.id,
            Node::Outport(port) => &port.id,
            Node::Process(process) => &process.id,
            Node::ProcessInport(port) => &port.id,
            Node::ProcessOutport(port) => &port.id,
            Node::VariableReference(reference) => &reference.id,
        }
    }

    pub fn node_type(&self) -> &'static str {
        match self {
            Node::Process(_) => "Process",
            Node::VariableReference(_) => "VariableReference",
            _ => self.as_port().map_or("Port", |port| port.kind().as_str()),
        }
    }

    pub fn as_port(&self) -> Option<PortHandle<'m>> {
        match *self {
            Node::Inport(port) => Some(PortHandle::Inport(port)),
            Node::Outport(port) => Some(PortHandle::Outport(port)),
            Node::ProcessInport(port) => Some(PortHandle::ProcessInport(port)),
            Node::ProcessOutport(port) => Some(PortHandle::ProcessOutport(port)),
            Node::Process(_) | Node::VariableReference(_) => None,
        }
    }

    /// Processes and variable references are never connection endpoints
    pub fn is_source(&self) -> bool {
        self.as_port().is_some_and(|port| port.is_source())
    }

    pub fn is_destination(&self) -> bool {
        self.as_port().is_some_and(|port| port.is_destination())
    }
}

/// A borrowed port of any kind
#[derive(Debug, Clone, Copy)]
pub enum PortHandle<'m> {
    Inport(&'m Inport),
    Outport(&'m Outport),
    ProcessInport(&'m ProcessInport),
    ProcessOutport(&'m ProcessOutport),
}

impl<'m> PortHandle<'m> {
    fn endpoint(&self) -> &'m dyn Endpoint {
        match *self {
            PortHandle::Inport(port) => port,
            PortHandle::Outport(port) => port,
            PortHandle::ProcessInport(port) => port,
            PortHandle::ProcessOutport(port) => port,
        }
    }
}

impl Endpoint for PortHandle<'_> {
    fn id(&self) -> &str {
        self.endpoint().id()
    }

    fn kind(&self) -> PortKind {
        match self {
            PortHandle::Inport(_) => PortKind::Inport,
            PortHandle::Outport(_) => PortKind::Outport,
            PortHandle::ProcessInport(_) => PortKind::ProcessInport,
            PortHandle::ProcessOutport(_) => PortKind::ProcessOutport,
        }
    }

    fn has_param(&self) -> bool {
        self.endpoint().has_param()
    }
}

/// Every port of the model indexed by id and grouped by role
#[derive(Debug, Clone, Default)]
pub struct PortMap<'m> {
    pub sources: BTreeMap<&'m str, PortHandle<'m>>,
    pub destinations: BTreeMap<&'m str, PortHandle<'m>>,
}

#[derive(Debug, Clone)]
pub struct GraphModel {
    pub id: String,
    pub name: String,
    pub version: Option<u64>,
    pub release_nr: Option<u64>,
    pub metadata: Option<Value>,
    inports: Vec<Inport>,
    outports: Vec<Outport>,
    processes: Vec<Process>,
    connections: Vec<Connection>,
    variables: Vec<Variable>,
    options: ReconcileOptions,
    last_report: SyncReport,
}

impl GraphModel {
    /// Build the live graph for `node`
    pub fn new<P: InterfaceProvider>(node: &GraphModelNode, provider: &P, options: ReconcileOptions) -> Result<Self> {
        let mut model = Self {
            id: String::new(),
            name: String::new(),
            version: None,
            release_nr: None,
            metadata: None,
            inports: Vec::new(),
            outports: Vec::new(),
            processes: Vec::new(),
            connections: Vec::new(),
            variables: Vec::new(),
            options,
            last_report: SyncReport::default(),
        };
        model.update(node, provider)?;
        Ok(model)
    }

    /// Bring the live graph in line with `node`
    ///
    /// Instances whose id is still present are updated in place, new ids are
    /// constructed, missing ids are dropped. Per-entity problems end up in
    /// the report's issues. An `Err` means a model-wide problem (an untyped
    /// process, or an unresolved reference under strict options); the
    /// collections reconciled before it stay updated.
    pub fn update<P: InterfaceProvider>(&mut self, node: &GraphModelNode, provider: &P) -> Result<SyncReport> {
        tracing::debug!("[GMRE] Synchronising graph model {} ({})", node.id, node.name);

        self.id = node.id.clone();
        self.name = node.name.clone();
        self.version = node.version;
        self.release_nr = node.release_nr;
        self.metadata = node.content.metadata.clone();

        let content = &node.content;
        let options = self.options.clone();
        let mut report = SyncReport::default();

        report.inports = synchronize_map(
            &mut self.inports,
            &Factory::Class(Inport::new),
            content.inports.as_ref(),
            &mut (),
        )?;
        report.outports = synchronize_map(
            &mut self.outports,
            &Factory::Class(Outport::new),
            content.outports.as_ref(),
            &mut (),
        )?;

        let mut issues = Vec::new();
        let mut ctx = ProcessContext {
            provider,
            options: &options,
            issues: &mut issues,
            port_stats: SyncStats::default(),
        };
        report.processes = synchronize_map(
            &mut self.processes,
            &Factory::Discriminator(Process::discriminator()),
            content.processes.as_ref(),
            &mut ctx,
        )?;
        report.process_ports = ctx.port_stats;

        report.connections = synchronize_map(
            &mut self.connections,
            &Factory::Class(Connection::new),
            content.connections.as_ref(),
            &mut (),
        )?;

        let mut reference_stats = SyncStats::default();
        report.variables = synchronize_map(
            &mut self.variables,
            &Factory::Class(Variable::new),
            content.variables.as_ref(),
            &mut reference_stats,
        )?;
        report.variable_references = reference_stats;
        report.issues = issues;

        let total = report.total();
        tracing::info!(
            "[GMRE] Graph model {}: {} inports, {} outports, {} processes, {} connections, {} variables (+{} -{}, {} issues)",
            self.id,
            self.inports.len(),
            self.outports.len(),
            self.processes.len(),
            self.connections.len(),
            self.variables.len(),
            total.added,
            total.removed,
            report.issues.len()
        );

        self.last_report = report.clone();
        Ok(report)
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Takes effect on the next update
    pub fn set_options(&mut self, options: ReconcileOptions) {
        self.options = options;
    }

    pub fn last_report(&self) -> &SyncReport {
        &self.last_report
    }

    pub fn inports(&self) -> &[Inport] {
        &self.inports
    }

    pub fn outports(&self) -> &[Outport] {
        &self.outports
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn broadcast_variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(|variable| variable.is_broadcast())
    }

    pub fn named_variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(|variable| variable.is_named())
    }

    pub fn process_inports(&self) -> impl Iterator<Item = &ProcessInport> {
        self.processes.iter().flat_map(|process| process.inports.iter())
    }

    pub fn process_outports(&self) -> impl Iterator<Item = &ProcessOutport> {
        self.processes.iter().flat_map(|process| process.outports.iter())
    }

    pub fn variable_references(&self) -> impl Iterator<Item = &VariableReference> {
        self.variables.iter().flat_map(|variable| variable.references.iter())
    }

    /// Connections starting or ending at `port_id`
    pub fn connections_of<'m>(&'m self, port_id: &str) -> impl Iterator<Item = &'m Connection> + 'm {
        let port_id = port_id.to_string();
        self.connections.iter().filter(move |connection| connection.touches(&port_id))
    }

    /// First match over inports, outports, processes, process inports,
    /// process outports and variable references
    pub fn find(&self, id: &str) -> Option<Node<'_>> {
        self.find_inport(id)
            .map(Node::Inport)
            .or_else(|| self.find_outport(id).map(Node::Outport))
            .or_else(|| self.find_process(id).map(Node::Process))
            .or_else(|| self.find_process_inport(id).map(Node::ProcessInport))
            .or_else(|| self.find_process_outport(id).map(Node::ProcessOutport))
            .or_else(|| self.find_variable_reference(id).map(Node::VariableReference))
    }

    pub fn find_inport(&self, id: &str) -> Option<&Inport> {
        self.inports.iter().find(|port| port.id == id)
    }

    pub fn find_outport(&self, id: &str) -> Option<&Outport> {
        self.outports.iter().find(|port| port.id == id)
    }

    pub fn find_process(&self, id: &str) -> Option<&Process> {
        self.processes.iter().find(|process| process.id == id)
    }

    pub fn find_process_inport(&self, id: &str) -> Option<&ProcessInport> {
        self.process_inports().find(|port| port.id == id)
    }

    pub fn find_process_outport(&self, id: &str) -> Option<&ProcessOutport> {
        self.process_outports().find(|port| port.id == id)
    }

    pub fn find_variable(&self, id: &str) -> Option<&Variable> {
        self.variables.iter().find(|variable| variable.id == id)
    }

    pub fn find_variable_reference(&self, id: &str) -> Option<&VariableReference> {
        self.variable_references().find(|reference| reference.id == id)
    }

    pub fn find_connection(&self, id: &str) -> Option<&Connection> {
        self.connections.iter().find(|connection| connection.id == id)
    }

    /// Process owning the inport `port_id`
    pub fn find_destination_process(&self, port_id: &str) -> Option<&Process> {
        self.processes.iter().find(|process| process.has_inport(port_id))
    }

    /// Validate a prospective connection without touching the model
    pub fn validate_connection(&self, source: &str, destination: &str) -> ConnectionValidity {
        let validity = Connection::candidate(source, destination).validity(self);
        if !validity.is_valid() {
            tracing::debug!("[CONNECT] Rejected {} -> {}: {:?}", source, destination, validity);
        }
        validity
    }

    pub fn port_map(&self) -> PortMap<'_> {
        let mut map = PortMap::default();
        for port in &self.inports {
            map.sources.insert(port.id.as_str(), PortHandle::Inport(port));
        }
        for port in &self.outports {
            map.destinations.insert(port.id.as_str(), PortHandle::Outport(port));
        }
        for process in &self.processes {
            for port in &process.inports {
                map.destinations.insert(port.id.as_str(), PortHandle::ProcessInport(port));
            }
            for port in &process.outports {
                map.sources.insert(port.id.as_str(), PortHandle::ProcessOutport(port));
            }
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::InterfaceDescription;
    use serde_json::json;
    use std::collections::HashMap;

    fn provider() -> HashMap<String, InterfaceDescription> {
        let pid: InterfaceDescription = serde_json::from_value(json!({
            "objectId": "pe-sum",
            "name": "Sum",
            "inports": { "a": { "name": "A" } },
            "outports": { "out": { "name": "Out" } }
        }))
        .unwrap();
        HashMap::from([("pe-sum".to_string(), pid)])
    }

    fn document(with_variable_refs: &[&str]) -> GraphModelNode {
        let references: Vec<_> = with_variable_refs
            .iter()
            .map(|id| json!({ "id": id, "portType": "source", "metadata": { "x": 1, "y": 2 } }))
            .collect();
        serde_json::from_value(json!({
            "id": "gm",
            "name": "Model",
            "content": {
                "inports": { "in-1": { "name": "Demand" } },
                "outports": { "out-1": { "name": "Result" } },
                "processes": {
                    "p-1": {
                        "type": "PROCESSING_ELEMENT",
                        "ref": "pe-sum",
                        "inports": { "pi-1": { "ref": "a" } },
                        "outports": { "po-1": { "ref": "out" } }
                    }
                },
                "connections": {
                    "c-1": { "source": "in-1", "destination": "pi-1" },
                    "c-2": { "source": "po-1", "destination": "out-1" }
                },
                "variables": {
                    "v-1": { "objectType": "BROADCAST_VARIABLE", "label": "x", "metadata": { "references": references } },
                    "v-2": { "objectType": "NAMED_VARIABLE", "label": "y" }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn find_falls_back_across_collections() {
        let model = GraphModel::new(&document(&["ref-1"]), &provider(), ReconcileOptions::default()).unwrap();

        assert!(matches!(model.find("in-1"), Some(Node::Inport(_))));
        assert!(matches!(model.find("out-1"), Some(Node::Outport(_))));
        assert!(matches!(model.find("p-1"), Some(Node::Process(_))));
        assert!(matches!(model.find("pi-1"), Some(Node::ProcessInport(_))));
        assert!(matches!(model.find("po-1"), Some(Node::ProcessOutport(_))));
        assert!(matches!(model.find("ref-1"), Some(Node::VariableReference(_))));
        assert!(model.find("c-1").is_none());
        assert_eq!(model.find("pi-1").unwrap().node_type(), "ProcessInport");
    }

    #[test]
    fn port_map_groups_by_role() {
        let model = GraphModel::new(&document(&[]), &provider(), ReconcileOptions::default()).unwrap();
        let map = model.port_map();

        let sources: Vec<_> = map.sources.keys().copied().collect();
        let destinations: Vec<_> = map.destinations.keys().copied().collect();
        assert_eq!(sources, vec!["in-1", "po-1"]);
        assert_eq!(destinations, vec!["out-1", "pi-1"]);
        assert_eq!(map.sources["po-1"].kind(), PortKind::ProcessOutport);
    }

    #[test]
    fn derived_views_are_computed_on_demand() {
        let model = GraphModel::new(&document(&["ref-1", "ref-2"]), &provider(), ReconcileOptions::default()).unwrap();

        assert_eq!(model.broadcast_variables().count(), 1);
        assert_eq!(model.named_variables().count(), 1);
        assert_eq!(model.process_inports().count(), 1);
        assert_eq!(model.process_outports().count(), 1);
        assert_eq!(model.variable_references().count(), 2);
        assert!(model.find_inport("in-1").unwrap().is_connected(&model));
        assert_eq!(model.find_process_outport("po-1").unwrap().connections(&model).len(), 1);
    }

    #[test]
    fn second_identical_update_changes_nothing() {
        let node = document(&["ref-1"]);
        let provider = provider();
        let mut model = GraphModel::new(&node, &provider, ReconcileOptions::default()).unwrap();
        assert!(!model.last_report().is_unchanged());

        let report = model.update(&node, &provider).unwrap();
        assert!(report.is_unchanged());
        assert_eq!(report.processes.updated, 1);
    }

    #[test]
    fn absent_collection_empties_live_collection() {
        let provider = provider();
        let mut node = document(&[]);
        let mut model = GraphModel::new(&node, &provider, ReconcileOptions::default()).unwrap();
        assert_eq!(model.connections().len(), 2);

        node.content.connections = None;
        let report = model.update(&node, &provider).unwrap();

        assert!(model.connections().is_empty());
        assert_eq!(report.connections.removed, 2);
    }
}

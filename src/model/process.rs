//! # Processes
//!
//! A process is one node of the graph. It references an external interface
//! description (`ref`), owns its resolved inports and outports, and mirrors
//! the port templates its description declares.
//!
//! Two variants exist and only differ in how ports are ordered for display:
//! - [`ProcessVariant::GraphModel`] (a nested graph model) orders ports by
//!   the vertical position of the nested model's ports.
//! - [`ProcessVariant::ProcessingElement`] orders ports by their explicit
//!   `index`; templated ports keep their slots since their relative order
//!   belongs to the template.

use crate::config::ReconcileOptions;
use crate::document::{ProcessType, RawProcess, TrackingMode};
use crate::error::{GraphModelError, Result, SyncIssue};
use crate::interface::InterfaceProvider;
use crate::model::port::{PortContext, ProcessInport, ProcessOutport, ProcessPort};
use crate::model::template::ProcessPortTemplate;
use crate::reconcile::{
    synchronize_map, Constructor, Discriminator, Factory, InstanceId, Reconcile, SyncStats,
};
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessVariant {
    ProcessingElement,
    GraphModel,
}

impl ProcessVariant {
    pub fn from_type(kind: ProcessType) -> Option<Self> {
        match kind {
            ProcessType::ProcessingElement => Some(ProcessVariant::ProcessingElement),
            ProcessType::GraphModel => Some(ProcessVariant::GraphModel),
            ProcessType::Unknown => None,
        }
    }
}

/// What a process needs while it is being reconciled
pub struct ProcessContext<'a> {
    pub provider: &'a dyn InterfaceProvider,
    pub options: &'a ReconcileOptions,
    pub issues: &'a mut Vec<SyncIssue>,
    /// Port and template churn summed over every process touched
    pub port_stats: SyncStats,
}

#[derive(Debug, Clone)]
pub struct Process {
    instance: InstanceId,
    pub id: String,
    pub variant: ProcessVariant,
    pub reference: String,
    pub version_id: Option<String>,
    pub label: Option<String>,
    pub metadata: Option<Value>,
    pub name: String,
    pub description: Option<String>,
    pub visualization_hint: Option<String>,
    pub tracking: Option<TrackingMode>,
    pub release_nr: Option<u64>,
    pub inports: Vec<ProcessInport>,
    pub outports: Vec<ProcessOutport>,
    pub port_templates: Vec<ProcessPortTemplate>,
    resolved: bool,
}

impl Process {
    /// Chooses the process variant from the raw `type`
    pub fn discriminator<'a>() -> Discriminator<Process, RawProcess, ProcessContext<'a>> {
        Discriminator::new(Self::classify)
    }

    fn classify<'a>(id: &str, raw: &RawProcess) -> Result<Constructor<Process, RawProcess, ProcessContext<'a>>> {
        match raw.kind {
            ProcessType::ProcessingElement => Ok(Process::new_processing_element),
            ProcessType::GraphModel => Ok(Process::new_graph_model),
            ProcessType::Unknown => Err(GraphModelError::UntypedProcess {
                process_id: id.to_string(),
                kind: raw.kind.as_str().to_string(),
            }),
        }
    }

    pub fn new_processing_element(id: &str, raw: &RawProcess, ctx: &mut ProcessContext<'_>) -> Result<Self> {
        Self::construct(ProcessVariant::ProcessingElement, id, raw, ctx)
    }

    pub fn new_graph_model(id: &str, raw: &RawProcess, ctx: &mut ProcessContext<'_>) -> Result<Self> {
        Self::construct(ProcessVariant::GraphModel, id, raw, ctx)
    }

    fn construct(variant: ProcessVariant, id: &str, raw: &RawProcess, ctx: &mut ProcessContext<'_>) -> Result<Self> {
        let mut process = Self {
            instance: InstanceId::next(),
            id: String::new(),
            variant,
            reference: String::new(),
            version_id: None,
            label: None,
            metadata: None,
            name: String::new(),
            description: None,
            visualization_hint: None,
            tracking: None,
            release_nr: None,
            inports: Vec::new(),
            outports: Vec::new(),
            port_templates: Vec::new(),
            resolved: false,
        };
        process.update(id, raw, ctx)?;
        Ok(process)
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    /// Whether the interface description behind `ref` was found
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn inport_by_ref(&self, reference: &str) -> Option<&ProcessInport> {
        self.inports.iter().find(|port| port.reference == reference)
    }

    pub fn outport_by_ref(&self, reference: &str) -> Option<&ProcessOutport> {
        self.outports.iter().find(|port| port.reference == reference)
    }

    pub fn port_template(&self, id: &str) -> Option<&ProcessPortTemplate> {
        self.port_templates.iter().find(|template| template.id == id)
    }

    pub fn has_inport(&self, port_id: &str) -> bool {
        self.inports.iter().any(|port| port.id == port_id)
    }

    fn apply_ordering(&mut self) {
        match self.variant {
            ProcessVariant::GraphModel => {
                order_by_position(&mut self.inports);
                order_by_position(&mut self.outports);
            }
            ProcessVariant::ProcessingElement => {
                order_by_index(&mut self.inports);
                order_by_index(&mut self.outports);
            }
        }
    }
}

impl<'a> Reconcile<ProcessContext<'a>> for Process {
    type Raw = RawProcess;

    fn sync_id(&self) -> &str {
        &self.id
    }

    fn update(&mut self, id: &str, raw: &RawProcess, ctx: &mut ProcessContext<'a>) -> Result<()> {
        self.variant = ProcessVariant::from_type(raw.kind).ok_or_else(|| GraphModelError::UntypedProcess {
            process_id: id.to_string(),
            kind: raw.kind.as_str().to_string(),
        })?;
        self.id = id.to_string();
        self.reference = raw.reference.clone();
        self.version_id = raw.version_id.clone();
        self.label = raw.label.clone();
        self.metadata = raw.metadata.clone();
        self.tracking = raw.tracking;

        let provider = ctx.provider;
        let interface = provider.interface_for(raw);
        match interface {
            Some(pid) => {
                self.resolved = true;
                self.name = pid.name.clone();
                self.description = pid.description.clone();
                self.visualization_hint = pid.visualization_hint.clone();
                self.release_nr = pid.release_nr;
            }
            None => {
                if ctx.options.strict_interfaces {
                    return Err(GraphModelError::UnresolvedProcessReference {
                        process_id: id.to_string(),
                        reference: raw.reference.clone(),
                    });
                }
                tracing::warn!(
                    "[SYNC] Process {} references unknown interface description '{}'",
                    id,
                    raw.reference
                );
                ctx.issues.push(SyncIssue::UnresolvedProcessReference {
                    process_id: id.to_string(),
                    reference: raw.reference.clone(),
                });
                self.resolved = false;
                self.name = raw.name.clone().unwrap_or_default();
                self.description = None;
                self.visualization_hint = None;
                self.release_nr = None;
            }
        }

        let mut port_ctx = PortContext {
            process_id: id,
            interface,
            issues: &mut *ctx.issues,
        };
        let inports = synchronize_map(
            &mut self.inports,
            &Factory::Class(ProcessInport::new),
            Some(&raw.inports),
            &mut port_ctx,
        )?;
        let outports = synchronize_map(
            &mut self.outports,
            &Factory::Class(ProcessOutport::new),
            Some(&raw.outports),
            &mut port_ctx,
        )?;
        let templates = synchronize_map(
            &mut self.port_templates,
            &Factory::Class(ProcessPortTemplate::new),
            interface.map(|pid| &pid.port_templates),
            &mut (),
        )?;
        ctx.port_stats.merge(inports);
        ctx.port_stats.merge(outports);
        ctx.port_stats.merge(templates);

        if ctx.options.order_ports {
            self.apply_ordering();
        }
        Ok(())
    }
}

/// Order ports by the `y` position hint in their metadata, ascending
///
/// Ports without a position keep their slot.
pub fn order_by_position<P: ProcessPort>(ports: &mut Vec<P>) {
    reorder_slots(ports, |port| port.y_position(), |a, b| a.total_cmp(b));
}

/// Order non-templated ports by `index`, ascending
///
/// Templated ports keep their slot. Ports without an index go after
/// indexed ones.
pub fn order_by_index<P: ProcessPort>(ports: &mut Vec<P>) {
    reorder_slots(
        ports,
        |port| if port.is_templated() { None } else { Some(port.index()) },
        |a, b| match (a, b) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    );
}

/// Stable-sort the keyed elements among the slots they occupy
fn reorder_slots<P, K>(ports: &mut Vec<P>, key: impl Fn(&P) -> Option<K>, compare: impl Fn(&K, &K) -> Ordering) {
    let mut keyed: Vec<(usize, K)> = ports
        .iter()
        .enumerate()
        .filter_map(|(position, port)| key(port).map(|k| (position, k)))
        .collect();
    if keyed.len() < 2 {
        return;
    }

    let mut is_slot = vec![false; ports.len()];
    for (position, _) in &keyed {
        is_slot[*position] = true;
    }
    keyed.sort_by(|a, b| compare(&a.1, &b.1));

    let mut sorted_sources = keyed.into_iter().map(|(position, _)| position);
    let mut taken: Vec<Option<P>> = ports.drain(..).map(Some).collect();
    for slot in 0..taken.len() {
        let source = if is_slot[slot] {
            sorted_sources.next().unwrap_or(slot)
        } else {
            slot
        };
        if let Some(port) = taken[source].take() {
            ports.push(port);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::RawProcessPort;
    use crate::interface::{InportDefinition, InterfaceDescription, OutportDefinition, PortTemplateDefinition};
    use serde_json::json;
    use std::collections::HashMap;

    fn provider() -> HashMap<String, InterfaceDescription> {
        let mut pe = InterfaceDescription {
            object_id: "pe".to_string(),
            name: "Sum".to_string(),
            ..Default::default()
        };
        for id in ["a", "b", "c"] {
            pe.inports.insert(id.to_string(), InportDefinition::default());
        }
        pe.outports.insert("out".to_string(), OutportDefinition::default());
        let mut template = PortTemplateDefinition::default();
        template.inport_templates.insert("extra".to_string(), InportDefinition::default());
        pe.port_templates.insert("t".to_string(), template);

        let mut nested = InterfaceDescription {
            object_id: "gm".to_string(),
            name: "Nested".to_string(),
            ..Default::default()
        };
        nested.outports.insert(
            "low".to_string(),
            OutportDefinition {
                metadata: Some(json!({ "y": 50 })),
                ..Default::default()
            },
        );
        nested.outports.insert(
            "high".to_string(),
            OutportDefinition {
                metadata: Some(json!({ "y": 10 })),
                ..Default::default()
            },
        );

        let mut provider = HashMap::new();
        provider.insert("pe".to_string(), pe);
        provider.insert("gm".to_string(), nested);
        provider
    }

    fn port(reference: &str, index: Option<i64>, template: Option<&str>) -> RawProcessPort {
        RawProcessPort {
            index,
            template_id: template.map(str::to_string),
            ..RawProcessPort::new(reference)
        }
    }

    fn build(id: &str, raw: &RawProcess, provider: &HashMap<String, InterfaceDescription>) -> (Process, Vec<SyncIssue>) {
        let options = ReconcileOptions::default();
        let mut issues = Vec::new();
        let mut ctx = ProcessContext {
            provider,
            options: &options,
            issues: &mut issues,
            port_stats: SyncStats::default(),
        };
        let constructor = Process::discriminator().discriminate(id, raw).unwrap();
        let process = constructor(id, raw, &mut ctx).unwrap();
        (process, issues)
    }

    #[test]
    fn graph_model_variant_orders_by_position() {
        let mut raw = RawProcess {
            kind: ProcessType::GraphModel,
            reference: "gm".to_string(),
            ..Default::default()
        };
        raw.outports.insert("po-1".to_string(), port("low", None, None));
        raw.outports.insert("po-2".to_string(), port("high", None, None));

        let (process, issues) = build("p", &raw, &provider());

        assert_eq!(process.variant, ProcessVariant::GraphModel);
        let order: Vec<_> = process.outports.iter().map(|p| p.reference.as_str()).collect();
        assert_eq!(order, vec!["high", "low"]);
        assert!(issues.is_empty());
    }

    #[test]
    fn processing_element_orders_by_index() {
        let mut raw = RawProcess {
            kind: ProcessType::ProcessingElement,
            reference: "pe".to_string(),
            ..Default::default()
        };
        raw.inports.insert("pi-1".to_string(), port("a", Some(2), None));
        raw.inports.insert("pi-2".to_string(), port("extra", Some(9), Some("t")));
        raw.inports.insert("pi-3".to_string(), port("b", Some(0), None));

        let (process, _) = build("p", &raw, &provider());

        let order: Vec<_> = process.inports.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(order, vec!["pi-3", "pi-2", "pi-1"]);
    }

    #[test]
    fn templated_ports_keep_their_slots() {
        let mut ports = vec![
            port("a", Some(3), None),
            port("t1", Some(0), Some("t")),
            port("b", Some(1), None),
            port("t2", Some(5), Some("t")),
            port("c", Some(2), None),
        ];
        let pid = provider().remove("pe").unwrap();
        let mut issues = Vec::new();
        let mut ctx = PortContext {
            process_id: "p",
            interface: Some(&pid),
            issues: &mut issues,
        };
        let mut live: Vec<ProcessInport> = ports
            .drain(..)
            .enumerate()
            .map(|(n, raw)| ProcessInport::new(&format!("pi-{n}"), &raw, &mut ctx).unwrap())
            .collect();

        order_by_index(&mut live);

        let order: Vec<_> = live.iter().map(|p| p.reference.as_str()).collect();
        assert_eq!(order, vec!["b", "t1", "c", "t2", "a"]);
    }

    #[test]
    fn mirrors_declared_templates() {
        let raw = RawProcess {
            kind: ProcessType::ProcessingElement,
            reference: "pe".to_string(),
            ..Default::default()
        };
        let (process, _) = build("p", &raw, &provider());

        assert_eq!(process.name, "Sum");
        assert!(process.port_template("t").is_some());
    }

    #[test]
    fn unresolved_reference_is_recorded() {
        let mut raw = RawProcess {
            kind: ProcessType::ProcessingElement,
            reference: "missing".to_string(),
            label: Some("orphan".to_string()),
            ..Default::default()
        };
        raw.inports.insert("pi-1".to_string(), port("a", None, None));

        let (process, issues) = build("p", &raw, &provider());

        assert!(!process.is_resolved());
        assert_eq!(process.inports.len(), 1);
        assert!(!process.inports[0].is_resolved());
        assert!(process.port_templates.is_empty());
        assert_eq!(
            issues,
            vec![SyncIssue::UnresolvedProcessReference {
                process_id: "p".to_string(),
                reference: "missing".to_string(),
            }]
        );
    }

    #[test]
    fn strict_options_reject_unresolved_reference() {
        let raw = RawProcess {
            kind: ProcessType::ProcessingElement,
            reference: "missing".to_string(),
            ..Default::default()
        };
        let provider = provider();
        let options = ReconcileOptions::strict();
        let mut issues = Vec::new();
        let mut ctx = ProcessContext {
            provider: &provider,
            options: &options,
            issues: &mut issues,
            port_stats: SyncStats::default(),
        };

        let err = Process::new_processing_element("p", &raw, &mut ctx).unwrap_err();
        assert!(matches!(err, GraphModelError::UnresolvedProcessReference { .. }));
    }

    #[test]
    fn dropped_tracking_is_cleared_on_update() {
        let mut raw = RawProcess {
            kind: ProcessType::ProcessingElement,
            reference: "pe".to_string(),
            tracking: Some(TrackingMode::Fixed),
            ..Default::default()
        };
        let provider = provider();
        let (mut process, _) = build("p", &raw, &provider);
        assert_eq!(process.tracking, Some(TrackingMode::Fixed));

        raw.tracking = None;
        let options = ReconcileOptions::default();
        let mut issues = Vec::new();
        let mut ctx = ProcessContext {
            provider: &provider,
            options: &options,
            issues: &mut issues,
            port_stats: SyncStats::default(),
        };
        process.update("p", &raw, &mut ctx).unwrap();

        assert_eq!(process.tracking, None);
    }

    #[test]
    fn unknown_type_is_not_classified() {
        let raw = RawProcess {
            reference: "pe".to_string(),
            ..Default::default()
        };
        let err = Process::discriminator().discriminate("p", &raw).err().unwrap();
        assert!(matches!(err, GraphModelError::UntypedProcess { ref process_id, .. } if process_id == "p"));
    }
}

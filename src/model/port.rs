//! # Ports
//!
//! Graph-model ports ([`Inport`], [`Outport`]) carry their authored
//! definition. Process ports ([`ProcessInport`], [`ProcessOutport`]) only
//! carry a `ref` (and maybe a template id); their definition is resolved
//! against the owning process's interface description on every update.

use crate::document::{PortRole, RawInport, RawOutport, RawProcessPort};
use crate::error::{Result, SyncIssue};
use crate::interface::{
    ConfigType, GeneratesResponse, InportDefinition, InterfaceDescription, OutportDefinition, ParamType,
};
use crate::model::connection::Connection;
use crate::model::graph::GraphModel;
use crate::reconcile::{InstanceId, Reconcile};
use serde_json::Value;

/// Concrete port kind, used as the discriminant wherever ports are mixed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortKind {
    Inport,
    Outport,
    ProcessInport,
    ProcessOutport,
}

impl PortKind {
    /// Model inports feed the graph, process outports feed other processes
    pub fn role(&self) -> PortRole {
        match self {
            PortKind::Inport | PortKind::ProcessOutport => PortRole::Source,
            PortKind::Outport | PortKind::ProcessInport => PortRole::Destination,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PortKind::Inport => "Inport",
            PortKind::Outport => "Outport",
            PortKind::ProcessInport => "ProcessInport",
            PortKind::ProcessOutport => "ProcessOutport",
        }
    }
}

/// Capabilities shared by every port kind
pub trait Endpoint {
    fn id(&self) -> &str;

    fn kind(&self) -> PortKind;

    fn role(&self) -> PortRole {
        self.kind().role()
    }

    fn is_source(&self) -> bool {
        self.role() == PortRole::Source
    }

    fn is_destination(&self) -> bool {
        self.role() == PortRole::Destination
    }

    fn has_param(&self) -> bool {
        false
    }

    /// Connections of `model` that start or end at this port
    fn connections<'m>(&self, model: &'m GraphModel) -> Vec<&'m Connection> {
        model.connections_of(self.id()).collect()
    }

    fn is_connected(&self, model: &GraphModel) -> bool {
        model.connections_of(self.id()).next().is_some()
    }
}

/// Entry point of a graph model
#[derive(Debug, Clone)]
pub struct Inport {
    instance: InstanceId,
    pub id: String,
    pub definition: InportDefinition,
}

impl Inport {
    pub fn new(id: &str, raw: &RawInport, ctx: &mut ()) -> Result<Self> {
        let mut inport = Self {
            instance: InstanceId::next(),
            id: String::new(),
            definition: InportDefinition::default(),
        };
        inport.update(id, raw, ctx)?;
        Ok(inport)
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn required_types(&self) -> &[ParamType] {
        &self.definition.required_types
    }

    pub fn desired_units(&self) -> &[String] {
        &self.definition.desired_units
    }

    pub fn generates_response(&self) -> Option<GeneratesResponse> {
        self.definition.generates_response
    }

    pub fn default_param(&self) -> Option<&Value> {
        self.definition.default_param.as_ref()
    }

    pub fn config_type(&self) -> Option<ConfigType> {
        self.definition.config_type
    }

    pub fn metadata(&self) -> Option<&Value> {
        self.definition.metadata.as_ref()
    }
}

impl Reconcile<()> for Inport {
    type Raw = RawInport;

    fn sync_id(&self) -> &str {
        &self.id
    }

    fn update(&mut self, id: &str, raw: &RawInport, _ctx: &mut ()) -> Result<()> {
        self.id = id.to_string();
        self.definition = raw.clone();
        Ok(())
    }
}

impl Endpoint for Inport {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> PortKind {
        PortKind::Inport
    }
}

/// Exit point of a graph model
#[derive(Debug, Clone)]
pub struct Outport {
    instance: InstanceId,
    pub id: String,
    pub definition: OutportDefinition,
}

impl Outport {
    pub fn new(id: &str, raw: &RawOutport, ctx: &mut ()) -> Result<Self> {
        let mut outport = Self {
            instance: InstanceId::next(),
            id: String::new(),
            definition: OutportDefinition::default(),
        };
        outport.update(id, raw, ctx)?;
        Ok(outport)
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn types(&self) -> &[ParamType] {
        &self.definition.types
    }

    pub fn unit(&self) -> Option<&str> {
        self.definition.unit.as_deref()
    }

    pub fn config_type(&self) -> Option<ConfigType> {
        self.definition.config_type
    }

    pub fn metadata(&self) -> Option<&Value> {
        self.definition.metadata.as_ref()
    }
}

impl Reconcile<()> for Outport {
    type Raw = RawOutport;

    fn sync_id(&self) -> &str {
        &self.id
    }

    fn update(&mut self, id: &str, raw: &RawOutport, _ctx: &mut ()) -> Result<()> {
        self.id = id.to_string();
        self.definition = raw.clone();
        Ok(())
    }
}

impl Endpoint for Outport {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> PortKind {
        PortKind::Outport
    }
}

/// What a process port needs while it is being reconciled
pub struct PortContext<'a> {
    pub process_id: &'a str,
    /// `None` when the owning process itself is unresolved
    pub interface: Option<&'a InterfaceDescription>,
    pub issues: &'a mut Vec<SyncIssue>,
}

impl PortContext<'_> {
    fn report_unresolved(&mut self, port_id: &str, reference: &str, template_id: Option<&str>) {
        if self.interface.is_none() {
            return;
        }
        tracing::warn!(
            "[SYNC] Port {} of process {} has no definition for '{}'",
            port_id,
            self.process_id,
            reference
        );
        self.issues.push(SyncIssue::UnresolvedPortDefinition {
            process_id: self.process_id.to_string(),
            port_id: port_id.to_string(),
            reference: reference.to_string(),
            template_id: template_id.map(str::to_string),
        });
    }
}

/// Ordering hints shared by both process port kinds
pub trait ProcessPort {
    fn index(&self) -> Option<i64>;

    fn is_templated(&self) -> bool;

    fn metadata(&self) -> Option<&Value>;

    /// Vertical canvas position, used to order ports of nested graph models
    fn y_position(&self) -> Option<f64> {
        self.metadata()?.get("y")?.as_f64()
    }
}

#[derive(Debug, Clone)]
pub struct ProcessInport {
    instance: InstanceId,
    pub id: String,
    pub process_id: String,
    pub reference: String,
    pub template_id: Option<String>,
    pub template_group_id: Option<String>,
    pub raw_index: Option<i64>,
    pub raw_metadata: Option<Value>,
    pub param: Option<Value>,
    pub config: Option<Value>,
    /// Resolved from the interface description, `None` when incomplete
    pub definition: Option<InportDefinition>,
}

impl ProcessInport {
    pub fn new(id: &str, raw: &RawProcessPort, ctx: &mut PortContext<'_>) -> Result<Self> {
        let mut port = Self {
            instance: InstanceId::next(),
            id: String::new(),
            process_id: String::new(),
            reference: String::new(),
            template_id: None,
            template_group_id: None,
            raw_index: None,
            raw_metadata: None,
            param: None,
            config: None,
            definition: None,
        };
        port.update(id, raw, ctx)?;
        Ok(port)
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn is_resolved(&self) -> bool {
        self.definition.is_some()
    }

    pub fn name(&self) -> &str {
        self.definition.as_ref().map_or("", |def| def.name.as_str())
    }

    pub fn description(&self) -> Option<&str> {
        self.definition.as_ref()?.description.as_deref()
    }

    pub fn required_types(&self) -> &[ParamType] {
        self.definition.as_ref().map(|def| def.required_types.as_slice()).unwrap_or_default()
    }

    pub fn desired_units(&self) -> &[String] {
        self.definition.as_ref().map(|def| def.desired_units.as_slice()).unwrap_or_default()
    }

    pub fn generates_response(&self) -> Option<GeneratesResponse> {
        self.definition.as_ref()?.generates_response
    }

    pub fn default_param(&self) -> Option<&Value> {
        self.definition.as_ref()?.default_param.as_ref()
    }

    pub fn config_type(&self) -> Option<ConfigType> {
        self.definition.as_ref()?.config_type
    }
}

impl<'a> Reconcile<PortContext<'a>> for ProcessInport {
    type Raw = RawProcessPort;

    fn sync_id(&self) -> &str {
        &self.id
    }

    fn update(&mut self, id: &str, raw: &RawProcessPort, ctx: &mut PortContext<'a>) -> Result<()> {
        self.id = id.to_string();
        self.process_id = ctx.process_id.to_string();
        self.reference = raw.reference.clone();
        self.template_id = raw.template_id.clone();
        self.template_group_id = raw.template_group_id.clone();
        self.raw_index = raw.index;
        self.raw_metadata = raw.metadata.clone();
        self.param = raw.param.clone();
        self.config = raw.config.clone();

        self.definition = ctx
            .interface
            .and_then(|pid| pid.inport_definition(&self.reference, self.template_id.as_deref()))
            .cloned();
        if self.definition.is_none() {
            ctx.report_unresolved(id, &raw.reference, raw.template_id.as_deref());
        }
        Ok(())
    }
}

impl Endpoint for ProcessInport {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> PortKind {
        PortKind::ProcessInport
    }

    fn has_param(&self) -> bool {
        self.param.is_some()
    }
}

impl ProcessPort for ProcessInport {
    // definition fields take precedence over the raw entry
    fn index(&self) -> Option<i64> {
        self.definition.as_ref().and_then(|def| def.index).or(self.raw_index)
    }

    fn is_templated(&self) -> bool {
        self.template_id.is_some()
    }

    fn metadata(&self) -> Option<&Value> {
        self.definition
            .as_ref()
            .and_then(|def| def.metadata.as_ref())
            .or(self.raw_metadata.as_ref())
    }
}

#[derive(Debug, Clone)]
pub struct ProcessOutport {
    instance: InstanceId,
    pub id: String,
    pub process_id: String,
    pub reference: String,
    pub template_id: Option<String>,
    pub template_group_id: Option<String>,
    pub raw_index: Option<i64>,
    pub raw_metadata: Option<Value>,
    pub config: Option<Value>,
    /// Resolved from the interface description, `None` when incomplete
    pub definition: Option<OutportDefinition>,
}

impl ProcessOutport {
    pub fn new(id: &str, raw: &RawProcessPort, ctx: &mut PortContext<'_>) -> Result<Self> {
        let mut port = Self {
            instance: InstanceId::next(),
            id: String::new(),
            process_id: String::new(),
            reference: String::new(),
            template_id: None,
            template_group_id: None,
            raw_index: None,
            raw_metadata: None,
            config: None,
            definition: None,
        };
        port.update(id, raw, ctx)?;
        Ok(port)
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn is_resolved(&self) -> bool {
        self.definition.is_some()
    }

    pub fn name(&self) -> &str {
        self.definition.as_ref().map_or("", |def| def.name.as_str())
    }

    pub fn description(&self) -> Option<&str> {
        self.definition.as_ref()?.description.as_deref()
    }

    pub fn types(&self) -> &[ParamType] {
        self.definition.as_ref().map(|def| def.types.as_slice()).unwrap_or_default()
    }

    pub fn unit(&self) -> Option<&str> {
        self.definition.as_ref()?.unit.as_deref()
    }

    pub fn config_type(&self) -> Option<ConfigType> {
        self.definition.as_ref()?.config_type
    }
}

impl<'a> Reconcile<PortContext<'a>> for ProcessOutport {
    type Raw = RawProcessPort;

    fn sync_id(&self) -> &str {
        &self.id
    }

    fn update(&mut self, id: &str, raw: &RawProcessPort, ctx: &mut PortContext<'a>) -> Result<()> {
        self.id = id.to_string();
        self.process_id = ctx.process_id.to_string();
        self.reference = raw.reference.clone();
        self.template_id = raw.template_id.clone();
        self.template_group_id = raw.template_group_id.clone();
        self.raw_index = raw.index;
        self.raw_metadata = raw.metadata.clone();
        self.config = raw.config.clone();

        self.definition = ctx
            .interface
            .and_then(|pid| pid.outport_definition(&self.reference, self.template_id.as_deref()))
            .cloned();
        if self.definition.is_none() {
            ctx.report_unresolved(id, &raw.reference, raw.template_id.as_deref());
        }
        Ok(())
    }
}

impl Endpoint for ProcessOutport {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> PortKind {
        PortKind::ProcessOutport
    }
}

impl ProcessPort for ProcessOutport {
    fn index(&self) -> Option<i64> {
        self.definition.as_ref().and_then(|def| def.index).or(self.raw_index)
    }

    fn is_templated(&self) -> bool {
        self.template_id.is_some()
    }

    fn metadata(&self) -> Option<&Value> {
        self.definition
            .as_ref()
            .and_then(|def| def.metadata.as_ref())
            .or(self.raw_metadata.as_ref())
    }
}

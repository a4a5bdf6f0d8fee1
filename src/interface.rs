//! # Interface Descriptions
//!
//! Externally owned descriptions of what a process exposes: its static
//! inports/outports and the port templates it can fan out. Processes only
//! carry a `ref`; an [`InterfaceProvider`] turns that into a description.

use crate::document::{null_as_default, GraphModelNode, ProcessType, RawMap, RawProcess, TrackingMode};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParamType {
    Number,
    String,
    Boolean,
    Breakdown,
    Date,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigType {
    Number,
    String,
    Boolean,
    Date,
}

/// Whether an inport produces a response value during simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeneratesResponse {
    Always,
    Never,
    Passthrough,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InportDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_type: Option<ConfigType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub required_types: Vec<ParamType>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub desired_units: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generates_response: Option<GeneratesResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_param: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutportDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_type: Option<ConfigType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    /// Empty when the produced type is not known up front
    #[serde(default, deserialize_with = "null_as_default")]
    pub types: Vec<ParamType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Ports of a template are always instantiated together
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortTemplateDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub inport_templates: RawMap<InportDefinition>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub outport_templates: RawMap<OutportDefinition>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceDescription {
    #[serde(default)]
    pub object_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<ProcessType>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub inports: RawMap<InportDefinition>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub outports: RawMap<OutportDefinition>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub port_templates: RawMap<PortTemplateDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visualization_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_nr: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl InterfaceDescription {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Describe a graph model so it can be embedded as a process elsewhere
    ///
    /// The model's own inports and outports become the static ports. Nested
    /// models never expose port templates.
    pub fn from_graph_model(node: &GraphModelNode) -> Self {
        Self {
            object_id: node.id.clone(),
            implementation: Some(ProcessType::GraphModel),
            name: node.name.clone(),
            description: node.description.clone(),
            inports: node.content.inports.clone().unwrap_or_default(),
            outports: node.content.outports.clone().unwrap_or_default(),
            port_templates: RawMap::new(),
            visualization_hint: None,
            version_id: node.version.map(|v| v.to_string()),
            release_nr: node.release_nr,
            parent_id: node.parent_id.clone(),
        }
    }

    /// Resolve an inport definition, directly or through its template
    pub fn inport_definition(&self, reference: &str, template_id: Option<&str>) -> Option<&InportDefinition> {
        self.inports.get(reference).or_else(|| {
            template_id
                .and_then(|id| self.port_templates.get(id))
                .and_then(|template| template.inport_templates.get(reference))
        })
    }

    /// Resolve an outport definition, directly or through its template
    pub fn outport_definition(&self, reference: &str, template_id: Option<&str>) -> Option<&OutportDefinition> {
        self.outports.get(reference).or_else(|| {
            template_id
                .and_then(|id| self.port_templates.get(id))
                .and_then(|template| template.outport_templates.get(reference))
        })
    }
}

/// Looks up the interface description a raw process refers to
pub trait InterfaceProvider {
    fn interface_for(&self, process: &RawProcess) -> Option<&InterfaceDescription>;
}

impl InterfaceProvider for HashMap<String, InterfaceDescription> {
    fn interface_for(&self, process: &RawProcess) -> Option<&InterfaceDescription> {
        self.get(&process.reference)
    }
}

impl InterfaceProvider for BTreeMap<String, InterfaceDescription> {
    fn interface_for(&self, process: &RawProcess) -> Option<&InterfaceDescription> {
        self.get(&process.reference)
    }
}

impl<T: InterfaceProvider + ?Sized> InterfaceProvider for &T {
    fn interface_for(&self, process: &RawProcess) -> Option<&InterfaceDescription> {
        (**self).interface_for(process)
    }
}

/// Interface descriptions keyed by dependency id (`ref` or `ref@rN`)
#[derive(Debug, Clone, Default)]
pub struct InterfaceRepository {
    descriptions: HashMap<String, InterfaceDescription>,
}

impl InterfaceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Combine released and working-copy descriptions
    ///
    /// Latest releases win; a current version is only added when no release
    /// with the same object id exists.
    pub fn merge_latest_and_current(
        latest_releases: impl IntoIterator<Item = InterfaceDescription>,
        current_versions: impl IntoIterator<Item = InterfaceDescription>,
    ) -> Self {
        let mut repository = Self::new();
        for description in latest_releases {
            repository.insert(description);
        }
        for description in current_versions {
            if !repository.descriptions.contains_key(&description.object_id) {
                repository.insert(description);
            }
        }
        repository
    }

    /// Register a description under its object id
    pub fn insert(&mut self, description: InterfaceDescription) -> Option<InterfaceDescription> {
        self.descriptions.insert(description.object_id.clone(), description)
    }

    /// Register a specific release under `objectId@rN`
    pub fn insert_release(&mut self, release_nr: u64, description: InterfaceDescription) -> Option<InterfaceDescription> {
        let key = format!("{}@r{}", description.object_id, release_nr);
        self.descriptions.insert(key, description)
    }

    pub fn get(&self, dependency_id: &str) -> Option<&InterfaceDescription> {
        self.descriptions.get(dependency_id)
    }

    pub fn len(&self) -> usize {
        self.descriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }
}

impl InterfaceProvider for InterfaceRepository {
    fn interface_for(&self, process: &RawProcess) -> Option<&InterfaceDescription> {
        if process.tracking == Some(TrackingMode::Fixed) {
            if let Some(pinned) = self.get(&process.dependency_id()) {
                return Some(pinned);
            }
        }
        self.get(&process.reference)
    }
}

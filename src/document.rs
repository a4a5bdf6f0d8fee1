//! # Raw Document
//!
//! Loosely-typed, id-keyed shapes of a persisted graph model, exactly as the
//! storage layer hands them over. Nothing here holds references between
//! entities; ids are the only links.

use crate::error::Result;
use crate::interface::{InportDefinition, OutportDefinition};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Id-keyed raw collection
pub type RawMap<T> = BTreeMap<String, T>;

/// Reads an explicit `null` the same as a missing field
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Graph-model inports are authored with their full definition
pub type RawInport = InportDefinition;

/// Graph-model outports are authored with their full definition
pub type RawOutport = OutportDefinition;

/// Implementation kind behind a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessType {
    ProcessingElement,
    GraphModel,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ProcessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessType::ProcessingElement => "PROCESSING_ELEMENT",
            ProcessType::GraphModel => "GRAPH_MODEL",
            ProcessType::Unknown => "UNKNOWN",
        }
    }
}

/// How a process follows releases of the description it references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackingMode {
    Fixed,
    LatestRelease,
    CurrentVersion,
}

/// Which end of a connection a port or variable reference sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortRole {
    Source,
    Destination,
}

/// A process port entry: points at a definition in the process's interface
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProcessPort {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(rename = "ref", default, deserialize_with = "null_as_default")]
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

impl RawProcessPort {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProcess {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: ProcessType,
    #[serde(rename = "ref", default, deserialize_with = "null_as_default")]
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub inports: RawMap<RawProcessPort>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub outports: RawMap<RawProcessPort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking: Option<TrackingMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_nr: Option<u64>,
}

impl RawProcess {
    /// Dependency key: `ref@rN` when pinned to a release, plain `ref` otherwise
    pub fn dependency_id(&self) -> String {
        match (self.tracking, self.release_nr) {
            (Some(TrackingMode::Fixed), Some(release)) if release > 0 => {
                format!("{}@r{}", self.reference, release)
            }
            _ => self.reference.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConnection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl RawConnection {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            ..Default::default()
        }
    }

    pub fn touches(&self, port_id: &str) -> bool {
        self.source == port_id || self.destination == port_id
    }

    /// Variable reference this connection starts from, if any
    pub fn reference_source(&self) -> Option<&str> {
        self.metadata_str("referenceSource")
    }

    /// Variable reference this connection ends at, if any
    pub fn reference_destination(&self) -> Option<&str> {
        self.metadata_str("referenceDestination")
    }

    pub fn touches_variable_reference(&self) -> bool {
        self.reference_source().is_some() || self.reference_destination().is_some()
    }

    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key)?.as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableKind {
    #[serde(rename = "NAMED_VARIABLE")]
    Named,
    #[serde(rename = "BROADCAST_VARIABLE")]
    Broadcast,
}

/// Canvas placement
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVariableReference {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_type: Option<PortRole>,
    #[serde(default)]
    pub metadata: Position,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawVariableMetadata {
    #[serde(default, deserialize_with = "null_as_default")]
    pub references: Vec<RawVariableReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVariable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    pub object_type: VariableKind,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: RawVariableMetadata,
}

/// Content of a persisted graph model
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphModelContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default)]
    pub inports: Option<RawMap<RawInport>>,
    #[serde(default)]
    pub outports: Option<RawMap<RawOutport>>,
    #[serde(default)]
    pub processes: Option<RawMap<RawProcess>>,
    #[serde(default)]
    pub connections: Option<RawMap<RawConnection>>,
    #[serde(default)]
    pub variables: Option<RawMap<RawVariable>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A graph model as stored in the library tree
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphModelNode {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_nr: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: GraphModelContent,
}

impl GraphModelNode {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_persisted_document() {
        let node: GraphModelNode = serde_json::from_value(json!({
            "id": "gm-1",
            "name": "Capacity",
            "content": {
                "inports": { "in-1": { "name": "demand", "requiredTypes": ["NUMBER"], "desiredUnits": [], "generatesResponse": "ALWAYS" } },
                "processes": {
                    "p-1": {
                        "type": "PROCESSING_ELEMENT",
                        "ref": "sum",
                        "inports": { "pi-1": { "ref": "a", "index": 0 } },
                        "outports": {}
                    }
                },
                "connections": { "c-1": { "source": "in-1", "destination": "pi-1" } }
            }
        }))
        .unwrap();

        assert_eq!(node.content.inports.as_ref().unwrap().len(), 1);
        assert!(node.content.outports.is_none());
        let process = &node.content.processes.as_ref().unwrap()["p-1"];
        assert_eq!(process.kind, ProcessType::ProcessingElement);
        assert_eq!(process.inports["pi-1"].reference, "a");
    }

    #[test]
    fn null_nested_collections_read_as_empty() {
        let node = GraphModelNode::from_json(
            r#"{
                "id": "gm",
                "content": {
                    "processes": {
                        "p-1": { "type": "PROCESSING_ELEMENT", "ref": "pe", "inports": null, "outports": null }
                    },
                    "variables": {
                        "v-1": { "objectType": "NAMED_VARIABLE", "metadata": { "references": null } },
                        "v-2": { "objectType": "BROADCAST_VARIABLE", "metadata": null }
                    }
                }
            }"#,
        )
        .unwrap();

        let process = &node.content.processes.as_ref().unwrap()["p-1"];
        assert!(process.inports.is_empty());
        assert!(process.outports.is_empty());
        let variables = node.content.variables.as_ref().unwrap();
        assert!(variables["v-1"].metadata.references.is_empty());
        assert!(variables["v-2"].metadata.references.is_empty());

        let empty = GraphModelNode::from_json(r#"{ "id": "gm", "content": null }"#).unwrap();
        assert!(empty.content.processes.is_none());
    }

    #[test]
    fn missing_ends_and_refs_default_to_empty() {
        let node = GraphModelNode::from_json(
            r#"{
                "id": "gm",
                "content": {
                    "processes": { "p-7": { "type": "PROCESSING_ELEMENT", "inports": { "pi-1": {} } } },
                    "connections": { "c-1": { "source": "pi-1" } }
                }
            }"#,
        )
        .unwrap();

        let process = &node.content.processes.as_ref().unwrap()["p-7"];
        assert_eq!(process.reference, "");
        assert_eq!(process.inports["pi-1"].reference, "");
        let connection = &node.content.connections.as_ref().unwrap()["c-1"];
        assert_eq!(connection.source, "pi-1");
        assert_eq!(connection.destination, "");
    }

    #[test]
    fn unknown_process_type_is_kept_as_unknown() {
        let process: RawProcess = serde_json::from_value(json!({ "type": "SCRIPT", "ref": "x" })).unwrap();
        assert_eq!(process.kind, ProcessType::Unknown);

        let untyped: RawProcess = serde_json::from_value(json!({ "ref": "x" })).unwrap();
        assert_eq!(untyped.kind, ProcessType::Unknown);
    }

    #[test]
    fn dependency_id_pins_fixed_releases() {
        let mut process = RawProcess {
            reference: "pe-sum".to_string(),
            ..Default::default()
        };
        assert_eq!(process.dependency_id(), "pe-sum");

        process.tracking = Some(TrackingMode::Fixed);
        process.release_nr = Some(3);
        assert_eq!(process.dependency_id(), "pe-sum@r3");

        process.tracking = Some(TrackingMode::LatestRelease);
        assert_eq!(process.dependency_id(), "pe-sum");
    }

    #[test]
    fn connection_reference_metadata() {
        let mut connection = RawConnection::new("var-1", "pi-1");
        assert!(!connection.touches_variable_reference());

        connection.metadata = Some(json!({ "referenceSource": "ref-1" }));
        assert_eq!(connection.reference_source(), Some("ref-1"));
        assert_eq!(connection.reference_destination(), None);
        assert!(connection.touches_variable_reference());
    }
}

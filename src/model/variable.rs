//! # Variables
//!
//! Graph-level data nodes. A variable is placed on the canvas any number of
//! times; each placement is a [`VariableReference`] owned by the variable.

use crate::document::{PortRole, Position, RawVariable, RawVariableReference, VariableKind};
use crate::error::Result;
use crate::reconcile::{InstanceId, Reconcile, SyncStats};

/// One canvas placement of a variable
#[derive(Debug, Clone)]
pub struct VariableReference {
    instance: InstanceId,
    pub id: String,
    /// Owning variable, by id
    pub variable_id: String,
    pub port_id: Option<String>,
    pub port_type: Option<PortRole>,
    pub position: Position,
}

impl VariableReference {
    fn new(raw: &RawVariableReference, variable_id: &str) -> Self {
        let mut reference = Self {
            instance: InstanceId::next(),
            id: String::new(),
            variable_id: String::new(),
            port_id: None,
            port_type: None,
            position: Position::default(),
        };
        reference.update(raw, variable_id);
        reference
    }

    fn update(&mut self, raw: &RawVariableReference, variable_id: &str) {
        self.id = raw.id.clone();
        self.variable_id = variable_id.to_string();
        self.port_id = raw.port_id.clone();
        self.port_type = raw.port_type;
        self.position = raw.metadata;
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }
}

#[derive(Debug, Clone)]
pub struct Variable {
    instance: InstanceId,
    pub id: String,
    pub object_id: Option<String>,
    pub kind: VariableKind,
    pub label: String,
    pub value_type: Option<String>,
    pub references: Vec<VariableReference>,
}

impl Variable {
    /// `stats` accumulates reference churn
    pub fn new(id: &str, raw: &RawVariable, stats: &mut SyncStats) -> Result<Self> {
        let mut variable = Self {
            instance: InstanceId::next(),
            id: String::new(),
            object_id: None,
            kind: raw.object_type,
            label: String::new(),
            value_type: None,
            references: Vec::new(),
        };
        variable.update(id, raw, stats)?;
        Ok(variable)
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn is_broadcast(&self) -> bool {
        self.kind == VariableKind::Broadcast
    }

    pub fn is_named(&self) -> bool {
        self.kind == VariableKind::Named
    }

    pub fn reference(&self, id: &str) -> Option<&VariableReference> {
        self.references.iter().find(|reference| reference.id == id)
    }

    fn synchronize_references(&mut self, raw: &[RawVariableReference]) -> SyncStats {
        let mut stats = SyncStats::default();

        for item in raw {
            match self.references.iter_mut().find(|existing| existing.id == item.id) {
                Some(existing) => {
                    existing.update(item, &self.id);
                    stats.updated += 1;
                }
                None => {
                    self.references.push(VariableReference::new(item, &self.id));
                    stats.added += 1;
                }
            }
        }

        let before = self.references.len();
        self.references
            .retain(|existing| raw.iter().any(|item| item.id == existing.id));
        stats.removed = before - self.references.len();
        stats
    }
}

impl Reconcile<SyncStats> for Variable {
    type Raw = RawVariable;

    fn sync_id(&self) -> &str {
        &self.id
    }

    fn update(&mut self, id: &str, raw: &RawVariable, stats: &mut SyncStats) -> Result<()> {
        self.id = id.to_string();
        self.object_id = raw.object_id.clone();
        self.kind = raw.object_type;
        self.label = raw.label.clone();
        self.value_type = raw.value_type.clone();
        let references = self.synchronize_references(&raw.metadata.references);
        stats.merge(references);
        Ok(())
    }
}

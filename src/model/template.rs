//! # Process Port Templates

use crate::document::RawMap;
use crate::error::Result;
use crate::interface::{InportDefinition, OutportDefinition, PortTemplateDefinition};
use crate::reconcile::{InstanceId, Reconcile};

/// Which port directions a template contributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFlavor {
    Both,
    InOnly,
    OutOnly,
    None,
}

impl TemplateFlavor {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateFlavor::Both => "both",
            TemplateFlavor::InOnly => "in-only",
            TemplateFlavor::OutOnly => "out-only",
            TemplateFlavor::None => "none",
        }
    }
}

/// A named bundle of port definitions a process can instantiate many times
#[derive(Debug, Clone)]
pub struct ProcessPortTemplate {
    instance: InstanceId,
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub inport_templates: RawMap<InportDefinition>,
    pub outport_templates: RawMap<OutportDefinition>,
}

impl ProcessPortTemplate {
    pub fn new(id: &str, raw: &PortTemplateDefinition, ctx: &mut ()) -> Result<Self> {
        let mut template = Self {
            instance: InstanceId::next(),
            id: String::new(),
            name: String::new(),
            description: None,
            inport_templates: RawMap::new(),
            outport_templates: RawMap::new(),
        };
        template.update(id, raw, ctx)?;
        Ok(template)
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn has_inports(&self) -> bool {
        !self.inport_templates.is_empty()
    }

    pub fn has_outports(&self) -> bool {
        !self.outport_templates.is_empty()
    }

    pub fn flavor(&self) -> TemplateFlavor {
        match (self.has_inports(), self.has_outports()) {
            (true, true) => TemplateFlavor::Both,
            (true, false) => TemplateFlavor::InOnly,
            (false, true) => TemplateFlavor::OutOnly,
            (false, false) => TemplateFlavor::None,
        }
    }

    /// Back to the raw definition, e.g. to instantiate it on a process
    pub fn to_definition(&self) -> PortTemplateDefinition {
        PortTemplateDefinition {
            object_id: Some(self.id.clone()),
            name: self.name.clone(),
            description: self.description.clone(),
            inport_templates: self.inport_templates.clone(),
            outport_templates: self.outport_templates.clone(),
        }
    }
}

impl Reconcile<()> for ProcessPortTemplate {
    type Raw = PortTemplateDefinition;

    fn sync_id(&self) -> &str {
        &self.id
    }

    fn update(&mut self, id: &str, raw: &PortTemplateDefinition, _ctx: &mut ()) -> Result<()> {
        self.id = id.to_string();
        self.name = raw.name.clone();
        self.description = raw.description.clone();
        self.inport_templates = raw.inport_templates.clone();
        self.outport_templates = raw.outport_templates.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(inports: &[&str], outports: &[&str]) -> ProcessPortTemplate {
        let raw = PortTemplateDefinition {
            name: "Group".to_string(),
            inport_templates: inports
                .iter()
                .map(|id| (id.to_string(), InportDefinition::default()))
                .collect(),
            outport_templates: outports
                .iter()
                .map(|id| (id.to_string(), OutportDefinition::default()))
                .collect(),
            ..Default::default()
        };
        ProcessPortTemplate::new("t", &raw, &mut ()).unwrap()
    }

    #[test]
    fn flavor_reflects_contributed_directions() {
        assert_eq!(template(&["a"], &["b"]).flavor(), TemplateFlavor::Both);
        assert_eq!(template(&["a"], &[]).flavor(), TemplateFlavor::InOnly);
        assert_eq!(template(&[], &["b"]).flavor(), TemplateFlavor::OutOnly);
        assert_eq!(template(&[], &[]).flavor().as_str(), "none");
    }

    #[test]
    fn to_definition_keeps_ports() {
        let definition = template(&["a", "b"], &["c"]).to_definition();
        assert_eq!(definition.object_id.as_deref(), Some("t"));
        assert_eq!(definition.inport_templates.len(), 2);
        assert_eq!(definition.outport_templates.len(), 1);
    }
}

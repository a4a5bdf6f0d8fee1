//! # Reconcile Options

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Knobs for how a graph model is reconciled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReconcileOptions {
    /// Fail the update when a process reference has no interface description
    /// instead of recording an issue
    pub strict_interfaces: bool,
    /// Apply the cosmetic per-variant port ordering after each process update
    pub order_ports: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            strict_interfaces: false,
            order_ports: true,
        }
    }
}

impl ReconcileOptions {
    pub fn strict() -> Self {
        Self {
            strict_interfaces: true,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

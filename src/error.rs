//! # Errors
//!
//! Model-wide failures are returned as [`GraphModelError`]. Per-entity data
//! problems never abort a reconcile pass; they are collected as
//! [`SyncIssue`]s on the returned report instead.

use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by reconciliation and document parsing
#[derive(Debug, Error)]
pub enum GraphModelError {
    #[error("Process '{process_id}' references unknown interface description '{reference}'")]
    UnresolvedProcessReference {
        process_id: String,
        reference: String,
    },

    #[error("Process '{process_id}' has unsupported type '{kind}'")]
    UntypedProcess {
        process_id: String,
        kind: String,
    },

    #[error("Malformed document: {0}")]
    Document(#[from] serde_json::Error),
}

/// Recoverable condition found while reconciling a single entity
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncIssue {
    #[error("Process '{process_id}' references unknown interface description '{reference}'")]
    UnresolvedProcessReference {
        process_id: String,
        reference: String,
    },

    #[error("Port '{port_id}' of process '{process_id}' has no definition for '{reference}'")]
    UnresolvedPortDefinition {
        process_id: String,
        port_id: String,
        reference: String,
        template_id: Option<String>,
    },
}

impl SyncIssue {
    /// Id of the entity the issue is attributed to
    pub fn entity_id(&self) -> &str {
        match self {
            SyncIssue::UnresolvedProcessReference { process_id, .. } => process_id,
            SyncIssue::UnresolvedPortDefinition { port_id, .. } => port_id,
        }
    }
}

pub type Result<T> = std::result::Result<T, GraphModelError>;

//! # Synchronisation Entry Points
//!
//! Building a live graph from a stored document, and bringing an existing
//! one up to date after the document or its interface descriptions changed.

use crate::config::ReconcileOptions;
use crate::document::GraphModelNode;
use crate::error::Result;
use crate::interface::InterfaceProvider;
use crate::model::{GraphModel, SyncReport};
use crate::repair::synchronize_document;

/// Outcome of [`refresh_graph_model`]
#[derive(Debug, Clone)]
pub struct Refresh {
    /// The raw document was repaired and should be saved back
    pub document_changed: bool,
    pub report: SyncReport,
}

/// Build the live graph for `node` with default options
///
/// # Examples
///
/// ```rust,no_run
/// use gmre::{load_graph_model, GraphModelNode, InterfaceRepository};
///
/// let node = GraphModelNode::from_json(r#"{ "id": "gm", "name": "Model" }"#)?;
/// let model = load_graph_model(&node, &InterfaceRepository::new())?;
/// assert!(model.processes().is_empty());
/// # Ok::<(), gmre::GraphModelError>(())
/// ```
pub fn load_graph_model<P: InterfaceProvider>(node: &GraphModelNode, provider: &P) -> Result<GraphModel> {
    load_graph_model_with_options(node, provider, ReconcileOptions::default())
}

/// Build the live graph for `node` with explicit options
///
/// Per-entity problems such as unresolved references are collected on
/// [`GraphModel::last_report`] and logged as one warning. Only structural
/// problems fail the load.
///
/// # Arguments
///
/// * `node` - The stored graph model document
/// * `provider` - Source of interface descriptions for the model's processes
/// * `options` - Strictness and port ordering settings
///
/// # Returns
///
/// * `Ok(GraphModel)` - The reconciled live graph
/// * `Err(GraphModelError)` - An untyped process, or an unresolved reference in strict mode
pub fn load_graph_model_with_options<P: InterfaceProvider>(
    node: &GraphModelNode,
    provider: &P,
    options: ReconcileOptions,
) -> Result<GraphModel> {
    tracing::info!("[GMRE] Loading graph model {} ({})", node.id, node.name);
    let model = GraphModel::new(node, provider, options)?;
    let issues = &model.last_report().issues;
    if !issues.is_empty() {
        tracing::warn!("[GMRE] Graph model {} loaded with {} issues", model.id, issues.len());
    }
    Ok(model)
}

/// Parse a stored document and build its live graph
pub fn load_graph_model_from_json<P: InterfaceProvider>(
    json: &str,
    provider: &P,
    options: ReconcileOptions,
) -> Result<GraphModel> {
    let node = GraphModelNode::from_json(json)?;
    load_graph_model_with_options(&node, provider, options)
}

/// Repair `node` against current interface descriptions, then update `model`
///
/// Port entries are added or dropped to match each process's description
/// and orphan connections are pruned before the live graph is reconciled,
/// so the update only ever sees consistent ids.
///
/// # Arguments
///
/// * `model` - The live graph previously built from `node`
/// * `node` - The stored document, repaired in place
/// * `provider` - Source of current interface descriptions
///
/// # Returns
///
/// * `Ok(Refresh)` - Whether `node` should be saved back, plus the update report
/// * `Err(GraphModelError)` - The update failed and `model` should be reloaded
pub fn refresh_graph_model<P: InterfaceProvider>(
    model: &mut GraphModel,
    node: &mut GraphModelNode,
    provider: &P,
) -> Result<Refresh> {
    tracing::info!("[GMRE] Phase 1: Repairing document {}", node.id);
    let document_changed = synchronize_document(&mut node.content, provider);

    tracing::info!("[GMRE] Phase 2: Reconciling live graph");
    let report = model.update(node, provider)?;

    Ok(Refresh {
        document_changed,
        report,
    })
}

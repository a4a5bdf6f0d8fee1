//! # Graph Model Reconciliation Engine (GMRE)
//!
//! Keeps a long-lived, queryable graph of capacity-planning entities in step
//! with a persisted, id-keyed graph model document.
//!
//! Every time the stored document changes, GMRE diffs it against the live
//! graph:
//! - entities whose id is still present are updated in place and keep their
//!   identity
//! - new ids are constructed, vanished ids are dropped
//! - process ports are re-resolved against the interface description their
//!   process references
//!
//! On top of the live graph it answers editor questions: lookup by id,
//! connection validity (self-loops, duplicates, direction, cycles) and port
//! maps grouped by role.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gmre::{load_graph_model, GraphModelNode, InterfaceRepository};
//!
//! let node = GraphModelNode::from_json(&std::fs::read_to_string("model.json")?)?;
//! let interfaces = InterfaceRepository::new();
//!
//! let mut model = load_graph_model(&node, &interfaces)?;
//! if !model.validate_connection("po-1", "pi-2").is_valid() {
//!     eprintln!("rejected");
//! }
//! let report = model.update(&node, &interfaces)?;
//! assert!(report.is_unchanged());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! 1. **Raw document** ([`document`]) - serde shapes of the stored JSON
//! 2. **Interface descriptions** ([`interface`]) - what each process exposes
//! 3. **Diff reconciler** ([`reconcile`]) - id-stable collection sync
//! 4. **Live graph** ([`model`]) - ports, processes, connections, variables
//! 5. **Document repair** ([`repair`]) - raw edits and cascading deletes

pub mod config;
pub mod document;
pub mod error;
pub mod interface;
pub mod model;
pub mod reconcile;
pub mod repair;
pub mod sync;

// Re-export the main synchronisation API
pub use sync::{
    load_graph_model,
    load_graph_model_from_json,
    load_graph_model_with_options,
    refresh_graph_model,
    Refresh,
};

pub use config::ReconcileOptions;
pub use document::{GraphModelContent, GraphModelNode, RawProcess};
pub use error::{GraphModelError, Result, SyncIssue};
pub use interface::{InterfaceDescription, InterfaceProvider, InterfaceRepository};
pub use model::{ConnectionValidity, GraphModel, Node, SyncReport};
pub use reconcile::{InstanceId, SyncStats};

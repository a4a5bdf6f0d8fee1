//! # Live Graph Model
//!
//! Long-lived entity instances reconciled from the raw document.

pub mod connection;
pub mod graph;
pub mod port;
pub mod process;
pub mod template;
pub mod variable;

pub use connection::{Connection, ConnectionValidity, CyclePath};
pub use graph::{GraphModel, Node, PortHandle, PortMap, SyncReport};
pub use port::{Endpoint, Inport, Outport, PortKind, ProcessInport, ProcessOutport, ProcessPort};
pub use process::{order_by_index, order_by_position, Process, ProcessVariant};
pub use template::{ProcessPortTemplate, TemplateFlavor};
pub use variable::{Variable, VariableReference};

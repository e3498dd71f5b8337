// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph model for the scriptgraph editor.
//!
//! This crate holds the logical side of a visual script:
//! - Nodes with typed input/output ports, stacks and variable references
//! - Connections (edges) between an output and an input port
//! - Decorations (placemats, sticky notes) and variable declarations
//! - A per-pass [`ChangeList`] recording what changed
//!
//! ## Architecture
//!
//! Every element is stored in an insertion-ordered arena keyed by a UUID
//! newtype. Nothing outside the graph holds references into it; the editor
//! looks elements up by [`ElementId`] each time it needs them.

pub mod node;
pub mod port;
pub mod connection;
pub mod decoration;
pub mod variable;
pub mod element;
pub mod change_list;
pub mod graph;
pub mod gameplay;

pub use node::{Node, NodeId, NodeKind, NodeRegistry, NodeType};
pub use port::{Port, PortCapability, PortDirection, PortId, PortType};
pub use connection::{Connection, ConnectionId};
pub use decoration::{Placemat, PlacematId, StickyNote, StickyNoteId};
pub use variable::{VariableDeclaration, VariableId, VariableOwner};
pub use element::ElementId;
pub use change_list::ChangeList;
pub use graph::{ConnectionError, Graph, GraphId, StackError};

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Identifiers spanning every kind of graph element.

use crate::connection::ConnectionId;
use crate::decoration::{PlacematId, StickyNoteId};
use crate::node::NodeId;
use crate::variable::VariableId;
use serde::{Deserialize, Serialize};

/// Any element of a graph, by kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementId {
    /// A node (including stacks)
    Node(NodeId),
    /// An edge
    Connection(ConnectionId),
    /// A placemat
    Placemat(PlacematId),
    /// A sticky note
    StickyNote(StickyNoteId),
    /// A variable declaration
    Variable(VariableId),
}

impl ElementId {
    /// The node ID, if this is a node
    pub fn as_node(self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(id),
            _ => None,
        }
    }

    /// The connection ID, if this is an edge
    pub fn as_connection(self) -> Option<ConnectionId> {
        match self {
            Self::Connection(id) => Some(id),
            _ => None,
        }
    }

    /// Whether this element is a decoration
    pub fn is_decoration(self) -> bool {
        matches!(self, Self::Placemat(_) | Self::StickyNote(_))
    }
}

impl From<NodeId> for ElementId {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl From<ConnectionId> for ElementId {
    fn from(id: ConnectionId) -> Self {
        Self::Connection(id)
    }
}

impl From<PlacematId> for ElementId {
    fn from(id: PlacematId) -> Self {
        Self::Placemat(id)
    }
}

impl From<StickyNoteId> for ElementId {
    fn from(id: StickyNoteId) -> Self {
        Self::StickyNote(id)
    }
}

impl From<VariableId> for ElementId {
    fn from(id: VariableId) -> Self {
        Self::Variable(id)
    }
}

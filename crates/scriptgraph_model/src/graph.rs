// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes, connections and decorations.
//!
//! Every mutation is recorded in a pending [`ChangeList`] which the editor
//! drains once per reconciliation pass with [`Graph::take_changes`].

use crate::change_list::ChangeList;
use crate::connection::{Connection, ConnectionId};
use crate::decoration::{Placemat, PlacematId, StickyNote, StickyNoteId};
use crate::element::ElementId;
use crate::node::{Node, NodeId, NodeKind};
use crate::port::PortId;
use crate::variable::{VariableDeclaration, VariableId, VariableOwner};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a graph asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphId(pub Uuid);

impl GraphId {
    /// Create a new random graph ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GraphId {
    fn default() -> Self {
        Self::new()
    }
}

/// A visual script graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    /// Asset identity
    pub id: GraphId,
    /// Graph name
    pub name: String,
    /// Nodes in the graph
    nodes: IndexMap<NodeId, Node>,
    /// Connections between nodes
    connections: IndexMap<ConnectionId, Connection>,
    /// Placemats
    placemats: IndexMap<PlacematId, Placemat>,
    /// Sticky notes
    sticky_notes: IndexMap<StickyNoteId, StickyNote>,
    /// Variable declarations
    variables: IndexMap<VariableId, VariableDeclaration>,
    /// Changes since the last `take_changes`
    #[serde(skip)]
    changes: ChangeList,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: GraphId::new(),
            name: name.into(),
            nodes: IndexMap::new(),
            connections: IndexMap::new(),
            placemats: IndexMap::new(),
            sticky_notes: IndexMap::new(),
            variables: IndexMap::new(),
            changes: ChangeList::new(),
        }
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id;
        self.nodes.insert(id, node);
        self.changes.mark_changed(id);
        id
    }

    /// Remove a node and its connections.
    ///
    /// Removing a stack removes its children with it.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let children = self.nodes.get(&node_id)?.stack_children().to_vec();
        for child in children {
            self.remove_node(child);
        }

        self.remove_from_stack(node_id);

        let doomed: Vec<ConnectionId> = self.connections_for_node(node_id).map(|c| c.id).collect();
        for connection_id in doomed {
            self.disconnect(connection_id);
        }

        let mut node = self.nodes.shift_remove(&node_id)?;
        node.destroyed = true;
        self.changes.mark_deleted(node_id);
        Some(node)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID.
    ///
    /// Callers that change anything visible should follow up with [`Graph::touch`].
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Add a connection between ports
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_port: PortId,
        to_node: NodeId,
        to_port: PortId,
    ) -> Result<ConnectionId, ConnectionError> {
        let source_node = self.nodes.get(&from_node)
            .ok_or(ConnectionError::NodeNotFound(from_node))?;
        let target_node = self.nodes.get(&to_node)
            .ok_or(ConnectionError::NodeNotFound(to_node))?;

        let source_port = source_node.port(&from_port)
            .ok_or(ConnectionError::PortNotFound(from_port))?;
        let target_port = target_node.port(&to_port)
            .ok_or(ConnectionError::PortNotFound(to_port))?;

        if source_port.direction != crate::port::PortDirection::Output {
            return Err(ConnectionError::IncompatiblePorts);
        }
        if !source_port.can_connect(target_port) {
            return Err(ConnectionError::IncompatiblePorts);
        }

        if !target_port.multi_connect && self.connections_to(to_port).next().is_some() {
            return Err(ConnectionError::PortAlreadyConnected(to_port));
        }
        if !source_port.multi_connect && self.connections_from(from_port).next().is_some() {
            return Err(ConnectionError::PortAlreadyConnected(from_port));
        }

        if from_node == to_node {
            return Err(ConnectionError::SelfLoop);
        }

        let connection = Connection::new(from_node, from_port, to_node, to_port);
        let id = connection.id;
        self.connections.insert(id, connection);
        self.changes.mark_changed(id);
        Ok(id)
    }

    /// Remove a connection
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Option<Connection> {
        let mut connection = self.connections.shift_remove(&connection_id)?;
        connection.destroyed = true;
        self.changes.mark_deleted(connection_id);
        Some(connection)
    }

    /// Get a connection by ID
    pub fn connection(&self, connection_id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&connection_id)
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Get connections from a specific port
    pub fn connections_from(&self, port_id: PortId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.from_port == port_id)
    }

    /// Get connections to a specific port
    pub fn connections_to(&self, port_id: PortId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.to_port == port_id)
    }

    /// Get connections involving a node
    pub fn connections_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.involves_node(node_id))
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Insert a node into a stack at `index` (clamped to the end).
    ///
    /// A node already living in another stack is moved out of it first.
    pub fn insert_into_stack(
        &mut self,
        stack_id: NodeId,
        node_id: NodeId,
        index: usize,
    ) -> Result<(), StackError> {
        let stack = self.nodes.get(&stack_id).ok_or(StackError::NodeNotFound(stack_id))?;
        if !stack.is_stack() {
            return Err(StackError::NotAStack(stack_id));
        }
        let node = self.nodes.get(&node_id).ok_or(StackError::NodeNotFound(node_id))?;
        if node.is_stack() {
            return Err(StackError::NestedStack(node_id));
        }

        self.remove_from_stack(node_id);

        if let Some(Node { kind: NodeKind::Stack { children }, .. }) = self.nodes.get_mut(&stack_id) {
            let index = index.min(children.len());
            children.insert(index, node_id);
        }
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.stack = Some(stack_id);
        }

        self.changes.mark_changed(stack_id);
        self.changes.mark_changed(node_id);
        Ok(())
    }

    /// Detach a node from its stack. Returns false if it was free-standing.
    pub fn remove_from_stack(&mut self, node_id: NodeId) -> bool {
        let Some(stack_id) = self.nodes.get_mut(&node_id).and_then(|n| n.stack.take()) else {
            return false;
        };

        if let Some(Node { kind: NodeKind::Stack { children }, .. }) = self.nodes.get_mut(&stack_id) {
            children.retain(|c| *c != node_id);
        }

        self.changes.mark_changed(stack_id);
        self.changes.mark_changed(node_id);
        true
    }

    /// Add a placemat
    pub fn add_placemat(&mut self, placemat: Placemat) -> PlacematId {
        let id = placemat.id;
        self.placemats.insert(id, placemat);
        self.changes.mark_changed(id);
        id
    }

    /// Remove a placemat
    pub fn remove_placemat(&mut self, id: PlacematId) -> Option<Placemat> {
        let mut placemat = self.placemats.shift_remove(&id)?;
        placemat.destroyed = true;
        self.changes.mark_deleted(id);
        Some(placemat)
    }

    /// Get a placemat by ID
    pub fn placemat(&self, id: PlacematId) -> Option<&Placemat> {
        self.placemats.get(&id)
    }

    /// Get all placemats
    pub fn placemats(&self) -> impl Iterator<Item = &Placemat> {
        self.placemats.values()
    }

    /// Add a sticky note
    pub fn add_sticky_note(&mut self, note: StickyNote) -> StickyNoteId {
        let id = note.id;
        self.sticky_notes.insert(id, note);
        self.changes.mark_changed(id);
        id
    }

    /// Remove a sticky note
    pub fn remove_sticky_note(&mut self, id: StickyNoteId) -> Option<StickyNote> {
        let mut note = self.sticky_notes.shift_remove(&id)?;
        note.destroyed = true;
        self.changes.mark_deleted(id);
        Some(note)
    }

    /// Get a sticky note by ID
    pub fn sticky_note(&self, id: StickyNoteId) -> Option<&StickyNote> {
        self.sticky_notes.get(&id)
    }

    /// Get all sticky notes
    pub fn sticky_notes(&self) -> impl Iterator<Item = &StickyNote> {
        self.sticky_notes.values()
    }

    /// Declare a variable
    pub fn add_variable(&mut self, declaration: VariableDeclaration) -> VariableId {
        let id = declaration.id;
        if declaration.owner == VariableOwner::Graph {
            self.changes.blackboard_changed = true;
        }
        self.variables.insert(id, declaration);
        self.changes.mark_changed(id);
        id
    }

    /// Remove a declaration; references to it become unresolved
    pub fn remove_variable(&mut self, id: VariableId) -> Option<VariableDeclaration> {
        let declaration = self.variables.shift_remove(&id)?;

        for node in self.nodes.values_mut() {
            if let NodeKind::VariableReference { variable } = &mut node.kind {
                if *variable == Some(id) {
                    *variable = None;
                    self.changes.mark_changed(node.id);
                }
            }
        }

        self.changes.mark_deleted(id);
        Some(declaration)
    }

    /// Get a declaration by ID
    pub fn variable(&self, id: VariableId) -> Option<&VariableDeclaration> {
        self.variables.get(&id)
    }

    /// Get all declarations
    pub fn variables(&self) -> impl Iterator<Item = &VariableDeclaration> {
        self.variables.values()
    }

    /// Whether an element is present and not soft-destroyed
    pub fn is_live(&self, element: ElementId) -> bool {
        match element {
            ElementId::Node(id) => self.nodes.get(&id).is_some_and(|n| !n.destroyed),
            ElementId::Connection(id) => self.connections.get(&id).is_some_and(|c| !c.destroyed),
            ElementId::Placemat(id) => self.placemats.get(&id).is_some_and(|p| !p.destroyed),
            ElementId::StickyNote(id) => self.sticky_notes.get(&id).is_some_and(|s| !s.destroyed),
            ElementId::Variable(id) => self.variables.contains_key(&id),
        }
    }

    /// Position of a positioned element
    pub fn position(&self, element: ElementId) -> Option<[f32; 2]> {
        match element {
            ElementId::Node(id) => self.nodes.get(&id).map(|n| n.position),
            ElementId::Placemat(id) => self.placemats.get(&id).map(|p| p.position),
            ElementId::StickyNote(id) => self.sticky_notes.get(&id).map(|s| s.position),
            ElementId::Connection(_) | ElementId::Variable(_) => None,
        }
    }

    /// Write an element position.
    ///
    /// Not recorded as a change: positions are written back from visuals that
    /// already show them.
    pub fn set_position(&mut self, element: ElementId, position: [f32; 2]) -> bool {
        let slot = match element {
            ElementId::Node(id) => self.nodes.get_mut(&id).map(|n| &mut n.position),
            ElementId::Placemat(id) => self.placemats.get_mut(&id).map(|p| &mut p.position),
            ElementId::StickyNote(id) => self.sticky_notes.get_mut(&id).map(|s| &mut s.position),
            ElementId::Connection(_) | ElementId::Variable(_) => None,
        };
        match slot {
            Some(slot) => {
                *slot = position;
                true
            }
            None => false,
        }
    }

    /// Record a manual modification of an element
    pub fn touch(&mut self, element: impl Into<ElementId>) {
        self.changes.mark_changed(element);
    }

    /// Changes recorded since the last drain
    pub fn changes(&self) -> &ChangeList {
        &self.changes
    }

    /// Drain the recorded changes
    pub fn take_changes(&mut self) -> ChangeList {
        std::mem::take(&mut self.changes)
    }

    /// Serialize to RON
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        ron::ser::to_string_pretty(self, config)
    }

    /// Deserialize from RON
    pub fn from_ron(s: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(s)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Error when creating a connection
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Port not found
    #[error("Port not found: {0:?}")]
    PortNotFound(PortId),

    /// Incompatible port types
    #[error("Incompatible port types")]
    IncompatiblePorts,

    /// Port is already connected
    #[error("Port already connected: {0:?}")]
    PortAlreadyConnected(PortId),

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,
}

/// Error when changing stack membership
#[derive(Debug, thiserror::Error)]
pub enum StackError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Target is not a stack
    #[error("Not a stack: {0:?}")]
    NotAStack(NodeId),

    /// Stacks cannot be stacked
    #[error("Stacks cannot live inside stacks: {0:?}")]
    NestedStack(NodeId),
}

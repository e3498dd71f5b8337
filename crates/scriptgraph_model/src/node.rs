// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph model.

use crate::port::{Port, PortDirection, PortId};
use crate::variable::VariableId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Node type category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Event entry points
    Event,
    /// Flow control and containers
    Flow,
    /// Variable access
    Variable,
    /// Function calls and definitions
    Function,
    /// Utility nodes
    Utility,
}

/// Structural kind of a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Free-standing node
    #[default]
    Regular,
    /// Container owning an ordered list of children
    Stack {
        /// Children in display order
        children: Vec<NodeId>,
    },
    /// Reads a variable declaration; `None` when the declaration is unresolved
    VariableReference {
        /// Referenced declaration
        variable: Option<VariableId>,
    },
    /// Function definition; may own local variable declarations
    Function,
}

/// Node type definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeType {
    /// Unique type identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Category
    pub category: NodeCategory,
    /// Description
    pub description: String,
    /// Structural kind of instances
    pub kind: NodeKind,
    /// Default input ports
    pub inputs: Vec<Port>,
    /// Default output ports
    pub outputs: Vec<Port>,
}

/// A node instance in the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Node type ID
    pub node_type: String,
    /// Display name (can be customized)
    pub name: String,
    /// Position in the graph
    pub position: [f32; 2],
    /// Structural kind
    pub kind: NodeKind,
    /// Containing stack, if this node lives inside one
    pub stack: Option<NodeId>,
    /// Whether the node takes part in execution
    pub enabled: bool,
    /// Soft-delete marker, set before the node leaves the graph
    pub destroyed: bool,
    /// Input ports
    pub inputs: Vec<Port>,
    /// Output ports
    pub outputs: Vec<Port>,
}

impl Node {
    /// Create a new node from a type definition
    pub fn new(node_type: &NodeType) -> Self {
        Self {
            id: NodeId::new(),
            node_type: node_type.id.clone(),
            name: node_type.name.clone(),
            position: [0.0, 0.0],
            kind: node_type.kind.clone(),
            stack: None,
            enabled: true,
            destroyed: false,
            inputs: node_type.inputs.iter().map(Port::instantiate).collect(),
            outputs: node_type.outputs.iter().map(Port::instantiate).collect(),
        }
    }

    /// Create a bare node with the given ports
    pub fn with_ports(name: impl Into<String>, inputs: Vec<Port>, outputs: Vec<Port>) -> Self {
        let name = name.into();
        Self {
            id: NodeId::new(),
            node_type: name.to_lowercase().replace(' ', "_"),
            name,
            position: [0.0, 0.0],
            kind: NodeKind::Regular,
            stack: None,
            enabled: true,
            destroyed: false,
            inputs,
            outputs,
        }
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    /// Set the kind
    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Get an input port by index
    pub fn input(&self, index: usize) -> Option<&Port> {
        self.inputs.get(index)
    }

    /// Get an output port by index
    pub fn output(&self, index: usize) -> Option<&Port> {
        self.outputs.get(index)
    }

    /// Get a port by ID
    pub fn port(&self, port_id: &PortId) -> Option<&Port> {
        self.inputs.iter().find(|p| p.id == *port_id)
            .or_else(|| self.outputs.iter().find(|p| p.id == *port_id))
    }

    /// Get all ports
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    /// Ordinal of a port among the ports sharing its direction, with that count
    pub fn port_ordinal(&self, port_id: &PortId) -> Option<(usize, usize)> {
        let port = self.port(port_id)?;
        let ports = match port.direction {
            PortDirection::Input => &self.inputs,
            PortDirection::Output => &self.outputs,
        };
        ports.iter()
            .position(|p| p.id == *port_id)
            .map(|index| (index, ports.len()))
    }

    /// Whether this node lives inside a stack
    pub fn is_stacked(&self) -> bool {
        self.stack.is_some()
    }

    /// Whether this node is a stack
    pub fn is_stack(&self) -> bool {
        matches!(self.kind, NodeKind::Stack { .. })
    }

    /// Children of a stack, empty for every other kind
    pub fn stack_children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Stack { children } => children,
            NodeKind::Regular | NodeKind::VariableReference { .. } | NodeKind::Function => &[],
        }
    }
}

/// Registry of available node types
pub struct NodeRegistry {
    /// Registered node types by ID
    types: indexmap::IndexMap<String, NodeType>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            types: indexmap::IndexMap::new(),
        }
    }

    /// Register a node type
    pub fn register(&mut self, node_type: NodeType) {
        self.types.insert(node_type.id.clone(), node_type);
    }

    /// Get a node type by ID
    pub fn get(&self, id: &str) -> Option<&NodeType> {
        self.types.get(id)
    }

    /// Get all registered types
    pub fn types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.values()
    }

    /// Get types by category
    pub fn types_in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeType> {
        self.types.values().filter(move |t| t.category == category)
    }

    /// Create a node from a type ID
    pub fn create_node(&self, type_id: &str) -> Option<Node> {
        self.get(type_id).map(Node::new)
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

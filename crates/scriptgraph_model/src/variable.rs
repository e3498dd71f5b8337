// SPDX-License-Identifier: MIT OR Apache-2.0
//! Variable declarations shown in the blackboard side panel.

use crate::node::NodeId;
use crate::port::PortType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a variable declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableId(pub Uuid);

impl VariableId {
    /// Create a new random variable ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VariableId {
    fn default() -> Self {
        Self::new()
    }
}

/// Scope a declaration belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableOwner {
    /// Graph-level variable, listed in the blackboard
    Graph,
    /// Local of a function node
    Function(NodeId),
}

/// A variable declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDeclaration {
    /// Unique ID
    pub id: VariableId,
    /// Variable name
    pub name: String,
    /// Value type
    pub data_type: PortType,
    /// Owning scope
    pub owner: VariableOwner,
}

impl VariableDeclaration {
    /// Create a declaration
    pub fn new(name: impl Into<String>, data_type: PortType, owner: VariableOwner) -> Self {
        Self {
            id: VariableId::new(),
            name: name.into(),
            data_type,
            owner,
        }
    }
}

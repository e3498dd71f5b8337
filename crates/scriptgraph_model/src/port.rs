// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortId(pub Uuid);

impl PortId {
    /// Create a new random port ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PortId {
    fn default() -> Self {
        Self::new()
    }
}

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    Input,
    /// Output port
    Output,
}

/// What a port carries, as far as layout is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortCapability {
    /// Execution flow
    Execution,
    /// A value
    Data,
    /// Loop body entry into a nested stack
    Loop,
}

/// Data type that can flow through ports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PortType {
    /// Execution flow
    Exec,
    /// Loop body execution (feeds a nested stack)
    Loop,
    /// Boolean value
    Bool,
    /// Integer value
    Int,
    /// Floating point value
    Float,
    /// 2D vector
    Vector2,
    /// 3D vector
    Vector3,
    /// Entity reference
    Entity,
    /// String value
    String,
    /// Any type (for generic nodes)
    Any,
    /// Custom type
    Custom(String),
}

impl PortType {
    /// Layout capability of this type
    pub fn capability(&self) -> PortCapability {
        match self {
            Self::Exec => PortCapability::Execution,
            Self::Loop => PortCapability::Loop,
            Self::Bool
            | Self::Int
            | Self::Float
            | Self::Vector2
            | Self::Vector3
            | Self::Entity
            | Self::String
            | Self::Any
            | Self::Custom(_) => PortCapability::Data,
        }
    }

    /// Check if this type can connect to another type
    pub fn can_connect_to(&self, other: &PortType) -> bool {
        let flow = |t: &PortType| t.capability() != PortCapability::Data;

        // Flow only ever meets flow
        if flow(self) || flow(other) {
            return flow(self) && flow(other);
        }

        // Any type can connect to any value
        if matches!(self, Self::Any) || matches!(other, Self::Any) {
            return true;
        }

        if self == other {
            return true;
        }

        match (self, other) {
            (Self::Int, Self::Float) | (Self::Float, Self::Int) => true,
            (Self::Float, Self::Vector2 | Self::Vector3) => true,
            (Self::Vector2, Self::Vector3) => true,
            _ => false,
        }
    }
}

/// A port on a node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    /// Unique port ID
    pub id: PortId,
    /// Port name
    pub name: String,
    /// Port direction
    pub direction: PortDirection,
    /// Data type
    pub port_type: PortType,
    /// Whether multiple connections are allowed
    pub multi_connect: bool,
}

impl Port {
    /// Create a new port
    pub fn new(
        id: PortId,
        name: impl Into<String>,
        port_type: PortType,
        direction: PortDirection,
    ) -> Self {
        // Execution outputs fan out to one edge each; value outputs may feed many inputs.
        let multi_connect = match direction {
            PortDirection::Output => port_type.capability() == PortCapability::Data,
            PortDirection::Input => port_type.capability() != PortCapability::Data,
        };
        Self {
            id,
            name: name.into(),
            direction,
            port_type,
            multi_connect,
        }
    }

    /// Create a new input port
    pub fn input(name: impl Into<String>, port_type: PortType) -> Self {
        Self::new(PortId::new(), name, port_type, PortDirection::Input)
    }

    /// Create a new output port
    pub fn output(name: impl Into<String>, port_type: PortType) -> Self {
        Self::new(PortId::new(), name, port_type, PortDirection::Output)
    }

    /// Layout capability of this port
    pub fn capability(&self) -> PortCapability {
        self.port_type.capability()
    }

    /// Copy of this port with a fresh ID (used when instancing node types)
    pub fn instantiate(&self) -> Self {
        Self {
            id: PortId::new(),
            ..self.clone()
        }
    }

    /// Check if a connection to another port is valid
    pub fn can_connect(&self, other: &Port) -> bool {
        if self.direction == other.direction {
            return false;
        }

        self.port_type.can_connect_to(&other.port_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities() {
        assert_eq!(PortType::Exec.capability(), PortCapability::Execution);
        assert_eq!(PortType::Loop.capability(), PortCapability::Loop);
        assert_eq!(PortType::Float.capability(), PortCapability::Data);
    }

    #[test]
    fn test_flow_does_not_meet_data() {
        let exec_out = Port::output("Then", PortType::Exec);
        let float_in = Port::input("Value", PortType::Float);
        let any_in = Port::input("Any", PortType::Any);
        let loop_out = Port::output("Body", PortType::Loop);
        let exec_in = Port::input("In", PortType::Exec);

        assert!(!exec_out.can_connect(&float_in));
        assert!(!exec_out.can_connect(&any_in));
        assert!(loop_out.can_connect(&exec_in));
        assert!(!exec_in.can_connect(&Port::input("Other", PortType::Exec)));
    }

    #[test]
    fn test_multi_connect_defaults() {
        assert!(!Port::output("Then", PortType::Exec).multi_connect);
        assert!(Port::input("In", PortType::Exec).multi_connect);
        assert!(Port::output("Value", PortType::Float).multi_connect);
        assert!(!Port::input("Value", PortType::Float).multi_connect);
    }
}

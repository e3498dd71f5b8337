// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node types for gameplay visual scripting.
//!
//! Supports execution flow, data flow, stacks and loops.

use crate::node::{NodeCategory, NodeKind, NodeRegistry, NodeType};
use crate::port::{Port, PortDirection, PortId, PortType};

/// Create the gameplay graph node registry
pub fn create_gameplay_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();

    // Event nodes
    registry.register(NodeType {
        id: "event_begin_play".to_string(),
        name: "Event Begin Play".to_string(),
        category: NodeCategory::Event,
        description: "Triggered when gameplay starts".to_string(),
        kind: NodeKind::Regular,
        inputs: vec![],
        outputs: vec![
            Port::new(PortId::new(), "Exec", PortType::Exec, PortDirection::Output),
        ],
    });

    registry.register(NodeType {
        id: "event_tick".to_string(),
        name: "Event Tick".to_string(),
        category: NodeCategory::Event,
        description: "Triggered every frame".to_string(),
        kind: NodeKind::Regular,
        inputs: vec![],
        outputs: vec![
            Port::new(PortId::new(), "Exec", PortType::Exec, PortDirection::Output),
            Port::new(PortId::new(), "Delta Time", PortType::Float, PortDirection::Output),
        ],
    });

    // Flow control
    registry.register(NodeType {
        id: "branch".to_string(),
        name: "Branch".to_string(),
        category: NodeCategory::Flow,
        description: "If/else branching".to_string(),
        kind: NodeKind::Regular,
        inputs: vec![
            Port::new(PortId::new(), "Exec", PortType::Exec, PortDirection::Input),
            Port::new(PortId::new(), "Condition", PortType::Bool, PortDirection::Input),
        ],
        outputs: vec![
            Port::new(PortId::new(), "True", PortType::Exec, PortDirection::Output),
            Port::new(PortId::new(), "False", PortType::Exec, PortDirection::Output),
        ],
    });

    registry.register(NodeType {
        id: "switch".to_string(),
        name: "Switch".to_string(),
        category: NodeCategory::Flow,
        description: "Three-way branching on an integer".to_string(),
        kind: NodeKind::Regular,
        inputs: vec![
            Port::new(PortId::new(), "Exec", PortType::Exec, PortDirection::Input),
            Port::new(PortId::new(), "Selection", PortType::Int, PortDirection::Input),
        ],
        outputs: vec![
            Port::new(PortId::new(), "0", PortType::Exec, PortDirection::Output),
            Port::new(PortId::new(), "1", PortType::Exec, PortDirection::Output),
            Port::new(PortId::new(), "Default", PortType::Exec, PortDirection::Output),
        ],
    });

    registry.register(NodeType {
        id: "stack".to_string(),
        name: "Stack".to_string(),
        category: NodeCategory::Flow,
        description: "Runs its children top to bottom".to_string(),
        kind: NodeKind::Stack { children: vec![] },
        inputs: vec![
            Port::new(PortId::new(), "Exec", PortType::Exec, PortDirection::Input),
        ],
        outputs: vec![
            Port::new(PortId::new(), "Exec", PortType::Exec, PortDirection::Output),
        ],
    });

    registry.register(NodeType {
        id: "for_each".to_string(),
        name: "For Each".to_string(),
        category: NodeCategory::Flow,
        description: "Runs the loop stack once per item".to_string(),
        kind: NodeKind::Regular,
        inputs: vec![
            Port::new(PortId::new(), "Collection", PortType::Any, PortDirection::Input),
        ],
        outputs: vec![
            Port::new(PortId::new(), "Body", PortType::Loop, PortDirection::Output),
        ],
    });

    // Variables and functions
    registry.register(NodeType {
        id: "get_variable".to_string(),
        name: "Get Variable".to_string(),
        category: NodeCategory::Variable,
        description: "Reads a declared variable".to_string(),
        kind: NodeKind::VariableReference { variable: None },
        inputs: vec![],
        outputs: vec![
            Port::new(PortId::new(), "Value", PortType::Any, PortDirection::Output),
        ],
    });

    registry.register(NodeType {
        id: "function".to_string(),
        name: "Function".to_string(),
        category: NodeCategory::Function,
        description: "Function entry point with local variables".to_string(),
        kind: NodeKind::Function,
        inputs: vec![],
        outputs: vec![
            Port::new(PortId::new(), "Exec", PortType::Exec, PortDirection::Output),
        ],
    });

    // Print string (for debugging)
    registry.register(NodeType {
        id: "print_string".to_string(),
        name: "Print String".to_string(),
        category: NodeCategory::Utility,
        description: "Print a string to the console".to_string(),
        kind: NodeKind::Regular,
        inputs: vec![
            Port::new(PortId::new(), "Exec", PortType::Exec, PortDirection::Input),
            Port::new(PortId::new(), "String", PortType::String, PortDirection::Input),
        ],
        outputs: vec![
            Port::new(PortId::new(), "Exec", PortType::Exec, PortDirection::Output),
        ],
    });

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instances_get_fresh_port_ids() {
        let registry = create_gameplay_registry();
        let a = registry.create_node("branch").unwrap();
        let b = registry.create_node("branch").unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(a.outputs[0].id, b.outputs[0].id);
        assert_eq!(a.port_ordinal(&a.outputs[1].id), Some((1, 2)));
    }

    #[test]
    fn test_stack_type_creates_stack() {
        let registry = create_gameplay_registry();
        let stack = registry.create_node("stack").unwrap();
        assert!(stack.is_stack());
        assert!(stack.stack_children().is_empty());
        assert_eq!(registry.types_in_category(NodeCategory::Flow).count(), 4);
    }
}

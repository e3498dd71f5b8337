// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry of which nodes move together.
//!
//! A dependency `parent -> dependent` means the dependent follows the parent
//! when it is dragged or aligned. Linked dependencies come from edges and are
//! reference counted per ordered pair; stacked dependencies come from stack
//! containment.

use indexmap::IndexMap;
use scriptgraph_model::{Connection, Graph, NodeId, PortCapability, PortId};

/// Dependency created by one or more edges between the same two nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkedNodesDependency {
    /// Node that follows
    pub dependent: NodeId,
    /// Port on the parent side of the first registered edge
    pub parent_port: PortId,
    /// Port on the dependent side of the first registered edge
    pub dependent_port: PortId,
    /// Number of coincident edges
    pub count: u32,
}

/// Dependency created by a node living inside a stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackedNodeDependency {
    /// Stacked child
    pub dependent: NodeId,
}

/// A positional dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    /// Edge-driven
    Linked(LinkedNodesDependency),
    /// Containment-driven
    Stacked(StackedNodeDependency),
}

impl Dependency {
    /// Linked dependency with a count of one
    pub fn linked(dependent: NodeId, parent_port: PortId, dependent_port: PortId) -> Self {
        Self::Linked(LinkedNodesDependency {
            dependent,
            parent_port,
            dependent_port,
            count: 1,
        })
    }

    /// Stacked dependency
    pub fn stacked(dependent: NodeId) -> Self {
        Self::Stacked(StackedNodeDependency { dependent })
    }

    /// The node that follows
    pub fn dependent(&self) -> NodeId {
        match self {
            Self::Linked(linked) => linked.dependent,
            Self::Stacked(stacked) => stacked.dependent,
        }
    }

    /// Whether this is a stacked dependency
    pub fn is_stacked(&self) -> bool {
        matches!(self, Self::Stacked(_))
    }
}

/// What [`DependencyStore::add`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// New record created
    Inserted,
    /// Existing linked record's count went up
    Incremented,
    /// Identical stacked record already present
    AlreadyPresent,
    /// A record of the other kind exists for the pair; nothing changed
    Conflict,
}

/// Map from parent node to the nodes depending on it
#[derive(Debug, Clone, Default)]
pub struct DependencyStore {
    by_parent: IndexMap<NodeId, IndexMap<NodeId, Dependency>>,
}

impl DependencyStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `dependency` under `parent`
    pub fn add(&mut self, parent: NodeId, dependency: Dependency) -> AddOutcome {
        let dependents = self.by_parent.entry(parent).or_default();
        let Some(existing) = dependents.get_mut(&dependency.dependent()) else {
            dependents.insert(dependency.dependent(), dependency);
            return AddOutcome::Inserted;
        };

        match (existing, dependency) {
            (Dependency::Linked(existing), Dependency::Linked(_)) => {
                existing.count += 1;
                AddOutcome::Incremented
            }
            (Dependency::Stacked(_), Dependency::Stacked(_)) => AddOutcome::AlreadyPresent,
            (Dependency::Linked(_), Dependency::Stacked(_))
            | (Dependency::Stacked(_), Dependency::Linked(_)) => AddOutcome::Conflict,
        }
    }

    /// Dependents of `parent`, or `None` if it has none
    pub fn dependencies(&self, parent: NodeId) -> Option<&IndexMap<NodeId, Dependency>> {
        self.by_parent.get(&parent)
    }

    /// The record for an ordered pair
    pub fn get(&self, parent: NodeId, dependent: NodeId) -> Option<&Dependency> {
        self.by_parent.get(&parent)?.get(&dependent)
    }

    /// Edge count of a linked pair (0 if absent or stacked)
    pub fn count(&self, parent: NodeId, dependent: NodeId) -> u32 {
        match self.get(parent, dependent) {
            Some(Dependency::Linked(linked)) => linked.count,
            Some(Dependency::Stacked(_)) | None => 0,
        }
    }

    /// Remove the dependency between `a` and `b`, whichever side is the parent.
    ///
    /// Returns false if no record exists for the pair.
    pub fn remove(&mut self, a: NodeId, b: NodeId) -> bool {
        self.remove_ordered(a, b) || self.remove_ordered(b, a)
    }

    fn remove_ordered(&mut self, parent: NodeId, dependent: NodeId) -> bool {
        let Some(dependents) = self.by_parent.get_mut(&parent) else {
            return false;
        };
        let Some(dependency) = dependents.get_mut(&dependent) else {
            return false;
        };

        let drop_record = match dependency {
            Dependency::Linked(linked) => {
                linked.count = linked.count.saturating_sub(1);
                linked.count == 0
            }
            Dependency::Stacked(_) => true,
        };
        if drop_record {
            dependents.shift_remove(&dependent);
        }
        if dependents.is_empty() {
            self.by_parent.shift_remove(&parent);
        }
        true
    }

    /// Drop every record mentioning `node`
    pub fn remove_node(&mut self, node: NodeId) {
        self.by_parent.shift_remove(&node);
        self.by_parent.retain(|_, dependents| {
            dependents.shift_remove(&node);
            !dependents.is_empty()
        });
    }

    /// Remove all entries
    pub fn clear(&mut self) {
        self.by_parent.clear();
    }

    /// Number of parents with at least one dependent
    pub fn len(&self) -> usize {
        self.by_parent.len()
    }

    /// Whether the store holds nothing
    pub fn is_empty(&self) -> bool {
        self.by_parent.is_empty()
    }

    /// Iterate parents with their dependents
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &IndexMap<NodeId, Dependency>)> {
        self.by_parent.iter().map(|(parent, deps)| (*parent, deps))
    }
}

/// Derive the `(parent, dependency)` an edge creates, if any.
///
/// Execution and loop edges hang the target below the source. Data edges hang
/// the producer beside the node consuming its value. Edges whose endpoints are
/// the same node or share a stack create nothing.
pub fn dependency_for_connection(graph: &Graph, connection: &Connection) -> Option<(NodeId, Dependency)> {
    let from = graph.node(connection.from_node)?;
    let to = graph.node(connection.to_node)?;
    if from.id == to.id {
        return None;
    }
    if from.stack.is_some() && from.stack == to.stack {
        return None;
    }

    let from_port = from.port(&connection.from_port)?;
    match from_port.capability() {
        PortCapability::Execution | PortCapability::Loop => Some((
            from.id,
            Dependency::linked(to.id, connection.from_port, connection.to_port),
        )),
        PortCapability::Data => Some((
            to.id,
            Dependency::linked(from.id, connection.to_port, connection.from_port),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptgraph_model::{Node, NodeKind, Port, PortType};

    fn linked(dependent: NodeId) -> Dependency {
        Dependency::linked(dependent, PortId::new(), PortId::new())
    }

    #[test]
    fn test_linked_count_tracks_adds_and_removes() {
        let mut store = DependencyStore::new();
        let (a, b) = (NodeId::new(), NodeId::new());

        assert_eq!(store.add(a, linked(b)), AddOutcome::Inserted);
        assert_eq!(store.add(a, linked(b)), AddOutcome::Incremented);
        assert_eq!(store.add(a, linked(b)), AddOutcome::Incremented);
        assert_eq!(store.count(a, b), 3);

        assert!(store.remove(a, b));
        assert_eq!(store.count(a, b), 2);
        // Either side may be passed first
        assert!(store.remove(b, a));
        assert_eq!(store.count(a, b), 1);
        assert!(store.remove(a, b));

        assert!(store.get(a, b).is_none());
        assert!(store.dependencies(a).is_none());
        assert!(store.is_empty());

        assert!(!store.remove(a, b));
    }

    #[test]
    fn test_count_invariant_over_sequence() {
        let mut store = DependencyStore::new();
        let (a, b) = (NodeId::new(), NodeId::new());
        let ops = [true, true, false, true, false, false, false, true, true, false];
        let mut expected: i32 = 0;

        for add in ops {
            if add {
                store.add(a, linked(b));
                expected += 1;
            } else if store.remove(a, b) {
                expected -= 1;
            }
            assert_eq!(store.count(a, b) as i32, expected.max(0));
            assert_eq!(store.get(a, b).is_some(), expected > 0);
        }
    }

    #[test]
    fn test_conflicting_kinds_leave_record_untouched() {
        let mut store = DependencyStore::new();
        let (stack, child) = (NodeId::new(), NodeId::new());

        assert_eq!(store.add(stack, Dependency::stacked(child)), AddOutcome::Inserted);
        assert_eq!(store.add(stack, Dependency::stacked(child)), AddOutcome::AlreadyPresent);
        assert_eq!(store.add(stack, linked(child)), AddOutcome::Conflict);
        assert!(store.get(stack, child).unwrap().is_stacked());

        // Stacked records go away on the first removal
        assert!(store.remove(child, stack));
        assert!(store.is_empty());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut store = DependencyStore::new();
        let nodes: Vec<NodeId> = (0..4).map(|_| NodeId::new()).collect();
        store.add(nodes[0], linked(nodes[1]));
        store.add(nodes[1], Dependency::stacked(nodes[2]));

        store.clear();
        store.clear();
        for node in &nodes {
            assert!(store.dependencies(*node).is_none());
        }
    }

    #[test]
    fn test_remove_node_purges_both_sides() {
        let mut store = DependencyStore::new();
        let (a, b, c) = (NodeId::new(), NodeId::new(), NodeId::new());
        store.add(a, linked(b));
        store.add(b, linked(c));

        store.remove_node(b);
        assert!(store.is_empty());
    }

    #[test]
    fn test_dependency_direction_from_port_capability() {
        let mut graph = Graph::new("Test");
        let source = graph.add_node(Node::with_ports(
            "Source",
            vec![],
            vec![Port::output("Then", PortType::Exec), Port::output("Value", PortType::Float)],
        ));
        let target = graph.add_node(Node::with_ports(
            "Target",
            vec![Port::input("In", PortType::Exec), Port::input("Value", PortType::Float)],
            vec![],
        ));
        let (exec_out, value_out) = {
            let n = graph.node(source).unwrap();
            (n.outputs[0].id, n.outputs[1].id)
        };
        let (exec_in, value_in) = {
            let n = graph.node(target).unwrap();
            (n.inputs[0].id, n.inputs[1].id)
        };

        let exec = graph.connect(source, exec_out, target, exec_in).unwrap();
        let data = graph.connect(source, value_out, target, value_in).unwrap();

        let (parent, dep) = dependency_for_connection(&graph, graph.connection(exec).unwrap()).unwrap();
        assert_eq!((parent, dep.dependent()), (source, target));

        let (parent, dep) = dependency_for_connection(&graph, graph.connection(data).unwrap()).unwrap();
        assert_eq!((parent, dep.dependent()), (target, source));
        match dep {
            Dependency::Linked(linked) => assert_eq!(linked.parent_port, value_in),
            Dependency::Stacked(_) => panic!("expected linked dependency"),
        }
    }

    #[test]
    fn test_edges_inside_one_stack_create_nothing() {
        let mut graph = Graph::new("Test");
        let stack = graph.add_node(
            Node::with_ports("Stack", vec![], vec![]).with_kind(NodeKind::Stack { children: vec![] }),
        );
        let a = graph.add_node(Node::with_ports("A", vec![], vec![Port::output("Value", PortType::Float)]));
        let b = graph.add_node(Node::with_ports("B", vec![Port::input("Value", PortType::Float)], vec![]));
        graph.insert_into_stack(stack, a, 0).unwrap();
        graph.insert_into_stack(stack, b, 1).unwrap();
        let out = graph.node(a).unwrap().outputs[0].id;
        let input = graph.node(b).unwrap().inputs[0].id;
        let edge = graph.connect(a, out, b, input).unwrap();

        assert!(dependency_for_connection(&graph, graph.connection(edge).unwrap()).is_none());
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cascading moves through the dependency store.
//!
//! While nodes are dragged, everything depending on them (transitively) is
//! offset by the same delta. Cancelling restores the positions recorded when
//! the drag started; stopping writes the final positions back to the model.

use crate::dependency::{dependency_for_connection, AddOutcome, Dependency, DependencyStore};
use crate::history::{History, HistoryError};
use crate::view::{EdgeEndpoints, ViewLayer, ViewMapping};
use egui::{Pos2, Vec2};
use indexmap::{IndexMap, IndexSet};
use scriptgraph_model::{Connection, ElementId, Graph, NodeId};

/// A dependent reached by a cascade, with the parent it was reached from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cascaded {
    /// Node whose dependency led here
    pub parent: NodeId,
    /// The dependency record
    pub dependency: Dependency,
}

#[derive(Debug, Default)]
struct DragState {
    /// Nodes moved directly by the user, in selection order
    roots: Vec<NodeId>,
    /// Visual positions at drag start, roots and linked dependents
    start_positions: IndexMap<NodeId, Pos2>,
}

/// Owns the dependency store and the drag lifecycle
#[derive(Debug, Default)]
pub struct PositionDependenciesManager {
    store: DependencyStore,
    drag: Option<DragState>,
    verbose: bool,
}

impl PositionDependenciesManager {
    /// Create an empty manager
    pub fn new(verbose: bool) -> Self {
        Self {
            store: DependencyStore::new(),
            drag: None,
            verbose,
        }
    }

    /// Toggle diagnostic logging
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// The underlying store
    pub fn store(&self) -> &DependencyStore {
        &self.store
    }

    /// Register a dependency, logging kind conflicts
    pub fn add(&mut self, parent: NodeId, dependency: Dependency) -> AddOutcome {
        let outcome = self.store.add(parent, dependency);
        if outcome == AddOutcome::Conflict && self.verbose {
            tracing::warn!(
                "Dependency {:?} -> {:?} already registered with another kind; keeping the existing one",
                parent,
                dependency.dependent()
            );
        }
        outcome
    }

    /// Remove the dependency between two nodes, in either direction
    pub fn remove(&mut self, a: NodeId, b: NodeId) -> bool {
        self.store.remove(a, b)
    }

    /// Drop every dependency the node takes part in, as parent or dependent
    pub fn remove_node(&mut self, node: NodeId) {
        self.store.remove_node(node);
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.store.clear();
        self.drag = None;
    }

    /// Register the dependency created by an edge; returns what to record
    /// in the view mapping so it can be dropped later.
    pub fn add_connection_dependency(&mut self, graph: &Graph, connection: &Connection) -> EdgeEndpoints {
        let dependency = dependency_for_connection(graph, connection).and_then(|(parent, dependency)| {
            match self.add(parent, dependency) {
                AddOutcome::Inserted | AddOutcome::Incremented => Some((parent, dependency.dependent())),
                AddOutcome::AlreadyPresent | AddOutcome::Conflict => None,
            }
        });
        EdgeEndpoints {
            from: connection.from_node,
            to: connection.to_node,
            dependency,
        }
    }

    /// Drop the dependency an edge registered
    pub fn remove_connection_dependency(&mut self, endpoints: EdgeEndpoints) {
        if let Some((parent, dependent)) = endpoints.dependency {
            self.store.remove(parent, dependent);
        }
    }

    /// Register `children` as stacked under `stack`, replacing `previous`
    pub fn register_stack_children(&mut self, stack: NodeId, previous: &[NodeId], children: &[NodeId]) {
        for child in previous {
            if let Some(Dependency::Stacked(_)) = self.store.get(stack, *child) {
                self.store.remove(stack, *child);
            }
        }
        for child in children {
            self.add(stack, Dependency::stacked(*child));
        }
    }

    /// Walk every transitive dependent of `roots`, each at most once.
    ///
    /// Roots are never reported. Order is depth-first pre-order from the
    /// first root, then the next; a node reachable from two roots is reached
    /// through the first of them.
    pub fn cascade(&self, roots: &[NodeId]) -> Vec<Cascaded> {
        self.cascade_excluding(roots, &[])
    }

    /// Like [`Self::cascade`], treating `excluded` as already visited
    pub fn cascade_excluding(&self, roots: &[NodeId], excluded: &[NodeId]) -> Vec<Cascaded> {
        let mut visited: IndexSet<NodeId> = roots.iter().chain(excluded).copied().collect();
        let mut reached = Vec::new();

        for root in roots {
            let mut worklist: Vec<(NodeId, usize)> = vec![(*root, 0)];
            while let Some((parent, index)) = worklist.pop() {
                let Some(dependents) = self.store.dependencies(parent) else {
                    continue;
                };
                let Some((dependent, dependency)) = dependents.get_index(index) else {
                    continue;
                };
                worklist.push((parent, index + 1));

                if !visited.insert(*dependent) {
                    continue;
                }
                reached.push(Cascaded {
                    parent,
                    dependency: *dependency,
                });
                worklist.push((*dependent, 0));
            }
        }

        reached
    }

    /// Whether a drag is in progress
    pub fn is_moving(&self) -> bool {
        self.drag.is_some()
    }

    /// Nodes being dragged directly
    pub fn moving_roots(&self) -> &[NodeId] {
        self.drag.as_ref().map(|d| d.roots.as_slice()).unwrap_or(&[])
    }

    /// Visual position of a dragged node or dependent when the drag started
    pub fn drag_start_position(&self, node: NodeId) -> Option<Pos2> {
        self.drag.as_ref()?.start_positions.get(&node).copied()
    }

    /// Begin a drag of the selected nodes
    pub fn start_notify_move(
        &mut self,
        graph: &Graph,
        view: &dyn ViewLayer,
        mapping: &ViewMapping,
        selection: &[ElementId],
    ) {
        let mut roots = Vec::new();
        for element in selection {
            let ElementId::Node(node) = *element else {
                continue;
            };
            debug_assert!(graph.node(node).is_some(), "dragged node {node:?} does not belong to graph {:?}", graph.id);
            if !roots.contains(&node) {
                roots.push(node);
            }
        }

        let mut start_positions = IndexMap::new();
        for root in &roots {
            if let Some(rect) = mapping.get(*root).and_then(|v| view.layout(v)) {
                start_positions.insert(*root, rect.min);
            }
        }
        for cascaded in self.cascade(&roots) {
            if cascaded.dependency.is_stacked() {
                continue;
            }
            let dependent = cascaded.dependency.dependent();
            match mapping.get(dependent).and_then(|v| view.layout(v)) {
                Some(rect) => {
                    start_positions.insert(dependent, rect.min);
                }
                None => self.log_missing_visual(dependent),
            }
        }

        self.drag = Some(DragState { roots, start_positions });
    }

    /// Offset every dependent of the dragged nodes by `delta`, the total drag
    /// offset since [`Self::start_notify_move`].
    pub fn process_moved_nodes(&mut self, view: &mut dyn ViewLayer, mapping: &ViewMapping, delta: Vec2) {
        let Some(roots) = self.drag.as_ref().map(|d| d.roots.clone()) else {
            return;
        };

        for cascaded in self.cascade(&roots) {
            // The stack carries its children
            if cascaded.dependency.is_stacked() {
                continue;
            }
            let dependent = cascaded.dependency.dependent();
            let Some(visual) = mapping.get(dependent) else {
                self.log_missing_visual(dependent);
                continue;
            };
            let Some(current) = view.layout(visual).map(|r| r.min) else {
                self.log_missing_visual(dependent);
                continue;
            };
            let start = match self.drag.as_mut() {
                Some(drag) => *drag.start_positions.entry(dependent).or_insert(current),
                None => current,
            };
            view.set_position(visual, start + delta);
        }
    }

    /// Abort the drag, putting every dependent back where it started
    pub fn cancel_move(&mut self, view: &mut dyn ViewLayer, mapping: &ViewMapping) {
        let Some(drag) = self.drag.take() else {
            return;
        };

        for (node, start) in &drag.start_positions {
            if drag.roots.contains(node) {
                continue;
            }
            match mapping.get(*node) {
                Some(visual) => view.set_position(visual, *start),
                None => self.log_missing_visual(*node),
            }
        }
    }

    /// Finish the drag and write the final visual positions to the model.
    ///
    /// Returns whether anything moved.
    pub fn stop_notify_move(
        &mut self,
        graph: &mut Graph,
        view: &dyn ViewLayer,
        mapping: &ViewMapping,
        history: &mut History,
    ) -> Result<bool, HistoryError> {
        let Some(drag) = self.drag.take() else {
            return Ok(false);
        };

        let mut moves = Vec::new();
        for node in drag.start_positions.keys() {
            let Some(rect) = mapping.get(*node).and_then(|v| view.layout(v)) else {
                continue;
            };
            let position = [rect.min.x, rect.min.y];
            let Some(model) = graph.node(*node) else {
                continue;
            };
            if !model.is_stacked() && model.position != position {
                moves.push((*node, position));
            }
            // Children ride along with their stack visual
            for child in model.stack_children() {
                let Some(rect) = mapping.get(*child).and_then(|v| view.layout(v)) else {
                    continue;
                };
                let position = [rect.min.x, rect.min.y];
                if graph.node(*child).is_some_and(|c| c.position != position) {
                    moves.push((*child, position));
                }
            }
        }
        if moves.is_empty() {
            return Ok(false);
        }

        let pending = history.begin("Move nodes", graph)?;
        for (node, position) in &moves {
            graph.set_position(ElementId::Node(*node), *position);
        }
        history.finish(pending, graph)?;
        Ok(true)
    }

    fn log_missing_visual(&self, node: NodeId) {
        if self.verbose {
            tracing::debug!("No visual mapped for dependent {:?}; skipping", node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::RecordingView;
    use scriptgraph_model::{Node, NodeKind, Port, PortId, PortType};

    fn linked(dependent: NodeId) -> Dependency {
        Dependency::linked(dependent, PortId::new(), PortId::new())
    }

    fn chain_graph(count: usize) -> (Graph, Vec<NodeId>) {
        let mut graph = Graph::new("Test");
        let nodes = (0..count)
            .map(|i| {
                graph.add_node(
                    Node::with_ports(
                        format!("N{i}"),
                        vec![Port::input("In", PortType::Exec)],
                        vec![Port::output("Out", PortType::Exec)],
                    )
                    .with_position(0.0, i as f32 * 100.0),
                )
            })
            .collect();
        (graph, nodes)
    }

    fn build_view(graph: &Graph) -> (RecordingView, ViewMapping) {
        let mut view = RecordingView::new();
        let mut mapping = ViewMapping::new();
        for node in graph.node_ids() {
            let visual = view.create_visual(graph, ElementId::Node(node)).unwrap();
            mapping.insert(ElementId::Node(node), visual);
        }
        (view, mapping)
    }

    fn position(view: &RecordingView, mapping: &ViewMapping, node: NodeId) -> Pos2 {
        view.layout(mapping.get(node).unwrap()).unwrap().min
    }

    #[test]
    fn test_cascade_terminates_on_cycles() {
        let mut manager = PositionDependenciesManager::new(false);
        let nodes: Vec<NodeId> = (0..4).map(|_| NodeId::new()).collect();
        // 0 -> 1 -> 2 -> 3 -> 1 and 2 -> 0
        manager.add(nodes[0], linked(nodes[1]));
        manager.add(nodes[1], linked(nodes[2]));
        manager.add(nodes[2], linked(nodes[3]));
        manager.add(nodes[3], linked(nodes[1]));
        manager.add(nodes[2], linked(nodes[0]));

        for root in &nodes {
            let reached = manager.cascade(&[*root]);
            let mut seen = IndexSet::new();
            for cascaded in &reached {
                assert!(seen.insert(cascaded.dependency.dependent()));
                assert_ne!(cascaded.dependency.dependent(), *root);
            }
            assert_eq!(reached.len(), 3);
        }
    }

    #[test]
    fn test_first_root_wins() {
        let mut manager = PositionDependenciesManager::new(false);
        let (a, b, shared) = (NodeId::new(), NodeId::new(), NodeId::new());
        manager.add(a, linked(shared));
        manager.add(b, linked(shared));

        let reached = manager.cascade(&[b, a]);
        assert_eq!(reached.len(), 1);
        assert_eq!(reached[0].parent, b);
    }

    #[test]
    fn test_cascade_is_preorder() {
        let mut manager = PositionDependenciesManager::new(false);
        let nodes: Vec<NodeId> = (0..5).map(|_| NodeId::new()).collect();
        manager.add(nodes[0], linked(nodes[1]));
        manager.add(nodes[0], linked(nodes[3]));
        manager.add(nodes[1], linked(nodes[2]));
        manager.add(nodes[3], linked(nodes[4]));

        let order: Vec<NodeId> = manager.cascade(&[nodes[0]]).iter().map(|c| c.dependency.dependent()).collect();
        assert_eq!(order, vec![nodes[1], nodes[2], nodes[3], nodes[4]]);
    }

    #[test]
    fn test_offset_moves_chain_by_delta_once() {
        let (mut graph, nodes) = chain_graph(3);
        let (mut view, mapping) = build_view(&graph);
        let mut manager = PositionDependenciesManager::new(false);
        // C depends on B, B depends on A
        manager.add(nodes[0], linked(nodes[1]));
        manager.add(nodes[1], linked(nodes[2]));

        let before: Vec<Pos2> = nodes.iter().map(|n| position(&view, &mapping, *n)).collect();
        let delta = Vec2::new(25.0, -10.0);

        manager.start_notify_move(&graph, &view, &mapping, &[ElementId::Node(nodes[0])]);
        // The drag manipulator moves the root itself
        view.set_position(mapping.get(nodes[0]).unwrap(), before[0] + delta);
        manager.process_moved_nodes(&mut view, &mapping, delta * 0.5);
        manager.process_moved_nodes(&mut view, &mapping, delta);

        assert_eq!(position(&view, &mapping, nodes[1]), before[1] + delta);
        assert_eq!(position(&view, &mapping, nodes[2]), before[2] + delta);

        let mut history = History::new();
        assert!(manager.stop_notify_move(&mut graph, &view, &mapping, &mut history).unwrap());
        assert_eq!(graph.node(nodes[0]).unwrap().position, [25.0, -10.0]);
        assert_eq!(graph.node(nodes[2]).unwrap().position, [25.0, 190.0]);
        assert!(history.can_undo());
        assert!(!manager.is_moving());
    }

    #[test]
    fn test_moving_dependent_is_not_offset_twice() {
        let (graph, nodes) = chain_graph(2);
        let (mut view, mapping) = build_view(&graph);
        let mut manager = PositionDependenciesManager::new(false);
        manager.add(nodes[0], linked(nodes[1]));

        let before = position(&view, &mapping, nodes[1]);
        // Both selected: the dependent is a root and the manipulator moves it
        manager.start_notify_move(&graph, &view, &mapping, &[ElementId::Node(nodes[0]), ElementId::Node(nodes[1])]);
        manager.process_moved_nodes(&mut view, &mapping, Vec2::new(10.0, 0.0));
        assert_eq!(position(&view, &mapping, nodes[1]), before);
    }

    #[test]
    fn test_cancel_restores_start_positions() {
        let (graph, nodes) = chain_graph(3);
        let (mut view, mapping) = build_view(&graph);
        let mut manager = PositionDependenciesManager::new(false);
        manager.add(nodes[0], linked(nodes[1]));
        manager.add(nodes[1], linked(nodes[2]));
        let before: Vec<Pos2> = nodes.iter().map(|n| position(&view, &mapping, *n)).collect();

        manager.start_notify_move(&graph, &view, &mapping, &[ElementId::Node(nodes[0])]);
        manager.process_moved_nodes(&mut view, &mapping, Vec2::new(40.0, 40.0));
        manager.cancel_move(&mut view, &mapping);

        assert_eq!(position(&view, &mapping, nodes[1]), before[1]);
        assert_eq!(position(&view, &mapping, nodes[2]), before[2]);
        assert!(!manager.is_moving());
    }

    #[test]
    fn test_missing_visual_is_skipped() {
        let (graph, nodes) = chain_graph(3);
        let (mut view, mut mapping) = build_view(&graph);
        mapping.remove(ElementId::Node(nodes[1]));
        let mut manager = PositionDependenciesManager::new(true);
        manager.add(nodes[0], linked(nodes[1]));
        manager.add(nodes[1], linked(nodes[2]));
        let before = position(&view, &mapping, nodes[2]);

        manager.start_notify_move(&graph, &view, &mapping, &[ElementId::Node(nodes[0])]);
        manager.process_moved_nodes(&mut view, &mapping, Vec2::new(5.0, 5.0));
        assert_eq!(position(&view, &mapping, nodes[2]), before + Vec2::new(5.0, 5.0));
    }

    #[test]
    fn test_stacked_children_are_not_offset() {
        let (graph, nodes) = chain_graph(3);
        let (mut view, mapping) = build_view(&graph);
        let mut manager = PositionDependenciesManager::new(false);
        // nodes[1] behaves as a stacked child of nodes[0]; nodes[2] hangs off it
        manager.add(nodes[0], Dependency::stacked(nodes[1]));
        manager.add(nodes[1], linked(nodes[2]));
        let child_before = position(&view, &mapping, nodes[1]);
        let dependent_before = position(&view, &mapping, nodes[2]);

        manager.start_notify_move(&graph, &view, &mapping, &[ElementId::Node(nodes[0])]);
        manager.process_moved_nodes(&mut view, &mapping, Vec2::new(0.0, 15.0));
        assert_eq!(position(&view, &mapping, nodes[1]), child_before);
        assert_eq!(position(&view, &mapping, nodes[2]), dependent_before + Vec2::new(0.0, 15.0));
    }

    #[test]
    fn test_remove_node_purges_records() {
        let mut manager = PositionDependenciesManager::new(false);
        let (a, b, c) = (NodeId::new(), NodeId::new(), NodeId::new());
        manager.add(a, linked(b));
        manager.add(b, linked(c));
        manager.add(a, linked(c));

        manager.remove_node(b);
        assert!(manager.store().get(a, b).is_none());
        assert!(manager.store().dependencies(b).is_none());
        let reached: Vec<NodeId> = manager.cascade(&[a]).iter().map(|c| c.dependency.dependent()).collect();
        assert_eq!(reached, vec![c]);
    }

    #[test]
    fn test_stop_writes_stacked_children_from_layout() {
        let mut graph = Graph::new("Test");
        let stack = graph.add_node(
            Node::with_ports("Stack", vec![], vec![])
                .with_kind(NodeKind::Stack { children: vec![] })
                .with_position(0.0, 0.0),
        );
        let child = graph.add_node(Node::with_ports("Child", vec![], vec![]));
        graph.insert_into_stack(stack, child, 0).unwrap();

        let mut view = RecordingView::new();
        let mut mapping = ViewMapping::new();
        let stack_visual = view.create_visual(&graph, ElementId::Node(stack)).unwrap();
        let child_visual = view.create_visual(&graph, ElementId::Node(child)).unwrap();
        view.attach_to_stack(stack_visual, child_visual, 0);
        view.relayout_stack(stack_visual);
        mapping.insert(ElementId::Node(stack), stack_visual);
        mapping.insert(ElementId::Node(child), child_visual);

        let mut manager = PositionDependenciesManager::new(false);
        manager.register_stack_children(stack, &[], &[child]);
        let child_before = position(&view, &mapping, child);

        manager.start_notify_move(&graph, &view, &mapping, &[ElementId::Node(stack)]);
        view.set_position(stack_visual, Pos2::new(30.0, 20.0));
        manager.process_moved_nodes(&mut view, &mapping, Vec2::new(30.0, 20.0));

        let mut history = History::new();
        assert!(manager.stop_notify_move(&mut graph, &view, &mapping, &mut history).unwrap());
        let expected = child_before + Vec2::new(30.0, 20.0);
        assert_eq!(graph.node(child).unwrap().position, [expected.x, expected.y]);
        assert_eq!(graph.node(stack).unwrap().position, [30.0, 20.0]);
        assert_eq!(history.stats().undo_count, 1);
    }
}

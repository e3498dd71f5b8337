// SPDX-License-Identifier: MIT OR Apache-2.0
//! Automatic alignment of dependent nodes.
//!
//! Given a dependency, computes where the dependent should sit so that it
//! reads as flowing from its parent:
//! - execution branches fan out below the parent
//! - repeated execution edges to one node drop it below-right of the parent
//! - loop bodies are tucked diagonally beside the loop port
//! - data producers sit beside the consumer with their ports level
//! - stacked children keep whatever their stack laid out

use crate::config::LayoutMetrics;
use crate::dependency::{dependency_for_connection, Dependency, LinkedNodesDependency};
use crate::history::{History, HistoryError};
use crate::mover::PositionDependenciesManager;
use crate::view::{ViewLayer, ViewMapping};
use egui::{Pos2, Vec2};
use indexmap::IndexSet;
use scriptgraph_model::{ElementId, Graph, NodeId, PortCapability, PortDirection};

/// Aligns nodes against their registered dependencies
pub struct AlignmentEngine<'a> {
    graph: &'a mut Graph,
    view: &'a mut dyn ViewLayer,
    mapping: &'a ViewMapping,
    dependencies: &'a PositionDependenciesManager,
    metrics: LayoutMetrics,
    verbose: bool,
    moved: IndexSet<NodeId>,
}

impl<'a> AlignmentEngine<'a> {
    /// Create an engine over one graph and its view
    pub fn new(
        graph: &'a mut Graph,
        view: &'a mut dyn ViewLayer,
        mapping: &'a ViewMapping,
        dependencies: &'a PositionDependenciesManager,
        metrics: LayoutMetrics,
    ) -> Self {
        Self {
            graph,
            view,
            mapping,
            dependencies,
            metrics,
            verbose: false,
            moved: IndexSet::new(),
        }
    }

    /// Log skipped nodes
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Where `dependency` wants its dependent, given `parent`'s current layout
    pub fn aligned_position(&self, parent: NodeId, dependency: &Dependency) -> Option<Pos2> {
        match dependency {
            Dependency::Linked(linked) => self.linked_position(parent, linked),
            Dependency::Stacked(stacked) => {
                debug_assert!(
                    self.mapping.get(parent).is_some(),
                    "stack {parent:?} has no visual while aligning its child"
                );
                let visual = self.mapping.get(stacked.dependent)?;
                self.view.layout(visual).map(|r| r.min)
            }
        }
    }

    fn linked_position(&self, parent: NodeId, linked: &LinkedNodesDependency) -> Option<Pos2> {
        let parent_node = self.graph.node(parent)?;
        let dependent_node = self.graph.node(linked.dependent)?;
        let parent_port = parent_node.port(&linked.parent_port)?;
        let dependent_port = dependent_node.port(&linked.dependent_port)?;

        let parent_visual = self.mapping.get(parent)?;
        let dependent_visual = self.mapping.get(linked.dependent)?;
        let parent_rect = self.view.layout(parent_visual)?;
        let dependent_rect = self.view.layout(dependent_visual)?;
        let metrics = &self.metrics;

        let both_execution = parent_port.capability() == PortCapability::Execution
            && dependent_port.capability() == PortCapability::Execution;

        if both_execution && linked.count > 1 {
            return Some(Pos2::new(
                parent_rect.left() + metrics.horizontal_offset,
                parent_rect.bottom() + metrics.vertical_offset,
            ));
        }

        if both_execution {
            let (index, count) = parent_node.port_ordinal(&linked.parent_port)?;
            let spread = (index + 1) as f32 / (count + 1) as f32 * 2.0 - 1.0;
            return Some(Pos2::new(
                parent_rect.center().x + spread * metrics.branch_spread - dependent_rect.width() * 0.5,
                parent_rect.bottom() + metrics.vertical_offset,
            ));
        }

        if parent_port.capability() == PortCapability::Loop && dependent_node.is_stack() {
            let anchor = parent_rect.min + self.view.port_offset(parent_visual, linked.parent_port)?;
            return Some(anchor + Vec2::splat(metrics.diagonal_step));
        }

        let parent_port_y = self.view.port_offset(parent_visual, linked.parent_port).map_or(0.0, |o| o.y);
        let dependent_port_y = self.view.port_offset(dependent_visual, linked.dependent_port).map_or(0.0, |o| o.y);
        // Edges always hand data dependencies an input-side parent port;
        // output-side parents come from directly registered dependencies
        let x = match parent_port.direction {
            PortDirection::Output => parent_rect.right() + metrics.horizontal_offset,
            PortDirection::Input => parent_rect.left() - metrics.horizontal_offset - dependent_rect.width(),
        };
        Some(Pos2::new(x, parent_rect.top() + parent_port_y - dependent_port_y))
    }

    /// Move one dependent to its aligned position. Returns the applied offset.
    pub fn align_dependency(&mut self, parent: NodeId, dependency: &Dependency) -> Option<Vec2> {
        let dependent = dependency.dependent();
        let Some(visual) = self.mapping.get(dependent) else {
            self.log_skip(dependent, "no visual");
            return None;
        };
        let current = self.view.layout(visual)?.min;

        if let Dependency::Linked(_) = dependency {
            if self.graph.node(dependent).is_some_and(|n| n.is_stacked()) {
                self.log_skip(dependent, "stacked");
                return None;
            }
        }

        let target = self.aligned_position(parent, dependency)?;
        if !dependency.is_stacked() {
            self.view.set_position(visual, target);
        }
        self.write_position(dependent, target);
        Some(target - current)
    }

    fn offset(&mut self, node: NodeId, delta: Vec2) {
        let Some(visual) = self.mapping.get(node) else {
            self.log_skip(node, "no visual");
            return;
        };
        let Some(current) = self.view.layout(visual).map(|r| r.min) else {
            return;
        };
        self.view.set_position(visual, current + delta);
        self.write_position(node, current + delta);
    }

    fn write_position(&mut self, node: NodeId, position: Pos2) {
        let position = [position.x, position.y];
        if self.graph.node(node).is_some_and(|n| n.position != position) {
            self.graph.set_position(ElementId::Node(node), position);
            self.moved.insert(node);
        }
    }

    /// Align the dependents of a selection.
    ///
    /// Selected edges align their own dependent. Otherwise the top-most
    /// selected nodes align their direct dependents, which drag their own
    /// dependents along rigidly; with `follow` the alignment recurses down
    /// every chain instead. Returns the nodes whose position changed.
    pub fn align_nodes(
        mut self,
        history: &mut History,
        selection: &[ElementId],
        follow: bool,
    ) -> Result<Vec<NodeId>, HistoryError> {
        let pending = history.begin("Align nodes", self.graph)?;

        let mut top_most: IndexSet<NodeId> = IndexSet::new();
        let mut any_edge = false;
        for element in selection {
            let ElementId::Connection(id) = *element else {
                continue;
            };
            let Some(connection) = self.graph.connection(id) else {
                continue;
            };
            let Some((parent, derived)) = dependency_for_connection(self.graph, connection) else {
                continue;
            };
            let dependency = self
                .dependencies
                .store()
                .get(parent, derived.dependent())
                .copied()
                .unwrap_or(derived);

            any_edge = true;
            self.align_dependency(parent, &dependency);
            top_most.insert(dependency.dependent());
        }

        if !(any_edge && !follow) {
            if top_most.is_empty() {
                top_most = self.top_most_nodes(selection);
            }

            let roots: Vec<NodeId> = top_most.iter().copied().collect();
            if follow {
                for cascaded in self.dependencies.cascade(&roots) {
                    self.align_dependency(cascaded.parent, &cascaded.dependency);
                }
            } else {
                self.align_rigid(&roots);
            }
        }

        let moved: Vec<NodeId> = self.moved.iter().copied().collect();
        if !moved.is_empty() {
            history.finish(pending, self.graph)?;
        }
        Ok(moved)
    }

    /// Selected nodes not reachable as a dependent of another selected node
    fn top_most_nodes(&self, selection: &[ElementId]) -> IndexSet<NodeId> {
        let selected: IndexSet<NodeId> = selection.iter().filter_map(|e| e.as_node()).collect();
        let mut reachable = IndexSet::new();
        for node in &selected {
            for cascaded in self.dependencies.cascade(&[*node]) {
                reachable.insert(cascaded.dependency.dependent());
            }
        }

        let top: IndexSet<NodeId> = selected.iter().filter(|n| !reachable.contains(*n)).copied().collect();
        if top.is_empty() {
            // Everything selected sits on one cycle; start from the first node
            return selected.into_iter().take(1).collect();
        }
        top
    }

    fn align_rigid(&mut self, roots: &[NodeId]) {
        for root in roots {
            let direct: Vec<_> = match self.dependencies.store().dependencies(*root) {
                Some(dependents) => dependents.values().copied().collect(),
                None => continue,
            };

            // Roots and their direct dependents are placed by alignment, never dragged along
            let mut fixed: Vec<NodeId> = roots.to_vec();
            fixed.extend(direct.iter().map(Dependency::dependent));

            for dependency in direct {
                let Some(delta) = self.align_dependency(*root, &dependency) else {
                    continue;
                };
                if delta == Vec2::ZERO || dependency.is_stacked() {
                    continue;
                }

                for cascaded in self.dependencies.cascade_excluding(&[dependency.dependent()], &fixed) {
                    if cascaded.dependency.is_stacked() {
                        continue;
                    }
                    self.offset(cascaded.dependency.dependent(), delta);
                }
            }
        }
    }

    fn log_skip(&self, node: NodeId, reason: &str) {
        if self.verbose {
            tracing::debug!("Not aligning {:?}: {}", node, reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::RecordingView;
    use scriptgraph_model::gameplay::create_gameplay_registry;
    use scriptgraph_model::{ConnectionId, Node, NodeRegistry, Port, PortType};

    struct Fixture {
        graph: Graph,
        view: RecordingView,
        mapping: ViewMapping,
        manager: PositionDependenciesManager,
        history: History,
    }

    impl Fixture {
        fn new(graph: Graph) -> Self {
            let mut view = RecordingView::new();
            let mut mapping = ViewMapping::new();
            let mut manager = PositionDependenciesManager::new(false);

            for node in graph.nodes().filter(|n| !n.is_stacked()) {
                let visual = view.create_visual(&graph, ElementId::Node(node.id)).unwrap();
                mapping.insert(ElementId::Node(node.id), visual);
                for (index, child) in node.stack_children().iter().enumerate() {
                    let child_visual = view.create_visual(&graph, ElementId::Node(*child)).unwrap();
                    mapping.insert(ElementId::Node(*child), child_visual);
                    view.attach_to_stack(visual, child_visual, index);
                }
                if node.is_stack() {
                    view.relayout_stack(visual);
                    manager.register_stack_children(node.id, &[], node.stack_children());
                }
            }
            for connection in graph.connections() {
                manager.add_connection_dependency(&graph, connection);
            }

            Self { graph, view, mapping, manager, history: History::new() }
        }

        fn align(&mut self, selection: &[ElementId], follow: bool) -> Vec<NodeId> {
            AlignmentEngine::new(
                &mut self.graph,
                &mut self.view,
                &self.mapping,
                &self.manager,
                LayoutMetrics::default(),
            )
            .align_nodes(&mut self.history, selection, follow)
            .unwrap()
        }

        fn position(&self, node: NodeId) -> Pos2 {
            self.view.layout(self.mapping.get(node).unwrap()).unwrap().min
        }
    }

    fn spawn(graph: &mut Graph, registry: &NodeRegistry, type_id: &str, x: f32, y: f32) -> NodeId {
        graph.add_node(registry.create_node(type_id).unwrap().with_position(x, y))
    }

    fn link(graph: &mut Graph, from: NodeId, output: usize, to: NodeId, input: usize) -> ConnectionId {
        let out = graph.node(from).unwrap().outputs[output].id;
        let inp = graph.node(to).unwrap().inputs[input].id;
        graph.connect(from, out, to, inp).unwrap()
    }

    #[test]
    fn test_branch_fan_out() {
        let registry = create_gameplay_registry();
        let mut graph = Graph::new("Test");
        let switch = spawn(&mut graph, &registry, "switch", 0.0, 0.0);
        let targets: Vec<NodeId> = (0..3)
            .map(|i| spawn(&mut graph, &registry, "print_string", 500.0, 500.0 + i as f32 * 10.0))
            .collect();
        for (port, target) in targets.iter().enumerate() {
            link(&mut graph, switch, port, *target, 0);
        }

        let mut fixture = Fixture::new(graph);
        let parent = fixture.view.layout(fixture.mapping.get(switch).unwrap()).unwrap();
        fixture.align(&[ElementId::Node(switch)], false);

        let metrics = LayoutMetrics::default();
        let mut xs = Vec::new();
        for (index, target) in targets.iter().enumerate() {
            let position = fixture.position(*target);
            let width = fixture.view.layout(fixture.mapping.get(*target).unwrap()).unwrap().width();
            let spread = (index + 1) as f32 / 4.0 * 2.0 - 1.0;
            assert_eq!(position.x, parent.center().x + spread * metrics.branch_spread - width * 0.5);
            assert_eq!(position.y, parent.bottom() + metrics.vertical_offset);
            xs.push(position.x);
        }
        assert!(xs[0] < xs[1] && xs[1] < xs[2]);
        assert_eq!(xs[1] - xs[0], xs[2] - xs[1]);
    }

    #[test]
    fn test_repeated_exec_edges_drop_below_right() {
        let registry = create_gameplay_registry();
        let mut graph = Graph::new("Test");
        let branch = spawn(&mut graph, &registry, "branch", 0.0, 0.0);
        let print = spawn(&mut graph, &registry, "print_string", 400.0, 400.0);
        link(&mut graph, branch, 0, print, 0);
        link(&mut graph, branch, 1, print, 0);

        let mut fixture = Fixture::new(graph);
        assert_eq!(fixture.manager.store().count(branch, print), 2);
        let parent = fixture.view.layout(fixture.mapping.get(branch).unwrap()).unwrap();
        fixture.align(&[ElementId::Node(branch)], false);

        assert_eq!(fixture.position(print), Pos2::new(parent.left() + 30.0, parent.bottom() + 30.0));
    }

    #[test]
    fn test_data_producer_sits_left_with_ports_level() {
        let mut graph = Graph::new("Test");
        let getter = graph.add_node(
            Node::with_ports("Get", vec![], vec![Port::output("Value", PortType::Float)]).with_position(0.0, 0.0),
        );
        let consumer = graph.add_node(
            Node::with_ports(
                "Use",
                vec![Port::input("In", PortType::Exec), Port::input("Value", PortType::Float)],
                vec![],
            )
            .with_position(300.0, 100.0),
        );
        link(&mut graph, getter, 0, consumer, 1);

        let mut fixture = Fixture::new(graph);
        fixture.align(&[ElementId::Node(consumer)], false);

        // Consumer's second input row vs getter's first output row
        let expected_y = 100.0 + (24.0 + 22.0 + 11.0) - (24.0 + 11.0);
        assert_eq!(fixture.position(getter), Pos2::new(300.0 - 30.0 - 180.0, expected_y));
        assert_eq!(fixture.graph.node(getter).unwrap().position, [90.0, expected_y]);
    }

    #[test]
    fn test_data_consumer_sits_right_of_output() {
        let mut graph = Graph::new("Test");
        let parent = graph.add_node(
            Node::with_ports("Parent", vec![Port::input("Value", PortType::Float)], vec![]).with_position(0.0, 0.0),
        );
        let producer = graph.add_node(
            Node::with_ports("Producer", vec![], vec![Port::output("Value", PortType::Float)]).with_position(50.0, 50.0),
        );
        link(&mut graph, producer, 0, parent, 0);

        let mut fixture = Fixture::new(graph);
        let dependency = *fixture.manager.store().get(parent, producer).unwrap();
        // Seen from the producer's output side the consumer goes right
        let Dependency::Linked(mut linked) = dependency else {
            panic!("expected linked dependency");
        };
        let (producer_port, parent_port) = (linked.dependent_port, linked.parent_port);
        linked.dependent = parent;
        linked.parent_port = producer_port;
        linked.dependent_port = parent_port;

        let position = AlignmentEngine::new(
            &mut fixture.graph,
            &mut fixture.view,
            &fixture.mapping,
            &fixture.manager,
            LayoutMetrics::default(),
        )
        .aligned_position(producer, &Dependency::Linked(linked))
        .unwrap();
        assert_eq!(position.x, 50.0 + 180.0 + 30.0);
        assert_eq!(position.y, 50.0);
    }

    #[test]
    fn test_loop_body_tucked_diagonally() {
        let registry = create_gameplay_registry();
        let mut graph = Graph::new("Test");
        let for_each = spawn(&mut graph, &registry, "for_each", 0.0, 0.0);
        let body = spawn(&mut graph, &registry, "stack", 600.0, 600.0);
        link(&mut graph, for_each, 0, body, 0);

        let mut fixture = Fixture::new(graph);
        fixture.align(&[ElementId::Node(for_each)], false);

        // Loop port sits on the right edge, first row
        assert_eq!(fixture.position(body), Pos2::new(180.0 + 10.0, 24.0 + 11.0 + 10.0));
    }

    #[test]
    fn test_follow_realigns_whole_chain() {
        let registry = create_gameplay_registry();
        let mut graph = Graph::new("Test");
        let a = spawn(&mut graph, &registry, "event_begin_play", 0.0, 0.0);
        let b = spawn(&mut graph, &registry, "print_string", 700.0, 20.0);
        let c = spawn(&mut graph, &registry, "print_string", -300.0, 900.0);
        link(&mut graph, a, 0, b, 0);
        link(&mut graph, b, 0, c, 0);

        let mut fixture = Fixture::new(graph);
        fixture.align(&[ElementId::Node(a)], true);

        let b_rect = fixture.view.layout(fixture.mapping.get(b).unwrap()).unwrap();
        // Single output port: centred below the parent
        assert_eq!(fixture.position(b), Pos2::new(0.0, 24.0 + 22.0 + 6.0 + 30.0));
        assert_eq!(fixture.position(c), Pos2::new(b_rect.left(), b_rect.bottom() + 30.0));
    }

    #[test]
    fn test_without_follow_descendants_move_rigidly() {
        let registry = create_gameplay_registry();
        let mut graph = Graph::new("Test");
        let a = spawn(&mut graph, &registry, "event_begin_play", 0.0, 0.0);
        let b = spawn(&mut graph, &registry, "print_string", 700.0, 20.0);
        let c = spawn(&mut graph, &registry, "print_string", -300.0, 900.0);
        link(&mut graph, a, 0, b, 0);
        link(&mut graph, b, 0, c, 0);

        let mut fixture = Fixture::new(graph);
        let b_before = fixture.position(b);
        let c_before = fixture.position(c);
        let moved = fixture.align(&[ElementId::Node(a)], false);

        let delta = fixture.position(b) - b_before;
        assert_eq!(fixture.position(c), c_before + delta);
        assert_eq!(moved, vec![b, c]);
    }

    #[test]
    fn test_selected_edge_aligns_only_its_dependent() {
        let registry = create_gameplay_registry();
        let mut graph = Graph::new("Test");
        let a = spawn(&mut graph, &registry, "event_begin_play", 0.0, 0.0);
        let b = spawn(&mut graph, &registry, "print_string", 700.0, 20.0);
        let c = spawn(&mut graph, &registry, "print_string", -300.0, 900.0);
        let edge = link(&mut graph, a, 0, b, 0);
        link(&mut graph, b, 0, c, 0);

        let mut fixture = Fixture::new(graph);
        let c_before = fixture.position(c);
        let moved = fixture.align(&[ElementId::Connection(edge)], false);

        assert_eq!(moved, vec![b]);
        assert_eq!(fixture.position(c), c_before);
    }

    #[test]
    fn test_top_most_ignores_selected_dependents() {
        let registry = create_gameplay_registry();
        let mut graph = Graph::new("Test");
        let a = spawn(&mut graph, &registry, "event_begin_play", 0.0, 0.0);
        let b = spawn(&mut graph, &registry, "print_string", 700.0, 20.0);
        let c = spawn(&mut graph, &registry, "print_string", -300.0, 900.0);
        link(&mut graph, a, 0, b, 0);
        link(&mut graph, b, 0, c, 0);

        let mut fixture = Fixture::new(graph);
        let engine = AlignmentEngine::new(
            &mut fixture.graph,
            &mut fixture.view,
            &fixture.mapping,
            &fixture.manager,
            LayoutMetrics::default(),
        );
        let top = engine.top_most_nodes(&[ElementId::Node(c), ElementId::Node(a), ElementId::Node(b)]);
        assert_eq!(top.into_iter().collect::<Vec<_>>(), vec![a]);
    }

    #[test]
    fn test_stacked_child_reads_back_layout() {
        let registry = create_gameplay_registry();
        let mut graph = Graph::new("Test");
        let stack = spawn(&mut graph, &registry, "stack", 100.0, 100.0);
        let child = spawn(&mut graph, &registry, "print_string", 0.0, 0.0);
        graph.insert_into_stack(stack, child, 0).unwrap();

        let mut fixture = Fixture::new(graph);
        let laid_out = fixture.position(child);
        assert_ne!(fixture.graph.node(child).unwrap().position, [laid_out.x, laid_out.y]);

        fixture.align(&[ElementId::Node(stack)], false);
        assert_eq!(fixture.graph.node(child).unwrap().position, [laid_out.x, laid_out.y]);
        assert_eq!(fixture.position(child), laid_out);
    }

    #[test]
    fn test_alignment_is_undoable() {
        let registry = create_gameplay_registry();
        let mut graph = Graph::new("Test");
        let a = spawn(&mut graph, &registry, "event_begin_play", 0.0, 0.0);
        let b = spawn(&mut graph, &registry, "print_string", 700.0, 20.0);
        link(&mut graph, a, 0, b, 0);

        let mut fixture = Fixture::new(graph);
        fixture.align(&[ElementId::Node(a)], false);
        assert_ne!(fixture.graph.node(b).unwrap().position, [700.0, 20.0]);

        fixture.history.undo(&mut fixture.graph).unwrap();
        assert_eq!(fixture.graph.node(b).unwrap().position, [700.0, 20.0]);
    }

    #[test]
    fn test_nothing_to_align_records_nothing() {
        let mut graph = Graph::new("Test");
        let lonely = graph.add_node(Node::with_ports("Alone", vec![], vec![]));
        let mut fixture = Fixture::new(graph);
        assert!(fixture.align(&[ElementId::Node(lonely)], true).is_empty());
        assert!(!fixture.history.can_undo());
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Incremental synchronisation of visuals with the graph model.
//!
//! A partial pass classifies the change-list, works out which visuals must go
//! and which must be rebuilt, then commits in four phases:
//! 1. [`PartialRebuilder::delete_edge_models`]
//! 2. [`PartialRebuilder::delete_graph_elements`]
//! 3. [`PartialRebuilder::rebuild_nodes`]
//! 4. [`PartialRebuilder::rebuild_edges`]
//!
//! Deletions always finish before creations start, and node visuals exist
//! before any edge is reconnected. [`full_rebuild`] is the reference: a
//! partial pass must leave the same mapping a full rebuild would.

use crate::mover::PositionDependenciesManager;
use crate::view::{PortAnchor, ViewLayer, ViewMapping};
use indexmap::IndexSet;
use scriptgraph_model::{ChangeList, ConnectionId, ElementId, Graph, NodeId, NodeKind, VariableOwner};

/// Visual churn of one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildStats {
    /// Visuals created
    pub created: usize,
    /// Visuals destroyed
    pub deleted: usize,
    /// Whether the pass recreated everything
    pub full: bool,
}

/// Everything a commit phase writes to
pub struct RebuildTarget<'a> {
    /// Model being mirrored
    pub graph: &'a Graph,
    /// Visual toolkit
    pub view: &'a mut dyn ViewLayer,
    /// Model to visual association
    pub mapping: &'a mut ViewMapping,
    /// Dependencies follow edge and stack visuals
    pub dependencies: &'a mut PositionDependenciesManager,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    Idle,
    Computed,
    EdgesDeleted,
    ElementsDeleted,
    NodesRebuilt,
    Done,
}

/// One partial reconciliation pass
#[derive(Debug)]
pub struct PartialRebuilder {
    to_delete: IndexSet<ElementId>,
    nodes_to_rebuild: IndexSet<NodeId>,
    others_to_rebuild: IndexSet<ElementId>,
    edges_to_rebuild: IndexSet<ConnectionId>,
    side_panel_changed: bool,
    stats: RebuildStats,
    phase: Phase,
    verbose: bool,
}

impl PartialRebuilder {
    /// Start a pass
    pub fn new(verbose: bool) -> Self {
        Self {
            to_delete: IndexSet::new(),
            nodes_to_rebuild: IndexSet::new(),
            others_to_rebuild: IndexSet::new(),
            edges_to_rebuild: IndexSet::new(),
            side_panel_changed: false,
            stats: RebuildStats::default(),
            phase: Phase::Idle,
            verbose,
        }
    }

    /// Elements whose visuals will be destroyed
    pub fn to_delete(&self) -> &IndexSet<ElementId> {
        &self.to_delete
    }

    /// Nodes whose visuals will be recreated
    pub fn nodes_to_rebuild(&self) -> &IndexSet<NodeId> {
        &self.nodes_to_rebuild
    }

    /// Decorations (and unresolved elements) to recreate
    pub fn others_to_rebuild(&self) -> &IndexSet<ElementId> {
        &self.others_to_rebuild
    }

    /// Edges to reconnect
    pub fn edges_to_rebuild(&self) -> &IndexSet<ConnectionId> {
        &self.edges_to_rebuild
    }

    /// Whether the blackboard needs refreshing
    pub fn side_panel_changed(&self) -> bool {
        self.side_panel_changed
    }

    /// Churn so far
    pub fn stats(&self) -> RebuildStats {
        self.stats
    }

    /// Work out what to delete and rebuild
    pub fn compute_changes(&mut self, graph: &Graph, changes: &ChangeList, mapping: &ViewMapping) {
        debug_assert_eq!(self.phase, Phase::Idle, "compute_changes called twice in one pass");

        self.gather_changes(graph, changes);
        self.resolve_container_effects(graph, changes, mapping);
        self.propagate_to_edges(graph);
        self.normalize_stacks(graph, mapping);
        self.prune_deleted();
        self.mark_rebuilt_edges_for_deletion(mapping);

        if self.verbose {
            tracing::debug!(
                "Partial rebuild: {} to delete, {} nodes, {} others, {} edges to rebuild",
                self.to_delete.len(),
                self.nodes_to_rebuild.len(),
                self.others_to_rebuild.len(),
                self.edges_to_rebuild.len()
            );
        }
        self.phase = Phase::Computed;
    }

    fn gather_changes(&mut self, graph: &Graph, changes: &ChangeList) {
        for element in &changes.changed {
            match *element {
                ElementId::Connection(id) => {
                    if changes.is_deleted(*element) {
                        self.to_delete.insert(*element);
                    } else {
                        self.edges_to_rebuild.insert(id);
                    }
                }
                ElementId::Node(id) => match graph.node(id) {
                    Some(node) => {
                        if let NodeKind::VariableReference { variable } = node.kind {
                            if variable.and_then(|v| graph.variable(v)).is_none() {
                                self.side_panel_changed = true;
                            }
                        }
                        self.nodes_to_rebuild.insert(id);
                    }
                    None if changes.is_deleted(*element) => {
                        self.nodes_to_rebuild.insert(id);
                    }
                    None => {
                        if self.verbose {
                            tracing::warn!("Changed element {:?} not found in graph; rebuilding generically", element);
                        }
                        self.others_to_rebuild.insert(*element);
                    }
                },
                ElementId::Variable(id) => match graph.variable(id).map(|v| v.owner) {
                    Some(VariableOwner::Function(function)) => {
                        self.nodes_to_rebuild.insert(function);
                    }
                    Some(VariableOwner::Graph) | None => self.side_panel_changed = true,
                },
                ElementId::Placemat(_) | ElementId::StickyNote(_) => {
                    self.others_to_rebuild.insert(*element);
                }
            }
        }

        if changes.blackboard_changed {
            self.side_panel_changed = true;
        }
    }

    fn resolve_container_effects(&mut self, graph: &Graph, changes: &ChangeList, mapping: &ViewMapping) {
        for element in mapping.elements() {
            if graph.is_live(element) {
                continue;
            }
            self.to_delete.insert(element);
            if let ElementId::Node(node) = element {
                for edge in mapping.edges_of(node) {
                    self.to_delete.insert(ElementId::Connection(edge));
                }
            }
        }

        for element in &changes.deleted {
            if matches!(element, ElementId::Connection(_)) && mapping.contains(*element) {
                self.to_delete.insert(*element);
            }
        }
    }

    fn propagate_to_edges(&mut self, graph: &Graph) {
        for node in &self.nodes_to_rebuild {
            if !graph.is_live(ElementId::Node(*node)) {
                continue;
            }
            for connection in graph.connections_for_node(*node) {
                self.edges_to_rebuild.insert(connection.id);
            }
        }
    }

    fn normalize_stacks(&mut self, graph: &Graph, mapping: &ViewMapping) {
        let owners: Vec<NodeId> = self
            .nodes_to_rebuild
            .iter()
            .filter_map(|n| graph.node(*n).and_then(|node| node.stack))
            .collect();
        self.nodes_to_rebuild.extend(owners);

        let stacks: Vec<NodeId> = self
            .nodes_to_rebuild
            .iter()
            .copied()
            .filter(|n| graph.node(*n).is_some_and(|node| node.is_stack()))
            .collect();

        for stack in stacks {
            let Some(node) = graph.node(stack) else {
                continue;
            };
            for connection in graph.connections_for_node(stack) {
                self.edges_to_rebuild.insert(connection.id);
            }
            for child in node.stack_children() {
                self.nodes_to_rebuild.shift_remove(child);
                for connection in graph.connections_for_node(*child) {
                    self.edges_to_rebuild.insert(connection.id);
                }
                if mapping.contains(*child) {
                    self.to_delete.insert(ElementId::Node(*child));
                }
            }
        }
    }

    fn prune_deleted(&mut self) {
        let to_delete = &self.to_delete;
        self.nodes_to_rebuild.retain(|n| !to_delete.contains(&ElementId::Node(*n)));
        self.edges_to_rebuild.retain(|e| !to_delete.contains(&ElementId::Connection(*e)));
        self.others_to_rebuild.retain(|e| !to_delete.contains(e));
    }

    fn mark_rebuilt_edges_for_deletion(&mut self, mapping: &ViewMapping) {
        for edge in &self.edges_to_rebuild {
            if mapping.contains(*edge) {
                self.to_delete.insert(ElementId::Connection(*edge));
            }
        }
    }

    /// Phase 1: detach and destroy edge visuals queued for deletion
    pub fn delete_edge_models(&mut self, target: &mut RebuildTarget<'_>) {
        debug_assert_eq!(self.phase, Phase::Computed, "delete_edge_models out of order");

        for element in &self.to_delete {
            if let ElementId::Connection(edge) = *element {
                if remove_edge_visual(target, edge) {
                    self.stats.deleted += 1;
                }
            }
        }
        self.phase = Phase::EdgesDeleted;
    }

    /// Phase 2: destroy every other visual queued for deletion
    pub fn delete_graph_elements(&mut self, target: &mut RebuildTarget<'_>) {
        debug_assert_eq!(self.phase, Phase::EdgesDeleted, "delete_graph_elements out of order");

        for element in &self.to_delete {
            if matches!(element, ElementId::Connection(_)) {
                continue;
            }
            if remove_element_visual(target, *element) {
                self.stats.deleted += 1;
            }
        }
        self.phase = Phase::ElementsDeleted;
    }

    /// Phase 3: create or replace node and decoration visuals
    pub fn rebuild_nodes(&mut self, target: &mut RebuildTarget<'_>) {
        debug_assert_eq!(self.phase, Phase::ElementsDeleted, "rebuild_nodes out of order");

        let elements: Vec<ElementId> = self
            .nodes_to_rebuild
            .iter()
            .map(|n| ElementId::Node(*n))
            .chain(self.others_to_rebuild.iter().copied())
            .collect();

        for element in &elements {
            if remove_element_visual(target, *element) {
                self.stats.deleted += 1;
            }
        }
        for element in elements {
            self.stats.created += create_element_visual(target, element);
        }
        self.phase = Phase::NodesRebuilt;
    }

    /// Phase 4: recreate edges against the current port visuals
    pub fn rebuild_edges(&mut self, target: &mut RebuildTarget<'_>) {
        debug_assert_eq!(self.phase, Phase::NodesRebuilt, "rebuild_edges out of order");

        for edge in &self.edges_to_rebuild {
            if remove_edge_visual(target, *edge) {
                self.stats.deleted += 1;
            }
            if create_edge_visual(target, *edge, self.verbose) {
                self.stats.created += 1;
            }
        }
        self.phase = Phase::Done;
    }

    /// Run all phases in order
    pub fn run(mut self, target: &mut RebuildTarget<'_>, changes: &ChangeList) -> (RebuildStats, bool) {
        self.compute_changes(target.graph, changes, target.mapping);
        self.delete_edge_models(target);
        self.delete_graph_elements(target);
        self.rebuild_nodes(target);
        self.rebuild_edges(target);
        (self.stats, self.side_panel_changed)
    }
}

/// Destroy every visual and recreate the whole graph.
///
/// Order: placemats by z-order, sticky notes, nodes (stacks bring their
/// children), then edges.
pub fn full_rebuild(target: &mut RebuildTarget<'_>, verbose: bool) -> RebuildStats {
    let mut stats = RebuildStats {
        full: true,
        ..RebuildStats::default()
    };

    let existing: Vec<ElementId> = target.mapping.elements().collect();
    for element in existing.iter().filter(|e| matches!(e, ElementId::Connection(_))) {
        if let ElementId::Connection(edge) = *element {
            if remove_edge_visual(target, edge) {
                stats.deleted += 1;
            }
        }
    }
    for element in existing.iter().filter(|e| !matches!(e, ElementId::Connection(_))) {
        if remove_element_visual(target, *element) {
            stats.deleted += 1;
        }
    }
    target.mapping.clear();
    target.dependencies.clear();

    let graph = target.graph;
    let mut placemats: Vec<_> = graph.placemats().collect();
    placemats.sort_by_key(|p| p.z_order);

    let mut elements: Vec<ElementId> = placemats.iter().map(|p| ElementId::Placemat(p.id)).collect();
    elements.extend(graph.sticky_notes().map(|s| ElementId::StickyNote(s.id)));
    elements.extend(graph.nodes().filter(|n| !n.is_stacked()).map(|n| ElementId::Node(n.id)));

    for element in elements {
        stats.created += create_element_visual(target, element);
    }
    let edges: Vec<ConnectionId> = graph.connections().map(|c| c.id).collect();
    for edge in edges {
        if create_edge_visual(target, edge, verbose) {
            stats.created += 1;
        }
    }

    stats
}

fn remove_edge_visual(target: &mut RebuildTarget<'_>, edge: ConnectionId) -> bool {
    let element = ElementId::Connection(edge);
    let Some(visual) = target.mapping.get(element) else {
        return false;
    };
    if let Some(endpoints) = target.mapping.edge_endpoints(edge) {
        target.dependencies.remove_connection_dependency(endpoints);
    }
    target.view.disconnect_edge(visual);
    target.view.dispose_visual(visual);
    target.mapping.remove(element);
    true
}

fn remove_element_visual(target: &mut RebuildTarget<'_>, element: ElementId) -> bool {
    let Some(visual) = target.mapping.get(element) else {
        return false;
    };
    if let ElementId::Node(node) = element {
        let previous = target.mapping.stack_children(node).to_vec();
        target.dependencies.register_stack_children(node, &previous, &[]);
        if !target.graph.is_live(element) {
            target.dependencies.remove_node(node);
        }
    }
    target.view.dispose_visual(visual);
    target.mapping.remove(element);
    true
}

/// Create the visual for one element (a stack brings its children).
/// Returns the number of visuals created.
fn create_element_visual(target: &mut RebuildTarget<'_>, element: ElementId) -> usize {
    let graph = target.graph;
    if !graph.is_live(element) {
        return 0;
    }
    if let ElementId::Node(node) = element {
        if graph.node(node).is_some_and(|n| n.is_stacked()) {
            return 0;
        }
    }

    let Some(visual) = target.view.create_visual(graph, element) else {
        return 0;
    };
    target.mapping.insert(element, visual);
    let mut created = 1;

    let ElementId::Node(stack) = element else {
        return created;
    };
    let Some(node) = graph.node(stack).filter(|n| n.is_stack()) else {
        return created;
    };

    let children = node.stack_children().to_vec();
    for (index, child) in children.iter().enumerate() {
        let child_element = ElementId::Node(*child);
        if let Some(stale) = target.mapping.remove(child_element) {
            target.view.dispose_visual(stale);
        }
        if let Some(child_visual) = target.view.create_visual(graph, child_element) {
            target.view.attach_to_stack(visual, child_visual, index);
            target.mapping.insert(child_element, child_visual);
            created += 1;
        }
    }
    target.view.relayout_stack(visual);
    target.dependencies.register_stack_children(stack, &[], &children);
    target.mapping.set_stack_children(stack, children);
    created
}

fn create_edge_visual(target: &mut RebuildTarget<'_>, edge: ConnectionId, verbose: bool) -> bool {
    let graph = target.graph;
    let element = ElementId::Connection(edge);
    if !graph.is_live(element) {
        return false;
    }
    let Some(connection) = graph.connection(edge) else {
        return false;
    };

    let (Some(from), Some(to)) = (target.mapping.get(connection.from_node), target.mapping.get(connection.to_node)) else {
        if verbose {
            tracing::debug!("Edge {:?} has an endpoint without a visual; not reconnecting", edge);
        }
        return false;
    };
    let Some(visual) = target.view.create_visual(graph, element) else {
        return false;
    };

    target.view.connect_edge(
        visual,
        PortAnchor { node: from, port: connection.from_port },
        PortAnchor { node: to, port: connection.to_port },
    );
    target.mapping.insert(element, visual);
    let endpoints = target.dependencies.add_connection_dependency(graph, connection);
    target.mapping.set_edge_endpoints(edge, endpoints);
    true
}

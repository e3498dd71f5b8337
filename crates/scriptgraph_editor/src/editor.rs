// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph editor controller.
//!
//! Owns the view mapping, the dependency store, undo history and the visual
//! state of one open graph, and routes host events (rebuilds, drags, align
//! requests, frame ends) to the engines that handle them.

use crate::align::AlignmentEngine;
use crate::config::EditorPreferences;
use crate::history::{History, HistoryError, OperationID};
use crate::mover::PositionDependenciesManager;
use crate::reconcile::{full_rebuild, PartialRebuilder, RebuildStats, RebuildTarget};
use crate::scheduler::FrameScheduler;
use crate::view::{ViewLayer, ViewMapping};
use crate::view_state::ViewState;
use egui::{Pos2, Vec2};
use scriptgraph_model::{ChangeList, ElementId, Graph, GraphId, NodeId};

/// Editor state for one graph view
#[derive(Debug)]
pub struct GraphEditor {
    preferences: EditorPreferences,
    mapping: ViewMapping,
    dependencies: PositionDependenciesManager,
    history: History,
    view_state: ViewState,
    scheduler: FrameScheduler,
    built_graph: Option<GraphId>,
    force_full_rebuild: bool,
    side_panel_dirty: bool,
    last_stats: RebuildStats,
}

impl GraphEditor {
    /// Create an editor with nothing built yet
    pub fn new(preferences: EditorPreferences) -> Self {
        Self {
            dependencies: PositionDependenciesManager::new(preferences.verbose_diagnostics),
            history: History::with_max_depth(preferences.history_depth),
            scheduler: FrameScheduler::new(preferences.verbose_diagnostics),
            preferences,
            mapping: ViewMapping::new(),
            view_state: ViewState::new(),
            built_graph: None,
            force_full_rebuild: false,
            side_panel_dirty: false,
            last_stats: RebuildStats::default(),
        }
    }

    /// Current preferences
    pub fn preferences(&self) -> &EditorPreferences {
        &self.preferences
    }

    /// Replace the preferences. Undo depth only applies to new editors.
    pub fn set_preferences(&mut self, preferences: EditorPreferences) {
        self.dependencies.set_verbose(preferences.verbose_diagnostics);
        self.scheduler.set_verbose(preferences.verbose_diagnostics);
        self.preferences = preferences;
    }

    /// Model to visual association
    pub fn mapping(&self) -> &ViewMapping {
        &self.mapping
    }

    /// Position dependencies
    pub fn dependencies(&self) -> &PositionDependenciesManager {
        &self.dependencies
    }

    /// Undo history
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Pan, zoom and selection
    pub fn view_state(&self) -> &ViewState {
        &self.view_state
    }

    /// Mutable pan, zoom and selection
    pub fn view_state_mut(&mut self) -> &mut ViewState {
        &mut self.view_state
    }

    /// Churn of the last pass
    pub fn last_stats(&self) -> RebuildStats {
        self.last_stats
    }

    /// Whether the blackboard needs refreshing; clears the flag
    pub fn take_side_panel_dirty(&mut self) -> bool {
        std::mem::take(&mut self.side_panel_dirty)
    }

    /// Force the next pass to recreate everything
    pub fn request_full_rebuild(&mut self) {
        self.force_full_rebuild = true;
    }

    /// Bring the view in line with `graph`.
    ///
    /// Rebuilds partially from `changes` when possible; without a change-list,
    /// on first build, or when the graph changed identity, recreates all
    /// visuals instead.
    pub fn rebuild(&mut self, graph: &Graph, view: &mut dyn ViewLayer, changes: Option<&ChangeList>) -> RebuildStats {
        let verbose = self.preferences.verbose_diagnostics;
        let full = self.force_full_rebuild
            || self.preferences.always_full_rebuild
            || self.built_graph != Some(graph.id);

        let mut target = RebuildTarget {
            graph,
            view: &mut *view,
            mapping: &mut self.mapping,
            dependencies: &mut self.dependencies,
        };
        let stats = match changes {
            Some(changes) if !full => {
                let (stats, side_panel_changed) = PartialRebuilder::new(verbose).run(&mut target, changes);
                self.side_panel_dirty |= side_panel_changed;
                stats
            }
            _ => {
                self.side_panel_dirty = true;
                full_rebuild(&mut target, verbose)
            }
        };

        self.built_graph = Some(graph.id);
        self.force_full_rebuild = false;
        apply_placemat_visibility(graph, view, &self.mapping);
        let pruned = self.view_state.selection.retain_live(graph);

        if self.preferences.log_rebuild_stats {
            tracing::info!(
                "Rebuilt graph '{}' ({}): {} created, {} deleted, {} pruned from selection",
                graph.name,
                if stats.full { "full" } else { "partial" },
                stats.created,
                stats.deleted,
                pruned
            );
        }
        self.last_stats = stats;
        stats
    }

    /// Drain the graph's change-list and rebuild from it
    pub fn update(&mut self, graph: &mut Graph, view: &mut dyn ViewLayer) -> RebuildStats {
        let changes = graph.take_changes();
        self.rebuild(graph, view, Some(&changes))
    }

    /// Start dragging the selected nodes
    pub fn start_drag(&mut self, graph: &Graph, view: &dyn ViewLayer) {
        let selection = self.view_state.selection.elements();
        self.dependencies.start_notify_move(graph, view, &self.mapping, &selection);
    }

    /// Move the dragged nodes to `start + delta` and cascade to dependents
    pub fn drag_to(&mut self, view: &mut dyn ViewLayer, delta: Vec2) {
        let roots = self.dependencies.moving_roots().to_vec();
        for root in &roots {
            if let Some(visual) = self.mapping.get(*root) {
                if let Some(start) = self.drag_origin(*root) {
                    view.set_position(visual, start + delta);
                }
            }
        }
        self.dependencies.process_moved_nodes(view, &self.mapping, delta);
    }

    fn drag_origin(&self, node: NodeId) -> Option<Pos2> {
        self.dependencies.drag_start_position(node)
    }

    /// Abort the drag, restoring every dragged visual
    pub fn cancel_drag(&mut self, view: &mut dyn ViewLayer) {
        let roots = self.dependencies.moving_roots().to_vec();
        for root in roots {
            if let (Some(visual), Some(start)) = (self.mapping.get(root), self.drag_origin(root)) {
                view.set_position(visual, start);
            }
        }
        self.dependencies.cancel_move(view, &self.mapping);
    }

    /// Finish the drag, committing positions as one undoable step
    pub fn end_drag(&mut self, graph: &mut Graph, view: &dyn ViewLayer) -> Result<bool, HistoryError> {
        self.dependencies.stop_notify_move(graph, view, &self.mapping, &mut self.history)
    }

    /// Align the dependents of the current selection
    pub fn align_selection(
        &mut self,
        graph: &mut Graph,
        view: &mut dyn ViewLayer,
        follow: bool,
    ) -> Result<Vec<NodeId>, HistoryError> {
        let selection = self.view_state.selection.elements();
        self.align_nodes(graph, view, &selection, follow)
    }

    /// Align the dependents of `selection`
    pub fn align_nodes(
        &mut self,
        graph: &mut Graph,
        view: &mut dyn ViewLayer,
        selection: &[ElementId],
        follow: bool,
    ) -> Result<Vec<NodeId>, HistoryError> {
        AlignmentEngine::new(graph, view, &self.mapping, &self.dependencies, self.preferences.layout)
            .verbose(self.preferences.verbose_diagnostics)
            .align_nodes(&mut self.history, selection, follow)
    }

    /// Note that nodes were dropped into `stack`; it is laid out at frame end
    pub fn notify_stack_insertion(&mut self, stack: NodeId) {
        self.scheduler.schedule_stack(stack);
    }

    /// Run end-of-frame work. Returns the number of stacks laid out.
    pub fn end_frame(&mut self, graph: &mut Graph, view: &mut dyn ViewLayer) -> usize {
        self.scheduler.end_frame(graph, view, &self.mapping)
    }

    /// Undo the last step. The next pass rebuilds fully.
    pub fn undo(&mut self, graph: &mut Graph) -> Result<OperationID, HistoryError> {
        let id = self.history.undo(graph)?;
        self.force_full_rebuild = true;
        Ok(id)
    }

    /// Redo the last undone step. The next pass rebuilds fully.
    pub fn redo(&mut self, graph: &mut Graph) -> Result<OperationID, HistoryError> {
        let id = self.history.redo(graph)?;
        self.force_full_rebuild = true;
        Ok(id)
    }
}

/// Hide nodes lying under a collapsed placemat
fn apply_placemat_visibility(graph: &Graph, view: &mut dyn ViewLayer, mapping: &ViewMapping) {
    let collapsed: Vec<_> = graph.placemats().filter(|p| p.collapsed).collect();

    for node in graph.nodes() {
        let Some(visual) = mapping.get(node.id) else {
            continue;
        };
        let anchor = node.stack.and_then(|s| graph.node(s)).unwrap_or(node);
        let hidden = collapsed.iter().any(|p| p.contains(anchor.position));
        view.set_visible(visual, !hidden);
    }
}

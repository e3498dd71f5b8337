// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scripted editing session.
//!
//! Builds a small gameplay graph and walks it through the interactions a
//! user would perform: drags, alignment, stack insertion, deletion and undo.

use egui::Vec2;
use scriptgraph_editor::{EditorPreferences, GraphEditor, HistoryError, RebuildStats, RecordingView, SelectMode};
use scriptgraph_model::gameplay::create_gameplay_registry;
use scriptgraph_model::{
    ConnectionError, ConnectionId, ElementId, Graph, NodeId, NodeKind, NodeRegistry, Placemat, PortType,
    StackError, StickyNote, VariableDeclaration, VariableOwner,
};
use std::path::Path;
use thiserror::Error;

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// Undo history failed
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    /// An edge could not be created
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// A stack insertion failed
    #[error("Stack error: {0}")]
    Stack(#[from] StackError),

    /// The registry has no such node type
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// A node lacks the requested port
    #[error("Node {node:?} has no port at index {index}")]
    MissingPort {
        /// Node looked up
        node: NodeId,
        /// Port index requested
        index: usize,
    },

    /// Output could not be serialized
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// Output could not be written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What a session did
#[derive(Debug, Default)]
pub struct SessionReport {
    /// Stats of every rebuild pass, in order
    pub passes: Vec<RebuildStats>,
    /// Nodes moved by alignment
    pub aligned: usize,
    /// Stacks laid out at frame ends
    pub relayouts: usize,
    /// Undo steps left at the end
    pub undo_depth: usize,
}

/// A graph, its view and the editor driving both
pub struct Session {
    graph: Graph,
    view: RecordingView,
    editor: GraphEditor,
    registry: NodeRegistry,
}

impl Session {
    /// Create an empty session
    pub fn new(preferences: EditorPreferences) -> Self {
        Self {
            graph: Graph::new("Gameplay"),
            view: RecordingView::new(),
            editor: GraphEditor::new(preferences),
            registry: create_gameplay_registry(),
        }
    }

    fn spawn(&mut self, type_id: &str, x: f32, y: f32) -> Result<NodeId, SessionError> {
        let node = self
            .registry
            .create_node(type_id)
            .ok_or_else(|| SessionError::UnknownNodeType(type_id.to_string()))?;
        Ok(self.graph.add_node(node.with_position(x, y)))
    }

    fn link(&mut self, from: NodeId, output: usize, to: NodeId, input: usize) -> Result<ConnectionId, SessionError> {
        let out = self
            .graph
            .node(from)
            .and_then(|n| n.output(output))
            .map(|p| p.id)
            .ok_or(SessionError::MissingPort { node: from, index: output })?;
        let inp = self
            .graph
            .node(to)
            .and_then(|n| n.input(input))
            .map(|p| p.id)
            .ok_or(SessionError::MissingPort { node: to, index: input })?;
        Ok(self.graph.connect(from, out, to, inp)?)
    }

    fn pass(&mut self, report: &mut SessionReport) {
        let stats = self.editor.update(&mut self.graph, &mut self.view);
        tracing::info!(
            "{} rebuild: {} created, {} deleted",
            if stats.full { "Full" } else { "Partial" },
            stats.created,
            stats.deleted
        );
        report.passes.push(stats);
    }

    /// Run the scripted interactions
    pub fn run(&mut self) -> Result<SessionReport, SessionError> {
        let mut report = SessionReport::default();

        let alive = self.graph.add_variable(VariableDeclaration::new("Alive", PortType::Bool, VariableOwner::Graph));
        let begin = self.spawn("event_begin_play", 0.0, 0.0)?;
        let branch = self.spawn("branch", 120.0, 160.0)?;
        let getter = self.spawn("get_variable", -200.0, 180.0)?;
        if let Some(node) = self.graph.node_mut(getter) {
            node.kind = NodeKind::VariableReference { variable: Some(alive) };
        }
        let print = self.spawn("print_string", -250.0, 420.0)?;
        let stack = self.spawn("stack", 300.0, 420.0)?;
        let first = self.spawn("print_string", 0.0, 0.0)?;
        let second = self.spawn("print_string", 0.0, 0.0)?;
        self.graph.insert_into_stack(stack, first, 0)?;
        self.graph.insert_into_stack(stack, second, 1)?;
        self.graph.add_placemat(Placemat::new("Start", [-300.0, -60.0], [700.0, 300.0], 0));
        self.graph.add_sticky_note(StickyNote::new("Branch on whether the player is alive", [400.0, 0.0]));

        self.link(begin, 0, branch, 0)?;
        self.link(getter, 0, branch, 1)?;
        self.link(branch, 0, print, 0)?;
        self.link(branch, 1, stack, 0)?;
        self.pass(&mut report);

        // Drag the event node; everything hanging off it follows
        self.editor.view_state_mut().selection.select(begin, SelectMode::Set);
        self.editor.start_drag(&self.graph, &self.view);
        for step in 1..=4 {
            self.editor.drag_to(&mut self.view, Vec2::new(step as f32 * 15.0, step as f32 * 5.0));
        }
        if self.editor.end_drag(&mut self.graph, &self.view)? {
            tracing::info!("Drag committed: {:?}", self.editor.history().undo_description());
        }

        let aligned = self.editor.align_selection(&mut self.graph, &mut self.view, true)?;
        tracing::info!("Aligned {} nodes", aligned.len());
        report.aligned = aligned.len();

        // Drop a third node into the stack
        let third = self.spawn("print_string", 0.0, 0.0)?;
        self.graph.insert_into_stack(stack, third, 2)?;
        self.pass(&mut report);
        self.editor.notify_stack_insertion(stack);
        report.relayouts += self.editor.end_frame(&mut self.graph, &mut self.view);

        self.graph.remove_node(print);
        self.pass(&mut report);

        if self.editor.history().can_undo() {
            let undone = self.editor.undo(&mut self.graph)?;
            tracing::info!("Undid operation {}", undone.value());
            self.pass(&mut report);
        }

        if self.editor.take_side_panel_dirty() {
            tracing::debug!("Blackboard refresh requested");
        }
        report.undo_depth = self.editor.history().stats().undo_count;

        let selected: Vec<ElementId> = self.editor.view_state().selection.elements();
        tracing::debug!("Selection after session: {:?}", selected);
        Ok(report)
    }

    /// Write the graph and view state as RON next to each other
    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        std::fs::write(path, self.graph.to_ron()?)?;
        std::fs::write(path.with_extension("view.ron"), self.editor.view_state().to_ron()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_runs_full_then_partial() {
        let mut session = Session::new(EditorPreferences::default());
        let report = session.run().unwrap();

        assert!(report.passes[0].full);
        assert!(!report.passes[1].full);
        assert!(!report.passes[2].full);
        assert_eq!(report.relayouts, 1);
        assert!(report.aligned > 0);
        assert_eq!(session.editor.mapping().len(), session.view.len());
    }

    #[test]
    fn test_always_full_rebuild_preference() {
        let preferences = EditorPreferences {
            always_full_rebuild: true,
            ..EditorPreferences::default()
        };
        let mut session = Session::new(preferences);
        let report = session.run().unwrap();
        assert!(report.passes.iter().all(|p| p.full));
    }
}

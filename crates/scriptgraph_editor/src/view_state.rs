// SPDX-License-Identifier: MIT OR Apache-2.0
//! Visual state that survives rebuilds.
//!
//! Selection, pan and zoom are keyed by model identity, so neither a partial
//! nor a full rebuild disturbs them. Elements that disappear from the graph
//! are pruned after each pass.

use egui::{Pos2, Rect};
use indexmap::IndexSet;
use scriptgraph_model::{ElementId, Graph, NodeId};
use serde::{Deserialize, Serialize};

/// Zoom limits
const MIN_ZOOM: f32 = 0.1;
const MAX_ZOOM: f32 = 4.0;

/// How a click combines with the current selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectMode {
    /// Replace current selection
    #[default]
    Set,
    /// Add to current selection
    Add,
    /// Remove from current selection
    Remove,
    /// Toggle in current selection
    Toggle,
}

/// Ordered set of selected elements
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    elements: IndexSet<ElementId>,
}

impl Selection {
    /// Create an empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a click on `element`
    pub fn select(&mut self, element: impl Into<ElementId>, mode: SelectMode) {
        let element = element.into();
        match mode {
            SelectMode::Set => {
                self.elements.clear();
                self.elements.insert(element);
            }
            SelectMode::Add => {
                self.elements.insert(element);
            }
            SelectMode::Remove => {
                self.elements.shift_remove(&element);
            }
            SelectMode::Toggle => {
                if !self.elements.shift_remove(&element) {
                    self.elements.insert(element);
                }
            }
        }
    }

    /// Whether an element is selected
    pub fn contains(&self, element: impl Into<ElementId>) -> bool {
        self.elements.contains(&element.into())
    }

    /// Selected elements, in selection order
    pub fn elements(&self) -> Vec<ElementId> {
        self.elements.iter().copied().collect()
    }

    /// Selected nodes, in selection order
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.elements.iter().filter_map(|e| e.as_node())
    }

    /// The most recently selected element
    pub fn primary(&self) -> Option<ElementId> {
        self.elements.last().copied()
    }

    /// Clear the selection
    pub fn clear(&mut self) {
        self.elements.clear();
    }

    /// Whether nothing is selected
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Number of selected elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Drop elements that are no longer live. Returns how many were dropped.
    pub fn retain_live(&mut self, graph: &Graph) -> usize {
        let before = self.elements.len();
        self.elements.retain(|e| graph.is_live(*e));
        before - self.elements.len()
    }
}

/// Pan, zoom and selection of one graph view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewState {
    /// Pan offset (graph space)
    pub pan: [f32; 2],
    /// Zoom level
    pub zoom: f32,
    /// Selected elements
    pub selection: Selection,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            pan: [0.0, 0.0],
            zoom: 1.0,
            selection: Selection::new(),
        }
    }
}

impl ViewState {
    /// Create a state with no pan and unit zoom
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert a screen position to graph space
    pub fn screen_to_graph(&self, screen_pos: Pos2, rect: Rect) -> Pos2 {
        let center = rect.center();
        Pos2::new(
            (screen_pos.x - center.x) / self.zoom - self.pan[0],
            (screen_pos.y - center.y) / self.zoom - self.pan[1],
        )
    }

    /// Convert a graph position to screen space
    pub fn graph_to_screen(&self, graph_pos: Pos2, rect: Rect) -> Pos2 {
        let center = rect.center();
        Pos2::new(
            (graph_pos.x + self.pan[0]) * self.zoom + center.x,
            (graph_pos.y + self.pan[1]) * self.zoom + center.y,
        )
    }

    /// Zoom by `factor`, keeping the graph point under `anchor` fixed
    pub fn zoom_at(&mut self, factor: f32, anchor: Pos2, rect: Rect) {
        let anchor_graph = self.screen_to_graph(anchor, rect);
        let old_zoom = self.zoom;
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        if self.zoom != old_zoom {
            let ratio = old_zoom / self.zoom;
            self.pan[0] = (anchor_graph.x + self.pan[0]) * ratio - anchor_graph.x;
            self.pan[1] = (anchor_graph.y + self.pan[1]) * ratio - anchor_graph.y;
        }
    }

    /// Serialize to RON
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Deserialize from RON
    pub fn from_ron(content: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptgraph_model::Node;

    #[test]
    fn test_select_modes() {
        let a = NodeId::new();
        let b = NodeId::new();
        let mut selection = Selection::new();

        selection.select(a, SelectMode::Set);
        selection.select(b, SelectMode::Add);
        assert_eq!(selection.elements(), vec![ElementId::Node(a), ElementId::Node(b)]);

        selection.select(a, SelectMode::Toggle);
        assert!(!selection.contains(a));
        assert_eq!(selection.primary(), Some(ElementId::Node(b)));

        selection.select(a, SelectMode::Set);
        assert_eq!(selection.len(), 1);
        selection.select(a, SelectMode::Remove);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_retain_live_drops_deleted() {
        let mut graph = Graph::new("Test");
        let kept = graph.add_node(Node::with_ports("Kept", vec![], vec![]));
        let gone = graph.add_node(Node::with_ports("Gone", vec![], vec![]));

        let mut selection = Selection::new();
        selection.select(kept, SelectMode::Add);
        selection.select(gone, SelectMode::Add);
        graph.remove_node(gone);

        assert_eq!(selection.retain_live(&graph), 1);
        assert_eq!(selection.nodes().collect::<Vec<_>>(), vec![kept]);
    }

    #[test]
    fn test_zoom_keeps_anchor_fixed() {
        let rect = Rect::from_min_size(Pos2::ZERO, egui::vec2(800.0, 600.0));
        let mut state = ViewState::new();
        state.pan = [30.0, -20.0];
        let anchor = Pos2::new(600.0, 100.0);
        let before = state.screen_to_graph(anchor, rect);

        state.zoom_at(2.0, anchor, rect);
        assert_eq!(state.zoom, 2.0);
        let after = state.screen_to_graph(anchor, rect);
        assert!((before - after).length() < 1e-3);

        state.zoom_at(100.0, anchor, rect);
        assert_eq!(state.zoom, MAX_ZOOM);
    }

    #[test]
    fn test_ron_round_trip_keeps_selection() {
        let mut state = ViewState::new();
        state.zoom = 1.5;
        state.selection.select(NodeId::new(), SelectMode::Set);

        let restored = ViewState::from_ron(&state.to_ron().unwrap()).unwrap();
        assert_eq!(restored, state);
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory view layer.
//!
//! Lays nodes out with fixed metrics and records every call it receives, so
//! headless runs can inspect exactly what the core asked for and in which
//! order.

use super::{PortAnchor, ViewLayer, VisualId};
use egui::{Pos2, Rect, Vec2};
use indexmap::IndexMap;
use scriptgraph_model::{ElementId, Graph, Node, PortId};

/// Node visual dimensions
const NODE_WIDTH: f32 = 180.0;
const NODE_HEADER_HEIGHT: f32 = 24.0;
const PORT_HEIGHT: f32 = 22.0;
const NODE_FOOTER: f32 = 6.0;

/// Stack visual dimensions
const STACK_PADDING: f32 = 8.0;
const STACK_SPACING: f32 = 4.0;

/// What a visual depicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualKind {
    /// Free-standing or stacked node
    Node,
    /// Stack container
    Stack,
    /// Edge between two ports
    Edge,
    /// Placemat
    Placemat,
    /// Sticky note
    StickyNote,
}

/// A call received by the view
#[derive(Debug, Clone, PartialEq)]
pub enum ViewOp {
    /// Visual created for an element
    Create(ElementId, VisualId),
    /// Visual destroyed
    Dispose(ElementId, VisualId),
    /// Edge attached to its ports
    Connect(VisualId),
    /// Edge detached from its ports
    Disconnect(VisualId),
    /// Visual moved
    Move(VisualId, Pos2),
    /// Stack laid out
    Relayout(VisualId),
}

/// A visual held by [`RecordingView`]
#[derive(Debug, Clone)]
pub struct Visual {
    /// Element depicted
    pub element: ElementId,
    /// What it depicts
    pub kind: VisualKind,
    /// Layout rectangle
    pub rect: Rect,
    /// Whether it is shown
    pub visible: bool,
    /// Port anchors relative to the top-left corner
    pub ports: IndexMap<PortId, Vec2>,
    /// Containing stack visual
    pub parent: Option<VisualId>,
    /// Stacked child visuals
    pub children: Vec<VisualId>,
    /// Endpoints of a connected edge
    pub endpoints: Option<(PortAnchor, PortAnchor)>,
}

/// View layer that keeps visuals in memory and logs every call
#[derive(Debug, Default)]
pub struct RecordingView {
    visuals: IndexMap<VisualId, Visual>,
    next_id: u64,
    ops: Vec<ViewOp>,
}

impl RecordingView {
    /// Create an empty view
    pub fn new() -> Self {
        Self::default()
    }

    /// A visual by handle
    pub fn visual(&self, id: VisualId) -> Option<&Visual> {
        self.visuals.get(&id)
    }

    /// All live visuals
    pub fn visuals(&self) -> impl Iterator<Item = (VisualId, &Visual)> {
        self.visuals.iter().map(|(id, v)| (*id, v))
    }

    /// Number of live visuals
    pub fn len(&self) -> usize {
        self.visuals.len()
    }

    /// Whether no visual is alive
    pub fn is_empty(&self) -> bool {
        self.visuals.is_empty()
    }

    /// Calls received so far
    pub fn ops(&self) -> &[ViewOp] {
        &self.ops
    }

    /// Drain the call log
    pub fn take_ops(&mut self) -> Vec<ViewOp> {
        std::mem::take(&mut self.ops)
    }

    fn allocate(&mut self, visual: Visual) -> VisualId {
        self.next_id += 1;
        let id = VisualId(self.next_id);
        self.ops.push(ViewOp::Create(visual.element, id));
        self.visuals.insert(id, visual);
        id
    }

    fn node_visual(node: &Node) -> Visual {
        let rows = node.inputs.len().max(node.outputs.len()).max(1);
        let height = NODE_HEADER_HEIGHT + rows as f32 * PORT_HEIGHT + NODE_FOOTER;
        let row_center = |index: usize| NODE_HEADER_HEIGHT + index as f32 * PORT_HEIGHT + PORT_HEIGHT * 0.5;

        let mut ports = IndexMap::new();
        for (index, port) in node.inputs.iter().enumerate() {
            ports.insert(port.id, Vec2::new(0.0, row_center(index)));
        }
        for (index, port) in node.outputs.iter().enumerate() {
            ports.insert(port.id, Vec2::new(NODE_WIDTH, row_center(index)));
        }

        let (kind, width) = if node.is_stack() {
            (VisualKind::Stack, NODE_WIDTH + 2.0 * STACK_PADDING)
        } else {
            (VisualKind::Node, NODE_WIDTH)
        };

        Visual {
            element: ElementId::Node(node.id),
            kind,
            rect: Rect::from_min_size(Pos2::new(node.position[0], node.position[1]), Vec2::new(width, height)),
            visible: true,
            ports,
            parent: None,
            children: Vec::new(),
            endpoints: None,
        }
    }

    fn plain_visual(element: ElementId, kind: VisualKind, position: [f32; 2], size: [f32; 2]) -> Visual {
        Visual {
            element,
            kind,
            rect: Rect::from_min_size(Pos2::new(position[0], position[1]), Vec2::new(size[0], size[1])),
            visible: true,
            ports: IndexMap::new(),
            parent: None,
            children: Vec::new(),
            endpoints: None,
        }
    }

    fn translate(&mut self, id: VisualId, delta: Vec2) {
        let children = match self.visuals.get_mut(&id) {
            Some(visual) => {
                visual.rect = visual.rect.translate(delta);
                visual.children.clone()
            }
            None => return,
        };
        for child in children {
            self.translate(child, delta);
        }
    }
}

impl ViewLayer for RecordingView {
    fn create_visual(&mut self, graph: &Graph, element: ElementId) -> Option<VisualId> {
        if !graph.is_live(element) {
            return None;
        }
        let visual = match element {
            ElementId::Node(id) => Self::node_visual(graph.node(id)?),
            ElementId::Connection(_) => Self::plain_visual(element, VisualKind::Edge, [0.0, 0.0], [0.0, 0.0]),
            ElementId::Placemat(id) => {
                let placemat = graph.placemat(id)?;
                Self::plain_visual(element, VisualKind::Placemat, placemat.position, placemat.size)
            }
            ElementId::StickyNote(id) => {
                let note = graph.sticky_note(id)?;
                Self::plain_visual(element, VisualKind::StickyNote, note.position, note.size)
            }
            ElementId::Variable(_) => return None,
        };
        Some(self.allocate(visual))
    }

    fn dispose_visual(&mut self, visual: VisualId) {
        let Some(removed) = self.visuals.shift_remove(&visual) else {
            return;
        };
        if let Some(parent) = removed.parent.and_then(|p| self.visuals.get_mut(&p)) {
            parent.children.retain(|c| *c != visual);
        }
        for child in &removed.children {
            if let Some(child) = self.visuals.get_mut(child) {
                child.parent = None;
            }
        }
        self.ops.push(ViewOp::Dispose(removed.element, visual));
    }

    fn attach_to_stack(&mut self, stack: VisualId, child: VisualId, index: usize) {
        if !self.visuals.contains_key(&stack) {
            return;
        }
        let Some(visual) = self.visuals.get_mut(&child) else {
            return;
        };
        visual.parent = Some(stack);
        if let Some(stack) = self.visuals.get_mut(&stack) {
            let index = index.min(stack.children.len());
            stack.children.insert(index, child);
        }
    }

    fn relayout_stack(&mut self, stack: VisualId) {
        let Some(visual) = self.visuals.get(&stack) else {
            return;
        };
        let origin = visual.rect.min;
        let children = visual.children.clone();

        let mut y = origin.y + NODE_HEADER_HEIGHT + STACK_PADDING;
        for child in children {
            if let Some(child) = self.visuals.get_mut(&child) {
                child.rect = Rect::from_min_size(Pos2::new(origin.x + STACK_PADDING, y), child.rect.size());
                y += child.rect.height() + STACK_SPACING;
            }
        }

        if let Some(visual) = self.visuals.get_mut(&stack) {
            let height = (y - origin.y + STACK_PADDING).max(visual.rect.height());
            visual.rect = Rect::from_min_size(origin, Vec2::new(visual.rect.width(), height));
        }
        self.ops.push(ViewOp::Relayout(stack));
    }

    fn connect_edge(&mut self, edge: VisualId, output: PortAnchor, input: PortAnchor) {
        if let Some(visual) = self.visuals.get_mut(&edge) {
            visual.endpoints = Some((output, input));
            self.ops.push(ViewOp::Connect(edge));
        }
    }

    fn disconnect_edge(&mut self, edge: VisualId) {
        if let Some(visual) = self.visuals.get_mut(&edge) {
            visual.endpoints = None;
            self.ops.push(ViewOp::Disconnect(edge));
        }
    }

    fn layout(&self, visual: VisualId) -> Option<Rect> {
        self.visuals.get(&visual).map(|v| v.rect)
    }

    fn set_position(&mut self, visual: VisualId, position: Pos2) {
        let Some(current) = self.visuals.get(&visual).map(|v| v.rect.min) else {
            return;
        };
        self.translate(visual, position - current);
        self.ops.push(ViewOp::Move(visual, position));
    }

    fn port_offset(&self, visual: VisualId, port: PortId) -> Option<Vec2> {
        self.visuals.get(&visual)?.ports.get(&port).copied()
    }

    fn set_visible(&mut self, visual: VisualId, visible: bool) {
        if let Some(visual) = self.visuals.get_mut(&visual) {
            visual.visible = visible;
        }
    }
}

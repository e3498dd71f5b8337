// SPDX-License-Identifier: MIT OR Apache-2.0
//! Boundary between the editor core and the visual toolkit.
//!
//! The toolkit owns its visuals; the core only ever holds [`VisualId`]
//! handles and looks them up through [`ViewMapping`] by model identity.

pub mod memory;

use egui::{Pos2, Rect, Vec2};
use indexmap::IndexMap;
use scriptgraph_model::{ConnectionId, ElementId, Graph, NodeId, PortId};

pub use memory::{RecordingView, ViewOp, VisualKind};

/// Handle to a visual owned by the view layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VisualId(pub u64);

/// One end of an edge visual
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortAnchor {
    /// Visual of the node owning the port
    pub node: VisualId,
    /// The port
    pub port: PortId,
}

/// Operations the core needs from a visual toolkit
pub trait ViewLayer {
    /// Create the visual for a model element, or `None` if it has no visual
    fn create_visual(&mut self, graph: &Graph, element: ElementId) -> Option<VisualId>;

    /// Destroy a visual
    fn dispose_visual(&mut self, visual: VisualId);

    /// Place a node visual inside a stack visual at `index`
    fn attach_to_stack(&mut self, stack: VisualId, child: VisualId, index: usize);

    /// Recompute the layout of a stack and its children
    fn relayout_stack(&mut self, stack: VisualId);

    /// Attach an edge visual to its two port visuals
    fn connect_edge(&mut self, edge: VisualId, output: PortAnchor, input: PortAnchor);

    /// Detach an edge visual from its ports
    fn disconnect_edge(&mut self, edge: VisualId);

    /// Current layout rectangle, in graph space
    fn layout(&self, visual: VisualId) -> Option<Rect>;

    /// Move a visual so its top-left corner is at `position`
    fn set_position(&mut self, visual: VisualId, position: Pos2);

    /// Offset of a port's anchor from the top-left corner of its node visual
    fn port_offset(&self, visual: VisualId, port: PortId) -> Option<Vec2>;

    /// Show or hide a visual
    fn set_visible(&mut self, visual: VisualId, visible: bool);
}

/// Endpoints of an edge visual, kept so its dependency can be dropped after
/// the edge model is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEndpoints {
    /// Source node
    pub from: NodeId,
    /// Target node
    pub to: NodeId,
    /// Dependency pair registered for this edge, if any
    pub dependency: Option<(NodeId, NodeId)>,
}

/// Model element to visual association
#[derive(Debug, Clone, Default)]
pub struct ViewMapping {
    visuals: IndexMap<ElementId, VisualId>,
    edges: IndexMap<ConnectionId, EdgeEndpoints>,
    stacks: IndexMap<NodeId, Vec<NodeId>>,
}

impl ViewMapping {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Visual mapped to an element
    pub fn get(&self, element: impl Into<ElementId>) -> Option<VisualId> {
        self.visuals.get(&element.into()).copied()
    }

    /// Whether an element has a visual
    pub fn contains(&self, element: impl Into<ElementId>) -> bool {
        self.visuals.contains_key(&element.into())
    }

    /// Record a visual for an element, returning the one it replaces
    pub fn insert(&mut self, element: ElementId, visual: VisualId) -> Option<VisualId> {
        self.visuals.insert(element, visual)
    }

    /// Forget an element's visual
    pub fn remove(&mut self, element: ElementId) -> Option<VisualId> {
        if let ElementId::Connection(id) = element {
            self.edges.shift_remove(&id);
        }
        if let ElementId::Node(id) = element {
            self.stacks.shift_remove(&id);
        }
        self.visuals.shift_remove(&element)
    }

    /// Iterate mapped elements with their visuals
    pub fn iter(&self) -> impl Iterator<Item = (ElementId, VisualId)> + '_ {
        self.visuals.iter().map(|(element, visual)| (*element, *visual))
    }

    /// Mapped elements
    pub fn elements(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.visuals.keys().copied()
    }

    /// Number of mapped elements
    pub fn len(&self) -> usize {
        self.visuals.len()
    }

    /// Whether nothing is mapped
    pub fn is_empty(&self) -> bool {
        self.visuals.is_empty()
    }

    /// Remember the endpoints of an edge visual
    pub fn set_edge_endpoints(&mut self, edge: ConnectionId, endpoints: EdgeEndpoints) {
        self.edges.insert(edge, endpoints);
    }

    /// Endpoints recorded for an edge visual
    pub fn edge_endpoints(&self, edge: ConnectionId) -> Option<EdgeEndpoints> {
        self.edges.get(&edge).copied()
    }

    /// Mapped edges touching a node, by recorded endpoints
    pub fn edges_of(&self, node: NodeId) -> impl Iterator<Item = ConnectionId> + '_ {
        self.edges
            .iter()
            .filter(move |(_, ends)| ends.from == node || ends.to == node)
            .map(|(id, _)| *id)
    }

    /// Remember which children a stack visual registered
    pub fn set_stack_children(&mut self, stack: NodeId, children: Vec<NodeId>) {
        self.stacks.insert(stack, children);
    }

    /// Children registered for a stack visual
    pub fn stack_children(&self, stack: NodeId) -> &[NodeId] {
        self.stacks.get(&stack).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.visuals.clear();
        self.edges.clear();
        self.stacks.clear();
    }
}

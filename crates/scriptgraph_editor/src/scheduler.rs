// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-frame batching of stack relayouts.
//!
//! Inserting several nodes into one stack within a frame should lay the stack
//! out once, at the end of the frame, not once per insertion.

use crate::view::{ViewLayer, ViewMapping};
use indexmap::IndexSet;
use scriptgraph_model::{ElementId, Graph, NodeId};

/// Stacks waiting for a relayout at the end of the frame
#[derive(Debug, Default)]
pub struct FrameScheduler {
    pending_stacks: IndexSet<NodeId>,
    frame: u64,
    verbose: bool,
}

impl FrameScheduler {
    /// Create an idle scheduler
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            ..Self::default()
        }
    }

    /// Toggle diagnostic logging
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Whether diagnostics are logged
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Queue a relayout of `stack`. Returns false if it was already queued.
    pub fn schedule_stack(&mut self, stack: NodeId) -> bool {
        self.pending_stacks.insert(stack)
    }

    /// Whether anything waits for the end of the frame
    pub fn has_pending(&self) -> bool {
        !self.pending_stacks.is_empty()
    }

    /// Frames completed so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Drain the queue without touching the view
    pub fn take_pending_stacks(&mut self) -> Vec<NodeId> {
        self.pending_stacks.drain(..).collect()
    }

    /// End the frame: relayout every queued stack once and write the
    /// resulting child positions back to the model.
    ///
    /// Returns the number of stacks laid out.
    pub fn end_frame(&mut self, graph: &mut Graph, view: &mut dyn ViewLayer, mapping: &ViewMapping) -> usize {
        self.frame += 1;
        let mut laid_out = 0;

        for stack in self.take_pending_stacks() {
            let Some(visual) = mapping.get(stack) else {
                if self.verbose {
                    tracing::debug!("Stack {:?} has no visual; dropping relayout", stack);
                }
                continue;
            };
            view.relayout_stack(visual);
            laid_out += 1;

            let children = graph.node(stack).map(|n| n.stack_children().to_vec()).unwrap_or_default();
            for child in children {
                if let Some(rect) = mapping.get(child).and_then(|v| view.layout(v)) {
                    graph.set_position(ElementId::Node(child), [rect.min.x, rect.min.y]);
                }
            }
        }
        laid_out
    }
}

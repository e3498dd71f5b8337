// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo history using whole-graph snapshots.
//!
//! Positional writes made by dragging and alignment snapshot the graph asset
//! before touching it, then commit a group holding the before/after states.

use scriptgraph_model::Graph;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Maximum undo history depth
const MAX_HISTORY: usize = 100;

/// History errors
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Nothing to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Nothing to redo
    #[error("Nothing to redo")]
    NothingToRedo,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Unique operation ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationID(u64);

impl OperationID {
    /// Get the raw ID value
    pub fn value(&self) -> u64 {
        self.0
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Serialized graph state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Serialized graph
    pub data: Vec<u8>,
    /// Timestamp when snapshot was taken
    pub timestamp: u64,
    /// Size in bytes
    pub size: usize,
}

impl StateSnapshot {
    /// Create a new state snapshot
    pub fn new(data: Vec<u8>) -> Self {
        let size = data.len();
        Self {
            data,
            timestamp: now(),
            size,
        }
    }

    /// Snapshot a graph
    pub fn of(graph: &Graph) -> Result<Self> {
        let data = bincode::serialize(graph)?;
        Ok(Self::new(data))
    }

    /// Deserialize the graph back
    pub fn restore(&self) -> Result<Graph> {
        Ok(bincode::deserialize(&self.data)?)
    }
}

/// An operation that can be undone/redone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Human-readable description
    pub description: String,
    /// State before operation (for undo)
    pub before: StateSnapshot,
    /// State after operation (for redo)
    pub after: StateSnapshot,
}

impl Operation {
    /// Get memory size of this operation
    pub fn memory_size(&self) -> usize {
        self.before.size + self.after.size
    }
}

/// Group of operations that are undone/redone together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationGroup {
    /// Group ID
    pub id: OperationID,
    /// Human-readable description
    pub description: String,
    /// Operations in this group
    pub operations: Vec<Operation>,
    /// Timestamp
    pub timestamp: u64,
}

impl OperationGroup {
    /// Get total memory size of this group
    pub fn memory_size(&self) -> usize {
        self.operations.iter().map(Operation::memory_size).sum()
    }
}

/// A recording in progress: the asset was snapshotted, writes follow.
#[derive(Debug)]
pub struct PendingOperation {
    description: String,
    before: StateSnapshot,
}

/// History statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryStats {
    /// Total groups in undo stack
    pub undo_count: usize,
    /// Total groups in redo stack
    pub redo_count: usize,
    /// Total memory used by history (bytes)
    pub memory_used: usize,
    /// Maximum history depth
    pub max_depth: usize,
}

/// Undo/redo history manager
#[derive(Debug)]
pub struct History {
    /// Undo stack
    undo_stack: VecDeque<OperationGroup>,
    /// Redo stack
    redo_stack: VecDeque<OperationGroup>,
    /// Next operation ID
    next_id: u64,
    /// Maximum history depth
    max_depth: usize,
    /// Total memory used
    memory_used: usize,
}

impl History {
    /// Create a new history manager
    pub fn new() -> Self {
        Self::with_max_depth(MAX_HISTORY)
    }

    /// Create with custom maximum depth
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            next_id: 1,
            max_depth,
            memory_used: 0,
        }
    }

    /// Snapshot the asset before modifying it
    pub fn begin(&self, description: impl Into<String>, graph: &Graph) -> Result<PendingOperation> {
        Ok(PendingOperation {
            description: description.into(),
            before: StateSnapshot::of(graph)?,
        })
    }

    /// Finish a recording started with [`History::begin`]
    pub fn finish(&mut self, pending: PendingOperation, graph: &Graph) -> Result<OperationID> {
        let id = OperationID(self.next_id);
        self.next_id += 1;

        let operation = Operation {
            description: pending.description.clone(),
            before: pending.before,
            after: StateSnapshot::of(graph)?,
        };
        self.commit(OperationGroup {
            id,
            description: pending.description,
            operations: vec![operation],
            timestamp: now(),
        });
        Ok(id)
    }

    /// Commit an operation group
    pub fn commit(&mut self, group: OperationGroup) {
        if group.operations.is_empty() {
            return;
        }

        self.redo_stack.clear();

        self.memory_used += group.memory_size();
        self.undo_stack.push_back(group);

        while self.undo_stack.len() > self.max_depth {
            if let Some(old_group) = self.undo_stack.pop_front() {
                self.memory_used = self.memory_used.saturating_sub(old_group.memory_size());
            }
        }
    }

    /// Undo the last group, restoring `graph` to its earlier state
    pub fn undo(&mut self, graph: &mut Graph) -> Result<OperationID> {
        let group = self
            .undo_stack
            .back()
            .ok_or(HistoryError::NothingToUndo)?;

        if let Some(first) = group.operations.first() {
            *graph = first.before.restore()?;
        }

        if let Some(group) = self.undo_stack.pop_back() {
            self.memory_used = self.memory_used.saturating_sub(group.memory_size());
            let id = group.id;
            self.redo_stack.push_back(group);
            return Ok(id);
        }
        Err(HistoryError::NothingToUndo)
    }

    /// Redo the last undone group
    pub fn redo(&mut self, graph: &mut Graph) -> Result<OperationID> {
        let group = self
            .redo_stack
            .back()
            .ok_or(HistoryError::NothingToRedo)?;

        if let Some(last) = group.operations.last() {
            *graph = last.after.restore()?;
        }

        if let Some(group) = self.redo_stack.pop_back() {
            self.memory_used += group.memory_size();
            let id = group.id;
            self.undo_stack.push_back(group);
            return Ok(id);
        }
        Err(HistoryError::NothingToRedo)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.memory_used = 0;
    }

    /// Get history statistics
    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            undo_count: self.undo_stack.len(),
            redo_count: self.redo_stack.len(),
            memory_used: self.memory_used,
            max_depth: self.max_depth,
        }
    }

    /// Get description of next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|g| g.description.as_str())
    }

    /// Get description of next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(|g| g.description.as_str())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
